use std::fmt::Debug;

use super::state::DetourState;
use super::DetourResult;

/// Function pointer types a detour can be bound to.
///
/// Implemented for `fn`, `unsafe fn`, `extern "C" fn` and `extern "system" fn`
/// pointers (safe and unsafe) of up to twelve arguments. `Arguments` is the
/// argument list as a tuple, which lets a handle forward a call to the
/// original with the exact signature it was declared with.
///
/// # Safety
/// Implementors must be pointer sized function pointer types.
pub unsafe trait DetourFn: Copy + Send + Sync + 'static {
    type Arguments;
    type Output;

    /// Calls the function with the unpacked argument tuple.
    ///
    /// # Safety
    /// The pointer must reference live code with this exact signature.
    unsafe fn call(self, args: Self::Arguments) -> Self::Output;
}

/// Type-erased view of a detour handle, as seen by the registry
pub trait ErasedDetour: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn state(&self) -> DetourState;

    fn enable(&self) -> DetourResult<()>;

    fn disable(&self) -> DetourResult<()>;

    /// Idempotent teardown, always safe to call
    fn free(&self);
}

macro_rules! impl_detour_fn {
    (@recurse () ($($nm:ident : $ty:ident),*)) => {
        impl_detour_fn!(@impl_all ($($nm : $ty),*));
    };
    (@recurse ($hd_nm:ident : $hd_ty:ident $(, $tl_nm:ident : $tl_ty:ident)*) ($($nm:ident : $ty:ident),*)) => {
        impl_detour_fn!(@impl_all ($($nm : $ty),*));
        impl_detour_fn!(@recurse ($($tl_nm : $tl_ty),*) ($($nm : $ty,)* $hd_nm : $hd_ty));
    };

    (@impl_all ($($nm:ident : $ty:ident),*)) => {
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (fn($($ty),*) -> Ret));
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (unsafe fn($($ty),*) -> Ret));
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (extern "C" fn($($ty),*) -> Ret));
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (unsafe extern "C" fn($($ty),*) -> Ret));
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (extern "system" fn($($ty),*) -> Ret));
        impl_detour_fn!(@impl_one ($($nm : $ty),*) (unsafe extern "system" fn($($ty),*) -> Ret));
    };

    (@impl_one ($($nm:ident : $ty:ident),*) ($($fn_t:tt)*)) => {
        unsafe impl<Ret: 'static, $($ty: 'static),*> DetourFn for $($fn_t)* {
            type Arguments = ($($ty,)*);
            type Output = Ret;

            #[inline]
            #[allow(unused_unsafe, clippy::too_many_arguments)]
            unsafe fn call(self, ($($nm,)*): Self::Arguments) -> Ret {
                unsafe { (self)($($nm),*) }
            }
        }
    };

    ($($nm:ident : $ty:ident),*) => {
        impl_detour_fn!(@recurse ($($nm : $ty),*) ());
    };
}

impl_detour_fn! {
    __arg_0: A, __arg_1: B, __arg_2: C, __arg_3: D, __arg_4: E, __arg_5: F,
    __arg_6: G, __arg_7: H, __arg_8: I, __arg_9: J, __arg_10: K, __arg_11: L
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn sum3(a: i32, b: i32, c: i32) -> i32 {
        a + b + c
    }

    unsafe extern "C" fn scale(x: u64) -> u64 {
        x * 10
    }

    fn nothing() -> &'static str {
        "nothing"
    }

    #[test]
    fn test_call_unpacks_tuple() {
        let f: extern "C" fn(i32, i32, i32) -> i32 = sum3;
        assert_eq!(unsafe { f.call((1, 2, 3)) }, 6);
    }

    #[test]
    fn test_call_unsafe_extern() {
        let f: unsafe extern "C" fn(u64) -> u64 = scale;
        assert_eq!(unsafe { f.call((4,)) }, 40);
    }

    #[test]
    fn test_call_zero_args() {
        let f: fn() -> &'static str = nothing;
        assert_eq!(unsafe { f.call(()) }, "nothing");
    }
}
