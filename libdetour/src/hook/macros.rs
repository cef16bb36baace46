/// Declares lazily constructed detour statics.
///
/// Each static is a [`Detour`](crate::hook::Detour) on the default engine,
/// registered in the global registry, named after its identifier and bound
/// to the replacement coerced to the declared function type. Calling
/// `NAME.call(args)` from inside the replacement reaches the original.
///
/// ```ignore
/// declare_detour! {
///     /// Runs before every entity removal
///     pub static UTIL_Remove: extern "C" fn(*mut Entity) = remove_detour;
///     static Teleport: extern "C" fn(*mut Entity, *const Vector) = teleport_detour;
/// }
/// ```
#[macro_export]
macro_rules! declare_detour {
    ($($(#[$meta:meta])* $vis:vis static $name:ident: $fn_ty:ty = $replacement:expr;)+) => {
        $(
            $(#[$meta])*
            #[allow(non_upper_case_globals)]
            $vis static $name: ::std::sync::LazyLock<$crate::hook::Detour<$fn_ty>> =
                ::std::sync::LazyLock::new(|| {
                    $crate::hook::Detour::new(::std::stringify!($name), $replacement as $fn_ty)
                });
        )+
    };
}

#[cfg(test)]
mod tests {
    use std::hint::black_box;

    use libc::c_void;

    use crate::{
        config::AddressTable,
        hook::{DetourState, flush_all_detours, registry},
    };

    type SquareFn = extern "C" fn(i64) -> i64;

    #[inline(never)]
    extern "C" fn square(x: i64) -> i64 {
        black_box(x).wrapping_mul(black_box(x))
    }

    #[inline(never)]
    extern "C" fn square_detour(x: i64) -> i64 {
        let original = unsafe { Square.call((x,)) }.unwrap_or_default();
        original + 1
    }

    declare_detour! {
        static Square: SquareFn = square_detour;
    }

    fn call_square(x: i64) -> i64 {
        let f: SquareFn = black_box(square);
        f(x)
    }

    #[test]
    fn test_declared_detour_flushes_globally() {
        let config = AddressTable::new().with("Square", square as *const c_void);

        Square.create(&config).unwrap();
        assert_eq!(Square.name(), "Square");
        assert!(registry::global().contains("Square"));

        Square.enable().unwrap();
        assert_eq!(call_square(4), 17);
        assert_eq!(unsafe { Square.call((4,)) }.unwrap(), 16);

        flush_all_detours();

        assert_eq!(Square.state(), DetourState::Freed);
        assert!(!registry::global().contains("Square"));
        assert_eq!(call_square(4), 16);
    }
}
