use std::{
    marker::PhantomData,
    ptr::NonNull,
    sync::atomic::{AtomicPtr, Ordering},
};

use libc::c_void;
use log::{error, trace};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FnPtrError {
    #[error("Function pointer is NULL")]
    FunctionPtrIsNull,

    #[error("Function pointer has wrong size ({0} bytes, expected {1})")]
    FunctionPtrSize(usize, usize),
}

pub type FnPtrResult<T> = std::result::Result<T, FnPtrError>;

/// Typed container for a code address.
///
/// Detours move addresses around in three shapes: the replacement supplied
/// by the owner, the target entry point handed out by a resolver and the
/// trampoline produced by the patch engine. All three end up as raw
/// `*mut c_void` at the engine boundary but must be called back with the
/// exact signature `T`. `FnPtr` keeps the raw address and remembers `T` in
/// a phantom so the round trip is checked in one place.
///
/// `T` is expected to be a function pointer type; its size is verified
/// against `*mut c_void` on every construction.
#[derive(Debug)]
pub struct FnPtr<T: Copy + 'static> {
    raw_ptr: AtomicPtr<c_void>,
    _phantom: PhantomData<T>,
}

// Safety: function pointers are plain addresses, the slot itself is atomic
unsafe impl<T: Copy + 'static> Send for FnPtr<T> {}
unsafe impl<T: Copy + 'static> Sync for FnPtr<T> {}

impl<T: Copy + 'static> FnPtr<T> {
    /// Wraps a raw code address.
    ///
    /// The caller is responsible for the address actually pointing at code
    /// with the calling convention and signature of `T`.
    pub fn from_raw(raw_ptr: *mut c_void) -> FnPtrResult<Self> {
        Self::validate_size()?;

        if raw_ptr.is_null() {
            error!("Cannot create FnPtr from null pointer");
            return Err(FnPtrError::FunctionPtrIsNull);
        }

        trace!("FnPtr created from raw pointer {:p}", raw_ptr);

        Ok(Self {
            raw_ptr: AtomicPtr::new(raw_ptr),
            _phantom: PhantomData,
        })
    }

    pub fn from_non_null(raw_ptr: NonNull<c_void>) -> FnPtrResult<Self> {
        Self::from_raw(raw_ptr.as_ptr())
    }

    /// Takes a typed function pointer and stores its address.
    pub fn from_fn(function: T) -> FnPtrResult<Self> {
        Self::validate_size()?;

        // Safety: validate_size guarantees T is exactly pointer sized
        let addr = unsafe { std::mem::transmute_copy::<T, usize>(&function) };

        Self::from_raw(addr as *mut c_void)
    }

    /// Converts the stored address back to `T`.
    ///
    /// # Safety
    /// The stored address must be callable as `T`.
    pub unsafe fn as_fn(&self) -> FnPtrResult<T> {
        let ptr = self.as_raw_ptr();

        if ptr.is_null() {
            return Err(FnPtrError::FunctionPtrIsNull);
        }

        let addr = ptr as usize;

        // Safety: validate_size ran at construction, T is pointer sized
        Ok(unsafe { std::mem::transmute_copy::<usize, T>(&addr) })
    }

    pub fn as_raw_ptr(&self) -> *mut c_void {
        self.raw_ptr.load(Ordering::Acquire)
    }

    pub fn as_non_null(&self) -> FnPtrResult<NonNull<c_void>> {
        NonNull::new(self.as_raw_ptr()).ok_or(FnPtrError::FunctionPtrIsNull)
    }

    fn validate_size() -> FnPtrResult<()> {
        let type_size = std::mem::size_of::<T>();
        let ptr_size = std::mem::size_of::<*mut c_void>();

        if type_size != ptr_size {
            error!(
                "Invalid function pointer type size: {} != {}",
                type_size, ptr_size
            );
            return Err(FnPtrError::FunctionPtrSize(type_size, ptr_size));
        }

        Ok(())
    }
}
