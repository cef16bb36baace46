use std::ptr::NonNull;

use libc::c_void;
use retour::RawDetour;

use super::{EngineError, EngineErrorCode, EngineResult, PatchEngine, PatchFlags};

/// Patch engine backed by `retour`'s inline detours.
///
/// `retour` relocates the prologue of the target into an executable
/// trampoline and writes a jump to the replacement over the entry point.
/// It does not suspend other threads while doing so.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetourEngine;

/// Hook object of [`RetourEngine`]. Empty until prepared.
#[derive(Debug, Default)]
pub struct RetourHook {
    detour: Option<RawDetour>,
}

// Safety: a RetourHook is owned by exactly one detour handle and only touched
// under that handle's lock
unsafe impl Send for RetourHook {}

impl RetourHook {
    pub fn is_prepared(&self) -> bool {
        self.detour.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.detour.as_ref().is_some_and(RawDetour::is_enabled)
    }

    fn prepared(&self) -> EngineResult<&RawDetour> {
        self.detour.as_ref().ok_or_else(EngineError::not_prepared)
    }
}

fn backend_error(err: retour::Error) -> EngineError {
    EngineError::new(EngineErrorCode::Backend, err.to_string())
}

impl PatchEngine for RetourEngine {
    type Hook = RetourHook;

    fn create(&self) -> EngineResult<RetourHook> {
        Ok(RetourHook::default())
    }

    unsafe fn prepare(
        &self,
        hook: &mut RetourHook,
        target: NonNull<c_void>,
        replacement: NonNull<c_void>,
    ) -> EngineResult<NonNull<c_void>> {
        if hook.is_prepared() {
            return Err(EngineError::new(
                EngineErrorCode::AlreadyPrepared,
                "hook object is already prepared",
            ));
        }

        log::debug!(
            "[retour] Preparing {:p} -> {:p}",
            target.as_ptr(),
            replacement.as_ptr()
        );

        let detour = unsafe {
            RawDetour::new(
                target.as_ptr() as *const (),
                replacement.as_ptr() as *const (),
            )
        }
        .map_err(backend_error)?;

        let trampoline = detour.trampoline() as *const () as *mut c_void;
        let trampoline = NonNull::new(trampoline).ok_or_else(|| {
            EngineError::new(
                EngineErrorCode::MemoryAllocation,
                "engine returned a null trampoline",
            )
        })?;

        log::debug!("[retour] Trampoline at {:p}", trampoline.as_ptr());

        hook.detour = Some(detour);

        Ok(trampoline)
    }

    unsafe fn install(&self, hook: &mut RetourHook, _flags: PatchFlags) -> EngineResult<()> {
        let detour = hook.prepared()?;

        if detour.is_enabled() {
            return Err(EngineError::new(
                EngineErrorCode::AlreadyInstalled,
                "hook is already installed",
            ));
        }

        unsafe { detour.enable() }.map_err(backend_error)
    }

    unsafe fn uninstall(&self, hook: &mut RetourHook, _flags: PatchFlags) -> EngineResult<()> {
        let detour = hook.prepared()?;

        if !detour.is_enabled() {
            return Err(EngineError::new(
                EngineErrorCode::NotInstalled,
                "hook is not installed",
            ));
        }

        unsafe { detour.disable() }.map_err(backend_error)
    }

    fn destroy(&self, hook: RetourHook) -> EngineResult<()> {
        let Some(detour) = hook.detour else {
            return Ok(());
        };

        // RawDetour restores the entry on drop but swallows the error
        if detour.is_enabled() {
            unsafe { detour.disable() }.map_err(backend_error)?;
        }

        drop(detour);

        Ok(())
    }
}
