//! Boundary to the code patching engine.
//!
//! A [`PatchEngine`] turns a (target, replacement) pair into an opaque hook
//! object, and later installs, uninstalls and destroys it. The engine does
//! the instruction rewriting; everything above it only orchestrates.
//!
//! # Concurrency contract
//!
//! Installing or uninstalling rewrites the entry bytes of the target. That
//! write is visible to every thread at once, and a thread that is executing
//! inside the patched bytes while they change observes a torn instruction
//! stream. Callers must toggle hooks only while the target is quiescent
//! (plugin load/unload, single threaded init) unless the engine itself
//! guarantees an atomic branch write.
//!
//! Independently of that, every install/uninstall/destroy issued through a
//! detour handle runs inside [`patch_window`], one process-wide lock, so two
//! handles never rewrite code at the same time.

use std::ptr::NonNull;

use libc::c_void;
use parking_lot::{Mutex, MutexGuard};

pub mod errors;
mod retour_engine;

#[cfg(test)]
pub(crate) mod mock;

pub use errors::{EngineError, EngineErrorCode, EngineResult};
pub use retour_engine::{RetourEngine, RetourHook};

/// Engine used by handles that do not name one explicitly
pub type DefaultEngine = RetourEngine;

/// Flags forwarded verbatim to install/uninstall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchFlags(pub u32);

impl PatchFlags {
    pub const NONE: PatchFlags = PatchFlags(0);
}

/// Low-level patching primitives.
///
/// Hook objects are exclusively owned by one detour handle. The engine never
/// keeps references to them between calls.
pub trait PatchEngine: Send + Sync + 'static {
    type Hook: Send + 'static;

    /// Allocates an empty hook object
    fn create(&self) -> EngineResult<Self::Hook>;

    /// Binds the hook object to `target` and `replacement` and returns the
    /// address of a trampoline that runs the unmodified target.
    ///
    /// # Safety
    /// `target` must be the entry point of a function and `replacement` a
    /// function with the same calling convention and signature.
    unsafe fn prepare(
        &self,
        hook: &mut Self::Hook,
        target: NonNull<c_void>,
        replacement: NonNull<c_void>,
    ) -> EngineResult<NonNull<c_void>>;

    /// Redirects the target to the replacement.
    ///
    /// # Safety
    /// See the module level concurrency contract.
    unsafe fn install(&self, hook: &mut Self::Hook, flags: PatchFlags) -> EngineResult<()>;

    /// Restores the original entry bytes.
    ///
    /// # Safety
    /// See the module level concurrency contract.
    unsafe fn uninstall(&self, hook: &mut Self::Hook, flags: PatchFlags) -> EngineResult<()>;

    /// Releases the hook object and its trampoline. Consumes the hook, so it
    /// can only happen once.
    fn destroy(&self, hook: Self::Hook) -> EngineResult<()>;
}

static PATCH_WINDOW: Mutex<()> = parking_lot::const_mutex(());

/// Serializes code rewrites across all detour handles in the process
pub fn patch_window() -> MutexGuard<'static, ()> {
    PATCH_WINDOW.lock()
}
