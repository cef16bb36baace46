//! Counting engine for exercising the handle state machine without
//! touching code.

use std::{
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use libc::c_void;

use super::{EngineError, EngineErrorCode, EngineResult, PatchEngine, PatchFlags};

#[derive(Debug, Default)]
pub struct MockStats {
    pub created: AtomicUsize,
    pub prepared: AtomicUsize,
    pub installs: AtomicUsize,
    pub uninstalls: AtomicUsize,
    pub destroyed: AtomicUsize,

    pub fail_create: AtomicBool,
    pub fail_prepare: AtomicBool,
    pub fail_install: AtomicBool,
    pub fail_uninstall: AtomicBool,
    pub fail_destroy: AtomicBool,
}

impl MockStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    pub stats: Arc<MockStats>,
}

#[derive(Debug)]
pub struct MockHook {
    target: Option<NonNull<c_void>>,
    installed: bool,
}

unsafe impl Send for MockHook {}

fn injected(flag: &AtomicBool, code: EngineErrorCode, what: &str) -> EngineResult<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(EngineError::new(code, format!("injected {what} failure")));
    }

    Ok(())
}

impl PatchEngine for MockEngine {
    type Hook = MockHook;

    fn create(&self) -> EngineResult<MockHook> {
        injected(&self.stats.fail_create, EngineErrorCode::OutOfMemory, "create")?;
        self.stats.created.fetch_add(1, Ordering::SeqCst);

        Ok(MockHook {
            target: None,
            installed: false,
        })
    }

    unsafe fn prepare(
        &self,
        hook: &mut MockHook,
        target: NonNull<c_void>,
        _replacement: NonNull<c_void>,
    ) -> EngineResult<NonNull<c_void>> {
        injected(&self.stats.fail_prepare, EngineErrorCode::Disassembly, "prepare")?;
        self.stats.prepared.fetch_add(1, Ordering::SeqCst);

        // Nothing is patched, so the target itself behaves as the original
        hook.target = Some(target);
        Ok(target)
    }

    unsafe fn install(&self, hook: &mut MockHook, _flags: PatchFlags) -> EngineResult<()> {
        if hook.target.is_none() {
            return Err(EngineError::not_prepared());
        }

        injected(&self.stats.fail_install, EngineErrorCode::MemoryProtection, "install")?;
        self.stats.installs.fetch_add(1, Ordering::SeqCst);
        hook.installed = true;

        Ok(())
    }

    unsafe fn uninstall(&self, hook: &mut MockHook, _flags: PatchFlags) -> EngineResult<()> {
        if !hook.installed {
            return Err(EngineError::new(
                EngineErrorCode::NotInstalled,
                "hook is not installed",
            ));
        }

        injected(&self.stats.fail_uninstall, EngineErrorCode::MemoryProtection, "uninstall")?;
        self.stats.uninstalls.fetch_add(1, Ordering::SeqCst);
        hook.installed = false;

        Ok(())
    }

    fn destroy(&self, _hook: MockHook) -> EngineResult<()> {
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
        injected(&self.stats.fail_destroy, EngineErrorCode::Internal, "destroy")
    }
}
