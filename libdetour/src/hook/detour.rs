use std::{
    fmt,
    ptr::NonNull,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicU8, Ordering},
    },
};

use libc::c_void;
use parking_lot::Mutex;

use crate::{
    common::helpers::{PatchOp, format_address, format_engine_failure},
    config::SignatureResolver,
    engine::{DefaultEngine, EngineError, PatchEngine, PatchFlags, patch_window},
    ffi::fnptr::FnPtr,
};

use super::{
    DetourError, DetourResult, DetourState,
    registry::{self, DetourId, DetourRegistry},
    traits::{DetourFn, ErasedDetour},
};

/// Interception of one function.
///
/// A detour is declared with a stable name and a replacement function, then
/// [`create`](Detour::create)d against a configuration context that resolves
/// the name to the target's entry point. From then on it can be enabled and
/// disabled any number of times while [`original`](Detour::original) keeps
/// returning a callable trampoline to the unmodified implementation.
/// [`free`](Detour::free) (or dropping the handle) tears everything down once.
///
/// ```no_run
/// use libdetour::{config::AddressTable, declare_detour};
///
/// type AddFn = extern "C" fn(i32, i32) -> i32;
///
/// extern "C" fn add(a: i32, b: i32) -> i32 { a + b }
///
/// extern "C" fn add_detour(a: i32, b: i32) -> i32 {
///     let sum = unsafe { Add.call((a, b)) }.unwrap_or_default();
///     sum * 2
/// }
///
/// declare_detour! {
///     static Add: AddFn = add_detour;
/// }
///
/// let config = AddressTable::new().with("Add", add as *const std::ffi::c_void);
/// Add.create(&config).unwrap();
/// Add.enable().unwrap();
/// // ...
/// libdetour::hook::flush_all_detours();
/// ```
pub struct Detour<F: DetourFn, E: PatchEngine = DefaultEngine> {
    shared: Arc<DetourShared<F, E>>,
}

struct DetourInner<H> {
    hook: Option<H>,
    target: Option<NonNull<c_void>>,
    module: Option<String>,
}

// Safety: target is only an address, never dereferenced here
unsafe impl<H: Send> Send for DetourInner<H> {}

struct DetourShared<F: DetourFn, E: PatchEngine> {
    id: DetourId,
    name: String,
    replacement: F,
    engine: E,
    registry: Arc<DetourRegistry>,

    // Written under `inner`, read lock-free from replacement functions
    state: AtomicU8,
    original: OnceLock<FnPtr<F>>,

    inner: Mutex<DetourInner<E::Hook>>,
}

impl<F: DetourFn> Detour<F> {
    /// Detour on the default engine, registered in the process-wide registry
    pub fn new(name: impl Into<String>, replacement: F) -> Self {
        Self::with_engine(
            name,
            replacement,
            DefaultEngine::default(),
            Arc::clone(registry::global()),
        )
    }
}

impl<F: DetourFn, E: PatchEngine> Detour<F, E> {
    pub fn with_engine(
        name: impl Into<String>,
        replacement: F,
        engine: E,
        registry: Arc<DetourRegistry>,
    ) -> Self {
        Self {
            shared: Arc::new(DetourShared {
                id: DetourId::next(),
                name: name.into(),
                replacement,
                engine,
                registry,
                state: AtomicU8::new(DetourState::Created as u8),
                original: OnceLock::new(),
                inner: Mutex::new(DetourInner {
                    hook: None,
                    target: None,
                    module: None,
                }),
            }),
        }
    }

    /// Resolves the target through `config` and prepares the hook object.
    ///
    /// On resolution failure the handle stays `Created` and may be retried
    /// or dropped. On success it is `Prepared` and registered.
    pub fn create<R: SignatureResolver + ?Sized>(&self, config: &R) -> DetourResult<()> {
        let weak: Weak<dyn ErasedDetour> = Arc::downgrade(&self.shared) as Weak<dyn ErasedDetour>;
        self.shared.create(config, weak)
    }

    /// Installs the hook. No-op when already installed.
    pub fn enable(&self) -> DetourResult<()> {
        self.shared.enable()
    }

    /// Uninstalls the hook. No-op when not installed.
    pub fn disable(&self) -> DetourResult<()> {
        self.shared.disable()
    }

    /// Uninstalls if needed, destroys the hook object and leaves the
    /// registry. Safe to call any number of times.
    pub fn free(&self) {
        self.shared.free()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn id(&self) -> DetourId {
        self.shared.id
    }

    pub fn state(&self) -> DetourState {
        self.shared.state()
    }

    pub fn is_installed(&self) -> bool {
        self.state() == DetourState::Installed
    }

    /// Resolved entry point of the target, once resolution succeeded
    pub fn target(&self) -> Option<NonNull<c_void>> {
        self.shared.inner.lock().target
    }

    /// Module the target was resolved in, if the resolver knows it
    pub fn module(&self) -> Option<String> {
        self.shared.inner.lock().module.clone()
    }

    pub fn replacement(&self) -> F {
        self.shared.replacement
    }

    /// Trampoline to the unmodified target.
    ///
    /// Available from `Prepared` on, whether or not the hook is installed.
    pub fn original(&self) -> DetourResult<F> {
        self.shared.original()
    }

    /// Calls the unmodified target with `args`.
    ///
    /// # Safety
    /// Same contract as calling the target function directly.
    pub unsafe fn call(&self, args: F::Arguments) -> DetourResult<F::Output> {
        let original = self.original()?;
        Ok(unsafe { original.call(args) })
    }

    /// Runs `f` with the hook temporarily uninstalled, so calls to the
    /// target's real entry point reach the original. The hook is reinstalled
    /// afterwards, also when `f` unwinds.
    pub fn with_disabled<R>(&self, f: impl FnOnce() -> R) -> DetourResult<R> {
        struct Reinstall<'a, F: DetourFn, E: PatchEngine> {
            shared: &'a DetourShared<F, E>,
            active: bool,
        }

        impl<F: DetourFn, E: PatchEngine> Drop for Reinstall<'_, F, E> {
            fn drop(&mut self) {
                if self.active {
                    if let Err(err) = self.shared.enable() {
                        log::error!("[{}] Failed to reinstall detour: {}", self.shared.name, err);
                    }
                }
            }
        }

        let paused = self.shared.pause()?;

        let _reinstall = Reinstall {
            shared: &*self.shared,
            active: paused,
        };

        Ok(f())
    }
}

impl<F: DetourFn, E: PatchEngine> Drop for Detour<F, E> {
    fn drop(&mut self) {
        self.shared.free();
    }
}

impl<F: DetourFn, E: PatchEngine> fmt::Debug for Detour<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.shared, f)
    }
}

impl<F: DetourFn, E: PatchEngine> DetourShared<F, E> {
    fn state(&self) -> DetourState {
        DetourState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: DetourState) {
        let previous = self.state();
        self.state.store(state as u8, Ordering::Release);

        log::debug!("[{}] {} -> {}", self.name, previous, state);
    }

    fn engine_failure(&self, op: PatchOp, source: EngineError) -> DetourError {
        log::warn!("{}", format_engine_failure(op, &self.name, &source));

        DetourError::PatchEngine {
            name: self.name.clone(),
            op,
            source,
        }
    }

    fn freed(&self) -> DetourError {
        DetourError::Freed {
            name: self.name.clone(),
        }
    }

    fn not_prepared(&self) -> DetourError {
        DetourError::NotPrepared {
            name: self.name.clone(),
        }
    }

    fn create<R: SignatureResolver + ?Sized>(
        &self,
        config: &R,
        weak: Weak<dyn ErasedDetour>,
    ) -> DetourResult<()> {
        let mut inner = self.inner.lock();

        match self.state() {
            DetourState::Created | DetourState::Resolved => {}
            DetourState::Freed => return Err(self.freed()),
            _ => {
                return Err(DetourError::AlreadyPrepared {
                    name: self.name.clone(),
                });
            }
        }

        let Some(target) = config.resolve_signature(&self.name) else {
            log::warn!("Failed to resolve signature for detour {}", self.name);
            return Err(DetourError::ResolutionFailure {
                name: self.name.clone(),
            });
        };

        inner.target = Some(target);
        inner.module = config.library_for(&self.name);
        self.set_state(DetourState::Resolved);

        let replacement = FnPtr::from_fn(self.replacement)?.as_non_null()?;

        let mut hook = self
            .engine
            .create()
            .map_err(|err| self.engine_failure(PatchOp::Create, err))?;

        let prepared = unsafe { self.engine.prepare(&mut hook, target, replacement) }
            .map_err(|err| self.engine_failure(PatchOp::Prepare, err))
            .and_then(|trampoline| Ok(FnPtr::<F>::from_non_null(trampoline)?));

        let original = match prepared {
            Ok(original) => original,
            Err(err) => {
                if let Err(destroy_err) = self.engine.destroy(hook) {
                    self.engine_failure(PatchOp::Destroy, destroy_err);
                }
                return Err(err);
            }
        };

        if self.original.set(original).is_err() {
            log::error!("[{}] Original pointer was already populated", self.name);
        }

        inner.hook = Some(hook);
        self.set_state(DetourState::Prepared);
        self.registry.register(self.id, &self.name, weak);

        match &inner.module {
            Some(module) => log::info!(
                "Detoured {} at {} ({})",
                self.name,
                format_address(target.as_ptr()),
                module
            ),
            None => log::info!("Detoured {} at {}", self.name, format_address(target.as_ptr())),
        }

        Ok(())
    }

    fn enable(&self) -> DetourResult<()> {
        let mut inner = self.inner.lock();

        match self.state() {
            DetourState::Installed => return Ok(()),
            DetourState::Prepared | DetourState::Disabled => {}
            DetourState::Freed => return Err(self.freed()),
            DetourState::Created | DetourState::Resolved => return Err(self.not_prepared()),
        }

        let Some(hook) = inner.hook.as_mut() else {
            return Err(self.not_prepared());
        };

        {
            let _window = patch_window();
            unsafe { self.engine.install(hook, PatchFlags::NONE) }
                .map_err(|err| self.engine_failure(PatchOp::Install, err))?;
        }

        self.set_state(DetourState::Installed);

        Ok(())
    }

    fn disable(&self) -> DetourResult<()> {
        self.pause().map(|_| ())
    }

    /// Uninstalls if installed. Returns whether this call did the uninstall.
    fn pause(&self) -> DetourResult<bool> {
        let mut inner = self.inner.lock();

        if self.state() != DetourState::Installed {
            return Ok(false);
        }

        let Some(hook) = inner.hook.as_mut() else {
            return Err(self.not_prepared());
        };

        {
            let _window = patch_window();
            unsafe { self.engine.uninstall(hook, PatchFlags::NONE) }
                .map_err(|err| self.engine_failure(PatchOp::Uninstall, err))?;
        }

        self.set_state(DetourState::Disabled);

        Ok(true)
    }

    fn free(&self) {
        let mut inner = self.inner.lock();

        let state = self.state();
        if state == DetourState::Freed {
            return;
        }

        if let Some(mut hook) = inner.hook.take() {
            let _window = patch_window();

            // A failed uninstall is reported but does not keep the handle
            // alive: the bookkeeping below must still run
            if state == DetourState::Installed {
                if let Err(err) = unsafe { self.engine.uninstall(&mut hook, PatchFlags::NONE) } {
                    self.engine_failure(PatchOp::Uninstall, err);
                }
            }

            if let Err(err) = self.engine.destroy(hook) {
                self.engine_failure(PatchOp::Destroy, err);
            }
        }

        self.registry.unregister(self.id);
        self.set_state(DetourState::Freed);
    }

    fn original(&self) -> DetourResult<F> {
        let state = self.state();
        if state == DetourState::Freed {
            return Err(self.freed());
        }
        if !state.has_original() {
            return Err(self.not_prepared());
        }

        match self.original.get() {
            Some(original) => Ok(unsafe { original.as_fn()? }),
            None => Err(self.not_prepared()),
        }
    }
}

impl<F: DetourFn, E: PatchEngine> ErasedDetour for DetourShared<F, E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> DetourState {
        DetourShared::state(self)
    }

    fn enable(&self) -> DetourResult<()> {
        DetourShared::enable(self)
    }

    fn disable(&self) -> DetourResult<()> {
        DetourShared::disable(self)
    }

    fn free(&self) {
        DetourShared::free(self)
    }
}

impl<F: DetourFn, E: PatchEngine> fmt::Debug for DetourShared<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detour")
            .field("name", &self.name)
            .field("state", &self.state())
            .field(
                "original",
                &self.original.get().map(|original| original.as_raw_ptr()),
            )
            .finish()
    }
}
