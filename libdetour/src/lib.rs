//! libdetour
//! Named, registry-tracked function detours for plugin development.
//!
//! A detour is declared once with [`declare_detour!`], resolved and prepared
//! against a [`config::SignatureResolver`], then toggled with
//! `enable`/`disable`. [`flush_all_detours`] tears down every live detour on
//! plugin unload.

// Currently we can support only x86/x86_64 architectures
#[cfg(not(any(target_arch = "x86_64", target_arch = "x86")))]
compile_error!("Unsupported architecture - only x86/x64 supported");

pub mod common;
pub mod config;
pub mod engine;
pub mod ffi;
pub mod hook;

pub use hook::{Detour, DetourError, DetourResult, DetourState, flush_all_detours};
