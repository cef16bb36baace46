use thiserror::Error;

use crate::{common::helpers::PatchOp, engine::EngineError, ffi::fnptr::FnPtrError};

#[derive(Debug, Error)]
pub enum DetourError {
    #[error("Signature for detour '{name}' could not be resolved")]
    ResolutionFailure { name: String },

    #[error("Patch engine failed to {op} detour '{name}': {source}")]
    PatchEngine {
        name: String,
        op: PatchOp,
        #[source]
        source: EngineError,
    },

    #[error("Detour '{name}' is not prepared")]
    NotPrepared { name: String },

    #[error("Detour '{name}' is already prepared")]
    AlreadyPrepared { name: String },

    #[error("Detour '{name}' has been freed")]
    Freed { name: String },

    #[error("FnPtr error: {0}")]
    FnPtr(#[from] FnPtrError),
}

impl DetourError {
    /// Whether repeating the same call later can succeed.
    ///
    /// Resolution and install/uninstall failures leave the handle in its
    /// previous state. Everything else is a misuse or a terminal condition.
    pub fn is_retryable(&self) -> bool {
        match self {
            DetourError::ResolutionFailure { .. } => true,
            DetourError::PatchEngine { op, .. } => matches!(
                op,
                PatchOp::Create | PatchOp::Prepare | PatchOp::Install | PatchOp::Uninstall
            ),
            _ => false,
        }
    }

    /// Name of the detour the error belongs to, when it carries one
    pub fn detour_name(&self) -> Option<&str> {
        match self {
            DetourError::ResolutionFailure { name }
            | DetourError::PatchEngine { name, .. }
            | DetourError::NotPrepared { name }
            | DetourError::AlreadyPrepared { name }
            | DetourError::Freed { name } => Some(name),
            DetourError::FnPtr(_) => None,
        }
    }
}
