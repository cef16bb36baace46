use std::fmt;

use thiserror::Error;

/// Numeric status reported by a patch engine.
///
/// Zero means success and never appears inside an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EngineErrorCode {
    Internal = -1,
    OutOfMemory = 1,
    AlreadyInstalled = 2,
    Disassembly = 3,
    MemoryAllocation = 8,
    MemoryProtection = 9,
    NotInstalled = 10,
    NotPrepared = 12,
    AlreadyPrepared = 13,
    Backend = 14,
}

impl EngineErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Failure of a single engine primitive: status code plus the engine's own message
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code} {message}")]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_prepared() -> Self {
        Self::new(EngineErrorCode::NotPrepared, "hook object is not prepared")
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code_and_message() {
        let err = EngineError::new(EngineErrorCode::MemoryProtection, "mprotect failed");
        assert_eq!(err.to_string(), "9 mprotect failed");
    }
}
