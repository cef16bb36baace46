use std::fmt;

use libc::c_void;

use crate::engine::EngineError;

/// Engine primitive a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Create,
    Prepare,
    Install,
    Uninstall,
    Destroy,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchOp::Create => "create",
            PatchOp::Prepare => "prepare",
            PatchOp::Install => "install",
            PatchOp::Uninstall => "uninstall",
            PatchOp::Destroy => "destroy",
        };

        f.write_str(name)
    }
}

/// Return engine failure as a single log line
/// Example: install error for UTIL_Remove: 9 mprotect failed
pub fn format_engine_failure(op: PatchOp, name: &str, err: &EngineError) -> String {
    format!("{} error for {}: {} {}", op, name, err.code, err.message)
}

/// Return address in fixed-width hex
/// Example: 0x00007f12a4c01230
pub fn format_address(addr: *const c_void) -> String {
    format!("{:#0width$x}", addr as usize, width = 2 + 2 * size_of::<usize>())
}
