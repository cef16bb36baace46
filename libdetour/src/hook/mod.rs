pub mod detour;
pub mod errors;
pub mod registry;
pub mod state;
pub mod traits;

mod macros;

pub use detour::Detour;
pub use errors::DetourError;
pub use registry::{DetourId, DetourRegistry, flush_all_detours};
pub use state::DetourState;
pub use traits::{DetourFn, ErasedDetour};

pub type DetourResult<T> = std::result::Result<T, DetourError>;
