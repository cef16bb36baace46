pub mod errors;
pub mod gamedata;
pub mod resolver;

pub use errors::{ConfigError, ConfigResult};
pub use gamedata::{GameConfig, Gamedata, OffsetEntry, Platform, SignatureEntry, SignatureScanner};
pub use resolver::{AddressTable, SignatureResolver};
