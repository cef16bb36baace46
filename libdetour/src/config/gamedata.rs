//! Gamedata: per-platform signatures and offsets for a host build.
//!
//! ```json
//! {
//!   "Signatures": {
//!     "UTIL_Remove": {
//!       "library": "server",
//!       "windows": "48 85 C9 74 ? 48 8B D1",
//!       "linux": "55 48 89 E5 41 54 49 89 FC"
//!     }
//!   },
//!   "Offsets": {
//!     "Teleport": { "windows": 148, "linux": 147 }
//!   }
//! }
//! ```

use std::{collections::HashMap, fs, path::Path, ptr::NonNull};

use libc::c_void;
use parking_lot::Mutex;
use serde::Deserialize;

use super::{ConfigError, ConfigResult, SignatureResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureEntry {
    pub library: String,
    #[serde(default)]
    pub windows: Option<String>,
    #[serde(default)]
    pub linux: Option<String>,
}

impl SignatureEntry {
    pub fn pattern(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Windows => self.windows.as_deref(),
            Platform::Linux => self.linux.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OffsetEntry {
    #[serde(default)]
    pub windows: Option<i32>,
    #[serde(default)]
    pub linux: Option<i32>,
}

impl OffsetEntry {
    pub fn value(&self, platform: Platform) -> Option<i32> {
        match platform {
            Platform::Windows => self.windows,
            Platform::Linux => self.linux,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gamedata {
    #[serde(rename = "Signatures", default)]
    pub signatures: HashMap<String, SignatureEntry>,

    #[serde(rename = "Offsets", default)]
    pub offsets: HashMap<String, OffsetEntry>,
}

impl Gamedata {
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text)
    }
}

/// External pattern scanner: compiles `pattern` and searches it inside the
/// loaded module named `library`.
pub trait SignatureScanner: Send + Sync {
    fn find_pattern(&self, library: &str, pattern: &str) -> Option<NonNull<c_void>>;
}

/// Configuration context backed by gamedata and a module scanner
pub struct GameConfig<S: SignatureScanner> {
    gamedata: Gamedata,
    platform: Platform,
    scanner: S,
    resolved: Mutex<HashMap<String, usize>>,
}

impl<S: SignatureScanner> GameConfig<S> {
    pub fn new(gamedata: Gamedata, scanner: S) -> Self {
        Self::for_platform(gamedata, scanner, Platform::current())
    }

    pub fn for_platform(gamedata: Gamedata, scanner: S, platform: Platform) -> Self {
        log::debug!(
            "Gamedata loaded: {} signatures, {} offsets ({:?})",
            gamedata.signatures.len(),
            gamedata.offsets.len(),
            platform
        );

        Self {
            gamedata,
            platform,
            scanner,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn load(path: impl AsRef<Path>, scanner: S) -> ConfigResult<Self> {
        Ok(Self::new(Gamedata::load(path)?, scanner))
    }

    pub fn gamedata(&self) -> &Gamedata {
        &self.gamedata
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn signature(&self, name: &str) -> Option<&str> {
        self.gamedata.signatures.get(name)?.pattern(self.platform)
    }

    pub fn offset(&self, name: &str) -> Option<i32> {
        self.gamedata.offsets.get(name)?.value(self.platform)
    }
}

impl<S: SignatureScanner> SignatureResolver for GameConfig<S> {
    fn resolve_signature(&self, name: &str) -> Option<NonNull<c_void>> {
        if let Some(addr) = self.resolved.lock().get(name) {
            return NonNull::new(*addr as *mut c_void);
        }

        let Some(entry) = self.gamedata.signatures.get(name) else {
            log::warn!("Missing signature entry for {}", name);
            return None;
        };

        let Some(pattern) = entry.pattern(self.platform) else {
            log::warn!("Signature {} has no pattern for {:?}", name, self.platform);
            return None;
        };

        let Some(addr) = self.scanner.find_pattern(&entry.library, pattern) else {
            log::warn!("Failed to find signature for {} in {}", name, entry.library);
            return None;
        };

        log::debug!("Found {} in {} at {:p}", name, entry.library, addr.as_ptr());

        self.resolved
            .lock()
            .insert(name.to_owned(), addr.as_ptr() as usize);

        Some(addr)
    }

    fn library_for(&self, name: &str) -> Option<String> {
        self.gamedata
            .signatures
            .get(name)
            .map(|entry| entry.library.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    const GAMEDATA: &str = r#"{
        "Signatures": {
            "UTIL_Remove": {
                "library": "server",
                "windows": "48 85 C9 74 ?",
                "linux": "55 48 89 E5"
            },
            "WindowsOnly": {
                "library": "engine2",
                "windows": "CC CC"
            }
        },
        "Offsets": {
            "Teleport": { "windows": 148, "linux": 147 }
        }
    }"#;

    #[derive(Default)]
    struct CountingScanner {
        scans: AtomicUsize,
    }

    impl SignatureScanner for CountingScanner {
        fn find_pattern(&self, library: &str, pattern: &str) -> Option<NonNull<c_void>> {
            self.scans.fetch_add(1, Ordering::SeqCst);

            match (library, pattern) {
                ("server", "55 48 89 E5") => NonNull::new(0x1000 as *mut c_void),
                ("server", "48 85 C9 74 ?") => NonNull::new(0x2000 as *mut c_void),
                _ => None,
            }
        }
    }

    #[test]
    fn test_parse_gamedata() {
        let gamedata = Gamedata::from_json(GAMEDATA).unwrap();

        assert_eq!(gamedata.signatures.len(), 2);
        assert_eq!(
            gamedata.signatures["UTIL_Remove"].pattern(Platform::Linux),
            Some("55 48 89 E5")
        );
        assert_eq!(gamedata.offsets["Teleport"].value(Platform::Windows), Some(148));
    }

    #[test]
    fn test_resolve_caches_hits() {
        let config = GameConfig::for_platform(
            Gamedata::from_json(GAMEDATA).unwrap(),
            CountingScanner::default(),
            Platform::Linux,
        );

        let first = config.resolve_signature("UTIL_Remove").unwrap();
        let second = config.resolve_signature("UTIL_Remove").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_ptr() as usize, 0x1000);
        assert_eq!(config.scanner.scans.load(Ordering::SeqCst), 1);
        assert_eq!(config.library_for("UTIL_Remove").as_deref(), Some("server"));
    }

    #[test]
    fn test_platform_selects_pattern() {
        let config = GameConfig::for_platform(
            Gamedata::from_json(GAMEDATA).unwrap(),
            CountingScanner::default(),
            Platform::Windows,
        );

        assert_eq!(
            config.resolve_signature("UTIL_Remove").map(|p| p.as_ptr() as usize),
            Some(0x2000)
        );
        assert_eq!(config.offset("Teleport"), Some(148));
    }

    #[test]
    fn test_missing_entries_resolve_to_none() {
        let config = GameConfig::for_platform(
            Gamedata::from_json(GAMEDATA).unwrap(),
            CountingScanner::default(),
            Platform::Linux,
        );

        assert!(config.resolve_signature("Nope").is_none());
        assert!(config.resolve_signature("WindowsOnly").is_none());
        assert_eq!(config.scanner.scans.load(Ordering::SeqCst), 0);
        assert_eq!(config.offset("Nope"), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GAMEDATA.as_bytes()).unwrap();

        let config = GameConfig::load(file.path(), CountingScanner::default()).unwrap();
        assert!(config.signature("UTIL_Remove").is_some());
    }

    #[test]
    fn test_load_errors() {
        let missing = Gamedata::load("/nonexistent/gamedata.json");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let broken = Gamedata::from_json("{ not json");
        assert!(matches!(broken, Err(ConfigError::Parse(_))));
    }
}
