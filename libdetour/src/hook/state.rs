use std::fmt;

/// Lifecycle of a detour handle.
///
/// ```text
/// Created --create--> Resolved --prepare--> Prepared --enable--> Installed
///                                              ^                  |
///                                              |               disable
///                                              |                  v
///                                              +----enable---- Disabled
/// any non-Freed state --free--> Freed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DetourState {
    Created = 0,
    Resolved = 1,
    Prepared = 2,
    Installed = 3,
    Disabled = 4,
    Freed = 5,
}

impl DetourState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Resolved,
            2 => Self::Prepared,
            3 => Self::Installed,
            4 => Self::Disabled,
            _ => Self::Freed,
        }
    }

    /// States a registered handle may be in
    pub fn is_registered(self) -> bool {
        matches!(self, Self::Prepared | Self::Installed | Self::Disabled)
    }

    /// Whether the trampoline to the original exists and may be called
    pub fn has_original(self) -> bool {
        self.is_registered()
    }
}

impl fmt::Display for DetourState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Resolved => "resolved",
            Self::Prepared => "prepared",
            Self::Installed => "installed",
            Self::Disabled => "disabled",
            Self::Freed => "freed",
        };

        f.write_str(name)
    }
}
