use std::{collections::HashMap, ptr::NonNull};

use libc::c_void;

/// Configuration context a detour resolves its target through.
///
/// The name passed in is the detour's stable name. `None` means the
/// signature is unknown or could not be found in the loaded module.
pub trait SignatureResolver {
    fn resolve_signature(&self, name: &str) -> Option<NonNull<c_void>>;

    /// Module the named function lives in (diagnostics only)
    fn library_for(&self, _name: &str) -> Option<String> {
        None
    }
}

impl<R: SignatureResolver + ?Sized> SignatureResolver for &R {
    fn resolve_signature(&self, name: &str) -> Option<NonNull<c_void>> {
        (**self).resolve_signature(name)
    }

    fn library_for(&self, name: &str) -> Option<String> {
        (**self).library_for(name)
    }
}

#[derive(Debug, Clone)]
struct TableEntry {
    address: usize,
    library: Option<String>,
}

/// Resolver over a fixed table of known addresses.
///
/// Useful when a build of the host is pinned and its addresses are known
/// ahead of time, and for driving detours against local functions.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    entries: HashMap<String, TableEntry>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, address: *const c_void) -> &mut Self {
        self.entries.insert(
            name.into(),
            TableEntry {
                address: address as usize,
                library: None,
            },
        );
        self
    }

    pub fn insert_in(
        &mut self,
        library: impl Into<String>,
        name: impl Into<String>,
        address: *const c_void,
    ) -> &mut Self {
        self.entries.insert(
            name.into(),
            TableEntry {
                address: address as usize,
                library: Some(library.into()),
            },
        );
        self
    }

    pub fn with(mut self, name: impl Into<String>, address: *const c_void) -> Self {
        self.insert(name, address);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SignatureResolver for AddressTable {
    fn resolve_signature(&self, name: &str) -> Option<NonNull<c_void>> {
        self.entries
            .get(name)
            .and_then(|entry| NonNull::new(entry.address as *mut c_void))
    }

    fn library_for(&self, name: &str) -> Option<String> {
        self.entries.get(name).and_then(|entry| entry.library.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let mut table = AddressTable::new();
        table
            .insert("Foo", 0x1000 as *const c_void)
            .insert_in("server", "Bar", 0x2000 as *const c_void);

        assert_eq!(
            table.resolve_signature("Foo").map(|p| p.as_ptr() as usize),
            Some(0x1000)
        );
        assert_eq!(table.library_for("Foo"), None);
        assert_eq!(table.library_for("Bar").as_deref(), Some("server"));
        assert!(table.resolve_signature("Baz").is_none());
    }

    #[test]
    fn test_null_address_does_not_resolve() {
        let table = AddressTable::new().with("Null", std::ptr::null());
        assert!(table.resolve_signature("Null").is_none());
    }
}
