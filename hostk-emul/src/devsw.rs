//! Block and character device switch tables
//!
//! The tables only record which driver owns which major number. The driver
//! entry points themselves belong to the device framework.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use hostk_api::error::{self, Result};
use spin::Mutex;

/// Number of majors per table
pub const MAX_DEVSW: usize = 255;

/// Which switch a table represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevswKind {
    Block,
    Char,
}

/// One attached driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevswEntry {
    pub name: String,
    pub major: u32,
}

struct Inner {
    slots: Vec<Option<DevswEntry>>,
    by_name: HashMap<String, u32>,
}

/// Append-only device switch table
pub struct DevswTable {
    kind: DevswKind,
    inner: Mutex<Inner>,
}

impl DevswTable {
    pub fn new(kind: DevswKind) -> Self {
        let mut slots = Vec::with_capacity(MAX_DEVSW);
        slots.resize(MAX_DEVSW, None);
        Self {
            kind,
            inner: Mutex::new(Inner {
                slots,
                by_name: HashMap::new(),
            }),
        }
    }

    pub fn kind(&self) -> DevswKind {
        self.kind
    }

    /// Attaches `name` at `major`, or at the first free major if `None`.
    ///
    /// Returns the major used. Occupied majors and duplicate names are
    /// rejected; entries are never removed.
    pub fn attach(&self, name: &str, major: Option<u32>) -> Result<u32> {
        let mut inner = self.inner.lock();
        if inner.by_name.contains_key(name) {
            return Err(error::busy("driver name already attached"));
        }
        let major = match major {
            Some(m) => {
                let slot = inner
                    .slots
                    .get(m as usize)
                    .ok_or_else(|| error::invalid_argument("major out of range"))?;
                if slot.is_some() {
                    return Err(error::busy("major already attached"));
                }
                m
            }
            None => inner
                .slots
                .iter()
                .position(Option::is_none)
                .ok_or_else(|| error::busy("device switch table full"))? as u32,
        };
        inner.slots[major as usize] = Some(DevswEntry {
            name: name.to_string(),
            major,
        });
        inner.by_name.insert(name.to_string(), major);
        Ok(major)
    }

    pub fn lookup(&self, major: u32) -> Option<DevswEntry> {
        self.inner.lock().slots.get(major as usize).cloned().flatten()
    }

    pub fn major_by_name(&self, name: &str) -> Option<u32> {
        self.inner.lock().by_name.get(name).copied()
    }

    /// Number of attached drivers
    pub fn len(&self) -> usize {
        self.inner.lock().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
