//! Component masks: which optional parts of an object are loaded or replaced.
//!
//! Every object has an implicit base component (identity, vtag, timestamps).
//! Fields, files and metadata are optional and selected per call. The same
//! mask governs reads (what is populated) and writes (what is replaced).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bitset of object components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Components(u8);

impl Components {
    /// Identity only; always implied.
    pub const BASE: Self = Self(0);
    /// Descriptive name/value fields.
    pub const FIELDS: Self = Self(1);
    /// Attached file blobs.
    pub const FILES: Self = Self(1 << 1);
    /// Technical metadata blob.
    pub const METADATA: Self = Self(1 << 2);
    /// Every component.
    pub const ALL: Self = Self(Self::FIELDS.0 | Self::FILES.0 | Self::METADATA.0);

    /// Decodes a caller-supplied attribute hint.
    ///
    /// `"all"` short-circuits to [`Components::ALL`]. Otherwise the result
    /// starts from [`Components::BASE`] and gains each component whose token
    /// appears anywhere in the hint, so `"fields,files"` and `"fieldsfiles"`
    /// decode identically. Unknown tokens are ignored.
    #[must_use]
    pub fn decode(hint: &str) -> Self {
        if hint == "all" {
            return Self::ALL;
        }

        let mut components = Self::BASE;
        if hint.contains("fields") {
            components |= Self::FIELDS;
        }
        if hint.contains("files") {
            components |= Self::FILES;
        }
        if hint.contains("metadata") {
            components |= Self::METADATA;
        }
        components
    }

    /// Returns `true` if every component in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if only the base component is selected.
    #[must_use]
    pub const fn is_base_only(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Components {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Components {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec!["base"];
        if self.contains(Self::FIELDS) {
            parts.push("fields");
        }
        if self.contains(Self::FILES) {
            parts.push("files");
        }
        if self.contains(Self::METADATA) {
            parts.push("metadata");
        }
        f.write_str(&parts.join("+"))
    }
}
