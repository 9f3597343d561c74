//! Object model shared by the backend contract and the HTTP surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::Components;

/// Descriptive name/value fields. Also used as a search query.
///
/// Uses `BTreeMap` for deterministic serialization order.
pub type ObjectFields = BTreeMap<String, String>;

/// A named binary attachment (file) or the technical metadata blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectBlob {
    /// Blob name, unique among an object's files.
    pub name: String,
    /// MIME type of the payload.
    #[serde(default)]
    pub mimetype: String,
    /// Raw payload, carried as standard base64 in JSON.
    #[serde(default, with = "base64_payload")]
    pub payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ObjectBlob {
    /// Creates a blob without timestamps; the backend stamps them on write.
    #[must_use]
    pub fn new(name: impl Into<String>, mimetype: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mimetype: mimetype.into(),
            payload,
            created: None,
            modified: None,
        }
    }
}

/// A stored object: base identity plus optional components.
///
/// Absent components are `None` and omitted from JSON. Whether a component
/// is absent because it was not requested or because it is empty is decided
/// by the [`Components`] mask used for the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasyStoreObject {
    /// Namespace the object lives in.
    pub ns: String,
    /// Identifier, unique within the namespace.
    #[serde(default)]
    pub id: String,
    /// Opaque version token, replaced on every successful mutation.
    #[serde(default)]
    pub vtag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<ObjectFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<ObjectBlob>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectBlob>,
}

impl EasyStoreObject {
    /// Creates an empty object in `ns` with a freshly minted identifier.
    #[must_use]
    pub fn new(ns: impl Into<String>) -> Self {
        Self::proxy(ns, new_object_id(), "")
    }

    /// Builds a base-only reference to an existing object, e.g. for delete.
    #[must_use]
    pub fn proxy(ns: impl Into<String>, id: impl Into<String>, vtag: impl Into<String>) -> Self {
        Self {
            ns: ns.into(),
            id: id.into(),
            vtag: vtag.into(),
            created: None,
            modified: None,
            fields: None,
            files: None,
            metadata: None,
        }
    }

    /// Builder-style setter for fields.
    #[must_use]
    pub fn with_fields(mut self, fields: ObjectFields) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Builder-style setter for files.
    #[must_use]
    pub fn with_files(mut self, files: Vec<ObjectBlob>) -> Self {
        self.files = Some(files);
        self
    }

    /// Builder-style setter for the metadata blob.
    #[must_use]
    pub fn with_metadata(mut self, metadata: ObjectBlob) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Strips every optional component not selected by `components`.
    #[must_use]
    pub fn project(mut self, components: Components) -> Self {
        if !components.contains(Components::FIELDS) {
            self.fields = None;
        }
        if !components.contains(Components::FILES) {
            self.files = None;
        }
        if !components.contains(Components::METADATA) {
            self.metadata = None;
        }
        self
    }

    /// The components this object currently carries.
    #[must_use]
    pub fn components(&self) -> Components {
        let mut c = Components::BASE;
        if self.fields.is_some() {
            c |= Components::FIELDS;
        }
        if self.files.is_some() {
            c |= Components::FILES;
        }
        if self.metadata.is_some() {
            c |= Components::METADATA;
        }
        c
    }
}

/// Mints a new object identifier.
#[must_use]
pub fn new_object_id() -> String {
    format!("oid:{}", uuid::Uuid::new_v4().simple())
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
