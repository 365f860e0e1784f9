//! Store-side row and outcome types. Pets, applications and posts decode
//! straight into `furever-types` models; users stay loosely typed because
//! profile updates may add arbitrary fields.

use serde_json::{Map, Value};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub doc: Map<String, Value>,
    pub created_at: String,
}

impl UserRow {
    /// Field lookup with document semantics: a missing key reads as null.
    pub fn field(&self, key: &str) -> Value {
        self.doc.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.doc.get("password").and_then(Value::as_str)
    }
}

/// Result of the guarded adoption insert. Only `Submitted` writes a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdoptionOutcome {
    Submitted { pet_name: String },
    UnknownApplicant,
    UnknownPet,
    OwnPet,
}
