use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::storage::{FieldValue, Item};

use super::CursorError;

/// Opaque continuation token pointing just past the last item of a page.
///
/// Application code should only ever copy a cursor out of a `Page` into the
/// next `PageRequest`. It is meaningless outside the store and table that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Encodes a store key into a cursor. For store client implementations.
    pub fn encode(key: &Item) -> Result<Self, CursorError> {
        let ordered: BTreeMap<&String, &FieldValue> = key.iter().collect();
        let json =
            serde_json::to_vec(&ordered).map_err(|e| CursorError::Payload(e.to_string()))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decodes the store key held by the cursor. For store client implementations.
    pub fn decode(&self) -> Result<Item, CursorError> {
        let json = URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| CursorError::Payload(e.to_string()))
    }

    /// The token as handed to clients.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}
