//! Record codec
//!
//! Every payload crosses the storage boundary as JSON text. Encoding happens
//! on write and may fail the write; decoding happens on read and never fails
//! the read: a malformed payload is logged and reported as absent.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Encode a value to its stored JSON text
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Codec(e.to_string()))
}

/// Decode stored JSON text, treating malformed payloads as absent
pub fn decode<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed stored payload");
            None
        }
    }
}

/// Decode `(key, payload)` rows into a map, skipping malformed rows
pub fn decode_map<T, I>(rows: I) -> HashMap<String, T>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    rows.into_iter()
        .filter_map(|(key, text)| decode(&text).map(|value| (key, value)))
        .collect()
}
