//! Id-set metadata codec
//!
//! The persisted index store only supports scalar metadata columns, so a
//! group's id set rides along as a single string: sorted ascending,
//! comma-separated decimal. `decode(encode(s)) == s` for every id set.

use crate::error::{IprepError, Result};

/// Encode an id set as a canonical sorted comma-joined decimal string.
#[must_use]
pub fn encode_ids(ids: &[i64]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let parts: Vec<String> = sorted.iter().map(i64::to_string).collect();
    parts.join(",")
}

/// Decode a comma-joined decimal id string back into a sorted id list.
pub fn decode_ids(encoded: &str) -> Result<Vec<i64>> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    encoded
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|err| IprepError::InvalidIdList(format!("'{part}': {err}")))
        })
        .collect()
}
