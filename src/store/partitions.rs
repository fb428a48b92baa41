/// Key layout for the record partitions
///
/// Partition structure:
/// - one partition per entity, named after its table:
///   rec:{id} -> record (JSON), integer ids zero padded so keys sort numerically
/// - `metadata`: seq:{table} -> last allocated integer id (decimal string)
use serde_json::Value;

use super::error::{Result, StoreError};

/// Encode a record key: rec:{id:020} for integer ids, rec:{uuid} otherwise
pub fn encode_record_key(id: &Value) -> Result<Vec<u8>> {
    match id {
        Value::Number(n) => n
            .as_u64()
            .map(|n| format!("rec:{:020}", n).into_bytes())
            .ok_or_else(|| StoreError::InvalidKey(n.to_string())),
        Value::String(s) if !s.is_empty() => Ok(format!("rec:{}", s).into_bytes()),
        other => Err(StoreError::InvalidKey(other.to_string())),
    }
}

/// Decode a record key back into its id text
pub fn decode_record_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    let id = key_str.strip_prefix("rec:")?;
    if id.len() == 20 && id.bytes().all(|b| b.is_ascii_digit()) {
        return id.parse::<u64>().ok().map(|n| n.to_string());
    }
    Some(id.to_string())
}

/// Encode a sequence key: seq:{table}
pub fn encode_seq_key(table: &str) -> Vec<u8> {
    format!("seq:{}", table).into_bytes()
}
