//! Canonical block encoding and hashing
//!
//! A block is hashed over a compact JSON object whose keys are sorted at every
//! level: `data`, `index`, `nonce` (only when present), `previous_hash`,
//! `timestamp`. The block's own `hash` is never part of the encoding.

use crate::core::Payload;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use serde_json::{Map, Value};

/// Field names a `Record` may not use
pub const RESERVED_FIELDS: [&str; 3] = ["kind", "signature", "public_key"];

/// Default upper bound on the encoded payload size
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Rebuilds every object with its keys in ascending order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Canonical JSON form of a payload
pub fn payload_value(data: &Payload) -> Result<Value> {
    let value = serde_json::to_value(data)
        .map_err(|e| LedgerError::Encoding(format!("payload cannot be serialized: {e}")))?;
    Ok(canonicalize(value))
}

/// Rejects payloads that cannot be encoded unambiguously or are too large
pub fn check_payload(data: &Payload, max_payload_bytes: usize) -> Result<()> {
    if let Payload::Record(record) = data {
        if record.fields.is_empty() {
            return Err(LedgerError::Encoding("record has no fields".to_string()));
        }
        for key in record.fields.keys() {
            if key.is_empty() {
                return Err(LedgerError::Encoding(
                    "record field names must not be empty".to_string(),
                ));
            }
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(LedgerError::Encoding(format!(
                    "record field name '{key}' is reserved"
                )));
            }
        }
    }

    if data.signature().is_some() {
        if let Some(field) = data.ambiguous_field() {
            return Err(LedgerError::Encoding(format!(
                "signed field '{field}' contains a signing separator"
            )));
        }
    }

    let encoded = serde_json::to_vec(&payload_value(data)?)
        .map_err(|e| LedgerError::Encoding(format!("payload cannot be serialized: {e}")))?;
    if encoded.len() > max_payload_bytes {
        return Err(LedgerError::Encoding(format!(
            "payload is {} bytes, limit is {max_payload_bytes}",
            encoded.len()
        )));
    }
    Ok(())
}

/// Canonical bytes of every block field except `hash`
pub fn canonical_bytes(
    index: u64,
    timestamp: i64,
    data: &Payload,
    previous_hash: &str,
    nonce: Option<u64>,
) -> Result<Vec<u8>> {
    let mut map = Map::new();
    map.insert("data".to_string(), payload_value(data)?);
    map.insert("index".to_string(), Value::from(index));
    if let Some(nonce) = nonce {
        map.insert("nonce".to_string(), Value::from(nonce));
    }
    map.insert(
        "previous_hash".to_string(),
        Value::from(previous_hash.to_string()),
    );
    map.insert("timestamp".to_string(), Value::from(timestamp));

    serde_json::to_vec(&canonicalize(Value::Object(map)))
        .map_err(|e| LedgerError::Encoding(format!("block cannot be serialized: {e}")))
}

/// SHA-256 digest, lowercase hex
pub fn hash_hex(bytes: &[u8]) -> String {
    HEXLOWER.encode(&sha256_digest(bytes))
}

pub fn compute_hash(
    index: u64,
    timestamp: i64,
    data: &Payload,
    previous_hash: &str,
    nonce: Option<u64>,
) -> Result<String> {
    let bytes = canonical_bytes(index, timestamp, data, previous_hash, nonce)?;
    Ok(hash_hex(&bytes))
}

/// Pre-split canonical encoding around the nonce value.
///
/// `head + nonce + tail` is byte-identical to `canonical_bytes(.., Some(nonce))`,
/// which lets the miner skip re-serializing the payload on every attempt.
#[derive(Debug, Clone)]
pub struct NonceTemplate {
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl NonceTemplate {
    pub fn new(index: u64, timestamp: i64, data: &Payload, previous_hash: &str) -> Result<Self> {
        let data_bytes = serde_json::to_vec(&payload_value(data)?)
            .map_err(|e| LedgerError::Encoding(format!("payload cannot be serialized: {e}")))?;
        let previous_bytes = serde_json::to_vec(previous_hash)
            .map_err(|e| LedgerError::Encoding(format!("hash cannot be serialized: {e}")))?;

        let mut head = Vec::with_capacity(data_bytes.len() + 48);
        head.extend_from_slice(b"{\"data\":");
        head.extend_from_slice(&data_bytes);
        head.extend_from_slice(b",\"index\":");
        head.extend_from_slice(index.to_string().as_bytes());
        head.extend_from_slice(b",\"nonce\":");

        let mut tail = Vec::with_capacity(previous_bytes.len() + 48);
        tail.extend_from_slice(b",\"previous_hash\":");
        tail.extend_from_slice(&previous_bytes);
        tail.extend_from_slice(b",\"timestamp\":");
        tail.extend_from_slice(timestamp.to_string().as_bytes());
        tail.push(b'}');

        Ok(NonceTemplate { head, tail })
    }

    pub fn bytes_with(&self, nonce: u64) -> Vec<u8> {
        let nonce = nonce.to_string();
        let mut bytes = Vec::with_capacity(self.head.len() + nonce.len() + self.tail.len());
        bytes.extend_from_slice(&self.head);
        bytes.extend_from_slice(nonce.as_bytes());
        bytes.extend_from_slice(&self.tail);
        bytes
    }

    pub fn hash_with(&self, nonce: u64) -> String {
        hash_hex(&self.bytes_with(nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, Transfer};

    fn hello_record() -> Payload {
        Payload::Record(Record::from_pairs([("msg", "hello")]))
    }

    #[test]
    fn test_canonical_bytes_sorted_and_without_hash() {
        let bytes = canonical_bytes(1, 1_700_000_000_000, &hello_record(), "abc", None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            r#"{"data":{"fields":{"msg":"hello"},"kind":"record"},"index":1,"previous_hash":"abc","timestamp":1700000000000}"#
        );
        assert!(!text.contains("\"hash\""));
    }

    #[test]
    fn test_nonce_only_present_when_given() {
        let with = canonical_bytes(1, 5, &hello_record(), "abc", Some(42)).unwrap();
        let text = String::from_utf8(with).unwrap();
        assert!(text.contains(r#""index":1,"nonce":42,"previous_hash""#));
    }

    #[test]
    fn test_encoding_is_independent_of_insertion_order() {
        let a = Payload::Record(Record::from_pairs([("b", "2"), ("a", "1")]));
        let b = Payload::Record(Record::from_pairs([("a", "1"), ("b", "2")]));
        assert_eq!(
            canonical_bytes(0, 0, &a, "0", None).unwrap(),
            canonical_bytes(0, 0, &b, "0", None).unwrap()
        );
    }

    #[test]
    fn test_hash_is_deterministic_hex() {
        let h1 = compute_hash(3, 99, &hello_record(), "ff", None).unwrap();
        let h2 = compute_hash(3, 99, &hello_record(), "ff", None).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let other = compute_hash(4, 99, &hello_record(), "ff", None).unwrap();
        assert_ne!(h1, other);
    }

    #[test]
    fn test_nonce_template_matches_canonical_bytes() {
        let data = Payload::Transfer(Transfer {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 10,
            signature: Some("beef".to_string()),
            public_key: Some("04ab".to_string()),
        });
        let template = NonceTemplate::new(7, -12, &data, "prev\"quoted").unwrap();
        for nonce in [0u64, 1, 99, u64::MAX] {
            assert_eq!(
                template.bytes_with(nonce),
                canonical_bytes(7, -12, &data, "prev\"quoted", Some(nonce)).unwrap()
            );
        }
    }

    #[test]
    fn test_reserved_record_fields_rejected() {
        let payload = Payload::Record(Record::from_pairs([("signature", "x")]));
        assert!(matches!(
            check_payload(&payload, DEFAULT_MAX_PAYLOAD_BYTES),
            Err(LedgerError::Encoding(_))
        ));

        let empty_key = Payload::Record(Record::from_pairs([("", "x")]));
        assert!(check_payload(&empty_key, DEFAULT_MAX_PAYLOAD_BYTES).is_err());

        let empty = Payload::Record(Record::default());
        assert!(check_payload(&empty, DEFAULT_MAX_PAYLOAD_BYTES).is_err());
    }

    #[test]
    fn test_signed_payload_with_separator_rejected() {
        let mut signed = Record::from_pairs([("a", "1|b=2")]);
        let unsigned = Payload::Record(signed.clone());
        assert!(check_payload(&unsigned, DEFAULT_MAX_PAYLOAD_BYTES).is_ok());

        signed.signature = Some("00".to_string());
        signed.public_key = Some("04".to_string());
        assert!(matches!(
            check_payload(&Payload::Record(signed), DEFAULT_MAX_PAYLOAD_BYTES),
            Err(LedgerError::Encoding(_))
        ));

        let transfer = Payload::Transfer(Transfer {
            from: "a".to_string(),
            to: "b|c".to_string(),
            amount: 1,
            signature: Some("00".to_string()),
            public_key: Some("04".to_string()),
        });
        assert!(check_payload(&transfer, DEFAULT_MAX_PAYLOAD_BYTES).is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = Payload::Record(Record::from_pairs([("blob", "x".repeat(200))]));
        assert!(check_payload(&payload, 100).is_err());
        assert!(check_payload(&payload, 1_000).is_ok());
    }
}
