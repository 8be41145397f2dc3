// Bincode 2.x helpers used by the sled log and the keyring file
use crate::error::{LedgerError, Result};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| LedgerError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
    struct KeyEntry {
        name: String,
        material: Vec<u8>,
        tags: BTreeMap<String, String>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut tags = BTreeMap::new();
        tags.insert("role".to_string(), "signer".to_string());
        let original = KeyEntry {
            name: "front-desk".to_string(),
            material: vec![1, 2, 3, 4, 5],
            tags,
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: KeyEntry =
            deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<KeyEntry> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
