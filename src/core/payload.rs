//! Typed block payloads
//!
//! Producers hand the ledger one of a small set of known record kinds instead
//! of an arbitrary dictionary, so the canonical encoding stays well defined.
//! Every kind except the genesis record may carry a hex `signature` and
//! `public_key` over its signing message.

use crate::wallet::{verify_hex, Verification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message stored in every genesis block
pub const GENESIS_MESSAGE: &str = "GENESIS BLOCK";

/// Separator between fields of a signing message
pub const FIELD_SEPARATOR: &str = "|";

/// Separator between a record key and its value in a signing message
pub const PAIR_SEPARATOR: &str = "=";

/// A parking reservation submitted through the reservation form
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Reservation {
    pub first: String,
    pub last: String,
    pub plate: String,
    pub make: String,
    pub model: String,
    pub spot: String,
    pub pickup: String,
    pub dropoff: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// A value transfer recorded by the wallet/miner front end
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Free-form key/value record for producers without a dedicated kind
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Record {
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl Record {
    pub fn from_pairs<I, K, V>(pairs: I) -> Record
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Record {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            signature: None,
            public_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Genesis { message: String },
    Reservation(Reservation),
    Transfer(Transfer),
    Record(Record),
}

impl Payload {
    pub fn genesis() -> Payload {
        Payload::Genesis {
            message: GENESIS_MESSAGE.to_string(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Payload::Genesis { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Genesis { .. } => "genesis",
            Payload::Reservation(_) => "reservation",
            Payload::Transfer(_) => "transfer",
            Payload::Record(_) => "record",
        }
    }

    /// The bytes a producer signs: semantic fields in a fixed order, joined
    /// by `|`, never including `signature` or `public_key`.
    ///
    /// - reservation: `first|last|plate|make|model|spot|pickup|dropoff`
    /// - transfer: `from|to|amount`
    /// - record: `key=value` pairs in ascending key order
    ///
    /// Genesis records are not signable, and neither is a payload with a
    /// field that [`Payload::ambiguous_field`] reports.
    pub fn signing_message(&self) -> Option<String> {
        if self.ambiguous_field().is_some() {
            return None;
        }
        match self {
            Payload::Genesis { .. } => None,
            Payload::Reservation(r) => Some(
                [
                    r.first.as_str(),
                    r.last.as_str(),
                    r.plate.as_str(),
                    r.make.as_str(),
                    r.model.as_str(),
                    r.spot.as_str(),
                    r.pickup.as_str(),
                    r.dropoff.as_str(),
                ]
                .join(FIELD_SEPARATOR),
            ),
            Payload::Transfer(t) => Some(format!("{}|{}|{}", t.from, t.to, t.amount)),
            Payload::Record(r) => Some(
                r.fields
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(FIELD_SEPARATOR),
            ),
        }
    }

    /// First signed field whose text would let two different payloads share
    /// a signing message: a value containing `|`, or a record key containing
    /// `|` or `=`.
    pub fn ambiguous_field(&self) -> Option<String> {
        let fields: Vec<(&str, &str)> = match self {
            Payload::Genesis { .. } => return None,
            Payload::Reservation(r) => vec![
                ("first", r.first.as_str()),
                ("last", r.last.as_str()),
                ("plate", r.plate.as_str()),
                ("make", r.make.as_str()),
                ("model", r.model.as_str()),
                ("spot", r.spot.as_str()),
                ("pickup", r.pickup.as_str()),
                ("dropoff", r.dropoff.as_str()),
            ],
            Payload::Transfer(t) => vec![("from", t.from.as_str()), ("to", t.to.as_str())],
            Payload::Record(r) => {
                if let Some(key) = r
                    .fields
                    .keys()
                    .find(|k| k.contains(FIELD_SEPARATOR) || k.contains(PAIR_SEPARATOR))
                {
                    return Some(key.clone());
                }
                r.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
            }
        };
        fields
            .into_iter()
            .find(|(_, value)| value.contains(FIELD_SEPARATOR))
            .map(|(name, _)| name.to_string())
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            Payload::Genesis { .. } => None,
            Payload::Reservation(r) => r.signature.as_deref(),
            Payload::Transfer(t) => t.signature.as_deref(),
            Payload::Record(r) => r.signature.as_deref(),
        }
    }

    pub fn public_key(&self) -> Option<&str> {
        match self {
            Payload::Genesis { .. } => None,
            Payload::Reservation(r) => r.public_key.as_deref(),
            Payload::Transfer(t) => t.public_key.as_deref(),
            Payload::Record(r) => r.public_key.as_deref(),
        }
    }

    /// Stores hex signature fields. Returns false for genesis records.
    pub fn attach_signature(&mut self, signature: String, public_key: String) -> bool {
        let (sig_slot, key_slot) = match self {
            Payload::Genesis { .. } => return false,
            Payload::Reservation(r) => (&mut r.signature, &mut r.public_key),
            Payload::Transfer(t) => (&mut t.signature, &mut t.public_key),
            Payload::Record(r) => (&mut r.signature, &mut r.public_key),
        };
        *sig_slot = Some(signature);
        *key_slot = Some(public_key);
        true
    }

    /// Re-verifies the stored signature; `None` when the payload is unsigned.
    ///
    /// This says nothing about the block's place in the chain.
    pub fn signature_status(&self) -> Option<Verification> {
        let signature = self.signature()?;
        let Some(message) = self.signing_message() else {
            return Some(Verification::MalformedInput);
        };
        match self.public_key() {
            Some(public_key) => Some(verify_hex(message.as_bytes(), signature, public_key)),
            None => Some(Verification::MalformedInput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reservation() -> Reservation {
        Reservation {
            first: "Ada".to_string(),
            last: "Lovelace".to_string(),
            plate: "AB-123".to_string(),
            make: "Austin".to_string(),
            model: "Seven".to_string(),
            spot: "B12".to_string(),
            pickup: "2025-01-01T10:00".to_string(),
            dropoff: "2025-01-03T18:00".to_string(),
            signature: None,
            public_key: None,
        }
    }

    #[test]
    fn test_reservation_signing_message_order() {
        let payload = Payload::Reservation(sample_reservation());
        assert_eq!(
            payload.signing_message().unwrap(),
            "Ada|Lovelace|AB-123|Austin|Seven|B12|2025-01-01T10:00|2025-01-03T18:00"
        );
    }

    #[test]
    fn test_transfer_signing_message() {
        let payload = Payload::Transfer(Transfer {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 10,
            ..Default::default()
        });
        assert_eq!(payload.signing_message().unwrap(), "alice|bob|10");
    }

    #[test]
    fn test_record_signing_message_sorted_by_key() {
        let payload = Payload::Record(Record::from_pairs([("zeta", "1"), ("alpha", "2")]));
        assert_eq!(payload.signing_message().unwrap(), "alpha=2|zeta=1");
    }

    #[test]
    fn test_signing_message_ignores_signature_fields() {
        let mut payload = Payload::Reservation(sample_reservation());
        let before = payload.signing_message();
        assert!(payload.attach_signature("ab".to_string(), "cd".to_string()));
        assert_eq!(before, payload.signing_message());
    }

    #[test]
    fn test_genesis_is_not_signable() {
        let mut genesis = Payload::genesis();
        assert!(genesis.signing_message().is_none());
        assert!(!genesis.attach_signature("ab".to_string(), "cd".to_string()));
        assert!(genesis.signature_status().is_none());
    }

    #[test]
    fn test_separator_in_fields_is_ambiguous() {
        let split = Payload::Record(Record::from_pairs([("a", "1"), ("b", "2")]));
        let joined = Payload::Record(Record::from_pairs([("a", "1|b=2")]));
        assert_eq!(split.signing_message().unwrap(), "a=1|b=2");
        assert_eq!(joined.ambiguous_field().as_deref(), Some("a"));
        assert!(joined.signing_message().is_none());

        let key_with_equals = Payload::Record(Record::from_pairs([("a=1", "x")]));
        assert_eq!(key_with_equals.ambiguous_field().as_deref(), Some("a=1"));

        // '=' inside a record value cannot be confused with a key boundary
        let value_with_equals = Payload::Record(Record::from_pairs([("eq", "x=y")]));
        assert!(value_with_equals.ambiguous_field().is_none());

        let transfer = Payload::Transfer(Transfer {
            from: "a|b".to_string(),
            to: "c".to_string(),
            amount: 1,
            ..Default::default()
        });
        assert_eq!(transfer.ambiguous_field().as_deref(), Some("from"));

        let mut reservation = sample_reservation();
        reservation.spot = "B12|B13".to_string();
        assert_eq!(
            Payload::Reservation(reservation).ambiguous_field().as_deref(),
            Some("spot")
        );
    }

    #[test]
    fn test_signature_moved_onto_ambiguous_record_is_not_valid() {
        let mut forged = Record::from_pairs([("a", "1|b=2")]);
        forged.signature = Some("00".repeat(64));
        forged.public_key = Some("04".repeat(65));
        assert_eq!(
            Payload::Record(forged).signature_status(),
            Some(Verification::MalformedInput)
        );
    }

    #[test]
    fn test_unsigned_payload_has_no_status() {
        let payload = Payload::Reservation(sample_reservation());
        assert!(payload.signature_status().is_none());
    }

    #[test]
    fn test_signature_without_key_is_malformed() {
        let mut reservation = sample_reservation();
        reservation.signature = Some("00".to_string());
        let payload = Payload::Reservation(reservation);
        assert_eq!(payload.signature_status(), Some(Verification::MalformedInput));
    }

    #[test]
    fn test_json_shape_is_tagged_and_omits_absent_signature() {
        let payload = Payload::Transfer(Transfer {
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 10,
            ..Default::default()
        });
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "transfer", "from": "alice", "to": "bob", "amount": 10})
        );
        let back: Payload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }
}
