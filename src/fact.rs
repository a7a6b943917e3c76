//! # Atomic Fact Model (C1)
//!
//! A `Fact` is one of six tagged variants over nodes, relationships,
//! labels, and attributes. Facts are immutable and compared structurally;
//! the store is a *set* of facts, so inserting a duplicate is a no-op
//! (§3's invariant). Each fact has a canonical byte-key (§4.1) used both
//! as the storage key and as the deduplication token.

use crate::value::Scalar;
use serde::{Deserialize, Serialize};

/// One atomic fact, in one of the six shapes defined by §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fact {
    NodeHasLabel {
        node_id: String,
        label: String,
    },
    NodeHasAttribute {
        node_id: String,
        attribute: String,
        value: Scalar,
    },
    RelationshipHasLabel {
        rel_id: String,
        label: String,
    },
    RelationshipHasAttribute {
        rel_id: String,
        attribute: String,
        value: Scalar,
    },
    RelationshipHasSource {
        rel_id: String,
        node_id: String,
    },
    RelationshipHasTarget {
        rel_id: String,
        node_id: String,
    },
}

impl Fact {
    /// The canonical key encoding from §4.1, used both for storage and as
    /// the fact's deduplication identity.
    ///
    /// ```text
    /// node_label:{label}::{node_id}
    /// node_attribute:{node_id}:{attribute}:{encoded_value}
    /// relationship_label:{rel_id}:{label}
    /// relationship_attribute:{rel_id}:{attribute}:{encoded_value}
    /// relationship_source_node:{rel_id}:{node_id}
    /// relationship_target_node:{rel_id}:{node_id}
    /// ```
    pub fn to_key_bytes(&self) -> Vec<u8> {
        match self {
            Fact::NodeHasLabel { node_id, label } => {
                format!("node_label:{label}::{node_id}").into_bytes()
            }
            Fact::NodeHasAttribute {
                node_id,
                attribute,
                value,
            } => format!(
                "node_attribute:{node_id}:{attribute}:{}",
                encode_value(value)
            )
            .into_bytes(),
            Fact::RelationshipHasLabel { rel_id, label } => {
                format!("relationship_label:{rel_id}:{label}").into_bytes()
            }
            Fact::RelationshipHasAttribute {
                rel_id,
                attribute,
                value,
            } => format!(
                "relationship_attribute:{rel_id}:{attribute}:{}",
                encode_value(value)
            )
            .into_bytes(),
            Fact::RelationshipHasSource { rel_id, node_id } => {
                format!("relationship_source_node:{rel_id}:{node_id}").into_bytes()
            }
            Fact::RelationshipHasTarget { rel_id, node_id } => {
                format!("relationship_target_node:{rel_id}:{node_id}").into_bytes()
            }
        }
    }

    /// Serialize the fact itself (the KV *value*, not the key). Bincode
    /// round-trips `Fact` exactly since every field is owned data.
    pub fn to_value_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Fact serialization is infallible")
    }

    pub fn from_value_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            Fact::NodeHasLabel { node_id, .. } | Fact::NodeHasAttribute { node_id, .. } => {
                Some(node_id)
            }
            _ => None,
        }
    }

    pub fn rel_id(&self) -> Option<&str> {
        match self {
            Fact::RelationshipHasLabel { rel_id, .. }
            | Fact::RelationshipHasAttribute { rel_id, .. }
            | Fact::RelationshipHasSource { rel_id, .. }
            | Fact::RelationshipHasTarget { rel_id, .. } => Some(rel_id),
            _ => None,
        }
    }
}

/// Type-tagged encoding of a scalar so that byte-equality of the encoding
/// corresponds to value equality (§4.1's "`encoded_value`").
pub fn encode_value(value: &Scalar) -> String {
    match value {
        Scalar::Null => "n:".to_string(),
        Scalar::Bool(b) => format!("b:{b}"),
        Scalar::Int(i) => format!("i:{i:020}"),
        Scalar::Float(x) => format!("f:{x}"),
        Scalar::Str(s) => format!("s:{s}"),
        Scalar::List(items) => {
            let parts: Vec<String> = items.iter().map(encode_value).collect();
            format!("l:[{}]", parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_encoding_is_identical() {
        let a = Fact::NodeHasLabel {
            node_id: "n1".into(),
            label: "Person".into(),
        };
        let b = Fact::NodeHasLabel {
            node_id: "n1".into(),
            label: "Person".into(),
        };
        assert_eq!(a.to_key_bytes(), b.to_key_bytes());
    }

    #[test]
    fn different_attribute_values_encode_to_different_keys() {
        let a = Fact::NodeHasAttribute {
            node_id: "n1".into(),
            attribute: "age".into(),
            value: Scalar::Int(20),
        };
        let b = Fact::NodeHasAttribute {
            node_id: "n1".into(),
            attribute: "age".into(),
            value: Scalar::Int(40),
        };
        assert_ne!(a.to_key_bytes(), b.to_key_bytes());
    }

    #[test]
    fn value_round_trips() {
        let f = Fact::RelationshipHasAttribute {
            rel_id: "r1".into(),
            attribute: "weight".into(),
            value: Scalar::Float(3.5),
        };
        let bytes = f.to_value_bytes();
        let back = Fact::from_value_bytes(&bytes).unwrap();
        assert_eq!(f, back);
    }
}
