//! # Fact Store (C2)
//!
//! `FactStore` is the append-only, content-addressed set of facts backed
//! by a [`KvStore`]. It adds retry-with-backoff over transient KV
//! failures (§4.1) and the convenience lookups §4.1 lists: attribute
//! reads, label membership, and relationship endpoint lookups, all built
//! on `scan_prefix`.

pub mod kv;

use crate::fact::Fact;
use crate::value::Scalar;
use kv::{prefix_upper_bound, KvError, KvStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// More than one value is stored for `(entity_id, attribute)` (§3, §4.1).
    #[error("ambiguous attribute '{attribute}' on '{entity_id}'")]
    AmbiguousAttribute { entity_id: String, attribute: String },

    /// The backing KV exhausted its retry budget (§7's `StoreUnavailable`).
    #[error("store unavailable after retrying: {0}")]
    Unavailable(String),
}

impl From<KvError> for StoreError {
    fn from(e: KvError) -> Self {
        match e {
            KvError::Unavailable(msg) => StoreError::Unavailable(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bounded exponential backoff policy for retrying transient KV failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }
}

fn with_retry<T>(
    policy: &RetryPolicy,
    op_name: &str,
    mut op: impl FnMut() -> Result<T, KvError>,
) -> StoreResult<T> {
    let mut delay = policy.initial_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(KvError::Unavailable(msg)) => {
                if attempt >= policy.max_attempts {
                    warn!(op = op_name, attempts = attempt, "store retry budget exhausted");
                    return Err(StoreError::Unavailable(msg));
                }
                debug!(op = op_name, attempt, ?delay, "retrying after transient store failure");
                std::thread::sleep(delay);
                delay = std::cmp::min(delay * 2, policy.max_delay);
            }
        }
    }
}

/// Append-only fact store. Cloning is cheap (`Arc` around the backend).
#[derive(Clone)]
pub struct FactStore {
    kv: Arc<dyn KvStore>,
    retry: RetryPolicy,
}

impl FactStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        FactStore {
            kv,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(kv: Arc<dyn KvStore>, retry: RetryPolicy) -> Self {
        FactStore { kv, retry }
    }

    /// Idempotent insertion: a duplicate `put` is a no-op because the key
    /// encoding is identical for structurally-equal facts (§3).
    pub fn put(&self, fact: &Fact) -> StoreResult<()> {
        let key = fact.to_key_bytes();
        let value = fact.to_value_bytes();
        with_retry(&self.retry, "put", || self.kv.put(key.clone(), value.clone()))
    }

    pub fn contains(&self, fact: &Fact) -> StoreResult<bool> {
        let key = fact.to_key_bytes();
        let got = with_retry(&self.retry, "get", || self.kv.get(&key))?;
        Ok(got.is_some())
    }

    /// All stored facts whose key starts with `prefix`, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<Fact>> {
        let high = prefix_upper_bound(prefix);
        let pairs = match high {
            Some(high) => with_retry(&self.retry, "range", || self.kv.range(prefix, &high))?,
            None => with_retry(&self.retry, "range", || {
                self.kv.range(prefix, &[0xFF; 32])
            })?,
        };
        pairs
            .into_iter()
            .map(|(_, v)| Fact::from_value_bytes(&v).map_err(|e| StoreError::Unavailable(e.to_string())))
            .collect()
    }

    pub fn get_attribute(&self, entity_id: &str, attribute: &str) -> StoreResult<Option<Scalar>> {
        let mut found: Option<Scalar> = None;
        for prefix in [
            format!("node_attribute:{entity_id}:{attribute}:").into_bytes(),
            format!("relationship_attribute:{entity_id}:{attribute}:").into_bytes(),
        ] {
            for fact in self.scan_prefix(&prefix)? {
                let value = match fact {
                    Fact::NodeHasAttribute { value, .. } => value,
                    Fact::RelationshipHasAttribute { value, .. } => value,
                    _ => continue,
                };
                if found.is_some() {
                    return Err(StoreError::AmbiguousAttribute {
                        entity_id: entity_id.to_string(),
                        attribute: attribute.to_string(),
                    });
                }
                found = Some(value);
            }
        }
        Ok(found)
    }

    pub fn get_node_label(&self, node_id: &str) -> StoreResult<Option<String>> {
        // Labels are keyed `node_label:{label}::{node_id}`, so a direct
        // prefix scan by node can't be done; fall back to a full scan of
        // the `node_label:` space. Cheap for the in-memory backend; a
        // physical backend would keep a secondary index.
        for fact in self.scan_prefix(b"node_label:")? {
            if let Fact::NodeHasLabel { node_id: n, label } = fact {
                if n == node_id {
                    return Ok(Some(label));
                }
            }
        }
        Ok(None)
    }

    /// Symmetric counterpart to `get_node_label` for relationships.
    pub fn get_relationship_label(&self, rel_id: &str) -> StoreResult<Option<String>> {
        let prefix = format!("relationship_label:{rel_id}:").into_bytes();
        for fact in self.scan_prefix(&prefix)? {
            if let Fact::RelationshipHasLabel { label, .. } = fact {
                return Ok(Some(label));
            }
        }
        Ok(None)
    }

    pub fn nodes_with_label(&self, label: &str) -> StoreResult<Vec<String>> {
        let prefix = format!("node_label:{label}::").into_bytes();
        self.scan_prefix(&prefix).map(|facts| {
            facts
                .into_iter()
                .filter_map(|f| match f {
                    Fact::NodeHasLabel { node_id, .. } => Some(node_id),
                    _ => None,
                })
                .collect()
        })
    }

    /// Every distinct node id with any label, for label-less node patterns
    /// (`(n)` with no `:Label`).
    pub fn all_node_ids(&self) -> StoreResult<Vec<String>> {
        let facts = self.scan_prefix(b"node_label:")?;
        let mut ids: Vec<String> = facts
            .into_iter()
            .filter_map(|f| match f {
                Fact::NodeHasLabel { node_id, .. } => Some(node_id),
                _ => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Every distinct relationship id with any label, for label-less
    /// relationship patterns (`-[r]-` with no `:Label`).
    pub fn all_relationship_ids(&self) -> StoreResult<Vec<String>> {
        let facts = self.scan_prefix(b"relationship_label:")?;
        let mut ids: Vec<String> = facts
            .into_iter()
            .filter_map(|f| match f {
                Fact::RelationshipHasLabel { rel_id, .. } => Some(rel_id),
                _ => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub fn relationships_with_label(&self, label: &str) -> StoreResult<Vec<String>> {
        // Keyed `relationship_label:{rel_id}:{label}`, so match on suffix
        // rather than prefix.
        let suffix = format!(":{label}");
        self.scan_prefix(b"relationship_label:").map(|facts| {
            facts
                .into_iter()
                .filter_map(|f| match f {
                    Fact::RelationshipHasLabel { rel_id, label: l } if format!(":{l}") == suffix => {
                        Some(rel_id)
                    }
                    _ => None,
                })
                .collect()
        })
    }

    pub fn source_of(&self, rel_id: &str) -> StoreResult<Option<String>> {
        let prefix = format!("relationship_source_node:{rel_id}:").into_bytes();
        let facts = self.scan_prefix(&prefix)?;
        Ok(facts.into_iter().find_map(|f| match f {
            Fact::RelationshipHasSource { node_id, .. } => Some(node_id),
            _ => None,
        }))
    }

    pub fn target_of(&self, rel_id: &str) -> StoreResult<Option<String>> {
        let prefix = format!("relationship_target_node:{rel_id}:").into_bytes();
        let facts = self.scan_prefix(&prefix)?;
        Ok(facts.into_iter().find_map(|f| match f {
            Fact::RelationshipHasTarget { node_id, .. } => Some(node_id),
            _ => None,
        }))
    }
}
