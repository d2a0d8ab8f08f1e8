//! # Event envelope: correlation id + typed payload.
//!
//! [`Envelope`] is the immutable value published through the
//! [`EventBus`](crate::EventBus). It pairs an opaque correlation id string
//! with a payload of arbitrary type; the bus never inspects the payload
//! beyond its runtime type.
//!
//! ## Correlation ids
//! - Caller-supplied via [`Envelope::new`] (rejected if empty).
//! - Generated via [`Envelope::generate`]: 128 random bits rendered as a
//!   canonical hyphenated lowercase UUID string. The id only has to match
//!   a response to a prior request, so a non-cryptographic random source
//!   is enough; uniqueness is probabilistic, not guaranteed.
//!
//! ## Sharing
//! Both fields are `Arc`-backed, so cloning an envelope is cheap and the
//! fan-out path can hand the same payload to many subscriptions without
//! copying it.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::error::BusError;

/// Immutable pairing of a correlation id and a payload value.
///
/// ### Properties
/// - **Immutable**: neither field can change after construction.
/// - **Cheap to clone**: both fields are `Arc`s (no `T: Clone` bound).
/// - **Type-tagged**: the payload's runtime type drives subscription
///   filtering, not its declared type at any call site.
pub struct Envelope<T> {
    correlation_id: Arc<str>,
    value: Arc<T>,
}

impl<T> Envelope<T> {
    /// Creates an envelope with the given correlation id and payload.
    ///
    /// Returns [`BusError::EmptyCorrelationId`] if the id is empty.
    pub fn new(correlation_id: impl Into<Arc<str>>, value: T) -> Result<Self, BusError> {
        let correlation_id = correlation_id.into();
        if correlation_id.is_empty() {
            return Err(BusError::EmptyCorrelationId);
        }
        Ok(Self {
            correlation_id,
            value: Arc::new(value),
        })
    }

    /// Creates an envelope with a freshly generated correlation id.
    pub fn generate(value: T) -> Self {
        Self {
            correlation_id: random_correlation_id().into(),
            value: Arc::new(value),
        }
    }

    /// The correlation id tying this envelope to a request/response exchange.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Borrows the payload.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the envelope and returns the shared payload handle.
    pub fn into_value(self) -> Arc<T> {
        self.value
    }
}

impl<T: Send + Sync + 'static> Envelope<T> {
    /// Erases the payload type for transport through the bus.
    pub(crate) fn erase(self) -> AnyEnvelope {
        AnyEnvelope {
            correlation_id: self.correlation_id,
            type_id: TypeId::of::<T>(),
            value: self.value,
        }
    }
}

impl<T> Clone for Envelope<T> {
    fn clone(&self) -> Self {
        Self {
            correlation_id: Arc::clone(&self.correlation_id),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: PartialEq> PartialEq for Envelope<T> {
    fn eq(&self, other: &Self) -> bool {
        self.correlation_id == other.correlation_id && self.value == other.value
    }
}

impl<T: Eq> Eq for Envelope<T> {}

impl<T: fmt::Debug> fmt::Debug for Envelope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("correlation_id", &self.correlation_id)
            .field("value", &self.value)
            .finish()
    }
}

/// Type-erased envelope as it travels through the bus.
///
/// The `TypeId` is captured once at publish time; subscription filters
/// compare against it without touching the payload.
pub(crate) struct AnyEnvelope {
    pub(crate) correlation_id: Arc<str>,
    pub(crate) type_id: TypeId,
    pub(crate) value: Arc<dyn Any + Send + Sync>,
}

impl AnyEnvelope {
    /// Recovers the typed envelope, or `None` if `T` is not the payload type.
    pub(crate) fn downcast<T: Send + Sync + 'static>(self) -> Option<Envelope<T>> {
        let value = Arc::downcast::<T>(self.value).ok()?;
        Some(Envelope {
            correlation_id: self.correlation_id,
            value,
        })
    }
}

impl Clone for AnyEnvelope {
    fn clone(&self) -> Self {
        Self {
            correlation_id: Arc::clone(&self.correlation_id),
            type_id: self.type_id,
            value: Arc::clone(&self.value),
        }
    }
}

/// 128 random non-cryptographic bits, rendered as a canonical UUID string.
fn random_correlation_id() -> String {
    let bits: u128 = rand::rng().random();
    Uuid::from_u128(bits).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_empty_correlation_id_rejected() {
        let err = Envelope::new("", 42u32).unwrap_err();
        assert_eq!(err, BusError::EmptyCorrelationId);
    }

    #[test]
    fn test_explicit_correlation_id_kept() {
        let env = Envelope::new("request-1", "payload").unwrap();
        assert_eq!(env.correlation_id(), "request-1");
        assert_eq!(*env.value(), "payload");
    }

    #[test]
    fn test_equality_covers_both_fields() {
        let a = Envelope::new("id", 1u32).unwrap();
        let b = Envelope::new("id", 1u32).unwrap();
        let c = Envelope::new("id", 2u32).unwrap();
        let d = Envelope::new("other", 1u32).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_clone_shares_payload() {
        let env = Envelope::generate(vec![1, 2, 3]);
        let clone = env.clone();
        assert!(Arc::ptr_eq(&env.value, &clone.value));
        assert_eq!(env, clone);
    }

    #[test]
    fn test_generated_id_is_canonical_uuid() {
        let env = Envelope::generate(());
        let id = env.correlation_id();
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_generated_ids_pairwise_distinct() {
        // A collision here means a broken random source, not bad luck.
        let ids: HashSet<String> = (0..10_000)
            .map(|_| Envelope::generate(()).correlation_id().to_string())
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_erase_downcast_roundtrip() {
        let env = Envelope::new("round", 7u64).unwrap();
        let erased = env.clone().erase();
        assert_eq!(erased.type_id, TypeId::of::<u64>());
        let back = erased.downcast::<u64>().unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn test_downcast_to_wrong_type_fails() {
        let erased = Envelope::generate(7u64).erase();
        assert!(erased.downcast::<u32>().is_none());
    }
}
