//! # Delivery Cache
//!
//! Per-account store of the last response sent for every request id. The
//! cache backs the protocol's only retry mechanism: the client acknowledges a
//! response with `OK#` (evicting it) or asks for it again with `SOS#`.
//!
//! Entries are sharded by account through [`DashMap`], so connections for
//! different accounts never contend on the same lock.

use crate::error::DeliveryError;
use crate::packet::Packet;
use crate::types::{AccountId, RequestId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedPacket {
    packet: Packet,
    recorded_at: Instant,
}

/// Unacknowledged responses keyed by `(account, request)`.
#[derive(Debug, Default)]
pub struct DeliveryCache {
    buckets: DashMap<AccountId, HashMap<RequestId, CachedPacket>>,
}

impl DeliveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `packet` as the latest response for its request id,
    /// overwriting any earlier entry for the same key.
    pub fn record(&self, account_id: AccountId, packet: Packet) {
        let request_id = packet.request_id;
        self.buckets.entry(account_id).or_default().insert(
            request_id,
            CachedPacket {
                packet,
                recorded_at: Instant::now(),
            },
        );
    }

    /// Evicts the entry for `(account_id, request_id)`.
    ///
    /// The account bucket is dropped once it holds no entries. Acknowledging
    /// an unknown key is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed.
    pub fn acknowledge(&self, account_id: AccountId, request_id: RequestId) -> bool {
        let removed = match self.buckets.get_mut(&account_id) {
            Some(mut bucket) => bucket.remove(&request_id).is_some(),
            None => return false,
        };
        // The shard guard above is released before this second lookup.
        self.buckets
            .remove_if(&account_id, |_, bucket| bucket.is_empty());
        removed
    }

    /// Looks up a cached response without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::NotFound`] when nothing is cached for the key.
    /// A miss is a normal outcome, not a failure of the connection.
    pub fn resend(
        &self,
        account_id: AccountId,
        request_id: RequestId,
    ) -> Result<Packet, DeliveryError> {
        self.buckets
            .get(&account_id)
            .and_then(|bucket| bucket.get(&request_id).map(|cached| cached.packet.clone()))
            .ok_or(DeliveryError::NotFound {
                account_id,
                request_id,
            })
    }

    /// Drops every entry recorded at least `ttl` ago.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|_, cached| cached.recorded_at.elapsed() < ttl);
            removed += before - bucket.len();
            !bucket.is_empty()
        });

        if removed > 0 {
            debug!("🧹 Swept {} expired cached response(s)", removed);
        }
        removed
    }

    /// Drops the whole bucket of `account_id`, returning how many entries it
    /// held.
    pub fn evict_account(&self, account_id: AccountId) -> usize {
        self.buckets
            .remove(&account_id)
            .map(|(_, bucket)| bucket.len())
            .unwrap_or(0)
    }

    /// Total number of cached responses across all accounts.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of accounts holding at least one cached response.
    pub fn account_count(&self) -> usize {
        self.buckets.len()
    }
}
