//! Append-only attempt audit log
//!
//! Every attempt of every request is appended as an [`AttemptEvent`]. Events
//! form a SHA-256 hash chain so any later edit is detectable with
//! [`AttemptLog::verify_integrity`]. One log may be shared by concurrent
//! requests.
//!
//! The log keeps every event until [`AttemptLog::drain`] hands them off.
//! Long-lived processes drain it periodically; sequence numbers and the
//! hash chain continue across drains.

use crate::attempt::{AttemptOutcome, GenerationAttempt};
use crate::error::LogError;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sheetsmith_model::RequestId;
use sheetsmith_providers::{ProviderId, ProviderTier};

/// Audit record of one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    /// Position in the log
    pub sequence: u64,
    /// Milliseconds since the Unix epoch; never decreases within a log
    pub timestamp: u64,
    /// Owning request
    pub request_id: RequestId,
    /// Provider tried
    pub provider: ProviderId,
    /// Provider tier
    pub tier: ProviderTier,
    /// Attempt outcome
    pub outcome: AttemptOutcome,
    /// Error kind or violated check ids
    pub detail: String,
    /// Hash of the previous event (zeros for the first)
    pub prev_hash: [u8; 32],
    /// Hash of this event
    pub hash: [u8; 32],
}

impl AttemptEvent {
    /// Hex form of the event hash
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

#[derive(Debug, Default)]
struct Chain {
    events: Vec<AttemptEvent>,
    /// Hash and timestamp of the last drained event
    anchor: ([u8; 32], u64),
    next_sequence: u64,
}

/// Shared hash-chained log
#[derive(Debug, Default)]
pub struct AttemptLog {
    inner: Mutex<Chain>,
}

impl AttemptLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt; returns its sequence number
    pub fn append(&self, request_id: RequestId, attempt: &GenerationAttempt) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);

        let mut chain = self.inner.lock();
        let (prev_hash, last_timestamp) = chain
            .events
            .last()
            .map_or(chain.anchor, |last| (last.hash, last.timestamp));
        let mut event = AttemptEvent {
            sequence: chain.next_sequence,
            timestamp: now.max(last_timestamp),
            request_id,
            provider: attempt.provider.clone(),
            tier: attempt.tier,
            outcome: attempt.outcome,
            detail: attempt.detail(),
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = compute_hash(&event);
        let sequence = event.sequence;
        chain.next_sequence += 1;
        chain.events.push(event);
        sequence
    }

    /// Remove and return every held event
    ///
    /// The next appended event chains onto the last drained one.
    pub fn drain(&self) -> Vec<AttemptEvent> {
        let mut chain = self.inner.lock();
        let events = std::mem::take(&mut chain.events);
        if let Some(last) = events.last() {
            chain.anchor = (last.hash, last.timestamp);
        }
        events
    }

    /// Snapshot of all events
    #[must_use]
    pub fn events(&self) -> Vec<AttemptEvent> {
        self.inner.lock().events.clone()
    }

    /// Events for one request, in order
    #[must_use]
    pub fn events_for(&self, request_id: RequestId) -> Vec<AttemptEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Number of held events
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Whether no events are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    /// Walk the held events and recompute every hash
    ///
    /// # Errors
    /// `IntegrityViolation` at the first event that does not verify
    pub fn verify_integrity(&self) -> Result<(), LogError> {
        let chain = self.inner.lock();
        let (mut prev, mut last_timestamp) = chain.anchor;
        for e in &chain.events {
            if e.prev_hash != prev || e.hash != compute_hash(e) || e.timestamp < last_timestamp {
                return Err(LogError::IntegrityViolation { sequence: e.sequence });
            }
            prev = e.hash;
            last_timestamp = e.timestamp;
        }
        Ok(())
    }
}

fn compute_hash(event: &AttemptEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.sequence.to_le_bytes());
    hasher.update(event.timestamp.to_le_bytes());
    hasher.update(event.request_id.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(event.provider.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.tier.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.outcome.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}
