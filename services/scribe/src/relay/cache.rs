//! services/scribe/src/relay/cache.rs
//!
//! The relay's single slot. Owned by the relay task, so it needs no locking.

use chrono::{DateTime, Utc};
use scribe_core::{PanelAction, RelayPayload};

#[derive(Debug, Default)]
pub struct RelayCache {
    slot: Option<RelayPayload>,
    updated_at: Option<DateTime<Utc>>,
}

impl RelayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot. Last write wins, whichever tab it came from.
    pub fn record(&mut self, payload: RelayPayload) {
        self.slot = Some(payload);
        self.updated_at = Some(Utc::now());
    }

    /// Reads the slot without consuming it.
    pub fn fetch(&self) -> Option<RelayPayload> {
        self.slot.clone()
    }

    /// Attaches an action to whatever is cached, keeping the problem.
    pub fn stash_action(&mut self, action: PanelAction) {
        let slot = self.slot.get_or_insert_with(RelayPayload::default);
        slot.action = Some(action);
        self.updated_at = Some(Utc::now());
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
