//! Remote profile payload and reconciliation bookkeeping.

use crate::{DepotLedger, GoalLedger, StateError};
use serde::{Deserialize, Serialize};

/// Current version of the goals/depot state shape.
pub const STATE_VERSION: u32 = 2;

/// Document mirrored to the remote per-user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteProfile {
    pub goals: GoalLedger,
    pub depot: DepotLedger,
    pub version: u32,
}

impl RemoteProfile {
    /// Parse and validate an untrusted payload.
    pub fn from_json(text: &str) -> Result<Self, StateError> {
        serde_json::from_str(text).map_err(|e| StateError::InvalidRemotePayload(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, StateError> {
        serde_json::from_value(value).map_err(|e| StateError::InvalidRemotePayload(e.to_string()))
    }
}

/// Outcome of comparing a fetched profile with local state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// Remote was at least as new; both ledgers were replaced.
    AcceptedRemote,
    /// Remote was older; local kept and marked dirty for upload.
    KeptLocal,
}

/// Whether local state has changes not yet written out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    dirty: bool,
}

impl SyncState {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
