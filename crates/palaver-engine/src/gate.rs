//! Single-flight dispatch gating.
//!
//! While a turn is in flight, further submissions are rejected rather than
//! queued. The gate hands out RAII permits; dropping the permit releases the
//! gate even when the pipeline bails out early with an error.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use palaver_core::types::{Channel, WorkspaceId};

/// Scope of the busy flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GateMode {
    /// One in-flight turn across the whole engine.
    #[default]
    Global,
    /// One in-flight turn per (workspace, channel) session; independent
    /// sessions proceed concurrently.
    PerSession,
}

impl GateMode {
    /// Parse the configured mode name. Unrecognized values fall back to
    /// [`GateMode::Global`].
    pub fn from_config(name: &str) -> Self {
        match name {
            "per_session" => GateMode::PerSession,
            _ => GateMode::Global,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum GateKey {
    Global,
    Session(WorkspaceId, Channel),
}

/// Tracks in-flight turns and rejects overlapping submissions.
#[derive(Clone)]
pub struct DispatchGate {
    mode: GateMode,
    busy: Arc<Mutex<HashSet<GateKey>>>,
}

impl DispatchGate {
    pub fn new(mode: GateMode) -> Self {
        Self {
            mode,
            busy: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    fn key_for(&self, workspace: &WorkspaceId, channel: Channel) -> GateKey {
        match self.mode {
            GateMode::Global => GateKey::Global,
            GateMode::PerSession => GateKey::Session(workspace.clone(), channel),
        }
    }

    /// Try to claim the gate for a session. Returns `None` when the scope is
    /// already busy.
    pub fn acquire(&self, workspace: &WorkspaceId, channel: Channel) -> Option<GatePermit> {
        let key = self.key_for(workspace, channel);
        let mut busy = match self.busy.lock() {
            Ok(guard) => guard,
            // A poisoned gate means a prior permit holder panicked; treat the
            // scope as free rather than wedging the engine forever.
            Err(poisoned) => poisoned.into_inner(),
        };
        if busy.insert(key.clone()) {
            Some(GatePermit {
                busy: Arc::clone(&self.busy),
                key,
            })
        } else {
            None
        }
    }

    /// Whether the scope covering this session is currently busy.
    pub fn is_busy(&self, workspace: &WorkspaceId, channel: Channel) -> bool {
        let key = self.key_for(workspace, channel);
        match self.busy.lock() {
            Ok(guard) => guard.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }
}

/// Held for the duration of one dispatched turn; releases on drop.
pub struct GatePermit {
    busy: Arc<Mutex<HashSet<GateKey>>>,
    key: GateKey,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let mut busy = match self.busy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        busy.remove(&self.key);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(id: &str) -> WorkspaceId {
        WorkspaceId::new(id)
    }

    #[test]
    fn test_global_gate_blocks_everything() {
        let gate = DispatchGate::new(GateMode::Global);
        let permit = gate.acquire(&ws("a"), Channel::General);
        assert!(permit.is_some());

        // A different workspace and channel is still blocked.
        assert!(gate.acquire(&ws("b"), Channel::LiveVoice).is_none());
        assert!(gate.is_busy(&ws("b"), Channel::LiveVoice));
    }

    #[test]
    fn test_per_session_gate_isolates_sessions() {
        let gate = DispatchGate::new(GateMode::PerSession);
        let _permit = gate.acquire(&ws("a"), Channel::General).unwrap();

        // Same session blocked, different channel or workspace free.
        assert!(gate.acquire(&ws("a"), Channel::General).is_none());
        assert!(gate.acquire(&ws("a"), Channel::LiveVoice).is_some());
        assert!(gate.acquire(&ws("b"), Channel::General).is_some());
    }

    #[test]
    fn test_drop_releases_gate() {
        let gate = DispatchGate::new(GateMode::Global);
        {
            let _permit = gate.acquire(&ws("a"), Channel::General).unwrap();
            assert!(gate.is_busy(&ws("a"), Channel::General));
        }
        assert!(!gate.is_busy(&ws("a"), Channel::General));
        assert!(gate.acquire(&ws("a"), Channel::General).is_some());
    }

    #[test]
    fn test_mode_from_config() {
        assert_eq!(GateMode::from_config("per_session"), GateMode::PerSession);
        assert_eq!(GateMode::from_config("global"), GateMode::Global);
        assert_eq!(GateMode::from_config("nonsense"), GateMode::Global);
    }
}
