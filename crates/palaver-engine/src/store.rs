//! Per-workspace, per-channel session state.
//!
//! Holds the append-only message histories, the pending-image slot for the
//! editing surface, and the conversation-handle registry with its local turn
//! mirror. Histories are never reordered or truncated.

use std::collections::HashMap;
use std::sync::Mutex;

use palaver_core::i18n::{self, Language};
use palaver_core::types::{Channel, HandlePurpose, Message, PendingImage, WorkspaceId};
use palaver_provider::HandleId;

use crate::error::EngineError;
use crate::types::TurnRecord;

type SessionKey = (WorkspaceId, Channel);

#[derive(Debug)]
struct ConversationLog {
    handle: HandleId,
    turns: Vec<TurnRecord>,
}

/// In-memory session store.
///
/// Every (workspace, channel) pair owns exactly one history, seeded with a
/// localized welcome message at construction. Out-of-range workspaces are a
/// programming-error class failure, surfaced as
/// [`EngineError::UnknownWorkspace`] and never as chat content.
pub struct SessionStore {
    workspaces: Vec<WorkspaceId>,
    histories: Mutex<HashMap<SessionKey, Vec<Message>>>,
    pending: Mutex<HashMap<WorkspaceId, PendingImage>>,
    handles: Mutex<HashMap<(WorkspaceId, HandlePurpose), ConversationLog>>,
}

impl SessionStore {
    /// Create a store for the given workspace roster, seeding every channel
    /// history with its welcome message.
    pub fn new(workspaces: &[WorkspaceId], language: Language) -> Self {
        let mut histories = HashMap::new();
        for workspace in workspaces {
            for channel in Channel::ALL {
                histories.insert(
                    (workspace.clone(), channel),
                    vec![Message::ai_text(i18n::welcome(language, channel))],
                );
            }
        }
        Self {
            workspaces: workspaces.to_vec(),
            histories: Mutex::new(histories),
            pending: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// The configured workspace roster, in configuration order.
    pub fn workspaces(&self) -> &[WorkspaceId] {
        &self.workspaces
    }

    pub fn contains(&self, workspace: &WorkspaceId) -> bool {
        self.workspaces.contains(workspace)
    }

    /// Append a message to a session history.
    pub fn append(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
        message: Message,
    ) -> Result<(), EngineError> {
        let mut histories = self
            .histories
            .lock()
            .map_err(|e| EngineError::Storage(format!("history lock poisoned: {e}")))?;
        let history = histories
            .get_mut(&(workspace.clone(), channel))
            .ok_or_else(|| EngineError::UnknownWorkspace(workspace.clone()))?;
        history.push(message);
        Ok(())
    }

    /// Full ordered history for a session, oldest first.
    pub fn history(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
    ) -> Result<Vec<Message>, EngineError> {
        let histories = self
            .histories
            .lock()
            .map_err(|e| EngineError::Storage(format!("history lock poisoned: {e}")))?;
        histories
            .get(&(workspace.clone(), channel))
            .cloned()
            .ok_or_else(|| EngineError::UnknownWorkspace(workspace.clone()))
    }

    pub fn history_len(
        &self,
        workspace: &WorkspaceId,
        channel: Channel,
    ) -> Result<usize, EngineError> {
        Ok(self.history(workspace, channel)?.len())
    }

    /// Store the image available for the next edit, replacing any previous one.
    pub fn set_pending_image(
        &self,
        workspace: &WorkspaceId,
        image: PendingImage,
    ) -> Result<(), EngineError> {
        if !self.contains(workspace) {
            return Err(EngineError::UnknownWorkspace(workspace.clone()));
        }
        self.pending
            .lock()
            .map_err(|e| EngineError::Storage(format!("pending lock poisoned: {e}")))?
            .insert(workspace.clone(), image);
        Ok(())
    }

    pub fn pending_image(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<Option<PendingImage>, EngineError> {
        if !self.contains(workspace) {
            return Err(EngineError::UnknownWorkspace(workspace.clone()));
        }
        Ok(self
            .pending
            .lock()
            .map_err(|e| EngineError::Storage(format!("pending lock poisoned: {e}")))?
            .get(workspace)
            .cloned())
    }

    /// Register the provider handle for a workspace purpose.
    pub fn register_handle(
        &self,
        workspace: &WorkspaceId,
        purpose: HandlePurpose,
        handle: HandleId,
    ) -> Result<(), EngineError> {
        if !self.contains(workspace) {
            return Err(EngineError::UnknownWorkspace(workspace.clone()));
        }
        self.handles
            .lock()
            .map_err(|e| EngineError::Storage(format!("handle lock poisoned: {e}")))?
            .insert(
                (workspace.clone(), purpose),
                ConversationLog {
                    handle,
                    turns: Vec::new(),
                },
            );
        Ok(())
    }

    /// The provider handle for a workspace purpose.
    pub fn handle(
        &self,
        workspace: &WorkspaceId,
        purpose: HandlePurpose,
    ) -> Result<HandleId, EngineError> {
        let handles = self
            .handles
            .lock()
            .map_err(|e| EngineError::Storage(format!("handle lock poisoned: {e}")))?;
        handles
            .get(&(workspace.clone(), purpose))
            .map(|log| log.handle)
            .ok_or_else(|| EngineError::UnknownWorkspace(workspace.clone()))
    }

    /// Mirror a completed conversation turn locally.
    pub fn record_turn(
        &self,
        workspace: &WorkspaceId,
        purpose: HandlePurpose,
        user: &str,
        reply: &str,
    ) -> Result<(), EngineError> {
        let mut handles = self
            .handles
            .lock()
            .map_err(|e| EngineError::Storage(format!("handle lock poisoned: {e}")))?;
        let log = handles
            .get_mut(&(workspace.clone(), purpose))
            .ok_or_else(|| EngineError::UnknownWorkspace(workspace.clone()))?;
        log.turns.push(TurnRecord {
            user: user.to_string(),
            reply: reply.to_string(),
        });
        Ok(())
    }

    /// The locally mirrored turn sequence for a workspace purpose.
    pub fn turn_log(
        &self,
        workspace: &WorkspaceId,
        purpose: HandlePurpose,
    ) -> Result<Vec<TurnRecord>, EngineError> {
        let handles = self
            .handles
            .lock()
            .map_err(|e| EngineError::Storage(format!("handle lock poisoned: {e}")))?;
        Ok(handles
            .get(&(workspace.clone(), purpose))
            .map(|log| log.turns.clone())
            .unwrap_or_default())
    }
}

// =============================================================================
// Tests
// =============================================================================
