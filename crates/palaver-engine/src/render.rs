//! Render notification seam.
//!
//! The engine announces state changes; the rendering collaborator reads the
//! current session state back out and redraws. The engine never pushes
//! content through this interface.

use palaver_core::types::{Channel, WorkspaceId};

/// Callback invoked after every mutation batch on a session.
///
/// Fires on both success and failure paths of a dispatched turn, so a
/// renderer that redraws on every call never shows a stale busy state.
pub trait StateListener: Send + Sync {
    fn on_state_changed(&self, workspace: &WorkspaceId, channel: Channel);
}

/// Listener that ignores all notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullListener;

impl StateListener for NullListener {
    fn on_state_changed(&self, _workspace: &WorkspaceId, _channel: Channel) {}
}
