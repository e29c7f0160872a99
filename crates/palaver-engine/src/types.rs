//! Engine-local types: submission outcomes and the conversation-turn mirror.

use serde::{Deserialize, Serialize};

/// Outcome of a `submit` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// A handler ran to completion (its result, success or in-session error,
    /// is in the history).
    Dispatched,
    /// The submission was dropped without side effects.
    Rejected(RejectReason),
}

/// Why a submission was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Input trimmed to the empty string.
    EmptyInput,
    /// A dispatch is already in flight for the gated scope.
    Busy,
    /// Initialization failed; the engine makes no provider calls.
    Inert,
}

/// One recorded conversation turn.
///
/// The provider retains the authoritative history behind each handle; the
/// engine mirrors turns locally so multi-turn refinement is inspectable
/// without provider-side state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user: String,
    pub reply: String,
}
