use std::fmt;

use crate::assist::Suggestion;
use crate::tree::{NodeDraft, NodeId, NodeType};

/// Lifecycle of the cause tree page.
///
/// `Loading`, `Generating` and `Saving` only exist while the matching
/// operation is awaiting the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// A tree load is in flight.
    Loading,
    /// A tree is shown and nothing is in flight.
    Ready,
    /// The load failed or nothing was selected; a fallback tree is shown.
    Fallback { message: String },
    /// The node editor is open.
    Editing(EditSession),
    /// AI tree generation is in flight.
    Generating,
    /// A save or delete round-trip is in flight.
    Saving,
}

impl PageState {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            PageState::Loading => "loading",
            PageState::Ready => "ready",
            PageState::Fallback { .. } => "fallback",
            PageState::Editing(_) => "editing",
            PageState::Generating => "generating",
            PageState::Saving => "saving",
        }
    }

    /// Whether a new operation may start.
    pub fn is_idle(&self) -> bool {
        match self {
            PageState::Ready | PageState::Fallback { .. } => true,
            PageState::Loading
            | PageState::Editing(_)
            | PageState::Generating
            | PageState::Saving => false,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the node editor is doing.
#[derive(Debug, Clone, PartialEq)]
pub enum EditMode {
    /// Adding a child under `parent_id`.
    Add { parent_id: NodeId },
    /// Editing `node_id` in place.
    Edit { node_id: NodeId },
}

impl EditMode {
    /// Node the AI uses as context: the parent when adding, the node itself
    /// when editing.
    pub fn context_id(&self) -> &NodeId {
        match self {
            EditMode::Add { parent_id } => parent_id,
            EditMode::Edit { node_id } => node_id,
        }
    }
}

/// Open node editor.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    /// Adding a child or editing a node.
    pub mode: EditMode,
    /// Form contents.
    pub draft: NodeDraft,
    /// Error from the last AI suggestion attempt.
    pub ai_error: Option<String>,
    /// Last suggestion applied to the draft.
    pub suggestion: Option<Suggestion>,
}

impl EditSession {
    /// Editor for a new child; new causes start as conditions.
    pub fn add(parent_id: NodeId) -> Self {
        Self {
            mode: EditMode::Add { parent_id },
            draft: NodeDraft::new("", NodeType::Condition),
            ai_error: None,
            suggestion: None,
        }
    }

    /// Editor for an existing node.
    pub fn edit(node_id: NodeId, draft: NodeDraft) -> Self {
        Self {
            mode: EditMode::Edit { node_id },
            draft,
            ai_error: None,
            suggestion: None,
        }
    }
}
