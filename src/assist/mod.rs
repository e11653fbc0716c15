//! AI-assisted drafting.
//!
//! Two independent requests go to the inference service through the backend:
//! a single-node suggestion and a full tree generation. Neither mutates
//! anything on failure; the caller decides whether to adopt the result.
//! When the service cannot be reached, node suggestions can be answered by a
//! local keyword heuristic instead.

mod heuristic;

pub use heuristic::{suggest_child, LOCAL_NOTE};

use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::api::{
    CauseTreeBackend, DraftPayload, GenerateMode, NodeSuggestion, SuggestNodeRequest, TreeRecord,
};
use crate::config::AssistConfig;
use crate::error::{ApiError, AppResult, PageError};
use crate::tree::{validate_tree, CauseNode, NodeDraft, NodeType, TreeId};

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// The inference service.
    Remote,
    /// The local keyword heuristic.
    Heuristic,
}

/// A suggestion ready to prefill a node draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Increases with every suggestion so a view can tell a fresh prefill.
    pub request_id: u64,
    /// Suggested statement.
    pub text: String,
    /// Suggested category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Suggested notes.
    pub notes: Option<String>,
    /// Where the suggestion came from.
    pub source: SuggestionSource,
}

impl Suggestion {
    /// Overwrite the draft's text, type and notes.
    pub fn apply_to(&self, draft: &mut NodeDraft) {
        draft.text = self.text.clone();
        draft.node_type = self.node_type;
        draft.notes = self.notes.clone();
    }
}

/// Stateless-per-call assist session; only the last suggestion is retained.
#[derive(Debug, Clone)]
pub struct AssistSession {
    config: AssistConfig,
    next_request_id: u64,
    last: Option<Suggestion>,
}

impl AssistSession {
    /// Session with no request in flight.
    pub fn new(config: AssistConfig) -> Self {
        Self {
            config,
            next_request_id: 1,
            last: None,
        }
    }

    /// Last suggestion handed out.
    pub fn last_suggestion(&self) -> Option<&Suggestion> {
        self.last.as_ref()
    }

    /// Suggest content for a node next to `context`.
    ///
    /// Without a persisted tree, or when the service is unreachable, the
    /// heuristic answers if enabled. Service rejections (4xx, malformed body)
    /// are surfaced as errors.
    pub async fn suggest_node<B>(
        &mut self,
        backend: &B,
        tree_id: Option<&TreeId>,
        context: &CauseNode,
        draft: Option<&NodeDraft>,
    ) -> AppResult<Suggestion>
    where
        B: CauseTreeBackend + ?Sized,
    {
        let Some(tree_id) = tree_id else {
            if self.config.heuristic_fallback {
                info!(context = %context.id, "No persisted tree, using local suggestion");
                return Ok(self.record(
                    suggest_child(&context.text, context.node_type, draft),
                    SuggestionSource::Heuristic,
                ));
            }
            return Err(PageError::NoSelection {
                action: "request an AI suggestion".to_string(),
            }
            .into());
        };

        let request = SuggestNodeRequest {
            parent_text: context.text.clone(),
            parent_type: context.node_type,
            current_draft: draft.map(DraftPayload::from),
        };

        let start = Instant::now();
        match backend.suggest_node(tree_id, &request).await {
            Ok(remote) if remote.text.trim().is_empty() => Err(ApiError::InvalidResponse {
                message: "Suggestion without text".to_string(),
            }
            .into()),
            Ok(remote) => {
                info!(
                    tree = %tree_id,
                    context = %context.id,
                    latency_ms = start.elapsed().as_millis(),
                    "Node suggestion received"
                );
                Ok(self.record(remote, SuggestionSource::Remote))
            }
            Err(e) if e.is_transient() && self.config.heuristic_fallback => {
                warn!(
                    tree = %tree_id,
                    error = %e,
                    "Inference service unreachable, using local suggestion"
                );
                Ok(self.record(
                    suggest_child(&context.text, context.node_type, draft),
                    SuggestionSource::Heuristic,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask the backend to generate the tree `tree_id`.
    ///
    /// The returned root is checked for duplicate ids before it is handed
    /// back; a malformed tree is reported as an invalid response.
    pub async fn generate_tree<B>(
        &mut self,
        backend: &B,
        tree_id: &TreeId,
        mode: GenerateMode,
    ) -> AppResult<TreeRecord>
    where
        B: CauseTreeBackend + ?Sized,
    {
        let start = Instant::now();
        let record = backend.generate_tree(tree_id, mode).await?;

        validate_tree(&record.root).map_err(|e| ApiError::InvalidResponse {
            message: format!("Generated tree rejected: {}", e),
        })?;

        info!(
            tree = %tree_id,
            mode = ?mode,
            nodes = record.root.node_count(),
            latency_ms = start.elapsed().as_millis(),
            "AI tree generated"
        );
        Ok(record)
    }

    fn record(&mut self, suggestion: NodeSuggestion, source: SuggestionSource) -> Suggestion {
        let out = Suggestion {
            request_id: self.next_request_id,
            text: suggestion.text.trim().to_string(),
            node_type: suggestion.node_type,
            notes: suggestion.notes,
            source,
        };
        self.next_request_id += 1;
        self.last = Some(out.clone());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_apply_overwrites_draft() {
        let suggestion = Suggestion {
            request_id: 1,
            text: "Fuga de aceite".to_string(),
            node_type: NodeType::Condition,
            notes: None,
            source: SuggestionSource::Remote,
        };
        let mut draft = NodeDraft::new("old", NodeType::Fact).with_notes("old notes");
        suggestion.apply_to(&mut draft);
        assert_eq!(draft.text, "Fuga de aceite");
        assert_eq!(draft.node_type, NodeType::Condition);
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn test_record_increments_request_id() {
        let mut session = AssistSession::new(AssistConfig::default());
        let first = session.record(
            suggest_child("a", NodeType::Accident, None),
            SuggestionSource::Heuristic,
        );
        let second = session.record(
            suggest_child("b", NodeType::Accident, None),
            SuggestionSource::Heuristic,
        );
        assert!(second.request_id > first.request_id);
        assert_eq!(session.last_suggestion(), Some(&second));
    }
}
