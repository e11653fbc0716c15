use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::{CauseNode, Id, NodeDraft, NodeType, TreeId};

/// Response body, either wrapped as `{ "data": ... }` or bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    /// Payload under a `data` key.
    Wrapped { data: T },
    /// Payload at the top level.
    Bare(T),
}

impl<T> Envelope<T> {
    /// Unwrap the payload.
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

/// A persisted cause tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRecord {
    /// Backend id.
    pub id: TreeId,
    /// Finding the tree belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallazgo_id: Option<Id>,
    /// Root node.
    pub root: CauseNode,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Entry of the tree history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    /// Backend id.
    pub id: TreeId,
    /// Finding the tree belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallazgo_id: Option<Id>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Filters for listing trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTreesQuery {
    /// Only trees of this finding.
    pub hallazgo_id: Option<Id>,
    /// Maximum number of entries.
    pub limit: Option<u32>,
}

impl ListTreesQuery {
    /// Latest `limit` trees.
    pub fn latest(limit: u32) -> Self {
        Self {
            hallazgo_id: None,
            limit: Some(limit),
        }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(h) = &self.hallazgo_id {
            pairs.push(("hallazgoId", h.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Body for creating a tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreeRequest {
    /// Finding to attach the tree to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallazgo_id: Option<Id>,
    /// Root node.
    pub root: CauseNode,
}

/// Audit tag naming the surface that produced an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditMeta {
    /// Surface that made the edit, such as `ui_edit`.
    pub source: String,
    /// Finer-grained action name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl EditMeta {
    /// Tag for edits made by `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            action: None,
        }
    }

    /// Set the action name.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Edit made through the node modal.
    pub fn ui_edit() -> Self {
        Self::new("ui_edit")
    }
}

/// Body for replacing a tree's root.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTreeRequest {
    /// New root.
    pub root: CauseNode,
    /// Audit tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<EditMeta>,
}

/// Result of deleting a tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteResponse {
    /// Deleted tree id.
    pub id: TreeId,
    /// False when the backend kept the tree.
    pub deleted: bool,
}

/// How a generated tree combines with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    /// Replace the stored tree.
    #[default]
    Overwrite,
    /// Merge into the stored tree.
    Merge,
}

impl std::str::FromStr for GenerateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(GenerateMode::Overwrite),
            "merge" => Ok(GenerateMode::Merge),
            _ => Err(format!("Unknown generate mode: {}", s)),
        }
    }
}

/// Body for AI tree generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateTreeRequest {
    /// Replace or merge.
    pub mode: GenerateMode,
}

/// Draft echoed to the suggestion service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPayload {
    /// Node statement.
    pub text: String,
    /// Node category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl From<&NodeDraft> for DraftPayload {
    fn from(draft: &NodeDraft) -> Self {
        Self {
            text: draft.text.clone(),
            node_type: draft.node_type,
            notes: draft.clean_notes(),
        }
    }
}

/// Body for a single-node suggestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestNodeRequest {
    /// Statement of the node receiving the child.
    pub parent_text: String,
    /// Category of that node.
    pub parent_type: NodeType,
    /// Draft already typed in the modal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_draft: Option<DraftPayload>,
}

/// Suggested node content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSuggestion {
    /// Suggested statement.
    pub text: String,
    /// Suggested category.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Suggested notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Header fields of an investigation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFicha {
    /// Company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empresa: Option<String>,
    /// Name of the injured worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    /// National id of the worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
    /// Job title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo: Option<String>,
    /// Date of the accident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<String>,
    /// Time of the accident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hora: Option<String>,
    /// Place of the accident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lugar: Option<String>,
}

/// Report (ficha + narrative) attached to a tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseTreeReport {
    /// Tree the report belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_tree_id: Option<TreeId>,
    /// Finding the report belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallazgo_id: Option<Id>,
    /// Header fields.
    #[serde(default)]
    pub ficha: ReportFicha,
    /// Narrative of the accident.
    #[serde(default)]
    pub relato: Option<String>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for upserting a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReportRequest {
    /// Finding the report belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallazgo_id: Option<Id>,
    /// Header fields.
    pub ficha: ReportFicha,
    /// Narrative of the accident.
    pub relato: Option<String>,
}

/// A corrective measure tied to a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Backend id.
    pub id: Id,
    /// Tree the measure belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_tree_id: Option<TreeId>,
    /// Node the measure addresses.
    #[serde(default)]
    pub cause_node_id: Option<Id>,
    /// Root cause it addresses.
    #[serde(default)]
    pub causa_raiz: Option<String>,
    /// Corrective action.
    #[serde(default)]
    pub medida_correctiva: String,
    /// Person in charge.
    #[serde(default)]
    pub responsable: Option<String>,
    /// Due date.
    #[serde(default)]
    pub fecha_compromiso: Option<String>,
    /// Progress state.
    #[serde(default)]
    pub estado: Option<String>,
}

/// Body for creating or updating a measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureInput {
    /// Node the measure addresses.
    pub cause_node_id: Option<Id>,
    /// Root cause it addresses.
    pub causa_raiz: Option<String>,
    /// Corrective action; must not be blank.
    pub medida_correctiva: String,
    /// Person in charge.
    pub responsable: Option<String>,
    /// Due date.
    pub fecha_compromiso: Option<String>,
    /// Progress state.
    pub estado: Option<String>,
}

impl MeasureInput {
    /// Measure with only the corrective action set.
    pub fn new(medida_correctiva: impl Into<String>) -> Self {
        Self {
            medida_correctiva: medida_correctiva.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope<DeleteResponse> =
            serde_json::from_value(json!({ "data": { "id": 4, "deleted": true } })).unwrap();
        assert!(wrapped.into_inner().deleted);

        let bare: Envelope<DeleteResponse> =
            serde_json::from_value(json!({ "id": "4", "deleted": false })).unwrap();
        let inner = bare.into_inner();
        assert_eq!(inner.id, Id::Num(4));
        assert!(!inner.deleted);
    }

    #[test]
    fn test_tree_record_deserialize() {
        let record: TreeRecord = serde_json::from_value(json!({
            "id": 12,
            "hallazgoId": 3,
            "root": { "id": 1, "text": "Caída", "type": "Accidente", "children": [] },
            "updatedAt": "2025-11-05T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.id, Id::Num(12));
        assert_eq!(record.hallazgo_id, Some(Id::Num(3)));
        assert!(record.updated_at.is_some());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_suggest_request_serialize() {
        let request = SuggestNodeRequest {
            parent_text: "Falla de frenos".to_string(),
            parent_type: NodeType::Condition,
            current_draft: Some(DraftPayload::from(&NodeDraft::new("", NodeType::Fact))),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["parentText"], "Falla de frenos");
        assert_eq!(value["parentType"], "Condición");
        assert_eq!(value["currentDraft"]["type"], "Hecho");
        assert!(value["currentDraft"]["notes"].is_null());
    }

    #[test]
    fn test_generate_mode_serialize() {
        let value = serde_json::to_value(GenerateTreeRequest {
            mode: GenerateMode::Merge,
        })
        .unwrap();
        assert_eq!(value, json!({ "mode": "merge" }));
        assert_eq!("OVERWRITE".parse::<GenerateMode>(), Ok(GenerateMode::Overwrite));
    }

    #[test]
    fn test_list_query_pairs() {
        let query = ListTreesQuery {
            hallazgo_id: Some(Id::Num(9)),
            limit: Some(5),
        };
        assert_eq!(
            query.to_pairs(),
            vec![("hallazgoId", "9".to_string()), ("limit", "5".to_string())]
        );
        assert!(ListTreesQuery::default().to_pairs().is_empty());
    }

    #[test]
    fn test_measure_input_serialize() {
        let value = serde_json::to_value(MeasureInput::new("Instalar barrera")).unwrap();
        assert_eq!(value["medidaCorrectiva"], "Instalar barrera");
        assert!(value["causaRaiz"].is_null());
    }
}
