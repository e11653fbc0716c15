//! Cause tree model and in-memory mutation engine.
//!
//! A cause tree is rooted at the accident and descends through the facts that
//! produced it. Each node owns its children exclusively; the AND/OR gate of a
//! node describes how its immediate children combine and is never inherited.
//!
//! - [`CauseNode`]: the tree entity as exchanged with the backend
//! - [`engine`]: find, clone, add, edit and fact numbering
//! - [`demo_tree`]: fixture shown when no persisted tree is addressable
//! - [`render_outline`] / [`fact_legend`]: read-only projections

mod demo;
pub mod engine;
mod render;

pub use demo::demo_tree;
pub use engine::{
    add_child, assign_fact_numbers, clone_tree, edit_node, find_node, find_node_mut,
    new_node_id, validate_tree, walk_preorder,
};
pub use render::{fact_legend, render_outline, LegendEntry};

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{TreeError, TreeResult};

/// Identifier of a node or a persisted record.
///
/// The backend hands out numeric ids while locally created nodes use strings;
/// equality and hashing compare the textual form so `3` and `"3"` match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric identifier.
    Num(i64),
    /// Textual identifier.
    Text(String),
}

/// Identifier of a node within one tree.
pub type NodeId = Id;

/// Identifier of a persisted tree record.
pub type TreeId = Id;

impl Id {
    /// Textual form used for comparisons and parent references.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Id::Num(n) => Cow::Owned(n.to_string()),
            Id::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Parse user input, preferring a numeric id when the text is an integer.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Id::Num(n),
            Err(_) => Id::Text(trimmed.to_string()),
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.as_key() == other.as_key()
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_key().hash(state);
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Num(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Num(i64::from(n))
    }
}

impl From<u32> for Id {
    fn from(n: u32) -> Self {
        Id::Num(i64::from(n))
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}

/// Fixed vocabulary of cause node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeType {
    /// The accident itself (tree root by convention).
    #[serde(rename = "Accidente", alias = "Accident")]
    Accident,
    /// An observable fact.
    #[default]
    #[serde(rename = "Hecho", alias = "Fact")]
    Fact,
    /// A management or organisational cause.
    #[serde(rename = "Gestión", alias = "Gestion", alias = "Management")]
    Management,
    /// An unsafe condition.
    #[serde(rename = "Condición", alias = "Condicion", alias = "Condition")]
    Condition,
    /// An unsafe action.
    #[serde(rename = "Acción", alias = "Accion", alias = "Action")]
    Action,
}

impl NodeType {
    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Accident => "Accidente",
            NodeType::Fact => "Hecho",
            NodeType::Management => "Gestión",
            NodeType::Condition => "Condición",
            NodeType::Action => "Acción",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accidente" | "accident" => Ok(NodeType::Accident),
            "hecho" | "fact" => Ok(NodeType::Fact),
            "gestión" | "gestion" | "management" => Ok(NodeType::Management),
            "condición" | "condicion" | "condition" => Ok(NodeType::Condition),
            "acción" | "accion" | "action" => Ok(NodeType::Action),
            _ => Err(format!("Unknown node type: {}", s)),
        }
    }
}

/// How the children of a node combine to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChildrenLogic {
    /// All children were jointly necessary.
    And,
    /// Any single child suffices.
    Or,
}

impl ChildrenLogic {
    /// Default gate for a node with `child_count` children.
    pub fn default_for(child_count: usize) -> Self {
        if child_count > 1 {
            ChildrenLogic::And
        } else {
            ChildrenLogic::Or
        }
    }

    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildrenLogic::And => "AND",
            ChildrenLogic::Or => "OR",
        }
    }
}

impl fmt::Display for ChildrenLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a fact has been proven or is still under investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FactStatus {
    /// Established fact.
    #[default]
    #[serde(rename = "Confirmado")]
    Confirmed,
    /// Still under investigation.
    #[serde(rename = "Pendiente")]
    Pending,
}

impl FactStatus {
    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::Confirmed => "Confirmado",
            FactStatus::Pending => "Pendiente",
        }
    }

    /// Anything other than an explicit pending marker counts as confirmed.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "pendiente" | "pending" => FactStatus::Pending,
            _ => FactStatus::Confirmed,
        }
    }
}

impl fmt::Display for FactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Traceability fields attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// Display-only sequential label; never part of identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_number: Option<u32>,
    /// Confirmation status, confirmed when absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_status"
    )]
    pub status: Option<FactStatus>,
    /// Surface that created or last rebuilt the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NodeMeta {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.fact_number.is_none() && self.status.is_none() && self.source.is_none()
    }
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<FactStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| FactStatus::from_label(&s)))
}

/// A node in the causal tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseNode {
    /// Node id, numeric or text.
    pub id: NodeId,
    /// Statement.
    #[serde(default)]
    pub text: String,
    /// Category.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Child causes, in order.
    #[serde(default)]
    pub children: Vec<CauseNode>,
    /// Gate combining the children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_logic: Option<ChildrenLogic>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Numbering, status and audit data.
    #[serde(default, skip_serializing_if = "NodeMeta::is_empty")]
    pub meta: NodeMeta,
}

impl CauseNode {
    /// Create a leaf node.
    pub fn new(id: impl Into<NodeId>, text: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            node_type,
            children: Vec::new(),
            children_logic: None,
            notes: None,
            meta: NodeMeta::default(),
        }
    }

    /// Append a child.
    pub fn with_child(mut self, child: CauseNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set the children gate.
    pub fn with_logic(mut self, logic: ChildrenLogic) -> Self {
        self.children_logic = Some(logic);
        self
    }

    /// Set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the confirmation status.
    pub fn with_status(mut self, status: FactStatus) -> Self {
        self.meta.status = Some(status);
        self
    }

    /// Set an explicit fact number.
    pub fn with_fact_number(mut self, n: u32) -> Self {
        self.meta.fact_number = Some(n);
        self
    }

    /// Confirmation status, defaulting to confirmed.
    pub fn status(&self) -> FactStatus {
        self.meta.status.unwrap_or_default()
    }

    /// Gate in effect for this node: the explicit value, else the default for
    /// its child count. Leaves have none.
    pub fn effective_logic(&self) -> Option<ChildrenLogic> {
        if self.children.is_empty() {
            return None;
        }
        Some(
            self.children_logic
                .unwrap_or_else(|| ChildrenLogic::default_for(self.children.len())),
        )
    }

    /// Number of nodes in this subtree, self included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CauseNode::node_count).sum::<usize>()
    }
}

/// User-entered content for a new or edited node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDraft {
    /// Statement.
    pub text: String,
    /// Category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Gate to set on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_logic: Option<ChildrenLogic>,
}

impl NodeDraft {
    /// Create a draft with text and type.
    pub fn new(text: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            text: text.into(),
            node_type,
            notes: None,
            children_logic: None,
        }
    }

    /// Draft pre-filled from an existing node, for edit mode.
    pub fn from_node(node: &CauseNode) -> Self {
        Self {
            text: node.text.clone(),
            node_type: node.node_type,
            notes: node.notes.clone(),
            children_logic: node.children_logic,
        }
    }

    /// Set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the children gate.
    pub fn with_logic(mut self, logic: ChildrenLogic) -> Self {
        self.children_logic = Some(logic);
        self
    }

    /// Reject drafts without a fact statement.
    pub fn validate(&self) -> TreeResult<()> {
        if self.text.trim().is_empty() {
            return Err(TreeError::empty("text"));
        }
        Ok(())
    }

    /// Trimmed notes, `None` when blank.
    pub fn clean_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}
