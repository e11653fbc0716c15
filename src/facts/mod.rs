//! Facts <-> tree reconciliation.
//!
//! The list surface edits one [`FactItem`] per non-root node. Parent links are
//! textual: `root` or `f<n>` where `n` is another item's id. [`flatten`]
//! projects a tree onto that list and [`unflatten`] rebuilds a tree from it,
//! repairing dangling and cyclic parent references by attaching the offending
//! item under the root.

mod editor;

pub use editor::{FactsEditor, ParentOption};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::tree::{assign_fact_numbers, CauseNode, ChildrenLogic, FactStatus, Id, NodeMeta, NodeType};

/// Parent reference token for direct children of the accident.
pub const ROOT_REF: &str = "root";

/// Audit source recorded on nodes rebuilt from the list.
pub const FACTS_SOURCE: &str = "facts_editor";

/// Notes given to a pending fact left without notes.
pub const PENDING_NOTE: &str = "Pendiente de investigación";

/// Fallback accident text when the list carries none.
const DEFAULT_ACCIDENT_TEXT: &str = "Accidente";

/// One row of the flat facts list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactItem {
    /// Local 1-based index, doubling as the fact number.
    pub id: u32,
    /// Fact statement; blank rows are dropped on rebuild.
    #[serde(default)]
    pub text: String,
    /// Category of the node.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Confirmed or pending.
    #[serde(default)]
    pub status: FactStatus,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// `root` or the node id `f<n>` of another item.
    #[serde(default = "root_ref")]
    pub parent: String,
}

fn root_ref() -> String {
    ROOT_REF.to_string()
}

impl FactItem {
    /// Blank row attached to the root.
    pub fn blank(id: u32) -> Self {
        Self {
            id,
            text: String::new(),
            node_type: NodeType::Fact,
            status: FactStatus::Confirmed,
            notes: String::new(),
            parent: root_ref(),
        }
    }

    /// Node id synthesized for this item.
    pub fn node_ref(&self) -> String {
        fact_ref(self.id)
    }
}

/// Node id synthesized for fact number `n`.
pub fn fact_ref(n: u32) -> String {
    format!("f{}", n)
}

/// Gate per parent, keyed by `root` or `f<n>`.
pub type LogicTable = BTreeMap<String, ChildrenLogic>;

/// A tree projected onto the list surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedTree {
    /// Root statement.
    #[serde(default)]
    pub accident_text: String,
    /// Facts in pre-order, so sibling order survives a rebuild.
    #[serde(default)]
    pub items: Vec<FactItem>,
    /// Gate of every branching node, root included.
    #[serde(default)]
    pub logic: LogicTable,
}

impl FlattenedTree {
    /// Rebuild the tree.
    pub fn to_tree(&self) -> CauseNode {
        unflatten(&self.accident_text, &self.items, &self.logic)
    }
}

/// Project `root` onto the facts list.
///
/// Items are emitted in pre-order. Each keeps the node's fact number when it
/// has one, otherwise the next unused number. A number already emitted for
/// an earlier node is replaced by a fresh one so item ids stay unique.
pub fn flatten(root: &CauseNode) -> FlattenedTree {
    let numbered = assign_fact_numbers(root);

    let mut taken: HashSet<u32> = HashSet::new();
    let mut spare = numbered.node_count() as u32;

    let mut items = Vec::new();
    let mut logic = LogicTable::new();
    if let Some(gate) = numbered.effective_logic() {
        logic.insert(ROOT_REF.to_string(), gate);
    }

    let mut stack: Vec<(&CauseNode, String)> = numbered
        .children
        .iter()
        .rev()
        .map(|c| (c, ROOT_REF.to_string()))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        let mut number = node.meta.fact_number.unwrap_or_default();
        if number == 0 || !taken.insert(number) {
            while taken.contains(&spare) || spare == 0 {
                spare += 1;
            }
            number = spare;
            taken.insert(number);
        }

        let own_ref = fact_ref(number);
        if let Some(gate) = node.effective_logic() {
            logic.insert(own_ref.clone(), gate);
        }

        items.push(FactItem {
            id: number,
            text: node.text.trim().to_string(),
            node_type: node.node_type,
            status: node.status(),
            notes: node.notes.as_deref().unwrap_or_default().trim().to_string(),
            parent,
        });

        for child in node.children.iter().rev() {
            stack.push((child, own_ref.clone()));
        }
    }

    FlattenedTree {
        accident_text: numbered.text.trim().to_string(),
        items,
        logic,
    }
}

/// Rebuild a tree from the facts list.
///
/// Items with blank text are dropped. Each item becomes node `f<id>`; the
/// first item wins when ids repeat. A parent that does not resolve, resolves
/// to the item itself, or closes a cycle sends the item under the root. Every
/// node that ends up with children gets its gate from `logic`, defaulting to
/// `AND` for several children and `OR` for one.
pub fn unflatten(accident_text: &str, items: &[FactItem], logic: &LogicTable) -> CauseNode {
    let mut nodes: HashMap<String, CauseNode> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut declared: HashMap<String, String> = HashMap::new();

    for item in items {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }
        let key = item.node_ref();
        if nodes.contains_key(&key) {
            debug!(fact = %key, "Duplicate fact id ignored");
            continue;
        }

        let notes = match (item.status, item.notes.trim()) {
            (FactStatus::Pending, "") => Some(PENDING_NOTE.to_string()),
            (_, "") => None,
            (_, n) => Some(n.to_string()),
        };

        nodes.insert(
            key.clone(),
            CauseNode {
                id: Id::Text(key.clone()),
                text: text.to_string(),
                node_type: item.node_type,
                children: Vec::new(),
                children_logic: None,
                notes,
                meta: NodeMeta {
                    fact_number: Some(item.id),
                    status: Some(item.status),
                    source: Some(FACTS_SOURCE.to_string()),
                },
            },
        );
        declared.insert(key.clone(), item.parent.trim().to_string());
        order.push(key);
    }

    let mut parent_of: HashMap<String, String> = HashMap::new();
    for key in &order {
        let wanted = declared.get(key).map(String::as_str).unwrap_or(ROOT_REF);
        let resolved = if wanted == ROOT_REF {
            ROOT_REF.to_string()
        } else if wanted == key.as_str() {
            debug!(fact = %key, "Self-parented fact moved under root");
            ROOT_REF.to_string()
        } else if !nodes.contains_key(wanted) {
            debug!(fact = %key, parent = %wanted, "Dangling parent, fact moved under root");
            ROOT_REF.to_string()
        } else if closes_cycle(key, wanted, &parent_of, &declared) {
            debug!(fact = %key, parent = %wanted, "Cyclic parent, fact moved under root");
            ROOT_REF.to_string()
        } else {
            wanted.to_string()
        };
        parent_of.insert(key.clone(), resolved);
    }

    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    for key in &order {
        if let Some(parent) = parent_of.get(key) {
            children_of.entry(parent.clone()).or_default().push(key.clone());
        }
    }

    let text = accident_text.trim();
    let mut root = CauseNode {
        id: Id::from(ROOT_REF),
        text: if text.is_empty() {
            DEFAULT_ACCIDENT_TEXT.to_string()
        } else {
            text.to_string()
        },
        node_type: NodeType::Accident,
        children: Vec::new(),
        children_logic: None,
        notes: None,
        meta: NodeMeta {
            fact_number: Some(0),
            status: None,
            source: Some(FACTS_SOURCE.to_string()),
        },
    };

    root.children = attach(ROOT_REF, &children_of, &mut nodes, logic);
    if !root.children.is_empty() {
        root.children_logic = Some(gate_for(ROOT_REF, root.children.len(), logic));
    }
    root
}

/// True when following resolved links upward from `parent` reaches `key`.
fn closes_cycle(
    key: &str,
    parent: &str,
    resolved: &HashMap<String, String>,
    declared: &HashMap<String, String>,
) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = parent;
    loop {
        if cursor == key {
            return true;
        }
        if cursor == ROOT_REF || !seen.insert(cursor) {
            return false;
        }
        // Items not yet resolved follow their declared parent.
        cursor = match resolved.get(cursor).or_else(|| declared.get(cursor)) {
            Some(next) => next.as_str(),
            None => return false,
        };
    }
}

fn attach(
    parent: &str,
    children_of: &HashMap<String, Vec<String>>,
    nodes: &mut HashMap<String, CauseNode>,
    logic: &LogicTable,
) -> Vec<CauseNode> {
    let Some(keys) = children_of.get(parent) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(mut node) = nodes.remove(key) else {
            continue;
        };
        node.children = attach(key, children_of, nodes, logic);
        if !node.children.is_empty() {
            node.children_logic = Some(gate_for(key, node.children.len(), logic));
        }
        out.push(node);
    }
    out
}

fn gate_for(key: &str, child_count: usize, logic: &LogicTable) -> ChildrenLogic {
    logic
        .get(key)
        .copied()
        .unwrap_or_else(|| ChildrenLogic::default_for(child_count))
}
