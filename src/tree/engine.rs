//! Pure tree operations.
//!
//! Every mutating operation works on a deep copy and returns it, so a caller
//! can keep displaying the previous tree until it decides to adopt the new
//! one. Nothing here touches the network.

use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::{CauseNode, ChildrenLogic, NodeDraft, NodeId};
use crate::error::{TreeError, TreeResult};

/// Depth-first search for `id`, root included.
pub fn find_node<'a>(root: &'a CauseNode, id: &NodeId) -> Option<&'a CauseNode> {
    if &root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_node(child, id))
}

/// Mutable variant of [`find_node`].
pub fn find_node_mut<'a>(root: &'a mut CauseNode, id: &NodeId) -> Option<&'a mut CauseNode> {
    if &root.id == id {
        return Some(root);
    }
    root.children
        .iter_mut()
        .find_map(|child| find_node_mut(child, id))
}

/// Structural deep copy; the result shares nothing with `root`.
pub fn clone_tree(root: &CauseNode) -> CauseNode {
    CauseNode {
        id: root.id.clone(),
        text: root.text.clone(),
        node_type: root.node_type,
        children: root.children.iter().map(clone_tree).collect(),
        children_logic: root.children_logic,
        notes: root.notes.clone(),
        meta: root.meta.clone(),
    }
}

/// Fresh node id: millisecond timestamp plus a random suffix.
pub fn new_node_id() -> NodeId {
    let suffix = Uuid::new_v4().simple().to_string();
    NodeId::Text(format!(
        "n{}_{}",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    ))
}

/// Append a new child built from `draft` under `parent_id`.
///
/// A parent that now has several children and no gate yet becomes `AND`.
pub fn add_child(root: &CauseNode, parent_id: &NodeId, draft: &NodeDraft) -> TreeResult<CauseNode> {
    draft.validate()?;

    let mut tree = clone_tree(root);
    let parent = find_node_mut(&mut tree, parent_id).ok_or_else(|| TreeError::ParentNotFound {
        parent_id: parent_id.to_string(),
    })?;

    let child_id = new_node_id();
    parent.children.push(CauseNode {
        id: child_id.clone(),
        text: draft.text.trim().to_string(),
        node_type: draft.node_type,
        children: Vec::new(),
        children_logic: Some(draft.children_logic.unwrap_or(ChildrenLogic::And)),
        notes: draft.clean_notes(),
        meta: Default::default(),
    });

    if parent.children.len() > 1 && parent.children_logic.is_none() {
        parent.children_logic = Some(ChildrenLogic::And);
    }

    debug!(parent = %parent_id, node = %child_id, "Child added");
    Ok(tree)
}

/// Overwrite text, type, notes and gate of `node_id` with `draft`.
///
/// The existing gate is kept when the draft leaves it unset.
pub fn edit_node(root: &CauseNode, node_id: &NodeId, draft: &NodeDraft) -> TreeResult<CauseNode> {
    draft.validate()?;

    let mut tree = clone_tree(root);
    let node = find_node_mut(&mut tree, node_id).ok_or_else(|| TreeError::NodeNotFound {
        node_id: node_id.to_string(),
    })?;

    node.text = draft.text.trim().to_string();
    node.node_type = draft.node_type;
    node.notes = draft.clean_notes();
    node.children_logic = draft.children_logic.or(node.children_logic);

    debug!(node = %node_id, "Node edited");
    Ok(tree)
}

/// Copy of `root` where every non-root node lacking a fact number receives
/// the next unused integer in pre-order. Root gets `0` if unset. Existing
/// numbers are never touched.
pub fn assign_fact_numbers(root: &CauseNode) -> CauseNode {
    let mut tree = clone_tree(root);

    let mut used = HashSet::new();
    for child in &tree.children {
        collect_numbers(child, &mut used);
    }

    if tree.meta.fact_number.is_none() {
        tree.meta.fact_number = Some(0);
    }

    let mut next = 1;
    for child in tree.children.iter_mut() {
        fill_numbers(child, &mut used, &mut next);
    }
    tree
}

fn collect_numbers(node: &CauseNode, used: &mut HashSet<u32>) {
    if let Some(n) = node.meta.fact_number {
        used.insert(n);
    }
    for child in &node.children {
        collect_numbers(child, used);
    }
}

fn fill_numbers(node: &mut CauseNode, used: &mut HashSet<u32>, next: &mut u32) {
    if node.meta.fact_number.is_none() {
        while used.contains(next) {
            *next += 1;
        }
        node.meta.fact_number = Some(*next);
        used.insert(*next);
        *next += 1;
    }
    for child in node.children.iter_mut() {
        fill_numbers(child, used, next);
    }
}

/// Check that ids are unique across the tree.
pub fn validate_tree(root: &CauseNode) -> TreeResult<()> {
    let mut seen = HashSet::new();
    check_unique(root, &mut seen)
}

fn check_unique(node: &CauseNode, seen: &mut HashSet<NodeId>) -> TreeResult<()> {
    if !seen.insert(node.id.clone()) {
        return Err(TreeError::DuplicateId {
            node_id: node.id.to_string(),
        });
    }
    node.children
        .iter()
        .try_for_each(|child| check_unique(child, seen))
}

/// Visit nodes in pre-order with their depth (root at 0).
pub fn walk_preorder<'a, F>(root: &'a CauseNode, visit: &mut F)
where
    F: FnMut(&'a CauseNode, usize),
{
    fn go<'a, F>(node: &'a CauseNode, depth: usize, visit: &mut F)
    where
        F: FnMut(&'a CauseNode, usize),
    {
        visit(node, depth);
        for child in &node.children {
            go(child, depth + 1, visit);
        }
    }
    go(root, 0, visit);
}
