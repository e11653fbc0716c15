use serde::Serialize;
use tracing::debug;

use super::{flatten, unflatten, FactItem, FlattenedTree, LogicTable, FACTS_SOURCE, ROOT_REF};
use crate::api::EditMeta;
use crate::tree::{CauseNode, ChildrenLogic};

/// Label of the root entry in the parent picker.
const ROOT_LABEL: &str = "Accidente (raíz)";

/// Characters of fact text shown in a parent picker label.
const LABEL_CHARS: usize = 40;

/// Entry of the parent picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentOption {
    /// `root` or `f<n>`.
    pub id: String,
    /// Text shown in the picker.
    pub label: String,
}

/// Sequential list editor over a cause tree.
///
/// Loading a tree is ignored while there are unsaved edits, so a refreshed
/// tree from the backend never clobbers rows being typed.
#[derive(Debug, Clone, Default)]
pub struct FactsEditor {
    accident_text: String,
    items: Vec<FactItem>,
    logic: LogicTable,
    dirty: bool,
}

impl FactsEditor {
    /// Editor populated from `tree`.
    pub fn from_tree(tree: Option<&CauseNode>) -> Self {
        let mut editor = Self::default();
        editor.load_from_tree(tree);
        editor
    }

    /// Editor holding a list prepared elsewhere, such as a facts file.
    /// The list counts as unsaved edits.
    pub fn from_flattened(flat: FlattenedTree) -> Self {
        Self {
            accident_text: flat.accident_text,
            items: flat.items,
            logic: flat.logic,
            dirty: true,
        }
    }

    /// Replace contents with `tree` unless there are unsaved edits.
    pub fn load_from_tree(&mut self, tree: Option<&CauseNode>) {
        if self.dirty {
            debug!("Facts editor has pending edits, tree refresh skipped");
            return;
        }
        match tree {
            Some(root) => {
                let flat = flatten(root);
                self.accident_text = flat.accident_text;
                self.items = flat.items;
                self.logic = flat.logic;
            }
            None => {
                self.accident_text.clear();
                self.items.clear();
                self.logic.clear();
            }
        }
    }

    /// Drop pending edits and reload from `tree`.
    pub fn reset_from_tree(&mut self, tree: Option<&CauseNode>) {
        self.dirty = false;
        self.load_from_tree(tree);
    }

    /// Rows in display order.
    pub fn items(&self) -> &[FactItem] {
        &self.items
    }

    /// Root statement being edited.
    pub fn accident_text(&self) -> &str {
        &self.accident_text
    }

    /// Gates set so far, keyed by parent reference.
    pub fn logic(&self) -> &LogicTable {
        &self.logic
    }

    /// True when there are edits not yet built into a tree.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the root statement.
    pub fn set_accident_text(&mut self, text: impl Into<String>) {
        self.accident_text = text.into();
        self.dirty = true;
    }

    /// Append a blank fact under the root and return its id.
    ///
    /// The id is one past the largest id in the list, whatever the row order.
    pub fn add_fact(&mut self) -> u32 {
        let next_id = self
            .items
            .iter()
            .map(|i| i.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        self.items.push(FactItem::blank(next_id));
        self.dirty = true;
        next_id
    }

    /// Mutable access to the fact `id`; marks the editor dirty.
    pub fn fact_mut(&mut self, id: u32) -> Option<&mut FactItem> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        self.dirty = true;
        Some(item)
    }

    /// Drop fact `id`. Its children fall back under the root on rebuild.
    pub fn remove_fact(&mut self, id: u32) {
        self.items.retain(|i| i.id != id);
        self.dirty = true;
    }

    /// Swap the row at `idx` with the one above it.
    pub fn move_up(&mut self, idx: usize) {
        if idx == 0 || idx >= self.items.len() {
            return;
        }
        self.items.swap(idx - 1, idx);
        self.dirty = true;
    }

    /// Swap the row at `idx` with the one below it.
    pub fn move_down(&mut self, idx: usize) {
        if idx + 1 >= self.items.len() {
            return;
        }
        self.items.swap(idx, idx + 1);
        self.dirty = true;
    }

    /// Point fact `id` at `parent` (`root` or `f<n>`).
    pub fn set_parent(&mut self, id: u32, parent: impl Into<String>) -> bool {
        let parent = parent.into();
        match self.fact_mut(id) {
            Some(item) => {
                item.parent = parent;
                true
            }
            None => false,
        }
    }

    /// Set the gate of a parent (`root` or `f<n>`).
    pub fn set_logic(&mut self, parent: impl Into<String>, logic: ChildrenLogic) {
        self.logic.insert(parent.into(), logic);
        self.dirty = true;
    }

    /// Root followed by every fact, for the parent picker.
    pub fn parent_options(&self) -> Vec<ParentOption> {
        let mut out = vec![ParentOption {
            id: ROOT_REF.to_string(),
            label: ROOT_LABEL.to_string(),
        }];
        for item in &self.items {
            let id = item.node_ref();
            if out.iter().any(|o| o.id == id) {
                continue;
            }
            let snippet: String = item.text.chars().take(LABEL_CHARS).collect();
            let snippet = if snippet.is_empty() {
                "(sin texto)".to_string()
            } else {
                snippet
            };
            out.push(ParentOption {
                label: format!("{}. {}", item.id, snippet),
                id,
            });
        }
        out
    }

    /// Rebuild the tree from the list and clear the dirty flag.
    ///
    /// `fallback_text` names the accident when the editor has none.
    pub fn build_tree(&mut self, fallback_text: Option<&str>) -> (CauseNode, EditMeta) {
        let text = if self.accident_text.trim().is_empty() {
            fallback_text.unwrap_or_default()
        } else {
            self.accident_text.as_str()
        };
        let root = unflatten(text, &self.items, &self.logic);
        self.dirty = false;
        (
            root,
            EditMeta::new(FACTS_SOURCE).with_action("generate_from_facts"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{demo_tree, NodeType};

    #[test]
    fn test_add_fact_uses_next_id() {
        let mut editor = FactsEditor::from_tree(Some(&demo_tree()));
        assert!(!editor.is_dirty());
        let id = editor.add_fact();
        assert_eq!(id, 10);
        assert!(editor.is_dirty());
        let last = editor.items().last().unwrap();
        assert_eq!(last.parent, "root");
        assert_eq!(last.node_type, NodeType::Fact);
    }

    #[test]
    fn test_add_fact_after_reorder_keeps_existing_facts() {
        let mut editor = FactsEditor::from_tree(None);
        for text in ["A", "B", "C"] {
            let id = editor.add_fact();
            editor.fact_mut(id).unwrap().text = text.to_string();
        }
        editor.move_up(2);

        let id = editor.add_fact();
        assert_eq!(id, 4);
        editor.fact_mut(id).unwrap().text = "D nuevo".to_string();

        let ids: Vec<u32> = editor.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3, 2, 4]);
        let (root, _) = editor.build_tree(Some("acc"));
        let texts: Vec<&str> = root.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "C", "B", "D nuevo"]);
    }

    #[test]
    fn test_reorder_survives_rebuild_and_reload() {
        let mut editor = FactsEditor::from_tree(None);
        for text in ["A", "B"] {
            let id = editor.add_fact();
            editor.fact_mut(id).unwrap().text = text.to_string();
        }
        editor.move_down(0);
        let (root, _) = editor.build_tree(Some("acc"));

        let reloaded = FactsEditor::from_tree(Some(&root));
        let texts: Vec<&str> = reloaded.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "A"]);
        let rebuilt = flatten(&root).to_tree();
        assert_eq!(rebuilt.children[0].text, "B");
        assert_eq!(rebuilt.children[1].text, "A");
    }

    #[test]
    fn test_load_ignored_while_dirty() {
        let mut editor = FactsEditor::from_tree(None);
        editor.add_fact();
        editor.load_from_tree(Some(&demo_tree()));
        assert_eq!(editor.items().len(), 1);

        editor.reset_from_tree(Some(&demo_tree()));
        assert_eq!(editor.items().len(), 9);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_from_flattened_is_dirty() {
        let flat = flatten(&demo_tree());
        let mut editor = FactsEditor::from_flattened(flat.clone());
        assert!(editor.is_dirty());
        assert_eq!(editor.items(), flat.items.as_slice());
        let (root, _) = editor.build_tree(None);
        assert_eq!(root.text, flat.accident_text);
    }

    #[test]
    fn test_move_bounds() {
        let mut editor = FactsEditor::from_tree(Some(&demo_tree()));
        editor.move_up(0);
        editor.move_down(8);
        assert!(!editor.is_dirty());

        editor.move_down(0);
        assert_eq!(editor.items()[0].id, 2);
        assert_eq!(editor.items()[1].id, 1);
    }

    #[test]
    fn test_parent_options_labels() {
        let mut editor = FactsEditor::from_tree(None);
        editor.add_fact();
        let options = editor.parent_options();
        assert_eq!(options[0].label, "Accidente (raíz)");
        assert_eq!(options[1].id, "f1");
        assert_eq!(options[1].label, "1. (sin texto)");
    }

    #[test]
    fn test_build_tree_drops_blank_rows_and_clears_dirty() {
        let mut editor = FactsEditor::from_tree(Some(&demo_tree()));
        editor.add_fact();
        let (root, meta) = editor.build_tree(None);
        assert_eq!(root.node_count(), 10);
        assert!(!editor.is_dirty());
        assert_eq!(meta.source, "facts_editor");
        assert_eq!(meta.action.as_deref(), Some("generate_from_facts"));
    }

    #[test]
    fn test_set_parent_and_logic() {
        let mut editor = FactsEditor::from_tree(None);
        let a = editor.add_fact();
        let b = editor.add_fact();
        editor.fact_mut(a).unwrap().text = "a".to_string();
        editor.fact_mut(b).unwrap().text = "b".to_string();
        assert!(editor.set_parent(b, "f1"));
        assert!(!editor.set_parent(99, "f1"));
        editor.set_logic("f1", ChildrenLogic::Or);

        let (root, _) = editor.build_tree(Some("Caída"));
        assert_eq!(root.text, "Caída");
        assert_eq!(root.children[0].children[0].text, "b");
        assert_eq!(root.children[0].children_logic, Some(ChildrenLogic::Or));
    }
}
