use serde::Serialize;
use std::fmt::Write;

use super::engine::{assign_fact_numbers, walk_preorder};
use super::{CauseNode, FactStatus, NodeType};

/// One row of the numbered fact list printed with a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    /// Display number.
    pub fact_number: u32,
    /// Statement.
    pub text: String,
    /// Category.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Confirmed or pending.
    pub status: FactStatus,
}

/// Pre-order list of the non-root facts with their display numbers.
pub fn fact_legend(root: &CauseNode) -> Vec<LegendEntry> {
    let numbered = assign_fact_numbers(root);
    let mut out = Vec::with_capacity(numbered.node_count().saturating_sub(1));
    walk_preorder(&numbered, &mut |node, depth| {
        if depth == 0 {
            return;
        }
        out.push(LegendEntry {
            fact_number: node.meta.fact_number.unwrap_or_default(),
            text: node.text.clone(),
            node_type: node.node_type,
            status: node.status(),
        });
    });
    out
}

/// Indented outline of the numbered tree, one node per line.
pub fn render_outline(root: &CauseNode) -> String {
    let numbered = assign_fact_numbers(root);
    let mut out = String::new();
    walk_preorder(&numbered, &mut |node, depth| {
        let indent = "  ".repeat(depth);
        let number = node.meta.fact_number.unwrap_or_default();
        let _ = write!(out, "{}{}. {} ({})", indent, number, node.text, node.node_type);
        if node.status() == FactStatus::Pending {
            out.push_str(" [pendiente]");
        }
        if let Some(logic) = node.effective_logic() {
            if node.children.len() > 1 {
                let _ = write!(out, " <{}>", logic);
            }
        }
        out.push('\n');
    });
    out
}
