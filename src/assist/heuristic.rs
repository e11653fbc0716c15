use crate::api::NodeSuggestion;
use crate::tree::{NodeDraft, NodeType};

/// Notes marking a suggestion produced without the inference service.
pub const LOCAL_NOTE: &str =
    "Sugerencia local (servicio de IA no disponible). Confirmar con evidencia antes de guardar.";

/// Suggest a child for `parent_text` by walking the cause ladder
/// Accident -> Fact -> Action/Condition -> Management.
///
/// A non-blank draft keeps its text; only the type and notes are proposed.
pub fn suggest_child(
    parent_text: &str,
    parent_type: NodeType,
    draft: Option<&NodeDraft>,
) -> NodeSuggestion {
    let parent_lower = parent_text.to_lowercase();
    let parent = parent_text.trim();

    let (node_type, template) = match parent_type {
        NodeType::Accident => (
            NodeType::Fact,
            format!("Hecho inmediato que produjo: {}", parent),
        ),
        NodeType::Fact => {
            if mentions_condition(&parent_lower) {
                (
                    NodeType::Condition,
                    format!("Condición del equipo o del entorno asociada a: {}", parent),
                )
            } else {
                (
                    NodeType::Action,
                    format!("Acción de la persona involucrada en: {}", parent),
                )
            }
        }
        NodeType::Action => (
            NodeType::Management,
            format!("Instrucción, supervisión o procedimiento ausente para: {}", parent),
        ),
        NodeType::Condition => {
            if mentions_condition(&parent_lower) && !mentions_management(&parent_lower) {
                (
                    NodeType::Management,
                    format!("Programa de mantención o inspección ausente para: {}", parent),
                )
            } else {
                (
                    NodeType::Management,
                    format!("Control de gestión que no detectó: {}", parent),
                )
            }
        }
        NodeType::Management => (
            NodeType::Management,
            format!("Causa organizacional previa a: {}", parent),
        ),
    };

    let text = match draft.map(|d| d.text.trim()).filter(|t| !t.is_empty()) {
        Some(existing) => existing.to_string(),
        None => template,
    };

    NodeSuggestion {
        text,
        node_type,
        notes: Some(LOCAL_NOTE.to_string()),
    }
}

fn mentions_condition(text: &str) -> bool {
    text.contains("freno")
        || text.contains("hidráulic")
        || text.contains("hidraulic")
        || text.contains("falla")
        || text.contains("fuga")
        || text.contains("cable")
        || text.contains("andamio")
        || text.contains("piso")
        || text.contains("equipo")
}

fn mentions_management(text: &str) -> bool {
    text.contains("programa")
        || text.contains("procedimiento")
        || text.contains("instrucción")
        || text.contains("capacitación")
        || text.contains("supervis")
}
