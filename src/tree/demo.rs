use super::{CauseNode, NodeType};

/// Forklift run-over investigation used when no persisted tree is available.
pub fn demo_tree() -> CauseNode {
    CauseNode::new(1, "Fractura de Cadera Conductor", NodeType::Accident).with_child(
        CauseNode::new(2, "Atropello por Grúa Horquilla", NodeType::Fact)
            .with_child(
                CauseNode::new(3, "Conductor en zona no habilitada", NodeType::Action).with_child(
                    CauseNode::new(4, "No recibió instrucción de seguridad", NodeType::Management)
                        .with_child(CauseNode::new(
                            5,
                            "Inexistencia control de externos",
                            NodeType::Management,
                        )),
                ),
            )
            .with_child(
                CauseNode::new(6, "Falla de frenos Grúa", NodeType::Condition).with_child(
                    CauseNode::new(7, "Fuga líquido hidráulico", NodeType::Condition).with_child(
                        CauseNode::new(8, "Falta programa mantenimiento", NodeType::Management),
                    ),
                ),
            )
            .with_child(
                CauseNode::new(9, "Operador Grúa distraído", NodeType::Action).with_child(
                    CauseNode::new(10, "Presión del supervisor por tiempos", NodeType::Management),
                ),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_tree_shape() {
        let tree = demo_tree();
        assert_eq!(tree.node_count(), 10);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children.len(), 3);
        assert!(crate::tree::validate_tree(&tree).is_ok());
    }
}
