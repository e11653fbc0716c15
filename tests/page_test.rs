//! Integration tests for the page controller
//!
//! Drives CauseTreePage against a wiremock backend through the real HTTP
//! client, covering fallback, persistence and AI-assist flows.

use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use cause_tree::api::{CauseTreeClient, GenerateMode, MeasureInput};
use cause_tree::assist::{SuggestionSource, LOCAL_NOTE};
use cause_tree::config::{ApiConfig, AssistConfig, PageConfig, RequestConfig};
use cause_tree::error::{AppError, ErrorKind, PageError};
use cause_tree::page::{read_prefill, CauseTreePage, PageState, SaveOutcome};
use cause_tree::tree::{demo_tree, Id, NodeType};

fn create_page(base_url: &str) -> CauseTreePage<CauseTreeClient> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
    };
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 10,
    };
    let client = CauseTreeClient::new(&config, request_config).expect("Failed to create client");
    CauseTreePage::new(client, PageConfig::default(), AssistConfig::default())
}

fn stored_tree() -> serde_json::Value {
    json!({
        "id": 7,
        "hallazgoId": 31,
        "root": {
            "id": 1,
            "text": "Caída de altura",
            "type": "Accidente",
            "children": [
                { "id": 2, "text": "Pierde equilibrio", "type": "Hecho", "children": [] }
            ]
        }
    })
}

/// Backend with tree 7, an empty report and no measures.
async fn mount_tree(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/cause-trees/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": stored_tree() })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cause-trees/7/report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {
            "ficha": { "empresa": "Constructora Sur" },
            "relato": "Trabajaba en andamio."
        } })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cause-trees/7/measures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cause-trees"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [ { "id": 7 } ] })),
        )
        .mount(server)
        .await;
}

#[cfg(test)]
mod load_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_start_opens_newest_tree_with_report() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        let mut page = create_page(&mock_server.uri());
        page.start(None).await;

        assert_eq!(page.state(), &PageState::Ready);
        assert_eq!(page.selected(), Some(&Id::Num(7)));
        assert_eq!(page.hallazgo_id(), Some(&Id::Num(31)));
        assert_eq!(page.tree().unwrap().text, "Caída de altura");
        assert_eq!(page.ficha().empresa.as_deref(), Some("Constructora Sur"));
        assert_eq!(page.relato(), "Trabajaba en andamio.");

        let display = page.display_tree().unwrap();
        assert_eq!(display.meta.fact_number, Some(0));
        assert_eq!(display.children[0].meta.fact_number, Some(1));
    }

    #[tokio::test]
    async fn test_missing_tree_falls_back_to_demo() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/cause-trees/404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "missing" })))
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(404))).await;

        assert!(matches!(page.state(), PageState::Fallback { .. }));
        assert_eq!(page.tree(), Some(&demo_tree()));
        assert!(page.banner().is_some());
    }

    #[tokio::test]
    async fn test_prefill_file_is_shown_without_selection() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "id": "root",
                "text": "Golpe con carga suspendida",
                "type": "Accidente",
                "children": [ { "id": "p1", "text": "Carga oscila", "type": "Hecho" } ]
            })
        )
        .unwrap();

        let prefill = read_prefill(file.path()).unwrap();
        let mut page = create_page("http://127.0.0.1:1").with_prefill(prefill);
        page.load(None).await;

        assert_eq!(page.state(), &PageState::Ready);
        assert_eq!(page.tree().unwrap().text, "Golpe con carga suspendida");
        assert_eq!(page.tree().unwrap().children[0].id, Id::from("p1"));
    }

    #[tokio::test]
    async fn test_prefill_with_duplicate_ids_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "id": 1, "text": "A", "type": "Accidente",
                "children": [ { "id": 1, "text": "B", "type": "Hecho" } ]
            })
        )
        .unwrap();

        let err = read_prefill(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = read_prefill("/nonexistent/prefill.json").unwrap_err();
        assert!(matches!(err, AppError::InvalidFile { .. }));
    }
}

#[cfg(test)]
mod edit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_add_node_is_persisted() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        Mock::given(method("PUT"))
            .and(path("/api/cause-trees/7"))
            .and(body_partial_json(json!({ "meta": { "source": "ui_edit" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {
                "id": 7,
                "root": {
                    "id": 1, "text": "Caída de altura", "type": "Accidente",
                    "children": [
                        { "id": 2, "text": "Pierde equilibrio", "type": "Hecho", "children": [
                            { "id": 50, "text": "Andamio sin baranda", "type": "Condición" }
                        ] }
                    ]
                }
            } })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        page.open_add(Id::Num(2)).unwrap();
        page.draft_mut().unwrap().text = "Andamio sin baranda".to_string();

        let outcome = page.save_node().await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        let child = &page.tree().unwrap().children[0].children[0];
        assert_eq!(child.id, Id::Num(50));
        assert_eq!(child.node_type, NodeType::Condition);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edit() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        Mock::given(method("PUT"))
            .and(path("/api/cause-trees/7"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        page.open_edit(Id::Num(2)).unwrap();
        page.draft_mut().unwrap().text = "Resbala en tablón".to_string();

        let outcome = page.save_node().await.unwrap();
        assert_eq!(outcome, SaveOutcome::Failed);
        assert_eq!(page.state(), &PageState::Ready);
        assert_eq!(page.tree().unwrap().children[0].text, "Resbala en tablón");
        assert!(page.banner().is_some());
    }

    #[tokio::test]
    async fn test_busy_while_editing() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        page.open_add(Id::Num(1)).unwrap();

        let err = page.delete_tree(&Id::Num(7)).await.unwrap_err();
        assert!(matches!(err, AppError::Page(PageError::Busy { .. })));
    }

    #[tokio::test]
    async fn test_measure_validation_happens_before_request() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        let err = page.create_measure(MeasureInput::new("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[cfg(test)]
mod ai_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_suggestion_falls_back_to_heuristic_when_service_down() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/api/cause-trees/7/suggest-node"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        page.open_add(Id::Num(2)).unwrap();

        let suggestion = page.resolve_ai_from_modal().await.unwrap();
        assert_eq!(suggestion.source, SuggestionSource::Heuristic);
        let session = page.editing().unwrap();
        assert_eq!(session.draft.notes.as_deref(), Some(LOCAL_NOTE));
        assert_eq!(session.draft.node_type, NodeType::Action);
    }

    #[tokio::test]
    async fn test_rejected_suggestion_leaves_draft_and_reports() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/api/cause-trees/7/suggest-node"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "error": "Texto insuficiente" })),
            )
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        page.open_add(Id::Num(2)).unwrap();
        page.draft_mut().unwrap().text = "borrador".to_string();

        assert!(page.resolve_ai_from_modal().await.is_err());
        let session = page.editing().unwrap();
        assert_eq!(session.draft.text, "borrador");
        assert_eq!(session.ai_error.as_deref(), Some("Texto insuficiente"));
    }

    #[tokio::test]
    async fn test_generate_failure_keeps_tree() {
        let mock_server = MockServer::start().await;
        mount_tree(&mock_server).await;

        Mock::given(method("POST"))
            .and(path("/api/cause-trees/7/generate-ai"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let mut page = create_page(&mock_server.uri());
        page.load(Some(Id::Num(7))).await;
        let before = page.tree().cloned();

        assert!(page.generate_ai(GenerateMode::Overwrite).await.is_err());
        assert_eq!(page.state(), &PageState::Ready);
        assert_eq!(page.tree().cloned(), before);
        assert!(page.banner().is_some());
    }
}
