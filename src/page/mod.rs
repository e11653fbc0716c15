//! Page controller for viewing and editing one cause tree.
//!
//! [`CauseTreePage`] owns the displayed tree and drives it through
//! [`PageState`]. Every operation takes `&mut self`, so at most one backend
//! round-trip is in flight; operations that would replace the tree are
//! refused with [`PageError::Busy`] while the node editor is open.
//!
//! No failure is fatal. A failed load shows the prefill or the demo tree, a
//! failed save keeps the edited tree on screen, and every failure leaves a
//! user-facing message in [`CauseTreePage::banner`].

mod state;

pub use state::{EditMode, EditSession, PageState};

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::api::{
    CauseTreeBackend, EditMeta, GenerateMode, ListTreesQuery, Measure, MeasureInput, ReportFicha,
    TreeRecord, TreeSummary, UpdateTreeRequest, UpsertReportRequest,
};
use crate::assist::{AssistSession, Suggestion};
use crate::config::{AssistConfig, PageConfig};
use crate::error::{ApiError, AppError, AppResult, PageError, TreeError};
use crate::facts::FactsEditor;
use crate::tree::{
    add_child, assign_fact_numbers, demo_tree, edit_node, find_node, validate_tree, CauseNode, Id,
    NodeDraft, TreeId,
};

const MSG_NO_SELECTION: &str = "Selecciona o pasa un id de árbol. Mostrando demo.";
const MSG_LOAD_FAILED: &str = "No se pudo cargar el árbol. Mostrando demo.";
const MSG_LOAD_FAILED_PREFILL: &str = "No se pudo cargar el árbol. Mostrando el borrador local.";
const MSG_HISTORY_FAILED: &str = "No se pudo cargar el historial de árboles.";
const MSG_SAVE_FAILED: &str = "No se pudo guardar el árbol. Revisa conexión o vuelve a intentar.";
const MSG_PARENT_MISSING: &str = "No se encontró el nodo padre para agregar la causa.";
const MSG_NODE_MISSING: &str = "No se encontró el nodo a editar.";
const MSG_GENERATE_NO_TREE: &str = "No hay árbol para generar.";
const MSG_GENERATE_NO_SELECTION: &str =
    "Primero guarda/abre un árbol existente para generar con IA.";
const MSG_GENERATE_FAILED: &str =
    "No se pudo generar con IA. Revisa conexión / API key y vuelve a intentar.";
const MSG_SUGGEST_FAILED: &str = "No se pudo obtener sugerencia de IA.";
const MSG_DELETE_FAILED: &str = "No se pudo eliminar el árbol. Revisa conexión o vuelve a intentar.";
const MSG_NOT_DELETED: &str = "El árbol no fue eliminado.";
const MSG_REPORT_FAILED: &str = "No se pudo guardar el informe.";
const MSG_MEASURE_FAILED: &str = "No se pudo guardar la medida correctiva.";
const MSG_MEASURE_DELETE_FAILED: &str = "No se pudo eliminar la medida correctiva.";

/// What happened to an edit once it was applied in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend stored the tree.
    Saved,
    /// No tree is selected; the edit lives only in memory.
    LocalOnly,
    /// The backend rejected or never received the tree. The edit is kept in
    /// memory and the banner explains the failure.
    Failed,
}

/// Controller for the cause tree page.
pub struct CauseTreePage<B: CauseTreeBackend> {
    backend: B,
    config: PageConfig,
    assist: AssistSession,
    state: PageState,
    selected: Option<TreeId>,
    tree: Option<CauseNode>,
    prefill: Option<CauseNode>,
    hallazgo_id: Option<Id>,
    banner: Option<String>,
    history: Vec<TreeSummary>,
    ficha: ReportFicha,
    relato: String,
    measures: Vec<Measure>,
}

impl<B: CauseTreeBackend> CauseTreePage<B> {
    /// Create a page with nothing loaded.
    pub fn new(backend: B, config: PageConfig, assist: AssistConfig) -> Self {
        Self {
            backend,
            config,
            assist: AssistSession::new(assist),
            state: PageState::Ready,
            selected: None,
            tree: None,
            prefill: None,
            hallazgo_id: None,
            banner: None,
            history: Vec::new(),
            ficha: ReportFicha::default(),
            relato: String::new(),
            measures: Vec::new(),
        }
    }

    /// Tree shown while no persisted tree is selected, typically handed over
    /// by the screen that opened the page.
    pub fn with_prefill(mut self, root: CauseNode) -> Self {
        if self.selected.is_none() {
            self.tree = Some(root.clone());
        }
        self.prefill = Some(root);
        self
    }

    // Accessors

    /// Current lifecycle state.
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Current tree as stored, without display numbering.
    pub fn tree(&self) -> Option<&CauseNode> {
        self.tree.as_ref()
    }

    /// Current tree with a fact number on every node.
    pub fn display_tree(&self) -> Option<CauseNode> {
        self.tree.as_ref().map(assign_fact_numbers)
    }

    /// Persisted tree currently addressed, if any.
    pub fn selected(&self) -> Option<&TreeId> {
        self.selected.as_ref()
    }

    /// Finding the selected tree belongs to.
    pub fn hallazgo_id(&self) -> Option<&Id> {
        self.hallazgo_id.as_ref()
    }

    /// Last user-facing message, cleared when the next operation starts.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Recent trees, newest first.
    pub fn history(&self) -> &[TreeSummary] {
        &self.history
    }

    /// Report header.
    pub fn ficha(&self) -> &ReportFicha {
        &self.ficha
    }

    /// Report narrative.
    pub fn relato(&self) -> &str {
        &self.relato
    }

    /// Corrective measures of the selected tree.
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Backend the page talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open editor, if any.
    pub fn editing(&self) -> Option<&EditSession> {
        match &self.state {
            PageState::Editing(session) => Some(session),
            _ => None,
        }
    }

    /// Facts editor seeded from the current tree.
    pub fn facts_editor(&self) -> FactsEditor {
        FactsEditor::from_tree(self.tree.as_ref())
    }

    // Loading

    /// Load the history and open a tree.
    ///
    /// With no explicit id and no prefill, the newest tree of the history is
    /// opened.
    pub async fn start(&mut self, id: Option<TreeId>) {
        if let Err(e) = self.load_history().await {
            warn!(error = %e, "History unavailable at start");
        }

        let id = match id {
            Some(id) => Some(id),
            None if self.prefill.is_none() => self.history.first().map(|t| t.id.clone()),
            None => None,
        };
        self.load(id).await;
    }

    /// Show the tree `id`, or the prefill/demo tree when `id` is `None`.
    ///
    /// Any open editor is discarded. A failed load falls back to the prefill
    /// or demo tree and leaves the page in [`PageState::Fallback`].
    pub async fn load(&mut self, id: Option<TreeId>) {
        self.state = PageState::Loading;
        self.banner = None;
        self.selected = id.clone();
        self.clear_report();

        let Some(id) = id else {
            self.hallazgo_id = None;
            match &self.prefill {
                Some(prefill) => {
                    self.tree = Some(prefill.clone());
                    self.state = PageState::Ready;
                }
                None => {
                    self.tree = Some(demo_tree());
                    self.fall_back(MSG_NO_SELECTION);
                }
            }
            return;
        };

        match self.backend.get_tree(&id).await {
            Ok(record) => {
                info!(tree = %id, nodes = record.root.node_count(), "Tree loaded");
                self.adopt(record);
                self.state = PageState::Ready;
                self.load_report_and_measures(&id).await;
            }
            Err(e) => {
                warn!(tree = %id, error = %e, "Tree load failed, showing fallback");
                self.hallazgo_id = None;
                match &self.prefill {
                    Some(prefill) => {
                        self.tree = Some(prefill.clone());
                        self.fall_back(MSG_LOAD_FAILED_PREFILL);
                    }
                    None => {
                        self.tree = Some(demo_tree());
                        self.fall_back(MSG_LOAD_FAILED);
                    }
                }
            }
        }
    }

    /// Switch to another persisted tree.
    pub async fn select_tree(&mut self, id: TreeId) {
        self.load(Some(id)).await;
    }

    /// Refresh the history list.
    pub async fn load_history(&mut self) -> AppResult<()> {
        let query = ListTreesQuery::latest(self.config.history_limit);
        match self.backend.list_trees(&query).await {
            Ok(history) => {
                debug!(count = history.len(), "History loaded");
                self.history = history;
                Ok(())
            }
            Err(e) => {
                self.banner = Some(MSG_HISTORY_FAILED.to_string());
                Err(e.into())
            }
        }
    }

    /// Reload the selected tree, or restore the prefill/demo tree.
    pub async fn reset(&mut self) -> AppResult<()> {
        self.ensure_idle()?;
        match self.selected.clone() {
            Some(id) => self.load(Some(id)).await,
            None => {
                self.banner = None;
                self.tree = Some(self.prefill.clone().unwrap_or_else(demo_tree));
                self.state = PageState::Ready;
            }
        }
        Ok(())
    }

    // Node editor

    /// Open the editor to add a child under `parent_id`.
    pub fn open_add(&mut self, parent_id: Id) -> AppResult<()> {
        self.ensure_idle()?;
        if self.tree.is_none() {
            return Err(PageError::NoTree.into());
        }
        self.banner = None;
        self.state = PageState::Editing(EditSession::add(parent_id));
        Ok(())
    }

    /// Open the editor on an existing node.
    pub fn open_edit(&mut self, node_id: Id) -> AppResult<()> {
        self.ensure_idle()?;
        let tree = self.tree.as_ref().ok_or(PageError::NoTree)?;
        let Some(draft) = find_node(tree, &node_id).map(NodeDraft::from_node) else {
            self.banner = Some(MSG_NODE_MISSING.to_string());
            return Err(TreeError::NodeNotFound {
                node_id: node_id.to_string(),
            }
            .into());
        };
        self.banner = None;
        self.state = PageState::Editing(EditSession::edit(node_id, draft));
        Ok(())
    }

    /// Draft of the open editor.
    pub fn draft_mut(&mut self) -> AppResult<&mut NodeDraft> {
        match &mut self.state {
            PageState::Editing(session) => Ok(&mut session.draft),
            _ => Err(PageError::NotEditing.into()),
        }
    }

    /// Close the editor without applying the draft.
    pub fn cancel_edit(&mut self) {
        if matches!(self.state, PageState::Editing(_)) {
            self.state = PageState::Ready;
        }
    }

    /// Apply the draft to the tree and persist it.
    ///
    /// A blank draft or an id that no longer resolves keeps the editor open.
    pub async fn save_node(&mut self) -> AppResult<SaveOutcome> {
        let session = match &self.state {
            PageState::Editing(session) => session.clone(),
            _ => return Err(PageError::NotEditing.into()),
        };
        session.draft.validate()?;
        let tree = self.tree.as_ref().ok_or(PageError::NoTree)?;

        let updated = match &session.mode {
            EditMode::Add { parent_id } => add_child(tree, parent_id, &session.draft),
            EditMode::Edit { node_id } => edit_node(tree, node_id, &session.draft),
        };
        let updated = updated.map_err(|e| {
            self.banner = Some(
                match session.mode {
                    EditMode::Add { .. } => MSG_PARENT_MISSING,
                    EditMode::Edit { .. } => MSG_NODE_MISSING,
                }
                .to_string(),
            );
            e
        })?;

        self.tree = Some(updated.clone());
        self.state = PageState::Ready;
        Ok(self.persist(updated, EditMeta::ui_edit()).await)
    }

    /// Ask for an AI suggestion and prefill the open draft with it.
    ///
    /// On failure the draft is left alone and the error is shown both in the
    /// editor and in the banner. Can be invoked again at any time.
    pub async fn resolve_ai_from_modal(&mut self) -> AppResult<Suggestion> {
        let session = match &self.state {
            PageState::Editing(session) => session,
            _ => return Err(PageError::NotEditing.into()),
        };
        let tree = self.tree.as_ref().ok_or(PageError::NoTree)?;
        let context_id = session.mode.context_id().clone();
        let draft = session.draft.clone();
        let context = match find_node(tree, &context_id) {
            Some(node) => node.clone(),
            None => {
                self.set_ai_error(MSG_NODE_MISSING);
                return Err(TreeError::NodeNotFound {
                    node_id: context_id.to_string(),
                }
                .into());
            }
        };

        let result = self
            .assist
            .suggest_node(&self.backend, self.selected.as_ref(), &context, Some(&draft))
            .await;

        match result {
            Ok(suggestion) => {
                if let PageState::Editing(session) = &mut self.state {
                    suggestion.apply_to(&mut session.draft);
                    session.suggestion = Some(suggestion.clone());
                    session.ai_error = None;
                }
                Ok(suggestion)
            }
            Err(e) => {
                warn!(context = %context_id, error = %e, "AI suggestion failed");
                let message = user_message(&e, MSG_SUGGEST_FAILED);
                self.set_ai_error(&message);
                Err(e)
            }
        }
    }

    // Whole-tree operations

    /// Replace the tree with the one rebuilt by the facts editor and persist it.
    pub async fn apply_facts(&mut self, editor: &mut FactsEditor) -> AppResult<SaveOutcome> {
        self.ensure_idle()?;
        self.banner = None;
        let fallback = self.tree.as_ref().map(|t| t.text.clone());
        let (root, meta) = editor.build_tree(fallback.as_deref());
        info!(nodes = root.node_count(), "Tree rebuilt from facts");
        self.tree = Some(root.clone());
        self.state = PageState::Ready;
        Ok(self.persist(root, meta).await)
    }

    /// Generate the selected tree with AI.
    pub async fn generate_ai(&mut self, mode: GenerateMode) -> AppResult<()> {
        self.ensure_idle()?;
        if self.tree.is_none() {
            self.banner = Some(MSG_GENERATE_NO_TREE.to_string());
            return Err(PageError::NoTree.into());
        }
        let Some(id) = self.selected.clone() else {
            self.banner = Some(MSG_GENERATE_NO_SELECTION.to_string());
            return Err(PageError::NoSelection {
                action: "generate with AI".to_string(),
            }
            .into());
        };

        self.banner = None;
        self.state = PageState::Generating;
        let result = self.assist.generate_tree(&self.backend, &id, mode).await;
        self.state = PageState::Ready;

        match result {
            Ok(record) => {
                self.adopt(record);
                self.refresh_history().await;
                Ok(())
            }
            Err(e) => {
                warn!(tree = %id, error = %e, "AI generation failed");
                self.banner = Some(MSG_GENERATE_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Delete a persisted tree. Returns whether the backend deleted it.
    ///
    /// Deleting the open tree clears the selection and shows the prefill or
    /// demo tree.
    pub async fn delete_tree(&mut self, id: &TreeId) -> AppResult<bool> {
        self.ensure_idle()?;
        self.banner = None;
        self.state = PageState::Saving;
        let result = self.backend.delete_tree(id).await;
        self.state = PageState::Ready;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(tree = %id, error = %e, "Tree delete failed");
                self.banner = Some(MSG_DELETE_FAILED.to_string());
                return Err(e.into());
            }
        };
        if !response.deleted {
            warn!(tree = %id, "Backend did not delete tree");
            self.banner = Some(MSG_NOT_DELETED.to_string());
            return Ok(false);
        }

        info!(tree = %id, "Tree deleted");
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            self.hallazgo_id = None;
            self.clear_report();
            self.tree = Some(self.prefill.clone().unwrap_or_else(demo_tree));
        }
        self.refresh_history().await;
        Ok(true)
    }

    // Report and measures

    /// Save the report header. Without a selected tree it is kept locally.
    pub async fn save_ficha(&mut self, ficha: ReportFicha) -> AppResult<()> {
        self.ficha = ficha;
        self.save_report().await
    }

    /// Save the narrative. Without a selected tree it is kept locally.
    pub async fn save_relato(&mut self, relato: impl Into<String>) -> AppResult<()> {
        self.relato = relato.into();
        self.save_report().await
    }

    /// Create a corrective measure on the selected tree.
    pub async fn create_measure(&mut self, input: MeasureInput) -> AppResult<()> {
        let id = self.require_selection("create a measure")?;
        validate_measure(&input)?;
        let result = self.backend.create_measure(&id, &input).await;
        self.after_measure_change(&id, result.map(|_| ()), MSG_MEASURE_FAILED)
            .await
    }

    /// Update a corrective measure on the selected tree.
    pub async fn update_measure(&mut self, measure_id: &Id, input: MeasureInput) -> AppResult<()> {
        let id = self.require_selection("update a measure")?;
        validate_measure(&input)?;
        let result = self.backend.update_measure(&id, measure_id, &input).await;
        self.after_measure_change(&id, result.map(|_| ()), MSG_MEASURE_FAILED)
            .await
    }

    /// Delete a corrective measure from the selected tree.
    pub async fn delete_measure(&mut self, measure_id: &Id) -> AppResult<()> {
        let id = self.require_selection("delete a measure")?;
        let result = self.backend.delete_measure(&id, measure_id).await;
        self.after_measure_change(&id, result, MSG_MEASURE_DELETE_FAILED)
            .await
    }

    // Internal

    fn ensure_idle(&self) -> AppResult<()> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(PageError::Busy {
                state: self.state.to_string(),
            }
            .into())
        }
    }

    fn require_selection(&self, action: &str) -> AppResult<TreeId> {
        self.selected.clone().ok_or_else(|| {
            PageError::NoSelection {
                action: action.to_string(),
            }
            .into()
        })
    }

    fn fall_back(&mut self, message: &str) {
        self.banner = Some(message.to_string());
        self.state = PageState::Fallback {
            message: message.to_string(),
        };
    }

    fn set_ai_error(&mut self, message: &str) {
        if let PageState::Editing(session) = &mut self.state {
            session.ai_error = Some(message.to_string());
        }
        self.banner = Some(message.to_string());
    }

    fn adopt(&mut self, record: TreeRecord) {
        self.selected = Some(record.id);
        self.hallazgo_id = record.hallazgo_id;
        self.tree = Some(record.root);
    }

    fn clear_report(&mut self) {
        self.ficha = ReportFicha::default();
        self.relato.clear();
        self.measures.clear();
    }

    /// Store `root` on the selected tree. The in-memory tree is never
    /// reverted.
    async fn persist(&mut self, root: CauseNode, meta: EditMeta) -> SaveOutcome {
        let Some(id) = self.selected.clone() else {
            debug!("No tree selected, edit kept in memory");
            return SaveOutcome::LocalOnly;
        };

        self.state = PageState::Saving;
        let source = meta.source.clone();
        let request = UpdateTreeRequest {
            root,
            meta: Some(meta),
        };
        let result = self.backend.update_tree(&id, &request).await;
        self.state = PageState::Ready;

        match result {
            Ok(record) => {
                info!(tree = %id, source = %source, "Tree saved");
                self.adopt(record);
                self.refresh_history().await;
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!(tree = %id, error = %e, "Tree save failed, keeping local edit");
                self.banner = Some(MSG_SAVE_FAILED.to_string());
                SaveOutcome::Failed
            }
        }
    }

    async fn refresh_history(&mut self) {
        if let Err(e) = self.load_history().await {
            warn!(error = %e, "History refresh failed");
        }
    }

    async fn load_report_and_measures(&mut self, id: &TreeId) {
        match self.backend.get_report(id).await {
            Ok(report) => {
                self.ficha = report.ficha;
                self.relato = report.relato.unwrap_or_default();
            }
            Err(e) => warn!(tree = %id, error = %e, "Report unavailable"),
        }
        match self.backend.list_measures(id).await {
            Ok(measures) => self.measures = measures,
            Err(e) => warn!(tree = %id, error = %e, "Measures unavailable"),
        }
    }

    async fn save_report(&mut self) -> AppResult<()> {
        let Some(id) = self.selected.clone() else {
            debug!("No tree selected, report kept in memory");
            return Ok(());
        };
        let relato = self.relato.trim();
        let request = UpsertReportRequest {
            hallazgo_id: self.hallazgo_id.clone(),
            ficha: self.ficha.clone(),
            relato: (!relato.is_empty()).then(|| relato.to_string()),
        };
        match self.backend.upsert_report(&id, &request).await {
            Ok(report) => {
                self.ficha = report.ficha;
                self.relato = report.relato.unwrap_or_default();
                Ok(())
            }
            Err(e) => {
                warn!(tree = %id, error = %e, "Report save failed");
                let err = AppError::from(e);
                self.banner = Some(user_message(&err, MSG_REPORT_FAILED));
                Err(err)
            }
        }
    }

    async fn after_measure_change(
        &mut self,
        id: &TreeId,
        result: Result<(), ApiError>,
        failure: &str,
    ) -> AppResult<()> {
        if let Err(e) = result {
            warn!(tree = %id, error = %e, "Measure change failed");
            let err = AppError::from(e);
            self.banner = Some(user_message(&err, failure));
            return Err(err);
        }
        match self.backend.list_measures(id).await {
            Ok(measures) => self.measures = measures,
            Err(e) => warn!(tree = %id, error = %e, "Measures reload failed"),
        }
        Ok(())
    }
}

/// Read a JSON document such as a prefill tree or a facts list.
pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> AppResult<T> {
    let path = path.as_ref();
    let invalid = |message: String| AppError::InvalidFile {
        path: path.display().to_string(),
        message,
    };
    let raw = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))
}

/// Read a prefill tree, rejecting duplicate node ids.
pub fn read_prefill(path: impl AsRef<Path>) -> AppResult<CauseNode> {
    let root: CauseNode = read_json_file(path)?;
    validate_tree(&root)?;
    Ok(root)
}

fn validate_measure(input: &MeasureInput) -> AppResult<()> {
    if input.medida_correctiva.trim().is_empty() {
        return Err(TreeError::empty("medidaCorrectiva").into());
    }
    Ok(())
}

/// Backend-provided message for rejected requests, `default` otherwise.
fn user_message(err: &AppError, default: &str) -> String {
    match err {
        AppError::Api(ApiError::Api { status, message })
            if *status < 500 && !message.trim().is_empty() =>
        {
            message.clone()
        }
        _ => default.to_string(),
    }
}
