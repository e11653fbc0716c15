//! Backend API for persisted cause trees, reports and measures.
//!
//! [`CauseTreeBackend`] is the seam the page controller depends on;
//! [`CauseTreeClient`] implements it over HTTP with `reqwest`.

mod client;
mod types;

pub use client::CauseTreeClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::tree::{Id, TreeId};

/// Operations offered by the cause tree backend.
#[async_trait]
pub trait CauseTreeBackend: Send + Sync {
    // Trees

    /// Get a tree by id.
    async fn get_tree(&self, id: &TreeId) -> ApiResult<TreeRecord>;
    /// Get the tree attached to a finding.
    async fn get_tree_by_hallazgo(&self, hallazgo_id: &Id) -> ApiResult<TreeRecord>;
    /// Create a tree.
    async fn create_tree(&self, request: &CreateTreeRequest) -> ApiResult<TreeRecord>;
    /// Replace a tree's root.
    async fn update_tree(&self, id: &TreeId, request: &UpdateTreeRequest) -> ApiResult<TreeRecord>;
    /// List tree summaries, newest first.
    async fn list_trees(&self, query: &ListTreesQuery) -> ApiResult<Vec<TreeSummary>>;
    /// Delete a tree.
    async fn delete_tree(&self, id: &TreeId) -> ApiResult<DeleteResponse>;

    // AI assist

    /// Generate a tree with the inference service.
    async fn generate_tree(&self, id: &TreeId, mode: GenerateMode) -> ApiResult<TreeRecord>;
    /// Suggest content for a single node.
    async fn suggest_node(
        &self,
        id: &TreeId,
        request: &SuggestNodeRequest,
    ) -> ApiResult<NodeSuggestion>;

    // Report

    /// Get the report attached to a tree.
    async fn get_report(&self, id: &TreeId) -> ApiResult<CauseTreeReport>;
    /// Create or replace the report attached to a tree.
    async fn upsert_report(
        &self,
        id: &TreeId,
        request: &UpsertReportRequest,
    ) -> ApiResult<CauseTreeReport>;

    // Corrective measures

    /// List measures of a tree.
    async fn list_measures(&self, id: &TreeId) -> ApiResult<Vec<Measure>>;
    /// Create a measure.
    async fn create_measure(&self, id: &TreeId, input: &MeasureInput) -> ApiResult<Measure>;
    /// Update a measure.
    async fn update_measure(
        &self,
        id: &TreeId,
        measure_id: &Id,
        input: &MeasureInput,
    ) -> ApiResult<Measure>;
    /// Delete a measure.
    async fn delete_measure(&self, id: &TreeId, measure_id: &Id) -> ApiResult<()>;
}

