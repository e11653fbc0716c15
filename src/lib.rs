//! # Cause Tree
//!
//! Editing core for accident investigation cause trees ("árbol de causas").
//! An accident sits at the root; facts, actions, conditions and management
//! causes hang below it, and every branching node combines its children with
//! an AND/OR gate.
//!
//! ## Features
//!
//! - **Tree Model**: Typed nodes with stable ids, gates and fact numbers
//! - **Mutation Engine**: Pure add/edit operations returning a new tree
//! - **Facts Reconciler**: Lossless projection between the tree and a flat facts list
//! - **AI Assist**: Node suggestions and whole-tree generation, with a local heuristic fallback
//! - **Judgment Linter**: Flags blame vocabulary and moves it to the notes
//! - **Page Controller**: Load/edit/save state machine over the backend API
//!
//! ## Architecture
//!
//! ```text
//! CLI → CauseTreePage → CauseTreeBackend (HTTP, reqwest)
//!            ↓
//!     tree / facts / lint (pure)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use cause_tree::{api::CauseTreeClient, page::CauseTreePage, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = CauseTreeClient::new(&config.api, config.request.clone())?;
//!     let mut page = CauseTreePage::new(client, config.page, config.assist);
//!     page.start(None).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Backend API client and wire types.
pub mod api;
/// AI-assisted node suggestions and tree generation.
pub mod assist;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Facts list projection and its editor.
pub mod facts;
/// Judgment vocabulary linter.
pub mod lint;
/// Page controller state machine.
pub mod page;
/// Cause tree model and pure mutation engine.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use page::CauseTreePage;
pub use tree::{CauseNode, ChildrenLogic, FactStatus, Id, NodeDraft, NodeType};
