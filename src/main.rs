use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cause_tree::{
    api::{CauseTreeBackend, CauseTreeClient, GenerateMode, ListTreesQuery},
    config::{Config, LogFormat},
    facts::{flatten, FactsEditor, FlattenedTree},
    lint::{judgement_terms, move_to_notes},
    page::{read_json_file, read_prefill, CauseTreePage, PageState},
    tree::{fact_legend, render_outline, Id, NodeDraft, NodeType},
};

/// Cause tree investigation tool.
#[derive(Parser, Debug)]
#[command(name = "cause-tree", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a tree as a numbered outline
    Show {
        /// Tree id; defaults to the newest tree
        #[arg(long, value_parser = parse_id)]
        id: Option<Id>,

        /// JSON tree shown when no id is given
        #[arg(long)]
        prefill: Option<PathBuf>,
    },

    /// Print a tree as an editable facts list (JSON)
    Facts {
        #[arg(long, value_parser = parse_id)]
        id: Option<Id>,
    },

    /// List recent trees
    List {
        /// Only trees of this finding
        #[arg(long, value_parser = parse_id)]
        hallazgo: Option<Id>,

        #[arg(long, default_value = "12")]
        limit: u32,
    },

    /// Check a statement for judgment vocabulary
    Lint {
        text: String,
    },

    /// Generate a tree with AI
    Generate {
        #[arg(long, value_parser = parse_id)]
        id: Id,

        /// overwrite or merge
        #[arg(long, default_value = "overwrite")]
        mode: GenerateMode,
    },

    /// Ask AI for a child of a node
    Suggest {
        #[arg(long, value_parser = parse_id)]
        id: Id,

        /// Parent node id
        #[arg(long, value_parser = parse_id)]
        node: Id,

        /// Text already typed for the new node
        #[arg(long)]
        draft: Option<String>,
    },

    /// Replace a tree with a facts list (as printed by `facts`)
    ApplyFacts {
        #[arg(long, value_parser = parse_id)]
        id: Id,

        #[arg(long)]
        file: PathBuf,
    },

    /// Delete a tree
    Delete {
        #[arg(long, value_parser = parse_id)]
        id: Id,
    },
}

fn parse_id(raw: &str) -> Result<Id, String> {
    if raw.trim().is_empty() {
        return Err("id cannot be empty".to_string());
    }
    Ok(Id::parse(raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        "cause-tree starting"
    );

    if let Err(e) = run(cli.command, config).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    if let Command::Lint { text } = &command {
        lint(text);
        return Ok(());
    }

    let client = CauseTreeClient::new(&config.api, config.request.clone())
        .context("Failed to initialize backend client")?;

    match command {
        Command::Show { id, prefill } => {
            let mut page = CauseTreePage::new(client, config.page, config.assist);
            if let Some(path) = prefill {
                page = page.with_prefill(read_prefill(&path)?);
            }
            page.start(id).await;
            print_page(&page);
        }
        Command::Facts { id } => {
            let mut page = CauseTreePage::new(client, config.page, config.assist);
            page.start(id).await;
            report_banner(&page);
            let tree = page.tree().context("No tree to flatten")?;
            println!("{}", serde_json::to_string_pretty(&flatten(tree))?);
        }
        Command::List { hallazgo, limit } => {
            let query = ListTreesQuery {
                hallazgo_id: hallazgo,
                limit: Some(limit),
            };
            for summary in client.list_trees(&query).await? {
                let updated = summary
                    .updated_at
                    .or(summary.created_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let hallazgo = summary
                    .hallazgo_id
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\thallazgo {}\t{}", summary.id, hallazgo, updated);
            }
        }
        Command::Generate { id, mode } => {
            let mut page = open(client, &config, id).await?;
            page.generate_ai(mode).await?;
            print_page(&page);
        }
        Command::Suggest { id, node, draft } => {
            let mut page = open(client, &config, id).await?;
            page.open_add(node)?;
            if let Some(text) = draft {
                page.draft_mut()?.text = text;
            }
            let suggestion = page.resolve_ai_from_modal().await?;
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
        Command::ApplyFacts { id, file } => {
            let flat: FlattenedTree = read_json_file(&file)?;
            let mut editor = FactsEditor::from_flattened(flat);
            let mut page = open(client, &config, id).await?;
            let outcome = page.apply_facts(&mut editor).await?;
            info!(outcome = ?outcome, "Facts applied");
            print_page(&page);
        }
        Command::Delete { id } => {
            let mut page = CauseTreePage::new(client, config.page, config.assist);
            if page.delete_tree(&id).await? {
                println!("Árbol {} eliminado", id);
            } else {
                report_banner(&page);
            }
        }
        Command::Lint { .. } => {}
    }
    Ok(())
}

/// Page with `id` loaded; a fallback tree is not accepted.
async fn open(
    client: CauseTreeClient,
    config: &Config,
    id: Id,
) -> anyhow::Result<CauseTreePage<CauseTreeClient>> {
    let mut page = CauseTreePage::new(client, config.page.clone(), config.assist.clone());
    page.load(Some(id.clone())).await;
    if let PageState::Fallback { message } = page.state() {
        bail!("Tree {} could not be loaded: {}", id, message);
    }
    Ok(page)
}

fn lint(text: &str) {
    let terms = judgement_terms(text);
    if terms.is_empty() {
        println!("OK: se lee como un hecho observable");
        return;
    }
    let mut draft = NodeDraft::new(text, NodeType::Fact);
    move_to_notes(&mut draft);
    println!("Posible juicio ({}). Mover a notas:", terms.join(", "));
    println!("{}", draft.notes.unwrap_or_default());
}

fn print_page<B: CauseTreeBackend>(page: &CauseTreePage<B>) {
    report_banner(page);
    let Some(tree) = page.tree() else {
        return;
    };
    if let Some(id) = page.selected() {
        println!("Árbol {}", id);
    }
    print!("{}", render_outline(tree));

    let pending: Vec<_> = fact_legend(tree)
        .into_iter()
        .filter(|entry| entry.status == cause_tree::FactStatus::Pending)
        .collect();
    if !pending.is_empty() {
        println!();
        println!("Pendientes de investigación:");
        for entry in pending {
            println!("  {}. {}", entry.fact_number, entry.text);
        }
    }
}

fn report_banner<B: CauseTreeBackend>(page: &CauseTreePage<B>) {
    if let Some(banner) = page.banner() {
        eprintln!("{}", banner);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
