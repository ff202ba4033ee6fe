//! Planforge - generate a product plan as a hierarchy of documents.
//!
//! The CLI is the presentation layer: it turns user intents into
//! orchestrator calls and renders project snapshots.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use planforge::ai::GenerationClient;
use planforge::core::Config;
use planforge::hierarchy::{lookup, nodes_in, profile_for, Category, DocumentKind, GenerationProfile};
use planforge::workflow::{
    find_project, persist_snapshots, split, Document, DocumentStatus, JsonProjectRepository,
    LifecycleStore, Orchestrator, Project, ProjectBrief, ProjectRepository,
};

/// Generate a product plan as a hierarchy of documents
#[derive(Parser)]
#[command(name = "planforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./.planforge.toml, then the user config dir)
    #[arg(long, global = true, env = "PLANFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding project snapshots
    #[arg(long, global = true, env = "PLANFORGE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project and generate its first phases
    New {
        /// Product concept
        concept: String,

        /// Problem the product solves
        #[arg(short, long, default_value = "")]
        problem: String,

        /// Target audience
        #[arg(short, long, default_value = "")]
        audience: String,

        /// Key features
        #[arg(short, long, default_value = "")]
        features: String,

        /// Technology preferences
        #[arg(long, default_value = "")]
        tech: String,

        #[arg(long, default_value = "")]
        budget: String,

        #[arg(long, default_value = "")]
        timeline: String,

        /// Owner identity (defaults to the current user)
        #[arg(long)]
        owner: Option<String>,

        /// Only create the project; generate nothing yet
        #[arg(long)]
        no_generate: bool,
    },

    /// List projects
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a project overview, or one document's content
    Show {
        /// Project id or id prefix
        project: String,

        /// Document kind (e.g. prd, db-schema)
        kind: Option<DocumentKind>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the document hierarchy
    Kinds,

    /// Generate (or regenerate) one document
    Regenerate {
        project: String,
        kind: DocumentKind,
    },

    /// Generate the next document after `kind` if it is still pending
    Advance {
        project: String,
        kind: DocumentKind,
    },

    /// List the sections of a document
    Sections {
        project: String,
        kind: DocumentKind,
    },

    /// Replace one section of a document
    EditSection {
        project: String,
        kind: DocumentKind,

        /// Section id (see `sections`)
        section: String,

        /// New section text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the new section text from a file (`-` for stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Rewrite one section with the model
    Refine {
        project: String,
        kind: DocumentKind,
        section: String,

        /// What to change
        instruction: String,
    },

    /// Replace a whole document
    Save {
        project: String,
        kind: DocumentKind,

        /// File with the new content (`-` for stdin)
        file: PathBuf,
    },

    /// Delete a project and all its documents
    Delete {
        project: String,

        /// Don't ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    // API keys may live in a .env file
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Kinds => cmd_kinds(),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
        Commands::Config { path } => cmd_config(cli.config.as_deref(), path),
        command => {
            let ctx = AppContext::load(cli.config.as_deref(), cli.data_dir)?;
            run_project_command(&ctx, command)
        }
    }
}

fn run_project_command(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::New {
            concept,
            problem,
            audience,
            features,
            tech,
            budget,
            timeline,
            owner,
            no_generate,
        } => {
            let brief = ProjectBrief {
                concept,
                problem,
                audience,
                features,
                tech_preferences: tech,
                budget,
                timeline,
            };
            let owner = owner.unwrap_or_else(default_owner);
            cmd_new(ctx, &owner, brief, no_generate)
        }
        Commands::List { format } => cmd_list(ctx, &format),
        Commands::Show { project, kind, format } => cmd_show(ctx, &project, kind, &format),
        Commands::Regenerate { project, kind } => cmd_regenerate(ctx, &project, kind),
        Commands::Advance { project, kind } => cmd_advance(ctx, &project, kind),
        Commands::Sections { project, kind } => cmd_sections(ctx, &project, kind),
        Commands::EditSection { project, kind, section, text, file } => {
            let content = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => read_input(&file)?,
                (None, None) => anyhow::bail!("Provide the new section with --text or --file"),
            };
            cmd_edit_section(ctx, &project, kind, &section, &content)
        }
        Commands::Refine { project, kind, section, instruction } => {
            cmd_refine(ctx, &project, kind, &section, &instruction)
        }
        Commands::Save { project, kind, file } => {
            let content = read_input(&file)?;
            cmd_save(ctx, &project, kind, &content)
        }
        Commands::Delete { project, yes } => cmd_delete(ctx, &project, yes),
        Commands::Kinds | Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

/// Loaded configuration plus the project repository.
struct AppContext {
    config: Config,
    repo: Arc<JsonProjectRepository>,
}

impl AppContext {
    fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::load_from(config_path)?;
        if let Some(dir) = data_dir {
            config.storage.data_dir = Some(dir);
        }

        let dir = config
            .projects_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory; pass --data-dir"))?;
        tracing::debug!(dir = %dir.display(), "Using project directory");

        Ok(Self { config, repo: Arc::new(JsonProjectRepository::new(dir)) })
    }

    fn client(&self) -> Arc<GenerationClient> {
        Arc::new(GenerationClient::from_config(&self.config))
    }

    fn find(&self, project: &str) -> Result<Project> {
        find_project(self.repo.as_ref(), project)
    }
}

/// An orchestrator whose snapshots are saved as they change.
struct Session {
    orchestrator: Orchestrator,
    repo: Arc<JsonProjectRepository>,
    saver: JoinHandle<()>,
}

impl Session {
    /// Must be called inside the runtime.
    fn start(orchestrator: Orchestrator, repo: Arc<JsonProjectRepository>) -> Self {
        let repo_dyn: Arc<dyn ProjectRepository> = repo.clone();
        let saver = tokio::spawn(persist_snapshots(orchestrator.store().subscribe(), repo_dyn));
        Self { orchestrator, repo, saver }
    }

    /// Stop autosaving and write the final snapshot.
    async fn finish(self) -> Result<Project> {
        let project = self.orchestrator.snapshot();
        drop(self.orchestrator);
        self.saver.await?;
        self.repo.save_project_snapshot(&project)?;
        Ok(project)
    }
}

fn open_project(ctx: &AppContext, project: Project) -> Orchestrator {
    let store = Arc::new(LifecycleStore::new(project));
    for kind in store.recover_interrupted() {
        tracing::warn!(%kind, "Marked interrupted generation as failed");
    }
    Orchestrator::new(store, ctx.client()).with_settings(ctx.config.orchestrator.clone())
}

/// Create a project and run the initial batch.
fn cmd_new(ctx: &AppContext, owner: &str, brief: ProjectBrief, no_generate: bool) -> Result<()> {
    let orchestrator = Orchestrator::create_project(owner, brief, ctx.client())?
        .with_settings(ctx.config.orchestrator.clone());
    let batch = orchestrator.initial_batch_kinds();

    let rt = tokio::runtime::Runtime::new()?;
    let (project, report) = rt.block_on(async {
        let session = Session::start(orchestrator, ctx.repo.clone());
        let report = if no_generate {
            None
        } else {
            println!("Generating {} documents...", batch.len());
            Some(session.orchestrator.run_initial_batch().await)
        };
        anyhow::Ok((session.finish().await?, report))
    })?;

    println!("Created project {} ({})", project.id, project.name());
    if let Some(report) = report {
        println!(
            "  {} generated, {} deferred, {} failed",
            report.completed.len(),
            report.degraded.len(),
            report.failed.len()
        );
        for (kind, reason) in &report.failed {
            println!("  ✗ {kind}: {reason}");
        }
    }
    Ok(())
}

/// List projects.
fn cmd_list(ctx: &AppContext, format: &str) -> Result<()> {
    let projects = ctx.repo.load_all_projects()?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&projects)?;
            println!("{json}");
        }
        _ => {
            for project in &projects {
                println!(
                    "{}  {:<12} {:>2}/{} done  {}",
                    short_id(&project.id),
                    project.status.to_string(),
                    project.count(DocumentStatus::Completed),
                    project.documents.len(),
                    project.name()
                );
            }
            println!("\nTotal: {} projects", projects.len());
        }
    }

    Ok(())
}

/// Show a project, or one document.
fn cmd_show(ctx: &AppContext, project: &str, kind: Option<DocumentKind>, format: &str) -> Result<()> {
    let project = ctx.find(project)?;

    match (kind, format) {
        (Some(kind), "json") => {
            println!("{}", serde_json::to_string_pretty(document(&project, kind)?)?);
        }
        (Some(kind), _) => {
            let doc = document(&project, kind)?;
            if let Some(error) = &doc.error {
                eprintln!("Last generation failed: {error}");
            }
            if doc.has_content() {
                println!("{}", doc.content);
            } else {
                println!("{} is {} ({})", doc.title, doc.status, doc.phase);
            }
        }
        (None, "json") => println!("{}", serde_json::to_string_pretty(&project)?),
        (None, _) => print_overview(&project),
    }

    Ok(())
}

fn print_overview(project: &Project) {
    println!("{} - {}", short_id(&project.id), project.name());
    println!("Status: {}  Owner: {}", project.status, project.owner);

    for category in Category::ALL {
        println!("\n{category}");
        for node in nodes_in(category) {
            let Some(doc) = project.document(node.kind) else { continue };
            let mut line = format!("  {} {:<32} {}", doc.status.icon(), doc.title, doc.kind);
            if doc.status == DocumentStatus::Generating {
                line.push_str(&format!("  {}% {}", doc.progress, doc.phase));
            }
            if doc.is_placeholder() {
                line.push_str("  (deferred)");
            }
            if let Some(error) = &doc.error {
                line.push_str(&format!("  error: {error}"));
            }
            println!("{line}");
        }
    }
}

/// Print the hierarchy.
fn cmd_kinds() -> Result<()> {
    for category in Category::ALL {
        println!("{category}");
        for node in nodes_in(category) {
            let profile = match profile_for(node.kind) {
                GenerationProfile::Standard => "",
                GenerationProfile::Grounded => " [grounded]",
                GenerationProfile::DeepReasoning => " [deep]",
            };
            let next = node.unlocks.first().map(|k| format!(" → {k}")).unwrap_or_default();
            println!("  {:<24} {} ({}){profile}{next}", node.kind, node.title, node.owner);
        }
    }
    Ok(())
}

/// Generate one document.
fn cmd_regenerate(ctx: &AppContext, project: &str, kind: DocumentKind) -> Result<()> {
    let orchestrator = open_project(ctx, ctx.find(project)?);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let session = Session::start(orchestrator, ctx.repo.clone());
        println!("Generating {}...", lookup(kind).title);
        let result = session.orchestrator.regenerate(kind).await;
        session.finish().await?;
        anyhow::Ok(result)
    })?;

    let doc = result?;
    report_document(&doc);
    Ok(())
}

/// Advance past `kind`.
fn cmd_advance(ctx: &AppContext, project: &str, kind: DocumentKind) -> Result<()> {
    let orchestrator = open_project(ctx, ctx.find(project)?);

    let rt = tokio::runtime::Runtime::new()?;
    let (result, project) = rt.block_on(async {
        let session = Session::start(orchestrator, ctx.repo.clone());
        let result = session.orchestrator.advance(kind).await;
        anyhow::Ok((result, session.finish().await?))
    })?;

    match result? {
        None => println!("{} is the last document of the plan", lookup(kind).title),
        Some(outcome) => {
            let doc = document(&project, outcome.focus)?;
            if outcome.generated {
                report_document(doc);
            } else {
                println!("Next: {} ({})", doc.title, doc.status);
            }
        }
    }
    Ok(())
}

/// List the sections of a document.
fn cmd_sections(ctx: &AppContext, project: &str, kind: DocumentKind) -> Result<()> {
    let project = ctx.find(project)?;
    let doc = document(&project, kind)?;

    let sections = split(&doc.content);
    if sections.is_empty() {
        println!("{} has no content yet", doc.title);
        return Ok(());
    }
    for section in &sections {
        println!("{:<12} {} ({} lines)", section.id, section.title, section.content.lines().count());
    }
    Ok(())
}

/// Replace one section verbatim.
fn cmd_edit_section(
    ctx: &AppContext,
    project: &str,
    kind: DocumentKind,
    section: &str,
    content: &str,
) -> Result<()> {
    let project = ctx.find(project)?;
    let doc_id = Document::id_for(&project.id, kind);
    let orchestrator = open_project(ctx, project);

    let doc = orchestrator.edit_section(&doc_id, section, content)?;
    ctx.repo.save_project_snapshot(&orchestrator.snapshot())?;
    println!("Updated {} of {}", section, doc.title);
    Ok(())
}

/// Rewrite one section with the model.
fn cmd_refine(
    ctx: &AppContext,
    project: &str,
    kind: DocumentKind,
    section: &str,
    instruction: &str,
) -> Result<()> {
    let project = ctx.find(project)?;
    let doc_id = Document::id_for(&project.id, kind);
    let orchestrator = open_project(ctx, project);

    let rt = tokio::runtime::Runtime::new()?;
    let doc = rt.block_on(orchestrator.refine_section(&doc_id, section, instruction))?;
    ctx.repo.save_project_snapshot(&orchestrator.snapshot())?;
    println!("Refined {} of {}", section, doc.title);
    Ok(())
}

/// Replace a whole document.
fn cmd_save(ctx: &AppContext, project: &str, kind: DocumentKind, content: &str) -> Result<()> {
    let project = ctx.find(project)?;
    let doc_id = Document::id_for(&project.id, kind);
    let orchestrator = open_project(ctx, project);

    let doc = orchestrator.save_document(&doc_id, content)?;
    ctx.repo.save_project_snapshot(&orchestrator.snapshot())?;
    println!("Saved {} ({} bytes)", doc.title, doc.content.len());
    Ok(())
}

/// Delete a project.
fn cmd_delete(ctx: &AppContext, project: &str, skip_confirm: bool) -> Result<()> {
    let project = ctx.find(project)?;

    if !skip_confirm {
        print!("Delete '{}' and all its documents? [y/N] ", project.name());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    ctx.repo.delete_project(&project.id)?;
    println!("Deleted {}", project.id);
    Ok(())
}

/// Show configuration.
fn cmd_config(config_path: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.join("config.toml").display());
        }
        return Ok(());
    }

    let mut config = Config::load_from(config_path)?;
    // Never print secrets
    config.generation.api_key = config.generation.api_key.map(|_| "********".to_string());
    if let Some(secondary) = config.generation.secondary.as_mut() {
        secondary.api_key = secondary.api_key.take().map(|_| "********".to_string());
    }

    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "planforge", &mut io::stdout());
}

fn report_document(doc: &Document) {
    if doc.is_placeholder() {
        println!("⚠ {} deferred: provider quota exhausted, regenerate later", doc.title);
    } else {
        println!("{} {} {}", doc.status.icon(), doc.title, doc.status);
    }
}

fn document(project: &Project, kind: DocumentKind) -> Result<&Document> {
    project
        .document(kind)
        .ok_or_else(|| anyhow::anyhow!("Project {} has no {kind} document", project.id))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn default_owner() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".to_string())
}
