//! CLI binary for codelink: parse Python projects and query their dependency graphs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codelink_core::config::CodelinkConfig;
use codelink_core::graph::{DependencyGraph, Node};
use codelink_core::storage;
use codelink_core::store::JsonRecordStore;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "codelink", about = "Python dependency graph builder")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Project id used to key stored records (defaults to the directory name)
    #[arg(long, global = true)]
    id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every source file and store the records
    Parse {
        /// Glob patterns to include files (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Glob patterns to exclude files (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Print the stored record of one file as JSON
    Record {
        /// File path, relative to the project root or absolute
        path: String,
    },

    /// Build the dependency graph from stored records and save it
    Graph {
        /// Print the full serialized graph instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show a node with its callers and callees
    Node {
        /// Node id (`path.py` or `path.py::Qualified.name`)
        node_id: String,
    },

    /// Show graph statistics
    Info,
}

/// Resolved project location and settings shared by every command.
struct Project {
    root: PathBuf,
    id: String,
    config: CodelinkConfig,
}

impl Project {
    fn open(cli: &Cli) -> Result<Self> {
        let root = match &cli.project {
            Some(p) => p.clone(),
            None => std::env::current_dir().context("failed to get current directory")?,
        };
        let id = match &cli.id {
            Some(id) => id.clone(),
            None => default_project_id(&root)?,
        };
        let config = CodelinkConfig::load(&root)
            .with_context(|| format!("failed to load config for {}", root.display()))?;
        Ok(Self { root, id, config })
    }

    fn store(&self) -> JsonRecordStore {
        JsonRecordStore::new(self.config.storage.records_root(&self.root))
    }
}

fn default_project_id(root: &Path) -> Result<String> {
    let canonical = root
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cannot derive a project id from {}; pass --id",
                root.display()
            )
        })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let project = Project::open(&cli)?;

    match cli.command {
        Commands::Parse { include, exclude } => cmd_parse(project, include, exclude),
        Commands::Record { path } => cmd_record(&project, &path),
        Commands::Graph { json } => cmd_graph(&project, json),
        Commands::Node { node_id } => cmd_node(&project, &node_id),
        Commands::Info => cmd_info(&project),
    }
}

fn cmd_parse(mut project: Project, include: Vec<String>, exclude: Vec<String>) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    project.config.extraction.include.extend(include);
    project.config.extraction.exclude.extend(exclude);

    if !storage::ensure_gitignore(&project.root)? {
        eprintln!("Added .codelink/ to .gitignore");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.set_message("Scanning files...");
    let files = codelink_parser::collect_source_files(&project.root, &project.config.extraction)?;
    if files.is_empty() {
        spinner.finish_and_clear();
        eprintln!(
            "No source files found in {} (extensions: {}).",
            project.root.display(),
            project.config.extraction.extensions.join(", ")
        );
        return Ok(());
    }

    spinner.set_message(format!("Parsing {} files...", files.len()));
    let store = project.store();
    let summary = codelink_parser::parse_sources(&project.id, &files, &store)?;
    spinner.finish_and_clear();
    if storage::remove_graph(&project.root, &project.id)? {
        tracing::debug!("dropped stale graph of project {}", project.id);
    }

    eprintln!("Project: {}", project.id);
    eprintln!("  Parsed: {}", summary.parsed_files);
    eprintln!("  Failed: {}", summary.failed_files);
    for (path, message) in &summary.failures {
        eprintln!("    {}: {}", path, message);
    }
    eprintln!("  Records: {}", store.project_dir(&project.id)?.display());
    Ok(())
}

fn cmd_record(project: &Project, path: &str) -> Result<()> {
    let store = project.store();
    match codelink_parser::get_file_record(&store, &project.id, &project.root, path)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => eprintln!("No record for {}. Run `codelink parse` first.", path),
    }
    Ok(())
}

fn cmd_graph(project: &Project, json: bool) -> Result<()> {
    let store = project.store();
    let graph =
        codelink_resolve::build_project_graph(&store, &project.id, &project.config.resolution)?;
    storage::save_graph(&project.root, &project.id, &graph)?;

    if json {
        println!("{}", codelink_core::schema::to_json(&graph)?);
        return Ok(());
    }

    if graph.is_empty() {
        eprintln!("No records for project {}. Run `codelink parse` first.", project.id);
    }
    print_stats(&graph);
    eprintln!(
        "\nSaved to {}",
        storage::graph_file(&project.root, &project.id)?.display()
    );
    Ok(())
}

/// The project's saved graph, or a fresh build when none has been saved
/// since the last parse.
fn load_or_build(project: &Project) -> Result<DependencyGraph> {
    if storage::graph_exists(&project.root, &project.id) {
        return storage::load_graph(&project.root, &project.id);
    }
    let store = project.store();
    codelink_resolve::build_project_graph(&store, &project.id, &project.config.resolution)
}

fn cmd_node(project: &Project, node_id: &str) -> Result<()> {
    let graph = load_or_build(project)?;
    let Some(node) = graph.get_node(node_id) else {
        eprintln!("Node not found: {}", node_id);
        return Ok(());
    };

    match node {
        Node::File { id, label } => {
            println!("File: {}", id);
            println!("Label: {}", label);
        }
        Node::Function {
            id,
            label,
            file_path,
            line,
        } => {
            println!("Function: {}", id);
            println!("Label: {}", label);
            println!("Location: {}:{}", file_path, line);
        }
    }

    let callers = neighbor_lines(&graph, node_id, true);
    println!("\nCallers ({}):", callers.len());
    for line in &callers {
        println!("{}", line);
    }

    let callees = neighbor_lines(&graph, node_id, false);
    println!("\nCallees ({}):", callees.len());
    for line in &callees {
        println!("{}", line);
    }
    Ok(())
}

/// One line per distinct neighbour of `node_id`, listing the kinds of every
/// edge linking the two.
fn neighbor_lines(graph: &DependencyGraph, node_id: &str, incoming: bool) -> Vec<String> {
    let (neighbors, edges) = if incoming {
        (graph.get_callers(node_id), graph.edges_to(node_id))
    } else {
        (graph.get_callees(node_id), graph.edges_from(node_id))
    };
    neighbors
        .iter()
        .map(|neighbor| {
            let kinds: Vec<&str> = edges
                .iter()
                .filter(|e| {
                    let other = if incoming { &e.source } else { &e.target };
                    other == neighbor.id()
                })
                .map(|e| e.kind.as_str())
                .collect();
            format!("  {} [{}]", neighbor.id(), kinds.join(", "))
        })
        .collect()
}

fn cmd_info(project: &Project) -> Result<()> {
    if !storage::graph_exists(&project.root, &project.id) {
        eprintln!(
            "No graph found for project {}. Run `codelink graph` first.",
            project.id
        );
        return Ok(());
    }
    let graph = storage::load_graph(&project.root, &project.id)?;
    println!(
        "Graph: {}",
        storage::graph_file(&project.root, &project.id)?.display()
    );
    print_stats(&graph);
    Ok(())
}

fn print_stats(graph: &DependencyGraph) {
    let meta = graph.metadata();
    println!("Built: {}", meta.built_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Files: {}", meta.total_files);
    println!("Functions: {}", meta.total_functions);
    println!("Edges: {}", meta.total_edges);
    println!("  contains: {}", meta.contains_edges);
    println!("  imports: {}", meta.import_edges);
    println!("  calls: {}", meta.call_edges);
    println!("  calls_ambiguous: {}", meta.ambiguous_call_edges);
}
