//! IPM - Ingest Package Manager CLI
//!
//! Scans a directory, types it with a domain profile and reports the result

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::Level;

use ipm_core::{
    ContentTree, DomainProfile, EngineConfig, FilesystemScanner, InMemoryObjectStore, NodeId,
    ProfileCatalog, ProfileEngine, TreeSource,
};

#[derive(Parser)]
#[command(name = "ipm")]
#[command(version = ipm_core::VERSION)]
#[command(about = "Ingest package manager - profile typing for content trees", long_about = None)]
struct Cli {
    /// Engine config file (YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Profile identifier or label, overriding the config
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: Format,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in profiles with their node types and transforms
    Profiles,
    /// Scan a directory and assign node types
    Assign {
        /// Directory to scan
        path: PathBuf,
        /// Leave the tree untyped when assignment fails
        #[arg(long)]
        rollback: bool,
    },
    /// Scan, assign and validate a directory
    Validate {
        /// Directory to scan
        path: PathBuf,
    },
    /// Show (or apply) the transforms legal for one node
    Transforms {
        /// Directory to scan
        path: PathBuf,
        /// Node path relative to the scanned directory
        #[arg(long)]
        node: String,
        /// Transform label to apply
        #[arg(long)]
        apply: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(profile) = &cli.profile {
        config.spec.profile = profile.clone();
    }
    let catalog = ProfileCatalog::builtin()?;

    match cli.command {
        Commands::Profiles => handle_profiles(&catalog, cli.format)?,
        Commands::Assign { path, rollback } => {
            if rollback {
                config.spec.assignment.rollback_on_failure = true;
            }
            handle_assign(&catalog, &config, &path, cli.format)?;
        }
        Commands::Validate { path } => handle_validate(&catalog, &config, &path, cli.format)?,
        Commands::Transforms { path, node, apply } => {
            handle_transforms(&catalog, &config, &path, &node, apply.as_deref(), cli.format)?
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn scan(config: &EngineConfig, path: &Path) -> Result<ContentTree> {
    let scanner = FilesystemScanner::new(config.spec.scanner.clone());
    scanner
        .build_tree(path)
        .with_context(|| format!("failed to scan {}", path.display()))
}

fn handle_profiles(catalog: &ProfileCatalog, format: Format) -> Result<()> {
    if format == Format::Json {
        let profiles: Vec<_> = catalog
            .profiles()
            .map(|p| {
                json!({
                    "identifier": p.identifier(),
                    "label": p.label(),
                    "nodeTypes": p.node_types().map(|(_, t)| &t.label).collect::<Vec<_>>(),
                    "transforms": p.transforms().map(|(_, t)| &t.label).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    for profile in catalog.profiles() {
        println!("{} {}", profile.label().bold(), profile.identifier().dimmed());
        println!("  Node types:");
        for (_, t) in profile.node_types() {
            println!("    {:<20} {}", t.label.cyan(), t.file_association);
        }
        println!("  Transforms:");
        for (_, t) in profile.transforms() {
            println!(
                "    {:<34} {} -> {}",
                t.label,
                profile.node_type(t.source_node_type).label,
                profile.node_type(t.result_node_type).label
            );
        }
    }
    Ok(())
}

fn handle_assign(catalog: &ProfileCatalog, config: &EngineConfig, path: &Path, format: Format) -> Result<()> {
    let mut tree = scan(config, path)?;
    let mut engine = ProfileEngine::from_config(catalog, config, InMemoryObjectStore::new())?;
    let outcome = engine.assign_tree(&mut tree);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&tree_json(engine.profile(), &tree))?),
        Format::Text => print_tree(engine.profile(), &tree),
    }

    match outcome {
        Ok(report) => {
            if format == Format::Text {
                println!(
                    "\n{} {} node(s) typed, {} domain object(s)",
                    "✓".green(),
                    report.typed(),
                    report.objects
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("\n{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn handle_validate(catalog: &ProfileCatalog, config: &EngineConfig, path: &Path, format: Format) -> Result<()> {
    let mut tree = scan(config, path)?;
    let mut engine = ProfileEngine::from_config(catalog, config, InMemoryObjectStore::new())?;
    if let Err(e) = engine.assign_tree(&mut tree) {
        eprintln!("{} {}", "!".yellow(), e);
    }

    let Some(root) = tree.root() else {
        bail!("nothing scanned at {}", path.display());
    };
    let report = engine.validation_report(&tree, root)?;

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_valid() {
        println!("{} {} node(s) valid", "✓".green(), report.checked);
    } else {
        for violation in &report.violations {
            println!("{} {}", "✗".red(), violation);
        }
        println!(
            "\n{} violation(s) in {} node(s)",
            report.violations.len(),
            report.checked
        );
    }

    if !report.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_transforms(
    catalog: &ProfileCatalog,
    config: &EngineConfig,
    path: &Path,
    node_path: &str,
    apply: Option<&str>,
    format: Format,
) -> Result<()> {
    let mut tree = scan(config, path)?;
    let mut engine = ProfileEngine::from_config(catalog, config, InMemoryObjectStore::new())?;
    engine.assign_tree(&mut tree)?;

    let Some(node) = tree.find_by_path(node_path) else {
        bail!("no node at '{}'", node_path);
    };

    if let Some(label) = apply {
        engine.apply_transform_by_label(&mut tree, node, label)?;
        let local = engine.revalidate_around(&tree, node)?;
        if format == Format::Text {
            println!("{} applied {}", "✓".green(), label);
            for violation in &local.violations {
                println!("  {} {}", "!".yellow(), violation);
            }
        }
    }

    let legal = engine.legal_transforms(&tree, node)?;
    let profile = engine.profile();
    let current = type_label(profile, &tree, node);

    match format {
        Format::Json => {
            let labels: Vec<_> = legal.iter().map(|t| &profile.transform(*t).label).collect();
            let out = json!({
                "node": node_path,
                "nodeType": current,
                "transforms": labels,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Text => {
            println!("{} ({})", node_path.bold(), current.cyan());
            if legal.is_empty() {
                println!("  no legal transforms");
            }
            for t in legal {
                let transform = profile.transform(t);
                println!(
                    "  {:<34} -> {}",
                    transform.label,
                    profile.node_type(transform.result_node_type).label
                );
            }
        }
    }
    Ok(())
}

fn type_label(profile: &DomainProfile, tree: &ContentTree, node: NodeId) -> String {
    tree.get(node)
        .and_then(|n| n.node_type)
        .and_then(|t| profile.get_node_type(t))
        .map_or_else(|| "untyped".to_string(), |t| t.label.clone())
}

fn print_tree(profile: &DomainProfile, tree: &ContentTree) {
    let Some(root) = tree.root() else {
        return;
    };
    for id in tree.descendants(root) {
        let Some(node) = tree.get(id) else { continue };
        let indent = "  ".repeat(tree.depth(id));
        let label = type_label(profile, tree, id);
        if node.ignored {
            println!("{}{} {}", indent, node.name.dimmed(), "(ignored)".dimmed());
        } else if node.is_typed() {
            println!("{}{} [{}]", indent, node.name, label.cyan());
        } else {
            println!("{}{} [{}]", indent, node.name, label.red());
        }
    }
}

fn tree_json(profile: &DomainProfile, tree: &ContentTree) -> serde_json::Value {
    let nodes: Vec<_> = tree
        .root()
        .map(|root| tree.descendants(root))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| {
            let node = tree.get(id)?;
            Some(json!({
                "path": tree.path_of(id),
                "identifier": node.identifier,
                "nodeType": node.node_type.and_then(|t| profile.get_node_type(t)).map(|t| &t.label),
                "relation": node.parent_relation.map(|r| &profile.relation(r).forward_predicate),
                "domainObject": node.domain_object,
                "ignored": node.ignored,
            }))
        })
        .collect();
    json!({
        "profile": tree.profile(),
        "nodes": nodes,
    })
}
