use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use command_catalog_core::{Diff, DiffLevel, SchemaNode, SchemaNormalizer, validate_tree};
use command_catalog_db::{CatalogConfig, CatalogError, CommandTreeManager};
use tracing::{Level, debug, warn};

#[derive(Debug, Parser)]
#[command(name = "catalog")]
#[command(about = "Inspect, verify and diff command catalogues")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every group and command for a short summary.
    Verify(VerifyArgs),
    /// Print one command group or command as JSON.
    Show(ShowArgs),
    /// Print the fully loaded command tree as JSON.
    Tree(TreeArgs),
    /// Replace repeated class definitions in a schema file with references.
    Normalize(NormalizeArgs),
    /// Compare two schema files.
    Diff(DiffArgs),
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Catalogue root directory (holding `Commands/`).
    #[arg(long, conflicts_with = "config")]
    aaz_path: Option<PathBuf>,
    /// Catalogue configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Only require summaries on commands.
    #[arg(long)]
    skip_groups: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Path segments, e.g. `vm deallocate`. Empty shows the root.
    names: Vec<String>,
}

#[derive(Debug, Args)]
struct TreeArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Parse every document instead of reading the index.
    #[arg(long)]
    no_patch: bool,
    /// Write the tree to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    /// Schema JSON file.
    input: PathBuf,
    /// Fail if a reference names a class defined nowhere.
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Args)]
struct DiffArgs {
    /// Previous schema JSON file.
    old: PathBuf,
    /// Current schema JSON file.
    new: PathBuf,
    /// Minimum severity to report: `associate` or `breaking`.
    #[arg(long, default_value = "breaking")]
    level: DiffLevel,
    /// Print nested diffs instead of dotted paths.
    #[arg(long)]
    nested: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Verify(args) => run_verify(args),
        Command::Show(args) => run_show(args),
        Command::Tree(args) => run_tree(args),
        Command::Normalize(args) => run_normalize(args),
        Command::Diff(args) => run_diff(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &CatalogArgs) -> Result<CatalogConfig, String> {
    match (&args.config, &args.aaz_path) {
        (Some(path), _) => CatalogConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        (None, Some(aaz_path)) => Ok(CatalogConfig::new(aaz_path)),
        (None, None) => Err("Specify the catalogue with --aaz-path or --config".to_string()),
    }
}

fn open_manager(config: &CatalogConfig) -> Result<CommandTreeManager, String> {
    CommandTreeManager::from_config(config).map_err(|e| {
        format!(
            "Failed to open catalogue '{}': {e}",
            config.aaz_path.display()
        )
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize output: {e}"))
}

fn run_verify(args: VerifyArgs) -> Result<(), String> {
    let mut config = load_config(&args.catalog)?;
    if args.skip_groups {
        config.verify.require_group_help = false;
    }
    let mut manager = open_manager(&config)?;

    match manager.verify() {
        Ok(()) => {}
        Err(CatalogError::Verification(violations)) => {
            println!("{}", to_json(&violations)?);
            return Err(format!("Verification failed for {} node(s)", violations.len()));
        }
        Err(err) => return Err(err.to_string()),
    }

    let groups = manager.command_group_paths(&[] as &[&str]).len().saturating_sub(1);
    let commands = manager.command_paths(&[] as &[&str]).len();
    println!("Verified {groups} command group(s) and {commands} command(s).");
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<(), String> {
    let config = load_config(&args.catalog)?;
    let mut manager = open_manager(&config)?;

    if let Some(command) = manager.find_command(&args.names) {
        println!("{}", to_json(command)?);
        return Ok(());
    }
    match manager.find_command_group(&args.names) {
        Some(group) => {
            println!("{}", to_json(group)?);
            Ok(())
        }
        None => Err(format!("'{}' not found", args.names.join(" "))),
    }
}

fn run_tree(args: TreeArgs) -> Result<(), String> {
    let config = load_config(&args.catalog)?;
    let mut manager = open_manager(&config)?;

    if !args.no_patch {
        let report = manager.patch().map_err(|e| e.to_string())?;
        debug!(
            substituted = report.substituted,
            unresolved = report.unresolved,
            "Applied index"
        );
    }
    let tree = manager.into_tree();
    for problem in validate_tree(&tree) {
        warn!(problem = %problem, "Inconsistent command tree");
    }

    let json = to_json(&tree)?;
    match args.output {
        Some(path) => {
            write_output(&path, &json)?;
            let (groups, commands) = tree.counts();
            println!(
                "Wrote {groups} command group(s) and {commands} command(s) to '{}'.",
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<(), String> {
    let mut schema = read_schema(&args.input)?;

    let mut normalizer = SchemaNormalizer::new();
    normalizer.normalize(&mut schema);
    if args.check {
        normalizer.finish().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            messages.join("; ")
        })?;
    }

    println!("{}", to_json(&schema)?);
    Ok(())
}

fn run_diff(args: DiffArgs) -> Result<(), String> {
    let old = read_schema(&args.old)?;
    let new = read_schema(&args.new)?;

    let diff = new.diff(&old, args.level);
    if args.nested {
        println!("{}", to_json(&diff)?);
    } else {
        println!("{}", to_json(&diff.flatten())?);
    }
    if !diff.is_empty() {
        eprintln!("{} difference(s) found.", diff.flatten().len());
    }
    Ok(())
}

fn read_schema(path: &Path) -> Result<SchemaNode, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("Failed to parse schema '{}': {err}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    fs::write(path, contents).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}
