use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use igpub::config::{PipelineConfig, SavedConfig, CONFIG_FILE_NAME};
use igpub::pipeline::Pipeline;
use igpub::Error;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lines of captured output shown inline on failure.
/// The complete output is always available in the run log.
const ERROR_TAIL_LINES: usize = 40;

#[derive(Parser)]
#[command(name = "igpub")]
#[command(version = VERSION)]
#[command(about = "Build and publish FHIR Implementation Guide releases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the release pipeline
    Run(RunArgs),
    /// Manage the persisted release configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a local IG source checkout (skips cloning the source repo)
    #[arg(long)]
    source: Option<PathBuf>,
    /// URL of the IG source repository
    #[arg(long)]
    source_repo: Option<String>,
    /// Branch of the IG source repository
    #[arg(long)]
    source_branch: Option<String>,
    /// Webroot repository URL
    #[arg(long)]
    webroot_repo: Option<String>,
    /// Webroot branch
    #[arg(long)]
    webroot_branch: Option<String>,
    /// History template repository URL
    #[arg(long)]
    history_repo: Option<String>,
    /// History template branch
    #[arg(long)]
    history_branch: Option<String>,
    /// Sparse checkout folders for the webroot
    #[arg(long, num_args = 0..)]
    sparse: Option<Vec<String>>,
    /// Enable sparse checkout of the webroot
    #[arg(long)]
    enable_sparse: bool,
    /// IG folder inside the webroot repository
    #[arg(long)]
    ig_folder: Option<String>,
    /// Commit and push updated web content back to the webroot repository
    #[arg(long)]
    push: bool,
    /// Token for authenticated push (falls back to GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,
    /// Working directory for the run
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
    /// Size threshold in MB above which files move to release assets
    #[arg(long)]
    max_file_size_mb: Option<u64>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the persisted configuration
    Show {
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },
    /// Persist repository settings to release-config.yaml
    Save(SaveArgs),
}

#[derive(Args)]
struct SaveArgs {
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
    #[arg(long)]
    source_repo: Option<String>,
    #[arg(long)]
    source_branch: Option<String>,
    #[arg(long)]
    webroot_repo: Option<String>,
    #[arg(long)]
    webroot_branch: Option<String>,
    #[arg(long)]
    history_repo: Option<String>,
    #[arg(long)]
    history_branch: Option<String>,
    #[arg(long, num_args = 0..)]
    sparse: Option<Vec<String>>,
    #[arg(long)]
    enable_sparse: bool,
    #[arg(long)]
    max_file_size_mb: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Config(args) => config_command(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            if let Some(output) = e.captured_output() {
                eprintln!("{}", output_tail(output, ERROR_TAIL_LINES));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: RunArgs) -> Result<(), Error> {
    let config = build_config(args)?;
    let outcome = Pipeline::new(config).run()?;
    println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
    Ok(())
}

/// Merge order: built-in defaults < persisted YAML < command-line flags.
/// The environment credential lookup happens here, never inside the core.
fn build_config(args: RunArgs) -> Result<PipelineConfig, Error> {
    let mut config = PipelineConfig::default();

    let saved = SavedConfig::load(&args.work_dir.join(CONFIG_FILE_NAME))?;
    saved.apply_to(&mut config);

    config.work_dir = args.work_dir;
    if let Some(v) = args.source {
        config.source_dir = Some(v);
    }
    if let Some(v) = args.source_repo {
        config.source_repo = Some(v);
    }
    if let Some(v) = args.source_branch {
        config.source_branch = Some(v);
    }
    if let Some(v) = args.webroot_repo {
        config.webroot_repo = v;
    }
    if let Some(v) = args.webroot_branch {
        config.webroot_branch = Some(v);
    }
    if let Some(v) = args.history_repo {
        config.history_repo = v;
    }
    if let Some(v) = args.history_branch {
        config.history_branch = Some(v);
    }
    if let Some(v) = args.sparse {
        config.sparse_dirs = v;
    }
    if args.enable_sparse {
        config.enable_sparse = true;
    }
    if let Some(v) = args.ig_folder {
        config.ig_folder = v;
    }
    if args.push {
        config.push_changes = true;
    }
    if let Some(v) = args.max_file_size_mb {
        config.max_file_size_bytes = v * 1024 * 1024;
    }
    config.token = args.token.or_else(|| std::env::var("GITHUB_TOKEN").ok());

    Ok(config)
}

fn config_command(args: ConfigArgs) -> Result<(), Error> {
    match args.command {
        ConfigCommands::Show { work_dir } => {
            let saved = SavedConfig::load(&work_dir.join(CONFIG_FILE_NAME))?;
            println!("{}", serde_json::to_string_pretty(&saved).unwrap_or_default());
            Ok(())
        }
        ConfigCommands::Save(args) => {
            let path = args.work_dir.join(CONFIG_FILE_NAME);
            let mut saved = SavedConfig::load(&path)?;
            if args.source_repo.is_some() {
                saved.source_repo = args.source_repo;
            }
            if args.source_branch.is_some() {
                saved.source_branch = args.source_branch;
            }
            if args.webroot_repo.is_some() {
                saved.webroot_repo = args.webroot_repo;
            }
            if args.webroot_branch.is_some() {
                saved.webroot_branch = args.webroot_branch;
            }
            if args.history_repo.is_some() {
                saved.history_repo = args.history_repo;
            }
            if args.history_branch.is_some() {
                saved.history_branch = args.history_branch;
            }
            if args.sparse.is_some() {
                saved.sparse_dirs = args.sparse;
            }
            if args.enable_sparse {
                saved.enable_sparse_checkout = Some(true);
            }
            if args.max_file_size_mb.is_some() {
                saved.max_file_size_mb = args.max_file_size_mb;
            }
            saved.save(&path)?;
            println!("{}", serde_json::to_string_pretty(&saved).unwrap_or_default());
            Ok(())
        }
    }
}

fn output_tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
