mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "workflow-config",
    version,
    about = "Workflow config: migrate, validate and store agentic workflow presets"
)]
struct App {
    /// Preset store path (defaults to {data_dir}/presets.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the migrated v2 value of a preset (not validated)
    Migrate { file: PathBuf },
    /// Load and validate a preset; exits 1 on failure
    Validate { file: PathBuf },
    /// Export a preset as canonical v2
    Export {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the flat agent_models map of a preset
    Flatten { file: PathBuf },
    /// Manage stored presets
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Validate a preset file and store it as a new version
    Import {
        file: PathBuf,
        /// Make the new row the active preset
        #[arg(long)]
        activate: bool,
    },
    /// List stored presets
    List,
    /// Show a stored preset in the legacy response shape
    Show { id: i64 },
    /// Make a stored preset the active one
    Activate { id: i64 },
    /// Export a stored preset as canonical v2
    Export {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a stored preset
    Delete { id: i64 },
}

fn run(app: App) -> anyhow::Result<()> {
    match app.command {
        Commands::Migrate { file } => cli::file::run_migrate(&file),
        Commands::Validate { file } => cli::file::run_validate(&file),
        Commands::Export { file, out } => cli::file::run_export(&file, out.as_deref()),
        Commands::Flatten { file } => cli::file::run_flatten(&file),
        Commands::Store { action } => {
            let conn = cli::open_store(app.db.as_deref())?;
            match action {
                StoreAction::Import { file, activate } => {
                    cli::store::run_import(&conn, &file, activate)
                }
                StoreAction::List => cli::store::run_list(&conn),
                StoreAction::Show { id } => cli::store::run_show(&conn, id),
                StoreAction::Activate { id } => cli::store::run_activate(&conn, id),
                StoreAction::Export { id, out } => {
                    cli::store::run_export(&conn, id, out.as_deref())
                }
                StoreAction::Delete { id } => cli::store::run_delete(&conn, id),
            }
        }
    }
}

fn main() {
    let app = App::parse();

    match app.log_file.as_deref() {
        Some(path) => workflow_config::tracing_init::init_file_tracing(path),
        None => workflow_config::tracing_init::init_stderr_tracing(),
    }

    if let Err(e) = run(app) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
