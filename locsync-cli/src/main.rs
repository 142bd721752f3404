use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use locsync::PluralFormsTable;
use locsync_cli::validation::validate_language_code;
use locsync_cli::{FileConfig, SyncArgs, SyncSettings, run_sync_command};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "locsync", author, version, about, long_about = None)]
struct Args {
    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize language files against the primary language.
    Sync(SyncArgs),

    /// Show the plural key suffixes used for languages.
    Plurals {
        /// Language codes, e.g. `en cs pt_BR`
        #[arg(required = true)]
        languages: Vec<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn print_plurals(languages: &[String]) -> Result<(), String> {
    let table = PluralFormsTable::standard();
    for lang in languages {
        validate_language_code(lang)?;
        let forms = table.lookup(lang);
        if forms.is_empty() {
            println!("{}: unknown (keys are copied literally)", lang);
        } else {
            println!("{}: {}", lang, forms.templates().join(", "));
        }
    }
    Ok(())
}

fn run_sync(args: SyncArgs) -> Result<(), String> {
    let cwd = std::env::current_dir().map_err(|e| format!("Cannot read working directory: {}", e))?;
    let (config, config_path) = FileConfig::load(args.config.as_deref(), &cwd)?;
    if let Some(path) = &config_path {
        tracing::info!(config = %path.display(), "using configuration file");
    }
    run_sync_command(SyncSettings::resolve(args, config, &cwd))
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match args.commands {
        Commands::Sync(sync_args) => run_sync(sync_args),
        Commands::Plurals { languages } => print_plurals(&languages),
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
