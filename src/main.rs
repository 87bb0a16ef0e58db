use std::{
    io::{self, Read},
    path::PathBuf,
};

use clap::{ArgAction, Parser as ClapParser, Subcommand};
use record_rules::{
    Action, EngineConfig,
    cli::{self, CheckOptions, CheckResult, CliError},
};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "rules")]
#[command(about = "Evaluate record filters and collection access rules")]
#[command(version)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a filter, or evaluate it (or a collection rule) against a JSON payload
    Check {
        /// The filter to check; with --collection, the client filter for `list`
        filter: Option<String>,

        /// JSON payload (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Bind a `{:name}` placeholder, as name=value (repeatable)
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Bind placeholders from a JSON object
        #[arg(long = "params", value_name = "JSON")]
        params_json: Option<String>,

        /// Check this collection's rule from the payload definitions
        #[arg(short, long)]
        collection: Option<String>,

        /// Rule to check with --collection
        #[arg(short, long, default_value = "view")]
        action: String,

        /// Engine limits as a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'rules docs' to list categories)
        category: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            filter,
            input,
            params,
            params_json,
            collection,
            action,
            config,
            pretty,
            syntax_only,
        } => build_options(filter, input, &params, params_json, collection, &action, config, syntax_only)
            .and_then(|options| run_check(&options, pretty)),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| print!("{content}")),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn build_options(
    filter: Option<String>,
    input: Option<String>,
    params: &[String],
    params_json: Option<String>,
    collection: Option<String>,
    action: &str,
    config: Option<PathBuf>,
    syntax_only: bool,
) -> Result<CheckOptions, CliError> {
    let action = Action::from_name(action).ok_or_else(|| CliError::UnknownAction(action.to_string()))?;
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let input = match input {
        Some(s) => Some(s),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    Ok(CheckOptions {
        filter,
        input,
        params: cli::parse_params(params_json.as_deref(), params)?,
        syntax_only,
        collection,
        action: Some(action),
        config,
    })
}

fn run_check(options: &CheckOptions, pretty: bool) -> Result<(), CliError> {
    match cli::execute_check(options)? {
        CheckResult::SyntaxValid { canonical } => {
            println!("Syntax is valid");
            if !canonical.is_empty() {
                println!("{canonical}");
            }
        }
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{json}");
        }
    }
    Ok(())
}
