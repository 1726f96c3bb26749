use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_dispatch::ai::ProviderKind;
use llm_dispatch::cli::commands::{
    complete::CompleteOptions, config, structure::StructureOverrides, tokens,
};

#[derive(Parser)]
#[command(name = "llm-dispatch")]
#[command(
    version,
    about = "Retrying, batch-splitting client for OpenAI- and Anthropic-compatible LLM APIs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a completion request (split into sub-batches when needed)
    Complete {
        #[arg(long, default_value = "openai", help = "Provider: openai, anthropic")]
        provider: ProviderKind,
        #[arg(long, short, help = "Model to use")]
        model: String,
        #[arg(long, help = "Send as a reasoning-model request (openai only)")]
        reasoning: bool,
        #[arg(long, short = 'n', default_value = "1", help = "Number of samples")]
        samples: u32,
        #[arg(long, short, default_value = "1.0", help = "Sampling temperature (0.0-2.0)")]
        temperature: f32,
        #[arg(long, help = "Output token budget (clamped to the model ceiling)")]
        max_tokens: Option<u32>,
        #[arg(long, help = "System message")]
        system: Option<String>,
        #[arg(long, short, conflicts_with = "prompt_file", help = "Prompt text")]
        prompt: Option<String>,
        #[arg(long, help = "Read the prompt from a file")]
        prompt_file: Option<PathBuf>,
        #[arg(long, help = "Mark the prompt prefix cacheable (anthropic only)")]
        prompt_cache: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Count tokens of a text for a model
    Tokens {
        #[arg(long, short, help = "Model whose encoding to use")]
        model: String,
        #[arg(long, conflicts_with = "file", help = "Text to count")]
        text: Option<String>,
        #[arg(long, help = "File to count")]
        file: Option<PathBuf>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Extract repository structures for a dataset (JSON array or JSON lines)
    Structure {
        #[arg(help = "Dataset file with instance_id, repo, base_commit records")]
        dataset: PathBuf,
        #[arg(long, short, help = "Output directory for structure documents")]
        output_dir: Option<PathBuf>,
        #[arg(long, help = "Scratch directory for checkouts")]
        workdir: Option<PathBuf>,
        #[arg(long, short, help = "Concurrent jobs (default: CPUs, max 32)")]
        workers: Option<usize>,
        #[arg(long, help = "Clone URL prefix")]
        clone_base: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mllm-dispatch encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Default hook prints the backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Complete {
            provider,
            model,
            reasoning,
            samples,
            temperature,
            max_tokens,
            system,
            prompt,
            prompt_file,
            prompt_cache,
            format,
        } => {
            let options = CompleteOptions {
                reasoning,
                samples,
                temperature,
                max_tokens,
                system,
                prompt,
                prompt_file,
                prompt_cache,
                json: format == "json",
                ..CompleteOptions::new(provider, model)
            };
            let rt = Runtime::new()?;
            rt.block_on(llm_dispatch::cli::commands::complete::run(options))?;
        }
        Commands::Tokens {
            model,
            text,
            file,
            format,
        } => {
            tokens::run(
                &model,
                text.as_deref(),
                file.as_deref(),
                format == "json",
            )?;
        }
        Commands::Structure {
            dataset,
            output_dir,
            workdir,
            workers,
            clone_base,
        } => {
            let overrides = StructureOverrides {
                output_dir,
                workdir,
                workers,
                clone_base,
            };
            let rt = Runtime::new()?;
            rt.block_on(llm_dispatch::cli::commands::structure::run(
                &dataset, overrides,
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => config::show(global, &format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { global, force } => config::init(global, force)?,
        },
    }

    Ok(())
}
