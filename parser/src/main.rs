//! @ai:module:intent CLI entry point for extracting and checking `@!` annotations
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on project, config, output

use anyhow::{bail, Context};
use atbang_parser::{
    output, project, Annotation, Config, DiagnosticKind, OutputFormat, ProjectAnnotations,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "atbang")]
#[command(author, version, about = "Extract @! annotations from source comments")]
struct Cli {
    /// Configuration file (defaults to the nearest .atbang.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log scan progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract annotations from a file or directory
    Extract {
        /// Path to file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Language name, alias or extension overriding detection
        #[arg(long)]
        lang: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Report diagnostics, failing on the configured kinds
    Check {
        /// Path to file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Diagnostic kinds that fail the check (overrides config)
        #[arg(long, value_delimiter = ',')]
        fail_on: Vec<DiagnosticKind>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Select annotations by key, tag or agent
    Query {
        /// Path to file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long)]
        key: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        agent: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// List known languages and their comment delimiters
    Profiles {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
    Jsonl,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
            Format::Jsonl => OutputFormat::JsonLines,
        }
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("atbang_parser={}", level).parse()?)
                .add_directive(format!("atbang={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(explicit: Option<&Path>, start: &Path) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match Config::discover(start)? {
        Some((path, config)) => {
            debug!(config = %path.display(), "using discovered config");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn scan(path: &Path, lang: Option<&str>, config: &Config) -> anyhow::Result<ProjectAnnotations> {
    let registry = config.registry();
    let mut files = project::discover_files(path, &registry, &config.scan)?;
    if let Some(lang) = lang {
        for file in &mut files {
            file.language = Some(lang.to_string());
        }
    }
    let result = project::extract_project(
        &files,
        &registry,
        config.scan.scan_options(),
        config.scan.threads,
    )?;
    Ok(result)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Extract { path, lang, format } => {
            let config = load_config(cli.config.as_deref(), &path)?;
            let result = scan(&path, lang.as_deref(), &config)?;

            if path.is_file() {
                match (result.files().first(), result.errors().first()) {
                    (Some(file), _) => println!("{}", output::format_file(file, format.into())),
                    (None, Some(error)) => bail!("{}: {}", error.path.display(), error.message),
                    (None, None) => bail!("nothing scanned at {}", path.display()),
                }
            } else {
                println!("{}", output::format_project(&result, format.into()));
            }

            Ok(if result.errors().is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }

        Commands::Check {
            path,
            fail_on,
            format,
        } => {
            let config = load_config(cli.config.as_deref(), &path)?;
            let fail_on = if fail_on.is_empty() {
                config.check.fail_on.clone()
            } else {
                fail_on
            };
            let result = scan(&path, None, &config)?;

            println!("{}", output::format_check(&result, &fail_on, format.into()));

            Ok(if !result.errors().is_empty() {
                ExitCode::from(2)
            } else if result.has_diagnostics_in(&fail_on) {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Query {
            path,
            key,
            tag,
            agent,
            format,
        } => {
            let config = load_config(cli.config.as_deref(), &path)?;
            let result = scan(&path, None, &config)?;

            let matches: Vec<&Annotation> = result
                .annotations()
                .filter(|a| key.as_deref().map_or(true, |k| a.key == k))
                .filter(|a| tag.as_deref().map_or(true, |t| a.has_tag(t)))
                .filter(|a| agent.as_deref().map_or(true, |g| a.targets_agent(g)))
                .collect();

            println!("{}", output::format_annotations(&matches, format.into()));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Profiles { format } => {
            let registry = load_config(cli.config.as_deref(), Path::new("."))?.registry();
            println!("{}", output::format_profiles(&registry, format.into()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(2);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
