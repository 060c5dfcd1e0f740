// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use docxlate::app_config::{self, Config, TranslationProvider};
use docxlate::file_utils::FileManager;
use docxlate::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Gemini,
    OpenAI,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate documents (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for docxlate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Document or directory to translate (defaults to the configured input directory)
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Language to translate into; must be one side of the configured pair
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Directory receiving translated documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Only check that the provider answers
    #[arg(long)]
    test_connection: bool,
}

/// docxlate - office document translation with AI
///
/// Extracts the text of spreadsheets, Word documents, PDFs and CSV files,
/// translates it in batches through an OpenAI-compatible API and writes it
/// back into a copy of the original document.
#[derive(Parser, Debug)]
#[command(name = "docxlate")]
#[command(version)]
#[command(about = "AI-powered office document translation tool")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "docxlate translates xlsx, docx, pdf and csv documents between the two languages of the configured pair.

EXAMPLES:
    docxlate report.xlsx                        # Translate into the configured target language
    docxlate -t vi report.xlsx                  # Translate back into the source language
    docxlate -p openai -m gpt-4o-mini memo.docx # Use a specific provider and model
    docxlate --log-level debug input/           # Process an entire directory with debug logging
    docxlate completions bash > docxlate.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The system prompt file is created the same way.

SUPPORTED PROVIDERS:
    gemini    - Google Gemini (default, API key from GEMINI_API_KEY)
    openai    - OpenAI API (API key from OPENAI_API_KEY)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "docxlate", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the config file and apply command line overrides
fn load_config(options: &TranslateArgs) -> Result<Config> {
    let (mut config, _) = Config::load_or_create(&options.config_path)?;

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(output_dir) = &options.output_dir {
        config.paths.output_dir = output_dir.clone();
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&options)?;
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let target_language = options
        .target_language
        .clone()
        .unwrap_or_else(|| config.target_language.clone());
    let input_path = options
        .input_path
        .clone()
        .unwrap_or_else(|| config.paths.input_dir.clone());

    let controller = Controller::with_config(config)?.with_progress(true);

    if options.test_connection {
        controller.test_connection().await?;
        info!("Provider connection OK");
        return Ok(());
    }

    if input_path.is_file() {
        translate_single(&controller, &input_path, &target_language).await
    } else if input_path.is_dir() {
        let outcomes = controller.run_folder(&input_path, &target_language).await?;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(output) => println!("{}\t{}", outcome.input.display(), output.display()),
                Err(e) => error!("{}: {}", outcome.input.display(), e),
            }
        }
        if outcomes.iter().any(|o| o.result.is_err()) {
            return Err(anyhow!("Some documents could not be translated"));
        }
        Ok(())
    } else {
        Err(anyhow!("Input path does not exist: {:?}", input_path))
    }
}

async fn translate_single(controller: &Controller, input_path: &Path, target_language: &str) -> Result<()> {
    let output = controller
        .try_translate_document(input_path, target_language)
        .await
        .with_context(|| format!("Failed to translate {:?}", input_path))?;

    println!("{}\t{}", output.display(), FileManager::mime_type_for(&output));
    Ok(())
}
