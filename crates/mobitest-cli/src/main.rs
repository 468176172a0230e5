//! Command-line companion for mobitest locator catalogs and test data.
//!
//! Resolves and lints the per-page locator catalogs a test suite is written
//! against, looks up test data, and runs the content extractors on ad-hoc
//! text, all without a device.
//!
//! # Usage
//!
//! ```bash
//! # Resolve a locator from locators/LoginPage.yaml for the configured platform
//! mobitest resolve LoginPage loginButton
//!
//! # Resolve for iOS, filling {0} in the selector
//! mobitest resolve LoginPage pinField --platform ios --arg 1
//!
//! # Resolve from an explicit file
//! mobitest resolve path/to/WatchlistPage.yaml stockRow -a RELIANCE -a NSE
//!
//! # Validate every catalog in the locator directory
//! mobitest lint
//!
//! # Validate specific files
//! mobitest lint locators/LoginPage.yaml locators/HomePage.yaml
//!
//! # Look up test data
//! mobitest data LoginData userData pin
//!
//! # Extract a price
//! mobitest price "LTP ₹1,234.50 (+0.4%)"
//!
//! # Show effective settings as JSON
//! mobitest -c config.properties --format json settings
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mobitest_core::config::{ConfigError, Settings};
use mobitest_core::content::{extract_price, line_at, split_lines};
use mobitest_core::locator::{LocatorCatalog, LocatorError, Platform};
use mobitest_core::test_data::{TestData, TestDataError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command-line companion for mobitest locator catalogs and test data.
#[derive(Parser)]
#[command(name = "mobitest")]
#[command(about = "Resolve, lint and inspect mobitest locator catalogs and test data")]
#[command(version)]
struct Cli {
    /// Settings file (.json or .properties)
    #[arg(short, long, env = "MOBITEST_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a symbolic locator name
    Resolve {
        /// Page name (looked up in the locator directory) or path to a .yaml catalog
        page: String,
        /// Symbolic locator name
        name: String,
        /// Target platform (defaults to the configured platform)
        #[arg(short, long)]
        platform: Option<Platform>,
        /// Positional substitution for {0}, {1}, ... (repeatable)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,
    },

    /// Validate locator catalogs
    Lint {
        /// Catalog files (defaults to every .yaml in the locator directory)
        files: Vec<PathBuf>,
    },

    /// Look up test data
    Data {
        /// Page name (looked up in the test data directory) or path to a .json file
        page: String,
        /// Data group
        group: String,
        /// Field in the group (prints the whole group when omitted)
        field: Option<String>,
    },

    /// Extract the first price from text
    Price {
        /// Text to scan
        text: String,
        /// Only scan this line of the text (0-based)
        #[arg(short, long)]
        line: Option<usize>,
    },

    /// Print the effective settings
    Settings,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    /// The lookup ran but found nothing.
    NotFound(String),
    /// A settings, catalog or data file could not be read.
    Config(String),
    /// A catalog or data file is malformed.
    Invalid(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::NotFound(_) => ExitCode::from(1),
            CliError::Config(_) => ExitCode::from(2),
            CliError::Invalid(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NotFound(msg) => write!(f, "Not found: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Invalid(msg) => write!(f, "Invalid: {}", msg),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LocatorError> for CliError {
    fn from(e: LocatorError) -> Self {
        match e {
            LocatorError::NotFound { .. } | LocatorError::PlatformMissing { .. } => {
                CliError::NotFound(e.to_string())
            }
            LocatorError::Io { .. } => CliError::Config(e.to_string()),
            LocatorError::Configuration(_) | LocatorError::Yaml { .. } => {
                CliError::Invalid(e.to_string())
            }
        }
    }
}

impl From<TestDataError> for CliError {
    fn from(e: TestDataError) -> Self {
        match e {
            TestDataError::GroupNotFound(_) | TestDataError::FieldNotFound { .. } => {
                CliError::NotFound(e.to_string())
            }
            TestDataError::Io { .. } => CliError::Config(e.to_string()),
            TestDataError::Parse { .. } => CliError::Invalid(e.to_string()),
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => {
            let mut settings = Settings::default();
            settings.apply_env(std::env::vars())?;
            settings
        }
    };
    debug!(?settings, "settings loaded");
    Ok(settings)
}

/// Treats `page` as a file path when it has the given extension or exists.
fn as_file(page: &str, extensions: &[&str]) -> Option<PathBuf> {
    let path = Path::new(page);
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e));
    (has_extension || path.is_file()).then(|| path.to_path_buf())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn status_line(cli: &Cli, command: &str, target: &str, detail: &str) {
    if !cli.quiet {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ");
        eprintln!("|{}|{}|{}|{}|", now, command, target, detail);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli)?;

    match &cli.command {
        Command::Resolve { page, name, platform, args } => {
            let catalog = match as_file(page, &["yaml", "yml"]) {
                Some(path) => LocatorCatalog::load(path, settings.platform)?,
                None => LocatorCatalog::for_page(&settings, page)?,
            };
            let platform = platform.unwrap_or(settings.platform);
            let locator = catalog.resolve_with(name, platform, args.as_slice())?;
            if cli.format == OutputFormat::Json {
                let output = serde_json::json!({
                    "page": catalog.page(),
                    "name": name,
                    "platform": platform,
                    "locator": locator,
                });
                print_json(&output);
            } else {
                println!("{}", locator);
            }
            Ok(())
        }

        Command::Lint { files } => lint(cli, &settings, files),

        Command::Data { page, group, field } => {
            let data = match as_file(page, &["json"]) {
                Some(path) => TestData::load(path)?,
                None => TestData::for_page(&settings, page)?,
            };
            match field {
                Some(field) => {
                    let value = data.field(group, field)?;
                    if cli.format == OutputFormat::Json {
                        print_json(&serde_json::json!({ field: value }));
                    } else {
                        println!("{}", value);
                    }
                }
                None => {
                    let values = data.group(group)?;
                    if cli.format == OutputFormat::Json {
                        print_json(&serde_json::json!(values));
                    } else {
                        for (key, value) in values {
                            println!("{}={}", key, value);
                        }
                    }
                }
            }
            Ok(())
        }

        Command::Price { text, line } => {
            let scanned = match line {
                Some(index) => line_at(text, *index).ok_or_else(|| {
                    CliError::NotFound(format!(
                        "line {} (text has {} lines)",
                        index,
                        split_lines(text).len()
                    ))
                })?,
                None => text.as_str(),
            };
            let price = extract_price(scanned)
                .ok_or_else(|| CliError::NotFound(format!("no price in {:?}", scanned)))?;
            if cli.format == OutputFormat::Json {
                print_json(&serde_json::json!({ "price": price }));
            } else {
                println!("{}", price);
            }
            Ok(())
        }

        Command::Settings => {
            if cli.format == OutputFormat::Json {
                print_json(&serde_json::json!(settings));
            } else {
                for key in ["platform", "locatorDirectory", "testDataDirectory", "idleTimeout"] {
                    println!("{}={}", key, settings.get(key).unwrap_or_default());
                }
                for (key, value) in &settings.extra {
                    println!("{}={}", key, value);
                }
            }
            Ok(())
        }
    }
}

fn lint(cli: &Cli, settings: &Settings, files: &[PathBuf]) -> Result<(), CliError> {
    let files = if files.is_empty() {
        discover_catalogs(&settings.locator_directory)
    } else {
        files.to_vec()
    };
    if files.is_empty() {
        return Err(CliError::NotFound(format!(
            "no catalogs in {}",
            settings.locator_directory.display()
        )));
    }

    let mut failures = Vec::new();
    let mut report = Vec::new();
    for path in &files {
        match LocatorCatalog::load(path, settings.platform) {
            Ok(catalog) => {
                status_line(cli, "lint", catalog.page(), &format!("{} locators", catalog.len()));
                if cli.format == OutputFormat::Text {
                    println!("ok {} ({} locators)", path.display(), catalog.len());
                }
                report.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "ok": true,
                    "locators": catalog.len(),
                }));
            }
            Err(e) => {
                if cli.format == OutputFormat::Text {
                    println!("FAIL {}: {}", path.display(), e);
                }
                report.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "ok": false,
                    "error": e.to_string(),
                }));
                failures.push(e);
            }
        }
    }
    if cli.format == OutputFormat::Json {
        print_json(&serde_json::json!(report));
    }

    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0).into()),
        n => Err(CliError::Invalid(format!("{} of {} catalogs failed", n, files.len()))),
    }
}

fn discover_catalogs(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = ["yaml", "yml"]
        .iter()
        .flat_map(|ext| {
            let pattern = dir.join(format!("*.{}", ext));
            glob::glob(pattern.to_str().unwrap_or_default())
                .into_iter()
                .flatten()
                .filter_map(Result::ok)
        })
        .collect();
    found.sort();
    found
}
