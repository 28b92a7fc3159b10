//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use twcal_core::{ProgressReporter, UpdateConfig, UpdateResult};
use twcal_fetch::{FetchOptions, HttpFetcher};
use twcal_normalize::{FixedDecoder, SniffingDecoder, TextDecoder};
use twcal_shared::{AppConfig, CalendarSource, OutputProfile, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// twcal: Taiwan government office calendars as JSON.
#[derive(Parser)]
#[command(
    name = "twcal",
    version,
    about = "Turn the published Taiwan government office calendars into monthly and yearly JSON.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.twcal/twcal.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch every calendar source and rewrite the JSON output.
    Update {
        /// Output root directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output layout: current or legacy.
        #[arg(long)]
        profile: Option<OutputProfile>,

        /// Dataset listing page URL.
        #[arg(long)]
        dataset_url: Option<String>,

        /// Force a text encoding (e.g. big5) instead of sniffing.
        #[arg(long)]
        encoding: Option<String>,
    },

    /// Print the advertised calendar sources and which ones would be used.
    Sources {
        /// Also list Google mirrors and superseded publications.
        #[arg(long)]
        all: bool,
    },

    /// Regenerate index.json from the files already in the output root.
    Index {
        /// Output root directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output layout: current or legacy.
        #[arg(long)]
        profile: Option<OutputProfile>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = default_filter(cli.verbose, debug_env_enabled());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

/// `DEBUG=true` behaves like a single `-v`.
fn debug_env_enabled() -> bool {
    std::env::var("DEBUG").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

fn default_filter(verbose: u8, debug_env: bool) -> &'static str {
    match verbose.max(u8::from(debug_env)) {
        0 => "twcal=info",
        1 => "twcal=debug",
        _ => "twcal=trace",
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Update {
            out,
            profile,
            dataset_url,
            encoding,
        } => {
            let config = load_app_config(config_path.as_deref())?;
            let update = resolve_update(&config, out, profile, dataset_url)?;
            cmd_update(&config, &update, encoding.as_deref()).await
        }
        Command::Sources { all } => {
            let config = load_app_config(config_path.as_deref())?;
            cmd_sources(&config, all).await
        }
        Command::Index { out, profile } => {
            let config = load_app_config(config_path.as_deref())?;
            cmd_index(&config, out, profile)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Merge config file values with command-line overrides.
fn resolve_update(
    config: &AppConfig,
    out: Option<PathBuf>,
    profile: Option<OutputProfile>,
    dataset_url: Option<String>,
) -> Result<UpdateConfig> {
    let dataset_url = dataset_url.unwrap_or_else(|| config.catalog.dataset_url.clone());
    Url::parse(&dataset_url).map_err(|e| eyre!("invalid dataset URL '{dataset_url}': {e}"))?;

    let link_base = Url::parse(&config.catalog.link_base)
        .map_err(|e| eyre!("invalid link base '{}': {e}", config.catalog.link_base))?;

    Ok(UpdateConfig {
        dataset_url,
        link_base,
        output_root: out.unwrap_or_else(|| PathBuf::from(&config.output.dir)),
        profile: profile.unwrap_or(config.output.profile),
    })
}

fn http_fetcher(config: &AppConfig) -> Result<HttpFetcher> {
    Ok(HttpFetcher::new(&FetchOptions::from(&config.catalog))?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update(config: &AppConfig, update: &UpdateConfig, encoding: Option<&str>) -> Result<()> {
    let decoder: Box<dyn TextDecoder> = match encoding {
        Some(label) => Box::new(FixedDecoder::for_label(label)?),
        None => Box::new(SniffingDecoder::default()),
    };
    let fetcher = http_fetcher(config)?;

    info!(
        dataset_url = %update.dataset_url,
        out = %update.output_root.display(),
        profile = %update.profile,
        "updating calendars"
    );

    let reporter = CliProgress::new();
    let result = twcal_core::run_update(update, &fetcher, decoder.as_ref(), &reporter).await?;

    let years: Vec<String> = result.processed_years.iter().map(i32::to_string).collect();

    println!();
    println!("  Calendars updated!");
    println!("  Years:    {}", if years.is_empty() { "-".into() } else { years.join(", ") });
    println!("  Failed:   {}", result.failures.len());
    for failure in &result.failures {
        println!("            {} ({})", failure.title, failure.error);
    }
    println!("  Index:    {} entries", result.index_entries.len());
    println!("  Output:   {}", update.output_root.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_sources(config: &AppConfig, all: bool) -> Result<()> {
    let link_base = Url::parse(&config.catalog.link_base)
        .map_err(|e| eyre!("invalid link base '{}': {e}", config.catalog.link_base))?;
    let fetcher = http_fetcher(config)?;

    let sources =
        twcal_core::fetch_catalog(&fetcher, &config.catalog.dataset_url, &link_base).await?;
    let selected = twcal_catalog::select_authoritative(&sources);

    println!();
    if all {
        for source in &sources {
            let mark = source_mark(source, &selected);
            println!("  {mark} {}  {}", source.year, source.title);
            println!("           {}", source.url);
        }
    } else {
        for source in &selected {
            println!("  {}  {}", source.year, source.title);
            println!("        {}", source.url);
        }
    }
    println!();
    println!("  {} sources, {} selected", sources.len(), selected.len());
    println!();

    Ok(())
}

/// `*` selected, `g` Google mirror, `-` superseded.
fn source_mark(source: &CalendarSource, selected: &[CalendarSource]) -> char {
    if selected.iter().any(|s| s.url == source.url) {
        '*'
    } else if source.is_google_variant {
        'g'
    } else {
        '-'
    }
}

fn cmd_index(config: &AppConfig, out: Option<PathBuf>, profile: Option<OutputProfile>) -> Result<()> {
    let root = out.unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let profile = profile.unwrap_or(config.output.profile);

    let entries = twcal_core::rebuild_index(&root, profile)?;
    println!(
        "Index written with {} entries: {}",
        entries.len(),
        root.join(twcal_publish::INDEX_FILE).display()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_started(&self, source: &CalendarSource, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {}", source.title));
    }

    fn done(&self, _result: &UpdateResult) {
        self.spinner.finish_and_clear();
    }
}
