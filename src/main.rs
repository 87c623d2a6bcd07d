use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uv_report::location::{choose, specify_location, Location, LocationResolver, OpenWeatherGeocoder};
use uv_report::quota::{Consumption, QuotaCache};
use uv_report::settings::{AppPaths, RequestLimit, Settings, SettingsStore};
use uv_report::uv::UvClient;
use uv_report::{Error, Result};

/// Overall timeout for each API call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// UV exposure report for any city.
///
/// Looks the place up with the OpenWeather Geocoding API and fetches the
/// current UV index, ozone, sun times and safe exposure times from OpenUV.
/// API keys and the daily OpenUV request limit live in settings/uv.json
/// below the application root.
///
/// Examples:
///   uv -l London
///   uv -l "London, GB" --set-default
///   uv -m "Sendai, JP, 38.252, 140.856"
///   uv
#[derive(Parser)]
#[command(name = "uv", version, about, long_about = None)]
struct Cli {
    /// Search by name: a city ("London") or city and country ("London, GB").
    #[arg(short, long, conflicts_with = "manual")]
    location: Option<String>,

    /// Manual location: "City, Country, lat, lon" (S and W negative).
    #[arg(short, long, allow_hyphen_values = true)]
    manual: Option<String>,

    /// Save the resolved location as the default.
    #[arg(short = 'd', long, conflicts_with = "clear_default")]
    set_default: bool,

    /// Forget the default location.
    #[arg(long)]
    clear_default: bool,

    /// Reset the request counter to the configured limit.
    #[arg(long)]
    reset_cache: bool,

    /// Application root holding settings/ and cache/.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides).
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn names_location(&self) -> bool {
        self.location.is_some() || self.manual.is_some()
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "uv_report=debug,uv=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let paths = cli.root.clone().map(AppPaths::new).unwrap_or_else(AppPaths::discover);
    debug!(root = %paths.root().display(), "application root");

    // ── Settings ────────────────────────────────────────────────

    let store = SettingsStore::new(paths.settings_file());
    let Some(mut settings) = store.load()? else {
        println!("Settings file has been generated: {}", store.path().display());
        println!("Fill in the API keys and run again.");
        return Ok(());
    };

    if cli.clear_default {
        settings.default_location = None;
        store.save(&settings)?;
        eprintln!("Default location cleared.");
    }

    let limit = settings.request_limit();

    if cli.reset_cache {
        match limit {
            RequestLimit::Daily(n) => {
                QuotaCache::open(paths.cache_file()).reset(n)?;
                eprintln!("Request counter reset to {}.", n);
            }
            RequestLimit::Disabled => eprintln!("Request cache is disabled, nothing to reset."),
            RequestLimit::Invalid => return Err(Error::BadRequestLimit),
        }
    }

    if (cli.clear_default || cli.reset_cache) && !cli.names_location() {
        return Ok(());
    }

    settings.validate()?;
    if limit == RequestLimit::Invalid {
        return Err(Error::BadRequestLimit);
    }

    // ── Resolve location ────────────────────────────────────────

    let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
    let location = resolve_location(cli, &settings, &agent)?;

    if cli.set_default {
        settings.default_location = Some(location.clone());
        store.save(&settings)?;
        eprintln!("Default location set to {}.", location.name(true));
    }

    // ── Quota ───────────────────────────────────────────────────

    match limit {
        RequestLimit::Daily(n) => match QuotaCache::open(paths.cache_file()).consume(n)? {
            Consumption::Granted { remaining } => debug!(remaining, "OpenUV requests left today"),
            Consumption::Exhausted => {
                eprintln!("Daily limit of {} OpenUV requests reached, it resets at midnight UTC.", n);
                return Ok(());
            }
        },
        RequestLimit::Disabled => debug!("request cache disabled"),
        RequestLimit::Invalid => return Err(Error::BadRequestLimit),
    }

    // ── Report ──────────────────────────────────────────────────

    let report = UvClient::new(agent, settings.open_uv_key.as_str()).report(&location)?;

    println!("{}", location);
    println!();
    print!("{}", report);
    Ok(())
}

fn resolve_location(cli: &Cli, settings: &Settings, agent: &ureq::Agent) -> Result<Location> {
    // Priority: --manual > --location > default location > error

    if let Some(ref spec) = cli.manual {
        return Ok(specify_location(spec)?);
    }

    if let Some(ref query) = cli.location {
        let geocoder = OpenWeatherGeocoder::new(agent.clone(), settings.open_weather_key.as_str());
        let matches = LocationResolver::new(geocoder).find(query)?;
        return Ok(choose(matches, io::stdin().lock(), io::stderr())?);
    }

    settings.default_location.clone().ok_or(Error::NoLocation)
}
