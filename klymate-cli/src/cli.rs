use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, InquireError, Text, validator::Validation};
use klymate_core::{Config, Coordinates, Dashboard};
use std::io::{self, Write};
use tracing::debug;

use crate::render::{self, RenderOptions};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "klymate", version, about = "Kly-mate weather and air-quality dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the backend URL, timeout and default location.
    Configure,

    /// Fetch current conditions, AQI and the next-day prediction once.
    Show {
        /// Latitude; defaults to the configured location.
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude; defaults to the configured location.
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,

        #[command(flatten)]
        backend: BackendArgs,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Prompt for coordinates and refresh the dashboard until you stop.
    Interactive {
        #[command(flatten)]
        backend: BackendArgs,

        #[command(flatten)]
        display: DisplayArgs,
    },
}

/// Per-invocation overrides of the stored configuration.
#[derive(Debug, Args)]
pub struct BackendArgs {
    /// Backend base URL, e.g. http://localhost:8000.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Seconds to wait for each response.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl BackendArgs {
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(url) = &self.base_url {
            config.set_base_url(url)?;
        }
        if let Some(secs) = self.timeout {
            config.set_timeout_secs(secs)?;
        }
        debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "effective backend");
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct DisplayArgs {
    /// Hide the detail panels.
    #[arg(long)]
    pub compact: bool,
}

impl DisplayArgs {
    fn options(&self) -> RenderOptions {
        RenderOptions { compact: self.compact }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, backend, display } => {
                let mut config = Config::load()?;
                backend.apply(&mut config)?;

                let defaults = config.default_coordinates();
                let coords = Coordinates::new(
                    lat.unwrap_or(defaults.latitude),
                    lon.unwrap_or(defaults.longitude),
                );

                let dashboard = Dashboard::from_config(&config)?;
                let mut out = io::stdout().lock();
                render::write_header(&mut out)?;
                run_once(&dashboard, coords, display.options(), &mut out).await?;
                render::write_footer(&mut out)?;
                Ok(())
            }
            Command::Interactive { backend, display } => {
                let mut config = Config::load()?;
                backend.apply(&mut config)?;
                interactive(&config, display.options()).await
            }
        }
    }
}

async fn run_once<W: Write>(
    dashboard: &Dashboard,
    coords: Coordinates,
    opts: RenderOptions,
    out: &mut W,
) -> anyhow::Result<()> {
    eprintln!(
        "Contacting Kly-mate API at {}... Please wait (this might take 30s+ if the backend was idle).",
        dashboard.client().base_url()
    );

    let outcome = dashboard.run_cycle(coords).await;

    render::write_outcome(out, &outcome, opts).context("Failed to write dashboard output")?;
    out.flush()?;
    Ok(())
}

async fn interactive(config: &Config, opts: RenderOptions) -> anyhow::Result<()> {
    let dashboard = Dashboard::from_config(config)?;
    let mut coords = config.default_coordinates();

    let mut out = io::stdout().lock();
    render::write_header(&mut out)?;
    out.flush()?;

    loop {
        coords = match prompt_coordinates(coords) {
            Ok(c) => c,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        run_once(&dashboard, coords, opts, &mut out).await?;

        let again = Confirm::new("Fetch again?").with_default(true).prompt();
        match again {
            Ok(true) => continue,
            Ok(false) | Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    render::write_footer(&mut out)?;
    Ok(())
}

fn prompt_coordinates(last: Coordinates) -> Result<Coordinates, InquireError> {
    let latitude = CustomType::<f64>::new("Enter Latitude:")
        .with_default(last.latitude)
        .with_help_message("Example: 12.9716 for Bengaluru")
        .with_error_message("Please type a number")
        .prompt()?;

    let longitude = CustomType::<f64>::new("Enter Longitude:")
        .with_default(last.longitude)
        .with_help_message("Example: 77.5946 for Bengaluru")
        .with_error_message("Please type a number")
        .prompt()?;

    Ok(Coordinates::new(latitude, longitude))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let base_url = Text::new("Backend base URL:")
        .with_default(&config.base_url)
        .with_validator(|input: &str| {
            Ok(match Config::default().set_base_url(input) {
                Ok(()) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()?;
    config.set_base_url(&base_url)?;

    let timeout = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.timeout_secs)
        .with_validator(|secs: &u64| {
            Ok(if *secs > 0 {
                Validation::Valid
            } else {
                Validation::Invalid("Timeout must be at least one second".into())
            })
        })
        .prompt()?;
    config.set_timeout_secs(timeout)?;

    let coords = prompt_coordinates(config.default_coordinates())?;
    config.set_default_coordinates(coords);

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["klymate", "show", "--lat", "-33.8688", "--lon", "151.2093"])
            .expect("must parse");

        match cli.command {
            Command::Show { lat, lon, display, .. } => {
                assert_eq!(lat, Some(-33.8688));
                assert_eq!(lon, Some(151.2093));
                assert!(!display.compact);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn backend_overrides_are_applied_and_validated() {
        let cli = Cli::try_parse_from([
            "klymate",
            "interactive",
            "--base-url",
            "http://localhost:8000",
            "--timeout",
            "30",
        ])
        .expect("must parse");

        let Command::Interactive { backend, .. } = cli.command else {
            panic!("expected interactive");
        };

        let mut config = Config::default();
        backend.apply(&mut config).expect("valid overrides");
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);

        let bad = BackendArgs { base_url: Some("localhost".into()), timeout: None };
        assert!(bad.apply(&mut Config::default()).is_err());
    }

    #[test]
    fn show_without_coordinates_uses_none() {
        let cli = Cli::try_parse_from(["klymate", "show", "--compact"]).expect("must parse");
        let Command::Show { lat, lon, display, .. } = cli.command else {
            panic!("expected show");
        };
        assert_eq!((lat, lon), (None, None));
        assert!(display.compact);
    }
}
