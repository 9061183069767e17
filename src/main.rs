//! datadelivery - retrieves archived spectra and light curves and prints them as one
//! JSON document on stdout.
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `datadelivery=warn`).

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use datadelivery::config::DeliveryConfig;
use datadelivery::delivery::Delivery;
use datadelivery::mission::Mission;
use datadelivery::request::Batch;

#[derive(Parser, Debug)]
#[command(
    name = "datadelivery",
    version,
    about = "Retrieves data from the archive and delivers the contents (spectra or light curves) as a JSON."
)]
struct Cli {
    /// The mission(s) the data comes from, one per obsid.
    #[arg(short = 'm', long = "missions", value_enum, ignore_case = true, num_args = 1.., required = true)]
    missions: Vec<Mission>,

    /// The observation ID(s) to retrieve, one per mission.
    #[arg(short = 'o', long = "obsids", num_args = 1.., required = true)]
    obsids: Vec<String>,

    /// Filter/grating of each request, for missions that need one (IUE, GALEX).
    #[arg(short = 'f', long = "filters", num_args = 1..)]
    filters: Option<Vec<String>>,

    /// Preview URL of each request, used by GALEX.
    #[arg(short = 'u', long = "urls", num_args = 1..)]
    urls: Option<Vec<String>>,

    /// Target name of each request, used by HSLA.
    #[arg(short = 't', long = "target", num_args = 1..)]
    targets: Option<Vec<String>>,

    /// Location of the precomputed Kepler cache files.
    #[arg(short = 'c', long = "cdir")]
    cache_dir: Option<Utf8PathBuf>,

    /// Root data directory the other roots default under.
    #[arg(short = 'd', long = "ddir", env = "DATADELIVERY_DATA_DIR")]
    data_dir: Option<Utf8PathBuf>,

    /// Mission archive root.
    #[arg(short = 'x', long = "mdir")]
    missions_dir: Option<Utf8PathBuf>,

    /// High-level science product root.
    #[arg(short = 'y', long = "hdir")]
    hlsps_dir: Option<Utf8PathBuf>,

    /// STATES spectra root.
    #[arg(short = 's', long = "sdir")]
    states_dir: Option<Utf8PathBuf>,

    /// TOML configuration file; command-line flags take precedence.
    #[arg(long = "config", env = "DATADELIVERY_CONFIG")]
    config: Option<Utf8PathBuf>,
}

impl Cli {
    fn delivery_config(&self) -> Result<DeliveryConfig> {
        let mut config = match &self.config {
            Some(path) => DeliveryConfig::from_toml_file(path)
                .with_context(|| format!("loading configuration from {path}"))?,
            None => DeliveryConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.missions_dir {
            config.missions_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.hlsps_dir {
            config.hlsps_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.states_dir {
            config.states_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("datadelivery=warn"))?)
        .init();

    let cli = Cli::parse();
    let config = cli.delivery_config()?;

    let batch = Batch::new(
        cli.missions,
        cli.obsids,
        cli.filters,
        cli.urls,
        cli.targets,
    )?;

    let delivery = Delivery::new(config)?;
    let json = delivery.deliver(&batch).await?;
    println!("{json}");
    Ok(())
}
