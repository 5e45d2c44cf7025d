use crossbeam::scope;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::*;
use err_derive::Error;
use validator::Validate;

mod analyzer;
mod appctl;
mod classy;
mod config;
mod console;
mod present;
mod senti;

use self::analyzer::start_analyzer;
use self::appctl::AppCtl;
use self::classy::{ClassifyError, Classy};
use self::config::{snap_threshold, Config};
use self::console::run_console;
use self::senti::{Score, Senti};

#[derive(Debug, Error)]
pub enum Error {
    #[error(display = "Enter some text!")]
    EmptyText,
    #[error(display = "Analyzer stopped listening")]
    AnalyzerGone,
    #[error(display = "A worker thread panicked")]
    ThreadPanicked,
    #[error(display = "Could not analyse text")]
    Classify(#[error(source)] ClassifyError),
    #[error(display = "Config file invalid")]
    ValidationError(#[error(source)] validator::ValidationErrors),
    #[error(display = "Config syntax invalid")]
    ConfigError(#[error(source)] toml::de::Error),
    #[error(display = "Cannot read file")]
    IoError(#[error(source)] std::io::Error),
    #[error(display = "Cannot listen for Ctrl-C")]
    SignalError(#[error(source)] ctrlc::Error),
    #[error(display = "Token pattern invalid")]
    RegexError(#[error(source)] regex::Error),
}

const APP_NAME: &str = "Moody";
const DEFAULT_CONFIG: &str = "moody.toml";

pub const RX_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tells you how your text feels")]
struct Opt {
    /// Config file [default: moody.toml when present]
    #[clap(short, long)]
    config: Option<String>,

    /// Lowest polarity that still counts as Positive
    #[clap(short, long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// Log at debug level
    #[clap(short, long)]
    debug: bool,

    /// Analyse this text once and exit instead of starting the console
    #[clap(value_name = "TEXT")]
    text: Vec<String>,
}

fn main() -> Result<(), Error> {
    let opt = Opt::parse();

    let mut config = load_config(opt.config.as_deref())?;
    if let Some(threshold) = opt.threshold {
        config.threshold = snap_threshold(threshold);
        config.validate()?;
    }
    config.debug |= opt.debug;

    if config.debug {
        std::env::set_var("RUST_LOG", "moody=debug");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "moody=info");
    }
    pretty_env_logger::init();

    let senti = match &config.lexicon {
        Some(lexicon) => Senti::new_from_path(lexicon)?,
        None => Senti::new()?,
    };
    let classy = Classy::new(senti);

    if !opt.text.is_empty() {
        return analyse_once(&classy, &opt.text.join(" "), &config);
    }

    info!("Waking {}", APP_NAME);
    let appctl = Arc::new(AppCtl::new());

    debug!("Setting up stop signals");
    let appctl_signal = appctl.clone();
    let mut signal_count = 0;
    ctrlc::set_handler(move || {
        if signal_count > 0 {
            std::process::exit(1);
        } else {
            warn!("Stopping, press enter to finish or Ctrl-C again to quit now");
            appctl_signal.stop();
            signal_count += 1;
        }
    })?;

    scope(|s| {
        s.spawn(|_| {
            start_analyzer(&appctl, &classy);
        });

        s.spawn(|_| {
            let stdin = io::stdin();
            let stdout = io::stdout();
            if let Err(e) = run_console(&appctl, &config, stdin.lock(), stdout.lock()) {
                error!("Console failed: {:?}", e);
                appctl.stop();
            }
        });
    })
    .map_err(|_| Error::ThreadPanicked)?;

    info!("{} is asleep", APP_NAME);
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<Config, Error> {
    match path {
        Some(path) => Config::from_path(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_path(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn analyse_once<S: Score>(classy: &Classy<S>, text: &str, config: &Config) -> Result<(), Error> {
    if text.trim().is_empty() {
        warn!("Enter some text!");
        return Err(Error::EmptyText);
    }
    let assessment = classy.classify_guarded(text.as_bytes(), config.threshold)?;
    println!("{}", present::render(&assessment, config.color));
    Ok(())
}
