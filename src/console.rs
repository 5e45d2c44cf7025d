use crate::appctl::{AppCtl, Request, Response};
use crate::classy::{Assessment, ClassifyError};
use crate::config::{snap_threshold, threshold_in_range, Config};
use crate::present;
use crate::{Error, RX_TIMEOUT};

use std::io::{BufRead, Write};
use std::sync::mpsc::RecvTimeoutError;

use bus::BusReader;
use rand::seq::SliceRandom;
use scopeguard::defer_on_unwind;

use log::*;

const HELP: &str = "\
Type any text to analyse it.
  /threshold [value]  show or set the polarity threshold for Positive (-1.0 to 1.0)
  /examples           analyse every example text
  /example            analyse a random example text
  /help               show this help
  /stop               quit";

#[derive(Debug, PartialEq)]
pub enum Command {
    Analyze(Vec<u8>),
    Blank,
    ShowThreshold,
    SetThreshold(f64),
    BadThreshold(String),
    Examples,
    Example,
    Help,
    Stop,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &[u8]) -> Self {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Command::Blank;
        }
        if !trimmed.starts_with('/') {
            return Command::Analyze(line.to_vec());
        }

        let mut words = trimmed.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        match (command, args.as_slice()) {
            ("/threshold", []) => Command::ShowThreshold,
            ("/threshold", [value]) => match value.parse::<f64>().map(snap_threshold) {
                Ok(threshold) if threshold_in_range(threshold) => Command::SetThreshold(threshold),
                _ => Command::BadThreshold(value.to_string()),
            },
            ("/threshold", _) => Command::BadThreshold(args.join(" ")),
            ("/examples", _) => Command::Examples,
            ("/example", _) => Command::Example,
            ("/help", _) => Command::Help,
            ("/stop", _) => Command::Stop,
            (n, _) => Command::Unknown(n.to_string()),
        }
    }
}

/// Reads lines from `input` until end of input or `/stop`, then stops the app.
pub fn run_console<R: BufRead, W: Write>(
    appctl: &AppCtl,
    config: &Config,
    mut input: R,
    mut output: W,
) -> Result<(), Error> {
    defer_on_unwind! { appctl.stop(); }
    let mut get_response = appctl.listen_responses();
    while !appctl.is_ready() && appctl.is_alive() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    debug!("Console: Starting");
    writeln!(output, "Type some text to analyse, /help for commands.")?;

    let mut threshold = config.threshold;
    let mut line = vec![];
    while appctl.is_alive() {
        write!(output, "You: ")?;
        output.flush()?;
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        while line.last().map_or(false, |b| *b == b'\n' || *b == b'\r') {
            line.pop();
        }
        if !appctl.is_alive() {
            break;
        }

        match Command::parse(&line) {
            Command::Analyze(text) => {
                if let Some(response) = ask(appctl, &mut get_response, vec![text], threshold)? {
                    for outcome in &response.outcomes {
                        writeln!(output, "{}", describe(outcome, config.color))?;
                    }
                }
            }
            Command::Blank => writeln!(output, "Enter some text!")?,
            Command::ShowThreshold => writeln!(output, "Threshold is {:.2}", threshold)?,
            Command::SetThreshold(value) => {
                threshold = value;
                debug!("Console: Threshold {:.2}", threshold);
                writeln!(output, "Threshold set to {:.2}", threshold)?;
            }
            Command::BadThreshold(value) => writeln!(
                output,
                "Threshold must be a number between -1.0 and 1.0, not {}",
                value
            )?,
            Command::Examples => {
                let inputs = config.examples.iter().map(|i| i.as_bytes().to_vec()).collect();
                if let Some(response) = ask(appctl, &mut get_response, inputs, threshold)? {
                    for (example, outcome) in config.examples.iter().zip(&response.outcomes) {
                        writeln!(output, "{} -> {}", example, describe(outcome, config.color))?;
                    }
                }
            }
            Command::Example => {
                if let Some(example) = config.examples.choose(&mut rand::thread_rng()) {
                    let inputs = vec![example.as_bytes().to_vec()];
                    if let Some(response) = ask(appctl, &mut get_response, inputs, threshold)? {
                        for outcome in &response.outcomes {
                            writeln!(output, "{} -> {}", example, describe(outcome, config.color))?;
                        }
                    }
                }
            }
            Command::Help => writeln!(output, "{}", HELP)?,
            Command::Stop => break,
            Command::Unknown(command) => {
                debug!("Console: Unknown command {}", command);
                writeln!(output, "Unknown command {}, try /help", command)?;
            }
        }
    }

    debug!("Console: Shutting down");
    appctl.stop();
    Ok(())
}

/// Sends a request and waits for its response. `None` when the app stops first.
fn ask(
    appctl: &AppCtl,
    get_response: &mut BusReader<Response>,
    inputs: Vec<Vec<u8>>,
    threshold: f64,
) -> Result<Option<Response>, Error> {
    let request = Request::new(inputs, threshold);
    let id = request.id;
    appctl.send_request(request)?;
    while appctl.is_alive() {
        match get_response.recv_timeout(RX_TIMEOUT) {
            Ok(response) if response.id == id => return Ok(Some(response)),
            Ok(response) => trace!("Console: Skipping response {}", response.id),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Err(Error::AnalyzerGone),
        }
    }
    Ok(None)
}

fn describe(outcome: &Result<Assessment, ClassifyError>, color: bool) -> String {
    match outcome {
        Ok(assessment) => present::render(assessment, color),
        Err(e) => format!("Could not analyse: {}", e),
    }
}
