use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crapsim_execution::DiceSource;
use crapsim_simulator::{Fault, RunMode, Simulator, SimulatorConfig, ValidatedConfig};
use crapsim_types::{Snapshot, State};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate rounds of craps")]
struct Args {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible dice (overrides the config file).
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (overrides the config file).
    #[arg(long)]
    log_level: Option<String>,

    /// Print summaries as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Play rounds one at a time on the calling thread.
    Once {
        #[arg(long, default_value_t = 1)]
        rounds: u64,
    },
    /// Play rounds back-to-back for a fixed duration.
    Fast {
        #[arg(long, default_value_t = 1_000)]
        duration_ms: u64,
    },
    /// Read control commands from stdin.
    Interactive,
}

fn build_config(args: &Args) -> Result<ValidatedConfig> {
    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    Ok(config.validate()?)
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: RunMode,
    wins: u64,
    losses: u64,
    rounds: u64,
    win_percentage: f64,
    rolls: Vec<u16>,
    state: State,
}

impl Summary {
    fn new(snapshot: &Snapshot, mode: RunMode) -> Self {
        Self {
            mode,
            wins: snapshot.wins(),
            losses: snapshot.losses(),
            rounds: snapshot.rounds(),
            win_percentage: snapshot.win_percentage(),
            rolls: snapshot.rolls().iter().map(|roll| roll.value()).collect(),
            state: snapshot.state(),
        }
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string(self)?);
        } else {
            println!("{self}");
        }
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wins={} losses={} rounds={} win%={:.2} rolls={:?} state={} mode={}",
            self.wins,
            self.losses,
            self.rounds,
            self.win_percentage,
            self.rolls,
            self.state,
            self.mode
        )
    }
}

/// Commands accepted in interactive mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Once,
    Fast,
    Stop,
    Reset,
    Status,
    Quit,
}

impl FromStr for Control {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "fast" => Ok(Self::Fast),
            "stop" => Ok(Self::Stop),
            "reset" => Ok(Self::Reset),
            "status" => Ok(Self::Status),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!(
                "unknown command {other:?} (expected once, fast, stop, reset, status or quit)"
            )),
        }
    }
}

fn play_rounds<S: DiceSource + Send + 'static>(
    simulator: &Simulator<S>,
    rounds: u64,
) -> Result<()> {
    for round in 1..=rounds {
        simulator
            .run_once()
            .with_context(|| format!("round {round} of {rounds} failed"))?;
    }
    Ok(())
}

async fn play_for<S: DiceSource + Send + 'static>(
    simulator: &Simulator<S>,
    duration: Duration,
) -> Result<()> {
    let mut faults = simulator.faults();
    simulator.run_fast()?;
    tokio::time::sleep(duration).await;
    simulator.stop();
    simulator.stopped().await;
    match faults.try_recv() {
        Ok(fault) => Err(anyhow::anyhow!(fault)),
        Err(_) => Ok(()),
    }
}

/// Log every snapshot and fault until the simulator is dropped.
async fn observe(
    mut snapshots: watch::Receiver<Snapshot>,
    mut faults: broadcast::Receiver<Fault>,
) {
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                info!(
                    wins = snapshot.wins(),
                    losses = snapshot.losses(),
                    rounds = snapshot.rounds(),
                    rolls = snapshot.rolls().len(),
                    state = %snapshot.state(),
                    "snapshot"
                );
            }
            fault = faults.recv() => match fault {
                Ok(fault) => error!(round = fault.round, message = %fault.message, "fault"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed faults"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn interactive<S: DiceSource + Send + 'static>(
    simulator: &Simulator<S>,
    json: bool,
) -> Result<()> {
    let observer = tokio::spawn(observe(simulator.snapshots(), simulator.faults()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        if line.trim().is_empty() {
            continue;
        }
        let control = match line.parse::<Control>() {
            Ok(control) => control,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        let result = match control {
            Control::Once => simulator.run_once().map(|_| ()),
            Control::Fast => simulator.run_fast(),
            Control::Stop => {
                simulator.stop();
                simulator.stopped().await;
                Ok(())
            }
            Control::Reset => simulator.reset(),
            Control::Status => {
                Summary::new(&simulator.snapshot(), simulator.mode()).print(json)?;
                Ok(())
            }
            Control::Quit => break,
        };
        if let Err(err) = result {
            warn!(?control, %err, "command failed");
        }
    }
    simulator.stop();
    simulator.stopped().await;
    observer.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();
    info!(
        seed = ?config.seed,
        fault_capacity = config.fault_capacity.get(),
        "starting simulator"
    );

    let simulator = config.build();
    match args.command {
        Command::Once { rounds } => play_rounds(&simulator, rounds)?,
        Command::Fast { duration_ms } => {
            play_for(&simulator, Duration::from_millis(duration_ms)).await?
        }
        Command::Interactive => interactive(&simulator, args.json).await?,
    }

    Summary::new(&simulator.snapshot(), simulator.mode()).print(args.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crapsim_execution::mocks::ScriptedDice;
    use std::io::Write;

    #[test]
    fn parses_once_with_overrides() {
        let args = Args::parse_from([
            "crapsim",
            "--seed",
            "7",
            "--log-level",
            "debug",
            "once",
            "--rounds",
            "25",
        ]);
        assert_eq!(args.command, Command::Once { rounds: 25 });
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn fast_defaults_to_one_second() {
        let args = Args::parse_from(["crapsim", "fast"]);
        assert_eq!(args.command, Command::Fast { duration_ms: 1_000 });
        assert!(!args.json);
    }

    #[test]
    fn rejects_bad_log_level() {
        let args = Args::parse_from(["crapsim", "--log-level", "chatty", "interactive"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("chatty"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 1\nlog_level: warn\nfault_capacity: 2").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let args = Args::parse_from(["crapsim", "--config", path.as_str(), "--seed", "2", "once"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.seed, Some(2));
        assert_eq!(config.log_level, tracing::Level::WARN);
        assert_eq!(config.fault_capacity.get(), 2);
    }

    #[test]
    fn parses_interactive_commands() {
        assert_eq!("once".parse::<Control>(), Ok(Control::Once));
        assert_eq!(" FAST ".parse::<Control>(), Ok(Control::Fast));
        assert_eq!("stop".parse::<Control>(), Ok(Control::Stop));
        assert_eq!("reset".parse::<Control>(), Ok(Control::Reset));
        assert_eq!("status".parse::<Control>(), Ok(Control::Status));
        assert_eq!("exit".parse::<Control>(), Ok(Control::Quit));
        assert!("roll".parse::<Control>().is_err());
    }

    #[test]
    fn summary_reports_latest_round() {
        let simulator = Simulator::new(ScriptedDice::from_sums([7, 4, 7, 5, 6, 5]));
        play_rounds(&simulator, 3).unwrap();

        let summary = Summary::new(&simulator.snapshot(), simulator.mode());
        assert_eq!(
            summary.to_string(),
            "wins=2 losses=1 rounds=3 win%=66.67 rolls=[5, 6, 5] state=win mode=idle"
        );

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["rounds"], 3);
        assert_eq!(json["state"], "win");
        assert_eq!(json["mode"], "idle");
    }

    #[test]
    fn play_rounds_reports_failed_round() {
        let simulator = Simulator::new(ScriptedDice::from_sums([2]));
        let err = play_rounds(&simulator, 2).unwrap_err();
        assert!(err.to_string().contains("round 2 of 2"), "unexpected error: {err}");
        assert_eq!(simulator.snapshot().rounds(), 1);
    }

    #[tokio::test]
    async fn play_for_stops_after_duration() {
        let config = SimulatorConfig {
            seed: Some(11),
            ..SimulatorConfig::default()
        }
        .validate()
        .unwrap();
        let simulator = config.build();
        play_for(&simulator, Duration::from_millis(20)).await.unwrap();
        assert_eq!(simulator.mode(), RunMode::Idle);
        assert_eq!(simulator.snapshot().rounds(), simulator.published());
    }

    #[tokio::test]
    async fn play_for_surfaces_fault() {
        let simulator = Simulator::new(ScriptedDice::from_sums([7]).then_fail("dice lost"));
        let err = play_for(&simulator, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dice lost"), "unexpected error: {err}");
        assert_eq!(simulator.snapshot().wins(), 1);
    }
}
