use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use citadel_app::control;
use citadel_app::game_loop;
use citadel_app::sinks::{JsonLinesSink, TracingSink};
use citadel_app::state::AppState;
use citadel_core::commands::PlayerCommand;
use citadel_core::config::{GameConfig, LevelConfig};
use citadel_core::enums::TowerKind;
use citadel_core::types::GridCell;
use citadel_sim::notify::EventSink;
use citadel_sim::{SimConfig, SimulationEngine};

#[derive(Parser, Debug)]
#[command(name = "citadel")]
#[command(about = "Headless tower-defense simulation host")]
struct Args {
    /// Game config (tower, enemy and upgrade tables). Built-in defaults when omitted.
    #[arg(long)]
    game_config: Option<PathBuf>,

    /// Level config (grid, paths, waves). Built-in level when omitted.
    #[arg(long)]
    level: Option<PathBuf>,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Run this many ticks as fast as possible and print the final snapshot.
    /// Without it the loop runs in real time, reading JSON commands from stdin.
    #[arg(long)]
    ticks: Option<u64>,

    /// Start the game and the first wave immediately.
    #[arg(long)]
    auto_start: bool,

    /// Towers to place after starting, as `kind:x:z` (e.g. `basic:5:8`).
    #[arg(long = "tower", value_parser = parse_tower)]
    towers: Vec<(TowerKind, GridCell)>,

    /// Also write every game event to stdout as JSON lines.
    #[arg(long)]
    emit_events: bool,
}

fn parse_tower(raw: &str) -> Result<(TowerKind, GridCell), String> {
    let mut parts = raw.split(':');
    let (Some(kind), Some(x), Some(z), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected kind:x:z, got {raw:?}"));
    };
    let kind: TowerKind = serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .map_err(|_| format!("unknown tower kind {kind:?}"))?;
    let x = x.parse().map_err(|_| format!("bad x coordinate {x:?}"))?;
    let z = z.parse().map_err(|_| format!("bad z coordinate {z:?}"))?;
    Ok((kind, GridCell::new(x, z)))
}

impl Args {
    fn sim_config(&self) -> anyhow::Result<SimConfig> {
        let game = match &self.game_config {
            Some(path) => GameConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
            None => GameConfig::default(),
        };
        let level = match &self.level {
            Some(path) => LevelConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
            None => LevelConfig::default(),
        };
        Ok(SimConfig {
            seed: self.seed,
            game,
            level,
        })
    }

    fn setup_commands(&self) -> Vec<PlayerCommand> {
        let mut commands = Vec::new();
        if self.auto_start {
            commands.push(PlayerCommand::StartGame);
        }
        commands.extend(
            self.towers
                .iter()
                .map(|&(kind, cell)| PlayerCommand::PlaceTower { cell, kind }),
        );
        if self.auto_start {
            commands.push(PlayerCommand::StartFirstWave);
        }
        commands
    }

    fn sinks(&self) -> Vec<Box<dyn EventSink>> {
        let mut sinks: Vec<Box<dyn EventSink>> = vec![Box::new(TracingSink)];
        if self.emit_events {
            sinks.push(Box::new(JsonLinesSink::new(std::io::stdout())));
        }
        sinks
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.sim_config()?;

    let snapshot = match args.ticks {
        Some(ticks) => {
            let mut engine = SimulationEngine::new(config).context("invalid configuration")?;
            for sink in args.sinks() {
                engine.add_event_sink(sink);
            }
            game_loop::run_headless(&mut engine, args.setup_commands(), ticks)
        }
        None => {
            let state = AppState::new();
            control::start_simulation(&state, config, args.sinks())?;
            for command in args.setup_commands() {
                control::send_command(&state, command)?;
            }

            for line in std::io::stdin().lock().lines() {
                let line = line.context("reading stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PlayerCommand>(&line) {
                    Ok(command) => control::send_command(&state, command)?,
                    Err(err) => warn!(error = %err, "ignoring malformed command"),
                }
            }

            control::stop_simulation(&state)?;
            match control::get_snapshot(&state)? {
                Some(snapshot) => snapshot,
                None => bail!("game loop stopped before producing a snapshot"),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
