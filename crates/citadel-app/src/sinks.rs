//! Event sinks shipped with the host: structured logging and JSON lines.

use std::io::Write;

use tracing::{debug, info};

use citadel_core::events::GameEvent;
use citadel_sim::notify::{EventSink, SinkError};

/// Logs game events through `tracing`. Milestones at info, the rest at debug.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn deliver(&mut self, event: &GameEvent) -> Result<(), SinkError> {
        match event {
            GameEvent::WaveStarted {
                wave,
                total_enemies,
                upgrades,
            } => info!(wave, total_enemies, ?upgrades, "wave started"),
            GameEvent::WaveCleared { wave } => info!(wave, "wave cleared"),
            GameEvent::EnemyDiscovered { kind } => info!(?kind, "new enemy type"),
            GameEvent::GameOver { wave } => info!(wave, "game over"),
            GameEvent::GameWon { wave } => info!(wave, "victory"),
            GameEvent::CommandRejected { reason } => info!(%reason, "command rejected"),
            other => debug!(event = ?other, "game event"),
        }
        Ok(())
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn deliver(&mut self, event: &GameEvent) -> Result<(), SinkError> {
        let line = serde_json::to_string(event).map_err(|e| SinkError(e.to_string()))?;
        writeln!(self.out, "{line}").map_err(|e| SinkError(e.to_string()))
    }
}
