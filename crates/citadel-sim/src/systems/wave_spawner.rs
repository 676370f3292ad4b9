//! Wave scheduling: spawn queues, wave completion and the inter-wave countdown.
//!
//! All timing reads the simulation clock, which stands still while the game
//! is paused, so neither the spawn timer nor the countdown needs pause
//! bookkeeping.

use std::collections::VecDeque;

use rand::Rng;
use tracing::{debug, info};

use citadel_core::config::{LevelConfig, WaveConfig};
use citadel_core::enums::EnemyKind;
use citadel_core::error::ActionError;

/// One scheduled spawn, `delay` seconds after the wave started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnEntry {
    pub kind: EnemyKind,
    pub delay: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum WavePhase {
    /// No wave has started yet.
    #[default]
    Idle,
    /// Spawning and/or enemies of the current wave still alive.
    InProgress,
    /// Between waves; the next one starts at `ends_at`.
    Countdown { ends_at: f64 },
    /// Last wave cleared.
    Finished,
}

/// Reported by `check_cleared` when the current wave is over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveOutcome {
    Cleared { wave: u32, next_wave: u32, countdown: f64 },
    Victory { wave: u32 },
}

/// Expand a wave's groups into a time-ordered spawn queue.
///
/// Groups are interleaved by repeatedly drawing one with probability
/// proportional to its remaining count; each draw is scheduled at the
/// running delay, which then grows by that group's spawn interval.
pub fn build_spawn_queue(wave: &WaveConfig, rng: &mut impl Rng) -> Vec<SpawnEntry> {
    let mut remaining: Vec<(EnemyKind, u32, f64)> = wave
        .enemies
        .iter()
        .filter(|g| g.count > 0)
        .map(|g| (g.kind, g.count, g.spawn_interval))
        .collect();
    let total = wave.total_enemies as usize;
    let mut queue = Vec::with_capacity(total);
    let mut delay = 0.0;

    while queue.len() < total && !remaining.is_empty() {
        let weight: u32 = remaining.iter().map(|(_, count, _)| count).sum();
        let mut pick = rng.gen_range(0..weight);
        let index = remaining
            .iter()
            .position(|(_, count, _)| {
                if pick < *count {
                    true
                } else {
                    pick -= count;
                    false
                }
            })
            .unwrap_or(remaining.len() - 1);

        let (kind, count, interval) = &mut remaining[index];
        queue.push(SpawnEntry { kind: *kind, delay });
        delay += *interval;
        *count -= 1;
        if *count == 0 {
            remaining.remove(index);
        }
    }

    queue.sort_by(|a, b| a.delay.total_cmp(&b.delay));
    queue
}

#[derive(Debug, Clone, Default)]
pub struct WaveScheduler {
    current: u32,
    total: u32,
    phase: WavePhase,
    queue: VecDeque<SpawnEntry>,
    started_at: f64,
}

impl WaveScheduler {
    pub fn new(total_waves: u32) -> Self {
        Self {
            total: total_waves,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.total);
    }

    /// 1-based; 0 before the first wave.
    pub fn current_wave(&self) -> u32 {
        self.current
    }

    pub fn total_waves(&self) -> u32 {
        self.total
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn in_progress(&self) -> bool {
        self.phase == WavePhase::InProgress
    }

    pub fn in_countdown(&self) -> bool {
        matches!(self.phase, WavePhase::Countdown { .. })
    }

    /// Spawns still waiting in the current wave's queue.
    pub fn queued(&self) -> &VecDeque<SpawnEntry> {
        &self.queue
    }

    /// Queued spawns plus the given number of living enemies.
    pub fn remaining_in_wave(&self, living: usize) -> u32 {
        (self.queue.len() + living) as u32
    }

    /// Seconds left on the countdown, if one is running.
    pub fn time_until_next_wave(&self, now: f64) -> Option<f64> {
        match self.phase {
            WavePhase::Countdown { ends_at } => Some((ends_at - now).max(0.0)),
            _ => None,
        }
    }

    /// Explicitly start wave 1.
    pub fn start_first_wave(
        &mut self,
        level: &LevelConfig,
        rng: &mut impl Rng,
        now: f64,
    ) -> Result<u32, ActionError> {
        if self.current != 0 || self.phase != WavePhase::Idle {
            return Err(ActionError::WaveAlreadyStarted);
        }
        Ok(self.begin(1, level, rng, now))
    }

    /// Cancel the countdown and start the next wave now.
    pub fn skip_countdown(
        &mut self,
        level: &LevelConfig,
        rng: &mut impl Rng,
        now: f64,
    ) -> Result<u32, ActionError> {
        if !self.in_countdown() || self.current >= self.total {
            return Err(ActionError::NoCountdown);
        }
        Ok(self.begin(self.current + 1, level, rng, now))
    }

    /// Start the next wave if the countdown has run out.
    pub fn advance_countdown(&mut self, level: &LevelConfig, rng: &mut impl Rng, now: f64) -> Option<u32> {
        match self.phase {
            WavePhase::Countdown { ends_at } if now >= ends_at && self.current < self.total => {
                Some(self.begin(self.current + 1, level, rng, now))
            }
            _ => None,
        }
    }

    /// Pop every queued spawn whose delay has elapsed.
    pub fn take_due(&mut self, now: f64) -> Vec<EnemyKind> {
        if self.phase != WavePhase::InProgress {
            return Vec::new();
        }
        let elapsed = now - self.started_at;
        let mut due = Vec::new();
        while let Some(entry) = self.queue.front() {
            if elapsed < entry.delay {
                break;
            }
            due.push(entry.kind);
            self.queue.pop_front();
        }
        due
    }

    /// Close out the wave once its queue is drained and nothing is alive:
    /// victory on the last wave, otherwise a countdown of `wave_delay`.
    pub fn check_cleared(&mut self, living: usize, now: f64, wave_delay: f64) -> Option<WaveOutcome> {
        if self.phase != WavePhase::InProgress || !self.queue.is_empty() || living > 0 {
            return None;
        }
        let wave = self.current;
        if wave >= self.total {
            self.phase = WavePhase::Finished;
            info!(wave, "final wave cleared");
            return Some(WaveOutcome::Victory { wave });
        }
        self.phase = WavePhase::Countdown {
            ends_at: now + wave_delay,
        };
        info!(wave, countdown = wave_delay, "wave cleared");
        Some(WaveOutcome::Cleared {
            wave,
            next_wave: wave + 1,
            countdown: wave_delay,
        })
    }

    fn begin(&mut self, wave: u32, level: &LevelConfig, rng: &mut impl Rng, now: f64) -> u32 {
        let queue = level
            .wave(wave)
            .map(|config| build_spawn_queue(config, rng))
            .unwrap_or_default();
        debug!(wave, spawns = queue.len(), "spawn queue built");
        self.queue = queue.into();
        self.current = wave;
        self.phase = WavePhase::InProgress;
        self.started_at = now;
        wave
    }
}
