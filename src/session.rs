use std::time::Duration;

use log::{debug, error, info};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Rules;
use crate::grid::{DeathReason, GRID_HEIGHT, GRID_WIDTH, Grid, StepOutcome};
use crate::keymap::{KeyMap, KeyMapError};

/// Which key brings the game back from the game-over screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    #[default]
    Space,
    AnyKey,
}

impl RestartPolicy {
    pub fn accepts(self, key: char) -> bool {
        match self {
            RestartPolicy::Space => key == ' ',
            RestartPolicy::AnyKey => true,
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            RestartPolicy::Space => "Press space bar to restart.",
            RestartPolicy::AnyKey => "Press any key to restart.",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing,
    GameOver,
}

/// Feedback the presentation layer reacts to (sounds).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Ate,
    Died(DeathReason),
}

/// Gates simulation steps to a fixed interval, independent of frame rate.
/// Times are seconds on a monotonic clock.
#[derive(Clone, Debug)]
pub struct MoveTimer {
    delay: f64,
    last_move_at: f64,
}

impl MoveTimer {
    pub fn new(delay: Duration, now: f64) -> Self {
        Self { delay: delay.as_secs_f64(), last_move_at: now }
    }

    pub fn restart(&mut self, now: f64) {
        self.last_move_at = now;
    }

    /// True at most once per interval; the interval restarts from `now`.
    pub fn ready(&mut self, now: f64) -> bool {
        if now - self.last_move_at < self.delay {
            return false;
        }
        self.last_move_at = now;
        true
    }
}

/// One play session: the board, the shuffling key bindings and the
/// high score that survives restarts until the window closes.
pub struct Session {
    rules: Rules,
    grid: Grid,
    keymap: KeyMap,
    phase: Phase,
    high_score: u32,
    timer: MoveTimer,
    rng: StdRng,
}

impl Session {
    pub fn new(rules: Rules, mut rng: StdRng, now: f64) -> Result<Self, KeyMapError> {
        let keymap = KeyMap::generate(&rules.pool, &mut rng)?;
        let grid = Grid::new(GRID_WIDTH, GRID_HEIGHT, rules.boundary, rules.start_length, &mut rng);
        let timer = MoveTimer::new(rules.move_delay, now);
        Ok(Self {
            rules,
            grid,
            keymap,
            phase: Phase::Playing,
            high_score: 0,
            timer,
            rng,
        })
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.grid.score()
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Feeds one typed character. While playing, a bound key steers and then
    /// reshuffles the bindings; unbound keys are ignored. On the game-over
    /// screen the restart policy decides.
    pub fn handle_key(&mut self, key: char, now: f64) {
        match self.phase {
            Phase::GameOver => {
                if self.rules.restart.accepts(key) {
                    self.restart(now);
                }
            }
            Phase::Playing => {
                let Some(direction) = self.keymap.resolve(key) else {
                    return;
                };
                self.grid.steer(direction);
                if let Err(err) =
                    self.keymap
                        .reshuffle(key, self.rules.remap, &self.rules.pool, &mut self.rng)
                {
                    error!("remapping {:?} failed: {}, redrawing all bindings", key, err);
                    if let Ok(keymap) = KeyMap::generate(&self.rules.pool, &mut self.rng) {
                        self.keymap = keymap;
                    }
                }
            }
        }
    }

    /// Advances the board if the move delay has elapsed.
    pub fn tick(&mut self, now: f64) -> Option<SessionEvent> {
        if self.phase != Phase::Playing || !self.timer.ready(now) {
            return None;
        }

        match self.grid.advance(&mut self.rng) {
            StepOutcome::Moved | StepOutcome::Halted => None,
            StepOutcome::Ate => {
                debug!("ate, score {}", self.grid.score());
                Some(SessionEvent::Ate)
            }
            StepOutcome::Died(reason) => {
                self.phase = Phase::GameOver;
                info!(
                    "game over ({:?}): score {}, length {}",
                    reason,
                    self.grid.score(),
                    self.grid.snake().len()
                );
                Some(SessionEvent::Died(reason))
            }
        }
    }

    fn restart(&mut self, now: f64) {
        let score = self.grid.score();
        if score > self.high_score {
            info!("new high score {} (was {})", score, self.high_score);
            self.high_score = score;
        }

        self.grid.reset(&mut self.rng);
        match KeyMap::generate(&self.rules.pool, &mut self.rng) {
            Ok(keymap) => self.keymap = keymap,
            Err(err) => error!("could not redraw bindings on restart: {}", err),
        }
        self.timer.restart(now);
        self.phase = Phase::Playing;
        info!("restarted");
    }

    #[cfg(test)]
    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}
