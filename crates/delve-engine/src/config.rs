//! World configuration and validation.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use delve_map::MIN_DIMENSION;

/// Fraction of the board that sizes the enemy worker pool and the
/// live-enemy capacity ceiling.
const BOARD_FRACTION_PERCENT: usize = 3;

/// Bounds applied to the 3%-of-board formula.
const FORMULA_MIN: usize = 1;
const FORMULA_MAX: usize = 10;

/// `clamp(3% of cells, 1, 10)` — shared by the worker pool size and
/// the live-enemy capacity ceiling.
pub fn board_formula(cell_count: usize) -> usize {
    (cell_count * BOARD_FRACTION_PERCENT / 100).clamp(FORMULA_MIN, FORMULA_MAX)
}

/// Complete configuration for constructing a game world.
///
/// `validate()` checks the structural invariants at startup; the world
/// constructor refuses an invalid configuration outright.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Grid rows. Minimum 10.
    pub rows: u32,
    /// Grid columns. Minimum 10.
    pub cols: u32,
    /// RNG seed for deterministic loot, jitter, and spawn rolls.
    pub seed: u64,
    /// Bounds on the per-enemy tick jitter, in milliseconds.
    /// Default: 500–1500.
    pub tick_delay_ms: (u64, u64),
    /// Period of the world-wide magic-wave event. Default: 40 s.
    pub global_event_period: Duration,
    /// Period of the maintenance tick (regeneration application).
    /// Default: 1 s.
    pub maintenance_period: Duration,
    /// Interval of the effect-registry expiry sweep. Default: 1 s.
    pub sweep_interval: Duration,
    /// Grace period awaited for worker threads during `stop` before
    /// they are detached. Default: 2 s.
    pub stop_grace: Duration,
    /// Worker pool size override. `None` applies the 3%-of-board
    /// formula; explicit values are clamped to `[1, 64]`.
    pub worker_count: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            seed: 0,
            tick_delay_ms: (500, 1500),
            global_event_period: Duration::from_secs(40),
            maintenance_period: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(1),
            stop_grace: Duration::from_secs(2),
            worker_count: None,
        }
    }
}

impl WorldConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < MIN_DIMENSION || self.cols < MIN_DIMENSION {
            return Err(ConfigError::BoardTooSmall {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let (min, max) = self.tick_delay_ms;
        if min == 0 || min > max {
            return Err(ConfigError::InvalidTickDelay { min, max });
        }
        for (name, period) in [
            ("global_event_period", self.global_event_period),
            ("maintenance_period", self.maintenance_period),
            ("sweep_interval", self.sweep_interval),
        ] {
            if period.is_zero() {
                return Err(ConfigError::ZeroPeriod { name });
            }
        }
        Ok(())
    }

    /// Total board cells.
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Resolved enemy worker pool size: the override clamped to
    /// `[1, 64]`, or the 3%-of-board formula.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => board_formula(self.cell_count()),
        }
    }

    /// Ceiling on simultaneously live enemies.
    pub fn enemy_capacity(&self) -> usize {
        board_formula(self.cell_count())
    }
}

/// Errors detected during [`WorldConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The board is below the 10×10 minimum.
    BoardTooSmall {
        /// Configured rows.
        rows: u32,
        /// Configured columns.
        cols: u32,
    },
    /// Tick jitter bounds are empty or start at zero.
    InvalidTickDelay {
        /// Lower jitter bound (ms).
        min: u64,
        /// Upper jitter bound (ms).
        max: u64,
    },
    /// A periodic task has a zero period.
    ZeroPeriod {
        /// Which period field was zero.
        name: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoardTooSmall { rows, cols } => {
                write!(f, "board must be at least 10x10, got {rows}x{cols}")
            }
            Self::InvalidTickDelay { min, max } => {
                write!(f, "tick delay bounds ({min}, {max}) are invalid")
            }
            Self::ZeroPeriod { name } => write!(f, "{name} must be non-zero"),
        }
    }
}

impl Error for ConfigError {}
