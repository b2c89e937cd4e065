// Level/experience progression for RPG characters.
//
// Pure functions over caller-owned `Progress` values: no I/O, no shared state.
// Experience is fixed-point with three fractional digits so repeated grants
// never accumulate floating-point drift.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Multiplier of the quadratic level curve.
pub const LEVEL_CURVE_FACTOR: i64 = 200;

/// Fractional digits kept for experience values.
pub const XP_DECIMALS: u32 = 3;
const XP_SCALE: i64 = 1000;

/// Starting level of every character.
pub const FIRST_LEVEL: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressionError {
    #[error("level must be at least 1, got {0}")]
    InvalidLevel(u32),
    #[error("experience delta must be a finite number")]
    NonFiniteDelta,
    #[error("experience delta {0} is out of range")]
    DeltaOutOfRange(f64),
}

/// Experience amount stored as thousandths of a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Xp(i64);

impl Xp {
    pub const ZERO: Xp = Xp(0);

    pub fn from_points(points: i64) -> Self {
        Xp(points.saturating_mul(XP_SCALE))
    }

    pub fn from_millis(millis: i64) -> Self {
        Xp(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Round an arbitrary number to the nearest thousandth.
    pub fn from_f64(value: f64) -> Result<Self, ProgressionError> {
        if !value.is_finite() {
            return Err(ProgressionError::NonFiniteDelta);
        }
        let scaled = (value * XP_SCALE as f64).round();
        // i64::MAX is not exactly representable; stay strictly inside.
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(ProgressionError::DeltaOutOfRange(value));
        }
        Ok(Xp(scaled as i64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / XP_SCALE as f64
    }

    fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl std::ops::Add for Xp {
    type Output = Xp;

    fn add(self, rhs: Xp) -> Xp {
        Xp(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Xp {
    type Output = Xp;

    fn sub(self, rhs: Xp) -> Xp {
        Xp(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Xp {
    /// Whole values print without decimals; fractions drop trailing zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / XP_SCALE as u64;
        let frac = abs % XP_SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:03}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl Serialize for Xp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Xp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Xp::from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// Experience threshold for `level`, also the span needed to leave `level - 1`.
pub fn xp_for_level(level: i64) -> i64 {
    level.saturating_mul(level).saturating_mul(LEVEL_CURVE_FACTOR)
}

/// Span of experience needed to advance from `level` to `level + 1`.
fn span_above(level: u32) -> Xp {
    Xp::from_points(xp_for_level(i64::from(level) + 1))
}

/// Net direction of a level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    LevelUp,
    LevelDown,
    None,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::LevelUp => "level_up",
            Transition::LevelDown => "level_down",
            Transition::None => "none",
        }
    }
}

/// A character's position on the level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u32,
    pub xp: Xp,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            level: FIRST_LEVEL,
            xp: Xp::ZERO,
        }
    }

    pub fn next_level_xp(&self) -> i64 {
        xp_for_level(i64::from(self.level) + 1)
    }

    /// Apply a signed experience delta, cascading through as many levels as needed.
    pub fn apply_delta(self, delta: f64) -> Result<(Progress, Transition), ProgressionError> {
        let delta = Xp::from_f64(delta)?;
        self.apply_xp(delta)
    }

    /// Same as [`Progress::apply_delta`] for an already fixed-point delta.
    pub fn apply_xp(self, delta: Xp) -> Result<(Progress, Transition), ProgressionError> {
        if self.level < FIRST_LEVEL {
            return Err(ProgressionError::InvalidLevel(self.level));
        }

        let start_level = self.level;
        let mut level = self.level;
        let mut xp = self.xp + delta;

        while xp >= span_above(level) {
            xp = xp - span_above(level);
            level = level.saturating_add(1);
        }

        while xp.is_negative() {
            if level == FIRST_LEVEL {
                xp = Xp::ZERO;
                break;
            }
            level -= 1;
            xp = xp + span_above(level);
        }

        let transition = match level.cmp(&start_level) {
            std::cmp::Ordering::Greater => Transition::LevelUp,
            std::cmp::Ordering::Less => Transition::LevelDown,
            std::cmp::Ordering::Equal => Transition::None,
        };

        Ok((Progress { level, xp }, transition))
    }

    /// Share of the current level already earned, in percent.
    pub fn percent(&self) -> f64 {
        self.xp.as_f64() / self.next_level_xp() as f64 * 100.0
    }
}

/// Human-readable progress line, e.g. `Level 1 | 100/800 (12.5%)`.
pub fn format_progress(progress: &Progress) -> String {
    format!(
        "Level {} | {}/{} ({:.1}%)",
        progress.level,
        progress.xp,
        progress.next_level_xp(),
        progress.percent()
    )
}
