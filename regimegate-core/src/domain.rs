//! Domain types: labeled ticks, regime segments, trades.
//!
//! A tick is a price at a position in the series; ticks are processed strictly
//! in index order. A regime segment is a maximal
//! contiguous run of ticks sharing one label; the segments returned by
//! [`split_segments`] partition the series with no gaps or overlaps.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A price tagged with the regime it was generated under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTick {
    pub price: f64,
    pub regime: String,
}

impl LabeledTick {
    pub fn new(price: f64, regime: impl Into<String>) -> Self {
        Self {
            price,
            regime: regime.into(),
        }
    }
}

/// A maximal contiguous run of same-regime ticks, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeSegment {
    pub regime: String,
    pub start: usize,
    pub end: usize,
}

impl RegimeSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Partition a labeled series into regime segments, in first-appearance order.
///
/// A label that reappears after a different label starts a new segment.
pub fn split_segments(ticks: &[LabeledTick]) -> Vec<RegimeSegment> {
    let mut segments: Vec<RegimeSegment> = Vec::new();
    for (i, tick) in ticks.iter().enumerate() {
        match segments.last_mut() {
            Some(seg) if seg.regime == tick.regime => seg.end = i + 1,
            _ => segments.push(RegimeSegment {
                regime: tick.regime.clone(),
                start: i,
                end: i + 1,
            }),
        }
    }
    segments
}

/// Extract the raw price column.
pub fn prices(ticks: &[LabeledTick]) -> Vec<f64> {
    ticks.iter().map(|t| t.price).collect()
}

/// Trade direction. Serialized as `1` (long) or `-1` (short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl From<Direction> for i8 {
    fn from(d: Direction) -> i8 {
        match d {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Direction::Long),
            -1 => Ok(Direction::Short),
            other => Err(format!("direction must be 1 or -1, got {other}")),
        }
    }
}

/// A completed simulated trade. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub signal_tick: usize,
    pub entry_tick: usize,
    pub exit_tick: usize,
    pub direction: Direction,
    pub pnl: f64,
}

impl Trade {
    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
