//! Strategy conditions.
//!
//! A strategy matches a spike when every one of its conditions matches. Each
//! condition kind carries only the fields meaningful for it; a field that the
//! user has not filled in yet is `None`.

use compact_str::CompactString;

/// Lower bound for a mandatory delta filter.
pub const MIN_FILTER_DELTA: f64 = 0.01;
/// Upper bound for every percentage.
pub const MAX_PERCENT: f64 = 100.0;
/// Minimum number of spikes in a series.
pub const MIN_SERIES_COUNT: u32 = 2;
/// Minimum series window in seconds.
pub const MIN_SERIES_WINDOW_SECS: u32 = 60;

/// Condition discriminant, with the wire tag as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Volume,
    Delta,
    WickPct,
    Series,
    Symbol,
    ExchangeMarket,
    Direction,
}

impl ConditionKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "volume" => Some(ConditionKind::Volume),
            "delta" => Some(ConditionKind::Delta),
            "wick_pct" => Some(ConditionKind::WickPct),
            "series" => Some(ConditionKind::Series),
            "symbol" => Some(ConditionKind::Symbol),
            "exchange_market" => Some(ConditionKind::ExchangeMarket),
            "direction" => Some(ConditionKind::Direction),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ConditionKind::Volume => "volume",
            ConditionKind::Delta => "delta",
            ConditionKind::WickPct => "wick_pct",
            ConditionKind::Series => "series",
            ConditionKind::Symbol => "symbol",
            ConditionKind::ExchangeMarket => "exchange_market",
            ConditionKind::Direction => "direction",
        }
    }

    pub fn all() -> &'static [ConditionKind] {
        &[
            ConditionKind::Volume,
            ConditionKind::Delta,
            ConditionKind::WickPct,
            ConditionKind::Series,
            ConditionKind::Symbol,
            ConditionKind::ExchangeMarket,
            ConditionKind::Direction,
        ]
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Spike direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpikeDirection {
    #[default]
    Up,
    Down,
}

impl SpikeDirection {
    /// Parse case-insensitively; anything unrecognised is `Up`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "down" => SpikeDirection::Down,
            _ => SpikeDirection::Up,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpikeDirection::Up => "up",
            SpikeDirection::Down => "down",
        }
    }
}

/// Percentage range `[min, max]`; `max = None` is unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PercentRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Range with a lower bound only.
    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    /// Clamp both ends into `[0, 100]` and raise `max` to `min` if it is lower.
    pub fn clamped(self) -> Self {
        self.clamp_with_floor(0.0)
    }

    /// Like [`PercentRange::clamped`], but with the delta filter floor of
    /// `0.01` applied to `min`.
    pub fn clamped_filter(self) -> Self {
        self.clamp_with_floor(MIN_FILTER_DELTA)
    }

    fn clamp_with_floor(self, floor: f64) -> Self {
        let min = self.min.map(|v| v.clamp(floor, MAX_PERCENT));
        let max = self.max.map(|v| {
            let v = v.clamp(0.0, MAX_PERCENT);
            match min {
                Some(min) if v < min => min,
                _ => v,
            }
        });
        Self { min, max }
    }

    /// `true` when `max` is absent or not below `min`.
    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => max >= min,
            _ => true,
        }
    }
}

/// A single matching condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Minimum quote volume, inclusive.
    Volume { value: Option<f64> },
    /// Price change percentage range.
    Delta(PercentRange),
    /// Candle wick percentage range.
    WickPct(PercentRange),
    /// At least `count` spikes within `time_window_seconds`.
    Series {
        count: Option<u32>,
        time_window_seconds: Option<u32>,
    },
    /// Exact base asset, upper-case.
    Symbol(CompactString),
    /// `"{exchange}_{market}"`, lower-case.
    ExchangeMarket(CompactString),
    Direction(SpikeDirection),
}

impl Condition {
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Volume { .. } => ConditionKind::Volume,
            Condition::Delta(_) => ConditionKind::Delta,
            Condition::WickPct(_) => ConditionKind::WickPct,
            Condition::Series { .. } => ConditionKind::Series,
            Condition::Symbol(_) => ConditionKind::Symbol,
            Condition::ExchangeMarket(_) => ConditionKind::ExchangeMarket,
            Condition::Direction(_) => ConditionKind::Direction,
        }
    }

    /// Fresh condition of the given kind, as inserted by the editor.
    pub fn default_for(kind: ConditionKind) -> Self {
        match kind {
            ConditionKind::Volume => Condition::Volume { value: None },
            ConditionKind::Delta => Condition::Delta(PercentRange::default()),
            ConditionKind::WickPct => Condition::WickPct(PercentRange::default()),
            ConditionKind::Series => Condition::Series {
                count: Some(MIN_SERIES_COUNT),
                time_window_seconds: Some(MIN_SERIES_WINDOW_SECS),
            },
            ConditionKind::Symbol => Condition::Symbol(CompactString::default()),
            ConditionKind::ExchangeMarket => Condition::ExchangeMarket("binance_spot".into()),
            ConditionKind::Direction => Condition::Direction(SpikeDirection::Up),
        }
    }

    pub fn volume(value: f64) -> Self {
        Condition::Volume { value: Some(value) }
    }

    pub fn delta(min: f64, max: Option<f64>) -> Self {
        Condition::Delta(PercentRange::new(Some(min), max))
    }

    pub fn wick_pct(min: f64, max: Option<f64>) -> Self {
        Condition::WickPct(PercentRange::new(Some(min), max))
    }

    /// Series condition with both bounds raised to their minimums.
    pub fn series(count: u32, time_window_seconds: u32) -> Self {
        Condition::Series {
            count: Some(count.max(MIN_SERIES_COUNT)),
            time_window_seconds: Some(time_window_seconds.max(MIN_SERIES_WINDOW_SECS)),
        }
    }

    /// Symbol condition, trimmed and upper-cased.
    pub fn symbol(symbol: &str) -> Self {
        Condition::Symbol(normalize_symbol(symbol))
    }

    /// Exchange/market condition from a combined key, lower-cased.
    pub fn exchange_market(key: &str) -> Self {
        Condition::ExchangeMarket(key.trim().to_lowercase().into())
    }

    pub fn direction(direction: SpikeDirection) -> Self {
        Condition::Direction(direction)
    }

    /// Apply the value invariants: percentage ranges clamped and ordered,
    /// series bounds raised to their minimums.
    pub fn normalized(self) -> Self {
        match self {
            Condition::Delta(range) => Condition::Delta(range.clamped()),
            Condition::WickPct(range) => Condition::WickPct(range.clamped()),
            Condition::Series {
                count,
                time_window_seconds,
            } => Condition::Series {
                count: count.map(|c| c.max(MIN_SERIES_COUNT)),
                time_window_seconds: time_window_seconds.map(|w| w.max(MIN_SERIES_WINDOW_SECS)),
            },
            other => other,
        }
    }
}

impl Condition {
    /// [`Condition::normalized`] for a strategy that must carry its own
    /// filters: the delta lower bound is also raised to `0.01`.
    pub fn normalized_as_filter(self) -> Self {
        match self.normalized() {
            Condition::Delta(range) => Condition::Delta(range.clamped_filter()),
            other => other,
        }
    }
}

/// Trim and upper-case a base asset symbol.
pub fn normalize_symbol(symbol: &str) -> CompactString {
    symbol.trim().to_uppercase().into()
}
