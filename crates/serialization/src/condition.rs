//! Condition wire format.
//!
//! Persisted conditions are flat objects tagged by `type`. Inbound decoding
//! accepts every shape older dashboard versions wrote:
//! - `type: "wick"` is the old name of `delta`; a missing `type` is `volume`
//! - ranges stored as a single `value` become `{valueMin: value, valueMax: null}`
//! - `symbol` may sit in `value`
//! - exchange and market may be separate fields or separate condition types,
//!   with `linear` meaning `futures`

use crate::error::{MigrationError, MigrationResult};
use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spike_core::{
    exchange_market_key, normalize_symbol, Condition, PercentRange, SpikeDirection,
};
use tracing::debug;

/// Comparison operator attached to every outbound condition.
pub const CONDITION_OPERATOR: &str = ">=";

const DEFAULT_LEGACY_EXCHANGE: &str = "binance";
const DEFAULT_LEGACY_MARKET: &str = "spot";

/// Flat persisted condition object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireCondition {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Legacy single value: a number for ranges and volume, a string for
    /// symbol, exchange, market or direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(
        rename = "valueMin",
        default,
        deserialize_with = "lenient::opt_f64",
        serialize_with = "lenient::ser_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_min: Option<f64>,
    /// `Some(None)` is an explicit `null` (unbounded above).
    #[serde(
        rename = "valueMax",
        default,
        deserialize_with = "lenient::nullable_f64",
        serialize_with = "lenient::ser_nullable_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_max: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub count: Option<u32>,
    #[serde(
        rename = "timeWindowSeconds",
        default,
        deserialize_with = "lenient::opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_window_seconds: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub exchange_market: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl WireCondition {
    fn legacy_number(&self) -> Option<f64> {
        self.value.as_ref().and_then(lenient::number_from_value)
    }

    fn legacy_text(&self) -> Option<String> {
        self.value
            .as_ref()
            .and_then(lenient::text_from_value)
            .filter(|s| !s.trim().is_empty())
    }

    fn range(&self) -> PercentRange {
        let range = if self.value_min.is_some() || self.value_max.is_some() {
            PercentRange::new(self.value_min, self.value_max.flatten())
        } else {
            PercentRange::new(self.legacy_number(), None)
        };
        range.clamped()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Converts conditions between the wire format and the model.
pub struct ConditionCodec;

impl ConditionCodec {
    /// Decode a persisted condition of any known shape.
    pub fn from_wire(wire: &WireCondition) -> MigrationResult<Condition> {
        let tag = non_empty(wire.kind.as_deref())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "volume".to_string());
        let legacy = wire.legacy_text();

        let condition = match tag.as_str() {
            "volume" => Condition::Volume {
                value: wire.legacy_number(),
            },
            "delta" | "wick" => Condition::Delta(wire.range()),
            "wick_pct" => Condition::WickPct(wire.range()),
            "series" => Condition::Series {
                count: wire.count,
                time_window_seconds: wire.time_window_seconds,
            }
            .normalized(),
            "symbol" => {
                let symbol = non_empty(wire.symbol.as_deref())
                    .or(legacy.as_deref())
                    .unwrap_or_default();
                Condition::Symbol(normalize_symbol(symbol))
            }
            "exchange_market" => match non_empty(wire.exchange_market.as_deref()) {
                Some(key) => Condition::exchange_market(key),
                None => Condition::ExchangeMarket(
                    exchange_market_key(
                        non_empty(wire.exchange.as_deref()).unwrap_or(DEFAULT_LEGACY_EXCHANGE),
                        non_empty(wire.market.as_deref()).unwrap_or(DEFAULT_LEGACY_MARKET),
                    )
                    .into(),
                ),
            },
            "exchange" => {
                let exchange = non_empty(wire.exchange.as_deref())
                    .or(legacy.as_deref())
                    .unwrap_or(DEFAULT_LEGACY_EXCHANGE);
                let market = non_empty(wire.market.as_deref()).unwrap_or(DEFAULT_LEGACY_MARKET);
                Condition::ExchangeMarket(exchange_market_key(exchange, market).into())
            }
            "market" => {
                let market = non_empty(wire.market.as_deref())
                    .or(legacy.as_deref())
                    .unwrap_or(DEFAULT_LEGACY_MARKET);
                let exchange =
                    non_empty(wire.exchange.as_deref()).unwrap_or(DEFAULT_LEGACY_EXCHANGE);
                Condition::ExchangeMarket(exchange_market_key(exchange, market).into())
            }
            "direction" => {
                let direction = non_empty(wire.direction.as_deref())
                    .or(legacy.as_deref())
                    .map(SpikeDirection::parse_lenient)
                    .unwrap_or_default();
                Condition::Direction(direction)
            }
            other => return Err(MigrationError::UnknownConditionType(other.to_string())),
        };

        if tag == "wick" || tag == "exchange" || tag == "market" {
            debug!(legacy = %tag, migrated = %condition.kind(), "Migrated legacy condition");
        }
        Ok(condition)
    }

    /// Encode a condition with only the fields of its kind.
    pub fn to_wire(condition: &Condition) -> WireCondition {
        let mut wire = WireCondition {
            kind: Some(condition.kind().tag().to_string()),
            operator: Some(CONDITION_OPERATOR.to_string()),
            ..Default::default()
        };

        match condition {
            Condition::Volume { value } => {
                wire.value = value.map(lenient::number_to_value);
            }
            Condition::Delta(range) | Condition::WickPct(range) => {
                wire.value_min = range.min;
                wire.value_max = Some(range.max);
            }
            Condition::Series {
                count,
                time_window_seconds,
            } => {
                wire.count = *count;
                wire.time_window_seconds = *time_window_seconds;
            }
            Condition::Symbol(symbol) => {
                wire.symbol = Some(symbol.to_string());
            }
            Condition::ExchangeMarket(key) => {
                wire.exchange_market = Some(key.to_string());
            }
            Condition::Direction(direction) => {
                wire.direction = Some(direction.as_str().to_string());
            }
        }

        wire
    }
}
