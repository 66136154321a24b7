//! The `options_json` blob stored per user.
//!
//! Decoding works domain by domain from a loose JSON value so that one broken
//! or outdated section never prevents the rest from loading.

use crate::error::{MigrationError, MigrationResult};
use crate::lenient;
use crate::strategy::{StrategyCodec, WireStrategy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spike_core::{exchange_market_key, template, Exchange, Market, Strategy};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Markets each exchange is listed with in the exchange filter.
const FILTER_MARKETS: [Market; 2] = [Market::Spot, Market::Futures];

/// Per-pair thresholds shown in the active-filters table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSetting {
    #[serde(default = "default_true", deserialize_with = "deserialize_enabled")]
    pub enabled: bool,
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        serialize_with = "lenient::ser_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub delta: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        serialize_with = "lenient::ser_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_f64",
        serialize_with = "lenient::ser_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub shadow: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub send_chart: Option<bool>,
    /// Fields this version does not know about, kept for the round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PairSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            delta: None,
            volume: None,
            shadow: None,
            send_chart: None,
            extra: Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn deserialize_enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient::opt_bool(deserializer)?.unwrap_or(true))
}

/// Outbound `options_json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsBlob {
    pub exchanges: BTreeMap<String, bool>,
    pub pair_settings: BTreeMap<String, PairSetting>,
    pub blacklist: Vec<String>,
    pub message_template: String,
    pub conditional_templates: Vec<WireStrategy>,
    pub timezone: String,
}

impl OptionsBlob {
    pub fn to_json(&self) -> MigrationResult<String> {
        serde_json::to_string(self).map_err(MigrationError::Encode)
    }
}

/// Everything decoded from a stored blob, in editing form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedOptions {
    pub exchanges: BTreeMap<String, bool>,
    pub pair_settings: BTreeMap<String, PairSetting>,
    /// `sendChart` flags lifted out of the pair settings.
    pub chart_settings: BTreeMap<String, bool>,
    pub blacklist: Vec<String>,
    /// Friendly spelling; `None` when the blob has none.
    pub message_template: Option<String>,
    pub strategies: Vec<Strategy>,
    /// Raw stored value, not yet checked.
    pub timezone: Option<String>,
}

/// Parts of the editing model needed to build an outbound blob.
#[derive(Debug, Clone, Copy)]
pub struct OptionsParts<'a> {
    pub exchanges: &'a BTreeMap<String, bool>,
    pub pair_settings: &'a BTreeMap<String, PairSetting>,
    pub chart_settings: &'a BTreeMap<String, bool>,
    pub blacklist: &'a [String],
    /// Friendly or technical; encoded to technical.
    pub message_template: &'a str,
    pub strategies: &'a [Strategy],
    pub timezone: &'a str,
}

/// Every known exchange/market key, disabled.
pub fn default_exchange_filters() -> BTreeMap<String, bool> {
    Exchange::all()
        .iter()
        .flat_map(|e| FILTER_MARKETS.iter().map(move |m| (exchange_market_key(e.key(), m.key()), false)))
        .collect()
}

/// Decodes and encodes `options_json`.
pub struct OptionsCodec;

impl OptionsCodec {
    /// Decode a stored blob. Never fails: malformed sections fall back to
    /// their defaults and are logged.
    pub fn decode(options_json: &str) -> DecodedOptions {
        let root = if options_json.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(options_json) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "Malformed options_json, using defaults");
                    Value::Null
                }
            }
        };
        Self::decode_value(&root)
    }

    pub fn decode_value(root: &Value) -> DecodedOptions {
        let empty = Map::new();
        let obj = root.as_object().unwrap_or(&empty);

        let exchanges = Self::decode_exchanges(obj.get("exchanges"));
        let pair_settings = Self::decode_pair_settings(obj.get("pairSettings"));
        let chart_settings = pair_settings
            .iter()
            .filter_map(|(key, setting)| setting.send_chart.map(|flag| (key.clone(), flag)))
            .collect();
        let blacklist = Self::decode_blacklist(obj.get("blacklist"));
        let message_template = obj
            .get("messageTemplate")
            .and_then(Value::as_str)
            .map(|t| template::to_friendly(&template::migrate_legacy(t)));
        let strategies = Self::decode_strategies(obj.get("conditionalTemplates"));
        let timezone = obj
            .get("timezone")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        DecodedOptions {
            exchanges,
            pair_settings,
            chart_settings,
            blacklist,
            message_template,
            strategies,
            timezone,
        }
    }

    /// Exchange filter in any stored shape:
    /// - `{"binance_spot": true, ...}` (current)
    /// - `{"binance": true, ...}` (per exchange, applies to every market)
    /// - `["binance_spot", "bybit"]` (list of enabled entries)
    ///
    /// Known keys missing from the stored value are disabled.
    pub fn decode_exchanges(value: Option<&Value>) -> BTreeMap<String, bool> {
        let mut filters = default_exchange_filters();

        let mut enable = |key: &str, flag: bool| {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return;
            }
            if let Some((exchange, market)) = key.split_once('_') {
                filters.insert(exchange_market_key(exchange, market), flag);
            } else {
                for market in FILTER_MARKETS {
                    filters.insert(exchange_market_key(&key, market.key()), flag);
                }
            }
        };

        match value {
            Some(Value::Object(map)) => {
                if map.keys().any(|k| !k.contains('_')) {
                    debug!("Migrating per-exchange filter shape");
                }
                for (key, flag) in map {
                    let flag = match flag {
                        Value::Bool(b) => *b,
                        other => lenient::number_from_value(other).is_some_and(|v| v != 0.0),
                    };
                    enable(key, flag);
                }
            }
            Some(Value::Array(list)) => {
                debug!("Migrating list-shaped exchange filter");
                for key in list.iter().filter_map(Value::as_str) {
                    enable(key, true);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                warn!(value = %other, "Unrecognised exchange filter, all exchanges disabled");
            }
        }

        filters
    }

    fn decode_pair_settings(value: Option<&Value>) -> BTreeMap<String, PairSetting> {
        let Some(Value::Object(map)) = value else {
            return BTreeMap::new();
        };
        map.iter()
            .filter_map(|(key, raw)| match PairSetting::deserialize(raw) {
                Ok(setting) => Some((key.clone(), setting)),
                Err(e) => {
                    warn!(pair = %key, error = %e, "Dropping malformed pair setting");
                    None
                }
            })
            .collect()
    }

    /// Blacklist as upper-case symbols, deduplicated, in stored order.
    /// A comma-separated string is accepted too.
    pub fn decode_blacklist(value: Option<&Value>) -> Vec<String> {
        let raw: Vec<String> = match value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for symbol in raw {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        out
    }

    fn decode_strategies(value: Option<&Value>) -> Vec<Strategy> {
        let Some(Value::Array(items)) = value else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| match WireStrategy::deserialize(raw) {
                Ok(wire) => Some(StrategyCodec::from_wire(&wire)),
                Err(e) => {
                    warn!(position = i, error = %e, "Dropping malformed strategy");
                    None
                }
            })
            .collect()
    }

    /// Build the outbound blob. Chart flags are merged back into the pair
    /// settings; a flag for a pair without settings creates a default entry.
    pub fn encode(parts: OptionsParts<'_>) -> OptionsBlob {
        let mut pair_settings = parts.pair_settings.clone();
        for (key, flag) in parts.chart_settings {
            pair_settings.entry(key.clone()).or_default().send_chart = Some(*flag);
        }

        OptionsBlob {
            exchanges: parts.exchanges.clone(),
            pair_settings,
            blacklist: parts.blacklist.to_vec(),
            message_template: template::to_technical(parts.message_template),
            conditional_templates: parts.strategies.iter().map(StrategyCodec::to_wire).collect(),
            timezone: parts.timezone.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use spike_core::Condition;

    #[test]
    fn test_malformed_json_uses_defaults() {
        let decoded = OptionsCodec::decode("{not json");
        assert_eq!(decoded.exchanges, default_exchange_filters());
        assert!(decoded.exchanges.values().all(|enabled| !enabled));
        assert!(decoded.strategies.is_empty());
        assert_eq!(decoded.message_template, None);
    }

    #[test]
    fn test_empty_blob() {
        let decoded = OptionsCodec::decode("");
        assert_eq!(decoded, DecodedOptions {
            exchanges: default_exchange_filters(),
            ..Default::default()
        });
    }

    #[test]
    fn test_default_exchange_filters() {
        let filters = default_exchange_filters();
        assert_eq!(filters.len(), Exchange::all().len() * 2);
        assert_eq!(filters.get("binance_spot"), Some(&false));
        assert_eq!(filters.get("hyperliquid_futures"), Some(&false));
    }

    #[test]
    fn test_current_exchange_shape() {
        let filters = OptionsCodec::decode_exchanges(Some(&json!({
            "binance_spot": true,
            "bybit_futures": true,
            "gate_spot": false
        })));
        assert_eq!(filters["binance_spot"], true);
        assert_eq!(filters["bybit_futures"], true);
        assert_eq!(filters["binance_futures"], false);
    }

    #[test]
    fn test_per_exchange_shape() {
        let filters = OptionsCodec::decode_exchanges(Some(&json!({"bybit": true, "binance": false})));
        assert_eq!(filters["bybit_spot"], true);
        assert_eq!(filters["bybit_futures"], true);
        assert_eq!(filters["binance_spot"], false);
    }

    #[test]
    fn test_list_exchange_shape() {
        let filters = OptionsCodec::decode_exchanges(Some(&json!(["bitget_linear", "gate"])));
        assert_eq!(filters["bitget_futures"], true);
        assert_eq!(filters["gate_spot"], true);
        assert_eq!(filters["gate_futures"], true);
        assert_eq!(filters["bitget_spot"], false);
    }

    #[test]
    fn test_invalid_exchange_shape() {
        let filters = OptionsCodec::decode_exchanges(Some(&json!(42)));
        assert_eq!(filters, default_exchange_filters());
    }

    #[test]
    fn test_pair_settings_backfill_and_chart() {
        let decoded = OptionsCodec::decode_value(&json!({
            "pairSettings": {
                "binance_spot_BTCUSDT": {"delta": 1.5, "volume": "20000", "shadow": 30, "sendChart": true},
                "bybit_futures_ETHUSDT": {"enabled": false, "delta": 2, "note": "keep"},
                "broken": "nope"
            }
        }));
        let btc = &decoded.pair_settings["binance_spot_BTCUSDT"];
        assert!(btc.enabled);
        assert_eq!(btc.volume, Some(20000.0));
        let eth = &decoded.pair_settings["bybit_futures_ETHUSDT"];
        assert!(!eth.enabled);
        assert_eq!(eth.extra.get("note"), Some(&json!("keep")));
        assert!(!decoded.pair_settings.contains_key("broken"));
        assert_eq!(
            decoded.chart_settings,
            BTreeMap::from([("binance_spot_BTCUSDT".to_string(), true)])
        );
    }

    #[test]
    fn test_blacklist() {
        assert_eq!(
            OptionsCodec::decode_blacklist(Some(&json!(["btc", " ETH ", "btc", ""]))),
            vec!["BTC".to_string(), "ETH".to_string()]
        );
        assert_eq!(
            OptionsCodec::decode_blacklist(Some(&json!("doge, pepe"))),
            vec!["DOGE".to_string(), "PEPE".to_string()]
        );
    }

    #[test]
    fn test_template_and_timezone() {
        let decoded = OptionsCodec::decode_value(&json!({
            "messageTemplate": "{symbol}: {delta_formatted}",
            "timezone": "Europe/Moscow"
        }));
        assert_eq!(
            decoded.message_template.as_deref(),
            Some("[[Торговая пара]]: [[Дельта стрелы]]")
        );
        assert_eq!(decoded.timezone.as_deref(), Some("Europe/Moscow"));
    }

    #[test]
    fn test_strategies_decoded() {
        let decoded = OptionsCodec::decode_value(&json!({
            "conditionalTemplates": [
                {"name": "A", "conditions": [{"type": "volume", "value": 5}], "template": "{symbol}"},
                "garbage",
                {"condition": {"type": "exchange", "exchange": "bybit"}, "template": ""}
            ]
        }));
        assert_eq!(decoded.strategies.len(), 2);
        assert_eq!(decoded.strategies[0].name.as_deref(), Some("A"));
        assert_eq!(decoded.strategies[0].template, "[[Торговая пара]]");
        assert_eq!(
            decoded.strategies[1].conditions(),
            &[Condition::ExchangeMarket("bybit_spot".into())]
        );
    }

    #[test]
    fn test_loosely_typed_strategies_are_kept() {
        let decoded = OptionsCodec::decode_value(&json!({
            "conditionalTemplates": [
                {"chatId": -1001234567, "conditions": [], "template": "{symbol}"},
                {"name": "Без шаблона", "conditions": [{"type": "volume", "value": 5}], "template": null},
                {"conditions": [{"type": "symbol", "symbol": 42}, [1, 2]], "template": ""}
            ]
        }));
        assert_eq!(decoded.strategies.len(), 3);
        assert_eq!(decoded.strategies[0].chat_id.as_deref(), Some("-1001234567"));
        assert_eq!(decoded.strategies[1].name.as_deref(), Some("Без шаблона"));
        assert_eq!(decoded.strategies[1].template, "");
        assert_eq!(decoded.strategies[2].conditions(), &[Condition::symbol("42")]);
    }

    #[test]
    fn test_encode_merges_chart_flags() {
        let exchanges = BTreeMap::from([("binance_spot".to_string(), true)]);
        let pair_settings = BTreeMap::from([(
            "binance_spot_BTCUSDT".to_string(),
            PairSetting {
                delta: Some(1.0),
                ..Default::default()
            },
        )]);
        let chart_settings = BTreeMap::from([
            ("binance_spot_BTCUSDT".to_string(), true),
            ("bybit_spot_SOLUSDT".to_string(), false),
        ]);
        let blacklist = vec!["DOGE".to_string()];
        let strategies = vec![Strategy::with_conditions(vec![Condition::volume(1.0)], "[[Тень свечи]]")];

        let blob = OptionsCodec::encode(OptionsParts {
            exchanges: &exchanges,
            pair_settings: &pair_settings,
            chart_settings: &chart_settings,
            blacklist: &blacklist,
            message_template: "[[Торговая пара]] [[Направление]]",
            strategies: &strategies,
            timezone: "UTC",
        });

        let value: Value = serde_json::from_str(&blob.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "exchanges": {"binance_spot": true},
                "pairSettings": {
                    "binance_spot_BTCUSDT": {"enabled": true, "delta": 1, "sendChart": true},
                    "bybit_spot_SOLUSDT": {"enabled": true, "sendChart": false}
                },
                "blacklist": ["DOGE"],
                "messageTemplate": "{symbol} {direction}",
                "conditionalTemplates": [{
                    "enabled": true,
                    "useGlobalFilters": true,
                    "conditions": [{"type": "volume", "operator": ">=", "value": 1}],
                    "template": "{wick_formatted}"
                }],
                "timezone": "UTC"
            })
        );
    }

    #[test]
    fn test_encoded_blob_decodes_back() {
        let decoded = OptionsCodec::decode_value(&json!({
            "exchanges": {"bybit_spot": true},
            "pairSettings": {"bybit_spot_XRPUSDT": {"enabled": true, "shadow": 12, "sendChart": false}},
            "blacklist": ["LUNA"],
            "messageTemplate": "{symbol}",
            "conditionalTemplates": [{"useGlobalFilters": false, "conditions": [{"type": "delta", "valueMin": 1, "valueMax": null}], "template": "{time}"}],
            "timezone": "Asia/Tokyo"
        }));
        let template = decoded.message_template.clone().unwrap_or_default();
        let timezone = decoded.timezone.clone().unwrap_or_default();
        let blob = OptionsCodec::encode(OptionsParts {
            exchanges: &decoded.exchanges,
            pair_settings: &decoded.pair_settings,
            chart_settings: &decoded.chart_settings,
            blacklist: &decoded.blacklist,
            message_template: &template,
            strategies: &decoded.strategies,
            timezone: &timezone,
        });
        let again = OptionsCodec::decode(&blob.to_json().unwrap());
        assert_eq!(again.exchanges, decoded.exchanges);
        assert_eq!(again.pair_settings, decoded.pair_settings);
        assert_eq!(again.chart_settings, decoded.chart_settings);
        assert_eq!(again.blacklist, decoded.blacklist);
        assert_eq!(again.message_template, decoded.message_template);
        assert_eq!(again.timezone, decoded.timezone);
        assert_eq!(again.strategies[0].conditions(), decoded.strategies[0].conditions());
        assert!(!again.strategies[0].use_global_filters);
    }
}
