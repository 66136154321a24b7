//! Human-readable strategy summaries.

use crate::condition::{Condition, PercentRange, SpikeDirection};
use crate::exchange::exchange_market_display;
use crate::format::group_thousands;

/// Summary shown when nothing renders.
pub const NO_CONDITIONS: &str = "Нет условий";
/// Separator between condition fragments.
pub const FRAGMENT_SEPARATOR: &str = " • ";

/// Render one condition, or `None` when its required fields are missing.
pub fn describe_condition(condition: &Condition) -> Option<String> {
    match condition {
        Condition::Volume { value } => {
            value.map(|v| format!("Объём ≥ {} USDT", group_thousands(v)))
        }
        Condition::Delta(range) => describe_range("Дельта", range),
        Condition::WickPct(range) => describe_range("Тень", range),
        Condition::Series {
            count: Some(count),
            time_window_seconds: Some(window),
        } => Some(format!("Серия: {count} стрел за {} мин", window / 60)),
        Condition::Series { .. } => None,
        Condition::Symbol(symbol) if !symbol.is_empty() => Some(format!("Монета: {symbol}")),
        Condition::Symbol(_) => None,
        Condition::ExchangeMarket(key) if !key.is_empty() => Some(exchange_market_display(key)),
        Condition::ExchangeMarket(_) => None,
        Condition::Direction(SpikeDirection::Up) => Some("Направление: Вверх ⬆️".to_string()),
        Condition::Direction(SpikeDirection::Down) => Some("Направление: Вниз ⬇️".to_string()),
    }
}

fn describe_range(label: &str, range: &PercentRange) -> Option<String> {
    let min = range.min?;
    Some(match range.max {
        None => format!("{label} ≥ {min}%"),
        Some(max) => format!("{label} {min}% - {max}%"),
    })
}

/// Render a condition list as fragments joined with `" • "`.
pub fn describe_conditions(conditions: &[Condition]) -> String {
    let fragments: Vec<String> = conditions.iter().filter_map(describe_condition).collect();
    if fragments.is_empty() {
        NO_CONDITIONS.to_string()
    } else {
        fragments.join(FRAGMENT_SEPARATOR)
    }
}
