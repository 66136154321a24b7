//! Strategy wire format (`conditionalTemplates` entries).

use crate::condition::{ConditionCodec, WireCondition};
use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use spike_core::{template, Condition, Strategy};
use tracing::{debug, warn};

/// Persisted strategy object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStrategy {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Written by old versions; regenerated from the conditions on load.
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub use_global_filters: Option<bool>,
    /// Telegram chat ids are often stored as numbers.
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Single-condition shape from before conditions became a list.
    #[serde(default, deserialize_with = "single_condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<WireCondition>,
    #[serde(default, deserialize_with = "condition_list", skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<WireCondition>>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub template: String,
}

fn wire_condition(value: &Value) -> Option<WireCondition> {
    match WireCondition::deserialize(value) {
        Ok(wire) => Some(wire),
        Err(e) => {
            warn!(error = %e, "Skipping unreadable condition");
            None
        }
    }
}

fn single_condition<'de, D>(deserializer: D) -> Result<Option<WireCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => wire_condition(&value),
        _ => None,
    })
}

/// Unreadable entries are skipped so one bad condition never costs the
/// whole strategy.
fn condition_list<'de, D>(deserializer: D) -> Result<Option<Vec<WireCondition>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(items.iter().filter_map(wire_condition).collect()),
        Some(value @ Value::Object(_)) => Some(wire_condition(&value).into_iter().collect()),
        _ => None,
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Converts strategies between the wire format and the model.
pub struct StrategyCodec;

impl StrategyCodec {
    /// Decode a persisted strategy, migrating legacy shapes.
    ///
    /// Conditions of unknown type are dropped with a warning. The template is
    /// returned in the friendly spelling for editing.
    pub fn from_wire(wire: &WireStrategy) -> Strategy {
        let raw: Vec<&WireCondition> = match (&wire.conditions, &wire.condition) {
            (Some(list), _) => list.iter().collect(),
            (None, Some(single)) => {
                debug!("Wrapping legacy single condition into a list");
                vec![single]
            }
            (None, None) => Vec::new(),
        };

        let conditions: Vec<Condition> = raw
            .into_iter()
            .filter_map(|c| match ConditionCodec::from_wire(c) {
                Ok(condition) => Some(condition),
                Err(e) => {
                    warn!(strategy = ?wire.name, error = %e, "Dropping condition");
                    None
                }
            })
            .collect();

        let template = template::to_friendly(&template::migrate_legacy(&wire.template));

        let mut strategy = Strategy::with_conditions(conditions, template);
        strategy.name = wire.name.clone();
        strategy.enabled = wire.enabled.unwrap_or(true);
        strategy.use_global_filters = wire.use_global_filters.unwrap_or(true);
        strategy.chat_id = non_empty(wire.chat_id.as_deref());
        strategy
    }

    /// Encode a strategy for saving.
    ///
    /// Both booleans are always written; name and chat id only when set.
    pub fn to_wire(strategy: &Strategy) -> WireStrategy {
        WireStrategy {
            name: non_empty(strategy.name.as_deref()),
            description: None,
            enabled: Some(strategy.enabled),
            use_global_filters: Some(strategy.use_global_filters),
            chat_id: non_empty(strategy.chat_id.as_deref()),
            condition: None,
            conditions: Some(
                strategy
                    .conditions()
                    .iter()
                    .map(ConditionCodec::to_wire)
                    .collect(),
            ),
            template: template::to_technical(&strategy.template),
        }
    }
}
