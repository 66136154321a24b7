//! Detection strategies.

use crate::condition::{Condition, ConditionKind, PercentRange};
use crate::describe::describe_conditions;
use crate::error::{CoreError, CoreResult};
use uuid::Uuid;

/// Opaque in-memory identity of a strategy.
///
/// Generated when the strategy enters a session and never persisted, so it
/// stays stable while strategies are inserted, removed or reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId(Uuid);

impl StrategyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named rule: all conditions ANDed together plus a notification template.
///
/// The template is held in the friendly placeholder spelling while editing;
/// the wire codec converts it to the technical spelling on save.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    id: StrategyId,
    pub name: Option<String>,
    description: String,
    pub enabled: bool,
    /// When `false`, the conditions must carry their own delta, volume and
    /// wick filters.
    pub use_global_filters: bool,
    conditions: Vec<Condition>,
    pub template: String,
    /// Overrides the account-wide chat id.
    pub chat_id: Option<String>,
}

impl Strategy {
    /// New strategy with one empty volume condition and the given template.
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_conditions(vec![Condition::default_for(ConditionKind::Volume)], template)
    }

    pub fn with_conditions(conditions: Vec<Condition>, template: impl Into<String>) -> Self {
        let mut strategy = Self {
            id: StrategyId::new(),
            name: None,
            description: String::new(),
            enabled: true,
            use_global_filters: true,
            conditions,
            template: template.into(),
            chat_id: None,
        };
        strategy.refresh_description();
        strategy
    }

    pub fn id(&self) -> StrategyId {
        self.id
    }

    /// Same content under a fresh id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: StrategyId::new(),
            ..self.clone()
        }
    }

    /// Cached summary of the conditions.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.conditions = conditions;
        self.refresh_description();
    }

    pub fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
        self.refresh_description();
    }

    /// Replace the condition at `index`.
    pub fn replace_condition(&mut self, index: usize, condition: Condition) -> CoreResult<()> {
        let len = self.conditions.len();
        let slot = self
            .conditions
            .get_mut(index)
            .ok_or(CoreError::ConditionIndexOutOfRange { index, len })?;
        *slot = condition;
        self.refresh_description();
        Ok(())
    }

    pub fn remove_condition(&mut self, index: usize) -> CoreResult<Condition> {
        let len = self.conditions.len();
        if index >= len {
            return Err(CoreError::ConditionIndexOutOfRange { index, len });
        }
        let removed = self.conditions.remove(index);
        self.refresh_description();
        Ok(removed)
    }

    fn refresh_description(&mut self) {
        self.description = describe_conditions(&self.conditions);
    }

    /// First volume condition's value. Later volume conditions are ignored.
    pub fn volume_filter(&self) -> Option<f64> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Volume { value } => Some(*value),
            _ => None,
        })?
    }

    /// First delta condition's range.
    pub fn delta_filter(&self) -> Option<PercentRange> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Delta(range) => Some(*range),
            _ => None,
        })
    }

    /// First wick condition's range.
    pub fn wick_filter(&self) -> Option<PercentRange> {
        self.conditions.iter().find_map(|c| match c {
            Condition::WickPct(range) => Some(*range),
            _ => None,
        })
    }

    /// Whether the validator applies to this strategy.
    #[inline]
    pub fn requires_own_filters(&self) -> bool {
        self.enabled && !self.use_global_filters
    }

    /// Trimmed name, required before saving a single strategy.
    pub fn check_name(&self) -> CoreResult<&str> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(CoreError::EmptyStrategyName),
        }
    }

    /// Name for messages, falling back to the 1-based position.
    pub fn display_name(&self, position: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Стратегия #{}", position + 1),
        }
    }
}
