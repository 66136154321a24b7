//! Save-time validation of strategies that opt out of global filters.
//!
//! A strategy with `use_global_filters == false` gets no account-wide delta,
//! volume or wick thresholds from the backend, so it must define all three
//! itself. Missing filters do not touch the data; they only block saving.

use crate::strategy::{Strategy, StrategyId};
use std::collections::HashMap;

/// A filter a self-contained strategy must define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequiredFilter {
    Delta,
    Volume,
    Wick,
}

impl RequiredFilter {
    pub const ALL: [RequiredFilter; 3] = [
        RequiredFilter::Delta,
        RequiredFilter::Volume,
        RequiredFilter::Wick,
    ];

    /// Label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            RequiredFilter::Delta => "Дельта",
            RequiredFilter::Volume => "Объём",
            RequiredFilter::Wick => "Тень",
        }
    }

    /// Whether the strategy's authoritative (first) condition of this kind
    /// has its required value.
    pub fn is_present_in(self, strategy: &Strategy) -> bool {
        match self {
            RequiredFilter::Delta => strategy.delta_filter().and_then(|r| r.min).is_some(),
            RequiredFilter::Volume => strategy.volume_filter().is_some(),
            RequiredFilter::Wick => strategy.wick_filter().and_then(|r| r.min).is_some(),
        }
    }
}

/// Missing filters of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyIssue {
    strategy_name: String,
    missing: Vec<RequiredFilter>,
}

impl StrategyIssue {
    pub fn missing(&self) -> &[RequiredFilter] {
        &self.missing
    }

    pub fn missing_labels(&self) -> Vec<&'static str> {
        self.missing.iter().map(|f| f.label()).collect()
    }

    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }

    /// Message shown next to the strategy.
    pub fn message(&self) -> String {
        format!(
            "Стратегия «{}» не использует глобальные фильтры, поэтому в ней нужно указать: {}",
            self.strategy_name,
            self.missing_labels().join(", ")
        )
    }
}

/// Validation outcome for a strategy list, keyed by strategy id.
///
/// An empty report means the settings may be saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: HashMap<StrategyId, StrategyIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn get(&self, id: StrategyId) -> Option<&StrategyIssue> {
        self.issues.get(&id)
    }

    pub fn contains(&self, id: StrategyId) -> bool {
        self.issues.contains_key(&id)
    }

    /// Forget a strategy, e.g. after it was deleted.
    pub fn remove(&mut self, id: StrategyId) -> Option<StrategyIssue> {
        self.issues.remove(&id)
    }

    /// Drop one missing filter from a strategy's issue; the issue itself goes
    /// away once nothing is missing. Returns `true` if anything changed.
    pub fn clear_field(&mut self, id: StrategyId, filter: RequiredFilter) -> bool {
        let Some(issue) = self.issues.get_mut(&id) else {
            return false;
        };
        let before = issue.missing.len();
        issue.missing.retain(|f| *f != filter);
        let changed = issue.missing.len() != before;
        if issue.missing.is_empty() {
            self.issues.remove(&id);
        }
        changed
    }

    /// Clear the filters an edited strategy now satisfies, leaving every other
    /// entry alone. Never adds new issues.
    pub fn recheck(&mut self, strategy: &Strategy) {
        let id = strategy.id();
        if !strategy.requires_own_filters() {
            self.issues.remove(&id);
            return;
        }
        let satisfied: Vec<RequiredFilter> = match self.issues.get(&id) {
            Some(issue) => issue
                .missing
                .iter()
                .copied()
                .filter(|f| f.is_present_in(strategy))
                .collect(),
            None => return,
        };
        for filter in satisfied {
            self.clear_field(id, filter);
        }
    }

    /// Issues in the order of `strategies`, with their positions.
    pub fn in_order<'a>(
        &'a self,
        strategies: &'a [Strategy],
    ) -> impl Iterator<Item = (usize, &'a StrategyIssue)> + 'a {
        strategies
            .iter()
            .enumerate()
            .filter_map(move |(i, s)| self.issues.get(&s.id()).map(|issue| (i, issue)))
    }

    /// Issue of the strategy currently at `position`.
    pub fn issue_at<'a>(&'a self, strategies: &[Strategy], position: usize) -> Option<&'a StrategyIssue> {
        strategies.get(position).and_then(|s| self.issues.get(&s.id()))
    }

    /// Positions of the strategies that have issues, ascending.
    pub fn positions(&self, strategies: &[Strategy]) -> Vec<usize> {
        self.in_order(strategies).map(|(i, _)| i).collect()
    }

    /// One line per issue, in strategy order.
    pub fn summary(&self, strategies: &[Strategy]) -> String {
        self.in_order(strategies)
            .map(|(_, issue)| issue.message())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Check one strategy; `position` is only used for the fallback name.
pub fn validate_strategy(strategy: &Strategy, position: usize) -> Option<StrategyIssue> {
    if !strategy.requires_own_filters() {
        return None;
    }
    let missing: Vec<RequiredFilter> = RequiredFilter::ALL
        .into_iter()
        .filter(|f| !f.is_present_in(strategy))
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(StrategyIssue {
        strategy_name: strategy.display_name(position),
        missing,
    })
}

/// Check every strategy.
pub fn validate(strategies: &[Strategy]) -> ValidationReport {
    let issues = strategies
        .iter()
        .enumerate()
        .filter_map(|(i, s)| validate_strategy(s, i).map(|issue| (s.id(), issue)))
        .collect();
    ValidationReport { issues }
}
