//! In-memory settings session.
//!
//! Loads the stored record, migrates it into the editing model, applies user
//! edits and saves the whole model back. Strategy edits only ever clear
//! validation issues; new issues appear on the next full validation, which
//! every save runs first.

use crate::api::{SettingsApi, UserRecord};
use crate::config::{is_blacklisted, resolve_timezone, TelegramSettings};
use crate::error::{SessionError, SessionResult};
use crate::sync::EditSyncGuard;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use spike_core::template::DEFAULT_MESSAGE_TEMPLATE;
use spike_core::{
    validate, Condition, ConditionKind, Strategy, StrategyId, StrategyIssue, ValidationReport,
};
use spike_serialization::{
    default_exchange_filters, OptionsBlob, OptionsCodec, OptionsParts, PairSetting,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// In-flight markers for the save and test calls.
///
/// Cloned handles observe the same flags, so a view can poll them while the
/// session is busy awaiting the API.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    saving: Arc<AtomicBool>,
    testing: Arc<AtomicBool>,
}

impl SessionFlags {
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn is_testing(&self) -> bool {
        self.testing.load(Ordering::Acquire)
    }
}

/// Clears its flag when dropped.
struct Busy(Arc<AtomicBool>);

impl Busy {
    fn start(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for Busy {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Numeric cell of the active-filters table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairField {
    Delta,
    Volume,
    Shadow,
}

impl PairField {
    fn get(self, setting: &PairSetting) -> Option<f64> {
        match self {
            PairField::Delta => setting.delta,
            PairField::Volume => setting.volume,
            PairField::Shadow => setting.shadow,
        }
    }

    fn set(self, setting: &mut PairSetting, value: Option<f64>) {
        match self {
            PairField::Delta => setting.delta = value,
            PairField::Volume => setting.volume = value,
            PairField::Shadow => setting.shadow = value,
        }
    }
}

/// Editing session for one user's settings.
pub struct SettingsSession<A> {
    api: A,
    login: String,
    telegram: TelegramSettings,
    exchanges: BTreeMap<String, bool>,
    pair_settings: BTreeMap<String, PairSetting>,
    chart_settings: BTreeMap<String, bool>,
    blacklist: Vec<String>,
    message_template: String,
    strategies: Vec<Strategy>,
    timezone: String,
    report: ValidationReport,
    flags: SessionFlags,
    revision: u64,
    sync: EditSyncGuard,
    saved_at: Option<DateTime<Utc>>,
}

impl<A: SettingsApi> SettingsSession<A> {
    /// Fetch and migrate the stored settings. A user without a record starts
    /// from defaults.
    pub async fn load(api: A, login: impl Into<String>) -> SessionResult<Self> {
        let login = login.into();
        let record = api.fetch_user(&login).await?;
        Ok(Self::from_record(api, login, record))
    }

    pub fn from_record(api: A, login: impl Into<String>, record: Option<UserRecord>) -> Self {
        let login = login.into();
        let record = record.unwrap_or_default();
        let decoded = OptionsCodec::decode(&record.options_json);

        info!(
            login = %login,
            strategies = decoded.strategies.len(),
            pairs = decoded.pair_settings.len(),
            "Settings loaded"
        );

        Self {
            api,
            login,
            telegram: TelegramSettings::new(record.tg_token, record.chat_id),
            exchanges: decoded.exchanges,
            pair_settings: decoded.pair_settings,
            chart_settings: decoded.chart_settings,
            blacklist: decoded.blacklist,
            message_template: decoded
                .message_template
                .unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.to_string()),
            strategies: decoded.strategies,
            timezone: resolve_timezone(decoded.timezone.as_deref()),
            report: ValidationReport::default(),
            flags: SessionFlags::default(),
            revision: 0,
            sync: EditSyncGuard::default(),
            saved_at: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Bumped on every model change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.flags.is_saving()
    }

    pub fn is_testing(&self) -> bool {
        self.flags.is_testing()
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ----- account-level settings -----

    pub fn telegram(&self) -> &TelegramSettings {
        &self.telegram
    }

    pub fn edit_telegram(&mut self) {
        self.telegram.editing = true;
        self.touch();
    }

    pub fn set_telegram(&mut self, tg_token: impl Into<String>, chat_id: impl Into<String>) {
        self.telegram.tg_token = tg_token.into().trim().to_string();
        self.telegram.chat_id = chat_id.into().trim().to_string();
        self.telegram.editing = true;
        self.touch();
    }

    pub fn exchanges(&self) -> &BTreeMap<String, bool> {
        &self.exchanges
    }

    pub fn set_exchange_enabled(&mut self, key: &str, enabled: bool) {
        self.exchanges.insert(key.trim().to_lowercase(), enabled);
        self.touch();
    }

    /// Disable every known exchange/market.
    pub fn reset_exchanges(&mut self) {
        self.exchanges = default_exchange_filters();
        self.touch();
    }

    pub fn pair_settings(&self) -> &BTreeMap<String, PairSetting> {
        &self.pair_settings
    }

    pub fn chart_settings(&self) -> &BTreeMap<String, bool> {
        &self.chart_settings
    }

    pub fn set_send_chart(&mut self, pair_key: &str, send: bool) {
        self.chart_settings.insert(pair_key.to_string(), send);
        self.touch();
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Returns `false` for blank or already listed symbols.
    pub fn add_to_blacklist(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || self.blacklist.contains(&symbol) {
            return false;
        }
        self.blacklist.push(symbol);
        self.touch();
        true
    }

    pub fn remove_from_blacklist(&mut self, symbol: &str) -> bool {
        let before = self.blacklist.len();
        self.blacklist.retain(|s| !s.eq_ignore_ascii_case(symbol.trim()));
        let removed = self.blacklist.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn is_blacklisted(&self, symbol: &str) -> bool {
        is_blacklisted(&self.blacklist, symbol)
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Returns `false` and keeps the current zone if `name` is not an IANA zone.
    pub fn set_timezone(&mut self, name: &str) -> bool {
        match name.trim().parse::<Tz>() {
            Ok(tz) => {
                self.timezone = tz.name().to_string();
                self.touch();
                true
            }
            Err(_) => false,
        }
    }

    /// Friendly spelling.
    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    /// Local edit from the template editor.
    pub fn set_message_template(&mut self, template: impl Into<String>) {
        self.message_template = template.into();
        self.sync.suspend();
        self.touch();
    }

    /// Whether the template editor should pull the model now.
    pub fn should_refresh_editor(&mut self) -> bool {
        self.sync.should_refresh()
    }

    // ----- strategies -----

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn strategy(&self, id: StrategyId) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id() == id)
    }

    pub fn position_of(&self, id: StrategyId) -> Option<usize> {
        self.strategies.iter().position(|s| s.id() == id)
    }

    fn require_position(&self, id: StrategyId) -> SessionResult<usize> {
        self.position_of(id).ok_or(SessionError::UnknownStrategy)
    }

    /// Append a strategy with one empty volume condition, seeded with the
    /// current message template.
    pub fn add_strategy(&mut self) -> StrategyId {
        let strategy = Strategy::new(self.message_template.clone());
        let id = strategy.id();
        self.strategies.push(strategy);
        self.touch();
        id
    }

    /// Remove a strategy together with its validation issue. Issues of the
    /// other strategies are kept as they are.
    pub fn remove_strategy(&mut self, id: StrategyId) -> SessionResult<Strategy> {
        let position = self.require_position(id)?;
        let removed = self.strategies.remove(position);
        self.report.remove(id);
        self.touch();
        debug!(strategy = %id, position, "Strategy removed");
        Ok(removed)
    }

    /// Insert a copy right after the original.
    pub fn duplicate_strategy(&mut self, id: StrategyId) -> SessionResult<StrategyId> {
        let position = self.require_position(id)?;
        let mut copy = self.strategies[position].duplicate();
        if let Some(name) = copy.name.as_mut().filter(|n| !n.trim().is_empty()) {
            name.push_str(" (копия)");
        }
        let copy_id = copy.id();
        self.strategies.insert(position + 1, copy);
        self.touch();
        Ok(copy_id)
    }

    pub fn move_strategy(&mut self, id: StrategyId, to: usize) -> SessionResult<()> {
        let from = self.require_position(id)?;
        let len = self.strategies.len();
        if to >= len {
            return Err(SessionError::PositionOutOfRange { index: to, len });
        }
        let strategy = self.strategies.remove(from);
        self.strategies.insert(to, strategy);
        self.touch();
        Ok(())
    }

    /// Apply an edit to one strategy and clear the issues it fixes.
    pub fn update_strategy<R>(
        &mut self,
        id: StrategyId,
        edit: impl FnOnce(&mut Strategy) -> R,
    ) -> SessionResult<R> {
        let position = self.require_position(id)?;
        let strategy = &mut self.strategies[position];
        let out = edit(strategy);
        self.report.recheck(strategy);
        self.touch();
        Ok(out)
    }

    pub fn set_strategy_name(&mut self, id: StrategyId, name: &str) -> SessionResult<()> {
        let name = name.trim();
        self.update_strategy(id, |s| s.name = (!name.is_empty()).then(|| name.to_string()))
    }

    pub fn set_strategy_enabled(&mut self, id: StrategyId, enabled: bool) -> SessionResult<()> {
        self.update_strategy(id, |s| s.enabled = enabled)
    }

    pub fn set_use_global_filters(&mut self, id: StrategyId, use_global: bool) -> SessionResult<()> {
        self.update_strategy(id, |s| s.use_global_filters = use_global)
    }

    pub fn set_strategy_chat_id(&mut self, id: StrategyId, chat_id: &str) -> SessionResult<()> {
        let chat_id = chat_id.trim();
        self.update_strategy(id, |s| s.chat_id = (!chat_id.is_empty()).then(|| chat_id.to_string()))
    }

    /// Local edit from a strategy's template editor.
    pub fn set_strategy_template(&mut self, id: StrategyId, template: impl Into<String>) -> SessionResult<()> {
        let template = template.into();
        self.update_strategy(id, |s| s.template = template)?;
        self.sync.suspend();
        Ok(())
    }

    /// Append a default condition of `kind`; returns its index.
    pub fn add_condition(&mut self, id: StrategyId, kind: ConditionKind) -> SessionResult<usize> {
        self.update_strategy(id, |s| {
            s.push_condition(Condition::default_for(kind));
            s.conditions().len() - 1
        })
    }

    /// Replace a condition. Values are clamped into their valid ranges.
    pub fn set_condition(&mut self, id: StrategyId, index: usize, condition: Condition) -> SessionResult<()> {
        self.update_strategy(id, |s| {
            let condition = if s.requires_own_filters() {
                condition.normalized_as_filter()
            } else {
                condition.normalized()
            };
            s.replace_condition(index, condition)
        })??;
        Ok(())
    }

    pub fn remove_condition(&mut self, id: StrategyId, index: usize) -> SessionResult<Condition> {
        Ok(self.update_strategy(id, |s| s.remove_condition(index))??)
    }

    // ----- validation -----

    /// Validate every strategy, replacing the current report.
    pub fn validate(&mut self) -> &ValidationReport {
        self.report = validate(&self.strategies);
        &self.report
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    /// Issue of the strategy currently at `position`.
    pub fn error_at(&self, position: usize) -> Option<&StrategyIssue> {
        self.report.issue_at(&self.strategies, position)
    }

    /// Floating summary of all issues, empty when there are none.
    pub fn error_summary(&self) -> String {
        self.report.summary(&self.strategies)
    }

    // ----- saving -----

    /// Outbound options blob for the current model.
    pub fn options_blob(&self) -> OptionsBlob {
        OptionsCodec::encode(OptionsParts {
            exchanges: &self.exchanges,
            pair_settings: &self.pair_settings,
            chart_settings: &self.chart_settings,
            blacklist: &self.blacklist,
            message_template: &self.message_template,
            strategies: &self.strategies,
            timezone: &self.timezone,
        })
    }

    /// Validate, then send the whole model. Nothing in the model changes when
    /// validation or the request fails.
    pub async fn save(&mut self) -> SessionResult<()> {
        let report = validate(&self.strategies);
        if !report.is_empty() {
            warn!(login = %self.login, issues = report.len(), "Save blocked by validation");
            self.report = report.clone();
            return Err(SessionError::Validation(report));
        }
        self.report = report;

        let record = UserRecord {
            tg_token: self.telegram.tg_token.clone(),
            chat_id: self.telegram.chat_id.clone(),
            options_json: self.options_blob().to_json()?,
        };

        let result = {
            let _busy = Busy::start(&self.flags.saving);
            self.api.save_settings(&self.login, &record).await
        };

        match result {
            Ok(()) => {
                if self.telegram.has_credentials() {
                    self.telegram.mark_configured();
                }
                self.saved_at = Some(Utc::now());
                self.touch();
                info!(login = %self.login, strategies = self.strategies.len(), "Settings saved");
                Ok(())
            }
            Err(e) => {
                warn!(login = %self.login, error = %e, "Failed to save settings");
                Err(e.into())
            }
        }
    }

    /// Save from a single strategy's form, which requires a name.
    pub async fn save_strategy(&mut self, id: StrategyId) -> SessionResult<()> {
        let position = self.require_position(id)?;
        self.strategies[position].check_name()?;
        self.save().await
    }

    /// Inline edit of one active-filters cell, saved immediately. On failure
    /// only this cell returns to its previous value.
    pub async fn update_pair_cell(
        &mut self,
        pair_key: &str,
        field: PairField,
        value: Option<f64>,
    ) -> SessionResult<()> {
        let existed = self.pair_settings.contains_key(pair_key);
        let entry = self.pair_settings.entry(pair_key.to_string()).or_default();
        let previous = field.get(entry);
        field.set(entry, value);
        self.touch();

        match self.save().await {
            Ok(()) => Ok(()),
            Err(e) => {
                if !existed {
                    self.pair_settings.remove(pair_key);
                } else if let Some(entry) = self.pair_settings.get_mut(pair_key) {
                    field.set(entry, previous);
                }
                self.touch();
                warn!(pair = %pair_key, field = ?field, "Pair setting rolled back");
                Err(e)
            }
        }
    }

    /// Enable or disable one pair, saved immediately with the same rollback.
    /// A pair without settings gets a default entry.
    pub async fn set_pair_enabled(&mut self, pair_key: &str, enabled: bool) -> SessionResult<()> {
        let existed = self.pair_settings.contains_key(pair_key);
        let entry = self.pair_settings.entry(pair_key.to_string()).or_default();
        let previous = std::mem::replace(&mut entry.enabled, enabled);
        self.touch();

        let result = self.save().await;
        if result.is_err() {
            if !existed {
                self.pair_settings.remove(pair_key);
            } else if let Some(entry) = self.pair_settings.get_mut(pair_key) {
                entry.enabled = previous;
            }
            self.touch();
            warn!(pair = %pair_key, "Pair toggle rolled back");
        }
        result
    }

    /// Ask the backend to send a test message.
    pub async fn test_telegram(&mut self) -> SessionResult<()> {
        let result = {
            let _busy = Busy::start(&self.flags.testing);
            self.api.test_connection(&self.login).await
        };
        match result {
            Ok(()) => {
                info!(login = %self.login, "Telegram test message sent");
                Ok(())
            }
            Err(e) => {
                warn!(login = %self.login, error = %e, "Telegram test failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ApiResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use spike_core::{PercentRange, RequiredFilter};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        record: Option<UserRecord>,
        saved: Mutex<Vec<UserRecord>>,
        fail_with: Mutex<Option<String>>,
        observed: Mutex<Option<SessionFlags>>,
        saw_busy: AtomicBool,
        tests: Mutex<u32>,
    }

    impl FakeApi {
        fn with_options(options: Value) -> Self {
            Self {
                record: Some(UserRecord {
                    tg_token: "123:abc".to_string(),
                    chat_id: "-100".to_string(),
                    options_json: options.to_string(),
                }),
                ..Default::default()
            }
        }

        fn fail(&self, detail: &str) {
            *self.fail_with.lock().unwrap() = Some(detail.to_string());
        }

        fn server_result(&self) -> ApiResult<()> {
            match self.fail_with.lock().unwrap().clone() {
                Some(message) => Err(ApiError::Server { status: 400, message }),
                None => Ok(()),
            }
        }

        fn check_busy(&self, busy: impl Fn(&SessionFlags) -> bool) {
            if let Some(flags) = self.observed.lock().unwrap().as_ref() {
                if busy(flags) {
                    self.saw_busy.store(true, Ordering::SeqCst);
                }
            }
        }

        fn last_saved(&self) -> Value {
            let saved = self.saved.lock().unwrap();
            let record = saved.last().unwrap();
            serde_json::from_str(&record.options_json).unwrap()
        }
    }

    #[async_trait]
    impl SettingsApi for FakeApi {
        async fn fetch_user(&self, _login: &str) -> ApiResult<Option<UserRecord>> {
            Ok(self.record.clone())
        }

        async fn save_settings(&self, _login: &str, record: &UserRecord) -> ApiResult<()> {
            self.check_busy(SessionFlags::is_saving);
            self.server_result()?;
            self.saved.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn test_connection(&self, _login: &str) -> ApiResult<()> {
            self.check_busy(SessionFlags::is_testing);
            *self.tests.lock().unwrap() += 1;
            self.server_result()
        }
    }

    fn own_filters_strategy(name: &str) -> Value {
        json!({
            "name": name,
            "useGlobalFilters": false,
            "conditions": [{"type": "volume", "value": 10}],
            "template": "{symbol}"
        })
    }

    async fn session(options: Value) -> SettingsSession<FakeApi> {
        SettingsSession::load(FakeApi::with_options(options), "trader").await.unwrap()
    }

    #[tokio::test]
    async fn test_new_user_gets_defaults() {
        let session = SettingsSession::load(FakeApi::default(), "newbie").await.unwrap();
        assert_eq!(session.exchanges(), &default_exchange_filters());
        assert!(session.strategies().is_empty());
        assert_eq!(session.message_template(), DEFAULT_MESSAGE_TEMPLATE);
        assert!(session.telegram().editing);
        assert!(!session.telegram().configured);
        assert!(!session.timezone().is_empty());
    }

    #[tokio::test]
    async fn test_load_migrates_stored_options() {
        let session = session(json!({
            "exchanges": {"bybit": true},
            "pairSettings": {"bybit_spot_BTCUSDT": {"delta": "2", "sendChart": true}},
            "blacklist": ["doge"],
            "messageTemplate": "{symbol} {exchange} | {market}",
            "conditionalTemplates": [{"condition": {"type": "wick", "value": 2.5}, "template": ""}],
            "timezone": "Europe/Moscow"
        }))
        .await;

        assert_eq!(session.exchanges()["bybit_futures"], true);
        assert_eq!(session.pair_settings()["bybit_spot_BTCUSDT"].delta, Some(2.0));
        assert!(session.pair_settings()["bybit_spot_BTCUSDT"].enabled);
        assert_eq!(session.chart_settings()["bybit_spot_BTCUSDT"], true);
        assert_eq!(session.blacklist(), &["DOGE".to_string()]);
        assert!(session.is_blacklisted("DOGEUSDT"));
        assert_eq!(session.message_template(), "[[Торговая пара]] [[Биржа и тип рынка]]");
        assert_eq!(session.timezone(), "Europe/Moscow");
        assert_eq!(
            session.strategies()[0].conditions(),
            &[Condition::Delta(PercentRange::new(Some(2.5), None))]
        );
        assert!(session.telegram().configured);
    }

    #[tokio::test]
    async fn test_save_sends_technical_form() {
        let mut session = session(json!({"timezone": "UTC"})).await;
        session.set_message_template("[[Торговая пара]] [[Дельта стрелы]]");
        let id = session.add_strategy();
        session.set_strategy_name(id, " Памп ").unwrap();
        session
            .set_strategy_template(id, "[[Направление]] [[Торговая пара]] [[Дельта стрелы]]")
            .unwrap();

        session.save().await.unwrap();

        let saved = session.api().last_saved();
        assert_eq!(saved["messageTemplate"], json!("{symbol} {delta_formatted}"));
        assert_eq!(saved["timezone"], json!("UTC"));
        assert_eq!(saved["conditionalTemplates"][0]["name"], json!("Памп"));
        assert_eq!(
            saved["conditionalTemplates"][0]["template"],
            json!("{direction} {symbol} {delta_formatted}")
        );
        assert_eq!(
            saved["conditionalTemplates"][0]["conditions"],
            json!([{"type": "volume", "operator": ">="}])
        );
        let record = session.api().saved.lock().unwrap()[0].clone();
        assert_eq!(record.tg_token, "123:abc");
        assert!(session.saved_at().is_some());
    }

    #[tokio::test]
    async fn test_save_blocked_by_validation() {
        let mut session = session(json!({
            "conditionalTemplates": [own_filters_strategy("A")]
        }))
        .await;

        let report = match session.save().await {
            Err(SessionError::Validation(report)) => report,
            other => panic!("expected validation error, got {other:?}"),
        };
        let id = session.strategies()[0].id();
        assert_eq!(report.get(id).unwrap().missing_labels(), vec!["Дельта", "Тень"]);
        assert!(session.api().saved.lock().unwrap().is_empty());
        assert_eq!(session.error_at(0).unwrap().missing().len(), 2);
        assert!(session.error_summary().contains("«A»"));
    }

    #[tokio::test]
    async fn test_edits_clear_issues_incrementally() {
        let mut session = session(json!({
            "conditionalTemplates": [own_filters_strategy("A")]
        }))
        .await;
        session.validate();
        let id = session.strategies()[0].id();

        let index = session.add_condition(id, ConditionKind::Delta).unwrap();
        assert_eq!(session.error_at(0).unwrap().missing().len(), 2);

        session.set_condition(id, index, Condition::delta(0.5, None)).unwrap();
        assert_eq!(session.error_at(0).unwrap().missing(), &[RequiredFilter::Wick]);

        session.add_condition(id, ConditionKind::WickPct).unwrap();
        session.set_condition(id, 2, Condition::wick_pct(0.0, None)).unwrap();
        assert!(session.error_at(0).is_none());
        assert_eq!(session.strategy(id).unwrap().description(), "Объём ≥ 10 USDT • Дельта ≥ 0.5% • Тень ≥ 0%");

        session.set_condition(id, index, Condition::delta(0.0, None)).unwrap();
        assert_eq!(
            session.strategy(id).unwrap().delta_filter(),
            Some(PercentRange::at_least(0.01))
        );
        assert!(session.report().is_empty());

        session.save().await.unwrap();
    }

    #[tokio::test]
    async fn test_removing_strategy_keeps_other_issues() {
        let mut session = session(json!({
            "conditionalTemplates": [
                own_filters_strategy("A"),
                own_filters_strategy("B"),
                own_filters_strategy("C"),
                own_filters_strategy("D")
            ]
        }))
        .await;
        session.validate();
        assert_eq!(session.report().positions(session.strategies()), vec![0, 1, 2, 3]);

        let b = session.strategies()[1].id();
        session.remove_strategy(b).unwrap();

        assert_eq!(session.report().len(), 3);
        assert_eq!(session.error_at(0).unwrap().strategy_name(), "A");
        assert_eq!(session.error_at(1).unwrap().strategy_name(), "C");
        assert_eq!(session.error_at(2).unwrap().strategy_name(), "D");
        assert!(session.error_at(3).is_none());
    }

    #[tokio::test]
    async fn test_strategy_list_operations() {
        let mut session = session(json!({})).await;
        let first = session.add_strategy();
        let second = session.add_strategy();
        session.set_strategy_name(first, "Первая").unwrap();

        let copy = session.duplicate_strategy(first).unwrap();
        assert_eq!(session.position_of(copy), Some(1));
        assert_eq!(session.strategy(copy).unwrap().name.as_deref(), Some("Первая (копия)"));
        assert_ne!(copy, first);

        session.move_strategy(second, 0).unwrap();
        let order: Vec<StrategyId> = session.strategies().iter().map(|s| s.id()).collect();
        assert_eq!(order, vec![second, first, copy]);

        assert!(matches!(
            session.move_strategy(second, 3),
            Err(SessionError::PositionOutOfRange { index: 3, len: 3 })
        ));
        session.remove_strategy(copy).unwrap();
        assert!(matches!(session.remove_strategy(copy), Err(SessionError::UnknownStrategy)));
    }

    #[tokio::test]
    async fn test_revision_tracks_changes() {
        let mut session = session(json!({})).await;
        let start = session.revision();
        let id = session.add_strategy();
        session.set_strategy_enabled(id, false).unwrap();
        session.add_to_blacklist("pepe");
        assert!(!session.add_to_blacklist("PEPE"));
        assert_eq!(session.revision(), start + 3);
    }

    #[tokio::test]
    async fn test_save_strategy_requires_name() {
        let mut session = session(json!({})).await;
        let id = session.add_strategy();
        assert!(matches!(
            session.save_strategy(id).await,
            Err(SessionError::Strategy(spike_core::CoreError::EmptyStrategyName))
        ));
        session.set_strategy_name(id, "Named").unwrap();
        session.save_strategy(id).await.unwrap();
        assert_eq!(session.api().saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_detail() {
        let mut session = session(json!({})).await;
        session.set_telegram("bad", "-1");
        session.api().fail("Неверный токен бота");

        let err = session.save().await.unwrap_err();
        assert_eq!(err.to_string(), "Неверный токен бота");
        assert!(session.telegram().editing);
        assert_eq!(session.telegram().tg_token, "bad");
    }

    #[tokio::test]
    async fn test_save_marks_telegram_configured() {
        let mut session = SettingsSession::load(FakeApi::default(), "newbie").await.unwrap();
        session.set_telegram("123:abc", "42");
        session.save().await.unwrap();
        assert!(session.telegram().configured);
        assert!(!session.telegram().editing);
    }

    #[tokio::test]
    async fn test_pair_cell_rolls_back_on_failure() {
        let mut session = session(json!({
            "pairSettings": {"binance_spot_BTCUSDT": {"delta": 1, "volume": 5000}}
        }))
        .await;
        session.api().fail("boom");

        let result = session
            .update_pair_cell("binance_spot_BTCUSDT", PairField::Delta, Some(3.0))
            .await;
        assert!(result.is_err());
        let setting = &session.pair_settings()["binance_spot_BTCUSDT"];
        assert_eq!(setting.delta, Some(1.0));
        assert_eq!(setting.volume, Some(5000.0));

        let result = session
            .update_pair_cell("bybit_spot_ETHUSDT", PairField::Volume, Some(1.0))
            .await;
        assert!(result.is_err());
        assert!(!session.pair_settings().contains_key("bybit_spot_ETHUSDT"));
    }

    #[tokio::test]
    async fn test_pair_cell_saved() {
        let mut session = session(json!({
            "pairSettings": {"binance_spot_BTCUSDT": {"delta": 1}}
        }))
        .await;
        session
            .update_pair_cell("binance_spot_BTCUSDT", PairField::Shadow, Some(25.0))
            .await
            .unwrap();
        session.set_pair_enabled("binance_spot_BTCUSDT", false).await.unwrap();

        let saved = session.api().last_saved();
        assert_eq!(
            saved["pairSettings"]["binance_spot_BTCUSDT"],
            json!({"enabled": false, "delta": 1, "shadow": 25})
        );
    }

    #[tokio::test]
    async fn test_toggle_unknown_pair_creates_entry() {
        let mut session = session(json!({})).await;
        session.set_pair_enabled("gate_futures_SOLUSDT", false).await.unwrap();

        assert!(!session.pair_settings()["gate_futures_SOLUSDT"].enabled);
        let saved = session.api().last_saved();
        assert_eq!(saved["pairSettings"]["gate_futures_SOLUSDT"], json!({"enabled": false}));

        session.api().fail("boom");
        let result = session.set_pair_enabled("mexc_spot_PEPEUSDT", false).await;
        assert!(result.is_err());
        assert!(!session.pair_settings().contains_key("mexc_spot_PEPEUSDT"));
        assert!(!session.pair_settings()["gate_futures_SOLUSDT"].enabled);
    }

    #[tokio::test]
    async fn test_saving_flag_during_call() {
        let mut session = session(json!({})).await;
        *session.api().observed.lock().unwrap() = Some(session.flags());
        assert!(!session.is_saving());

        session.save().await.unwrap();

        assert!(session.api().saw_busy.load(Ordering::SeqCst));
        assert!(!session.is_saving());
    }

    #[tokio::test]
    async fn test_telegram_test_call() {
        let mut session = session(json!({})).await;
        *session.api().observed.lock().unwrap() = Some(session.flags());

        session.test_telegram().await.unwrap();
        assert!(session.api().saw_busy.load(Ordering::SeqCst));
        assert!(!session.is_testing());

        session.api().fail("chat not found");
        let err = session.test_telegram().await.unwrap_err();
        assert_eq!(err.to_string(), "chat not found");
        assert_eq!(*session.api().tests.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_template_edit_suspends_refresh() {
        let mut session = session(json!({})).await;
        assert!(session.should_refresh_editor());
        session.set_message_template("[[Торговая пара]]");
        assert!(!session.should_refresh_editor());
        tokio::time::advance(crate::sync::EDIT_SYNC_WINDOW).await;
        assert!(session.should_refresh_editor());
    }

    #[tokio::test]
    async fn test_timezone_setter() {
        let mut session = session(json!({"timezone": "UTC"})).await;
        assert!(session.set_timezone("Asia/Tokyo"));
        assert!(!session.set_timezone("Nowhere/Land"));
        assert_eq!(session.timezone(), "Asia/Tokyo");
    }
}
