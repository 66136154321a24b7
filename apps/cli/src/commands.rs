//! Subcommand implementations.

use crate::config::ConnectionArgs;
use spike_core::template::{self, DEFAULT_MESSAGE_TEMPLATE};
use spike_core::{validate, Strategy, ValidationReport};
use spike_serialization::{DecodedOptions, OptionsCodec, OptionsParts};
use spike_settings::{
    resolve_timezone, ApiError, HttpSettingsApi, SessionError, SettingsApi, SettingsSession,
    UserRecord,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} strategies need their own filters")]
    Invalid(usize),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to encode options: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

async fn read_options(path: &Path) -> CliResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn connect(args: &ConnectionArgs) -> CliResult<(HttpSettingsApi, String)> {
    let config = args.client_config();
    let login = config.require_login()?.to_string();
    Ok((HttpSettingsApi::new(config)?, login))
}

/// One block per strategy: header, description, validation message.
pub fn render_strategies(strategies: &[Strategy], report: &ValidationReport) -> String {
    if strategies.is_empty() {
        return "Стратегий нет".to_string();
    }
    let mut out = Vec::with_capacity(strategies.len());
    for (i, strategy) in strategies.iter().enumerate() {
        let state = if strategy.enabled { "вкл" } else { "выкл" };
        let filters = if strategy.use_global_filters {
            "глобальные фильтры"
        } else {
            "свои фильтры"
        };
        let mut block = format!(
            "{}. {} [{}, {}]\n   {}",
            i + 1,
            strategy.display_name(i),
            state,
            filters,
            strategy.description()
        );
        if let Some(chat) = &strategy.chat_id {
            block.push_str(&format!("\n   чат: {chat}"));
        }
        if let Some(issue) = report.issue_at(strategies, i) {
            block.push_str(&format!("\n   ⚠ {}", issue.message()));
        }
        out.push(block);
    }
    out.join("\n")
}

fn encode_decoded(decoded: &DecodedOptions) -> CliResult<String> {
    let message_template = decoded
        .message_template
        .as_deref()
        .unwrap_or(DEFAULT_MESSAGE_TEMPLATE);
    let timezone = resolve_timezone(decoded.timezone.as_deref());
    let blob = OptionsCodec::encode(OptionsParts {
        exchanges: &decoded.exchanges,
        pair_settings: &decoded.pair_settings,
        chart_settings: &decoded.chart_settings,
        blacklist: &decoded.blacklist,
        message_template,
        strategies: &decoded.strategies,
        timezone: &timezone,
    });
    Ok(serde_json::to_string_pretty(&blob)?)
}

pub async fn show(args: &ConnectionArgs) -> CliResult<()> {
    let (api, login) = connect(args)?;
    let mut session = SettingsSession::load(api, login).await?;
    session.validate();

    let telegram = session.telegram();
    println!(
        "Telegram: {}",
        if telegram.configured { "настроен" } else { "не настроен" }
    );
    println!("Часовой пояс: {}", session.timezone());
    let enabled: Vec<&str> = session
        .exchanges()
        .iter()
        .filter(|(_, on)| **on)
        .map(|(key, _)| key.as_str())
        .collect();
    println!("Биржи: {}", if enabled.is_empty() { "-".to_string() } else { enabled.join(", ") });
    println!("Чёрный список: {}", session.blacklist().join(", "));
    println!("Шаблон:\n{}\n", template::preview(session.message_template()));
    println!("{}", render_strategies(session.strategies(), session.report()));
    Ok(())
}

pub async fn validate_file(path: &Path) -> CliResult<()> {
    let decoded = OptionsCodec::decode(&read_options(path).await?);
    let report = validate(&decoded.strategies);
    println!("{}", render_strategies(&decoded.strategies, &report));
    if report.is_empty() {
        info!(strategies = decoded.strategies.len(), "All strategies valid");
        Ok(())
    } else {
        Err(CliError::Invalid(report.len()))
    }
}

pub async fn describe_file(path: &Path) -> CliResult<()> {
    let decoded = OptionsCodec::decode(&read_options(path).await?);
    for (i, strategy) in decoded.strategies.iter().enumerate() {
        println!("{}: {}", strategy.display_name(i), strategy.description());
    }
    Ok(())
}

pub fn preview(input: &str) {
    println!("{}", template::preview(input));
}

pub async fn migrate_file(path: &Path) -> CliResult<()> {
    let decoded = OptionsCodec::decode(&read_options(path).await?);
    println!("{}", encode_decoded(&decoded)?);
    Ok(())
}

/// Replace the stored options with a local file, keeping Telegram credentials.
pub async fn save_file(args: &ConnectionArgs, path: &Path) -> CliResult<()> {
    let options_json = read_options(path).await?;
    let (api, login) = connect(args)?;
    let stored = api.fetch_user(&login).await?.unwrap_or_default();
    let record = UserRecord {
        options_json,
        ..stored
    };

    let mut session = SettingsSession::from_record(api, login, Some(record));
    match session.save().await {
        Err(SessionError::Validation(report)) => {
            println!("{}", render_strategies(session.strategies(), &report));
            Err(CliError::Invalid(report.len()))
        }
        other => {
            other?;
            println!("Сохранено");
            Ok(())
        }
    }
}

pub async fn test_connection(args: &ConnectionArgs) -> CliResult<()> {
    let (api, login) = connect(args)?;
    let mut session = SettingsSession::from_record(api, login, None);
    session.test_telegram().await?;
    println!("Тестовое сообщение отправлено");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use spike_core::Condition;

    #[test]
    fn test_render_strategies() {
        let mut named = Strategy::with_conditions(vec![Condition::volume(1_500_000.0)], "");
        named.name = Some("Объёмы".to_string());
        named.chat_id = Some("-100".to_string());
        let mut own = Strategy::with_conditions(Vec::new(), "");
        own.use_global_filters = false;
        own.enabled = false;
        let mut checked = own.clone();
        checked.enabled = true;

        let strategies = vec![named, own, checked];
        let report = validate(&strategies);
        assert_eq!(
            render_strategies(&strategies, &report),
            "1. Объёмы [вкл, глобальные фильтры]\n   Объём ≥ 1 500 000 USDT\n   чат: -100\n\
             2. Стратегия #2 [выкл, свои фильтры]\n   Нет условий\n\
             3. Стратегия #3 [вкл, свои фильтры]\n   Нет условий\n   \
             ⚠ Стратегия «Стратегия #3» не использует глобальные фильтры, поэтому в ней нужно указать: Дельта, Объём, Тень"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_strategies(&[], &ValidationReport::default()), "Стратегий нет");
    }

    #[test]
    fn test_encode_decoded_migrates() {
        let decoded = OptionsCodec::decode_value(&json!({
            "messageTemplate": "{exchange} | {market}",
            "conditionalTemplates": [{"condition": {"type": "market", "market": "linear"}, "template": ""}],
            "timezone": "Europe/Berlin"
        }));
        let out: Value = serde_json::from_str(&encode_decoded(&decoded).unwrap()).unwrap();
        assert_eq!(out["messageTemplate"], json!("{exchange_market}"));
        assert_eq!(out["timezone"], json!("Europe/Berlin"));
        assert_eq!(
            out["conditionalTemplates"][0]["conditions"],
            json!([{"type": "exchange_market", "operator": ">=", "exchange_market": "binance_futures"}])
        );
    }
}
