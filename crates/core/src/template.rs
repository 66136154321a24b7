//! Message template codec.
//!
//! Templates are plain strings. Conversion between the friendly and technical
//! spellings is literal substring replacement over the whole string, so
//! malformed placeholder syntax simply passes through untouched.

use crate::placeholder::Placeholder;

/// Message template for accounts that never saved one, friendly spelling.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "[[Направление]] [[Торговая пара]]\n\
[[Биржа и тип рынка]]\n\
Дельта: [[Дельта стрелы]]\n\
Объём: [[Объём стрелы]]\n\
Тень: [[Тень свечи]]\n\
[[Время детекта]]";

/// Old combined exchange/market spellings rewritten on load.
const LEGACY_TECHNICAL_REWRITES: &[(&str, &str)] = &[
    ("{exchange} | {market}", "{exchange_market}"),
    ("{exchange}|{market}", "{exchange_market}"),
    ("{exchange} {market}", "{exchange_market}"),
    ("{market} | {exchange}", "{exchange_market}"),
    ("{market}|{exchange}", "{exchange_market}"),
    ("{market} {exchange}", "{exchange_market}"),
];

const LEGACY_FRIENDLY_REWRITES: &[(&str, &str)] = &[
    ("[[Объём торгов]]", "[[Объём стрелы]]"),
    ("[[Биржа]] | [[Тип рынка]]", "[[Биржа и тип рынка]]"),
    ("[[Биржа]]|[[Тип рынка]]", "[[Биржа и тип рынка]]"),
    ("[[Биржа]] [[Тип рынка]]", "[[Биржа и тип рынка]]"),
    ("[[Тип рынка]] | [[Биржа]]", "[[Биржа и тип рынка]]"),
    ("[[Тип рынка]]|[[Биржа]]", "[[Биржа и тип рынка]]"),
    ("[[Тип рынка]] [[Биржа]]", "[[Биржа и тип рынка]]"),
];

fn replace_all(template: &str, pairs: impl IntoIterator<Item = (&'static str, &'static str)>) -> String {
    pairs
        .into_iter()
        .fold(template.to_string(), |acc, (from, to)| {
            if acc.contains(from) {
                acc.replace(from, to)
            } else {
                acc
            }
        })
}

/// Replace every friendly token with its technical counterpart.
pub fn to_technical(template: &str) -> String {
    replace_all(
        template,
        Placeholder::ALL.iter().map(|p| (p.friendly(), p.technical())),
    )
}

/// Replace every technical token with its friendly counterpart.
pub fn to_friendly(template: &str) -> String {
    replace_all(
        template,
        Placeholder::ALL.iter().map(|p| (p.technical(), p.friendly())),
    )
}

/// Render a template with example values for display.
///
/// Blank input renders as an empty string.
pub fn preview(template: &str) -> String {
    if template.trim().is_empty() {
        return String::new();
    }

    let technical = to_technical(template);
    let rendered = replace_all(
        &technical,
        Placeholder::ALL
            .iter()
            .flat_map(|p| [(p.technical(), p.example()), (p.friendly(), p.example())]),
    );
    rendered.trim().to_string()
}

/// Rewrite placeholder spellings from older dashboard versions.
///
/// Applied once on load; running it again is a no-op.
pub fn migrate_legacy(template: &str) -> String {
    let technical = replace_all(template, LEGACY_TECHNICAL_REWRITES.iter().copied());
    replace_all(&technical, LEGACY_FRIENDLY_REWRITES.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLES: &[&str] = &[
        "",
        "plain text",
        "[[Торговая пара]] {delta_formatted}",
        "{symbol} [[Дельта стрелы]] [[Объём стрелы]] {wick_formatted}",
        "[[Биржа и тип рынка]] / [[Биржа и тип рынка (коротко)]]",
        "{exchange_market} / {exchange_market_short}",
        "{{symbol}} [[[[Направление]]]] {unknown} [[Неизвестно]]",
        "{time}{timestamp}[[Время детекта]][[Временная метка]]",
    ];

    #[test]
    fn test_to_technical() {
        assert_eq!(
            to_technical("🚀 [[Торговая пара]] [[Дельта стрелы]] on [[Биржа и тип рынка (коротко)]]"),
            "🚀 {symbol} {delta_formatted} on {exchange_market_short}"
        );
    }

    #[test]
    fn test_to_friendly() {
        assert_eq!(
            to_friendly("{direction} {symbol}: {volume_formatted}, wick {wick_formatted}"),
            "[[Направление]] [[Торговая пара]]: [[Объём стрелы]], wick [[Тень свечи]]"
        );
    }

    #[test]
    fn test_replaces_all_occurrences() {
        assert_eq!(
            to_technical("[[Торговая пара]] [[Торговая пара]]"),
            "{symbol} {symbol}"
        );
    }

    #[test]
    fn test_roundtrip_through_inverse() {
        for s in SAMPLES {
            assert_eq!(to_friendly(&to_technical(s)), to_friendly(s), "input: {s}");
            assert_eq!(to_technical(&to_friendly(s)), to_technical(s), "input: {s}");
        }
    }

    #[test]
    fn test_idempotent() {
        for s in SAMPLES {
            let technical = to_technical(s);
            assert_eq!(to_technical(&technical), technical);
            let friendly = to_friendly(s);
            assert_eq!(to_friendly(&friendly), friendly);
        }
    }

    #[test]
    fn test_unbalanced_syntax_passes_through() {
        assert_eq!(to_technical("[[Торговая пара] {symbol"), "[[Торговая пара] {symbol");
        assert_eq!(to_friendly("{symbol {delta_formatted"), "{symbol {delta_formatted");
    }

    #[test]
    fn test_preview_blank() {
        assert_eq!(preview(""), "");
        assert_eq!(preview("   "), "");
        assert_eq!(preview("\n\t"), "");
    }

    #[test]
    fn test_preview_tokens() {
        assert_eq!(preview("[[Объём стрелы]]"), "1.5K$");
        assert_eq!(preview("{volume_formatted}"), "1.5K$");
        assert_eq!(
            preview("  [[Направление]] {symbol} [[Дельта стрелы]] [[Биржа и тип рынка]]  "),
            "🟢 BTC-USDT 5.23% BINANCE | SPOT"
        );
        assert_eq!(
            preview("[[Биржа и тип рынка (коротко)]] {time} {timestamp} [[Тень свечи]]"),
            "Bin_S 15.01.24 14:30:25 1699123456789 45.2%"
        );
    }

    #[test]
    fn test_migrate_legacy_exchange_market() {
        assert_eq!(migrate_legacy("{exchange} | {market}"), "{exchange_market}");
        assert_eq!(migrate_legacy("{exchange} {market}"), "{exchange_market}");
        assert_eq!(migrate_legacy("{market} | {exchange}!"), "{exchange_market}!");
        assert_eq!(migrate_legacy("{exchange}"), "{exchange}");
    }

    #[test]
    fn test_migrate_legacy_friendly() {
        assert_eq!(migrate_legacy("[[Объём торгов]]"), "[[Объём стрелы]]");
        assert_eq!(
            migrate_legacy("[[Биржа]] | [[Тип рынка]] [[Торговая пара]]"),
            "[[Биржа и тип рынка]] [[Торговая пара]]"
        );
    }

    #[test]
    fn test_migrate_legacy_idempotent() {
        let once = migrate_legacy("{exchange}|{market} [[Объём торгов]] [[Тип рынка]] [[Биржа]]");
        assert_eq!(once, "{exchange_market} [[Объём стрелы]] [[Биржа и тип рынка]]");
        assert_eq!(migrate_legacy(&once), once);
    }

    #[test]
    fn test_default_template_uses_known_placeholders() {
        assert!(!to_technical(DEFAULT_MESSAGE_TEMPLATE).contains("[["));
    }
}
