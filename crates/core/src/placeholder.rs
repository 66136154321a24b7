//! Template placeholders.
//!
//! Every placeholder has two spellings: a friendly bracket token shown in the
//! editor (`[[Дельта стрелы]]`) and a technical token stored on the wire and
//! substituted by the notification backend (`{delta_formatted}`).

/// A template variable understood by the notification backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Delta,
    Direction,
    ExchangeMarket,
    ExchangeMarketShort,
    Symbol,
    Volume,
    Wick,
    Time,
    Timestamp,
}

impl Placeholder {
    /// All placeholders in translation order.
    pub const ALL: [Placeholder; 9] = [
        Placeholder::Delta,
        Placeholder::Direction,
        Placeholder::ExchangeMarket,
        Placeholder::ExchangeMarketShort,
        Placeholder::Symbol,
        Placeholder::Volume,
        Placeholder::Wick,
        Placeholder::Time,
        Placeholder::Timestamp,
    ];

    /// Human-readable token used in the editor.
    pub fn friendly(self) -> &'static str {
        match self {
            Placeholder::Delta => "[[Дельта стрелы]]",
            Placeholder::Direction => "[[Направление]]",
            Placeholder::ExchangeMarket => "[[Биржа и тип рынка]]",
            Placeholder::ExchangeMarketShort => "[[Биржа и тип рынка (коротко)]]",
            Placeholder::Symbol => "[[Торговая пара]]",
            Placeholder::Volume => "[[Объём стрелы]]",
            Placeholder::Wick => "[[Тень свечи]]",
            Placeholder::Time => "[[Время детекта]]",
            Placeholder::Timestamp => "[[Временная метка]]",
        }
    }

    /// Machine token stored in templates.
    pub fn technical(self) -> &'static str {
        match self {
            Placeholder::Delta => "{delta_formatted}",
            Placeholder::Direction => "{direction}",
            Placeholder::ExchangeMarket => "{exchange_market}",
            Placeholder::ExchangeMarketShort => "{exchange_market_short}",
            Placeholder::Symbol => "{symbol}",
            Placeholder::Volume => "{volume_formatted}",
            Placeholder::Wick => "{wick_formatted}",
            Placeholder::Time => "{time}",
            Placeholder::Timestamp => "{timestamp}",
        }
    }

    /// Example value used by template previews.
    pub fn example(self) -> &'static str {
        match self {
            Placeholder::Delta => "5.23%",
            Placeholder::Direction => "🟢",
            Placeholder::ExchangeMarket => "BINANCE | SPOT",
            Placeholder::ExchangeMarketShort => "Bin_S",
            Placeholder::Symbol => "BTC-USDT",
            Placeholder::Volume => "1.5K$",
            Placeholder::Wick => "45.2%",
            Placeholder::Time => "15.01.24 14:30:25",
            Placeholder::Timestamp => "1699123456789",
        }
    }

    pub fn from_friendly(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.friendly() == token)
    }

    pub fn from_technical(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.technical() == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_unique() {
        let friendly: HashSet<_> = Placeholder::ALL.iter().map(|p| p.friendly()).collect();
        let technical: HashSet<_> = Placeholder::ALL.iter().map(|p| p.technical()).collect();
        assert_eq!(friendly.len(), 9);
        assert_eq!(technical.len(), 9);
    }

    #[test]
    fn test_reverse_lookup() {
        for p in Placeholder::ALL {
            assert_eq!(Placeholder::from_friendly(p.friendly()), Some(p));
            assert_eq!(Placeholder::from_technical(p.technical()), Some(p));
        }
        assert_eq!(Placeholder::from_technical("{exchange}"), None);
        assert_eq!(Placeholder::from_friendly("[[Биржа]]"), None);
    }

    #[test]
    fn test_short_token_is_not_prefixed_by_long_token() {
        // Literal replacement of the full-name token must not touch the short one.
        let short = Placeholder::ExchangeMarketShort;
        assert!(!short.friendly().contains(Placeholder::ExchangeMarket.friendly()));
        assert!(!short.technical().contains(Placeholder::ExchangeMarket.technical()));
    }
}
