//! Exchange and market identifiers used by strategy conditions.

/// Exchange supported by the spike detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Binance,
    Bybit,
    Bitget,
    Gate,
    Hyperliquid,
}

impl Exchange {
    /// Parse from the lower-case wire key (case-insensitive).
    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Some(Exchange::Binance),
            "bybit" => Some(Exchange::Bybit),
            "bitget" => Some(Exchange::Bitget),
            "gate" => Some(Exchange::Gate),
            "hyperliquid" => Some(Exchange::Hyperliquid),
            _ => None,
        }
    }

    /// Wire key, as used in `exchange_market` and `exchanges` maps.
    pub fn key(self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Bybit => "bybit",
            Exchange::Bitget => "bitget",
            Exchange::Gate => "gate",
            Exchange::Hyperliquid => "hyperliquid",
        }
    }

    /// Display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Binance => "Binance",
            Exchange::Bybit => "Bybit",
            Exchange::Bitget => "Bitget",
            Exchange::Gate => "Gate",
            Exchange::Hyperliquid => "Hyperliquid",
        }
    }

    pub fn all() -> &'static [Exchange] {
        &[
            Exchange::Binance,
            Exchange::Bybit,
            Exchange::Bitget,
            Exchange::Gate,
            Exchange::Hyperliquid,
        ]
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Market type on an exchange.
///
/// `Linear` only survives in legacy data; new `exchange_market` values use
/// `futures` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Spot,
    Futures,
    Linear,
}

impl Market {
    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Some(Market::Spot),
            "futures" => Some(Market::Futures),
            "linear" => Some(Market::Linear),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Market::Spot => "spot",
            Market::Futures => "futures",
            Market::Linear => "linear",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Market::Spot => "Spot",
            Market::Futures => "Futures",
            Market::Linear => "Linear",
        }
    }

    /// Collapse the legacy `linear` alias into `futures`.
    #[inline]
    pub fn canonical(self) -> Self {
        match self {
            Market::Linear => Market::Futures,
            other => other,
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the combined `"{exchange}_{market}"` key, lower-cased.
///
/// The market `linear` is rewritten to `futures`.
pub fn exchange_market_key(exchange: &str, market: &str) -> String {
    let exchange = exchange.trim().to_lowercase();
    let market = market.trim().to_lowercase();
    let market = match Market::from_key(&market) {
        Some(m) => m.canonical().key().to_string(),
        None => market,
    };
    format!("{exchange}_{market}")
}

/// Render `"binance_spot"` as `"Binance Spot"`.
///
/// Unknown parts are shown verbatim. The split happens on the first `_`, so
/// exchange keys never contain an underscore.
pub fn exchange_market_display(key: &str) -> String {
    let (exchange, market) = key.split_once('_').unwrap_or((key, ""));
    let exchange = Exchange::from_key(exchange)
        .map(|e| e.as_str().to_string())
        .unwrap_or_else(|| exchange.to_string());
    let market = Market::from_key(market)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| market.to_string());
    if market.is_empty() {
        exchange
    } else {
        format!("{exchange} {market}")
    }
}
