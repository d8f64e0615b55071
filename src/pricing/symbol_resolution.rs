//! Symbol → provider-ID resolution shared by both price providers
//! (spec §4.5 step 3a–3c).

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Common symbol → CoinGecko coin ID.
pub static SYMBOL_TO_COINGECKO: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ETH", "ethereum"),
        ("BTC", "bitcoin"),
        ("WETH", "ethereum"),
        ("WBTC", "bitcoin"),
        ("USDC", "usd-coin"),
        ("USDT", "tether"),
        ("DAI", "dai"),
        ("FRAX", "frax"),
        ("USDS", "usds"),
        ("MATIC", "matic-network"),
        ("BNB", "binancecoin"),
        ("AVAX", "avalanche-2"),
        ("LINK", "chainlink"),
        ("UNI", "uniswap"),
        ("AAVE", "aave"),
        ("CRV", "curve-dao-token"),
        ("MKR", "maker"),
        ("COMP", "compound-governance-token"),
        ("SNX", "havven"),
        ("SUSHI", "sushi"),
        ("1INCH", "1inch"),
        ("STETH", "staked-ether"),
        ("WSTETH", "wrapped-steth"),
        ("RETH", "rocket-pool-eth"),
        ("CBETH", "coinbase-wrapped-staked-eth"),
        ("FRXETH", "frax-ether"),
        ("SOL", "solana"),
        ("WSOL", "solana"),
        ("RAY", "raydium"),
        ("JUP", "jupiter-exchange-solana"),
        ("BONK", "bonk"),
        ("GRT", "the-graph"),
        ("LDO", "lido-dao"),
        ("RPL", "rocket-pool"),
        ("PENDLE", "pendle"),
        ("ARB", "arbitrum"),
        ("OP", "optimism"),
        ("DOGE", "dogecoin"),
        ("SHIB", "shiba-inu"),
        ("PEPE", "pepe"),
        ("WLD", "worldcoin-wld"),
        ("FET", "fetch-ai"),
        ("ENA", "ethena"),
        ("GHO", "gho"),
        ("EIGEN", "eigenlayer"),
        ("ANKR", "ankr"),
        ("BCH", "bitcoin-cash"),
        ("WBETH", "wrapped-beacon-ether"),
        ("XRP", "ripple"),
    ])
});

/// Stablecoins priced at a flat $1 rather than queried from a provider.
pub static STABLECOINS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["USDC", "USDT", "DAI", "FRAX", "USDS", "BUSD", "TUSD", "LUSD", "GUSD", "PYUSD"]));

/// CryptoCompare symbol overrides for wrapped/staked variants it
/// doesn't recognize directly.
pub static CRYPTOCOMPARE_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("WETH", "ETH"),
        ("WBTC", "BTC"),
        ("WSOL", "SOL"),
        ("WBETH", "ETH"),
        ("STETH", "ETH"),
        ("WSTETH", "ETH"),
        ("RETH", "ETH"),
        ("CBETH", "ETH"),
        ("FRXETH", "ETH"),
    ])
});

/// Strips a known protocol receipt-token prefix off `upper`, returning
/// the underlying symbol (still uppercased, `W`-prefix intact).
fn strip_protocol_prefix(upper: &str) -> Option<String> {
    if let Some(rest) = upper.strip_prefix("AETH") {
        return Some(rest.to_string());
    }
    if let Some(rest) = upper.strip_prefix('C') {
        if let Some(rest) = rest.strip_suffix("V3") {
            return Some(rest.to_string());
        }
    }
    if let Some(rest) = upper.strip_prefix("SP") {
        if !rest.is_empty() {
            return Some(rest.to_string());
        }
    }
    if upper != "STETH" {
        if let Some(rest) = upper.strip_prefix("ST") {
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

/// Resolves a token symbol to a CoinGecko coin ID. Returns `None` for
/// debt tokens and anything with no known mapping.
pub fn resolve_coingecko_id(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();

    if let Some(id) = SYMBOL_TO_COINGECKO.get(upper.as_str()) {
        return Some(id);
    }

    if upper.contains("DEBT") {
        return None;
    }

    let underlying = strip_protocol_prefix(&upper)?;
    SYMBOL_TO_COINGECKO
        .get(underlying.as_str())
        .or_else(|| SYMBOL_TO_COINGECKO.get(format!("W{underlying}").as_str()))
        .copied()
}

/// Resolves a token symbol to CryptoCompare's expected ticker.
pub fn resolve_cryptocompare_symbol(symbol: &str) -> Option<String> {
    let upper = symbol.to_uppercase();

    if let Some(overridden) = CRYPTOCOMPARE_OVERRIDES.get(upper.as_str()) {
        return Some((*overridden).to_string());
    }

    if upper.contains("DEBT") {
        return None;
    }

    if let Some(underlying) = strip_protocol_prefix(&upper) {
        let underlying = underlying.strip_prefix('W').unwrap_or(&underlying);
        return if underlying.is_empty() { None } else { Some(underlying.to_string()) };
    }

    Some(upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_direct_mapping() {
        assert_eq!(resolve_coingecko_id("eth"), Some("ethereum"));
        assert_eq!(resolve_coingecko_id("WBTC"), Some("bitcoin"));
    }

    #[test]
    fn resolves_aave_receipt_token_to_underlying() {
        assert_eq!(resolve_coingecko_id("aEthWETH"), Some("ethereum"));
    }

    #[test]
    fn skips_debt_tokens() {
        assert_eq!(resolve_coingecko_id("variableDebtWETH"), None);
        assert_eq!(resolve_cryptocompare_symbol("variableDebtWETH"), None);
    }

    #[test]
    fn cryptocompare_falls_back_to_symbol_as_is() {
        assert_eq!(resolve_cryptocompare_symbol("LINK"), Some("LINK".to_string()));
    }
}
