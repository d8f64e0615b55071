//! Chain+address -> parser lookup with a fallback chain (spec §4.3.1).

use super::binance::{BinanceDepositParser, BinanceTradeParser, BinanceWithdrawalParser};
use super::defi::{
    AaveV3Parser, CurvePoolParser, LidoParser, MetaMorphoVaultParser, MorphoBlueParser, PancakeSwapParser, PendleParser, UniswapV3Parser,
    AAVE_V3_POOL, CURVE_POOLS, LIDO_STETH, LIDO_WSTETH, METAMORPHO_VAULTS, MORPHO_BLUE, PANCAKESWAP_ROUTERS, PENDLE_ROUTER, PENDLE_ROUTER_V4,
    UNISWAP_V3_NFT_MANAGER, UNISWAP_V3_ROUTERS,
};
use super::{GenericEvmParser, GenericSwapParser, Parser};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps (chain, contract_address) -> specific parser, with a fallback
/// chain of GenericSwapParser -> GenericEvmParser for anything unmatched.
/// Chain-level parsers (CEX chains) never fall back to the generic EVM
/// chain — there is no EVM transaction shape to fall back to.
pub struct ParserRegistry {
    parsers: HashMap<String, HashMap<String, Arc<dyn Parser>>>,
    chain_parsers: HashMap<String, Vec<Arc<dyn Parser>>>,
    fallback_chain: Vec<Arc<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
            chain_parsers: HashMap::new(),
            fallback_chain: vec![Arc::new(GenericSwapParser), Arc::new(GenericEvmParser)],
        }
    }

    pub fn register(&mut self, chain: &str, address: &str, parser: Arc<dyn Parser>) {
        self.parsers.entry(chain.to_string()).or_default().insert(address.to_lowercase(), parser);
    }

    /// Register parsers for an entire chain (e.g. CEX chains).
    pub fn register_chain_parsers(&mut self, chain: &str, parsers: Vec<Arc<dyn Parser>>) {
        self.chain_parsers.insert(chain.to_string(), parsers);
    }

    pub fn register_protocol(&mut self, chain: &str, protocol_parsers: &[(&str, Arc<dyn Parser>)]) {
        for (address, parser) in protocol_parsers {
            self.register(chain, address, parser.clone());
        }
    }

    /// Ordered candidate list: specific parser first (if any), then
    /// chain parsers or the generic fallback chain.
    pub fn get(&self, chain: &str, address: Option<&str>) -> Vec<Arc<dyn Parser>> {
        let specific = address.and_then(|a| self.parsers.get(chain)).and_then(|m| m.get(&address.unwrap().to_lowercase())).cloned();

        if let Some(chain_list) = self.chain_parsers.get(chain) {
            return match specific {
                Some(p) => std::iter::once(p).chain(chain_list.iter().cloned()).collect(),
                None => chain_list.clone(),
            };
        }

        match specific {
            Some(p) => std::iter::once(p).chain(self.fallback_chain.iter().cloned()).collect(),
            None => self.fallback_chain.clone(),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wires up every protocol parser against its known contract addresses.
pub fn build_default_registry() -> ParserRegistry {
    let mut registry = ParserRegistry::new();

    let aave_parser: Arc<dyn Parser> = Arc::new(AaveV3Parser);
    for (chain, pool_addr) in AAVE_V3_POOL.iter() {
        registry.register(chain, pool_addr, aave_parser.clone());
    }

    let uni_parser: Arc<dyn Parser> = Arc::new(UniswapV3Parser);
    for (chain, routers) in UNISWAP_V3_ROUTERS.iter() {
        for addr in routers {
            registry.register(chain, addr, uni_parser.clone());
        }
    }
    for (chain, nft_addr) in UNISWAP_V3_NFT_MANAGER.iter() {
        registry.register(chain, nft_addr, uni_parser.clone());
    }

    let curve_parser: Arc<dyn Parser> = Arc::new(CurvePoolParser);
    for (chain, pools) in CURVE_POOLS.iter() {
        for addr in pools {
            registry.register(chain, addr, curve_parser.clone());
        }
    }

    let pancake_parser: Arc<dyn Parser> = Arc::new(PancakeSwapParser);
    for (chain, routers) in PANCAKESWAP_ROUTERS.iter() {
        for addr in routers {
            registry.register(chain, addr, pancake_parser.clone());
        }
    }

    let morpho_parser: Arc<dyn Parser> = Arc::new(MorphoBlueParser);
    for (chain, pool_addr) in MORPHO_BLUE.iter() {
        registry.register(chain, pool_addr, morpho_parser.clone());
    }

    let metamorpho_parser: Arc<dyn Parser> = Arc::new(MetaMorphoVaultParser);
    for (chain, vaults) in METAMORPHO_VAULTS.iter() {
        for addr in vaults {
            registry.register(chain, addr, metamorpho_parser.clone());
        }
    }

    let lido_parser: Arc<dyn Parser> = Arc::new(LidoParser);
    for (chain, addr) in LIDO_STETH.iter() {
        registry.register(chain, addr, lido_parser.clone());
    }
    for (chain, addr) in LIDO_WSTETH.iter() {
        registry.register(chain, addr, lido_parser.clone());
    }

    let pendle_parser: Arc<dyn Parser> = Arc::new(PendleParser);
    for (chain, addr) in PENDLE_ROUTER.iter() {
        registry.register(chain, addr, pendle_parser.clone());
    }
    for (chain, addr) in PENDLE_ROUTER_V4.iter() {
        registry.register(chain, addr, pendle_parser.clone());
    }

    registry.register_chain_parsers(
        "binance",
        vec![Arc::new(BinanceTradeParser), Arc::new(BinanceDepositParser), Arc::new(BinanceWithdrawalParser)],
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_evm_address_falls_back_to_generic_chain() {
        let registry = build_default_registry();
        let candidates = registry.get("ethereum", Some("0x000000000000000000000000000000deadbeef"));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name(), "GenericSwapParser");
        assert_eq!(candidates[1].name(), "GenericEvmParser");
    }

    #[test]
    fn aave_pool_address_resolves_to_aave_parser_first() {
        let registry = build_default_registry();
        let pool = AAVE_V3_POOL.get("ethereum").unwrap();
        let candidates = registry.get("ethereum", Some(pool));
        assert_eq!(candidates[0].name(), "AaveV3Parser");
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn binance_chain_never_falls_back_to_generic_evm() {
        let registry = build_default_registry();
        let candidates = registry.get("binance", None);
        assert!(candidates.iter().all(|p| p.name() != "GenericEvmParser"));
    }
}
