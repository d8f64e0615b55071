//! PancakeSwap — Uniswap V2-style router, pure net-flow swap.

use crate::context::TransactionContext;
use crate::model::EntryType;
use crate::parsers::{chain_of, make_gas_splits, net_flow_splits, to_addr, ParseResult, Parser};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

pub static PANCAKESWAP_ROUTERS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("bsc", vec!["0x10ed43c718714eb63d5aa57b78b54704e256024e", "0x13f4ea83d0bd40e75c8222255bc855a974568dd4"]),
        ("ethereum", vec!["0x13f4ea83d0bd40e75c8222255bc855a974568dd4"]),
    ])
});

pub struct PancakeSwapParser;

impl Parser for PancakeSwapParser {
    fn name(&self) -> &'static str {
        "PancakeSwapParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        PANCAKESWAP_ROUTERS.get(chain.as_str()).map(|r| r.contains(&to.as_str())).unwrap_or(false)
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);
        splits.extend(net_flow_splits(ctx, &chain));
        ParseResult { splits, entry_type: EntryType::Swap, parser_name: self.name() }
    }
}
