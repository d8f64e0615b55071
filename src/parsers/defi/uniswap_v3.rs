//! Uniswap V3 — router swaps (net-flow) plus NFT-manager LP
//! mint/increase/decrease/collect via transfer consumption.

use crate::context::{TransactionContext, TransferFilter};
use crate::extractor::TransferKind;
use crate::model::EntryType;
use crate::parsers::{chain_of, from_addr, make_gas_splits, net_flow_splits, selector_of, to_addr, AccountRef, ParseResult, Parser};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub static UNISWAP_V3_ROUTERS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", vec![
            "0xe592427a0aece92de3edee1f18e0157c05861564",
            "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45",
            "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad",
        ]),
        ("arbitrum", vec!["0xe592427a0aece92de3edee1f18e0157c05861564", "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45"]),
        ("polygon", vec!["0xe592427a0aece92de3edee1f18e0157c05861564", "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45"]),
        ("optimism", vec!["0xe592427a0aece92de3edee1f18e0157c05861564", "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45"]),
        ("base", vec!["0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad"]),
    ])
});

pub static UNISWAP_V3_NFT_MANAGER: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", "0xc36442b4a4522e871399cd717abdd847ab11fe88"),
        ("arbitrum", "0xc36442b4a4522e871399cd717abdd847ab11fe88"),
        ("polygon", "0xc36442b4a4522e871399cd717abdd847ab11fe88"),
        ("optimism", "0xc36442b4a4522e871399cd717abdd847ab11fe88"),
        ("base", "0x03a520b32c04bf3beef7beb72e919cf822ed34f1"),
    ])
});

const PROTOCOL: &str = "uniswap_v3";

const MINT_SELECTOR: &str = "0x88316456";
const INCREASE_LIQUIDITY: &str = "0x219f5d17";
const DECREASE_LIQUIDITY: &str = "0x0c49ccbe";
const COLLECT_SELECTOR: &str = "0xfc6f7865";
const MULTICALL_SELECTOR: &str = "0xac9650d8";

fn all_known_addresses(chain: &str) -> HashSet<String> {
    let mut addrs: HashSet<String> = UNISWAP_V3_ROUTERS.get(chain).into_iter().flatten().map(|s| s.to_string()).collect();
    if let Some(nft) = UNISWAP_V3_NFT_MANAGER.get(chain) {
        addrs.insert(nft.to_string());
    }
    addrs
}

fn qty_of(value_units: u128, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(value_units as i128, decimals)
}

pub struct UniswapV3Parser;

impl Parser for UniswapV3Parser {
    fn name(&self) -> &'static str {
        "UniswapV3Parser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        all_known_addresses(&chain).contains(&to_addr(tx_data))
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        let selector = selector_of(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let nft_mgr = UNISWAP_V3_NFT_MANAGER.get(chain.as_str()).copied().unwrap_or("");

        let entry_type = if to == nft_mgr {
            if selector == MINT_SELECTOR || selector == INCREASE_LIQUIDITY {
                splits.extend(handle_lp_add(ctx, tx_data, &chain));
                EntryType::Deposit
            } else if selector == DECREASE_LIQUIDITY || selector == COLLECT_SELECTOR {
                splits.extend(handle_lp_remove(ctx, tx_data, &chain));
                EntryType::Withdrawal
            } else if selector == MULTICALL_SELECTOR {
                splits.extend(net_flow_splits(ctx, &chain));
                EntryType::Swap
            } else {
                return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
            }
        } else {
            splits.extend(net_flow_splits(ctx, &chain));
            EntryType::Swap
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}

fn handle_lp_add(ctx: &mut TransactionContext, tx_data: &Value, _chain: &str) -> Vec<crate::parsers::ParsedSplit> {
    let wallet = from_addr(tx_data);
    let mut splits = Vec::new();

    while let Some(t) = ctx.pop_transfer(TransferFilter { from: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) {
        let qty = qty_of(t.value_units, t.decimals);
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, &t.symbol, -qty));
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::ProtocolAsset { protocol: PROTOCOL.to_string() }, &t.symbol, qty));
    }

    while let Some(t) = ctx.pop_transfer(TransferFilter { to: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) {
        let qty = qty_of(t.value_units, t.decimals);
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::ProtocolAsset { protocol: PROTOCOL.to_string() }, &t.symbol, -qty));
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, &t.symbol, qty));
    }

    splits
}

fn handle_lp_remove(ctx: &mut TransactionContext, tx_data: &Value, _chain: &str) -> Vec<crate::parsers::ParsedSplit> {
    let wallet = from_addr(tx_data);
    let mut splits = Vec::new();

    while let Some(t) = ctx.pop_transfer(TransferFilter { to: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) {
        let qty = qty_of(t.value_units, t.decimals);
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::ProtocolAsset { protocol: PROTOCOL.to_string() }, &t.symbol, -qty));
        splits.push(crate::parsers::ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, &t.symbol, qty));
    }

    splits
}
