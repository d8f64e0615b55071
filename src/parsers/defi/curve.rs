//! Curve pools — exchange/add_liquidity/remove_liquidity, all via
//! net-flow analysis with protocol attribution on the liquidity leg.

use crate::context::TransactionContext;
use crate::model::EntryType;
use crate::parsers::{chain_of, make_gas_splits, native_symbol, selector_of, to_addr, AccountRef, ParseResult, Parser};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

const EXCHANGE: &str = "0x3df02124";
const EXCHANGE_UNDERLYING: &str = "0xa6417ed6";
const ADD_LIQUIDITY_2: &str = "0x0b4c7e4d";
const ADD_LIQUIDITY_3: &str = "0x4515cef3";
const ADD_LIQUIDITY_4: &str = "0x029b2f34";
const REMOVE_LIQUIDITY: &str = "0xecb586a5";
const REMOVE_ONE_COIN: &str = "0x1a4d01d2";

pub static CURVE_POOLS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", vec![
            "0xbebc44782c7db0a1a60cb6fe97d0b483032ff1c7",
            "0xd51a44d3fae010294c616388b506acda1bfaae46",
            "0xdc24316b9ae028f1497c275eb9192a3ea0f67022",
            "0xdcef968d416a41cdac0ed8702fac8128a64241a2",
            "0xa1f8a6807c402e4a15ef4eba36528a3fed24e577",
        ]),
        ("arbitrum", vec!["0x7f90122bf0700f9e7e1f688fe926940e8839f353"]),
        ("polygon", vec!["0x445fe580ef8d70ff569ab36e80c647af338db351"]),
    ])
});

const PROTOCOL: &str = "curve";

pub struct CurvePoolParser;

impl Parser for CurvePoolParser {
    fn name(&self) -> &'static str {
        "CurvePoolParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        CURVE_POOLS.get(chain.as_str()).map(|pools| pools.contains(&to.as_str())).unwrap_or(false)
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let entry_type = if selector == EXCHANGE || selector == EXCHANGE_UNDERLYING {
            splits.extend(net_flows_as_splits(ctx, &chain));
            EntryType::Swap
        } else if selector == ADD_LIQUIDITY_2 || selector == ADD_LIQUIDITY_3 || selector == ADD_LIQUIDITY_4 {
            splits.extend(add_liquidity_splits(ctx, &chain));
            EntryType::Deposit
        } else if selector == REMOVE_LIQUIDITY || selector == REMOVE_ONE_COIN {
            splits.extend(remove_liquidity_splits(ctx, &chain));
            EntryType::Withdrawal
        } else {
            // Unknown Curve selector: treat as swap via net flows rather
            // than falling through (curve pools rarely do anything else).
            splits.extend(net_flows_as_splits(ctx, &chain));
            EntryType::Swap
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}

fn net_flows_as_splits(ctx: &TransactionContext, chain: &str) -> Vec<crate::parsers::ParsedSplit> {
    crate::parsers::net_flow_splits(ctx, chain)
}

fn add_liquidity_splits(ctx: &TransactionContext, chain: &str) -> Vec<crate::parsers::ParsedSplit> {
    let nat_sym = native_symbol(chain);
    let mut splits = Vec::new();
    for (addr, flows) in ctx.net_flows() {
        if !ctx.is_wallet(&addr) {
            continue;
        }
        for (tok_symbol, qty) in flows {
            if qty == Decimal::ZERO {
                continue;
            }
            if qty < Decimal::ZERO {
                let account_ref = if tok_symbol == nat_sym { AccountRef::NativeAsset } else { AccountRef::Erc20Token { token_address: String::new() } };
                splits.push(crate::parsers::ParsedSplit::new(account_ref, &tok_symbol, qty));
            } else {
                splits.push(crate::parsers::ParsedSplit::new(AccountRef::ProtocolAsset { protocol: PROTOCOL.to_string() }, &tok_symbol, qty));
            }
        }
    }
    splits
}

fn remove_liquidity_splits(ctx: &TransactionContext, chain: &str) -> Vec<crate::parsers::ParsedSplit> {
    let nat_sym = native_symbol(chain);
    let mut splits = Vec::new();
    for (addr, flows) in ctx.net_flows() {
        if !ctx.is_wallet(&addr) {
            continue;
        }
        for (tok_symbol, qty) in flows {
            if qty == Decimal::ZERO {
                continue;
            }
            if qty < Decimal::ZERO {
                splits.push(crate::parsers::ParsedSplit::new(AccountRef::ProtocolAsset { protocol: PROTOCOL.to_string() }, &tok_symbol, qty));
            } else {
                let account_ref = if tok_symbol == nat_sym { AccountRef::NativeAsset } else { AccountRef::Erc20Token { token_address: String::new() } };
                splits.push(crate::parsers::ParsedSplit::new(account_ref, &tok_symbol, qty));
            }
        }
    }
    splits
}
