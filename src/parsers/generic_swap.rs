use super::{chain_of, make_gas_splits, native_symbol, AccountRef, ParseResult, ParsedSplit, Parser};
use crate::context::TransactionContext;
use crate::model::EntryType;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashSet;

/// Detects a swap pattern (>=1 token out, >=1 different token in) for
/// any DEX without knowing the protocol, via net flows alone.
pub struct GenericSwapParser;

impl Parser for GenericSwapParser {
    fn name(&self) -> &'static str {
        "GenericSwapParser"
    }

    fn can_parse(&self, _tx_data: &Value, ctx: &TransactionContext) -> bool {
        for (addr, flows) in ctx.net_flows() {
            if !ctx.is_wallet(&addr) {
                continue;
            }
            let out_symbols: HashSet<_> = flows.iter().filter(|(_, q)| **q < Decimal::ZERO).map(|(s, _)| s.clone()).collect();
            let in_symbols: HashSet<_> = flows.iter().filter(|(_, q)| **q > Decimal::ZERO).map(|(s, _)| s.clone()).collect();
            if !out_symbols.is_empty() && !in_symbols.is_empty() && out_symbols != in_symbols {
                return true;
            }
        }
        false
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let nat_sym = native_symbol(&chain);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        for (addr, flows) in ctx.net_flows() {
            if !ctx.is_wallet(&addr) {
                continue;
            }
            for (tok_symbol, qty) in flows {
                if qty == Decimal::ZERO {
                    continue;
                }
                let account_ref = if tok_symbol == nat_sym {
                    AccountRef::NativeAsset
                } else {
                    AccountRef::Erc20Token { token_address: String::new() }
                };
                splits.push(ParsedSplit::new(account_ref, &tok_symbol, qty));
            }
        }

        ParseResult { splits, entry_type: EntryType::Swap, parser_name: self.name() }
    }
}
