use super::{chain_of, from_addr, make_gas_splits, native_symbol, to_addr, AccountRef, ParseResult, ParsedSplit, Parser};
use crate::context::TransactionContext;
use crate::model::EntryType;
use rust_decimal::Decimal;
use serde_json::Value;

/// Always-matching fallback. Handles gas fees and simple native/token
/// transfers via net flows; anything left over becomes `Unknown`.
pub struct GenericEvmParser;

impl GenericEvmParser {
    fn counterpart(&self, tx_data: &Value, wallet_addr: &str) -> String {
        let from = from_addr(tx_data);
        let to = to_addr(tx_data);
        if from == wallet_addr.to_lowercase() { to } else { from }
    }
}

impl Parser for GenericEvmParser {
    fn name(&self) -> &'static str {
        "GenericEVMParser"
    }

    fn can_parse(&self, _tx_data: &Value, _ctx: &TransactionContext) -> bool {
        true
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let symbol = native_symbol(&chain);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);
        let has_gas = !splits.is_empty();

        let mut has_value_transfer = false;
        for (addr, flows) in ctx.net_flows() {
            for (tok_symbol, qty) in flows {
                if qty == Decimal::ZERO {
                    continue;
                }
                has_value_transfer = true;
                let counterpart = self.counterpart(tx_data, &addr);

                if tok_symbol == symbol {
                    splits.push(ParsedSplit::new(AccountRef::NativeAsset, &tok_symbol, qty));
                    splits.push(ParsedSplit::new(
                        AccountRef::ExternalTransfer { ext_address: counterpart },
                        &tok_symbol,
                        -qty,
                    ));
                } else {
                    splits.push(ParsedSplit::new(
                        AccountRef::Erc20Token { token_address: String::new() },
                        &tok_symbol,
                        qty,
                    ));
                    splits.push(ParsedSplit::new(
                        AccountRef::ExternalTransfer { ext_address: counterpart },
                        &tok_symbol,
                        -qty,
                    ));
                }
            }
        }

        let entry_type = if !has_value_transfer && has_gas {
            EntryType::GasFee
        } else if !has_value_transfer {
            EntryType::Unknown
        } else {
            EntryType::Transfer
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}
