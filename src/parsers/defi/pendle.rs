//! Pendle — router swaps (PT/YT/SY), falling back to net-flow swap
//! detection for anything the selector table doesn't cover.

use crate::context::TransactionContext;
use crate::model::EntryType;
use crate::parsers::{chain_of, make_gas_splits, net_flow_splits, selector_of, to_addr, ParseResult, Parser};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

pub static PENDLE_ROUTER: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", "0x888888888889758f76e7103c6cbf23abbf58f946"),
        ("arbitrum", "0x888888888889758f76e7103c6cbf23abbf58f946"),
    ])
});

pub static PENDLE_ROUTER_V4: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("ethereum", "0x00000000005bbb0ef59571e58418f9a4357b68a0")]));

const SWAP_EXACT_TOKEN_FOR_PT: &str = "0xc81f847a";
const SWAP_EXACT_PT_FOR_TOKEN: &str = "0x594a88cc";
const MINT_SY_SELECTOR: &str = "0x3a96d691";
const REDEEM_SY_SELECTOR: &str = "0x454bb66e";
const REDEEM_DUE_INTEREST_AND_REWARDS: &str = "0x47f1de22";

fn router_for(chain: &str, to: &str) -> bool {
    PENDLE_ROUTER.get(chain).map(|p| *p == to).unwrap_or(false) || PENDLE_ROUTER_V4.get(chain).map(|p| *p == to).unwrap_or(false)
}

pub struct PendleParser;

impl Parser for PendleParser {
    fn name(&self) -> &'static str {
        "PendleParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        router_for(&chain, &to_addr(tx_data))
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let entry_type = match selector.as_str() {
            SWAP_EXACT_TOKEN_FOR_PT | SWAP_EXACT_PT_FOR_TOKEN | MINT_SY_SELECTOR | REDEEM_SY_SELECTOR => {
                splits.extend(net_flow_splits(ctx, &chain));
                EntryType::Swap
            }
            REDEEM_DUE_INTEREST_AND_REWARDS => {
                splits.extend(net_flow_splits(ctx, &chain));
                EntryType::Yield
            }
            _ => {
                // Unknown Pendle selector: net-flow swap rather than
                // falling through, mirroring the Curve pool handling.
                splits.extend(net_flow_splits(ctx, &chain));
                EntryType::Swap
            }
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}
