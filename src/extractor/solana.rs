use super::{RawTransfer, TransferKind};
use serde_json::Value;
use std::collections::HashMap;

const SOL_DECIMALS: u32 = 9;
const SOL_SYMBOL: &str = "SOL";

/// Diffs `meta.pre*Balances`/`post*Balances` and pairs senders to
/// receivers using the smaller absolute delta (spec §4.1 Solana path).
pub fn extract_solana_transfers(tx_data: &Value) -> Vec<RawTransfer> {
    let mut transfers = Vec::new();
    let meta = tx_data.get("meta").cloned().unwrap_or(Value::Null);
    let account_keys = tx_data
        .pointer("/transaction/message/accountKeys")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if account_keys.is_empty() || meta.is_null() {
        return transfers;
    }

    let pubkeys: Vec<String> = account_keys
        .iter()
        .map(|k| match k {
            Value::Object(_) => k
                .get("pubkey")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            Value::String(s) => s.clone(),
            _ => String::new(),
        })
        .collect();

    transfers.extend(extract_sol_transfers(&meta, &pubkeys));
    transfers.extend(extract_spl_transfers(&meta, &pubkeys));
    transfers
}

fn as_i128(v: &Value) -> i128 {
    v.as_i64().map(i128::from).unwrap_or(0)
}

fn extract_sol_transfers(meta: &Value, pubkeys: &[String]) -> Vec<RawTransfer> {
    let mut transfers = Vec::new();
    let pre = meta.get("preBalances").and_then(Value::as_array);
    let post = meta.get("postBalances").and_then(Value::as_array);
    let (Some(pre), Some(post)) = (pre, post) else {
        return transfers;
    };

    let mut senders = Vec::new();
    let mut receivers = Vec::new();
    let n = pre.len().min(post.len()).min(pubkeys.len());
    for i in 0..n {
        let diff = as_i128(&post[i]) - as_i128(&pre[i]);
        if diff < 0 {
            senders.push((pubkeys[i].clone(), (-diff) as u128));
        } else if diff > 0 {
            receivers.push((pubkeys[i].clone(), diff as u128));
        }
    }

    for (sender, sent) in &senders {
        for (receiver, recv) in &receivers {
            let amount = (*sent).min(*recv);
            if amount > 0 {
                transfers.push(RawTransfer {
                    token_address: None,
                    from: sender.clone(),
                    to: receiver.clone(),
                    value_units: amount,
                    decimals: SOL_DECIMALS,
                    symbol: SOL_SYMBOL.to_string(),
                    kind: TransferKind::Native,
                });
            }
        }
    }
    transfers
}

fn token_amount(tb: &Value) -> (i128, u32) {
    let ui = tb.get("uiTokenAmount");
    let amount = ui
        .and_then(|u| u.get("amount"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<i128>().ok())
        .unwrap_or(0);
    let decimals = ui
        .and_then(|u| u.get("decimals"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    (amount, decimals)
}

fn token_symbol(tb: &Value, mint: &str) -> String {
    tb.pointer("/tokenInfo/symbol")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| mint.chars().take(8).collect())
}

/// Same pairing logic as native SOL, but per `(accountIndex, mint)` on
/// `preTokenBalances`/`postTokenBalances`.
fn extract_spl_transfers(meta: &Value, pubkeys: &[String]) -> Vec<RawTransfer> {
    let mut transfers = Vec::new();
    let empty = Vec::new();
    let pre_list = meta
        .get("preTokenBalances")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let post_list = meta
        .get("postTokenBalances")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let key_of = |tb: &Value| -> (i64, String) {
        (
            tb.get("accountIndex").and_then(Value::as_i64).unwrap_or(-1),
            tb.get("mint").and_then(Value::as_str).unwrap_or("").to_string(),
        )
    };

    let mut pre_map: HashMap<(i64, String), &Value> = HashMap::new();
    for tb in pre_list {
        pre_map.insert(key_of(tb), tb);
    }
    let mut post_map: HashMap<(i64, String), &Value> = HashMap::new();
    for tb in post_list {
        post_map.insert(key_of(tb), tb);
    }

    let mut all_keys: Vec<(i64, String)> = pre_map.keys().cloned().collect();
    for k in post_map.keys() {
        if !all_keys.contains(k) {
            all_keys.push(k.clone());
        }
    }

    // mint -> (owner, signed_diff, decimals, symbol)
    let mut mint_changes: HashMap<String, Vec<(String, i128, u32, String)>> = HashMap::new();

    for (account_index, mint) in &all_keys {
        if *account_index < 0 || *account_index as usize >= pubkeys.len() {
            continue;
        }
        let pre_info = pre_map.get(&(*account_index, mint.clone()));
        let post_info = post_map.get(&(*account_index, mint.clone()));

        let (pre_amount, _) = pre_info.map(|tb| token_amount(tb)).unwrap_or((0, 0));
        let (post_amount, decimals) = post_info.map(|tb| token_amount(tb)).unwrap_or((0, 0));
        let decimals = if decimals == 0 {
            pre_info.map(|tb| token_amount(tb).1).unwrap_or(0)
        } else {
            decimals
        };

        let reference = post_info.or(pre_info);
        let owner = reference
            .and_then(|tb| tb.get("owner"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| pubkeys[*account_index as usize].clone());
        let symbol = reference.map(|tb| token_symbol(tb, mint)).unwrap_or_else(|| mint.chars().take(8).collect());

        let diff = post_amount - pre_amount;
        if diff != 0 {
            mint_changes
                .entry(mint.clone())
                .or_default()
                .push((owner, diff, decimals, symbol));
        }
    }

    for (mint, changes) in mint_changes {
        let senders: Vec<_> = changes
            .iter()
            .filter(|(_, diff, _, _)| *diff < 0)
            .map(|(owner, diff, decimals, symbol)| (owner.clone(), (-diff) as u128, *decimals, symbol.clone()))
            .collect();
        let receivers: Vec<_> = changes
            .iter()
            .filter(|(_, diff, _, _)| *diff > 0)
            .map(|(owner, diff, decimals, symbol)| (owner.clone(), *diff as u128, *decimals, symbol.clone()))
            .collect();

        for (sender, sent, decimals, symbol) in &senders {
            for (receiver, recv, _, _) in &receivers {
                let amount = (*sent).min(*recv);
                if amount > 0 {
                    transfers.push(RawTransfer {
                        token_address: Some(mint.clone()),
                        from: sender.clone(),
                        to: receiver.clone(),
                        value_units: amount,
                        decimals: *decimals,
                        symbol: symbol.clone(),
                        kind: TransferKind::Spl,
                    });
                }
            }
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_sol_senders_with_receivers_on_min_delta() {
        let tx = json!({
            "transaction": {"message": {"accountKeys": ["alice", "bob", "carol"]}},
            "meta": {
                "preBalances": [1_000_000_000i64, 0, 500_000_000i64],
                "postBalances": [899_995_000i64, 100_000_000i64, 500_005_000i64]
            }
        });
        let transfers = extract_solana_transfers(&tx);
        assert_eq!(transfers.len(), 2);
        for t in &transfers {
            assert_eq!(t.from, "alice");
            assert_eq!(t.symbol, "SOL");
        }
        let total: u128 = transfers.iter().map(|t| t.value_units).sum();
        assert_eq!(total, 100_005_000);
    }

    #[test]
    fn spl_transfer_uses_token_info_symbol() {
        let tx = json!({
            "transaction": {"message": {"accountKeys": ["alice", "bob"]}},
            "meta": {
                "preTokenBalances": [
                    {"accountIndex": 0, "mint": "Mint111", "owner": "alice", "uiTokenAmount": {"amount": "1000", "decimals": 6}, "tokenInfo": {"symbol": "USDC"}}
                ],
                "postTokenBalances": [
                    {"accountIndex": 0, "mint": "Mint111", "owner": "alice", "uiTokenAmount": {"amount": "0", "decimals": 6}, "tokenInfo": {"symbol": "USDC"}},
                    {"accountIndex": 1, "mint": "Mint111", "owner": "bob", "uiTokenAmount": {"amount": "1000", "decimals": 6}, "tokenInfo": {"symbol": "USDC"}}
                ]
            }
        });
        let transfers = extract_solana_transfers(&tx);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].symbol, "USDC");
        assert_eq!(transfers[0].value_units, 1000);
    }
}
