use super::{native_symbol, RawTransfer, TransferKind};
use serde_json::Value;

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or("")
}

fn parse_u128(v: &Value, key: &str) -> u128 {
    match v.get(key) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().map(u128::from).unwrap_or(0),
        _ => 0,
    }
}

/// Etherscan normal-tx native transfer, plus attached
/// `token_transfers[]`/`internal_transfers[]` (spec §4.1 EVM path,
/// §6.1 schema).
pub fn extract_evm_transfers(tx_data: &Value, chain: &str) -> Vec<RawTransfer> {
    let mut transfers = Vec::new();
    let symbol = native_symbol(chain);

    let value = parse_u128(tx_data, "value");
    if value > 0 {
        let from = str_field(tx_data, "from").to_lowercase();
        let to = str_field(tx_data, "to").to_lowercase();
        if !from.is_empty() && !to.is_empty() {
            transfers.push(RawTransfer {
                token_address: None,
                from,
                to,
                value_units: value,
                decimals: 18,
                symbol: symbol.to_string(),
                kind: TransferKind::Native,
            });
        }
    }

    if let Some(token_txs) = tx_data.get("token_transfers").and_then(Value::as_array) {
        for ttx in token_txs {
            let value = parse_u128(ttx, "value");
            if value == 0 {
                continue;
            }
            let decimals = ttx
                .get("tokenDecimal")
                .and_then(|d| match d {
                    Value::String(s) => s.parse::<u64>().ok(),
                    Value::Number(n) => n.as_u64(),
                    _ => None,
                })
                .unwrap_or(18) as u32;
            transfers.push(RawTransfer {
                token_address: Some(str_field(ttx, "contractAddress").to_lowercase()),
                from: str_field(ttx, "from").to_lowercase(),
                to: str_field(ttx, "to").to_lowercase(),
                value_units: value,
                decimals,
                symbol: ttx
                    .get("tokenSymbol")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                kind: TransferKind::Erc20,
            });
        }
    }

    if let Some(internal_txs) = tx_data.get("internal_transfers").and_then(Value::as_array) {
        for itx in internal_txs {
            let value = parse_u128(itx, "value");
            if value == 0 {
                continue;
            }
            let is_error = itx
                .get("isError")
                .map(|e| e.as_str() == Some("1") || e.as_u64() == Some(1))
                .unwrap_or(false);
            if is_error {
                continue;
            }
            transfers.push(RawTransfer {
                token_address: None,
                from: str_field(itx, "from").to_lowercase(),
                to: str_field(itx, "to").to_lowercase(),
                value_units: value,
                decimals: 18,
                symbol: symbol.to_string(),
                kind: TransferKind::Internal,
            });
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_native_and_token_and_internal() {
        let tx = json!({
            "from": "0xAAA",
            "to": "0xBBB",
            "value": "1000000000000000000",
            "token_transfers": [
                {"contractAddress": "0xCCC", "from": "0xAAA", "to": "0xBBB", "value": "500", "tokenDecimal": "6", "tokenSymbol": "USDC"}
            ],
            "internal_transfers": [
                {"from": "0xBBB", "to": "0xDDD", "value": "10", "isError": "0"},
                {"from": "0xBBB", "to": "0xEEE", "value": "10", "isError": "1"}
            ]
        });
        let transfers = extract_evm_transfers(&tx, "ethereum");
        assert_eq!(transfers.len(), 3);
        assert_eq!(transfers[0].kind, TransferKind::Native);
        assert_eq!(transfers[0].from, "0xaaa");
        assert_eq!(transfers[1].symbol, "USDC");
        assert_eq!(transfers[1].decimals, 6);
        assert_eq!(transfers[2].to, "0xddd");
    }
}
