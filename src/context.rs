//! The mutable, "consume on match" parsing context (spec §4.3, §9).
//! A transfer belongs to exactly one accounting event: once a parser
//! pops it, downstream fallbacks never see it again.

use crate::extractor::{EventData, RawTransfer, TransferKind};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Filter on `token_address`. `Any` means "don't filter on this
/// field" (the source's `...` sentinel default); `Exact(None)`
/// matches only transfers with no token address (native transfers).
#[derive(Default, Clone, Copy)]
pub enum TokenAddressFilter<'a> {
    #[default]
    Any,
    Exact(Option<&'a str>),
}

#[derive(Default)]
pub struct TransferFilter<'a> {
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub token_address: TokenAddressFilter<'a>,
    pub kind: Option<TransferKind>,
}

impl RawTransfer {
    fn matches(&self, filter: &TransferFilter) -> bool {
        if let Some(from) = filter.from {
            if !self.from.eq_ignore_ascii_case(from) {
                return false;
            }
        }
        if let Some(to) = filter.to {
            if !self.to.eq_ignore_ascii_case(to) {
                return false;
            }
        }
        if let TokenAddressFilter::Exact(expected) = filter.token_address {
            if self.token_address.as_deref() != expected {
                return false;
            }
        }
        if let Some(kind) = filter.kind {
            if self.kind != kind {
                return false;
            }
        }
        true
    }
}

pub struct TransactionContext {
    transfers: Vec<RawTransfer>,
    wallet_addresses: Vec<String>,
    events: Vec<EventData>,
}

impl TransactionContext {
    pub fn new(
        transfers: Vec<RawTransfer>,
        wallet_addresses: impl IntoIterator<Item = String>,
        events: Vec<EventData>,
    ) -> Self {
        Self {
            transfers,
            wallet_addresses: wallet_addresses.into_iter().map(|a| a.to_lowercase()).collect(),
            events,
        }
    }

    pub fn is_wallet(&self, address: &str) -> bool {
        let lower = address.to_lowercase();
        self.wallet_addresses.iter().any(|w| w == &lower)
    }

    /// Returns and removes the first match, or `None`.
    pub fn pop_transfer(&mut self, filter: TransferFilter) -> Option<RawTransfer> {
        let idx = self.transfers.iter().position(|t| t.matches(&filter))?;
        Some(self.transfers.remove(idx))
    }

    /// Returns matches without consuming.
    pub fn peek_transfers(&self, filter: TransferFilter) -> Vec<&RawTransfer> {
        self.transfers.iter().filter(|t| t.matches(&filter)).collect()
    }

    pub fn remaining_transfers(&self) -> &[RawTransfer] {
        &self.transfers
    }

    /// For every wallet-owned address, `symbol -> signed_quantity`
    /// built by summing inflows minus outflows over all *remaining*
    /// transfers. Positive = net received, negative = net sent.
    pub fn net_flows(&self) -> HashMap<String, HashMap<String, Decimal>> {
        let mut flows: HashMap<String, HashMap<String, Decimal>> = HashMap::new();
        for t in &self.transfers {
            let qty = Decimal::from_i128_with_scale(t.value_units as i128, t.decimals)
                .normalize();
            let from = t.from.to_lowercase();
            let to = t.to.to_lowercase();
            if self.is_wallet(&from) {
                *flows.entry(from).or_default().entry(t.symbol.clone()).or_insert(Decimal::ZERO) -= qty;
            }
            if self.is_wallet(&to) {
                *flows.entry(to).or_default().entry(t.symbol.clone()).or_insert(Decimal::ZERO) += qty;
            }
        }
        flows
    }

    pub fn pop_event(&mut self, event_name: &str, address: Option<&str>) -> Option<EventData> {
        let idx = self.events.iter().position(|e| {
            e.name == event_name
                && address
                    .map(|a| e.contract_address.eq_ignore_ascii_case(a))
                    .unwrap_or(true)
        })?;
        Some(self.events.remove(idx))
    }

    pub fn filter_events(&self, event_name: &str) -> Vec<&EventData> {
        self.events.iter().filter(|e| e.name == event_name).collect()
    }

    pub fn remaining_events(&self) -> &[EventData] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::TransferKind;

    fn transfer(from: &str, to: &str, symbol: &str, value: u128, decimals: u32) -> RawTransfer {
        RawTransfer {
            token_address: None,
            from: from.to_string(),
            to: to.to_string(),
            value_units: value,
            decimals,
            symbol: symbol.to_string(),
            kind: TransferKind::Native,
        }
    }

    #[test]
    fn pop_transfer_consumes_first_match() {
        let mut ctx = TransactionContext::new(
            vec![transfer("0xaaa", "0xbbb", "ETH", 1_000_000_000_000_000_000, 18)],
            vec!["0xaaa".to_string()],
            vec![],
        );
        let found = ctx.pop_transfer(TransferFilter {
            from: Some("0xaaa"),
            ..Default::default()
        });
        assert!(found.is_some());
        assert!(ctx.remaining_transfers().is_empty());
    }

    #[test]
    fn net_flows_nets_wallet_owned_addresses_only() {
        let ctx = TransactionContext::new(
            vec![
                transfer("0xaaa", "0xbbb", "ETH", 2_000_000_000_000_000_000, 18),
                transfer("0xccc", "0xaaa", "ETH", 500_000_000_000_000_000, 18),
            ],
            vec!["0xaaa".to_string()],
            vec![],
        );
        let flows = ctx.net_flows();
        let aaa = &flows["0xaaa"];
        assert_eq!(aaa["ETH"], Decimal::new(-15, 1));
        assert!(!flows.contains_key("0xbbb"));
    }
}
