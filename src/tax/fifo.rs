//! FIFO lot matching, pure and storage-free (spec §4.6 steps 1–2).

use crate::model::{ClosedLot, OpenLot};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single priced leg built from a journal split (spec §4.6 step 1).
#[derive(Debug, Clone)]
pub struct Trade {
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price_usd: Decimal,
    pub timestamp: DateTime<Utc>,
    pub entry_id: Uuid,
}

struct PendingLot {
    remaining_qty: Decimal,
    cost_basis_per_unit: Decimal,
    buy_entry_id: Uuid,
    buy_ts: DateTime<Utc>,
}

/// Matches one symbol's trades FIFO. `trades` must already be sorted
/// ascending by timestamp (ties broken by arrival order). A sell that
/// outlives the buy queue is a naked short; the unmatched remainder is
/// silently dropped rather than raised, per the engine's stated policy.
pub fn fifo_match(entity_id: Uuid, symbol: &str, trades: &[Trade]) -> (Vec<ClosedLot>, Vec<OpenLot>) {
    let mut queue: VecDeque<PendingLot> = VecDeque::new();
    let mut closed = Vec::new();

    for trade in trades {
        match trade.side {
            TradeSide::Buy => queue.push_back(PendingLot {
                remaining_qty: trade.quantity,
                cost_basis_per_unit: trade.price_usd,
                buy_entry_id: trade.entry_id,
                buy_ts: trade.timestamp,
            }),
            TradeSide::Sell => {
                let mut remaining = trade.quantity;
                while remaining > Decimal::ZERO {
                    let Some(front) = queue.front_mut() else { break };
                    let matched = remaining.min(front.remaining_qty);

                    let cost_basis = matched * front.cost_basis_per_unit;
                    let proceeds = matched * trade.price_usd;
                    let holding_days = (trade.timestamp - front.buy_ts).num_days();

                    closed.push(ClosedLot {
                        id: Uuid::new_v4(),
                        entity_id,
                        symbol: symbol.to_string(),
                        qty: matched,
                        cost_basis_usd: cost_basis,
                        proceeds_usd: proceeds,
                        gain_usd: proceeds - cost_basis,
                        holding_days,
                        buy_entry_id: front.buy_entry_id,
                        sell_entry_id: trade.entry_id,
                        buy_ts: front.buy_ts,
                        sell_ts: trade.timestamp,
                    });

                    front.remaining_qty -= matched;
                    remaining -= matched;
                    if front.remaining_qty <= Decimal::ZERO {
                        queue.pop_front();
                    }
                }
            }
        }
    }

    let open = queue
        .into_iter()
        .filter(|lot| lot.remaining_qty > Decimal::ZERO)
        .map(|lot| OpenLot {
            id: Uuid::new_v4(),
            entity_id,
            symbol: symbol.to_string(),
            remaining_qty: lot.remaining_qty,
            cost_basis_per_unit_usd: lot.cost_basis_per_unit,
            buy_entry_id: lot.buy_entry_id,
            buy_ts: lot.buy_ts,
        })
        .collect();

    (closed, open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(days: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + days * 86_400, 0).unwrap()
    }

    #[test]
    fn partial_sell_leaves_an_open_remainder() {
        let entity_id = Uuid::new_v4();
        let trades = vec![
            Trade { side: TradeSide::Buy, quantity: Decimal::new(10, 0), price_usd: Decimal::new(100, 0), timestamp: ts(0), entry_id: Uuid::new_v4() },
            Trade { side: TradeSide::Sell, quantity: Decimal::new(4, 0), price_usd: Decimal::new(150, 0), timestamp: ts(10), entry_id: Uuid::new_v4() },
        ];

        let (closed, open) = fifo_match(entity_id, "ETH", &trades);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].qty, Decimal::new(4, 0));
        assert_eq!(closed[0].gain_usd, Decimal::new(200, 0));
        assert_eq!(closed[0].holding_days, 10);

        assert_eq!(open.len(), 1);
        assert_eq!(open[0].remaining_qty, Decimal::new(6, 0));
    }

    #[test]
    fn sell_spanning_two_buy_lots_splits_across_both() {
        let entity_id = Uuid::new_v4();
        let buy1 = Uuid::new_v4();
        let buy2 = Uuid::new_v4();
        let trades = vec![
            Trade { side: TradeSide::Buy, quantity: Decimal::new(5, 0), price_usd: Decimal::new(100, 0), timestamp: ts(0), entry_id: buy1 },
            Trade { side: TradeSide::Buy, quantity: Decimal::new(5, 0), price_usd: Decimal::new(200, 0), timestamp: ts(1), entry_id: buy2 },
            Trade { side: TradeSide::Sell, quantity: Decimal::new(8, 0), price_usd: Decimal::new(300, 0), timestamp: ts(5), entry_id: Uuid::new_v4() },
        ];

        let (closed, open) = fifo_match(entity_id, "ETH", &trades);
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].buy_entry_id, buy1);
        assert_eq!(closed[0].qty, Decimal::new(5, 0));
        assert_eq!(closed[1].buy_entry_id, buy2);
        assert_eq!(closed[1].qty, Decimal::new(3, 0));
        assert!(open.is_empty());
    }

    #[test]
    fn naked_short_is_silently_dropped() {
        let entity_id = Uuid::new_v4();
        let trades = vec![Trade {
            side: TradeSide::Sell,
            quantity: Decimal::new(5, 0),
            price_usd: Decimal::new(100, 0),
            timestamp: ts(0),
            entry_id: Uuid::new_v4(),
        }];

        let (closed, open) = fifo_match(entity_id, "ETH", &trades);
        assert!(closed.is_empty());
        assert!(open.is_empty());
    }
}
