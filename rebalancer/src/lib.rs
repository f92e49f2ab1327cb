//! allocbook-rebalancer: lot-constrained rebalancing on top of allocbook.
//!
//! Reads current holdings, a target allocation (hand-written or produced by
//! the optimizer) and latest prices, then computes the board-lot trades that
//! move the portfolio toward the target, with a cash reconciliation and a
//! JSONL audit trail.
//!
//! ```
//! use allocbook::Symbol;
//! use allocbook_rebalancer::holding::Holding;
//! use allocbook_rebalancer::plan::{rebalance, CashStatus, PriceMap, RebalanceParams};
//! use allocbook_rebalancer::target::TargetAllocation;
//!
//! let (aaa, bbb) = (Symbol::new("AAA"), Symbol::new("BBB"));
//! let holdings = vec![Holding::new(aaa, 100, 10.0).unwrap()];
//! let target = TargetAllocation::new([(aaa, 0.5), (bbb, 0.5)]);
//! let prices: PriceMap = [(aaa, 12.0), (bbb, 20.0)].into_iter().collect();
//!
//! let plan = rebalance(&holdings, &target, &prices, &RebalanceParams::default()).unwrap();
//! assert_eq!(plan.row(&aaa).unwrap().delta_shares, -100);
//! assert_eq!(plan.row(&bbb).unwrap().delta_shares, 0);
//! assert_eq!(plan.cash_status(), CashStatus::SurplusCash(1200.0));
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod holding;
pub mod input;
pub mod plan;
pub mod target;
