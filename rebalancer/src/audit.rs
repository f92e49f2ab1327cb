//! JSONL audit trail logging.
//!
//! Each optimizer or rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use allocbook::Allocation;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::plan::{CashStatus, RebalancePlan};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Record an optimizer result.
pub fn log_allocation(audit: &mut AuditLog, allocation: &Allocation) -> Result<()> {
    let weights: serde_json::Map<String, serde_json::Value> = allocation
        .weights
        .iter()
        .map(|(s, w)| (s.to_string(), serde_json::json!(w)))
        .collect();

    audit.log(
        "allocation_computed",
        serde_json::json!({
            "method": allocation.method.label(),
            "fallback": allocation.method.is_fallback(),
            "weights": weights,
            "expected_return": allocation.performance.expected_annual_return,
            "volatility": allocation.performance.annual_volatility,
            "sharpe": allocation.performance.sharpe_ratio,
            "dropped": allocation.dropped.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "observations": allocation.observations,
        }),
    )
}

/// Record a computed rebalance plan with its orders and cash position.
pub fn log_plan(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    let orders: Vec<_> = plan
        .orders()
        .map(|o| {
            serde_json::json!({
                "symbol": o.symbol.as_str(),
                "side": o.side.to_string(),
                "shares": o.shares,
                "price": o.price,
                "notional": o.notional,
            })
        })
        .collect();
    let (cash_status, cash_amount) = match plan.cash_status() {
        CashStatus::AdditionalCashNeeded(x) => ("additional_cash_needed", x),
        CashStatus::SurplusCash(x) => ("surplus_cash", x),
    };

    audit.log(
        "plan_computed",
        serde_json::json!({
            "lot_size": plan.params.lot_size,
            "rounding": plan.params.rounding.to_string(),
            "drift_threshold": plan.params.drift_threshold,
            "flagged": plan.flagged().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            "orders": orders,
            "total_buy": plan.total_buy,
            "total_sell": plan.total_sell,
            "new_cash": plan.new_cash,
            "net_cash": plan.net_cash,
            "cash_status": cash_status,
            "cash_amount": cash_amount,
        }),
    )
}
