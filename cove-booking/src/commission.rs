use serde::{Deserialize, Serialize};

/// Percentage rates for the three-way split. Sourced from the Distribution
/// agreement; 0–100 each.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionRates {
    pub supplier_pct: i32,
    pub hotel_pct: i32,
    pub platform_pct: i32,
}

impl CommissionRates {
    /// Fallback when no distribution agreement exists: supplier keeps all.
    pub fn supplier_only() -> Self {
        Self { supplier_pct: 100, hotel_pct: 0, platform_pct: 0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSplit {
    pub supplier_cents: i64,
    pub hotel_cents: i64,
    pub platform_cents: i64,
}

impl CommissionSplit {
    pub fn total(&self) -> i64 {
        self.supplier_cents + self.hotel_cents + self.platform_cents
    }
}

/// Distribute a total among supplier, hotel and platform. Each share is
/// rounded half-up independently, then the signed remainder is folded into
/// the platform share so the three parts always sum exactly to the input.
/// Deterministic for identical inputs, which makes webhook retries and audit
/// reconciliation safe.
pub fn split(total_cents: i64, rates: &CommissionRates) -> CommissionSplit {
    let supplier_cents = rounded_share(total_cents, rates.supplier_pct);
    let hotel_cents = rounded_share(total_cents, rates.hotel_pct);
    let platform_rounded = rounded_share(total_cents, rates.platform_pct);

    let remainder = total_cents - (supplier_cents + hotel_cents + platform_rounded);
    CommissionSplit {
        supplier_cents,
        hotel_cents,
        platform_cents: platform_rounded + remainder,
    }
}

fn rounded_share(total_cents: i64, pct: i32) -> i64 {
    // round-half-up in integer arithmetic; no floats in the money path
    (total_cents * pct as i64 + 50) / 100
}
