use crate::experience::{Experience, PricingModel};
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Caller-supplied quantities for a price computation
#[derive(Debug, Clone, Default)]
pub struct PriceInputs {
    pub participants: i32,
    /// per_day only; defaults to the experience minimum
    pub rental_days: Option<i32>,
    /// per_day only; defaults to 1
    pub quantity: Option<i32>,
}

/// Result of a price computation, all amounts in integer minor units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub base_cents: i64,
    pub extra_cents: i64,
    pub total_cents: i64,
    /// Participant count the charge was computed for, after raising the
    /// caller's input to the experience minimum. The clamp is a safety net
    /// (the UI pre-enforces the minimum) and applies to the charge only;
    /// inventory holds always use the actual headcount.
    pub effective_participants: i32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Participant count must be at least 1, got {0}")]
    InvalidParticipants(i32),
    #[error("Participant count {got} exceeds maximum {max}")]
    TooManyParticipants { got: i32, max: i32 },
    #[error("Rental days must be between {min} and {max}, got {got}")]
    InvalidDays { got: i32, min: i32, max: i32 },
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),
}

/// Compute the total price for a reservation against an experience, applying
/// an optional session-level price override. Pure; no floating point anywhere
/// in the total path.
pub fn compute_price(
    experience: &Experience,
    inputs: &PriceInputs,
    session: Option<&Session>,
) -> Result<PriceQuote, PricingError> {
    let override_cents = session.and_then(|s| s.price_override_cents);

    match experience.pricing_model {
        PricingModel::PerPerson => {
            let effective = effective_participants(experience, inputs.participants)?;
            let unit = override_cents.unwrap_or(experience.extra_person_cents);
            let total = unit * effective as i64;
            Ok(PriceQuote {
                base_cents: total,
                extra_cents: 0,
                total_cents: total,
                effective_participants: effective,
            })
        }
        PricingModel::BasePlusExtra => {
            let effective = effective_participants(experience, inputs.participants)?;
            // An override collapses to per-person semantics: the "included
            // participants" discount is intentionally lost.
            if let Some(unit) = override_cents {
                let total = unit * effective as i64;
                return Ok(PriceQuote {
                    base_cents: total,
                    extra_cents: 0,
                    total_cents: total,
                    effective_participants: effective,
                });
            }
            let beyond_included = (effective - experience.included_participants).max(0) as i64;
            let extra = experience.extra_person_cents * beyond_included;
            Ok(PriceQuote {
                base_cents: experience.base_price_cents,
                extra_cents: extra,
                total_cents: experience.base_price_cents + extra,
                effective_participants: effective,
            })
        }
        PricingModel::FlatRate => {
            let effective = effective_participants(experience, inputs.participants)?;
            let total = override_cents.unwrap_or(experience.base_price_cents);
            Ok(PriceQuote {
                base_cents: total,
                extra_cents: 0,
                total_cents: total,
                effective_participants: effective,
            })
        }
        PricingModel::PerDay => {
            let days = inputs.rental_days.unwrap_or(experience.min_days);
            let max_days = if experience.max_days > 0 { experience.max_days } else { i32::MAX };
            if days < experience.min_days.max(1) || days > max_days {
                return Err(PricingError::InvalidDays {
                    got: days,
                    min: experience.min_days.max(1),
                    max: experience.max_days,
                });
            }
            let quantity = inputs.quantity.unwrap_or(1);
            if quantity < 1 {
                return Err(PricingError::InvalidQuantity(quantity));
            }
            let unit = override_cents.unwrap_or(experience.price_per_day_cents);
            let total = unit * days as i64 * quantity as i64;
            Ok(PriceQuote {
                base_cents: total,
                extra_cents: 0,
                total_cents: total,
                effective_participants: quantity,
            })
        }
    }
}

fn effective_participants(experience: &Experience, participants: i32) -> Result<i32, PricingError> {
    if participants < 1 {
        return Err(PricingError::InvalidParticipants(participants));
    }
    if experience.max_participants > 0 && participants > experience.max_participants {
        return Err(PricingError::TooManyParticipants {
            got: participants,
            max: experience.max_participants,
        });
    }
    Ok(participants.max(experience.min_participants))
}
