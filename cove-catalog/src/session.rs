use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Available,
    Booked,
    Cancelled,
}

/// A concrete bookable instance of an experience at a date/time (or a date
/// range for rentals). `spots_available` only ever changes through the
/// ledger's reserve/release operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub experience_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub end_date: Option<NaiveDate>,
    pub spots_total: i32,
    pub spots_available: i32,
    pub status: SessionStatus,
    /// Replaces the experience's unit price for this session
    pub price_override_cents: Option<i64>,
    pub price_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(experience_id: Uuid, date: NaiveDate, time: String, spots_total: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            experience_id,
            date,
            time,
            end_date: None,
            spots_total,
            spots_available: spots_total,
            status: SessionStatus::Available,
            price_override_cents: None,
            price_note: None,
            created_at: Utc::now(),
        }
    }

    /// Spots taken so far; the minimum-participant sweep compares this
    /// against the experience threshold.
    pub fn booked_count(&self) -> i32 {
        self.spots_total - self.spots_available
    }

    pub fn is_full(&self) -> bool {
        self.spots_available == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booked_count_tracks_spots() {
        let mut session = Session::new(Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(), "10:00".into(), 8);
        assert_eq!(session.booked_count(), 0);
        session.spots_available = 3;
        assert_eq!(session.booked_count(), 5);
        assert!(!session.is_full());
        session.spots_available = 0;
        assert!(session.is_full());
    }
}
