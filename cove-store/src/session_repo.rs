use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use cove_catalog::inventory::LedgerError;
use cove_catalog::session::{Session, SessionStatus};
use cove_catalog::SessionStore;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreSessionRepository {
    pool: PgPool,
}

impl StoreSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    experience_id: Uuid,
    date: NaiveDate,
    time: String,
    end_date: Option<NaiveDate>,
    spots_total: i32,
    spots_available: i32,
    status: String,
    price_override_cents: Option<i64>,
    price_note: Option<String>,
    created_at: DateTime<Utc>,
}

fn status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Available => "available",
        SessionStatus::Booked => "booked",
        SessionStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> Result<SessionStatus, LedgerError> {
    match s {
        "available" => Ok(SessionStatus::Available),
        "booked" => Ok(SessionStatus::Booked),
        "cancelled" => Ok(SessionStatus::Cancelled),
        other => Err(LedgerError::Store(
            format!("Unknown session status: {other}").into(),
        )),
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = LedgerError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.id,
            experience_id: row.experience_id,
            date: row.date,
            time: row.time,
            end_date: row.end_date,
            spots_total: row.spots_total,
            spots_available: row.spots_available,
            status: parse_status(&row.status)?,
            price_override_cents: row.price_override_cents,
            price_note: row.price_note,
            created_at: row.created_at,
        })
    }
}

fn store_err(err: sqlx::Error) -> LedgerError {
    LedgerError::Store(Box::new(err))
}

#[async_trait]
impl SessionStore for StoreSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, experience_id, date, time, end_date, spots_total,
                spots_available, status, price_override_cents, price_note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(session.id)
        .bind(session.experience_id)
        .bind(session.date)
        .bind(&session.time)
        .bind(session.end_date)
        .bind(session.spots_total)
        .bind(session.spots_available)
        .bind(status_str(session.status))
        .bind(session.price_override_cents)
        .bind(&session.price_note)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>, LedgerError> {
        let row: Option<SessionRow> = sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(Session::try_from).transpose()
    }

    async fn reserve_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError> {
        // The WHERE clause is the whole concurrency story: two guests racing
        // for the last spots serialize on the row, and the loser matches
        // nothing.
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET spots_available = spots_available - $2
            WHERE id = $1 AND status <> 'cancelled' AND spots_available >= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        match row {
            Some(row) => Session::try_from(row),
            None => {
                // Classify the refusal for the caller
                let current = self.get(id).await?.ok_or(LedgerError::NotFound(id))?;
                if current.status == SessionStatus::Cancelled {
                    Err(LedgerError::SessionClosed(id))
                } else {
                    Err(LedgerError::CapacityExceeded {
                        requested: count,
                        available: current.spots_available,
                    })
                }
            }
        }
    }

    async fn release_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET spots_available = LEAST(spots_available + $2, spots_total)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(count)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.ok_or(LedgerError::NotFound(id))
            .and_then(Session::try_from)
    }

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE sessions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status_str(status))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
