use crate::experience::Experience;
use crate::session::{Session, SessionStatus};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("Session is cancelled: {0}")]
    SessionClosed(Uuid),

    #[error("Spot count must be positive, got {0}")]
    InvalidCount(i32),

    #[error("Store error: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence contract for sessions. `reserve_spots`/`release_spots` must be
/// atomic read-modify-write (row-level conditional update or equivalent);
/// concurrent guests racing for the last spots of a session is the expected
/// case, not the exception.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), LedgerError>;

    async fn get(&self, id: Uuid) -> Result<Option<Session>, LedgerError>;

    /// Atomically decrement available spots. Fails with `CapacityExceeded`
    /// without mutating anything when `count > available`.
    async fn reserve_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError>;

    /// Atomically increment available spots, capped at the session total.
    async fn release_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError>;

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<(), LedgerError>;

    async fn delete(&self, id: Uuid) -> Result<(), LedgerError>;
}

/// Central gate for session spot accounting. All spot mutation goes through
/// `reserve`/`release` so the invariant `0 <= available <= total` is enforced
/// in one place.
#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn SessionStore>,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn get(&self, session_id: Uuid) -> Result<Session, LedgerError> {
        self.store
            .get(session_id)
            .await?
            .ok_or(LedgerError::NotFound(session_id))
    }

    /// Hold `count` spots on a session. Flips the session to `booked` when it
    /// fills up.
    pub async fn reserve(&self, session_id: Uuid, count: i32) -> Result<Session, LedgerError> {
        if count < 1 {
            return Err(LedgerError::InvalidCount(count));
        }
        let session = self.store.reserve_spots(session_id, count).await?;
        if session.is_full() && session.status == SessionStatus::Available {
            self.store.set_status(session_id, SessionStatus::Booked).await?;
        }
        Ok(session)
    }

    /// Return `count` held spots to a session. Reopens a full (`booked`)
    /// session when spots free up; a cancelled session stays cancelled.
    pub async fn release(&self, session_id: Uuid, count: i32) -> Result<Session, LedgerError> {
        if count < 1 {
            return Err(LedgerError::InvalidCount(count));
        }
        let session = self.store.release_spots(session_id, count).await?;
        if session.spots_available > 0 && session.status == SessionStatus::Booked {
            self.store
                .set_status(session_id, SessionStatus::Available)
                .await?;
        }
        Ok(session)
    }

    /// Synthesize a single-purpose session for an accepted free-form request:
    /// full capacity claimed, status `booked`, never listed as available.
    pub async fn create_private_session(
        &self,
        experience: &Experience,
        date: NaiveDate,
        time: String,
    ) -> Result<Session, LedgerError> {
        let spots = experience.max_participants.max(1);
        let mut session = Session::new(experience.id, date, time, spots);
        session.spots_available = 0;
        session.status = SessionStatus::Booked;
        self.store.insert(&session).await?;
        Ok(session)
    }
}

/// In-memory session store; the mutex gives the same atomicity the Postgres
/// implementation gets from conditional updates.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: &Session) -> Result<(), LedgerError> {
        self.sessions.lock().await.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>, LedgerError> {
        Ok(self.sessions.lock().await.get(&id).cloned())
    }

    async fn reserve_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        if session.status == SessionStatus::Cancelled {
            return Err(LedgerError::SessionClosed(id));
        }
        if session.spots_available < count {
            return Err(LedgerError::CapacityExceeded {
                requested: count,
                available: session.spots_available,
            });
        }
        session.spots_available -= count;
        Ok(session.clone())
    }

    async fn release_spots(&self, id: Uuid, count: i32) -> Result<Session, LedgerError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        session.spots_available = (session.spots_available + count).min(session.spots_total);
        Ok(session.clone())
    }

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<(), LedgerError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        session.status = status;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), LedgerError> {
        self.sessions.lock().await.remove(&id);
        Ok(())
    }
}
