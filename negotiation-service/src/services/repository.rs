use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::error::StorageError;
use crate::models::{NegotiationSession, PaymentMandate};

/// Persistence port for the session aggregate (session plus its rounds).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &NegotiationSession) -> Result<(), StorageError>;

    async fn get(&self, session_id: &str) -> Result<Option<NegotiationSession>, StorageError>;

    /// Replaces the stored session only if its version still equals
    /// `expected_version`. Fails with `StorageError::Conflict` otherwise.
    async fn save(
        &self,
        session: &NegotiationSession,
        expected_version: i64,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait MandateRepository: Send + Sync {
    async fn insert(&self, mandate: &PaymentMandate) -> Result<(), StorageError>;

    async fn get(&self, mandate_id: &str) -> Result<Option<PaymentMandate>, StorageError>;

    async fn save(
        &self,
        mandate: &PaymentMandate,
        expected_version: i64,
    ) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, NegotiationSession>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &NegotiationSession) -> Result<(), StorageError> {
        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "session",
                id: session.session_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<NegotiationSession>, StorageError> {
        Ok(self.sessions.get(session_id).map(|entry| entry.clone()))
    }

    async fn save(
        &self,
        session: &NegotiationSession,
        expected_version: i64,
    ) -> Result<(), StorageError> {
        let conflict = || StorageError::Conflict {
            entity: "session",
            id: session.session_id.clone(),
        };
        let mut stored = self.sessions.get_mut(&session.session_id).ok_or_else(conflict)?;
        if stored.version != expected_version {
            return Err(conflict());
        }
        *stored = session.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMandateRepository {
    mandates: DashMap<String, PaymentMandate>,
}

impl InMemoryMandateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mandates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mandates.is_empty()
    }
}

#[async_trait]
impl MandateRepository for InMemoryMandateRepository {
    async fn insert(&self, mandate: &PaymentMandate) -> Result<(), StorageError> {
        match self.mandates.entry(mandate.mandate_id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Duplicate {
                entity: "mandate",
                id: mandate.mandate_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(mandate.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, mandate_id: &str) -> Result<Option<PaymentMandate>, StorageError> {
        Ok(self.mandates.get(mandate_id).map(|entry| entry.clone()))
    }

    async fn save(
        &self,
        mandate: &PaymentMandate,
        expected_version: i64,
    ) -> Result<(), StorageError> {
        let conflict = || StorageError::Conflict {
            entity: "mandate",
            id: mandate.mandate_id.clone(),
        };
        let mut stored = self.mandates.get_mut(&mandate.mandate_id).ok_or_else(conflict)?;
        if stored.version != expected_version {
            return Err(conflict());
        }
        *stored = mandate.clone();
        Ok(())
    }
}
