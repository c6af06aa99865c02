use async_trait::async_trait;
use mongodb::options::IndexOptions;
use mongodb::{bson::doc, Collection, Database, IndexModel};

use super::error::StorageError;
use super::repository::{MandateRepository, SessionRepository};
use crate::models::{NegotiationSession, PaymentMandate};

#[derive(Clone)]
pub struct MongoSessionRepository {
    collection: Collection<NegotiationSession>,
}

impl MongoSessionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("negotiation_sessions"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), StorageError> {
        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("session_status_idx".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(status_index, None).await?;
        tracing::info!("Negotiation session indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MongoSessionRepository {
    async fn insert(&self, session: &NegotiationSession) -> Result<(), StorageError> {
        self.collection.insert_one(session, None).await?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<NegotiationSession>, StorageError> {
        let filter = doc! { "_id": session_id };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn save(
        &self,
        session: &NegotiationSession,
        expected_version: i64,
    ) -> Result<(), StorageError> {
        let filter = doc! { "_id": session.session_id.as_str(), "version": expected_version };
        let result = self.collection.replace_one(filter, session, None).await?;
        if result.matched_count == 0 {
            return Err(StorageError::Conflict {
                entity: "session",
                id: session.session_id.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MongoMandateRepository {
    collection: Collection<PaymentMandate>,
}

impl MongoMandateRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("payment_mandates"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), StorageError> {
        let session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("mandate_session_idx".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(session_index, None).await?;
        tracing::info!("Payment mandate indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl MandateRepository for MongoMandateRepository {
    async fn insert(&self, mandate: &PaymentMandate) -> Result<(), StorageError> {
        self.collection.insert_one(mandate, None).await?;
        Ok(())
    }

    async fn get(&self, mandate_id: &str) -> Result<Option<PaymentMandate>, StorageError> {
        let filter = doc! { "_id": mandate_id };
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn save(
        &self,
        mandate: &PaymentMandate,
        expected_version: i64,
    ) -> Result<(), StorageError> {
        let filter = doc! { "_id": mandate.mandate_id.as_str(), "version": expected_version };
        let result = self.collection.replace_one(filter, mandate, None).await?;
        if result.matched_count == 0 {
            return Err(StorageError::Conflict {
                entity: "mandate",
                id: mandate.mandate_id.clone(),
            });
        }
        Ok(())
    }
}
