use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{Client, Collection};
use tracing::debug;

use crate::document::{from_document, to_document};
use crate::{
    Assessment, AssessmentId, AssessmentRepository, ConnectionSettings, RepositoryConnector,
    RepositoryError,
};

pub const ASSESSMENTS_COLLECTION: &str = "assessments";

#[derive(Clone)]
pub struct MongoRepository {
    collection: Collection<Document>,
}

impl MongoRepository {
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, RepositoryError> {
        let client = Client::with_uri_str(settings.connection_uri()?).await?;
        let collection = client
            .database(&settings.database)
            .collection::<Document>(ASSESSMENTS_COLLECTION);
        Ok(Self { collection })
    }
}

#[async_trait]
impl AssessmentRepository for MongoRepository {
    async fn upsert(&self, assessment: &Assessment) -> Result<(), RepositoryError> {
        let replacement = to_document(assessment)?;

        let result = self
            .collection
            .replace_one(doc! { "_id": assessment.id.to_bson() }, replacement)
            .upsert(true)
            .await?;

        debug!(
            id = %assessment.id,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "assessment written"
        );
        Ok(())
    }

    async fn fetch(&self, id: &AssessmentId) -> Result<Assessment, RepositoryError> {
        match self.collection.find_one(doc! { "_id": id.to_bson() }).await? {
            Some(document) => from_document(&document),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }
}

/// Connects [`MongoRepository`] instances for the importer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl RepositoryConnector for MongoConnector {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn AssessmentRepository>, RepositoryError> {
        Ok(Arc::new(MongoRepository::connect(settings).await?))
    }
}
