use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Assessment, AssessmentId, AssessmentRepository, ConnectionSettings, RepositoryConnector,
    RepositoryError,
};

#[derive(Debug, Default)]
struct State {
    documents: HashMap<AssessmentId, Assessment>,
    rejected_ids: HashSet<AssessmentId>,
    upserts: usize,
    connections: Vec<ConnectionSettings>,
}

/// In-memory repository for development/testing.
///
/// Also acts as its own [`RepositoryConnector`]; clones share state so tests
/// can observe what an import wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert of `id` fail with [`RepositoryError::Rejected`].
    pub fn reject_upserts_for(&self, id: impl Into<AssessmentId>) {
        self.lock().rejected_ids.insert(id.into());
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    /// Stored ids in key order, rendered as text.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<AssessmentId> = self.lock().documents.keys().cloned().collect();
        ids.sort();
        ids.iter().map(AssessmentId::to_string).collect()
    }

    pub fn get(&self, id: impl Into<AssessmentId>) -> Option<Assessment> {
        self.lock().documents.get(&id.into()).cloned()
    }

    /// Number of upserts accepted so far, including overwrites.
    pub fn upsert_count(&self) -> usize {
        self.lock().upserts
    }

    pub fn connections(&self) -> Vec<ConnectionSettings> {
        self.lock().connections.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AssessmentRepository for MemoryRepository {
    async fn upsert(&self, assessment: &Assessment) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.rejected_ids.contains(&assessment.id) {
            return Err(RepositoryError::Rejected(assessment.id.to_string()));
        }

        let replaced = state
            .documents
            .insert(assessment.id.clone(), assessment.clone())
            .is_some();
        state.upserts += 1;

        debug!(id = %assessment.id, replaced, "assessment stored in memory");
        Ok(())
    }

    async fn fetch(&self, id: &AssessmentId) -> Result<Assessment, RepositoryError> {
        self.get(id.clone())
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl RepositoryConnector for MemoryRepository {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn AssessmentRepository>, RepositoryError> {
        self.lock().connections.push(settings.clone());
        Ok(Arc::new(self.clone()))
    }
}
