use super::{InterviewStore, check_owner, newest_first, owned_by};
use crate::context::SessionContext;
use crate::error::StoreError;
use crate::interview::{EvaluationResult, InterviewRecord, RecordId, SessionRecord};
use crate::profile::SkillProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordId, InterviewRecord>>,
    profiles: RwLock<HashMap<String, SkillProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn save(
        &self,
        ctx: &SessionContext,
        record: SessionRecord,
    ) -> Result<InterviewRecord, StoreError> {
        let stored = InterviewRecord {
            id: RecordId::generate(),
            session: owned_by(ctx, record),
            evaluation: None,
        };
        self.records.write().await.insert(stored.id, stored.clone());
        tracing::debug!("Stored interview {} in memory", stored.id);
        Ok(stored)
    }

    async fn fetch(
        &self,
        ctx: &SessionContext,
        id: RecordId,
    ) -> Result<InterviewRecord, StoreError> {
        let records = self.records.read().await;
        let record = records.get(&id).ok_or(StoreError::NotFound(id))?;
        check_owner(ctx, record)?;
        Ok(record.clone())
    }

    async fn list(&self, ctx: &SessionContext) -> Result<Vec<InterviewRecord>, StoreError> {
        let mut owned: Vec<InterviewRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| ctx.owns(&r.session.owner))
            .cloned()
            .collect();
        newest_first(&mut owned);
        Ok(owned)
    }

    async fn delete(&self, ctx: &SessionContext, id: RecordId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get(&id).ok_or(StoreError::NotFound(id))?;
        check_owner(ctx, record)?;
        records.remove(&id);
        Ok(())
    }

    async fn attach_evaluation(
        &self,
        ctx: &SessionContext,
        id: RecordId,
        evaluation: EvaluationResult,
    ) -> Result<InterviewRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        check_owner(ctx, record)?;
        record.evaluation = Some(evaluation);
        Ok(record.clone())
    }

    async fn load_profile(&self, ctx: &SessionContext) -> Result<SkillProfile, StoreError> {
        Ok(self
            .profiles
            .read()
            .await
            .get(ctx.owner.as_str())
            .cloned()
            .unwrap_or_else(|| SkillProfile::empty(ctx.owner.clone())))
    }

    async fn save_profile(
        &self,
        ctx: &SessionContext,
        profile: SkillProfile,
    ) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(ctx.owner.as_str().to_string(), profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn save_then_fetch_round_trips() {
        contract::save_then_fetch_round_trips(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn list_is_scoped_and_newest_first() {
        contract::list_is_scoped_and_newest_first(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn other_owners_are_forbidden() {
        contract::other_owners_are_forbidden(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn save_belongs_to_caller() {
        contract::save_belongs_to_caller(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn delete_then_fetch_is_not_found() {
        contract::delete_then_fetch_is_not_found(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn evaluation_overwrites() {
        contract::evaluation_overwrites(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn profile_defaults_then_persists() {
        contract::profile_defaults_then_persists(&MemoryStore::new()).await;
    }
}
