//! Persistence gateway for finished interviews and skill profiles.

mod json_dir;
mod memory;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;

use crate::context::SessionContext;
use crate::error::StoreError;
use crate::interview::{EvaluationResult, InterviewRecord, RecordId, SessionRecord};
use crate::profile::SkillProfile;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Stores session records on behalf of their owners.
///
/// Every call carries the caller's [`SessionContext`]; a record owned by
/// someone else yields [`StoreError::Forbidden`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Stores a new record under a fresh identifier, owned by the caller.
    async fn save(
        &self,
        ctx: &SessionContext,
        record: SessionRecord,
    ) -> Result<InterviewRecord, StoreError>;

    async fn fetch(&self, ctx: &SessionContext, id: RecordId)
    -> Result<InterviewRecord, StoreError>;

    /// All records of the caller, newest first.
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<InterviewRecord>, StoreError>;

    async fn delete(&self, ctx: &SessionContext, id: RecordId) -> Result<(), StoreError>;

    /// Replaces any previous evaluation on the record.
    async fn attach_evaluation(
        &self,
        ctx: &SessionContext,
        id: RecordId,
        evaluation: EvaluationResult,
    ) -> Result<InterviewRecord, StoreError>;

    /// The caller's profile, or an empty one if none was saved yet.
    async fn load_profile(&self, ctx: &SessionContext) -> Result<SkillProfile, StoreError>;

    async fn save_profile(
        &self,
        ctx: &SessionContext,
        profile: SkillProfile,
    ) -> Result<(), StoreError>;
}

fn check_owner(
    ctx: &SessionContext,
    record: &InterviewRecord,
) -> Result<(), StoreError> {
    if ctx.owns(&record.session.owner) {
        Ok(())
    } else {
        Err(StoreError::Forbidden(record.id))
    }
}

/// The caller always owns what it saves, whatever owner the record names.
fn owned_by(ctx: &SessionContext, mut record: SessionRecord) -> SessionRecord {
    if !ctx.owns(&record.owner) {
        tracing::warn!(
            "Record for '{}' saved by '{}', storing it under the caller",
            record.owner.as_str(),
            ctx.owner.as_str()
        );
        record.owner = ctx.owner.clone();
    }
    record
}

fn newest_first(records: &mut [InterviewRecord]) {
    records.sort_by(|a, b| b.session.created_at.cmp(&a.session.created_at));
}
