use super::{InterviewStore, check_owner, newest_first, owned_by};
use crate::context::SessionContext;
use crate::error::StoreError;
use crate::interview::{EvaluationResult, InterviewRecord, RecordId, SessionRecord};
use crate::profile::SkillProfile;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Document store keeping one JSON file per record.
///
/// Layout:
/// ```text
/// <root>/interviews/<id>.json
/// <root>/profiles/<owner>.json
/// ```
pub struct JsonDirStore {
    root: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Opens the store, creating its directories if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("interviews")).await?;
        fs::create_dir_all(root.join("profiles")).await?;
        tracing::info!("Opened interview store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: RecordId) -> PathBuf {
        self.root.join("interviews").join(format!("{id}.json"))
    }

    fn profile_path(&self, ctx: &SessionContext) -> PathBuf {
        self.root
            .join("profiles")
            .join(format!("{}.json", file_safe(ctx.owner.as_str())))
    }

    async fn read_record(&self, id: RecordId) -> Result<InterviewRecord, StoreError> {
        read_json(&self.record_path(id))
            .await?
            .ok_or(StoreError::NotFound(id))
    }
}

/// Escapes everything outside `[A-Za-z0-9_-]` so an owner id is a safe file name.
fn file_safe(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes to a sibling temp file and renames it over `path`.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl InterviewStore for JsonDirStore {
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
        let _guard = self.write_lock.lock().await;
        write_json(&self.record_path(stored.id), &stored).await?;
        tracing::info!("Saved interview {}", stored.id);
        Ok(stored)
    }

    async fn fetch(
        &self,
        ctx: &SessionContext,
        id: RecordId,
    ) -> Result<InterviewRecord, StoreError> {
        let record = self.read_record(id).await?;
        check_owner(ctx, &record)?;
        Ok(record)
    }

    async fn list(&self, ctx: &SessionContext) -> Result<Vec<InterviewRecord>, StoreError> {
        let mut owned = Vec::new();
        let mut entries = fs::read_dir(self.root.join("interviews")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match read_json::<InterviewRecord>(&path).await {
                Ok(Some(record)) if ctx.owns(&record.session.owner) => owned.push(record),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        newest_first(&mut owned);
        Ok(owned)
    }

    async fn delete(&self, ctx: &SessionContext, id: RecordId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let record = self.read_record(id).await?;
        check_owner(ctx, &record)?;
        fs::remove_file(self.record_path(id)).await?;
        tracing::info!("Deleted interview {}", id);
        Ok(())
    }

    async fn attach_evaluation(
        &self,
        ctx: &SessionContext,
        id: RecordId,
        evaluation: EvaluationResult,
    ) -> Result<InterviewRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(id).await?;
        check_owner(ctx, &record)?;
        record.evaluation = Some(evaluation);
        write_json(&self.record_path(id), &record).await?;
        Ok(record)
    }

    async fn load_profile(&self, ctx: &SessionContext) -> Result<SkillProfile, StoreError> {
        Ok(read_json(&self.profile_path(ctx))
            .await?
            .unwrap_or_else(|| SkillProfile::empty(ctx.owner.clone())))
    }

    async fn save_profile(
        &self,
        ctx: &SessionContext,
        profile: SkillProfile,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.profile_path(ctx), &profile).await
    }
}
