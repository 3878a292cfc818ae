use chrono::Utc;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use ulid::{Generator, Ulid};

use crate::error::{ServiceError, ServiceResult};
use crate::lesson_tools::types::WeeklyPlanRecord;
use crate::types::{DraftSummary, StorageData, WeeklyDraft};

/// `~/.lesson-planner/drafts.json`, or `./.lesson-planner/drafts.json` without a home directory.
pub fn default_drafts_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lesson-planner")
        .join("drafts.json")
}

/// JSON file holding every weekly plan draft.
///
/// Mutations only touch memory; callers persist with `save()` or `save_async()`.
pub struct DraftStore {
    storage_path: PathBuf,
    data: StorageData,
    ids: Generator,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::with_path(default_drafts_path())
    }

    pub fn with_path(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            data: StorageData::default(),
            ids: Generator::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Load the file if it exists, otherwise create it empty.
    pub fn initialize(&mut self) -> ServiceResult<()> {
        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.storage_path.exists() {
            let mut file = File::open(&self.storage_path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            self.data = serde_json::from_str(&contents)?;
            debug!(path = %self.storage_path.display(), drafts = self.data.drafts.len(), "Loaded drafts");
        } else {
            self.save()?;
        }

        Ok(())
    }

    fn write_snapshot(storage_path: &Path, data: &StorageData) -> ServiceResult<()> {
        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = storage_path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(data)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, storage_path)?;
        Ok(())
    }

    /// Write through a temporary file and an atomic rename.
    pub fn save(&self) -> ServiceResult<()> {
        Self::write_snapshot(&self.storage_path, &self.data)
    }

    /// Same as `save()`, on a blocking task with a snapshot of the current data.
    pub async fn save_async(&self) -> ServiceResult<()> {
        let path = self.storage_path.clone();
        let data = self.data.clone();
        tokio::task::spawn_blocking(move || Self::write_snapshot(&path, &data))
            .await
            .map_err(|e| {
                ServiceError::IoError(std::io::Error::other(format!(
                    "spawn_blocking failed: {}",
                    e
                )))
            })?
    }

    /// Apply `change` and persist the result. On any error the in-memory data is
    /// restored, so memory never holds a change the file does not.
    pub async fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Self) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let previous = self.data.clone();
        let outcome = match change(self) {
            Ok(value) => self.save_async().await.map(|()| value),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            self.data = previous;
        }
        outcome
    }

    pub fn create_draft(&mut self, record: WeeklyPlanRecord) -> WeeklyDraft {
        let now = Utc::now().to_rfc3339();
        // monotonic within a millisecond, so ids keep creation order
        let id = self.ids.generate().unwrap_or_else(|_| Ulid::new());
        let draft = WeeklyDraft {
            id: id.to_string(),
            record,
            created_at: now.clone(),
            updated_at: now,
        };
        self.data.drafts.insert(draft.id.clone(), draft.clone());
        draft
    }

    pub fn get_draft(&self, id: &str) -> ServiceResult<WeeklyDraft> {
        self.data
            .drafts
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::DraftNotFound(id.to_string()))
    }

    /// Newest first.
    pub fn list_drafts(&self) -> Vec<DraftSummary> {
        let mut drafts: Vec<&WeeklyDraft> = self.data.drafts.values().collect();
        // ULIDs sort by creation time
        drafts.sort_by(|a, b| b.id.cmp(&a.id));
        drafts.into_iter().map(DraftSummary::from).collect()
    }

    /// Replace one field of a draft, addressed by path (`monday.step_a`, `portal_link`).
    pub fn edit_draft(&mut self, id: &str, field: &str, value: &str) -> ServiceResult<WeeklyDraft> {
        let draft = self
            .data
            .drafts
            .get_mut(id)
            .ok_or_else(|| ServiceError::DraftNotFound(id.to_string()))?;
        draft.record.set_field(field, value)?;
        draft.updated_at = Utc::now().to_rfc3339();
        Ok(draft.clone())
    }

    pub fn delete_draft(&mut self, id: &str) -> ServiceResult<WeeklyDraft> {
        self.data
            .drafts
            .remove(id)
            .ok_or_else(|| ServiceError::DraftNotFound(id.to_string()))
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}
