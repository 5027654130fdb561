use crate::domain::model::{AuditEntry, AuditRecord, PatchUpsert, StoredPatch};
use crate::domain::ports::PatchStore;
use crate::utils::error::{PatchError, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    patches: HashMap<String, StoredPatch>,
    audit: Vec<AuditRecord>,
}

/// 記憶體內的儲存層，用於本機開發與測試
///
/// Upsert and audit append can be switched to fail independently, which lets
/// callers observe the two-step write ordering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fetches: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_audit_appends: AtomicBool,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    /// 直接寫入一列，不經過驗證 (可用來模擬毀損資料)
    pub async fn insert_raw(
        &self,
        question_code: &str,
        patch_json: Option<&str>,
        actor: Option<&str>,
    ) {
        let mut state = self.state.lock().await;
        state.patches.insert(
            question_code.to_string(),
            StoredPatch {
                patch_json: patch_json.map(str::to_string),
                updated_at: Some(now_timestamp()),
                actor: actor.map(str::to_string),
            },
        );
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn patch_count(&self) -> usize {
        self.state.lock().await.patches.len()
    }

    pub async fn audit_count(&self) -> usize {
        self.state.lock().await.audit.len()
    }
}

#[async_trait]
impl PatchStore for MemoryStore {
    async fn fetch_patch(&self, question_code: &str) -> Result<Option<StoredPatch>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(state.patches.get(question_code).cloned())
    }

    async fn upsert_patch(&self, upsert: &PatchUpsert) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(PatchError::StoreError {
                message: format!("upsert rejected for {}", upsert.question_code),
            });
        }

        let mut state = self.state.lock().await;
        let mut updated_at = now_timestamp();

        // 時鐘倒退時沿用舊值，updated_at 不可遞減
        if let Some(previous) = state
            .patches
            .get(&upsert.question_code)
            .and_then(|row| row.updated_at.as_ref())
        {
            if *previous > updated_at {
                updated_at = previous.clone();
            }
        }

        state.patches.insert(
            upsert.question_code.clone(),
            StoredPatch {
                patch_json: Some(upsert.patch_json.clone()),
                updated_at: Some(updated_at),
                actor: upsert.actor.clone(),
            },
        );
        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        if self.fail_audit_appends.load(Ordering::SeqCst) {
            return Err(PatchError::StoreError {
                message: format!("audit append rejected for {}", entry.question_code),
            });
        }

        let mut state = self.state.lock().await;
        let id = state.audit.len() as i64 + 1;
        state.audit.push(AuditRecord {
            id,
            actor: entry.actor.clone(),
            source: entry.source.clone(),
            action: entry.action.clone(),
            question_code: Some(entry.question_code.clone()),
            payload_json: Some(entry.payload_json.clone()),
            created_at: Some(now_timestamp()),
        });
        Ok(())
    }

    async fn audit_trail(&self, question_code: &str) -> Result<Vec<AuditRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|record| record.question_code.as_deref() == Some(question_code))
            .cloned()
            .collect())
    }
}
