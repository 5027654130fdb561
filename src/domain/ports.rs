use crate::domain::model::{AuditEntry, AuditRecord, PatchUpsert, StoredPatch};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 持久化層：一張現況表 (`question_patch`) 與一張只能追加的稽核表 (`analysis_log`)
#[async_trait]
pub trait PatchStore: Send + Sync {
    /// 以 `question_code` 精確比對讀取現況
    async fn fetch_patch(&self, question_code: &str) -> Result<Option<StoredPatch>>;

    /// 單一原子 insert-or-update；重複的 key 會整筆覆蓋 actor、patch_json 並更新 updated_at
    async fn upsert_patch(&self, upsert: &PatchUpsert) -> Result<()>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// 依寫入順序列出某個 code 的稽核紀錄
    async fn audit_trail(&self, question_code: &str) -> Result<Vec<AuditRecord>>;
}

pub trait ConfigProvider: Send + Sync {
    fn bind_addr(&self) -> &str;
    fn database_url(&self) -> Option<&str>;
    fn max_connections(&self) -> u32;
    fn bootstrap_schema(&self) -> bool;
    fn json_logs(&self) -> bool;
}
