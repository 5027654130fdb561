use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 稽核紀錄預設來源
pub const DEFAULT_SOURCE: &str = "ui";

/// 本 handler 寫入稽核紀錄時使用的 action
pub const PATCH_UPSERT_ACTION: &str = "patch_upsert";

/// `question_patch` 表中的一列 (僅讀取時需要的欄位)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPatch {
    /// 原始 JSON 字串；資料毀損時可能無法解析，也可能為 NULL
    pub patch_json: Option<String>,
    pub updated_at: Option<String>,
    pub actor: Option<String>,
}

/// 寫入 `question_patch` 的 upsert 指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUpsert {
    pub question_code: String,
    pub actor: Option<String>,
    pub patch_json: String,
}

/// 追加到 `analysis_log` 的稽核紀錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub actor: Option<String>,
    pub source: String,
    pub action: String,
    pub question_code: String,
    pub payload_json: String,
}

/// 已寫入的稽核紀錄，帶有儲存層指派的欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub actor: Option<String>,
    pub source: String,
    pub action: String,
    pub question_code: Option<String>,
    pub payload_json: Option<String>,
    pub created_at: Option<String>,
}

/// POST body 的原始形狀；所有欄位都是選填，驗證在 core 層進行
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchSubmission {
    #[serde(default)]
    pub question_code: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub patch: Option<Value>,
}

/// 通過驗證並正規化後的寫入請求
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedPatch {
    pub question_code: String,
    pub actor: Option<String>,
    pub source: String,
    pub patch: Map<String, Value>,
}

#[derive(Serialize)]
struct AuditPayload<'a> {
    question_code: &'a str,
    patch: &'a Map<String, Value>,
}

impl AcceptedPatch {
    pub fn to_upsert(&self) -> serde_json::Result<PatchUpsert> {
        Ok(PatchUpsert {
            question_code: self.question_code.clone(),
            actor: self.actor.clone(),
            patch_json: serde_json::to_string(&self.patch)?,
        })
    }

    pub fn to_audit_entry(&self) -> serde_json::Result<AuditEntry> {
        let payload = AuditPayload {
            question_code: &self.question_code,
            patch: &self.patch,
        };

        Ok(AuditEntry {
            actor: self.actor.clone(),
            source: self.source.clone(),
            action: PATCH_UPSERT_ACTION.to_string(),
            question_code: self.question_code.clone(),
            payload_json: serde_json::to_string(&payload)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchMeta {
    pub updated_at: Option<String>,
    pub actor: Option<String>,
}

/// GET 的回應內容；找不到資料時沒有 `meta`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchView {
    pub patch: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PatchMeta>,
}

impl PatchView {
    pub fn not_found() -> Self {
        Self {
            patch: None,
            meta: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
