use crate::core::request::{code_from_query, parse_json, parse_submission};
use crate::domain::model::{PatchMeta, PatchView, StoredPatch};
use crate::domain::ports::PatchStore;
use crate::utils::error::{PatchError, Result};
use std::sync::Arc;

/// HTTP method as seen by the handler; everything else is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Other(String),
}

impl RequestMethod {
    pub fn from_name(name: &str) -> Self {
        match name {
            "GET" => RequestMethod::Get,
            "POST" => RequestMethod::Post,
            other => RequestMethod::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub method: RequestMethod,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatchReply {
    /// GET 的結果
    Patch(PatchView),
    /// POST 成功
    Accepted,
}

/// 讀取 / upsert / 稽核的唯一入口
///
/// The store handle is injected at construction. A handler built with
/// [`PatchHandler::unbound`] answers every request with a configuration error.
#[derive(Clone)]
pub struct PatchHandler {
    store: Option<Arc<dyn PatchStore>>,
}

impl PatchHandler {
    pub fn new(store: Arc<dyn PatchStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unbound() -> Self {
        Self { store: None }
    }

    pub fn is_bound(&self) -> bool {
        self.store.is_some()
    }

    pub async fn handle(&self, request: PatchRequest) -> Result<PatchReply> {
        // 先檢查儲存層綁定，再分派 method
        let store = self
            .store
            .as_deref()
            .ok_or_else(PatchError::store_not_configured)?;

        match request.method {
            RequestMethod::Get => {
                let code = code_from_query(request.query.as_deref());
                read_patch(store, &code).await.map(PatchReply::Patch)
            }
            RequestMethod::Post => write_patch(store, &request.body)
                .await
                .map(|_| PatchReply::Accepted),
            RequestMethod::Other(method) => {
                tracing::debug!("Rejecting unsupported method {}", method);
                Err(PatchError::MethodNotAllowed { method })
            }
        }
    }

    pub async fn read(&self, code: &str) -> Result<PatchView> {
        let store = self
            .store
            .as_deref()
            .ok_or_else(PatchError::store_not_configured)?;
        read_patch(store, code.trim()).await
    }

    pub async fn write(&self, body: &[u8]) -> Result<()> {
        let store = self
            .store
            .as_deref()
            .ok_or_else(PatchError::store_not_configured)?;
        write_patch(store, body).await
    }
}

async fn read_patch(store: &dyn PatchStore, code: &str) -> Result<PatchView> {
    if code.is_empty() {
        return Err(PatchError::MissingCode);
    }

    let row = store.fetch_patch(code).await?;
    let view = match row {
        None => {
            tracing::debug!(question_code = code, "No patch stored");
            PatchView::not_found()
        }
        Some(row) => view_from_row(code, row),
    };

    Ok(view)
}

fn view_from_row(code: &str, row: StoredPatch) -> PatchView {
    let patch = row
        .patch_json
        .as_deref()
        .and_then(|raw| parse_json(raw.as_bytes()));

    // 毀損的內容不讓讀取失敗，只回傳 null
    if patch.is_none() {
        tracing::warn!(question_code = code, "Stored patch_json is not valid JSON");
    }

    PatchView {
        patch,
        meta: Some(PatchMeta {
            updated_at: row.updated_at,
            actor: row.actor,
        }),
    }
}

async fn write_patch(store: &dyn PatchStore, body: &[u8]) -> Result<()> {
    let accepted = parse_submission(body)?;
    let upsert = accepted.to_upsert()?;
    let audit = accepted.to_audit_entry()?;

    // 1) upsert question_patch；失敗時不寫稽核
    store.upsert_patch(&upsert).await?;

    // 2) append analysis_log；失敗時不回滾第 1 步
    if let Err(e) = store.append_audit(&audit).await {
        tracing::error!(
            question_code = %accepted.question_code,
            "Patch stored but audit append failed: {}",
            e
        );
        return Err(e);
    }

    tracing::info!(
        question_code = %accepted.question_code,
        actor = accepted.actor.as_deref().unwrap_or("-"),
        source = %accepted.source,
        "Patch upserted"
    );
    Ok(())
}
