use crate::domain::model::{AcceptedPatch, PatchSubmission, DEFAULT_SOURCE};
use crate::utils::error::{PatchError, Result};
use serde_json::Value;

/// 解析 JSON；失敗時回傳 `None`，由呼叫端決定如何處理
pub fn parse_json(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// 從 query string 取出 `code` (第一個出現的值)，去除前後空白
pub fn code_from_query(query: Option<&str>) -> String {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "code")
                .map(|(_, value)| value.trim().to_string())
        })
        .unwrap_or_default()
}

/// 將 POST body 轉成經過驗證的寫入請求
pub fn parse_submission(body: &[u8]) -> Result<AcceptedPatch> {
    let value = match parse_json(body) {
        Some(value @ Value::Object(_)) => value,
        Some(value) if is_truthy(&value) => {
            // 非物件但有值 (陣列、數字、字串) 沒有 question_code 欄位
            return Err(PatchError::MissingQuestionCode);
        }
        _ => return Err(PatchError::InvalidJson),
    };

    // 欄位型別錯誤 (例如 actor 是數字) 視為無法反序列化
    let submission: PatchSubmission =
        serde_json::from_value(value).map_err(|_| PatchError::InvalidJson)?;

    normalize(submission)
}

/// `null`、`false`、`0`、`""` 視同沒有 body
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn normalize(submission: PatchSubmission) -> Result<AcceptedPatch> {
    let question_code = submission
        .question_code
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let actor = submission
        .actor
        .as_deref()
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .map(str::to_string);

    let source = submission
        .source
        .as_deref()
        .map(str::trim)
        .filter(|source| !source.is_empty())
        .unwrap_or(DEFAULT_SOURCE)
        .to_string();

    if question_code.is_empty() {
        return Err(PatchError::MissingQuestionCode);
    }

    let patch = match submission.patch {
        Some(Value::Object(patch)) => patch,
        _ => return Err(PatchError::MissingPatch),
    };

    Ok(AcceptedPatch {
        question_code,
        actor,
        source,
        patch,
    })
}
