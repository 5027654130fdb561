use crate::domain::model::{AuditEntry, AuditRecord, PatchUpsert, StoredPatch};
use crate::domain::ports::PatchStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS question_patch (
        question_code TEXT PRIMARY KEY,
        actor TEXT,
        patch_json TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    r#"CREATE TABLE IF NOT EXISTS analysis_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor TEXT,
        source TEXT NOT NULL DEFAULT 'ui',
        action TEXT NOT NULL,
        question_code TEXT,
        payload_json TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_analysis_log_question_code ON analysis_log (question_code)",
];

// 單一敘述完成 insert-or-update，並發寫入同一 key 時由 SQLite 保證原子性
const UPSERT_PATCH: &str = r#"
    INSERT INTO question_patch (question_code, actor, patch_json)
    VALUES (?, ?, ?)
    ON CONFLICT(question_code) DO UPDATE SET
        updated_at = (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
        actor = excluded.actor,
        patch_json = excluded.patch_json
"#;

const APPEND_AUDIT: &str = r#"
    INSERT INTO analysis_log (actor, source, action, question_code, payload_json)
    VALUES (?, ?, ?, ?, ?)
"#;

/// SQLite-backed store for `question_patch` and `analysis_log`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// 連線到 SQLite；檔案不存在時會建立
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // 每個 :memory: 連線都是獨立的資料庫，只能用單一且不回收的連線
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        let max_connections = if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
            1
        } else {
            max_connections.max(1)
        };

        let pool = pool_options
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        tracing::debug!("Connected to {} (max_connections={})", url, max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// 建立資料表 (可重複執行)
    pub async fn bootstrap_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("✅ Schema ready (question_patch, analysis_log)");
        Ok(())
    }
}

#[async_trait]
impl PatchStore for SqliteStore {
    async fn fetch_patch(&self, question_code: &str) -> Result<Option<StoredPatch>> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT patch_json, updated_at, actor FROM question_patch WHERE question_code = ?",
        )
        .bind(question_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(patch_json, updated_at, actor)| StoredPatch {
            patch_json,
            updated_at,
            actor,
        }))
    }

    async fn upsert_patch(&self, upsert: &PatchUpsert) -> Result<()> {
        sqlx::query(UPSERT_PATCH)
            .bind(&upsert.question_code)
            .bind(upsert.actor.as_deref())
            .bind(&upsert.patch_json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(APPEND_AUDIT)
            .bind(entry.actor.as_deref())
            .bind(&entry.source)
            .bind(&entry.action)
            .bind(&entry.question_code)
            .bind(&entry.payload_json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn audit_trail(&self, question_code: &str) -> Result<Vec<AuditRecord>> {
        let rows: Vec<(
            i64,
            Option<String>,
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = sqlx::query_as(
            "SELECT id, actor, source, action, question_code, payload_json, created_at \
             FROM analysis_log WHERE question_code = ? ORDER BY id",
        )
        .bind(question_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, actor, source, action, question_code, payload_json, created_at)| {
                    AuditRecord {
                        id,
                        actor,
                        source,
                        action,
                        question_code,
                        payload_json,
                        created_at,
                    }
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::PATCH_UPSERT_ACTION;

    async fn memory_store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:", 5).await.unwrap();
        store.bootstrap_schema().await.unwrap();
        store
    }

    fn upsert(code: &str, actor: Option<&str>, patch_json: &str) -> PatchUpsert {
        PatchUpsert {
            question_code: code.to_string(),
            actor: actor.map(str::to_string),
            patch_json: patch_json.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = memory_store().await;
        store.bootstrap_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_missing_row() {
        let store = memory_store().await;
        assert_eq!(store.fetch_patch("NOPE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = memory_store().await;

        store
            .upsert_patch(&upsert("105A024", Some("alice"), r#"{"difficulty":"hard"}"#))
            .await
            .unwrap();
        let first = store.fetch_patch("105A024").await.unwrap().unwrap();
        assert_eq!(first.actor.as_deref(), Some("alice"));
        assert_eq!(first.patch_json.as_deref(), Some(r#"{"difficulty":"hard"}"#));
        assert!(first.updated_at.is_some());

        store
            .upsert_patch(&upsert("105A024", None, r#"{"difficulty":"easy"}"#))
            .await
            .unwrap();
        let second = store.fetch_patch("105A024").await.unwrap().unwrap();
        assert_eq!(second.actor, None);
        assert_eq!(second.patch_json.as_deref(), Some(r#"{"difficulty":"easy"}"#));
        assert!(second.updated_at >= first.updated_at);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM question_patch")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_audit_rows_are_appended() {
        let store = memory_store().await;
        let entry = AuditEntry {
            actor: Some("alice".to_string()),
            source: "ui".to_string(),
            action: PATCH_UPSERT_ACTION.to_string(),
            question_code: "Q1".to_string(),
            payload_json: r#"{"question_code":"Q1","patch":{}}"#.to_string(),
        };

        store.append_audit(&entry).await.unwrap();
        store.append_audit(&entry).await.unwrap();

        let trail = store.audit_trail("Q1").await.unwrap();
        assert_eq!(trail.len(), 2);
        assert!(trail[0].id < trail[1].id);
        assert_eq!(trail[0].action, PATCH_UPSERT_ACTION);
        assert_eq!(trail[0].payload_json, Some(entry.payload_json.clone()));
        assert!(trail[1].created_at.is_some());
    }

    #[tokio::test]
    async fn test_upsert_fails_without_schema() {
        let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
        let result = store.upsert_patch(&upsert("Q1", None, "{}")).await;
        assert!(matches!(
            result,
            Err(crate::utils::error::PatchError::DatabaseError(_))
        ));
    }
}
