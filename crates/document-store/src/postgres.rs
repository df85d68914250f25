use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::{
    Direction, Document, DocumentPath, DocumentQuery, FieldFilter, QueryPage, Result, StoreError,
    Version,
    store::{DocumentStore, Transaction, Write, validate_path, validate_transaction},
};

/// PostgreSQL-backed document store.
///
/// Documents live in a single `documents` table keyed by
/// `(collection, id)` with a JSONB body and a revision counter.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        let collection: String = row.try_get("collection").map_err(classify_database_error)?;
        let id: String = row.try_get("id").map_err(classify_database_error)?;
        Ok(Document {
            path: DocumentPath::new(collection, id),
            data: row.try_get("data").map_err(classify_database_error)?,
            version: Version::new(row.try_get("version").map_err(classify_database_error)?),
            updated_at: row.try_get("updated_at").map_err(classify_database_error)?,
        })
    }
}

/// Inserts a document, continuing from its tombstone version if it was
/// deleted before.
const INSERT_DOCUMENT: &str = r#"
    INSERT INTO documents (collection, id, data, version, updated_at)
    VALUES (
        $1, $2, $3,
        COALESCE(
            (SELECT version FROM document_tombstones WHERE collection = $1 AND id = $2),
            0
        ) + 1,
        now()
    )
"#;

const UPSERT_CONFLICT: &str = r#"
    ON CONFLICT (collection, id) DO UPDATE SET
        data = EXCLUDED.data,
        version = documents.version + 1,
        updated_at = now()
"#;

const DELETE_DOCUMENT: &str = r#"
    WITH gone AS (
        DELETE FROM documents WHERE collection = $1 AND id = $2
        RETURNING collection, id, version
    )
    INSERT INTO document_tombstones (collection, id, version)
    SELECT collection, id, version FROM gone
    ON CONFLICT (collection, id) DO UPDATE SET version = EXCLUDED.version
"#;

/// Maps a driver error onto the store's error kinds.
///
/// This is the only place that inspects database error codes; everything
/// above the store works with `StoreError` kinds.
pub fn classify_database_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            // insufficient_privilege, raised for grants and row-level security.
            // Other 42xxx codes are syntax or schema errors and stay `Database`.
            Some("42501") => {
                return StoreError::PermissionDenied {
                    operation: "write",
                    path: db_err.table().unwrap_or("documents").to_string(),
                };
            }
            // serialization_failure, deadlock_detected, and a unique_violation
            // when a concurrent writer created the same document first
            Some("40001") | Some("40P01") | Some("23505") => {
                return StoreError::Aborted {
                    path: db_err.table().unwrap_or("documents").to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT collection, id, data, version, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(path.collection())
        .bind(path.id())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_database_error)?;

        row.map(Self::row_to_document).transpose()
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> Result<()> {
        validate_path(path)?;
        let sql = format!("{INSERT_DOCUMENT}{UPSERT_CONFLICT}");
        sqlx::query(&sql)
            .bind(path.collection())
            .bind(path.id())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(classify_database_error)?;

        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Map<String, Value>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, version = version + 1, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(path.collection())
        .bind(path.id())
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await
        .map_err(classify_database_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        sqlx::query(DELETE_DOCUMENT)
            .bind(path.collection())
            .bind(path.id())
            .execute(&self.pool)
            .await
            .map_err(classify_database_error)?;
        Ok(())
    }

    async fn query(&self, query: DocumentQuery) -> Result<QueryPage> {
        let mut sql: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT collection, id, data, version, updated_at FROM documents WHERE collection = ",
        );
        sql.push_bind(query.collection.clone());

        for filter in &query.filters {
            let op = match filter {
                FieldFilter::Eq(..) => " = ",
                FieldFilter::Gte(..) => " >= ",
                FieldFilter::Lte(..) => " <= ",
            };
            let value = match filter {
                FieldFilter::Eq(_, v) | FieldFilter::Gte(_, v) | FieldFilter::Lte(_, v) => v,
            };
            // jsonb ordering ranks types first; restrict to same-typed values
            sql.push(" AND jsonb_typeof(data #> ");
            sql.push_bind(field_path(filter.field()));
            sql.push(") = jsonb_typeof(");
            sql.push_bind(value.clone());
            sql.push(") AND data #> ");
            sql.push_bind(field_path(filter.field()));
            sql.push(op);
            sql.push_bind(value.clone());
        }

        let descending = query.direction() == Direction::Descending;
        let comparison = if descending { " < " } else { " > " };

        if let Some(cursor) = &query.start_after {
            match query.order_field() {
                Some(field) => {
                    sql.push(" AND (COALESCE(data #> ");
                    sql.push_bind(field_path(field));
                    sql.push(", 'null'::jsonb), id)");
                    sql.push(comparison);
                    sql.push("(");
                    sql.push_bind(cursor.value.clone());
                    sql.push(", ");
                    sql.push_bind(cursor.id.clone());
                    sql.push(")");
                }
                None => {
                    sql.push(" AND id");
                    sql.push(comparison);
                    sql.push_bind(cursor.id.clone());
                }
            }
        }

        let direction = if descending { " DESC" } else { " ASC" };
        match query.order_field() {
            Some(field) => {
                sql.push(" ORDER BY COALESCE(data #> ");
                sql.push_bind(field_path(field));
                sql.push(", 'null'::jsonb)");
                sql.push(direction);
                sql.push(", id");
                sql.push(direction);
            }
            None => {
                sql.push(" ORDER BY id");
                sql.push(direction);
            }
        }

        if let Some(limit) = query.limit {
            let limit = i64::try_from(limit)
                .map_err(|_| StoreError::InvalidQuery(format!("limit {limit} is too large")))?;
            sql.push(" LIMIT ");
            sql.push_bind(limit);
        }

        let rows = sql
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(classify_database_error)?;
        let documents = rows
            .into_iter()
            .map(Self::row_to_document)
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryPage::new(documents, &query))
    }

    async fn commit(&self, tx: Transaction) -> Result<()> {
        validate_transaction(&tx)?;

        let mut db_tx = self.pool.begin().await.map_err(classify_database_error)?;

        // Lock and verify the read set
        for (path, observed) in tx.reads() {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(path.collection())
            .bind(path.id())
            .fetch_optional(&mut *db_tx)
            .await
            .map_err(classify_database_error)?;

            if current.unwrap_or(0) != observed.as_i64() {
                metrics::counter!("store_transaction_aborts_total").increment(1);
                tracing::debug!(%path, "transaction read set is stale");
                return Err(StoreError::Aborted {
                    path: path.to_string(),
                });
            }
        }

        for write in tx.writes() {
            match write {
                Write::Set { path, data } => {
                    // A document read as absent must still be absent: a plain
                    // insert turns a concurrent create into a unique violation.
                    let sql = if tx.read_version(path) == Some(Version::initial()) {
                        INSERT_DOCUMENT.to_string()
                    } else {
                        format!("{INSERT_DOCUMENT}{UPSERT_CONFLICT}")
                    };
                    sqlx::query(&sql)
                        .bind(path.collection())
                        .bind(path.id())
                        .bind(data)
                        .execute(&mut *db_tx)
                        .await
                        .map_err(classify_database_error)?;
                }
                Write::Update { path, fields } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE documents
                        SET data = data || $3, version = version + 1, updated_at = now()
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(path.collection())
                    .bind(path.id())
                    .bind(Value::Object(fields.clone()))
                    .execute(&mut *db_tx)
                    .await
                    .map_err(classify_database_error)?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::NotFound(path.to_string()));
                    }
                }
                Write::Delete { path } => {
                    sqlx::query(DELETE_DOCUMENT)
                        .bind(path.collection())
                        .bind(path.id())
                        .execute(&mut *db_tx)
                        .await
                        .map_err(classify_database_error)?;
                }
            }
        }

        db_tx.commit().await.map_err(classify_database_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct SqlState(&'static str);

    impl fmt::Display for SqlState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl StdError for SqlState {}

    impl DatabaseError for SqlState {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn classify(code: &'static str) -> StoreError {
        classify_database_error(sqlx::Error::Database(Box::new(SqlState(code))))
    }

    #[test]
    fn test_sqlstate_classification() {
        assert!(classify("42501").is_permission_denied());
        assert!(classify("40001").is_aborted());
        assert!(classify("40P01").is_aborted());
        assert!(classify("23505").is_aborted());
    }

    #[test]
    fn test_schema_errors_are_not_permission_failures() {
        for code in ["42000", "42601", "42P01"] {
            let err = classify(code);
            assert!(!err.is_permission_denied(), "{code}");
            assert!(matches!(err, StoreError::Database(_)), "{code}");
        }
        assert!(matches!(
            classify_database_error(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
