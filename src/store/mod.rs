//! Entity Store Adapter.
//!
//! Typed access to the three entity kinds over a Postgres-backed document
//! store: one table per kind, `(id BIGSERIAL PRIMARY KEY, doc JSONB)`.
//! The store allocates integer ids, evaluates exact-match predicates on
//! document paths, and provides the multi-document transaction used for
//! the car/garage pair update. Page cursors handed out here are opaque
//! tokens; callers present them back verbatim.

pub mod docs;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Fixed page size for all listings.
pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid pagination cursor: {0}")]
    BadCursor(String),

    #[error("document serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The three entity kinds the adapter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    User,
    Car,
    Garage,
}

impl Kind {
    pub fn table(self) -> &'static str {
        match self {
            Kind::User => "users",
            Kind::Car => "cars",
            Kind::Garage => "garages",
        }
    }
}

/// A stored document together with its store-allocated id.
#[derive(Debug, Clone)]
pub struct Document<T> {
    pub id: i64,
    pub doc: T,
}

/// One page of results. `next` is Some when more records remain.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<Document<T>>,
    pub next: Option<String>,
}

/// Exact-match predicate on a document path, e.g. `owner.user_id = "U1"`.
#[derive(Debug, Clone)]
pub struct Predicate {
    path: &'static [&'static str],
    value: String,
}

impl Predicate {
    pub fn eq(path: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { path, value: value.into() }
    }

    fn sql_fragment(&self, param: usize) -> String {
        // Paths are static identifiers from this crate, never user input.
        format!("doc #>> '{{{}}}' = ${}", self.path.join(","), param)
    }
}

fn encode_cursor(kind: Kind, after: i64) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", kind.table(), after))
}

fn decode_cursor(kind: Kind, token: &str) -> Result<i64, StoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| StoreError::BadCursor(token.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| StoreError::BadCursor(token.to_string()))?;
    let (tag, after) = text
        .split_once(':')
        .ok_or_else(|| StoreError::BadCursor(token.to_string()))?;
    if tag != kind.table() {
        return Err(StoreError::BadCursor(token.to_string()));
    }
    after
        .parse::<i64>()
        .map_err(|_| StoreError::BadCursor(token.to_string()))
}

/// Connection pool plus the document CRUD/query surface.
#[derive(Clone)]
pub struct Datastore {
    pool: PgPool,
}

impl Datastore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        info!("connected to document store");
        Ok(Self { pool })
    }

    /// Creates the per-kind tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for kind in [Kind::User, Kind::Car, Kind::Garage] {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL)",
                kind.table()
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts a document and returns the store-allocated integer id.
    pub async fn insert<T: Serialize>(&self, kind: Kind, doc: &T) -> Result<i64, StoreError> {
        let body = serde_json::to_value(doc)?;
        let sql = format!("INSERT INTO {} (doc) VALUES ($1) RETURNING id", kind.table());
        let row = sqlx::query(&sql).bind(&body).fetch_one(&self.pool).await?;
        Ok(row.try_get("id")?)
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        kind: Kind,
        id: i64,
    ) -> Result<Option<Document<T>>, StoreError> {
        let sql = format!("SELECT id, doc FROM {} WHERE id = $1", kind.table());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(decode_row).transpose()
    }

    /// First document matching the predicate, in insertion order.
    pub async fn find_one<T: DeserializeOwned>(
        &self,
        kind: Kind,
        predicate: &Predicate,
    ) -> Result<Option<Document<T>>, StoreError> {
        let sql = format!(
            "SELECT id, doc FROM {} WHERE {} ORDER BY id LIMIT 1",
            kind.table(),
            predicate.sql_fragment(1)
        );
        let row = sqlx::query(&sql)
            .bind(&predicate.value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode_row).transpose()
    }

    /// All documents of a kind, in insertion order. Unpaginated; only the
    /// user listing uses this.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        kind: Kind,
    ) -> Result<Vec<Document<T>>, StoreError> {
        let sql = format!("SELECT id, doc FROM {} ORDER BY id", kind.table());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(decode_row).collect()
    }

    /// One page of documents, resuming after `cursor` when present.
    /// Fetches one row past the page to decide whether a next cursor is
    /// owed; the cursor is bound to the kind it was issued for.
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        kind: Kind,
        predicate: Option<&Predicate>,
        cursor: Option<&str>,
    ) -> Result<Page<T>, StoreError> {
        let after = match cursor {
            Some(token) => decode_cursor(kind, token)?,
            None => 0,
        };

        let mut sql = format!("SELECT id, doc FROM {} WHERE id > $1", kind.table());
        if let Some(p) = predicate {
            sql.push_str(" AND ");
            sql.push_str(&p.sql_fragment(2));
        }
        sql.push_str(&format!(" ORDER BY id LIMIT {}", PAGE_SIZE + 1));

        let mut query = sqlx::query(&sql).bind(after);
        if let Some(p) = predicate {
            query = query.bind(&p.value);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut items = rows
            .into_iter()
            .map(decode_row)
            .collect::<Result<Vec<Document<T>>, _>>()?;

        let next = if items.len() > PAGE_SIZE {
            items.truncate(PAGE_SIZE);
            items.last().map(|d| encode_cursor(kind, d.id))
        } else {
            None
        };

        Ok(Page { items, next })
    }

    /// Replaces a document body wholesale.
    pub async fn replace<T: Serialize>(
        &self,
        kind: Kind,
        id: i64,
        doc: &T,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        let sql = format!("UPDATE {} SET doc = $2 WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(id).bind(&body).execute(&self.pool).await?;
        Ok(())
    }

    /// Reads two documents under row locks (`SELECT ... FOR UPDATE`),
    /// applies `mutate` to the locked snapshots, and writes both back in
    /// the same transaction. Used for the car/garage pair update so
    /// concurrent writers serialize on the rows instead of racing a
    /// read-check-write, and so readers never observe a one-sided
    /// relationship reference. Rows are locked in argument order; all
    /// callers touching the same pair of kinds must pass them in the
    /// same order. A `mutate` error rolls the transaction back with
    /// nothing written.
    pub async fn update_pair_locked<A, B, E, F>(
        &self,
        a: (Kind, i64),
        b: (Kind, i64),
        mutate: F,
    ) -> Result<Result<(), E>, StoreError>
    where
        A: DeserializeOwned + Serialize,
        B: DeserializeOwned + Serialize,
        F: FnOnce(Option<Document<A>>, Option<Document<B>>) -> Result<(Document<A>, Document<B>), E>,
    {
        let mut tx = self.pool.begin().await?;

        let sql_a = format!("SELECT id, doc FROM {} WHERE id = $1 FOR UPDATE", a.0.table());
        let row_a = sqlx::query(&sql_a).bind(a.1).fetch_optional(&mut *tx).await?;
        let doc_a = row_a.map(decode_row).transpose()?;
        let sql_b = format!("SELECT id, doc FROM {} WHERE id = $1 FOR UPDATE", b.0.table());
        let row_b = sqlx::query(&sql_b).bind(b.1).fetch_optional(&mut *tx).await?;
        let doc_b = row_b.map(decode_row).transpose()?;

        let (new_a, new_b) = match mutate(doc_a, doc_b) {
            Ok(pair) => pair,
            Err(e) => return Ok(Err(e)),
        };

        let body_a = serde_json::to_value(&new_a.doc)?;
        let upd_a = format!("UPDATE {} SET doc = $2 WHERE id = $1", a.0.table());
        sqlx::query(&upd_a).bind(new_a.id).bind(&body_a).execute(&mut *tx).await?;
        let body_b = serde_json::to_value(&new_b.doc)?;
        let upd_b = format!("UPDATE {} SET doc = $2 WHERE id = $1", b.0.table());
        sqlx::query(&upd_b).bind(new_b.id).bind(&body_b).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Ok(()))
    }

    pub async fn remove(&self, kind: Kind, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_row<T: DeserializeOwned>(row: sqlx::postgres::PgRow) -> Result<Document<T>, StoreError> {
    let id: i64 = row.try_get("id")?;
    let body: serde_json::Value = row.try_get("doc")?;
    Ok(Document { id, doc: serde_json::from_value(body)? })
}
