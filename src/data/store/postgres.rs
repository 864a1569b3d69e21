//! PostgreSQL-backed store using one `PgConnection` per session.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection, Row,
};
use tracing::{debug, info, warn};

use super::{category_label, unique_sentences, DocumentStore, StoreSession, WriteReport};
use crate::{
    config::DatabaseSettings,
    data::{
        documents::{parse_year, Document},
        keywords::KeywordRecord,
    },
    error::RowError,
    pipeline::merge::ResultRow,
};

/// Connection factory for the configured database and schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    options: PgConnectOptions,
    schema: String,
}

impl PgStore {
    pub fn new(settings: &DatabaseSettings) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.password);
        Self {
            options,
            schema: settings.schema.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn open(&self) -> Result<Box<dyn StoreSession>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .context("failed to connect to postgres")?;
        debug!(schema = %self.schema, "opened postgres session");
        Ok(Box::new(PgSession {
            conn,
            schema: self.schema.clone(),
        }))
    }
}

/// Single connection bound to a schema.
pub struct PgSession {
    conn: PgConnection,
    schema: String,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn load_keywords(&mut self) -> Result<Vec<KeywordRecord>> {
        let sql = format!(
            r"
            SELECT name::TEXT AS name,
                   normalized_term::TEXT AS normalized_term,
                   general_term::TEXT AS general_term,
                   displayed_term::TEXT AS displayed_term
            FROM {}.keywords
            ",
            self.schema
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .context("failed to fetch keywords")?;

        let mut keywords = Vec::with_capacity(rows.len());
        for row in rows {
            let name: Option<String> = row.try_get("name")?;
            let Some(name) = name else {
                continue;
            };
            keywords.push(KeywordRecord {
                name,
                normalized_term: row.try_get("normalized_term")?,
                general_term: row.try_get("general_term")?,
                displayed_term: row.try_get("displayed_term")?,
            });
        }
        info!(count = keywords.len(), "loaded keywords");
        Ok(keywords)
    }

    async fn fetch_documents(&mut self, limit: i64, offset: i64) -> Result<Vec<Document>> {
        let sql = format!(
            r"
            SELECT id::BIGINT AS id,
                   file_location::TEXT AS file_location,
                   doi::TEXT AS doi,
                   url::TEXT AS url,
                   year::TEXT AS year,
                   author::TEXT AS author,
                   title::TEXT AS title,
                   journal::TEXT AS journal
            FROM {}.documents
            ORDER BY id
            LIMIT $1 OFFSET $2
            ",
            self.schema
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut self.conn)
            .await
            .with_context(|| format!("failed to fetch documents at offset {offset}"))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let year: Option<String> = row.try_get("year")?;
            let file_location: Option<String> = row.try_get("file_location")?;
            documents.push(Document {
                id: row.try_get("id")?,
                file_location: file_location.unwrap_or_default(),
                doi: row.try_get("doi")?,
                url: row.try_get("url")?,
                year: parse_year(year.as_deref()),
                author: row.try_get("author")?,
                title: row.try_get("title")?,
                journal: row.try_get("journal")?,
            });
        }
        debug!(offset, limit, count = documents.len(), "fetched document page");
        Ok(documents)
    }

    async fn write_results(&mut self, rows: &[ResultRow]) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        if rows.is_empty() {
            return Ok(report);
        }
        let sentence_sql = format!(
            "INSERT INTO {}.sentences (sentences, document_id) VALUES ($1, $2) RETURNING id::BIGINT",
            self.schema
        );
        let relation_sql = format!(
            r"
            INSERT INTO {}.relationships (document_id, sentence_id, keyword1, keyword2, category)
            VALUES ($1, $2, $3, $4, $5)
            ",
            self.schema
        );

        let mut tx = self
            .conn
            .begin()
            .await
            .context("failed to begin transaction")?;

        let mut sentence_ids: HashMap<String, i64> = HashMap::new();
        for group in unique_sentences(rows) {
            // Each row runs in a savepoint so one failure does not poison the transaction.
            let mut savepoint = tx.begin().await.context("failed to open savepoint")?;
            let inserted = sqlx::query_scalar::<_, i64>(&sentence_sql)
                .bind(&group.sentence)
                .bind(group.document_id)
                .fetch_one(&mut *savepoint)
                .await;
            match inserted {
                Ok(id) => {
                    savepoint.commit().await?;
                    sentence_ids.insert(group.sentence, id);
                    report.sentences_written += 1;
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    warn!(document_id = group.document_id, error = %err, "sentence insert failed");
                    report.failures.push(RowError::Sentence {
                        document_id: group.document_id,
                        message: err.to_string(),
                    });
                }
            }
        }

        for row in rows {
            let Some(&sentence_id) = sentence_ids.get(&row.sentence) else {
                report.failures.push(RowError::UnresolvedSentence {
                    document_id: row.document_id,
                    keyword_1: row.keyword_1.clone(),
                    keyword_2: row.keyword_2.clone(),
                });
                continue;
            };
            let mut savepoint = tx.begin().await.context("failed to open savepoint")?;
            let inserted = sqlx::query(&relation_sql)
                .bind(row.document_id)
                .bind(sentence_id)
                .bind(&row.keyword_1)
                .bind(&row.keyword_2)
                .bind(category_label(row))
                .execute(&mut *savepoint)
                .await;
            match inserted {
                Ok(_) => {
                    savepoint.commit().await?;
                    report.relations_written += 1;
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    warn!(
                        document_id = row.document_id,
                        keyword_1 = %row.keyword_1,
                        keyword_2 = %row.keyword_2,
                        error = %err,
                        "relationship insert failed"
                    );
                    report.failures.push(RowError::Relation {
                        document_id: row.document_id,
                        keyword_1: row.keyword_1.clone(),
                        keyword_2: row.keyword_2.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tx.commit().await.context("failed to commit relations")?;
        info!(
            sentences = report.sentences_written,
            relations = report.relations_written,
            errors = report.error_count(),
            "persisted batch"
        );
        Ok(report)
    }
}
