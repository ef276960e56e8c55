//! # Content Persistence Service
//!
//! CRUD over saved bookmarks plus the tag resolution the save pipeline
//! needs. Duplicate protection is layered: a pre-insert existence check
//! gives the friendly fast path, and the store's `UNIQUE (user_id, url)`
//! constraint is the authoritative backstop under concurrent submission.

use crate::errors::StoreError;
use crate::metadata::ExtractedMetadata;
use crate::platform::Platform;
use crate::store::SqliteStore;
use crate::tagging::GeneratedTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use turso::{params, Connection, Row, Value as TursoValue};
use uuid::Uuid;

/// One bookmarked URL for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedContent {
    pub id: String,
    pub user_id: String,
    /// The canonical (tracking-stripped) URL; the dedupe key together with
    /// `user_id`.
    pub url: String,
    pub platform: Platform,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub memo: Option<String>,
    pub saved_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

/// A short label, globally deduplicated by lowercase name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Filters for listing and search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentFilters {
    pub platform: Option<Platform>,
    /// Case-insensitive substring over title, description, and memo.
    pub search: Option<String>,
    /// Keep only contents carrying at least one of these tag names.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Partial update; `None` fields are left unchanged, `tags` replaces the
/// whole tag set when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub memo: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentStats {
    pub total: u64,
    pub by_platform: HashMap<String, u64>,
}

/// Persistence operations for saved content.
#[derive(Clone, Debug)]
pub struct ContentService {
    store: SqliteStore,
}

impl ContentService {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        self.store
            .db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Inserts a new bookmark with its tags.
    ///
    /// Fails with `StoreError::Duplicate` when the user already saved the
    /// canonical URL, whether the pre-check or the unique constraint
    /// catches it.
    pub async fn create(
        &self,
        user_id: &str,
        metadata: &ExtractedMetadata,
        tags: &[GeneratedTag],
        memo: Option<&str>,
    ) -> Result<SavedContent, StoreError> {
        let conn = self.connect()?;

        let mut existing = conn
            .query(
                "SELECT id FROM contents WHERE user_id = ? AND url = ?",
                params![user_id, metadata.normalized_url.clone()],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        if existing
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .is_some()
        {
            return Err(StoreError::Duplicate);
        }

        let content_id = Uuid::new_v4().to_string();
        let insert_params: Vec<TursoValue> = vec![
            content_id.clone().into(),
            user_id.to_string().into(),
            metadata.platform.as_str().to_string().into(),
            metadata.normalized_url.clone().into(),
            nullable_text(metadata.title.as_deref()),
            nullable_text(metadata.description.as_deref()),
            nullable_text(metadata.image.as_deref()),
            nullable_text(metadata.creator_name.as_deref()),
            nullable_text(metadata.creator_url.as_deref()),
            nullable_text(memo),
        ];
        let insert_result = conn
            .execute(
                "INSERT INTO contents (id, user_id, platform, url, title, description,
                 thumbnail_url, creator_name, creator_url, memo)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                insert_params,
            )
            .await;

        if let Err(e) = insert_result {
            // Two concurrent saves can both pass the pre-check; the unique
            // constraint is the authoritative duplicate signal.
            let message = e.to_string();
            if message.to_uppercase().contains("UNIQUE") {
                return Err(StoreError::Duplicate);
            }
            return Err(StoreError::OperationFailed(message));
        }

        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        let resolved = self.get_or_create_tags(&conn, &tag_names).await?;
        for tag in &resolved {
            conn.execute(
                "INSERT OR IGNORE INTO content_tags (content_id, tag_id) VALUES (?, ?)",
                params![content_id.clone(), tag.id.clone()],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        }

        debug!(content_id = %content_id, tag_count = resolved.len(), "Content saved");
        self.get(&content_id, user_id).await
    }

    /// Resolves tag names to rows, creating missing ones. Names are
    /// lowercased and trimmed first so deduplication is case-insensitive.
    async fn get_or_create_tags(
        &self,
        conn: &Connection,
        names: &[&str],
    ) -> Result<Vec<Tag>, StoreError> {
        let mut unique_names: Vec<String> = Vec::new();
        for name in names {
            let normalized = name.trim().to_lowercase();
            if !normalized.is_empty() && !unique_names.contains(&normalized) {
                unique_names.push(normalized);
            }
        }

        let mut resolved = Vec::with_capacity(unique_names.len());
        for name in unique_names {
            let mut rows = conn
                .query(
                    "SELECT id, name FROM tags WHERE name = ?",
                    params![name.clone()],
                )
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

            if let Some(row) = rows
                .next()
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            {
                resolved.push(Tag {
                    id: row
                        .get(0)
                        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                    name: row
                        .get(1)
                        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                });
                continue;
            }

            let tag_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT OR IGNORE INTO tags (id, name) VALUES (?, ?)",
                params![tag_id.clone(), name.clone()],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

            // Re-select in case a concurrent insert won the race.
            let mut rows = conn
                .query(
                    "SELECT id, name FROM tags WHERE name = ?",
                    params![name.clone()],
                )
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
            let row = rows
                .next()
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
                .ok_or_else(|| StoreError::DataIntegrity(format!("tag '{name}' vanished")))?;
            resolved.push(Tag {
                id: row
                    .get(0)
                    .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                name: row
                    .get(1)
                    .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
            });
        }

        Ok(resolved)
    }

    /// Fetches one bookmark owned by the user, tags included.
    pub async fn get(&self, content_id: &str, user_id: &str) -> Result<SavedContent, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, platform, url, title, description, thumbnail_url,
                        creator_name, creator_url, memo, saved_at
                 FROM contents WHERE id = ? AND user_id = ?",
                params![content_id, user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .ok_or(StoreError::NotFound)?;

        let mut content = content_from_row(&row)?;
        content.tags = self.tags_for_content(&conn, &content.id).await?;
        Ok(content)
    }

    async fn tags_for_content(
        &self,
        conn: &Connection,
        content_id: &str,
    ) -> Result<Vec<Tag>, StoreError> {
        let mut rows = conn
            .query(
                "SELECT t.id, t.name FROM tags t
                 JOIN content_tags ct ON ct.tag_id = t.id
                 WHERE ct.content_id = ?",
                params![content_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut tags = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            tags.push(Tag {
                id: row
                    .get(0)
                    .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                name: row
                    .get(1)
                    .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
            });
        }
        Ok(tags)
    }

    /// Lists the user's bookmarks, newest first, with filters and paging.
    /// The tag filter is applied after the page is loaded, mirroring how
    /// the dashboard narrows an already-fetched page.
    pub async fn list(
        &self,
        user_id: &str,
        filters: &ContentFilters,
        pagination: Pagination,
    ) -> Result<Page<SavedContent>, StoreError> {
        let conn = self.connect()?;
        let page = pagination.page.max(1);
        let limit = pagination.limit.clamp(1, 100);
        // Widened before multiplying; `page` comes straight from the query
        // string and can be anything up to u32::MAX.
        let offset = (u64::from(page) - 1) * u64::from(limit);

        let mut conditions = vec!["user_id = ?".to_string()];
        let mut query_params: Vec<TursoValue> = vec![user_id.to_string().into()];

        if let Some(platform) = filters.platform {
            conditions.push("platform = ?".to_string());
            query_params.push(platform.as_str().to_string().into());
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            conditions.push(
                "(LOWER(COALESCE(title, '')) LIKE ? OR LOWER(COALESCE(description, '')) LIKE ?
                  OR LOWER(COALESCE(memo, '')) LIKE ?)"
                    .to_string(),
            );
            query_params.push(pattern.clone().into());
            query_params.push(pattern.clone().into());
            query_params.push(pattern.into());
        }

        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM contents WHERE {where_clause}");
        let mut count_rows = conn
            .query(&count_sql, query_params.clone())
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        let total: u64 = match count_rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            Some(row) => match row
                .get_value(0)
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            {
                TursoValue::Integer(n) => n.max(0) as u64,
                _ => 0,
            },
            None => 0,
        };

        let list_sql = format!(
            "SELECT id, user_id, platform, url, title, description, thumbnail_url,
                    creator_name, creator_url, memo, saved_at
             FROM contents WHERE {where_clause}
             ORDER BY saved_at DESC, id DESC
             LIMIT {limit} OFFSET {offset}"
        );
        let mut rows = conn
            .query(&list_sql, query_params)
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut items = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            let mut content = content_from_row(&row)?;
            content.tags = self.tags_for_content(&conn, &content.id).await?;
            items.push(content);
        }

        if !filters.tags.is_empty() {
            let wanted: Vec<String> = filters.tags.iter().map(|t| t.to_lowercase()).collect();
            items.retain(|content| {
                content
                    .tags
                    .iter()
                    .any(|tag| wanted.contains(&tag.name.to_lowercase()))
            });
        }

        Ok(Page {
            items,
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
        })
    }

    /// Applies a partial update; replaces the tag set when one is given.
    pub async fn update(
        &self,
        content_id: &str,
        user_id: &str,
        update: &ContentUpdate,
    ) -> Result<SavedContent, StoreError> {
        let conn = self.connect()?;

        // Ownership check first; the update below is scoped by id only.
        let mut rows = conn
            .query(
                "SELECT id FROM contents WHERE id = ? AND user_id = ?",
                params![content_id, user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        if rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }

        let mut assignments = Vec::new();
        let mut update_params: Vec<TursoValue> = Vec::new();
        if let Some(title) = &update.title {
            assignments.push("title = ?");
            update_params.push(title.clone().into());
        }
        if let Some(description) = &update.description {
            assignments.push("description = ?");
            update_params.push(description.clone().into());
        }
        if let Some(memo) = &update.memo {
            assignments.push("memo = ?");
            update_params.push(memo.clone().into());
        }
        if !assignments.is_empty() {
            let sql = format!(
                "UPDATE contents SET {} WHERE id = ?",
                assignments.join(", ")
            );
            update_params.push(content_id.to_string().into());
            conn.execute(&sql, update_params)
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        }

        if let Some(tag_names) = &update.tags {
            conn.execute(
                "DELETE FROM content_tags WHERE content_id = ?",
                params![content_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

            let names: Vec<&str> = tag_names.iter().map(String::as_str).collect();
            let resolved = self.get_or_create_tags(&conn, &names).await?;
            for tag in &resolved {
                conn.execute(
                    "INSERT OR IGNORE INTO content_tags (content_id, tag_id) VALUES (?, ?)",
                    params![content_id, tag.id.clone()],
                )
                .await
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
            }
        }

        self.get(content_id, user_id).await
    }

    /// Removes a bookmark together with its associations.
    pub async fn delete(&self, content_id: &str, user_id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;

        let mut rows = conn
            .query(
                "SELECT id FROM contents WHERE id = ? AND user_id = ?",
                params![content_id, user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        if rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }

        conn.execute(
            "DELETE FROM content_tags WHERE content_id = ?",
            params![content_id],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        conn.execute(
            "DELETE FROM folder_contents WHERE content_id = ?",
            params![content_id],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        conn.execute("DELETE FROM contents WHERE id = ?", params![content_id])
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(())
    }

    /// All tags attached to the user's bookmarks, most used first.
    pub async fn user_tags(&self, user_id: &str) -> Result<Vec<(Tag, u64)>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT t.id, t.name, COUNT(ct.content_id) AS uses
                 FROM tags t
                 JOIN content_tags ct ON ct.tag_id = t.id
                 JOIN contents c ON c.id = ct.content_id
                 WHERE c.user_id = ?
                 GROUP BY t.id, t.name
                 ORDER BY uses DESC, t.name ASC",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut tags = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            let count = match row
                .get_value(2)
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            {
                TursoValue::Integer(n) => n.max(0) as u64,
                _ => 0,
            };
            tags.push((
                Tag {
                    id: row
                        .get(0)
                        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                    name: row
                        .get(1)
                        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
                },
                count,
            ));
        }
        Ok(tags)
    }

    /// Totals for the dashboard header.
    pub async fn stats(&self, user_id: &str) -> Result<ContentStats, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT platform, COUNT(*) FROM contents WHERE user_id = ? GROUP BY platform",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut by_platform = HashMap::new();
        let mut total = 0u64;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            let platform: String = row
                .get(0)
                .map_err(|e| StoreError::DataIntegrity(e.to_string()))?;
            let count = match row
                .get_value(1)
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            {
                TursoValue::Integer(n) => n.max(0) as u64,
                _ => 0,
            };
            total += count;
            by_platform.insert(platform, count);
        }
        Ok(ContentStats { total, by_platform })
    }
}

/// Reads a `SavedContent` (without tags) from a full contents row.
pub(crate) fn content_from_row(row: &Row) -> Result<SavedContent, StoreError> {
    let platform_name: String = row
        .get(2)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?;
    let platform = Platform::from_name(&platform_name)
        .ok_or_else(|| StoreError::DataIntegrity(format!("unknown platform '{platform_name}'")))?;

    let saved_at_str: String = row
        .get(10)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?;
    let saved_at = chrono::NaiveDateTime::parse_from_str(&saved_at_str, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| {
            StoreError::DataIntegrity(format!("Failed to parse date '{saved_at_str}': {e}"))
        })?;

    Ok(SavedContent {
        id: row
            .get(0)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        user_id: row
            .get(1)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        platform,
        url: row
            .get(3)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        title: opt_text(row, 4)?,
        description: opt_text(row, 5)?,
        thumbnail_url: opt_text(row, 6)?,
        creator_name: opt_text(row, 7)?,
        creator_url: opt_text(row, 8)?,
        memo: opt_text(row, 9)?,
        saved_at,
        tags: Vec::new(),
    })
}

pub(crate) fn nullable_text(value: Option<&str>) -> TursoValue {
    match value {
        Some(s) => TursoValue::Text(s.to_string()),
        None => TursoValue::Null,
    }
}

pub(crate) fn opt_text(row: &Row, idx: usize) -> Result<Option<String>, StoreError> {
    match row
        .get_value(idx)
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?
    {
        TursoValue::Text(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
