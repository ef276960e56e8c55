//! # Folder Service
//!
//! User-defined collections of saved content. Every user gets one default
//! folder, created lazily on first listing, which can never be renamed
//! away or deleted.

use crate::content::{content_from_row, SavedContent};
use crate::errors::StoreError;
use crate::store::SqliteStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use turso::{params, Connection, Row, Value as TursoValue};
use uuid::Uuid;

/// The name given to the automatically created folder.
pub const DEFAULT_FOLDER_NAME: &str = "Saved";

#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub content_count: u64,
}

#[derive(Clone, Debug)]
pub struct FolderService {
    store: SqliteStore,
}

impl FolderService {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        self.store
            .db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Creates a user folder. Names are trimmed; empty names are rejected.
    pub async fn create(&self, user_id: &str, name: &str) -> Result<Folder, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::OperationFailed(
                "folder name must not be empty".to_string(),
            ));
        }

        let conn = self.connect()?;
        let folder_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO folders (id, user_id, name, is_default) VALUES (?, ?, ?, 0)",
            params![folder_id.clone(), user_id, name],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        self.get(&folder_id, user_id).await
    }

    /// Lists the user's folders, default first, then by creation order.
    /// Creates the default folder if the user has none yet.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Folder>, StoreError> {
        let conn = self.connect()?;
        self.ensure_default_folder(&conn, user_id).await?;

        let mut rows = conn
            .query(
                "SELECT f.id, f.user_id, f.name, f.is_default, f.created_at,
                        (SELECT COUNT(*) FROM folder_contents fc WHERE fc.folder_id = f.id)
                 FROM folders f
                 WHERE f.user_id = ?
                 ORDER BY f.is_default DESC, f.created_at ASC, f.id ASC",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut folders = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            folders.push(folder_from_row(&row)?);
        }
        Ok(folders)
    }

    async fn ensure_default_folder(
        &self,
        conn: &Connection,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let mut rows = conn
            .query(
                "SELECT id FROM folders WHERE user_id = ? AND is_default = 1",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        if rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .is_some()
        {
            return Ok(());
        }

        conn.execute(
            "INSERT INTO folders (id, user_id, name, is_default) VALUES (?, ?, ?, 1)",
            params![Uuid::new_v4().to_string(), user_id, DEFAULT_FOLDER_NAME],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(())
    }

    pub async fn get(&self, folder_id: &str, user_id: &str) -> Result<Folder, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT f.id, f.user_id, f.name, f.is_default, f.created_at,
                        (SELECT COUNT(*) FROM folder_contents fc WHERE fc.folder_id = f.id)
                 FROM folders f
                 WHERE f.id = ? AND f.user_id = ?",
                params![folder_id, user_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            .ok_or(StoreError::NotFound)?;
        folder_from_row(&row)
    }

    /// Renames a folder. The default folder keeps its name.
    pub async fn rename(
        &self,
        folder_id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Folder, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::OperationFailed(
                "folder name must not be empty".to_string(),
            ));
        }

        let folder = self.get(folder_id, user_id).await?;
        if folder.is_default {
            return Err(StoreError::DefaultFolder);
        }

        let conn = self.connect()?;
        conn.execute(
            "UPDATE folders SET name = ? WHERE id = ?",
            params![name, folder_id],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        self.get(folder_id, user_id).await
    }

    /// Deletes a folder and its membership rows. The contents themselves
    /// stay saved. The default folder cannot be deleted.
    pub async fn delete(&self, folder_id: &str, user_id: &str) -> Result<(), StoreError> {
        let folder = self.get(folder_id, user_id).await?;
        if folder.is_default {
            return Err(StoreError::DefaultFolder);
        }

        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM folder_contents WHERE folder_id = ?",
            params![folder_id],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        conn.execute("DELETE FROM folders WHERE id = ?", params![folder_id])
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(())
    }

    /// Adds a content item at the end of the folder. Both the folder and the
    /// content must belong to the user. Re-adding is a no-op.
    pub async fn add_content(
        &self,
        folder_id: &str,
        user_id: &str,
        content_id: &str,
    ) -> Result<(), StoreError> {
        self.get(folder_id, user_id).await?;

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

        let mut rows = conn
            .query(
                "SELECT COALESCE(MAX(position), 0) FROM folder_contents WHERE folder_id = ?",
                params![folder_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        let next_position = match rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            Some(row) => match row
                .get_value(0)
                .map_err(|e| StoreError::OperationFailed(e.to_string()))?
            {
                TursoValue::Integer(n) => n + 1,
                _ => 1,
            },
            None => 1,
        };

        conn.execute(
            "INSERT OR IGNORE INTO folder_contents (folder_id, content_id, position)
             VALUES (?, ?, ?)",
            params![folder_id, content_id, next_position],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(())
    }

    pub async fn remove_content(
        &self,
        folder_id: &str,
        user_id: &str,
        content_id: &str,
    ) -> Result<(), StoreError> {
        self.get(folder_id, user_id).await?;

        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM folder_contents WHERE folder_id = ? AND content_id = ?",
            params![folder_id, content_id],
        )
        .await
        .map_err(|e| StoreError::OperationFailed(e.to_string()))?;
        Ok(())
    }

    /// The folder's contents in their stored order.
    pub async fn contents(
        &self,
        folder_id: &str,
        user_id: &str,
    ) -> Result<Vec<SavedContent>, StoreError> {
        self.get(folder_id, user_id).await?;

        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT c.id, c.user_id, c.platform, c.url, c.title, c.description,
                        c.thumbnail_url, c.creator_name, c.creator_url, c.memo, c.saved_at
                 FROM contents c
                 JOIN folder_contents fc ON fc.content_id = c.id
                 WHERE fc.folder_id = ?
                 ORDER BY fc.position ASC",
                params![folder_id],
            )
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?;

        let mut contents = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::OperationFailed(e.to_string()))?
        {
            contents.push(content_from_row(&row)?);
        }
        Ok(contents)
    }
}

fn folder_from_row(row: &Row) -> Result<Folder, StoreError> {
    let is_default = match row
        .get_value(3)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?
    {
        TursoValue::Integer(n) => n != 0,
        _ => false,
    };

    let created_at_str: String = row
        .get(4)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?;
    let created_at = chrono::NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| {
            StoreError::DataIntegrity(format!("Failed to parse date '{created_at_str}': {e}"))
        })?;

    let content_count = match row
        .get_value(5)
        .map_err(|e| StoreError::DataIntegrity(e.to_string()))?
    {
        TursoValue::Integer(n) => n.max(0) as u64,
        _ => 0,
    };

    Ok(Folder {
        id: row
            .get(0)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        user_id: row
            .get(1)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        name: row
            .get(2)
            .map_err(|e| StoreError::DataIntegrity(e.to_string()))?,
        is_default,
        created_at,
        content_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentService;
    use crate::metadata::fallback_metadata;
    use crate::platform::Platform;

    async fn services() -> (FolderService, ContentService) {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.initialize_schema().await.unwrap();
        (
            FolderService::new(store.clone()),
            ContentService::new(store),
        )
    }

    #[tokio::test]
    async fn first_listing_creates_the_default_folder() {
        let (folders, _) = services().await;
        let list = folders.list("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_default);
        assert_eq!(list[0].name, DEFAULT_FOLDER_NAME);

        // Idempotent on subsequent listings.
        let list = folders.list("u1").await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn default_folder_resists_rename_and_delete() {
        let (folders, _) = services().await;
        let default = folders.list("u1").await.unwrap().remove(0);

        let err = folders.rename(&default.id, "u1", "Other").await.unwrap_err();
        assert!(matches!(err, StoreError::DefaultFolder));
        let err = folders.delete(&default.id, "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::DefaultFolder));
    }

    #[tokio::test]
    async fn custom_folders_can_be_managed() {
        let (folders, _) = services().await;
        let folder = folders.create("u1", "  Recipes  ").await.unwrap();
        assert_eq!(folder.name, "Recipes");
        assert!(!folder.is_default);

        let renamed = folders.rename(&folder.id, "u1", "Dinner ideas").await.unwrap();
        assert_eq!(renamed.name, "Dinner ideas");

        folders.delete(&folder.id, "u1").await.unwrap();
        assert!(matches!(
            folders.get(&folder.id, "u1").await.unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[tokio::test]
    async fn contents_keep_their_insertion_order() {
        let (folders, contents) = services().await;
        let folder = folders.create("u1", "Queue").await.unwrap();

        let first = contents
            .create("u1", &fallback_metadata("https://example.com/1", Platform::Web), &[], None)
            .await
            .unwrap();
        let second = contents
            .create("u1", &fallback_metadata("https://example.com/2", Platform::Web), &[], None)
            .await
            .unwrap();

        folders.add_content(&folder.id, "u1", &second.id).await.unwrap();
        folders.add_content(&folder.id, "u1", &first.id).await.unwrap();
        // Re-adding does not duplicate.
        folders.add_content(&folder.id, "u1", &first.id).await.unwrap();

        let listed = folders.contents(&folder.id, "u1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        folders.remove_content(&folder.id, "u1", &second.id).await.unwrap();
        let listed = folders.contents(&folder.id, "u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn foreign_content_cannot_be_filed() {
        let (folders, contents) = services().await;
        let folder = folders.create("u1", "Mine").await.unwrap();
        let other = contents
            .create("u2", &fallback_metadata("https://example.com/x", Platform::Web), &[], None)
            .await
            .unwrap();

        let err = folders
            .add_content(&folder.id, "u1", &other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn deleting_a_folder_keeps_its_contents() {
        let (folders, contents) = services().await;
        let folder = folders.create("u1", "Temp").await.unwrap();
        let saved = contents
            .create("u1", &fallback_metadata("https://example.com/keep", Platform::Web), &[], None)
            .await
            .unwrap();
        folders.add_content(&folder.id, "u1", &saved.id).await.unwrap();

        folders.delete(&folder.id, "u1").await.unwrap();
        contents.get(&saved.id, "u1").await.unwrap();
    }
}
