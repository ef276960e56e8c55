//! # Table Creation SQL
//!
//! Centralizes the schema statements for the SQLite store. Uniqueness on
//! `contents(user_id, url)` and `tags(name)` is the authoritative guard
//! against duplicate saves and duplicate tag names; the services treat a
//! constraint violation as the real "already exists" signal.

pub const CREATE_USERS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        telegram_id TEXT UNIQUE,
        telegram_username TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";

pub const CREATE_PLATFORMS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS platforms (
        name TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        icon TEXT NOT NULL
    );
";

pub const CREATE_CONTENTS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS contents (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        platform TEXT NOT NULL,
        url TEXT NOT NULL,
        title TEXT,
        description TEXT,
        thumbnail_url TEXT,
        creator_name TEXT,
        creator_url TEXT,
        memo TEXT,
        saved_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, url)
    );
";

pub const CREATE_TAGS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS tags (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
";

pub const CREATE_CONTENT_TAGS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS content_tags (
        content_id TEXT NOT NULL,
        tag_id TEXT NOT NULL,
        PRIMARY KEY (content_id, tag_id)
    );
";

pub const CREATE_FOLDERS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";

pub const CREATE_FOLDER_CONTENTS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS folder_contents (
        folder_id TEXT NOT NULL,
        content_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (folder_id, content_id)
    );
";

pub const CREATE_LOGIN_TOKENS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS login_tokens (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        expires_at INTEGER NOT NULL,
        used_at INTEGER
    );
";

pub const ALL_TABLE_CREATION_SQL: [&str; 8] = [
    CREATE_USERS_TABLE_SQL,
    CREATE_PLATFORMS_TABLE_SQL,
    CREATE_CONTENTS_TABLE_SQL,
    CREATE_TAGS_TABLE_SQL,
    CREATE_CONTENT_TAGS_TABLE_SQL,
    CREATE_FOLDERS_TABLE_SQL,
    CREATE_FOLDER_CONTENTS_TABLE_SQL,
    CREATE_LOGIN_TOKENS_TABLE_SQL,
];
