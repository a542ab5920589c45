// 本地会话存储模块
// 用 SQLite 键值表保存登录令牌，进程重启后仍然有效

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::StorageError;

/// 令牌在存储中的键名
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// 存储条目
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// 会话存储服务
#[derive(Clone)]
pub struct SessionStore {
    pool: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SessionStore {
    /// 打开（或创建）指定路径的存储
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            pool: Arc::new(Mutex::new(Connection::open(db_path)?)),
            db_path: Some(db_path.to_path_buf()),
        };

        store.initialize()?;
        Ok(store)
    }

    /// 内存存储，进程退出即丢失
    pub fn in_memory() -> Result<Self, StorageError> {
        let store = Self {
            pool: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            db_path: None,
        };

        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// 初始化表结构
    pub fn initialize(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.pool.lock().map_err(|_| StorageError::Poisoned)
    }

    // ==================== 通用键值 ====================

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_entry(key)?.map(|entry| entry.value))
    }

    pub fn get_entry(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT key, value, updated_at FROM storage WHERE key = ?",
        )?;

        let entry = stmt
            .query_row(rusqlite::params![key], |row| {
                Ok(StoredValue {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    // 时间戳损坏时按当前时间处理
                    updated_at: row
                        .get::<_, String>(2)?
                        .parse::<DateTime<Utc>>()
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .optional()?;

        Ok(entry)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?, ?, ?)",
            rusqlite::params![key, value, now],
        )?;

        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute("DELETE FROM storage WHERE key = ?", rusqlite::params![key])?;

        Ok(())
    }

    // ==================== 令牌 ====================

    pub fn get_token(&self) -> Result<Option<String>, StorageError> {
        self.get(AUTH_TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.set(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.remove(AUTH_TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle() {
        let store = SessionStore::in_memory().unwrap();
        assert_eq!(store.get_token().unwrap(), None);

        store.set_token("abc").unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("abc"));

        store.set_token("def").unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("def"));

        store.clear_token().unwrap();
        assert_eq!(store.get_token().unwrap(), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.db");

        {
            let store = SessionStore::open(&path).unwrap();
            store.set_token("persisted").unwrap();
        }

        let store = SessionStore::open(&path).unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("persisted"));
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_entry_has_timestamp() {
        let store = SessionStore::in_memory().unwrap();
        let before = Utc::now() - chrono::Duration::seconds(1);
        store.set("theme", "dark").unwrap();

        let entry = store.get_entry("theme").unwrap().unwrap();
        assert_eq!(entry.key, "theme");
        assert_eq!(entry.value, "dark");
        assert!(entry.updated_at >= before);
    }

    #[test]
    fn test_clones_share_connection() {
        let store = SessionStore::in_memory().unwrap();
        let other = store.clone();
        other.set_token("shared").unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("shared"));
    }
}
