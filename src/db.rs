use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::hash_password;

#[derive(Clone)]
pub struct DatabasePool(pub Arc<Mutex<rusqlite::Connection>>);

impl DatabasePool {
    /// Open (or create) the portfolio database and make sure the schema
    /// exists.
    pub fn new(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = rusqlite::Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }

    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        let conn = rusqlite::Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }
}

/// Create all tables and seed the admin club-head account. Idempotent, run
/// on every startup.
pub fn init_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    // Current positions, one row per ticker.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS holdings (
            ticker TEXT PRIMARY KEY,
            shares REAL NOT NULL,
            cost_basis REAL NOT NULL,
            acquired_on TEXT NOT NULL
        )",
        [],
    )?;

    // Append-only trade journal; rowid doubles as insertion order.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            ticker TEXT NOT NULL,
            action TEXT NOT NULL,
            shares REAL NOT NULL,
            price REAL NOT NULL,
            date TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            is_club_head INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS announcements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            posted_by TEXT NOT NULL,
            posted_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS recaps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            posted_by TEXT NOT NULL,
            posted_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            posted_by TEXT NOT NULL,
            posted_at TEXT NOT NULL
        )",
        [],
    )?;

    // Seed the initial club-head login so a fresh install is usable.
    let admin_user = dotenv::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let admin_pass = dotenv::var("ADMIN_PASSWORD").unwrap_or_else(|_| "hedgefund2025".to_string());
    conn.execute(
        "INSERT OR IGNORE INTO users (username, password_hash, is_club_head) VALUES (?1, ?2, 1)",
        rusqlite::params![admin_user, hash_password(&admin_pass)],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent_and_seeds_one_club_head() {
        let pool = DatabasePool::in_memory().unwrap();
        let conn = pool.0.lock().await;

        // Running init again must not fail or duplicate the seed.
        init_schema(&conn).unwrap();

        let club_heads: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE is_club_head = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(club_heads, 1);
    }
}
