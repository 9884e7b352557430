//! SQLite-backed record store for users, books and credentials.
//! All queries are single-row writes or simple selects; SQLite's row-level
//! atomicity is the only consistency mechanism required (last write wins on
//! concurrent updates to the same book).

use anyhow::Context;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{Book, BookPatch, BookWithOwner, NewBook, User};

/// Typed CRUD accessor over a shared SQLite pool. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

// Given a file path, return a valid SQLite URL, creating parent directories
// and the file itself if missing.
pub fn sqlite_url_for_path(p: &Path) -> anyhow::Result<String> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dirs for {:?}", parent))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&abs)
        .with_context(|| format!("create/open sqlite file {:?}", abs))?;
    let s = abs.to_string_lossy().replace('\\', "/");
    Ok(format!("sqlite:///{}", s))
}

/// Build a SQLite URL from a configured path. `sqlite::memory:` passes
/// through untouched so tests can run without touching disk.
pub fn build_sqlite_url(raw: &str) -> anyhow::Result<String> {
    if raw == "sqlite::memory:" {
        return Ok(raw.to_string());
    }
    let path_part = if raw.starts_with("sqlite://") {
        raw.trim_start_matches("sqlite:///")
            .trim_start_matches("sqlite://")
            .to_string()
    } else {
        raw.to_string()
    };
    sqlite_url_for_path(&PathBuf::from(path_part))
}

// Fixed-width fractional seconds keep lexicographic order chronological.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

impl Store {
    /// Connect and apply migrations. Foreign keys are enabled per connection
    /// so every pooled connection enforces the books -> users reference.
    pub async fn connect(db_url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("parse sqlite url {}", db_url))?
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("connect to sqlite via {}", db_url))?;
        let store = Store { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Creates the tables if they do not exist.
    async fn run_migrations(&self) -> anyhow::Result<()> {
        let stmts = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id           TEXT PRIMARY KEY,
                email        TEXT NOT NULL UNIQUE,
                display_name TEXT,
                created_at   TEXT NOT NULL
            );"#,
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                author      TEXT NOT NULL,
                genre       TEXT NOT NULL,
                description TEXT NOT NULL,
                rating      INTEGER NOT NULL DEFAULT 0,
                user_id     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id)
            );"#,
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                subject       TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );"#,
        ];
        for s in &stmts {
            sqlx::query(s)
                .execute(&self.pool)
                .await
                .with_context(|| format!("apply migration: {}", &s[..s.len().min(40)].replace('\n', " ")))?;
        }
        Ok(())
    }

    // ---- users ----

    /// Insert a user row, or refresh email/display name if the subject is
    /// already known. Returns the stored row either way.
    pub async fn upsert_user(
        &self,
        id: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> anyhow::Result<User> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, display_name = excluded.display_name",
        )
        .bind(id)
        .bind(email)
        .bind(display_name)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await
        .context("upsert user")?;
        self.get_user(id)
            .await?
            .context("user row missing after upsert")
    }

    pub async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetch user")?;
        Ok(user)
    }

    // ---- books ----

    /// Create a book owned by `owner_id` with a server-generated id, zero
    /// rating and a server-assigned creation timestamp.
    pub async fn create_book(&self, fields: &NewBook, owner_id: &str) -> anyhow::Result<Book> {
        let book = Book {
            id: Uuid::new_v4().to_string(),
            title: fields.title.clone(),
            author: fields.author.clone(),
            genre: fields.genre.clone(),
            description: fields.description.clone(),
            rating: 0,
            user_id: owner_id.to_string(),
            created_at: now_rfc3339(),
        };
        sqlx::query(
            "INSERT INTO books (id, title, author, genre, description, rating, user_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.rating)
        .bind(&book.user_id)
        .bind(&book.created_at)
        .execute(&self.pool)
        .await
        .context("insert book")?;
        Ok(book)
    }

    pub async fn get_book(&self, id: &str) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, description, rating, user_id, created_at \
             FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetch book")?;
        Ok(book)
    }

    /// All books with the owner's display name joined, newest first.
    pub async fn list_public_books(&self) -> anyhow::Result<Vec<BookWithOwner>> {
        let books = sqlx::query_as::<_, BookWithOwner>(
            "SELECT b.id, b.title, b.author, b.genre, b.description, b.rating, b.user_id, b.created_at, \
                    COALESCE(u.display_name, u.email) AS owner_name \
             FROM books b JOIN users u ON u.id = b.user_id \
             ORDER BY b.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("list public books")?;
        Ok(books)
    }

    /// Only the caller's books, newest first.
    pub async fn list_user_books(&self, user_id: &str) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, description, rating, user_id, created_at \
             FROM books WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list user books")?;
        Ok(books)
    }

    /// Partial update: only fields present in the patch change. Returns the
    /// updated row, or None when the id is unknown.
    pub async fn update_book(&self, id: &str, patch: &BookPatch) -> anyhow::Result<Option<Book>> {
        if patch.is_empty() {
            return self.get_book(id).await;
        }
        let mut sets: Vec<&'static str> = Vec::new();
        let mut binds: Vec<&String> = Vec::new();
        if let Some(v) = &patch.title {
            sets.push("title = ?");
            binds.push(v);
        }
        if let Some(v) = &patch.author {
            sets.push("author = ?");
            binds.push(v);
        }
        if let Some(v) = &patch.genre {
            sets.push("genre = ?");
            binds.push(v);
        }
        if let Some(v) = &patch.description {
            sets.push("description = ?");
            binds.push(v);
        }
        let sql = format!("UPDATE books SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&sql);
        for v in binds {
            q = q.bind(v);
        }
        q = q.bind(id);
        q.execute(&self.pool).await.context("update book")?;
        self.get_book(id).await
    }

    /// Set the rating only. Returns the updated row, or None when the id
    /// is unknown. Range validation happens at the handler boundary.
    pub async fn update_rating(&self, id: &str, rating: i64) -> anyhow::Result<Option<Book>> {
        sqlx::query("UPDATE books SET rating = ? WHERE id = ?")
            .bind(rating)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("update rating")?;
        self.get_book(id).await
    }

    /// Hard delete. Returns true when a row was removed.
    pub async fn delete_book(&self, id: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete book")?;
        Ok(res.rows_affected() > 0)
    }

    // ---- credentials (local identity backing) ----

    pub async fn insert_credential(
        &self,
        subject: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO credentials (subject, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(subject)
        .bind(email)
        .bind(password_hash)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await
        .context("insert credential")?;
        Ok(())
    }

    pub async fn credential_email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credentials WHERE email = ?")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .context("count credentials by email")?;
        Ok(existing > 0)
    }

    /// (subject, password_hash) for an email, if registered.
    pub async fn credential_for_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<(String, String)>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT subject, password_hash FROM credentials WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("fetch credential")?;
        Ok(row)
    }

    /// Liveness check used by the health endpoint: can we still acquire a
    /// connection from the pool.
    pub async fn healthy(&self) -> bool {
        self.pool.acquire().await.is_ok()
    }
}
