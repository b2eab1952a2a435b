//! SQLite-backed user store.
//!
//! Tables:
//! - `users`: id, username, password_hash, salt, created_at

use super::error::{AuthError, Result as AuthResult};
use super::token::constant_time_eq;
use super::traits::{UserId, UserRecord, UserRepository};
use anyhow::{bail, Result};
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Salt byte length for password hashing.
const SALT_BYTES: usize = 16;

/// Number of SHA-256 iterations for password stretching.
const HASH_ITERATIONS: u32 = 100_000;

/// Longest accepted username, in characters.
const MAX_USERNAME_CHARS: usize = 64;

const MIN_PASSWORD_LEN: usize = 8;

/// A registered user, including its credential hash.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub created_at: i64,
    password_hash: String,
    salt: String,
}

impl UserRecord for StoredUser {
    fn id(&self) -> UserId {
        UserId::new(self.id.clone())
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn check_password(&self, password: &str) -> bool {
        let attempt = hash_password(password, &self.salt);
        constant_time_eq(self.password_hash.as_bytes(), attempt.as_bytes())
    }

    fn supports_cookie_auth(&self) -> bool {
        true
    }

    fn token_material(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.password_hash.as_bytes())
    }
}

/// SQLite-backed user store.
pub struct UserStore {
    conn: Mutex<rusqlite::Connection>,
}

impl UserStore {
    /// Open (or create) the user database at the given path.
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::init(conn)
    }

    /// Non-persistent store, mostly for tests and demos.
    pub fn in_memory() -> Result<Self> {
        Self::init(rusqlite::Connection::open_in_memory()?)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── User Management ─────────────────────────────────────────────

    /// Register a new user. Returns the user ID.
    pub fn register(&self, username: &str, password: &str) -> Result<String> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            bail!("Username cannot be empty");
        }
        if trimmed.chars().count() > MAX_USERNAME_CHARS {
            bail!("Username too long (max {MAX_USERNAME_CHARS} characters)");
        }
        validate_password(password)?;

        let user_id = uuid::Uuid::new_v4().to_string();
        let salt = generate_salt();
        let password_hash = hash_password(password, &salt);
        let now = epoch_secs();

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (id, username, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, trimmed, password_hash, salt, now as i64],
        );

        match result {
            Ok(_) => {
                tracing::info!(user_id = %user_id, username = trimmed, "User registered");
                Ok(user_id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                bail!("Username '{}' is already taken", trimmed)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a user's password. A fresh salt is drawn, so every
    /// remember-me token issued for the user stops validating.
    pub fn set_password(&self, user_id: &str, password: &str) -> Result<bool> {
        validate_password(password)?;
        let salt = generate_salt();
        let password_hash = hash_password(password, &salt);

        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE users SET password_hash = ?1, salt = ?2 WHERE id = ?3",
            rusqlite::params![password_hash, salt, user_id],
        )?;
        Ok(updated > 0)
    }

    /// Look up a user by ID.
    pub fn get_user(&self, user_id: &str) -> Result<Option<StoredUser>> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT id, username, password_hash, salt, created_at FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            row_to_user,
        );

        match row {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All users whose username matches, case-insensitively.
    fn users_named(&self, username: &str) -> Result<Vec<StoredUser>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, salt, created_at
             FROM users WHERE username = ?1 COLLATE NOCASE",
        )?;
        let users = stmt
            .query_map(rusqlite::params![username.trim()], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl UserRepository for UserStore {
    type User = StoredUser;

    fn find_by_username(&self, username: &str) -> AuthResult<Option<StoredUser>> {
        let mut users = self.users_named(username)?;
        match users.len() {
            0 => Ok(None),
            1 => Ok(users.pop()),
            count => Err(AuthError::MultipleMatchingUsers {
                username: username.to_string(),
                count,
            }),
        }
    }

    fn find_by_identity(&self, id: &UserId) -> AuthResult<Option<StoredUser>> {
        Ok(self.get_user(id.as_str())?)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredUser> {
    Ok(StoredUser {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        salt: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(())
}

// ── Cryptographic Helpers ───────────────────────────────────────────

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password with salt using iterated SHA-256.
fn hash_password(password: &str, salt: &str) -> String {
    let mut hash = Sha256::new();
    hash.update(salt.as_bytes());
    hash.update(password.as_bytes());
    let mut result = hash.finalize();

    // Iterated hashing for key stretching
    for _ in 1..HASH_ITERATIONS {
        let mut h = Sha256::new();
        h.update(result);
        h.update(salt.as_bytes());
        result = h.finalize();
    }

    hex::encode(result)
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ── Tests ───────────────────────────────────────────────────────────
