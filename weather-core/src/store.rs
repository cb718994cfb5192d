use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;

use crate::{
    error::StoreError,
    model::{FavoriteLocation, User, UserProfile},
};

type Result<T> = std::result::Result<T, StoreError>;

/// SQLite storage for users, profiles and favorite locations.
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                default_location TEXT
            );

            CREATE TABLE IF NOT EXISTS favorite_locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_favorites_user_created
                ON favorite_locations(user_id, created_at DESC);",
        )?;
        Ok(())
    }

    /// Create a user together with an empty profile.
    pub fn create_user(&mut self, username: &str, email: Option<&str>) -> Result<User> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO users (username, email, created_at) VALUES (?1, ?2, ?3)",
            params![username, email, now],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UserExists {
                    username: username.to_string(),
                }
            } else {
                StoreError::Database(e)
            }
        })?;
        let id = tx.last_insert_rowid();

        tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", params![id])?;
        tx.commit()?;

        Ok(User {
            id,
            username: username.to_string(),
            email: email.map(str::to_owned),
            created_at: now,
        })
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, email, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Like [`find_user`](Self::find_user) but a missing user is an error.
    pub fn user(&self, username: &str) -> Result<User> {
        self.find_user(username)?
            .ok_or_else(|| StoreError::UnknownUser {
                username: username.to_string(),
            })
    }

    /// Get the user's profile, creating it if it is missing.
    pub fn profile(&self, user_id: i64) -> Result<UserProfile> {
        self.conn.execute(
            "INSERT OR IGNORE INTO profiles (user_id) VALUES (?1)",
            params![user_id],
        )?;

        let default_location = self.conn.query_row(
            "SELECT default_location FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| row.get::<_, Option<String>>(0),
        )?;

        Ok(UserProfile {
            user_id,
            default_location,
        })
    }

    pub fn set_default_location(&self, user_id: i64, location: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, default_location) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET default_location = excluded.default_location",
            params![user_id, location],
        )?;
        Ok(())
    }

    /// Email and default location together; either both are written or neither.
    pub fn update_profile(
        &mut self,
        user_id: i64,
        email: Option<&str>,
        default_location: Option<&str>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE users SET email = ?1 WHERE id = ?2",
            params![email, user_id],
        )?;
        tx.execute(
            "INSERT INTO profiles (user_id, default_location) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET default_location = excluded.default_location",
            params![user_id, default_location],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Save a favorite.
    ///
    /// The insert is unconditional; a (user, name) clash reported by the
    /// unique constraint becomes [`StoreError::AlreadyExists`].
    pub fn add_favorite(
        &self,
        user_id: i64,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<FavoriteLocation> {
        let now = Utc::now();
        let latitude = round6(latitude);
        let longitude = round6(longitude);

        self.conn
            .execute(
                "INSERT INTO favorite_locations
                    (user_id, name, latitude, longitude, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![user_id, name, latitude, longitude, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AlreadyExists {
                        name: name.to_string(),
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;

        Ok(FavoriteLocation {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            latitude,
            longitude,
            created_at: now,
            updated_at: now,
        })
    }

    /// Newest first.
    pub fn list_favorites(&self, user_id: i64) -> Result<Vec<FavoriteLocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, latitude, longitude, created_at, updated_at
             FROM favorite_locations
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let favorites = stmt
            .query_map(params![user_id], favorite_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    /// A favorite owned by `user_id`; other users' rows are invisible.
    pub fn favorite(&self, user_id: i64, id: i64) -> Result<Option<FavoriteLocation>> {
        let favorite = self
            .conn
            .query_row(
                "SELECT id, user_id, name, latitude, longitude, created_at, updated_at
                 FROM favorite_locations
                 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                favorite_from_row,
            )
            .optional()?;
        Ok(favorite)
    }

    /// Delete a favorite owned by `user_id` and return what was removed.
    ///
    /// The profile's default location is left as is.
    pub fn delete_favorite(&self, user_id: i64, id: i64) -> Result<FavoriteLocation> {
        let favorite = self.favorite(user_id, id)?.ok_or(StoreError::NotFound)?;

        let deleted = self.conn.execute(
            "DELETE FROM favorite_locations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(favorite)
    }
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<FavoriteLocation> {
    Ok(FavoriteLocation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Favorites keep six decimal places.
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
