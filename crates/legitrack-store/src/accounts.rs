//! Users, bearer tokens, and saved theme interests.

use chrono::NaiveDateTime;
use duckdb::params;
use legitrack_core::User;

use crate::duck::optional;
use crate::{DuckStore, StoreError};

const USER_COLUMNS: &str = "id, username, email, password_hash, criado_em";

fn user_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl DuckStore {
    /// Register a user. Username and email are unique; email comparison
    /// ignores case.
    pub fn create_user(
        &mut self,
        username: &str,
        email: &str,
        password_hash: &str,
        now: NaiveDateTime,
    ) -> Result<User, StoreError> {
        let tx = self.conn.transaction()?;

        let taken: i64 = tx.query_row(
            "SELECT count(*) FROM usuarios.users WHERE username = ?",
            params![username],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(StoreError::Conflict("username"));
        }
        let taken: i64 = tx.query_row(
            "SELECT count(*) FROM usuarios.users WHERE lower(email) = lower(?)",
            params![email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(StoreError::Conflict("email"));
        }

        let user = tx.query_row(
            &format!(
                "INSERT INTO usuarios.users (username, email, password_hash, criado_em)
                 VALUES (?, ?, ?, ?)
                 RETURNING {USER_COLUMNS}"
            ),
            params![username, email, password_hash, now],
            user_from_row,
        )?;
        tx.commit()?;
        Ok(user)
    }

    /// Find a user by username, or by email when `login` contains `@`.
    pub fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let sql = if login.contains('@') {
            format!("SELECT {USER_COLUMNS} FROM usuarios.users WHERE lower(email) = lower(?)")
        } else {
            format!("SELECT {USER_COLUMNS} FROM usuarios.users WHERE username = ?")
        };
        Ok(optional(
            self.conn.query_row(&sql, params![login], user_from_row),
        )?)
    }

    // ── Tokens ──

    /// Store the hash of a freshly issued bearer token.
    pub fn insert_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO usuarios.tokens (token_hash, user_id, expires_at, created_at)
             VALUES (?, ?, ?, ?)",
            params![token_hash, user_id, expires_at, now],
        )?;
        Ok(())
    }

    /// Owner of an unexpired token.
    pub fn user_for_token(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<i64>, StoreError> {
        Ok(optional(self.conn.query_row(
            "SELECT user_id FROM usuarios.tokens
             WHERE token_hash = ? AND expires_at > CAST(? AS TIMESTAMP)",
            params![token_hash, now],
            |row| row.get(0),
        ))?)
    }

    /// Revoke a token. Returns whether it existed.
    pub fn delete_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM usuarios.tokens WHERE token_hash = ?",
            params![token_hash],
        )?;
        Ok(n > 0)
    }

    /// Drop every token that expired before `now`.
    pub fn purge_expired_tokens(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        Ok(self.conn.execute(
            "DELETE FROM usuarios.tokens WHERE expires_at <= CAST(? AS TIMESTAMP)",
            params![now],
        )?)
    }

    // ── Interests ──

    /// Replace a user's saved themes. Duplicates are collapsed.
    pub fn set_interests(&mut self, user_id: i64, themes: &[i64]) -> Result<(), StoreError> {
        let mut unique: Vec<i64> = themes.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM usuarios.interesses WHERE user_id = ?",
            params![user_id],
        )?;
        for theme in unique {
            tx.execute(
                "INSERT INTO usuarios.interesses (user_id, id_tema) VALUES (?, ?)",
                params![user_id, theme],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// A user's saved theme ids, ascending.
    pub fn interests(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id_tema FROM usuarios.interesses WHERE user_id = ? ORDER BY id_tema",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<i64>, _>>()?)
    }

    /// The subset of `ids` with no row in `camara.tp_temas`, in input order.
    pub fn unknown_themes(&self, ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        let mut unknown = Vec::new();
        for &id in ids {
            let count: i64 = self.conn.query_row(
                "SELECT count(*) FROM camara.tp_temas WHERE id_tema = ?",
                params![id],
                |row| row.get(0),
            )?;
            if count == 0 && !unknown.contains(&id) {
                unknown.push(id);
            }
        }
        Ok(unknown)
    }
}
