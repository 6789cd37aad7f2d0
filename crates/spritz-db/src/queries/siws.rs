use anyhow::Result;
use rusqlite::params;

use crate::{Database, now_ts};

impl Database {
    pub fn insert_siws_nonce(&self, nonce: &str, address: &str, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_siws_nonces (nonce, address, expires_at) VALUES (?1, ?2, ?3)",
                params![nonce, address, expires_at],
            )?;
            Ok(())
        })
    }

    /// Mark the nonce used. Fails (returns false) when it was issued to a
    /// different address, is already used, or has expired.
    pub fn consume_siws_nonce(&self, nonce: &str, address: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shout_siws_nonces SET used = 1
                 WHERE nonce = ?1 AND address = ?2 AND used = 0 AND expires_at > ?3",
                params![nonce, address, now_ts()],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn purge_expired_siws_nonces(&self) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM shout_siws_nonces WHERE used = 1 OR expires_at <= ?1",
                [now_ts()],
            )?)
        })
    }
}
