use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::models::{CalendarConnectionRow, CalendarTokens};
use crate::{Database, now_ts};

const CONNECTION_COLUMNS: &str = "id, wallet_address, provider, access_token, refresh_token, \
     token_expires_at, calendar_id, calendar_email, is_active, last_sync_at, created_at";

impl Database {
    pub fn get_calendar_connection(
        &self,
        wallet_address: &str,
        provider: &str,
    ) -> Result<Option<CalendarConnectionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {CONNECTION_COLUMNS} FROM shout_calendar_connections
                         WHERE wallet_address = ?1 AND provider = ?2"
                    ),
                    params![wallet_address, provider],
                    |row| {
                        Ok(CalendarConnectionRow {
                            id: row.get(0)?,
                            wallet_address: row.get(1)?,
                            provider: row.get(2)?,
                            access_token: row.get(3)?,
                            refresh_token: row.get(4)?,
                            token_expires_at: row.get(5)?,
                            calendar_id: row.get(6)?,
                            calendar_email: row.get(7)?,
                            is_active: row.get(8)?,
                            last_sync_at: row.get(9)?,
                            created_at: row.get(10)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// One row per (wallet, provider). A callback that carries no refresh
    /// token keeps the one already stored.
    pub fn upsert_calendar_connection(
        &self,
        wallet_address: &str,
        provider: &str,
        tokens: &CalendarTokens,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO shout_calendar_connections
                     (id, wallet_address, provider, access_token, refresh_token, token_expires_at,
                      calendar_id, calendar_email, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)
                 ON CONFLICT (wallet_address, provider) DO UPDATE SET
                     access_token = excluded.access_token,
                     refresh_token = COALESCE(excluded.refresh_token, refresh_token),
                     token_expires_at = excluded.token_expires_at,
                     calendar_id = COALESCE(excluded.calendar_id, calendar_id),
                     calendar_email = COALESCE(excluded.calendar_email, calendar_email),
                     is_active = 1,
                     updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    wallet_address,
                    provider,
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.token_expires_at,
                    tokens.calendar_id,
                    tokens.calendar_email,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_calendar_access_token(
        &self,
        id: &str,
        access_token: &str,
        token_expires_at: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE shout_calendar_connections
                 SET access_token = ?2, token_expires_at = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![id, access_token, token_expires_at, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn mark_calendar_synced(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE shout_calendar_connections SET last_sync_at = ?2 WHERE id = ?1",
                params![id, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn delete_calendar_connection(&self, wallet_address: &str, provider: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM shout_calendar_connections WHERE wallet_address = ?1 AND provider = ?2",
                params![wallet_address, provider],
            )?;
            Ok(removed > 0)
        })
    }
}
