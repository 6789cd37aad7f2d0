use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::{Database, now_ts};

impl Database {
    /// A browser endpoint belongs to one wallet; re-subscribing moves it.
    pub fn upsert_push_subscription(
        &self,
        wallet_address: &str,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_push_subscriptions (id, wallet_address, endpoint, p256dh, auth, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (endpoint) DO UPDATE SET
                     wallet_address = excluded.wallet_address,
                     p256dh = excluded.p256dh,
                     auth = excluded.auth",
                params![Uuid::new_v4().to_string(), wallet_address, endpoint, p256dh, auth, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn delete_push_subscription(&self, wallet_address: &str, endpoint: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM shout_push_subscriptions WHERE wallet_address = ?1 AND endpoint = ?2",
                params![wallet_address, endpoint],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn has_push_subscription(&self, wallet_address: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM shout_push_subscriptions WHERE wallet_address = ?1 LIMIT 1",
                    [wallet_address],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}
