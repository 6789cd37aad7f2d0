use anyhow::Result;
use rusqlite::params;

use crate::models::PresenceRow;
use crate::{Database, now_ts};

impl Database {
    pub fn touch_presence(&self, wallet_address: &str, status: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_presence (wallet_address, status, last_seen)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (wallet_address) DO UPDATE SET
                     status = COALESCE(excluded.status, status),
                     last_seen = excluded.last_seen",
                params![wallet_address, status, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn presence_for(&self, addresses: &[String]) -> Result<Vec<PresenceRow>> {
        if addresses.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=addresses.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT wallet_address, status, last_seen FROM shout_presence
                 WHERE wallet_address IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = addresses
                .iter()
                .map(|a| a as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(PresenceRow {
                        wallet_address: row.get(0)?,
                        status: row.get(1)?,
                        last_seen: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
