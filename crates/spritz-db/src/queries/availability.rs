use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::models::{AvailabilityRow, NewAvailability};
use crate::{Database, now_ts};

const WINDOW_COLUMNS: &str =
    "id, wallet_address, name, day_of_week, start_time, end_time, timezone, is_active";

impl Database {
    /// Active windows ordered by weekday, then start time.
    pub fn list_availability(&self, wallet_address: &str) -> Result<Vec<AvailabilityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WINDOW_COLUMNS} FROM shout_availability_windows
                 WHERE wallet_address = ?1 AND is_active = 1
                 ORDER BY day_of_week, start_time"
            ))?;
            let rows = stmt
                .query_map([wallet_address], window_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_availability(&self, id: &str) -> Result<Option<AvailabilityRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {WINDOW_COLUMNS} FROM shout_availability_windows WHERE id = ?1"),
                    [id],
                    window_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn insert_availability(&self, window: &NewAvailability) -> Result<AvailabilityRow> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO shout_availability_windows
                     (id, wallet_address, name, day_of_week, start_time, end_time, timezone,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id,
                    window.wallet_address,
                    window.name,
                    window.day_of_week,
                    window.start_time,
                    window.end_time,
                    window.timezone,
                    now
                ],
            )?;
            Ok(())
        })?;

        self.get_availability(&id)?
            .ok_or_else(|| anyhow::anyhow!("Availability window {} missing after insert", id))
    }

    /// Overwrite an active window owned by `window.wallet_address`.
    /// Returns `None` when no such window exists.
    pub fn update_availability(&self, id: &str, window: &NewAvailability) -> Result<Option<AvailabilityRow>> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE shout_availability_windows SET
                     name = ?3, day_of_week = ?4, start_time = ?5, end_time = ?6,
                     timezone = ?7, updated_at = ?8
                 WHERE id = ?1 AND wallet_address = ?2 AND is_active = 1",
                params![
                    id,
                    window.wallet_address,
                    window.name,
                    window.day_of_week,
                    window.start_time,
                    window.end_time,
                    window.timezone,
                    now_ts()
                ],
            )?)
        })?;

        if changed == 0 {
            return Ok(None);
        }
        self.get_availability(id)
    }

    /// Soft delete: the row stays, flagged inactive.
    pub fn deactivate_availability(&self, id: &str, wallet_address: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shout_availability_windows SET is_active = 0, updated_at = ?3
                 WHERE id = ?1 AND wallet_address = ?2 AND is_active = 1",
                params![id, wallet_address, now_ts()],
            )?;
            Ok(changed == 1)
        })
    }
}

fn window_from_row(row: &Row<'_>) -> rusqlite::Result<AvailabilityRow> {
    Ok(AvailabilityRow {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        name: row.get(2)?,
        day_of_week: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        timezone: row.get(6)?,
        is_active: row.get(7)?,
    })
}
