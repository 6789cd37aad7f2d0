use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::models::InstantRoomRow;
use crate::{Database, now_ts};

impl Database {
    pub fn create_instant_room(
        &self,
        room_id: &str,
        join_code: &str,
        host_address: &str,
        title: Option<&str>,
        max_participants: u32,
        expires_at: &str,
    ) -> Result<InstantRoomRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_instant_rooms
                     (id, room_id, join_code, host_address, title, max_participants,
                      expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    Uuid::new_v4().to_string(),
                    room_id,
                    join_code,
                    host_address,
                    title,
                    max_participants,
                    expires_at,
                    now_ts()
                ],
            )?;
            Ok(())
        })?;

        self.get_instant_room(join_code)?
            .ok_or_else(|| anyhow::anyhow!("Instant room {} missing after insert", join_code))
    }

    pub fn get_instant_room(&self, join_code: &str) -> Result<Option<InstantRoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, room_id, join_code, host_address, title, max_participants,
                            is_active, expires_at, created_at, ended_at
                     FROM shout_instant_rooms WHERE join_code = ?1",
                    [join_code],
                    |row| {
                        Ok(InstantRoomRow {
                            id: row.get(0)?,
                            room_id: row.get(1)?,
                            join_code: row.get(2)?,
                            host_address: row.get(3)?,
                            title: row.get(4)?,
                            max_participants: row.get(5)?,
                            is_active: row.get(6)?,
                            expires_at: row.get(7)?,
                            created_at: row.get(8)?,
                            ended_at: row.get(9)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn join_code_taken(&self, join_code: &str) -> Result<bool> {
        Ok(self.get_instant_room(join_code)?.is_some())
    }

    pub fn end_instant_room(&self, join_code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shout_instant_rooms SET is_active = 0, ended_at = ?2
                 WHERE join_code = ?1 AND is_active = 1",
                params![join_code, now_ts()],
            )?;
            Ok(changed == 1)
        })
    }
}

impl InstantRoomRow {
    /// Ended by the host, or past its expiry at `now` (an encoded timestamp).
    pub fn is_gone(&self, now: &str) -> bool {
        !self.is_active || self.ended_at.is_some() || self.expires_at.as_str() <= now
    }
}
