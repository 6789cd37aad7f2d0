use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use spritz_types::models::StreamStatus;

use crate::models::{StreamChatRow, StreamRow};
use crate::{Database, now_ts};

const STREAM_COLUMNS: &str = "id, host_address, title, status, viewer_count, started_at, ended_at";

impl Database {
    // -- Streams --

    pub fn create_stream(&self, host_address: &str, title: Option<&str>) -> Result<StreamRow> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_streams (id, host_address, title, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, host_address, title, StreamStatus::Live.as_str(), now_ts()],
            )?;
            require_stream(conn, &id)
        })
    }

    pub fn get_stream(&self, id: &str) -> Result<Option<StreamRow>> {
        self.with_conn(|conn| query_stream(conn, id))
    }

    pub fn live_streams(&self) -> Result<Vec<StreamRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STREAM_COLUMNS} FROM shout_streams
                 WHERE status = ?1
                 ORDER BY viewer_count DESC, started_at DESC"
            ))?;
            let rows = stmt
                .query_map([StreamStatus::Live.as_str()], stream_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn end_stream(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shout_streams SET status = ?2, ended_at = ?3, viewer_count = 0
                 WHERE id = ?1 AND status = ?4",
                params![
                    id,
                    StreamStatus::Ended.as_str(),
                    now_ts(),
                    StreamStatus::Live.as_str()
                ],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Viewers --

    /// Returns the new count, or `None` for an unknown or ended stream.
    pub fn increment_viewers(&self, id: &str) -> Result<Option<i64>> {
        self.adjust_viewers(
            id,
            "UPDATE shout_streams SET viewer_count = viewer_count + 1 WHERE id = ?1 AND status = 'live'",
        )
    }

    /// Never drives the count below zero.
    pub fn decrement_viewers(&self, id: &str) -> Result<Option<i64>> {
        self.adjust_viewers(
            id,
            "UPDATE shout_streams SET viewer_count = MAX(viewer_count - 1, 0) WHERE id = ?1",
        )
    }

    fn adjust_viewers(&self, id: &str, sql: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            if conn.execute(sql, [id])? == 0 {
                return Ok(None);
            }
            let count = conn.query_row(
                "SELECT viewer_count FROM shout_streams WHERE id = ?1",
                [id],
                |r| r.get(0),
            )?;
            Ok(Some(count))
        })
    }

    // -- Chat --

    pub fn insert_stream_chat(&self, stream_id: &str, user_address: &str, message: &str) -> Result<StreamChatRow> {
        let row = StreamChatRow {
            id: Uuid::new_v4().to_string(),
            stream_id: stream_id.to_string(),
            user_address: user_address.to_string(),
            message: message.to_string(),
            created_at: now_ts(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_stream_chat (id, stream_id, user_address, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.stream_id, row.user_address, row.message, row.created_at],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    /// The latest `limit` messages, oldest first.
    pub fn recent_stream_chat(&self, stream_id: &str, limit: u32) -> Result<Vec<StreamChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, stream_id, user_address, message, created_at
                 FROM shout_stream_chat
                 WHERE stream_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let mut rows = stmt
                .query_map(params![stream_id, limit], |row| {
                    Ok(StreamChatRow {
                        id: row.get(0)?,
                        stream_id: row.get(1)?,
                        user_address: row.get(2)?,
                        message: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }
}

fn stream_from_row(row: &Row<'_>) -> rusqlite::Result<StreamRow> {
    Ok(StreamRow {
        id: row.get(0)?,
        host_address: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        viewer_count: row.get(4)?,
        started_at: row.get(5)?,
        ended_at: row.get(6)?,
    })
}

fn query_stream(conn: &Connection, id: &str) -> Result<Option<StreamRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {STREAM_COLUMNS} FROM shout_streams WHERE id = ?1"),
            [id],
            stream_from_row,
        )
        .optional()?;
    Ok(row)
}

fn require_stream(conn: &Connection, id: &str) -> Result<StreamRow> {
    query_stream(conn, id)?.ok_or_else(|| anyhow::anyhow!("Stream {} missing after insert", id))
}
