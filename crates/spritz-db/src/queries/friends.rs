use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use spritz_types::models::FriendRequestStatus;

use crate::models::{FriendRequestRow, FriendRow};
use crate::{Database, now_ts};

const REQUEST_COLUMNS: &str = "id, from_address, to_address, status, created_at";

impl Database {
    pub fn are_friends(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM shout_friends WHERE user_address = ?1 AND friend_address = ?2",
                    params![a, b],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// A pending request between the two addresses, in either direction.
    pub fn pending_request_between(&self, a: &str, b: &str) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {REQUEST_COLUMNS} FROM shout_friend_requests
                         WHERE status = ?3
                           AND ((from_address = ?1 AND to_address = ?2)
                             OR (from_address = ?2 AND to_address = ?1))"
                    ),
                    params![a, b, FriendRequestStatus::Pending.as_str()],
                    request_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn create_friend_request(&self, from: &str, to: &str) -> Result<FriendRequestRow> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_friend_requests (id, from_address, to_address, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, from, to, FriendRequestStatus::Pending.as_str(), now_ts()],
            )?;
            query_request(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Friend request {} missing after insert", id))
        })
    }

    pub fn get_friend_request(&self, id: &str) -> Result<Option<FriendRequestRow>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    pub fn incoming_friend_requests(&self, address: &str) -> Result<Vec<FriendRequestRow>> {
        self.pending_requests("to_address", address)
    }

    pub fn outgoing_friend_requests(&self, address: &str) -> Result<Vec<FriendRequestRow>> {
        self.pending_requests("from_address", address)
    }

    fn pending_requests(&self, column: &str, address: &str) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM shout_friend_requests
                 WHERE {column} = ?1 AND status = ?2
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map(
                    params![address, FriendRequestStatus::Pending.as_str()],
                    request_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark a pending request accepted and write the friendship both ways.
    /// Returns false when the request is no longer pending.
    pub fn accept_friend_request(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            let Some(request) = query_request(&tx, id)? else {
                return Ok(false);
            };
            if !respond(&tx, id, FriendRequestStatus::Accepted, &now)? {
                return Ok(false);
            }

            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO shout_friends (user_address, friend_address, created_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            stmt.execute(params![request.from_address, request.to_address, now])?;
            stmt.execute(params![request.to_address, request.from_address, now])?;
            drop(stmt);

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn reject_friend_request(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| respond(conn, id, FriendRequestStatus::Rejected, &now_ts()))
    }

    pub fn delete_friend_request(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM shout_friend_requests WHERE id = ?1 AND status = ?2",
                params![id, FriendRequestStatus::Pending.as_str()],
            )?;
            Ok(removed == 1)
        })
    }

    /// Friends of `address` joined with their profile and last heartbeat.
    pub fn list_friends(&self, address: &str) -> Result<Vec<FriendRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.friend_address, f.nickname, u.username, u.ens_name, p.last_seen, f.created_at
                 FROM shout_friends f
                 LEFT JOIN shout_users u ON u.wallet_address = f.friend_address
                 LEFT JOIN shout_presence p ON p.wallet_address = f.friend_address
                 WHERE f.user_address = ?1
                 ORDER BY f.created_at DESC",
            )?;
            let rows = stmt
                .query_map([address], |row| {
                    Ok(FriendRow {
                        friend_address: row.get(0)?,
                        nickname: row.get(1)?,
                        username: row.get(2)?,
                        ens_name: row.get(3)?,
                        last_seen: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn remove_friend(&self, a: &str, b: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM shout_friends
                 WHERE (user_address = ?1 AND friend_address = ?2)
                    OR (user_address = ?2 AND friend_address = ?1)",
                params![a, b],
            )?;
            Ok(removed > 0)
        })
    }
}

fn respond(conn: &Connection, id: &str, status: FriendRequestStatus, now: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE shout_friend_requests SET status = ?2, responded_at = ?3
         WHERE id = ?1 AND status = ?4",
        params![id, status.as_str(), now, FriendRequestStatus::Pending.as_str()],
    )?;
    Ok(changed == 1)
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<FriendRequestRow> {
    Ok(FriendRequestRow {
        id: row.get(0)?,
        from_address: row.get(1)?,
        to_address: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_request(conn: &Connection, id: &str) -> Result<Option<FriendRequestRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM shout_friend_requests WHERE id = ?1"),
            [id],
            request_from_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepting_creates_mutual_friendship_once() {
        let db = Database::open_in_memory().unwrap();
        let req = db.create_friend_request("0xa", "0xb").unwrap();
        assert!(db.pending_request_between("0xb", "0xa").unwrap().is_some());
        assert_eq!(db.incoming_friend_requests("0xb").unwrap().len(), 1);
        assert_eq!(db.outgoing_friend_requests("0xa").unwrap().len(), 1);

        assert!(db.accept_friend_request(&req.id).unwrap());
        assert!(!db.accept_friend_request(&req.id).unwrap());
        assert!(!db.reject_friend_request(&req.id).unwrap());

        assert!(db.are_friends("0xa", "0xb").unwrap());
        assert!(db.are_friends("0xb", "0xa").unwrap());
        assert_eq!(db.list_friends("0xa").unwrap()[0].friend_address, "0xb");

        assert!(db.remove_friend("0xb", "0xa").unwrap());
        assert!(!db.are_friends("0xa", "0xb").unwrap());
    }
}
