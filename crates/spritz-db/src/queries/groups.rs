use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use spritz_types::models::{GroupRole, InvitationStatus};

use crate::models::{GroupInvitationRow, GroupRow};
use crate::{Database, now_ts};

const INVITATION_COLUMNS: &str = "id, group_id, group_name, inviter_address, invitee_address, \
     group_key, status, created_at";

impl Database {
    /// Create a group owned by `creator` and a pending invitation, carrying a
    /// copy of the group key, for every other address in `invitees`.
    /// Returns the group id and the number of invitations written.
    pub fn create_group(
        &self,
        name: &str,
        creator: &str,
        invitees: &[String],
        group_key: &str,
    ) -> Result<(String, usize)> {
        let group_id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            tx.execute(
                "INSERT INTO shout_groups (id, name, created_by, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![group_id, name, creator, now],
            )?;
            tx.execute(
                "INSERT INTO shout_group_members (group_id, member_address, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group_id, creator, GroupRole::Admin.as_str(), now],
            )?;

            let mut sent = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO shout_group_invitations
                         (id, group_id, group_name, inviter_address, invitee_address, group_key,
                          status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for invitee in invitees.iter().filter(|a| a.as_str() != creator) {
                    stmt.execute(params![
                        Uuid::new_v4().to_string(),
                        group_id,
                        name,
                        creator,
                        invitee,
                        group_key,
                        InvitationStatus::Pending.as_str(),
                        now
                    ])?;
                    sent += 1;
                }
            }

            tx.commit()?;
            Ok((group_id.clone(), sent))
        })
    }

    pub fn groups_for_member(&self, address: &str) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.created_by, m.role,
                        (SELECT COUNT(*) FROM shout_group_members c WHERE c.group_id = g.id),
                        g.created_at
                 FROM shout_group_members m
                 JOIN shout_groups g ON g.id = m.group_id
                 WHERE m.member_address = ?1
                 ORDER BY g.created_at DESC",
            )?;
            let rows = stmt
                .query_map([address], |row| {
                    Ok(GroupRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_by: row.get(2)?,
                        role: row.get(3)?,
                        member_count: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn pending_group_invitations(&self, invitee: &str) -> Result<Vec<GroupInvitationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVITATION_COLUMNS} FROM shout_group_invitations
                 WHERE invitee_address = ?1 AND status = ?2
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map(
                    params![invitee, InvitationStatus::Pending.as_str()],
                    invitation_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_group_invitation(&self, id: &str) -> Result<Option<GroupInvitationRow>> {
        self.with_conn(|conn| query_invitation(conn, id))
    }

    /// Accept a pending invitation and add the invitee to the group.
    /// Returns false when the invitation is no longer pending.
    pub fn accept_group_invitation(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            let Some(invitation) = query_invitation(&tx, id)? else {
                return Ok(false);
            };
            if !respond(&tx, id, InvitationStatus::Accepted, &now)? {
                return Ok(false);
            }

            tx.execute(
                "INSERT OR IGNORE INTO shout_group_members (group_id, member_address, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    invitation.group_id,
                    invitation.invitee_address,
                    GroupRole::Member.as_str(),
                    now
                ],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn decline_group_invitation(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| respond(conn, id, InvitationStatus::Declined, &now_ts()))
    }
}

fn respond(conn: &Connection, id: &str, status: InvitationStatus, now: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE shout_group_invitations SET status = ?2, responded_at = ?3
         WHERE id = ?1 AND status = ?4",
        params![id, status.as_str(), now, InvitationStatus::Pending.as_str()],
    )?;
    Ok(changed == 1)
}

fn invitation_from_row(row: &Row<'_>) -> rusqlite::Result<GroupInvitationRow> {
    Ok(GroupInvitationRow {
        id: row.get(0)?,
        group_id: row.get(1)?,
        group_name: row.get(2)?,
        inviter_address: row.get(3)?,
        invitee_address: row.get(4)?,
        group_key: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_invitation(conn: &Connection, id: &str) -> Result<Option<GroupInvitationRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {INVITATION_COLUMNS} FROM shout_group_invitations WHERE id = ?1"),
            [id],
            invitation_from_row,
        )
        .optional()?;
    Ok(row)
}
