use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::models::{InviteCodeRow, UserInviteRow};
use crate::{Database, now_ts};

impl Database {
    // -- User invites --

    pub fn user_invites(&self, owner_address: &str) -> Result<Vec<UserInviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, owner_address, used_by, used_at, created_at
                 FROM shout_user_invites
                 WHERE owner_address = ?1
                 ORDER BY created_at, code",
            )?;
            let rows = stmt
                .query_map([owner_address], |row| {
                    Ok(UserInviteRow {
                        code: row.get(0)?,
                        owner_address: row.get(1)?,
                        used_by: row.get(2)?,
                        used_at: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Allocate codes to `owner_address`. Codes that collide with an existing
    /// one are skipped; the number actually inserted is returned.
    pub fn create_user_invites(&self, owner_address: &str, codes: &[String]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO shout_user_invites (code, owner_address, created_at)
                     VALUES (?1, ?2, ?3)",
                )?;
                for code in codes {
                    inserted += stmt.execute(params![code, owner_address, now])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    pub fn user_invite_is_open(&self, code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let open: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM shout_user_invites WHERE code = ?1 AND used_by IS NULL",
                    [code],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(open.is_some())
        })
    }

    // -- Admin invites --

    pub fn create_admin_invite(
        &self,
        code: &str,
        max_uses: Option<i64>,
        expires_at: Option<&str>,
        note: Option<&str>,
    ) -> Result<()> {
        let code = code.trim().to_uppercase();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shout_invite_codes (code, max_uses, expires_at, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![code, max_uses, expires_at, note, now_ts()],
            )?;
            Ok(())
        })
    }

    pub fn find_admin_invite(&self, code: &str) -> Result<Option<InviteCodeRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT code, max_uses, current_uses, expires_at, is_active
                     FROM shout_invite_codes WHERE UPPER(code) = UPPER(?1)",
                    [code],
                    |row| {
                        Ok(InviteCodeRow {
                            code: row.get(0)?,
                            max_uses: row.get(1)?,
                            current_uses: row.get(2)?,
                            expires_at: row.get(3)?,
                            is_active: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

impl InviteCodeRow {
    /// Whether one more use would be accepted at `now` (an encoded timestamp).
    pub fn is_redeemable(&self, now: &str) -> bool {
        self.is_active
            && self.expires_at.as_deref().is_none_or(|exp| exp > now)
            && self.max_uses.is_none_or(|max| self.current_uses < max)
    }
}
