use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::models::UserRow;
use crate::{Database, now_ts};

/// Points credited to the owner of a redeemed user invite.
pub const REFERRAL_POINTS: i64 = 100;

const USER_COLUMNS: &str = "id, wallet_address, wallet_type, chain, username, ens_name, \
     login_count, points, referred_by, invite_code_used, is_banned, ban_reason, \
     first_login, last_login";

/// Profile data carried by a login.
#[derive(Debug, Clone, Default)]
pub struct LoginRecord {
    pub wallet_address: String,
    pub wallet_type: String,
    pub chain: Option<String>,
    pub ens_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Created(UserRow),
    Returning(UserRow),
    /// The login was refused and not counted.
    Banned(UserRow),
}

/// Per-user counters that analytics events feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStat {
    MessagesSent,
    FriendsAdded,
    FriendRequestsSent,
    VoiceMinutes,
    VideoMinutes,
    GroupsCreated,
    StreamsStarted,
    RoomsCreated,
}

impl UserStat {
    fn column(&self) -> &'static str {
        match self {
            Self::MessagesSent => "messages_sent",
            Self::FriendsAdded => "friends_added",
            Self::FriendRequestsSent => "friend_requests_sent",
            Self::VoiceMinutes => "voice_minutes",
            Self::VideoMinutes => "video_minutes",
            Self::GroupsCreated => "groups_created",
            Self::StreamsStarted => "streams_started",
            Self::RoomsCreated => "rooms_created",
        }
    }

    pub fn points_per_unit(&self) -> i64 {
        match self {
            Self::MessagesSent => 1,
            Self::FriendRequestsSent => 2,
            Self::VoiceMinutes | Self::VideoMinutes => 1,
            Self::FriendsAdded | Self::GroupsCreated => 10,
            Self::StreamsStarted | Self::RoomsCreated => 5,
        }
    }
}

impl Database {
    pub fn get_user(&self, wallet_address: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, wallet_address))
    }

    /// Insert the user on first login, otherwise bump `login_count` and
    /// refresh the optional profile fields that were supplied.
    pub fn record_login(&self, login: &LoginRecord) -> Result<LoginOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            let outcome = match query_user(&tx, &login.wallet_address)? {
                Some(user) if user.is_banned => LoginOutcome::Banned(user),
                Some(_) => {
                    tx.execute(
                        "UPDATE shout_users SET
                             login_count = login_count + 1,
                             last_login = ?2,
                             updated_at = ?2,
                             chain = COALESCE(?3, chain),
                             ens_name = COALESCE(?4, ens_name),
                             username = COALESCE(?5, username)
                         WHERE wallet_address = ?1",
                        params![
                            login.wallet_address,
                            now,
                            login.chain,
                            login.ens_name,
                            login.username
                        ],
                    )?;
                    LoginOutcome::Returning(require_user(&tx, &login.wallet_address)?)
                }
                None => {
                    tx.execute(
                        "INSERT INTO shout_users
                             (id, wallet_address, wallet_type, chain, ens_name, username,
                              login_count, first_login, last_login, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7, ?7)",
                        params![
                            Uuid::new_v4().to_string(),
                            login.wallet_address,
                            login.wallet_type,
                            login.chain,
                            login.ens_name,
                            login.username,
                            now
                        ],
                    )?;
                    LoginOutcome::Created(require_user(&tx, &login.wallet_address)?)
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    pub fn set_banned(&self, wallet_address: &str, reason: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shout_users SET is_banned = 1, ban_reason = ?2, updated_at = ?3
                 WHERE wallet_address = ?1",
                params![wallet_address, reason, now_ts()],
            )?;
            Ok(changed == 1)
        })
    }

    /// Redeem a user-owned referral code for `redeemer`.
    ///
    /// Succeeds only for an unused code that the redeemer does not own. The
    /// code is claimed with a conditional update so two concurrent redeemers
    /// cannot both win; the owner is credited [`REFERRAL_POINTS`].
    pub fn redeem_user_invite(&self, code: &str, redeemer: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            let owner: Option<String> = tx
                .query_row(
                    "SELECT owner_address FROM shout_user_invites
                     WHERE code = ?1 AND used_by IS NULL",
                    [code],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(owner) = owner else {
                return Ok(false);
            };
            if owner == redeemer {
                return Ok(false);
            }

            let claimed = tx.execute(
                "UPDATE shout_user_invites SET used_by = ?2, used_at = ?3
                 WHERE code = ?1 AND used_by IS NULL",
                params![code, redeemer, now],
            )?;
            if claimed != 1 {
                return Ok(false);
            }

            tx.execute(
                "UPDATE shout_users SET referred_by = ?2, invite_code_used = ?3, updated_at = ?4
                 WHERE wallet_address = ?1",
                params![redeemer, owner, code, now],
            )?;
            tx.execute(
                "UPDATE shout_users SET points = points + ?2, updated_at = ?3
                 WHERE wallet_address = ?1",
                params![owner, REFERRAL_POINTS, now],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Consume one use of an admin invite code. The usage check and the
    /// increment happen in a single statement.
    pub fn redeem_admin_invite(&self, code: &str, redeemer: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();

            let claimed = tx.execute(
                "UPDATE shout_invite_codes SET current_uses = current_uses + 1
                 WHERE UPPER(code) = UPPER(?1)
                   AND is_active = 1
                   AND (expires_at IS NULL OR expires_at > ?2)
                   AND (max_uses IS NULL OR current_uses < max_uses)",
                params![code, now],
            )?;
            if claimed != 1 {
                return Ok(false);
            }

            tx.execute(
                "UPDATE shout_users SET invite_code_used = ?2, updated_at = ?3
                 WHERE wallet_address = ?1",
                params![redeemer, code, now],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Add `amount` to one of the user's counters and credit the matching
    /// points. Returns false when the user does not exist.
    pub fn increment_user_stat(&self, wallet_address: &str, stat: UserStat, amount: i64) -> Result<bool> {
        let column = stat.column();
        let sql = format!(
            "UPDATE shout_users SET {column} = {column} + ?2, points = points + ?3, updated_at = ?4
             WHERE wallet_address = ?1"
        );
        self.with_conn(|conn| {
            let changed = conn.execute(
                &sql,
                params![wallet_address, amount, amount * stat.points_per_unit(), now_ts()],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn user_stat(&self, wallet_address: &str, stat: UserStat) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT {} FROM shout_users WHERE wallet_address = ?1",
            stat.column()
        );
        self.with_conn(|conn| Ok(conn.query_row(&sql, [wallet_address], |r| r.get(0)).optional()?))
    }

    /// Top non-banned users by points; ties go to the earlier first login.
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM shout_users
                 WHERE is_banned = 0
                 ORDER BY points DESC, first_login ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map([limit], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// 1-based position of the user in the leaderboard order.
    pub fn user_rank(&self, wallet_address: &str) -> Result<Option<u32>> {
        self.with_conn(|conn| {
            let rank: Option<i64> = conn
                .query_row(
                    "SELECT 1 + (
                         SELECT COUNT(*) FROM shout_users o
                         WHERE o.is_banned = 0
                           AND (o.points > u.points
                                OR (o.points = u.points AND o.first_login < u.first_login))
                     )
                     FROM shout_users u
                     WHERE u.wallet_address = ?1 AND u.is_banned = 0",
                    [wallet_address],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(rank.map(|r| r as u32))
        })
    }
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        wallet_type: row.get(2)?,
        chain: row.get(3)?,
        username: row.get(4)?,
        ens_name: row.get(5)?,
        login_count: row.get(6)?,
        points: row.get(7)?,
        referred_by: row.get(8)?,
        invite_code_used: row.get(9)?,
        is_banned: row.get(10)?,
        ban_reason: row.get(11)?,
        first_login: row.get(12)?,
        last_login: row.get(13)?,
    })
}

fn query_user(conn: &Connection, wallet_address: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM shout_users WHERE wallet_address = ?1"),
            [wallet_address],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn require_user(conn: &Connection, wallet_address: &str) -> Result<UserRow> {
    query_user(conn, wallet_address)?
        .ok_or_else(|| anyhow::anyhow!("User vanished during login: {}", wallet_address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(db: &Database, address: &str) -> LoginOutcome {
        db.record_login(&LoginRecord {
            wallet_address: address.to_string(),
            wallet_type: "evm".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn repeated_login_increments_count() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(login(&db, "0xabc"), LoginOutcome::Created(u) if u.login_count == 1));
        assert!(matches!(login(&db, "0xabc"), LoginOutcome::Returning(u) if u.login_count == 2));
        assert!(matches!(login(&db, "0xabc"), LoginOutcome::Returning(u) if u.login_count == 3));
    }

    #[test]
    fn banned_login_is_not_counted() {
        let db = Database::open_in_memory().unwrap();
        login(&db, "0xabc");
        assert!(db.set_banned("0xabc", Some("spam")).unwrap());

        match login(&db, "0xabc") {
            LoginOutcome::Banned(user) => {
                assert_eq!(user.login_count, 1);
                assert_eq!(user.ban_reason.as_deref(), Some("spam"));
            }
            other => panic!("expected ban, got {:?}", other),
        }
    }

    #[test]
    fn user_invite_is_single_use_and_pays_referrer() {
        let db = Database::open_in_memory().unwrap();
        login(&db, "0xowner");
        login(&db, "0xnew");
        login(&db, "0xlate");
        db.create_user_invites("0xowner", &["ABCD2345".to_string()]).unwrap();

        assert!(!db.redeem_user_invite("ABCD2345", "0xowner").unwrap());
        assert!(db.redeem_user_invite("ABCD2345", "0xnew").unwrap());
        assert!(!db.redeem_user_invite("ABCD2345", "0xlate").unwrap());

        let owner = db.get_user("0xowner").unwrap().unwrap();
        assert_eq!(owner.points, REFERRAL_POINTS);
        let new = db.get_user("0xnew").unwrap().unwrap();
        assert_eq!(new.referred_by.as_deref(), Some("0xowner"));
    }

    #[test]
    fn admin_invite_respects_max_uses() {
        let db = Database::open_in_memory().unwrap();
        db.create_admin_invite("LAUNCH", Some(1), None, None).unwrap();

        assert!(db.redeem_admin_invite("LAUNCH", "0x1").unwrap());
        assert!(!db.redeem_admin_invite("LAUNCH", "0x2").unwrap());
        assert_eq!(db.find_admin_invite("LAUNCH").unwrap().unwrap().current_uses, 1);
    }

    #[test]
    fn admin_invite_matches_any_case() {
        let db = Database::open_in_memory().unwrap();
        db.create_admin_invite(" launch ", Some(10), None, None).unwrap();

        let row = db.find_admin_invite("Launch").unwrap().unwrap();
        assert_eq!(row.code, "LAUNCH");
        assert!(db.redeem_admin_invite("LAUNCH", "0x1").unwrap());
        assert!(db.redeem_admin_invite("launch", "0x2").unwrap());
        assert_eq!(db.find_admin_invite("LAUNCH").unwrap().unwrap().current_uses, 2);
    }

    #[test]
    fn stats_credit_points_and_rank() {
        let db = Database::open_in_memory().unwrap();
        login(&db, "0xa");
        login(&db, "0xb");

        assert!(db.increment_user_stat("0xb", UserStat::GroupsCreated, 1).unwrap());
        assert!(!db.increment_user_stat("0xmissing", UserStat::MessagesSent, 1).unwrap());
        assert_eq!(db.user_stat("0xb", UserStat::GroupsCreated).unwrap(), Some(1));

        let board = db.leaderboard(10).unwrap();
        assert_eq!(board[0].wallet_address, "0xb");
        assert_eq!(db.user_rank("0xb").unwrap(), Some(1));
        assert_eq!(db.user_rank("0xa").unwrap(), Some(2));
    }
}
