use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Ordered schema migrations. Entry `i` brings the schema to version `i + 1`.
const MIGRATIONS: &[(&str, &str)] = &[
    ("users and invites", V1_USERS),
    ("calendar and availability", V2_CALENDAR),
    ("rooms and streams", V3_MEDIA),
    ("friends and groups", V4_SOCIAL),
    ("presence, push and sign-in nonces", V5_SESSIONS),
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    for (idx, (name, sql)) in MIGRATIONS.iter().enumerate() {
        let target = idx as i64 + 1;
        if version >= target {
            continue;
        }
        info!("Running migration v{} ({})", target, name);
        // Schema and version row land together or not at all.
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

const V1_USERS: &str = "
    CREATE TABLE shout_users (
        id                   TEXT PRIMARY KEY,
        wallet_address       TEXT NOT NULL UNIQUE,
        wallet_type          TEXT NOT NULL DEFAULT 'evm',
        chain                TEXT,
        username             TEXT,
        ens_name             TEXT,
        login_count          INTEGER NOT NULL DEFAULT 0,
        points               INTEGER NOT NULL DEFAULT 0,
        referred_by          TEXT,
        invite_code_used     TEXT,
        messages_sent        INTEGER NOT NULL DEFAULT 0,
        friends_added        INTEGER NOT NULL DEFAULT 0,
        friend_requests_sent INTEGER NOT NULL DEFAULT 0,
        voice_minutes        INTEGER NOT NULL DEFAULT 0,
        video_minutes        INTEGER NOT NULL DEFAULT 0,
        groups_created       INTEGER NOT NULL DEFAULT 0,
        streams_started      INTEGER NOT NULL DEFAULT 0,
        rooms_created        INTEGER NOT NULL DEFAULT 0,
        is_banned            INTEGER NOT NULL DEFAULT 0,
        ban_reason           TEXT,
        first_login          TEXT NOT NULL,
        last_login           TEXT NOT NULL,
        updated_at           TEXT NOT NULL
    );

    CREATE INDEX idx_users_points ON shout_users(points DESC, first_login);

    CREATE TABLE shout_invite_codes (
        code         TEXT PRIMARY KEY,
        max_uses     INTEGER,
        current_uses INTEGER NOT NULL DEFAULT 0,
        expires_at   TEXT,
        is_active    INTEGER NOT NULL DEFAULT 1,
        created_by   TEXT,
        note         TEXT,
        created_at   TEXT NOT NULL
    );

    CREATE TABLE shout_user_invites (
        code          TEXT PRIMARY KEY,
        owner_address TEXT NOT NULL,
        used_by       TEXT,
        used_at       TEXT,
        created_at    TEXT NOT NULL
    );

    CREATE INDEX idx_user_invites_owner ON shout_user_invites(owner_address);
";

const V2_CALENDAR: &str = "
    CREATE TABLE shout_calendar_connections (
        id               TEXT PRIMARY KEY,
        wallet_address   TEXT NOT NULL,
        provider         TEXT NOT NULL,
        access_token     TEXT NOT NULL,
        refresh_token    TEXT,
        token_expires_at TEXT,
        calendar_id      TEXT,
        calendar_email   TEXT,
        is_active        INTEGER NOT NULL DEFAULT 1,
        last_sync_at     TEXT,
        created_at       TEXT NOT NULL,
        updated_at       TEXT NOT NULL,
        UNIQUE(wallet_address, provider)
    );

    CREATE TABLE shout_availability_windows (
        id             TEXT PRIMARY KEY,
        wallet_address TEXT NOT NULL,
        name           TEXT,
        day_of_week    INTEGER NOT NULL,
        start_time     TEXT NOT NULL,
        end_time       TEXT NOT NULL,
        timezone       TEXT NOT NULL DEFAULT 'UTC',
        is_active      INTEGER NOT NULL DEFAULT 1,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    );

    CREATE INDEX idx_availability_owner
        ON shout_availability_windows(wallet_address, is_active);
";

const V3_MEDIA: &str = "
    CREATE TABLE shout_instant_rooms (
        id               TEXT PRIMARY KEY,
        room_id          TEXT NOT NULL,
        join_code        TEXT NOT NULL UNIQUE,
        host_address     TEXT NOT NULL,
        title            TEXT,
        max_participants INTEGER NOT NULL,
        is_active        INTEGER NOT NULL DEFAULT 1,
        expires_at       TEXT NOT NULL,
        created_at       TEXT NOT NULL,
        ended_at         TEXT
    );

    CREATE TABLE shout_streams (
        id           TEXT PRIMARY KEY,
        host_address TEXT NOT NULL,
        title        TEXT,
        status       TEXT NOT NULL DEFAULT 'live',
        viewer_count INTEGER NOT NULL DEFAULT 0,
        started_at   TEXT NOT NULL,
        ended_at     TEXT
    );

    CREATE TABLE shout_stream_chat (
        id           TEXT PRIMARY KEY,
        stream_id    TEXT NOT NULL REFERENCES shout_streams(id),
        user_address TEXT NOT NULL,
        message      TEXT NOT NULL,
        created_at   TEXT NOT NULL
    );

    CREATE INDEX idx_stream_chat_stream ON shout_stream_chat(stream_id, created_at);
";

const V4_SOCIAL: &str = "
    CREATE TABLE shout_friend_requests (
        id           TEXT PRIMARY KEY,
        from_address TEXT NOT NULL,
        to_address   TEXT NOT NULL,
        status       TEXT NOT NULL DEFAULT 'pending',
        created_at   TEXT NOT NULL,
        responded_at TEXT
    );

    CREATE INDEX idx_friend_requests_to ON shout_friend_requests(to_address, status);
    CREATE INDEX idx_friend_requests_from ON shout_friend_requests(from_address, status);

    CREATE TABLE shout_friends (
        user_address   TEXT NOT NULL,
        friend_address TEXT NOT NULL,
        nickname       TEXT,
        created_at     TEXT NOT NULL,
        PRIMARY KEY (user_address, friend_address)
    );

    CREATE TABLE shout_groups (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE shout_group_members (
        group_id       TEXT NOT NULL REFERENCES shout_groups(id),
        member_address TEXT NOT NULL,
        role           TEXT NOT NULL DEFAULT 'member',
        joined_at      TEXT NOT NULL,
        PRIMARY KEY (group_id, member_address)
    );

    CREATE TABLE shout_group_invitations (
        id              TEXT PRIMARY KEY,
        group_id        TEXT NOT NULL REFERENCES shout_groups(id),
        group_name      TEXT NOT NULL,
        inviter_address TEXT NOT NULL,
        invitee_address TEXT NOT NULL,
        group_key       TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'pending',
        created_at      TEXT NOT NULL,
        responded_at    TEXT
    );

    CREATE INDEX idx_group_invitations_invitee
        ON shout_group_invitations(invitee_address, status);
";

const V5_SESSIONS: &str = "
    CREATE TABLE shout_presence (
        wallet_address TEXT PRIMARY KEY,
        status         TEXT,
        last_seen      TEXT NOT NULL
    );

    CREATE TABLE shout_push_subscriptions (
        id             TEXT PRIMARY KEY,
        wallet_address TEXT NOT NULL,
        endpoint       TEXT NOT NULL UNIQUE,
        p256dh         TEXT NOT NULL,
        auth           TEXT NOT NULL,
        created_at     TEXT NOT NULL
    );

    CREATE TABLE shout_siws_nonces (
        nonce      TEXT PRIMARY KEY,
        address    TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        used       INTEGER NOT NULL DEFAULT 0
    );
";
