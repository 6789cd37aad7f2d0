//! Database row types. They map directly to SQLite rows and are converted
//! into `spritz-types` views at the edge, keeping the DB layer independent.

use spritz_types::models::{
    AvailabilityWindow, CalendarConnectionView, FriendRequestStatus, FriendRequestView, FriendView,
    GroupInvitationView, GroupRole, GroupView, InstantRoomView, InvitationStatus, PresenceView,
    StreamChatMessage, StreamStatus, StreamView, UserInviteView, UserProfile, WalletType,
};
use tracing::warn;
use uuid::Uuid;

use crate::{decode_opt_ts, decode_ts};

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub wallet_address: String,
    pub wallet_type: String,
    pub chain: Option<String>,
    pub username: Option<String>,
    pub ens_name: Option<String>,
    pub login_count: i64,
    pub points: i64,
    pub referred_by: Option<String>,
    pub invite_code_used: Option<String>,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub first_login: String,
    pub last_login: String,
}

impl UserRow {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: parse_id(&self.id, "user"),
            wallet_type: self
                .wallet_type
                .parse()
                .unwrap_or_else(|_| WalletType::detect(&self.wallet_address)),
            wallet_address: self.wallet_address,
            chain: self.chain,
            username: self.username,
            ens_name: self.ens_name,
            login_count: self.login_count,
            points: self.points,
            referred_by: self.referred_by,
            is_banned: self.is_banned,
            first_login: decode_ts(&self.first_login),
            last_login: decode_ts(&self.last_login),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InviteCodeRow {
    pub code: String,
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    pub expires_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct UserInviteRow {
    pub code: String,
    pub owner_address: String,
    pub used_by: Option<String>,
    pub used_at: Option<String>,
    pub created_at: String,
}

impl UserInviteRow {
    pub fn into_view(self) -> UserInviteView {
        UserInviteView {
            used_at: decode_opt_ts(self.used_at.as_deref()),
            code: self.code,
            used_by: self.used_by,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarConnectionRow {
    pub id: String,
    pub wallet_address: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<String>,
    pub calendar_id: Option<String>,
    pub calendar_email: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<String>,
    pub created_at: String,
}

impl CalendarConnectionRow {
    /// Public view; tokens never leave the server.
    pub fn to_view(&self) -> CalendarConnectionView {
        CalendarConnectionView {
            provider: self.provider.clone(),
            calendar_id: self.calendar_id.clone(),
            calendar_email: self.calendar_email.clone(),
            is_active: self.is_active,
            last_sync_at: decode_opt_ts(self.last_sync_at.as_deref()),
            connected_at: decode_ts(&self.created_at),
        }
    }
}

/// Token material written on OAuth callback or refresh.
#[derive(Debug, Clone)]
pub struct CalendarTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<String>,
    pub calendar_id: Option<String>,
    pub calendar_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AvailabilityRow {
    pub id: String,
    pub wallet_address: String,
    pub name: Option<String>,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
    pub is_active: bool,
}

impl AvailabilityRow {
    pub fn into_view(self) -> AvailabilityWindow {
        AvailabilityWindow {
            id: parse_id(&self.id, "availability"),
            wallet_address: self.wallet_address,
            name: self.name,
            day_of_week: self.day_of_week.clamp(0, 6) as u8,
            start_time: self.start_time,
            end_time: self.end_time,
            timezone: self.timezone,
            is_active: self.is_active,
        }
    }
}

/// Fields of an availability window as validated by the API.
#[derive(Debug, Clone)]
pub struct NewAvailability {
    pub wallet_address: String,
    pub name: Option<String>,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
}

#[derive(Debug, Clone)]
pub struct InstantRoomRow {
    pub id: String,
    pub room_id: String,
    pub join_code: String,
    pub host_address: String,
    pub title: Option<String>,
    pub max_participants: i64,
    pub is_active: bool,
    pub expires_at: String,
    pub created_at: String,
    pub ended_at: Option<String>,
}

impl InstantRoomRow {
    pub fn into_view(self) -> InstantRoomView {
        InstantRoomView {
            id: parse_id(&self.id, "room"),
            room_id: self.room_id,
            join_code: self.join_code,
            host_address: self.host_address,
            title: self.title,
            max_participants: self.max_participants.max(0) as u32,
            expires_at: decode_ts(&self.expires_at),
            created_at: decode_ts(&self.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamRow {
    pub id: String,
    pub host_address: String,
    pub title: Option<String>,
    pub status: String,
    pub viewer_count: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
}

impl StreamRow {
    pub fn is_live(&self) -> bool {
        self.status == StreamStatus::Live.as_str()
    }

    pub fn into_view(self) -> StreamView {
        StreamView {
            id: parse_id(&self.id, "stream"),
            status: self.status.parse().unwrap_or(StreamStatus::Ended),
            host_address: self.host_address,
            title: self.title,
            viewer_count: self.viewer_count,
            started_at: decode_ts(&self.started_at),
            ended_at: decode_opt_ts(self.ended_at.as_deref()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamChatRow {
    pub id: String,
    pub stream_id: String,
    pub user_address: String,
    pub message: String,
    pub created_at: String,
}

impl StreamChatRow {
    pub fn into_view(self) -> StreamChatMessage {
        StreamChatMessage {
            id: parse_id(&self.id, "chat message"),
            stream_id: parse_id(&self.stream_id, "stream"),
            user_address: self.user_address,
            message: self.message,
            created_at: decode_ts(&self.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FriendRequestRow {
    pub id: String,
    pub from_address: String,
    pub to_address: String,
    pub status: String,
    pub created_at: String,
}

impl FriendRequestRow {
    pub fn status(&self) -> FriendRequestStatus {
        self.status.parse().unwrap_or(FriendRequestStatus::Rejected)
    }

    pub fn into_view(self) -> FriendRequestView {
        FriendRequestView {
            id: parse_id(&self.id, "friend request"),
            status: self.status(),
            from_address: self.from_address,
            to_address: self.to_address,
            created_at: decode_ts(&self.created_at),
        }
    }
}

/// A friendship joined with the friend's profile and presence.
#[derive(Debug, Clone)]
pub struct FriendRow {
    pub friend_address: String,
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub ens_name: Option<String>,
    pub last_seen: Option<String>,
    pub created_at: String,
}

impl FriendRow {
    /// `is_online` is decided by the caller, which owns the staleness rule.
    pub fn into_view(self, is_online: bool) -> FriendView {
        FriendView {
            address: self.friend_address,
            nickname: self.nickname,
            username: self.username,
            ens_name: self.ens_name,
            is_online,
            last_seen: decode_opt_ts(self.last_seen.as_deref()),
            since: decode_ts(&self.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub role: String,
    pub member_count: i64,
    pub created_at: String,
}

impl GroupRow {
    pub fn into_view(self) -> GroupView {
        GroupView {
            id: parse_id(&self.id, "group"),
            role: self.role.parse().unwrap_or(GroupRole::Member),
            name: self.name,
            created_by: self.created_by,
            member_count: self.member_count,
            created_at: decode_ts(&self.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupInvitationRow {
    pub id: String,
    pub group_id: String,
    pub group_name: String,
    pub inviter_address: String,
    pub invitee_address: String,
    pub group_key: String,
    pub status: String,
    pub created_at: String,
}

impl GroupInvitationRow {
    pub fn status(&self) -> InvitationStatus {
        self.status.parse().unwrap_or(InvitationStatus::Declined)
    }

    pub fn into_view(self) -> GroupInvitationView {
        GroupInvitationView {
            id: parse_id(&self.id, "invitation"),
            group_id: parse_id(&self.group_id, "group"),
            status: self.status(),
            group_name: self.group_name,
            inviter_address: self.inviter_address,
            invitee_address: self.invitee_address,
            group_key: self.group_key,
            created_at: decode_ts(&self.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresenceRow {
    pub wallet_address: String,
    pub status: Option<String>,
    pub last_seen: String,
}

impl PresenceRow {
    pub fn into_view(self, is_online: bool) -> PresenceView {
        PresenceView {
            is_online,
            last_seen: Some(decode_ts(&self.last_seen)),
            address: self.wallet_address,
            status: self.status,
        }
    }
}
