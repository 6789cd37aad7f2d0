use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// -- Wallets --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Evm,
    Solana,
}

impl WalletType {
    /// Guess the chain family from the address shape: `0x` prefixed addresses are EVM.
    pub fn detect(address: &str) -> Self {
        if address.trim().starts_with("0x") {
            Self::Evm
        } else {
            Self::Solana
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
        }
    }
}

impl FromStr for WalletType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evm" | "ethereum" => Ok(Self::Evm),
            "solana" => Ok(Self::Solana),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// EVM addresses are case-insensitive and stored lowercased; Solana (base58)
/// addresses are case-sensitive and only trimmed.
pub fn normalize_address(address: &str, wallet_type: WalletType) -> String {
    let trimmed = address.trim();
    match wallet_type {
        WalletType::Evm => trimmed.to_lowercase(),
        WalletType::Solana => trimmed.to_string(),
    }
}

/// Normalize an address whose wallet type is not known.
pub fn normalize_any(address: &str) -> String {
    normalize_address(address, WalletType::detect(address))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

// -- Status enums --

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

string_enum!(FriendRequestStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

string_enum!(InvitationStatus {
    Pending => "pending",
    Accepted => "accepted",
    Declined => "declined",
});

string_enum!(StreamStatus {
    Live => "live",
    Ended => "ended",
});

string_enum!(GroupRole {
    Admin => "admin",
    Member => "member",
});

/// Analytics event tags accepted by the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEvent {
    MessageSent,
    FriendAdded,
    FriendRequestSent,
    VoiceCall,
    VideoCall,
    GroupCreated,
    StreamStarted,
    RoomCreated,
}

impl FromStr for AnalyticsEvent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message_sent" => Ok(Self::MessageSent),
            "friend_added" => Ok(Self::FriendAdded),
            "friend_request_sent" => Ok(Self::FriendRequestSent),
            "voice_call" => Ok(Self::VoiceCall),
            "video_call" => Ok(Self::VideoCall),
            "group_created" => Ok(Self::GroupCreated),
            "stream_started" => Ok(Self::StreamStarted),
            "room_created" => Ok(Self::RoomCreated),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl AnalyticsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageSent => "message_sent",
            Self::FriendAdded => "friend_added",
            Self::FriendRequestSent => "friend_request_sent",
            Self::VoiceCall => "voice_call",
            Self::VideoCall => "video_call",
            Self::GroupCreated => "group_created",
            Self::StreamStarted => "stream_started",
            Self::RoomCreated => "room_created",
        }
    }
}

// -- Views returned by the API --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub wallet_address: String,
    pub wallet_type: WalletType,
    pub chain: Option<String>,
    pub username: Option<String>,
    pub ens_name: Option<String>,
    pub login_count: i64,
    pub points: i64,
    pub referred_by: Option<String>,
    pub is_banned: bool,
    pub first_login: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConnectionView {
    pub provider: String,
    pub calendar_id: Option<String>,
    pub calendar_email: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub wallet_address: String,
    pub name: Option<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub wallet_address: String,
    pub username: Option<String>,
    pub ens_name: Option<String>,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantRoomView {
    pub id: Uuid,
    pub room_id: String,
    pub join_code: String,
    pub host_address: String,
    pub title: Option<String>,
    pub max_participants: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub id: Uuid,
    pub host_address: String,
    pub title: Option<String>,
    pub status: StreamStatus,
    pub viewer_count: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChatMessage {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_address: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendView {
    pub address: String,
    pub nickname: Option<String>,
    pub username: Option<String>,
    pub ens_name: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: Uuid,
    pub from_address: String,
    pub to_address: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub role: GroupRole,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInvitationView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    pub inviter_address: String,
    pub invitee_address: String,
    pub group_key: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInviteView {
    pub code: String,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub address: String,
    pub is_online: bool,
    pub status: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}
