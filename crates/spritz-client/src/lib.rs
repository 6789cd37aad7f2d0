//! Async client for the Spritz HTTP API.
//!
//! [`SpritzClient`] maps one method to each endpoint. The background helpers
//! in [`presence`] and [`invitations`] keep a wallet's presence fresh and
//! watch for group invitations; [`cache`] keeps small responses on disk
//! between runs.

pub mod cache;
pub mod error;
pub mod invitations;
pub mod presence;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use spritz_types::api::*;
use spritz_types::models::{AnalyticsEvent, UserProfile};

pub use error::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct SpritzClient {
    http: Client,
    /// Server origin, without the `/api` prefix.
    base_url: String,
    session_token: Option<String>,
}

impl SpritzClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach a session token (from [`Self::siws_verify`]) to later requests.
    pub fn set_session_token(&mut self, token: Option<String>) {
        self.session_token = token;
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        debug!("API error {}: {}", status, message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        self.send(self.request(Method::DELETE, path).query(query)).await
    }

    // -- Auth --

    pub async fn login(&self, req: &LoginRequest) -> ClientResult<LoginResponse> {
        self.post("/auth/login", req).await
    }

    pub async fn siws_nonce(&self, address: &str) -> ClientResult<SiwsNonceResponse> {
        self.get("/auth/solana/nonce", &[("address", address)]).await
    }

    /// Verify a signed SIWS message. On success the returned session token is
    /// also stored on the client.
    pub async fn siws_verify(&mut self, address: &str, message: &str, signature: &str) -> ClientResult<UserProfile> {
        let req = SiwsVerifyRequest {
            address: Some(address.to_string()),
            message: Some(message.to_string()),
            signature: Some(signature.to_string()),
        };
        let resp: SiwsVerifyResponse = self.post("/auth/solana/verify", &req).await?;
        self.session_token = Some(resp.token);
        Ok(resp.user)
    }

    pub async fn session(&self) -> ClientResult<SessionResponse> {
        self.get("/auth/session", &[]).await
    }

    // -- Analytics --

    pub async fn track(&self, wallet: &str, event: AnalyticsEvent, duration_minutes: Option<i64>) -> ClientResult<()> {
        let req = TrackEventRequest {
            wallet_address: Some(wallet.to_string()),
            event_type: Some(event.as_str().to_string()),
            duration_minutes,
        };
        let _: SuccessResponse = self.post("/analytics/track", &req).await?;
        Ok(())
    }

    pub async fn leaderboard(&self, limit: Option<u32>, user_address: Option<&str>) -> ClientResult<LeaderboardResponse> {
        let limit = limit.map(|l| l.to_string());
        let mut query = Vec::new();
        if let Some(limit) = &limit {
            query.push(("limit", limit.as_str()));
        }
        if let Some(addr) = user_address {
            query.push(("userAddress", addr));
        }
        self.get("/leaderboard", &query).await
    }

    // -- Calendar --

    pub async fn calendar_connect_url(&self, user_address: &str) -> ClientResult<String> {
        let resp: CalendarConnectResponse = self
            .get("/calendar/connect", &[("userAddress", user_address)])
            .await?;
        Ok(resp.auth_url)
    }

    pub async fn calendar_status(&self, user_address: &str) -> ClientResult<CalendarStatusResponse> {
        self.get("/calendar/status", &[("userAddress", user_address)]).await
    }

    pub async fn calendar_disconnect(&self, user_address: &str) -> ClientResult<()> {
        let body = AddressBody {
            user_address: Some(user_address.to_string()),
        };
        let _: SuccessResponse = self.post("/calendar/disconnect", &body).await?;
        Ok(())
    }

    pub async fn availability(&self, user_address: &str) -> ClientResult<AvailabilityListResponse> {
        self.get("/calendar/availability", &[("userAddress", user_address)]).await
    }

    pub async fn create_availability(&self, req: &AvailabilityRequest) -> ClientResult<AvailabilityResponse> {
        self.post("/calendar/availability", req).await
    }

    pub async fn update_availability(&self, id: &str, req: &AvailabilityRequest) -> ClientResult<AvailabilityResponse> {
        let path = format!("/calendar/availability/{}", id);
        self.send(self.request(Method::PUT, &path).json(req)).await
    }

    pub async fn delete_availability(&self, id: &str, user_address: &str) -> ClientResult<()> {
        let path = format!("/calendar/availability/{}", id);
        let _: SuccessResponse = self.delete(&path, &[("userAddress", user_address)]).await?;
        Ok(())
    }

    /// Bookable slots on `date` (`YYYY-MM-DD`), in the viewer's UTC offset.
    pub async fn slots(
        &self,
        user_address: &str,
        date: &str,
        duration_minutes: u32,
        utc_offset_minutes: i32,
    ) -> ClientResult<SlotsResponse> {
        let duration = duration_minutes.to_string();
        let offset = utc_offset_minutes.to_string();
        self.get(
            "/calendar/slots",
            &[
                ("userAddress", user_address),
                ("date", date),
                ("durationMinutes", duration.as_str()),
                ("utcOffsetMinutes", offset.as_str()),
            ],
        )
        .await
    }

    // -- Rooms --

    pub async fn room_token(&self, req: &RoomTokenRequest) -> ClientResult<RoomTokenResponse> {
        self.post("/rooms/token", req).await
    }

    pub async fn create_instant_room(&self, req: &CreateInstantRoomRequest) -> ClientResult<InstantRoomResponse> {
        self.post("/rooms/instant", req).await
    }

    pub async fn instant_room(&self, code: &str) -> ClientResult<InstantRoomResponse> {
        self.get(&format!("/rooms/instant/{}", code), &[]).await
    }

    pub async fn instant_room_token(
        &self,
        code: &str,
        display_name: Option<&str>,
        user_address: Option<&str>,
    ) -> ClientResult<RoomTokenResponse> {
        let req = JoinRoomRequest {
            display_name: display_name.map(str::to_string),
            user_address: user_address.map(str::to_string),
        };
        self.post(&format!("/rooms/instant/{}/token", code), &req).await
    }

    pub async fn end_instant_room(&self, code: &str, host_address: &str) -> ClientResult<()> {
        let path = format!("/rooms/instant/{}", code);
        let _: SuccessResponse = self.delete(&path, &[("hostAddress", host_address)]).await?;
        Ok(())
    }

    // -- Streams --

    pub async fn create_stream(&self, host_address: &str, title: Option<&str>) -> ClientResult<StreamResponse> {
        let req = CreateStreamRequest {
            host_address: Some(host_address.to_string()),
            title: title.map(str::to_string),
        };
        self.post("/streams", &req).await
    }

    pub async fn live_streams(&self) -> ClientResult<StreamListResponse> {
        self.get("/streams", &[]).await
    }

    pub async fn stream(&self, id: &str) -> ClientResult<StreamResponse> {
        self.get(&format!("/streams/{}", id), &[]).await
    }

    pub async fn end_stream(&self, id: &str, host_address: &str) -> ClientResult<StreamResponse> {
        let body = HostBody {
            host_address: Some(host_address.to_string()),
        };
        self.post(&format!("/streams/{}/end", id), &body).await
    }

    pub async fn stream_chat(&self, id: &str, limit: Option<u32>) -> ClientResult<ChatListResponse> {
        let limit = limit.map(|l| l.to_string());
        let query: Vec<(&str, &str)> = limit.iter().map(|l| ("limit", l.as_str())).collect();
        self.get(&format!("/streams/{}/chat", id), &query).await
    }

    pub async fn send_stream_chat(&self, id: &str, user_address: &str, message: &str) -> ClientResult<ChatMessageResponse> {
        let req = SendChatRequest {
            user_address: Some(user_address.to_string()),
            message: Some(message.to_string()),
        };
        self.post(&format!("/streams/{}/chat", id), &req).await
    }

    pub async fn join_stream(&self, id: &str) -> ClientResult<i64> {
        let resp: ViewerCountResponse = self
            .send(self.request(Method::POST, &format!("/streams/{}/viewers", id)))
            .await?;
        Ok(resp.viewer_count)
    }

    pub async fn leave_stream(&self, id: &str) -> ClientResult<i64> {
        let resp: ViewerCountResponse = self.delete(&format!("/streams/{}/viewers", id), &[]).await?;
        Ok(resp.viewer_count)
    }

    // -- Friends --

    pub async fn friends(&self, user_address: &str) -> ClientResult<FriendListResponse> {
        self.get("/friends", &[("userAddress", user_address)]).await
    }

    pub async fn friend_requests(&self, user_address: &str) -> ClientResult<FriendRequestsResponse> {
        self.get("/friends/requests", &[("userAddress", user_address)]).await
    }

    pub async fn send_friend_request(&self, from: &str, to: &str) -> ClientResult<FriendRequestResponse> {
        let req = FriendRequestBody {
            from_address: Some(from.to_string()),
            to_address: Some(to.to_string()),
        };
        self.post("/friends/requests", &req).await
    }

    pub async fn accept_friend_request(&self, id: &str, user_address: &str) -> ClientResult<()> {
        self.answer(&format!("/friends/requests/{}/accept", id), user_address).await
    }

    pub async fn reject_friend_request(&self, id: &str, user_address: &str) -> ClientResult<()> {
        self.answer(&format!("/friends/requests/{}/reject", id), user_address).await
    }

    pub async fn cancel_friend_request(&self, id: &str, user_address: &str) -> ClientResult<()> {
        let path = format!("/friends/requests/{}", id);
        let _: SuccessResponse = self.delete(&path, &[("userAddress", user_address)]).await?;
        Ok(())
    }

    pub async fn remove_friend(&self, user_address: &str, friend_address: &str) -> ClientResult<()> {
        let path = format!("/friends/{}", friend_address);
        let _: SuccessResponse = self.delete(&path, &[("userAddress", user_address)]).await?;
        Ok(())
    }

    async fn answer(&self, path: &str, user_address: &str) -> ClientResult<()> {
        let body = AddressBody {
            user_address: Some(user_address.to_string()),
        };
        let _: SuccessResponse = self.post(path, &body).await?;
        Ok(())
    }

    // -- Groups --

    pub async fn create_group(&self, req: &CreateGroupRequest) -> ClientResult<CreateGroupResponse> {
        self.post("/groups", req).await
    }

    pub async fn groups(&self, user_address: &str) -> ClientResult<GroupListResponse> {
        self.get("/groups", &[("userAddress", user_address)]).await
    }

    pub async fn group_invitations(&self, user_address: &str) -> ClientResult<InvitationListResponse> {
        self.get("/groups/invitations", &[("userAddress", user_address)]).await
    }

    pub async fn accept_group_invitation(&self, id: &str, user_address: &str) -> ClientResult<AcceptInvitationResponse> {
        let body = AddressBody {
            user_address: Some(user_address.to_string()),
        };
        self.post(&format!("/groups/invitations/{}/accept", id), &body).await
    }

    pub async fn decline_group_invitation(&self, id: &str, user_address: &str) -> ClientResult<()> {
        self.answer(&format!("/groups/invitations/{}/decline", id), user_address).await
    }

    // -- Invites --

    pub async fn invites(&self, user_address: &str) -> ClientResult<UserInvitesResponse> {
        self.get("/invites", &[("userAddress", user_address)]).await
    }

    pub async fn check_invite(&self, code: &str) -> ClientResult<InviteCheckResponse> {
        self.get(&format!("/invites/{}", code), &[]).await
    }

    // -- Presence --

    pub async fn heartbeat(&self, user_address: &str, status: Option<&str>) -> ClientResult<()> {
        let req = HeartbeatRequest {
            user_address: Some(user_address.to_string()),
            status: status.map(str::to_string),
        };
        let _: SuccessResponse = self.post("/presence/heartbeat", &req).await?;
        Ok(())
    }

    pub async fn presence(&self, addresses: &[&str]) -> ClientResult<PresenceResponse> {
        let joined = addresses.join(",");
        self.get("/presence", &[("addresses", joined.as_str())]).await
    }

    // -- Push --

    pub async fn push_subscribe(&self, user_address: &str, endpoint: &str, keys: PushKeys) -> ClientResult<()> {
        let req = PushSubscribeRequest {
            user_address: Some(user_address.to_string()),
            endpoint: Some(endpoint.to_string()),
            keys: Some(keys),
        };
        let _: SuccessResponse = self.post("/push/subscribe", &req).await?;
        Ok(())
    }

    pub async fn push_unsubscribe(&self, user_address: &str, endpoint: &str) -> ClientResult<()> {
        let req = PushUnsubscribeRequest {
            user_address: Some(user_address.to_string()),
            endpoint: Some(endpoint.to_string()),
        };
        let _: SuccessResponse = self.post("/push/unsubscribe", &req).await?;
        Ok(())
    }

    pub async fn push_status(&self, user_address: &str) -> ClientResult<bool> {
        let resp: PushStatusResponse = self.get("/push/status", &[("userAddress", user_address)]).await?;
        Ok(resp.subscribed)
    }

    // -- Health --

    pub async fn health(&self) -> ClientResult<serde_json::Value> {
        self.get("/health", &[]).await
    }
}
