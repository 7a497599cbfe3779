use async_trait::async_trait;
use codestreak_common::{
    Achievement, FriendEdge, FriendProfile, FriendRequestId, FriendStats, FriendStreak,
    RelationshipRequest, Solve, StreakRequest, StreakRequestId, User, Username,
};

use crate::error::GatewayError;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Typed access to the backend. The engine only ever talks to this trait.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn get_friends(&self) -> Result<Vec<FriendEdge>>;
    async fn get_received_friend_requests(&self) -> Result<Vec<RelationshipRequest>>;
    async fn get_sent_friend_requests(&self) -> Result<Vec<RelationshipRequest>>;
    async fn send_friend_request(&self, username: &Username) -> Result<()>;
    async fn accept_friend_request(&self, id: FriendRequestId) -> Result<()>;
    async fn reject_friend_request(&self, id: FriendRequestId) -> Result<()>;
    async fn cancel_friend_request(&self, id: FriendRequestId) -> Result<()>;
    async fn remove_friend(&self, username: &Username) -> Result<()>;

    async fn get_friend_streaks(&self) -> Result<Vec<FriendStreak>>;
    async fn get_received_streak_requests(&self) -> Result<Vec<StreakRequest>>;
    async fn get_sent_streak_requests(&self) -> Result<Vec<StreakRequest>>;
    async fn send_streak_request(&self, username: &Username) -> Result<()>;
    async fn accept_streak_request(&self, id: StreakRequestId) -> Result<()>;
    async fn reject_streak_request(&self, id: StreakRequestId) -> Result<()>;
    async fn cancel_streak_request(&self, id: StreakRequestId) -> Result<()>;
    async fn delete_friend_streak(&self, username: &Username) -> Result<()>;

    async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>>;
    async fn get_friend_profile(&self, username: &Username) -> Result<FriendProfile>;
    async fn get_friend_stats(&self, username: &Username) -> Result<FriendStats>;
    async fn get_friend_solves(&self, username: &Username, limit: u32) -> Result<Vec<Solve>>;
    async fn get_friend_achievements(&self, username: &Username) -> Result<Vec<Achievement>>;
}

pub mod http {
    use async_trait::async_trait;
    use reqwest::{Client, Method, RequestBuilder, Response, Url};
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use serde_json::Value;
    use tracing::debug;
    use codestreak_common::{
        Achievement, FriendEdge, FriendProfile, FriendRequestId, FriendStats, FriendStreak,
        RelationshipRequest, Solve, StreakRequest, StreakRequestId, User, Username, UsernamePayload,
    };

    use super::{RemoteGateway, Result};
    use crate::config::ClientConfig;
    use crate::error::GatewayError;

    const REQUEST_ID_HEADER: &str = "x-request-id";

    /// `RemoteGateway` over the JSON REST API.
    #[derive(Clone, Debug)]
    pub struct HttpGateway {
        client: Client,
        base: Url,
        token: Option<String>,
    }

    impl HttpGateway {
        pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
            let client = Client::builder().timeout(config.request_timeout).build()?;
            let base = Url::parse(&config.api_url)?;
            Ok(Self::with_client(client, base, config.token.clone()))
        }

        pub fn with_client(client: Client, base: Url, token: Option<String>) -> Self {
            Self { client, base, token }
        }

        fn endpoint(&self, segments: &[&str]) -> Result<Url> {
            let mut url = self.base.clone();
            url.path_segments_mut()
                .map_err(|_| GatewayError::Transport(format!("{} cannot be a base url", self.base)))?
                .pop_if_empty()
                .extend(segments);
            Ok(url)
        }

        fn request(&self, method: Method, url: Url) -> RequestBuilder {
            let request_id = uuid::Uuid::new_v4().to_string();
            debug!(%method, %url, %request_id, "gateway request");
            let builder = self.client.request(method, url).header(REQUEST_ID_HEADER, request_id);
            match &self.token {
                Some(token) => builder.bearer_auth(token),
                None => builder,
            }
        }

        async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T> {
            let url = self.endpoint(segments)?;
            let response = check(self.request(Method::GET, url).query(query).send().await?).await?;
            Ok(response.json::<T>().await?)
        }

        async fn post(&self, segments: &[&str], body: Option<&(impl Serialize + Sync)>) -> Result<()> {
            let url = self.endpoint(segments)?;
            let mut request = self.request(Method::POST, url);
            if let Some(body) = body {
                request = request.json(body);
            }
            check(request.send().await?).await?;
            Ok(())
        }

        async fn delete(&self, segments: &[&str]) -> Result<()> {
            let url = self.endpoint(segments)?;
            check(self.request(Method::DELETE, url).send().await?).await?;
            Ok(())
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Server { status: status.as_u16(), message: server_message(&body) })
    }

    /// Pulls the human readable part out of an error body.
    pub(crate) fn server_message(body: &str) -> Option<String> {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
            for field in ["detail", "message", "error"] {
                if let Some(Value::String(text)) = map.get(field) {
                    if !text.trim().is_empty() {
                        return Some(text.trim().to_string());
                    }
                }
            }
        }
        let body = body.trim();
        (!body.is_empty()).then(|| body.to_string())
    }

    const NO_BODY: Option<&()> = None;

    #[async_trait]
    impl RemoteGateway for HttpGateway {
        async fn get_friends(&self) -> Result<Vec<FriendEdge>> {
            self.get_json(&["friends"], &[]).await
        }
        async fn get_received_friend_requests(&self) -> Result<Vec<RelationshipRequest>> {
            self.get_json(&["friends", "requests", "received"], &[]).await
        }
        async fn get_sent_friend_requests(&self) -> Result<Vec<RelationshipRequest>> {
            self.get_json(&["friends", "requests", "sent"], &[]).await
        }
        async fn send_friend_request(&self, username: &Username) -> Result<()> {
            let payload = UsernamePayload { username: username.clone() };
            self.post(&["friends", "requests"], Some(&payload)).await
        }
        async fn accept_friend_request(&self, id: FriendRequestId) -> Result<()> {
            self.post(&["friends", "requests", &id.to_string(), "accept"], NO_BODY).await
        }
        async fn reject_friend_request(&self, id: FriendRequestId) -> Result<()> {
            self.post(&["friends", "requests", &id.to_string(), "reject"], NO_BODY).await
        }
        async fn cancel_friend_request(&self, id: FriendRequestId) -> Result<()> {
            self.delete(&["friends", "requests", &id.to_string()]).await
        }
        async fn remove_friend(&self, username: &Username) -> Result<()> {
            self.delete(&["friends", username.as_str()]).await
        }

        async fn get_friend_streaks(&self) -> Result<Vec<FriendStreak>> {
            self.get_json(&["streaks"], &[]).await
        }
        async fn get_received_streak_requests(&self) -> Result<Vec<StreakRequest>> {
            self.get_json(&["streaks", "requests", "received"], &[]).await
        }
        async fn get_sent_streak_requests(&self) -> Result<Vec<StreakRequest>> {
            self.get_json(&["streaks", "requests", "sent"], &[]).await
        }
        async fn send_streak_request(&self, username: &Username) -> Result<()> {
            let payload = UsernamePayload { username: username.clone() };
            self.post(&["streaks", "requests"], Some(&payload)).await
        }
        async fn accept_streak_request(&self, id: StreakRequestId) -> Result<()> {
            self.post(&["streaks", "requests", &id.to_string(), "accept"], NO_BODY).await
        }
        async fn reject_streak_request(&self, id: StreakRequestId) -> Result<()> {
            self.post(&["streaks", "requests", &id.to_string(), "reject"], NO_BODY).await
        }
        async fn cancel_streak_request(&self, id: StreakRequestId) -> Result<()> {
            self.delete(&["streaks", "requests", &id.to_string()]).await
        }
        async fn delete_friend_streak(&self, username: &Username) -> Result<()> {
            self.delete(&["streaks", username.as_str()]).await
        }

        async fn search_users(&self, query: &str, limit: u32) -> Result<Vec<User>> {
            self.get_json(&["users", "search"], &[("q", query.to_string()), ("limit", limit.to_string())]).await
        }
        async fn get_friend_profile(&self, username: &Username) -> Result<FriendProfile> {
            self.get_json(&["users", username.as_str(), "profile"], &[]).await
        }
        async fn get_friend_stats(&self, username: &Username) -> Result<FriendStats> {
            self.get_json(&["users", username.as_str(), "stats"], &[]).await
        }
        async fn get_friend_solves(&self, username: &Username, limit: u32) -> Result<Vec<Solve>> {
            self.get_json(&["users", username.as_str(), "solves"], &[("limit", limit.to_string())]).await
        }
        async fn get_friend_achievements(&self, username: &Username) -> Result<Vec<Achievement>> {
            self.get_json(&["users", username.as_str(), "achievements"], &[]).await
        }
    }

}
