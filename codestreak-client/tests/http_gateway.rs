use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use codestreak_client::{ClientConfig, FriendsController, GatewayError, HttpGateway, MutationOutcome, RemoteGateway};
use codestreak_common::{FriendEdge, FriendRequestId, User, UserId, Username, UsernamePayload};

type Log = Arc<Mutex<Vec<String>>>;

const TOKEN: &str = "secret-token";

fn bob() -> User {
    User { id: UserId(2), username: Username("bob".into()), current_streak: 3, total_xp: 90 }
}

fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Not authenticated" })))),
    }
}

async fn friends(headers: HeaderMap, Extension(log): Extension<Log>) -> Result<Json<Vec<FriendEdge>>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    assert!(headers.contains_key("x-request-id"));
    log.lock().unwrap().push("GET /friends".into());
    Ok(Json(vec![FriendEdge { peer: bob() }]))
}

async fn empty_list(headers: HeaderMap) -> Result<Json<Vec<Value>>, (StatusCode, Json<Value>)> {
    authorized(&headers)?;
    Ok(Json(Vec::new()))
}

async fn send_request(Extension(log): Extension<Log>, Json(payload): Json<UsernamePayload>) -> StatusCode {
    log.lock().unwrap().push(format!("POST /friends/requests {}", payload.username));
    StatusCode::CREATED
}

async fn accept_request(Extension(log): Extension<Log>, Path(id): Path<u64>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    log.lock().unwrap().push(format!("POST /friends/requests/{id}/accept"));
    if id == 7 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::GONE, Json(json!({ "detail": "expired" }))))
    }
}

async fn remove_friend(Extension(log): Extension<Log>, Path(username): Path<String>) -> StatusCode {
    log.lock().unwrap().push(format!("DELETE /friends/{username}"));
    StatusCode::NO_CONTENT
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Vec<User>> {
    let mut found = bob();
    found.username = Username(params.get("q").cloned().unwrap_or_default());
    found.total_xp = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or_default();
    Json(vec![found])
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn serve() -> (SocketAddr, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/friends", get(friends))
        .route("/api/friends/requests", post(send_request))
        .route("/api/friends/requests/received", get(empty_list))
        .route("/api/friends/requests/sent", get(empty_list))
        .route("/api/friends/requests/:id/accept", post(accept_request))
        .route("/api/friends/:username", delete(remove_friend))
        .route("/api/streaks", get(broken))
        .route("/api/streaks/requests/received", get(empty_list))
        .route("/api/streaks/requests/sent", get(empty_list))
        .route("/api/users/search", get(search))
        .layer(Extension(log.clone()));
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service()).await.unwrap();
    });
    (addr, log)
}

fn gateway(addr: SocketAddr, token: Option<&str>) -> HttpGateway {
    let config = ClientConfig {
        api_url: format!("http://{addr}/api"),
        token: token.map(str::to_string),
        request_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    };
    HttpGateway::new(&config).unwrap()
}

#[tokio::test]
async fn reads_are_authorized_and_decoded() {
    let (addr, log) = serve().await;
    let friends = gateway(addr, Some(TOKEN)).get_friends().await.unwrap();
    assert_eq!(friends, vec![FriendEdge { peer: bob() }]);
    assert_eq!(*log.lock().unwrap(), vec!["GET /friends".to_string()]);
}

#[tokio::test]
async fn server_error_text_is_kept() {
    let (addr, _log) = serve().await;
    let err = gateway(addr, None).get_friends().await.unwrap_err();
    assert_eq!(err, GatewayError::server(401, "Not authenticated"));

    let err = gateway(addr, Some(TOKEN)).get_friend_streaks().await.unwrap_err();
    assert_eq!(err, GatewayError::server(500, "upstream exploded"));
}

#[tokio::test]
async fn mutations_hit_the_expected_routes() {
    let (addr, log) = serve().await;
    let gateway = gateway(addr, Some(TOKEN));
    let bob = Username("bob".into());
    gateway.send_friend_request(&bob).await.unwrap();
    gateway.accept_friend_request(FriendRequestId(7)).await.unwrap();
    gateway.remove_friend(&bob).await.unwrap();
    assert_eq!(
        gateway.accept_friend_request(FriendRequestId(8)).await,
        Err(GatewayError::server(410, "expired")),
    );
    assert_eq!(*log.lock().unwrap(), vec![
        "POST /friends/requests bob".to_string(),
        "POST /friends/requests/7/accept".to_string(),
        "DELETE /friends/bob".to_string(),
        "POST /friends/requests/8/accept".to_string(),
    ]);
}

#[tokio::test]
async fn search_sends_query_and_limit() {
    let (addr, _log) = serve().await;
    let users = gateway(addr, Some(TOKEN)).search_users("ali ce", 5).await.unwrap();
    assert_eq!(users[0].username.as_str(), "ali ce");
    assert_eq!(users[0].total_xp, 5);
}

#[tokio::test]
async fn unreachable_servers_are_transport_errors() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = gateway(addr, Some(TOKEN)).get_friends().await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn controller_degrades_the_failing_streak_slot() {
    let (addr, _log) = serve().await;
    let gateway: Arc<dyn RemoteGateway> = Arc::new(gateway(addr, Some(TOKEN)));
    let friends = FriendsController::new(gateway, None, &ClientConfig::default());
    friends.load_all().await;

    let state = friends.store().current();
    assert_eq!(state.error, None);
    assert_eq!(state.friends.len(), 1);
    assert!(state.friend_streaks.is_empty());

    let outcome = friends.remove_friend("bob").await;
    assert_eq!(outcome, MutationOutcome::Committed);
    assert_eq!(friends.store().current().action_message.as_deref(), Some("Removed bob from your friends"));
}
