// Integration tests driving the HTTP interaction API end to end:
// character lifecycle, experience grants, guild prefixes and events.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::time::timeout;
use tower::ServiceExt;

use poddo_bot::api::{self, AppState};
use poddo_bot::config::Config;
use poddo_bot::cooldown::CooldownCommand;
use poddo_bot::db::Database;

const OWNER: i64 = 175386962364989440;

async fn test_state() -> AppState {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let config = Config {
        bot_user_id: 4242,
        ..Config::default()
    };
    AppState::new(Arc::new(db), config)
}

async fn test_app() -> Router {
    api::router(test_state().await)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn setup(app: &Router, owner_id: i64, name: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/characters",
        Some(json!({ "owner_id": owner_id, "name": name })),
    )
    .await
}

async fn grant(app: &Router, owner_id: i64, delta: f64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/characters/{owner_id}/xp"),
        Some(json!({ "delta": delta })),
    )
    .await
}

// ── Utility ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_ping() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/api/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Pong!");
}

#[tokio::test]
async fn test_uptime_embed() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/uptime", None).await;
    assert_eq!(status, StatusCode::OK);
    let embed = &body["embed"];
    assert_eq!(embed["title"], "Poddo Uptime");
    assert_eq!(embed["fields"][0]["name"], "Bot Uptime");
    assert!(embed["fields"][0]["value"].as_str().unwrap().starts_with("0d, 0h"));
}

// ── Characters ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_character_setup_and_status() {
    let app = test_app().await;

    let (status, body) = setup(&app, 1, "Dr Turtle").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reply"]["embed"]["title"], "Character Created!");
    assert_eq!(body["character"]["level"], 1);

    let (status, body) = send(&app, Method::GET, "/api/characters/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["embed"]["title"], "Dr Turtle");
    assert_eq!(
        body["reply"]["embed"]["description"],
        "Level 1 | 0/800 (0.0%)"
    );
}

#[tokio::test]
async fn test_second_setup_is_rejected() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    let (status, body) = setup(&app, 1, "Other").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["embed"]["description"],
        "You already have a character!"
    );
}

#[tokio::test]
async fn test_setup_validates_name() {
    let app = test_app().await;

    let (status, body) = setup(&app, 1, "x_x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["embed"]["title"], "Invalid Argument!");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/characters",
        Some(json!({ "owner_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["embed"]["title"], "Missing Argument!");
}

#[tokio::test]
async fn test_missing_character_mentions_prefix() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/characters/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["embed"]["description"]
        .as_str()
        .unwrap()
        .contains("`=rpg setup`"));
}

// ── Experience ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_grant_xp_level_up_is_persisted() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    let (status, body) = grant(&app, 1, 700.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"], "none");

    let (status, body) = grant(&app, 1, 200.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"], "level_up");
    assert_eq!(body["character"]["level"], 2);
    assert_eq!(body["character"]["xp"], 100.0);
    assert_eq!(
        body["reply"]["embed"]["title"],
        "Level Up! Poddo reached level 2"
    );

    let (_, body) = send(&app, Method::GET, "/api/characters/1", None).await;
    assert_eq!(body["character"]["level"], 2);
    assert_eq!(
        body["reply"]["embed"]["description"],
        "Level 2 | 100/1800 (5.6%)"
    );
}

#[tokio::test]
async fn test_grant_xp_cascades_and_floors() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    let (_, body) = grant(&app, 1, 800.0 + 1800.0 + 5.0).await;
    assert_eq!(body["transition"], "level_up");
    assert_eq!(body["character"]["level"], 3);
    assert_eq!(body["character"]["xp"], 5.0);

    let (_, body) = grant(&app, 1, -1_000_000.0).await;
    assert_eq!(body["transition"], "level_down");
    assert_eq!(body["character"]["level"], 1);
    assert_eq!(body["character"]["xp"], 0.0);

    // Already at the floor: clamping alone is not a level change.
    let (_, body) = grant(&app, 1, -50.0).await;
    assert_eq!(body["transition"], "none");
}

#[tokio::test]
async fn test_grant_xp_without_character() {
    let app = test_app().await;
    let (status, _) = grant(&app, 5, 10.0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_grants_are_not_lost() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move { grant(&app, 1, 10.0).await }));
    }
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, Method::GET, "/api/characters/1", None).await;
    assert_eq!(body["character"]["xp"], 200.0);
}

#[tokio::test]
async fn test_grant_xp_cooldown() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    for _ in 0..30 {
        let (status, _) = grant(&app, 1, 1.0).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = grant(&app, 1, 1.0).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["embed"]["title"], "Command on Cooldown!");
    assert!(body["embed"]["description"]
        .as_str()
        .unwrap()
        .starts_with("`=rpg xp` is on cooldown for"));
}

#[tokio::test]
async fn test_rejected_delta_does_not_spend_cooldown() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    for _ in 0..31 {
        let (status, body) = grant(&app, 1, 1e300).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["embed"]["title"], "Invalid Argument!");
    }
    let (status, body) = grant(&app, 1, 5.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["character"]["xp"], 5.0);
}

#[tokio::test]
async fn test_corrupt_level_is_an_internal_error() {
    let state = test_state().await;
    let app = api::router(state.clone());
    setup(&app, 1, "Poddo").await;

    let mut character = state.db.load_character(1).await.unwrap().unwrap();
    character.progress.level = 0;
    state.db.save_character(&character).await.unwrap();

    let (status, body) = grant(&app, 1, 5.0).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["embed"]["title"], "Unknown Error!");
    assert_eq!(state.cooldowns.uses(1, CooldownCommand::RpgXp), 0);
    assert_eq!(state.locks.active(), 0);
}

#[tokio::test]
async fn test_delete_character() {
    let app = test_app().await;
    setup(&app, 1, "Poddo").await;

    let (status, _) = send(&app, Method::DELETE, "/api/characters/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, "/api/characters/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Guild prefixes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_prefix_command_requires_guild() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/commands/prefix",
        Some(json!({ "user_id": OWNER, "prefix": "!" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["embed"]["title"], "Guild Only!");
}

#[tokio::test]
async fn test_prefix_command_requires_permission() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/commands/prefix",
        Some(json!({ "guild_id": "10", "user_id": 5, "prefix": "!" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["embed"]["title"], "Permission Error!");
}

#[tokio::test]
async fn test_prefix_show_and_change() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/commands/prefix",
        Some(json!({ "guild_id": "10", "user_id": 5, "manage_guild": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["content"],
        "No prefix specified to Change. Current Prefix: `=`"
    );

    // The bot owner passes without Manage Server.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/commands/prefix",
        Some(json!({ "guild_id": "10", "user_id": OWNER, "prefix": "!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Guild prefix updated to `!`");

    let (_, body) = send(&app, Method::GET, "/api/prefixes?guild_id=10", None).await;
    assert_eq!(body["prefixes"], json!(["<@4242> ", "<@!4242> ", "!"]));

    let (_, body) = send(&app, Method::GET, "/api/prefixes", None).await;
    assert_eq!(body["prefixes"][2], "=");

    // Error replies now quote the guild prefix.
    let (_, body) = send(&app, Method::GET, "/api/characters/1?guild_id=10", None).await;
    assert!(body["embed"]["description"]
        .as_str()
        .unwrap()
        .contains("`!rpg setup`"));
}

#[tokio::test]
async fn test_prefix_rejects_whitespace() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/commands/prefix",
        Some(json!({ "guild_id": "10", "user_id": OWNER, "prefix": "a b" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Owner commands ───────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_is_owner_only() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::POST, "/api/admin", Some(json!({ "user_id": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["embed"]["title"], "Permission Error!");

    let (status, body) =
        send(&app, Method::POST, "/api/admin", Some(json!({ "user_id": OWNER }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "nope.");
}

#[tokio::test]
async fn test_admin_restart_needs_confirmation() {
    let state = test_state().await;
    let app = api::router(state.clone());
    let wait = Duration::from_millis(50);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/restart",
        Some(json!({ "user_id": 1, "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/restart",
        Some(json!({ "user_id": OWNER })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Shutdown cancelled.");
    assert!(timeout(wait, state.shutdown_requested()).await.is_err());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/restart",
        Some(json!({ "user_id": OWNER, "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(timeout(wait, state.shutdown_requested()).await.is_ok());
}

// ── Events ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_guild_join_limit() {
    let app = test_app().await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/guilds/join",
        Some(json!({ "guild_id": "1", "guild_count": 90 })),
    )
    .await;
    assert_eq!(body["leave"], false);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/guilds/join",
        Some(json!({ "guild_id": "2", "guild_count": 91 })),
    )
    .await;
    assert_eq!(body["leave"], true);
    assert!(body["notice"]
        .as_str()
        .unwrap()
        .starts_with("Until I am verified"));
}

#[tokio::test]
async fn test_message_delete_logging_skips_bots() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events/message-delete",
        Some(json!({
            "author_id": 3,
            "content": "secret",
            "created_at": "2024-05-01T12:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "secret");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/events/message-delete",
        Some(json!({
            "author_id": 4,
            "author_is_bot": true,
            "content": "beep",
            "created_at": "2024-05-01T12:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app().await;
    send(&app, Method::GET, "/api/ping", None).await;

    let response = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("poddo_commands_total"));
}
