// HTTP interaction API: the gateway host forwards parsed commands and events here.

pub mod rpg;

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    extract::{Json, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Notify;

use crate::config::Config;
use crate::cooldown::{CooldownCommand, Cooldowns};
use crate::db::Database;
use crate::embed::{Embed, Reply};
use crate::error::BotError;
use crate::locks::CharacterLocks;
use crate::metrics;
use crate::prefix::{validate_prefix, PrefixCache};
use crate::util::time_to_readable;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PrefixQuery {
    pub guild_id: Option<String>,
}

#[derive(Deserialize)]
pub struct PrefixCommandRequest {
    pub guild_id: Option<String>,
    pub user_id: i64,
    /// Whether the invoking member has the Manage Server permission.
    #[serde(default)]
    pub manage_guild: bool,
    pub prefix: Option<String>,
}

#[derive(Deserialize)]
pub struct GuildJoinRequest {
    pub guild_id: String,
    /// Guild count including the guild just joined.
    pub guild_count: usize,
}

#[derive(Deserialize)]
pub struct AdminRequest {
    pub user_id: i64,
    /// Answer to the "are you sure" prompt.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct MessageDeleteEvent {
    pub author_id: i64,
    #[serde(default)]
    pub author_is_bot: bool,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub prefixes: PrefixCache,
    pub cooldowns: Cooldowns,
    pub locks: CharacterLocks,
    pub launched_at: DateTime<Utc>,
    pub ready_at: Arc<OnceLock<DateTime<Utc>>>,
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        let prefixes = PrefixCache::new(db.clone(), config.prefix.clone());
        Self {
            db,
            config: Arc::new(config),
            prefixes,
            cooldowns: Cooldowns::new(),
            locks: CharacterLocks::with_gauge(metrics::CHARACTER_LOCKS_ACTIVE.clone()),
            launched_at: Utc::now(),
            ready_at: Arc::new(OnceLock::new()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Resolves once the bot owner has asked the process to stop.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }

    /// Record the moment the bot started serving commands.
    pub fn mark_ready(&self) {
        let _ = self.ready_at.set(Utc::now());
    }

    /// Embed carrying the invoking user as author and the bot name as footer.
    pub fn default_embed(&self, author: Option<&str>) -> Embed {
        let embed = Embed::new().footer(self.config.bot_name.clone());
        match author {
            Some(name) => embed.author(name),
            None => embed,
        }
    }

    /// Record a use of a cooldown command, mapping a refusal to a reply error.
    pub async fn check_cooldown(
        &self,
        user_id: i64,
        command: CooldownCommand,
        guild_id: Option<&str>,
    ) -> Result<(), BotError> {
        match self.cooldowns.check(user_id, command) {
            Ok(()) => Ok(()),
            Err(e) => Err(BotError::OnCooldown {
                prefix: self.prefixes.get(guild_id).await?,
                command: e.command.qualified_name(),
                retry_after: e.retry_after,
            }),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    metrics::register_metrics();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Utility commands
        .route("/api/ping", get(ping))
        .route("/api/uptime", get(uptime))
        .route("/api/about", get(about))
        // Guild configuration
        .route("/api/prefixes", get(resolve_prefixes))
        .route("/api/commands/prefix", post(prefix_command))
        .route("/api/guilds/join", post(guild_join))
        // Owner only
        .route("/api/admin", post(admin))
        .route("/api/admin/restart", post(admin_restart))
        // Events
        .route("/api/events/message-delete", post(message_deleted))
        // RPG
        .route("/api/characters", post(rpg::setup_character))
        .route(
            "/api/characters/{owner_id}",
            get(rpg::character_status).delete(rpg::delete_character),
        )
        .route("/api/characters/{owner_id}/xp", post(rpg::grant_xp))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = Instant::now();
    let response = next.run(req).await;
    metrics::REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    response
}

// ── Utility handlers ──────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "poddo-bot" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn ping() -> impl IntoResponse {
    metrics::COMMANDS_TOTAL.with_label_values(&["ping"]).inc();
    Json(Reply::text("Pong!"))
}

async fn uptime(State(state): State<AppState>) -> impl IntoResponse {
    metrics::COMMANDS_TOTAL.with_label_values(&["uptime"]).inc();
    let now = Utc::now();
    let mut embed = state
        .default_embed(None)
        .title(format!("{} Uptime", state.config.bot_name))
        .field("Bot Uptime", time_to_readable(now - state.launched_at));
    if let Some(ready_at) = state.ready_at.get() {
        embed = embed.field("Ready Uptime", time_to_readable(now - *ready_at));
    }
    Json(Reply::embed(embed))
}

async fn about(State(state): State<AppState>) -> impl IntoResponse {
    metrics::COMMANDS_TOTAL.with_label_values(&["about"]).inc();
    let config = &state.config;
    let embed = state
        .default_embed(None)
        .title(config.bot_name.clone())
        .description(config.status.clone())
        .field("Version", config.version.clone())
        .field("Environment", config.environment.clone());
    Json(Reply::embed(embed))
}

// ── Guild handlers ────────────────────────────────────────────────────

async fn resolve_prefixes(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> Result<impl IntoResponse, BotError> {
    let prefixes = state
        .prefixes
        .command_prefixes(state.config.bot_user_id, query.guild_id.as_deref())
        .await?;
    Ok(Json(json!({ "prefixes": prefixes })))
}

/// Show or change the guild prefix. Guild only; Manage Server or bot owner.
async fn prefix_command(
    State(state): State<AppState>,
    Json(req): Json<PrefixCommandRequest>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["prefix"]).inc();

    let guild_id = req.guild_id.as_deref().ok_or(BotError::GuildOnly("prefix"))?;
    if !req.manage_guild && req.user_id != state.config.dev_id {
        return Err(BotError::PermissionDenied(
            "You are not allowed to run this command.".to_string(),
        ));
    }

    let Some(new_prefix) = req.prefix else {
        let current = state.prefixes.get(Some(guild_id)).await?;
        return Ok(Json(Reply::text(format!(
            "No prefix specified to Change. Current Prefix: `{current}`"
        ))));
    };

    validate_prefix(&new_prefix).map_err(BotError::InvalidArgument)?;
    state
        .check_cooldown(req.user_id, CooldownCommand::Prefix, Some(guild_id))
        .await?;
    state.prefixes.set(guild_id, &new_prefix).await?;
    Ok(Json(Reply::text(format!(
        "Guild prefix updated to `{new_prefix}`"
    ))))
}

async fn guild_join(
    State(state): State<AppState>,
    Json(req): Json<GuildJoinRequest>,
) -> impl IntoResponse {
    if req.guild_count > state.config.guild_limit {
        tracing::warn!(
            "Leaving guild {} (guild count {} over limit {})",
            req.guild_id,
            req.guild_count,
            state.config.guild_limit
        );
        return Json(json!({
            "leave": true,
            "notice": "Until I am verified, I cannot join any more servers. \
                       Please contact my developer if you see this message.",
        }));
    }
    tracing::info!("Joined guild {}", req.guild_id);
    Json(json!({ "leave": false }))
}

// ── Owner handlers ────────────────────────────────────────────────────

fn require_owner(state: &AppState, user_id: i64) -> Result<(), BotError> {
    if user_id != state.config.dev_id {
        return Err(BotError::PermissionDenied(
            "This command is reserved for the bot owner.".to_string(),
        ));
    }
    Ok(())
}

async fn admin(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["admin"]).inc();
    require_owner(&state, req.user_id)?;
    Ok(Json(Reply::text("nope.")))
}

/// `admin restart`: stop serving so the supervisor can start a fresh process.
async fn admin_restart(
    State(state): State<AppState>,
    Json(req): Json<AdminRequest>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["admin restart"]).inc();
    require_owner(&state, req.user_id)?;

    if !req.confirm {
        return Ok(Json(Reply::text("Shutdown cancelled.")));
    }
    tracing::warn!("Shutdown requested by owner {}", req.user_id);
    state.shutdown.notify_one();
    Ok(Json(Reply::text("Shutting down...")))
}

// ── Event handlers ────────────────────────────────────────────────────

async fn message_deleted(
    State(state): State<AppState>,
    Json(event): Json<MessageDeleteEvent>,
) -> Result<Response, BotError> {
    if event.author_is_bot {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let logged = state
        .db
        .log_deleted_message(&event.created_at.to_rfc3339(), &event.content, event.author_id)
        .await?;
    metrics::DELETED_MESSAGES_LOGGED_TOTAL.inc();
    Ok((StatusCode::CREATED, Json(json!(logged))).into_response())
}
