// Command error taxonomy and its rendering as an error reply.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::embed::{Embed, Reply};
use crate::metrics;
use crate::progression::ProgressionError;
use crate::util::duration_in_words;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0} is a required argument that is missing.")]
    MissingArgument(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0} can not be used in Private Messages.")]
    GuildOnly(&'static str),

    #[error("`{prefix}{command}` is on cooldown for {}", cooldown_words(.retry_after))]
    OnCooldown {
        prefix: String,
        command: &'static str,
        retry_after: u64,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored state the bot itself should never have produced.
    #[error("internal error: {0}")]
    Internal(String),
}

fn cooldown_words(retry_after: &u64) -> String {
    duration_in_words(*retry_after)
}

impl From<ProgressionError> for BotError {
    fn from(e: ProgressionError) -> Self {
        match e {
            ProgressionError::InvalidLevel(_) => BotError::Internal(e.to_string()),
            ProgressionError::NonFiniteDelta | ProgressionError::DeltaOutOfRange(_) => {
                BotError::InvalidArgument(e.to_string())
            }
        }
    }
}

impl BotError {
    /// Short category label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::InvalidArgument(_) => "invalid_argument",
            BotError::MissingArgument(_) => "missing_argument",
            BotError::NotFound(_) => "not_found",
            BotError::AlreadyExists(_) => "already_exists",
            BotError::PermissionDenied(_) => "permission_denied",
            BotError::GuildOnly(_) => "guild_only",
            BotError::OnCooldown { .. } => "cooldown",
            BotError::Database(_) => "database",
            BotError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BotError::InvalidArgument(_) | BotError::MissingArgument(_) => StatusCode::BAD_REQUEST,
            BotError::NotFound(_) => StatusCode::NOT_FOUND,
            BotError::AlreadyExists(_) => StatusCode::CONFLICT,
            BotError::PermissionDenied(_) | BotError::GuildOnly(_) => StatusCode::FORBIDDEN,
            BotError::OnCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
            BotError::Database(_) | BotError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error reply shown to the user.
    pub fn reply(&self) -> Reply {
        let embed = Embed::error();
        let embed = match self {
            BotError::InvalidArgument(msg) => embed
                .title("Invalid Argument!")
                .description(format!("Error: {msg}")),
            BotError::MissingArgument(_) => embed
                .title("Missing Argument!")
                .description(format!("Error: {self}")),
            BotError::NotFound(msg) => embed.title("Not Found!").description(msg.clone()),
            BotError::AlreadyExists(msg) => embed.title("Already Exists!").description(msg.clone()),
            BotError::PermissionDenied(msg) => embed
                .title("Permission Error!")
                .description(format!("Error: {msg}")),
            BotError::GuildOnly(_) => embed.title("Guild Only!").description(self.to_string()),
            BotError::OnCooldown { .. } => embed
                .title("Command on Cooldown!")
                .description(self.to_string()),
            BotError::Database(_) | BotError::Internal(_) => embed
                .title("Unknown Error!")
                .description(
                    "An unknown error has occurred! A notification has been sent to the bot developer.",
                ),
        };
        Reply::embed(embed)
    }
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        match &self {
            BotError::Database(e) => tracing::error!("Database error: {e}"),
            BotError::Internal(msg) => tracing::error!("Internal error: {msg}"),
            other => tracing::debug!("Command rejected: {other}"),
        }
        metrics::COMMAND_ERRORS_TOTAL
            .with_label_values(&[self.kind()])
            .inc();
        (self.status(), Json(self.reply())).into_response()
    }
}
