// RPG command handlers: character setup, status, experience grants, retirement.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::character::{validate_name, Character};
use crate::cooldown::CooldownCommand;
use crate::embed::{Embed, Reply};
use crate::error::BotError;
use crate::metrics;
use crate::progression::{Transition, Xp};

#[derive(Deserialize)]
pub struct CommandContext {
    pub guild_id: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SetupRequest {
    pub owner_id: i64,
    pub name: Option<String>,
    pub guild_id: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Deserialize)]
pub struct GrantXpRequest {
    pub delta: f64,
    pub guild_id: Option<String>,
    pub author_name: Option<String>,
}

fn no_character(prefix: &str) -> BotError {
    BotError::NotFound(format!(
        "You do not have a character! Use `{prefix}rpg setup` to create one."
    ))
}

fn status_embed(base: Embed, character: &Character) -> Embed {
    let items = if character.inventory.items.is_empty() {
        "None".to_string()
    } else {
        character
            .inventory
            .items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    base.title(character.name.clone())
        .description(character.level_str())
        .field("Gold", character.gold.to_string())
        .field("Items", items)
}

/// `rpg`: show the invoking user's character.
pub async fn character_status(
    State(state): State<AppState>,
    Path(owner_id): Path<i64>,
    Query(ctx): Query<CommandContext>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["rpg"]).inc();

    let Some(character) = state.db.load_character(owner_id).await? else {
        let prefix = state.prefixes.get(ctx.guild_id.as_deref()).await?;
        return Err(no_character(&prefix));
    };
    let embed = status_embed(state.default_embed(ctx.author_name.as_deref()), &character);
    Ok(Json(json!({ "reply": Reply::embed(embed), "character": character })))
}

/// `rpg setup <name>`: create a character if the user does not already have one.
pub async fn setup_character(
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["rpg setup"]).inc();

    let raw_name = req.name.ok_or(BotError::MissingArgument("name"))?;
    let name = validate_name(&raw_name).map_err(BotError::InvalidArgument)?;

    let _guard = state.locks.lock(req.owner_id).await;
    if state.db.load_character(req.owner_id).await?.is_some() {
        return Err(BotError::AlreadyExists(
            "You already have a character!".to_string(),
        ));
    }
    state
        .check_cooldown(req.owner_id, CooldownCommand::RpgSetup, req.guild_id.as_deref())
        .await?;

    let character = Character::new(req.owner_id, &name);
    if !state.db.create_character(&character).await? {
        state.cooldowns.refund(req.owner_id, CooldownCommand::RpgSetup);
        return Err(BotError::AlreadyExists(
            "You already have a character!".to_string(),
        ));
    }
    metrics::CHARACTERS_CREATED_TOTAL.inc();
    tracing::info!("Created character {name:?} for user {}", req.owner_id);

    let embed = state
        .default_embed(req.author_name.as_deref())
        .title("Character Created!")
        .description(format!("Your character named {name} has been created!"));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "reply": Reply::embed(embed), "character": character })),
    ))
}

/// Grant or remove experience, persisting the new level and reporting transitions.
pub async fn grant_xp(
    State(state): State<AppState>,
    Path(owner_id): Path<i64>,
    Json(req): Json<GrantXpRequest>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["rpg xp"]).inc();

    // Reject unusable deltas before they spend a cooldown slot.
    let delta = Xp::from_f64(req.delta)?;
    state
        .check_cooldown(owner_id, CooldownCommand::RpgXp, req.guild_id.as_deref())
        .await?;

    let guard = state.locks.lock(owner_id).await;

    let Some(mut character) = state.db.load_character(owner_id).await? else {
        drop(guard);
        state.cooldowns.refund(owner_id, CooldownCommand::RpgXp);
        let prefix = state.prefixes.get(req.guild_id.as_deref()).await?;
        return Err(no_character(&prefix));
    };

    let before = character.level();
    let transition = match character.grant_xp(delta) {
        Ok(transition) => transition,
        Err(e) => {
            state.cooldowns.refund(owner_id, CooldownCommand::RpgXp);
            return Err(e.into());
        }
    };
    state.db.save_character(&character).await?;
    drop(guard);

    if transition != Transition::None {
        metrics::LEVEL_TRANSITIONS_TOTAL
            .with_label_values(&[transition.as_str()])
            .inc();
        tracing::info!(
            "Character of user {owner_id} moved from level {before} to {}",
            character.level()
        );
    }

    let title = match transition {
        Transition::LevelUp => format!(
            "Level Up! {} reached level {}",
            character.name,
            character.level()
        ),
        Transition::LevelDown => format!(
            "Level Down! {} dropped to level {}",
            character.name,
            character.level()
        ),
        Transition::None => "Experience Updated".to_string(),
    };
    let embed = state
        .default_embed(req.author_name.as_deref())
        .title(title)
        .description(character.level_str());

    Ok(Json(json!({
        "reply": Reply::embed(embed),
        "transition": transition,
        "character": character,
    })))
}

/// Retire the user's character.
pub async fn delete_character(
    State(state): State<AppState>,
    Path(owner_id): Path<i64>,
    Query(ctx): Query<CommandContext>,
) -> Result<impl IntoResponse, BotError> {
    metrics::COMMANDS_TOTAL.with_label_values(&["rpg delete"]).inc();

    let _guard = state.locks.lock(owner_id).await;
    if !state.db.delete_character(owner_id).await? {
        let prefix = state.prefixes.get(ctx.guild_id.as_deref()).await?;
        return Err(no_character(&prefix));
    }
    tracing::info!("Deleted character of user {owner_id}");

    let embed = state
        .default_embed(ctx.author_name.as_deref())
        .title("Character Deleted")
        .description("Your character has been deleted.");
    Ok(Json(Reply::embed(embed)))
}
