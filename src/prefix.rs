// Per-guild command prefixes with a read-through cache over the database.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::db::Database;
use crate::metrics;

pub const MAX_PREFIX_LEN: usize = 10;

/// Guild prefix store. Cheap to clone; all clones share one cache.
#[derive(Clone)]
pub struct PrefixCache {
    db: Arc<Database>,
    default_prefix: String,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl PrefixCache {
    pub fn new(db: Arc<Database>, default_prefix: impl Into<String>) -> Self {
        Self {
            db,
            default_prefix: default_prefix.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Prefix for a guild, or the default outside of guilds.
    pub async fn get(&self, guild_id: Option<&str>) -> Result<String, sqlx::Error> {
        let Some(guild_id) = guild_id else {
            return Ok(self.default_prefix.clone());
        };

        if let Some(prefix) = self.cached(guild_id) {
            metrics::PREFIX_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            return Ok(prefix);
        }
        metrics::PREFIX_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

        let prefix = self
            .db
            .get_prefix(guild_id)
            .await?
            .unwrap_or_else(|| self.default_prefix.clone());

        self.cache
            .write()
            .unwrap()
            .insert(guild_id.to_string(), prefix.clone());
        Ok(prefix)
    }

    /// Persist a new prefix, then refresh the cache entry.
    pub async fn set(&self, guild_id: &str, prefix: &str) -> Result<(), sqlx::Error> {
        self.db.set_prefix(guild_id, prefix).await?;
        self.cache
            .write()
            .unwrap()
            .insert(guild_id.to_string(), prefix.to_string());
        tracing::info!("Prefix for guild {guild_id} set to {prefix:?}");
        Ok(())
    }

    /// All prefixes a message may start with: bot mentions first, then the guild prefix.
    pub async fn command_prefixes(
        &self,
        bot_user_id: i64,
        guild_id: Option<&str>,
    ) -> Result<Vec<String>, sqlx::Error> {
        let prefix = self.get(guild_id).await?;
        Ok(vec![
            format!("<@{bot_user_id}> "),
            format!("<@!{bot_user_id}> "),
            prefix,
        ])
    }

    pub fn cached(&self, guild_id: &str) -> Option<String> {
        self.cache.read().unwrap().get(guild_id).cloned()
    }
}

/// Check a requested prefix: non-empty, short, no whitespace.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Err("Prefix can not be empty.".to_string());
    }
    if prefix.chars().count() > MAX_PREFIX_LEN {
        return Err(format!(
            "Prefix can be at most {MAX_PREFIX_LEN} characters long."
        ));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err("Prefix can not contain whitespace.".to_string());
    }
    Ok(())
}
