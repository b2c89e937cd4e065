// Database access layer (SQLite via sqlx).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::character::{Character, Inventory};
use crate::progression::{Progress, Xp};

#[derive(Debug, Clone, sqlx::FromRow)]
struct CharacterRow {
    owner_id: i64,
    name: String,
    level: i64,
    xp_milli: i64,
    gold: i64,
    inventory: String,
}

impl TryFrom<CharacterRow> for Character {
    type Error = sqlx::Error;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        let level = u32::try_from(row.level).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let inventory: Inventory = serde_json::from_str(&row.inventory)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Character {
            owner_id: row.owner_id,
            name: row.name,
            progress: Progress {
                level,
                xp: Xp::from_millis(row.xp_milli),
            },
            gold: row.gold,
            inventory,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeletedMessage {
    pub id: i64,
    pub message_sent: String,
    pub content: String,
    pub author_id: i64,
    pub logged_at: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every in-memory connection is its own database; keep a single one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                owner_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                level INTEGER NOT NULL DEFAULT 1,
                xp_milli INTEGER NOT NULL DEFAULT 0,
                gold INTEGER NOT NULL DEFAULT 0,
                inventory TEXT NOT NULL DEFAULT '{"items":[]}',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prefixes (
                guild_id TEXT PRIMARY KEY,
                prefix TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deleted_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_sent TEXT NOT NULL,
                content TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                logged_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Characters ────────────────────────────────────────────────────

    pub async fn load_character(&self, owner_id: i64) -> Result<Option<Character>, sqlx::Error> {
        let row = sqlx::query_as::<_, CharacterRow>(
            "SELECT owner_id, name, level, xp_milli, gold, inventory FROM characters WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Character::try_from).transpose()
    }

    /// Insert a new character. Returns false if the owner already has one.
    pub async fn create_character(&self, character: &Character) -> Result<bool, sqlx::Error> {
        let inventory = inventory_json(&character.inventory)?;
        let result = sqlx::query(
            "INSERT INTO characters (owner_id, name, level, xp_milli, gold, inventory) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(owner_id) DO NOTHING",
        )
        .bind(character.owner_id)
        .bind(&character.name)
        .bind(i64::from(character.progress.level))
        .bind(character.progress.xp.millis())
        .bind(character.gold)
        .bind(inventory)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Upsert the full character record.
    pub async fn save_character(&self, character: &Character) -> Result<(), sqlx::Error> {
        let inventory = inventory_json(&character.inventory)?;
        sqlx::query(
            r#"
            INSERT INTO characters (owner_id, name, level, xp_milli, gold, inventory)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET
                name = excluded.name,
                level = excluded.level,
                xp_milli = excluded.xp_milli,
                gold = excluded.gold,
                inventory = excluded.inventory,
                updated_at = datetime('now')
        "#,
        )
        .bind(character.owner_id)
        .bind(&character.name)
        .bind(i64::from(character.progress.level))
        .bind(character.progress.xp.millis())
        .bind(character.gold)
        .bind(inventory)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_character(&self, owner_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM characters WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Guild prefixes ────────────────────────────────────────────────

    pub async fn get_prefix(&self, guild_id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT prefix FROM prefixes WHERE guild_id = ?")
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn set_prefix(&self, guild_id: &str, prefix: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO prefixes (guild_id, prefix) VALUES (?, ?) ON CONFLICT(guild_id) DO UPDATE SET prefix = excluded.prefix",
        )
        .bind(guild_id)
        .bind(prefix)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Deleted message log ───────────────────────────────────────────

    pub async fn log_deleted_message(
        &self,
        message_sent: &str,
        content: &str,
        author_id: i64,
    ) -> Result<DeletedMessage, sqlx::Error> {
        sqlx::query_as::<_, DeletedMessage>(
            "INSERT INTO deleted_messages (message_sent, content, author_id) VALUES (?, ?, ?) RETURNING id, message_sent, content, author_id, logged_at",
        )
        .bind(message_sent)
        .bind(content)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_deleted_messages(
        &self,
        author_id: i64,
    ) -> Result<Vec<DeletedMessage>, sqlx::Error> {
        sqlx::query_as::<_, DeletedMessage>(
            "SELECT id, message_sent, content, author_id, logged_at FROM deleted_messages WHERE author_id = ? ORDER BY id",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
    }
}

fn inventory_json(inventory: &Inventory) -> Result<String, sqlx::Error> {
    serde_json::to_string(inventory).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
