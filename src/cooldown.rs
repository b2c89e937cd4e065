// In-memory per-user command cooldowns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Commands that carry a cooldown, with their constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownCommand {
    /// Creating a character.
    RpgSetup,
    /// Granting experience to a character.
    RpgXp,
    /// Changing a guild prefix.
    Prefix,
}

impl CooldownCommand {
    /// Maximum number of uses allowed in the window.
    pub fn max_uses(&self) -> usize {
        match self {
            CooldownCommand::RpgSetup => 2,
            CooldownCommand::RpgXp => 30,
            CooldownCommand::Prefix => 5,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            CooldownCommand::RpgSetup => Duration::from_secs(3600),
            CooldownCommand::RpgXp => Duration::from_secs(60),
            CooldownCommand::Prefix => Duration::from_secs(60),
        }
    }

    /// Qualified command name as typed by users.
    pub fn qualified_name(&self) -> &'static str {
        match self {
            CooldownCommand::RpgSetup => "rpg setup",
            CooldownCommand::RpgXp => "rpg xp",
            CooldownCommand::Prefix => "prefix",
        }
    }
}

/// Returned when a command is still cooling down.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownError {
    pub command: CooldownCommand,
    /// Whole seconds until the next use is allowed (at least 1).
    pub retry_after: u64,
}

type CooldownKey = (i64, CooldownCommand);

/// Thread-safe sliding-window cooldown tracker.
#[derive(Debug, Clone)]
pub struct Cooldowns {
    inner: Arc<Mutex<HashMap<CooldownKey, Vec<Instant>>>>,
}

impl Cooldowns {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a use of `command` by `user_id`, or report how long to wait.
    pub fn check(&self, user_id: i64, command: CooldownCommand) -> Result<(), CooldownError> {
        self.check_at(user_id, command, Instant::now())
    }

    fn check_at(
        &self,
        user_id: i64,
        command: CooldownCommand,
        now: Instant,
    ) -> Result<(), CooldownError> {
        let mut map = self.inner.lock().unwrap();
        // Forget keys whose uses have all left their window.
        map.retain(|(_, cmd), uses| {
            uses.retain(|t| now.duration_since(*t) < cmd.window());
            !uses.is_empty()
        });

        let window = command.window();
        let uses = map.entry((user_id, command)).or_default();

        if uses.len() >= command.max_uses() {
            let oldest = uses[0];
            let remaining = window.saturating_sub(now.duration_since(oldest));
            return Err(CooldownError {
                command,
                retry_after: remaining.as_secs_f64().ceil().max(1.0) as u64,
            });
        }

        uses.push(now);
        Ok(())
    }

    /// Forget the most recent use (e.g. when the command failed before doing anything).
    pub fn refund(&self, user_id: i64, command: CooldownCommand) {
        let mut map = self.inner.lock().unwrap();
        let key = (user_id, command);
        if let Some(uses) = map.get_mut(&key) {
            uses.pop();
            if uses.is_empty() {
                map.remove(&key);
            }
        }
    }

    pub fn uses(&self, user_id: i64, command: CooldownCommand) -> usize {
        let mut map = self.inner.lock().unwrap();
        let window = command.window();
        let now = Instant::now();
        let key = (user_id, command);
        let Some(uses) = map.get_mut(&key) else {
            return 0;
        };
        uses.retain(|t| now.duration_since(*t) < window);
        let count = uses.len();
        if count == 0 {
            map.remove(&key);
        }
        count
    }
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self::new()
    }
}
