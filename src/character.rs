// RPG characters: identity, progress, gold and inventory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::progression::{self, Progress, Transition, Xp};

pub const MAX_NAME_LEN: usize = 32;

/// A single inventory item, e.g. a fishing rod or a pickaxe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Inventory {
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub owner_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub progress: Progress,
    pub gold: i64,
    #[serde(default)]
    pub inventory: Inventory,
}

impl Character {
    /// Fresh level 1 character.
    pub fn new(owner_id: i64, name: &str) -> Self {
        Self {
            owner_id,
            name: name.to_string(),
            progress: Progress::new(),
            gold: 0,
            inventory: Inventory::default(),
        }
    }

    pub fn level(&self) -> u32 {
        self.progress.level
    }

    pub fn xp(&self) -> Xp {
        self.progress.xp
    }

    /// Grant (or take away) experience, returning the level transition.
    pub fn grant_xp(&mut self, delta: Xp) -> Result<Transition, progression::ProgressionError> {
        let (progress, transition) = self.progress.apply_xp(delta)?;
        self.progress = progress;
        Ok(transition)
    }

    pub fn level_str(&self) -> String {
        progression::format_progress(&self.progress)
    }
}

/// Trim and validate a character name: letters and single inner spaces only.
pub fn validate_name(raw: &str) -> Result<String, String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err("Character name can not be empty.".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!(
            "Character name can be at most {MAX_NAME_LEN} characters long."
        ));
    }
    if !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err("Character name may only contain letters.".to_string());
    }
    Ok(name)
}
