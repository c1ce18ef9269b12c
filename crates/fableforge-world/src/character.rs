//! Characters and the items and abilities they carry.

use serde::{Deserialize, Serialize};

/// Broad category of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon,
    Armor,
    Shield,
    Potion,
    Scroll,
    WondrousItem,
    Gear,
    Trinket,
    Treasure,
    Tool,
    QuestItem,
}

/// Rarity tier of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    VeryRare,
    Legendary,
    Artifact,
    Unique,
}

impl Default for Rarity {
    fn default() -> Self {
        Self::Common
    }
}

/// An item owned by exactly one character's inventory at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Display name.
    pub name: String,
    /// Appearance, history, and function.
    pub description: String,
    /// Category.
    pub kind: ItemKind,
    /// Weight in pounds.
    #[serde(default)]
    pub weight: f64,
    /// Base value in gold.
    #[serde(default)]
    pub value: u32,
    /// Stack size.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Rarity tier.
    #[serde(default)]
    pub rarity: Rarity,
    /// True for magical items.
    #[serde(default)]
    pub magical: bool,
    /// Damage roll for weapons, e.g. "1d8".
    #[serde(default)]
    pub damage: Option<String>,
    /// Damage kind for weapons, e.g. "slashing".
    #[serde(default)]
    pub damage_kind: Option<String>,
    /// Base defense rating for armor and shields.
    #[serde(default)]
    pub defense: Option<i32>,
    /// Effect when used.
    #[serde(default)]
    pub effect: Option<String>,
    /// Special properties.
    #[serde(default)]
    pub properties: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

/// A special ability a character can use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Name of the ability.
    pub name: String,
    /// What the ability does.
    pub description: String,
}

/// A participant in the scene, player-controlled or not.
///
/// Characters are replaced wholesale through the action pipeline; no code
/// outside this crate pokes individual fields from untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Name, unique within a session.
    pub name: String,
    /// Maximum health.
    pub max_health: i32,
    /// Current health, kept within `0..=max_health` by `normalize_vitals`.
    pub current_health: i32,
    /// Defense rating.
    pub defense: i32,
    /// True when `current_health > 0`. Recomputed by every mutator, never
    /// assumed by readers.
    #[serde(default)]
    pub alive: bool,
    /// True for player-controlled characters.
    #[serde(default)]
    pub is_player: bool,
    /// Current conditions affecting the character.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Ordered inventory.
    #[serde(default)]
    pub inventory: Vec<Item>,
    /// Special abilities.
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Personality, backstory, and motivation.
    #[serde(default)]
    pub persona: String,
    /// Physical appearance, used for illustration prompts.
    #[serde(default)]
    pub appearance: String,
    /// Where the character currently is within the scene.
    #[serde(default)]
    pub position: String,
}

impl Character {
    /// Clamps `current_health` into `0..=max_health` and recomputes the
    /// alive flag. Every path that produces or replaces a character runs
    /// this before the value reaches the store.
    pub fn normalize_vitals(&mut self) {
        self.max_health = self.max_health.max(0);
        self.current_health = self.current_health.clamp(0, self.max_health);
        self.alive = self.current_health > 0;
    }

    /// Returns a normalized copy.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize_vitals();
        self
    }
}
