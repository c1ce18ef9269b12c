//! Typed shapes the generation service is asked to produce.
//!
//! Each type describes its own JSON layout through [`PromptSchema`]; the
//! description travels inside the prompt, and responses are parsed
//! strictly back into these types. Delta change descriptions stay opaque
//! free text — the engine never interprets them, it only routes them.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use fableforge_generation::PromptSchema;
use fableforge_world::{Character, GameMode, Scene};

/// Whether a request is an in-world action or a question to the narrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Action,
    Question,
}

/// A participant request after classification.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifiedRequest {
    pub request_kind: RequestKind,
    #[serde(default)]
    pub reasoning: String,
}

impl PromptSchema for ClassifiedRequest {
    const NAME: &'static str = "ClassifiedRequest";

    fn schema() -> Value {
        json!({
            "request_kind": "'action' if the player speaks as their character, 'question' if they ask the narrator out of character",
            "reasoning": "one sentence explaining the classification",
        })
    }
}

/// What kind of entity a delta targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaTarget {
    Character,
    Scene,
}

/// A relative, scoped change to one entity.
///
/// The change text is an instruction for the generation service, not for
/// this engine: "decrease current_health by 5", "remove Healing Potion".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaInstruction {
    pub target: DeltaTarget,
    /// Name of the affected entity; fuzzily resolved against the roster.
    pub name: String,
    /// Free-text relative change description.
    pub change: String,
}

/// The generated result of one action: narrative plus state deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub narrative: String,
    pub is_legal: bool,
    #[serde(default)]
    pub deltas: Vec<DeltaInstruction>,
}

impl PromptSchema for ActionOutcome {
    const NAME: &'static str = "ActionOutcome";

    fn schema() -> Value {
        json!({
            "narrative": "vivid description of the action's outcome, shown to all players",
            "is_legal": "boolean; false only when the action breaks a fundamental rule",
            "deltas": [{
                "target": "'character' or 'scene'",
                "name": "name of the one entity directly affected",
                "change": "a single relative change, e.g. 'decrease current_health by 5'",
            }],
        })
    }
}

/// Corrective deltas produced by the audit pass.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionList {
    #[serde(default)]
    pub corrections: Vec<DeltaInstruction>,
}

impl PromptSchema for CorrectionList {
    const NAME: &'static str = "CorrectionList";

    fn schema() -> Value {
        json!({
            "corrections": [{
                "target": "'character' or 'scene'",
                "name": "name of the entity whose state mismatches the intended outcome",
                "change": "relative change that repairs the mismatch; empty list when everything matches",
            }],
        })
    }
}

/// Kinds of system-initiated world changes from the after-action phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorldChangeKind {
    UpdateCharacter,
    UpdateScene,
    AddCharacter,
    RemoveCharacter,
    ChangeScene,
    AdvancePlot,
}

/// One proactive world change recommended by the after-action analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldChange {
    pub kind: WorldChangeKind,
    /// Present for `UPDATE_CHARACTER` and `UPDATE_SCENE`.
    #[serde(default)]
    pub delta: Option<DeltaInstruction>,
    /// New-character description, removed-character name, next-scene
    /// premise, or plot note, depending on `kind`.
    #[serde(default)]
    pub description: String,
}

/// Combined game-mode recommendation and world reactions after a turn.
#[derive(Debug, Clone, Deserialize)]
pub struct AfterAction {
    #[serde(default)]
    pub reasoning: String,
    pub recommended_mode: GameMode,
    #[serde(default)]
    pub world_changes: Vec<WorldChange>,
}

impl PromptSchema for AfterAction {
    const NAME: &'static str = "AfterAction";

    fn schema() -> Value {
        json!({
            "reasoning": "brief explanation of both decisions",
            "recommended_mode": "'COMBAT' or 'NARRATIVE'",
            "world_changes": [{
                "kind": "one of UPDATE_CHARACTER, UPDATE_SCENE, ADD_CHARACTER, REMOVE_CHARACTER, CHANGE_SCENE, ADVANCE_PLOT",
                "delta": {
                    "target": "'character' or 'scene' (UPDATE_* kinds only)",
                    "name": "entity name",
                    "change": "relative change description",
                },
                "description": "new character description, removed character name, next scene premise, or plot note",
            }],
        })
    }
}

/// Tactically ordered character names for a new combat round.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnShuffle {
    pub order: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl PromptSchema for TurnShuffle {
    const NAME: &'static str = "TurnShuffle";

    fn schema() -> Value {
        json!({
            "order": ["character names, most tactically urgent first; omit incapacitated characters"],
            "reasoning": "brief explanation of the ordering",
        })
    }
}

/// A freshly generated character. Wrapper so the roster type can be
/// requested from the generation service.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct GeneratedCharacter(pub Character);

impl PromptSchema for GeneratedCharacter {
    const NAME: &'static str = "Character";

    fn schema() -> Value {
        json!({
            "name": "character name, unique in the scene",
            "max_health": "integer",
            "current_health": "integer, at most max_health",
            "defense": "integer defense rating",
            "alive": "boolean",
            "is_player": "true only for player-controlled characters",
            "conditions": ["active conditions, empty if none"],
            "inventory": [{
                "name": "item name",
                "description": "appearance, history, function",
                "kind": "one of Weapon, Armor, Shield, Potion, Scroll, WondrousItem, Gear, Trinket, Treasure, Tool, QuestItem",
                "weight": "pounds",
                "value": "gold",
                "quantity": "integer stack size",
                "rarity": "one of Common, Uncommon, Rare, VeryRare, Legendary, Artifact, Unique",
                "magical": "boolean",
                "damage": "damage roll like '1d8', weapons only, else null",
                "damage_kind": "e.g. 'slashing', weapons only, else null",
                "defense": "defense bonus, armor and shields only, else null",
                "effect": "effect when used, or null",
                "properties": ["special properties"],
            }],
            "abilities": [{"name": "ability name", "description": "what it does"}],
            "persona": "personality, backstory, motivation",
            "appearance": "physical appearance",
            "position": "where the character currently is within the scene",
        })
    }
}

/// A freshly generated or regenerated scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct GeneratedScene(pub Scene);

impl PromptSchema for GeneratedScene {
    const NAME: &'static str = "Scene";

    fn schema() -> Value {
        json!({
            "name": "scene name",
            "description": "descriptive text shown to players",
            "size": "rough physical size, free text",
            "objects": [{"name": "object name", "description": "what it looks like and how it can be used"}],
            "difficulty": "0-20",
        })
    }
}
