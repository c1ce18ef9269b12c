//! The world state store.

use fableforge_core::error::EngineError;
use serde_json::json;

use crate::character::Character;
use crate::log::{EventLog, NarrativeContext};
use crate::scene::Scene;
use crate::turn::{GameMode, TurnOrder};

/// Mutable session state: scene, roster, turn order, mode, and logs.
///
/// Owned by the session coordinator; every mutation flows through the
/// action pipeline or the turn controller. There is no external write
/// path.
#[derive(Debug)]
pub struct WorldState {
    /// The single active scene.
    pub scene: Scene,
    /// All characters currently present.
    pub characters: Vec<Character>,
    /// Combat turn order.
    pub turn_order: TurnOrder,
    /// Current game mode.
    pub mode: GameMode,
    /// Narrative memory fed into generation prompts.
    pub context: NarrativeContext,
    /// Structured audit log.
    pub event_log: EventLog,
}

impl WorldState {
    /// Creates a store around an opening scene and roster.
    #[must_use]
    pub fn new(
        scene: Scene,
        characters: Vec<Character>,
        mode: GameMode,
        premise: &str,
        event_log_capacity: usize,
    ) -> Self {
        let characters: Vec<Character> =
            characters.into_iter().map(Character::normalized).collect();
        let turn_order = TurnOrder::new(characters.iter().map(|c| c.name.clone()).collect());
        Self {
            scene,
            characters,
            turn_order,
            mode,
            context: NarrativeContext::new(premise),
            event_log: EventLog::new(event_log_capacity),
        }
    }

    /// Looks up a character by exact name.
    #[must_use]
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// All roster names.
    #[must_use]
    pub fn character_names(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of living player-controlled characters, the narrative-mode
    /// allowed set.
    #[must_use]
    pub fn living_player_names(&self) -> Vec<String> {
        self.characters
            .iter()
            .filter(|c| c.alive && c.is_player)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Adds a character to the roster and the end of the turn order.
    pub fn insert_character(&mut self, character: Character) {
        let character = character.normalized();
        self.turn_order.push(character.name.clone());
        self.characters.push(character);
    }

    /// Removes a character by exact name, pruning the turn order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntity`] if no such character exists.
    pub fn remove_character(&mut self, name: &str) -> Result<Character, EngineError> {
        let index = self
            .characters
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EngineError::UnknownEntity(name.to_owned()))?;
        let removed = self.characters.remove(index);
        let roster = self.character_names();
        self.turn_order.prune(&roster);
        Ok(removed)
    }

    /// Atomically replaces the character named `name` with `replacement`.
    ///
    /// Copy-on-write: the caller builds the complete candidate first, and
    /// the live roster entry is only swapped once the candidate exists,
    /// so a failed regeneration can never leave the entity missing or
    /// half-updated. Vitals are normalized on the way in.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntity`] if no such character exists;
    /// the roster is unchanged in that case.
    pub fn replace_character(
        &mut self,
        name: &str,
        replacement: Character,
    ) -> Result<(), EngineError> {
        let index = self
            .characters
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EngineError::UnknownEntity(name.to_owned()))?;
        let replacement = replacement.normalized();
        if replacement.name != name {
            // A rename flows through to the turn order as well.
            self.turn_order.rename(name, &replacement.name);
        }
        self.characters[index] = replacement;
        Ok(())
    }

    /// Atomically swaps in a new scene.
    pub fn replace_scene(&mut self, scene: Scene) {
        self.scene = scene;
    }

    /// Full structured game state, embedded in generation prompts and
    /// served from the snapshot endpoint.
    #[must_use]
    pub fn snapshot(&self, acting: Option<&str>) -> serde_json::Value {
        let characters: Vec<serde_json::Value> = self
            .characters
            .iter()
            .map(|character| {
                let mut value = serde_json::to_value(character).unwrap_or_default();
                value["is_currently_acting"] = json!(acting == Some(character.name.as_str()));
                value
            })
            .collect();
        let recent_events: Vec<serde_json::Value> = self
            .event_log
            .recent(10)
            .into_iter()
            .map(|record| serde_json::to_value(record).unwrap_or_default())
            .collect();
        json!({
            "game_state": {
                "summary_of_past_events": self.context.as_str(),
                "recent_events": recent_events,
                "current_scene": self.scene,
                "game_mode": self.mode.as_str(),
                "turn_order": self.turn_order.names(),
                "participants": {
                    "description": "All characters currently in the scene.",
                    "characters": characters,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;

    fn character(name: &str, health: i32, is_player: bool) -> Character {
        Character {
            name: name.to_owned(),
            max_health: 50,
            current_health: health,
            defense: 12,
            alive: true,
            is_player,
            conditions: Vec::new(),
            inventory: Vec::new(),
            abilities: Vec::new(),
            persona: String::new(),
            appearance: String::new(),
            position: String::new(),
        }
    }

    fn world() -> WorldState {
        WorldState::new(
            Scene::placeholder("A forest clearing at midnight"),
            vec![
                character("Igor", 50, true),
                character("Oleg", 50, true),
                character("Ent", 30, false),
            ],
            GameMode::Narrative,
            "A forest clearing at midnight",
            100,
        )
    }

    #[test]
    fn test_new_builds_turn_order_from_roster() {
        let world = world();
        assert_eq!(world.turn_order.len(), 3);
        assert_eq!(world.turn_order.active(), Some("Igor"));
    }

    #[test]
    fn test_living_player_names_excludes_npcs_and_dead() {
        let mut world = world();
        world
            .replace_character("Oleg", character("Oleg", 0, true))
            .unwrap();
        assert_eq!(world.living_player_names(), vec!["Igor".to_owned()]);
    }

    #[test]
    fn test_replace_character_normalizes_vitals() {
        let mut world = world();
        world
            .replace_character("Igor", character("Igor", 999, true))
            .unwrap();
        assert_eq!(world.character("Igor").unwrap().current_health, 50);
    }

    #[test]
    fn test_replace_unknown_character_leaves_roster_untouched() {
        let mut world = world();
        let before = world.character_names();
        let err = world
            .replace_character("Ghost", character("Ghost", 10, false))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEntity(_)));
        assert_eq!(world.character_names(), before);
    }

    #[test]
    fn test_remove_character_prunes_turn_order() {
        let mut world = world();
        world.remove_character("Oleg").unwrap();
        assert_eq!(world.turn_order.len(), 2);
        assert!(!world.turn_order.names().contains(&"Oleg".to_owned()));
    }

    #[test]
    fn test_snapshot_marks_acting_character() {
        let world = world();
        let snapshot = world.snapshot(Some("Oleg"));
        let characters = snapshot["game_state"]["participants"]["characters"]
            .as_array()
            .unwrap();
        let oleg = characters
            .iter()
            .find(|c| c["name"] == "Oleg")
            .unwrap();
        assert_eq!(oleg["is_currently_acting"], true);
    }
}
