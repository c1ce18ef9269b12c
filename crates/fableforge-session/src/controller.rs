//! Turn and mode gating.

use std::sync::Arc;

use rand::seq::SliceRandom;

use fableforge_broadcast::{BroadcastHub, StreamEvent};
use fableforge_core::error::EngineError;
use fableforge_generation::{GenerationService, closest_match, generate_object};
use fableforge_world::{GameMode, WorldState};

use crate::prompts;
use crate::schemas::TurnShuffle;

/// Gates who may submit a request right now and drives mode transitions.
///
/// Holds no state of its own; whose turn it is and which mode is active
/// live in the world store, mutated only on the coordinator.
#[derive(Clone)]
pub struct TurnController {
    hub: Arc<BroadcastHub>,
    service: Arc<dyn GenerationService>,
    language: String,
}

impl TurnController {
    pub fn new(
        hub: Arc<BroadcastHub>,
        service: Arc<dyn GenerationService>,
        language: &str,
    ) -> Self {
        Self {
            hub,
            service,
            language: language.to_owned(),
        }
    }

    /// Checks whether `character` may act in the current mode.
    ///
    /// Combat allows only the active character; narrative allows any
    /// living player character. Rejection mutates nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotYourTurn`] for an out-of-turn combat
    /// request and [`EngineError::UnknownEntity`] for a name the roster
    /// does not contain.
    pub fn is_authorized(&self, world: &WorldState, character: &str) -> Result<(), EngineError> {
        let found = world
            .character(character)
            .ok_or_else(|| EngineError::UnknownEntity(character.to_owned()))?;
        match world.mode {
            GameMode::Combat => {
                let active = world.turn_order.active().unwrap_or_default();
                if active == character {
                    Ok(())
                } else {
                    Err(EngineError::NotYourTurn {
                        character: character.to_owned(),
                        active: active.to_owned(),
                    })
                }
            }
            GameMode::Narrative => {
                if found.alive && found.is_player {
                    Ok(())
                } else {
                    Err(EngineError::NotYourTurn {
                        character: character.to_owned(),
                        active: "any living player".to_owned(),
                    })
                }
            }
        }
    }

    /// The names currently allowed to act, as sent in `lock` events.
    #[must_use]
    pub fn allowed_actors(world: &WorldState) -> Vec<String> {
        match world.mode {
            GameMode::Combat => world
                .turn_order
                .active()
                .map(|name| vec![name.to_owned()])
                .unwrap_or_default(),
            GameMode::Narrative => world.living_player_names(),
        }
    }

    /// Broadcasts the current allowed-actor set.
    pub fn broadcast_lock(&self, world: &WorldState) {
        self.hub.publish(&StreamEvent::Lock {
            allowed_players: Self::allowed_actors(world),
            game_mode: world.mode.as_str().to_owned(),
        });
    }

    /// Switches mode if `mode` differs, recomputing and broadcasting who
    /// may act. Entering combat rebuilds the turn order.
    pub async fn set_mode(&self, world: &mut WorldState, mode: GameMode) {
        if world.mode == mode {
            return;
        }
        world.mode = mode;
        self.hub.publish(&StreamEvent::Alert {
            data: format!("Game mode changed to {}", mode.as_str()),
        });
        if mode == GameMode::Combat {
            self.shuffle_turns(world).await;
        }
        self.broadcast_lock(world);
    }

    /// Rebuilds the turn order for a new combat round.
    ///
    /// The generation service proposes a tactically sensible ordering;
    /// every returned name is fuzzily verified against the live roster.
    /// On any failure the order falls back to a random shuffle, so combat
    /// never stalls on a bad generation.
    pub async fn shuffle_turns(&self, world: &mut WorldState) {
        let roster = world.character_names();
        let snapshot = world.snapshot(None);
        let prompt = prompts::turn_shuffle(&snapshot, &roster);
        match generate_object::<TurnShuffle>(self.service.as_ref(), &prompt, &self.language).await {
            Ok(shuffle) => {
                let mut verified = Vec::with_capacity(shuffle.order.len());
                for name in &shuffle.order {
                    if let Ok(resolved) = closest_match(name, &roster) {
                        if !verified.iter().any(|v| v == resolved) {
                            verified.push(resolved.to_owned());
                        }
                    }
                }
                if verified.is_empty() {
                    tracing::warn!("turn shuffle resolved no names, falling back to random order");
                    world.turn_order.reset(random_order(roster));
                } else {
                    tracing::debug!(reasoning = %shuffle.reasoning, order = ?verified, "turn order shuffled");
                    world.turn_order.reset(verified);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "turn shuffle generation failed, falling back to random order");
                world.turn_order.reset(random_order(roster));
            }
        }
    }

    /// Moves the turn index forward one entry.
    pub fn advance(world: &mut WorldState) {
        world.turn_order.advance();
    }
}

fn random_order(mut names: Vec<String>) -> Vec<String> {
    names.shuffle(&mut rand::rng());
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use fableforge_test_support::{ScriptedGenerator, test_world};

    fn controller(service: ScriptedGenerator) -> (TurnController, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::new(16));
        let controller = TurnController::new(Arc::clone(&hub), Arc::new(service), "English");
        (controller, hub)
    }

    #[test]
    fn test_combat_authorizes_only_active_character() {
        let mut world = test_world();
        world.mode = GameMode::Combat;
        let (controller, _hub) = controller(ScriptedGenerator::default());

        let active = world.turn_order.active().unwrap().to_owned();
        assert!(controller.is_authorized(&world, &active).is_ok());

        let other = world
            .character_names()
            .into_iter()
            .find(|name| *name != active)
            .unwrap();
        let rejection = controller.is_authorized(&world, &other).unwrap_err();
        assert!(matches!(rejection, EngineError::NotYourTurn { .. }));
    }

    #[test]
    fn test_narrative_authorizes_living_players_only() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let (controller, _hub) = controller(ScriptedGenerator::default());

        assert!(controller.is_authorized(&world, "Igor").is_ok());
        // The ent is an NPC and may not submit requests.
        assert!(controller.is_authorized(&world, "Ent").is_err());
        assert!(matches!(
            controller.is_authorized(&world, "Nobody").unwrap_err(),
            EngineError::UnknownEntity(_)
        ));
    }

    #[tokio::test]
    async fn test_entering_combat_shuffles_and_broadcasts() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let service = ScriptedGenerator::default();
        service.push_json(serde_json::json!({
            "order": ["Ent", "igor", "Olga"],
            "reasoning": "ambusher first",
        }));
        let (controller, hub) = controller(service);
        let queue = hub.register("l1", "Igor");
        let _ = queue.recv().await;

        controller.set_mode(&mut world, GameMode::Combat).await;

        assert_eq!(world.mode, GameMode::Combat);
        assert_eq!(world.turn_order.names(), ["Ent", "Igor", "Olga"]);
        // Alert, then lock for the new active character.
        assert!(matches!(queue.recv().await, StreamEvent::Alert { .. }));
        match queue.recv().await {
            StreamEvent::Lock {
                allowed_players,
                game_mode,
            } => {
                assert_eq!(allowed_players, ["Ent"]);
                assert_eq!(game_mode, "COMBAT");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shuffle_falls_back_to_random_on_failure() {
        let mut world = test_world();
        let roster = world.character_names();
        let (controller, _hub) = controller(ScriptedGenerator::default());

        // Empty script makes every generation call fail.
        controller.shuffle_turns(&mut world).await;

        let mut shuffled = world.turn_order.names().to_vec();
        shuffled.sort();
        let mut expected = roster;
        expected.sort();
        assert_eq!(shuffled, expected);
    }
}
