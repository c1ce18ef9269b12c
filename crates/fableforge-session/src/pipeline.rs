//! The action resolution pipeline.
//!
//! One submitted request runs through a fixed stage sequence:
//! authorization, classification, outcome generation, the legality gate,
//! delta application, the audit pass, the after-action phase, turn
//! advancement, and the compaction check. Each stage publishes events as
//! it completes so listeners see incremental progress. No stage failure
//! crashes the coordinator; the worst outcome for any single change is
//! that it does not apply and everyone is told why.

use std::sync::Arc;

use serde_json::json;

use fableforge_broadcast::{BroadcastHub, StreamEvent};
use fableforge_core::clock::Clock;
use fableforge_core::config::EngineConfig;
use fableforge_core::error::EngineError;
use fableforge_generation::{
    GenerationService, IllustrationGenerator, IllustrationKind, IllustrationRequest,
    closest_match, generate_object,
};
use fableforge_world::{Character, GameMode, MessageHistory, WorldState};

use crate::compactor::ContextCompactor;
use crate::controller::TurnController;
use crate::prompts;
use crate::schemas::{
    ActionOutcome, AfterAction, ClassifiedRequest, CorrectionList, DeltaInstruction, DeltaTarget,
    GeneratedCharacter, GeneratedScene, RequestKind, WorldChange, WorldChangeKind,
};

/// What a completed pipeline run reports back to the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    /// True when the request consumed a turn (a legal action, or any NPC
    /// action). Questions and refused actions never consume one.
    pub consumed_turn: bool,
}

/// Runs the stage sequence for one request at a time.
#[derive(Clone)]
pub struct ActionPipeline {
    hub: Arc<BroadcastHub>,
    service: Arc<dyn GenerationService>,
    controller: TurnController,
    compactor: ContextCompactor,
    illustrations: Option<IllustrationGenerator>,
    clock: Arc<dyn Clock>,
    language: String,
}

impl ActionPipeline {
    pub fn new(
        hub: Arc<BroadcastHub>,
        service: Arc<dyn GenerationService>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
        illustrations: Option<IllustrationGenerator>,
    ) -> Self {
        let controller = TurnController::new(Arc::clone(&hub), Arc::clone(&service), &config.language);
        let compactor = ContextCompactor::new(Arc::clone(&service), config);
        Self {
            hub,
            service,
            controller,
            compactor,
            illustrations,
            clock,
            language: config.language.clone(),
        }
    }

    /// The controller this pipeline gates requests with.
    #[must_use]
    pub fn controller(&self) -> &TurnController {
        &self.controller
    }

    /// Resolves one participant request end to end.
    ///
    /// Narrator lines produced along the way are appended to `history`
    /// and the most recent ones are fed back into prompts so narration
    /// does not repeat itself.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotYourTurn`] or
    /// [`EngineError::UnknownEntity`] when authorization fails, and
    /// [`EngineError::Generation`] when classification or outcome
    /// generation fails outright. By that point nothing has been mutated.
    pub async fn resolve(
        &self,
        world: &mut WorldState,
        history: &mut MessageHistory,
        character_name: &str,
        request: &str,
    ) -> Result<Resolution, EngineError> {
        self.controller.is_authorized(world, character_name)?;

        let classified = self.classify(world, request).await?;
        let consumed = self
            .run_action(
                world,
                history,
                character_name,
                request,
                classified.request_kind,
                false,
            )
            .await?;

        if consumed && world.mode == GameMode::Combat {
            TurnController::advance(world);
        }

        if let Err(error) = self.compactor.compact_if_needed(world).await {
            tracing::warn!(%error, "context compaction failed, keeping full context");
        }

        Ok(Resolution {
            consumed_turn: consumed,
        })
    }

    /// Synthesizes and resolves the active non-player character's action.
    ///
    /// The generation service picks a short first-person action from the
    /// character's profile and the tactical situation; the action then
    /// runs through the same stages as a player request, always legal.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Generation`] when the tactics or outcome
    /// call fails; the coordinator advances past the character either way.
    pub async fn npc_turn(
        &self,
        world: &mut WorldState,
        history: &mut MessageHistory,
    ) -> Result<(), EngineError> {
        let (name, profile_json) = {
            let name = world
                .turn_order
                .active()
                .ok_or_else(|| EngineError::UnknownEntity("no active character".to_owned()))?
                .to_owned();
            let character = world
                .character(&name)
                .ok_or_else(|| EngineError::UnknownEntity(name.clone()))?;
            let profile = serde_json::to_string_pretty(character)
                .map_err(|e| EngineError::Generation(e.to_string()))?;
            (name, profile)
        };

        let prompt = prompts::npc_tactics(&profile_json, &world.snapshot(Some(&name)));
        let action = self
            .service
            .generate_text(&prompt)
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;
        tracing::info!(character = %name, action = %action, "non-player turn");

        self.run_action(world, history, &name, action.trim(), RequestKind::Action, true)
            .await?;
        Ok(())
    }

    async fn classify(
        &self,
        world: &WorldState,
        request: &str,
    ) -> Result<ClassifiedRequest, EngineError> {
        let prompt = prompts::classification(&world.snapshot(None), request);
        let classified =
            generate_object::<ClassifiedRequest>(self.service.as_ref(), &prompt, &self.language)
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
        tracing::debug!(kind = ?classified.request_kind, reasoning = %classified.reasoning, "request classified");
        Ok(classified)
    }

    /// Stages 3 through 7: outcome, gate, deltas, audit, after-action.
    /// Returns whether the request consumed a turn.
    async fn run_action(
        &self,
        world: &mut WorldState,
        history: &mut MessageHistory,
        character_name: &str,
        request: &str,
        kind: RequestKind,
        is_npc: bool,
    ) -> Result<bool, EngineError> {
        let recent_narration = history.last_from("DM", 5);
        world.event_log.record(
            self.clock.now(),
            "action_start",
            json!({ "character": character_name, "request": request, "is_npc": is_npc }),
        );

        let prompt = prompts::action_outcome(
            &world.snapshot(Some(character_name)),
            &recent_narration,
            character_name,
            request,
            is_npc,
        );
        let mut outcome =
            generate_object::<ActionOutcome>(self.service.as_ref(), &prompt, &self.language)
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
        if is_npc {
            outcome.is_legal = true;
        }

        world.event_log.record(
            self.clock.now(),
            "action_outcome",
            json!({
                "character": character_name,
                "narrative": outcome.narrative,
                "is_legal": outcome.is_legal,
                "deltas": outcome.deltas,
            }),
        );
        world.context.append_section(
            "ACTION_LOG",
            &format!(
                "Action by {character_name}: '{request}'. Outcome: {}",
                outcome.narrative
            ),
        );
        self.hub.publish(&StreamEvent::dm_message(&outcome.narrative));
        history.push("DM", &outcome.narrative);

        if !outcome.is_legal {
            world.context.append_section(
                "ACTION_FAILURE",
                &format!("Action by {character_name} ('{request}') broke the rules. No changes were made."),
            );
            self.hub.publish(&StreamEvent::Alert {
                data: format!("{character_name}'s action was not possible."),
            });
            return Ok(false);
        }

        self.apply_deltas(world, &outcome.deltas).await;
        self.audit(world, &outcome).await;
        self.after_action(world, history).await;
        self.hub.publish(&StreamEvent::EndOfTurn);

        Ok(kind == RequestKind::Action)
    }

    /// Stage 5 over a delta list, each isolated, with progress events.
    async fn apply_deltas(&self, world: &mut WorldState, deltas: &[DeltaInstruction]) {
        if deltas.is_empty() {
            world
                .context
                .append_section("ACTION_OUTCOMES", "No structural changes occurred.");
            return;
        }
        let total = deltas.len();
        for (current, delta) in deltas.iter().enumerate() {
            match self.apply_delta(world, delta).await {
                Ok(()) => {
                    self.hub.publish(&StreamEvent::Update {
                        object: format!("{} ({})", delta.name, delta.change),
                        total,
                        current: current + 1,
                    });
                    self.hub.publish(&StreamEvent::Alert {
                        data: format!("{}: {}", delta.name, delta.change),
                    });
                }
                Err(error) => {
                    tracing::warn!(%error, target = %delta.name, "delta did not apply");
                    self.hub.publish(&StreamEvent::Error {
                        data: format!("Change to {} did not apply: {error}", delta.name),
                    });
                }
            }
        }
    }

    /// Applies one delta copy-on-write: the replacement entity is fully
    /// built from the live state plus the change before anything is
    /// swapped, so a failed regeneration leaves the original untouched.
    async fn apply_delta(
        &self,
        world: &mut WorldState,
        delta: &DeltaInstruction,
    ) -> Result<(), EngineError> {
        validate_delta(delta)?;
        match delta.target {
            DeltaTarget::Character => self.apply_character_delta(world, delta).await,
            DeltaTarget::Scene => self.apply_scene_delta(world, delta).await,
        }
    }

    async fn apply_character_delta(
        &self,
        world: &mut WorldState,
        delta: &DeltaInstruction,
    ) -> Result<(), EngineError> {
        let roster = world.character_names();
        let resolved = closest_match(&delta.name, &roster)
            .map_err(|e| EngineError::UnknownEntity(e.to_string()))?
            .to_owned();
        let original = world
            .character(&resolved)
            .ok_or_else(|| EngineError::UnknownEntity(resolved.clone()))?
            .clone();
        let original_json = serde_json::to_string_pretty(&original)
            .map_err(|e| EngineError::Generation(e.to_string()))?;

        let prompt = prompts::character_update(&original_json, &delta.change);
        let updated =
            generate_object::<GeneratedCharacter>(self.service.as_ref(), &prompt, &self.language)
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
        let updated = updated.0;
        let died = original.alive && updated.current_health <= 0;

        world.replace_character(&resolved, updated)?;
        world.context.append_section(
            "CHARACTER_UPDATE",
            &format!("{resolved}: {}", delta.change),
        );
        world.event_log.record(
            self.clock.now(),
            "character_updated",
            json!({ "character": resolved, "change": delta.change }),
        );
        if died {
            world.event_log.record(
                self.clock.now(),
                "character_death",
                json!({ "character": resolved }),
            );
            self.hub.publish(&StreamEvent::Alert {
                data: format!("{resolved} has fallen."),
            });
        }
        Ok(())
    }

    async fn apply_scene_delta(
        &self,
        world: &mut WorldState,
        delta: &DeltaInstruction,
    ) -> Result<(), EngineError> {
        let original_json = serde_json::to_string_pretty(&world.scene)
            .map_err(|e| EngineError::Generation(e.to_string()))?;
        let prompt = prompts::scene_update(&original_json, &delta.change);
        let updated =
            generate_object::<GeneratedScene>(self.service.as_ref(), &prompt, &self.language)
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
        world.replace_scene(updated.0);
        world
            .context
            .append_section("SCENE_UPDATE", &format!("{}: {}", delta.name, delta.change));
        world.event_log.record(
            self.clock.now(),
            "scene_updated",
            json!({ "scene": delta.name, "change": delta.change }),
        );
        Ok(())
    }

    /// Stage 6: compare the intended outcome with the actual state and
    /// apply corrective deltas. A failed correction is logged and skipped,
    /// never re-audited.
    async fn audit(&self, world: &mut WorldState, outcome: &ActionOutcome) {
        let outcome_json = match serde_json::to_string_pretty(outcome) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%error, "audit skipped, outcome did not serialize");
                return;
            }
        };
        let prompt = prompts::audit(&outcome_json, &world.snapshot(None));
        let corrections =
            match generate_object::<CorrectionList>(self.service.as_ref(), &prompt, &self.language)
                .await
            {
                Ok(list) => list.corrections,
                Err(error) => {
                    tracing::warn!(%error, "audit pass failed, skipping corrections");
                    self.hub.publish(&StreamEvent::Error {
                        data: format!("Audit pass failed: {error}"),
                    });
                    return;
                }
            };
        if corrections.is_empty() {
            return;
        }

        tracing::info!(count = corrections.len(), "audit found discrepancies");
        world.event_log.record(
            self.clock.now(),
            "audit_found_discrepancies",
            json!({ "count": corrections.len(), "corrections": corrections }),
        );
        for correction in &corrections {
            match self.apply_delta(world, correction).await {
                Ok(()) => {
                    self.hub.publish(&StreamEvent::Alert {
                        data: format!("Audit correction — {}: {}", correction.name, correction.change),
                    });
                }
                Err(error) => {
                    tracing::warn!(%error, target = %correction.name, "audit correction did not apply");
                    world.event_log.record(
                        self.clock.now(),
                        "audit_correction_failed",
                        json!({ "target": correction.name, "error": error.to_string() }),
                    );
                }
            }
        }
    }

    /// Stage 7: mode recommendation and proactive world changes, each
    /// change isolated so one failure never aborts the rest.
    async fn after_action(&self, world: &mut WorldState, history: &mut MessageHistory) {
        let recent_narration = history.last_from("DM", 5);
        let prompt = prompts::after_action(
            world.mode.as_str(),
            &world.snapshot(None),
            &recent_narration,
        );
        let analysis =
            match generate_object::<AfterAction>(self.service.as_ref(), &prompt, &self.language)
                .await
            {
                Ok(analysis) => analysis,
                Err(error) => {
                    tracing::warn!(%error, "after-action analysis failed, world stays as it is");
                    return;
                }
            };

        self.controller
            .set_mode(world, analysis.recommended_mode)
            .await;

        if world.mode != GameMode::Narrative {
            return;
        }
        for change in &analysis.world_changes {
            if let Err(error) = self.apply_world_change(world, history, change).await {
                tracing::warn!(%error, kind = ?change.kind, "proactive world change failed");
                self.hub.publish(&StreamEvent::Error {
                    data: format!("A world change did not apply: {error}"),
                });
            }
        }
    }

    async fn apply_world_change(
        &self,
        world: &mut WorldState,
        history: &mut MessageHistory,
        change: &WorldChange,
    ) -> Result<(), EngineError> {
        match change.kind {
            WorldChangeKind::UpdateCharacter | WorldChangeKind::UpdateScene => {
                let delta = change.delta.as_ref().ok_or_else(|| {
                    EngineError::Validation("update change without a delta".to_owned())
                })?;
                self.apply_delta(world, delta).await?;
                self.hub.publish(&StreamEvent::Alert {
                    data: format!("The world shifts — {}: {}", delta.name, delta.change),
                });
            }
            WorldChangeKind::AddCharacter => {
                let character = self.generate_character(world, &change.description).await?;
                let name = character.name.clone();
                world.insert_character(character);
                world.event_log.record(
                    self.clock.now(),
                    "character_added",
                    json!({ "character": name, "description": change.description }),
                );
                self.hub.publish(&StreamEvent::Alert {
                    data: format!("A new character, {name}, appears: {}", change.description),
                });
            }
            WorldChangeKind::RemoveCharacter => {
                let roster = world.character_names();
                let resolved = closest_match(&change.description, &roster)
                    .map_err(|e| EngineError::UnknownEntity(e.to_string()))?
                    .to_owned();
                world.remove_character(&resolved)?;
                world.event_log.record(
                    self.clock.now(),
                    "character_removed",
                    json!({ "character": resolved }),
                );
                self.hub.publish(&StreamEvent::Alert {
                    data: format!("{resolved} leaves the scene."),
                });
            }
            WorldChangeKind::ChangeScene => {
                let prompt =
                    prompts::new_scene(&change.description, world.context.as_str());
                let scene = generate_object::<GeneratedScene>(
                    self.service.as_ref(),
                    &prompt,
                    &self.language,
                )
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
                let scene = scene.0;
                self.submit_illustration(&scene.name, &scene.description, IllustrationKind::Scene);
                world.event_log.record(
                    self.clock.now(),
                    "scene_changed",
                    json!({ "scene": scene.name }),
                );
                self.hub.publish(&StreamEvent::dm_message(&scene.description));
                history.push("DM", &scene.description);
                world
                    .context
                    .append_section("SCENE_CHANGE", &scene.description);
                world.replace_scene(scene);
            }
            WorldChangeKind::AdvancePlot => {
                world
                    .context
                    .append_section("PLOT_ADVANCEMENT", &change.description);
                world.event_log.record(
                    self.clock.now(),
                    "plot_advanced",
                    json!({ "note": change.description }),
                );
                self.hub.publish(&StreamEvent::Alert {
                    data: format!("The story moves on: {}", change.description),
                });
            }
        }
        Ok(())
    }

    /// Generates a brand-new character and queues its portrait.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Generation`] when the generation call fails;
    /// nothing is inserted in that case.
    pub async fn generate_character(
        &self,
        world: &WorldState,
        description: &str,
    ) -> Result<Character, EngineError> {
        let prompt = prompts::new_character(description, world.context.as_str());
        let character =
            generate_object::<GeneratedCharacter>(self.service.as_ref(), &prompt, &self.language)
                .await
                .map_err(|e| EngineError::Generation(e.to_string()))?;
        let character = character.0;
        self.submit_illustration(
            &character.name,
            &character.appearance,
            IllustrationKind::Character,
        );
        Ok(character)
    }

    fn submit_illustration(&self, name: &str, description: &str, kind: IllustrationKind) {
        if let Some(illustrations) = &self.illustrations {
            illustrations.enqueue(IllustrationRequest {
                name: name.to_owned(),
                description: description.to_owned(),
                kind,
            });
        }
    }
}

/// Enforces the relative/scoped delta contract before any generation
/// call is made.
fn validate_delta(delta: &DeltaInstruction) -> Result<(), EngineError> {
    if delta.name.trim().is_empty() {
        return Err(EngineError::Validation(
            "delta does not name a target entity".to_owned(),
        ));
    }
    if delta.change.trim().is_empty() {
        return Err(EngineError::Validation(
            "delta has an empty change description".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fableforge_core::clock::SystemClock;
    use fableforge_test_support::{ScriptedGenerator, drain, test_world};

    fn history() -> MessageHistory {
        MessageHistory::new(100)
    }

    fn pipeline(service: ScriptedGenerator, hub: &Arc<BroadcastHub>) -> ActionPipeline {
        ActionPipeline::new(
            Arc::clone(hub),
            Arc::new(service),
            Arc::new(SystemClock),
            &EngineConfig::default(),
            None,
        )
    }

    #[tokio::test]
    async fn test_unauthorized_combat_request_mutates_nothing() {
        let mut world = test_world();
        world.mode = GameMode::Combat;
        let hub = Arc::new(BroadcastHub::new(32));
        let pipeline = pipeline(ScriptedGenerator::default(), &hub);

        let bystander = world
            .character_names()
            .into_iter()
            .find(|name| Some(name.as_str()) != world.turn_order.active())
            .unwrap();
        let health_before: Vec<i32> =
            world.characters.iter().map(|c| c.current_health).collect();

        let error = pipeline
            .resolve(&mut world, &mut history(), &bystander, "I attack!")
            .await
            .unwrap_err();

        assert!(matches!(error, EngineError::NotYourTurn { .. }));
        let health_after: Vec<i32> =
            world.characters.iter().map(|c| c.current_health).collect();
        assert_eq!(health_before, health_after);
        assert!(world.event_log.is_empty());
    }

    #[tokio::test]
    async fn test_question_consumes_no_turn_and_no_deltas() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let hub = Arc::new(BroadcastHub::new(32));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "question" }));
        service.push_json(json!({
            "narrative": "Moss-hung trunks loom in every direction.",
            "is_legal": true,
            "deltas": [],
        }));
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
        let pipeline = pipeline(service, &hub);
        let queue = hub.register("l1", "Igor");

        let resolution = pipeline
            .resolve(&mut world, &mut history(), "Igor", "What do I see?")
            .await
            .unwrap();

        assert!(!resolution.consumed_turn);
        assert_eq!(world.mode, GameMode::Narrative);
        let events = drain(&queue);
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Message { sender, .. } if sender == "DM")));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Update { .. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::EndOfTurn)));
    }

    #[tokio::test]
    async fn test_illegal_action_applies_no_deltas() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let hub = Arc::new(BroadcastHub::new(32));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "You have no wings to grow.",
            "is_legal": false,
            "deltas": [],
        }));
        let pipeline = pipeline(service, &hub);
        let queue = hub.register("l1", "Igor");
        let health_before: Vec<i32> =
            world.characters.iter().map(|c| c.current_health).collect();

        let resolution = pipeline
            .resolve(&mut world, &mut history(), "Igor", "I grow wings and fly away")
            .await
            .unwrap();

        assert!(!resolution.consumed_turn);
        let health_after: Vec<i32> =
            world.characters.iter().map(|c| c.current_health).collect();
        assert_eq!(health_before, health_after);
        let events = drain(&queue);
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Alert { .. })));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::EndOfTurn)));
    }

    #[tokio::test]
    async fn test_hostile_combat_action_damages_and_advances() {
        let mut world = test_world();
        world.mode = GameMode::Combat;
        world.turn_order.reset(vec![
            "Igor".to_owned(),
            "Ent".to_owned(),
            "Olga".to_owned(),
        ]);
        let victim_health = world.character("Ent").unwrap().current_health;

        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "Attack Roll: 14 + 4 = 18 vs AC 12 -> Hit. The axe bites deep.",
            "is_legal": true,
            "deltas": [
                { "target": "character", "name": "Ent", "change": "decrease current_health by 7" },
            ],
        }));
        // Regenerated victim reflecting the damage.
        let mut hurt = world.character("Ent").unwrap().clone();
        hurt.current_health -= 7;
        service.push_json(serde_json::to_value(&hurt).unwrap());
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({ "recommended_mode": "COMBAT", "world_changes": [] }));
        let pipeline = pipeline(service, &hub);
        let queue = hub.register("l1", "Igor");

        let resolution = pipeline
            .resolve(&mut world, &mut history(), "Igor", "I attack the ent with my axe")
            .await
            .unwrap();

        assert!(resolution.consumed_turn);
        assert_eq!(
            world.character("Ent").unwrap().current_health,
            victim_health - 7
        );
        assert_eq!(world.turn_order.active(), Some("Ent"));
        let events = drain(&queue);
        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::Update { total: 1, current: 1, .. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::EndOfTurn)));
    }

    #[tokio::test]
    async fn test_overkill_damage_clamps_and_marks_dead() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "The ent splinters under the blow.",
            "is_legal": true,
            "deltas": [
                { "target": "character", "name": "Ent", "change": "decrease current_health by 999" },
            ],
        }));
        let mut dead = test_world().character("Ent").unwrap().clone();
        dead.current_health = -969;
        service.push_json(serde_json::to_value(&dead).unwrap());
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
        let pipeline = pipeline(service, &hub);

        pipeline
            .resolve(&mut world, &mut history(), "Igor", "I fell the ent")
            .await
            .unwrap();

        let ent = world.character("Ent").unwrap();
        assert_eq!(ent.current_health, 0);
        assert!(!ent.alive);
    }

    #[tokio::test]
    async fn test_failed_delta_preserves_entity_and_continues() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "A wild swing, then a careful thrust.",
            "is_legal": true,
            "deltas": [
                { "target": "character", "name": "Ent", "change": "decrease current_health by 4" },
                { "target": "character", "name": "Ent", "change": "decrease current_health by 2" },
            ],
        }));
        // First regeneration fails (no scripted response consumed by an
        // error push), second succeeds.
        service.push_error("upstream timeout");
        let mut hurt = world.character("Ent").unwrap().clone();
        hurt.current_health -= 2;
        service.push_json(serde_json::to_value(&hurt).unwrap());
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
        let pipeline = pipeline(service, &hub);
        let queue = hub.register("l1", "Igor");
        let before = world.character("Ent").unwrap().current_health;

        pipeline
            .resolve(&mut world, &mut history(), "Igor", "I strike twice")
            .await
            .unwrap();

        // Only the second delta landed; the failed one left the ent as it
        // was, and listeners were told.
        assert_eq!(world.character("Ent").unwrap().current_health, before - 2);
        let events = drain(&queue);
        assert!(events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));
        assert!(events.iter().any(|e| matches!(e, StreamEvent::EndOfTurn)));
    }

    #[tokio::test]
    async fn test_audit_corrections_flow_through_delta_application() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "The potion knits Igor's wounds.",
            "is_legal": true,
            "deltas": [],
        }));
        service.push_json(json!({
            "corrections": [
                { "target": "character", "name": "Igor", "change": "increase current_health by 8" },
            ],
        }));
        let mut healed = world.character("Igor").unwrap().clone();
        healed.current_health =
            (healed.current_health + 8).min(healed.max_health);
        let expected = healed.current_health;
        service.push_json(serde_json::to_value(&healed).unwrap());
        service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
        let pipeline = pipeline(service, &hub);

        pipeline
            .resolve(&mut world, &mut history(), "Igor", "I drink my potion")
            .await
            .unwrap();

        assert_eq!(world.character("Igor").unwrap().current_health, expected);
    }

    #[tokio::test]
    async fn test_after_action_adds_character_in_isolation() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        let roster_before = world.character_names().len();
        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "Your horn call echoes through the trees.",
            "is_legal": true,
            "deltas": [],
        }));
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({
            "recommended_mode": "NARRATIVE",
            "world_changes": [
                { "kind": "ADD_CHARACTER", "description": "A ranger drawn by the horn" },
                { "kind": "REMOVE_CHARACTER", "description": "No Such Person Anywhere" },
            ],
        }));
        service.push_json(json!({
            "name": "Mira",
            "max_health": 20,
            "current_health": 20,
            "defense": 13,
            "is_player": false,
        }));
        let pipeline = pipeline(service, &hub);

        pipeline
            .resolve(&mut world, &mut history(), "Igor", "I sound my horn")
            .await
            .unwrap();

        // The add landed; the bad remove failed alone without aborting.
        assert_eq!(world.character_names().len(), roster_before + 1);
        assert!(world.character("Mira").is_some());
    }

    #[tokio::test]
    async fn test_compaction_triggered_once_past_threshold() {
        let mut world = test_world();
        world.mode = GameMode::Narrative;
        for _ in 0..400 {
            world.context.append_section("ACTION_LOG", "another long stretch of marching words");
        }
        let hub = Arc::new(BroadcastHub::new(64));
        let service = ScriptedGenerator::default();
        service.push_json(json!({ "request_kind": "action" }));
        service.push_json(json!({
            "narrative": "You press on.",
            "is_legal": true,
            "deltas": [],
        }));
        service.push_json(json!({ "corrections": [] }));
        service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
        service.push_text("The party marches toward the ruin, tired but alive.");
        let before_words = world.context.word_count();
        let pipeline = pipeline(service, &hub);

        pipeline
            .resolve(&mut world, &mut history(), "Igor", "We keep walking")
            .await
            .unwrap();

        assert!(world.context.word_count() < before_words);
    }
}
