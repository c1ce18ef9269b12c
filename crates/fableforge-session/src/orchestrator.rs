//! The session coordinator.
//!
//! A single task owns the world state and processes one command at a
//! time, so no two pipeline runs ever execute concurrently against the
//! same store and nothing else holds a write path. Callers talk to it
//! through [`SessionHandle`] over an mpsc channel with oneshot replies.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use fableforge_broadcast::{BroadcastHub, ListenerQueue, StreamEvent};
use fableforge_core::clock::Clock;
use fableforge_core::config::EngineConfig;
use fableforge_core::error::EngineError;
use fableforge_generation::{GenerationService, IllustrationGenerator};
use fableforge_world::{Character, GameMode, MessageHistory, WorldState};

use crate::controller::TurnController;
use crate::pipeline::ActionPipeline;

/// Commands the coordinator accepts.
pub enum SessionCommand {
    /// A participant submits a free-text request for their character.
    Interact {
        character: String,
        text: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    /// A listener connects; the reply carries its event queue.
    Connect {
        listener_id: String,
        character: String,
        reply: oneshot::Sender<Arc<ListenerQueue>>,
    },
    /// A listener disconnects. In-flight work keeps running; only the
    /// channel goes away.
    Disconnect { listener_id: String },
    /// Full structured game state.
    Snapshot {
        reply: oneshot::Sender<serde_json::Value>,
    },
    /// The character currently holding the turn.
    ActiveCharacter {
        reply: oneshot::Sender<Option<Character>>,
    },
    /// Generates and adds a new player character from a description.
    CreateCharacter {
        description: String,
        reply: oneshot::Sender<Result<Character, EngineError>>,
    },
    /// Removes a character from play by exact name.
    RemoveCharacter {
        name: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
}

/// Cloneable handle for sending commands to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Submits a participant request and waits for the pipeline verdict.
    ///
    /// # Errors
    ///
    /// Propagates the pipeline's error, or [`EngineError::SessionClosed`]
    /// when the coordinator is gone.
    pub async fn interact(&self, character: &str, text: &str) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Interact {
                character: character.to_owned(),
                text: text.to_owned(),
                reply,
            })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)?
    }

    /// Registers a listener and returns its event queue. The current
    /// lock state is replayed privately onto the queue first thing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] when the coordinator is
    /// gone.
    pub async fn connect(
        &self,
        listener_id: &str,
        character: &str,
    ) -> Result<Arc<ListenerQueue>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Connect {
                listener_id: listener_id.to_owned(),
                character: character.to_owned(),
                reply,
            })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    /// Deregisters a listener's queue; best-effort.
    pub async fn disconnect(&self, listener_id: &str) {
        let _ = self
            .tx
            .send(SessionCommand::Disconnect {
                listener_id: listener_id.to_owned(),
            })
            .await;
    }

    /// Full structured game state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] when the coordinator is
    /// gone.
    pub async fn snapshot(&self) -> Result<serde_json::Value, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    /// The character currently holding the turn, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionClosed`] when the coordinator is
    /// gone.
    pub async fn active_character(&self) -> Result<Option<Character>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::ActiveCharacter { reply })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    /// Generates a new player character from a description and adds it to
    /// the session.
    ///
    /// # Errors
    ///
    /// Propagates generation failure, or [`EngineError::SessionClosed`]
    /// when the coordinator is gone.
    pub async fn create_character(&self, description: &str) -> Result<Character, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::CreateCharacter {
                description: description.to_owned(),
                reply,
            })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)?
    }

    /// Removes a character from play.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEntity`] for an unknown name, or
    /// [`EngineError::SessionClosed`] when the coordinator is gone.
    pub async fn remove_character(&self, name: &str) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::RemoveCharacter {
                name: name.to_owned(),
                reply,
            })
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)?
    }
}

/// The coordinator itself: world state, pipeline, and command loop.
pub struct Session {
    world: WorldState,
    history: MessageHistory,
    pipeline: ActionPipeline,
    hub: Arc<BroadcastHub>,
    config: EngineConfig,
}

impl Session {
    #[must_use]
    pub fn new(
        world: WorldState,
        config: EngineConfig,
        service: Arc<dyn GenerationService>,
        clock: Arc<dyn Clock>,
        hub: Arc<BroadcastHub>,
        illustrations: Option<IllustrationGenerator>,
    ) -> Self {
        let pipeline = ActionPipeline::new(
            Arc::clone(&hub),
            service,
            clock,
            &config,
            illustrations,
        );
        Self {
            world,
            history: MessageHistory::new(config.message_history_capacity),
            pipeline,
            hub,
            config,
        }
    }

    /// Spawns the coordinator task and returns a handle to it.
    #[must_use]
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(self.run(rx));
        SessionHandle { tx }
    }

    /// The coordinator loop. Announces the opening scene, then processes
    /// commands one at a time until every handle is dropped. A combat
    /// wait for the active participant is bounded by the turn timeout;
    /// on expiry the turn is force-advanced with a system notice, so the
    /// session never deadlocks on an unresponsive participant.
    ///
    /// The deadline is anchored to the turn itself and re-armed only when
    /// the active character changes. Unrelated traffic on the command
    /// channel, such as snapshot queries or listeners connecting, must
    /// not postpone it.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        let opening = self.world.scene.description.clone();
        self.hub.publish(&StreamEvent::dm_message(&opening));
        self.history.push("DM", &opening);
        self.allow_current_turn().await;

        let mut armed_for = self.combat_turn_key();
        let mut deadline = self.arm_deadline(armed_for.is_some());
        loop {
            let command = if let Some(at) = deadline {
                match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(command) => command,
                    Err(_) => {
                        self.force_advance().await;
                        armed_for = self.combat_turn_key();
                        deadline = self.arm_deadline(armed_for.is_some());
                        continue;
                    }
                }
            } else {
                rx.recv().await
            };
            match command {
                Some(command) => self.handle(command).await,
                None => break,
            }
            let key = self.combat_turn_key();
            if key != armed_for {
                armed_for = key;
                deadline = self.arm_deadline(armed_for.is_some());
            }
        }
        tracing::info!("session coordinator stopped");
    }

    /// Identity of the combat turn the deadline is armed for; `None`
    /// outside combat or with an empty turn order.
    fn combat_turn_key(&self) -> Option<String> {
        if self.world.mode == GameMode::Combat {
            self.world.turn_order.active().map(str::to_owned)
        } else {
            None
        }
    }

    fn arm_deadline(&self, armed: bool) -> Option<tokio::time::Instant> {
        armed.then(|| tokio::time::Instant::now() + self.config.turn_timeout)
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Interact {
                character,
                text,
                reply,
            } => {
                self.history.push(&character, &text);
                self.hub.publish(&StreamEvent::Message {
                    data: text.clone(),
                    sender: character.clone(),
                });
                // Freeze input while the request resolves.
                self.hub
                    .publish(&StreamEvent::lock_all(self.world.mode.as_str()));

                let result = self
                    .pipeline
                    .resolve(&mut self.world, &mut self.history, &character, &text)
                    .await;
                if let Err(error) = &result {
                    tracing::warn!(%error, character, "interaction failed");
                    if !error.is_private() {
                        self.hub.publish(&StreamEvent::Error {
                            data: error.to_string(),
                        });
                    }
                }
                self.allow_current_turn().await;
                let _ = reply.send(result.map(|_| ()));
            }
            SessionCommand::Connect {
                listener_id,
                character,
                reply,
            } => {
                let queue = self.hub.register(&listener_id, &character);
                // Late joiners see the current authorization state right
                // away instead of waiting for the next turn.
                self.hub.publish_to(
                    &listener_id,
                    &StreamEvent::Lock {
                        allowed_players: TurnController::allowed_actors(&self.world),
                        game_mode: self.world.mode.as_str().to_owned(),
                    },
                );
                let _ = reply.send(queue);
            }
            SessionCommand::Disconnect { listener_id } => {
                self.hub.unregister(&listener_id);
            }
            SessionCommand::Snapshot { reply } => {
                let acting = self.world.turn_order.active().map(str::to_owned);
                let _ = reply.send(self.world.snapshot(acting.as_deref()));
            }
            SessionCommand::ActiveCharacter { reply } => {
                let active = self
                    .world
                    .turn_order
                    .active()
                    .and_then(|name| self.world.character(name))
                    .cloned();
                let _ = reply.send(active);
            }
            SessionCommand::CreateCharacter { description, reply } => {
                let result = self
                    .pipeline
                    .generate_character(&self.world, &description)
                    .await
                    .map(|mut character| {
                        character.is_player = true;
                        character.normalize_vitals();
                        self.world.insert_character(character.clone());
                        self.hub.publish(&StreamEvent::Alert {
                            data: format!("{} joins the adventure.", character.name),
                        });
                        character
                    });
                let _ = reply.send(result);
                self.pipeline.controller().broadcast_lock(&self.world);
            }
            SessionCommand::RemoveCharacter { name, reply } => {
                let result = self.world.remove_character(&name).map(|removed| {
                    self.hub.publish(&StreamEvent::Alert {
                        data: format!("{} leaves the adventure.", removed.name),
                    });
                });
                let _ = reply.send(result);
                self.pipeline.controller().broadcast_lock(&self.world);
            }
        }
    }

    /// Announces the timeout and passes the turn to the next entry.
    async fn force_advance(&mut self) {
        if let Some(active) = self.world.turn_order.active() {
            tracing::info!(character = %active, "combat turn timed out");
            self.hub.publish(&StreamEvent::Alert {
                data: format!("{active} took too long. The turn passes."),
            });
        }
        TurnController::advance(&mut self.world);
        self.allow_current_turn().await;
    }

    /// Settles whose turn it is and broadcasts the lock.
    ///
    /// In combat this skips dead entries with a notice and plays
    /// non-player turns automatically until a living player holds the
    /// turn (bounded so a roster of corpses and NPCs cannot spin
    /// forever). In narrative mode every living player is allowed.
    async fn allow_current_turn(&mut self) {
        if self.world.mode == GameMode::Combat {
            let mut budget = self.world.turn_order.len().saturating_mul(2);
            while budget > 0 {
                budget -= 1;
                let Some(active) = self.world.turn_order.active().map(str::to_owned) else {
                    break;
                };
                let Some(character) = self.world.character(&active) else {
                    TurnController::advance(&mut self.world);
                    continue;
                };
                if !character.alive {
                    self.hub.publish(&StreamEvent::Alert {
                        data: format!("{active} is unable to take a turn."),
                    });
                    TurnController::advance(&mut self.world);
                    continue;
                }
                if character.is_player {
                    break;
                }
                if let Err(error) = self
                    .pipeline
                    .npc_turn(&mut self.world, &mut self.history)
                    .await
                {
                    tracing::warn!(%error, character = %active, "non-player turn failed");
                    self.hub.publish(&StreamEvent::Error {
                        data: format!("{active}'s turn could not be resolved: {error}"),
                    });
                }
                if self.world.mode != GameMode::Combat {
                    // The after-action phase ended the combat.
                    break;
                }
                TurnController::advance(&mut self.world);
            }
        }
        self.pipeline.controller().broadcast_lock(&self.world);
    }
}
