//! Canonical world fixture and event-queue helpers.

use fableforge_broadcast::{ListenerQueue, StreamEvent};
use fableforge_world::{Character, GameMode, Scene, WorldState};

fn character(name: &str, health: i32, defense: i32, is_player: bool) -> Character {
    Character {
        name: name.to_owned(),
        max_health: health,
        current_health: health,
        defense,
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

/// A small session: two player characters, Igor and Olga, and one
/// non-player ent. Turn order follows insertion order.
#[must_use]
pub fn test_world() -> WorldState {
    WorldState::new(
        Scene::placeholder("A dripping forest clearing, half-light through the canopy."),
        vec![
            character("Igor", 20, 15, true),
            character("Olga", 18, 13, true),
            character("Ent", 30, 10, false),
        ],
        GameMode::Narrative,
        "Two wanderers have woken an ancient ent.",
        200,
    )
}

/// Empties a listener queue without awaiting, returning everything that
/// has been delivered so far.
#[must_use]
pub fn drain(queue: &ListenerQueue) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = queue.try_recv() {
        events.push(event);
    }
    events
}
