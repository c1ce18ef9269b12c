//! The active scene and its interactable background objects.

use serde::{Deserialize, Serialize};

/// A background entity characters can interact with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Name of the object.
    pub name: String,
    /// What it looks like and how it can be used.
    pub description: String,
}

/// The single active scene of a session.
///
/// Replacing the scene is an atomic swap through the pipeline, never a
/// partial edit from outside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name.
    pub name: String,
    /// Descriptive text shown to players.
    pub description: String,
    /// Rough physical size, free text.
    #[serde(default)]
    pub size: String,
    /// Interactable background objects.
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Difficulty of the scene, 0-20.
    #[serde(default)]
    pub difficulty: u8,
}

impl Scene {
    /// A minimal placeholder used before the first generated scene lands.
    #[must_use]
    pub fn placeholder(description: &str) -> Self {
        Self {
            name: "Opening".to_owned(),
            description: description.to_owned(),
            size: String::new(),
            objects: Vec::new(),
            difficulty: 0,
        }
    }
}
