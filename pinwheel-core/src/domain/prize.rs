//! Prize catalog

use serde::{Deserialize, Serialize};

/// A prize the daily draw can award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
}

impl Prize {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Built-in catalog, used when settings.json doesn't override it.
/// The winner row snapshots prize id + name, so later catalog edits never
/// rewrite history.
pub fn default_catalog() -> Vec<Prize> {
    vec![
        Prize::new("sticker-pack", "Sticker Pack"),
        Prize::new("tee", "Pin Wheel Tee"),
        Prize::new("hoodie", "GRIT Hoodie"),
        Prize::new("hat", "Dad Hat"),
        Prize::new("deck", "Skate Deck"),
    ]
}
