//! Stored document shapes for the three entity kinds.
//!
//! These are the exact JSONB bodies persisted by the adapter; entity ids
//! live outside the document, allocated by the store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    pub name: String,
    pub user_id: String,
}

/// Immutable owner reference stamped onto a car at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub user_id: String,
}

/// Car-side half of the garage relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarageKey {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarDoc {
    pub make: String,
    pub model: String,
    pub color: String,
    pub owner: OwnerRef,
    /// None means "not garaged"; serialized as an explicit null.
    pub garage: Option<GarageKey>,
}

/// Garage-side half of the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarKey {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageDoc {
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub cars: Vec<CarKey>,
}
