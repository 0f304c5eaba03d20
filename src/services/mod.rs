//! Domain Service: business rules over the entity store.
//!
//! Ownership scoping, the car/garage relationship invariant, and response
//! shaping (hyperlinks, list envelopes) all live here. Handlers validate
//! request shape and map these results onto HTTP.

pub mod cars;
pub mod garages;
pub mod users;

/// Terminal pagination marker, returned in place of a next-page URL.
pub const NO_MORE_RESULTS: &str = "No more results";
