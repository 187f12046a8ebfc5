//! Provider clients built on the wayfarer request engine
//!
//! Each provider exposes the same three logical operations - directions,
//! isochrones, distance matrix - as thin parameter-marshaling methods over
//! [`wayfarer_core::Router`]. Adding a provider means writing the parameter
//! builders and, where the API embeds rate-limit notices in bodies, a
//! [`wayfarer_core::RateLimitMarker`]; the engine itself stays untouched.

pub mod convert;
pub mod graphhopper;

pub use graphhopper::{
    Algorithm, DirectionsOptions, Graphhopper, GraphhopperRateLimit, IsochronesOptions,
    MatrixOptions, DEFAULT_BASE_URL,
};
