//! OpenRouteService directions client.
//!
//! Requests driving routes with optional avoid-polygons and classifies failures
//! into the planner error taxonomy.

pub mod client;

pub use client::{OrsClient, OrsConfig};
