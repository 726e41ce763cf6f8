//! HTTP admission surface: signed control-plane endpoints plus health.

pub mod admission;
pub mod health;
