//! Hand pose data and confidence gating.

pub mod gate;
pub mod landmark;
