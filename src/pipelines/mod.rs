//! Render pipelines.
//!
//! - `basic` builds the lit model pipeline and the shared pipeline helper
//! - `background` draws the optional background image
//! - `light` holds the light uniform and its bind group

pub mod background;
pub mod basic;
pub mod light;
