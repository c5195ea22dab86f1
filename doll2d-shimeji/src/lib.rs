//! Desktop doll layer on top of [`doll2d`].
//!
//! An [`Overlay`] loads one skeleton definition from the paths in a [`DollConfig`], spawns any
//! number of [`Doll`]s sharing it, and drives them once per frame: pointer routing (hit-test and
//! the Idle/Held drag state machine), animation update, pose and world transform. Windowing,
//! click-through and GPU upload stay with the caller through [`PoseRenderer`] and
//! [`doll2d::TextureLoader`].

#![forbid(unsafe_code)]

mod config;
mod doll;
mod error;
mod input;
mod overlay;
mod render;

pub use config::*;
pub use doll::*;
pub use error::*;
pub use input::*;
pub use overlay::*;
pub use render::*;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod doll_tests;
