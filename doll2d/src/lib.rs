//! Skeletal animation runtime for desktop dolls.
//!
//! Loads a legacy binary skeleton and its texture atlas, plays and crossfades animations on
//! tracks, and derives world transforms plus a draw list for an external renderer. The crate is
//! renderer-agnostic and IO-free; the desktop doll layer lives in `doll2d-shimeji`.

#![forbid(unsafe_code)]

mod atlas;
mod error;
mod model;
mod render;
mod runtime;

pub mod binary;

pub use atlas::*;
pub use binary::load_skeleton;
pub use error::*;
pub use model::*;
pub use render::*;
pub use runtime::*;

#[cfg(test)]
mod test_support;
