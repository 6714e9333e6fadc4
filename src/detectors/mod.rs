//! Falling wedge detection stages
//!
//! Data flows strictly top-down through these modules:
//!
//! - **pivots**: significant highs and lows over a symmetric window
//! - **volume**: trailing volume ratio and volume profile of a window
//! - **lines**: two-point trend-line candidates addressed by index pairs
//! - **validator**: geometric and temporal checks for one (upper, lower) pair
//! - **search**: exhaustive walk over every pair combination

pub mod helpers;

pub mod lines;
pub mod pivots;
pub mod search;
pub mod validator;
pub mod volume;

// Re-export for convenience
pub use helpers::*;
pub use lines::*;
pub use pivots::*;
pub use search::*;
pub use validator::*;
pub use volume::*;
