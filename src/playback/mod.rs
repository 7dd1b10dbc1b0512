//! Replay of decoded clips: interval queries and time-driven interpolation.

mod interval_tree;
mod player;

pub use interval_tree::IntervalTree;
pub use player::{ClipPlayer, PlaybackFrame, PlayerState, calculate_elapsed_time};
