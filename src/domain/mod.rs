pub mod block_store;
pub mod drag;
pub mod error;
pub mod grid;
pub mod models;
pub mod segment_codec;
