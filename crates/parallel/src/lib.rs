//! # SurtGrid Parallel
//!
//! Execution strategies and tile geometry for block-wise raster generation.
//!
//! This crate provides:
//! - `Executor`: row-parallel evaluation with rayon (sequential fallback
//!   when the `parallel` feature is off)
//! - `TileIterator` and `working_tile_size` for memory-bounded tiling

pub mod strategy;
pub mod tiled;

pub use strategy::{Executor, ParallelStrategy, ProcessingMode};
pub use tiled::{working_tile_size, Tile, TileIterator, DEFAULT_TILE_BUDGET};
