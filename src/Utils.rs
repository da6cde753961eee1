//! different utility modules used throughout the project
/// tiny module to initialize console/file logging
pub mod logger;
/// dataset loading, synthetic trajectory generation and train/test splitting
pub mod dataset;
/// tiny module to plot trajectories and surrogate overlays
pub mod plots;
