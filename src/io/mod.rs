//! IO module - configuration and file handling.

mod config;

pub use config::{
    load_checkpoint, read_config, save_checkpoint, write_trajectory, LatticeConfig, ModelConfig,
    RunConfig,
};
