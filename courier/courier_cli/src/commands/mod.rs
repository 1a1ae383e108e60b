//! CLI subcommands

pub mod config;
pub mod invoke;
pub mod shm;
