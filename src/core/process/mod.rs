//! Process persistence and checkpointing

pub mod manager;

pub use manager::{save_checkpoint, ProcessCheckpoint, ProcessManager};
