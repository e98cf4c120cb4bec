//! Source system adapters
//!
//! - [`JsonFileSource`] - JSON export of the source system
//! - [`InMemorySource`] - in-process entities (tests and demos)

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileSource;
pub use memory::InMemorySource;
pub use traits::SourceSystem;
