pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::TomlConfig;
pub use core::assembler::EmailAssembler;
pub use core::engine::{MergeEngine, MergeMode, MergeRequest, MergeSummary};
pub use core::session::MergeSession;
pub use core::transform::Transform;
pub use utils::error::{MergeError, Result};
