//! Filestack: a flat-file content engine for a small blog
//!
//! Posts and pages live as one XML content file each, indexed by a single XML
//! catalog. A read-only WordPress export can be merged in as a legacy source,
//! and pages form a menu through their parent links.

mod catalog;
mod cli;
mod config;
mod content;
mod errors;
mod helper;
mod item;
mod legacy;
mod menu;
mod record;
mod site;
mod slug;
mod types;

#[cfg(test)]
mod test_helpers;

// Re-export key components
pub use catalog::*;
pub use cli::*;
pub use config::*;
pub use content::*;
pub use errors::*;
pub use helper::*;
pub use item::*;
pub use legacy::*;
pub use menu::*;
pub use record::*;
pub use site::*;
pub use slug::*;
pub use types::*;
