//! Command-line front end over the catalog and the site view.
mod app;
mod args;

pub use app::*;
pub use args::*;
