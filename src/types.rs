//! Shared types for the filestack content engine.
//!
//! Small enums and report structs used across the stores, plus the CLI
//! subcommand definitions.
use std::{fmt, path::PathBuf, str::FromStr};

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::FsError;

/// A specialized Result type for filestack operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Whether an item is a dated post or a standalone page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Page,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Page => "page",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(ItemKind::Post),
            "page" => Ok(ItemKind::Page),
            other => Err(FsError::parse(format!("unknown item type '{}'", other))),
        }
    }
}

/// Publication status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Visible,
    Hidden,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Visible => "visible",
            Status::Hidden => "hidden",
        }
    }
}

impl FromStr for Status {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visible" => Ok(Status::Visible),
            "hidden" => Ok(Status::Hidden),
            other => Err(FsError::parse(format!("unknown status '{}'", other))),
        }
    }
}

/// Catalog section, which is also the tag of the catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Post,
    Page,
    Trash,
}

impl Section {
    /// Search order used by slug lookups.
    pub const ALL: [Section; 3] = [Section::Post, Section::Page, Section::Trash];

    pub fn tag(self) -> &'static str {
        match self {
            Section::Post => "post",
            Section::Page => "page",
            Section::Trash => "trash",
        }
    }
}

impl From<ItemKind> for Section {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Post => Section::Post,
            ItemKind::Page => Section::Page,
        }
    }
}

/// What happens to content files when the trash is emptied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrashDisposal {
    /// Remove the files from disk.
    Delete,
    /// Move the files into an existing directory.
    MoveTo(PathBuf),
}

/// Summary of an empty-trash operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrashReport {
    /// Slugs whose catalog entries were removed
    pub removed: Vec<String>,
    /// Content files deleted, or their new location when moved
    pub files: Vec<PathBuf>,
}

/// A mismatch between the catalog and the posts directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Catalog entry whose content file does not exist
    MissingContent { slug: String, path: PathBuf },
    /// Content file that no catalog entry points to
    OrphanContent { path: PathBuf },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingContent { slug, path } => {
                write!(f, "{}: content file {} is missing", slug, path.display())
            }
            Violation::OrphanContent { path } => {
                write!(f, "{} has no catalog entry", path.display())
            }
        }
    }
}

/// Available subcommands for the filestack binary
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new hidden post or page with a generated slug
    New {
        /// Kind of item to create (post or page)
        #[clap(value_enum)]
        kind: ItemKind,
    },

    /// List catalog entries of one section
    List {
        /// Section to list
        #[clap(short, long, value_enum, default_value = "post")]
        section: Section,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Show a single item including its content
    Show {
        /// Slug of the item
        slug: String,
    },

    /// Edit an item; changing the name renames it
    Edit {
        /// Current slug of the item
        slug: String,

        /// New title
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New slug
        #[clap(short, long)]
        name: Option<String>,

        /// New status (visible or hidden)
        #[clap(short, long)]
        status: Option<String>,

        /// New date, formatted as "YYYY-MM-DD HH:MM:SS"
        #[clap(short, long)]
        date: Option<String>,

        /// Tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Categories (comma-separated)
        #[clap(short, long)]
        categories: Option<String>,

        /// Parent page slug, "0" for the menu root
        #[clap(short, long)]
        parent: Option<String>,

        /// Path to a file containing the new body
        #[clap(short = 'f', long)]
        content_file: Option<PathBuf>,
    },

    /// Move an item to the trash
    Trash {
        /// Slug of the item
        slug: String,
    },

    /// Restore an item from the trash
    Restore {
        /// Slug of the item
        slug: String,
    },

    /// Permanently remove trashed items
    EmptyTrash {
        /// Move content files into this directory instead of deleting them
        #[clap(short, long)]
        move_to: Option<PathBuf>,
    },

    /// Print the page menu
    Menu,

    /// Print the listing context for the index, a category or a tag as JSON
    Index {
        /// Only posts in this category
        #[clap(short, long)]
        category: Option<String>,

        /// Only posts with this tag
        #[clap(short, long)]
        tag: Option<String>,

        /// Zero-based page index
        #[clap(short, long, default_value_t = 0)]
        page: usize,
    },

    /// Check that catalog entries and content files match
    Verify,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_status_parse_case_insensitively() {
        assert_eq!("Page".parse::<ItemKind>().unwrap(), ItemKind::Page);
        assert_eq!(" VISIBLE ".parse::<Status>().unwrap(), Status::Visible);
        assert!("draft".parse::<Status>().is_err());
    }

    #[test]
    fn section_follows_kind() {
        assert_eq!(Section::from(ItemKind::Post).tag(), "post");
        assert_eq!(Section::ALL.map(Section::tag), ["post", "page", "trash"]);
    }
}
