//! Content file store: one XML file per item holding metadata and body.
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::{debug, error, info, trace};

use crate::{content_path, load_item_from_file, write_atomic, Document, Field, FsError, Item, Result};

/// Tag of the root record of every content file.
pub const CONTENT_TAG: &str = "item";

/// Body given to freshly created items.
pub const PLACEHOLDER_CONTENT: &str = "Add content <b>here</b>...";

/// Reads and writes content files under the posts directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    posts_dir: PathBuf,
}

impl ContentStore {
    pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
        }
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    /// Deterministic content file location for (day, slug).
    pub fn content_path(&self, day: NaiveDate, slug: &str) -> PathBuf {
        content_path(&self.posts_dir, day, slug)
    }

    /// Writes the item, body included, to `item.filepath`.
    pub fn write(&self, item: &Item) -> Result<()> {
        info!("Writing content file for {}: {}", item.name, item.filepath.display());
        let xml = item.to_record(CONTENT_TAG, true).to_xml()?;
        write_atomic(&item.filepath, xml.as_bytes())
    }

    /// Full item stored in a content file.
    pub fn read(&self, path: &Path) -> Result<Item> {
        load_item_from_file(path)
    }

    /// Returns the item's body, reading it from disk when the item carries
    /// none or `force` is set. A missing file yields an empty body.
    pub fn load(&self, item: &Item, force: bool) -> Result<String> {
        if !force && !item.content.is_empty() {
            trace!("Using cached content for {}", item.name);
            return Ok(item.content.clone());
        }
        if item.filepath.as_os_str().is_empty() || !item.filepath.exists() {
            debug!("No content file for {}", item.name);
            return Ok(String::new());
        }
        let document = Document::from_file(&item.filepath)?;
        Ok(document
            .root
            .field(Field::Content.tag())
            .unwrap_or_default()
            .to_string())
    }

    /// Deletes a content file. Its absence means the catalog and the posts
    /// directory disagree.
    pub fn remove(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            let message = format!("content file {} does not exist", path.display());
            error!("{}", message);
            return Err(FsError::ConsistencyViolation { message });
        }
        debug!("Deleting content file: {}", path.display());
        fs::remove_file(path).map_err(|e| {
            error!("Failed to delete content file {}: {}", path.display(), e);
            FsError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_item, TestSite};
    use crate::{ErrorKind, ItemKind};

    #[test]
    fn write_then_read_round_trips() {
        let site = TestSite::new();
        let store = ContentStore::new(site.posts_dir());
        let mut item = site.item_on_disk(ItemKind::Post, "hello", "2012-03-04 05:06:07");
        item.content = "<p>first</p>\n\n<p>second</p>".into();
        store.write(&item).unwrap();

        assert_eq!(store.read(&item.filepath).unwrap(), item);
        let mut stripped = item.clone();
        stripped.content.clear();
        assert_eq!(store.load(&stripped, false).unwrap(), item.content);
    }

    #[test]
    fn load_prefers_cached_body_unless_forced() {
        let site = TestSite::new();
        let store = ContentStore::new(site.posts_dir());
        let mut item = site.item_on_disk(ItemKind::Post, "hello", "2012-03-04 05:06:07");
        item.content = "on disk".into();
        store.write(&item).unwrap();

        item.content = "in memory".into();
        assert_eq!(store.load(&item, false).unwrap(), "in memory");
        assert_eq!(store.load(&item, true).unwrap(), "on disk");
    }

    #[test]
    fn missing_file_loads_as_empty_body() {
        let item = sample_item(ItemKind::Post, "ghost", "2012-03-04 05:06:07");
        let store = ContentStore::new("nowhere");
        let mut bodiless = item.clone();
        bodiless.content.clear();
        assert_eq!(store.load(&bodiless, false).unwrap(), "");
    }

    #[test]
    fn removing_a_missing_file_is_a_consistency_violation() {
        let site = TestSite::new();
        let store = ContentStore::new(site.posts_dir());
        let err = store.remove(&site.posts_dir().join("nope.xml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
    }
}
