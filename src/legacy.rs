//! Read-only adapter over a WordPress export (WXR) file.
//!
//! The export is an RSS document whose `channel/item` entries carry most of
//! their data in the `wp:` and `content:` namespaces. Entries are mapped to the
//! same [`Item`] shape the catalog produces so both sources can be merged.
//! Nothing is cached: every [`LegacyFeed::load`] parses the file again.
use std::{collections::BTreeMap, path::PathBuf};

use log::{debug, info, warn};

use crate::{Config, Document, Item, ItemKind, Record, Result, Status};

const WP: &str = "wp";
const CONTENT: &str = "content";

/// Category domain that marks a tag rather than a category.
const TAG_DOMAIN: &str = "post_tag";

/// Blank lines in legacy bodies become this invisible spacer.
const PARAGRAPH_SPACER: &str = "<hr class='hr_0' style='visibility:hidden;'/>";

/// A parsed legacy export.
#[derive(Debug, Clone)]
pub struct LegacyFeed {
    document: Document,
    dedupe_by_date: bool,
}

impl LegacyFeed {
    /// Loads the feed named in `config`. Returns `None` when no feed is
    /// configured or the file does not exist.
    pub fn load(config: &Config) -> Result<Option<Self>> {
        let Some(path) = config.legacy_feed_path() else {
            return Ok(None);
        };
        if !path.exists() {
            warn!("Legacy feed {} does not exist", path.display());
            return Ok(None);
        }
        let document = Document::from_file(&path)?;
        info!("Loaded legacy feed {}", path.display());
        Ok(Some(Self {
            document,
            dedupe_by_date: config.legacy_dedupe_by_date,
        }))
    }

    pub fn parse(xml: &str, dedupe_by_date: bool) -> Result<Self> {
        Ok(Self {
            document: Document::parse(xml)?,
            dedupe_by_date,
        })
    }

    /// Published (or scheduled) entries of `kind` passing `predicate`, newest first.
    pub fn items(&self, kind: ItemKind, predicate: Option<&dyn Fn(&Item) -> bool>) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        for record in self.entries(kind) {
            let item = self.to_item(record, kind);
            if predicate.map_or(true, |keep| keep(&item)) {
                items.push(item);
            }
        }
        debug!("Legacy feed yielded {} {}(s)", items.len(), kind);
        Ok(items)
    }

    fn entries(&self, kind: ItemKind) -> Vec<&Record> {
        let ns = &self.document.namespaces;
        let Some(channel) = self.document.root.child("channel") else {
            warn!("Legacy feed has no <channel>");
            return Vec::new();
        };

        let published = channel.children_named("item").filter(|record| {
            let wp = record.ns(ns, WP);
            wp.field("post_type") == Some(kind.as_str())
                && matches!(wp.field("status"), Some("publish") | Some("future"))
        });
        let post_date = |record: &Record| record.ns(ns, WP).field("post_date").unwrap_or_default().to_string();

        if self.dedupe_by_date {
            // Later entries replace earlier ones with the same date.
            let by_date: BTreeMap<String, &Record> = published.map(|r| (post_date(r), r)).collect();
            by_date.into_values().rev().collect()
        } else {
            let mut records: Vec<&Record> = published.collect();
            records.sort_by_key(|r| std::cmp::Reverse(post_date(r)));
            records
        }
    }

    fn to_item(&self, record: &Record, kind: ItemKind) -> Item {
        let ns = &self.document.namespaces;
        let wp = record.ns(ns, WP);
        let text = |value: Option<&str>| value.unwrap_or_default().to_string();

        let mut item = Item {
            kind,
            name: text(wp.field("post_name")),
            date: text(wp.field("post_date")),
            title: text(record.field("title")),
            status: Status::Visible,
            url: text(record.field("link")),
            filepath: PathBuf::new(),
            parent: None,
            content: clean_content(record.ns(ns, CONTENT).field("encoded").unwrap_or_default()),
            tags: Default::default(),
            categories: Default::default(),
            trash: false,
            legacy_id: None,
            dates: None,
        };

        for category in record.children_named("category") {
            let value = category.text().to_string();
            if category.attribute("domain") == Some(TAG_DOMAIN) {
                item.tags.insert(value);
            } else {
                item.categories.insert(value);
            }
        }

        if kind == ItemKind::Page {
            item.parent = wp.field("post_parent").map(str::to_string);
            item.legacy_id = wp.field("post_id").map(str::to_string);
        }
        item.decorated()
    }
}

fn clean_content(content: &str) -> String {
    content.replace("\n\n", PARAGRAPH_SPACER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{legacy_entry, legacy_feed_xml, TestSite};
    use std::fs;

    fn feed(dedupe: bool) -> LegacyFeed {
        let xml = legacy_feed_xml(&[
            legacy_entry("post", "publish", "1", "first", "2009-01-01 10:00:00", "0"),
            legacy_entry("post", "draft", "2", "draft", "2009-02-01 10:00:00", "0"),
            legacy_entry("post", "future", "3", "later", "2009-03-01 10:00:00", "0"),
            legacy_entry("post", "publish", "4", "same-day", "2009-01-01 10:00:00", "0"),
            legacy_entry("page", "publish", "5", "about", "2008-01-01 10:00:00", "0"),
            legacy_entry("page", "publish", "6", "team", "2008-02-01 10:00:00", "5"),
        ]);
        LegacyFeed::parse(&xml, dedupe).unwrap()
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn selects_published_entries_newest_first() {
        let posts = feed(true).items(ItemKind::Post, None).unwrap();
        assert_eq!(names(&posts), ["later", "same-day"]);
    }

    #[test]
    fn dedupe_can_be_disabled() {
        let posts = feed(false).items(ItemKind::Post, None).unwrap();
        assert_eq!(names(&posts), ["later", "first", "same-day"]);
    }

    #[test]
    fn maps_entries_to_items() {
        let posts = feed(true).items(ItemKind::Post, None).unwrap();
        let post = &posts[0];
        assert_eq!(post.title, "Title later");
        assert_eq!(post.url, "http://old.example.com/later/");
        assert_eq!(post.status, Status::Visible);
        assert_eq!(post.content, format!("one{}two", PARAGRAPH_SPACER));
        assert!(post.tags.contains("rust"));
        assert!(post.categories.contains("Life"));
        assert!(!post.categories.contains("rust"));
        assert_eq!(post.parent, None);
        assert_eq!(post.dates.as_ref().unwrap().year, "2009");
    }

    #[test]
    fn pages_carry_ids_for_the_menu() {
        let pages = feed(true).items(ItemKind::Page, None).unwrap();
        assert_eq!(names(&pages), ["team", "about"]);
        assert_eq!(pages[0].legacy_id.as_deref(), Some("6"));
        assert_eq!(pages[0].parent.as_deref(), Some("5"));
    }

    #[test]
    fn predicate_filters_mapped_items() {
        let only_about = |i: &Item| i.name == "about";
        let pages = feed(true).items(ItemKind::Page, Some(&only_about)).unwrap();
        assert_eq!(names(&pages), ["about"]);
    }

    #[test]
    fn load_is_optional() {
        let mut site = TestSite::new();
        assert!(LegacyFeed::load(&site.config).unwrap().is_none());

        site.config.legacy_feed_file = Some("wp.xml".into());
        assert!(LegacyFeed::load(&site.config).unwrap().is_none());

        fs::create_dir_all(site.posts_dir()).unwrap();
        fs::write(site.posts_dir().join("wp.xml"), legacy_feed_xml(&[])).unwrap();
        let loaded = LegacyFeed::load(&site.config).unwrap().unwrap();
        assert!(loaded.items(ItemKind::Post, None).unwrap().is_empty());
    }
}
