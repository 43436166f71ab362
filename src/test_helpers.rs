use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use crate::{content_path, item_url, parse_day, Catalog, Config, Item, ItemKind, Status};

/// A throwaway site: config pointing at a posts directory inside a temp dir.
/// The posts directory itself is not created.
pub struct TestSite {
    pub tmp: TempDir,
    pub config: Config,
}

impl TestSite {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            posts_dir: tmp.path().join("posts"),
            ..Config::default()
        };
        Self { tmp, config }
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.config.posts_dir.clone()
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::open(&self.config).unwrap()
    }

    /// Visible item whose content file lives in this site's posts directory.
    pub fn item_on_disk(&self, kind: ItemKind, name: &str, date: &str) -> Item {
        item_in(&self.config.posts_dir, kind, name, date)
    }

    /// Writes a legacy export built from `entries` and points the config at it.
    pub fn write_feed(&mut self, entries: &[String]) {
        fs::create_dir_all(&self.config.posts_dir).unwrap();
        fs::write(self.config.posts_dir.join("wp.xml"), legacy_feed_xml(entries)).unwrap();
        self.config.legacy_feed_file = Some("wp.xml".into());
    }
}

/// Visible item with a relative `posts/` content path.
pub fn sample_item(kind: ItemKind, name: &str, date: &str) -> Item {
    item_in(Path::new("posts"), kind, name, date)
}

fn item_in(posts_dir: &Path, kind: ItemKind, name: &str, date: &str) -> Item {
    let day = parse_day(date).unwrap();
    Item {
        kind,
        name: name.to_string(),
        date: date.to_string(),
        title: format!("Title {}", name),
        status: Status::Visible,
        url: item_url(day, name, kind),
        filepath: content_path(posts_dir, day, name),
        parent: None,
        content: String::new(),
        tags: ["news".to_string(), "rust".to_string()].into(),
        categories: ["life".to_string()].into(),
        trash: false,
        legacy_id: None,
        dates: None,
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// One `<item>` of a WordPress export.
pub fn legacy_entry(kind: &str, status: &str, id: &str, name: &str, date: &str, parent: &str) -> String {
    format!(
        "<item>\
         <title>Title {name}</title>\
         <link>http://old.example.com/{name}/</link>\
         <content:encoded><![CDATA[one\n\ntwo]]></content:encoded>\
         <category domain=\"post_tag\" nicename=\"rust\">rust</category>\
         <category domain=\"category\" nicename=\"life\">Life</category>\
         <wp:post_id>{id}</wp:post_id>\
         <wp:post_date>{date}</wp:post_date>\
         <wp:post_name>{name}</wp:post_name>\
         <wp:status>{status}</wp:status>\
         <wp:post_parent>{parent}</wp:post_parent>\
         <wp:post_type>{kind}</wp:post_type>\
         </item>"
    )
}

pub fn legacy_feed_xml(entries: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rss version=\"2.0\" \
         xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" \
         xmlns:wp=\"http://wordpress.org/export/1.0/\">\
         <channel><title>Old blog</title>{}</channel></rss>",
        entries.concat()
    )
}
