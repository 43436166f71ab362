//! Core data structure for filestack: the [`Item`].
//!
//! An item is a post or a page. Its metadata lives in the catalog and, together
//! with the body, in the item's own content file. Both files store it as a
//! record whose children are named after the item's fields; [`Field`] is the
//! single mapping between the two.
use std::{collections::BTreeSet, path::PathBuf};

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clean_csv, content_path, item_url, FsError, ItemKind, Record, Result, Status};

/// Root id of the page menu; pages without a parent hang here.
pub const ROOT_PARENT: &str = "0";

/// Timestamp layout of `Item::date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Item fields and the record tags that store them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Type,
    Name,
    Date,
    Title,
    Status,
    Url,
    Filepath,
    Parent,
    Tags,
    Categories,
    Trash,
    Content,
}

impl Field {
    /// Fields kept in the catalog, in the order they are written.
    pub const CATALOG: [Field; 11] = [
        Field::Type,
        Field::Name,
        Field::Date,
        Field::Title,
        Field::Status,
        Field::Url,
        Field::Filepath,
        Field::Parent,
        Field::Tags,
        Field::Categories,
        Field::Trash,
    ];

    /// Fields a record must carry to be read back as an item.
    pub const REQUIRED: [Field; 5] = [Field::Type, Field::Name, Field::Date, Field::Url, Field::Filepath];

    pub fn tag(self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Name => "name",
            Field::Date => "date",
            Field::Title => "title",
            Field::Status => "status",
            Field::Url => "url",
            Field::Filepath => "filepath",
            Field::Parent => "parent",
            Field::Tags => "tags",
            Field::Categories => "categories",
            Field::Trash => "trash",
            Field::Content => "content",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Field> {
        Field::CATALOG
            .into_iter()
            .chain([Field::Content])
            .find(|f| f.tag() == tag)
    }
}

/// Date parts derived from `Item::date` for templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub date_short: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub time: String,
}

impl DateParts {
    pub fn from_date(date: &str) -> Self {
        let date_short = date.get(..10).unwrap_or(date).to_string();
        let mut split = date_short.split('-');
        let mut next = || split.next().unwrap_or_default().to_string();
        let (year, month, day) = (next(), next(), next());
        let time = date.get(11..19).unwrap_or_default().to_string();
        Self {
            date_short,
            year,
            month,
            day,
            time,
        }
    }
}

/// Represents a single post or page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Slug, unique across the catalog
    pub name: String,
    /// Sortable timestamp, see [`DATE_FORMAT`]
    pub date: String,
    pub title: String,
    pub status: Status,
    pub url: String,
    /// Location of the content file; empty for legacy feed items
    pub filepath: PathBuf,
    /// Parent page slug or id, pages only
    pub parent: Option<String>,
    /// Body markup, loaded lazily from the content file
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub trash: bool,
    /// Numeric id from the legacy feed, used for menu parent links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<String>,
    /// Filled in by listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateParts>,
}

/// Validated edit payload from the form layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub date: NaiveDateTime,
    pub status: Status,
    pub name: String,
    /// Comma-separated, cleaned on conversion
    pub categories: String,
    /// Comma-separated, cleaned on conversion
    pub tags: String,
    pub content: String,
    /// Only used for pages
    pub parent: Option<String>,
}

impl Item {
    /// Reads an item from a catalog or content record.
    pub fn from_record(record: &Record) -> Result<Self> {
        for field in Field::REQUIRED {
            if record.child(field.tag()).is_none() {
                return Err(FsError::parse(format!(
                    "<{}> record is missing required field '{}'",
                    record.tag(),
                    field.tag()
                )));
            }
        }
        let text = |field: Field| record.field(field.tag()).unwrap_or_default();

        let date = text(Field::Date).to_string();
        let title = match record.field(Field::Title.tag()) {
            Some(title) => title.to_string(),
            None => date.clone(),
        };
        let status = match record.field(Field::Status.tag()) {
            Some(status) => status.parse()?,
            None => Status::Hidden,
        };
        let parent = Some(text(Field::Parent))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            kind: text(Field::Type).parse()?,
            name: text(Field::Name).to_string(),
            date,
            title,
            status,
            url: text(Field::Url).to_string(),
            filepath: PathBuf::from(text(Field::Filepath)),
            parent,
            content: text(Field::Content).to_string(),
            tags: split_list(text(Field::Tags)),
            categories: split_list(text(Field::Categories)),
            trash: text(Field::Trash).trim().eq_ignore_ascii_case("true"),
            legacy_id: None,
            dates: None,
        })
    }

    /// Builds a record tagged `tag` holding the catalog fields, plus the body
    /// when `with_content` is set.
    pub fn to_record(&self, tag: &str, with_content: bool) -> Record {
        let mut record = Record::new(tag);
        for field in Field::CATALOG {
            record.push_child(Record::leaf(field.tag(), self.field_text(field)));
        }
        if with_content {
            record.push_child(Record::leaf(Field::Content.tag(), self.content.as_str()));
        }
        record
    }

    fn field_text(&self, field: Field) -> String {
        match field {
            Field::Type => self.kind.as_str().to_string(),
            Field::Name => self.name.clone(),
            Field::Date => self.date.clone(),
            Field::Title => self.title.clone(),
            Field::Status => self.status.as_str().to_string(),
            Field::Url => self.url.clone(),
            Field::Filepath => self.filepath.to_string_lossy().into_owned(),
            Field::Parent => self.parent.clone().unwrap_or_default(),
            Field::Tags => join_list(&self.tags),
            Field::Categories => join_list(&self.categories),
            Field::Trash => self.trash.to_string(),
            Field::Content => self.content.clone(),
        }
    }

    /// Id used by the menu builder: the legacy id when present, else the slug.
    pub fn menu_id(&self) -> &str {
        self.legacy_id.as_deref().unwrap_or(&self.name)
    }

    /// Parent id for the menu builder, [`ROOT_PARENT`] when unset.
    pub fn menu_parent(&self) -> &str {
        self.parent
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(ROOT_PARENT)
    }

    /// Calendar date of the item, parsed from the first ten characters of `date`.
    pub fn day(&self) -> Result<NaiveDate> {
        parse_day(&self.date)
    }

    /// Visible status and a date that is not in the future.
    pub fn is_visible_at(&self, now: &str) -> bool {
        self.status == Status::Visible && self.date.as_str() <= now
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible_at(&now_string())
    }

    /// Returns the item with its date parts filled in.
    pub fn decorated(mut self) -> Self {
        self.dates = Some(DateParts::from_date(&self.date));
        self
    }

    /// Applies a validated edit to `original`, recomputing url and filepath.
    pub fn from_draft(draft: ItemDraft, original: &Item, posts_dir: &std::path::Path) -> Self {
        let date = draft.date.format(DATE_FORMAT).to_string();
        let day = draft.date.date();
        let parent = match original.kind {
            ItemKind::Page => draft.parent.filter(|p| !p.is_empty() && p != ROOT_PARENT),
            ItemKind::Post => None,
        };
        Self {
            kind: original.kind,
            url: item_url(day, &draft.name, original.kind),
            filepath: content_path(posts_dir, day, &draft.name),
            name: draft.name,
            date,
            title: draft.title,
            status: draft.status,
            parent,
            content: draft.content,
            tags: split_list(&clean_csv(&draft.tags)),
            categories: split_list(&clean_csv(&draft.categories)),
            trash: original.trash,
            legacy_id: None,
            dates: None,
        }
    }
}

/// Current UTC time in [`DATE_FORMAT`].
pub fn now_string() -> String {
    Utc::now().naive_utc().format(DATE_FORMAT).to_string()
}

/// Parses the `YYYY-MM-DD` prefix of an item date.
pub fn parse_day(date: &str) -> Result<NaiveDate> {
    let prefix = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .map_err(|e| FsError::parse(format!("invalid item date '{}': {}", date, e)))
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_list(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_item;
    use std::path::Path;

    #[test]
    fn record_round_trip_keeps_every_field() {
        let mut item = sample_item(ItemKind::Page, "about", "2012-03-04 05:06:07");
        item.parent = Some("home".into());
        item.content = "<p>hi</p>".into();

        let record = item.to_record("page", true);
        assert_eq!(Item::from_record(&record).unwrap(), item);
    }

    #[test]
    fn catalog_record_has_no_body() {
        let item = sample_item(ItemKind::Post, "a", "2012-03-04 05:06:07");
        let record = item.to_record("post", false);
        assert!(record.child("content").is_none());
        assert_eq!(record.field("tags"), Some("news,rust"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut record = Record::new("post");
        record.push_child(Record::leaf("name", "x"));
        assert!(Item::from_record(&record).is_err());
    }

    #[test]
    fn optional_fields_take_defaults() {
        let mut record = Record::new("post");
        for (tag, value) in [
            ("type", "post"),
            ("name", "x"),
            ("date", "2012-01-01 00:00:00"),
            ("url", "/x/"),
            ("filepath", "posts/20120101_x.xml"),
        ] {
            record.push_child(Record::leaf(tag, value));
        }
        let item = Item::from_record(&record).unwrap();
        assert_eq!(item.title, "2012-01-01 00:00:00");
        assert_eq!(item.status, Status::Hidden);
        assert!(!item.trash);
        assert!(item.tags.is_empty());
    }

    #[test]
    fn field_table_is_bidirectional() {
        for field in Field::CATALOG {
            assert_eq!(Field::from_tag(field.tag()), Some(field));
        }
        assert_eq!(Field::from_tag("content"), Some(Field::Content));
        assert_eq!(Field::from_tag("bogus"), None);
    }

    #[test]
    fn date_parts() {
        let parts = DateParts::from_date("2011-05-02 13:22:11");
        assert_eq!(parts.date_short, "2011-05-02");
        assert_eq!((parts.year.as_str(), parts.month.as_str(), parts.day.as_str()), ("2011", "05", "02"));
        assert_eq!(parts.time, "13:22:11");
    }

    #[test]
    fn visibility_needs_status_and_past_date() {
        let mut item = sample_item(ItemKind::Post, "a", "2012-03-04 05:06:07");
        assert!(item.is_visible_at("2012-03-04 05:06:07"));
        assert!(!item.is_visible_at("2012-03-04 05:06:06"));
        item.status = Status::Hidden;
        assert!(!item.is_visible_at("2099-01-01 00:00:00"));
    }

    #[test]
    fn draft_recomputes_identity() {
        let original = sample_item(ItemKind::Post, "old", "2012-03-04 05:06:07");
        let draft = ItemDraft {
            title: "New".into(),
            date: NaiveDate::from_ymd_opt(2013, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap(),
            status: Status::Visible,
            name: "new".into(),
            categories: "Life, life ,!Code".into(),
            tags: "".into(),
            content: "body".into(),
            parent: Some("ignored".into()),
        };
        let item = Item::from_draft(draft, &original, Path::new("posts"));
        assert_eq!(item.date, "2013-01-02 03:04:05");
        assert_eq!(item.url, "/2013/01/02/new/");
        assert_eq!(item.filepath, Path::new("posts").join("20130102_new.xml"));
        assert_eq!(item.parent, None);
        assert_eq!(
            item.categories.iter().map(String::as_str).collect::<Vec<_>>(),
            ["Code", "Life", "life"]
        );
    }

    #[test]
    fn menu_ids_prefer_legacy_id() {
        let mut page = sample_item(ItemKind::Page, "about", "2012-03-04 05:06:07");
        assert_eq!(page.menu_id(), "about");
        assert_eq!(page.menu_parent(), ROOT_PARENT);
        page.legacy_id = Some("12".into());
        page.parent = Some("3".into());
        assert_eq!(page.menu_id(), "12");
        assert_eq!(page.menu_parent(), "3");
    }
}
