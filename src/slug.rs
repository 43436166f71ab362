//! Slug, URL and content file path derivation.
//!
//! New items get a slug made from the creation timestamp. The content file
//! path is a pure function of the item's day and slug, so a collision with an
//! existing file is resolved by appending `0` to the slug (and to the display
//! timestamp, which keeps the two in step) until a free path is found.
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, error, trace};

use crate::{FsError, ItemKind, Result, DATE_FORMAT};

/// Upper bound on collision probing for a new slug.
pub const MAX_SLUG_ATTEMPTS: usize = 32;

/// Marker appended on every collision.
const COLLISION_SUFFIX: char = '0';

/// Identity of a freshly created item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    /// Display timestamp, also used as the item's date and title
    pub date: String,
    pub slug: String,
    pub filepath: PathBuf,
}

/// Replaces every character that is not an ASCII letter or digit with `repl`.
pub fn sanitize(dirty: &str, repl: char) -> String {
    dirty
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { repl })
        .collect()
}

/// Sanitizes a comma separated list: keeps letters, digits, spaces and commas,
/// trims each entry, drops empty and duplicate entries.
pub fn clean_csv(csv: &str) -> String {
    let filtered: String = csv
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == ',')
        .collect();
    let mut parts: Vec<&str> = Vec::new();
    for part in filtered.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    parts.join(",")
}

/// `{posts_dir}/{YYYYMMDD}_{slug}.xml`
pub fn content_path(posts_dir: &Path, day: NaiveDate, slug: &str) -> PathBuf {
    posts_dir.join(format!("{}_{}.xml", day.format("%Y%m%d"), slug))
}

/// Public URL of an item: dated for posts, flat for pages.
pub fn item_url(day: NaiveDate, slug: &str, kind: ItemKind) -> String {
    match kind {
        ItemKind::Post => format!(
            "/{:04}/{:02}/{:02}/{}/",
            day.year(),
            day.month(),
            day.day(),
            slug
        ),
        ItemKind::Page => format!("/{}/", slug),
    }
}

/// Derives a slug and content path for an item created at `now`.
///
/// `taken` reports whether a candidate slug or its content path is already
/// used. Probing stops after [`MAX_SLUG_ATTEMPTS`] candidates with [`FsError::SlugExhausted`].
pub fn new_identity(
    posts_dir: &Path,
    now: NaiveDateTime,
    taken: impl Fn(&str, &Path) -> bool,
) -> Result<NewIdentity> {
    let day = now.date();
    let mut date = now.format(DATE_FORMAT).to_string();
    let mut slug = sanitize(&now.format("%Y-%m-%d_%H:%M:%S").to_string(), '-');

    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let filepath = content_path(posts_dir, day, &slug);
        if !taken(slug.as_str(), &filepath) {
            debug!("Generated slug {} after {} collision(s)", slug, attempt);
            return Ok(NewIdentity {
                date,
                slug,
                filepath,
            });
        }
        trace!("Slug {} or content path {} is taken", slug, filepath.display());
        date.push(COLLISION_SUFFIX);
        slug.push(COLLISION_SUFFIX);
    }

    error!("No free slug for timestamp {}", now);
    Err(FsError::SlugExhausted {
        attempts: MAX_SLUG_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn sanitize_replaces_punctuation() {
        assert_eq!(sanitize("2012-03-04_05:06:07", '-'), "2012-03-04-05-06-07");
        assert_eq!(sanitize("héllo wörld", '_'), "h_llo_w_rld");
    }

    #[test]
    fn clean_csv_filters_and_dedupes() {
        assert_eq!(clean_csv(" rust, web!,rust,, a b "), "rust,web,a b");
        assert_eq!(clean_csv(""), "");
    }

    #[test]
    fn paths_and_urls() {
        let day = NaiveDate::from_ymd_opt(2012, 3, 4).unwrap();
        assert_eq!(
            content_path(Path::new("posts"), day, "hello"),
            Path::new("posts").join("20120304_hello.xml")
        );
        assert_eq!(item_url(day, "hello", ItemKind::Post), "/2012/03/04/hello/");
        assert_eq!(item_url(day, "about", ItemKind::Page), "/about/");
    }

    #[test]
    fn free_path_uses_plain_timestamp() {
        let id = new_identity(Path::new("p"), at(2012, 3, 4, 5, 6, 7), |_, _| false).unwrap();
        assert_eq!(id.slug, "2012-03-04-05-06-07");
        assert_eq!(id.date, "2012-03-04 05:06:07");
        assert_eq!(id.filepath, Path::new("p").join("20120304_2012-03-04-05-06-07.xml"));
    }

    #[test]
    fn collisions_append_zero_to_slug_and_date() {
        let dir = Path::new("p");
        let now = at(2012, 3, 4, 5, 6, 7);
        let taken: HashSet<PathBuf> = ["2012-03-04-05-06-07", "2012-03-04-05-06-070"]
            .iter()
            .map(|s| content_path(dir, now.date(), s))
            .collect();

        let id = new_identity(dir, now, |_, p| taken.contains(p)).unwrap();
        assert_eq!(id.slug, "2012-03-04-05-06-0700");
        assert_eq!(id.date, "2012-03-04 05:06:0700");
    }

    #[test]
    fn slugs_in_use_are_skipped_like_paths() {
        let now = at(2012, 3, 4, 5, 6, 7);
        let id = new_identity(Path::new("p"), now, |slug, _| slug == "2012-03-04-05-06-07").unwrap();
        assert_eq!(id.slug, "2012-03-04-05-06-070");
        assert_eq!(id.filepath, Path::new("p").join("20120304_2012-03-04-05-06-070.xml"));
    }

    #[test]
    fn probing_is_bounded() {
        let err = new_identity(Path::new("p"), at(2012, 3, 4, 5, 6, 7), |_, _| true).unwrap_err();
        assert!(matches!(err, FsError::SlugExhausted { attempts: MAX_SLUG_ATTEMPTS }));
    }
}
