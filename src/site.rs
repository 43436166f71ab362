//! Merges the catalog and the legacy feed into the item streams the site shows.
//!
//! Posts come from the catalog plus legacy posts dated on or before
//! `Config::legacy_end_date`; pages come from both sources without a cutoff.
//! The functions here also assemble the [`SiteContext`] the template layer
//! renders for listing, detail and admin views.
use std::{collections::BTreeSet, ops::Range};

use chrono::NaiveDate;
use log::{debug, info};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::{
    flatten, now_string, parse_day, Catalog, Config, FamilyTree, FsError, Item, ItemKind,
    LegacyFeed, MenuEntry, Result, Section, ROOT_PARENT,
};

/// Previous and next page indices of a listing, `None` at either end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Slice bounds and neighbours of page `page` (zero-based) in a stream of
/// `total` items, `per_page` at a time.
pub fn paginate(total: usize, page: usize, per_page: usize) -> (Range<usize>, Pagination) {
    let start = page.saturating_mul(per_page).min(total);
    let end = page.saturating_add(1).saturating_mul(per_page).min(total);
    let pagination = Pagination {
        prev: page.checked_sub(1),
        next: if page.saturating_add(1).saturating_mul(per_page) >= total {
            None
        } else {
            Some(page + 1)
        },
    };
    (start..end, pagination)
}

/// Union of the categories of `posts`.
pub fn categories(posts: &[Item]) -> BTreeSet<String> {
    posts
        .iter()
        .flat_map(|p| p.categories.iter().cloned())
        .collect()
}

/// First item whose name ends with `slug`, ignoring case.
pub fn find_in<'a>(items: &'a [Item], slug: &str) -> Option<&'a Item> {
    let slug = slug.to_uppercase();
    items.iter().find(|i| i.name.to_uppercase().ends_with(&slug))
}

/// Site-wide settings exposed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct SiteInfo {
    pub name: String,
    pub motto: String,
    pub description: String,
    pub keywords: String,
}

/// Everything a page template receives.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub site: SiteInfo,
    pub title: String,
    pub now: String,
    pub posts: Vec<Item>,
    pub pages: Vec<Item>,
    pub trash: Vec<Item>,
    pub menu: Vec<MenuEntry>,
    pub categories: BTreeSet<String>,
    pub recent: Vec<Item>,
    pub random: Vec<Item>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub post: Option<Item>,
}

impl SiteContext {
    fn new(config: &Config, now: String) -> Self {
        Self {
            site: SiteInfo {
                name: config.site_name.clone(),
                motto: config.site_motto.clone(),
                description: config.site_description.clone(),
                keywords: config.site_keywords.clone(),
            },
            title: config.site_title.clone(),
            now,
            posts: Vec::new(),
            pages: Vec::new(),
            trash: Vec::new(),
            menu: Vec::new(),
            categories: BTreeSet::new(),
            recent: Vec::new(),
            random: Vec::new(),
            prev: None,
            next: None,
            post: None,
        }
    }
}

/// Request parameters of a post listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub page: usize,
}

/// Read side of the site over a catalog and the optional legacy feed.
pub struct Site<'a> {
    config: &'a Config,
    catalog: &'a Catalog,
}

impl<'a> Site<'a> {
    pub fn new(config: &'a Config, catalog: &'a Catalog) -> Self {
        Self { config, catalog }
    }

    /// Parses the legacy feed afresh.
    pub fn feed(&self) -> Result<Option<LegacyFeed>> {
        LegacyFeed::load(self.config)
    }

    /// Catalog posts and legacy posts up to the cutoff that pass `filter`,
    /// newest first.
    pub fn posts(&self, feed: Option<&LegacyFeed>, filter: &dyn Fn(&Item) -> bool) -> Result<Vec<Item>> {
        let mut posts = self.catalog.list(Section::Post, Some(filter))?;
        if let Some(feed) = feed {
            let cutoff = self.config.legacy_end_date;
            let keep = |item: &Item| on_or_before(item, cutoff) && filter(item);
            posts.extend(feed.items(ItemKind::Post, Some(&keep))?);
            posts.sort_by(|a, b| b.date.cmp(&a.date));
        }
        Ok(posts)
    }

    /// Catalog pages followed by legacy pages, both passing `filter`.
    pub fn pages(&self, feed: Option<&LegacyFeed>, filter: &dyn Fn(&Item) -> bool) -> Result<Vec<Item>> {
        let mut pages = self.catalog.list(Section::Page, Some(filter))?;
        if let Some(feed) = feed {
            pages.extend(feed.items(ItemKind::Page, Some(filter))?);
        }
        Ok(pages)
    }

    /// Menu over visible catalog pages and every legacy page.
    pub fn menu(&self, feed: Option<&LegacyFeed>) -> Result<Vec<MenuEntry>> {
        let now = now_string();
        let visible = |item: &Item| item.is_visible_at(&now);
        let mut pages = self.catalog.list(Section::Page, Some(&visible))?;
        if let Some(feed) = feed {
            pages.extend(feed.items(ItemKind::Page, None)?);
        }
        FamilyTree::from_pages(&pages).build()
    }

    /// Context for the index, a category or a tag listing.
    ///
    /// This method:
    /// 1. Merges visible catalog posts with legacy posts up to the cutoff,
    ///    keeping those that match the category and tag filters
    /// 2. Slices out page `query.page` and loads the bodies of that slice only
    /// 3. Fills menu, recent, random and categories from the unfiltered stream
    ///
    /// # Arguments
    ///
    /// * `query` - Optional category and tag filters plus the zero-based page
    ///
    /// # Returns
    ///
    /// The assembled context, with `prev` / `next` set for paging, or
    /// [`FsError::EmptyPage`] when the page holds no posts
    pub fn list_context(&self, query: &ListQuery) -> Result<SiteContext> {
        info!(
            "Listing page {} (category: {:?}, tag: {:?})",
            query.page, query.category, query.tag
        );
        let feed = self.feed()?;
        let now = now_string();
        let visible = |item: &Item| item.is_visible_at(&now);
        let matches = |item: &Item| {
            visible(item)
                && query.category.as_ref().map_or(true, |c| item.categories.contains(c))
                && query.tag.as_ref().map_or(true, |t| item.tags.contains(t))
        };

        let all = self.posts(feed.as_ref(), &matches)?;
        let (range, pagination) = paginate(all.len(), query.page, self.config.posts_per_page);
        if range.is_empty() {
            return Err(FsError::EmptyPage { page: query.page });
        }
        let mut shown = all[range].to_vec();
        for item in &mut shown {
            item.content = self.catalog.load_content(item, false)?;
        }

        let mut context = SiteContext::new(self.config, now.clone());
        self.assemble(&mut context, feed.as_ref(), &visible)?;
        context.posts = shown;
        context.prev = pagination.prev;
        context.next = pagination.next;
        if let Some(tag) = &query.tag {
            context.title.push_str(&format!(" - Tagged {}", tag));
        } else if let Some(category) = &query.category {
            context.title.push_str(&format!(" - Category {}", category));
        }
        Ok(context)
    }

    /// Context for a single post or page.
    ///
    /// Legacy items are searched only when there is no date hint or the hint
    /// is on or before the cutoff. The slug matches case-insensitively as a
    /// suffix of the item name.
    pub fn detail_context(&self, kind: ItemKind, slug: &str, date_hint: Option<NaiveDate>) -> Result<SiteContext> {
        info!("Showing {} {}", kind, slug);
        let feed = self.feed()?;
        let now = now_string();
        let visible = |item: &Item| item.is_visible_at(&now);

        let mut items = self.catalog.list(Section::from(kind), Some(&visible))?;
        if let Some(feed) = &feed {
            if date_hint.map_or(true, |day| day <= self.config.legacy_end_date) {
                items.extend(feed.items(kind, None)?);
            }
        }
        let mut item = find_in(&items, slug).cloned().ok_or_else(|| FsError::NotFound {
            slug: slug.to_string(),
        })?;
        item.content = self.catalog.load_content(&item, false)?;

        let mut context = SiteContext::new(self.config, now.clone());
        self.assemble(&mut context, feed.as_ref(), &visible)?;
        context.title.push_str(&format!(" - {}", item.title));
        context.post = Some(item);
        Ok(context)
    }

    /// Context for the admin overview: every catalog post, page and trashed item.
    pub fn admin_context(&self) -> Result<SiteContext> {
        let mut context = SiteContext::new(self.config, now_string());
        context.posts = self.catalog.list(Section::Post, None)?;
        context.pages = self.catalog.list(Section::Page, None)?;
        context.trash = self.catalog.list(Section::Trash, None)?;
        Ok(context)
    }

    /// Parent candidates for the page `slug`: the root plus every visible
    /// catalog page in menu order, except the page itself.
    pub fn parent_choices(&self, slug: &str) -> Result<Vec<String>> {
        let now = now_string();
        let visible = |item: &Item| item.is_visible_at(&now);
        let pages = self.catalog.list(Section::Page, Some(&visible))?;
        let menu = FamilyTree::from_pages(&pages).build()?;

        let mut choices = vec![ROOT_PARENT.to_string()];
        choices.extend(flatten(&menu).into_iter().filter(|s| s != slug));
        Ok(choices)
    }

    /// Fills the parts every public page shares: posts, menu, recent,
    /// random and categories.
    fn assemble(&self, context: &mut SiteContext, feed: Option<&LegacyFeed>, visible: &dyn Fn(&Item) -> bool) -> Result<()> {
        let posts = self.posts(feed, visible)?;
        let per_page = self.config.posts_per_page;
        context.menu = self.menu(feed)?;
        context.recent = posts.iter().take(per_page).cloned().collect();
        context.random = posts
            .choose_multiple(&mut rand::thread_rng(), per_page)
            .cloned()
            .collect();
        context.categories = categories(&posts);
        debug!("Assembled context over {} visible post(s)", posts.len());
        context.posts = posts;
        Ok(())
    }
}

fn on_or_before(item: &Item, cutoff: NaiveDate) -> bool {
    parse_day(&item.date).is_ok_and(|day| day <= cutoff)
}
