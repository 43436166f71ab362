//! Page menu built from flat parent links.
//!
//! Every page names its parent by id (a catalog slug or a legacy post id);
//! pages without a parent hang below [`ROOT_PARENT`]. Sibling order is the
//! order in which pages were added.
use std::collections::HashMap;

use log::{error, trace};
use serde::Serialize;

use crate::{FsError, Item, Result, ROOT_PARENT};

/// One menu node: a page and its sub-pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub title: String,
    pub slug: String,
    pub children: Vec<MenuEntry>,
}

#[derive(Debug, Clone)]
struct Member {
    title: String,
    slug: String,
    id: String,
}

/// Adjacency map from parent id to its child pages.
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    members: HashMap<String, Vec<Member>>,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut tree = Self::new();
        for page in pages {
            tree.add(page.menu_parent(), page.menu_id(), &page.title, &page.name);
        }
        tree
    }

    /// Appends a page below `parent`.
    pub fn add(&mut self, parent: &str, id: &str, title: &str, slug: &str) {
        trace!("Menu: {} ({}) under {}", slug, id, parent);
        self.members.entry(parent.to_string()).or_default().push(Member {
            title: title.to_string(),
            slug: slug.to_string(),
            id: id.to_string(),
        });
    }

    /// The sub-tree below `id`; empty for leaves and unknown ids.
    ///
    /// Fails with [`FsError::MenuCycle`] when an id reappears below itself.
    pub fn children(&self, id: &str) -> Result<Vec<MenuEntry>> {
        let mut path = vec![id.to_string()];
        self.expand(id, &mut path)
    }

    /// The whole menu, starting at the root.
    pub fn build(&self) -> Result<Vec<MenuEntry>> {
        self.children(ROOT_PARENT)
    }

    fn expand(&self, id: &str, path: &mut Vec<String>) -> Result<Vec<MenuEntry>> {
        let Some(members) = self.members.get(id) else {
            return Ok(Vec::new());
        };
        let mut entries = Vec::with_capacity(members.len());
        for member in members {
            if path.contains(&member.id) {
                error!("Page {} is its own ancestor", member.id);
                return Err(FsError::MenuCycle {
                    id: member.id.clone(),
                });
            }
            path.push(member.id.clone());
            let children = self.expand(&member.id, path)?;
            path.pop();
            entries.push(MenuEntry {
                title: member.title.clone(),
                slug: member.slug.clone(),
                children,
            });
        }
        Ok(entries)
    }
}

/// Slugs of a menu in pre-order.
pub fn flatten(menu: &[MenuEntry]) -> Vec<String> {
    let mut slugs = Vec::new();
    for entry in menu {
        slugs.push(entry.slug.clone());
        slugs.extend(flatten(&entry.children));
    }
    slugs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, slug: &str, children: Vec<MenuEntry>) -> MenuEntry {
        MenuEntry {
            title: title.into(),
            slug: slug.into(),
            children,
        }
    }

    #[test]
    fn builds_nested_menu_in_insertion_order() {
        let mut tree = FamilyTree::new();
        tree.add("0", "a", "A", "a");
        tree.add("0", "b", "B", "b");
        tree.add("a", "c", "C", "c");

        assert_eq!(
            tree.build().unwrap(),
            vec![
                entry("A", "a", vec![entry("C", "c", vec![])]),
                entry("B", "b", vec![]),
            ]
        );
    }

    #[test]
    fn leaves_and_unknown_ids_have_no_children() {
        let mut tree = FamilyTree::new();
        tree.add("0", "a", "A", "a");
        assert!(tree.children("a").unwrap().is_empty());
        assert!(tree.children("missing").unwrap().is_empty());
        assert!(FamilyTree::new().build().unwrap().is_empty());
    }

    #[test]
    fn legacy_ids_link_parents() {
        let mut tree = FamilyTree::new();
        tree.add("0", "5", "About", "about");
        tree.add("5", "6", "Team", "team");
        tree.add("6", "7", "Alice", "alice");
        let menu = tree.build().unwrap();
        assert_eq!(flatten(&menu), ["about", "team", "alice"]);
    }

    #[test]
    fn cycles_are_reported() {
        let mut tree = FamilyTree::new();
        tree.add("0", "a", "A", "a");
        // A second page reusing id "a" below "a" loops back onto itself.
        tree.add("a", "a", "Echo", "echo");
        assert!(matches!(tree.build(), Err(FsError::MenuCycle { id }) if id == "a"));
    }

    #[test]
    fn unreachable_loops_are_ignored() {
        let mut tree = FamilyTree::new();
        tree.add("x", "y", "Y", "y");
        tree.add("y", "x", "X", "x");
        assert!(tree.build().unwrap().is_empty());
    }

    #[test]
    fn flatten_is_pre_order() {
        let menu = vec![
            entry("A", "a", vec![entry("C", "c", vec![entry("D", "d", vec![])])]),
            entry("B", "b", vec![]),
        ];
        assert_eq!(flatten(&menu), ["a", "c", "d", "b"]);
        assert!(flatten(&[]).is_empty());
    }
}
