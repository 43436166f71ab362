//! CLI module for the filestack binary
//!
//! Maps each subcommand onto the catalog or the merged site view and prints
//! the outcome.
use std::{fs::read_to_string, path::PathBuf};

use chrono::{NaiveDateTime, Utc};
use console::style;
use log::{error, info};

use crate::{
    sanitize, Catalog, Commands, Config, FsError, Item, ItemDraft, ItemKind, ListQuery, MenuEntry, Result,
    Section, Site, Status, TrashDisposal, DATE_FORMAT,
};

/// Field changes requested by `filestack edit`.
#[derive(Debug, Default)]
pub struct EditRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub tags: Option<String>,
    pub categories: Option<String>,
    pub parent: Option<String>,
    pub content_file: Option<PathBuf>,
}

/// CLI application handler: runs commands against one catalog
pub struct App {
    catalog: Catalog,
    config: Config,
    verbose: bool,
}

impl App {
    pub fn new(catalog: Catalog, config: Config, verbose: bool) -> Self {
        Self {
            catalog,
            config,
            verbose,
        }
    }

    pub fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::New { kind } => self.create_item(kind),
            Commands::List { section, json } => self.list_items(section, json),
            Commands::Show { slug } => self.show_item(&slug),
            Commands::Edit {
                slug,
                title,
                name,
                status,
                date,
                tags,
                categories,
                parent,
                content_file,
            } => self.edit_item(
                &slug,
                EditRequest {
                    title,
                    name,
                    status,
                    date,
                    tags,
                    categories,
                    parent,
                    content_file,
                },
            ),
            Commands::Trash { slug } => self.set_trash(&slug, true),
            Commands::Restore { slug } => self.set_trash(&slug, false),
            Commands::EmptyTrash { move_to } => self.empty_trash(move_to),
            Commands::Menu => self.print_menu(),
            Commands::Index { category, tag, page } => self.print_index(ListQuery { category, tag, page }),
            Commands::Verify => self.verify(),
        }
    }

    fn site(&self) -> Site<'_> {
        Site::new(&self.config, &self.catalog)
    }

    fn create_item(&self, kind: ItemKind) -> Result<()> {
        let item = self.catalog.create(kind, Utc::now().naive_utc())?;
        println!("Created {} {}", kind, style(&item.name).bold());
        println!("Content file: {}", item.filepath.display());
        Ok(())
    }

    fn list_items(&self, section: Section, json: bool) -> Result<()> {
        let items = self.catalog.list(section, None)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }
        if items.is_empty() {
            println!("No items in {}.", section.tag());
            return Ok(());
        }

        for item in &items {
            let status = match item.status {
                Status::Visible => style(item.status.as_str()).green(),
                Status::Hidden => style(item.status.as_str()).yellow(),
            };
            println!("{}  {:<8} {}  {}", item.date, status, style(&item.name).bold(), item.title);
            if self.verbose {
                println!("    {} -> {}", item.url, item.filepath.display());
            }
        }
        println!("\n{} item(s) in {}.", items.len(), section.tag());
        Ok(())
    }

    fn show_item(&self, slug: &str) -> Result<()> {
        let mut item = self.catalog.get(slug)?;
        item.content = self.catalog.load_content(&item, true)?;

        println!("Title:      {}", style(&item.title).bold());
        println!("Name:       {}", item.name);
        println!("Type:       {}", item.kind);
        println!("Date:       {}", item.date);
        println!("Status:     {}", item.status.as_str());
        println!("URL:        {}", item.url);
        if let Some(parent) = &item.parent {
            println!("Parent:     {}", parent);
        }
        if !item.tags.is_empty() {
            println!("Tags:       {}", style(join(&item.tags)).cyan());
        }
        if !item.categories.is_empty() {
            println!("Categories: {}", style(join(&item.categories)).cyan());
        }
        if item.trash {
            println!("{}", style("In trash").red());
        }
        if self.verbose {
            println!("File:       {}", item.filepath.display());
        }
        println!("\n{}", item.content);
        Ok(())
    }

    fn edit_item(&self, slug: &str, changes: EditRequest) -> Result<()> {
        info!("Editing {}", slug);
        let original = self.catalog.get(slug)?;

        let content = match &changes.content_file {
            Some(path) => read_to_string(path).map_err(|e| {
                error!("Failed to read {}: {}", path.display(), e);
                FsError::Io(e)
            })?,
            None => self.catalog.load_content(&original, true)?,
        };

        let date = match &changes.date {
            Some(raw) => parse_datetime(raw)?,
            // Collision suffixes can follow the seconds; the draft drops them.
            None => parse_datetime(original.date.get(..19).unwrap_or(&original.date))?,
        };

        let status = match &changes.status {
            Some(raw) => raw.parse()?,
            None => original.status,
        };

        let name = match &changes.name {
            Some(raw) => {
                let name = sanitize(raw.trim(), '-');
                if name.is_empty() {
                    return Err(FsError::parse("name must contain letters or digits"));
                }
                name
            }
            None => original.name.clone(),
        };

        let parent = match changes.parent {
            Some(parent) => {
                if original.kind == ItemKind::Page && !self.site().parent_choices(slug)?.contains(&parent) {
                    error!("{} is not a valid parent for {}", parent, slug);
                    return Err(FsError::NotFound { slug: parent });
                }
                Some(parent)
            }
            None => original.parent.clone(),
        };

        let draft = ItemDraft {
            title: changes.title.unwrap_or_else(|| original.title.clone()),
            date,
            status,
            name,
            categories: changes.categories.unwrap_or_else(|| join(&original.categories)),
            tags: changes.tags.unwrap_or_else(|| join(&original.tags)),
            content,
            parent,
        };
        let item = Item::from_draft(draft, &original, &self.config.posts_dir);
        self.catalog.replace(slug, &item)?;

        if item.name != slug {
            println!("Renamed {} to {}", slug, style(&item.name).bold());
        }
        println!("{} {} updated", item.kind, style(&item.name).bold());
        Ok(())
    }

    fn set_trash(&self, slug: &str, trashed: bool) -> Result<()> {
        let item = self.catalog.set_trash(slug, trashed)?;
        if trashed {
            println!("Moved {} to the trash", style(&item.name).bold());
        } else {
            println!("Restored {} {}", item.kind, style(&item.name).bold());
        }
        Ok(())
    }

    fn empty_trash(&self, move_to: Option<PathBuf>) -> Result<()> {
        let disposal = match move_to {
            Some(dir) => TrashDisposal::MoveTo(dir),
            None => TrashDisposal::Delete,
        };
        let report = self.catalog.empty_trash(&disposal)?;
        if report.removed.is_empty() {
            println!("The trash is empty.");
            return Ok(());
        }

        for (slug, file) in report.removed.iter().zip(&report.files) {
            match &disposal {
                TrashDisposal::Delete => println!("Deleted {} ({})", slug, file.display()),
                TrashDisposal::MoveTo(_) => println!("Moved {} to {}", slug, file.display()),
            }
        }
        println!("\n{} item(s) removed.", report.removed.len());
        Ok(())
    }

    fn print_menu(&self) -> Result<()> {
        let site = self.site();
        let menu = site.menu(site.feed()?.as_ref())?;
        if menu.is_empty() {
            println!("No visible pages.");
        }
        print_entries(&menu, 0);
        Ok(())
    }

    fn print_index(&self, query: ListQuery) -> Result<()> {
        let context = self.site().list_context(&query)?;
        println!("{}", serde_json::to_string_pretty(&context)?);
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        let violations = self.catalog.verify()?;
        if violations.is_empty() {
            println!("{}", style("Catalog and content files agree.").green());
            return Ok(());
        }

        for violation in &violations {
            println!("{} {}", style("!").red().bold(), violation);
        }
        Err(FsError::ConsistencyViolation {
            message: format!("{} problem(s) found", violations.len()),
        })
    }
}

fn print_entries(entries: &[MenuEntry], depth: usize) {
    for entry in entries {
        println!("{}{} ({})", "  ".repeat(depth), style(&entry.title).bold(), entry.slug);
        print_entries(&entry.children, depth + 1);
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| FsError::parse(format!("invalid date '{}': {}", raw, e)))
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values.into_iter().map(String::as_str).collect::<Vec<_>>().join(",")
}
