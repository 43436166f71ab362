//! The catalog: a single XML index listing every post, page and trashed item.
//!
//! Each mutation reads the whole catalog, changes it in memory and rewrites the
//! whole file through a temporary file and an atomic rename. Mutations are
//! serialized by a lock owned by the [`Catalog`]; the lock is per process, so
//! two processes sharing one catalog are not coordinated.
//!
//! Catalog entries and content files are kept in pairs: every insert and
//! replace writes both, every permanent removal deletes (or moves) both.
use std::{
    collections::HashSet,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::NaiveDateTime;
use log::{debug, error, info, trace, warn};
use walkdir::WalkDir;

use crate::{
    item_url, new_identity, write_atomic, Config, ContentStore, Document, Field, FsError, Item, ItemKind,
    Record, Result, Section, Status, TrashDisposal, TrashReport, Violation, PLACEHOLDER_CONTENT,
};

/// Tag of the catalog's root record.
pub const CATALOG_TAG: &str = "catalog";

/// Format version written into new catalogs.
pub const CATALOG_VERSION: &str = "0.1";

/// Manages the catalog file and the content files it points to.
pub struct Catalog {
    /// Location of the catalog file
    path: PathBuf,

    /// Content files live next to the catalog
    content: ContentStore,

    /// Files in the posts directory that belong to neither (e.g. the legacy export)
    foreign_files: Vec<PathBuf>,

    /// Serializes read-modify-rewrite cycles
    lock: Mutex<()>,
}

impl Catalog {
    /// Opens the catalog described by `config`.
    ///
    /// This constructor:
    /// 1. Creates the posts directory if it is missing
    /// 2. Writes an empty `<catalog version="0.1"/>` if there is no catalog yet
    /// 3. Otherwise parses the existing catalog and checks its root tag
    ///
    /// A malformed catalog is never replaced.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the posts directory, the catalog file name and
    ///   the legacy feed file that `verify` must ignore
    ///
    /// # Returns
    ///
    /// The opened catalog, or `DirectoryError` / `Parse` / `Io` on failure
    pub fn open(config: &Config) -> Result<Self> {
        let posts_dir = config.posts_dir.clone();
        let path = config.catalog_path();
        info!("Opening catalog: {}", path.display());

        if !posts_dir.exists() {
            debug!("Posts directory does not exist, creating: {}", posts_dir.display());
            fs::create_dir_all(&posts_dir).map_err(|e| {
                error!("Failed to create posts directory: {}", e);
                FsError::DirectoryError {
                    path: posts_dir.clone(),
                }
            })?;
        }

        let catalog = Self {
            path,
            content: ContentStore::new(posts_dir),
            foreign_files: config.legacy_feed_path().into_iter().collect(),
            lock: Mutex::new(()),
        };

        if !catalog.path.exists() {
            info!("Creating empty catalog at {}", catalog.path.display());
            let mut root = Record::new(CATALOG_TAG);
            root.set_attribute("version", CATALOG_VERSION);
            catalog.write_root(&root)?;
        } else {
            catalog.read_root()?;
        }

        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| FsError::LockAcquisitionFailed {
            message: format!("Failed to acquire catalog lock for {}", self.path.display()),
        })
    }

    fn read_root(&self) -> Result<Record> {
        let document = Document::from_file(&self.path)?;
        if document.root.tag() != CATALOG_TAG {
            let message = format!(
                "{} has root <{}>, expected <{}>",
                self.path.display(),
                document.root.tag(),
                CATALOG_TAG
            );
            error!("{}", message);
            return Err(FsError::Parse { message });
        }
        Ok(document.root)
    }

    fn write_root(&self, root: &Record) -> Result<()> {
        trace!("Rewriting catalog with {} entries", root.children().len());
        let xml = root.to_xml()?;
        write_atomic(&self.path, xml.as_bytes())
    }

    /// Runs `op` on the in-memory catalog under the lock and persists the
    /// result if `op` succeeds. On error nothing is written.
    fn mutate<T>(&self, op: impl FnOnce(&mut Record) -> Result<T>) -> Result<T> {
        let _guard = self.lock()?;
        let mut root = self.read_root()?;
        let value = op(&mut root)?;
        self.write_root(&root)?;
        Ok(value)
    }

    /// Looks up the item named `slug` in the post, page and trash sections.
    pub fn find(&self, slug: &str) -> Result<Option<Item>> {
        debug!("Looking up item: {}", slug);
        let root = self.read_root()?;
        locate(&root, slug)
            .map(|index| Item::from_record(&root.children()[index]))
            .transpose()
    }

    /// Like [`Catalog::find`], but a missing slug is an error.
    pub fn get(&self, slug: &str) -> Result<Item> {
        self.find(slug)?.ok_or_else(|| FsError::NotFound {
            slug: slug.to_string(),
        })
    }

    /// Items of one section passing `predicate`, newest first.
    ///
    /// Items sharing a date keep their catalog order.
    pub fn list(&self, section: Section, predicate: Option<&dyn Fn(&Item) -> bool>) -> Result<Vec<Item>> {
        let root = self.read_root()?;
        let mut items = Vec::new();
        for record in root.children_named(section.tag()) {
            let item = Item::from_record(record)?;
            if predicate.map_or(true, |keep| keep(&item)) {
                items.push(item.decorated());
            }
        }
        items.sort_by(|a, b| b.date.cmp(&a.date));
        trace!("Listed {} {} item(s)", items.len(), section.tag());
        Ok(items)
    }

    /// Adds a new item: catalog entry plus content file.
    pub fn insert(&self, item: &Item) -> Result<()> {
        info!("Inserting {} {}", item.kind, item.name);
        let _guard = self.lock()?;
        let mut root = self.read_root()?;
        if locate(&root, &item.name).is_some() {
            warn!("Cannot insert {}: name already in use", item.name);
            return Err(FsError::NameCollision {
                name: item.name.clone(),
            });
        }
        root.push_child(item.to_record(section_of(item).tag(), false));
        self.write_paired(&root, item)?;
        info!("Item inserted: {}", item.name);
        Ok(())
    }

    /// Creates a hidden item with a generated slug and placeholder body.
    pub fn create(&self, kind: ItemKind, now: NaiveDateTime) -> Result<Item> {
        info!("Creating new {}", kind);
        let _guard = self.lock()?;
        let mut root = self.read_root()?;

        let identity = new_identity(self.content.posts_dir(), now, |slug, path| {
            path.exists() || locate(&root, slug).is_some()
        })?;

        let item = Item {
            kind,
            url: item_url(now.date(), &identity.slug, kind),
            name: identity.slug,
            title: identity.date.clone(),
            date: identity.date,
            status: Status::Hidden,
            filepath: identity.filepath,
            parent: None,
            content: PLACEHOLDER_CONTENT.to_string(),
            tags: Default::default(),
            categories: Default::default(),
            trash: false,
            legacy_id: None,
            dates: None,
        };

        root.push_child(item.to_record(section_of(&item).tag(), false));
        self.write_paired(&root, &item)?;
        info!("Created {} {}", kind, item.name);
        Ok(item)
    }

    /// Writes the content file of a new entry, then the catalog holding it.
    /// If the catalog write fails the new content file is removed again.
    fn write_paired(&self, root: &Record, item: &Item) -> Result<()> {
        self.content.write(item)?;
        if let Err(e) = self.write_root(root) {
            warn!("Catalog write failed, removing {}", item.filepath.display());
            if let Err(cleanup) = fs::remove_file(&item.filepath) {
                error!("Failed to remove {}: {}", item.filepath.display(), cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the item named `old_slug` with `item`, which may carry a new
    /// name, date or body. This is the save operation of the edit form.
    ///
    /// Steps, in order:
    /// 1. Rejects a rename onto a name held by another entry
    /// 2. Looks up `old_slug` and checks that its content file exists
    /// 3. Swaps the catalog record in place and rewrites the catalog
    /// 4. Removes the old content file and writes the new one
    ///
    /// Nothing on disk changes when steps 1 or 2 fail. If the write in step 4
    /// fails the entry is left without a content file, which
    /// [`Catalog::verify`] reports.
    ///
    /// # Arguments
    ///
    /// * `old_slug` - Name of the entry being edited
    /// * `item` - The edited item, with url and filepath already recomputed
    ///
    /// # Returns
    ///
    /// `Ok(())`, or `NameCollision`, `NotFound`, `ConsistencyViolation` or an
    /// I/O error
    pub fn replace(&self, old_slug: &str, item: &Item) -> Result<()> {
        info!("Replacing {} with {}", old_slug, item.name);
        let _guard = self.lock()?;
        let mut root = self.read_root()?;

        if item.name != old_slug && locate(&root, &item.name).is_some() {
            warn!("Cannot rename {} to {}: name already in use", old_slug, item.name);
            return Err(FsError::NameCollision {
                name: item.name.clone(),
            });
        }
        let index = locate(&root, old_slug).ok_or_else(|| {
            warn!("Cannot replace {}: not in catalog", old_slug);
            FsError::NotFound {
                slug: old_slug.to_string(),
            }
        })?;
        let old = Item::from_record(&root.children()[index])?;
        if !old.filepath.exists() {
            let message = format!(
                "{} has no content file at {}",
                old_slug,
                old.filepath.display()
            );
            error!("{}", message);
            return Err(FsError::ConsistencyViolation { message });
        }

        root.children_mut()[index] = item.to_record(section_of(item).tag(), false);
        self.write_root(&root)?;
        self.content.remove(&old.filepath)?;
        self.content.write(item)?;
        info!("Item {} saved as {}", old_slug, item.name);
        Ok(())
    }

    /// Moves an item into or out of the trash. Setting the current state
    /// again is a no-op apart from rewriting the catalog.
    pub fn set_trash(&self, slug: &str, trashed: bool) -> Result<Item> {
        info!("{} {}", if trashed { "Trashing" } else { "Restoring" }, slug);
        self.mutate(|root| {
            let index = locate(root, slug).ok_or_else(|| FsError::NotFound {
                slug: slug.to_string(),
            })?;
            let record = &mut root.children_mut()[index];
            let mut item = Item::from_record(record)?;
            item.trash = trashed;
            *record = item.to_record(section_of(&item).tag(), false);
            Ok(item)
        })
    }

    /// Permanently removes every trashed item.
    ///
    /// All checks run before anything changes: the destination of a move must
    /// be an existing directory, every trashed content file must exist and no
    /// moved file may land on an existing path. Files are then deleted or moved
    /// one by one, and the catalog drops exactly the entries whose files were
    /// handled. If a file operation fails partway, the remaining entries stay
    /// in the trash and the error is returned after the catalog is rewritten.
    ///
    /// # Arguments
    ///
    /// * `disposal` - Delete the content files, or move them into a directory
    ///
    /// # Returns
    ///
    /// A report of the removed slugs and of the deleted (or new) file paths
    pub fn empty_trash(&self, disposal: &TrashDisposal) -> Result<TrashReport> {
        info!("Emptying trash");
        if let TrashDisposal::MoveTo(dir) = disposal {
            if !dir.is_dir() {
                error!("Trash destination is not a directory: {}", dir.display());
                return Err(FsError::DirectoryError { path: dir.clone() });
            }
        }

        let _guard = self.lock()?;
        let mut root = self.read_root()?;
        let trashed = root
            .children_named(Section::Trash.tag())
            .map(Item::from_record)
            .collect::<Result<Vec<_>>>()?;

        let mut report = TrashReport::default();
        if trashed.is_empty() {
            info!("Trash was already empty");
            return Ok(report);
        }
        if let Some(missing) = trashed.iter().find(|item| !item.filepath.exists()) {
            let message = format!(
                "trashed item {} has no content file at {}",
                missing.name,
                missing.filepath.display()
            );
            error!("{}", message);
            return Err(FsError::ConsistencyViolation { message });
        }
        if let TrashDisposal::MoveTo(dir) = disposal {
            for item in &trashed {
                let target = move_target(dir, &item.filepath)?;
                if target.exists() {
                    warn!("Cannot move {}: {} already exists", item.name, target.display());
                    return Err(FsError::NameCollision {
                        name: target.display().to_string(),
                    });
                }
            }
        }

        let mut failure = None;
        for item in trashed {
            match self.dispose(&item, disposal) {
                Ok(file) => {
                    report.removed.push(item.name);
                    report.files.push(file);
                }
                Err(e) => {
                    error!("Stopped emptying trash at {}: {}", item.name, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        if !report.removed.is_empty() {
            let removed: HashSet<&str> = report.removed.iter().map(String::as_str).collect();
            root.children_mut().retain(|r| {
                r.tag() != Section::Trash.tag()
                    || !r.field(Field::Name.tag()).is_some_and(|name| removed.contains(name))
            });
            self.write_root(&root)?;
        }
        if let Some(e) = failure {
            return Err(e);
        }

        info!("Took out {} trashed item(s)", report.removed.len());
        Ok(report)
    }

    /// Deletes or moves one trashed content file, returning where it went.
    fn dispose(&self, item: &Item, disposal: &TrashDisposal) -> Result<PathBuf> {
        match disposal {
            TrashDisposal::Delete => {
                self.content.remove(&item.filepath)?;
                Ok(item.filepath.clone())
            }
            TrashDisposal::MoveTo(dir) => {
                let target = move_target(dir, &item.filepath)?;
                debug!("Moving {} to {}", item.filepath.display(), target.display());
                fs::rename(&item.filepath, &target).map_err(|e| {
                    error!("Failed to move {}: {}", item.filepath.display(), e);
                    FsError::Io(e)
                })?;
                Ok(target)
            }
        }
    }

    /// Compares the catalog with the posts directory.
    pub fn verify(&self) -> Result<Vec<Violation>> {
        info!("Verifying catalog against {}", self.content.posts_dir().display());
        let root = self.read_root()?;
        let mut violations = Vec::new();
        let mut referenced = HashSet::new();

        for record in root.children() {
            let item = Item::from_record(record)?;
            if !item.filepath.exists() {
                violations.push(Violation::MissingContent {
                    slug: item.name.clone(),
                    path: item.filepath.clone(),
                });
            }
            if let Some(name) = item.filepath.file_name() {
                referenced.insert(name.to_os_string());
            }
        }

        let ignored: HashSet<OsString> = self
            .foreign_files
            .iter()
            .chain(std::iter::once(&self.path))
            .filter_map(|p| p.file_name().map(OsString::from))
            .collect();

        for entry in WalkDir::new(self.content.posts_dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "xml") {
                continue;
            }
            let name = entry.file_name().to_os_string();
            if !referenced.contains(&name) && !ignored.contains(&name) {
                violations.push(Violation::OrphanContent {
                    path: path.to_path_buf(),
                });
            }
        }

        if violations.is_empty() {
            info!("Catalog and content files agree");
        } else {
            warn!("Found {} consistency violation(s)", violations.len());
        }
        Ok(violations)
    }

    /// Body of `item`; see [`ContentStore::load`].
    pub fn load_content(&self, item: &Item, force: bool) -> Result<String> {
        self.content.load(item, force)
    }
}

fn move_target(dir: &Path, file: &Path) -> Result<PathBuf> {
    let file_name = file
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| FsError::parse(format!("{} has no file name", file.display())))?;
    Ok(dir.join(file_name))
}

/// Section an item belongs in given its trash flag.
fn section_of(item: &Item) -> Section {
    if item.trash {
        Section::Trash
    } else {
        Section::from(item.kind)
    }
}

/// Index of the entry named `slug`, searching posts, then pages, then trash.
fn locate(root: &Record, slug: &str) -> Option<usize> {
    Section::ALL.iter().find_map(|section| {
        root.children()
            .iter()
            .position(|r| r.tag() == section.tag() && r.field(Field::Name.tag()) == Some(slug))
    })
}
