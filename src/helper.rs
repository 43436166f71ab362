use std::{
    fs,
    io::Write,
    path::Path,
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;

use crate::{Document, FsError, Item, Result};

/// Writes `contents` to `path` through a temporary file in the same directory
/// and an atomic rename, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        debug!("Creating parent directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create directory {}: {}", dir.display(), e);
            FsError::DirectoryError {
                path: dir.to_path_buf(),
            }
        })?;
    }

    trace!("Creating temporary file in directory: {}", dir.display());
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file: {}", e);
        FsError::Io(e)
    })?;

    temp_file.write_all(contents).map_err(|e| {
        error!("Failed to write to temporary file: {}", e);
        FsError::Io(e)
    })?;
    temp_file.flush().map_err(|e| {
        error!("Failed to flush temporary file: {}", e);
        FsError::Io(e)
    })?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        FsError::Io(e.error)
    })?;
    trace!("Atomically replaced {}", path.display());
    Ok(())
}

/// Helper method to load a single item from a content file
pub fn load_item_from_file(path: &Path) -> Result<Item> {
    debug!("Loading item from file: {}", path.display());
    let document = Document::from_file(path)?;
    let item = Item::from_record(&document.root)?;

    if item.name.is_empty() {
        let error_mgs = format!("Item from {} has an empty name", path.display());
        error!("{}", error_mgs);
        return Err(FsError::Parse { message: error_mgs });
    }

    trace!("Successfully loaded item: {}", item.name);
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_missing_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("file.xml");
        write_atomic(&path, b"<a/>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<a/>");

        write_atomic(&path, b"<b/>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<b/>");
        // Only the target remains; the temporary file was renamed into place.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn loading_rejects_nameless_items() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.xml");
        fs::write(
            &path,
            "<item><type>post</type><name></name><date>2012-01-01 00:00:00</date>\
             <url>/x/</url><filepath>x.xml</filepath></item>",
        )
        .unwrap();
        assert!(matches!(load_item_from_file(&path), Err(FsError::Parse { .. })));
    }
}
