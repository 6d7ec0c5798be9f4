use std::path::{Component, Path, PathBuf};

/// Resolves the configured uploads directory against the working directory
/// and creates it when missing.
pub fn uploads_dir(configured: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(configured);
    let dir = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Joins a stored resource path onto the uploads root. Absolute paths and
/// parent components are rejected.
pub fn resolve_upload(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let is_contained = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if relative.as_os_str().is_empty() || !is_contained {
        return None;
    }

    Some(root.join(relative))
}

/// Size of an uploaded file, `None` when it is not on disk.
pub fn upload_size(root: &Path, relative: &str) -> Option<u64> {
    let path = resolve_upload(root, relative)?;
    std::fs::metadata(path).ok().map(|m| m.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_upload() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve_upload(root, "lessons/intro.pdf"),
            Some(PathBuf::from("/srv/uploads/lessons/intro.pdf"))
        );
        assert_eq!(resolve_upload(root, "../etc/passwd"), None);
        assert_eq!(resolve_upload(root, "/etc/passwd"), None);
        assert_eq!(resolve_upload(root, ""), None);
    }

    #[test]
    fn test_uploads_dir_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("uploads");
        let resolved = uploads_dir(dir.to_str().unwrap()).unwrap();

        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_upload_size() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.pdf"), b"12345").unwrap();

        assert_eq!(upload_size(tmp.path(), "notes.pdf"), Some(5));
        assert_eq!(upload_size(tmp.path(), "missing.pdf"), None);
    }
}
