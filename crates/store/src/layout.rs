// SPDX-License-Identifier: MIT

//! Rooted data-directory layout: `<root>/data.sqlite`, `<root>/r2/<bucket>/<key>`,
//! `<root>/d1/<name>.sqlite`, `<root>/do-sql/<class>/<id>.sqlite`.

use crate::error::{StoreError, StoreResult};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = ".edge-runtime";

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shared_db_path(&self) -> PathBuf {
        self.root.join("data.sqlite")
    }

    /// Resolves an object-store body path, rejecting any key segment that
    /// would traverse outside the bucket directory.
    pub fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let safe_key = reject_traversal(key)?;
        Ok(self.root.join("r2").join(sanitize_component(bucket)?).join(safe_key))
    }

    pub fn object_bucket_dir(&self, bucket: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join("r2").join(sanitize_component(bucket)?))
    }

    pub fn d1_db_path(&self, name: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join("d1").join(format!("{}.sqlite", sanitize_component(name)?)))
    }

    pub fn actor_db_path(&self, class: &str, id: &str) -> StoreResult<PathBuf> {
        Ok(self
            .root
            .join("do-sql")
            .join(sanitize_component(class)?)
            .join(format!("{}.sqlite", sanitize_component(id)?)))
    }

    pub fn ensure_tree(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.root.join("r2"))?;
        std::fs::create_dir_all(self.root.join("d1"))?;
        std::fs::create_dir_all(self.root.join("do-sql"))?;
        Ok(())
    }
}

/// Rejects a bucket/class/name component that contains a path separator or
/// a `.`/`..` segment — these are directory names, not arbitrary keys.
fn sanitize_component(component: &str) -> StoreResult<&str> {
    if component.is_empty()
        || component == "."
        || component == ".."
        || component.contains('/')
        || component.contains('\\')
    {
        return Err(StoreError::PathTraversal(component.to_string()));
    }
    Ok(component)
}

/// Rejects an object key that would escape its bucket directory via `..`
/// segments or an absolute path, while still allowing `/`-delimited virtual
/// directories within the key (the common case for object stores).
fn reject_traversal(key: &str) -> StoreResult<&str> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StoreError::PathTraversal(key.to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StoreError::PathTraversal(key.to_string()));
        }
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dotdot_key() {
        let layout = DataLayout::new("/tmp/edge-runtime-test");
        assert!(layout.object_path("bucket", "../escape").is_err());
    }

    #[test]
    fn rejects_absolute_key() {
        let layout = DataLayout::new("/tmp/edge-runtime-test");
        assert!(layout.object_path("bucket", "/etc/passwd").is_err());
    }

    #[test]
    fn allows_nested_virtual_directories() {
        let layout = DataLayout::new("/tmp/edge-runtime-test");
        let path = layout.object_path("bucket", "a/b/c.txt").unwrap();
        assert!(path.ends_with("r2/bucket/a/b/c.txt"));
    }

    #[test]
    fn rejects_traversal_in_bucket_name() {
        let layout = DataLayout::new("/tmp/edge-runtime-test");
        assert!(layout.object_path("../escape", "k").is_err());
    }
}
