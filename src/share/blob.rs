//! Blob directory for shared file content.
//!
//! Each share owns exactly one blob, named after the share id and keeping
//! the source file's extension so the content type can be inferred:
//!
//! ```text
//! {base_path}/
//! ├── 0b6f1c6e-0d4a-4d8e-9a55-1f9d1c2f6a10.pdf
//! ├── 7d3e52a1-9c1b-4b8a-8f1e-2b7d5c0e9f33.png
//! └── c1a4e8f0-55b2-4e0b-a7a9-6c2d8e4f1b02
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs::File;

use crate::{FastlaneError, Result};

/// Filesystem area holding one copied blob per share.
#[derive(Debug, Clone)]
pub struct BlobDirectory {
    base_path: PathBuf,
}

impl BlobDirectory {
    /// Create a BlobDirectory rooted at `base_path`, creating it if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path a blob for `id` copied from `source` will be stored at.
    pub fn blob_path(&self, id: &str, source: &Path) -> PathBuf {
        self.base_path.join(Self::blob_name(id, source))
    }

    /// Copy `source` into the directory as the blob for `id`.
    ///
    /// The bytes are staged in a temporary file inside the directory and
    /// renamed into place, so a failed copy never leaves a partial blob.
    /// Returns the blob path and the number of bytes copied.
    pub async fn store(&self, source: &Path, id: &str) -> Result<(PathBuf, u64)> {
        let dest = self.blob_path(id, source);
        let dir = self.base_path.clone();
        let source = source.to_path_buf();

        tokio::task::spawn_blocking(move || -> io::Result<(PathBuf, u64)> {
            fs::create_dir_all(&dir)?;
            let mut input = fs::File::open(&source)?;
            let mut staged = NamedTempFile::new_in(&dir)?;
            let copied = io::copy(&mut input, staged.as_file_mut())?;
            staged.as_file().sync_all()?;
            staged.persist(&dest).map_err(|e| e.error)?;
            Ok((dest, copied))
        })
        .await
        .map_err(|e| FastlaneError::CopyFailed(format!("copy task failed: {e}")))?
        .map_err(|e| FastlaneError::CopyFailed(e.to_string()))
    }

    /// Delete a blob.
    ///
    /// Returns `false` (and logs) when the blob was already gone.
    pub async fn delete(&self, path: &Path) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Blob already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a whole blob into memory.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    /// Open a blob for streaming.
    pub async fn open(&self, path: &Path) -> Result<File> {
        Ok(File::open(path).await?)
    }

    /// Check if a blob exists.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// List every regular file in the directory.
    ///
    /// Only used to find orphans; the record store decides what is live.
    pub fn list_blobs(&self) -> Result<Vec<PathBuf>> {
        let mut blobs = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                blobs.push(entry.path());
            }
        }
        blobs.sort();
        Ok(blobs)
    }

    /// Blob file name for `id`: the id plus the source extension, if any.
    fn blob_name(id: &str, source: &Path) -> String {
        match Self::extract_extension(source) {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }

    /// Extract the file extension from a path.
    fn extract_extension(path: &Path) -> Option<&str> {
        path.extension().and_then(|s| s.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_blobs() -> (TempDir, BlobDirectory) {
        let temp_dir = TempDir::new().unwrap();
        let blobs = BlobDirectory::new(temp_dir.path().join("uploads")).unwrap();
        (temp_dir, blobs)
    }

    fn write_source(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("uploads");

        assert!(!path.exists());

        let blobs = BlobDirectory::new(&path).unwrap();

        assert!(path.is_dir());
        assert_eq!(blobs.base_path(), path);
    }

    #[tokio::test]
    async fn test_store_and_read() {
        let (temp_dir, blobs) = setup_blobs();
        let source = write_source(&temp_dir, "hello.txt", b"Hello, World!");

        let (path, size) = blobs.store(&source, "abc").await.unwrap();

        assert_eq!(path, blobs.base_path().join("abc.txt"));
        assert_eq!(size, 13);
        assert_eq!(blobs.read(&path).await.unwrap(), b"Hello, World!");
        // Source is untouched.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_store_binary_content() {
        let (temp_dir, blobs) = setup_blobs();
        let content: Vec<u8> = (0..=255).cycle().take(256 * 1024).collect();
        let source = write_source(&temp_dir, "data.bin", &content);

        let (path, size) = blobs.store(&source, "bin").await.unwrap();

        assert_eq!(size, content.len() as u64);
        assert_eq!(blobs.read(&path).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_store_missing_source_leaves_nothing() {
        let (temp_dir, blobs) = setup_blobs();
        let missing = temp_dir.path().join("missing.pdf");

        let result = blobs.store(&missing, "gone").await;

        assert!(matches!(result, Err(FastlaneError::CopyFailed(_))));
        assert!(blobs.list_blobs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (temp_dir, blobs) = setup_blobs();
        let source = write_source(&temp_dir, "a.txt", b"x");
        let (path, _) = blobs.store(&source, "a").await.unwrap();

        assert!(blobs.exists(&path));
        assert!(blobs.delete(&path).await.unwrap());
        assert!(!blobs.exists(&path));
    }

    #[tokio::test]
    async fn test_delete_absent_blob() {
        let (_temp_dir, blobs) = setup_blobs();
        let path = blobs.base_path().join("never.txt");

        assert!(!blobs.delete(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_streams_content() {
        use tokio::io::AsyncReadExt;

        let (temp_dir, blobs) = setup_blobs();
        let source = write_source(&temp_dir, "s.txt", b"stream me");
        let (path, _) = blobs.store(&source, "s").await.unwrap();

        let mut file = blobs.open(&path).await.unwrap();
        let mut buf = String::new();
        file.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "stream me");
    }

    #[tokio::test]
    async fn test_read_missing_blob() {
        let (_temp_dir, blobs) = setup_blobs();
        let result = blobs.read(&blobs.base_path().join("nope")).await;
        assert!(matches!(result, Err(FastlaneError::Io(e)) if e.kind() == io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_list_blobs() {
        let (temp_dir, blobs) = setup_blobs();
        let a = write_source(&temp_dir, "a.txt", b"a");
        let b = write_source(&temp_dir, "b", b"b");
        blobs.store(&a, "1").await.unwrap();
        blobs.store(&b, "2").await.unwrap();
        fs::create_dir(blobs.base_path().join("subdir")).unwrap();

        let listed = blobs.list_blobs().unwrap();
        assert_eq!(
            listed,
            vec![blobs.base_path().join("1.txt"), blobs.base_path().join("2")]
        );
    }

    #[test]
    fn test_blob_name() {
        assert_eq!(BlobDirectory::blob_name("id", Path::new("report.pdf")), "id.pdf");
        assert_eq!(BlobDirectory::blob_name("id", Path::new("image.PNG")), "id.PNG");
        assert_eq!(BlobDirectory::blob_name("id", Path::new("a.tar.gz")), "id.gz");
        assert_eq!(BlobDirectory::blob_name("id", Path::new("no_extension")), "id");
        // ".hidden" is a file name without extension
        assert_eq!(BlobDirectory::blob_name("id", Path::new(".hidden")), "id");
    }

    #[test]
    fn test_unicode_source_name() {
        assert_eq!(
            BlobDirectory::blob_name("id", Path::new("日本語ファイル.txt")),
            "id.txt"
        );
    }
}
