/// Upload Storage
///
/// Uploaded photos are written under a per-session directory of the upload
/// root, named `{upload-time}_{sanitized-original-name}`. The store only
/// writes bytes; the session registry is updated by the caller once the
/// write has succeeded.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{StorageError, StorageResult};

/// Longest session id accepted as a directory name
const MAX_SESSION_ID_LEN: usize = 128;

/// Collisions tolerated before giving up on a name
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Name used when nothing of the original file name survives sanitizing
const FALLBACK_NAME: &str = "image.jpg";

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// File name inside the session directory, also the image id
    pub file_name: String,

    /// Public path the file is served under
    pub url: String,

    /// Where the bytes were written
    pub path: PathBuf,
}

/// Per-session directory store rooted at the uploads directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create the store, making sure the root directory exists
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one upload and return its name and public url
    pub async fn store(
        &self,
        session_id: &str,
        original_name: &str,
        content: &[u8],
        uploaded_at: DateTime<Utc>,
    ) -> StorageResult<StoredUpload> {
        validate_session_id(session_id)?;

        let session_dir = self.root.join(session_id);
        fs::create_dir_all(&session_dir)
            .await
            .map_err(|source| StorageError::Io {
                path: session_dir.clone(),
                source,
            })?;

        let base_name = format!(
            "{}_{}",
            uploaded_at.format("%Y%m%d_%H%M%S_%3f"),
            sanitize_filename(original_name)
        );
        let (file_name, path, mut file) = create_unique(&session_dir, &base_name).await?;

        let written = async {
            file.write_all(content).await?;
            file.flush().await
        }
        .await;
        drop(file);
        if let Err(source) = written {
            // never leave a truncated blob behind
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::Io { path, source });
        }

        Ok(StoredUpload {
            url: format!("/uploads/{}/{}", session_id, file_name),
            file_name,
            path,
        })
    }
}

/// Create `dir/name` exclusively, falling back to `name-1.ext`, `name-2.ext`...
/// when an upload with the same name landed in the same millisecond.
async fn create_unique(dir: &Path, base_name: &str) -> StorageResult<(String, PathBuf, fs::File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let file_name = if attempt == 0 {
            base_name.to_string()
        } else {
            with_suffix(base_name, attempt)
        };
        let path = dir.join(&file_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((file_name, path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(StorageError::Io { path, source }),
        }
    }

    Err(StorageError::Io {
        path: dir.join(base_name),
        source: std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
    })
}

/// `scan.jpg` -> `scan-2.jpg`; names without an extension get a plain suffix
fn with_suffix(name: &str, n: u32) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{name}-{n}"),
    }
}

/// Reject session ids that are unsafe as a single path component
pub fn validate_session_id(session_id: &str) -> StorageResult<()> {
    let invalid = session_id.is_empty()
        || session_id.len() > MAX_SESSION_ID_LEN
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StorageError::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

/// Reduce a client-supplied file name to a safe ASCII file name.
///
/// Only the last path component is kept. Whitespace becomes `_`, anything
/// outside `[A-Za-z0-9._-]` is dropped, and leading dots and underscores
/// are stripped so the result is never hidden or a relative path.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            out.push(c);
        } else if c.is_whitespace() {
            out.push('_');
        }
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches('.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my photo 1.JPG"), "my_photo_1.JPG");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\scan.png"), "scan.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("résumé.png"), "rsum.png");
        assert_eq!(sanitize_filename(""), "image.jpg");
        assert_eq!(sanitize_filename("..."), "image.jpg");
    }

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("session-abc123-lx9").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("..").is_err());
        assert!(validate_session_id("a/b").is_err());
        assert!(validate_session_id("a\\b").is_err());
        assert!(validate_session_id(&"x".repeat(200)).is_err());
    }

    #[tokio::test]
    async fn test_store_writes_under_session_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path().join("uploads")).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        let stored = store.store("s1", "scan 1.jpg", b"jpeg-bytes", at).await.unwrap();

        assert_eq!(stored.file_name, "20240305_140709_000_scan_1.jpg");
        assert_eq!(stored.url, "/uploads/s1/20240305_140709_000_scan_1.jpg");
        assert_eq!(stored.path, store.root().join("s1").join(&stored.file_name));
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"jpeg-bytes");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("20240305_140709_000_scan.jpg", 1), "20240305_140709_000_scan-1.jpg");
        assert_eq!(with_suffix("noext", 2), "noext-2");
    }

    #[tokio::test]
    async fn test_same_name_same_instant_gets_distinct_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path()).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        let first = store.store("s1", "image.jpg", b"FIRST", at).await.unwrap();
        let second = store.store("s1", "image.jpg", b"SECOND", at).await.unwrap();
        let third = store.store("s1", "image.jpg", b"THIRD", at).await.unwrap();

        assert_eq!(first.file_name, "20240305_140709_000_image.jpg");
        assert_eq!(second.file_name, "20240305_140709_000_image-1.jpg");
        assert_eq!(third.file_name, "20240305_140709_000_image-2.jpg");
        assert_ne!(first.url, second.url);

        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"FIRST");
        assert_eq!(tokio::fs::read(&second.path).await.unwrap(), b"SECOND");
        assert_eq!(tokio::fs::read(&third.path).await.unwrap(), b"THIRD");
    }

    #[tokio::test]
    async fn test_store_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path()).unwrap();

        let err = store
            .store("..", "a.jpg", b"x", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidSessionId(_)));
    }

    #[tokio::test]
    async fn test_store_surfaces_io_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::new(tmp.path()).unwrap();
        // a regular file where the session directory should go
        std::fs::write(tmp.path().join("s1"), b"not a dir").unwrap();

        let err = store
            .store("s1", "a.jpg", b"x", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
