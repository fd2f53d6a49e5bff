use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Local directory holding uploaded images
///
/// Files are named `<uuid>_<original filename>` and are never removed by the
/// request path.
#[derive(Debug, Clone)]
pub struct UploadStore {
    directory: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn open(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        tracing::debug!(directory = %directory.display(), "upload directory ready");

        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write an upload under a fresh unique name and return its path
    pub async fn persist(&self, original_filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.directory.join(unique_filename(original_filename));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "upload persisted");

        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    /// Delete regular files whose modification time is at least `retention` ago
    ///
    /// Returns the number of files removed. Files that vanish mid-sweep are
    /// skipped.
    pub async fn sweep(&self, retention: Duration) -> io::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };

            if !metadata.is_file() {
                continue;
            }

            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= retention);

            if !expired {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}

/// Run [`UploadStore::sweep`] every `interval` until `shutdown` fires
pub fn spawn_retention_sweep(
    store: UploadStore,
    retention: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match store.sweep(retention).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "expired uploads deleted"),
                        Err(e) => tracing::warn!(error = %e, "upload retention sweep failed"),
                    }
                }
            }
        }

        tracing::debug!("upload retention sweep stopped");
    })
}

/// `<uuid v4>_<original>`
pub fn unique_filename(original: &str) -> String {
    format!("{}_{original}", Uuid::new_v4())
}

/// Reduce a client-supplied filename to its final path component
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// remains (empty, `.` or `..`). Whitespace is kept as sent.
pub fn sanitize_filename(raw: &str) -> Option<&str> {
    let name = raw.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();

    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}
