//! Per-request scratch directory
//!
//! Every request gets its own `reel_<uuid>` directory under the configured
//! temp dir. The extractor writes into `media/`, transcoded artifacts and the
//! cookie jar live in the root. The whole tree is removed either by
//! [`Workspace::release`] or, if the owning task was aborted or unwound
//! first, by the `Drop` guard.

use std::path::{Path, PathBuf};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::core::error::AppResult;

/// Name of the extractor output subdirectory
pub const MEDIA_DIR: &str = "media";

/// File name of the per-request cookie jar
pub const COOKIE_JAR: &str = "cookies.txt";

/// Prefix of workspace directory names
pub const WORKSPACE_PREFIX: &str = "reel_";

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    media: PathBuf,
    released: bool,
}

impl Workspace {
    /// Creates a fresh, empty workspace under `base`.
    pub async fn acquire(base: &Path) -> AppResult<Self> {
        let root = base.join(format!("{}{}", WORKSPACE_PREFIX, uuid::Uuid::new_v4().simple()));
        let media = root.join(MEDIA_DIR);
        tokio::fs::create_dir_all(&media).await?;
        log::debug!("Workspace acquired: {}", root.display());

        Ok(Self {
            root,
            media,
            released: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the extractor downloads into
    pub fn media_dir(&self) -> &Path {
        &self.media
    }

    /// Writes the normalized cookie jar once and returns its path.
    pub async fn write_cookie_jar(&self, netscape_text: &str) -> AppResult<PathBuf> {
        let path = self.root.join(COOKIE_JAR);
        tokio::fs::write(&path, netscape_text).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(path)
    }

    /// Removes the workspace and everything in it.
    ///
    /// Removal failures are logged, never returned: by the time a workspace is
    /// released the request outcome has already been decided.
    pub async fn release(mut self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => log::debug!("Workspace released: {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove workspace {}: {}", self.root.display(), e),
        }
        self.released = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Removal must finish before the guard returns. On a multi-thread
        // runtime the worker hands its other tasks off while it blocks.
        let on_worker_pool = Handle::try_current()
            .map(|h| h.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        let result = if on_worker_pool {
            tokio::task::block_in_place(|| std::fs::remove_dir_all(&self.root))
        } else {
            std::fs::remove_dir_all(&self.root)
        };

        match result {
            Ok(()) => log::debug!("Workspace removed on drop: {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove workspace {} on drop: {}", self.root.display(), e),
        }
    }
}
