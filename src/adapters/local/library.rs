use crate::ports::library::{MediaLibraryPort, Permission};
use crate::ports::PortError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Media library backed by plain directories: saved files land in
/// `library_dir`, renamed copies are staged in `cache_dir` and shared files
/// are dropped into `share_dir`.
#[derive(Clone, Debug)]
pub struct FsLibrary {
    library_dir: PathBuf,
    cache_dir: PathBuf,
    share_dir: PathBuf,
}

impl FsLibrary {
    pub fn new(library_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        let library_dir = library_dir.into();
        let share_dir = library_dir.join("shared");
        Self {
            library_dir,
            cache_dir: cache_dir.into(),
            share_dir,
        }
    }

    async fn copy_into(dir: &Path, uri: &Path, file_name: &str) -> Result<PathBuf, PortError> {
        if !tokio::fs::try_exists(uri).await? {
            return Err(PortError::Missing(uri.to_path_buf()));
        }
        tokio::fs::create_dir_all(dir).await?;
        let destination = dir.join(file_name);
        if destination != uri {
            tokio::fs::copy(uri, &destination).await?;
        }
        Ok(destination)
    }
}

fn file_name_of(uri: &Path) -> Result<&str, PortError> {
    uri.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PortError::Missing(uri.to_path_buf()))
}

#[async_trait]
impl MediaLibraryPort for FsLibrary {
    async fn request_permission(&self) -> Permission {
        match tokio::fs::create_dir_all(&self.library_dir).await {
            Ok(()) => Permission::Granted,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Permission::Denied { can_ask_again: false }
            }
            Err(_) => Permission::Denied { can_ask_again: true },
        }
    }

    async fn stage(&self, uri: &Path, file_name: &str) -> Result<PathBuf, PortError> {
        Self::copy_into(&self.cache_dir, uri, file_name).await
    }

    async fn save_to_library(&self, uri: &Path) -> Result<PathBuf, PortError> {
        let saved = Self::copy_into(&self.library_dir, uri, file_name_of(uri)?).await?;
        info!("Saved {:?} to library", saved);
        Ok(saved)
    }

    async fn share(&self, uri: &Path) -> Result<(), PortError> {
        let shared = Self::copy_into(&self.share_dir, uri, file_name_of(uri)?).await?;
        info!("Shared {:?}", shared);
        Ok(())
    }
}
