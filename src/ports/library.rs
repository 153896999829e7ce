use super::PortError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied { can_ask_again: bool },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaLibraryPort: Send + Sync {
    /// Ask for write access to the media library
    async fn request_permission(&self) -> Permission;

    /// Copy `uri` into a cache location under `file_name`, returning the new path.
    async fn stage(&self, uri: &Path, file_name: &str) -> Result<PathBuf, PortError>;

    /// Persist a file into the library. Returns the stored location.
    async fn save_to_library(&self, uri: &Path) -> Result<PathBuf, PortError>;

    /// Hand a file to the platform share surface.
    async fn share(&self, uri: &Path) -> Result<(), PortError>;
}
