use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `PhotoPress_<date>_<time>_<n>` with a one-based `n`.
pub fn default_file_name(timestamp: NaiveDateTime, index: usize) -> String {
    format!(
        "PhotoPress_{}_{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        index + 1
    )
}

/// File name with the extension of the processed file appended.
pub fn with_extension(name: &str, processed: &Path) -> String {
    match processed.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", name, ext),
        None => name.to_string(),
    }
}

/// User-chosen names, keyed by the source asset uri.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNames {
    custom: HashMap<PathBuf, String>,
}

impl FileNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, uri: impl Into<PathBuf>, name: impl Into<String>) {
        self.custom.insert(uri.into(), name.into());
    }

    /// Custom name for `uri`, or the default one when missing or blank.
    pub fn resolve(&self, uri: &Path, index: usize, timestamp: NaiveDateTime) -> String {
        match self.custom.get(uri) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => default_file_name(timestamp, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 2)
            .unwrap()
    }

    #[test]
    fn test_default_name_is_zero_padded() {
        assert_eq!(
            default_file_name(timestamp(), 0),
            "PhotoPress_20240307_090502_1"
        );
    }

    #[test]
    fn test_custom_name_wins_unless_blank() {
        let mut names = FileNames::new();
        names.set("a.jpg", "holiday");
        names.set("b.jpg", "   ");

        assert_eq!(names.resolve(Path::new("a.jpg"), 0, timestamp()), "holiday");
        assert_eq!(
            names.resolve(Path::new("b.jpg"), 1, timestamp()),
            "PhotoPress_20240307_090502_2"
        );
        assert_eq!(
            names.resolve(Path::new("c.jpg"), 2, timestamp()),
            "PhotoPress_20240307_090502_3"
        );
    }

    #[test]
    fn test_extension_follows_processed_file() {
        assert_eq!(with_extension("holiday", Path::new("/tmp/x.jpg")), "holiday.jpg");
        assert_eq!(with_extension("clip", Path::new("/tmp/out")), "clip");
    }
}
