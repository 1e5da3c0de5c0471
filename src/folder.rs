//! Folder-of-class-subdirectories datasets.
//!
//! Loads images from a directory where each subdirectory is a class:
//!
//! ```text
//! root/
//!   angry/
//!     img_001.png
//!   happy/
//!     img_002.jpg
//! ```
//!
//! Class labels are the sorted indices of the subdirectory names. Used for
//! datasets that cannot be redistributed automatically and arrive as a
//! pre-extracted folder.
use std::io;
use std::path::{Path, PathBuf};

use crate::{DatasetError, RawDataset, Sample, Target};

/// Supported image extensions (case-insensitive).
const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A directory-based image classification dataset.
pub struct ImageFolderDataset {
    classes: Vec<String>,
    entries: Vec<(PathBuf, usize)>,
}

impl ImageFolderDataset {
    /// Scan `root` and collect all image paths and class labels.
    pub fn open(root: &Path) -> Result<Self, DatasetError> {
        if !root.is_dir() {
            return Err(DatasetError::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            )));
        }

        let mut class_dirs: Vec<(String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                    class_dirs.push((name.to_string(), path));
                }
            }
        }
        class_dirs.sort_by(|a, b| a.0.cmp(&b.0));

        let classes: Vec<String> = class_dirs.iter().map(|(name, _)| name.clone()).collect();

        let mut entries: Vec<(PathBuf, usize)> = Vec::new();
        for (class_index, (_, dir)) in class_dirs.iter().enumerate() {
            let mut paths: Vec<PathBuf> = Vec::new();
            collect_images(dir, &mut paths);
            paths.sort();
            for path in paths {
                entries.push((path, class_index));
            }
        }

        Ok(Self { classes, entries })
    }
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(read_dir) = std::fs::read_dir(dir) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_images(&path, out);
            } else if is_image(&path) {
                out.push(path);
            }
        }
    }
}

impl RawDataset for ImageFolderDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        let (path, class_index) = self.entries.get(index)?;
        let image = image::open(path).ok()?;
        Some(Sample {
            image,
            target: Target::Label(*class_index as i64),
        })
    }

    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("zsd-folder-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn classes_are_sorted_subdirectories() {
        let root = fixture_root("scan");
        for (class, file) in [("happy", "a.png"), ("angry", "b.jpg"), ("sad", "c.txt")] {
            fs::create_dir_all(root.join(class)).unwrap();
            fs::write(root.join(class).join(file), b"not a real image").unwrap();
        }

        let dataset = ImageFolderDataset::open(&root).unwrap();
        assert_eq!(dataset.classes(), vec!["angry", "happy", "sad"]);
        // the .txt file is not an image and must not be picked up
        assert_eq!(dataset.len(), 2);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = fixture_root("missing");
        assert!(ImageFolderDataset::open(&root).is_err());
    }
}
