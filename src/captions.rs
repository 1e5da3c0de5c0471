//! Caption corpora used for retrieval evaluation.
//!
//! Both corpora are manual downloads: the annotation file arrives alongside
//! an image directory under the shared dataset root. Records pair each image
//! with every caption written for it.
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{DatasetError, RawDataset, Sample, Target};

fn annotation_path(annotation_file: Option<&Path>) -> Result<&Path, DatasetError> {
    annotation_file.ok_or_else(|| {
        DatasetError::IoError(io::Error::new(
            io::ErrorKind::NotFound,
            "this dataset needs an annotation file",
        ))
    })
}

fn open_image(root: &Path, file_name: &str) -> Option<image::DynamicImage> {
    image::open(root.join(file_name)).ok()
}

/// COCO-style caption corpus: a JSON annotation file listing images and
/// their captions, next to an image directory.
pub struct CocoCaptionsDataset {
    root: PathBuf,
    entries: Vec<(String, Vec<String>)>,
}

impl CocoCaptionsDataset {
    /// Parse the annotation file and index the captions per image.
    ///
    /// Images are ordered by their annotation-file id, captions in
    /// annotation order.
    pub fn open(root: &Path, annotation_file: Option<&Path>) -> Result<Self, DatasetError> {
        let annotations: Value = serde_json::from_reader(File::open(annotation_path(
            annotation_file,
        )?)?)?;

        let mut images: Vec<(i64, String)> = Vec::new();
        for image in annotations["images"].as_array().into_iter().flatten() {
            if let (Some(id), Some(file_name)) =
                (image["id"].as_i64(), image["file_name"].as_str())
            {
                images.push((id, file_name.to_string()));
            }
        }
        images.sort_by_key(|(id, _)| *id);

        let mut entries: Vec<(String, Vec<String>)> = Vec::with_capacity(images.len());
        let index_of: std::collections::HashMap<i64, usize> = images
            .iter()
            .enumerate()
            .map(|(index, (id, _))| (*id, index))
            .collect();
        for (_, file_name) in &images {
            entries.push((file_name.clone(), Vec::new()));
        }
        for annotation in annotations["annotations"].as_array().into_iter().flatten() {
            if let (Some(image_id), Some(caption)) = (
                annotation["image_id"].as_i64(),
                annotation["caption"].as_str(),
            ) {
                if let Some(&index) = index_of.get(&image_id) {
                    entries[index].1.push(caption.to_string());
                }
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }
}

impl RawDataset for CocoCaptionsDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        let (file_name, captions) = self.entries.get(index)?;
        Some(Sample {
            image: open_image(&self.root, file_name)?,
            target: Target::Captions(captions.clone()),
        })
    }

    fn classes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Kaggle-layout Flickr caption corpus: a `captions.txt` file of
/// `image,caption` rows with the images under `root/Images`.
pub struct FlickrCaptionsDataset {
    images_dir: PathBuf,
    entries: Vec<(String, Vec<String>)>,
}

impl FlickrCaptionsDataset {
    /// Parse the caption file, grouping rows by image in first-seen order.
    pub fn open(root: &Path, annotation_file: Option<&Path>) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(annotation_path(annotation_file)?)?;

        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        let mut index_of: std::collections::HashMap<String, usize> =
            std::collections::HashMap::new();
        for record in reader.records() {
            let record = record?;
            let (Some(file_name), Some(caption)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let index = *index_of.entry(file_name.to_string()).or_insert_with(|| {
                entries.push((file_name.to_string(), Vec::new()));
                entries.len() - 1
            });
            entries[index].1.push(caption.to_string());
        }

        let images_dir = if root.join("Images").is_dir() {
            root.join("Images")
        } else {
            root.to_path_buf()
        };
        Ok(Self {
            images_dir,
            entries,
        })
    }
}

impl RawDataset for FlickrCaptionsDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        let (file_name, captions) = self.entries.get(index)?;
        Some(Sample {
            image: open_image(&self.images_dir, file_name)?,
            target: Target::Captions(captions.clone()),
        })
    }

    fn classes(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("zsd-captions-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn coco_groups_captions_per_image() {
        let root = fixture_root("coco");
        let annotation_file = root.join("captions_val.json");
        fs::write(
            &annotation_file,
            r#"{
                "images": [
                    {"id": 7, "file_name": "b.jpg"},
                    {"id": 3, "file_name": "a.jpg"}
                ],
                "annotations": [
                    {"image_id": 3, "caption": "a dog"},
                    {"image_id": 7, "caption": "a cat"},
                    {"image_id": 3, "caption": "a brown dog"}
                ]
            }"#,
        )
        .unwrap();

        let dataset = CocoCaptionsDataset::open(&root, Some(&annotation_file)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entries[0].0, "a.jpg");
        assert_eq!(dataset.entries[0].1, vec!["a dog", "a brown dog"]);
        assert_eq!(dataset.entries[1].1, vec!["a cat"]);
        assert!(dataset.classes().is_empty());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn flickr_groups_rows_in_first_seen_order() {
        let root = fixture_root("flickr");
        let annotation_file = root.join("captions.txt");
        fs::write(
            &annotation_file,
            "image,caption\n1.jpg,one dog\n2.jpg,one cat\n1.jpg,a second dog caption\n",
        )
        .unwrap();

        let dataset = FlickrCaptionsDataset::open(&root, Some(&annotation_file)).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entries[0].0, "1.jpg");
        assert_eq!(dataset.entries[0].1, vec!["one dog", "a second dog caption"]);
        assert_eq!(dataset.entries[1].0, "2.jpg");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_annotation_file_is_an_error() {
        let root = fixture_root("missing");
        assert!(CocoCaptionsDataset::open(&root, None).is_err());
        fs::remove_dir_all(&root).unwrap();
    }
}
