//! Hub-hosted datasets in their parquet conversion.
//!
//! Every auto-downloadable dataset is served from the hub's parquet
//! conversion of the original archive, published under the
//! `refs/convert/parquet` revision. [`HubDataset`] handles discovery and
//! acquisition of the remote files; [`HubImageDataset`] reads the downloaded
//! files as indexable (image, label) records.
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use arrow2::array::{Array, BinaryArray, PrimitiveArray, StructArray};
use arrow2::datatypes::Schema;
use arrow2::io::parquet::read::{infer_schema, FileReader};
use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use hf_hub::{Cache, Repo, RepoType};
use parquet2::metadata::FileMetaData;
use parquet2::read::deserialize_metadata;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_RANGE, RANGE};

use crate::{DatasetError, RawDataset, Sample, Target};

/// Revision under which the hub publishes parquet conversions.
pub const PARQUET_REVISION: &str = "refs/convert/parquet";

/// When fetching parquet metadata, we fetch more than the last 8 bytes
/// in order to optimize round trips if the metadata is small enough.
/// A very minimal metadata is 2kB, so 100kB covers most small datasets while
/// it should be minimal overhead on modern connections
const PARQUET_METADATA_MIN_SIZE: usize = 100_000;

const PARQUET_MAGIC: [u8; 4] = [b'P', b'A', b'R', b'1'];

/// Keep any embedded compute runtime off the accelerators; dataset
/// preparation is pure I/O.
pub(crate) fn disable_gpu_visibility() {
    std::env::set_var("CUDA_VISIBLE_DEVICES", "");
}

/// Derive the config and split encoded in a remote parquet path.
///
/// Two layouts exist on the hub: `config/split/0000.parquet` and
/// `config/name-split-00000-of-00002.parquet`.
pub fn config_and_split(rfilename: &str) -> Option<(&str, &str)> {
    let segments: Vec<&str> = rfilename.split('/').collect();
    match segments[..] {
        [config, split, _] => Some((config, split)),
        [config, file] => {
            let stem = file.split('.').next()?;
            let split = stem.split('-').nth(1)?;
            Some((config, split))
        }
        _ => None,
    }
}

/// The core struct used to interact with a hub-hosted dataset.
pub struct HubDataset {
    api: Api,
    client: Client,
    id: String,
    cache_dir: Option<PathBuf>,
}

impl HubDataset {
    /// The id is the canonical hub name: you can look for names on the
    /// [hub](https://huggingface.co/datasets)
    pub fn from_id(id: String) -> Result<Self, DatasetError> {
        let api = ApiBuilder::new().with_progress(false).build()?;
        Ok(Self::new(api, id, None))
    }

    /// Like [`HubDataset::from_id`], caching the downloaded files under
    /// `cache_dir` instead of the default cache location.
    pub fn from_id_in(id: String, cache_dir: &Path) -> Result<Self, DatasetError> {
        let api = ApiBuilder::new()
            .with_progress(false)
            .with_cache_dir(cache_dir.to_path_buf())
            .build()?;
        Ok(Self::new(api, id, Some(cache_dir.to_path_buf())))
    }

    /// Create the dataset if you already have an [`Api`] at hand.
    pub fn new(api: Api, id: String, cache_dir: Option<PathBuf>) -> Self {
        Self {
            api,
            client: Client::new(),
            id,
            cache_dir,
        }
    }

    fn parquet_repo(&self) -> Repo {
        Repo::with_revision(
            self.id.clone(),
            RepoType::Dataset,
            PARQUET_REVISION.to_string(),
        )
    }

    fn repo(&self) -> ApiRepo {
        self.api.repo(self.parquet_repo())
    }

    /// Lists the available parquet files on the remote.
    pub fn remote_files(&self) -> Result<Vec<String>, DatasetError> {
        let info = self.repo().info()?;
        let mut filenames = Vec::with_capacity(info.siblings.len());
        for sibling in info.siblings {
            if sibling.rfilename.ends_with(".parquet") {
                filenames.push(sibling.rfilename);
            }
        }
        Ok(filenames)
    }

    /// The split names reported by the remote file layout.
    pub fn splits(&self) -> Result<Vec<String>, DatasetError> {
        let mut splits = BTreeSet::new();
        for rfilename in self.remote_files()? {
            if let Some((_, split)) = config_and_split(&rfilename) {
                splits.insert(split.to_string());
            }
        }
        Ok(splits.into_iter().collect())
    }

    /// Fetch the parquet metadata of one remote file with ranged requests,
    /// without downloading the file itself.
    pub fn parquet_metadata(&self, remote_filename: &str) -> Result<FileMetaData, DatasetError> {
        let url = self.repo().url(remote_filename);
        let response = self.client.get(&url).header(RANGE, "bytes=0-0").send()?;
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .ok_or(DatasetError::MissingHeader("content-range"))?
            .to_str()?;

        let size: usize = content_range
            .split('/')
            .last()
            .ok_or(DatasetError::MissingHeader("content-range"))?
            .parse()?;

        let stop = size;
        let start = if size < PARQUET_METADATA_MIN_SIZE {
            0
        } else {
            stop - PARQUET_METADATA_MIN_SIZE
        };
        let buffer = self
            .client
            .get(&url)
            .header(RANGE, format!("bytes={start}-{stop}"))
            .send()?
            .bytes()?;
        let len = buffer.len();
        if buffer[len - 4..] != PARQUET_MAGIC {
            return Err(DatasetError::InvalidParquetMagic);
        }
        let metadata_len = i32::from_le_bytes(buffer[len - 8..len - 4].try_into().unwrap());
        let metadata_len: usize = metadata_len.try_into()?;

        // a highly nested but sparse struct could result in many allocations
        let max_size = metadata_len * 2 + 1024;
        let metadata = if metadata_len < len - 8 {
            // Happy path, we already fetched the metadata
            deserialize_metadata(&buffer[len - metadata_len - 8..len - 8], max_size)?
        } else {
            // Unhappy path, the footer is larger than the tail window.
            let start = size - 8 - metadata_len;
            let stop = size - 8;
            let bytes = self
                .client
                .get(url)
                .header(RANGE, format!("bytes={start}-{stop}"))
                .send()?
                .bytes()?;
            deserialize_metadata(&*bytes, max_size)?
        };

        Ok(metadata)
    }

    /// Download every parquet file; returns the local paths.
    pub fn download(&self) -> Result<Vec<PathBuf>, DatasetError> {
        self.fetch(None, None, true)
    }

    /// Locate the parquet files matching `split` and `config` locally,
    /// downloading them when `download` is set and consulting only the cache
    /// otherwise.
    pub fn fetch(
        &self,
        split: Option<&str>,
        config: Option<&str>,
        download: bool,
    ) -> Result<Vec<PathBuf>, DatasetError> {
        let repo = self.repo();
        let cache = match &self.cache_dir {
            Some(dir) => Cache::new(dir.clone()),
            None => Cache::default(),
        };
        let cache_repo = cache.repo(self.parquet_repo());
        let mut filenames = Vec::new();
        for rfilename in self.remote_files()? {
            let Some((file_config, file_split)) = config_and_split(&rfilename) else {
                continue;
            };
            if split.is_some_and(|s| s != file_split) {
                continue;
            }
            if config.is_some_and(|c| c != file_config) {
                continue;
            }
            let filename = if download {
                repo.get(&rfilename)?
            } else {
                cache_repo.get(&rfilename).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("{rfilename} of {} not cached, pass download", self.id),
                    )
                })?
            };
            filenames.push(filename);
        }
        if filenames.is_empty() {
            return Err(DatasetError::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no parquet files for split {split:?} of {}", self.id),
            )));
        }
        Ok(filenames)
    }
}

/// Backend-native class names, as recorded by the hub conversion in the
/// parquet schema metadata.
pub(crate) fn classes_from_metadata(raw: &str, label_column: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let names = value
        .get("info")?
        .get("features")?
        .get(label_column)?
        .get("names")?
        .as_array()?;
    Some(
        names
            .iter()
            .filter_map(|name| name.as_str().map(String::from))
            .collect(),
    )
}

/// Columnar (image, label) dataset over downloaded parquet files.
pub struct HubImageDataset {
    files: Vec<(File, Schema, FileMetaData)>,
    image_column: String,
    label_column: String,
    classes: Vec<String>,
    len: usize,
}

impl HubImageDataset {
    /// Fetch `split` of the hub dataset `id` and open its parquet files.
    ///
    /// `columns` names the (image, label) columns of the records. Extra
    /// options are forwarded from the caller; `config` selects a parquet
    /// config when the conversion has several.
    pub fn open(
        id: &str,
        root: &Path,
        split: Option<&str>,
        download: bool,
        columns: (&str, &str),
        extra: &HashMap<String, String>,
    ) -> Result<Self, DatasetError> {
        let hub = HubDataset::from_id_in(id.to_string(), root)?;
        let config = extra.get("config").map(String::as_str);
        let paths = hub.fetch(split, config, download)?;
        Self::from_paths(&paths, columns)
    }

    /// Open already-downloaded parquet files.
    pub fn from_paths(paths: &[PathBuf], columns: (&str, &str)) -> Result<Self, DatasetError> {
        let mut files = Vec::with_capacity(paths.len());
        let mut len = 0;
        for path in paths {
            let mut file = File::open(path)?;
            let metadata = parquet2::read::read_metadata(&mut file)?;
            let schema = infer_schema(&metadata)?;
            len += metadata.num_rows;
            files.push((file, schema, metadata));
        }
        let classes = files
            .first()
            .and_then(|(_, schema, _)| schema.metadata.get("huggingface"))
            .and_then(|raw| classes_from_metadata(raw, columns.1))
            .unwrap_or_default();
        Ok(Self {
            files,
            image_column: columns.0.to_string(),
            label_column: columns.1.to_string(),
            classes,
            len,
        })
    }

    fn read_row(
        &self,
        file: &File,
        schema: &Schema,
        row_group: parquet2::metadata::RowGroupMetaData,
        index: usize,
    ) -> Option<Sample> {
        let mut reader = FileReader::new(file, vec![row_group], schema.clone(), None, None, None);
        let chunk = reader.next()?.ok()?;
        let image_field = schema
            .fields
            .iter()
            .position(|field| field.name == self.image_column)?;
        let label_field = schema
            .fields
            .iter()
            .position(|field| field.name == self.label_column)?;
        let image = image_bytes(chunk.arrays()[image_field].as_ref(), index)?;
        let label = label_value(chunk.arrays()[label_field].as_ref(), index)?;
        let image = image::load_from_memory(&image).ok()?;
        Some(Sample {
            image,
            target: Target::Label(label),
        })
    }
}

impl RawDataset for HubImageDataset {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, mut index: usize) -> Option<Sample> {
        if index >= self.len {
            return None;
        }
        for (file, schema, metadata) in &self.files {
            for row_group in &metadata.row_groups {
                let num_rows = row_group.num_rows();
                if num_rows > index {
                    return self.read_row(file, schema, row_group.clone(), index);
                } else {
                    index -= num_rows;
                }
            }
        }
        None
    }

    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }
}

/// The image payload of one record: either the hub's `{bytes, path}` struct
/// encoding or a plain binary column.
fn image_bytes(array: &dyn Array, row: usize) -> Option<Vec<u8>> {
    if let Some(records) = array.as_any().downcast_ref::<StructArray>() {
        let bytes_field = records
            .fields()
            .iter()
            .position(|field| field.name == "bytes")?;
        let bytes = records.values()[bytes_field]
            .as_any()
            .downcast_ref::<BinaryArray<i32>>()?;
        return Some(bytes.value(row).to_vec());
    }
    array
        .as_any()
        .downcast_ref::<BinaryArray<i32>>()
        .map(|bytes| bytes.value(row).to_vec())
}

fn label_value(array: &dyn Array, row: usize) -> Option<i64> {
    if let Some(labels) = array.as_any().downcast_ref::<PrimitiveArray<i64>>() {
        return Some(labels.value(row));
    }
    if let Some(labels) = array.as_any().downcast_ref::<PrimitiveArray<i32>>() {
        return Some(labels.value(row) as i64);
    }
    None
}

/// Ecosystem-delegated construction for `tfds/<name>` identifiers.
///
/// Validates the requested split against the splits reported by the remote
/// file layout before constructing; an unavailable split is a programming
/// error, not a recoverable condition.
pub fn build_tabular(
    name: &str,
    root: &Path,
    split: &str,
    download: bool,
) -> Result<HubImageDataset, DatasetError> {
    disable_gpu_visibility();
    let hub = HubDataset::from_id_in(name.to_string(), root)?;
    let splits = hub.splits()?;
    assert!(splits.iter().any(|s| s == split), "({split}, {splits:?})");
    let paths = hub.fetch(Some(split), None, download)?;
    HubImageDataset::from_paths(&paths, ("image", "label"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_from_directory_layout() {
        assert_eq!(
            config_and_split("fashion_mnist/test/0000.parquet"),
            Some(("fashion_mnist", "test")),
        );
    }

    #[test]
    fn split_from_file_stem_layout() {
        assert_eq!(
            config_and_split("wikitext-103-raw-v1/wikitext-test.parquet"),
            Some(("wikitext-103-raw-v1", "test")),
        );
        assert_eq!(
            config_and_split("wikitext-103-v1/wikitext-train-00000-of-00002.parquet"),
            Some(("wikitext-103-v1", "train")),
        );
    }

    #[test]
    fn classes_from_hub_schema_metadata() {
        let raw = r#"{"info": {"features": {
            "image": {"_type": "Image"},
            "label": {"_type": "ClassLabel", "names": ["cat", "dog"]}
        }}}"#;
        assert_eq!(
            classes_from_metadata(raw, "label"),
            Some(vec!["cat".to_string(), "dog".to_string()]),
        );
        assert_eq!(classes_from_metadata(raw, "fine_label"), None);
        assert_eq!(classes_from_metadata("not json", "label"), None);
    }
}
