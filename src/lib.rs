#![deny(missing_docs)]
//! Dataset acquisition and normalization for zero-shot image benchmarks.
//!
//! Given a dataset identifier and a split, [`build_dataset`] resolves the
//! right backend family (hub-hosted parquet conversions, caption corpora,
//! manually downloaded folders), applies the identifier-specific corrections
//! (curated class names, label-index fixes, manual-download gating) and
//! returns a uniform handle of (image, label) records together with its
//! ordered class vocabulary.
//!
//! The prompt templates and curated vocabularies used downstream to
//! synthesize per-class text embeddings live in [`templates`] and
//! [`classnames`].
use image::DynamicImage;
use std::num::{ParseIntError, TryFromIntError};
use thiserror::Error;

pub mod builder;
pub mod captions;
pub mod classnames;
pub mod collate;
pub mod folder;
pub mod hub;
pub mod templates;
pub mod vtab;

pub use builder::{
    build_dataset, build_dataset_with, decompose, extract_task, ArchiveKind, BackendRegistry,
    BackendRequest, BuildOptions, DatasetHandle, DefaultRegistry,
};
pub use classnames::{classnames, CLASSNAMES, VTAB_19TASKS};
pub use collate::{get_dataset_collate_fn, Batch, CollateFn};
pub use templates::{
    get_zeroshot_classification_templates, DEFAULT_ZEROSHOT_CLASSIFICATION_TEMPLATES,
};

/// The default trait to implement to get the simplest API
pub trait Dataset {
    /// The type of objects contained in the dataset
    type Item;

    /// The length of the dataset
    fn len(&self) -> usize;

    /// Get item at specific index. Should return `None` if and only if
    /// `index >= dataset.len()`.
    fn get(&self, index: usize) -> Option<Self::Item>;
}

/// Generic structure to iterate over [`Dataset`].
pub struct DatasetIterator<'a, D> {
    dataset: &'a D,
    index: usize,
}

/// Iterate of the dataset in order
pub fn iter<D: Dataset>(dataset: &D) -> DatasetIterator<'_, D> {
    DatasetIterator { dataset, index: 0 }
}

impl<'a, D: Dataset> Iterator for DatasetIterator<'a, D> {
    type Item = D::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let object = self.dataset.get(self.index);
        self.index += 1;
        object
    }
}

/// The supervision attached to a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Integer class label; position into the dataset's class vocabulary.
    Label(i64),
    /// Caption list, for the retrieval corpora.
    Captions(Vec<String>),
}

impl Target {
    /// The integer label, if this is a classification target.
    pub fn as_label(&self) -> Option<i64> {
        match self {
            Target::Label(label) => Some(*label),
            Target::Captions(_) => None,
        }
    }
}

/// A single record of a dataset: a decoded image and its supervision.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The decoded image.
    pub image: DynamicImage,
    /// Label or caption list.
    pub target: Target,
}

/// An image transform applied to every sample a handle yields.
pub trait Transform: Send + Sync {
    /// Apply the transform to a decoded image.
    fn apply(&self, image: DynamicImage) -> DynamicImage;
}

/// A dataset as constructed by a backend, before normalization.
///
/// Backends report their native class names through [`RawDataset::classes`];
/// the resolver decides whether those survive or get overridden by a curated
/// vocabulary.
pub trait RawDataset: Send + Sync {
    /// The number of records.
    fn len(&self) -> usize;

    /// Record at `index`, `None` past the end.
    fn get(&self, index: usize) -> Option<Sample>;

    /// Backend-native class names; empty when the backend has none.
    fn classes(&self) -> Vec<String>;
}

/// Error type for datasets
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The error comes from api usage.
    #[error("api: {0}")]
    ApiError(#[from] hf_hub::api::sync::ApiError),

    /// The requested identifier matches no known dataset, prefix or pattern.
    #[error("Unsupported dataset: {0}.")]
    Unsupported(String),

    /// We expected the magic number in the parquet file but didn't see it.
    #[error("Invalid parquet magic number")]
    InvalidParquetMagic,

    /// parquet error
    #[error("ParquetError: {0}")]
    ParquetError(#[from] parquet2::error::Error),

    /// arrow error
    #[error("ArrowError: {0}")]
    ArrowError(#[from] arrow2::error::Error),

    /// Error from the row-oriented parquet reader.
    #[error("ParquetRowError: {0}")]
    ParquetRowError(#[from] parquet::errors::ParquetError),

    /// The header value is not valid utf-8
    #[error("header value is not a string")]
    ToStr(#[from] reqwest::header::ToStrError),

    /// Error in the request
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Cannot parse some range value
    #[error("Cannot parse int: {0}")]
    ParseIntError(#[from] ParseIntError),

    /// Error converting some ints
    #[error("Cannot convert int: {0}")]
    TryFromIntError(#[from] TryFromIntError),

    /// A response was missing a required header.
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    /// Filesystem error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed annotation file.
    #[error("annotation error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed caption file.
    #[error("caption file error: {0}")]
    CsvError(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers(Vec<i64>);

    impl Dataset for Numbers {
        type Item = i64;

        fn len(&self) -> usize {
            self.0.len()
        }

        fn get(&self, index: usize) -> Option<i64> {
            self.0.get(index).copied()
        }
    }

    #[test]
    fn iterate_in_order() {
        let dataset = Numbers(vec![3, 1, 2]);
        assert_eq!(iter(&dataset).collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(iter(&dataset).count(), dataset.len());
    }
}
