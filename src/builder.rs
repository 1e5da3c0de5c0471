//! Dataset resolution and normalization.
//!
//! [`build_dataset`] is the main entry point: it maps an identifier to a
//! backend family, constructs the raw dataset, applies the
//! identifier-specific fixes (curated class names, label-index corrections,
//! manual-download gating) and returns a uniform [`DatasetHandle`].
//!
//! The per-identifier policy lives in the [`KNOWN_DATASETS`](self) table
//! rather than a branch chain, so every known dataset and its fixes can be
//! read off (and tested) as data.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use crate::captions::{CocoCaptionsDataset, FlickrCaptionsDataset};
use crate::classnames;
use crate::folder::ImageFolderDataset;
use crate::hub::HubImageDataset;
use crate::vtab::{self, VtabSource};
use crate::{hub, Dataset, DatasetError, RawDataset, Sample, Target, Transform};

/// Options for [`build_dataset`].
#[derive(Clone)]
pub struct BuildOptions {
    /// Root folder where datasets are downloaded and stored; can be shared
    /// among datasets.
    pub root: PathBuf,
    /// Split to use; depending on the dataset different options exist, in
    /// general `train` and `test` are available.
    pub split: String,
    /// Whether backends may download missing data.
    pub download: bool,
    /// Only for datasets with captions (used for retrieval) such as COCO
    /// and Flickr.
    pub annotation_file: Option<PathBuf>,
    /// Transform applied to every image the handle yields.
    pub transform: Option<Arc<dyn Transform>>,
    /// Unrecognized options, forwarded verbatim to the selected backend.
    pub extra: HashMap<String, String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("root"),
            split: "test".to_string(),
            download: true,
            annotation_file: None,
            transform: None,
            extra: HashMap::new(),
        }
    }
}

impl BuildOptions {
    /// Options rooted at `root`, with the default `test` split.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Select the split.
    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    /// Allow or forbid backend downloads.
    pub fn download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// Annotation file for the caption corpora.
    pub fn annotation_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.annotation_file = Some(path.into());
        self
    }

    /// Image transform applied by the handle.
    pub fn transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Forward an extra option verbatim to the backend.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A normalized dataset: uniformly indexable (image, target) records
/// carrying their class vocabulary.
pub struct DatasetHandle {
    raw: Box<dyn RawDataset>,
    /// Ordered class names; position = integer label.
    pub classes: Vec<String>,
    transform: Option<Arc<dyn Transform>>,
    target_transform: Option<fn(i64) -> i64>,
}

impl DatasetHandle {
    fn from_raw(raw: Box<dyn RawDataset>, transform: Option<Arc<dyn Transform>>) -> Self {
        let classes = raw.classes();
        Self {
            raw,
            classes,
            transform,
            target_transform: None,
        }
    }

    /// The number of classes.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

impl Dataset for DatasetHandle {
    type Item = Sample;

    fn len(&self) -> usize {
        self.raw.len()
    }

    fn get(&self, index: usize) -> Option<Sample> {
        let mut sample = self.raw.get(index)?;
        if let Some(transform) = &self.transform {
            sample.image = transform.apply(sample.image);
        }
        if let (Some(fix), Target::Label(label)) = (self.target_transform, &sample.target) {
            sample.target = Target::Label(fix(*label));
        }
        Some(sample)
    }
}

/// Where the resolver gets its raw datasets from.
///
/// [`DefaultRegistry`] wires the crate's real backends; tests substitute
/// fixtures.
pub trait BackendRegistry {
    /// Construct the raw dataset described by `request`.
    fn construct(&self, request: &BackendRequest<'_>)
        -> Result<Box<dyn RawDataset>, DatasetError>;
}

/// A fully resolved backend construction request.
pub enum BackendRequest<'a> {
    /// A plain classification archive, served from its hub conversion.
    Archive {
        /// Which archive.
        kind: ArchiveKind,
        /// Shared dataset root.
        root: &'a Path,
        /// Backend-native split name, `None` for unsplit archives.
        split: Option<&'a str>,
        /// Whether the backend may download.
        download: bool,
        /// Options forwarded verbatim.
        extra: &'a HashMap<String, String>,
    },
    /// A COCO-format caption corpus.
    CocoCaptions {
        /// Image directory.
        root: &'a Path,
        /// Caption annotation file.
        annotation_file: Option<&'a Path>,
    },
    /// A Kaggle-layout Flickr caption corpus.
    FlickrCaptions {
        /// Image directory.
        root: &'a Path,
        /// Caption annotation file.
        annotation_file: Option<&'a Path>,
    },
    /// A folder of class subdirectories.
    Folder {
        /// The (already split-redirected) folder.
        root: &'a Path,
    },
    /// A hub-delegated tabular dataset (`tfds/<name>`).
    Tabular {
        /// Hub dataset name.
        name: &'a str,
        /// Shared dataset root.
        root: &'a Path,
        /// Requested split, validated against the backend-reported splits.
        split: &'a str,
        /// Whether the backend may download.
        download: bool,
    },
    /// A curated tabular dataset (`vtab/<name>`), already resolved.
    Vtab {
        /// Where and how the dataset is served.
        source: VtabSource,
        /// Shared dataset root.
        root: &'a Path,
        /// Requested split.
        split: &'a str,
        /// Whether the backend may download.
        download: bool,
    },
}

/// The registry wired to the crate's real backends.
pub struct DefaultRegistry;

impl BackendRegistry for DefaultRegistry {
    fn construct(
        &self,
        request: &BackendRequest<'_>,
    ) -> Result<Box<dyn RawDataset>, DatasetError> {
        match request {
            BackendRequest::Archive {
                kind,
                root,
                split,
                download,
                extra,
            } => Ok(Box::new(HubImageDataset::open(
                kind.hub_id(),
                root,
                *split,
                *download,
                kind.columns(),
                extra,
            )?)),
            BackendRequest::CocoCaptions {
                root,
                annotation_file,
            } => Ok(Box::new(CocoCaptionsDataset::open(root, *annotation_file)?)),
            BackendRequest::FlickrCaptions {
                root,
                annotation_file,
            } => Ok(Box::new(FlickrCaptionsDataset::open(
                root,
                *annotation_file,
            )?)),
            BackendRequest::Folder { root } => Ok(Box::new(ImageFolderDataset::open(root)?)),
            BackendRequest::Tabular {
                name,
                root,
                split,
                download,
            } => Ok(Box::new(hub::build_tabular(name, root, split, *download)?)),
            BackendRequest::Vtab {
                source,
                root,
                split,
                download,
            } => Ok(Box::new(vtab::build(source, root, split, *download)?)),
        }
    }
}

/// One of the plain classification archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ArchiveKind {
    Cifar10,
    Cifar100,
    ImageNet1k,
    Voc2007,
    Food101,
    Sun397,
    Cars,
    FgvcAircraft,
    Dtd,
    Pets,
    Caltech101,
    Flowers,
    Mnist,
    Stl10,
    EuroSat,
    Gtsrb,
    Country211,
    Pcam,
    RenderedSst2,
}

impl ArchiveKind {
    /// Hub repository serving this archive's parquet conversion.
    pub fn hub_id(self) -> &'static str {
        match self {
            ArchiveKind::Cifar10 => "uoft-cs/cifar10",
            ArchiveKind::Cifar100 => "uoft-cs/cifar100",
            ArchiveKind::ImageNet1k => "ILSVRC/imagenet-1k",
            ArchiveKind::Voc2007 => "clip-benchmark/wds_voc2007",
            ArchiveKind::Food101 => "ethz/food101",
            ArchiveKind::Sun397 => "tanganke/sun397",
            ArchiveKind::Cars => "tanganke/stanford_cars",
            ArchiveKind::FgvcAircraft => "HuggingFaceM4/FGVC-Aircraft",
            ArchiveKind::Dtd => "tanganke/dtd",
            ArchiveKind::Pets => "timm/oxford-iiit-pet",
            // upstream download link is broken, pinned mirror
            ArchiveKind::Caltech101 => "HuggingFaceM4/Caltech-101",
            ArchiveKind::Flowers => "nelorth/oxford-flowers",
            ArchiveKind::Mnist => "ylecun/mnist",
            ArchiveKind::Stl10 => "tanganke/stl10",
            ArchiveKind::EuroSat => "blanchon/EuroSAT_RGB",
            ArchiveKind::Gtsrb => "tanganke/gtsrb",
            ArchiveKind::Country211 => "clip-benchmark/wds_country211",
            // dead upstream link, pinned mirror
            ArchiveKind::Pcam => "1aurent/PatchCamelyon",
            ArchiveKind::RenderedSst2 => "clip-benchmark/wds_renderedsst2",
        }
    }

    /// The (image, label) column names of the parquet records.
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            ArchiveKind::Cifar10 => ("img", "label"),
            ArchiveKind::Cifar100 => ("img", "fine_label"),
            _ => ("image", "label"),
        }
    }
}

/// Split vocabulary of an archive backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitStyle {
    /// `train` / `test`.
    TrainTest,
    /// `train` / `val`.
    TrainVal,
    /// The backend takes no split.
    Unsplit,
}

impl SplitStyle {
    fn native(self, train: bool) -> Option<&'static str> {
        match self {
            SplitStyle::TrainTest => Some(if train { "train" } else { "test" }),
            SplitStyle::TrainVal => Some(if train { "train" } else { "val" }),
            SplitStyle::Unsplit => None,
        }
    }
}

/// What to do when a manually downloaded artifact is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingPolicy {
    /// Print the remediation message and proceed; the backend raises its own
    /// error later.
    WarnAndDefer,
    /// Print the remediation message and terminate the process.
    Exit,
}

/// Precondition for datasets that cannot be downloaded automatically.
struct ManualGate {
    url: &'static str,
    policy: MissingPolicy,
}

/// How a known identifier constructs its raw dataset.
enum Construction {
    Archive(ArchiveKind),
    CocoCaptions,
    FlickrCaptions,
    /// Generic folder backend under `<root>/train` or `<root>/test`.
    Folder,
}

/// One known identifier and its normalization policy.
struct KnownDataset {
    name: &'static str,
    construction: Construction,
    split: SplitStyle,
    /// Curated vocabulary overriding the backend-native names.
    classes: Option<&'static [&'static str]>,
    /// Replace underscores by spaces in the native names.
    underscores_to_spaces: bool,
    /// Probe the first sample for 1-indexed labels and decrement if needed.
    probe_label_offset: bool,
    manual: Option<ManualGate>,
}

const fn archive(name: &'static str, kind: ArchiveKind, split: SplitStyle) -> KnownDataset {
    KnownDataset {
        name,
        construction: Construction::Archive(kind),
        split,
        classes: None,
        underscores_to_spaces: false,
        probe_label_offset: false,
        manual: None,
    }
}

/// Every directly supported identifier with its fixes.
const KNOWN_DATASETS: &[KnownDataset] = &[
    archive("cifar10", ArchiveKind::Cifar10, SplitStyle::TrainTest),
    archive("cifar100", ArchiveKind::Cifar100, SplitStyle::TrainTest),
    // native names are WordNet synsets, use the curated ones
    KnownDataset {
        classes: Some(classnames::IMAGENET1K),
        ..archive("imagenet1k", ArchiveKind::ImageNet1k, SplitStyle::TrainVal)
    },
    archive("voc2007", ArchiveKind::Voc2007, SplitStyle::TrainTest),
    KnownDataset {
        name: "mscoco_captions",
        construction: Construction::CocoCaptions,
        split: SplitStyle::Unsplit,
        classes: None,
        underscores_to_spaces: false,
        probe_label_offset: false,
        manual: Some(ManualGate {
            url: "https://cocodataset.org/",
            policy: MissingPolicy::WarnAndDefer,
        }),
    },
    KnownDataset {
        name: "flickr30k",
        construction: Construction::FlickrCaptions,
        split: SplitStyle::Unsplit,
        classes: None,
        underscores_to_spaces: false,
        probe_label_offset: false,
        manual: Some(ManualGate {
            url: "https://www.kaggle.com/datasets/adityajn105/flickr30k",
            policy: MissingPolicy::Exit,
        }),
    },
    KnownDataset {
        name: "flickr8k",
        construction: Construction::FlickrCaptions,
        split: SplitStyle::Unsplit,
        classes: None,
        underscores_to_spaces: false,
        probe_label_offset: false,
        manual: Some(ManualGate {
            url: "https://www.kaggle.com/datasets/adityajn105/flickr8k",
            policy: MissingPolicy::Exit,
        }),
    },
    // native names use underscore-as-space encoding
    KnownDataset {
        underscores_to_spaces: true,
        ..archive("food101", ArchiveKind::Food101, SplitStyle::TrainTest)
    },
    KnownDataset {
        underscores_to_spaces: true,
        ..archive("sun397", ArchiveKind::Sun397, SplitStyle::Unsplit)
    },
    archive("cars", ArchiveKind::Cars, SplitStyle::TrainTest),
    archive(
        "fgvc_aircraft",
        ArchiveKind::FgvcAircraft,
        SplitStyle::TrainTest,
    ),
    archive("dtd", ArchiveKind::Dtd, SplitStyle::TrainTest),
    archive("pets", ArchiveKind::Pets, SplitStyle::TrainTest),
    KnownDataset {
        classes: Some(classnames::CALTECH101),
        ..archive("caltech101", ArchiveKind::Caltech101, SplitStyle::Unsplit)
    },
    KnownDataset {
        classes: Some(classnames::FLOWERS),
        probe_label_offset: true,
        ..archive("flowers", ArchiveKind::Flowers, SplitStyle::TrainTest)
    },
    KnownDataset {
        classes: Some(classnames::MNIST),
        ..archive("mnist", ArchiveKind::Mnist, SplitStyle::TrainTest)
    },
    archive("stl10", ArchiveKind::Stl10, SplitStyle::TrainTest),
    KnownDataset {
        classes: Some(classnames::EUROSAT),
        ..archive("eurosat", ArchiveKind::EuroSat, SplitStyle::Unsplit)
    },
    KnownDataset {
        classes: Some(classnames::GTSRB),
        ..archive("gtsrb", ArchiveKind::Gtsrb, SplitStyle::TrainTest)
    },
    KnownDataset {
        classes: Some(classnames::COUNTRY211),
        ..archive("country211", ArchiveKind::Country211, SplitStyle::TrainTest)
    },
    KnownDataset {
        classes: Some(classnames::PCAM),
        ..archive("pcam", ArchiveKind::Pcam, SplitStyle::TrainTest)
    },
    archive(
        "renderedsst2",
        ArchiveKind::RenderedSst2,
        SplitStyle::TrainTest,
    ),
    // no first-party backend exists; expects a manually downloaded folder
    KnownDataset {
        name: "fer2013",
        construction: Construction::Folder,
        split: SplitStyle::TrainTest,
        classes: Some(classnames::FER2013),
        underscores_to_spaces: false,
        probe_label_offset: false,
        manual: Some(ManualGate {
            url: "https://www.kaggle.com/datasets/msambare/fer2013",
            policy: MissingPolicy::WarnAndDefer,
        }),
    },
];

/// Main function to use in order to build a dataset instance.
///
/// `dataset_name` is either one of the known identifiers, or namespaced as
/// `tfds/<name>` / `vtab/<name>` for the remote-tabular families.
pub fn build_dataset(
    dataset_name: &str,
    options: &BuildOptions,
) -> Result<DatasetHandle, DatasetError> {
    build_dataset_with(&DefaultRegistry, dataset_name, options)
}

/// Like [`build_dataset`], constructing backends through `registry`.
pub fn build_dataset_with(
    registry: &dyn BackendRegistry,
    dataset_name: &str,
    options: &BuildOptions,
) -> Result<DatasetHandle, DatasetError> {
    let train = options.split == "train";
    if let Some(known) = KNOWN_DATASETS
        .iter()
        .find(|known| known.name == dataset_name)
    {
        return build_known(registry, known, train, options);
    }
    match decompose(dataset_name) {
        Some(("tfds", name)) => build_tfds(registry, name, options),
        Some(("vtab", name)) => build_vtab(registry, name, options),
        _ => Err(DatasetError::Unsupported(dataset_name.to_string())),
    }
}

fn build_known(
    registry: &dyn BackendRegistry,
    known: &KnownDataset,
    train: bool,
    options: &BuildOptions,
) -> Result<DatasetHandle, DatasetError> {
    let folder_root = options.root.join(if train { "train" } else { "test" });

    if let Some(gate) = &known.manual {
        let present = match known.construction {
            Construction::Folder => folder_root.exists(),
            _ => options
                .annotation_file
                .as_deref()
                .map(Path::exists)
                .unwrap_or(false),
        };
        if !present {
            eprintln!(
                "You need to download this dataset manually. Please download the dataset from {}",
                gate.url
            );
            if gate.policy == MissingPolicy::Exit {
                process::exit(1);
            }
        }
    }

    let annotation_file = options.annotation_file.as_deref();
    let raw = match known.construction {
        Construction::Archive(kind) => registry.construct(&BackendRequest::Archive {
            kind,
            root: &options.root,
            split: known.split.native(train),
            download: options.download,
            extra: &options.extra,
        })?,
        Construction::CocoCaptions => registry.construct(&BackendRequest::CocoCaptions {
            root: &options.root,
            annotation_file,
        })?,
        Construction::FlickrCaptions => registry.construct(&BackendRequest::FlickrCaptions {
            root: &options.root,
            annotation_file,
        })?,
        Construction::Folder => registry.construct(&BackendRequest::Folder {
            root: &folder_root,
        })?,
    };

    let mut handle = DatasetHandle::from_raw(raw, options.transform.clone());
    if known.probe_label_offset {
        // some conversions 1-index these labels; probe the first sample
        // instead of trusting a version number
        if let Some(Sample {
            target: Target::Label(1),
            ..
        }) = handle.raw.get(0)
        {
            handle.target_transform = Some(|label| label - 1);
        }
    }
    if let Some(classes) = known.classes {
        handle.classes = classes.iter().map(|name| name.to_string()).collect();
    }
    if known.underscores_to_spaces {
        for name in &mut handle.classes {
            *name = name.replace('_', " ");
        }
    }
    Ok(handle)
}

fn build_tfds(
    registry: &dyn BackendRegistry,
    name: &str,
    options: &BuildOptions,
) -> Result<DatasetHandle, DatasetError> {
    let raw = registry.construct(&BackendRequest::Tabular {
        name,
        root: &options.root,
        split: &options.split,
        download: options.download,
    })?;
    Ok(DatasetHandle::from_raw(raw, options.transform.clone()))
}

fn build_vtab(
    registry: &dyn BackendRegistry,
    name: &str,
    options: &BuildOptions,
) -> Result<DatasetHandle, DatasetError> {
    let source = vtab::resolve(name)?;
    let raw = registry.construct(&BackendRequest::Vtab {
        source,
        root: &options.root,
        split: &options.split,
        download: options.download,
    })?;
    let mut handle = DatasetHandle::from_raw(raw, options.transform.clone());
    if let Some(classes) = source.classes {
        handle.classes = classes.iter().map(|name| name.to_string()).collect();
    }
    Ok(handle)
}

/// Split a namespaced identifier into `(family, name)` on the first `/`.
pub fn decompose(identifier: &str) -> Option<(&str, &str)> {
    identifier.split_once('/')
}

/// Split a name of the form `x_task_with_underscores` into `(x, task)` on
/// the first `_`.
pub fn extract_task(name: &str) -> (&str, &str) {
    name.split_once('_').unwrap_or((name, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView};

    fn sample(label: i64) -> Sample {
        Sample {
            image: DynamicImage::new_rgb8(1, 1),
            target: Target::Label(label),
        }
    }

    struct FixtureRaw {
        labels: Vec<i64>,
        classes: Vec<String>,
    }

    impl RawDataset for FixtureRaw {
        fn len(&self) -> usize {
            self.labels.len()
        }

        fn get(&self, index: usize) -> Option<Sample> {
            self.labels.get(index).map(|label| sample(*label))
        }

        fn classes(&self) -> Vec<String> {
            self.classes.clone()
        }
    }

    /// Fixture registry mirroring the native class counts of the real
    /// backends.
    #[derive(Default)]
    struct FixtureRegistry {
        first_label: i64,
    }

    impl BackendRegistry for FixtureRegistry {
        fn construct(
            &self,
            request: &BackendRequest<'_>,
        ) -> Result<Box<dyn RawDataset>, DatasetError> {
            let classes = match request {
                BackendRequest::Archive { kind, .. } => native_classes(*kind),
                _ => Vec::new(),
            };
            Ok(Box::new(FixtureRaw {
                labels: vec![self.first_label, self.first_label + 1],
                classes,
            }))
        }
    }

    /// Fixture registry answering every request with the given native names.
    struct NamedRegistry(Vec<&'static str>);

    impl BackendRegistry for NamedRegistry {
        fn construct(
            &self,
            _request: &BackendRequest<'_>,
        ) -> Result<Box<dyn RawDataset>, DatasetError> {
            Ok(Box::new(FixtureRaw {
                labels: vec![0, 1],
                classes: self.0.iter().map(|name| name.to_string()).collect(),
            }))
        }
    }

    fn native_classes(kind: ArchiveKind) -> Vec<String> {
        let count = match kind {
            ArchiveKind::Cifar10 => 10,
            ArchiveKind::Cifar100 => 100,
            ArchiveKind::ImageNet1k => 1000,
            ArchiveKind::Voc2007 => 20,
            ArchiveKind::Food101 => 101,
            ArchiveKind::Sun397 => 397,
            ArchiveKind::Cars => 196,
            ArchiveKind::FgvcAircraft => 100,
            ArchiveKind::Dtd => 47,
            ArchiveKind::Pets => 37,
            ArchiveKind::Caltech101 => 101,
            ArchiveKind::Flowers => 102,
            ArchiveKind::Mnist => 10,
            ArchiveKind::Stl10 => 10,
            ArchiveKind::EuroSat => 10,
            ArchiveKind::Gtsrb => 43,
            ArchiveKind::Country211 => 211,
            ArchiveKind::Pcam => 2,
            ArchiveKind::RenderedSst2 => 2,
        };
        (0..count).map(|index| format!("class_{index}")).collect()
    }

    #[test]
    fn classes_length_matches_documented_vocabulary() {
        let registry = FixtureRegistry::default();
        let options = BuildOptions::default();
        let expected = [
            ("cifar10", 10),
            ("cifar100", 100),
            ("imagenet1k", 1000),
            ("voc2007", 20),
            ("food101", 101),
            ("sun397", 397),
            ("cars", 196),
            ("fgvc_aircraft", 100),
            ("dtd", 47),
            ("pets", 37),
            ("caltech101", 102),
            ("flowers", 102),
            ("mnist", 10),
            ("stl10", 10),
            ("eurosat", 10),
            ("gtsrb", 43),
            ("country211", 211),
            ("pcam", 2),
            ("renderedsst2", 2),
        ];
        for (name, count) in expected {
            let handle = build_dataset_with(&registry, name, &options).unwrap();
            assert_eq!(handle.num_classes(), count, "{name}");
        }
    }

    #[test]
    fn underscores_become_spaces() {
        let registry = NamedRegistry(vec!["apple_pie", "baby_back_ribs"]);
        let options = BuildOptions::default();
        let handle = build_dataset_with(&registry, "food101", &options).unwrap();
        assert_eq!(handle.classes, ["apple pie", "baby back ribs"]);
    }

    #[test]
    fn flowers_probe_decrements_one_indexed_labels() {
        let registry = FixtureRegistry { first_label: 1 };
        let options = BuildOptions::default();
        let handle = build_dataset_with(&registry, "flowers", &options).unwrap();
        assert_eq!(handle.get(0).unwrap().target.as_label(), Some(0));
        assert_eq!(handle.get(1).unwrap().target.as_label(), Some(1));
    }

    #[test]
    fn flowers_probe_keeps_zero_indexed_labels() {
        let registry = FixtureRegistry::default();
        let options = BuildOptions::default();
        let handle = build_dataset_with(&registry, "flowers", &options).unwrap();
        assert_eq!(handle.get(0).unwrap().target.as_label(), Some(0));
        assert_eq!(handle.get(1).unwrap().target.as_label(), Some(1));
    }

    #[test]
    fn coco_missing_annotation_defers_to_backend() {
        let registry = FixtureRegistry::default();
        let options =
            BuildOptions::default().annotation_file("/definitely/not/there/captions.json");
        // warn-and-defer: backend construction must still be reached
        assert!(build_dataset_with(&registry, "mscoco_captions", &options).is_ok());
    }

    #[test]
    fn gate_policies_match_the_documented_table() {
        let gate = |name: &str| {
            KNOWN_DATASETS
                .iter()
                .find(|known| known.name == name)
                .unwrap()
                .manual
                .as_ref()
                .unwrap()
        };
        assert_eq!(gate("mscoco_captions").policy, MissingPolicy::WarnAndDefer);
        assert_eq!(gate("fer2013").policy, MissingPolicy::WarnAndDefer);
        assert_eq!(gate("flickr30k").policy, MissingPolicy::Exit);
        assert_eq!(gate("flickr8k").policy, MissingPolicy::Exit);
    }

    #[test]
    fn unsupported_identifiers_fail() {
        let registry = FixtureRegistry::default();
        let options = BuildOptions::default();
        for name in ["celeba", "wds/cifar10", "tfds"] {
            assert!(
                matches!(
                    build_dataset_with(&registry, name, &options),
                    Err(DatasetError::Unsupported(_))
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn decompose_and_extract_task() {
        assert_eq!(
            decompose("tfds/clevr_count_all"),
            Some(("tfds", "clevr_count_all"))
        );
        assert_eq!(decompose("cifar10"), None);
        assert_eq!(extract_task("clevr_count_all"), ("clevr", "count_all"));
        assert_eq!(
            extract_task("kitti_closest_vehicle_distance").1,
            "closest_vehicle_distance"
        );
        assert_eq!(extract_task("cub"), ("cub", ""));
    }

    #[test]
    fn vtab_override_applies_through_the_resolver() {
        let registry = FixtureRegistry::default();
        let options = BuildOptions::default();
        let handle = build_dataset_with(&registry, "vtab/eurosat", &options).unwrap();
        assert_eq!(handle.num_classes(), 10);
        assert_eq!(handle.classes[0], "annual crop land");
    }

    #[test]
    fn tfds_keeps_backend_native_classes() {
        let registry = NamedRegistry(vec!["zero", "one"]);
        let options = BuildOptions::default();
        let handle = build_dataset_with(&registry, "tfds/mnist", &options).unwrap();
        assert_eq!(handle.classes, ["zero", "one"]);
    }

    struct Upscale;

    impl Transform for Upscale {
        fn apply(&self, image: DynamicImage) -> DynamicImage {
            image.resize_exact(3, 3, image::imageops::FilterType::Nearest)
        }
    }

    #[test]
    fn handle_applies_the_transform() {
        let registry = FixtureRegistry::default();
        let options = BuildOptions::default().transform(Arc::new(Upscale));
        let handle = build_dataset_with(&registry, "cifar10", &options).unwrap();
        assert_eq!(handle.get(0).unwrap().image.width(), 3);
    }

    #[test]
    fn split_translation_per_style() {
        assert_eq!(SplitStyle::TrainTest.native(true), Some("train"));
        assert_eq!(SplitStyle::TrainTest.native(false), Some("test"));
        assert_eq!(SplitStyle::TrainVal.native(false), Some("val"));
        assert_eq!(SplitStyle::Unsplit.native(false), None);
    }
}
