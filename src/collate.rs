//! Batch collation.
//!
//! Classification datasets batch element-wise into images and labels; the
//! caption corpora keep their variable-length caption lists as a sequence
//! of sequences. [`get_dataset_collate_fn`] picks the right collator for an
//! identifier.
use image::DynamicImage;

use crate::{Sample, Target};

/// Identifiers whose records carry caption lists instead of labels.
const CAPTION_DATASETS: &[&str] = &["mscoco_captions", "flickr30k", "flickr8k"];

/// A collated batch.
#[derive(Debug, Clone)]
pub enum Batch {
    /// Stacked images with one integer label each.
    Labels {
        /// The batch images, in order.
        images: Vec<DynamicImage>,
        /// One label per image.
        labels: Vec<i64>,
    },
    /// Stacked images with the caption lists left as-is.
    Captions {
        /// The batch images, in order.
        images: Vec<DynamicImage>,
        /// One caption list per image.
        captions: Vec<Vec<String>>,
    },
}

/// A batch-merging function.
pub type CollateFn = fn(Vec<Sample>) -> Batch;

/// The collator matching a dataset identifier: caption-aware for the caption
/// corpora, the default element-wise stacker for everything else.
pub fn get_dataset_collate_fn(dataset_name: &str) -> CollateFn {
    if CAPTION_DATASETS.contains(&dataset_name) {
        image_captions_collate_fn
    } else {
        default_collate
    }
}

/// Element-wise batch stacker for single-label datasets.
pub fn default_collate(batch: Vec<Sample>) -> Batch {
    let mut images = Vec::with_capacity(batch.len());
    let mut labels = Vec::with_capacity(batch.len());
    for sample in batch {
        images.push(sample.image);
        match sample.target {
            Target::Label(label) => labels.push(label),
            Target::Captions(_) => panic!("default collate expects integer labels"),
        }
    }
    Batch::Labels { images, labels }
}

/// Transposes a batch of (image, caption-list) pairs: images batch normally,
/// caption lists stay an ordered sequence of sequences.
pub fn image_captions_collate_fn(batch: Vec<Sample>) -> Batch {
    let mut images = Vec::with_capacity(batch.len());
    let mut captions = Vec::with_capacity(batch.len());
    for sample in batch {
        images.push(sample.image);
        match sample.target {
            Target::Captions(texts) => captions.push(texts),
            Target::Label(_) => panic!("caption collate expects caption lists"),
        }
    }
    Batch::Captions { images, captions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target: Target) -> Sample {
        Sample {
            image: DynamicImage::new_rgb8(2, 2),
            target,
        }
    }

    #[test]
    fn caption_corpora_get_the_caption_collator() {
        for name in ["mscoco_captions", "flickr30k", "flickr8k"] {
            let collate = get_dataset_collate_fn(name);
            let batch = collate(vec![sample(Target::Captions(vec!["a".to_string()]))]);
            assert!(matches!(batch, Batch::Captions { .. }), "{name}");
        }
        let collate = get_dataset_collate_fn("cifar10");
        let batch = collate(vec![sample(Target::Label(1))]);
        assert!(matches!(batch, Batch::Labels { .. }));
    }

    #[test]
    fn caption_collator_transposes() {
        let batch = vec![
            sample(Target::Captions(vec!["a".to_string(), "b".to_string()])),
            sample(Target::Captions(vec!["c".to_string()])),
        ];
        let Batch::Captions { images, captions } = image_captions_collate_fn(batch) else {
            panic!("expected a caption batch");
        };
        assert_eq!(images.len(), 2);
        assert_eq!(captions, vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn default_collator_stacks_labels() {
        let batch = vec![sample(Target::Label(4)), sample(Target::Label(0))];
        let Batch::Labels { images, labels } = default_collate(batch) else {
            panic!("expected a label batch");
        };
        assert_eq!(images.len(), 2);
        assert_eq!(labels, vec![4, 0]);
    }
}
