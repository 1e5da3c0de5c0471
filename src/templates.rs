//! Prompt templates used to synthesize per-class text queries for
//! zero-shot classification.
//!
//! Collected from a bunch of sources:
//! - CLIP paper (<https://github.com/openai/CLIP/blob/main/data/prompts.md>)
//! - Lit paper (<https://arxiv.org/pdf/2111.07991.pdf>)
//! - SLIP paper (<https://github.com/facebookresearch/SLIP/blob/main/templates.json>)
//!
//! Some are fixed manually. Every template carries a single `{c}` slot for
//! the class name.

const CIFAR10: &[&str] = &[
    "a photo of a {c}.",
    "a blurry photo of a {c}.",
    "a black and white photo of a {c}.",
    "a low contrast photo of a {c}.",
    "a high contrast photo of a {c}.",
    "a bad photo of a {c}.",
    "a good photo of a {c}.",
    "a photo of a small {c}.",
    "a photo of a big {c}.",
    "a photo of the {c}.",
    "a blurry photo of the {c}.",
    "a black and white photo of the {c}.",
    "a low contrast photo of the {c}.",
    "a high contrast photo of the {c}.",
    "a bad photo of the {c}.",
    "a good photo of the {c}.",
    "a photo of the small {c}.",
    "a photo of the big {c}.",
];

const CIFAR100: &[&str] = &[
    "a photo of a {c}.",
    "a blurry photo of a {c}.",
    "a black and white photo of a {c}.",
    "a low contrast photo of a {c}.",
    "a high contrast photo of a {c}.",
    "a bad photo of a {c}.",
    "a good photo of a {c}.",
    "a photo of a small {c}.",
    "a photo of a big {c}.",
    "a photo of the {c}.",
    "a blurry photo of the {c}.",
    "a black and white photo of the {c}.",
    "a low contrast photo of the {c}.",
    "a high contrast photo of the {c}.",
    "a bad photo of the {c}.",
    "a good photo of the {c}.",
    "a photo of the small {c}.",
    "a photo of the big {c}.",
];

const IMAGENET1K: &[&str] = &[
    "a bad photo of a {c}.",
    "a photo of many {c}.",
    "a sculpture of a {c}.",
    "a photo of the hard to see {c}.",
    "a low resolution photo of the {c}.",
    "a rendering of a {c}.",
    "graffiti of a {c}.",
    "a bad photo of the {c}.",
    "a cropped photo of the {c}.",
    "a tattoo of a {c}.",
    "the embroidered {c}.",
    "a photo of a hard to see {c}.",
    "a bright photo of a {c}.",
    "a photo of a clean {c}.",
    "a photo of a dirty {c}.",
    "a dark photo of the {c}.",
    "a drawing of a {c}.",
    "a photo of my {c}.",
    "the plastic {c}.",
    "a photo of the cool {c}.",
    "a close-up photo of a {c}.",
    "a black and white photo of the {c}.",
    "a painting of the {c}.",
    "a painting of a {c}.",
    "a pixelated photo of the {c}.",
    "a sculpture of the {c}.",
    "a bright photo of the {c}.",
    "a cropped photo of a {c}.",
    "a plastic {c}.",
    "a photo of the dirty {c}.",
    "a jpeg corrupted photo of a {c}.",
    "a blurry photo of the {c}.",
    "a photo of the {c}.",
    "a good photo of the {c}.",
    "a rendering of the {c}.",
    "a {c} in a video game.",
    "a photo of one {c}.",
    "a doodle of a {c}.",
    "a close-up photo of the {c}.",
    "a photo of a {c}.",
    "the origami {c}.",
    "the {c} in a video game.",
    "a sketch of a {c}.",
    "a doodle of the {c}.",
    "a origami {c}.",
    "a low resolution photo of a {c}.",
    "the toy {c}.",
    "a rendition of the {c}.",
    "a photo of the clean {c}.",
    "a photo of a large {c}.",
    "a rendition of a {c}.",
    "a photo of a nice {c}.",
    "a photo of a weird {c}.",
    "a blurry photo of a {c}.",
    "a cartoon {c}.",
    "art of a {c}.",
    "a sketch of the {c}.",
    "a embroidered {c}.",
    "a pixelated photo of a {c}.",
    "itap of the {c}.",
    "a jpeg corrupted photo of the {c}.",
    "a good photo of a {c}.",
    "a plushie {c}.",
    "a photo of the nice {c}.",
    "a photo of the small {c}.",
    "a photo of the weird {c}.",
    "the cartoon {c}.",
    "art of the {c}.",
    "a drawing of the {c}.",
    "a photo of the large {c}.",
    "a black and white photo of a {c}.",
    "the plushie {c}.",
    "a dark photo of a {c}.",
    "itap of a {c}.",
    "graffiti of the {c}.",
    "a toy {c}.",
    "itap of my {c}.",
    "a photo of a cool {c}.",
    "a photo of a small {c}.",
    "a tattoo of the {c}.",
];

const FOOD101: &[&str] = &[
    "a photo of {c}, a type of food.",
];

const SUN397: &[&str] = &[
    "a photo of a {c}.",
    "a photo of the {c}.",
];

const CARS: &[&str] = &[
    "a photo of a {c}.",
    "a photo of the {c}.",
    "a photo of my {c}.",
    "i love my {c}!",
    "a photo of my dirty {c}.",
    "a photo of my clean {c}.",
    "a photo of my new {c}.",
    "a photo of my old {c}.",
];

const FGVC_AIRCRAFT: &[&str] = &[
    "a photo of a {c}, a type of aircraft.",
    "a photo of the {c}, a type of aircraft.",
];

const DTD: &[&str] = &[
    "a photo of a {c} texture.",
    "a photo of a {c} pattern.",
    "a photo of a {c} thing.",
    "a photo of a {c} object.",
    "a photo of the {c} texture.",
    "a photo of the {c} pattern.",
    "a photo of the {c} thing.",
    "a photo of the {c} object.",
];

const PETS: &[&str] = &[
    "a photo of a {c}, a type of pet.",
];

const CALTECH101: &[&str] = &[
    "a photo of a {c}.",
    "a painting of a {c}.",
    "a plastic {c}.",
    "a sculpture of a {c}.",
    "a sketch of a {c}.",
    "a tattoo of a {c}.",
    "a toy {c}.",
    "a rendition of a {c}.",
    "a embroidered {c}.",
    "a cartoon {c}.",
    "a {c} in a video game.",
    "a plushie {c}.",
    "a origami {c}.",
    "art of a {c}.",
    "graffiti of a {c}.",
    "a drawing of a {c}.",
    "a doodle of a {c}.",
    "a photo of the {c}.",
    "a painting of the {c}.",
    "the plastic {c}.",
    "a sculpture of the {c}.",
    "a sketch of the {c}.",
    "a tattoo of the {c}.",
    "the toy {c}.",
    "a rendition of the {c}.",
    "the embroidered {c}.",
    "the cartoon {c}.",
    "the {c} in a video game.",
    "the plushie {c}.",
    "the origami {c}.",
    "art of the {c}.",
    "graffiti of the {c}.",
    "a drawing of the {c}.",
    "a doodle of the {c}.",
];

const FLOWERS: &[&str] = &[
    "a photo of a {c}, a type of flower.",
];

const MNIST: &[&str] = &[
    "a photo of the number: \"{c}\".",
];

const STL10: &[&str] = &[
    "a photo of a {c}.",
    "a photo of the {c}.",
];

const EUROSAT: &[&str] = &[
    "a centered satellite photo of {c}.",
    "a centered satellite photo of a {c}.",
    "a centered satellite photo of the {c}.",
];

const GTSRB: &[&str] = &[
    "a zoomed in photo of a \"{c}\" traffic sign.",
    "a centered photo of a \"{c}\" traffic sign.",
    "a close up photo of a \"{c}\" traffic sign.",
];

const COUNTRY211: &[&str] = &[
    "a photo i took in {c}.",
    "a photo i took while visiting {c}.",
    "a photo from my home country of {c}.",
    "a photo from my visit to {c}.",
    "a photo showing the country of {c}.",
];

const RENDEREDSST2: &[&str] = &[
    "a {c} review of a movie.",
];

const VOC2007: &[&str] = &[
    "a photo of a {c}.",
];

const FER2013: &[&str] = &[
    "a photo of a {c} looking face.",
    "a photo of a face showing the emotion: {c}.",
    "a photo of a face looking {c}.",
    "a face that looks {c}.",
    "they look {c}.",
    "look at how {c} they are.",
];

const CLEVR_COUNT_ALL: &[&str] = &[
    "a picture of {c} objects",
];

const CLEVR_CLOSEST_OBJECT_DISTANCE: &[&str] = &[
    "{c} shapes.",
];

const PCAM: &[&str] = &[
    "a histopathology slide showing {c}",
    "histopathology image of {c}",
];

const SVHN: &[&str] = &[
    "a photo of the number {c} written on a sign",
    "an outdoor house number {c}",
    "the number {c} in the center of the image",
    "an outdoor number {c} writte on a sign",
    "an outdoor number {c}",
    "a centered image of the number {c}",
];

const RESISC45: &[&str] = &[
    "a sattelite image of {c}",
    "an aerial view of {c}",
    "a sattelite photo of {c}",
    "{c} from above",
];

const KITTI_CLOSEST_VEHICLE_DISTANCE: &[&str] = &[
    "{c}",
];

const SMALLNORB_LABEL_AZIMUTH: &[&str] = &[
    "an object rotated at {c}",
    "something rotated at {c}",
    "{c} rotation",
    "something at a {c} angle",
];

const SMALLNORB_LABEL_ELEVATION: &[&str] = &[
    "an object rotated at {c}",
    "something rotated at {c}",
    "{c} rotation",
    "something at a {c} angle",
];

const DSPRITES_LABEL_X_POSITION: &[&str] = &[
    "an object located at position {c}% on the horizontal axis",
];

const DSPRITES_LABEL_ORIENTATION: &[&str] = &[
    "an object rotated at {c}",
    "something rotated at {c}",
    "{c} rotation",
    "something at a {c} angle",
];

const DMLAB: &[&str] = &[
    "{c}",
];

const DIABETIC_RETINOPATHY: &[&str] = &[
    "a retinal image with {c}",
];

static ZEROSHOT_CLASSIFICATION_TEMPLATES: &[(&str, &[&str])] = &[
    ("cifar10", CIFAR10),
    ("cifar100", CIFAR100),
    ("imagenet1k", IMAGENET1K),
    ("food101", FOOD101),
    ("sun397", SUN397),
    ("cars", CARS),
    ("fgvc_aircraft", FGVC_AIRCRAFT),
    ("dtd", DTD),
    ("pets", PETS),
    ("caltech101", CALTECH101),
    ("flowers", FLOWERS),
    ("mnist", MNIST),
    ("stl10", STL10),
    ("eurosat", EUROSAT),
    ("gtsrb", GTSRB),
    ("country211", COUNTRY211),
    ("renderedsst2", RENDEREDSST2),
    ("voc2007", VOC2007),
    ("fer2013", FER2013),
    ("clevr_count_all", CLEVR_COUNT_ALL),
    ("clevr_closest_object_distance", CLEVR_CLOSEST_OBJECT_DISTANCE),
    ("pcam", PCAM),
    ("svhn", SVHN),
    ("resisc45", RESISC45),
    ("kitti_closest_vehicle_distance", KITTI_CLOSEST_VEHICLE_DISTANCE),
    ("smallnorb_label_azimuth", SMALLNORB_LABEL_AZIMUTH),
    ("smallnorb_label_elevation", SMALLNORB_LABEL_ELEVATION),
    ("dsprites_label_x_position", DSPRITES_LABEL_X_POSITION),
    ("dsprites_label_orientation", DSPRITES_LABEL_ORIENTATION),
    ("dmlab", DMLAB),
    ("diabetic_retinopathy", DIABETIC_RETINOPATHY),
];

/// Template set used when an identifier has no entry of its own.
pub const DEFAULT_ZEROSHOT_CLASSIFICATION_TEMPLATES: &[&str] = IMAGENET1K;

/// Look up the prompt template set for a dataset identifier.
///
/// A leading `tfds/` or `vtab/` namespace is stripped before the lookup, so
/// `vtab/eurosat` and `eurosat` resolve to the same set. Unknown identifiers
/// fall back to [`DEFAULT_ZEROSHOT_CLASSIFICATION_TEMPLATES`].
pub fn get_zeroshot_classification_templates(dataset_name: &str) -> &'static [&'static str] {
    let name = if dataset_name.starts_with("tfds/") || dataset_name.starts_with("vtab/") {
        dataset_name.split('/').nth(1).unwrap_or(dataset_name)
    } else {
        dataset_name
    };
    ZEROSHOT_CLASSIFICATION_TEMPLATES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, set)| *set)
        .unwrap_or(DEFAULT_ZEROSHOT_CLASSIFICATION_TEMPLATES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_falls_back_to_default() {
        assert_eq!(
            get_zeroshot_classification_templates("unknown_name"),
            get_zeroshot_classification_templates("imagenet1k"),
        );
    }

    #[test]
    fn namespace_prefix_is_stripped() {
        assert_eq!(
            get_zeroshot_classification_templates("vtab/eurosat"),
            get_zeroshot_classification_templates("eurosat"),
        );
        assert_eq!(
            get_zeroshot_classification_templates("tfds/cifar10"),
            get_zeroshot_classification_templates("cifar10"),
        );
    }

    #[test]
    fn every_template_has_one_class_slot() {
        for (name, set) in ZEROSHOT_CLASSIFICATION_TEMPLATES {
            assert!(!set.is_empty(), "{name} has an empty template set");
            for template in *set {
                assert_eq!(
                    template.matches("{c}").count(),
                    1,
                    "{name}: {template:?}"
                );
            }
        }
    }
}
