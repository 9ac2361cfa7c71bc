//! The preset catalog: an ordered, append-only table of tuned parameter
//! sets.
//!
//! The table is configuration data, not code: catalog order drives batch
//! sequencing and progress reporting, and new entries can be appended
//! without touching orchestration logic. Lookups by unknown name miss
//! silently because preset triggers come from fixed UI identifiers.

use crate::params::{Method, ParameterSet};

/// Sentinel target name for the live, slider-driven parameter set.
pub const CUSTOM_TARGET: &str = "custom";

/// Display surface identifier for the custom preview.
pub const CUSTOM_TARGET_ID: &str = "customImage";

/// One named, pre-tuned visual style.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetEntry {
    pub name: &'static str,
    /// Identifier of the display surface this preset renders into.
    pub target_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub params: ParameterSet,
}

const fn entry(
    name: &'static str,
    target_id: &'static str,
    title: &'static str,
    description: &'static str,
    contrast: f32,
    brightness: i32,
    threshold: i32,
    noise: i32,
    blur_radius: f32,
    method: Method,
) -> PresetEntry {
    PresetEntry {
        name,
        target_id,
        title,
        description,
        params: ParameterSet {
            contrast,
            brightness,
            threshold,
            noise,
            blur_radius,
            color_tint: None,
            preserve_aspect_ratio: false,
            method,
        },
    }
}

static CATALOG: [PresetEntry; 12] = [
    entry(
        "medieval",
        "medievalImage",
        "Medieval Manuscript",
        "Illuminated-manuscript texture on aged parchment",
        1.4,
        -5,
        120,
        35,
        0.8,
        Method::Manuscript,
    ),
    entry(
        "threshold",
        "thresholdImage",
        "Clean Threshold",
        "Stark binary threshold rendering",
        1.6,
        0,
        90,
        15,
        0.0,
        Method::Threshold,
    ),
    entry(
        "atmospheric",
        "atmosphericImage",
        "Atmospheric Depths",
        "Tonal compression with heavy ambient blur",
        1.3,
        -15,
        150,
        25,
        2.0,
        Method::Atmospheric,
    ),
    entry(
        "silhouette",
        "silhouetteImage",
        "Silhouette",
        "Dark shapes against light backgrounds",
        2.8,
        25,
        75,
        8,
        0.0,
        Method::Silhouette,
    ),
    entry(
        "ghostly",
        "ghostlyImage",
        "Ghostly Apparition",
        "Ethereal blur with lifted shadows",
        1.2,
        35,
        190,
        30,
        2.5,
        Method::Ghostly,
    ),
    entry(
        "cavernDeep",
        "cavernDeepImage",
        "Cavern Deep",
        "Deep underground shadows and tunnel murk",
        2.2,
        -40,
        85,
        40,
        1.0,
        Method::Cavern,
    ),
    entry(
        "frozenWastes",
        "frozenWastesImage",
        "Frozen Wastes",
        "Crystalline winter processing, stark and minimal",
        2.8,
        50,
        120,
        12,
        0.0,
        Method::Frozen,
    ),
    entry(
        "darkRitual",
        "darkRitualImage",
        "Dark Ritual",
        "Heavy grain with dramatic occult shadows",
        2.4,
        -20,
        80,
        50,
        1.5,
        Method::Ritual,
    ),
    entry(
        "lithographic",
        "lithographicImage",
        "Lithographic Codex",
        "Historical printmaking with engraving-style edges",
        1.8,
        5,
        130,
        20,
        0.3,
        Method::Lithographic,
    ),
    entry(
        "sepiaNostalgia",
        "sepiaNostalgiaImage",
        "Sepia Nostalgia",
        "Vintage film degradation in warm sepia",
        1.1,
        20,
        140,
        18,
        0.7,
        Method::Sepia,
    ),
    entry(
        "comfyHearth",
        "comfyHearthImage",
        "Comfy Hearth",
        "Gentle earth tones and warm domestic haze",
        1.0,
        15,
        160,
        12,
        1.2,
        Method::Comfy,
    ),
    entry(
        "forestMystic",
        "forestMysticImage",
        "Forest Mystic",
        "Organic textures with deep green saturation",
        1.3,
        -10,
        110,
        28,
        1.0,
        Method::Forest,
    ),
];

/// The full catalog in batch order.
pub fn catalog() -> &'static [PresetEntry] {
    &CATALOG
}

/// Look up a preset by name. Unknown names miss silently.
pub fn find(name: &str) -> Option<&'static PresetEntry> {
    CATALOG.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_twelve_ordered_entries() {
        let entries = catalog();
        assert_eq!(entries.len(), 12);
        assert_eq!(entries.first().map(|e| e.name), Some("medieval"));
        assert_eq!(entries.last().map(|e| e.name), Some("forestMystic"));
    }

    #[test]
    fn test_find_returns_canonical_parameters() {
        let medieval = find("medieval").expect("medieval preset");
        assert_eq!(medieval.params.contrast, 1.4);
        assert_eq!(medieval.params.brightness, -5);
        assert_eq!(medieval.params.method, Method::Manuscript);
        assert_eq!(medieval.target_id, "medievalImage");

        let ritual = find("darkRitual").expect("darkRitual preset");
        assert_eq!(ritual.params.noise, 50);
        assert_eq!(ritual.params.blur_radius, 1.5);
    }

    #[test]
    fn test_find_unknown_name_misses_silently() {
        assert!(find("nonexistent").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn test_entries_carry_no_global_settings() {
        for entry in catalog() {
            assert_eq!(entry.params.color_tint, None, "{}", entry.name);
            assert!(!entry.params.preserve_aspect_ratio, "{}", entry.name);
            assert_ne!(entry.params.method, Method::Custom, "{}", entry.name);
        }
    }

    #[test]
    fn test_names_and_target_ids_are_unique() {
        for (i, a) in catalog().iter().enumerate() {
            for b in catalog().iter().skip(i + 1) {
                assert_ne!(a.name, b.name);
                assert_ne!(a.target_id, b.target_id);
            }
        }
    }
}
