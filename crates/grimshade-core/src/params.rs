//! Parameter model: the user-editable parameter set and its store.
//!
//! The store is merge-only and never validates ranges; range clamping is
//! the responsibility of the input surface and of the service itself.

use serde::{Deserialize, Serialize};

/// Identifier of a color tint, as minted by the transform service.
pub type TintId = String;

/// Stylization method selector. `Custom` means "whatever the sliders say";
/// every other variant names a tuned transform on the service side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Custom,
    Threshold,
    Manuscript,
    Atmospheric,
    Silhouette,
    Ghostly,
    Cavern,
    Frozen,
    Ritual,
    Lithographic,
    Sepia,
    Comfy,
    Forest,
}

impl Method {
    /// Wire name understood by the transform service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Threshold => "threshold",
            Self::Manuscript => "manuscript",
            Self::Atmospheric => "atmospheric",
            Self::Silhouette => "silhouette",
            Self::Ghostly => "ghostly",
            Self::Cavern => "cavern",
            Self::Frozen => "frozen",
            Self::Ritual => "ritual",
            Self::Lithographic => "lithographic",
            Self::Sepia => "sepia",
            Self::Comfy => "comfy",
            Self::Forest => "forest",
        }
    }
}

/// Snapshot of every knob a single transform request carries.
///
/// `method` records which transform the numeric fields were last tuned
/// for; the numeric fields may diverge from a preset's canonical values
/// once the user edits sliders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub contrast: f32,
    pub brightness: i32,
    pub threshold: i32,
    pub noise: i32,
    #[serde(rename = "blur")]
    pub blur_radius: f32,
    /// `None` is the wire sentinel "none": no tint overlay.
    pub color_tint: Option<TintId>,
    pub preserve_aspect_ratio: bool,
    pub method: Method,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            contrast: 1.5,
            brightness: 0,
            threshold: 128,
            noise: 20,
            blur_radius: 0.0,
            color_tint: None,
            preserve_aspect_ratio: false,
            method: Method::Custom,
        }
    }
}

/// Partial update merged into the current set. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterPatch {
    pub contrast: Option<f32>,
    pub brightness: Option<i32>,
    pub threshold: Option<i32>,
    pub noise: Option<i32>,
    pub blur_radius: Option<f32>,
    pub color_tint: Option<Option<TintId>>,
    pub preserve_aspect_ratio: Option<bool>,
    pub method: Option<Method>,
}

impl ParameterPatch {
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = Some(contrast);
        self
    }

    pub fn with_brightness(mut self, brightness: i32) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_noise(mut self, noise: i32) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn with_blur_radius(mut self, blur_radius: f32) -> Self {
        self.blur_radius = Some(blur_radius);
        self
    }

    pub fn with_color_tint(mut self, color_tint: Option<TintId>) -> Self {
        self.color_tint = Some(color_tint);
        self
    }

    pub fn with_preserve_aspect_ratio(mut self, preserve: bool) -> Self {
        self.preserve_aspect_ratio = Some(preserve);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }
}

/// Holds the current parameter set for one session.
#[derive(Debug, Default)]
pub struct ParameterStore {
    current: ParameterSet,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn get(&self) -> ParameterSet {
        self.current.clone()
    }

    /// Merge a partial update. Always succeeds; never validates ranges.
    pub fn apply(&mut self, patch: ParameterPatch) {
        if let Some(contrast) = patch.contrast {
            self.current.contrast = contrast;
        }
        if let Some(brightness) = patch.brightness {
            self.current.brightness = brightness;
        }
        if let Some(threshold) = patch.threshold {
            self.current.threshold = threshold;
        }
        if let Some(noise) = patch.noise {
            self.current.noise = noise;
        }
        if let Some(blur_radius) = patch.blur_radius {
            self.current.blur_radius = blur_radius;
        }
        if let Some(color_tint) = patch.color_tint {
            self.current.color_tint = color_tint;
        }
        if let Some(preserve) = patch.preserve_aspect_ratio {
            self.current.preserve_aspect_ratio = preserve;
        }
        if let Some(method) = patch.method {
            self.current.method = method;
        }
    }

    /// Restore the documented defaults (contrast 1.5, brightness 0,
    /// threshold 128, noise 20, blur 0, no tint, method custom). The
    /// aspect-ratio flag is a global display setting and survives.
    pub fn reset(&mut self) {
        let preserve = self.current.preserve_aspect_ratio;
        self.current = ParameterSet {
            preserve_aspect_ratio: preserve,
            ..ParameterSet::default()
        };
    }
}
