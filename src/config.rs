//! Pipeline configuration – everything that used to be an ambient constant
//! (profile, output location, resampling) is passed in explicitly here.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, Result};
use crate::layout_spec::{FitPolicy, LayoutId, LayoutSpec};
use crate::orient::RotationDirection;

/// Resampling kernel used for every resize in a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Which colour profile the output is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Label reported in job outcomes (e.g. "srgb", "display-p3").
    pub name: String,
    /// ICC file to embed. `None` embeds nothing and leaves the file sRGB.
    #[serde(default)]
    pub icc_path: Option<PathBuf>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: "srgb".to_string(),
            icc_path: None,
        }
    }
}

/// Configuration for the composition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory receiving processed artifacts (default: `<tmp>/print-compose`).
    pub output_dir: PathBuf,
    /// Apply the EXIF orientation tag before deciding on rotation.
    pub auto_orient: bool,
    /// Direction of the corrective quarter turn.
    pub rotation: RotationDirection,
    pub resize_filter: ResizeFilter,
    /// Pad or crop photos going into the two-up layout.
    pub two_up_policy: FitPolicy,
    pub color_profile: ProfileConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir().join("print-compose"),
            auto_orient: true,
            rotation: RotationDirection::Clockwise,
            resize_filter: ResizeFilter::Lanczos3,
            two_up_policy: FitPolicy::Pad,
            color_profile: ProfileConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Config writing into `output_dir`, everything else default.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Deserialise from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ComposeError::Config(e.to_string()))
    }

    /// Read and parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ComposeError::fs(path, e))?;
        Self::from_json(&json)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// The layout table entry for `id` with configured policy overrides.
    pub fn layout_spec(&self, id: LayoutId) -> LayoutSpec {
        let spec = LayoutSpec::for_layout(id);
        match id {
            LayoutId::TwoUp => spec.with_policy(self.two_up_policy),
            LayoutId::A5 => *spec,
        }
    }

    pub fn filter(&self) -> FilterType {
        self.resize_filter.into()
    }
}
