//! Layout table – the fixed set of print layouts and their physical
//! constants at 300 DPI.
//!
//! Every layout prints on the same A5 canvas. What differs is the number of
//! slots, the ratio each slot is reconciled to, and whether mismatched photos
//! are padded or cropped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Ratio;

/// Print resolution embedded in every output.
pub const PRINT_DPI: u16 = 300;

/// A5 (148 × 210 mm) at 300 DPI.
pub const A5_WIDTH_PX: u32 = 1748;
pub const A5_HEIGHT_PX: u32 = 2480;

/// Which way the long edge of a slot runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Height ≥ width.
    #[default]
    Portrait,
    /// Width ≥ height.
    Landscape,
}

/// How a photo whose ratio does not match its slot is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// White borders, no content loss.
    #[default]
    Pad,
    /// Scale to cover the slot, trim the centred overflow.
    Crop,
}

/// Identifier of a print layout, as sent by the job dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutId {
    /// One portrait photo filling an A5 page.
    #[default]
    #[serde(rename = "a5", alias = "fullA5")]
    A5,
    /// Two identical landscape photos stacked on an A5 page.
    #[serde(rename = "two4x6", alias = "twoA6")]
    TwoUp,
}

impl LayoutId {
    pub const ALL: [LayoutId; 2] = [LayoutId::A5, LayoutId::TwoUp];

    /// Canonical identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutId::A5 => "a5",
            LayoutId::TwoUp => "two4x6",
        }
    }

    /// Parse an identifier, falling back to the default layout for unknown
    /// or missing values.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            None => Self::default(),
            Some(s) => s.parse().unwrap_or_else(|_| {
                log::warn!("Unknown layout {s:?}, using {}", Self::default());
                Self::default()
            }),
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a5" | "fulla5" => Ok(LayoutId::A5),
            "two4x6" | "twoa6" => Ok(LayoutId::TwoUp),
            other => Err(format!("unknown layout '{other}'")),
        }
    }
}

/// Constant description of one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub id: LayoutId,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slot_count: u32,
    pub slot_ratio: Ratio,
    /// Nominal slot size; the reconciled photo is resized to exactly this.
    pub slot_width: u32,
    pub slot_height: u32,
    /// Inset applied on every canvas edge before slots are placed.
    pub margin: u32,
    pub orientation: PageOrientation,
    pub policy: FitPolicy,
}

/// Single 2:3 photo, full canvas height, centred horizontally
/// (1653 = round(2480 * 2 / 3)).
const A5_SPEC: LayoutSpec = LayoutSpec {
    id: LayoutId::A5,
    canvas_width: A5_WIDTH_PX,
    canvas_height: A5_HEIGHT_PX,
    slot_count: 1,
    slot_ratio: Ratio::new(2, 3),
    slot_width: 1653,
    slot_height: A5_HEIGHT_PX,
    margin: 0,
    orientation: PageOrientation::Portrait,
    policy: FitPolicy::Pad,
};

/// Two 3:2 photos, full canvas width, stacked
/// (1165 = round(1748 * 2 / 3)).
const TWO_UP_SPEC: LayoutSpec = LayoutSpec {
    id: LayoutId::TwoUp,
    canvas_width: A5_WIDTH_PX,
    canvas_height: A5_HEIGHT_PX,
    slot_count: 2,
    slot_ratio: Ratio::new(3, 2),
    slot_width: A5_WIDTH_PX,
    slot_height: 1165,
    margin: 0,
    orientation: PageOrientation::Landscape,
    policy: FitPolicy::Pad,
};

impl LayoutSpec {
    pub fn for_layout(id: LayoutId) -> &'static LayoutSpec {
        match id {
            LayoutId::A5 => &A5_SPEC,
            LayoutId::TwoUp => &TWO_UP_SPEC,
        }
    }

    /// Copy of this spec reconciling with `policy` instead.
    pub fn with_policy(&self, policy: FitPolicy) -> LayoutSpec {
        LayoutSpec { policy, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{aspect, ratios_match};

    #[test]
    fn aliases_parse_to_same_layout() {
        assert_eq!("a5".parse::<LayoutId>().unwrap(), LayoutId::A5);
        assert_eq!("fullA5".parse::<LayoutId>().unwrap(), LayoutId::A5);
        assert_eq!("two4x6".parse::<LayoutId>().unwrap(), LayoutId::TwoUp);
        assert_eq!("twoA6".parse::<LayoutId>().unwrap(), LayoutId::TwoUp);
        assert!("poster".parse::<LayoutId>().is_err());
    }

    #[test]
    fn unknown_layout_uses_default() {
        assert_eq!(LayoutId::parse_or_default(Some("poster")), LayoutId::A5);
        assert_eq!(LayoutId::parse_or_default(None), LayoutId::A5);
        assert_eq!(LayoutId::parse_or_default(Some("twoA6")), LayoutId::TwoUp);
    }

    #[test]
    fn serde_accepts_aliases() {
        let id: LayoutId = serde_json::from_str("\"fullA5\"").unwrap();
        assert_eq!(id, LayoutId::A5);
        let id: LayoutId = serde_json::from_str("\"twoA6\"").unwrap();
        assert_eq!(id, LayoutId::TwoUp);
        assert_eq!(serde_json::to_string(&LayoutId::TwoUp).unwrap(), "\"two4x6\"");
    }

    #[test]
    fn nominal_slots_match_their_ratio() {
        for id in LayoutId::ALL {
            let spec = LayoutSpec::for_layout(id);
            assert_eq!(spec.id, id);
            assert!(ratios_match(
                aspect(spec.slot_width, spec.slot_height),
                spec.slot_ratio.as_f64()
            ));
            assert!(spec.slot_width + 2 * spec.margin <= spec.canvas_width);
            assert!(spec.slot_height * spec.slot_count + 2 * spec.margin <= spec.canvas_height);
        }
    }

    #[test]
    fn slot_orientation_follows_ratio() {
        for id in LayoutId::ALL {
            let spec = LayoutSpec::for_layout(id);
            let landscape = spec.slot_ratio.num > spec.slot_ratio.den;
            assert_eq!(landscape, spec.orientation == PageOrientation::Landscape);
        }
    }
}
