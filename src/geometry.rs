//! Geometry – pure integer math for ratios, padding, cover crops and slot
//! spacing. No pixels, no I/O.

use serde::{Deserialize, Serialize};

use crate::layout_spec::{LayoutId, LayoutSpec};

/// Two ratios closer than this are treated as equal and left alone.
pub const RATIO_TOLERANCE: f64 = 0.01;

/// An aspect ratio expressed as `num:den` (width:height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub num: u32,
    pub den: u32,
}

impl Ratio {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

/// White border to add around an image so it reaches a target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Padded width.
    pub width: u32,
    /// Padded height.
    pub height: u32,
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Padding {
    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }
}

/// Scale-then-crop parameters for a "cover" fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cover {
    /// Size after scaling; at least as large as the box on both axes.
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left of the centred crop window inside the scaled image.
    pub x: u32,
    pub y: u32,
}

/// A `width × height` rectangle at `(x, y)` inside some box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Target ratio of every slot in `layout`.
pub fn target_ratio(layout: LayoutId) -> Ratio {
    LayoutSpec::for_layout(layout).slot_ratio
}

/// Width divided by height. Zero height yields infinity.
pub fn aspect(width: u32, height: u32) -> f64 {
    width as f64 / height as f64
}

pub fn ratios_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATIO_TOLERANCE
}

/// `round(a * b / c)` in integer space, half away from zero.
fn mul_div_round(a: u32, b: u32, c: u32) -> u32 {
    let n = a as u64 * b as u64;
    let c = c as u64;
    ((2 * n + c) / (2 * c)) as u32
}

/// Minimal symmetric padding that brings `width × height` to `ratio`.
///
/// A source wider than the target grows in height, anything else grows in
/// width. The pad is split evenly; an odd pixel goes to the trailing side
/// (right or bottom). Exact within one pixel of rounding.
pub fn pad_dimensions(width: u32, height: u32, ratio: Ratio) -> Padding {
    let wider = width as u64 * ratio.den as u64 > height as u64 * ratio.num as u64;
    if wider {
        let new_height = mul_div_round(width, ratio.den, ratio.num).max(height);
        let pad = new_height - height;
        Padding {
            width,
            height: new_height,
            left: 0,
            right: 0,
            top: pad / 2,
            bottom: pad - pad / 2,
        }
    } else {
        let new_width = mul_div_round(height, ratio.num, ratio.den).max(width);
        let pad = new_width - width;
        Padding {
            width: new_width,
            height,
            left: pad / 2,
            right: pad - pad / 2,
            top: 0,
            bottom: 0,
        }
    }
}

/// Scale `width × height` to cover `box_w × box_h`, cropping the centred
/// overflow.
pub fn cover_dimensions(width: u32, height: u32, box_w: u32, box_h: u32) -> Cover {
    let wider = width as u64 * box_h as u64 >= height as u64 * box_w as u64;
    let (scaled_width, scaled_height) = if wider {
        (mul_div_round(width, box_h, height).max(box_w), box_h)
    } else {
        (box_w, mul_div_round(height, box_w, width).max(box_h))
    };
    Cover {
        scaled_width,
        scaled_height,
        x: centered_offset(scaled_width, box_w),
        y: centered_offset(scaled_height, box_h),
    }
}

/// `round((outer - inner) / 2)`, zero when `inner` does not fit.
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    let space = outer.saturating_sub(inner);
    (space + 1) / 2
}

/// Vertical gap between `count` slots of `slot_h` stacked in `canvas_h`.
///
/// `max(1, round(free / (count + 1)))`, clamped so the gaps plus the slots
/// never exceed the canvas. The clamp may bring the gap down to zero.
pub fn stack_gap(canvas_h: u32, slot_h: u32, count: u32) -> u32 {
    let used = slot_h as i64 * count as i64;
    let free = canvas_h as i64 - used;
    let slots = count as i64 + 1;
    let gap = ((free as f64 / slots as f64).round() as i64).max(1);
    if gap * slots + used <= canvas_h as i64 {
        gap as u32
    } else {
        (free.max(0) / slots) as u32
    }
}

/// Where a `width × height` photo lands inside a `box_w × box_h` slot once
/// padded to `ratio`.
///
/// Same result as padding with [`pad_dimensions`] and then scaling the padded
/// image to the box, but computed in slot space so no buffer larger than the
/// slot is ever needed. All sizes must be non-zero.
pub fn pad_placement(width: u32, height: u32, ratio: Ratio, box_w: u32, box_h: u32) -> Placement {
    let pad = pad_dimensions(width, height, ratio);
    let inner_w = mul_div_round(width, box_w, pad.width).max(1).min(box_w);
    let inner_h = mul_div_round(height, box_h, pad.height).max(1).min(box_h);
    Placement {
        x: mul_div_round(pad.left, box_w, pad.width).min(box_w.saturating_sub(inner_w)),
        y: mul_div_round(pad.top, box_h, pad.height).min(box_h.saturating_sub(inner_h)),
        width: inner_w,
        height: inner_h,
    }
}

/// The source-space window that [`cover_dimensions`] keeps, so the crop can
/// happen before scaling. All sizes must be non-zero.
pub fn cover_source_region(width: u32, height: u32, box_w: u32, box_h: u32) -> Placement {
    let cover = cover_dimensions(width, height, box_w, box_h);
    let region_w = mul_div_round(box_w, width, cover.scaled_width).max(1).min(width);
    let region_h = mul_div_round(box_h, height, cover.scaled_height).max(1).min(height);
    Placement {
        x: mul_div_round(cover.x, width, cover.scaled_width).min(width.saturating_sub(region_w)),
        y: mul_div_round(cover.y, height, cover.scaled_height).min(height.saturating_sub(region_h)),
        width: region_w,
        height: region_h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT: Ratio = Ratio::new(2, 3);
    const LANDSCAPE: Ratio = Ratio::new(3, 2);

    #[test]
    fn target_ratios_per_layout() {
        assert_eq!(target_ratio(LayoutId::A5), PORTRAIT);
        assert_eq!(target_ratio(LayoutId::TwoUp), LANDSCAPE);
    }

    #[test]
    fn pad_wide_source_grows_height() {
        let p = pad_dimensions(3000, 4000, PORTRAIT);
        assert_eq!((p.width, p.height), (3000, 4500));
        assert_eq!((p.top, p.bottom), (250, 250));
        assert_eq!((p.left, p.right), (0, 0));
        assert!(ratios_match(aspect(p.width, p.height), PORTRAIT.as_f64()));
    }

    #[test]
    fn pad_tall_source_grows_width() {
        let p = pad_dimensions(2000, 2000, LANDSCAPE);
        assert_eq!((p.width, p.height), (3000, 2000));
        assert_eq!((p.left, p.right), (500, 500));
    }

    #[test]
    fn pad_odd_remainder_goes_trailing() {
        let p = pad_dimensions(3000, 4001, PORTRAIT);
        assert_eq!(p.height, 4500);
        assert_eq!((p.top, p.bottom), (249, 250));
        // 4001 * 2 / 3 = 2667.33 -> 2667 wide
        let p = pad_dimensions(2000, 4001, PORTRAIT);
        assert_eq!(p.width, 2667);
        assert_eq!(p.left, 333);
        assert_eq!(p.right, 334);
    }

    #[test]
    fn pad_is_symmetric_and_within_tolerance() {
        for (w, h) in [(1, 1), (17, 3), (640, 480), (1000, 999), (4000, 3000), (5, 4001)] {
            for ratio in [PORTRAIT, LANDSCAPE] {
                let p = pad_dimensions(w, h, ratio);
                assert!(p.width >= w && p.height >= h);
                assert!(p.left.abs_diff(p.right) <= 1);
                assert!(p.top.abs_diff(p.bottom) <= 1);
                assert_eq!(p.width, w + p.left + p.right);
                assert_eq!(p.height, h + p.top + p.bottom);
                if p.width > 100 && p.height > 100 {
                    assert!(
                        ratios_match(aspect(p.width, p.height), ratio.as_f64()),
                        "{w}x{h} -> {}x{}",
                        p.width,
                        p.height
                    );
                }
            }
        }
    }

    #[test]
    fn pad_matching_ratio_is_empty() {
        assert!(pad_dimensions(3600, 2400, LANDSCAPE).is_empty());
    }

    #[test]
    fn cover_wide_source_crops_width() {
        let c = cover_dimensions(4000, 2000, 1748, 1165);
        assert_eq!(c.scaled_height, 1165);
        assert_eq!(c.scaled_width, 2330);
        assert_eq!(c.y, 0);
        assert_eq!(c.x, centered_offset(2330, 1748));
    }

    #[test]
    fn cover_tall_source_crops_height() {
        let c = cover_dimensions(1000, 2000, 1748, 1165);
        assert_eq!(c.scaled_width, 1748);
        assert_eq!(c.scaled_height, 3496);
        assert_eq!(c.x, 0);
        assert!(c.y + 1165 <= c.scaled_height);
    }

    #[test]
    fn centered_offset_rounds_half_up() {
        assert_eq!(centered_offset(1748, 1653), 48);
        assert_eq!(centered_offset(10, 4), 3);
        assert_eq!(centered_offset(4, 10), 0);
    }

    #[test]
    fn stack_gap_two_up() {
        let gap = stack_gap(2480, 1165, 2);
        assert_eq!(gap, 50);
        assert_eq!(gap * 3 + 1165 * 2, 2480);
    }

    #[test]
    fn stack_gap_clamps_instead_of_overflowing() {
        // A full-height single slot leaves no room for the minimum gap.
        assert_eq!(stack_gap(2480, 2480, 1), 0);
        // Slots larger than the canvas clamp to zero.
        assert_eq!(stack_gap(100, 60, 2), 0);
        for canvas in [100u32, 2480, 3508] {
            for slot in [10u32, 33, 49, 1165] {
                for count in [1u32, 2, 3] {
                    let gap = stack_gap(canvas, slot, count);
                    if slot * count <= canvas {
                        assert!(gap * (count + 1) + slot * count <= canvas);
                    }
                }
            }
        }
    }

    #[test]
    fn tolerance_boundary() {
        assert!(ratios_match(0.6667, 0.675));
        assert!(!ratios_match(0.6667, 0.7048));
    }

    #[test]
    fn pad_placement_matches_pad_then_scale() {
        // 3000x4500 after padding, scaled to 1653x2480.
        let p = pad_placement(3000, 4000, PORTRAIT, 1653, 2480);
        assert_eq!(p.width, 1653);
        assert_eq!(p.height, 2204);
        assert_eq!(p.x, 0);
        assert_eq!(p.y, 138);
        assert!(p.y + p.height <= 2480);
    }

    #[test]
    fn pad_placement_of_extreme_strip_stays_in_slot() {
        let p = pad_placement(1, 20_000, PORTRAIT, 1653, 2480);
        assert_eq!(p.height, 2480);
        assert_eq!(p.width, 1);
        assert!(p.x + p.width <= 1653);
        assert!(p.x.abs_diff(1653 - p.x - p.width) <= 1);

        let p = pad_placement(60_000, 1, LANDSCAPE, 1748, 1165);
        assert_eq!((p.width, p.height), (1748, 1));
        assert!(p.y + p.height <= 1165);
    }

    #[test]
    fn cover_region_is_inside_source() {
        let r = cover_source_region(4000, 2000, 1748, 1165);
        assert_eq!(r.height, 2000);
        assert_eq!(r.width, 3001);
        assert!(r.x + r.width <= 4000);

        let r = cover_source_region(20_000, 1, 1748, 1165);
        assert_eq!(r.height, 1);
        assert_eq!(r.width, 2);
        assert!(r.x + r.width <= 20_000);
        assert!(r.x.abs_diff(20_000 - r.x - r.width) <= 1);
    }
}
