//! Slot planning – turns a [`LayoutSpec`] into the frozen set of canvas
//! rectangles the compositor fills. Pure function of the layout; no pixel
//! data is involved, so plans can be computed and inspected on their own.

use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, Result};
use crate::geometry::{centered_offset, stack_gap};
use crate::layout_spec::{LayoutId, LayoutSpec};

/// A slot rectangle in canvas pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl SlotRect {
    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    pub fn overlaps(&self, other: &SlotRect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

/// Canvas size plus ordered slots, ready for compositing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub layout: LayoutId,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Vertical gap between slots (and above the first / below the last).
    pub gap: u32,
    pub slots: Vec<SlotRect>,
}

impl CompositionPlan {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Total canvas height consumed by slots and the gaps around them.
    pub fn used_height(&self) -> u32 {
        let gaps = u32::try_from(self.slots.len() + 1).unwrap_or(u32::MAX);
        self.slots
            .iter()
            .fold(self.gap.saturating_mul(gaps), |h, s| h.saturating_add(s.height))
    }
}

/// Compute the plan for `spec`.
///
/// Slots are centred horizontally inside the margin and stacked vertically
/// with [`stack_gap`]: slot `i` (1-based) starts at `margin + gap*i +
/// slot_h*(i-1)`. A slot that ends up outside the canvas is reported as
/// [`ComposeError::PlanningOverflow`].
pub fn plan_slots(spec: &LayoutSpec) -> Result<CompositionPlan> {
    let usable_w = spec.canvas_width.saturating_sub(spec.margin.saturating_mul(2));
    let usable_h = spec.canvas_height.saturating_sub(spec.margin.saturating_mul(2));

    let left = spec
        .margin
        .saturating_add(centered_offset(usable_w, spec.slot_width));
    let gap = stack_gap(usable_h, spec.slot_height, spec.slot_count);

    // Each slot is checked as it is placed, so a runaway spec stops at the
    // first slot that leaves the canvas.
    let mut slots = Vec::new();
    for i in 1..=spec.slot_count {
        let top = gap
            .checked_mul(i)
            .zip(spec.slot_height.checked_mul(i - 1))
            .and_then(|(g, h)| g.checked_add(h))
            .and_then(|t| t.checked_add(spec.margin));
        let slot = SlotRect {
            top: top.unwrap_or(u32::MAX),
            left,
            width: spec.slot_width,
            height: spec.slot_height,
        };
        let index = slots.len();
        if top.is_none() || !fits(&slot, spec.canvas_width, spec.canvas_height) {
            return Err(overflow(index, &slot, spec.canvas_width, spec.canvas_height));
        }
        slots.push(slot);
    }

    let plan = CompositionPlan {
        layout: spec.id,
        canvas_width: spec.canvas_width,
        canvas_height: spec.canvas_height,
        gap,
        slots,
    };
    check_bounds(&plan)?;

    log::debug!(
        "Planned {} slot(s) for {} with gap {}px",
        plan.slots.len(),
        spec.id,
        gap
    );
    Ok(plan)
}

/// Plan for one of the built-in layouts.
pub fn compute_plan(layout: LayoutId) -> Result<CompositionPlan> {
    plan_slots(LayoutSpec::for_layout(layout))
}

fn fits(slot: &SlotRect, canvas_width: u32, canvas_height: u32) -> bool {
    slot.width > 0
        && slot.height > 0
        && slot.left.checked_add(slot.width).is_some_and(|r| r <= canvas_width)
        && slot.top.checked_add(slot.height).is_some_and(|b| b <= canvas_height)
}

fn overflow(index: usize, slot: &SlotRect, canvas_width: u32, canvas_height: u32) -> ComposeError {
    ComposeError::PlanningOverflow {
        index,
        left: slot.left,
        top: slot.top,
        width: slot.width,
        height: slot.height,
        canvas_width,
        canvas_height,
    }
}

fn check_bounds(plan: &CompositionPlan) -> Result<()> {
    for (index, slot) in plan.slots.iter().enumerate() {
        if !fits(slot, plan.canvas_width, plan.canvas_height) {
            return Err(overflow(index, slot, plan.canvas_width, plan.canvas_height));
        }
    }
    // Stacked slots must never share pixels.
    for (i, a) in plan.slots.iter().enumerate() {
        if let Some(b) = plan.slots[i + 1..].iter().find(|b| a.overlaps(b)) {
            return Err(overflow(i + 1, b, plan.canvas_width, plan.canvas_height));
        }
    }
    Ok(())
}
