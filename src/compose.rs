//! Compositor – places reconciled photos on a blank white page.
//!
//! There is no decision logic here: the planner guarantees in-bounds,
//! non-overlapping slots and the reconciler guarantees exact-fit photos.
//! Anything else is rejected rather than rescaled.

use image::{imageops, Rgb, RgbImage};

use crate::error::{ComposeError, Result};
use crate::plan::CompositionPlan;

/// Page background and padding colour.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// A blank page for `plan`.
pub fn blank_canvas(plan: &CompositionPlan) -> RgbImage {
    RgbImage::from_pixel(plan.canvas_width, plan.canvas_height, WHITE)
}

/// Render `photo` into every slot of `plan`.
///
/// The same reconciled photo is reused for each slot since a job carries a
/// single upload.
pub fn composite(plan: &CompositionPlan, photo: &RgbImage) -> Result<RgbImage> {
    let mut canvas = blank_canvas(plan);

    for (index, slot) in plan.slots.iter().enumerate() {
        if photo.dimensions() != (slot.width, slot.height) {
            return Err(ComposeError::Reconciliation(format!(
                "slot {index} expects {}x{}, photo is {}x{}",
                slot.width,
                slot.height,
                photo.width(),
                photo.height()
            )));
        }
        imageops::replace(&mut canvas, photo, slot.left as i64, slot.top as i64);
    }

    Ok(canvas)
}
