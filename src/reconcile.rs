//! Aspect reconciliation – turns a normalised photo into a buffer of exactly
//! the slot's declared size, either by padding with white (no content loss)
//! or by a covering crop.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::compose::WHITE;
use crate::error::{ComposeError, Result};
use crate::geometry::{aspect, cover_source_region, pad_placement, ratios_match, Ratio};
use crate::layout_spec::FitPolicy;

/// Target of a reconciliation: slot size, slot ratio and how to get there.
#[derive(Debug, Clone, Copy)]
pub struct SlotTarget {
    pub width: u32,
    pub height: u32,
    pub ratio: Ratio,
    pub policy: FitPolicy,
}

/// Fit `image` into the slot with symmetric white borders so its ratio
/// reaches `target.ratio`. Photos already within tolerance fill the slot.
///
/// The photo is scaled to its final placement first and then dropped onto a
/// slot-sized white buffer, so memory stays bounded by the slot however
/// extreme the source ratio is.
pub fn pad_into_slot(image: &RgbImage, target: &SlotTarget, filter: FilterType) -> RgbImage {
    let (w, h) = image.dimensions();
    if ratios_match(aspect(w, h), target.ratio.as_f64()) {
        return resize_to(image, target.width, target.height, filter);
    }

    let place = pad_placement(w, h, target.ratio, target.width, target.height);
    log::debug!(
        "Padding {w}x{h} into {}x{} slot at ({}, {}) as {}x{}",
        target.width,
        target.height,
        place.x,
        place.y,
        place.width,
        place.height
    );
    let scaled = resize_to(image, place.width, place.height, filter);
    let mut slot = RgbImage::from_pixel(target.width, target.height, WHITE);
    imageops::replace(&mut slot, &scaled, place.x as i64, place.y as i64);
    slot
}

/// Trim the centred window that covers `width × height`, then scale it.
pub fn cover_crop(image: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    let region = cover_source_region(image.width(), image.height(), width, height);
    let window =
        imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
    resize_to(&window, width, height, filter)
}

fn resize_to(image: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, filter)
    }
}

/// Final exact-dimension pass. Any drift left by earlier steps is resized
/// away here so the compositor only ever sees exact fits.
pub fn ensure_exact(image: RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    if image.dimensions() == (width, height) {
        image
    } else {
        log::debug!(
            "Correcting {}x{} to exact slot {width}x{height}",
            image.width(),
            image.height()
        );
        imageops::resize(&image, width, height, filter)
    }
}

/// Reconcile `image` to `target`, returning a buffer of exactly
/// `target.width × target.height`.
pub fn reconcile(image: &RgbImage, target: &SlotTarget, filter: FilterType) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(ComposeError::Reconciliation(format!(
            "source has degenerate size {w}x{h}"
        )));
    }
    if target.width == 0 || target.height == 0 || target.ratio.num == 0 || target.ratio.den == 0 {
        return Err(ComposeError::Reconciliation(format!(
            "slot has degenerate size {}x{} ratio {}:{}",
            target.width, target.height, target.ratio.num, target.ratio.den
        )));
    }

    let fitted = match target.policy {
        FitPolicy::Pad => pad_into_slot(image, target, filter),
        FitPolicy::Crop => cover_crop(image, target.width, target.height, filter),
    };

    let exact = ensure_exact(fitted, target.width, target.height, filter);
    if exact.dimensions() != (target.width, target.height) {
        return Err(ComposeError::Reconciliation(format!(
            "resize produced {}x{}, expected {}x{}",
            exact.width(),
            exact.height(),
            target.width,
            target.height
        )));
    }
    Ok(exact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const RED: Rgb<u8> = Rgb([200, 0, 0]);

    fn target(width: u32, height: u32, ratio: Ratio, policy: FitPolicy) -> SlotTarget {
        SlotTarget {
            width,
            height,
            ratio,
            policy,
        }
    }

    #[test]
    fn pad_keeps_content_and_adds_white() {
        let img = RgbImage::from_pixel(300, 400, RED);
        let padded = pad_into_slot(
            &img,
            &target(300, 450, Ratio::new(2, 3), FitPolicy::Pad),
            FilterType::Nearest,
        );
        assert_eq!(padded.dimensions(), (300, 450));
        // 25px white bands on top and bottom
        assert_eq!(padded.get_pixel(150, 0), &WHITE);
        assert_eq!(padded.get_pixel(150, 24), &WHITE);
        assert_eq!(padded.get_pixel(150, 25), &RED);
        assert_eq!(padded.get_pixel(150, 424), &RED);
        assert_eq!(padded.get_pixel(150, 425), &WHITE);
        assert_eq!(padded.get_pixel(150, 449), &WHITE);
    }

    #[test]
    fn pad_within_tolerance_fills_the_slot() {
        let img = RgbImage::from_pixel(361, 240, RED);
        let out = pad_into_slot(
            &img,
            &target(174, 116, Ratio::new(3, 2), FitPolicy::Pad),
            FilterType::Nearest,
        );
        assert_eq!(out.dimensions(), (174, 116));
        assert!(out.pixels().all(|px| px == &RED));
    }

    #[test]
    fn extreme_strips_reconcile_within_slot_memory() {
        let strip = RgbImage::from_pixel(1, 20_000, RED);
        let out = reconcile(
            &strip,
            &target(1653, 2480, Ratio::new(2, 3), FitPolicy::Pad),
            FilterType::Triangle,
        )
        .unwrap();
        assert_eq!(out.dimensions(), (1653, 2480));
        assert_eq!(out.get_pixel(0, 1240), &WHITE);
        assert_eq!(out.get_pixel(826, 1240), &RED);

        let band = RgbImage::from_pixel(20_000, 1, RED);
        let out = reconcile(
            &band,
            &target(1748, 1165, Ratio::new(3, 2), FitPolicy::Crop),
            FilterType::Triangle,
        )
        .unwrap();
        assert_eq!(out.dimensions(), (1748, 1165));
        assert!(out.pixels().all(|px| px == &RED));
    }

    #[test]
    fn pad_policy_hits_exact_slot() {
        let img = RgbImage::from_pixel(123, 457, RED);
        let out = reconcile(
            &img,
            &target(174, 116, Ratio::new(3, 2), FitPolicy::Pad),
            FilterType::Triangle,
        )
        .unwrap();
        assert_eq!(out.dimensions(), (174, 116));
        // Narrow photo -> white side bars, red centre.
        for x in [0, 173] {
            let edge = out.get_pixel(x, 58);
            assert!(edge.0.iter().all(|&c| c > 250), "edge {x} not white: {edge:?}");
        }
        let centre = out.get_pixel(87, 58);
        assert!(centre[0] > 150 && centre[1] < 50);
    }

    #[test]
    fn crop_policy_never_pads() {
        let img = RgbImage::from_pixel(123, 457, RED);
        let out = reconcile(
            &img,
            &target(174, 116, Ratio::new(3, 2), FitPolicy::Crop),
            FilterType::Triangle,
        )
        .unwrap();
        assert_eq!(out.dimensions(), (174, 116));
        for (_, _, px) in out.enumerate_pixels() {
            assert_ne!(px, &WHITE);
        }
    }

    #[test]
    fn cover_crop_takes_the_centre() {
        // Left half blue, right half green; crop to a square keeps both halves.
        let img = RgbImage::from_fn(200, 100, |x, _| {
            if x < 100 {
                Rgb([0, 0, 255])
            } else {
                Rgb([0, 255, 0])
            }
        });
        let out = cover_crop(&img, 100, 100, FilterType::Nearest);
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(10, 50), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(90, 50), &Rgb([0, 255, 0]));
    }

    #[test]
    fn ensure_exact_fixes_off_by_one() {
        let img = RgbImage::from_pixel(1747, 1166, RED);
        let out = ensure_exact(img, 1748, 1165, FilterType::Nearest);
        assert_eq!(out.dimensions(), (1748, 1165));
    }

    #[test]
    fn degenerate_slot_is_reconciliation_error() {
        let img = RgbImage::from_pixel(10, 10, RED);
        let err = reconcile(
            &img,
            &target(0, 10, Ratio::new(3, 2), FitPolicy::Pad),
            FilterType::Nearest,
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::Reconciliation(_)));
    }
}
