//! Orientation normalisation – rotates a photo a quarter turn when its aspect
//! class disagrees with the slot it is headed for.

use std::borrow::Cow;

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::geometry::aspect;
use crate::layout_spec::PageOrientation;

/// Direction of the corrective quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// Output of [`normalize`]. `rotated` is informational only.
#[derive(Debug)]
pub struct Normalized<'a> {
    pub image: Cow<'a, RgbImage>,
    pub rotated: bool,
}

/// Whether a `width × height` photo must turn to suit `target`. Square
/// photos never turn.
pub fn needs_rotation(width: u32, height: u32, target: PageOrientation) -> bool {
    let ratio = aspect(width, height);
    match target {
        PageOrientation::Portrait => ratio > 1.0,
        PageOrientation::Landscape => ratio < 1.0,
    }
}

/// Lossless 90° rotation.
pub fn rotate_quarter(image: &RgbImage, direction: RotationDirection) -> RgbImage {
    match direction {
        RotationDirection::Clockwise => imageops::rotate90(image),
        RotationDirection::CounterClockwise => imageops::rotate270(image),
    }
}

/// Bring `image` into the `target` aspect class, borrowing it untouched when
/// it already fits.
pub fn normalize(
    image: &RgbImage,
    target: PageOrientation,
    direction: RotationDirection,
) -> Normalized<'_> {
    if needs_rotation(image.width(), image.height(), target) {
        log::debug!(
            "Rotating {}x{} {:?} to suit {:?} slot",
            image.width(),
            image.height(),
            direction,
            target
        );
        Normalized {
            image: Cow::Owned(rotate_quarter(image, direction)),
            rotated: true,
        }
    } else {
        Normalized {
            image: Cow::Borrowed(image),
            rotated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]))
    }

    #[test]
    fn landscape_photo_turns_for_portrait_slot() {
        let img = gradient(40, 30);
        let n = normalize(&img, PageOrientation::Portrait, RotationDirection::Clockwise);
        assert!(n.rotated);
        assert_eq!((n.image.width(), n.image.height()), (30, 40));
    }

    #[test]
    fn portrait_photo_turns_for_landscape_slot() {
        let img = gradient(30, 40);
        let n = normalize(&img, PageOrientation::Landscape, RotationDirection::CounterClockwise);
        assert!(n.rotated);
        assert_eq!((n.image.width(), n.image.height()), (40, 30));
    }

    #[test]
    fn matching_and_square_photos_are_borrowed() {
        let img = gradient(36, 24);
        let n = normalize(&img, PageOrientation::Landscape, RotationDirection::Clockwise);
        assert!(!n.rotated);
        assert!(matches!(n.image, Cow::Borrowed(_)));

        let square = gradient(20, 20);
        assert!(!needs_rotation(20, 20, PageOrientation::Portrait));
        assert!(!needs_rotation(20, 20, PageOrientation::Landscape));
        let n = normalize(&square, PageOrientation::Portrait, RotationDirection::Clockwise);
        assert!(!n.rotated);
    }

    #[test]
    fn clockwise_moves_top_left_to_top_right() {
        let mut img = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let cw = rotate_quarter(&img, RotationDirection::Clockwise);
        assert_eq!(cw.get_pixel(1, 0), &Rgb([255, 0, 0]));
        let ccw = rotate_quarter(&img, RotationDirection::CounterClockwise);
        assert_eq!(ccw.get_pixel(0, 3), &Rgb([255, 0, 0]));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let img = gradient(13, 7);
        for direction in [RotationDirection::Clockwise, RotationDirection::CounterClockwise] {
            let mut turned = img.clone();
            for _ in 0..4 {
                turned = rotate_quarter(&turned, direction);
            }
            assert_eq!(turned.dimensions(), img.dimensions());
            assert_eq!(turned, img);
        }
    }
}
