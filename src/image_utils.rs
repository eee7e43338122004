use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::types::BoundingBox;

/// Mask value of foreground (ink) pixels.
pub const ON: Luma<u8> = Luma([u8::MAX]);
/// Mask value of background (paper) pixels.
pub const OFF: Luma<u8> = Luma([u8::MIN]);

pub const GRAY_RGB: Rgb<u8> = Rgb([128, 128, 128]);
pub const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
pub const RED: Rgb<u8> = Rgb([220, 0, 0]);
pub const YELLOW: Rgb<u8> = Rgb([230, 200, 0]);

pub const RAINBOW: [Rgb<u8>; 7] = [
    Rgb([255, 0, 0]),
    Rgb([255, 127, 0]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([75, 0, 130]),
    Rgb([148, 0, 211]),
];

/// Determines the number of pixels in an image that are not background.
pub fn count_nonzero(img: &GrayImage) -> u64 {
    img.pixels().filter(|p| p.0[0] != 0).count() as u64
}

/// Determines the number of "on" pixels of `mask` inside `bounds`. The parts
/// of `bounds` that fall outside the mask are ignored.
pub fn count_on_pixels_in(mask: &GrayImage, bounds: &BoundingBox) -> u64 {
    let roi = imageops::crop_imm(mask, bounds.x, bounds.y, bounds.width, bounds.height);
    count_nonzero(&roi.to_image())
}

/// Converts any decoded image to single-channel luminance, borrowing when it
/// already is one.
pub fn to_luma(image: &DynamicImage) -> std::borrow::Cow<'_, GrayImage> {
    match image {
        DynamicImage::ImageLuma8(gray) => std::borrow::Cow::Borrowed(gray),
        other => std::borrow::Cow::Owned(other.to_luma8()),
    }
}

/// Expands a mask into an RGB canvas for drawing debug overlays.
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(mask.clone()).to_rgb8()
}
