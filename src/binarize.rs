use image::{DynamicImage, GenericImageView, GrayImage};
use imageproc::filter::{box_filter, gaussian_blur_f32};
use logging_timer::time;

use crate::image_utils::{to_luma, OFF, ON};
use crate::interpret::ImageLoadError;
use crate::options::{AdaptiveMethod, BinarizeOptions};

/// Gaussian sigma for a square kernel of side `kernel_size`, the usual
/// "automatic" choice when only the kernel size is given.
pub fn sigma_for_kernel_size(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Block sizes must be odd and at least 3 so the block has a center pixel.
fn normalized_block_size(block_size: u32) -> u32 {
    let block_size = block_size.max(3);
    if block_size % 2 == 0 {
        block_size + 1
    } else {
        block_size
    }
}

/// Converts a sheet image into a binary mask where ink is "on" (255) and
/// paper is "off" (0).
///
/// The image is reduced to luminance, smoothed, and then every pixel is
/// compared against a threshold derived from its own neighborhood, so uneven
/// lighting across the sheet does not push whole regions to one side.
#[time]
pub fn binarize(
    image: &DynamicImage,
    options: &BinarizeOptions,
) -> Result<GrayImage, ImageLoadError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageLoadError::Empty((width, height)));
    }

    let luma = to_luma(image);
    let gray: &GrayImage = &luma;
    let smoothed = smooth(gray, options.blur_kernel_size);
    Ok(adaptive_threshold_inverted(
        &smoothed,
        options.block_size,
        options.offset,
        options.method,
    ))
}

fn smooth(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return gray.clone();
    }
    gaussian_blur_f32(gray, sigma_for_kernel_size(kernel_size))
}

/// Marks a pixel "on" when it is at least `offset` darker than the local
/// mean of the `block_size` square around it.
pub fn adaptive_threshold_inverted(
    gray: &GrayImage,
    block_size: u32,
    offset: i32,
    method: AdaptiveMethod,
) -> GrayImage {
    let block_size = normalized_block_size(block_size);
    let radius = block_size / 2;
    let means = match method {
        AdaptiveMethod::Mean => box_filter(gray, radius, radius),
        AdaptiveMethod::Gaussian => gaussian_blur_f32(gray, sigma_for_kernel_size(block_size)),
    };

    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (out, (pixel, mean)) in mask
        .pixels_mut()
        .zip(gray.pixels().zip(means.pixels()))
    {
        let value = i32::from(pixel.0[0]);
        let threshold = i32::from(mean.0[0]) - offset;
        *out = if value <= threshold { ON } else { OFF };
    }
    mask
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, RgbImage};

    use super::*;

    /// A horizontal lighting gradient with small dark marks at both ends.
    fn unevenly_lit_page() -> (GrayImage, Vec<(u32, u32)>) {
        let width = 200;
        let height = 60;
        let mut img = GrayImage::from_fn(width, height, |x, _| {
            Luma([60 + (x * 190 / (width - 1)) as u8])
        });
        let mark_centers = vec![(20, 30), (100, 30), (180, 30)];
        for (cx, cy) in &mark_centers {
            for y in cy - 3..cy + 3 {
                for x in cx - 3..cx + 3 {
                    img.put_pixel(x, y, Luma([20]));
                }
            }
        }
        (img, mark_centers)
    }

    #[test]
    fn mask_has_input_dimensions_and_binary_values() {
        let (page, _) = unevenly_lit_page();
        let mask = binarize(&DynamicImage::ImageLuma8(page), &BinarizeOptions::default()).unwrap();
        assert_eq!(mask.dimensions(), (200, 60));
        assert!(mask.pixels().all(|p| *p == ON || *p == OFF));
    }

    #[test]
    fn binarize_is_deterministic() {
        let (page, _) = unevenly_lit_page();
        let image = DynamicImage::ImageLuma8(page);
        let first = binarize(&image, &BinarizeOptions::default()).unwrap();
        let second = binarize(&image, &BinarizeOptions::default()).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn marks_survive_uneven_lighting() {
        let (page, mark_centers) = unevenly_lit_page();
        for method in [AdaptiveMethod::Mean, AdaptiveMethod::Gaussian] {
            let options = BinarizeOptions {
                method,
                ..BinarizeOptions::default()
            };
            let mask = binarize(&DynamicImage::ImageLuma8(page.clone()), &options).unwrap();
            for (cx, cy) in &mark_centers {
                assert_eq!(*mask.get_pixel(*cx, *cy), ON, "{:?} mark at {}", method, cx);
            }
            // Paper on the dark and on the bright end stays off.
            assert_eq!(*mask.get_pixel(60, 5), OFF);
            assert_eq!(*mask.get_pixel(5, 55), OFF);
            assert_eq!(*mask.get_pixel(195, 55), OFF);
        }
    }

    #[test]
    fn color_input_is_converted() {
        let rgb = RgbImage::from_fn(40, 40, |x, y| {
            if (15..25).contains(&x) && (15..25).contains(&y) {
                image::Rgb([10, 10, 10])
            } else {
                image::Rgb([240, 240, 240])
            }
        });
        let mask = binarize(&DynamicImage::ImageRgb8(rgb), &BinarizeOptions::default()).unwrap();
        assert_eq!(mask.dimensions(), (40, 40));
        assert_eq!(*mask.get_pixel(15, 20), ON);
        assert_eq!(*mask.get_pixel(2, 2), OFF);
    }

    #[test]
    fn empty_image_is_a_load_error() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 7));
        assert!(matches!(
            binarize(&empty, &BinarizeOptions::default()),
            Err(ImageLoadError::Empty((0, 7)))
        ));
    }

    #[test]
    fn block_sizes_are_made_odd() {
        assert_eq!(normalized_block_size(0), 3);
        assert_eq!(normalized_block_size(10), 11);
        assert_eq!(normalized_block_size(11), 11);
        assert!((sigma_for_kernel_size(5) - 1.1).abs() < 1e-6);
    }
}
