use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use log::{debug, warn};

use crate::classify::ScoredQuestion;
use crate::image_utils::{mask_to_rgb, GRAY_RGB, GREEN, RAINBOW, RED, YELLOW};
use crate::options::ClassifyOptions;
use crate::types::{Answer, BoundingBox};

/// Creates a path for a debug image next to the input image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes annotated copies of a sheet image while it is being scanned. A
/// disabled writer does nothing, so callers need not check.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<GrayImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: GrayImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    /// Draws onto a color copy of the input image and saves it under
    /// `label`. Returns the written path, or `None` when disabled or the
    /// image could not be saved.
    pub fn write<F>(&self, label: &str, draw: F) -> Option<PathBuf>
    where
        F: FnOnce(&mut RgbImage),
    {
        let input_image = self.input_image.as_ref()?;
        let mut canvas = DynamicImage::ImageLuma8(input_image.clone()).to_rgb8();
        draw(&mut canvas);

        let path = debug_image_path(&self.input_path, label);
        match canvas.save(&path) {
            Ok(()) => {
                debug!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("could not write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Replaces the canvas with the binary mask.
pub fn draw_mask_debug_image_mut(canvas: &mut RgbImage, mask: &GrayImage) {
    *canvas = mask_to_rgb(mask);
}

/// Outlines every candidate bubble, cycling colors in reading order so
/// neighboring questions are easy to tell apart.
pub fn draw_candidates_debug_image_mut(canvas: &mut RgbImage, candidates: &[BoundingBox]) {
    for (i, bounds) in candidates.iter().enumerate() {
        if let Some(rect) = bounds.to_rect() {
            draw_hollow_rect_mut(canvas, rect, RAINBOW[i % RAINBOW.len()]);
        }
    }
}

/// Outlines every scored bubble: green when it is the single answer, red
/// when it is one of several, yellow when it was picked below the fill
/// threshold, and gray otherwise.
pub fn draw_scored_questions_debug_image_mut(
    canvas: &mut RgbImage,
    questions: &[ScoredQuestion],
    options: &ClassifyOptions,
) {
    for question in questions {
        for (index, bubble) in question.bubbles.iter().enumerate() {
            let Some(rect) = bubble.bounds.to_rect() else {
                continue;
            };
            let above_threshold = bubble
                .fill_ratio
                .map_or(false, |ratio| ratio > options.threshold_ratio);
            let color: Rgb<u8> = match &question.answer {
                Answer::SingleChoice(chosen) if *chosen == index && above_threshold => GREEN,
                Answer::SingleChoice(chosen) if *chosen == index => YELLOW,
                Answer::MultipleChoice(chosen) if chosen.contains(&index) => RED,
                _ => GRAY_RGB,
            };
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}
