//! Synthetic masks and sheets for unit tests.

use image::{GrayImage, Luma};

use crate::image_utils::ON;
use crate::types::BoundingBox;

pub(crate) const PAPER: Luma<u8> = Luma([235]);
pub(crate) const INK: Luma<u8> = Luma([30]);

pub(crate) const BUBBLE_SIZE: u32 = 40;
pub(crate) const CHOICE_PITCH: u32 = 60;
pub(crate) const QUESTION_GAP: u32 = 40;
pub(crate) const ROW_PITCH: u32 = 80;
pub(crate) const MARGIN: u32 = 30;
pub(crate) const CHOICES: u32 = 4;

pub(crate) fn draw_filled_box_with(img: &mut GrayImage, bounds: BoundingBox, luma: Luma<u8>) {
    for y in bounds.y..bounds.y + bounds.height {
        for x in bounds.x..bounds.x + bounds.width {
            img.put_pixel(x, y, luma);
        }
    }
}

pub(crate) fn draw_filled_box(mask: &mut GrayImage, bounds: BoundingBox) {
    draw_filled_box_with(mask, bounds, ON);
}

pub(crate) fn draw_ring_box_with(
    img: &mut GrayImage,
    bounds: BoundingBox,
    thickness: u32,
    luma: Luma<u8>,
) {
    for y in bounds.y..bounds.y + bounds.height {
        for x in bounds.x..bounds.x + bounds.width {
            let dx = (x - bounds.x).min(bounds.x + bounds.width - 1 - x);
            let dy = (y - bounds.y).min(bounds.y + bounds.height - 1 - y);
            if dx < thickness || dy < thickness {
                img.put_pixel(x, y, luma);
            }
        }
    }
}

pub(crate) fn draw_ring_box(mask: &mut GrayImage, bounds: BoundingBox, thickness: u32) {
    draw_ring_box_with(mask, bounds, thickness, ON);
}

/// A mask holding one 10x10 box per ratio, side by side, each with the
/// given fraction of its pixels turned on.
pub(crate) fn mask_with_fill_ratios(ratios: &[f64]) -> (GrayImage, Vec<BoundingBox>) {
    let mut mask = GrayImage::new((ratios.len() as u32 * 12).max(1), 10);
    let mut boxes = vec![];
    for (i, ratio) in ratios.iter().enumerate() {
        let bounds = BoundingBox::new(i as u32 * 12, 0, 10, 10);
        let on_pixels = (ratio * 100.0).round() as u32;
        for n in 0..on_pixels {
            mask.put_pixel(bounds.x + n % 10, bounds.y + n / 10, ON);
        }
        boxes.push(bounds);
    }
    (mask, boxes)
}

/// Where a bubble is printed on a sheet drawn by [`render_answer_sheet`].
pub(crate) fn bubble_bounds(question: usize, choice: usize, questions_per_row: usize) -> BoundingBox {
    let row = (question / questions_per_row) as u32;
    let column = (question % questions_per_row) as u32;
    let question_width = CHOICES * CHOICE_PITCH + QUESTION_GAP;
    BoundingBox::new(
        MARGIN + column * question_width + choice as u32 * CHOICE_PITCH,
        MARGIN + row * ROW_PITCH,
        BUBBLE_SIZE,
        BUBBLE_SIZE,
    )
}

/// Renders a grayscale sheet of 4-choice questions. Each question prints
/// thin bubble outlines; the choices listed in `marked[question]` are inked
/// solid.
pub(crate) fn render_answer_sheet(marked: &[Vec<usize>], questions_per_row: usize) -> GrayImage {
    let rows = marked.len().div_ceil(questions_per_row) as u32;
    let width = 2 * MARGIN + questions_per_row as u32 * (CHOICES * CHOICE_PITCH + QUESTION_GAP);
    let height = 2 * MARGIN + rows * ROW_PITCH;
    let mut sheet = GrayImage::from_pixel(width, height, PAPER);

    for (question, choices) in marked.iter().enumerate() {
        for choice in 0..CHOICES as usize {
            let bounds = bubble_bounds(question, choice, questions_per_row);
            if choices.contains(&choice) {
                draw_filled_box_with(&mut sheet, bounds, INK);
            } else {
                draw_ring_box_with(&mut sheet, bounds, 1, INK);
            }
        }
    }
    sheet
}
