//! Scores optical mark recognition answer sheets.
//!
//! A scanned sheet flows through four stages, each consuming the previous
//! stage's output:
//!
//! 1. [`binarize::binarize`] turns the image into an inverted binary mask.
//! 2. [`bubbles::detect_bubbles`] finds bubble-shaped regions in the mask.
//! 3. [`sorting::sort_bubbles`] puts the bubbles into reading order.
//! 4. [`classify::classify_fills`] decides which choice(s) were marked.
//!
//! [`interpret`] wires the stages together for one sheet or a batch of
//! sheets, and [`grading`] compares the result against an answer key.

pub mod binarize;
pub mod bubbles;
pub mod classify;
pub mod debug;
pub mod grading;
pub mod image_utils;
pub mod interpret;
pub mod options;
pub mod sorting;
pub mod types;

#[cfg(test)]
mod test_utils;
