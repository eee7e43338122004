use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use log::{info, warn};
use logging_timer::time;
use rayon::prelude::*;
use serde::Serialize;

use crate::binarize::binarize;
use crate::bubbles::detect_bubbles;
use crate::classify::{score_questions, ScoredQuestion};
use crate::debug::{
    draw_candidates_debug_image_mut, draw_mask_debug_image_mut,
    draw_scored_questions_debug_image_mut, ImageDebugWriter,
};
use crate::options::ScanOptions;
use crate::sorting::sort_bubbles;
use crate::types::{Answer, BoundingBox};

/// A sheet image that cannot be scanned at all.
#[derive(Debug)]
pub enum ImageLoadError {
    /// The file could not be opened or decoded.
    Open(PathBuf, image::ImageError),
    /// In-memory bytes could not be decoded.
    Decode(image::ImageError),
    /// The image has no pixels.
    Empty((u32, u32)),
}

impl std::fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageLoadError::Open(path, e) => {
                write!(f, "could not load image from {}: {}", path.display(), e)
            }
            ImageLoadError::Decode(e) => write!(f, "could not decode image: {}", e),
            ImageLoadError::Empty((width, height)) => {
                write!(f, "image is empty ({}x{})", width, height)
            }
        }
    }
}

impl std::error::Error for ImageLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageLoadError::Open(_, e) | ImageLoadError::Decode(e) => Some(e),
            ImageLoadError::Empty(_) => None,
        }
    }
}

/// Something odd about a sheet that did not stop it from being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SheetWarning {
    /// Nothing bubble-shaped was found; every answer is `NoAnswer`.
    NoBubblesDetected,
    /// The bubble count is not a multiple of the choices per question, so
    /// the last `leftover` bubbles were ignored.
    #[serde(rename_all = "camelCase")]
    IncompleteTrailingGroup { leftover: usize },
    /// The number of scored questions differs from the layout's question
    /// count; answers were padded or truncated.
    #[serde(rename_all = "camelCase")]
    AnswerCountMismatch { detected: usize, expected: usize },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedSheet {
    pub dimensions: (u32, u32),
    /// Detected bubbles in reading order.
    pub bubbles: Vec<BoundingBox>,
    pub questions: Vec<ScoredQuestion>,
    /// Exactly `total_questions` answers.
    pub answers: Vec<Answer>,
    pub warnings: Vec<SheetWarning>,
}

/// The result of scanning one sheet of a batch.
#[derive(Debug)]
pub struct SheetOutcome {
    pub path: PathBuf,
    pub result: Result<ScannedSheet, ImageLoadError>,
}

pub fn load_sheet_image(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    image::open(path).map_err(|e| ImageLoadError::Open(path.to_path_buf(), e))
}

pub fn decode_sheet_image(bytes: &[u8]) -> Result<DynamicImage, ImageLoadError> {
    image::load_from_memory(bytes).map_err(ImageLoadError::Decode)
}

/// Pads with `NoAnswer` or truncates so there is exactly one answer per
/// expected question.
pub fn normalize_answers(mut answers: Vec<Answer>, total_questions: usize) -> Vec<Answer> {
    answers.resize(total_questions, Answer::NoAnswer);
    answers
}

/// Runs the whole pipeline on an already decoded sheet image.
pub fn scan_image(image: &DynamicImage, options: &ScanOptions) -> Result<ScannedSheet, ImageLoadError> {
    scan_image_with_debug(image, options, &ImageDebugWriter::disabled())
}

fn scan_image_with_debug(
    image: &DynamicImage,
    options: &ScanOptions,
    debug: &ImageDebugWriter,
) -> Result<ScannedSheet, ImageLoadError> {
    let layout = &options.layout;
    let mask = binarize(image, &options.binarize)?;
    debug.write("mask", |canvas| draw_mask_debug_image_mut(canvas, &mask));

    let candidates = detect_bubbles(&mask, &options.detect);
    let bubbles = sort_bubbles(&candidates, layout, &options.sort);
    debug.write("bubbles", |canvas| {
        draw_candidates_debug_image_mut(canvas, &bubbles)
    });

    let mut warnings = vec![];
    if bubbles.is_empty() {
        warn!("no bubbles detected; check image quality");
        warnings.push(SheetWarning::NoBubblesDetected);
    } else if layout.choices_per_question > 0 {
        let leftover = bubbles.len() % layout.choices_per_question;
        if leftover > 0 {
            warn!(
                "{} bubbles do not divide into questions of {} choices",
                bubbles.len(),
                layout.choices_per_question
            );
            warnings.push(SheetWarning::IncompleteTrailingGroup { leftover });
        }
    }

    let questions = score_questions(
        &mask,
        &bubbles,
        layout.choices_per_question,
        &options.classify,
    );
    debug.write("scored", |canvas| {
        draw_scored_questions_debug_image_mut(canvas, &questions, &options.classify)
    });

    if questions.len() != layout.total_questions {
        warnings.push(SheetWarning::AnswerCountMismatch {
            detected: questions.len(),
            expected: layout.total_questions,
        });
    }
    let answers = normalize_answers(
        questions.iter().map(|q| q.answer.clone()).collect(),
        layout.total_questions,
    );

    Ok(ScannedSheet {
        dimensions: image.dimensions(),
        bubbles,
        questions,
        answers,
        warnings,
    })
}

/// Loads and scans one sheet, writing debug images next to it when
/// `options.debug` is set.
#[time]
pub fn scan_sheet(path: &Path, options: &ScanOptions) -> Result<ScannedSheet, ImageLoadError> {
    let image = load_sheet_image(path)?;
    let debug = if options.debug {
        ImageDebugWriter::new(path.to_path_buf(), image.to_luma8())
    } else {
        ImageDebugWriter::disabled()
    };
    let sheet = scan_image_with_debug(&image, options, &debug)?;
    info!(
        "{}: {} bubbles, {} questions scored",
        path.display(),
        sheet.bubbles.len(),
        sheet.questions.len()
    );
    Ok(sheet)
}

/// Scans many sheets in parallel. A sheet that fails does not affect the
/// others; outcomes are returned in input order.
#[time]
pub fn scan_sheets<P: AsRef<Path> + Sync>(paths: &[P], options: &ScanOptions) -> Vec<SheetOutcome> {
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = scan_sheet(path, options);
            if let Err(e) = &result {
                warn!("skipping sheet: {}", e);
            }
            SheetOutcome {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect()
}
