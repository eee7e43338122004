use std::collections::BTreeSet;

use image::GrayImage;
use log::{debug, trace};
use logging_timer::time;
use serde::Serialize;

use crate::image_utils::count_on_pixels_in;
use crate::options::ClassifyOptions;
use crate::types::{Answer, BoundingBox};

/// One choice bubble and how much of it is inked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBubble {
    pub bounds: BoundingBox,
    /// `None` for a zero-area box, which takes no part in the decision.
    pub fill_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredQuestion {
    pub bubbles: Vec<ScoredBubble>,
    pub answer: Answer,
}

/// Fraction of the box covered by "on" mask pixels. Pixels of the box that
/// lie outside the mask count as off. Zero-area boxes have no ratio.
pub fn fill_ratio(mask: &GrayImage, bounds: &BoundingBox) -> Option<f64> {
    let area = bounds.area();
    if area == 0 {
        return None;
    }
    Some(count_on_pixels_in(mask, bounds) as f64 / area as f64)
}

/// Decides a question from the fill ratios of its choices, in order:
///
/// 1. exactly one ratio above `threshold_ratio` picks that choice;
/// 2. several above it pick all of them;
/// 3. none above it, but the fullest above `salvage_ratio`, picks the
///    fullest (the first one on ties);
/// 4. otherwise the question is unanswered.
pub fn decide_answer(fill_ratios: &[Option<f64>], options: &ClassifyOptions) -> Answer {
    let mut filled = BTreeSet::new();
    let mut fullest: Option<(usize, f64)> = None;

    for (index, ratio) in fill_ratios.iter().enumerate() {
        let Some(ratio) = *ratio else {
            continue;
        };
        if fullest.map_or(true, |(_, max)| ratio > max) {
            fullest = Some((index, ratio));
        }
        if ratio > options.threshold_ratio {
            filled.insert(index);
        }
    }

    if !filled.is_empty() {
        return Answer::from_choices(filled);
    }
    match fullest {
        Some((index, max)) if max > options.salvage_ratio => Answer::SingleChoice(index),
        _ => Answer::NoAnswer,
    }
}

/// Scores one question's group of choice bubbles against the mask.
pub fn score_question(
    mask: &GrayImage,
    choices: &[BoundingBox],
    options: &ClassifyOptions,
) -> ScoredQuestion {
    let bubbles = choices
        .iter()
        .map(|bounds| {
            let fill_ratio = fill_ratio(mask, bounds);
            if fill_ratio.is_none() {
                trace!("skipping zero-area bubble at ({}, {})", bounds.x, bounds.y);
            }
            ScoredBubble {
                bounds: *bounds,
                fill_ratio,
            }
        })
        .collect::<Vec<ScoredBubble>>();

    let ratios = bubbles.iter().map(|b| b.fill_ratio).collect::<Vec<_>>();
    let answer = decide_answer(&ratios, options);
    ScoredQuestion { bubbles, answer }
}

/// Scores every complete group of `choices_per_question` consecutive bubbles
/// in reading order. A trailing partial group is dropped.
#[time]
pub fn score_questions(
    mask: &GrayImage,
    ordered: &[BoundingBox],
    choices_per_question: usize,
    options: &ClassifyOptions,
) -> Vec<ScoredQuestion> {
    if choices_per_question == 0 {
        return vec![];
    }

    let groups = ordered.chunks_exact(choices_per_question);
    let leftover = groups.remainder().len();
    if leftover > 0 {
        debug!("dropping {} bubbles that do not fill a whole question", leftover);
    }

    groups
        .map(|group| score_question(mask, group, options))
        .collect()
}

/// Decides the answer of every complete question in `ordered`.
pub fn classify_fills(
    mask: &GrayImage,
    ordered: &[BoundingBox],
    choices_per_question: usize,
    options: &ClassifyOptions,
) -> Vec<Answer> {
    score_questions(mask, ordered, choices_per_question, options)
        .into_iter()
        .map(|question| question.answer)
        .collect()
}
