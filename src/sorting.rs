use std::cmp::Ordering;

use log::debug;
use logging_timer::time;

use crate::options::{RowGrouping, SheetLayout, SortOptions};
use crate::types::BoundingBox;

/// Puts candidate bubbles into reading order: top to bottom by row, then left
/// to right within a row. Consecutive runs of `choices_per_question` boxes
/// in the result belong to one question.
///
/// The output is always a permutation of the input.
#[time]
pub fn sort_bubbles(
    boxes: &[BoundingBox],
    layout: &SheetLayout,
    options: &SortOptions,
) -> Vec<BoundingBox> {
    if boxes.is_empty() {
        return vec![];
    }

    match options.row_grouping {
        RowGrouping::FixedGrid => sort_by_fixed_grid(boxes, layout, options),
        RowGrouping::Clustered => sort_by_clustered_rows(boxes),
    }
}

/// Estimates the distance between printed rows from the spread of box tops
/// and the number of rows the layout should have.
pub fn estimate_row_height(
    boxes: &[BoundingBox],
    layout: &SheetLayout,
    options: &SortOptions,
) -> f64 {
    let total_rows = layout.total_rows();
    if total_rows <= 1 {
        return options.fallback_row_height;
    }

    let (Some(min_y), Some(max_y)) = (
        boxes.iter().map(|b| b.y).min(),
        boxes.iter().map(|b| b.y).max(),
    ) else {
        return options.fallback_row_height;
    };

    let row_height = f64::from(max_y - min_y) / (total_rows - 1) as f64;
    if row_height.is_finite() && row_height > 0.0 {
        row_height
    } else {
        options.fallback_row_height
    }
}

/// The row a box whose top edge is at `y` falls into.
pub fn row_bucket(y: u32, row_height: f64) -> u64 {
    (f64::from(y) / row_height).floor() as u64
}

fn sort_by_fixed_grid(
    boxes: &[BoundingBox],
    layout: &SheetLayout,
    options: &SortOptions,
) -> Vec<BoundingBox> {
    let row_height = estimate_row_height(boxes, layout, options);
    debug!("sorting {} bubbles with row height {:.2}", boxes.len(), row_height);

    let mut sorted = boxes.to_vec();
    sorted.sort_by_key(|b| (row_bucket(b.y, row_height), b.x));
    sorted
}

/// Groups boxes into rows by their vertical centers instead of trusting the
/// grid: a box starts a new row when its center lies more than half a
/// typical bubble height below the running mean of the current row.
fn sort_by_clustered_rows(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut by_center = boxes.to_vec();
    by_center.sort_by(|a, b| {
        a.center_y()
            .partial_cmp(&b.center_y())
            .unwrap_or(Ordering::Equal)
            .then(a.x.cmp(&b.x))
    });

    let mut heights = boxes.iter().map(|b| b.height).collect::<Vec<u32>>();
    heights.sort_unstable();
    let tolerance = f64::from(heights[heights.len() / 2].max(1)) / 2.0;

    let mut rows: Vec<Vec<BoundingBox>> = vec![];
    let mut row_center_sum = 0.0;
    for bubble in by_center {
        let starts_new_row = match rows.last() {
            Some(row) => bubble.center_y() - row_center_sum / row.len() as f64 > tolerance,
            None => true,
        };
        if starts_new_row {
            rows.push(vec![]);
            row_center_sum = 0.0;
        }
        row_center_sum += bubble.center_y();
        if let Some(row) = rows.last_mut() {
            row.push(bubble);
        }
    }
    debug!("clustered {} bubbles into {} rows", boxes.len(), rows.len());

    rows.into_iter()
        .flat_map(|mut row| {
            row.sort_by_key(|b| b.x);
            row
        })
        .collect()
}
