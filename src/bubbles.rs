use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use log::debug;
use logging_timer::time;

use crate::options::{AreaMeasure, DetectOptions};
use crate::types::BoundingBox;

/// Finds regions of the mask shaped like bubbles.
///
/// Only outermost regions are considered: anything nested inside the hole of
/// another region (the center dot of a ring, say) is part of its enclosing
/// region. A region is kept when its area and its bounding box's aspect
/// ratio both fall within the configured bounds. The result is in no
/// particular order and may be empty.
#[time]
pub fn detect_bubbles(mask: &GrayImage, options: &DetectOptions) -> Vec<BoundingBox> {
    let contours = find_contours::<i32>(mask);
    let bubbles = contours
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .filter_map(|contour| {
            let bounds = contour_bounds(contour)?;
            let area = match options.area_measure {
                AreaMeasure::BoundingBox => bounds.area() as f64,
                AreaMeasure::Contour => contour_area(contour),
            };
            is_bubble_shaped(&bounds, area, options).then_some(bounds)
        })
        .collect::<Vec<BoundingBox>>();

    debug!(
        "{} of {} regions look like bubbles",
        bubbles.len(),
        contours.len()
    );
    bubbles
}

/// Determines whether a region passes the area and aspect-ratio filters.
pub fn is_bubble_shaped(bounds: &BoundingBox, area: f64, options: &DetectOptions) -> bool {
    let Some(aspect_ratio) = bounds.aspect_ratio() else {
        return false;
    };
    (options.min_area..=options.max_area).contains(&area)
        && (options.min_aspect_ratio..=options.max_aspect_ratio).contains(&aspect_ratio)
}

/// Gets the smallest box containing every point of the contour.
pub fn contour_bounds(contour: &Contour<i32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &contour.points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(BoundingBox::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Area of the polygon traced by the contour's points (shoelace formula).
/// Pixel-thin shapes enclose no area.
pub fn contour_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice_area.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use image::GrayImage;
    use imageproc::point::Point;
    use proptest::prelude::*;

    use super::*;
    use crate::test_utils::{draw_filled_box, draw_ring_box};

    fn sorted(mut boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
        boxes.sort();
        boxes
    }

    #[test]
    fn keeps_only_bubble_sized_square_regions() {
        let mut mask = GrayImage::new(300, 100);
        draw_filled_box(&mut mask, BoundingBox::new(10, 10, 20, 20)); // 400, kept
        draw_filled_box(&mut mask, BoundingBox::new(50, 10, 10, 10)); // too small
        draw_filled_box(&mut mask, BoundingBox::new(80, 10, 50, 50)); // too large
        draw_filled_box(&mut mask, BoundingBox::new(150, 10, 40, 10)); // too wide
        draw_filled_box(&mut mask, BoundingBox::new(200, 10, 22, 30)); // 660 at 0.73, kept

        let bubbles = detect_bubbles(&mask, &DetectOptions::default());
        assert_eq!(
            sorted(bubbles),
            vec![
                BoundingBox::new(10, 10, 20, 20),
                BoundingBox::new(200, 10, 22, 30)
            ]
        );
    }

    #[test]
    fn regions_inside_holes_are_not_reported() {
        let mut mask = GrayImage::new(100, 100);
        draw_ring_box(&mut mask, BoundingBox::new(20, 20, 44, 44), 2);
        draw_filled_box(&mut mask, BoundingBox::new(32, 32, 20, 20));

        let bubbles = detect_bubbles(&mask, &DetectOptions::default());
        assert_eq!(bubbles, vec![BoundingBox::new(20, 20, 44, 44)]);
    }

    #[test]
    fn empty_mask_has_no_bubbles() {
        let mask = GrayImage::new(64, 64);
        assert!(detect_bubbles(&mask, &DetectOptions::default()).is_empty());
    }

    #[test]
    fn contour_area_filters_on_enclosed_polygon() {
        // A 20x20 square traces a 19x19 polygon: 361 by contour, 400 by box.
        let mut mask = GrayImage::new(60, 60);
        draw_filled_box(&mut mask, BoundingBox::new(10, 10, 20, 20));
        let options = DetectOptions {
            min_area: 380.0,
            area_measure: AreaMeasure::Contour,
            ..DetectOptions::default()
        };
        assert!(detect_bubbles(&mask, &options).is_empty());
        let options = DetectOptions {
            area_measure: AreaMeasure::BoundingBox,
            ..options
        };
        assert_eq!(detect_bubbles(&mask, &options).len(), 1);
    }

    #[test]
    fn shoelace_area_of_a_square() {
        let contour = Contour {
            points: vec![
                Point::new(0, 0),
                Point::new(4, 0),
                Point::new(4, 4),
                Point::new(0, 4),
            ],
            border_type: BorderType::Outer,
            parent: None,
        };
        assert_eq!(contour_area(&contour), 16.0);
        assert_eq!(contour_bounds(&contour), Some(BoundingBox::new(0, 0, 5, 5)));
    }

    proptest! {
        #[test]
        fn every_detected_box_passes_the_filters(
            sizes in prop::collection::vec((4u32..56, 4u32..56), 1..16)
        ) {
            // One rectangle per 64px cell so regions never touch.
            let mut mask = GrayImage::new(64 * 4, 64 * 4);
            let options = DetectOptions::default();
            let mut expected = 0;
            for (i, (width, height)) in sizes.iter().enumerate() {
                let cell_x = (i as u32 % 4) * 64;
                let cell_y = (i as u32 / 4) * 64;
                let bounds = BoundingBox::new(cell_x + 4, cell_y + 4, *width, *height);
                draw_filled_box(&mut mask, bounds);
                if is_bubble_shaped(&bounds, bounds.area() as f64, &options) {
                    expected += 1;
                }
            }

            let bubbles = detect_bubbles(&mask, &options);
            prop_assert_eq!(bubbles.len(), expected);
            for bubble in bubbles {
                let area = bubble.area() as f64;
                let aspect_ratio = bubble.width as f64 / bubble.height as f64;
                prop_assert!((300.0..=2000.0).contains(&area));
                prop_assert!((0.7..=1.3).contains(&aspect_ratio));
            }
        }
    }
}
