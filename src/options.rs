use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The fixed grid a sheet is printed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetLayout {
    pub total_questions: usize,
    pub questions_per_row: usize,
    pub choices_per_question: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            total_questions: 100,
            questions_per_row: 5,
            choices_per_question: 4,
        }
    }
}

impl SheetLayout {
    /// Number of printed bubble rows, `ceil(total_questions / questions_per_row)`.
    pub fn total_rows(&self) -> usize {
        self.total_questions.div_ceil(self.questions_per_row.max(1))
    }
}

/// How the local threshold of each pixel is derived from its neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdaptiveMethod {
    /// Unweighted mean of the block.
    Mean,
    /// Gaussian-weighted mean of the block.
    Gaussian,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinarizeOptions {
    /// Side of the smoothing kernel; 0 or 1 disables smoothing.
    pub blur_kernel_size: u32,
    /// Side of the square neighborhood used for the local threshold.
    pub block_size: u32,
    /// Subtracted from the local mean; a pixel is "on" when it is at least
    /// this much darker than its neighborhood.
    pub offset: i32,
    pub method: AdaptiveMethod,
}

impl Default for BinarizeOptions {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            block_size: 11,
            offset: 2,
            method: AdaptiveMethod::Mean,
        }
    }
}

/// Which area a candidate region is filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaMeasure {
    /// `width * height` of the region's bounding box.
    BoundingBox,
    /// Polygon area enclosed by the region's outer border.
    Contour,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectOptions {
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub area_measure: AreaMeasure,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_area: 300.0,
            max_area: 2000.0,
            min_aspect_ratio: 0.7,
            max_aspect_ratio: 1.3,
            area_measure: AreaMeasure::BoundingBox,
        }
    }
}

/// How candidates are assigned to rows before sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowGrouping {
    /// Divide `y` by a row height estimated from the known grid.
    FixedGrid,
    /// Group boxes whose vertical centers lie close together.
    Clustered,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortOptions {
    /// Row height used when the grid has a single row or the estimate
    /// collapses to zero.
    pub fallback_row_height: f64,
    pub row_grouping: RowGrouping,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            fallback_row_height: 50.0,
            row_grouping: RowGrouping::FixedGrid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifyOptions {
    /// A bubble whose fill ratio exceeds this counts as filled.
    pub threshold_ratio: f64,
    /// With nothing filled, the fullest bubble is still picked if its fill
    /// ratio exceeds this.
    pub salvage_ratio: f64,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.4,
            salvage_ratio: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    pub layout: SheetLayout,
    pub binarize: BinarizeOptions,
    pub detect: DetectOptions,
    pub sort: SortOptions,
    pub classify: ClassifyOptions,
    #[serde(skip)]
    pub debug: bool,
}

#[derive(Debug)]
pub enum ScanOptionsError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
}

impl std::fmt::Display for ScanOptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanOptionsError::Read(path, e) => {
                write!(f, "cannot read config {}: {}", path.display(), e)
            }
            ScanOptionsError::Parse(path, e) => {
                write!(f, "cannot parse config {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ScanOptionsError {}

impl ScanOptions {
    /// Reads options from a JSON file. Keys missing from the file keep
    /// their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ScanOptionsError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ScanOptionsError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&json).map_err(|e| ScanOptionsError::Parse(path.to_path_buf(), e))
    }
}
