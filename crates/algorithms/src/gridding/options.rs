//! Job configuration and output raster geometry

use geo_types::Rect;
use surtgrid_core::raster::{GeoTransform, PixelType};
use surtgrid_core::{Error, Result, CRS};
use surtgrid_parallel::{ProcessingMode, DEFAULT_TILE_BUDGET};

use super::ExtractOptions;
use crate::interpolation::GridAlgorithm;

/// Output size used when neither pixels nor resolution are given
pub const DEFAULT_OUTPUT_SIZE: (usize, usize) = (256, 256);

/// How the output raster size is chosen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputSize {
    /// 256 x 256
    #[default]
    Default,
    /// Explicit width and height in pixels
    Pixels { width: usize, height: usize },
    /// Pixel size in georeferenced units; the size follows from the extent
    Resolution { x_res: f64, y_res: f64 },
}

/// Axis-aligned georeferenced bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Extent {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Smallest extent containing both
    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
        )
    }
}

impl From<Rect<f64>> for Extent {
    fn from(r: Rect<f64>) -> Self {
        Extent::new(r.min().x, r.min().y, r.max().x, r.max().y)
    }
}

/// Pixel dimensions and georeferencing of the output raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGeometry {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
}

impl OutputGeometry {
    /// Resolve `size` over `extent`.
    ///
    /// `extent` may be given in either Y order: when `y_min < y_max` the two
    /// are swapped so row 0 lies on the north edge and the row pitch is
    /// negative.
    pub fn resolve(size: OutputSize, extent: &Extent) -> Result<Self> {
        let (width, height) = match size {
            OutputSize::Default => DEFAULT_OUTPUT_SIZE,
            OutputSize::Pixels { width, height } => {
                if width == 0 || height == 0 {
                    return Err(Error::Usage(format!(
                        "invalid output size {width}x{height}"
                    )));
                }
                (width, height)
            }
            OutputSize::Resolution { x_res, y_res } => (
                pixels_for("xres", extent.width().abs(), x_res)?,
                pixels_for("yres", extent.height().abs(), y_res)?,
            ),
        };

        let (y_first, y_last) = if extent.y_min < extent.y_max {
            (extent.y_max, extent.y_min)
        } else {
            (extent.y_min, extent.y_max)
        };
        let transform =
            GeoTransform::from_extent(extent.x_min, extent.x_max, y_first, y_last, width, height)?;
        Ok(Self {
            width,
            height,
            transform,
        })
    }
}

fn pixels_for(name: &'static str, span: f64, res: f64) -> Result<usize> {
    if !res.is_finite() || res <= 0.0 {
        return Err(Error::InvalidParameter {
            name,
            value: res.to_string(),
            reason: "resolution must be positive".into(),
        });
    }
    let n = (span / res).round();
    if n.is_nan() || n < 1.0 || n > i32::MAX as f64 {
        return Err(Error::Usage(format!(
            "wrong value of {name}: {res} gives {n} pixels over a span of {span}"
        )));
    }
    Ok(n as usize)
}

/// Immutable configuration of one grid job
#[derive(Debug, Clone)]
pub struct GridOptions {
    pub size: OutputSize,
    /// Output bounds; derived from the layers when `None`
    pub extent: Option<Extent>,
    /// Only features whose geometry intersects this rectangle are read
    pub spatial_filter: Option<Rect<f64>>,
    pub algorithm: GridAlgorithm,
    pub extract: ExtractOptions,
    pub pixel_type: PixelType,
    /// Nodata recorded on the output; the algorithm's nodata when `None`
    pub nodata: Option<f64>,
    /// Overrides the layers' spatial reference
    pub crs: Option<CRS>,
    /// Working block memory budget in bytes
    pub tile_budget: usize,
    pub mode: ProcessingMode,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            size: OutputSize::Default,
            extent: None,
            spatial_filter: None,
            algorithm: GridAlgorithm::default(),
            extract: ExtractOptions::default(),
            pixel_type: PixelType::Float64,
            nodata: None,
            crs: None,
            tile_budget: DEFAULT_TILE_BUDGET,
            mode: ProcessingMode::Sequential,
        }
    }
}

impl GridOptions {
    /// Nodata value written to the output raster
    pub fn output_nodata(&self) -> f64 {
        self.nodata.unwrap_or_else(|| self.algorithm.nodata())
    }
}
