//! Multi-layer grid job: one output band per input layer

use std::fmt;
use std::sync::Arc;

use surtgrid_core::io::{MemoryRaster, RasterSink};
use surtgrid_core::raster::RasterElement;
use surtgrid_core::vector::VectorLayer;
use surtgrid_core::{Error, Progress, Result, ScaledProgress, CRS};
use surtgrid_parallel::Executor;
use tracing::{info, warn};

use super::{extract_points, Extent, GridContext, GridOptions, OutputGeometry, TiledGridWriter};

/// What happened to one input layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerStatus {
    /// Gridded into its band
    Gridded,
    /// No point survived extraction; the band keeps its fill value
    Empty,
    /// Extraction failed; the band keeps its fill value
    Skipped(String),
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerStatus::Gridded => f.write_str("gridded"),
            LayerStatus::Empty => f.write_str("no points"),
            LayerStatus::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Outcome for one layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerReport {
    pub layer: String,
    pub band: usize,
    pub points: usize,
    pub status: LayerStatus,
}

/// Outcome of a whole job
#[derive(Debug, Clone, PartialEq)]
pub struct GridReport {
    pub geometry: OutputGeometry,
    pub layers: Vec<LayerReport>,
}

impl GridReport {
    /// Number of bands that received gridded values
    pub fn gridded(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| l.status == LayerStatus::Gridded)
            .count()
    }
}

/// A configured job over a set of layers.
///
/// Construction resolves everything that can be a usage error (extent,
/// output size) before any point is gridded.
#[derive(Debug)]
pub struct GridJob {
    layers: Vec<VectorLayer>,
    options: GridOptions,
    geometry: OutputGeometry,
    crs: Option<CRS>,
}

impl GridJob {
    pub fn new(mut layers: Vec<VectorLayer>, options: GridOptions) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::Usage("no input layer given".into()));
        }
        for layer in layers.iter_mut() {
            layer.set_spatial_filter(options.spatial_filter);
        }

        let extent = match options.extent {
            Some(extent) => extent,
            None => data_extent(&layers)?,
        };
        let geometry = OutputGeometry::resolve(options.size, &extent)?;
        let crs = options
            .crs
            .clone()
            .or_else(|| layers.iter().find_map(|l| l.crs.clone()));

        info!(
            layers = layers.len(),
            width = geometry.width,
            height = geometry.height,
            algorithm = %options.algorithm,
            "Prepared grid job"
        );

        Ok(Self {
            layers,
            options,
            geometry,
            crs,
        })
    }

    pub fn geometry(&self) -> &OutputGeometry {
        &self.geometry
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn layers(&self) -> &[VectorLayer] {
        &self.layers
    }

    /// In-memory destination with one band per layer, filled with the
    /// output nodata.
    pub fn memory_sink<T: RasterElement>(&self) -> Result<MemoryRaster<T>> {
        MemoryRaster::new(
            self.geometry.width,
            self.geometry.height,
            self.layers.len(),
            self.geometry.transform,
            self.crs.clone(),
            Some(self.options.output_nodata()),
        )
    }

    /// Grid every layer into the band of the same index.
    ///
    /// A layer whose extraction fails is skipped with a warning, one with no
    /// points is left untouched. Any other failure, cancellation included,
    /// aborts the job.
    pub fn run(&self, sink: &mut dyn RasterSink, progress: &mut dyn Progress) -> Result<GridReport> {
        if sink.width() != self.geometry.width || sink.height() != self.geometry.height {
            return Err(Error::SizeMismatch {
                expected: self.geometry.width * self.geometry.height,
                actual: sink.width() * sink.height(),
            });
        }
        if sink.band_count() < self.layers.len() {
            return Err(Error::Other(format!(
                "output has {} bands for {} layers",
                sink.band_count(),
                self.layers.len()
            )));
        }

        let executor = Arc::new(Executor::new(self.options.mode)?);
        let count = self.layers.len();
        let mut reports = Vec::with_capacity(count);

        for (band, layer) in self.layers.iter().enumerate() {
            let start = band as f64 / count as f64;
            let end = (band + 1) as f64 / count as f64;

            let points = match extract_points(layer, &self.options.extract) {
                Ok(points) => points,
                Err(e @ Error::Layer { .. }) => {
                    warn!("Skipping layer: {}", e);
                    reports.push(LayerReport {
                        layer: layer.name.clone(),
                        band,
                        points: 0,
                        status: LayerStatus::Skipped(e.to_string()),
                    });
                    if !progress.report(end, "") {
                        return Err(Error::Cancelled);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            let n = points.len();
            if n == 0 {
                warn!(layer = layer.name.as_str(), "No point extracted, band left unset");
                reports.push(LayerReport {
                    layer: layer.name.clone(),
                    band,
                    points: 0,
                    status: LayerStatus::Empty,
                });
                if !progress.report(end, "") {
                    return Err(Error::Cancelled);
                }
                continue;
            }
            info!(layer = layer.name.as_str(), band, points = n, "Gridding layer");

            let context = GridContext::new(points, self.options.algorithm.clone())
                .with_executor(Arc::clone(&executor));
            let mut scaled = ScaledProgress::new(&mut *progress, start, end);
            TiledGridWriter::new(&context, self.geometry.transform)
                .with_budget(self.options.tile_budget)
                .write_band(sink, band, &mut scaled)?;

            reports.push(LayerReport {
                layer: layer.name.clone(),
                band,
                points: n,
                status: LayerStatus::Gridded,
            });
        }

        Ok(GridReport {
            geometry: self.geometry,
            layers: reports,
        })
    }
}

/// Union of the filtered layer extents
fn data_extent(layers: &[VectorLayer]) -> Result<Extent> {
    layers
        .iter()
        .filter_map(|l| l.extent())
        .map(Extent::from)
        .reduce(|a, b| a.union(&b))
        .ok_or_else(|| Error::Usage("cannot derive the output extent from empty layers".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gridding::ExtractOptions;
    use crate::interpolation::GridAlgorithm;
    use geo_types::{point, Geometry};
    use surtgrid_core::vector::{AttributeValue, Feature};
    use surtgrid_core::NoProgress;

    fn layer(name: &str, pts: &[(f64, f64, f64)]) -> VectorLayer {
        let mut layer = VectorLayer::new(name, vec!["v".into()]);
        for &(x, y, z) in pts {
            layer.push(
                Feature::new(Geometry::Point(point!(x: x, y: y)))
                    .with_z(vec![z])
                    .with_attributes(vec![AttributeValue::Float(z * 10.0)]),
            );
        }
        layer
    }

    #[test]
    fn test_layers_become_bands() {
        let layers = vec![
            layer("a", &[(0.0, 0.0, 1.0), (10.0, 10.0, 1.0)]),
            layer("b", &[(5.0, 5.0, 7.0)]),
        ];
        let options = GridOptions {
            size: crate::gridding::OutputSize::Pixels { width: 4, height: 4 },
            algorithm: "nearest".parse().unwrap(),
            ..Default::default()
        };
        let job = GridJob::new(layers, options).unwrap();
        assert_eq!(job.geometry().transform.origin_y, 10.0);

        let mut sink = job.memory_sink::<f64>().unwrap();
        let report = job.run(&mut sink, &mut NoProgress).unwrap();
        assert_eq!(report.gridded(), 2);
        assert!(sink.bands()[0].data().iter().all(|&v| v == 1.0));
        assert!(sink.bands()[1].data().iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_empty_and_bad_layers_are_skipped() {
        let layers = vec![
            layer("good", &[(0.0, 0.0, 3.0), (2.0, 2.0, 3.0)]),
            layer("nan", &[(1.0, 1.0, f64::NAN)]),
        ];
        let options = GridOptions {
            size: crate::gridding::OutputSize::Pixels { width: 2, height: 2 },
            algorithm: GridAlgorithm::default(),
            nodata: Some(-5.0),
            ..Default::default()
        };
        let job = GridJob::new(layers, options).unwrap();
        let mut sink = job.memory_sink::<f32>().unwrap();
        let report = job.run(&mut sink, &mut NoProgress).unwrap();

        assert_eq!(report.layers[0].status, LayerStatus::Gridded);
        assert_eq!(report.layers[1].status, LayerStatus::Empty);
        assert!(sink.bands()[1].data().iter().all(|&v| v == -5.0));
    }

    #[test]
    fn test_cancel_on_empty_layer_stops_job() {
        let layers = vec![
            layer("nan", &[(1.0, 1.0, f64::NAN)]),
            layer("good", &[(0.0, 0.0, 3.0), (2.0, 2.0, 3.0)]),
        ];
        let options = GridOptions {
            size: crate::gridding::OutputSize::Pixels { width: 2, height: 2 },
            nodata: Some(-5.0),
            ..Default::default()
        };
        let job = GridJob::new(layers, options).unwrap();
        let mut sink = job.memory_sink::<f32>().unwrap();
        let mut stop = |f: f64, _: &str| f < 0.5;
        let err = job.run(&mut sink, &mut stop).unwrap_err();

        assert!(err.is_cancelled());
        assert!(sink.bands()[1].data().iter().all(|&v| v == -5.0));
    }

    #[test]
    fn test_unknown_burn_field_skips_layer() {
        let mut other = layer("other", &[(1.0, 1.0, 2.0)]);
        other.fields = vec!["w".into()];
        let layers = vec![layer("main", &[(0.0, 0.0, 1.0), (4.0, 4.0, 3.0)]), other];
        let options = GridOptions {
            size: crate::gridding::OutputSize::Pixels { width: 2, height: 2 },
            extract: ExtractOptions {
                burn_field: Some("v".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let job = GridJob::new(layers, options).unwrap();
        let mut sink = job.memory_sink::<f64>().unwrap();
        let report = job.run(&mut sink, &mut NoProgress).unwrap();
        assert_eq!(report.gridded(), 1);
        assert!(matches!(report.layers[1].status, LayerStatus::Skipped(_)));
    }

    #[test]
    fn test_crs_and_extent_usage() {
        let mut a = layer("a", &[(0.0, 0.0, 1.0)]);
        a.crs = Some(CRS::from_epsg(32719));
        let job = GridJob::new(vec![layer("b", &[(1.0, 1.0, 1.0)]), a], GridOptions::default()).unwrap();
        assert_eq!(job.crs().and_then(|c| c.epsg()), Some(32719));

        let err = GridJob::new(vec![VectorLayer::new("empty", vec![])], GridOptions::default())
            .unwrap_err();
        assert!(err.is_usage());
        assert!(GridJob::new(Vec::new(), GridOptions::default()).unwrap_err().is_usage());
    }
}
