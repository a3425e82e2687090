//! Grid context: one gridding job over one point set

use std::sync::Arc;

use surtgrid_core::raster::{GeoTransform, PixelBuffer, RasterElement};
use surtgrid_core::{dispatch_pixel_buffer, Error, Progress, Result};
use surtgrid_parallel::{Executor, ParallelStrategy, Tile};
use tracing::debug;

use crate::interpolation::search::{initial_search_radius, Neighborhood};
use crate::interpolation::{
    data_metric, inverse_distance, linear, moving_average, nearest_neighbor, GridAlgorithm,
    NeighborLimits, PointSet, QuadTree, SearchEllipse, SearchScratch, Triangulation,
};

/// Point count above which bounded searches go through the quadtree
const INDEX_THRESHOLD: usize = 100;

/// Rows each worker computes between two progress reports
const ROWS_PER_WORKER: usize = 4;

/// Everything needed to evaluate grid nodes for one algorithm.
///
/// Built once per job. The point set, the optional quadtree and the optional
/// triangulation are read-only afterwards, so [`GridContext::process`] can be
/// called for any number of windows, from any thread.
#[derive(Debug)]
pub struct GridContext {
    points: Arc<PointSet>,
    algorithm: GridAlgorithm,
    ellipse: SearchEllipse,
    limits: NeighborLimits,
    index: Option<QuadTree>,
    triangulation: Option<Triangulation>,
    initial_radius: f64,
    executor: Arc<Executor>,
}

impl GridContext {
    /// Prepare `algorithm` over `points`, building the spatial index and
    /// triangulation it benefits from. Rows are evaluated on the calling
    /// thread unless [`GridContext::with_executor`] says otherwise.
    pub fn new(points: impl Into<Arc<PointSet>>, algorithm: GridAlgorithm) -> Self {
        let points = points.into();
        let (ellipse, limits) = search_shape(&algorithm);
        let n = points.len();

        let wants_index = match &algorithm {
            GridAlgorithm::InverseDistanceNearest(_) => true,
            GridAlgorithm::NearestNeighbor(_) => n > INDEX_THRESHOLD,
            GridAlgorithm::Linear(p) => p.radius != 0.0 && n > INDEX_THRESHOLD,
            GridAlgorithm::InverseDistance(_)
            | GridAlgorithm::MovingAverage(_)
            | GridAlgorithm::Metric(..) => {
                limits.uses_quadrants()
                    || limits.max_points > 0
                    || (!ellipse.is_unbounded() && n > INDEX_THRESHOLD)
            }
        };
        let index = (wants_index && n > 0).then(|| QuadTree::build(Arc::clone(&points)));

        let triangulation = match &algorithm {
            GridAlgorithm::Linear(_) => Some(Triangulation::build(&points)),
            _ => None,
        };

        let initial_radius = initial_search_radius(&points);
        debug!(
            algorithm = algorithm.name(),
            points = n,
            indexed = index.is_some(),
            initial_radius,
            "Created grid context"
        );

        Self {
            points,
            algorithm,
            ellipse,
            limits,
            index,
            triangulation,
            initial_radius,
            executor: Arc::new(Executor::sequential()),
        }
    }

    /// Evaluate rows with `executor`. Output does not depend on it.
    pub fn with_executor(mut self, executor: impl Into<Arc<Executor>>) -> Self {
        self.executor = executor.into();
        self
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn algorithm(&self) -> &GridAlgorithm {
        &self.algorithm
    }

    /// Whether a quadtree was built for this job
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn triangulation(&self) -> Option<&Triangulation> {
        self.triangulation.as_ref()
    }

    fn neighborhood(&self) -> Neighborhood<'_> {
        Neighborhood {
            points: &self.points,
            index: self.index.as_ref(),
            ellipse: self.ellipse,
            limits: self.limits,
            initial_radius: self.initial_radius,
        }
    }

    /// Value of the node at (x, y)
    pub fn evaluate(&self, x: f64, y: f64, scratch: &mut SearchScratch) -> f64 {
        self.evaluate_in(&self.neighborhood(), x, y, scratch)
    }

    fn evaluate_in(&self, hood: &Neighborhood<'_>, x: f64, y: f64, scratch: &mut SearchScratch) -> f64 {
        match &self.algorithm {
            GridAlgorithm::InverseDistance(p) => {
                inverse_distance(hood, p.power, p.smoothing, p.nodata, x, y, scratch)
            }
            GridAlgorithm::InverseDistanceNearest(p) => {
                inverse_distance(hood, p.power, p.smoothing, p.nodata, x, y, scratch)
            }
            GridAlgorithm::MovingAverage(p) => moving_average(hood, p.nodata, x, y, scratch),
            GridAlgorithm::NearestNeighbor(p) => nearest_neighbor(hood, p.nodata, x, y, scratch),
            GridAlgorithm::Metric(metric, p) => data_metric(*metric, hood, p.nodata, x, y, scratch),
            GridAlgorithm::Linear(p) => match &self.triangulation {
                Some(tri) => linear(tri, hood, p.radius, p.nodata, x, y, scratch),
                None => p.nodata,
            },
        }
    }

    /// Fill `buffer` with a `width` x `height` window spanning
    /// [`x_min`, `x_max`] and [`y_min`, `y_max`].
    ///
    /// Node (col, row) sits at the pixel centre
    /// `(x_min + (col + 0.5) * dx, y_min + (row + 0.5) * dy)` with
    /// `dx = (x_max - x_min) / width` and `dy = (y_max - y_min) / height`, so
    /// passing `y_min > y_max` lays rows out north-up. Values are rounded and
    /// clamped into the buffer's pixel type.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        width: usize,
        height: usize,
        buffer: &mut PixelBuffer,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let transform = GeoTransform::from_extent(x_min, x_max, y_min, y_max, width, height)?;
        self.process_block(&transform, &Tile::new(0, 0, height, width), buffer, progress)
    }

    /// Fill `buffer` with the pixels of `tile` of the raster georeferenced by
    /// `transform`.
    ///
    /// Node coordinates come from the absolute pixel indices, so the values
    /// of a pixel do not depend on how the raster is cut into tiles. Progress
    /// goes from 0 to 1 over the rows of the tile; a `false` from `progress`
    /// stops with [`Error::Cancelled`] after the current row.
    pub fn process_block(
        &self,
        transform: &GeoTransform,
        tile: &Tile,
        buffer: &mut PixelBuffer,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        if buffer.len() != tile.len() {
            return Err(Error::SizeMismatch {
                expected: tile.len(),
                actual: buffer.len(),
            });
        }
        dispatch_pixel_buffer!(buffer, v => self.fill(transform, tile, v.as_mut_slice(), progress))
    }

    fn fill<T: RasterElement>(
        &self,
        transform: &GeoTransform,
        tile: &Tile,
        out: &mut [T],
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let hood = self.neighborhood();
        let cols = tile.cols;
        let batch = (self.executor.threads() * ROWS_PER_WORKER).max(1);

        let mut row = 0;
        while row < tile.rows {
            let end = (row + batch).min(tile.rows);
            let rows: Vec<Vec<T>> = self.executor.par_map(row..end, |r| {
                let mut scratch = SearchScratch::default();
                let y = transform.row_center(tile.row_offset + r);
                (0..cols)
                    .map(|c| {
                        let x = transform.col_center(tile.col_offset + c);
                        T::from_f64_saturating(self.evaluate_in(&hood, x, y, &mut scratch))
                    })
                    .collect()
            });

            for values in rows {
                out[row * cols..(row + 1) * cols].copy_from_slice(&values);
                row += 1;
                if !progress.report(row as f64 / tile.rows as f64, "") {
                    return Err(Error::Cancelled);
                }
            }
        }
        Ok(())
    }
}

/// Search ellipse and count caps of an algorithm
fn search_shape(algorithm: &GridAlgorithm) -> (SearchEllipse, NeighborLimits) {
    match algorithm {
        GridAlgorithm::InverseDistance(p) => (p.ellipse(), p.limits()),
        GridAlgorithm::InverseDistanceNearest(p) => (p.ellipse(), p.limits()),
        GridAlgorithm::MovingAverage(p) => (p.ellipse(), p.limits()),
        GridAlgorithm::NearestNeighbor(p) => (p.ellipse(), NeighborLimits::default()),
        GridAlgorithm::Metric(_, p) => (p.ellipse(), p.limits()),
        GridAlgorithm::Linear(p) => (p.ellipse(), NeighborLimits::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{InverseDistanceParams, NearestNeighborParams, SamplePoint};
    use approx::assert_relative_eq;
    use surtgrid_core::NoProgress;
    use surtgrid_parallel::ProcessingMode;

    fn scattered(n: usize) -> PointSet {
        // Deterministic pseudo-random scatter
        let mut state = 12345u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let samples: Vec<SamplePoint> = (0..n)
            .map(|_| {
                let x = next() * 100.0;
                let y = next() * 100.0;
                SamplePoint::new(x, y, (x * 0.1).sin() * 10.0 + y * 0.05)
            })
            .collect();
        PointSet::from_samples(&samples)
    }

    #[test]
    fn test_process_window() {
        let points = PointSet::from_samples(&[
            SamplePoint::new(0.0, 0.0, 1.0),
            SamplePoint::new(10.0, 0.0, 2.0),
            SamplePoint::new(0.0, 10.0, 3.0),
            SamplePoint::new(10.0, 10.0, 4.0),
        ]);
        let ctx = GridContext::new(points, GridAlgorithm::default());
        let mut buf = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Float64, 4).unwrap();
        ctx.process(0.0, 10.0, 0.0, 10.0, 2, 2, &mut buf, &mut NoProgress)
            .unwrap();

        // Row 0 lies at y = 2.5, next to the values 1 and 2.
        let v: Vec<f64> = (0..4).map(|i| buf.get_f64(i).unwrap()).collect();
        assert!(v[0] < v[1] && v[1] < v[3] && v[0] < v[2]);
        assert!(v.iter().all(|&z| z > 1.0 && z < 4.0));
    }

    #[test]
    fn test_index_does_not_change_results() {
        let points = Arc::new(scattered(400));
        let alg = GridAlgorithm::InverseDistance(InverseDistanceParams {
            radius1: 15.0,
            radius2: 10.0,
            angle: 20.0,
            max_points: 6,
            ..Default::default()
        });
        let ctx = GridContext::new(Arc::clone(&points), alg);
        assert!(ctx.is_indexed());

        let (ellipse, limits) = search_shape(ctx.algorithm());
        let brute = Neighborhood {
            points: &points,
            index: None,
            ellipse,
            limits,
            initial_radius: 1.0,
        };
        let mut scratch = SearchScratch::default();
        for i in 0..50 {
            let x = i as f64 * 2.1;
            let y = 100.0 - i as f64 * 1.7;
            let a = ctx.evaluate(x, y, &mut scratch);
            let b = ctx.evaluate_in(&brute, x, y, &mut scratch);
            assert_eq!(a.to_bits(), b.to_bits(), "node ({x}, {y})");
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let points = Arc::new(scattered(200));
        let alg: GridAlgorithm = "invdistnn:radius=20:max_points=8".parse().unwrap();
        let seq = GridContext::new(Arc::clone(&points), alg.clone());
        let par = GridContext::new(points, alg)
            .with_executor(Executor::new(ProcessingMode::ParallelWith(3)).unwrap());

        let transform = GeoTransform::new(0.0, 100.0, 2.0, -2.0);
        let tile = Tile::new(0, 0, 50, 50);
        let mut a = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Float32, 2500).unwrap();
        let mut b = a.clone();
        seq.process_block(&transform, &tile, &mut a, &mut NoProgress).unwrap();
        par.process_block(&transform, &tile, &mut b, &mut NoProgress).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_feature_controls_threads() {
        let executor = Executor::new(ProcessingMode::ParallelWith(3)).unwrap();
        let expected = if cfg!(feature = "parallel") { 3 } else { 1 };
        assert_eq!(executor.threads(), expected);
    }

    #[test]
    fn test_progress_and_cancel() {
        let ctx = GridContext::new(scattered(10), GridAlgorithm::default());
        let transform = GeoTransform::new(0.0, 100.0, 10.0, -10.0);
        let tile = Tile::new(0, 0, 10, 10);

        let mut seen = Vec::new();
        let mut record = |f: f64, _: &str| {
            seen.push(f);
            true
        };
        let mut buf = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Int16, 100).unwrap();
        ctx.process_block(&transform, &tile, &mut buf, &mut record).unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_relative_eq!(*seen.last().unwrap(), 1.0);

        let mut calls = 0;
        let mut stop = |_: f64, _: &str| {
            calls += 1;
            calls < 3
        };
        let err = ctx
            .process_block(&transform, &tile, &mut buf, &mut stop)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_buffer_size_checked() {
        let ctx = GridContext::new(scattered(5), GridAlgorithm::default());
        let mut buf = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Byte, 3).unwrap();
        let result = ctx.process(0.0, 1.0, 0.0, 1.0, 2, 2, &mut buf, &mut NoProgress);
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_integer_output_is_rounded_and_clamped() {
        let points = PointSet::from_samples(&[SamplePoint::new(0.0, 0.0, 300.6)]);
        let ctx = GridContext::new(
            points,
            GridAlgorithm::NearestNeighbor(NearestNeighborParams::default()),
        );
        let mut buf = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Byte, 1).unwrap();
        ctx.process(-1.0, 1.0, -1.0, 1.0, 1, 1, &mut buf, &mut NoProgress)
            .unwrap();
        assert_eq!(buf, PixelBuffer::Byte(vec![255]));

        let mut buf = PixelBuffer::try_zeroed(surtgrid_core::PixelType::Int16, 1).unwrap();
        ctx.process(-1.0, 1.0, -1.0, 1.0, 1, 1, &mut buf, &mut NoProgress)
            .unwrap();
        assert_eq!(buf, PixelBuffer::Int16(vec![301]));
    }
}
