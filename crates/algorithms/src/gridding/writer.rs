//! Tiled raster writer: drives a grid context block by block into a sink

use surtgrid_core::io::RasterSink;
use surtgrid_core::raster::{GeoTransform, PixelBuffer};
use surtgrid_core::{Error, Progress, Result, ScaledProgress};
use surtgrid_parallel::{working_tile_size, TileIterator, DEFAULT_TILE_BUDGET};
use tracing::debug;

use super::GridContext;

/// Writes one band of a sink by evaluating a [`GridContext`] over working
/// tiles sized to a memory budget.
#[derive(Debug)]
pub struct TiledGridWriter<'a> {
    context: &'a GridContext,
    transform: GeoTransform,
    budget: usize,
}

impl<'a> TiledGridWriter<'a> {
    /// `transform` georeferences the whole sink raster
    pub fn new(context: &'a GridContext, transform: GeoTransform) -> Self {
        Self {
            context,
            transform,
            budget: DEFAULT_TILE_BUDGET,
        }
    }

    /// Bytes one working tile may take
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Tile shape (width, height) used for `sink`
    pub fn tile_size(&self, sink: &dyn RasterSink) -> (usize, usize) {
        let (block_w, block_h) = sink.block_size();
        working_tile_size(
            block_w,
            block_h,
            sink.pixel_type().size_bytes(),
            sink.width(),
            sink.height(),
            self.budget,
        )
    }

    /// Fill band `band` of `sink`.
    ///
    /// Tiles run left to right, then top to bottom. Tile `i` of `n` reports
    /// progress within `[i / n, (i + 1) / n]` and the last report is exactly
    /// 1.0. The first failing tile aborts the band; tiles already written
    /// stay in the sink.
    pub fn write_band(
        &self,
        sink: &mut dyn RasterSink,
        band: usize,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        let (tile_w, tile_h) = self.tile_size(sink);
        let tiles = TileIterator::new(sink.height(), sink.width(), tile_h, tile_w);
        let count = tiles.tile_count();
        let pixel_type = sink.pixel_type();

        for (i, tile) in tiles.enumerate() {
            let mut buffer = PixelBuffer::try_zeroed(pixel_type, tile.len())?;
            {
                let start = i as f64 / count as f64;
                let end = (i + 1) as f64 / count as f64;
                let mut scaled = ScaledProgress::new(&mut *progress, start, end);
                self.context
                    .process_block(&self.transform, &tile, &mut buffer, &mut scaled)?;
            }
            sink.write_block(band, tile.col_offset, tile.row_offset, tile.cols, tile.rows, &buffer)?;
            debug!(
                band,
                tile = i + 1,
                of = count,
                x_off = tile.col_offset,
                y_off = tile.row_offset,
                "Wrote grid block"
            );
        }

        if !progress.report(1.0, "") {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
