//! Tile geometry for block-wise raster generation

/// Working-set budget for one output tile (16 MiB)
pub const DEFAULT_TILE_BUDGET: usize = 16 * 1024 * 1024;

/// A rectangular subset of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the full raster
    pub row_offset: usize,
    /// Column offset in the full raster
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Number of cells in this tile
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert tile-local coordinates to full raster coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.row_offset + local_row, self.col_offset + local_col)
    }
}

/// Iterator over tiles covering a raster, left-to-right then top-to-bottom.
///
/// Edge tiles are truncated to the raster.
#[derive(Debug, Clone)]
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    pub fn new(total_rows: usize, total_cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
            current_row: 0,
            current_col: 0,
        }
    }

    /// Total number of tiles the iterator yields from the start
    pub fn tile_count(&self) -> usize {
        if self.total_rows == 0 || self.total_cols == 0 {
            return 0;
        }
        self.total_rows.div_ceil(self.tile_rows) * self.total_cols.div_ceil(self.tile_cols)
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_rows.min(self.total_rows - self.current_row);
        let cols = self.tile_cols.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_cols;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_rows;
        }

        Some(tile)
    }
}

/// Pick the working tile shape `(width, height)` for generating a raster.
///
/// Starts from the native block (clamped to the raster) and grows it in
/// whole native blocks while `width * height * pixel_size` stays within
/// `budget_bytes`: first along X up to the raster width, then, once the tile
/// spans full rows, along Y. A single native block is returned even when it
/// alone exceeds the budget.
pub fn working_tile_size(
    native_block_w: usize,
    native_block_h: usize,
    pixel_size: usize,
    raster_w: usize,
    raster_h: usize,
    budget_bytes: usize,
) -> (usize, usize) {
    let pixel_size = pixel_size.max(1);
    let block_w = native_block_w.clamp(1, raster_w.max(1));
    let block_h = native_block_h.clamp(1, raster_h.max(1));

    let mut tile_w = block_w;
    let mut tile_h = block_h;

    if tile_w < raster_w {
        let max_w = budget_bytes / (block_h * pixel_size);
        if max_w > tile_w {
            tile_w = ((max_w / block_w) * block_w).min(raster_w);
        }
    }

    if tile_w >= raster_w && tile_h < raster_h {
        let max_h = budget_bytes / (tile_w * pixel_size);
        if max_h > tile_h {
            tile_h = ((max_h / block_h) * block_h).min(raster_h);
        }
    }

    tracing::debug!(
        "Working tile {}x{} (native block {}x{}, raster {}x{})",
        tile_w,
        tile_h,
        native_block_w,
        native_block_h,
        raster_w,
        raster_h
    );
    (tile_w, tile_h)
}
