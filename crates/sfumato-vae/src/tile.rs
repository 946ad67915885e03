//! Tile grid planning.
//!
//! Sizes are in latent units; one latent cell is [`LATENT_SCALE`] output
//! pixels on a side. For a requested tile size of `P` pixels:
//!
//! ```text
//! core    = P / 8
//! overlap = min(core / 4, 8)
//! extent  = core + overlap          padded tile size handed to the decoder
//! stride  = extent − overlap = core
//! tiles_x = max(1, ⌈(W − overlap) / stride⌉)
//! ```
//!
//! Tile `i` covers `[i·stride, min(i·stride + extent, W))`. Every tile but
//! the last in a row is unclipped, so each interior seam is exactly one
//! `overlap`-wide band shared by two neighbours, and the last tile is always
//! wider than `overlap`. A 512×512 image with 256 px tiles plans a 2×2 grid.

use sfumato_core::TensorError;

/// Output pixels per latent cell.
pub const LATENT_SCALE: usize = 8;
/// Upper bound on the overlap, in latent units.
pub const MAX_OVERLAP: usize = 8;
/// Default tile size in output pixels.
pub const DEFAULT_TILE_SIZE_PX: usize = 256;

/// Which edges of a tile border another tile (and therefore ramp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    /// Neighbour to the left.
    pub left: bool,
    /// Neighbour to the right.
    pub right: bool,
    /// Neighbour above.
    pub top: bool,
    /// Neighbour below.
    pub bottom: bool,
}

/// One latent sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row-major index in the grid.
    pub index: usize,
    /// Column in the grid.
    pub col: usize,
    /// Row in the grid.
    pub row: usize,
    /// Left edge, latent units.
    pub x: usize,
    /// Top edge, latent units.
    pub y: usize,
    /// Footprint width, latent units (clipped at the image edge).
    pub width: usize,
    /// Footprint height, latent units (clipped at the image edge).
    pub height: usize,
    /// Overlap with each neighbour, latent units.
    pub overlap: usize,
    /// Edges shared with neighbours.
    pub edges: Edges,
}

impl Tile {
    /// Left edge in output pixels.
    pub fn pixel_x(&self) -> usize {
        self.x * LATENT_SCALE
    }

    /// Top edge in output pixels.
    pub fn pixel_y(&self) -> usize {
        self.y * LATENT_SCALE
    }

    /// Footprint width in output pixels.
    pub fn pixel_width(&self) -> usize {
        self.width * LATENT_SCALE
    }

    /// Footprint height in output pixels.
    pub fn pixel_height(&self) -> usize {
        self.height * LATENT_SCALE
    }
}

/// A planned partition of a latent into overlapping tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    latent_width: usize,
    latent_height: usize,
    core: usize,
    overlap: usize,
    tiles_x: usize,
    tiles_y: usize,
}

impl TileGrid {
    /// Plans tiles for a `latent_width × latent_height` latent.
    ///
    /// `tile_size_px` must be a positive multiple of [`LATENT_SCALE`].
    pub fn plan(
        latent_width: usize,
        latent_height: usize,
        tile_size_px: usize,
    ) -> Result<Self, TensorError> {
        if latent_width == 0 || latent_height == 0 {
            return Err(TensorError::invalid_shape(
                &[latent_height, latent_width],
                "latent must be non-empty",
            ));
        }
        if tile_size_px < LATENT_SCALE || tile_size_px % LATENT_SCALE != 0 {
            return Err(TensorError::invalid_shape(
                &[tile_size_px],
                "tile size must be a positive multiple of 8 pixels",
            ));
        }

        let core = tile_size_px / LATENT_SCALE;
        let overlap = (core / 4).min(MAX_OVERLAP);
        let count = |len: usize| len.saturating_sub(overlap).div_ceil(core).max(1);

        Ok(Self {
            latent_width,
            latent_height,
            core,
            overlap,
            tiles_x: count(latent_width),
            tiles_y: count(latent_height),
        })
    }

    /// Latent width.
    pub fn latent_width(&self) -> usize {
        self.latent_width
    }

    /// Latent height.
    pub fn latent_height(&self) -> usize {
        self.latent_height
    }

    /// Overlap between neighbours, latent units.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between tile origins, latent units.
    pub fn stride(&self) -> usize {
        self.core
    }

    /// Padded tile side handed to the decoder, latent units.
    pub fn extent(&self) -> usize {
        self.core + self.overlap
    }

    /// Columns.
    pub fn tiles_x(&self) -> usize {
        self.tiles_x
    }

    /// Rows.
    pub fn tiles_y(&self) -> usize {
        self.tiles_y
    }

    /// Total tiles.
    pub fn len(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    /// Always false; a grid has at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Tile at `(col, row)`.
    pub fn tile(&self, col: usize, row: usize) -> Option<Tile> {
        if col >= self.tiles_x || row >= self.tiles_y {
            return None;
        }
        let x = col * self.core;
        let y = row * self.core;
        Some(Tile {
            index: row * self.tiles_x + col,
            col,
            row,
            x,
            y,
            width: (x + self.extent()).min(self.latent_width) - x,
            height: (y + self.extent()).min(self.latent_height) - y,
            overlap: self.overlap,
            edges: Edges {
                left: col > 0,
                right: col + 1 < self.tiles_x,
                top: row > 0,
                bottom: row + 1 < self.tiles_y,
            },
        })
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.tiles_y)
            .flat_map(move |row| (0..self.tiles_x).filter_map(move |col| self.tile(col, row)))
    }
}
