//! Render queue: partitions the film into rectangular tiles and hands
//! them out to workers via a shared claim cursor, in either linear
//! (row-major) or spiral-from-center order.

use serde::{Deserialize, Serialize};

/// A rectangular render unit. Tile rectangles partition the film exactly
/// (no overlap, no gap) for any `TileQueue` built by this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileOrder {
    /// Start at the film center and spiral outward one tile at a time.
    Spiral,
    /// Row-major scan from the top-left corner.
    Linear,
}

/// Ordered tile list with a shared claim cursor and a per-tile completed-
/// pass counter. Not internally synchronized — the `Renderer` wraps it in
/// a mutex so claim/release stay two short critical sections per tile.
pub struct TileQueue {
    tiles: Vec<Tile>,
    passes: Vec<u32>,
    claimed: usize,
}

impl TileQueue {
    pub fn build(film_width: u32, film_height: u32, tile_size: u32, order: TileOrder) -> Self {
        let tiles = match order {
            TileOrder::Linear => build_linear(film_width, film_height, tile_size),
            TileOrder::Spiral => build_spiral(film_width, film_height, tile_size),
        };
        let passes = vec![0u32; tiles.len()];
        Self { tiles, passes, claimed: 0 }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, index: usize) -> Tile {
        self.tiles[index]
    }

    pub fn pass_count(&self, index: usize) -> u32 {
        self.passes[index]
    }

    /// Claim the next tile: `cursor = claimed++ mod len`. Panics if the
    /// queue is empty — callers must not claim from an empty film.
    pub fn claim(&mut self) -> (usize, Tile) {
        assert!(!self.tiles.is_empty(), "cannot claim a tile from an empty queue");
        let index = self.claimed % self.tiles.len();
        self.claimed += 1;
        (index, self.tiles[index])
    }

    /// Total claims made so far (monotonically increasing, not wrapped).
    pub fn claims_made(&self) -> usize {
        self.claimed
    }

    pub fn advance_pass(&mut self, index: usize) {
        self.passes[index] += 1;
    }

    /// Reset contract (§4.8): clear every tile's pass counter and the claim
    /// cursor. The film itself is cleared separately by the caller, which
    /// must hold both the tiles mutex and the framebuffer mutex first.
    pub fn reset(&mut self) {
        self.claimed = 0;
        for p in self.passes.iter_mut() {
            *p = 0;
        }
    }
}

fn clipped_tile(x: u32, y: u32, tile_size: u32, film_width: u32, film_height: u32) -> Tile {
    let w = tile_size.min(film_width - x);
    let h = tile_size.min(film_height - y);
    Tile::new(x, y, w, h)
}

fn build_linear(film_width: u32, film_height: u32, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < film_height {
        let mut x = 0;
        while x < film_width {
            tiles.push(clipped_tile(x, y, tile_size, film_width, film_height));
            x += tile_size;
        }
        y += tile_size;
    }
    tiles
}

/// Spiral grid-cell walk: start at the center cell and expand outward in a
/// square spiral, dropping cells outside `[0, cols) x [0, rows)`. Because
/// the spiral's bounding square grows without limit, it necessarily sweeps
/// every in-range cell once the square exceeds the grid's extent, so this
/// terminates with exactly `cols * rows` visited cells.
fn spiral_grid_coords(cols: i64, rows: i64) -> Vec<(i64, i64)> {
    let total = (cols * rows) as usize;
    let mut coords = Vec::with_capacity(total);
    if total == 0 {
        return coords;
    }

    let (cx, cy) = (cols / 2, rows / 2);
    let mut x = cx;
    let mut y = cy;
    let in_range = |x: i64, y: i64| x >= 0 && x < cols && y >= 0 && y < rows;
    if in_range(x, y) {
        coords.push((x, y));
    }

    // Right, down, left, up; run length increases every two turns.
    let dirs: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
    let mut dir_index = 0usize;
    let mut run = 1i64;
    while coords.len() < total {
        for _ in 0..2 {
            let (dx, dy) = dirs[dir_index % 4];
            for _ in 0..run {
                x += dx;
                y += dy;
                if in_range(x, y) {
                    coords.push((x, y));
                    if coords.len() == total {
                        return coords;
                    }
                }
            }
            dir_index += 1;
        }
        run += 1;
    }
    coords
}

fn build_spiral(film_width: u32, film_height: u32, tile_size: u32) -> Vec<Tile> {
    if film_width == 0 || film_height == 0 {
        return Vec::new();
    }
    let cols = film_width.div_ceil(tile_size) as i64;
    let rows = film_height.div_ceil(tile_size) as i64;

    spiral_grid_coords(cols, rows)
        .into_iter()
        .map(|(gx, gy)| clipped_tile(gx as u32 * tile_size, gy as u32 * tile_size, tile_size, film_width, film_height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partitions_film(tiles: &[Tile], width: u32, height: u32) {
        let mut covered = vec![false; (width * height) as usize];
        for t in tiles {
            for py in t.y..t.y + t.h {
                for px in t.x..t.x + t.w {
                    let idx = (py * width + px) as usize;
                    assert!(!covered[idx], "tile rectangles overlap at ({px},{py})");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c), "tiles do not cover the full film");
    }

    #[test]
    fn scenario_f_linear_partitioning() {
        let tiles = build_linear(100, 80, 32);
        let expected = vec![
            Tile::new(0, 0, 32, 32),
            Tile::new(32, 0, 32, 32),
            Tile::new(64, 0, 32, 32),
            Tile::new(96, 0, 4, 32),
            Tile::new(0, 32, 32, 32),
            Tile::new(32, 32, 32, 32),
            Tile::new(64, 32, 32, 32),
            Tile::new(96, 32, 4, 32),
            Tile::new(0, 64, 32, 16),
            Tile::new(32, 64, 32, 16),
            Tile::new(64, 64, 32, 16),
            Tile::new(96, 64, 4, 16),
        ];
        assert_eq!(tiles, expected);
        assert_partitions_film(&tiles, 100, 80);
    }

    #[test]
    fn spiral_partitions_film_and_starts_near_center() {
        let tiles = build_spiral(192, 192, 64);
        assert_eq!(tiles.len(), 9);
        assert_partitions_film(&tiles, 192, 192);
        assert_eq!(tiles[0], Tile::new(64, 64, 64, 64));
    }

    #[test]
    fn spiral_handles_non_square_and_partial_tiles() {
        let tiles = build_spiral(100, 80, 32);
        assert_partitions_film(&tiles, 100, 80);
        assert_eq!(tiles.len(), 12);
    }

    #[test]
    fn queue_claim_wraps_modulo_length() {
        let mut q = TileQueue::build(64, 64, 32, TileOrder::Linear);
        assert_eq!(q.len(), 4);
        let (i0, _) = q.claim();
        let (i1, _) = q.claim();
        let (i2, _) = q.claim();
        let (i3, _) = q.claim();
        let (i4, _) = q.claim();
        assert_eq!([i0, i1, i2, i3], [0, 1, 2, 3]);
        assert_eq!(i4, 0);
    }

    #[test]
    fn reset_clears_cursor_and_pass_counters() {
        let mut q = TileQueue::build(64, 64, 32, TileOrder::Linear);
        let (idx, _) = q.claim();
        q.advance_pass(idx);
        q.reset();
        assert_eq!(q.claims_made(), 0);
        assert_eq!(q.pass_count(idx), 0);
    }
}
