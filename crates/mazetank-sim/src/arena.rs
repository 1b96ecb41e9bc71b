use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collision::Rect;
use crate::config::SimConfig;

/// Placement of the maze inside the arena canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MazeInfo {
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
    pub cell_size: f32,
    pub cols: usize,
    pub rows: usize,
}

impl MazeInfo {
    /// Centre of cell `(col, row)` in arena coordinates.
    pub fn cell_center(&self, col: usize, row: usize) -> (f32, f32) {
        (
            self.offset_x + (col as f32 + 0.5) * self.cell_size,
            self.offset_y + (row as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.offset_x + self.width / 2.0,
            self.offset_y + self.height / 2.0,
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.width, self.height)
    }
}

/// Boolean wall grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeGrid {
    pub cols: usize,
    pub rows: usize,
    cells: Vec<bool>,
}

impl MazeGrid {
    fn empty(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![false; cols * rows],
        }
    }

    pub fn is_wall(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.cells[row * self.cols + col]
    }

    fn set(&mut self, col: usize, row: usize, wall: bool) {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = wall;
        }
    }

    fn is_border(&self, col: usize, row: usize) -> bool {
        col == 0 || row == 0 || col + 1 == self.cols || row + 1 == self.rows
    }

    /// Number of orthogonal neighbours that are walls.
    fn blocked_neighbours(&self, col: usize, row: usize) -> usize {
        let mut blocked = 0;
        if col > 0 && self.is_wall(col - 1, row) {
            blocked += 1;
        }
        if self.is_wall(col + 1, row) {
            blocked += 1;
        }
        if row > 0 && self.is_wall(col, row - 1) {
            blocked += 1;
        }
        if self.is_wall(col, row + 1) {
            blocked += 1;
        }
        blocked
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|&&w| w).count()
    }
}

/// A generated arena: wall rectangles plus the maze bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    pub maze: MazeInfo,
    pub grid: MazeGrid,
    /// Interior strips first, then the four maze boundary walls.
    pub walls: Vec<Rect>,
}

impl Arena {
    /// Walls emitted for maze cells, without the enclosing boundary.
    pub fn interior_walls(&self) -> &[Rect] {
        &self.walls[..self.walls.len().saturating_sub(4)]
    }

    pub fn in_bounds(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

/// Roll the wall grid.
///
/// Each cell becomes a wall with `wall_probability`. A single in-place pass
/// then clears any wall cell with more than two walled neighbours, which
/// breaks up most pockets without guaranteeing connectivity. Border cells are
/// forced open last.
pub fn generate_grid(
    cols: usize,
    rows: usize,
    wall_probability: f64,
    rng: &mut impl Rng,
) -> MazeGrid {
    let mut grid = MazeGrid::empty(cols, rows);
    let p = wall_probability.clamp(0.0, 1.0);

    for row in 0..rows {
        for col in 0..cols {
            if rng.random_bool(p) {
                grid.set(col, row, true);
            }
        }
    }

    for row in 0..rows {
        for col in 0..cols {
            if grid.is_wall(col, row) && grid.blocked_neighbours(col, row) > 2 {
                grid.set(col, row, false);
            }
        }
    }

    for row in 0..rows {
        for col in 0..cols {
            if grid.is_border(col, row) {
                grid.set(col, row, false);
            }
        }
    }

    grid
}

/// Generate a fresh arena from the config.
pub fn generate_arena(config: &SimConfig, rng: &mut impl Rng) -> Arena {
    let grid = generate_grid(
        config.maze_cols,
        config.maze_rows,
        config.wall_probability,
        rng,
    );
    build_arena(config, grid)
}

/// Turn a wall grid into thin-wall rectangles centred in the canvas.
pub fn build_arena(config: &SimConfig, grid: MazeGrid) -> Arena {
    let cell = config.grid_size;
    let thickness = config.wall_thickness;
    let maze_width = grid.cols as f32 * cell;
    let maze_height = grid.rows as f32 * cell;
    let offset_x = ((config.arena_width - maze_width) / 2.0).floor();
    let offset_y = ((config.arena_height - maze_height) / 2.0).floor();

    let mut walls = Vec::with_capacity(grid.wall_count() * 2 + 4);
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            if !grid.is_wall(col, row) {
                continue;
            }
            let x = offset_x + col as f32 * cell;
            let y = offset_y + row as f32 * cell;
            // Left edge strip, then top edge strip
            walls.push(Rect::new(x, y, thickness, cell));
            walls.push(Rect::new(x, y, cell, thickness));
        }
    }

    walls.extend([
        Rect::new(offset_x, offset_y, maze_width, thickness),
        Rect::new(
            offset_x,
            offset_y + maze_height - thickness,
            maze_width,
            thickness,
        ),
        Rect::new(offset_x, offset_y, thickness, maze_height),
        Rect::new(
            offset_x + maze_width - thickness,
            offset_y,
            thickness,
            maze_height,
        ),
    ]);

    tracing::debug!(
        wall_cells = grid.wall_count(),
        rects = walls.len(),
        "Generated maze"
    );

    Arena {
        width: config.arena_width,
        height: config.arena_height,
        maze: MazeInfo {
            offset_x,
            offset_y,
            width: maze_width,
            height: maze_height,
            cell_size: cell,
            cols: grid.cols,
            rows: grid.rows,
        },
        grid,
        walls,
    }
}
