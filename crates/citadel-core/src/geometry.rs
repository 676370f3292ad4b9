//! Path and grid geometry on the ground plane.
//!
//! Pure functions shared by movement, targeting and placement validation.

use glam::DVec2;

use crate::constants::PATH_END_THRESHOLD;
use crate::types::{GridCell, Position, Waypoint};

/// Euclidean distance on the ground plane.
pub fn distance_2d(a: Position, b: Position) -> f64 {
    a.distance_to(&b)
}

/// Shortest distance from `p` to the segment `a`-`b`. A degenerate
/// segment is treated as a point.
pub fn point_to_segment_distance(p: Position, a: Position, b: Position) -> f64 {
    let (p, a, b) = (DVec2::from(p), DVec2::from(a), DVec2::from(b));
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Total ground length of a polyline.
pub fn path_length(path: &[Waypoint]) -> f64 {
    path.windows(2)
        .map(|w| w[0].ground().distance_to(&w[1].ground()))
        .sum()
}

/// Point at `progress` (0..1) along a polyline, interpolated in proportion
/// to cumulative segment length. Progress outside 0..1 clamps to the ends;
/// an empty path yields the origin.
pub fn position_along_path(path: &[Waypoint], progress: f64) -> Position {
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return Position::default();
    };
    if progress <= 0.0 {
        return first.ground();
    }
    if progress >= 1.0 {
        return last.ground();
    }

    let target = progress * path_length(path);
    let mut travelled = 0.0;
    for w in path.windows(2) {
        let (a, b) = (w[0].ground(), w[1].ground());
        let len = a.distance_to(&b);
        if len > 0.0 && target <= travelled + len {
            let t = (target - travelled) / len;
            return DVec2::from(a).lerp(DVec2::from(b), t).into();
        }
        travelled += len;
    }
    last.ground()
}

/// Point along path `index` of a multi-path level. `None` when the index
/// is out of range or the path is empty.
pub fn position_along_paths(paths: &[Vec<Waypoint>], index: usize, progress: f64) -> Option<Position> {
    let path = paths.get(index).filter(|p| !p.is_empty())?;
    Some(position_along_path(path, progress))
}

pub fn is_at_path_end(progress: f64) -> bool {
    progress >= PATH_END_THRESHOLD
}

/// World coordinate of the grid's lower edge. The grid is centred on the origin.
pub fn grid_offset(grid_size: u32, tile_size: f64) -> f64 {
    -(grid_size as f64 * tile_size) / 2.0
}

/// World position of a cell's centre.
pub fn cell_center(cell: GridCell, grid_size: u32, tile_size: f64) -> Position {
    let offset = grid_offset(grid_size, tile_size);
    Position::new(
        offset + cell.x as f64 * tile_size + tile_size / 2.0,
        offset + cell.z as f64 * tile_size + tile_size / 2.0,
    )
}

pub fn cell_in_bounds(cell: GridCell, grid_size: u32) -> bool {
    let n = grid_size as i32;
    (0..n).contains(&cell.x) && (0..n).contains(&cell.z)
}

/// Inclusive square containment test.
pub fn is_point_in_tile(point: Position, tile_center: Position, tile_size: f64) -> bool {
    let half = tile_size / 2.0;
    (point.x - tile_center.x).abs() <= half && (point.z - tile_center.z).abs() <= half
}

/// Whether a tile overlaps any path. A waypoint inside the tile claims it
/// outright; otherwise the tile is on the path when one of its corners or
/// its centre lies within half the path width of any segment.
pub fn is_tile_on_path(
    tile_center: Position,
    tile_size: f64,
    paths: &[Vec<Waypoint>],
    path_width: f64,
) -> bool {
    let waypoint_inside = paths
        .iter()
        .flatten()
        .any(|w| is_point_in_tile(w.ground(), tile_center, tile_size));
    if waypoint_inside {
        return true;
    }

    let half = tile_size / 2.0;
    let samples = [
        Position::new(tile_center.x - half, tile_center.z - half),
        Position::new(tile_center.x + half, tile_center.z - half),
        Position::new(tile_center.x - half, tile_center.z + half),
        Position::new(tile_center.x + half, tile_center.z + half),
        tile_center,
    ];
    paths.iter().any(|path| {
        path.windows(2).any(|w| {
            let (a, b) = (w[0].ground(), w[1].ground());
            samples
                .iter()
                .any(|p| point_to_segment_distance(*p, a, b) <= path_width / 2.0)
        })
    })
}
