//! Tile-set enumeration for geographic regions.
//!
//! Turns bboxes, polygons, and parent tiles into the exact set of
//! Web-Mercator tiles they touch across a zoom range. All enumerators
//! return lazy, single-use, `Send` iterators; callers that need a second
//! pass construct a fresh one.

use crate::coord::{tile_at, tile_to_bbox, BBox, Tile};
use crate::region::polygon::{point_in_polygon, polygon_bbox, rect_intersects_polygon, Polygon};

/// Grid resolution of the sampling estimator (cells per axis).
pub const SAMPLE_GRID: usize = 64;

/// Estimates below this are refined by counting real tiles.
pub const REFINE_THRESHOLD: u64 = 10_000;

/// Upper bound on tiles examined during refinement.
pub const REFINE_CAP: u64 = 11_000;

/// Inclusive tile index ranges covering a bbox at one zoom level.
fn tile_span(bbox: &BBox, zoom: u8) -> (u32, u32, u32, u32) {
    let nw = tile_at(bbox.max_lat, bbox.min_lon, zoom);
    let se = tile_at(bbox.min_lat, bbox.max_lon, zoom);
    (nw.x, se.x, nw.y, se.y)
}

fn bbox_tiles_at_zoom(bbox: BBox, zoom: u8) -> impl Iterator<Item = Tile> + Send {
    let (min_x, max_x, min_y, max_y) = tile_span(&bbox, zoom);
    (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| Tile { x, y, zoom }))
}

/// Enumerates every tile of the bbox across the zoom range.
///
/// A bbox with `min_lon > max_lon` crosses the antimeridian and is split
/// into its two hemisphere halves first.
pub fn bbox_tiles(bbox: BBox, min_zoom: u8, max_zoom: u8) -> impl Iterator<Item = Tile> + Send {
    bbox.split_antimeridian()
        .into_iter()
        .flat_map(move |part| {
            (min_zoom..=max_zoom).flat_map(move |zoom| bbox_tiles_at_zoom(part, zoom))
        })
}

/// Exact tile count of a bbox at one zoom, antimeridian-aware.
pub fn bbox_tile_count(bbox: &BBox, zoom: u8) -> u64 {
    bbox.split_antimeridian()
        .iter()
        .map(|part| {
            let (min_x, max_x, min_y, max_y) = tile_span(part, zoom);
            (max_x - min_x + 1) as u64 * (max_y - min_y + 1) as u64
        })
        .sum()
}

/// Exact tile count of a bbox over a zoom range.
pub fn bbox_range_count(bbox: &BBox, min_zoom: u8, max_zoom: u8) -> u64 {
    (min_zoom..=max_zoom)
        .map(|zoom| bbox_tile_count(bbox, zoom))
        .sum()
}

/// Enumerates the tiles whose bbox intersects any of the polygons.
///
/// Polygons must already be normalized and antimeridian-split (see
/// [`crate::region::split_antimeridian`]); candidates come from each
/// polygon's bbox and are filtered by geometric intersection.
pub fn polygon_tiles(
    polygons: Vec<Polygon>,
    min_zoom: u8,
    max_zoom: u8,
) -> impl Iterator<Item = Tile> + Send {
    polygons.into_iter().flat_map(move |poly| {
        let bbox = polygon_bbox(&poly);
        (min_zoom..=max_zoom).flat_map(move |zoom| {
            let poly = poly.clone();
            bbox.into_iter().flat_map(move |bbox| {
                let poly = poly.clone();
                bbox_tiles_at_zoom(bbox, zoom)
                    .filter(move |tile| rect_intersects_polygon(&tile_to_bbox(tile), &poly))
            })
        })
    })
}

/// Enumerates the descendants of a parent tile across a zoom range
/// (including the parent itself when its zoom is in range).
pub fn tile_pyramid(parent: Tile, min_zoom: u8, max_zoom: u8) -> impl Iterator<Item = Tile> + Send {
    (min_zoom.max(parent.zoom)..=max_zoom).flat_map(move |zoom| {
        let factor = zoom - parent.zoom;
        let x0 = parent.x << factor;
        let y0 = parent.y << factor;
        let span = 1u32 << factor;
        (x0..x0 + span).flat_map(move |x| (y0..y0 + span).map(move |y| Tile { x, y, zoom }))
    })
}

/// Sampling estimate of how many tiles at `zoom` intersect the polygon.
///
/// The polygon's bbox is partitioned into a [`SAMPLE_GRID`]-squared cell
/// grid; the bbox tile count is scaled by the fraction of cell centers
/// falling inside the polygon.
pub fn estimate_polygon_tiles_at_zoom(poly: &Polygon, zoom: u8) -> u64 {
    let Some(bbox) = polygon_bbox(poly) else {
        return 0;
    };

    let total_cells = (SAMPLE_GRID * SAMPLE_GRID) as u64;
    let lon_step = (bbox.max_lon - bbox.min_lon) / SAMPLE_GRID as f64;
    let lat_step = (bbox.max_lat - bbox.min_lat) / SAMPLE_GRID as f64;

    let mut inside = 0u64;
    for i in 0..SAMPLE_GRID {
        let lon = bbox.min_lon + (i as f64 + 0.5) * lon_step;
        for j in 0..SAMPLE_GRID {
            let lat = bbox.min_lat + (j as f64 + 0.5) * lat_step;
            if point_in_polygon(lon, lat, poly) {
                inside += 1;
            }
        }
    }

    let bbox_count = bbox_tile_count(&bbox, zoom);
    ((bbox_count as f64) * (inside as f64) / (total_cells as f64)).round() as u64
}

/// Sampling estimate over a zoom range, summed across polygons.
pub fn estimate_polygon_range(polygons: &[Polygon], min_zoom: u8, max_zoom: u8) -> u64 {
    polygons
        .iter()
        .map(|poly| {
            (min_zoom..=max_zoom)
                .map(|zoom| estimate_polygon_tiles_at_zoom(poly, zoom))
                .sum::<u64>()
        })
        .sum()
}

/// Counts the tiles of a sequence, giving up at `cap`.
///
/// Returns `Some(count)` when the sequence ends before the cap and `None`
/// when it does not; callers keep their estimate in the latter case.
pub fn refine_count(tiles: impl Iterator<Item = Tile>, cap: u64) -> Option<u64> {
    let mut count = 0u64;
    for _ in tiles {
        count += 1;
        if count >= cap {
            return None;
        }
    }
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::polygon::split_antimeridian;
    use std::collections::HashSet;

    #[test]
    fn test_bbox_tiles_no_duplicates() {
        let bbox = BBox::new(-10.0, -10.0, 10.0, 10.0);
        let tiles: Vec<Tile> = bbox_tiles(bbox, 0, 4).collect();
        let unique: HashSet<Tile> = tiles.iter().copied().collect();
        assert_eq!(tiles.len(), unique.len());
        assert!(!tiles.is_empty());
    }

    #[test]
    fn test_bbox_tiles_zoom_zero() {
        let bbox = BBox::new(-10.0, -10.0, 10.0, 10.0);
        let tiles: Vec<Tile> = bbox_tiles(bbox, 0, 0).collect();
        assert_eq!(tiles, vec![Tile::new(0, 0, 0)]);
    }

    #[test]
    fn test_bbox_count_matches_enumeration() {
        let bbox = BBox::new(5.0, 40.0, 15.0, 50.0);
        for zoom in 0..=8 {
            let counted = bbox_tiles(bbox, zoom, zoom).count() as u64;
            assert_eq!(counted, bbox_tile_count(&bbox, zoom), "zoom {}", zoom);
        }
    }

    #[test]
    fn test_antimeridian_bbox_covers_both_hemispheres() {
        // 170E to 170W, equator to 10N
        let bbox = BBox::new(170.0, 0.0, -170.0, 10.0);
        let tiles: Vec<Tile> = bbox_tiles(bbox, 2, 2).collect();

        let n = 1u32 << 2;
        assert!(tiles.iter().any(|t| t.x == 0), "western column missing");
        assert!(tiles.iter().any(|t| t.x == n - 1), "eastern column missing");
        assert!(tiles.len() >= 4);
    }

    #[test]
    fn test_polygon_tiles_exact_at_low_zoom() {
        // Triangle in the north-east quadrant
        let poly = Polygon::new(vec![vec![(10.0, 10.0), (60.0, 10.0), (10.0, 60.0)]]);
        let tiles: HashSet<Tile> = polygon_tiles(vec![poly.clone()], 3, 3).collect();

        // Every yielded tile's bbox intersects the polygon, and every
        // intersecting tile of the covering bbox is yielded.
        let bbox = polygon_bbox(&poly).unwrap();
        for tile in bbox_tiles(bbox, 3, 3) {
            let intersects = rect_intersects_polygon(&tile_to_bbox(&tile), &poly);
            assert_eq!(tiles.contains(&tile), intersects, "tile {}", tile);
        }
    }

    #[test]
    fn test_polygon_tiles_after_antimeridian_split() {
        let poly = Polygon::new(vec![vec![
            (170.0, 0.0),
            (-170.0, 0.0),
            (-170.0, 10.0),
            (170.0, 10.0),
        ]]);
        let parts = split_antimeridian(&poly);
        let tiles: Vec<Tile> = polygon_tiles(parts, 2, 2).collect();

        let n = 1u32 << 2;
        assert!(tiles.iter().any(|t| t.x == 0));
        assert!(tiles.iter().any(|t| t.x == n - 1));
        assert!(tiles.len() >= 4);
    }

    #[test]
    fn test_tile_pyramid() {
        let parent = Tile::new(2, 1, 1);
        let tiles: Vec<Tile> = tile_pyramid(parent, 2, 4).collect();

        // 1 + 4 + 16
        assert_eq!(tiles.len(), 21);
        assert!(tiles.contains(&parent));
        assert!(tiles.contains(&Tile::new(4, 4, 4)));
        assert!(tiles.contains(&Tile::new(4, 7, 7)));
        assert!(!tiles.contains(&Tile::new(4, 8, 4)));
    }

    #[test]
    fn test_estimator_full_bbox_polygon() {
        // A polygon equal to its own bbox: estimate should equal the
        // exact bbox count.
        let bbox = BBox::new(0.0, 0.0, 45.0, 45.0);
        let poly = Polygon::from_bbox(&bbox);
        let estimate = estimate_polygon_tiles_at_zoom(&poly, 6);
        assert_eq!(estimate, bbox_tile_count(&bbox, 6));
    }

    #[test]
    fn test_estimator_half_area_triangle() {
        let poly = Polygon::new(vec![vec![(0.0, 0.0), (40.0, 0.0), (0.0, 40.0)]]);
        let bbox = polygon_bbox(&poly).unwrap();
        let estimate = estimate_polygon_tiles_at_zoom(&poly, 8);
        let bbox_count = bbox_tile_count(&bbox, 8);

        // Triangle is half its bbox; sampling tolerance ~5%
        let ratio = estimate as f64 / bbox_count as f64;
        assert!((0.45..=0.55).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn test_refine_count() {
        let bbox = BBox::new(0.0, 0.0, 20.0, 20.0);
        let exact = bbox_tiles(bbox, 4, 4).count() as u64;

        assert_eq!(refine_count(bbox_tiles(bbox, 4, 4), 10_000), Some(exact));
        assert_eq!(refine_count(bbox_tiles(bbox, 4, 4), exact), None);
    }
}
