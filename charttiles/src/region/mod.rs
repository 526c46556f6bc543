//! Region geometry and tile-set enumeration.
//!
//! A cache region arrives as a GeoJSON feature, a bbox, or a single
//! parent tile. This module converts any of them into the exact set of
//! Web-Mercator tiles they touch, handling antimeridian crossings and
//! polygon/tile intersection, and provides the sampling estimators used
//! to size seeding jobs before enumeration completes.

mod enumerate;
mod geojson;
mod polygon;

pub use enumerate::{
    bbox_range_count, bbox_tile_count, bbox_tiles, estimate_polygon_range,
    estimate_polygon_tiles_at_zoom, polygon_tiles, refine_count, tile_pyramid, REFINE_CAP,
    REFINE_THRESHOLD, SAMPLE_GRID,
};
pub use geojson::{features_from_json, Feature, Geometry};
pub use polygon::{
    normalize_lon, normalize_longitudes, point_in_polygon, polygon_bbox, rect_intersects_polygon,
    segments_intersect, split_antimeridian, Polygon, Ring,
};
