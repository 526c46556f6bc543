//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator tile coordinates used by chart providers, plus the
//! XYZ/TMS row flip used at the MBTiles store boundary.

mod types;

pub use types::{
    flip_row, BBox, CoordError, Tile, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<Tile, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    Ok(tile_at(lat, lon, zoom))
}

/// Converts geographic coordinates to tile coordinates, clamping out-of-range
/// inputs instead of failing.
///
/// Enumerators use this to stay total over caller-supplied geometry; the
/// validating entry point is [`to_tile_coords`].
#[inline]
pub fn tile_at(lat: f64, lon: f64, zoom: u8) -> Tile {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let lon = lon.clamp(MIN_LON, MAX_LON);

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    let x = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    let lat_rad = lat * PI / 180.0;
    let y = ((((1.0 - lat_rad.tan().asinh() / PI) / 2.0) * n) as u32).min(max_index);

    Tile { x, y, zoom }
}

/// Returns the geographic bounding box covered by a tile.
#[inline]
pub fn tile_to_bbox(tile: &Tile) -> BBox {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon_at = |x: f64| x / n * 360.0 - 180.0;
    let lat_at = |y: f64| {
        let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad * 180.0 / PI
    };

    BBox {
        min_lon: lon_at(tile.x as f64),
        min_lat: lat_at(tile.y as f64 + 1.0),
        max_lon: lon_at(tile.x as f64 + 1.0),
        max_lat: lat_at(tile.y as f64),
    }
}
