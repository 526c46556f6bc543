//! URL template substitution for remote tile origins.

use crate::coord::Tile;

/// Renders a tile URL from a template.
///
/// Supported placeholders, all decimal integers:
/// - `{z}`, `{x}`, `{y}` - XYZ tile coordinates
/// - `{-y}` - TMS row (`2^z - 1 - y`), used by TMS origins
/// - `{z-2}` - zoom minus two, used by origins whose zoom scale is
///   offset from the slippy-map convention
pub fn render_tile_url(template: &str, tile: &Tile) -> String {
    template
        .replace("{z}", &tile.zoom.to_string())
        .replace("{z-2}", &tile.zoom.saturating_sub(2).to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{-y}", &tile.tms_row().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_xyz_template() {
        let tile = Tile::new(3, 2, 5);
        let url = render_tile_url("http://o.example/{z}/{x}/{y}.png", &tile);
        assert_eq!(url, "http://o.example/3/2/5.png");
    }

    #[test]
    fn test_tms_row_placeholder() {
        let tile = Tile::new(3, 2, 5);
        // 2^3 - 1 - 5 = 2
        let url = render_tile_url("http://o.example/{z}/{x}/{-y}.png", &tile);
        assert_eq!(url, "http://o.example/3/2/2.png");
    }

    #[test]
    fn test_zoom_offset_placeholder() {
        let tile = Tile::new(10, 4, 4);
        let url = render_tile_url("http://o.example/{z-2}/{x}/{y}", &tile);
        assert_eq!(url, "http://o.example/8/4/4");

        // Clamped at zero rather than wrapping
        let shallow = Tile::new(1, 0, 0);
        let url = render_tile_url("{z-2}", &shallow);
        assert_eq!(url, "0");
    }

    #[test]
    fn test_repeated_placeholders() {
        let tile = Tile::new(2, 1, 3);
        let url = render_tile_url("{z}/{z}/{x}-{y}", &tile);
        assert_eq!(url, "2/2/1-3");
    }
}
