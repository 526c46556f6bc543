//! Polygon geometry over geographic coordinates.
//!
//! Implements the primitives the tile enumerator needs: longitude
//! normalization, the antimeridian cut, point-in-polygon, and
//! polygon-vs-rectangle intersection. Coordinates are (lon, lat) pairs
//! in degrees; rings are stored open (no repeated closing vertex).

use crate::coord::{BBox, MAX_LON, MIN_LON};

/// An open ring of (lon, lat) vertices.
pub type Ring = Vec<(f64, f64)>;

/// A polygon as a list of rings; the first ring is the exterior, any
/// further rings are holes. Even-odd winding is assumed throughout.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    /// Builds an axis-aligned rectangle polygon from a bbox.
    pub fn from_bbox(bbox: &BBox) -> Self {
        Self {
            rings: vec![vec![
                (bbox.min_lon, bbox.min_lat),
                (bbox.max_lon, bbox.min_lat),
                (bbox.max_lon, bbox.max_lat),
                (bbox.min_lon, bbox.max_lat),
            ]],
        }
    }

    pub fn exterior(&self) -> Option<&Ring> {
        self.rings.first()
    }
}

/// Wraps a longitude into [-180, 180], leaving in-range values (including
/// exactly +-180) untouched.
#[inline]
pub fn normalize_lon(mut lon: f64) -> f64 {
    while lon > MAX_LON {
        lon -= 360.0;
    }
    while lon < MIN_LON {
        lon += 360.0;
    }
    lon
}

/// Normalizes every vertex longitude of a polygon into [-180, 180].
pub fn normalize_longitudes(poly: &mut Polygon) {
    for ring in &mut poly.rings {
        for point in ring.iter_mut() {
            point.0 = normalize_lon(point.0);
        }
    }
}

fn ring_crosses_antimeridian(ring: &Ring) -> bool {
    ring.windows(2)
        .any(|pair| (pair[1].0 - pair[0].0).abs() > 180.0)
        || ring
            .first()
            .zip(ring.last())
            .is_some_and(|(a, b)| (a.0 - b.0).abs() > 180.0 && ring.len() > 2)
}

/// Unrolls a normalized ring into a continuous longitude space: whenever
/// consecutive vertices jump by more than 180 degrees the remainder of the
/// ring is shifted by 360 so edges never wrap.
fn unroll_ring(ring: &Ring) -> Ring {
    let mut out = Vec::with_capacity(ring.len());
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;

    for &(lon, lat) in ring {
        let mut adjusted = lon + offset;
        if let Some(p) = prev {
            if adjusted - p > 180.0 {
                offset -= 360.0;
                adjusted -= 360.0;
            } else if p - adjusted > 180.0 {
                offset += 360.0;
                adjusted += 360.0;
            }
        }
        out.push((adjusted, lat));
        prev = Some(adjusted);
    }
    out
}

/// Sutherland-Hodgman clip of an open ring against the vertical half-plane
/// `lon <= bound` (or `lon >= bound` when `keep_le` is false).
fn clip_ring_lon(ring: &Ring, bound: f64, keep_le: bool) -> Ring {
    let inside = |p: &(f64, f64)| {
        if keep_le {
            p.0 <= bound
        } else {
            p.0 >= bound
        }
    };
    let cross = |a: &(f64, f64), b: &(f64, f64)| -> (f64, f64) {
        let t = (bound - a.0) / (b.0 - a.0);
        (bound, a.1 + t * (b.1 - a.1))
    };

    let mut out = Vec::new();
    let n = ring.len();
    for i in 0..n {
        let current = ring[i];
        let next = ring[(i + 1) % n];
        let cur_in = inside(&current);
        let next_in = inside(&next);

        if cur_in {
            out.push(current);
            if !next_in {
                out.push(cross(&current, &next));
            }
        } else if next_in {
            out.push(cross(&current, &next));
        }
    }
    out
}

fn shift_ring(ring: &Ring, delta: f64) -> Ring {
    ring.iter().map(|&(lon, lat)| (lon + delta, lat)).collect()
}

fn ring_is_degenerate(ring: &Ring) -> bool {
    if ring.len() < 3 {
        return true;
    }
    let (min, max) = ring
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.0), hi.max(p.0))
        });
    max - min < 1e-12
}

/// Cuts a polygon along the antimeridian.
///
/// Longitudes are normalized first. A polygon that never jumps the
/// +-180 line comes back as-is; otherwise its rings are unrolled into a
/// continuous longitude space and clipped into per-hemisphere windows,
/// each shifted back into [-180, 180].
pub fn split_antimeridian(poly: &Polygon) -> Vec<Polygon> {
    let mut poly = poly.clone();
    normalize_longitudes(&mut poly);

    if !poly.rings.iter().any(|r| ring_crosses_antimeridian(r)) {
        return vec![poly];
    }

    let unrolled: Vec<Ring> = poly.rings.iter().map(unroll_ring).collect();

    // After unrolling, longitudes lie in (-540, 540); clip the polygon to
    // each 360-degree window and shift the result back into range.
    let windows: [(f64, f64, f64); 3] = [
        (-540.0, -180.0, 360.0),
        (-180.0, 180.0, 0.0),
        (180.0, 540.0, -360.0),
    ];

    let mut parts = Vec::new();
    for (lo, hi, delta) in windows {
        let mut rings: Vec<Ring> = Vec::new();
        for ring in &unrolled {
            let clipped = clip_ring_lon(&clip_ring_lon(ring, hi, true), lo, false);
            if !ring_is_degenerate(&clipped) {
                rings.push(shift_ring(&clipped, delta));
            }
        }
        // The exterior must survive the clip for the part to exist.
        if !rings.is_empty() {
            parts.push(Polygon::new(rings));
        }
    }
    parts
}

/// Even-odd point-in-polygon test across every ring (holes subtract).
pub fn point_in_polygon(lon: f64, lat: f64, poly: &Polygon) -> bool {
    let mut inside = false;
    for ring in &poly.rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if ((yi > lat) != (yj > lat))
                && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi)
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

/// Bounding box of the polygon's exterior ring.
pub fn polygon_bbox(poly: &Polygon) -> Option<BBox> {
    let exterior = poly.exterior()?;
    if exterior.is_empty() {
        return None;
    }
    let mut bbox = BBox::new(
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    );
    for &(lon, lat) in exterior {
        bbox.min_lon = bbox.min_lon.min(lon);
        bbox.min_lat = bbox.min_lat.min(lat);
        bbox.max_lon = bbox.max_lon.max(lon);
        bbox.max_lat = bbox.max_lat.max(lat);
    }
    Some(bbox)
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Proper and degenerate segment intersection.
pub fn segments_intersect(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > 0.0) != (o2 > 0.0)) && ((o3 > 0.0) != (o4 > 0.0)) && o1 != 0.0 && o2 != 0.0 {
        return true;
    }

    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}

/// Returns true when the rectangle and the polygon share any area or
/// boundary: a polygon vertex inside the rect, a rect corner inside the
/// polygon, or any edge crossing.
pub fn rect_intersects_polygon(rect: &BBox, poly: &Polygon) -> bool {
    for ring in &poly.rings {
        for &(lon, lat) in ring {
            if rect.contains(lon, lat) {
                return true;
            }
        }
    }

    let corners = [
        (rect.min_lon, rect.min_lat),
        (rect.max_lon, rect.min_lat),
        (rect.max_lon, rect.max_lat),
        (rect.min_lon, rect.max_lat),
    ];
    for (lon, lat) in corners {
        if point_in_polygon(lon, lat, poly) {
            return true;
        }
    }

    let rect_edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    for ring in &poly.rings {
        let n = ring.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            for &(c, d) in &rect_edges {
                if segments_intersect(a, b, c, d) {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Polygon {
        Polygon::from_bbox(&BBox::new(min_lon, min_lat, max_lon, max_lat))
    }

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(180.0), 180.0);
        assert_eq!(normalize_lon(-180.0), -180.0);
        assert_eq!(normalize_lon(0.0), 0.0);
        assert_eq!(normalize_lon(540.0), 180.0);
    }

    #[test]
    fn test_point_in_polygon_simple() {
        let poly = square(-10.0, -10.0, 10.0, 10.0);
        assert!(point_in_polygon(0.0, 0.0, &poly));
        assert!(!point_in_polygon(20.0, 0.0, &poly));
        assert!(!point_in_polygon(0.0, -20.0, &poly));
    }

    #[test]
    fn test_point_in_polygon_with_hole() {
        let mut poly = square(-10.0, -10.0, 10.0, 10.0);
        poly.rings.push(vec![
            (-5.0, -5.0),
            (5.0, -5.0),
            (5.0, 5.0),
            (-5.0, 5.0),
        ]);

        assert!(!point_in_polygon(0.0, 0.0, &poly), "inside the hole");
        assert!(point_in_polygon(7.0, 0.0, &poly), "between hole and edge");
        assert!(!point_in_polygon(20.0, 0.0, &poly));
    }

    #[test]
    fn test_split_non_crossing_unchanged() {
        let poly = square(-10.0, 0.0, 10.0, 10.0);
        let parts = split_antimeridian(&poly);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], poly);
    }

    #[test]
    fn test_split_antimeridian_rectangle() {
        // 170E..190E expressed with wrapped longitudes: 170 .. -170
        let poly = Polygon::new(vec![vec![
            (170.0, 0.0),
            (-170.0, 0.0),
            (-170.0, 10.0),
            (170.0, 10.0),
        ]]);

        let parts = split_antimeridian(&poly);
        assert_eq!(parts.len(), 2);

        let bboxes: Vec<BBox> = parts.iter().map(|p| polygon_bbox(p).unwrap()).collect();
        let west = bboxes
            .iter()
            .find(|b| b.min_lon >= 169.9)
            .expect("eastern-hemisphere part");
        let east = bboxes
            .iter()
            .find(|b| b.max_lon <= -169.9)
            .expect("western-hemisphere part");

        assert!((west.max_lon - 180.0).abs() < 1e-9);
        assert!((east.min_lon - -180.0).abs() < 1e-9);
        assert!((west.min_lat - 0.0).abs() < 1e-9);
        assert!((east.max_lat - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_preserves_unwrapped_longitudes() {
        // Same rectangle given in unwrapped form (crosses at 190 == -170)
        let poly = Polygon::new(vec![vec![
            (170.0, 0.0),
            (190.0, 0.0),
            (190.0, 10.0),
            (170.0, 10.0),
        ]]);

        let parts = split_antimeridian(&poly);
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_segments_intersect() {
        assert!(segments_intersect(
            (0.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (10.0, 0.0)
        ));
        assert!(!segments_intersect(
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 2.0),
            (3.0, 1.0)
        ));
        // Collinear overlap
        assert!(segments_intersect(
            (0.0, 0.0),
            (5.0, 0.0),
            (3.0, 0.0),
            (8.0, 0.0)
        ));
    }

    #[test]
    fn test_rect_intersects_polygon_cases() {
        let poly = square(0.0, 0.0, 10.0, 10.0);

        // Overlapping
        assert!(rect_intersects_polygon(&BBox::new(5.0, 5.0, 15.0, 15.0), &poly));
        // Rect fully inside polygon
        assert!(rect_intersects_polygon(&BBox::new(4.0, 4.0, 6.0, 6.0), &poly));
        // Polygon fully inside rect
        assert!(rect_intersects_polygon(&BBox::new(-5.0, -5.0, 15.0, 15.0), &poly));
        // Disjoint
        assert!(!rect_intersects_polygon(&BBox::new(20.0, 20.0, 30.0, 30.0), &poly));
        // Edge crossing without any contained vertex
        let thin = square(4.0, -5.0, 6.0, 15.0);
        assert!(rect_intersects_polygon(&BBox::new(0.0, 0.0, 10.0, 10.0), &thin));
    }

    #[test]
    fn test_polygon_bbox() {
        let poly = Polygon::new(vec![vec![(1.0, 2.0), (3.0, -1.0), (-2.0, 4.0)]]);
        let bbox = polygon_bbox(&poly).unwrap();
        assert_eq!(bbox.min_lon, -2.0);
        assert_eq!(bbox.min_lat, -1.0);
        assert_eq!(bbox.max_lon, 3.0);
        assert_eq!(bbox.max_lat, 4.0);
    }
}
