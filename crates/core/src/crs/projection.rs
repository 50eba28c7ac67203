//! Pure-Rust point transformations between WGS84, UTM and Web Mercator.
//!
//! UTM formulas follow Snyder 1987 (USGS Prof. Paper 1395, pp. 61-64).
//! Every transformation passes through WGS84 longitude/latitude.

use super::{CrsKind, CRS};
use crate::error::Result;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Web Mercator latitude limit
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

// ── Public API ───────────────────────────────────────────────────────────

/// Transform a single point from `src` to `dst`.
pub fn transform_point(src: &CRS, dst: &CRS, x: f64, y: f64) -> Result<(f64, f64)> {
    let src_kind = src.kind()?;
    let dst_kind = dst.kind()?;

    if src_kind == dst_kind {
        return Ok((x, y));
    }

    let (lon, lat) = to_wgs84(src_kind, x, y);
    Ok(from_wgs84(dst_kind, lon, lat))
}

/// Transform a (min_x, min_y, max_x, max_y) box and return the envelope of
/// its four transformed corners.
pub fn transform_bounds(
    src: &CRS,
    dst: &CRS,
    bounds: (f64, f64, f64, f64),
) -> Result<(f64, f64, f64, f64)> {
    let (min_x, min_y, max_x, max_y) = bounds;
    let corners = [
        (min_x, min_y),
        (min_x, max_y),
        (max_x, min_y),
        (max_x, max_y),
    ];

    let mut out = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for &(x, y) in &corners {
        let (tx, ty) = transform_point(src, dst, x, y)?;
        out.0 = out.0.min(tx);
        out.1 = out.1.min(ty);
        out.2 = out.2.max(tx);
        out.3 = out.3.max(ty);
    }

    Ok(out)
}

fn to_wgs84(kind: CrsKind, x: f64, y: f64) -> (f64, f64) {
    match kind {
        CrsKind::Geographic => (x, y),
        CrsKind::WebMercator => mercator_to_wgs84(x, y),
        CrsKind::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
    }
}

fn from_wgs84(kind: CrsKind, lon: f64, lat: f64) -> (f64, f64) {
    match kind {
        CrsKind::Geographic => (lon, lat),
        CrsKind::WebMercator => wgs84_to_mercator(lon, lat),
        CrsKind::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
    }
}

// ── Web Mercator (spherical, EPSG:3857) ─────────────────────────────────

fn wgs84_to_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let lat = lat_deg.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = A * lon_deg.to_radians();
    let y = A * (FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

// ── UTM ─────────────────────────────────────────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Inverse of [`wgs84_to_utm`] (Snyder eqs. 8-18 to 8-25).
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1me2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    // pyproj: Transformer.from_crs(4326, 32630, always_xy=True).transform(-3.7037, 40.4168)
    #[test]
    fn madrid_wgs84_to_utm30n() {
        let (e, n) = wgs84_to_utm(-3.7037, 40.4168, 30, true);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    #[test]
    fn utm_inverse_roundtrip_north() {
        let (e, n) = wgs84_to_utm(-87.45, 30.72, 16, true);
        let (lon, lat) = utm_to_wgs84(e, n, 16, true);
        assert_close(lon, -87.45, 1e-7, "lon");
        assert_close(lat, 30.72, 1e-7, "lat");
    }

    #[test]
    fn utm_inverse_roundtrip_south() {
        let (e, n) = wgs84_to_utm(-58.3816, -34.6037, 21, false);
        let (lon, lat) = utm_to_wgs84(e, n, 21, false);
        assert_close(lon, -58.3816, 1e-7, "lon");
        assert_close(lat, -34.6037, 1e-7, "lat");
    }

    #[test]
    fn mercator_known_point() {
        // EPSG:3857 of (-87.45, 30.72)
        let (x, y) = wgs84_to_mercator(-87.45, 30.72);
        assert_close(x, -9_734_889.47, 0.1, "x");
        let (lon, lat) = mercator_to_wgs84(x, y);
        assert_close(lon, -87.45, 1e-9, "lon");
        assert_close(lat, 30.72, 1e-9, "lat");
    }

    #[test]
    fn transform_point_identity() {
        let crs = CRS::utm(16, true);
        let (x, y) = transform_point(&crs, &crs, 12.5, 99.0).unwrap();
        assert_eq!((x, y), (12.5, 99.0));
    }

    #[test]
    fn transform_point_unsupported() {
        assert!(transform_point(&CRS::from_epsg(2154), &CRS::wgs84(), 0.0, 0.0).is_err());
    }

    #[test]
    fn transform_bounds_envelope() {
        let b = transform_bounds(
            &CRS::wgs84(),
            &CRS::utm(16, true),
            (-87.48, 30.70, -87.43, 30.74),
        )
        .unwrap();
        assert!(b.2 > b.0 && b.3 > b.1);
        let width = b.2 - b.0;
        // 0.05 deg of longitude at 30.7N is roughly 4.8 km
        assert!(width > 4_000.0 && width < 5_500.0, "width {width}");
    }
}
