//! Coordinate reference systems and projections.
//!
//! Provides transformations between geographic coordinates (lat/lon in
//! degrees) and projected Cartesian coordinates (meters), and an EPSG-coded
//! [`Crs`] that chains them so any two supported systems can be converted.
//!
//! # Supported Systems
//!
//! | EPSG | System |
//! |---|---|
//! | 4326, 4258 | Geographic WGS84 / ETRS89 (x = lon, y = lat) |
//! | 32601-32660, 32701-32760 | UTM on WGS84, north / south |
//! | 25828-25838 | UTM on ETRS89 (GRS80) |
//! | 3857 | Web Mercator |
//! | 3035 | ETRS89 Lambert Azimuthal Equal-Area (Europe) |
//!
//! Datum shifts between WGS84 and ETRS89 are sub-meter and ignored.
//!
//! # Example
//!
//! ```
//! use flood_risk::io::Crs;
//!
//! let utm = Crs::from_epsg(25832).unwrap();
//! let laea = Crs::from_epsg(3035).unwrap();
//!
//! // A point near Karlsruhe, from UTM 32N into the CORINE grid system
//! let (x, y) = utm.transform_point(&laea, 456_000.0, 5_430_000.0);
//! let (x2, y2) = laea.transform_point(&utm, x, y);
//! assert!((x2 - 456_000.0).abs() < 0.01 && (y2 - 5_430_000.0).abs() < 0.01);
//! ```

use std::f64::consts::PI;
use std::fmt;

use thiserror::Error;

/// Error type for coordinate reference system lookups.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// EPSG code not covered by the built-in projections
    #[error("Unsupported CRS: EPSG:{0}")]
    UnsupportedEpsg(u32),
}

/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius in meters
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    /// WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// GRS80 ellipsoid, used by ETRS89.
    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    /// First eccentricity squared.
    #[inline]
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }
}

/// Trait for coordinate projections.
pub trait CoordinateProjection {
    /// Convert geographic coordinates (lat, lon) to projected (x, y) in meters.
    fn geo_to_xy(&self, lat: f64, lon: f64) -> (f64, f64);

    /// Convert projected coordinates (x, y) to geographic (lat, lon).
    fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64);
}

/// UTM projection for a specific zone.
///
/// Universal Transverse Mercator, evaluated with the Snyder series
/// expansion. Accurate to millimetres inside the zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmProjection {
    /// Central meridian in degrees
    central_meridian: f64,
    /// Scale factor at central meridian (0.9996 for UTM)
    scale_factor: f64,
    /// False easting in meters (500,000 for UTM)
    false_easting: f64,
    /// False northing in meters (0 for northern hemisphere, 10,000,000 for southern)
    false_northing: f64,
    /// Zone number (1-60)
    zone: u8,
    /// Northern hemisphere flag
    northern: bool,
    /// Reference ellipsoid
    ellipsoid: Ellipsoid,
}

impl UtmProjection {
    /// Create a WGS84 UTM projection for a given zone and hemisphere.
    pub fn new(zone: u8, northern: bool) -> Self {
        Self::with_ellipsoid(zone, northern, Ellipsoid::WGS84)
    }

    /// Create a UTM projection on an arbitrary ellipsoid.
    pub fn with_ellipsoid(zone: u8, northern: bool, ellipsoid: Ellipsoid) -> Self {
        assert!((1..=60).contains(&zone), "UTM zone must be 1-60");
        let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;

        Self {
            central_meridian,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: if northern { 0.0 } else { 10_000_000.0 },
            zone,
            northern,
            ellipsoid,
        }
    }

    /// Get the zone number.
    pub fn zone(&self) -> u8 {
        self.zone
    }

    /// Whether this is a northern-hemisphere zone.
    pub fn is_northern(&self) -> bool {
        self.northern
    }
}

impl CoordinateProjection for UtmProjection {
    fn geo_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let lat_rad = lat * PI / 180.0;
        let lon_rad = lon * PI / 180.0;
        let lon0_rad = self.central_meridian * PI / 180.0;

        let e2 = self.ellipsoid.e2();
        let e_prime2 = e2 / (1.0 - e2);

        let n = a / (1.0 - e2 * lat_rad.sin().powi(2)).sqrt();
        let t = lat_rad.tan().powi(2);
        let c = e_prime2 * lat_rad.cos().powi(2);
        let a_coef = (lon_rad - lon0_rad) * lat_rad.cos();

        // Meridian arc length
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let m = a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat_rad
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat_rad).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat_rad).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat_rad).sin());

        let x = self.scale_factor
            * n
            * (a_coef
                + (1.0 - t + c) * a_coef.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * e_prime2) * a_coef.powi(5) / 120.0)
            + self.false_easting;

        let y = self.scale_factor
            * (m + n
                * lat_rad.tan()
                * (a_coef.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a_coef.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * e_prime2) * a_coef.powi(6)
                        / 720.0))
            + self.false_northing;

        (x, y)
    }

    fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let x = x - self.false_easting;
        let y = y - self.false_northing;

        let e2 = self.ellipsoid.e2();
        let e_prime2 = e2 / (1.0 - e2);
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let m = y / self.scale_factor;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let n1 = a / (1.0 - e2 * phi1.sin().powi(2)).sqrt();
        let t1 = phi1.tan().powi(2);
        let c1 = e_prime2 * phi1.cos().powi(2);
        let r1 = a * (1.0 - e2) / (1.0 - e2 * phi1.sin().powi(2)).powf(1.5);
        let d = x / (n1 * self.scale_factor);

        let lat = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * e_prime2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * e_prime2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lon = self.central_meridian * PI / 180.0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * e_prime2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / phi1.cos();

        (lat * 180.0 / PI, lon * 180.0 / PI)
    }
}

/// Spherical (pseudo) Mercator used by web map tiles, EPSG:3857.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WebMercator;

impl WebMercator {
    const R: f64 = 6_378_137.0;
    /// Latitude limit of the square world extent.
    const MAX_LAT: f64 = 85.051_128_779_806_59;
}

impl CoordinateProjection for WebMercator {
    fn geo_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let lat = lat.clamp(-Self::MAX_LAT, Self::MAX_LAT);
        let x = Self::R * lon.to_radians();
        let y = Self::R * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / Self::R).to_degrees();
        let lat = (2.0 * (y / Self::R).exp().atan() - PI / 2.0).to_degrees();
        (lat, lon)
    }
}

/// Ellipsoidal Lambert Azimuthal Equal-Area projection.
///
/// Defaults to the ETRS89-LAEA Europe parameters (EPSG:3035), the grid
/// system of the CORINE land cover rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertAzimuthalEqualArea {
    lat0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    ellipsoid: Ellipsoid,
    // Derived constants
    e: f64,
    qp: f64,
    beta0: f64,
    rq: f64,
    d: f64,
}

impl LambertAzimuthalEqualArea {
    /// Create a projection centred on (`lat0`, `lon0`) in degrees.
    pub fn new(
        lat0: f64,
        lon0: f64,
        false_easting: f64,
        false_northing: f64,
        ellipsoid: Ellipsoid,
    ) -> Self {
        let e = ellipsoid.e2().sqrt();
        let qp = Self::q(1.0, e);
        let phi0 = lat0.to_radians();
        let q0 = Self::q(phi0.sin(), e);
        let beta0 = (q0 / qp).clamp(-1.0, 1.0).asin();
        let rq = ellipsoid.a * (qp / 2.0).sqrt();
        let m0 = phi0.cos() / (1.0 - e * e * phi0.sin().powi(2)).sqrt();
        let d = ellipsoid.a * m0 / (rq * beta0.cos());

        Self {
            lat0,
            lon0,
            false_easting,
            false_northing,
            ellipsoid,
            e,
            qp,
            beta0,
            rq,
            d,
        }
    }

    /// ETRS89-LAEA Europe (EPSG:3035).
    pub fn etrs89_europe() -> Self {
        Self::new(52.0, 10.0, 4_321_000.0, 3_210_000.0, Ellipsoid::GRS80)
    }

    /// Authalic `q` function of sin(phi).
    fn q(sin_phi: f64, e: f64) -> f64 {
        let es = e * sin_phi;
        (1.0 - e * e)
            * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
    }
}

impl CoordinateProjection for LambertAzimuthalEqualArea {
    fn geo_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let dlon = (lon - self.lon0).to_radians();
        let q = Self::q(phi.sin(), self.e);
        let beta = (q / self.qp).clamp(-1.0, 1.0).asin();

        let denom = 1.0
            + self.beta0.sin() * beta.sin()
            + self.beta0.cos() * beta.cos() * dlon.cos();
        let b = self.rq * (2.0 / denom).sqrt();

        let x = self.false_easting + b * self.d * beta.cos() * dlon.sin();
        let y = self.false_northing
            + (b / self.d)
                * (self.beta0.cos() * beta.sin() - self.beta0.sin() * beta.cos() * dlon.cos());
        (x, y)
    }

    fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = y - self.false_northing;
        let rho = ((dx / self.d).powi(2) + (self.d * dy).powi(2)).sqrt();
        if rho == 0.0 {
            return (self.lat0, self.lon0);
        }

        let c = 2.0 * (rho / (2.0 * self.rq)).clamp(-1.0, 1.0).asin();
        let beta = (c.cos() * self.beta0.sin() + self.d * dy * c.sin() * self.beta0.cos() / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let dlon = (dx * c.sin()).atan2(
            self.d * rho * self.beta0.cos() * c.cos() - self.d * self.d * dy * self.beta0.sin() * c.sin(),
        );

        let e2 = self.e * self.e;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let phi = beta
            + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
            + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
            + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();

        (phi.to_degrees(), self.lon0 + dlon.to_degrees())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CrsKind {
    Geographic,
    Utm(UtmProjection),
    WebMercator(WebMercator),
    Laea(LambertAzimuthalEqualArea),
}

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crs {
    epsg: u32,
    kind: CrsKind,
}

impl Crs {
    /// Geographic WGS84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            epsg: 4326,
            kind: CrsKind::Geographic,
        }
    }

    /// Resolve an EPSG code into a supported CRS.
    pub fn from_epsg(epsg: u32) -> Result<Self, ProjectionError> {
        let kind = match epsg {
            4326 | 4258 => CrsKind::Geographic,
            32601..=32660 => CrsKind::Utm(UtmProjection::new((epsg - 32600) as u8, true)),
            32701..=32760 => CrsKind::Utm(UtmProjection::new((epsg - 32700) as u8, false)),
            25828..=25838 => CrsKind::Utm(UtmProjection::with_ellipsoid(
                (epsg - 25800) as u8,
                true,
                Ellipsoid::GRS80,
            )),
            3857 => CrsKind::WebMercator(WebMercator),
            3035 => CrsKind::Laea(LambertAzimuthalEqualArea::etrs89_europe()),
            _ => return Err(ProjectionError::UnsupportedEpsg(epsg)),
        };
        Ok(Self { epsg, kind })
    }

    /// The EPSG code.
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether coordinates are lon/lat degrees rather than projected meters.
    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic)
    }

    /// Convert CRS coordinates to geographic (lat, lon).
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.kind {
            CrsKind::Geographic => (y, x),
            CrsKind::Utm(p) => p.xy_to_geo(x, y),
            CrsKind::WebMercator(p) => p.xy_to_geo(x, y),
            CrsKind::Laea(p) => p.xy_to_geo(x, y),
        }
    }

    /// Convert geographic (lat, lon) to CRS coordinates.
    pub fn from_geographic(&self, lat: f64, lon: f64) -> (f64, f64) {
        match &self.kind {
            CrsKind::Geographic => (lon, lat),
            CrsKind::Utm(p) => p.geo_to_xy(lat, lon),
            CrsKind::WebMercator(p) => p.geo_to_xy(lat, lon),
            CrsKind::Laea(p) => p.geo_to_xy(lat, lon),
        }
    }

    /// Transform a point from this CRS into `target`.
    ///
    /// Identical systems return the point unchanged.
    pub fn transform_point(&self, target: &Crs, x: f64, y: f64) -> (f64, f64) {
        if self.same_as(target) {
            return (x, y);
        }
        let (lat, lon) = self.to_geographic(x, y);
        target.from_geographic(lat, lon)
    }

    /// Whether two systems produce identical coordinates.
    ///
    /// WGS84 and ETRS89 variants of the same projection count as the same.
    pub fn same_as(&self, other: &Crs) -> bool {
        if self.epsg == other.epsg {
            return true;
        }
        match (&self.kind, &other.kind) {
            (CrsKind::Geographic, CrsKind::Geographic) => true,
            (CrsKind::Utm(a), CrsKind::Utm(b)) => {
                a.zone() == b.zone() && a.is_northern() == b.is_northern()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    #[test]
    fn test_utm_zone_32n() {
        let proj = UtmProjection::new(32, true);

        // Test known point: Bergen (60.39°N, 5.32°E)
        // Expected UTM32N: approximately 297000 E, 6700000 N
        let (x, y) = proj.geo_to_xy(60.39, 5.32);
        assert!(
            (x - 297_000.0).abs() < 1000.0,
            "UTM easting for Bergen: {}",
            x
        );
        assert!(
            (y - 6_700_000.0).abs() < 10_000.0,
            "UTM northing for Bergen: {}",
            y
        );

        // Test roundtrip
        let (lat, lon) = proj.xy_to_geo(x, y);
        assert!((lat - 60.39).abs() < 0.001, "UTM lat roundtrip: {}", lat);
        assert!((lon - 5.32).abs() < 0.001, "UTM lon roundtrip: {}", lon);
    }

    #[test]
    fn test_utm_central_meridian_on_equator() {
        let proj = UtmProjection::new(32, true);
        let (x, y) = proj.geo_to_xy(0.0, 9.0);
        assert!((x - 500_000.0).abs() < TOL, "easting {}", x);
        assert!(y.abs() < TOL, "northing {}", y);

        let south = UtmProjection::new(32, false);
        let (_, ys) = south.geo_to_xy(0.0, 9.0);
        assert!((ys - 10_000_000.0).abs() < TOL, "southern northing {}", ys);
    }

    #[test]
    fn test_laea_epsg_reference_point() {
        // Worked example from the EPSG guidance note for method 9820
        let proj = LambertAzimuthalEqualArea::etrs89_europe();
        let (x, y) = proj.geo_to_xy(50.0, 5.0);
        assert!((x - 3_962_799.45).abs() < 0.05, "LAEA easting: {}", x);
        assert!((y - 2_999_718.85).abs() < 0.05, "LAEA northing: {}", y);

        let (lat, lon) = proj.xy_to_geo(x, y);
        assert!((lat - 50.0).abs() < 1e-7, "LAEA lat roundtrip: {}", lat);
        assert!((lon - 5.0).abs() < 1e-7, "LAEA lon roundtrip: {}", lon);
    }

    #[test]
    fn test_laea_origin() {
        let proj = LambertAzimuthalEqualArea::etrs89_europe();
        let (x, y) = proj.geo_to_xy(52.0, 10.0);
        assert!((x - 4_321_000.0).abs() < TOL);
        assert!((y - 3_210_000.0).abs() < TOL);
        assert_eq!(proj.xy_to_geo(4_321_000.0, 3_210_000.0), (52.0, 10.0));
    }

    #[test]
    fn test_web_mercator() {
        let proj = WebMercator;
        let (x, y) = proj.geo_to_xy(0.0, 180.0);
        assert!((x - 20_037_508.342_789_244).abs() < 1e-3, "x: {}", x);
        assert!(y.abs() < TOL);

        let (lat, lon) = proj.xy_to_geo(proj.geo_to_xy(48.5, 8.4).0, proj.geo_to_xy(48.5, 8.4).1);
        assert!((lat - 48.5).abs() < 1e-9);
        assert!((lon - 8.4).abs() < 1e-9);
    }

    #[test]
    fn test_crs_from_epsg() {
        assert!(Crs::from_epsg(4326).unwrap().is_geographic());
        assert_eq!(Crs::from_epsg(25832).unwrap().epsg(), 25832);
        assert_eq!(
            Crs::from_epsg(31467),
            Err(ProjectionError::UnsupportedEpsg(31467))
        );
        assert_eq!(Crs::from_epsg(3035).unwrap().to_string(), "EPSG:3035");
    }

    #[test]
    fn test_crs_geographic_axis_order() {
        let crs = Crs::wgs84();
        assert_eq!(crs.from_geographic(49.0, 8.4), (8.4, 49.0));
        assert_eq!(crs.to_geographic(8.4, 49.0), (49.0, 8.4));
    }

    #[test]
    fn test_crs_same_as() {
        let wgs_utm = Crs::from_epsg(32632).unwrap();
        let etrs_utm = Crs::from_epsg(25832).unwrap();
        assert!(wgs_utm.same_as(&etrs_utm));
        assert!(!wgs_utm.same_as(&Crs::from_epsg(32633).unwrap()));
        assert!(Crs::wgs84().same_as(&Crs::from_epsg(4258).unwrap()));
    }

    #[test]
    fn test_transform_point_roundtrip() {
        let utm = Crs::from_epsg(25832).unwrap();
        let wgs = Crs::wgs84();
        let (lon, lat) = utm.transform_point(&wgs, 456_000.0, 5_430_000.0);
        assert!(lon > 8.0 && lon < 9.0, "lon {}", lon);
        assert!(lat > 48.0 && lat < 50.0, "lat {}", lat);
        let (x, y) = wgs.transform_point(&utm, lon, lat);
        assert!((x - 456_000.0).abs() < 0.01);
        assert!((y - 5_430_000.0).abs() < 0.01);
    }
}
