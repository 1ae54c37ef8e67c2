//! Pixel to geographic coordinate conversion for georeferenced rasters.

use std::f64::consts::FRAC_PI_4;
use std::path::{Path, PathBuf};

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::io::object_from_json;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Projected map coordinates to longitude/latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapProjection {
    /// Map coordinates already are longitude/latitude.
    Geographic,
    /// Spherical web Mercator on the WGS84 semi-major axis, in meters.
    SphericalMercator,
    Utm { zone: u8, north: bool },
}

struct Ellipsoid {
    e2: f64,
    ep2: f64,
}

impl Ellipsoid {
    fn wgs84() -> Ellipsoid {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Ellipsoid {
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Meridian arc length from the equator to latitude `phi`.
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

fn utm_central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

fn utm_forward(lonlat: na::Vector2<f64>, zone: u8, north: bool) -> na::Vector2<f64> {
    let ell = Ellipsoid::wgs84();
    let phi = lonlat.y.to_radians();
    let dlam = (lonlat.x - utm_central_meridian(zone)).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let n = WGS84_A / (1.0 - ell.e2 * sin_phi * sin_phi).sqrt();
    let t = phi.tan().powi(2);
    let c = ell.ep2 * cos_phi * cos_phi;
    let a = cos_phi * dlam;
    let m = ell.meridian_arc(phi);

    let easting = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ell.ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;
    let northing = UTM_K0
        * (m + n
            * phi.tan()
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ell.ep2) * a.powi(6) / 720.0));
    let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
    na::Vector2::new(easting, northing + false_northing)
}

fn utm_inverse(point: na::Vector2<f64>, zone: u8, north: bool) -> na::Vector2<f64> {
    let ell = Ellipsoid::wgs84();
    let e2 = ell.e2;
    let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
    let m = (point.y - false_northing) / UTM_K0;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    // Footpoint latitude.
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let c1 = ell.ep2 * cos1 * cos1;
    let t1 = phi1.tan().powi(2);
    let w = 1.0 - e2 * sin1 * sin1;
    let n1 = WGS84_A / w.sqrt();
    let r1 = WGS84_A * (1.0 - e2) / w.powf(1.5);
    let d = (point.x - UTM_FALSE_EASTING) / (n1 * UTM_K0);

    let phi = phi1
        - (n1 * phi1.tan() / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ell.ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ell.ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let dlam = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ell.ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos1;

    na::Vector2::new(utm_central_meridian(zone) + dlam.to_degrees(), phi.to_degrees())
}

impl MapProjection {
    pub fn to_lonlat(&self, point: na::Vector2<f64>) -> na::Vector2<f64> {
        match *self {
            MapProjection::Geographic => point,
            MapProjection::SphericalMercator => na::Vector2::new(
                (point.x / WGS84_A).to_degrees(),
                (2.0 * (point.y / WGS84_A).exp().atan() - 2.0 * FRAC_PI_4).to_degrees(),
            ),
            MapProjection::Utm { zone, north } => utm_inverse(point, zone, north),
        }
    }

    pub fn from_lonlat(&self, lonlat: na::Vector2<f64>) -> na::Vector2<f64> {
        match *self {
            MapProjection::Geographic => lonlat,
            MapProjection::SphericalMercator => na::Vector2::new(
                WGS84_A * lonlat.x.to_radians(),
                WGS84_A * (FRAC_PI_4 + lonlat.y.to_radians() / 2.0).tan().ln(),
            ),
            MapProjection::Utm { zone, north } => utm_forward(lonlat, zone, north),
        }
    }
}

/// Georeference of one raster.
///
/// `pixel_to_map = [a, b, c, d, e, f]` maps pixel `(col, row)` to
/// `(a*col + b*row + c, d*col + e*row + f)`, with integer coordinates at
/// pixel centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    pixel_to_map: [f64; 6],
    projection: MapProjection,
}

impl GeoReference {
    pub fn new(pixel_to_map: [f64; 6], projection: MapProjection) -> GeoReference {
        GeoReference {
            pixel_to_map,
            projection,
        }
    }

    /// North-up raster with square pixels of `pixel_size` map units.
    pub fn north_up(
        origin: na::Vector2<f64>,
        pixel_size: f64,
        projection: MapProjection,
    ) -> GeoReference {
        GeoReference::new(
            [pixel_size, 0.0, origin.x, 0.0, -pixel_size, origin.y],
            projection,
        )
    }

    pub fn projection(&self) -> MapProjection {
        self.projection
    }

    pub fn pixel_to_point(&self, pixel: na::Vector2<f64>) -> na::Vector2<f64> {
        let [a, b, c, d, e, f] = self.pixel_to_map;
        na::Vector2::new(
            a * pixel.x + b * pixel.y + c,
            d * pixel.x + e * pixel.y + f,
        )
    }

    /// Inverse of [`Self::pixel_to_point`]; `None` for a singular transform.
    pub fn point_to_pixel(&self, point: na::Vector2<f64>) -> Option<na::Vector2<f64>> {
        let [a, b, c, d, e, f] = self.pixel_to_map;
        let inv = na::Matrix2::new(a, b, d, e).try_inverse()?;
        Some(inv * (point - na::Vector2::new(c, f)))
    }

    pub fn point_to_lonlat(&self, point: na::Vector2<f64>) -> na::Vector2<f64> {
        self.projection.to_lonlat(point)
    }

    pub fn lonlat_to_point(&self, lonlat: na::Vector2<f64>) -> na::Vector2<f64> {
        self.projection.from_lonlat(lonlat)
    }

    /// Pixel to map, then map to longitude/latitude.
    pub fn pixel_to_lonlat(&self, pixel: na::Vector2<f64>) -> na::Vector2<f64> {
        self.point_to_lonlat(self.pixel_to_point(pixel))
    }

    /// Parses a six line world file (`A D B E C F`).
    pub fn from_world_file(path: &Path, projection: MapProjection) -> Result<GeoReference, AlignError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| AlignError::unreadable(path, e))?;
        let values = contents
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AlignError::unreadable(path, e))?;
        let &[a, d, b, e, c, f] = values.as_slice() else {
            return Err(AlignError::unreadable(
                path,
                format!("expected 6 world file values, found {}", values.len()),
            ));
        };
        Ok(GeoReference::new([a, b, c, d, e, f], projection))
    }

    /// Reads the georeference stored next to `image`.
    ///
    /// `<image>.georef.json` wins; otherwise a world file in geographic
    /// coordinates is looked up.
    pub fn read_for_image(image: &Path) -> Result<GeoReference, AlignError> {
        let sidecar = append_extension(image, "georef.json");
        if sidecar.is_file() {
            log::debug!("georeference from {}", sidecar.display());
            return object_from_json(&sidecar);
        }
        for candidate in world_file_candidates(image) {
            if candidate.is_file() {
                log::debug!("georeference from world file {}", candidate.display());
                return GeoReference::from_world_file(&candidate, MapProjection::Geographic);
            }
        }
        Err(AlignError::unreadable(image, "no georeference sidecar found"))
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn world_file_candidates(image: &Path) -> Vec<PathBuf> {
    let ext = image
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let mut exts: Vec<String> = match ext.as_str() {
        "tif" | "tiff" => vec!["tfw".into()],
        "png" => vec!["pgw".into()],
        "jpg" | "jpeg" => vec!["jgw".into()],
        _ => Vec::new(),
    };
    let mut chars = ext.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.last()) {
        exts.push(format!("{first}{last}w"));
    }
    exts.push("wld".into());
    exts.into_iter().map(|e| image.with_extension(e)).collect()
}
