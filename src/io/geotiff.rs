//! GeoTIFF raster codec.
//!
//! Reads and writes single-band GeoTIFF files using the pure Rust `tiff`
//! crate - no GDAL or other system libraries required.
//!
//! Georeferencing is taken from, in order of preference:
//! - ModelTransformation (tag 34264), for rotated grids
//! - ModelPixelScale (tag 33550) plus ModelTiepoint (tag 33922)
//!
//! The CRS comes from the GeoKeyDirectory (tag 34735), and the no-data value
//! from the GDAL_NODATA ASCII tag (42113) that QGIS and GDAL recognise.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use flood_risk::io::{read_geotiff, write_geotiff};
//!
//! let band = read_geotiff(Path::new("data/depth.tif"))?;
//! println!("{} {:?}", band.crs, band.data.dim());
//!
//! write_geotiff(Path::new("out.tif"), &band.data, &band.transform, &band.crs, Some(-9999.0))?;
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use super::projection::{Crs, ProjectionError};
use crate::types::GeoTransform;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Error type for GeoTIFF operations.
#[derive(Debug, Error)]
pub enum GeoTiffError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error
    #[error("TIFF error: {0}")]
    Tiff(String),

    /// Missing or invalid geotransform tags
    #[error("Missing geotransform: {0}")]
    MissingGeotransform(String),

    /// Missing or unusable GeoKey CRS definition
    #[error("Missing CRS: {0}")]
    MissingCrs(String),

    /// CRS is declared but not supported
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Unsupported data type or layout
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),
}

impl From<tiff::TiffError> for GeoTiffError {
    fn from(e: tiff::TiffError) -> Self {
        GeoTiffError::Tiff(e.to_string())
    }
}

/// Whether the stored samples were integers or floating point.
///
/// Resampling into an integer band rounds to the nearest integer, so the
/// source kind travels with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Signed or unsigned integer samples
    Integer,
    /// IEEE floating point samples
    Float,
}

/// First band of a GeoTIFF with its georeferencing.
#[derive(Debug, Clone)]
pub struct GeoTiffBand {
    /// Cell values, shape (height, width)
    pub data: Array2<f64>,
    /// Corner-based affine transform
    pub transform: GeoTransform,
    /// Coordinate reference system
    pub crs: Crs,
    /// GDAL_NODATA value, if declared
    pub no_data: Option<f64>,
    /// Sample type of the stored band
    pub sample_kind: SampleKind,
}

/// Read band 1 of a GeoTIFF file.
///
/// The file handle is closed before returning.
pub fn read_geotiff(path: &Path) -> Result<GeoTiffBand, GeoTiffError> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;

    let pixel_scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok();
    let model_transformation = decoder
        .get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION))
        .ok();
    let geo_keys = decoder.get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY)).ok();
    let no_data = decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .ok()
        .and_then(|s| parse_no_data(&s));

    let keys = match geo_keys {
        Some(directory) => GeoKeys::parse(&directory)?,
        None => {
            return Err(GeoTiffError::MissingCrs(
                "no GeoKeyDirectory tag".to_string(),
            ))
        }
    };
    let crs = keys.crs()?;

    let mut transform = match (model_transformation, pixel_scale, tiepoint) {
        (Some(m), _, _) if m.len() >= 16 => GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]),
        (_, Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            // ModelTiepoint format: [I, J, K, X, Y, Z]
            // ModelPixelScale format: [ScaleX, ScaleY, ScaleZ]
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            GeoTransform::new(scale[0], 0.0, x - i * scale[0], 0.0, -scale[1], y + j * scale[1])
        }
        _ => {
            return Err(GeoTiffError::MissingGeotransform(
                "neither ModelTransformation nor ModelPixelScale/ModelTiepoint present".to_string(),
            ))
        }
    };

    if keys.raster_type == Some(RASTER_PIXEL_IS_POINT) {
        // Shift so the transform addresses cell corners
        transform.c -= 0.5 * transform.a + 0.5 * transform.b;
        transform.f -= 0.5 * transform.d + 0.5 * transform.e;
    }

    let result = decoder.read_image()?;
    let sample_kind = match result {
        DecodingResult::F32(_) | DecodingResult::F64(_) => SampleKind::Float,
        _ => SampleKind::Integer,
    };

    let samples: Vec<f64> = match result {
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F64(data) => data,
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
    };

    // Interleaved samples: band 1 is the first sample of each pixel
    let cells = width as usize * height as usize;
    if cells == 0 || samples.len() % cells != 0 {
        return Err(GeoTiffError::UnsupportedDataType(format!(
            "{} samples do not fill a {}x{} grid",
            samples.len(),
            width,
            height
        )));
    }
    let samples_per_pixel = samples.len() / cells;
    let band: Vec<f64> = if samples_per_pixel == 1 {
        samples
    } else {
        samples.into_iter().step_by(samples_per_pixel).collect()
    };

    let data = Array2::from_shape_vec((height as usize, width as usize), band).map_err(|e| {
        GeoTiffError::UnsupportedDataType(format!("band does not fill {}x{} grid: {}", width, height, e))
    })?;

    Ok(GeoTiffBand {
        data,
        transform,
        crs,
        no_data,
        sample_kind,
    })
}

/// Write a grid as a single-band Float64 GeoTIFF.
///
/// North-up transforms are stored as ModelPixelScale/ModelTiepoint, rotated
/// ones as ModelTransformation. `no_data`, if given, goes into GDAL_NODATA.
pub fn write_geotiff(
    path: &Path,
    data: &Array2<f64>,
    transform: &GeoTransform,
    crs: &Crs,
    no_data: Option<f64>,
) -> Result<(), GeoTiffError> {
    let (height, width) = data.dim();
    let width = u32::try_from(width)
        .map_err(|_| GeoTiffError::UnsupportedDataType(format!("width {} too large", width)))?;
    let height = u32::try_from(height)
        .map_err(|_| GeoTiffError::UnsupportedDataType(format!("height {} too large", height)))?;
    let epsg = u16::try_from(crs.epsg())
        .map_err(|_| GeoTiffError::MissingCrs(format!("{} does not fit a GeoKey", crs)))?;

    let contiguous = data.as_standard_layout();
    let samples = contiguous.as_slice().ok_or_else(|| {
        GeoTiffError::UnsupportedDataType("grid is not contiguous".to_string())
    })?;

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<colortype::Gray64Float>(width, height)?;

    {
        let directory = image.encoder();
        if transform.is_rectilinear() && transform.a > 0.0 && transform.e < 0.0 {
            let scale = [transform.a, -transform.e, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, transform.c, transform.f, 0.0];
            directory.write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])?;
            directory.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])?;
        } else {
            let matrix = [
                transform.a, transform.b, 0.0, transform.c,
                transform.d, transform.e, 0.0, transform.f,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ];
            directory.write_tag(geo_tag(MODEL_TRANSFORMATION), &matrix[..])?;
        }

        let keys = GeoKeys::for_crs(crs, epsg).to_directory();
        directory.write_tag(geo_tag(GEO_KEY_DIRECTORY), &keys[..])?;

        if let Some(value) = no_data {
            let text = format_no_data(value);
            directory.write_tag(geo_tag(GDAL_NODATA), text.as_str())?;
        }
    }

    image.write_data(samples)?;
    Ok(())
}

/// Resolve a tag number the same way the decoder keys its directory, so
/// GeoTIFF tags match whether or not `tiff` names them.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn parse_no_data(text: &str) -> Option<f64> {
    let trimmed = text.trim_matches(char::from(0)).trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        "" => None,
        _ => trimmed.parse().ok(),
    }
}

fn format_no_data(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        // shortest representation that round-trips
        format!("{}", value)
    }
}

/// The subset of GeoKeys needed to identify a CRS.
#[derive(Debug, Default, Clone, PartialEq)]
struct GeoKeys {
    model_type: Option<u16>,
    raster_type: Option<u16>,
    geographic_type: Option<u16>,
    projected_type: Option<u16>,
}

impl GeoKeys {
    /// Parse a GeoKeyDirectory (header + 4-short entries).
    fn parse(directory: &[u16]) -> Result<Self, GeoTiffError> {
        if directory.len() < 4 {
            return Err(GeoTiffError::MissingCrs(
                "truncated GeoKeyDirectory".to_string(),
            ));
        }
        let count = directory[3] as usize;
        let mut keys = GeoKeys::default();

        for entry in directory[4..].chunks_exact(4).take(count) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            // Only inline SHORT values carry the keys we need
            if location != 0 {
                continue;
            }
            match key {
                GT_MODEL_TYPE_KEY => keys.model_type = Some(value),
                GT_RASTER_TYPE_KEY => keys.raster_type = Some(value),
                GEOGRAPHIC_TYPE_KEY => keys.geographic_type = Some(value),
                PROJECTED_CS_TYPE_KEY => keys.projected_type = Some(value),
                _ => {}
            }
        }
        Ok(keys)
    }

    fn crs(&self) -> Result<Crs, GeoTiffError> {
        let code = match (self.model_type, self.projected_type, self.geographic_type) {
            (Some(MODEL_TYPE_GEOGRAPHIC), _, Some(g)) => g,
            (_, Some(p), _) => p,
            (_, None, Some(g)) => g,
            _ => {
                return Err(GeoTiffError::MissingCrs(
                    "GeoKeyDirectory has no EPSG code".to_string(),
                ))
            }
        };
        if code == USER_DEFINED {
            return Err(GeoTiffError::MissingCrs(
                "user-defined CRS is not supported".to_string(),
            ));
        }
        Ok(Crs::from_epsg(code as u32)?)
    }

    fn for_crs(crs: &Crs, epsg: u16) -> Self {
        if crs.is_geographic() {
            GeoKeys {
                model_type: Some(MODEL_TYPE_GEOGRAPHIC),
                raster_type: Some(RASTER_PIXEL_IS_AREA),
                geographic_type: Some(epsg),
                projected_type: None,
            }
        } else {
            GeoKeys {
                model_type: Some(MODEL_TYPE_PROJECTED),
                raster_type: Some(RASTER_PIXEL_IS_AREA),
                geographic_type: None,
                projected_type: Some(epsg),
            }
        }
    }

    /// Serialise into a GeoKeyDirectory, entries sorted by key id.
    fn to_directory(&self) -> Vec<u16> {
        let entries: Vec<(u16, u16)> = [
            (GT_MODEL_TYPE_KEY, self.model_type),
            (GT_RASTER_TYPE_KEY, self.raster_type),
            (GEOGRAPHIC_TYPE_KEY, self.geographic_type),
            (PROJECTED_CS_TYPE_KEY, self.projected_type),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect();

        let mut directory = vec![1, 1, 0, entries.len() as u16];
        for (key, value) in entries {
            directory.extend_from_slice(&[key, 0, 1, value]);
        }
        directory
    }
}
