//! Native GeoTIFF reading/writing on top of the `tiff` crate.
//!
//! Georeferencing is carried by the three baseline GeoTIFF tags:
//! ModelPixelScale, ModelTiepoint and a GeoKeyDirectory holding the EPSG
//! code. That is all a Landsat band or a composite needs.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray16, Gray8, RGB8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::ColorType;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Compression for written GeoTIFFs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Uncompressed,
    Lzw,
    Deflate,
}

impl Compression {
    fn to_tiff(self) -> tiff::encoder::Compression {
        match self {
            Compression::Uncompressed => tiff::encoder::Compression::Uncompressed,
            Compression::Lzw => tiff::encoder::Compression::Lzw,
            Compression::Deflate => {
                tiff::encoder::Compression::Deflate(tiff::encoder::DeflateLevel::Balanced)
            }
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Compression::Uncompressed),
            "lzw" => Ok(Compression::Lzw),
            "deflate" | "zip" => Ok(Compression::Deflate),
            other => Err(Error::InvalidParameter {
                name: "compression",
                value: other.to_string(),
                reason: "expected none, lzw or deflate".into(),
            }),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::Uncompressed => "none",
            Compression::Lzw => "lzw",
            Compression::Deflate => "deflate",
        };
        f.write_str(name)
    }
}

/// Read the first band of a GeoTIFF into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    read_geotiff_bands(path)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Tiff("image has no samples".into()))
}

/// Read every sample plane of a GeoTIFF (1 for grey, 3 for RGB) as rasters
/// sharing the file's georeferencing.
pub fn read_geotiff_bands<T, P>(path: P) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    R: Read + Seek,
{
    // A full-size panchromatic band is well past the default buffer limit
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let samples = match decoder.colortype()? {
        ColorType::Gray(_) => 1,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "TIFF color type {:?}",
                other
            )))
        }
    };

    let values: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => convert(buf),
        DecodingResult::U16(buf) => convert(buf),
        DecodingResult::U32(buf) => convert(buf),
        DecodingResult::I16(buf) => convert(buf),
        DecodingResult::I32(buf) => convert(buf),
        DecodingResult::F32(buf) => convert(buf),
        DecodingResult::F64(buf) => convert(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if values.len() != rows * cols * samples {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let transform = read_geotransform(&mut decoder).unwrap_or_default();
    let crs = read_crs(&mut decoder);

    let planes = if samples == 1 {
        vec![values]
    } else {
        (0..samples)
            .map(|sample| values.iter().skip(sample).step_by(samples).copied().collect())
            .collect()
    };

    planes
        .into_iter()
        .map(|plane| {
            let mut raster = Raster::from_vec(plane, rows, cols)?;
            raster.set_transform(transform);
            raster.set_crs(crs.clone());
            Ok(raster)
        })
        .collect()
}

/// Samples of the decoded type into the raster element type
fn convert<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: Into<f64>,
    T: RasterElement,
{
    buf.into_iter().map(|v| T::from_f64(v.into())).collect()
}

/// GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))?;

    match (scale.get(..2), tiepoint.get(..6)) {
        (Some(&[sx, sy]), Some(&[i, j, k, x, y, z])) => Ok(GeoTransform::from_tiepoint(
            &[i, j, k, x, y, z],
            &[sx, sy, 0.0],
        )),
        _ => Err(Error::Tiff("Cannot determine geotransform".into())),
    }
}

/// EPSG code from the GeoKeyDirectory, projected key first
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::Unknown(GEO_KEY_DIRECTORY))
        .ok()?;
    parse_geokeys(&keys)
}

fn parse_geokeys(keys: &[u16]) -> Option<CRS> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut projected = None;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // location 0 means the value is stored inline
        if location != 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(value),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(value),
            _ => {}
        }
    }

    projected
        .or(geographic)
        .map(|code| CRS::from_epsg(code as u32))
}

fn build_geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let mut keys = vec![1, 1, 0, 0];
    let mut push = |key: u16, value: u16| {
        keys.extend_from_slice(&[key, 0, 1, value]);
    };

    match crs {
        Some(crs) if crs.is_geographic() => {
            push(GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_GEOGRAPHIC);
            push(GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA);
            push(GEOGRAPHIC_TYPE_GEO_KEY, crs.epsg() as u16);
        }
        Some(crs) => {
            push(GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_PROJECTED);
            push(GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA);
            push(PROJECTED_CS_TYPE_GEO_KEY, crs.epsg() as u16);
        }
        None => {
            push(GT_MODEL_TYPE_GEO_KEY, MODEL_TYPE_PROJECTED);
            push(GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA);
        }
    }

    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()> {
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &transform.pixel_scale()[..])?;
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), &transform.tiepoint()[..])?;

    let geokeys = build_geokeys(crs);
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())?;

    // Zero is fill in every product this crate writes
    dir.write_tag(Tag::Unknown(GDAL_NODATA), "0")?;

    Ok(())
}

/// Encode into a temporary file next to `path` and move it into place once
/// encoding finished. A failed write leaves nothing at `path`.
fn write_atomic<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".landsat-")
        .suffix(".tmp")
        .tempfile_in(parent)?;

    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        encode(&mut out)?;
        out.flush()?;
    }

    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Write a 16-bit single band raster (used for clipped Landsat bands)
pub fn write_geotiff<P: AsRef<Path>>(
    raster: &Raster<u16>,
    path: P,
    compression: Compression,
) -> Result<()> {
    let (rows, cols) = raster.shape();
    let data: Cow<'_, [u16]> = match raster.data().as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(raster.data().iter().copied().collect()),
    };

    write_atomic(path.as_ref(), |out| {
        let mut encoder = TiffEncoder::new(out)?.with_compression(compression.to_tiff());
        let mut image = encoder.new_image::<Gray16>(cols as u32, rows as u32)?;
        write_geo_tags(image.encoder(), raster.transform(), raster.crs())?;
        image.write_data(&data)?;
        Ok(())
    })
}

/// Write one or three 8-bit bands as a georeferenced GeoTIFF.
///
/// Three bands are written pixel-interleaved with photometric RGB; a
/// single band is written as greyscale.
pub fn write_geotiff_u8<P: AsRef<Path>>(
    bands: &[ArrayView2<'_, u8>],
    transform: &GeoTransform,
    crs: Option<&CRS>,
    path: P,
    compression: Compression,
) -> Result<()> {
    let Some(first) = bands.first() else {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "at least one band is required".into(),
        });
    };
    if bands.len() != 1 && bands.len() != 3 {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: bands.len().to_string(),
            reason: "composites are written with 1 or 3 bands".into(),
        });
    }
    let (rows, cols) = first.dim();
    for band in bands {
        if band.dim() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: band.nrows(),
                ac: band.ncols(),
            });
        }
    }

    write_atomic(path.as_ref(), |out| {
        let mut encoder = TiffEncoder::new(out)?.with_compression(compression.to_tiff());
        if bands.len() == 1 {
            let data: Vec<u8> = first.iter().copied().collect();
            let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), transform, crs)?;
            image.write_data(&data)?;
        } else {
            let data = interleave(bands);
            let mut image = encoder.new_image::<RGB8>(cols as u32, rows as u32)?;
            write_geo_tags(image.encoder(), transform, crs)?;
            image.write_data(&data)?;
        }
        Ok(())
    })
}

fn interleave(bands: &[ArrayView2<'_, u8>]) -> Vec<u8> {
    let (rows, cols) = bands[0].dim();
    let mut out = Vec::with_capacity(rows * cols * bands.len());
    for row in 0..rows {
        for col in 0..cols {
            for band in bands {
                out.push(band[(row, col)]);
            }
        }
    }
    out
}
