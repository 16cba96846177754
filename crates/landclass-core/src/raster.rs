//! Single-band GeoTIFF reading and writing.
//!
//! Rows are kept in file order (row 0 = first stored row). Georeferencing
//! tags are captured verbatim on read and written back unchanged, so an
//! output lands on exactly the input's grid.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::compression::{Compression, Lzw, Uncompressed};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

use crate::class::SimpleClass;
use crate::error::{LandclassError, Result};
use crate::grid::{GeoReference, Grid};

// ── GeoTIFF tag numbers ─────────────────────────────────────────────────────

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Output compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RasterCompression {
    None,
    #[default]
    Lzw,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub compression: RasterCompression,
    /// GDAL nodata value to tag the output with. For class rasters the
    /// source's nodata is never carried over, since it names a source code.
    pub nodata: Option<String>,
}

// ── Reading ─────────────────────────────────────────────────────────────────

/// Read a single-band integer raster as category codes.
pub fn read_categorical(path: &Path) -> Result<Grid<i32>> {
    let file = File::open(path).map_err(|e| LandclassError::io(path, e))?;
    let grid = read_categorical_from(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), width = grid.width, height = grid.height, "read categorical raster");
    Ok(grid)
}

pub fn read_categorical_from<R: Read + Seek>(reader: R) -> Result<Grid<i32>> {
    let (width, height, image, geo) = decode_single_band(reader)?;
    let codes = match image {
        DecodingResult::U8(v) => narrow(v)?,
        DecodingResult::U16(v) => narrow(v)?,
        DecodingResult::U32(v) => narrow(v)?,
        DecodingResult::U64(v) => narrow(v)?,
        DecodingResult::I8(v) => narrow(v)?,
        DecodingResult::I16(v) => narrow(v)?,
        DecodingResult::I32(v) => v,
        DecodingResult::I64(v) => narrow(v)?,
        _ => {
            return Err(LandclassError::UnsupportedSampleFormat(
                "floating-point samples in a categorical raster",
            ))
        }
    };
    Ok(Grid::from_vec(width, height, codes)?.with_geo(geo))
}

/// Read a single-band numeric raster as `f32` (e.g. a deposition velocity
/// or emission field).
pub fn read_continuous(path: &Path) -> Result<Grid<f32>> {
    let file = File::open(path).map_err(|e| LandclassError::io(path, e))?;
    read_continuous_from(BufReader::new(file))
}

pub fn read_continuous_from<R: Read + Seek>(reader: R) -> Result<Grid<f32>> {
    let (width, height, image, geo) = decode_single_band(reader)?;
    let values: Vec<f32> = match image {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(LandclassError::UnsupportedSampleFormat(
                "64-bit integer samples in a continuous raster",
            ))
        }
    };
    Ok(Grid::from_vec(width, height, values)?.with_geo(geo))
}

fn decode_single_band<R: Read + Seek>(
    reader: R,
) -> Result<(usize, usize, DecodingResult, GeoReference)> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
    if !matches!(decoder.colortype()?, tiff::ColorType::Gray(_)) {
        return Err(LandclassError::UnsupportedSampleFormat("multi-band raster"));
    }
    let (width, height) = decoder.dimensions()?;
    let geo = read_geo(&mut decoder)?;
    let image = decoder.read_image()?;
    Ok((width as usize, height as usize, image, geo))
}

fn read_geo<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoReference> {
    let mut geo = GeoReference::default();
    if let Some(v) = decoder.find_tag(tag(MODEL_PIXEL_SCALE))? {
        geo.pixel_scale = Some(v.into_f64_vec()?);
    }
    if let Some(v) = decoder.find_tag(tag(MODEL_TIEPOINT))? {
        geo.tiepoints = Some(v.into_f64_vec()?);
    }
    if let Some(v) = decoder.find_tag(tag(MODEL_TRANSFORMATION))? {
        geo.transformation = Some(v.into_f64_vec()?);
    }
    if let Some(v) = decoder.find_tag(tag(GEO_KEY_DIRECTORY))? {
        geo.geo_key_directory = Some(v.into_u16_vec()?);
    }
    if let Some(v) = decoder.find_tag(tag(GEO_DOUBLE_PARAMS))? {
        geo.geo_double_params = Some(v.into_f64_vec()?);
    }
    if let Some(v) = decoder.find_tag(tag(GEO_ASCII_PARAMS))? {
        geo.geo_ascii_params = Some(v.into_string()?);
    }
    if let Some(v) = decoder.find_tag(tag(GDAL_NODATA))? {
        geo.nodata = Some(v.into_string()?.trim().to_string());
    }
    Ok(geo)
}

fn narrow<T>(values: Vec<T>) -> Result<Vec<i32>>
where
    T: Copy + Into<i128>,
    i32: TryFrom<T>,
{
    values
        .into_iter()
        .map(|x| i32::try_from(x).map_err(|_| LandclassError::CodeOutOfRange(x.into())))
        .collect()
}

// ── Writing ─────────────────────────────────────────────────────────────────

/// Write simple class codes as a `u8` GeoTIFF with class descriptions in
/// the GDAL metadata.
pub fn write_classes(path: &Path, grid: &Grid<u8>, options: &WriteOptions) -> Result<()> {
    let file = File::create(path).map_err(|e| LandclassError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_classes_to(&mut writer, grid, options)?;
    writer.flush().map_err(|e| LandclassError::io(path, e))?;
    tracing::debug!(path = %path.display(), width = grid.width, height = grid.height, "wrote class raster");
    Ok(())
}

pub fn write_classes_to<W: Write + Seek>(writer: W, grid: &Grid<u8>, options: &WriteOptions) -> Result<()> {
    let tags = OutputTags {
        geo: &grid.geo,
        nodata: options.nodata.as_deref(),
        gdal_metadata: Some(class_metadata_xml()),
    };
    encode::<colortype::Gray8, W>(writer, grid.width, grid.height, &grid.data, &tags, options.compression)
}

/// Write an `f32` GeoTIFF. Uses `options.nodata`, else the grid's own.
pub fn write_continuous(path: &Path, grid: &Grid<f32>, options: &WriteOptions) -> Result<()> {
    let file = File::create(path).map_err(|e| LandclassError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_continuous_to(&mut writer, grid, options)?;
    writer.flush().map_err(|e| LandclassError::io(path, e))
}

pub fn write_continuous_to<W: Write + Seek>(writer: W, grid: &Grid<f32>, options: &WriteOptions) -> Result<()> {
    let tags = OutputTags {
        geo: &grid.geo,
        nodata: options.nodata.as_deref().or(grid.geo.nodata.as_deref()),
        gdal_metadata: None,
    };
    encode::<colortype::Gray32Float, W>(writer, grid.width, grid.height, &grid.data, &tags, options.compression)
}

struct OutputTags<'a> {
    geo: &'a GeoReference,
    nodata: Option<&'a str>,
    gdal_metadata: Option<String>,
}

fn encode<C, W>(
    writer: W,
    width: usize,
    height: usize,
    data: &[C::Inner],
    tags: &OutputTags<'_>,
    compression: RasterCompression,
) -> Result<()>
where
    C: ColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let mut tiff = TiffEncoder::new(writer)?;
    match compression {
        RasterCompression::None => encode_image::<C, W, _>(&mut tiff, width, height, data, tags, Uncompressed),
        RasterCompression::Lzw => encode_image::<C, W, _>(&mut tiff, width, height, data, tags, Lzw::default()),
    }
}

fn encode_image<C, W, D>(
    tiff: &mut TiffEncoder<W>,
    width: usize,
    height: usize,
    data: &[C::Inner],
    tags: &OutputTags<'_>,
    compression: D,
) -> Result<()>
where
    C: ColorType,
    W: Write + Seek,
    D: Compression,
    [C::Inner]: TiffValue,
{
    let (w, h) = dims(width, height)?;
    let mut image = tiff.new_image_with_compression::<C, D>(w, h, compression)?;
    let dir = image.encoder();
    let geo = tags.geo;
    if let Some(v) = &geo.pixel_scale {
        dir.write_tag(tag(MODEL_PIXEL_SCALE), v.as_slice())?;
    }
    if let Some(v) = &geo.tiepoints {
        dir.write_tag(tag(MODEL_TIEPOINT), v.as_slice())?;
    }
    if let Some(v) = &geo.transformation {
        dir.write_tag(tag(MODEL_TRANSFORMATION), v.as_slice())?;
    }
    if let Some(v) = &geo.geo_key_directory {
        dir.write_tag(tag(GEO_KEY_DIRECTORY), v.as_slice())?;
    }
    if let Some(v) = &geo.geo_double_params {
        dir.write_tag(tag(GEO_DOUBLE_PARAMS), v.as_slice())?;
    }
    if let Some(v) = &geo.geo_ascii_params {
        dir.write_tag(tag(GEO_ASCII_PARAMS), v.as_str())?;
    }
    if let Some(xml) = &tags.gdal_metadata {
        dir.write_tag(tag(GDAL_METADATA), xml.as_str())?;
    }
    if let Some(nodata) = tags.nodata {
        dir.write_tag(tag(GDAL_NODATA), nodata)?;
    }
    image.write_data(data)?;
    Ok(())
}

fn dims(width: usize, height: usize) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(LandclassError::InvalidDimensions { width, height }),
    }
}

/// GDAL band metadata: band description plus one `class_N` item per class.
fn class_metadata_xml() -> String {
    let mut xml = String::from("<GDALMetadata>\n");
    xml.push_str("  <Item name=\"DESCRIPTION\" sample=\"0\" role=\"description\">Simple Land Use Classification</Item>\n");
    for class in SimpleClass::ALL {
        xml.push_str(&format!(
            "  <Item name=\"class_{}\" sample=\"0\">{}</Item>\n",
            class.code(),
            class.description()
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}
