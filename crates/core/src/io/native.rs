//! Native GeoTIFF writing (and reading back) through the `tiff` crate
//!
//! Each band becomes one image directory of a multi-page TIFF, stored with
//! the band's own sample type. Georeferencing goes into the usual
//! ModelPixelScale / ModelTiepoint / GeoKeyDirectory tags and the nodata
//! value into the `GDAL_NODATA` ASCII tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelBuffer, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    ColorType, Gray16, Gray32, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32, GrayI8,
};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Write bands to a GeoTIFF file, one image directory per band.
///
/// Georeferencing, CRS and nodata are taken from the first band.
pub fn write_geotiff<T, P>(bands: &[Raster<T>], path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(bands, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write bands to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(bands: &[Raster<T>]) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(bands, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Other(format!("{}: {}", context, e))
}

fn encode_geotiff<T, W>(bands: &[Raster<T>], writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let first = bands
        .first()
        .ok_or_else(|| Error::Other("Cannot write a GeoTIFF without bands".into()))?;
    let meta = PageMeta {
        transform: *first.transform(),
        geokeys: geokeys(first.crs()),
        nodata: first.nodata().and_then(|v| v.to_f64()).map(format_nodata),
    };

    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;

    for band in bands {
        let (rows, cols) = band.shape();
        let samples = T::into_buffer(band.data().iter().copied().collect());
        match &samples {
            PixelBuffer::Byte(v) => write_page::<Gray8, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::Int8(v) => write_page::<GrayI8, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::Int16(v) => write_page::<GrayI16, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::UInt16(v) => write_page::<Gray16, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::Int32(v) => write_page::<GrayI32, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::UInt32(v) => write_page::<Gray32, _>(&mut encoder, cols, rows, &meta, v)?,
            PixelBuffer::Float32(v) => {
                write_page::<Gray32Float, _>(&mut encoder, cols, rows, &meta, v)?
            }
            PixelBuffer::Float64(v) => {
                write_page::<Gray64Float, _>(&mut encoder, cols, rows, &meta, v)?
            }
        }
    }

    Ok(())
}

struct PageMeta {
    transform: GeoTransform,
    geokeys: Vec<u16>,
    nodata: Option<String>,
}

fn write_page<C, W>(
    encoder: &mut TiffEncoder<W>,
    cols: usize,
    rows: usize,
    meta: &PageMeta,
    data: &[C::Inner],
) -> Result<()>
where
    C: ColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = &meta.transform;
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), meta.geokeys.as_slice())
        .map_err(tiff_err("Cannot write geokey tag"))?;

    if let Some(nodata) = &meta.nodata {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), nodata.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(data)
        .map_err(tiff_err("Cannot write image data"))?;
    Ok(())
}

/// GeoKeyDirectory entries: model type, pixel-is-area and, when the CRS has
/// an EPSG code that fits the key, the geographic or projected CS code.
fn geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.map_or(false, CRS::is_geographic);
    let mut keys: Vec<[u16; 4]> = vec![
        [KEY_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }],
        [KEY_RASTER_TYPE, 0, 1, 1],
    ];

    if let Some(code) = crs.and_then(CRS::epsg) {
        match u16::try_from(code) {
            Ok(code) => {
                let key = if geographic {
                    KEY_GEOGRAPHIC_TYPE
                } else {
                    KEY_PROJECTED_CS_TYPE
                };
                keys.push([key, 0, 1, code]);
            }
            Err(_) => tracing::warn!("EPSG:{} does not fit a GeoTIFF key, CRS not written", code),
        }
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// EPSG code stored inline under the projected or geographic CS key.
///
/// User-defined (32767) and out-of-line values carry no EPSG code.
fn crs_from_geokeys(keys: &[u16]) -> Option<CRS> {
    let count = usize::from(*keys.get(3)?);
    let entries = keys.get(4..)?.chunks_exact(4).take(count);
    let mut geographic = None;
    let mut projected = None;
    for entry in entries {
        let (id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match id {
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }
    projected
        .or(geographic)
        .map(|code| CRS::from_epsg(u32::from(code)))
}

fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{}", value)
    }
}

/// Read band `band` (0-based image directory) of a GeoTIFF written by
/// [`write_geotiff`].
pub fn read_geotiff_band<T, P>(path: P, band: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_band(file, band)
}

/// Buffer counterpart of [`read_geotiff_band`]
pub fn read_geotiff_band_from_buffer<T>(data: &[u8], band: usize) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_band(Cursor::new(data), band)
}

fn decode_band<T, R>(reader: R, band: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;
    for _ in 0..band {
        if !decoder.more_images() {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: "no such image directory".into(),
            });
        }
        decoder.next_image().map_err(tiff_err("Cannot seek image"))?;
    }

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    fn convert<S: Copy + Into<f64>, T: RasterElement>(buf: Vec<S>) -> Vec<T> {
        buf.into_iter()
            .map(|v| T::from_f64_saturating(v.into()))
            .collect()
    }

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => convert(buf),
        DecodingResult::I8(buf) => convert(buf),
        DecodingResult::U16(buf) => convert(buf),
        DecodingResult::I16(buf) => convert(buf),
        DecodingResult::U32(buf) => convert(buf),
        DecodingResult::I32(buf) => convert(buf),
        DecodingResult::F32(buf) => convert(buf),
        DecodingResult::F64(buf) => convert(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    // Known tag numbers decode to their named variants, never to `Unknown`.
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE));
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT));
    if let (Ok(scale), Ok(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            raster.set_transform(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    if let Ok(keys) = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY)) {
        raster.set_crs(crs_from_geokeys(&keys));
    }

    if let Ok(text) = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA)) {
        if let Ok(value) = text.trim_end_matches('\0').trim().parse::<f64>() {
            raster.set_nodata(Some(T::from_f64_saturating(value)));
        }
    }

    Ok(raster)
}
