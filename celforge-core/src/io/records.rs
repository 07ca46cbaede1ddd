use super::{read_i32, read_id, read_u32, read_u64, read_u8, DecodeError, SubObjects};
use crate::{
    geometry::Point,
    image::{Image, Pixel, PixelBuffer, PixelFormat},
    object::{Object, Versioned},
    state::{cel::Cel, cel_data::CelData, Frame},
};
use std::io::{Read, Write};

fn encode_pixels<P: Pixel>(pixels: &[P]) -> Vec<u8> {
    let mut out = Vec::with_capacity(std::mem::size_of_val(pixels));
    for &pixel in pixels {
        pixel.write_le(&mut out);
    }
    out
}
fn decode_pixels<P: Pixel>(bytes: &[u8]) -> Vec<P> {
    bytes
        .chunks_exact(P::FORMAT.bytes_per_pixel())
        .map(P::read_le)
        .collect()
}

/// `u64 id, u8 format, u32 width, u32 height`, then every pixel, row-major.
pub fn write_image(w: &mut impl Write, image: &Image) -> std::io::Result<()> {
    w.write_all(&image.id().id().to_le_bytes())?;
    w.write_all(&[image.format() as u8])?;
    w.write_all(&image.width().to_le_bytes())?;
    w.write_all(&image.height().to_le_bytes())?;
    let bytes = match image.buffer() {
        PixelBuffer::Rgb(pixels) => encode_pixels(pixels),
        PixelBuffer::Grayscale(pixels) => encode_pixels(pixels),
        PixelBuffer::Indexed(pixels) => encode_pixels(pixels),
        PixelBuffer::TimestampedRgb(pixels) => encode_pixels(pixels),
    };
    w.write_all(&bytes)
}

pub fn read_image(r: &mut impl Read) -> Result<Image, DecodeError> {
    let id = read_id(r)?;
    let format = read_u8(r)?;
    let format = PixelFormat::from_repr(format).ok_or(DecodeError::UnknownPixelFormat(format))?;
    let width = read_u32(r)?;
    let height = read_u32(r)?;
    let byte_len = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|len| len.checked_mul(format.bytes_per_pixel() as u64))
        .ok_or(DecodeError::BadDimensions(width, height))?;
    // Grows with what's actually in the stream, not with what the header claims.
    let mut bytes = Vec::new();
    r.by_ref().take(byte_len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != byte_len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    let buffer = match format {
        PixelFormat::Rgb => PixelBuffer::Rgb(decode_pixels(&bytes)),
        PixelFormat::Grayscale => PixelBuffer::Grayscale(decode_pixels(&bytes)),
        PixelFormat::Indexed => PixelBuffer::Indexed(decode_pixels(&bytes)),
        PixelFormat::TimestampedRgb => PixelBuffer::TimestampedRgb(decode_pixels(&bytes)),
    };
    Image::from_parts(Object::with_id(id), width, height, buffer)
        .ok_or(DecodeError::BadDimensions(width, height))
}

/// `u64 id, u64 image id, i32 x, i32 y, u8 opacity, u32 position clock, u32 opacity clock`.
pub fn write_cel_data(w: &mut impl Write, data: &CelData) -> std::io::Result<()> {
    let position = data.position();
    w.write_all(&data.id().id().to_le_bytes())?;
    w.write_all(&data.image().read().id().id().to_le_bytes())?;
    w.write_all(&position.x.to_le_bytes())?;
    w.write_all(&position.y.to_le_bytes())?;
    w.write_all(&[data.opacity()])?;
    w.write_all(&data.position_tick().0.to_le_bytes())?;
    w.write_all(&data.opacity_tick().0.to_le_bytes())
}

pub fn read_cel_data(r: &mut impl Read, objects: &impl SubObjects) -> Result<CelData, DecodeError> {
    let id = read_id(r)?;
    let image_id = read_u64(r)?;
    let image = crate::id::ObjectID::from_raw(image_id)
        .and_then(|image_id| objects.image(image_id))
        .ok_or(DecodeError::MissingImage(image_id))?;
    let x = read_i32(r)?;
    let y = read_i32(r)?;
    let opacity = read_u8(r)?;
    let position_t = crate::clock::Tick(read_u32(r)?);
    let opacity_t = crate::clock::Tick(read_u32(r)?);

    let mut data = CelData::with_object(Object::with_id(id), image);
    data.restore(Point::new(x, y), opacity, position_t, opacity_t);
    Ok(data)
}

/// `u64 id, u32 frame, u64 cel data id`.
pub fn write_cel(w: &mut impl Write, cel: &Cel) -> std::io::Result<()> {
    w.write_all(&cel.id().id().to_le_bytes())?;
    w.write_all(&cel.frame().0.to_le_bytes())?;
    w.write_all(&cel.data().read().id().id().to_le_bytes())
}

/// Read a cel, detached.
pub fn read_cel(r: &mut impl Read, objects: &impl SubObjects) -> Result<Cel, DecodeError> {
    let id = read_id(r)?;
    let frame = Frame(read_u32(r)?);
    let data_id = read_u64(r)?;
    let data = crate::id::ObjectID::from_raw(data_id)
        .and_then(|data_id| objects.cel_data(data_id))
        .ok_or(DecodeError::MissingCelData(data_id))?;
    Ok(Cel::with_object(Object::with_id(id), frame, data))
}
