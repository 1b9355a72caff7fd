//! PNG codec adapter.
//!
//! Reading promotes every input to at least 8 bits (palette to rgb, tRNS to
//! alpha) and pads 3-channel rgb to rgba, since plain rgb has poor gpu
//! support. 16-bit samples are byte-swapped from PNG's big-endian layout
//! into the engine's little-endian one.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{ReadError, WriteError};
use crate::format::{Extent3, Format};
use crate::image::{wrap_faces, ImageProvider};
use crate::stream::ReadStream;

fn map_decoding_error(err: png::DecodingError) -> ReadError {
    match err {
        png::DecodingError::IoError(err) => err.into(),
        png::DecodingError::Format(_) => ReadError::InvalidType,
        png::DecodingError::Parameter(_) => ReadError::Internal,
        png::DecodingError::LimitsExceeded => ReadError::Internal,
    }
}

fn swap16(data: &mut [u8]) {
    for pair in data.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Expands packed rgb texels to rgba with opaque alpha. `sample` is the
/// per-channel byte count.
fn pad_rgb_to_rgba(data: &[u8], sample: usize) -> Vec<u8> {
    let texels = data.len() / (3 * sample);
    let mut out = vec![0xFFu8; texels * 4 * sample];
    for (src, dst) in data
        .chunks_exact(3 * sample)
        .zip(out.chunks_exact_mut(4 * sample))
    {
        dst[..3 * sample].copy_from_slice(src);
    }
    out
}

fn decode_png(stream: &mut dyn ReadStream) -> Result<Box<dyn ImageProvider>, ReadError> {
    let mut decoder = png::Decoder::new(&mut *stream);
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder.read_info().map_err(map_decoding_error)?;

    let mut data = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut data).map_err(map_decoding_error)?;
    data.truncate(info.buffer_size());

    let (color, depth) = reader.output_color_type();
    let sixteen = match depth {
        png::BitDepth::Eight => false,
        png::BitDepth::Sixteen => true,
        _ => {
            // EXPAND promotes 1/2/4 bit inputs, anything else is unexpected
            log::error!("png: unsupported bit depth {depth:?}");
            return Err(ReadError::UnsupportedFormat);
        }
    };

    if sixteen {
        swap16(&mut data);
    }

    let sample = if sixteen { 2 } else { 1 };
    let (format, data) = match color {
        png::ColorType::Grayscale => (
            if sixteen { Format::R16Unorm } else { Format::R8Srgb },
            data,
        ),
        png::ColorType::GrayscaleAlpha => (
            if sixteen { Format::R16G16Unorm } else { Format::R8G8Srgb },
            data,
        ),
        png::ColorType::Rgb => (
            if sixteen {
                Format::R16G16B16A16Unorm
            } else {
                Format::R8G8B8A8Srgb
            },
            pad_rgb_to_rgba(&data, sample),
        ),
        png::ColorType::Rgba => (
            if sixteen {
                Format::R16G16B16A16Unorm
            } else {
                Format::R8G8B8A8Srgb
            },
            data,
        ),
        png::ColorType::Indexed => {
            // cannot happen with EXPAND set
            log::error!("png: indexed output after expansion");
            return Err(ReadError::Internal);
        }
    };

    let size = Extent3::new(info.width, info.height, 1);
    debug_assert_eq!(data.len() as u64, size.texel_count() * format.element_size() as u64);

    Ok(wrap_faces(size, format, 1, 1, vec![data.into_boxed_slice()], false))
}

/// Decodes a PNG stream into an in-memory provider. The stream is handed
/// back on failure.
pub fn load_png(
    mut stream: Box<dyn ReadStream>,
) -> Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)> {
    match decode_png(stream.as_mut()) {
        Ok(provider) => Ok(provider),
        Err(err) => Err((err, stream)),
    }
}

/// Writes the first mip of the first layer as PNG. Supports 8-bit
/// unorm/srgb and 16-bit unorm, 1/3/4 channels.
pub fn write_png<W: Write>(writer: &mut W, image: &mut dyn ImageProvider) -> Result<(), WriteError> {
    if image.size().z > 1 {
        log::warn!("write_png: discarding {} slices", image.size().z - 1);
    }
    if image.mip_levels() > 1 {
        log::warn!("write_png: discarding {} mips", image.mip_levels() - 1);
    }
    if image.layers() > 1 {
        log::warn!("write_png: discarding {} layers", image.layers() - 1);
    }

    let format = image.format();
    let (color, sixteen, comps) = match format {
        Format::R8Unorm | Format::R8Srgb => (png::ColorType::Grayscale, false, 1usize),
        Format::R8G8B8Unorm | Format::R8G8B8Srgb => (png::ColorType::Rgb, false, 3),
        Format::R8G8B8A8Unorm | Format::R8G8B8A8Srgb => (png::ColorType::Rgba, false, 4),
        Format::R16Unorm => (png::ColorType::Grayscale, true, 1),
        Format::R16G16B16Unorm => (png::ColorType::Rgb, true, 3),
        Format::R16G16B16A16Unorm => (png::ColorType::Rgba, true, 4),
        _ => {
            log::error!("write_png: unsupported format {format:?}");
            return Err(WriteError::UnsupportedFormat);
        }
    };

    let size = image.size();
    let sample = if sixteen { 2 } else { 1 };
    let expected = size.x as u64 * size.y as u64 * (comps * sample) as u64;
    let data = image.read(0, 0)?;
    if data.len() as u64 != expected {
        log::error!(
            "write_png: invalid image data size, expected {expected}, got {}",
            data.len()
        );
        return Err(WriteError::ReadError);
    }

    let mut encoder = png::Encoder::new(&mut *writer, size.x, size.y);
    encoder.set_color(color);
    encoder.set_depth(if sixteen {
        png::BitDepth::Sixteen
    } else {
        png::BitDepth::Eight
    });

    let mut png_writer = encoder.write_header().map_err(|err| {
        log::error!("write_png: {err}");
        WriteError::Internal
    })?;

    let result = if sixteen {
        // png wants big-endian samples
        let mut swapped = data.to_vec();
        swap16(&mut swapped);
        png_writer.write_image_data(&swapped)
    } else {
        png_writer.write_image_data(data)
    };
    result.map_err(|err| {
        log::error!("write_png: {err}");
        WriteError::CantWrite
    })?;
    png_writer.finish().map_err(|err| {
        log::error!("write_png: {err}");
        WriteError::CantWrite
    })
}

pub fn write_png_path(
    path: impl AsRef<Path>,
    image: &mut dyn ImageProvider,
) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|err| {
        log::debug!("write_png: create: {err}");
        WriteError::CantOpen
    })?;
    let mut writer = std::io::BufWriter::new(file);
    write_png(&mut writer, image)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{wrap, ImageData};
    use crate::stream::MemoryStream;

    fn write_provider(format: Format, size: Extent3, data: Vec<u8>) -> Vec<u8> {
        let mut provider = wrap(ImageData {
            size,
            format,
            data: data.into_boxed_slice(),
        });
        let mut bytes = Vec::new();
        write_png(&mut bytes, provider.as_mut()).unwrap();
        bytes
    }

    #[test]
    fn rgba8_roundtrip() {
        let pixels = vec![
            1, 2, 3, 255, 4, 5, 6, 128, //
            7, 8, 9, 0, 10, 11, 12, 64,
        ];
        let bytes = write_provider(Format::R8G8B8A8Srgb, Extent3::new(2, 2, 1), pixels.clone());

        let mut provider = load_png(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Srgb);
        assert_eq!(provider.size(), Extent3::new(2, 2, 1));
        assert_eq!(provider.read(0, 0).unwrap(), &pixels[..]);
    }

    #[test]
    fn rgb_is_padded_to_rgba() {
        let bytes = write_provider(
            Format::R8G8B8Unorm,
            Extent3::new(2, 1, 1),
            vec![10, 20, 30, 40, 50, 60],
        );

        let mut provider = load_png(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Srgb);
        assert_eq!(
            provider.read(0, 0).unwrap(),
            &[10, 20, 30, 255, 40, 50, 60, 255]
        );
    }

    #[test]
    fn gray16_keeps_native_endianness() {
        let bytes = write_provider(
            Format::R16Unorm,
            Extent3::new(2, 1, 1),
            vec![0x34, 0x12, 0x78, 0x56],
        );

        let mut provider = load_png(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R16Unorm);
        assert_eq!(provider.read(0, 0).unwrap(), &[0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn failure_returns_the_stream() {
        let result = load_png(Box::new(MemoryStream::new(vec![0u8; 16])));
        let (err, mut stream) = result.err().unwrap();
        assert_eq!(err, ReadError::InvalidType);
        let mut buf = [0u8; 1];
        use std::io::{Read, Seek, SeekFrom};
        stream.seek(SeekFrom::Start(0)).unwrap();
        stream.read_exact(&mut buf).unwrap();
    }

    #[test]
    fn unsupported_write_format() {
        let mut provider = wrap(ImageData {
            size: Extent3::new(1, 1, 1),
            format: Format::R32Sfloat,
            data: vec![0; 4].into_boxed_slice(),
        });
        let mut bytes = Vec::new();
        let err = write_png(&mut bytes, provider.as_mut());
        assert!(matches!(err, Err(WriteError::UnsupportedFormat)));
    }
}
