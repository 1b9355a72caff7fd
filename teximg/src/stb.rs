//! Last-resort fallback adapter over the generic `image` crate decoders
//! (hdr, tga, bmp, gif, ...). Always produces four channels: float rgba for
//! hdr input, byte rgba otherwise. Tried after every typed loader failed.

use std::io::Cursor;

use image::DynamicImage;

use crate::error::ReadError;
use crate::format::{Extent3, Format};
use crate::image::{wrap, ImageData, ImageProvider};
use crate::stream::{ReadStream, StreamMap};

pub(crate) fn map_image_error(err: &image::ImageError) -> ReadError {
    match err {
        image::ImageError::Decoding(_) => ReadError::InvalidType,
        image::ImageError::Unsupported(_) => ReadError::UnsupportedFormat,
        image::ImageError::Limits(_) => ReadError::Internal,
        image::ImageError::IoError(err) => match err.kind() {
            std::io::ErrorKind::UnexpectedEof => ReadError::UnexpectedEnd,
            _ => ReadError::Internal,
        },
        _ => ReadError::Internal,
    }
}

fn decode_map(map: &StreamMap) -> Result<ImageData, ReadError> {
    let reader = image::ImageReader::new(Cursor::new(map.data()))
        .with_guessed_format()
        .map_err(ReadError::from)?;
    let decoded = reader.decode().map_err(|err| {
        log::debug!("fallback decode failed: {err}");
        map_image_error(&err)
    })?;

    let size = Extent3::new(decoded.width(), decoded.height(), 1);

    // float input keeps its range, everything else becomes rgba8
    let (format, data) = match decoded {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let pixels = decoded.into_rgba32f().into_raw();
            let mut data = Vec::with_capacity(pixels.len() * 4);
            for value in pixels {
                data.extend_from_slice(&value.to_le_bytes());
            }
            (Format::R32G32B32A32Sfloat, data)
        }
        other => (Format::R8G8B8A8Unorm, other.into_rgba8().into_raw()),
    };

    Ok(ImageData {
        size,
        format,
        data: data.into_boxed_slice(),
    })
}

/// Decodes with a guessed format into a single-mip `ImageData`.
pub fn read_image_data_stb(stream: Box<dyn ReadStream>) -> Result<ImageData, ReadError> {
    let map = StreamMap::new(stream, false).map_err(|(_, err)| ReadError::from(err))?;
    decode_map(&map)
}

/// Probes the stream with the fallback decoders. Takes ownership of the
/// stream only on success.
pub fn load_stb(
    stream: Box<dyn ReadStream>,
) -> Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)> {
    let map = match StreamMap::new(stream, false) {
        Ok(map) => map,
        Err((stream, err)) => return Err((err.into(), stream)),
    };

    match decode_map(&map) {
        Ok(image) => Ok(wrap(image)),
        Err(err) => Err((err, map.release())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn encode_bmp(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::codecs::bmp::BmpEncoder::new(&mut Cursor::new(&mut bytes))
            .encode(rgba, width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_bmp_to_rgba8() {
        let rgba: Vec<u8> = (0..2 * 2 * 4).map(|i| i as u8 * 3).collect();
        let bytes = encode_bmp(2, 2, &rgba);

        let mut provider = load_stb(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Unorm);
        assert_eq!(provider.size(), Extent3::new(2, 2, 1));
        assert_eq!(provider.read(0, 0).unwrap(), &rgba[..]);
    }

    #[test]
    fn refuses_garbage() {
        let result = load_stb(Box::new(MemoryStream::new(vec![0x42u8; 64])));
        assert!(result.is_err());
    }
}
