//! JPEG codec adapter. Single mip, single layer, always decoded to
//! `R8G8B8A8Srgb`. The compressed input is kept mapped and decoded anew on
//! every read.

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};

use crate::error::ReadError;
use crate::format::{Extent3, Format};
use crate::image::ImageProvider;
use crate::stb::map_image_error;
use crate::stream::{ReadStream, StreamMap};

#[derive(Debug)]
pub struct JpegProvider {
    map: StreamMap,
    size: Extent3,
    scratch: Vec<u8>,
}

impl ImageProvider for JpegProvider {
    fn size(&self) -> Extent3 {
        self.size
    }

    fn format(&self) -> Format {
        Format::R8G8B8A8Srgb
    }

    fn read(&mut self, mip: u32, layer: u32) -> Result<&[u8], ReadError> {
        let byte_size = self.face_size(mip) as usize;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(byte_size, 0);
        let res = self.read_into(&mut scratch, mip, layer);
        self.scratch = scratch;
        res?;
        Ok(&self.scratch[..byte_size])
    }

    fn read_into(&mut self, buf: &mut [u8], mip: u32, layer: u32) -> Result<u64, ReadError> {
        assert_eq!(mip, 0);
        assert_eq!(layer, 0);
        let byte_size = self.face_size(0) as usize;
        assert!(buf.len() >= byte_size);

        let decoder = JpegDecoder::new(Cursor::new(self.map.data()))
            .map_err(|err| map_image_error(&err))?;
        decode_rgba8(decoder, &mut buf[..byte_size])?;
        Ok(byte_size as u64)
    }
}

/// Runs a decoder and expands its output to tightly packed rgba8 with
/// opaque alpha.
pub(crate) fn decode_rgba8(
    decoder: impl ImageDecoder,
    buf: &mut [u8],
) -> Result<(), ReadError> {
    let color = decoder.color_type();
    let total = decoder.total_bytes() as usize;

    match color {
        ColorType::Rgba8 => {
            decoder
                .read_image(&mut buf[..total])
                .map_err(|err| map_image_error(&err))?;
        }
        ColorType::Rgb8 => {
            let mut rgb = vec![0u8; total];
            decoder
                .read_image(&mut rgb)
                .map_err(|err| map_image_error(&err))?;
            for (src, dst) in rgb.chunks_exact(3).zip(buf.chunks_exact_mut(4)) {
                dst[..3].copy_from_slice(src);
                dst[3] = 0xFF;
            }
        }
        ColorType::L8 => {
            let mut gray = vec![0u8; total];
            decoder
                .read_image(&mut gray)
                .map_err(|err| map_image_error(&err))?;
            for (&luma, dst) in gray.iter().zip(buf.chunks_exact_mut(4)) {
                dst[0] = luma;
                dst[1] = luma;
                dst[2] = luma;
                dst[3] = 0xFF;
            }
        }
        other => {
            log::warn!("unexpected decoder color type {other:?}");
            return Err(ReadError::UnsupportedFormat);
        }
    }

    Ok(())
}

/// Probes a JPEG stream. Takes ownership of the stream only on success.
pub fn load_jpeg(
    stream: Box<dyn ReadStream>,
) -> Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)> {
    let map = match StreamMap::new(stream, false) {
        Ok(map) => map,
        Err((stream, err)) => return Err((err.into(), stream)),
    };

    let decoder = match JpegDecoder::new(Cursor::new(map.data())) {
        Ok(decoder) => decoder,
        // probably just not a jpeg
        Err(err) => return Err((map_image_error(&err), map.release())),
    };

    match decoder.color_type() {
        ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8 => {}
        other => {
            log::warn!("jpeg: unsupported color type {other:?}");
            return Err((ReadError::UnsupportedFormat, map.release()));
        }
    }

    let (width, height) = decoder.dimensions();
    drop(decoder);

    Ok(Box::new(JpegProvider {
        map,
        size: Extent3::new(width, height, 1),
        scratch: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn encode_jpeg(width: u32, height: u32, rgb: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 100);
        encoder
            .encode(rgb, width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_to_rgba8() {
        let rgb = vec![200u8; 4 * 4 * 3];
        let bytes = encode_jpeg(4, 4, &rgb);

        let mut provider = load_jpeg(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Srgb);
        assert_eq!(provider.size(), Extent3::new(4, 4, 1));

        let data = provider.read(0, 0).unwrap();
        assert_eq!(data.len(), 4 * 4 * 4);
        // flat gray survives lossy compression, alpha is forced opaque
        assert!(data.chunks_exact(4).all(|px| px[3] == 0xFF));
        assert!(data.chunks_exact(4).all(|px| px[0].abs_diff(200) < 8));
    }

    #[test]
    fn rejects_non_jpeg_bytes() {
        let result = load_jpeg(Box::new(MemoryStream::new(vec![0u8; 32])));
        assert!(result.is_err());
    }
}
