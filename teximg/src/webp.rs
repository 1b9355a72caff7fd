//! WebP codec adapter. Single mip, single layer, `R8G8B8A8Srgb`, decoded
//! from the mapped input on every read. Animated inputs only expose their
//! first frame.

use std::io::Cursor;

use image::codecs::webp::WebPDecoder;
use image::{ColorType, ImageDecoder};

use crate::error::ReadError;
use crate::format::{Extent3, Format};
use crate::image::ImageProvider;
use crate::jpeg::decode_rgba8;
use crate::stb::map_image_error;
use crate::stream::{ReadStream, StreamMap};

#[derive(Debug)]
pub struct WebpProvider {
    map: StreamMap,
    size: Extent3,
    scratch: Vec<u8>,
}

impl ImageProvider for WebpProvider {
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

        let decoder = WebPDecoder::new(Cursor::new(self.map.data()))
            .map_err(|err| map_image_error(&err))?;
        decode_rgba8(decoder, &mut buf[..byte_size])?;
        Ok(byte_size as u64)
    }
}

/// Probes a WebP stream. Takes ownership of the stream only on success.
pub fn load_webp(
    stream: Box<dyn ReadStream>,
) -> Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)> {
    let map = match StreamMap::new(stream, false) {
        Ok(map) => map,
        Err((stream, err)) => return Err((err.into(), stream)),
    };

    let decoder = match WebPDecoder::new(Cursor::new(map.data())) {
        Ok(decoder) => decoder,
        Err(err) => return Err((map_image_error(&err), map.release())),
    };

    match decoder.color_type() {
        ColorType::Rgb8 | ColorType::Rgba8 | ColorType::L8 => {}
        other => {
            log::warn!("webp: unsupported color type {other:?}");
            return Err((ReadError::UnsupportedFormat, map.release()));
        }
    }

    let (width, height) = decoder.dimensions();
    drop(decoder);

    Ok(Box::new(WebpProvider {
        map,
        size: Extent3::new(width, height, 1),
        scratch: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn encode_webp(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::webp::WebPEncoder::new_lossless(Cursor::new(&mut bytes));
        encoder
            .encode(rgba, width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_to_rgba8() {
        let mut rgba = Vec::new();
        for i in 0..16u8 {
            rgba.extend_from_slice(&[i, 2 * i, 3 * i, 255 - i]);
        }
        let bytes = encode_webp(4, 4, &rgba);

        let mut provider = load_webp(Box::new(MemoryStream::new(bytes)))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Srgb);
        assert_eq!(provider.size(), Extent3::new(4, 4, 1));
        // lossless webp reproduces the input exactly
        assert_eq!(provider.read(0, 0).unwrap(), &rgba[..]);
    }

    #[test]
    fn rejects_non_webp_bytes() {
        let result = load_webp(Box::new(MemoryStream::new(vec![0u8; 32])));
        assert!(result.is_err());
    }
}
