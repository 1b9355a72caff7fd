//! KTX2 container codec.
//!
//! Vulkan-style container: header, level index (largest mip first) and level
//! data addressed by absolute byte offsets. Levels may be supercompressed
//! with zlib; decompression is per-level and lazy.
//!
//! source: https://github.khronos.org/KTX-Specification/

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use io_util::{PrimitiveRead, PrimitiveWrite, RawDataRead};

use crate::align::align_up_64;
use crate::error::{ReadError, WriteError};
use crate::format::{size_bytes, Extent3, Format};
use crate::image::ImageProvider;
use crate::stream::ReadStream;

pub const KTX2_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

const SUPERCOMPRESSION_NONE: u32 = 0;
const SUPERCOMPRESSION_ZLIB: u32 = 3;
const ZLIB_LEVEL: u32 = 6;

struct Ktx2Header {
    vk_format: u32,
    type_size: u32,
    pixel_width: u32,
    pixel_height: u32,
    pixel_depth: u32,
    layer_count: u32,
    face_count: u32,
    level_count: u32,
    supercompression: u32,
    dfd_byte_offset: u32,
    dfd_byte_length: u32,
    kvd_byte_offset: u32,
    kvd_byte_length: u32,
    sgd_byte_offset: u32,
    sgd_byte_length: u32,
}

impl Ktx2Header {
    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            vk_format: reader.read_u32()?,
            type_size: reader.read_u32()?,
            pixel_width: reader.read_u32()?,
            pixel_height: reader.read_u32()?,
            pixel_depth: reader.read_u32()?,
            layer_count: reader.read_u32()?,
            face_count: reader.read_u32()?,
            level_count: reader.read_u32()?,
            supercompression: reader.read_u32()?,
            dfd_byte_offset: reader.read_u32()?,
            dfd_byte_length: reader.read_u32()?,
            kvd_byte_offset: reader.read_u32()?,
            kvd_byte_length: reader.read_u32()?,
            sgd_byte_offset: reader.read_u32()?,
            sgd_byte_length: reader.read_u32()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32(self.vk_format)?;
        writer.write_u32(self.type_size)?;
        writer.write_u32(self.pixel_width)?;
        writer.write_u32(self.pixel_height)?;
        writer.write_u32(self.pixel_depth)?;
        writer.write_u32(self.layer_count)?;
        writer.write_u32(self.face_count)?;
        writer.write_u32(self.level_count)?;
        writer.write_u32(self.supercompression)?;
        writer.write_u32(self.dfd_byte_offset)?;
        writer.write_u32(self.dfd_byte_length)?;
        writer.write_u32(self.kvd_byte_offset)?;
        writer.write_u32(self.kvd_byte_length)?;
        writer.write_u32(self.sgd_byte_offset)?;
        writer.write_u32(self.sgd_byte_length)
    }
}

#[derive(Debug, Clone, Copy)]
struct Ktx2Level {
    byte_offset: u64,
    byte_length: u64,
    uncompressed_byte_length: u64,
}

/// Provider over a parsed KTX2 stream. Supercompressed levels are inflated
/// whole on first access and cached.
#[derive(Debug)]
pub struct Ktx2Texture<R: ReadStream> {
    stream: R,
    format: Format,
    size: Extent3,
    faces: u32,
    /// 0 for non-array textures.
    layer_count: u32,
    zlib: bool,
    levels: Vec<Ktx2Level>,
    inflated: Vec<Option<Box<[u8]>>>,
    scratch: Vec<u8>,
}

impl<R: ReadStream> Ktx2Texture<R> {
    fn offset(&self, mip: u32, layer: u32) -> u64 {
        debug_assert!((mip as usize) < self.levels.len());
        debug_assert!(layer < self.layers());

        let level = &self.levels[mip as usize];
        let byte_size = size_bytes(self.size, mip, self.format);
        debug_assert_eq!(level.uncompressed_byte_length, byte_size * self.layers() as u64);

        level.byte_offset + byte_size * layer as u64
    }

    // Inflates the whole level on first access; later reads slice the cache.
    fn inflate_level(&mut self, mip: u32) -> Result<&[u8], ReadError> {
        let level = self.levels[mip as usize];
        if self.inflated[mip as usize].is_none() {
            self.stream.seek(SeekFrom::Start(level.byte_offset))?;
            let compressed = self.stream.read_data_exact(level.byte_length as usize)?;

            let mut data = Vec::with_capacity(level.uncompressed_byte_length as usize);
            ZlibDecoder::new(&compressed[..])
                .read_to_end(&mut data)
                .map_err(|err| {
                    log::warn!("ktx2: zlib inflate failed: {err}");
                    ReadError::Internal
                })?;
            if data.len() as u64 != level.uncompressed_byte_length {
                log::warn!(
                    "ktx2: level {} inflated to {} bytes, expected {}",
                    mip,
                    data.len(),
                    level.uncompressed_byte_length
                );
                return Err(ReadError::InvalidType);
            }

            self.inflated[mip as usize] = Some(data.into_boxed_slice());
        }

        Ok(self.inflated[mip as usize].as_deref().unwrap())
    }
}

impl<R: ReadStream> ImageProvider for Ktx2Texture<R> {
    fn size(&self) -> Extent3 {
        self.size
    }

    fn format(&self) -> Format {
        self.format
    }

    fn mip_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    fn layers(&self) -> u32 {
        (self.faces * self.layer_count.max(1)).max(1)
    }

    fn cubemap(&self) -> bool {
        self.faces == 6
    }

    fn read(&mut self, mip: u32, layer: u32) -> Result<&[u8], ReadError> {
        let byte_size = self.face_size(mip) as usize;
        if self.zlib {
            let face_offset = (byte_size as u64 * layer as u64) as usize;
            let level = self.inflate_level(mip)?;
            return Ok(&level[face_offset..face_offset + byte_size]);
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(byte_size, 0);
        let res = self.read_into(&mut scratch, mip, layer);
        self.scratch = scratch;
        res?;
        Ok(&self.scratch[..byte_size])
    }

    fn read_into(&mut self, buf: &mut [u8], mip: u32, layer: u32) -> Result<u64, ReadError> {
        let byte_size = self.face_size(mip) as usize;
        assert!(buf.len() >= byte_size);

        if self.zlib {
            let face_offset = (byte_size as u64 * layer as u64) as usize;
            let level = self.inflate_level(mip)?;
            buf[..byte_size].copy_from_slice(&level[face_offset..face_offset + byte_size]);
            return Ok(byte_size as u64);
        }

        let address = self.offset(mip, layer);
        self.stream.seek(SeekFrom::Start(address))?;
        self.stream.read_exact(&mut buf[..byte_size])?;
        Ok(byte_size as u64)
    }
}

/// Parses a KTX2 stream. Takes ownership of the stream only on success.
pub fn load_ktx2<R: ReadStream>(mut stream: R) -> Result<Ktx2Texture<R>, (ReadError, R)> {
    match parse_ktx2(&mut stream) {
        Ok(parsed) => {
            let level_count = parsed.levels.len();
            Ok(Ktx2Texture {
                stream,
                format: parsed.format,
                size: parsed.size,
                faces: parsed.faces,
                layer_count: parsed.layer_count,
                zlib: parsed.zlib,
                levels: parsed.levels,
                inflated: vec![None; level_count],
                scratch: Vec::new(),
            })
        }
        Err(err) => Err((err, stream)),
    }
}

struct ParsedKtx2 {
    format: Format,
    size: Extent3,
    faces: u32,
    layer_count: u32,
    zlib: bool,
    levels: Vec<Ktx2Level>,
}

fn parse_ktx2<R: ReadStream>(stream: &mut R) -> Result<ParsedKtx2, ReadError> {
    let mut identifier = [0u8; 12];
    stream.read_exact(&mut identifier)?;
    if identifier != KTX2_IDENTIFIER {
        return Err(ReadError::InvalidType);
    }

    let mut header = Ktx2Header::read(stream)?;

    let Some(format) = Format::from_vk(header.vk_format) else {
        log::warn!("ktx2: unsupported vkFormat {}", header.vk_format);
        return Err(ReadError::UnsupportedFormat);
    };
    if format == Format::Undefined {
        log::debug!("ktx2: file with VK_FORMAT_UNDEFINED");
        return Err(ReadError::UnsupportedFormat);
    }

    if header.pixel_width == 0 {
        log::warn!("ktx2: pixelWidth == 0");
        return Err(ReadError::Empty);
    }

    let zlib = match header.supercompression {
        SUPERCOMPRESSION_NONE => false,
        SUPERCOMPRESSION_ZLIB => true,
        scheme => {
            log::warn!("ktx2: unsupported supercompression scheme {scheme}");
            return Err(ReadError::UnsupportedFormat);
        }
    };

    if header.face_count == 0 {
        log::warn!("ktx2: faceCount == 0, assuming 1");
        header.face_count = 1;
    }

    let mut levels = Vec::with_capacity(header.level_count.max(1) as usize);
    for _ in 0..header.level_count.max(1) {
        levels.push(Ktx2Level {
            byte_offset: stream.read_u64()?,
            byte_length: stream.read_u64()?,
            uncompressed_byte_length: stream.read_u64()?,
        });
    }

    Ok(ParsedKtx2 {
        format,
        size: Extent3::new(
            header.pixel_width,
            header.pixel_height.max(1),
            header.pixel_depth.max(1),
        ),
        faces: header.face_count,
        layer_count: header.layer_count,
        zlib,
        levels,
    })
}

// Least common multiple, for the level alignment rule.
fn lcm(a: u64, b: u64) -> u64 {
    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }
    a / gcd(a, b) * b
}

/// Writes the image as KTX2, optionally piping each level through zlib.
/// Level data is emitted mip-major; the level index is back-patched once at
/// the end.
pub fn write_ktx2<W: Write + Seek>(
    writer: &mut W,
    image: &mut dyn ImageProvider,
    zlib: bool,
) -> Result<(), WriteError> {
    let format = image.format();
    let size = image.size();
    let mips = image.mip_levels().max(1);
    let layers = image.layers().max(1);
    let mut faces = 1u32;
    let mut layer_count = layers;
    if image.cubemap() {
        debug_assert!(layers % 6 == 0);
        faces = 6;
        layer_count = layers / 6;
    }

    let header = Ktx2Header {
        vk_format: format.vk(),
        type_size: format.element_size(),
        pixel_width: size.x,
        pixel_height: if size.y > 1 { size.y } else { 0 },
        pixel_depth: if size.z > 1 { size.z } else { 0 },
        layer_count: if layer_count > 1 { layer_count } else { 0 },
        face_count: faces,
        level_count: mips,
        supercompression: if zlib {
            SUPERCOMPRESSION_ZLIB
        } else {
            SUPERCOMPRESSION_NONE
        },
        dfd_byte_offset: 0,
        dfd_byte_length: 0,
        kvd_byte_offset: 0,
        kvd_byte_length: 0,
        sgd_byte_offset: 0,
        sgd_byte_length: 0,
    };

    writer.write_all(&KTX2_IDENTIFIER)?;
    header.write(writer)?;

    // placeholder level index, patched below
    let index_pos = writer.stream_position()?;
    for _ in 0..mips {
        writer.write_u64(0)?;
        writer.write_u64(0)?;
        writer.write_u64(0)?;
    }

    let alignment = lcm(format.element_size().max(1) as u64, 4);
    let zero = [0u8; 64];
    let mut levels = Vec::with_capacity(mips as usize);

    for mip in 0..mips {
        let face_size = size_bytes(size, mip, format);
        let uncompressed = face_size * layers as u64;

        let pos = writer.stream_position()?;
        let mut padding = align_up_64(pos, alignment) - pos;
        while padding > 0 {
            let chunk = padding.min(zero.len() as u64) as usize;
            writer.write_all(&zero[..chunk])?;
            padding -= chunk as u64;
        }

        let byte_offset = writer.stream_position()?;
        let byte_length = if zlib {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(ZLIB_LEVEL));
            for layer in 0..layers {
                let data = image.read(mip, layer)?;
                if data.len() as u64 != face_size {
                    log::debug!(
                        "ktx2: invalid provider read size, got {}, expected {}",
                        data.len(),
                        face_size
                    );
                    return Err(WriteError::ReadError);
                }
                encoder.write_all(data).map_err(|_| WriteError::Internal)?;
            }
            let compressed = encoder.finish().map_err(|_| WriteError::Internal)?;
            writer.write_all(&compressed)?;
            compressed.len() as u64
        } else {
            for layer in 0..layers {
                let data = image.read(mip, layer)?;
                if data.len() as u64 != face_size {
                    log::debug!(
                        "ktx2: invalid provider read size, got {}, expected {}",
                        data.len(),
                        face_size
                    );
                    return Err(WriteError::ReadError);
                }
                writer.write_all(data)?;
            }
            uncompressed
        };

        levels.push(Ktx2Level {
            byte_offset,
            byte_length,
            uncompressed_byte_length: uncompressed,
        });
    }

    // patch the index with the final offsets and lengths
    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(index_pos))?;
    for level in &levels {
        writer.write_u64(level.byte_offset)?;
        writer.write_u64(level.byte_length)?;
        writer.write_u64(level.uncompressed_byte_length)?;
    }
    writer.seek(SeekFrom::Start(end))?;

    Ok(())
}

pub fn write_ktx2_path(
    path: impl AsRef<Path>,
    image: &mut dyn ImageProvider,
    zlib: bool,
) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|err| {
        log::debug!("ktx2: create: {err}");
        WriteError::CantOpen
    })?;
    let mut writer = std::io::BufWriter::new(file);
    write_ktx2(&mut writer, image, zlib)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{wrap_faces, ImageProvider};
    use crate::stream::MemoryStream;
    use std::io::Cursor;

    fn cube_provider() -> Box<dyn ImageProvider> {
        // 4x4 rgba cubemap with 3 mips, 6 faces, no array layers
        let mut faces = Vec::new();
        for mip in 0..3u8 {
            let dim = 4usize >> mip;
            for face in 0..6u8 {
                faces.push(vec![mip * 6 + face; dim * dim * 4].into_boxed_slice());
            }
        }
        wrap_faces(
            Extent3::new(4, 4, 1),
            Format::R8G8B8A8Srgb,
            3,
            6,
            faces,
            true,
        )
    }

    fn write_bytes(provider: &mut dyn ImageProvider, zlib: bool) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_ktx2(&mut cursor, provider, zlib).unwrap();
        cursor.into_inner()
    }

    fn check_cube(texture: &mut Ktx2Texture<MemoryStream>) {
        assert_eq!(texture.size(), Extent3::new(4, 4, 1));
        assert_eq!(texture.format(), Format::R8G8B8A8Srgb);
        assert_eq!(texture.mip_levels(), 3);
        assert_eq!(texture.layers(), 6);
        assert!(texture.cubemap());

        for mip in 0..3u8 {
            let dim = 4usize >> mip;
            for face in 0..6u8 {
                let expected = vec![mip * 6 + face; dim * dim * 4];
                assert_eq!(
                    texture.read(mip as u32, face as u32).unwrap(),
                    &expected[..],
                    "mip {mip} face {face}"
                );
            }
        }
    }

    #[test]
    fn cubemap_roundtrip() {
        let mut provider = cube_provider();
        let bytes = write_bytes(provider.as_mut(), false);

        // level index entry for mip 0: 6 faces of 64 bytes
        let uncompressed = u64::from_le_bytes(bytes[88..96].try_into().unwrap());
        assert_eq!(uncompressed, 384);

        let mut texture = load_ktx2(MemoryStream::new(bytes)).map_err(|(e, _)| e).unwrap();
        check_cube(&mut texture);
    }

    #[test]
    fn zlib_roundtrip() {
        let mut provider = cube_provider();
        let plain = write_bytes(provider.as_mut(), false);
        let compressed = write_bytes(provider.as_mut(), true);
        // the constant fill compresses well
        assert!(compressed.len() < plain.len());

        let mut texture = load_ktx2(MemoryStream::new(compressed))
            .map_err(|(e, _)| e)
            .unwrap();
        check_cube(&mut texture);
    }

    #[test]
    fn levels_align_to_element_size() {
        // r16g16b16 has a 6 byte texel, levels must align to lcm(6, 4) = 12
        let faces = vec![
            vec![1u8; 2 * 2 * 6].into_boxed_slice(),
            vec![2u8; 6].into_boxed_slice(),
        ];
        let mut provider = wrap_faces(
            Extent3::new(2, 2, 1),
            Format::R16G16B16Unorm,
            2,
            1,
            faces,
            false,
        );
        let bytes = write_bytes(provider.as_mut(), false);

        let mut texture = load_ktx2(MemoryStream::new(bytes.clone()))
            .map_err(|(e, _)| e)
            .unwrap();
        assert_eq!(texture.read(0, 0).unwrap(), &[1u8; 24][..]);
        assert_eq!(texture.read(1, 0).unwrap(), &[2u8; 6][..]);

        let offset0 = u64::from_le_bytes(bytes[72..80].try_into().unwrap());
        let offset1 = u64::from_le_bytes(bytes[96..104].try_into().unwrap());
        assert_eq!(offset0 % 12, 0);
        assert_eq!(offset1 % 12, 0);
    }

    #[test]
    fn rejects_unknown_schemes_and_formats() {
        let mut provider = cube_provider();
        let bytes = write_bytes(provider.as_mut(), false);

        let mut scheme = bytes.clone();
        scheme[44..48].copy_from_slice(&2u32.to_le_bytes());
        let err = load_ktx2(MemoryStream::new(scheme)).err().unwrap().0;
        assert_eq!(err, ReadError::UnsupportedFormat);

        let mut undefined = bytes.clone();
        undefined[12..16].copy_from_slice(&0u32.to_le_bytes());
        let err = load_ktx2(MemoryStream::new(undefined)).err().unwrap().0;
        assert_eq!(err, ReadError::UnsupportedFormat);

        let mut empty = bytes;
        empty[20..24].copy_from_slice(&0u32.to_le_bytes());
        let err = load_ktx2(MemoryStream::new(empty)).err().unwrap().0;
        assert_eq!(err, ReadError::Empty);
    }

    #[test]
    fn corrupt_zlib_level_is_detected() {
        let mut provider = cube_provider();
        let mut bytes = write_bytes(provider.as_mut(), true);

        // clobber the first level's payload
        let offset0 = u64::from_le_bytes(bytes[72..80].try_into().unwrap()) as usize;
        bytes[offset0] ^= 0xFF;
        bytes[offset0 + 1] ^= 0xFF;

        let mut texture = load_ktx2(MemoryStream::new(bytes)).map_err(|(e, _)| e).unwrap();
        assert!(texture.read(0, 0).is_err());
        // untouched levels still inflate
        assert!(texture.read(1, 0).is_ok());
    }
}
