//! KTX1 container codec.
//!
//! The GL-style container: a 13-field header, an optional key/value block
//! and per-mip image data preceded by a `u32 imageSize` field, everything
//! padded to 4 bytes. Faces/layers address as layer = face * arrayElements
//! + arrayElement.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use io_util::{PrimitiveRead, PrimitiveWrite, RawDataRead};

use crate::align::align_up_64;
use crate::error::{ReadError, WriteError};
use crate::format::{size_bytes, Extent3, Format};
use crate::image::ImageProvider;
use crate::stream::ReadStream;

pub const KTX_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];
const KTX_ENDIANESS: u32 = 0x04030201;

// GL enums used by the format table.
const GL_BYTE: u32 = 0x1400;
const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_SHORT: u32 = 0x1402;
const GL_UNSIGNED_SHORT: u32 = 0x1403;
const GL_INT: u32 = 0x1404;
const GL_UNSIGNED_INT: u32 = 0x1405;
const GL_FLOAT: u32 = 0x1406;
const GL_HALF_FLOAT: u32 = 0x140B;
const GL_UNSIGNED_INT_5_9_9_9_REV: u32 = 0x8C3E;

const GL_RED: u32 = 0x1903;
const GL_RG: u32 = 0x8227;
const GL_RGB: u32 = 0x1907;
const GL_RGBA: u32 = 0x1908;
const GL_RED_INTEGER: u32 = 0x8D94;
const GL_RG_INTEGER: u32 = 0x8228;
const GL_RGB_INTEGER: u32 = 0x8D98;
const GL_RGBA_INTEGER: u32 = 0x8D99;

const GL_R8: u32 = 0x8229;
const GL_RG8: u32 = 0x822B;
const GL_RGB8: u32 = 0x8051;
const GL_RGBA8: u32 = 0x8058;
const GL_SR8: u32 = 0x8FBD;
const GL_SRGB8: u32 = 0x8C41;
const GL_SRGB8_ALPHA8: u32 = 0x8C43;
const GL_R8_SNORM: u32 = 0x8F94;
const GL_RG8_SNORM: u32 = 0x8F95;
const GL_RGB8_SNORM: u32 = 0x8F96;
const GL_RGBA8_SNORM: u32 = 0x8F97;
const GL_R8I: u32 = 0x8231;
const GL_RG8I: u32 = 0x8237;
const GL_RGB8I: u32 = 0x8D8F;
const GL_RGBA8I: u32 = 0x8D8E;
const GL_R8UI: u32 = 0x8232;
const GL_RG8UI: u32 = 0x8238;
const GL_RGB8UI: u32 = 0x8D7D;
const GL_RGBA8UI: u32 = 0x8D7C;
const GL_R16: u32 = 0x822A;
const GL_RG16: u32 = 0x822C;
const GL_RGB16: u32 = 0x8054;
const GL_RGBA16: u32 = 0x805B;
const GL_R16F: u32 = 0x822D;
const GL_RG16F: u32 = 0x822F;
const GL_RGB16F: u32 = 0x881B;
const GL_RGBA16F: u32 = 0x881A;
const GL_R16_SNORM: u32 = 0x8F98;
const GL_RG16_SNORM: u32 = 0x8F99;
const GL_RGB16_SNORM: u32 = 0x8F9A;
const GL_R16I: u32 = 0x8233;
const GL_RG16I: u32 = 0x8239;
const GL_RGB16I: u32 = 0x8D89;
const GL_RGBA16I: u32 = 0x8D88;
const GL_R16UI: u32 = 0x8234;
const GL_RG16UI: u32 = 0x823A;
const GL_RGB16UI: u32 = 0x8D77;
const GL_RGBA16UI: u32 = 0x8D76;
const GL_R32F: u32 = 0x822E;
const GL_RG32F: u32 = 0x8230;
const GL_RGBA32F: u32 = 0x8814;
const GL_R32I: u32 = 0x8235;
const GL_RG32I: u32 = 0x823B;
const GL_RGB32I: u32 = 0x8D83;
const GL_RGBA32I: u32 = 0x8D82;
const GL_R32UI: u32 = 0x8236;
const GL_RG32UI: u32 = 0x823C;
const GL_RGB32UI: u32 = 0x8D71;
const GL_RGBA32UI: u32 = 0x8D70;
const GL_RGB9_E5: u32 = 0x8C3D;
const GL_COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;
const GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM: u32 = 0x8E8D;

struct FormatEntry {
    gl_internal: u32,
    gl_pixel_format: u32,
    gl_pixel_type: u32,
    format: Format,
}

const fn entry(gl_internal: u32, gl_pixel_format: u32, gl_pixel_type: u32, format: Format) -> FormatEntry {
    FormatEntry {
        gl_internal,
        gl_pixel_format,
        gl_pixel_type,
        format,
    }
}

const FORMAT_MAP: &[FormatEntry] = &[
    // 8bit
    entry(GL_R8, GL_RED, GL_UNSIGNED_BYTE, Format::R8Unorm),
    entry(GL_RG8, GL_RG, GL_UNSIGNED_BYTE, Format::R8G8Unorm),
    entry(GL_RGB8, GL_RGB, GL_UNSIGNED_BYTE, Format::R8G8B8Unorm),
    entry(GL_RGBA8, GL_RGBA, GL_UNSIGNED_BYTE, Format::R8G8B8A8Unorm),
    entry(GL_SR8, GL_RED, GL_UNSIGNED_BYTE, Format::R8Srgb),
    entry(GL_SRGB8, GL_RGB, GL_UNSIGNED_BYTE, Format::R8G8B8Srgb),
    entry(GL_SRGB8_ALPHA8, GL_RGBA, GL_UNSIGNED_BYTE, Format::R8G8B8A8Srgb),
    entry(GL_R8_SNORM, GL_RED, GL_BYTE, Format::R8Snorm),
    entry(GL_RG8_SNORM, GL_RG, GL_BYTE, Format::R8G8Snorm),
    entry(GL_RGB8_SNORM, GL_RGB, GL_BYTE, Format::R8G8B8Snorm),
    entry(GL_RGBA8_SNORM, GL_RGBA, GL_BYTE, Format::R8G8B8A8Snorm),
    entry(GL_R8I, GL_RED_INTEGER, GL_BYTE, Format::R8Sint),
    entry(GL_RG8I, GL_RG_INTEGER, GL_BYTE, Format::R8G8Sint),
    entry(GL_RGB8I, GL_RGB_INTEGER, GL_BYTE, Format::R8G8B8Sint),
    entry(GL_RGBA8I, GL_RGBA_INTEGER, GL_BYTE, Format::R8G8B8A8Sint),
    entry(GL_R8UI, GL_RED_INTEGER, GL_UNSIGNED_BYTE, Format::R8Uint),
    entry(GL_RG8UI, GL_RG_INTEGER, GL_UNSIGNED_BYTE, Format::R8G8Uint),
    entry(GL_RGB8UI, GL_RGB_INTEGER, GL_UNSIGNED_BYTE, Format::R8G8B8Uint),
    entry(GL_RGBA8UI, GL_RGBA_INTEGER, GL_UNSIGNED_BYTE, Format::R8G8B8A8Uint),
    // 16bit
    entry(GL_R16, GL_RED, GL_UNSIGNED_SHORT, Format::R16Unorm),
    entry(GL_RG16, GL_RG, GL_UNSIGNED_SHORT, Format::R16G16Unorm),
    entry(GL_RGB16, GL_RGB, GL_UNSIGNED_SHORT, Format::R16G16B16Unorm),
    entry(GL_RGBA16, GL_RGBA, GL_UNSIGNED_SHORT, Format::R16G16B16A16Unorm),
    entry(GL_R16F, GL_RED, GL_HALF_FLOAT, Format::R16Sfloat),
    entry(GL_RG16F, GL_RG, GL_HALF_FLOAT, Format::R16G16Sfloat),
    entry(GL_RGB16F, GL_RGB, GL_HALF_FLOAT, Format::R16G16B16Sfloat),
    entry(GL_RGBA16F, GL_RGBA, GL_HALF_FLOAT, Format::R16G16B16A16Sfloat),
    entry(GL_R16_SNORM, GL_RED, GL_SHORT, Format::R16Snorm),
    entry(GL_RG16_SNORM, GL_RG, GL_SHORT, Format::R16G16Snorm),
    entry(GL_RGB16_SNORM, GL_RGB, GL_SHORT, Format::R16G16B16Snorm),
    entry(GL_R16I, GL_RED_INTEGER, GL_SHORT, Format::R16Sint),
    entry(GL_RG16I, GL_RG_INTEGER, GL_SHORT, Format::R16G16Sint),
    entry(GL_RGB16I, GL_RGB_INTEGER, GL_SHORT, Format::R16G16B16Sint),
    entry(GL_RGBA16I, GL_RGBA_INTEGER, GL_SHORT, Format::R16G16B16A16Sint),
    entry(GL_R16UI, GL_RED_INTEGER, GL_UNSIGNED_SHORT, Format::R16Uint),
    entry(GL_RG16UI, GL_RG_INTEGER, GL_UNSIGNED_SHORT, Format::R16G16Uint),
    entry(GL_RGB16UI, GL_RGB_INTEGER, GL_UNSIGNED_SHORT, Format::R16G16B16Uint),
    entry(GL_RGBA16UI, GL_RGBA_INTEGER, GL_UNSIGNED_SHORT, Format::R16G16B16A16Uint),
    // 32bit
    entry(GL_R32F, GL_RED, GL_FLOAT, Format::R32Sfloat),
    entry(GL_RG32F, GL_RG, GL_FLOAT, Format::R32G32Sfloat),
    entry(GL_RGBA32F, GL_RGBA, GL_FLOAT, Format::R32G32B32A32Sfloat),
    entry(GL_R32I, GL_RED_INTEGER, GL_INT, Format::R32Sint),
    entry(GL_RG32I, GL_RG_INTEGER, GL_INT, Format::R32G32Sint),
    entry(GL_RGB32I, GL_RGB_INTEGER, GL_INT, Format::R32G32B32Sint),
    entry(GL_RGBA32I, GL_RGBA_INTEGER, GL_INT, Format::R32G32B32A32Sint),
    entry(GL_R32UI, GL_RED_INTEGER, GL_UNSIGNED_INT, Format::R32Uint),
    entry(GL_RG32UI, GL_RG_INTEGER, GL_UNSIGNED_INT, Format::R32G32Uint),
    entry(GL_RGB32UI, GL_RGB_INTEGER, GL_UNSIGNED_INT, Format::R32G32B32Uint),
    entry(GL_RGBA32UI, GL_RGBA_INTEGER, GL_UNSIGNED_INT, Format::R32G32B32A32Uint),
    entry(GL_RGB9_E5, GL_RGB, GL_UNSIGNED_INT_5_9_9_9_REV, Format::E5B9G9R9UfloatPack32),
    entry(GL_COMPRESSED_RGBA_BPTC_UNORM, GL_RGBA, 0, Format::Bc7UnormBlock),
    entry(GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM, GL_RGBA, 0, Format::Bc7SrgbBlock),
];

fn format_from_gl(gl_internal: u32) -> Format {
    FORMAT_MAP
        .iter()
        .find(|entry| entry.gl_internal == gl_internal)
        .map(|entry| entry.format)
        .unwrap_or(Format::Undefined)
}

pub struct KtxHeader {
    /// Must contain 0x04030201 in the file's own byte order.
    pub endianness: u32,
    pub gl_type: u32,
    pub gl_type_size: u32,
    pub gl_format: u32,
    pub gl_internal_format: u32,
    pub gl_base_internal_format: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixel_depth: u32,
    /// 0 for non-array textures.
    pub number_array_elements: u32,
    /// 6 for cubemaps, otherwise 1 (0 is treated as 1).
    pub number_faces: u32,
    /// 0 asks the loader to generate mipmaps.
    pub number_mipmap_levels: u32,
    pub bytes_key_value_data: u32,
}

impl KtxHeader {
    fn read<R: ReadStream>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            endianness: reader.read_u32()?,
            gl_type: reader.read_u32()?,
            gl_type_size: reader.read_u32()?,
            gl_format: reader.read_u32()?,
            gl_internal_format: reader.read_u32()?,
            gl_base_internal_format: reader.read_u32()?,
            pixel_width: reader.read_u32()?,
            pixel_height: reader.read_u32()?,
            pixel_depth: reader.read_u32()?,
            number_array_elements: reader.read_u32()?,
            number_faces: reader.read_u32()?,
            number_mipmap_levels: reader.read_u32()?,
            bytes_key_value_data: reader.read_u32()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32(self.endianness)?;
        writer.write_u32(self.gl_type)?;
        writer.write_u32(self.gl_type_size)?;
        writer.write_u32(self.gl_format)?;
        writer.write_u32(self.gl_internal_format)?;
        writer.write_u32(self.gl_base_internal_format)?;
        writer.write_u32(self.pixel_width)?;
        writer.write_u32(self.pixel_height)?;
        writer.write_u32(self.pixel_depth)?;
        writer.write_u32(self.number_array_elements)?;
        writer.write_u32(self.number_faces)?;
        writer.write_u32(self.number_mipmap_levels)?;
        writer.write_u32(self.bytes_key_value_data)
    }
}

/// Provider over a parsed KTX1 stream. Face data is read lazily on demand.
#[derive(Debug)]
pub struct KtxTexture<R: ReadStream> {
    stream: R,
    format: Format,
    size: Extent3,
    mip_levels: u32,
    faces: u32,
    /// 0 for non-array textures; changes the meaning of imageSize.
    array_elements: u32,
    data_begin: u64,
    scratch: Vec<u8>,
}

impl<R: ReadStream> KtxTexture<R> {
    fn offset(&mut self, mip: u32, layer: u32) -> Result<u64, ReadError> {
        debug_assert!(mip < self.mip_levels);
        debug_assert!(layer < self.layers());

        let mut address = self.data_begin;
        for i in 0..mip {
            #[cfg(debug_assertions)]
            self.verify_image_size(address, i)?;

            let face_size = align_up_64(size_bytes(self.size, i, self.format), 4);
            let mip_size = align_up_64(self.layers() as u64 * face_size, 4);
            address += 4 + mip_size;
        }

        #[cfg(debug_assertions)]
        self.verify_image_size(address, mip)?;

        let face_size = align_up_64(size_bytes(self.size, mip, self.format), 4);
        Ok(address + 4 + layer as u64 * face_size)
    }

    // Each mip is preceded by its imageSize field; make sure the file agrees
    // with our addressing.
    #[cfg(debug_assertions)]
    fn verify_image_size(&mut self, address: u64, mip: u32) -> Result<(), ReadError> {
        let byte_size = size_bytes(self.size, mip, self.format);
        let expected = if self.array_elements == 0 && self.faces == 6 {
            // ktx special cubemap case: imageSize holds only one face
            byte_size
        } else {
            self.layers() as u64 * align_up_64(byte_size, 4)
        };

        self.stream.seek(SeekFrom::Start(address))?;
        let image_size = self.stream.read_u32()?;
        if image_size as u64 != expected {
            log::error!("ktx: unexpected imageSize {image_size}, expected {expected}");
            return Err(ReadError::InvalidType);
        }
        Ok(())
    }
}

impl<R: ReadStream> ImageProvider for KtxTexture<R> {
    fn size(&self) -> Extent3 {
        self.size
    }

    fn format(&self) -> Format {
        self.format
    }

    fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    fn layers(&self) -> u32 {
        (self.faces * self.array_elements.max(1)).max(1)
    }

    fn cubemap(&self) -> bool {
        self.faces == 6
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
        let byte_size = self.face_size(mip) as usize;
        assert!(buf.len() >= byte_size);

        let address = self.offset(mip, layer)?;
        self.stream.seek(SeekFrom::Start(address))?;
        self.stream.read_exact(&mut buf[..byte_size])?;
        Ok(byte_size as u64)
    }
}

/// Parses a KTX1 stream. Takes ownership of the stream only on success.
pub fn load_ktx<R: ReadStream>(mut stream: R) -> Result<KtxTexture<R>, (ReadError, R)> {
    match parse_ktx(&mut stream) {
        Ok(parsed) => Ok(KtxTexture {
            stream,
            format: parsed.format,
            size: parsed.size,
            mip_levels: parsed.mip_levels,
            faces: parsed.faces,
            array_elements: parsed.array_elements,
            data_begin: parsed.data_begin,
            scratch: Vec::new(),
        }),
        Err(err) => Err((err, stream)),
    }
}

struct ParsedKtx {
    format: Format,
    size: Extent3,
    mip_levels: u32,
    faces: u32,
    array_elements: u32,
    data_begin: u64,
}

fn parse_ktx<R: ReadStream>(stream: &mut R) -> Result<ParsedKtx, ReadError> {
    let mut identifier = [0u8; 12];
    stream.read_exact(&mut identifier)?;
    if identifier != KTX_IDENTIFIER {
        return Err(ReadError::InvalidType);
    }

    let header = KtxHeader::read(stream)?;
    if header.endianness != KTX_ENDIANESS {
        // the file was written in non-native endianess, don't bother
        log::debug!("ktx: invalid endianess {:#x}", header.endianness);
        return Err(ReadError::InvalidEndianess);
    }

    if header.pixel_depth > 1 && (header.number_faces > 1 || header.number_array_elements > 1) {
        log::warn!(
            "ktx: 3d image with faces/layers unsupported: size {} {} {}, layers {}, faces {}",
            header.pixel_width,
            header.pixel_height,
            header.pixel_depth,
            header.number_array_elements,
            header.number_faces
        );
        return Err(ReadError::CantRepresent);
    }

    if header.pixel_width == 0 {
        return Err(ReadError::Empty);
    }

    let format = format_from_gl(header.gl_internal_format);
    if format == Format::Undefined {
        log::warn!("ktx: unsupported glInternalFormat {:#x}", header.gl_internal_format);
        return Err(ReadError::UnsupportedFormat);
    }

    // NOTE: numberMipmapLevels == 0 asks the loader to generate mipmaps. In
    // the end the application knows whether it wants mipmaps, so treat the
    // file as single-level.
    let mip_levels = header.number_mipmap_levels.max(1);
    let faces = header.number_faces.max(1);
    let size = Extent3::new(
        header.pixel_width,
        header.pixel_height.max(1),
        header.pixel_depth.max(1),
    );

    let keys_pos = stream.stream_position()?;
    walk_key_values(stream, header.bytes_key_value_data)?;

    Ok(ParsedKtx {
        format,
        size,
        mip_levels,
        faces,
        // keep 0 as-is, it changes the imageSize convention
        array_elements: header.number_array_elements,
        data_begin: keys_pos + header.bytes_key_value_data as u64,
    })
}

fn walk_key_values<R: ReadStream>(stream: &mut R, total_bytes: u32) -> Result<(), ReadError> {
    let mut bytes_read = 0u64;
    while bytes_read < total_bytes as u64 {
        let byte_size = stream.read_u32()?;
        if bytes_read + 4 + byte_size as u64 > total_bytes as u64 {
            log::warn!("ktx: key/value pair overruns the declared block");
            return Err(ReadError::UnexpectedEnd);
        }
        let pair = stream.read_data_exact(align_up_64(byte_size as u64, 4) as usize)?;
        bytes_read += 4 + pair.len() as u64;

        let Some(sep) = pair[..byte_size as usize].iter().position(|&b| b == 0) else {
            log::warn!("ktx: key/value pair without null separator");
            continue;
        };
        let key = String::from_utf8_lossy(&pair[..sep]);
        let value = &pair[sep + 1..byte_size as usize];
        if value.len() > 50 {
            log::debug!("ktx: key/value pair: {key} = <too long to print>");
        } else {
            log::debug!("ktx: key/value pair: {key} = {}", String::from_utf8_lossy(value));
        }
    }
    Ok(())
}

/// Writes the image as KTX1. Emits faces in (array element, face) order
/// with 4-byte padding after each face and after each mip block.
pub fn write_ktx<W: Write + Seek>(
    writer: &mut W,
    image: &mut dyn ImageProvider,
) -> Result<(), WriteError> {
    let format = image.format();
    let size = image.size();
    let mips = image.mip_levels().max(1);
    let mut layers = image.layers().max(1);
    let mut faces = 1u32;
    if image.cubemap() {
        debug_assert!(layers % 6 == 0);
        faces = 6;
        layers /= 6;
    }

    let entry = FORMAT_MAP
        .iter()
        .find(|entry| entry.format == format)
        .ok_or(WriteError::UnsupportedFormat)?;

    // glFormat and glBaseInternalFormat agree since the data is unswizzled;
    // compressed formats leave glType and glFormat zero.
    let header = KtxHeader {
        endianness: KTX_ENDIANESS,
        gl_type: entry.gl_pixel_type,
        gl_type_size: format.element_size(),
        gl_format: if entry.gl_pixel_type == 0 { 0 } else { entry.gl_pixel_format },
        gl_internal_format: entry.gl_internal,
        gl_base_internal_format: entry.gl_pixel_format,
        pixel_width: size.x,
        pixel_height: if size.y > 1 { size.y } else { 0 },
        pixel_depth: if size.z > 1 { size.z } else { 0 },
        number_array_elements: if layers > 1 { layers } else { 0 },
        number_faces: faces,
        number_mipmap_levels: mips,
        bytes_key_value_data: 0,
    };

    writer.write_all(&KTX_IDENTIFIER)?;
    header.write(writer)?;

    let zero = [0u8; 4];
    let mut off = (KTX_IDENTIFIER.len() + 13 * 4) as u64;
    for mip in 0..mips {
        let face_size = size_bytes(size, mip, format);

        // ktx exception: for cubemaps without array elements, imageSize
        // holds the size of one face instead of the whole level.
        let image_size = if header.number_array_elements == 0 && image.cubemap() {
            face_size
        } else {
            align_up_64(face_size, 4) * layers as u64 * faces as u64
        };
        writer.write_u32(image_size as u32)?;
        off += 4;

        for layer in 0..layers {
            for face in 0..faces {
                let data = image.read(mip, layer * faces + face)?;
                if data.len() as u64 != face_size {
                    log::debug!(
                        "ktx: invalid provider read size, got {}, expected {}",
                        data.len(),
                        face_size
                    );
                    return Err(WriteError::ReadError);
                }

                writer.write_all(data)?;
                off += data.len() as u64;

                let padding = align_up_64(off, 4) - off;
                if padding > 0 {
                    writer.write_all(&zero[..padding as usize])?;
                    off += padding;
                }
            }
        }

        let padding = align_up_64(off, 4) - off;
        if padding > 0 {
            writer.write_all(&zero[..padding as usize])?;
            off += padding;
        }
    }

    Ok(())
}

pub fn write_ktx_path(
    path: impl AsRef<Path>,
    image: &mut dyn ImageProvider,
) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|err| {
        log::debug!("ktx: create: {err}");
        WriteError::CantOpen
    })?;
    let mut writer = std::io::BufWriter::new(file);
    write_ktx(&mut writer, image)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{wrap, wrap_faces, ImageData};
    use crate::stream::MemoryStream;
    use std::io::Cursor;

    fn roundtrip(provider: &mut dyn ImageProvider) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_ktx(&mut cursor, provider).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn single_texel_file_layout() {
        let mut provider = wrap(ImageData {
            size: Extent3::new(1, 1, 1),
            format: Format::R8G8B8A8Unorm,
            data: vec![0x11, 0x22, 0x33, 0x44].into_boxed_slice(),
        });
        let bytes = roundtrip(provider.as_mut());
        // magic + header + imageSize + one face, no padding
        assert_eq!(bytes.len(), 12 + 52 + 4 + 4);
        assert_eq!(&bytes[..12], &KTX_IDENTIFIER);
        assert_eq!(&bytes[68..], &[0x11, 0x22, 0x33, 0x44]);

        let mut texture = load_ktx(MemoryStream::new(bytes)).map_err(|(e, _)| e).unwrap();
        assert_eq!(texture.size(), Extent3::new(1, 1, 1));
        assert_eq!(texture.format(), Format::R8G8B8A8Unorm);
        assert_eq!(texture.mip_levels(), 1);
        assert_eq!(texture.layers(), 1);
        assert!(!texture.cubemap());
        assert_eq!(texture.read(0, 0).unwrap(), &[0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn mips_and_layers_roundtrip() {
        let faces: Vec<Box<[u8]>> = (0..6u8)
            .map(|i| {
                let len = if i < 3 { 8 } else { 2 };
                vec![i; len].into_boxed_slice()
            })
            .collect();
        let mut provider = wrap_faces(
            Extent3::new(2, 2, 1),
            Format::R8G8Unorm,
            2,
            3,
            faces,
            false,
        );

        let bytes = roundtrip(provider.as_mut());
        let mut texture = load_ktx(MemoryStream::new(bytes)).map_err(|(e, _)| e).unwrap();
        assert_eq!(texture.layers(), 3);
        assert_eq!(texture.mip_levels(), 2);
        for mip in 0..2u8 {
            for layer in 0..3u8 {
                let expected = vec![mip * 3 + layer; if mip == 0 { 8 } else { 2 }];
                assert_eq!(texture.read(mip as u32, layer as u32).unwrap(), &expected[..]);
            }
        }
    }

    #[test]
    fn cubemap_image_size_convention() {
        let faces: Vec<Box<[u8]>> = (0..6u8).map(|i| vec![i; 4].into_boxed_slice()).collect();
        let mut provider = wrap_faces(
            Extent3::new(1, 1, 1),
            Format::R8G8B8A8Unorm,
            1,
            6,
            faces,
            true,
        );
        let bytes = roundtrip(provider.as_mut());

        // no array elements, so the imageSize field covers a single face
        let image_size = u32::from_le_bytes(bytes[64..68].try_into().unwrap());
        assert_eq!(image_size, 4);

        let mut texture = load_ktx(MemoryStream::new(bytes)).map_err(|(e, _)| e).unwrap();
        assert!(texture.cubemap());
        assert_eq!(texture.layers(), 6);
        assert_eq!(texture.read(0, 4).unwrap(), &[4u8; 4]);
    }

    #[test]
    fn rejects_foreign_bytes() {
        let err = load_ktx(MemoryStream::new(vec![0u8; 64])).err().unwrap().0;
        assert_eq!(err, ReadError::InvalidType);

        let mut truncated = KTX_IDENTIFIER.to_vec();
        truncated.extend_from_slice(&[0u8; 8]);
        let err = load_ktx(MemoryStream::new(truncated)).err().unwrap().0;
        assert_eq!(err, ReadError::UnexpectedEnd);
    }

    #[test]
    fn rejects_wrong_endianess() {
        let mut provider = wrap(ImageData {
            size: Extent3::new(1, 1, 1),
            format: Format::R8Unorm,
            data: vec![0xFF].into_boxed_slice(),
        });
        let mut bytes = roundtrip(provider.as_mut());
        // flip the endianness field
        bytes[12..16].copy_from_slice(&0x01020304u32.to_le_bytes());
        let err = load_ktx(MemoryStream::new(bytes)).err().unwrap().0;
        assert_eq!(err, ReadError::InvalidEndianess);
    }

    #[test]
    fn rejects_layered_3d() {
        let mut provider = wrap(ImageData {
            size: Extent3::new(1, 1, 1),
            format: Format::R8Unorm,
            data: vec![0xFF].into_boxed_slice(),
        });
        let mut bytes = roundtrip(provider.as_mut());
        // pixelDepth = 2, numberArrayElements = 2
        bytes[44..48].copy_from_slice(&2u32.to_le_bytes());
        bytes[48..52].copy_from_slice(&2u32.to_le_bytes());
        let err = load_ktx(MemoryStream::new(bytes)).err().unwrap().0;
        assert_eq!(err, ReadError::CantRepresent);
    }
}
