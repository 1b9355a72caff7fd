//! Per-texel decode/encode for the uncompressed part of the format space.
//!
//! Values travel as rgba `[f64; 4]` in linear space. Reads and writes advance
//! a rolling byte cursor so whole rows can be streamed texel by texel.
//!
//! Not supported here (the caller gets an error): block-compressed formats,
//! `B10G11R11UfloatPack32` and anything outside the `Format` enum.

use std::io::{Read, Write};

use half::f16;
use io_util::{PrimitiveRead, PrimitiveWrite};

use crate::format::{e5b9g9r9_from_rgb, e5b9g9r9_to_rgb, Format};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TexelError {
    #[error("format {0:?} is not supported for cpu texel i/o")]
    UnsupportedFormat(Format),
    #[error("texel cursor ended before the full element")]
    UnexpectedEnd,
}

/// Exact sRGB transfer function, not a pow(2.2) approximation.
pub fn linear_to_srgb(linear: f64) -> f64 {
    if linear < 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

pub fn srgb_to_linear(srgb: f64) -> f64 {
    if srgb < 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

/// Component-wise over rgb, alpha stays linear as per vulkan.
pub fn linear_to_srgb_rgba(mut v: [f64; 4]) -> [f64; 4] {
    v[0] = linear_to_srgb(v[0]);
    v[1] = linear_to_srgb(v[1]);
    v[2] = linear_to_srgb(v[2]);
    v
}

pub fn srgb_to_linear_rgba(mut v: [f64; 4]) -> [f64; 4] {
    v[0] = srgb_to_linear(v[0]);
    v[1] = srgb_to_linear(v[1]);
    v[2] = srgb_to_linear(v[2]);
    v
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F16,
    F32,
    F64,
}

impl Scalar {
    fn read(self, src: &mut &[u8]) -> Result<f64, TexelError> {
        let eof = |_| TexelError::UnexpectedEnd;
        Ok(match self {
            Scalar::U8 => src.read_u8().map_err(eof)? as f64,
            Scalar::I8 => src.read_i8().map_err(eof)? as f64,
            Scalar::U16 => src.read_u16().map_err(eof)? as f64,
            Scalar::I16 => src.read_i16().map_err(eof)? as f64,
            Scalar::U32 => src.read_u32().map_err(eof)? as f64,
            Scalar::I32 => src.read_i32().map_err(eof)? as f64,
            Scalar::U64 => src.read_u64().map_err(eof)? as f64,
            Scalar::I64 => src.read_i64().map_err(eof)? as f64,
            Scalar::F16 => f16::from_bits(src.read_u16().map_err(eof)?).to_f64(),
            Scalar::F32 => src.read_f32().map_err(eof)? as f64,
            Scalar::F64 => src.read_f64().map_err(eof)?,
        })
    }

    // Casts saturate on overflow, integer casts truncate toward zero.
    fn write(self, dst: &mut &mut [u8], value: f64) -> Result<(), TexelError> {
        let eof = |_| TexelError::UnexpectedEnd;
        match self {
            Scalar::U8 => dst.write_u8(value as u8).map_err(eof),
            Scalar::I8 => dst.write_i8(value as i8).map_err(eof),
            Scalar::U16 => dst.write_u16(value as u16).map_err(eof),
            Scalar::I16 => dst.write_i16(value as i16).map_err(eof),
            Scalar::U32 => dst.write_u32(value as u32).map_err(eof),
            Scalar::I32 => dst.write_i32(value as i32).map_err(eof),
            Scalar::U64 => dst.write_u64(value as u64).map_err(eof),
            Scalar::I64 => dst.write_i64(value as i64).map_err(eof),
            Scalar::F16 => dst
                .write_u16(f16::from_f64(value).to_bits())
                .map_err(eof),
            Scalar::F32 => dst.write_f32(value as f32).map_err(eof),
            Scalar::F64 => dst.write_f64(value).map_err(eof),
        }
    }
}

/// Numerical interpretation of a packed bitfield, VkFormat naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackKind {
    Unorm,
    Snorm,
    Uscaled,
    Sscaled,
    Uint,
    Sint,
    Srgb,
}

impl PackKind {
    fn normalized(self) -> bool {
        matches!(self, PackKind::Unorm | PackKind::Snorm | PackKind::Srgb)
    }

    fn signed(self) -> bool {
        matches!(self, PackKind::Snorm | PackKind::Sint | PackKind::Sscaled)
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// N components of one scalar type, value = raw / divisor.
    Unpacked {
        comps: u32,
        ty: Scalar,
        divisor: f64,
    },
    /// A little-endian word holding bitfields, first width in the top bits.
    Packed {
        bits: &'static [u32],
        kind: PackKind,
    },
    D16S8,
    D24S8,
    D32S8,
    X8D24,
    SharedExponent,
}

/// On-disk channel order, as an index permutation into rgba.
#[derive(Debug, Clone, Copy)]
enum Swizzle {
    Rgba,
    Bgra,
    Abgr,
    Argb,
}

impl Swizzle {
    const fn indices(self) -> [usize; 4] {
        match self {
            Swizzle::Rgba => [0, 1, 2, 3],
            Swizzle::Bgra => [2, 1, 0, 3],
            Swizzle::Abgr => [3, 2, 1, 0],
            Swizzle::Argb => [1, 2, 3, 0],
        }
    }

    /// Disk order -> rgba, applied after reading.
    fn apply(self, x: [f64; 4]) -> [f64; 4] {
        let idx = self.indices();
        [x[idx[0]], x[idx[1]], x[idx[2]], x[idx[3]]]
    }

    /// rgba -> disk order, applied before writing.
    fn apply_reverse(self, x: [f64; 4]) -> [f64; 4] {
        let idx = self.indices();
        let mut ret = [0.0; 4];
        ret[idx[0]] = x[0];
        ret[idx[1]] = x[1];
        ret[idx[2]] = x[2];
        ret[idx[3]] = x[3];
        ret
    }
}

fn layout(format: Format) -> Option<Layout> {
    use Format::*;
    use PackKind as K;
    use Scalar::*;

    const fn unpacked(comps: u32, ty: Scalar, divisor: f64) -> Layout {
        Layout::Unpacked { comps, ty, divisor }
    }
    const fn packed(bits: &'static [u32], kind: PackKind) -> Layout {
        Layout::Packed { bits, kind }
    }

    Some(match format {
        R16Sfloat => unpacked(1, F16, 1.0),
        R16G16Sfloat => unpacked(2, F16, 1.0),
        R16G16B16Sfloat => unpacked(3, F16, 1.0),
        R16G16B16A16Sfloat => unpacked(4, F16, 1.0),

        R32Sfloat => unpacked(1, F32, 1.0),
        R32G32Sfloat => unpacked(2, F32, 1.0),
        R32G32B32Sfloat => unpacked(3, F32, 1.0),
        R32G32B32A32Sfloat => unpacked(4, F32, 1.0),

        R64Sfloat => unpacked(1, F64, 1.0),
        R64G64Sfloat => unpacked(2, F64, 1.0),
        R64G64B64Sfloat => unpacked(3, F64, 1.0),
        R64G64B64A64Sfloat => unpacked(4, F64, 1.0),

        R8Unorm => unpacked(1, U8, 255.0),
        R8G8Unorm => unpacked(2, U8, 255.0),
        R8G8B8Unorm | B8G8R8Unorm => unpacked(3, U8, 255.0),
        R8G8B8A8Unorm | B8G8R8A8Unorm => unpacked(4, U8, 255.0),

        R8Srgb => unpacked(1, U8, 255.0),
        R8G8Srgb => unpacked(2, U8, 255.0),
        R8G8B8Srgb | B8G8R8Srgb => unpacked(3, U8, 255.0),
        R8G8B8A8Srgb | B8G8R8A8Srgb => unpacked(4, U8, 255.0),

        R16Unorm => unpacked(1, U16, 65535.0),
        R16G16Unorm => unpacked(2, U16, 65535.0),
        R16G16B16Unorm => unpacked(3, U16, 65535.0),
        R16G16B16A16Unorm => unpacked(4, U16, 65535.0),

        R8Snorm => unpacked(1, I8, 127.0),
        R8G8Snorm => unpacked(2, I8, 127.0),
        R8G8B8Snorm | B8G8R8Snorm => unpacked(3, I8, 127.0),
        R8G8B8A8Snorm | B8G8R8A8Snorm => unpacked(4, I8, 127.0),

        R16Snorm => unpacked(1, I16, 32767.0),
        R16G16Snorm => unpacked(2, I16, 32767.0),
        R16G16B16Snorm => unpacked(3, I16, 32767.0),
        R16G16B16A16Snorm => unpacked(4, I16, 32767.0),

        R8Uscaled | R8Uint => unpacked(1, U8, 1.0),
        R8G8Uscaled | R8G8Uint => unpacked(2, U8, 1.0),
        R8G8B8Uscaled | R8G8B8Uint | B8G8R8Uscaled | B8G8R8Uint => unpacked(3, U8, 1.0),
        R8G8B8A8Uscaled | R8G8B8A8Uint | B8G8R8A8Uscaled | B8G8R8A8Uint => {
            unpacked(4, U8, 1.0)
        }

        R16Uscaled | R16Uint => unpacked(1, U16, 1.0),
        R16G16Uscaled | R16G16Uint => unpacked(2, U16, 1.0),
        R16G16B16Uscaled | R16G16B16Uint => unpacked(3, U16, 1.0),
        R16G16B16A16Uscaled | R16G16B16A16Uint => unpacked(4, U16, 1.0),

        R32Uint => unpacked(1, U32, 1.0),
        R32G32Uint => unpacked(2, U32, 1.0),
        R32G32B32Uint => unpacked(3, U32, 1.0),
        R32G32B32A32Uint => unpacked(4, U32, 1.0),

        R8Sscaled | R8Sint => unpacked(1, I8, 1.0),
        R8G8Sscaled | R8G8Sint => unpacked(2, I8, 1.0),
        R8G8B8Sscaled | R8G8B8Sint | B8G8R8Sscaled | B8G8R8Sint => unpacked(3, I8, 1.0),
        R8G8B8A8Sscaled | R8G8B8A8Sint | B8G8R8A8Sscaled | B8G8R8A8Sint => {
            unpacked(4, I8, 1.0)
        }

        R16Sscaled | R16Sint => unpacked(1, I16, 1.0),
        R16G16Sscaled | R16G16Sint => unpacked(2, I16, 1.0),
        R16G16B16Sscaled | R16G16B16Sint => unpacked(3, I16, 1.0),
        R16G16B16A16Sscaled | R16G16B16A16Sint => unpacked(4, I16, 1.0),

        R32Sint => unpacked(1, I32, 1.0),
        R32G32Sint => unpacked(2, I32, 1.0),
        R32G32B32Sint => unpacked(3, I32, 1.0),
        R32G32B32A32Sint => unpacked(4, I32, 1.0),

        // precision for 64-bit integer formats can be problematic
        R64Uint => unpacked(1, U64, 1.0),
        R64G64Uint => unpacked(2, U64, 1.0),
        R64G64B64Uint => unpacked(3, U64, 1.0),
        R64G64B64A64Uint => unpacked(4, U64, 1.0),
        R64Sint => unpacked(1, I64, 1.0),
        R64G64Sint => unpacked(2, I64, 1.0),
        R64G64B64Sint => unpacked(3, I64, 1.0),
        R64G64B64A64Sint => unpacked(4, I64, 1.0),

        R4G4UnormPack8 => packed(&[4, 4], K::Unorm),
        R4G4B4A4UnormPack16 | B4G4R4A4UnormPack16 => packed(&[4, 4, 4, 4], K::Unorm),
        A4R4G4B4UnormPack16Ext | A4B4G4R4UnormPack16Ext => packed(&[4, 4, 4, 4], K::Unorm),
        R5G6B5UnormPack16 | B5G6R5UnormPack16 => packed(&[5, 6, 5], K::Unorm),
        R5G5B5A1UnormPack16 | B5G5R5A1UnormPack16 => packed(&[5, 5, 5, 1], K::Unorm),
        A1R5G5B5UnormPack16 => packed(&[1, 5, 5, 5], K::Unorm),

        A8B8G8R8UnormPack32 => packed(&[8, 8, 8, 8], K::Unorm),
        A8B8G8R8SnormPack32 => packed(&[8, 8, 8, 8], K::Snorm),
        A8B8G8R8UscaledPack32 => packed(&[8, 8, 8, 8], K::Uscaled),
        A8B8G8R8SscaledPack32 => packed(&[8, 8, 8, 8], K::Sscaled),
        A8B8G8R8UintPack32 => packed(&[8, 8, 8, 8], K::Uint),
        A8B8G8R8SintPack32 => packed(&[8, 8, 8, 8], K::Sint),
        A8B8G8R8SrgbPack32 => packed(&[8, 8, 8, 8], K::Srgb),

        A2R10G10B10UnormPack32 | A2B10G10R10UnormPack32 => packed(&[2, 10, 10, 10], K::Unorm),
        A2R10G10B10SnormPack32 | A2B10G10R10SnormPack32 => packed(&[2, 10, 10, 10], K::Snorm),
        A2R10G10B10UscaledPack32 | A2B10G10R10UscaledPack32 => {
            packed(&[2, 10, 10, 10], K::Uscaled)
        }
        A2R10G10B10SscaledPack32 | A2B10G10R10SscaledPack32 => {
            packed(&[2, 10, 10, 10], K::Sscaled)
        }
        A2R10G10B10UintPack32 | A2B10G10R10UintPack32 => packed(&[2, 10, 10, 10], K::Uint),
        A2R10G10B10SintPack32 | A2B10G10R10SintPack32 => packed(&[2, 10, 10, 10], K::Sint),

        S8Uint => unpacked(1, U8, 1.0),
        D16Unorm => unpacked(1, U16, 65535.0),
        D32Sfloat => unpacked(1, F32, 1.0),
        D16UnormS8Uint => Layout::D16S8,
        D24UnormS8Uint => Layout::D24S8,
        D32SfloatS8Uint => Layout::D32S8,
        X8D24UnormPack32 => Layout::X8D24,

        E5B9G9R9UfloatPack32 => Layout::SharedExponent,

        _ => return None,
    })
}

fn swizzle_for(format: Format) -> Swizzle {
    use Format::*;
    match format {
        B8G8R8Unorm | B8G8R8Snorm | B8G8R8Uscaled | B8G8R8Sscaled | B8G8R8Uint | B8G8R8Sint
        | B8G8R8Srgb | B8G8R8A8Unorm | B8G8R8A8Snorm | B8G8R8A8Uscaled | B8G8R8A8Sscaled
        | B8G8R8A8Uint | B8G8R8A8Sint | B8G8R8A8Srgb | B5G5R5A1UnormPack16
        | B5G6R5UnormPack16 | B4G4R4A4UnormPack16 => Swizzle::Bgra,

        A8B8G8R8UnormPack32 | A8B8G8R8SnormPack32 | A8B8G8R8UscaledPack32
        | A8B8G8R8SscaledPack32 | A8B8G8R8UintPack32 | A8B8G8R8SintPack32
        | A8B8G8R8SrgbPack32 | A2B10G10R10UnormPack32 | A2B10G10R10SnormPack32
        | A2B10G10R10UscaledPack32 | A2B10G10R10SscaledPack32 | A2B10G10R10UintPack32
        | A2B10G10R10SintPack32 | A4B4G4R4UnormPack16Ext => Swizzle::Abgr,

        A2R10G10B10UnormPack32 | A2R10G10B10SnormPack32 | A2R10G10B10UscaledPack32
        | A2R10G10B10SscaledPack32 | A2R10G10B10UintPack32 | A2R10G10B10SintPack32
        | A1R5G5B5UnormPack16 | A4R4G4B4UnormPack16Ext => Swizzle::Argb,

        _ => Swizzle::Rgba,
    }
}

fn read_packed_word(src: &mut &[u8], total_bits: u32) -> Result<u32, TexelError> {
    let eof = |_| TexelError::UnexpectedEnd;
    Ok(match total_bits {
        8 => src.read_u8().map_err(eof)? as u32,
        16 => src.read_u16().map_err(eof)? as u32,
        32 => src.read_u32().map_err(eof)?,
        _ => unreachable!("only 8/16/32 bit packed formats exist"),
    })
}

fn write_packed_word(dst: &mut &mut [u8], total_bits: u32, word: u32) -> Result<(), TexelError> {
    let eof = |_| TexelError::UnexpectedEnd;
    match total_bits {
        8 => dst.write_u8(word as u8).map_err(eof),
        16 => dst.write_u16(word as u16).map_err(eof),
        32 => dst.write_u32(word).map_err(eof),
        _ => unreachable!("only 8/16/32 bit packed formats exist"),
    }
}

fn read_packed(src: &mut &[u8], bits: &[u32], kind: PackKind) -> Result<[f64; 4], TexelError> {
    let total: u32 = bits.iter().sum();
    let word = read_packed_word(src, total)?;

    let mut out = [0.0f64; 4];
    let mut shift = total;
    for (i, &width) in bits.iter().enumerate() {
        shift -= width;
        let limit = 1u32 << width;
        let mut max = limit - 1;
        let raw = (word >> shift) & max;

        let mut value = raw as f64;
        if kind.signed() {
            let half = limit / 2;
            value -= half as f64;
            max = half - 1;
        }
        if kind.normalized() {
            value /= max as f64;
        }
        out[i] = value;
    }

    Ok(out)
}

fn write_packed(
    dst: &mut &mut [u8],
    bits: &[u32],
    kind: PackKind,
    color: [f64; 4],
) -> Result<(), TexelError> {
    let total: u32 = bits.iter().sum();
    let mut word = 0u32;
    for (i, &width) in bits.iter().enumerate() {
        let limit = 1u64 << width;
        let max = (limit - 1) as u32;

        let mut value = color[i];
        if kind.normalized() {
            let scale = if kind.signed() { limit / 2 - 1 } else { limit - 1 };
            value *= scale as f64;
        }
        if kind.signed() {
            value += (limit / 2) as f64;
        }
        if kind.normalized() {
            value += 0.5;
        }

        let quantized = (value.clamp(0.0, max as f64)) as u32;
        word = (word << width) | (quantized & max);
    }

    write_packed_word(dst, total, word)
}

fn quantize(value: f64, divisor: f64, normalized: bool) -> f64 {
    // Normalized encodes round to nearest so that the sRGB transfer pair
    // stays idempotent; integer casts truncate toward zero.
    let scaled = divisor * value;
    if normalized {
        if scaled < 0.0 {
            scaled - 0.5
        } else {
            scaled + 0.5
        }
    } else {
        scaled
    }
}

/// Reads a single texel from `src`, advancing the cursor by the element
/// size, and returns it as linear rgba. Components the format does not
/// store are zero.
pub fn read(format: Format, src: &mut &[u8]) -> Result<[f64; 4], TexelError> {
    let layout = layout(format).ok_or(TexelError::UnsupportedFormat(format))?;
    let eof = |_| TexelError::UnexpectedEnd;

    let value = match layout {
        Layout::Unpacked { comps, ty, divisor } => {
            let mut out = [0.0f64; 4];
            for slot in out.iter_mut().take(comps as usize) {
                *slot = ty.read(src)? / divisor;
            }
            out
        }
        Layout::Packed { bits, kind } => read_packed(src, bits, kind)?,
        Layout::D16S8 => {
            let depth = src.read_u16().map_err(eof)? as f64 / 65535.0;
            let stencil = src.read_u8().map_err(eof)? as f64;
            [depth, stencil, 0.0, 0.0]
        }
        Layout::D24S8 => {
            // depth is a big-endian three-byte value, then the stencil byte
            let mut d = [0u8; 3];
            src.read_exact(&mut d).map_err(eof)?;
            let depth = ((d[0] as u32) << 16 | (d[1] as u32) << 8 | d[2] as u32) as f64
                / 16777215.0;
            let stencil = src.read_u8().map_err(eof)? as f64;
            [depth, stencil, 0.0, 0.0]
        }
        Layout::D32S8 => {
            let depth = src.read_f32().map_err(eof)? as f64;
            let stencil = src.read_u8().map_err(eof)? as f64;
            [depth, stencil, 0.0, 0.0]
        }
        Layout::X8D24 => {
            let word = src.read_u32().map_err(eof)?;
            let mask = (1u32 << 24) - 1;
            [(word & mask) as f64 / mask as f64, 0.0, 0.0, 0.0]
        }
        Layout::SharedExponent => {
            let rgb = e5b9g9r9_to_rgb(src.read_u32().map_err(eof)?);
            [rgb[0] as f64, rgb[1] as f64, rgb[2] as f64, 0.0]
        }
    };

    // the transfer function applies to rgba order, not disk order
    let value = swizzle_for(format).apply(value);
    Ok(if format.is_srgb() {
        srgb_to_linear_rgba(value)
    } else {
        value
    })
}

/// Writes a single linear rgba value into `dst` in the given format,
/// advancing the cursor by the element size.
pub fn write(format: Format, dst: &mut &mut [u8], color: [f64; 4]) -> Result<(), TexelError> {
    let layout = layout(format).ok_or(TexelError::UnsupportedFormat(format))?;
    let color = if format.is_srgb() {
        linear_to_srgb_rgba(color)
    } else {
        color
    };
    let color = swizzle_for(format).apply_reverse(color);
    let eof = |_| TexelError::UnexpectedEnd;

    match layout {
        Layout::Unpacked { comps, ty, divisor } => {
            let normalized = divisor != 1.0;
            for &component in color.iter().take(comps as usize) {
                ty.write(dst, quantize(component, divisor, normalized))?;
            }
            Ok(())
        }
        Layout::Packed { bits, kind } => write_packed(dst, bits, kind, color),
        Layout::D16S8 => {
            dst.write_u16(quantize(color[0], 65535.0, true) as u16)
                .map_err(eof)?;
            dst.write_u8(color[1] as u8).map_err(eof)
        }
        Layout::D24S8 => {
            let depth = quantize(color[0], 16777215.0, true).clamp(0.0, 16777215.0) as u32;
            let bytes = [(depth >> 16) as u8, (depth >> 8) as u8, depth as u8];
            dst.write_all(&bytes).map_err(eof)?;
            dst.write_u8(color[1] as u8).map_err(eof)
        }
        Layout::D32S8 => {
            dst.write_f32(color[0] as f32).map_err(eof)?;
            dst.write_u8(color[1] as u8).map_err(eof)
        }
        Layout::X8D24 => {
            let mask = (1u32 << 24) - 1;
            let depth = quantize(color[0], mask as f64, true).clamp(0.0, mask as f64) as u32;
            dst.write_u32(depth).map_err(eof)
        }
        Layout::SharedExponent => {
            let word = e5b9g9r9_from_rgb([color[0] as f32, color[1] as f32, color[2] as f32]);
            dst.write_u32(word).map_err(eof)
        }
    }
}

/// `write(dst_format, dst, read(src_format, src))`, advancing both cursors.
pub fn convert(
    dst_format: Format,
    dst: &mut &mut [u8],
    src_format: Format,
    src: &mut &[u8],
) -> Result<(), TexelError> {
    let color = read(src_format, src)?;
    write(dst_format, dst, color)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(format: Format, bytes: &[u8]) -> Vec<u8> {
        let mut src = bytes;
        let color = read(format, &mut src).unwrap();
        assert!(src.is_empty(), "cursor must consume the whole element");

        let mut out = vec![0u8; bytes.len()];
        let mut dst = &mut out[..];
        write(format, &mut dst, color).unwrap();
        assert!(dst.is_empty());
        out
    }

    #[test]
    fn unpacked_bytes_roundtrip_exactly() {
        for v in 0..=255u8 {
            assert_eq!(roundtrip(Format::R8Unorm, &[v]), [v]);
            assert_eq!(roundtrip(Format::R8Snorm, &[v]), [v]);
            assert_eq!(roundtrip(Format::R8Uint, &[v]), [v]);
        }
        assert_eq!(
            roundtrip(Format::R8G8B8A8Unorm, &[0x11, 0x22, 0x33, 0x44]),
            [0x11, 0x22, 0x33, 0x44]
        );
        assert_eq!(
            roundtrip(Format::R16G16B16A16Unorm, &[1, 2, 3, 4, 5, 6, 7, 8]),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn snorm_is_symmetric() {
        let mut src: &[u8] = &[0x7F];
        assert_eq!(read(Format::R8Snorm, &mut src).unwrap()[0], 1.0);
        let mut src: &[u8] = &[0x81]; // -127
        assert_eq!(read(Format::R8Snorm, &mut src).unwrap()[0], -1.0);
    }

    #[test]
    fn packed_words_roundtrip_exactly() {
        for word in 0..=0xFFFFu32 {
            let bytes = (word as u16).to_le_bytes();
            assert_eq!(roundtrip(Format::R5G6B5UnormPack16, &bytes), bytes);
            assert_eq!(roundtrip(Format::R4G4B4A4UnormPack16, &bytes), bytes);
            assert_eq!(roundtrip(Format::B5G5R5A1UnormPack16, &bytes), bytes);
            assert_eq!(roundtrip(Format::A1R5G5B5UnormPack16, &bytes), bytes);
        }
    }

    #[test]
    fn packed_is_msb_first() {
        // r5g6b5: r in the top five bits
        let word: u16 = 0b11111_000000_00000;
        let mut src: &[u8] = &word.to_le_bytes();
        let color = read(Format::R5G6B5UnormPack16, &mut src).unwrap();
        assert_eq!(color, [1.0, 0.0, 0.0, 0.0]);

        // a2b10g10r10: a in the top two bits, r in the low ten
        let word: u32 = 0b11 << 30 | 0x3FF;
        let mut src: &[u8] = &word.to_le_bytes();
        let color = read(Format::A2B10G10R10UnormPack32, &mut src).unwrap();
        assert_eq!(color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn ten_bit_packed_roundtrips() {
        for word in [0u32, 1, 0x2FF_u32, 0x3FF, 0xFFFF_FFFF, 0x1234_5678, 0x8000_0001] {
            let bytes = word.to_le_bytes();
            assert_eq!(roundtrip(Format::A2B10G10R10UnormPack32, &bytes), bytes);
            assert_eq!(roundtrip(Format::A2R10G10B10UintPack32, &bytes), bytes);
            assert_eq!(roundtrip(Format::A8B8G8R8SnormPack32, &bytes), bytes);
        }
    }

    #[test]
    fn bgra_swizzles_to_rgba() {
        let mut src: &[u8] = &[10, 20, 30, 40];
        let color = read(Format::B8G8R8A8Unorm, &mut src).unwrap();
        assert_eq!(color[0], 30.0 / 255.0);
        assert_eq!(color[1], 20.0 / 255.0);
        assert_eq!(color[2], 10.0 / 255.0);
        assert_eq!(color[3], 40.0 / 255.0);

        assert_eq!(roundtrip(Format::B8G8R8A8Unorm, &[10, 20, 30, 40]), [10, 20, 30, 40]);
    }

    #[test]
    fn srgb_decode_encode_is_stable() {
        // 0xBA decodes to ~0.49 linear and encodes back to 0xBA
        let mut src: &[u8] = &[0xBA];
        let color = read(Format::R8Srgb, &mut src).unwrap();
        assert!((color[0] - 0.491).abs() < 0.01, "{}", color[0]);

        for v in 0..=255u8 {
            assert_eq!(roundtrip(Format::R8Srgb, &[v]), [v]);
        }
    }

    #[test]
    fn sfloat_roundtrips_preserve_bits() {
        for bits in [0u16, 0x3C00, 0xBC00, 0x0001, 0x7BFF, 0x8000] {
            let bytes = bits.to_le_bytes();
            assert_eq!(roundtrip(Format::R16Sfloat, &bytes), bytes);
        }
        let bytes = 1.5f32.to_le_bytes();
        assert_eq!(roundtrip(Format::R32Sfloat, &bytes), bytes);
    }

    #[test]
    fn depth_stencil_formats() {
        // d24 depth is big-endian, stencil trails
        let mut src: &[u8] = &[0xFF, 0xFF, 0xFF, 0x2A];
        let color = read(Format::D24UnormS8Uint, &mut src).unwrap();
        assert_eq!(color[0], 1.0);
        assert_eq!(color[1], 42.0);
        assert_eq!(roundtrip(Format::D24UnormS8Uint, &[0x12, 0x34, 0x56, 0x2A]),
            [0x12, 0x34, 0x56, 0x2A]);

        // x8d24 keeps depth in the low 24 bits
        let word: u32 = 0x00FF_FFFF;
        let mut src: &[u8] = &word.to_le_bytes();
        let color = read(Format::X8D24UnormPack32, &mut src).unwrap();
        assert_eq!(color[0], 1.0);

        let mut src: &[u8] = &[0x00, 0x80, 7];
        let color = read(Format::D16UnormS8Uint, &mut src).unwrap();
        assert!((color[0] - 0x8000 as f64 / 65535.0).abs() < 1e-12);
        assert_eq!(color[1], 7.0);
    }

    #[test]
    fn shared_exponent_via_engine() {
        let mut out = [0u8; 4];
        let mut dst = &mut out[..];
        write(Format::E5B9G9R9UfloatPack32, &mut dst, [1.0, 2.0, 4.0, 0.0]).unwrap();

        let mut src: &[u8] = &out;
        let color = read(Format::E5B9G9R9UfloatPack32, &mut src).unwrap();
        assert!((color[0] - 1.0).abs() <= 4.0 / 512.0);
        assert!((color[1] - 2.0).abs() <= 4.0 / 512.0);
        assert!((color[2] - 4.0).abs() <= 4.0 / 512.0);
    }

    #[test]
    fn convert_between_channel_orders() {
        let src_bytes = [10u8, 20, 30, 40]; // b, g, r, a on disk
        let mut dst_bytes = [0u8; 4];
        let mut src = &src_bytes[..];
        let mut dst = &mut dst_bytes[..];
        convert(Format::R8G8B8A8Unorm, &mut dst, Format::B8G8R8A8Unorm, &mut src).unwrap();
        assert_eq!(dst_bytes, [30, 20, 10, 40]);
    }

    #[test]
    fn unsupported_formats_error() {
        let mut src: &[u8] = &[0u8; 16];
        assert_eq!(
            read(Format::Bc1RgbUnormBlock, &mut src),
            Err(TexelError::UnsupportedFormat(Format::Bc1RgbUnormBlock))
        );
        assert_eq!(
            read(Format::B10G11R11UfloatPack32, &mut src),
            Err(TexelError::UnsupportedFormat(Format::B10G11R11UfloatPack32))
        );

        let mut short: &[u8] = &[0u8; 1];
        assert_eq!(read(Format::R32Sfloat, &mut short), Err(TexelError::UnexpectedEnd));
    }
}
