use bitflags::bitflags;

use crate::align::ceil_divide;

/// Image extent in texels. All axes are >= 1 for any live image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Extent3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn texel_count(self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

bitflags! {
    /// Subresource selector, mirroring VkImageAspectFlagBits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FormatAspect: u32 {
        const COLOR = 0x01;
        const DEPTH = 0x02;
        const STENCIL = 0x04;
        const METADATA = 0x08;
        const PLANE_0 = 0x10;
        const PLANE_1 = 0x20;
        const PLANE_2 = 0x40;
    }
}

/// Pixel formats in the VkFormat numeric space, including the 4444 extension
/// range. The YCbCr/multiplanar ranges are intentionally absent; containers
/// carrying them report `ReadError::UnsupportedFormat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Format {
    Undefined = 0,
    R4G4UnormPack8 = 1,
    R4G4B4A4UnormPack16 = 2,
    B4G4R4A4UnormPack16 = 3,
    R5G6B5UnormPack16 = 4,
    B5G6R5UnormPack16 = 5,
    R5G5B5A1UnormPack16 = 6,
    B5G5R5A1UnormPack16 = 7,
    A1R5G5B5UnormPack16 = 8,
    R8Unorm = 9,
    R8Snorm = 10,
    R8Uscaled = 11,
    R8Sscaled = 12,
    R8Uint = 13,
    R8Sint = 14,
    R8Srgb = 15,
    R8G8Unorm = 16,
    R8G8Snorm = 17,
    R8G8Uscaled = 18,
    R8G8Sscaled = 19,
    R8G8Uint = 20,
    R8G8Sint = 21,
    R8G8Srgb = 22,
    R8G8B8Unorm = 23,
    R8G8B8Snorm = 24,
    R8G8B8Uscaled = 25,
    R8G8B8Sscaled = 26,
    R8G8B8Uint = 27,
    R8G8B8Sint = 28,
    R8G8B8Srgb = 29,
    B8G8R8Unorm = 30,
    B8G8R8Snorm = 31,
    B8G8R8Uscaled = 32,
    B8G8R8Sscaled = 33,
    B8G8R8Uint = 34,
    B8G8R8Sint = 35,
    B8G8R8Srgb = 36,
    R8G8B8A8Unorm = 37,
    R8G8B8A8Snorm = 38,
    R8G8B8A8Uscaled = 39,
    R8G8B8A8Sscaled = 40,
    R8G8B8A8Uint = 41,
    R8G8B8A8Sint = 42,
    R8G8B8A8Srgb = 43,
    B8G8R8A8Unorm = 44,
    B8G8R8A8Snorm = 45,
    B8G8R8A8Uscaled = 46,
    B8G8R8A8Sscaled = 47,
    B8G8R8A8Uint = 48,
    B8G8R8A8Sint = 49,
    B8G8R8A8Srgb = 50,
    A8B8G8R8UnormPack32 = 51,
    A8B8G8R8SnormPack32 = 52,
    A8B8G8R8UscaledPack32 = 53,
    A8B8G8R8SscaledPack32 = 54,
    A8B8G8R8UintPack32 = 55,
    A8B8G8R8SintPack32 = 56,
    A8B8G8R8SrgbPack32 = 57,
    A2R10G10B10UnormPack32 = 58,
    A2R10G10B10SnormPack32 = 59,
    A2R10G10B10UscaledPack32 = 60,
    A2R10G10B10SscaledPack32 = 61,
    A2R10G10B10UintPack32 = 62,
    A2R10G10B10SintPack32 = 63,
    A2B10G10R10UnormPack32 = 64,
    A2B10G10R10SnormPack32 = 65,
    A2B10G10R10UscaledPack32 = 66,
    A2B10G10R10SscaledPack32 = 67,
    A2B10G10R10UintPack32 = 68,
    A2B10G10R10SintPack32 = 69,
    R16Unorm = 70,
    R16Snorm = 71,
    R16Uscaled = 72,
    R16Sscaled = 73,
    R16Uint = 74,
    R16Sint = 75,
    R16Sfloat = 76,
    R16G16Unorm = 77,
    R16G16Snorm = 78,
    R16G16Uscaled = 79,
    R16G16Sscaled = 80,
    R16G16Uint = 81,
    R16G16Sint = 82,
    R16G16Sfloat = 83,
    R16G16B16Unorm = 84,
    R16G16B16Snorm = 85,
    R16G16B16Uscaled = 86,
    R16G16B16Sscaled = 87,
    R16G16B16Uint = 88,
    R16G16B16Sint = 89,
    R16G16B16Sfloat = 90,
    R16G16B16A16Unorm = 91,
    R16G16B16A16Snorm = 92,
    R16G16B16A16Uscaled = 93,
    R16G16B16A16Sscaled = 94,
    R16G16B16A16Uint = 95,
    R16G16B16A16Sint = 96,
    R16G16B16A16Sfloat = 97,
    R32Uint = 98,
    R32Sint = 99,
    R32Sfloat = 100,
    R32G32Uint = 101,
    R32G32Sint = 102,
    R32G32Sfloat = 103,
    R32G32B32Uint = 104,
    R32G32B32Sint = 105,
    R32G32B32Sfloat = 106,
    R32G32B32A32Uint = 107,
    R32G32B32A32Sint = 108,
    R32G32B32A32Sfloat = 109,
    R64Uint = 110,
    R64Sint = 111,
    R64Sfloat = 112,
    R64G64Uint = 113,
    R64G64Sint = 114,
    R64G64Sfloat = 115,
    R64G64B64Uint = 116,
    R64G64B64Sint = 117,
    R64G64B64Sfloat = 118,
    R64G64B64A64Uint = 119,
    R64G64B64A64Sint = 120,
    R64G64B64A64Sfloat = 121,
    B10G11R11UfloatPack32 = 122,
    E5B9G9R9UfloatPack32 = 123,
    D16Unorm = 124,
    X8D24UnormPack32 = 125,
    D32Sfloat = 126,
    S8Uint = 127,
    D16UnormS8Uint = 128,
    D24UnormS8Uint = 129,
    D32SfloatS8Uint = 130,
    Bc1RgbUnormBlock = 131,
    Bc1RgbSrgbBlock = 132,
    Bc1RgbaUnormBlock = 133,
    Bc1RgbaSrgbBlock = 134,
    Bc2UnormBlock = 135,
    Bc2SrgbBlock = 136,
    Bc3UnormBlock = 137,
    Bc3SrgbBlock = 138,
    Bc4UnormBlock = 139,
    Bc4SnormBlock = 140,
    Bc5UnormBlock = 141,
    Bc5SnormBlock = 142,
    Bc6hUfloatBlock = 143,
    Bc6hSfloatBlock = 144,
    Bc7UnormBlock = 145,
    Bc7SrgbBlock = 146,
    Etc2R8G8B8UnormBlock = 147,
    Etc2R8G8B8SrgbBlock = 148,
    Etc2R8G8B8A1UnormBlock = 149,
    Etc2R8G8B8A1SrgbBlock = 150,
    Etc2R8G8B8A8UnormBlock = 151,
    Etc2R8G8B8A8SrgbBlock = 152,
    EacR11UnormBlock = 153,
    EacR11SnormBlock = 154,
    EacR11G11UnormBlock = 155,
    EacR11G11SnormBlock = 156,
    Astc4x4UnormBlock = 157,
    Astc4x4SrgbBlock = 158,
    Astc5x4UnormBlock = 159,
    Astc5x4SrgbBlock = 160,
    Astc5x5UnormBlock = 161,
    Astc5x5SrgbBlock = 162,
    Astc6x5UnormBlock = 163,
    Astc6x5SrgbBlock = 164,
    Astc6x6UnormBlock = 165,
    Astc6x6SrgbBlock = 166,
    Astc8x5UnormBlock = 167,
    Astc8x5SrgbBlock = 168,
    Astc8x6UnormBlock = 169,
    Astc8x6SrgbBlock = 170,
    Astc8x8UnormBlock = 171,
    Astc8x8SrgbBlock = 172,
    Astc10x5UnormBlock = 173,
    Astc10x5SrgbBlock = 174,
    Astc10x6UnormBlock = 175,
    Astc10x6SrgbBlock = 176,
    Astc10x8UnormBlock = 177,
    Astc10x8SrgbBlock = 178,
    Astc10x10UnormBlock = 179,
    Astc10x10SrgbBlock = 180,
    Astc12x10UnormBlock = 181,
    Astc12x10SrgbBlock = 182,
    Astc12x12UnormBlock = 183,
    Astc12x12SrgbBlock = 184,
    A4R4G4B4UnormPack16Ext = 1000340000,
    A4B4G4R4UnormPack16Ext = 1000340001,
}

/// Static per-format metadata. `element_size` is the size of one texel for
/// uncompressed formats and of one block for compressed ones; combined
/// depth/stencil formats report the sum of their plane sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub element_size: u32,
    pub block_extent: Extent3,
    pub aspects: FormatAspect,
    pub srgb: bool,
    pub compressed: bool,
    pub depth_size: u32,
    pub stencil_size: u32,
}

impl FormatInfo {
    const fn color(element_size: u32) -> Self {
        Self {
            element_size,
            block_extent: Extent3::new(1, 1, 1),
            aspects: FormatAspect::COLOR,
            srgb: false,
            compressed: false,
            depth_size: 0,
            stencil_size: 0,
        }
    }

    const fn srgb(element_size: u32) -> Self {
        Self {
            srgb: true,
            ..Self::color(element_size)
        }
    }

    const fn block(element_size: u32, w: u32, h: u32, srgb: bool) -> Self {
        Self {
            element_size,
            block_extent: Extent3::new(w, h, 1),
            aspects: FormatAspect::COLOR,
            srgb,
            compressed: true,
            depth_size: 0,
            stencil_size: 0,
        }
    }

    const fn depth_stencil(element_size: u32, depth_size: u32, stencil_size: u32) -> Self {
        let mut aspects = FormatAspect::empty();
        if depth_size > 0 {
            aspects = aspects.union(FormatAspect::DEPTH);
        }
        if stencil_size > 0 {
            aspects = aspects.union(FormatAspect::STENCIL);
        }
        Self {
            element_size,
            block_extent: Extent3::new(1, 1, 1),
            aspects,
            srgb: false,
            compressed: false,
            depth_size,
            stencil_size,
        }
    }
}

impl Format {
    /// Converts a raw VkFormat value. Unknown or multiplanar values map to `None`.
    pub fn from_vk(value: u32) -> Option<Format> {
        match value {
            0..=184 | 1000340000..=1000340001 => {
                // Every value in these ranges is a declared discriminant of
                // this repr(u32) enum, so the transmute is well-defined.
                Some(unsafe { std::mem::transmute::<u32, Format>(value) })
            }
            _ => None,
        }
    }

    pub fn vk(self) -> u32 {
        self as u32
    }

    pub const fn info(self) -> FormatInfo {
        use Format::*;
        match self {
            Undefined => FormatInfo::color(0),

            R4G4UnormPack8 => FormatInfo::color(1),
            R4G4B4A4UnormPack16 | B4G4R4A4UnormPack16 | R5G6B5UnormPack16
            | B5G6R5UnormPack16 | R5G5B5A1UnormPack16 | B5G5R5A1UnormPack16
            | A1R5G5B5UnormPack16 | A4R4G4B4UnormPack16Ext | A4B4G4R4UnormPack16Ext => {
                FormatInfo::color(2)
            }

            R8Unorm | R8Snorm | R8Uscaled | R8Sscaled | R8Uint | R8Sint => FormatInfo::color(1),
            R8Srgb => FormatInfo::srgb(1),
            R8G8Unorm | R8G8Snorm | R8G8Uscaled | R8G8Sscaled | R8G8Uint | R8G8Sint => {
                FormatInfo::color(2)
            }
            R8G8Srgb => FormatInfo::srgb(2),
            R8G8B8Unorm | R8G8B8Snorm | R8G8B8Uscaled | R8G8B8Sscaled | R8G8B8Uint
            | R8G8B8Sint | B8G8R8Unorm | B8G8R8Snorm | B8G8R8Uscaled | B8G8R8Sscaled
            | B8G8R8Uint | B8G8R8Sint => FormatInfo::color(3),
            R8G8B8Srgb | B8G8R8Srgb => FormatInfo::srgb(3),
            R8G8B8A8Unorm | R8G8B8A8Snorm | R8G8B8A8Uscaled | R8G8B8A8Sscaled
            | R8G8B8A8Uint | R8G8B8A8Sint | B8G8R8A8Unorm | B8G8R8A8Snorm
            | B8G8R8A8Uscaled | B8G8R8A8Sscaled | B8G8R8A8Uint | B8G8R8A8Sint
            | A8B8G8R8UnormPack32 | A8B8G8R8SnormPack32 | A8B8G8R8UscaledPack32
            | A8B8G8R8SscaledPack32 | A8B8G8R8UintPack32 | A8B8G8R8SintPack32 => {
                FormatInfo::color(4)
            }
            R8G8B8A8Srgb | B8G8R8A8Srgb | A8B8G8R8SrgbPack32 => FormatInfo::srgb(4),

            A2R10G10B10UnormPack32 | A2R10G10B10SnormPack32 | A2R10G10B10UscaledPack32
            | A2R10G10B10SscaledPack32 | A2R10G10B10UintPack32 | A2R10G10B10SintPack32
            | A2B10G10R10UnormPack32 | A2B10G10R10SnormPack32 | A2B10G10R10UscaledPack32
            | A2B10G10R10SscaledPack32 | A2B10G10R10UintPack32 | A2B10G10R10SintPack32 => {
                FormatInfo::color(4)
            }

            R16Unorm | R16Snorm | R16Uscaled | R16Sscaled | R16Uint | R16Sint | R16Sfloat => {
                FormatInfo::color(2)
            }
            R16G16Unorm | R16G16Snorm | R16G16Uscaled | R16G16Sscaled | R16G16Uint
            | R16G16Sint | R16G16Sfloat => FormatInfo::color(4),
            R16G16B16Unorm | R16G16B16Snorm | R16G16B16Uscaled | R16G16B16Sscaled
            | R16G16B16Uint | R16G16B16Sint | R16G16B16Sfloat => FormatInfo::color(6),
            R16G16B16A16Unorm | R16G16B16A16Snorm | R16G16B16A16Uscaled
            | R16G16B16A16Sscaled | R16G16B16A16Uint | R16G16B16A16Sint
            | R16G16B16A16Sfloat => FormatInfo::color(8),

            R32Uint | R32Sint | R32Sfloat => FormatInfo::color(4),
            R32G32Uint | R32G32Sint | R32G32Sfloat => FormatInfo::color(8),
            R32G32B32Uint | R32G32B32Sint | R32G32B32Sfloat => FormatInfo::color(12),
            R32G32B32A32Uint | R32G32B32A32Sint | R32G32B32A32Sfloat => FormatInfo::color(16),

            R64Uint | R64Sint | R64Sfloat => FormatInfo::color(8),
            R64G64Uint | R64G64Sint | R64G64Sfloat => FormatInfo::color(16),
            R64G64B64Uint | R64G64B64Sint | R64G64B64Sfloat => FormatInfo::color(24),
            R64G64B64A64Uint | R64G64B64A64Sint | R64G64B64A64Sfloat => FormatInfo::color(32),

            B10G11R11UfloatPack32 | E5B9G9R9UfloatPack32 => FormatInfo::color(4),

            D16Unorm => FormatInfo::depth_stencil(2, 2, 0),
            X8D24UnormPack32 => FormatInfo::depth_stencil(4, 4, 0),
            D32Sfloat => FormatInfo::depth_stencil(4, 4, 0),
            S8Uint => FormatInfo::depth_stencil(1, 0, 1),
            D16UnormS8Uint => FormatInfo::depth_stencil(3, 2, 1),
            D24UnormS8Uint => FormatInfo::depth_stencil(4, 3, 1),
            D32SfloatS8Uint => FormatInfo::depth_stencil(5, 4, 1),

            Bc1RgbUnormBlock | Bc1RgbaUnormBlock => FormatInfo::block(8, 4, 4, false),
            Bc1RgbSrgbBlock | Bc1RgbaSrgbBlock => FormatInfo::block(8, 4, 4, true),
            Bc2UnormBlock | Bc3UnormBlock => FormatInfo::block(16, 4, 4, false),
            Bc2SrgbBlock | Bc3SrgbBlock => FormatInfo::block(16, 4, 4, true),
            Bc4UnormBlock | Bc4SnormBlock => FormatInfo::block(8, 4, 4, false),
            Bc5UnormBlock | Bc5SnormBlock | Bc6hUfloatBlock | Bc6hSfloatBlock
            | Bc7UnormBlock => FormatInfo::block(16, 4, 4, false),
            Bc7SrgbBlock => FormatInfo::block(16, 4, 4, true),

            Etc2R8G8B8UnormBlock | Etc2R8G8B8A1UnormBlock => FormatInfo::block(8, 4, 4, false),
            Etc2R8G8B8SrgbBlock | Etc2R8G8B8A1SrgbBlock => FormatInfo::block(8, 4, 4, true),
            Etc2R8G8B8A8UnormBlock => FormatInfo::block(16, 4, 4, false),
            Etc2R8G8B8A8SrgbBlock => FormatInfo::block(16, 4, 4, true),
            EacR11UnormBlock | EacR11SnormBlock => FormatInfo::block(8, 4, 4, false),
            EacR11G11UnormBlock | EacR11G11SnormBlock => FormatInfo::block(16, 4, 4, false),

            Astc4x4UnormBlock => FormatInfo::block(16, 4, 4, false),
            Astc4x4SrgbBlock => FormatInfo::block(16, 4, 4, true),
            Astc5x4UnormBlock => FormatInfo::block(16, 5, 4, false),
            Astc5x4SrgbBlock => FormatInfo::block(16, 5, 4, true),
            Astc5x5UnormBlock => FormatInfo::block(16, 5, 5, false),
            Astc5x5SrgbBlock => FormatInfo::block(16, 5, 5, true),
            Astc6x5UnormBlock => FormatInfo::block(16, 6, 5, false),
            Astc6x5SrgbBlock => FormatInfo::block(16, 6, 5, true),
            Astc6x6UnormBlock => FormatInfo::block(16, 6, 6, false),
            Astc6x6SrgbBlock => FormatInfo::block(16, 6, 6, true),
            Astc8x5UnormBlock => FormatInfo::block(16, 8, 5, false),
            Astc8x5SrgbBlock => FormatInfo::block(16, 8, 5, true),
            Astc8x6UnormBlock => FormatInfo::block(16, 8, 6, false),
            Astc8x6SrgbBlock => FormatInfo::block(16, 8, 6, true),
            Astc8x8UnormBlock => FormatInfo::block(16, 8, 8, false),
            Astc8x8SrgbBlock => FormatInfo::block(16, 8, 8, true),
            Astc10x5UnormBlock => FormatInfo::block(16, 10, 5, false),
            Astc10x5SrgbBlock => FormatInfo::block(16, 10, 5, true),
            Astc10x6UnormBlock => FormatInfo::block(16, 10, 6, false),
            Astc10x6SrgbBlock => FormatInfo::block(16, 10, 6, true),
            Astc10x8UnormBlock => FormatInfo::block(16, 10, 8, false),
            Astc10x8SrgbBlock => FormatInfo::block(16, 10, 8, true),
            Astc10x10UnormBlock => FormatInfo::block(16, 10, 10, false),
            Astc10x10SrgbBlock => FormatInfo::block(16, 10, 10, true),
            Astc12x10UnormBlock => FormatInfo::block(16, 12, 10, false),
            Astc12x10SrgbBlock => FormatInfo::block(16, 12, 10, true),
            Astc12x12UnormBlock => FormatInfo::block(16, 12, 12, false),
            Astc12x12SrgbBlock => FormatInfo::block(16, 12, 12, true),
        }
    }

    /// Size of one texel (or one block for compressed formats) in bytes.
    /// Combined depth/stencil formats return the sum of their plane sizes.
    pub fn element_size(self) -> u32 {
        self.info().element_size
    }

    /// Size of one plane of a texel, selected by aspect. Returns 0 when the
    /// format does not carry the requested aspect.
    pub fn element_size_aspect(self, aspect: FormatAspect) -> u32 {
        let info = self.info();
        if aspect.contains(FormatAspect::COLOR) {
            if info.aspects.contains(FormatAspect::COLOR) {
                info.element_size
            } else {
                0
            }
        } else if aspect.contains(FormatAspect::DEPTH) {
            info.depth_size
        } else if aspect.contains(FormatAspect::STENCIL) {
            info.stencil_size
        } else {
            0
        }
    }

    pub fn block_extent(self) -> Extent3 {
        self.info().block_extent
    }

    pub fn aspects(self) -> FormatAspect {
        self.info().aspects
    }

    pub fn is_srgb(self) -> bool {
        self.info().srgb
    }

    pub fn is_compressed(self) -> bool {
        self.info().compressed
    }

    pub fn has_depth(self) -> bool {
        self.info().aspects.contains(FormatAspect::DEPTH)
    }

    pub fn has_stencil(self) -> bool {
        self.info().aspects.contains(FormatAspect::STENCIL)
    }

    /// Switches between the linear and sRGB member of a format pair.
    /// Identity for formats without a partner.
    pub fn toggle_srgb(self) -> Format {
        use Format::*;
        match self {
            R8Unorm => R8Srgb,
            R8Srgb => R8Unorm,
            R8G8Unorm => R8G8Srgb,
            R8G8Srgb => R8G8Unorm,
            R8G8B8Unorm => R8G8B8Srgb,
            R8G8B8Srgb => R8G8B8Unorm,
            B8G8R8Unorm => B8G8R8Srgb,
            B8G8R8Srgb => B8G8R8Unorm,
            R8G8B8A8Unorm => R8G8B8A8Srgb,
            R8G8B8A8Srgb => R8G8B8A8Unorm,
            B8G8R8A8Unorm => B8G8R8A8Srgb,
            B8G8R8A8Srgb => B8G8R8A8Unorm,
            A8B8G8R8UnormPack32 => A8B8G8R8SrgbPack32,
            A8B8G8R8SrgbPack32 => A8B8G8R8UnormPack32,

            Bc1RgbUnormBlock => Bc1RgbSrgbBlock,
            Bc1RgbSrgbBlock => Bc1RgbUnormBlock,
            Bc1RgbaUnormBlock => Bc1RgbaSrgbBlock,
            Bc1RgbaSrgbBlock => Bc1RgbaUnormBlock,
            Bc2UnormBlock => Bc2SrgbBlock,
            Bc2SrgbBlock => Bc2UnormBlock,
            Bc3UnormBlock => Bc3SrgbBlock,
            Bc3SrgbBlock => Bc3UnormBlock,
            Bc7UnormBlock => Bc7SrgbBlock,
            Bc7SrgbBlock => Bc7UnormBlock,
            Etc2R8G8B8UnormBlock => Etc2R8G8B8SrgbBlock,
            Etc2R8G8B8SrgbBlock => Etc2R8G8B8UnormBlock,
            Etc2R8G8B8A1UnormBlock => Etc2R8G8B8A1SrgbBlock,
            Etc2R8G8B8A1SrgbBlock => Etc2R8G8B8A1UnormBlock,
            Etc2R8G8B8A8UnormBlock => Etc2R8G8B8A8SrgbBlock,
            Etc2R8G8B8A8SrgbBlock => Etc2R8G8B8A8UnormBlock,

            Astc4x4UnormBlock => Astc4x4SrgbBlock,
            Astc4x4SrgbBlock => Astc4x4UnormBlock,
            Astc5x4UnormBlock => Astc5x4SrgbBlock,
            Astc5x4SrgbBlock => Astc5x4UnormBlock,
            Astc5x5UnormBlock => Astc5x5SrgbBlock,
            Astc5x5SrgbBlock => Astc5x5UnormBlock,
            Astc6x5UnormBlock => Astc6x5SrgbBlock,
            Astc6x5SrgbBlock => Astc6x5UnormBlock,
            Astc6x6UnormBlock => Astc6x6SrgbBlock,
            Astc6x6SrgbBlock => Astc6x6UnormBlock,
            Astc8x5UnormBlock => Astc8x5SrgbBlock,
            Astc8x5SrgbBlock => Astc8x5UnormBlock,
            Astc8x6UnormBlock => Astc8x6SrgbBlock,
            Astc8x6SrgbBlock => Astc8x6UnormBlock,
            Astc8x8UnormBlock => Astc8x8SrgbBlock,
            Astc8x8SrgbBlock => Astc8x8UnormBlock,
            Astc10x5UnormBlock => Astc10x5SrgbBlock,
            Astc10x5SrgbBlock => Astc10x5UnormBlock,
            Astc10x6UnormBlock => Astc10x6SrgbBlock,
            Astc10x6SrgbBlock => Astc10x6UnormBlock,
            Astc10x8UnormBlock => Astc10x8SrgbBlock,
            Astc10x8SrgbBlock => Astc10x8UnormBlock,
            Astc10x10UnormBlock => Astc10x10SrgbBlock,
            Astc10x10SrgbBlock => Astc10x10UnormBlock,
            Astc12x10UnormBlock => Astc12x10SrgbBlock,
            Astc12x10SrgbBlock => Astc12x10UnormBlock,
            Astc12x12UnormBlock => Astc12x12SrgbBlock,
            Astc12x12SrgbBlock => Astc12x12UnormBlock,

            other => other,
        }
    }
}

/// Returns the number of mipmap levels in a full chain for the given extent.
pub fn num_mip_levels(extent: Extent3) -> u32 {
    let max = extent.x.max(extent.y).max(extent.z).max(1);
    1 + (max as f64).log2().floor() as u32
}

/// Returns the extent of the given mip level. Every axis is clamped to 1.
pub fn mip_size(size: Extent3, level: u32) -> Extent3 {
    Extent3::new(
        (size.x >> level).max(1),
        (size.y >> level).max(1),
        (size.z >> level).max(1),
    )
}

/// Number of bytes needed to store a single face/layer of an image with the
/// given level-0 size and format, at the given mip level.
pub fn size_bytes(size: Extent3, mip: u32, format: Format) -> u64 {
    let m = mip_size(size, mip);
    let block = format.block_extent();
    let w = ceil_divide(m.x, block.x);
    let h = ceil_divide(m.y, block.y);
    let d = ceil_divide(m.z, block.z);
    w as u64 * h as u64 * d as u64 * format.element_size() as u64
}

/// Texel number within a single layer of the given extent.
pub fn tight_layer_texel_number(extent: Extent3, x: u32, y: u32, z: u32) -> u64 {
    z as u64 * (extent.y as u64 * extent.x as u64) + y as u64 * extent.x as u64 + x as u64
}

/// Texel number in a tight linear layout, dimension order: mips, layers,
/// depth, height, width. Multiply with the format element size to obtain the
/// byte offset. `first_mip` is the mip that begins at texel number 0; `mip`
/// is absolute, not relative to it.
pub fn tight_texel_number(
    extent: Extent3,
    num_layers: u32,
    mip: u32,
    layer: u32,
    x: u32,
    y: u32,
    z: u32,
    first_mip: u32,
) -> u64 {
    debug_assert!(layer < num_layers);
    debug_assert!(mip < num_mip_levels(extent));
    debug_assert!(first_mip <= mip);

    let mut off = 0u64;
    for i in first_mip..mip {
        off += mip_size(extent, i).texel_count() * num_layers as u64;
    }

    let ie = mip_size(extent, mip);
    off + layer as u64 * ie.texel_count() + tight_layer_texel_number(ie, x, y, z)
}

/// Number of texels in the given subresource range, tight linear layout.
pub fn tight_texel_count(extent: Extent3, num_layers: u32, num_mips: u32, first_mip: u32) -> u64 {
    debug_assert!(first_mip + num_mips <= num_mip_levels(extent));

    let mut off = 0u64;
    for i in first_mip..first_mip + num_mips {
        off += mip_size(extent, i).texel_count() * num_layers as u64;
    }
    off
}

// Shared-exponent codec, directly from the EXT_texture_shared_exponent
// algorithm. Bit layout: [31:27] exponent, [26:18] b, [17:9] g, [8:0] r.
mod e5b9g9r9 {
    pub const EXP_BIAS: i32 = 15;
    pub const MAX_BIASED_EXP: i32 = 32;
    pub const MAX_EXP: i32 = MAX_BIASED_EXP - EXP_BIAS;
    pub const MANTISSA_VALUES: i32 = 1 << 9;
    pub const MAX_MANTISSA: i32 = MANTISSA_VALUES - 1;
    pub const MAX: f32 =
        (MAX_MANTISSA as f32 / MANTISSA_VALUES as f32) * (1u32 << MAX_EXP) as f32;

    // NaN fails the first comparison and maps to 0.0.
    pub fn clamp(x: f32) -> f32 {
        if x > 0.0 {
            if x > MAX {
                MAX
            } else {
                x
            }
        } else {
            0.0
        }
    }

    // Not correct for denormals and zero, but the result is clamped against
    // the minimum shared exponent which hides those cases.
    pub fn floor_log2(x: f32) -> i32 {
        ((x.to_bits() >> 23) & 0xFF) as i32 - 127
    }
}

/// Encodes linear rgb into a e5b9g9r9 shared-exponent word.
pub fn e5b9g9r9_from_rgb(rgb: [f32; 3]) -> u32 {
    use e5b9g9r9::*;

    let rc = clamp(rgb[0]);
    let gc = clamp(rgb[1]);
    let bc = clamp(rgb[2]);
    let maxrgb = rc.max(gc).max(bc);

    let mut exp_shared = (floor_log2(maxrgb) + 1 + EXP_BIAS).max(0);
    debug_assert!(exp_shared <= MAX_BIASED_EXP);

    let mut denom = ((exp_shared - EXP_BIAS - 9) as f64).exp2();
    let maxm = (maxrgb as f64 / denom + 0.5).floor() as i32;
    if maxm == MAX_MANTISSA + 1 {
        denom *= 2.0;
        exp_shared += 1;
        debug_assert!(exp_shared <= MAX_BIASED_EXP);
    } else {
        debug_assert!(maxm <= MAX_MANTISSA);
    }

    let rm = (rc as f64 / denom + 0.5).floor() as u32;
    let gm = (gc as f64 / denom + 0.5).floor() as u32;
    let bm = (bc as f64 / denom + 0.5).floor() as u32;

    ((exp_shared as u32) << 27) | (bm << 18) | (gm << 9) | rm
}

/// Decodes a e5b9g9r9 shared-exponent word into linear rgb.
pub fn e5b9g9r9_to_rgb(ebgr: u32) -> [f32; 3] {
    use e5b9g9r9::EXP_BIAS;

    let exponent = (ebgr >> 27) as i32 - EXP_BIAS - 9;
    let scale = (exponent as f32).exp2();
    [
        scale * (ebgr & 0x1FF) as f32,
        scale * ((ebgr >> 9) & 0x1FF) as f32,
        scale * ((ebgr >> 18) & 0x1FF) as f32,
    ]
}
