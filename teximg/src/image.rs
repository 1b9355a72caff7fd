//! The uniform read contract for decoded and decodable images, plus the
//! in-memory and composed provider implementations.

use std::sync::Arc;

use crate::error::ReadError;
use crate::format::{mip_size, size_bytes, tight_texel_number, Extent3, Format};

/// Provides information and data of an image, close to the vulkan model:
/// a 3d extent, array layers, an optional cubemap designation and a mip
/// chain. Layers and depth are separate because mipmapping treats them
/// differently; an image with depth > 1 has exactly one layer.
///
/// Reading takes `&mut self` because implementations keep per-instance
/// scratch state (decode buffers, stream cursors). Callers that share a
/// provider across threads must hand out exclusive access.
pub trait ImageProvider: std::fmt::Debug {
    /// The size of the image. No component is zero.
    fn size(&self) -> Extent3;

    /// The format of the data returned by `read`. Never `Undefined`.
    fn format(&self) -> Format;

    /// Number of array layers, >= 1.
    fn layers(&self) -> u32 {
        1
    }

    /// Number of mip levels, >= 1.
    fn mip_levels(&self) -> u32 {
        1
    }

    /// Whether this image is a cubemap, to the best of the implementation's
    /// knowledge. When true, `layers()` is a positive multiple of 6 and face
    /// i of cube layer j sits at array layer 6j + i.
    fn cubemap(&self) -> bool {
        false
    }

    /// Reads one full, tightly packed 2d image at (mip, layer). The returned
    /// slice is only valid until the next read call.
    fn read(&mut self, mip: u32, layer: u32) -> Result<&[u8], ReadError>;

    /// Copies one full, tightly packed 2d image at (mip, layer) into `buf`,
    /// which must hold at least `face_size(mip)` bytes. Returns the number
    /// of bytes written.
    fn read_into(&mut self, buf: &mut [u8], mip: u32, layer: u32) -> Result<u64, ReadError>;

    /// Byte size of one face at the given mip.
    fn face_size(&self, mip: u32) -> u64 {
        size_bytes(self.size(), mip, self.format())
    }
}

/// More limited in-memory representation of an image: one mip, one layer.
#[derive(Debug)]
pub struct ImageData {
    pub size: Extent3,
    pub format: Format,
    pub data: Box<[u8]>,
}

/// Reads a specific (mip, layer) of the given provider into a tightly
/// packed owned blob. Other subresources are discarded.
pub fn read_image_data(
    provider: &mut dyn ImageProvider,
    mip: u32,
    layer: u32,
) -> Result<ImageData, ReadError> {
    if provider.layers() > 1 {
        log::debug!("read_image_data: discarding {} layers", provider.layers() - 1);
    }
    if provider.mip_levels() > 1 {
        log::debug!("read_image_data: discarding {} mip levels", provider.mip_levels() - 1);
    }

    let format = provider.format();
    let size = mip_size(provider.size(), mip);
    let byte_size = provider.face_size(mip) as usize;

    let mut data = vec![0u8; byte_size];
    let written = provider.read_into(&mut data, mip, layer)?;
    debug_assert_eq!(written, byte_size as u64);

    Ok(ImageData {
        size,
        format,
        data: data.into_boxed_slice(),
    })
}

#[derive(Debug)]
enum MemData {
    /// One blob per (mip, layer), indexed `mip * layers + layer`.
    Faces(Vec<Box<[u8]>>),
    /// All faces in one tight linear blob, mip-major.
    Tight(Arc<[u8]>),
}

/// Provider over bytes that are already in memory. Reads are pointer
/// arithmetic only.
#[derive(Debug)]
pub struct MemImageProvider {
    size: Extent3,
    format: Format,
    mips: u32,
    layers: u32,
    cubemap: bool,
    data: MemData,
}

impl MemImageProvider {
    fn face_range(&self, mip: u32, layer: u32) -> (usize, usize) {
        let len = size_bytes(self.size, mip, self.format) as usize;
        match &self.data {
            MemData::Faces(_) => (0, len),
            MemData::Tight(_) => {
                let texel = tight_texel_number(self.size, self.layers, mip, layer, 0, 0, 0, 0);
                let start = (texel * self.format.element_size() as u64) as usize;
                (start, len)
            }
        }
    }

    fn face(&self, mip: u32, layer: u32) -> &[u8] {
        assert!(mip < self.mips && layer < self.layers);
        let (start, len) = self.face_range(mip, layer);
        match &self.data {
            MemData::Faces(faces) => {
                let face = &faces[(mip * self.layers + layer) as usize];
                &face[..len]
            }
            MemData::Tight(data) => &data[start..start + len],
        }
    }
}

impl ImageProvider for MemImageProvider {
    fn size(&self) -> Extent3 {
        self.size
    }

    fn format(&self) -> Format {
        self.format
    }

    fn layers(&self) -> u32 {
        self.layers
    }

    fn mip_levels(&self) -> u32 {
        self.mips
    }

    fn cubemap(&self) -> bool {
        self.cubemap
    }

    fn read(&mut self, mip: u32, layer: u32) -> Result<&[u8], ReadError> {
        Ok(self.face(mip, layer))
    }

    fn read_into(&mut self, buf: &mut [u8], mip: u32, layer: u32) -> Result<u64, ReadError> {
        let face = self.face(mip, layer);
        assert!(buf.len() >= face.len());
        buf[..face.len()].copy_from_slice(face);
        Ok(face.len() as u64)
    }
}

/// Takes ownership of an `ImageData` and exposes it as a provider.
pub fn wrap(image: ImageData) -> Box<dyn ImageProvider> {
    assert!(image.size.x >= 1 && image.size.y >= 1 && image.size.z >= 1);
    assert!(image.format != Format::Undefined);

    Box::new(MemImageProvider {
        size: image.size,
        format: image.format,
        mips: 1,
        layers: 1,
        cubemap: false,
        data: MemData::Faces(vec![image.data]),
    })
}

/// Wraps one blob per (mip, layer), with the data for mip m, layer l at
/// `faces[m * layers + l]`.
pub fn wrap_faces(
    size: Extent3,
    format: Format,
    mips: u32,
    layers: u32,
    faces: Vec<Box<[u8]>>,
    cubemap: bool,
) -> Box<dyn ImageProvider> {
    assert!(size.x >= 1 && size.y >= 1 && size.z >= 1);
    assert!(mips >= 1 && layers >= 1);
    assert_eq!(faces.len() as u64, mips as u64 * layers as u64);
    assert!(!cubemap || layers % 6 == 0);

    Box::new(MemImageProvider {
        size,
        format,
        mips,
        layers,
        cubemap,
        data: MemData::Faces(faces),
    })
}

/// Wraps a single blob holding all mips and layers in tight linear layout,
/// see `tight_texel_number`.
pub fn wrap_tight(
    size: Extent3,
    format: Format,
    mips: u32,
    layers: u32,
    data: impl Into<Arc<[u8]>>,
    cubemap: bool,
) -> Box<dyn ImageProvider> {
    assert!(size.x >= 1 && size.y >= 1 && size.z >= 1);
    assert!(mips >= 1 && layers >= 1);
    assert!(!cubemap || layers % 6 == 0);

    Box::new(MemImageProvider {
        size,
        format,
        mips,
        layers,
        cubemap,
        data: MemData::Tight(data.into()),
    })
}

/// Composes sub-providers as either additional layers or depth slices of a
/// single image. Every sub-provider must agree on size, format and mip
/// count; only their first layer is exposed.
#[derive(Debug)]
pub struct MultiImageProvider {
    providers: Vec<Box<dyn ImageProvider>>,
    as_slices: bool,
    mips: u32,
    cubemap: bool,
    size: Extent3,
    format: Format,
    scratch: Vec<u8>,
}

impl MultiImageProvider {
    pub fn new(
        providers: Vec<Box<dyn ImageProvider>>,
        cubemap: bool,
        as_slices: bool,
    ) -> Result<Self, ReadError> {
        let first = providers.first().ok_or(ReadError::Empty)?;
        let mut size = first.size();
        let format = first.format();
        let mips = first.mip_levels();

        if size.z > 1 {
            log::error!("multi image: sub-image has depth {}, not allowed", size.z);
            return Err(ReadError::CantRepresent);
        }

        for provider in &providers {
            if provider.size() != size {
                log::error!(
                    "multi image: mismatched sizes, {:?} vs {:?}",
                    provider.size(),
                    size
                );
                return Err(ReadError::CantRepresent);
            }
            if provider.format() != format {
                log::error!(
                    "multi image: mismatched formats, {:?} vs {:?}",
                    provider.format(),
                    format
                );
                return Err(ReadError::CantRepresent);
            }
            if provider.mip_levels() != mips {
                log::error!(
                    "multi image: mismatched mip counts, {} vs {}",
                    provider.mip_levels(),
                    mips
                );
                return Err(ReadError::CantRepresent);
            }
            if provider.layers() > 1 {
                log::warn!("multi image: {} layers will not be accessible", provider.layers() - 1);
            }
        }

        if cubemap && (as_slices || providers.len() % 6 != 0) {
            log::error!("multi image: {} sub-images do not form a cubemap", providers.len());
            return Err(ReadError::CantRepresent);
        }

        if as_slices {
            size.z = providers.len() as u32;
        }

        Ok(Self {
            providers,
            as_slices,
            mips,
            cubemap,
            size,
            format,
            scratch: Vec::new(),
        })
    }

    fn slice_size(&self, mip: u32) -> u64 {
        let m = mip_size(Extent3::new(self.size.x, self.size.y, 1), mip);
        m.x as u64 * m.y as u64 * self.format.element_size() as u64
    }
}

impl ImageProvider for MultiImageProvider {
    fn size(&self) -> Extent3 {
        self.size
    }

    fn format(&self) -> Format {
        self.format
    }

    fn layers(&self) -> u32 {
        if self.as_slices {
            1
        } else {
            self.providers.len() as u32
        }
    }

    fn mip_levels(&self) -> u32 {
        self.mips
    }

    fn cubemap(&self) -> bool {
        self.cubemap
    }

    fn read(&mut self, mip: u32, layer: u32) -> Result<&[u8], ReadError> {
        if self.as_slices {
            let byte_size = (self.size.z as u64 * self.slice_size(mip)) as usize;
            let mut scratch = std::mem::take(&mut self.scratch);
            scratch.resize(byte_size, 0);
            let res = self.read_into(&mut scratch, mip, layer);
            self.scratch = scratch;
            res?;
            Ok(&self.scratch[..byte_size])
        } else {
            assert!(mip < self.mips && (layer as usize) < self.providers.len());
            self.providers[layer as usize].read(mip, 0)
        }
    }

    fn read_into(&mut self, buf: &mut [u8], mip: u32, layer: u32) -> Result<u64, ReadError> {
        if self.as_slices {
            assert!(mip < self.mips && layer == 0);
            let slice_size = self.slice_size(mip) as usize;
            assert!(buf.len() >= self.size.z as usize * slice_size);

            let mut written = 0u64;
            for (z, provider) in self.providers.iter_mut().enumerate() {
                let dst = &mut buf[z * slice_size..(z + 1) * slice_size];
                written += provider.read_into(dst, mip, 0)?;
            }
            Ok(written)
        } else {
            assert!(mip < self.mips && (layer as usize) < self.providers.len());
            self.providers[layer as usize].read_into(buf, mip, 0)
        }
    }
}
