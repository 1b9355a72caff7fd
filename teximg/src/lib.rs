//! Image I/O for gpu-oriented assets.
//!
//! The data model is the one used by modern graphics apis: images with a 3d
//! extent, array layers, cube faces and a mip chain, in a pixel format
//! mirroring the vulkan format space. Containers (ktx, ktx2) are parsed and
//! written natively, the common 2d interchange formats (png, jpeg, webp,
//! exr and a generic fallback) go through adapters. Everything surfaces as
//! an [`ImageProvider`], the uniform read contract.

pub mod align;
pub mod error;
pub mod exr;
pub mod format;
pub mod image;
pub mod jpeg;
pub mod ktx;
pub mod ktx2;
pub mod loader;
pub mod png;
pub mod stb;
pub mod stream;
pub mod texel;
pub mod webp;

pub use self::error::{ReadError, WriteError};
pub use self::exr::{load_exr, write_exr_path};
pub use self::format::{
    e5b9g9r9_from_rgb, e5b9g9r9_to_rgb, mip_size, num_mip_levels, size_bytes,
    tight_layer_texel_number, tight_texel_count, tight_texel_number, Extent3, Format,
    FormatAspect, FormatInfo,
};
pub use self::image::{
    read_image_data, wrap, wrap_faces, wrap_tight, ImageData, ImageProvider, MemImageProvider,
    MultiImageProvider,
};
pub use self::jpeg::load_jpeg;
pub use self::ktx::{load_ktx, write_ktx, write_ktx_path, KtxTexture};
pub use self::ktx2::{load_ktx2, write_ktx2, write_ktx2_path, Ktx2Texture};
pub use self::loader::{
    load_image, load_image_bytes, load_image_file, load_image_layers, load_image_path,
    read_image_data_stream,
};
pub use self::png::{load_png, write_png, write_png_path};
pub use self::stb::{load_stb, read_image_data_stb};
pub use self::stream::{FileStream, MemoryStream, ReadStream, StreamMap};
pub use self::texel::{linear_to_srgb, srgb_to_linear, TexelError};
pub use self::webp::load_webp;
