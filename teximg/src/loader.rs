//! Extension-hinted loader dispatch.
//!
//! A fixed ordered table maps filename suffixes to loaders. The hinted
//! loader is tried first; on failure the stream is rewound and every
//! remaining loader gets a try in table order. Loaders take ownership of
//! the stream only on success and hand it back otherwise, which is what
//! makes the retry loop possible.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::error::ReadError;
use crate::exr::load_exr;
use crate::image::{read_image_data, ImageData, ImageProvider, MultiImageProvider};
use crate::jpeg::load_jpeg;
use crate::ktx::load_ktx;
use crate::ktx2::load_ktx2;
use crate::png::load_png;
use crate::stb::load_stb;
use crate::stream::{FileStream, MemoryStream, ReadStream};
use crate::webp::load_webp;

type LoadResult = Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)>;
type LoaderFn = fn(Box<dyn ReadStream>) -> LoadResult;

struct LoaderEntry {
    exts: &'static [&'static str],
    load: LoaderFn,
}

fn load_ktx_boxed(stream: Box<dyn ReadStream>) -> LoadResult {
    match load_ktx(stream) {
        Ok(texture) => Ok(Box::new(texture)),
        Err((err, stream)) => Err((err, stream)),
    }
}

fn load_ktx2_boxed(stream: Box<dyn ReadStream>) -> LoadResult {
    match load_ktx2(stream) {
        Ok(texture) => Ok(Box::new(texture)),
        Err((err, stream)) => Err((err, stream)),
    }
}

fn load_exr_rgba(stream: Box<dyn ReadStream>) -> LoadResult {
    load_exr(stream, true)
}

const LOADERS: &[LoaderEntry] = &[
    LoaderEntry {
        exts: &[".ktx"],
        load: load_ktx_boxed,
    },
    LoaderEntry {
        exts: &[".ktx2"],
        load: load_ktx2_boxed,
    },
    LoaderEntry {
        exts: &[".png"],
        load: load_png,
    },
    LoaderEntry {
        exts: &[".jpg", ".jpeg"],
        load: load_jpeg,
    },
    LoaderEntry {
        exts: &[".webp"],
        load: load_webp,
    },
    LoaderEntry {
        exts: &[".exr"],
        load: load_exr_rgba,
    },
    LoaderEntry {
        exts: &[".hdr", ".tga", ".bmp", ".gif"],
        load: load_stb,
    },
];

fn has_suffix_ci(name: &str, suffix: &str) -> bool {
    name.to_ascii_lowercase().ends_with(suffix)
}

/// Finds a loader for the stream. `ext` may hold a filename or a bare
/// extension like ".png" to pick the first loader to try; every other
/// loader is still tried when the hinted one fails.
pub fn load_image(mut stream: Box<dyn ReadStream>, ext: &str) -> Option<Box<dyn ImageProvider>> {
    let mut tried = [false; LOADERS.len()];

    if !ext.is_empty() {
        let hinted = LOADERS
            .iter()
            .position(|entry| entry.exts.iter().any(|e| has_suffix_ci(ext, e)));
        if let Some(index) = hinted {
            tried[index] = true;
            match (LOADERS[index].load)(stream) {
                Ok(provider) => return Some(provider),
                Err((err, returned)) => {
                    log::debug!("hinted loader for {ext:?} failed: {err}");
                    stream = returned;
                }
            }
        }
    }

    for (index, entry) in LOADERS.iter().enumerate() {
        if tried[index] {
            continue;
        }

        if stream.seek(SeekFrom::Start(0)).is_err() {
            return None;
        }
        match (entry.load)(stream) {
            Ok(provider) => return Some(provider),
            Err((_, returned)) => stream = returned,
        }
    }

    None
}

pub fn load_image_path(path: impl AsRef<Path>) -> Option<Box<dyn ImageProvider>> {
    let path = path.as_ref();
    let stream = match FileStream::open(path) {
        Ok(stream) => stream,
        Err(err) => {
            log::debug!("open {path:?}: {err}");
            return None;
        }
    };
    load_image(Box::new(stream), &path.to_string_lossy())
}

pub fn load_image_file(file: File) -> Option<Box<dyn ImageProvider>> {
    load_image(Box::new(FileStream::new(file)), "")
}

pub fn load_image_bytes(data: impl Into<Arc<[u8]>>) -> Option<Box<dyn ImageProvider>> {
    load_image(Box::new(MemoryStream::new(data)), "")
}

/// Loads the given paths and composes them into one image, either as array
/// layers or (with `as_slices`) as depth slices of a 3d image. All images
/// must agree on size, format and mip count; only their first layer is
/// used.
pub fn load_image_layers(
    paths: &[impl AsRef<Path>],
    cubemap: bool,
    as_slices: bool,
) -> Option<Box<dyn ImageProvider>> {
    let mut providers = Vec::with_capacity(paths.len());
    for path in paths {
        providers.push(load_image_path(path)?);
    }

    match MultiImageProvider::new(providers, cubemap, as_slices) {
        Ok(multi) => Some(Box::new(multi)),
        Err(err) => {
            log::error!("load_image_layers: {err}");
            None
        }
    }
}

/// Loads the stream and copies one (mip, layer) into a tight blob.
pub fn read_image_data_stream(
    stream: Box<dyn ReadStream>,
    mip: u32,
    layer: u32,
) -> Option<ImageData> {
    let mut provider = load_image(stream, "")?;
    read_image_data(provider.as_mut(), mip, layer).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Extent3, Format};
    use crate::image::{wrap, ImageData};
    use crate::ktx::write_ktx;
    use std::io::Cursor;

    fn ktx_bytes() -> Vec<u8> {
        let mut provider = wrap(ImageData {
            size: Extent3::new(2, 2, 1),
            format: Format::R8G8B8A8Unorm,
            data: (0u8..16).collect::<Vec<_>>().into_boxed_slice(),
        });
        let mut cursor = Cursor::new(Vec::new());
        write_ktx(&mut cursor, provider.as_mut()).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn dispatches_on_extension_hint() {
        let mut provider = load_image_bytes_with_ext(ktx_bytes(), "textures/color.KTX").unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Unorm);
        assert_eq!(provider.read(0, 0).unwrap().len(), 16);
    }

    #[test]
    fn falls_back_without_hint() {
        // valid ktx content with no extension hint must still load
        let mut provider = load_image_bytes(ktx_bytes()).unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Unorm);
        assert_eq!(provider.size(), Extent3::new(2, 2, 1));
    }

    #[test]
    fn misleading_hint_still_loads() {
        let mut provider = load_image_bytes_with_ext(ktx_bytes(), "image.png").unwrap();
        assert_eq!(provider.format(), Format::R8G8B8A8Unorm);
        assert_eq!(provider.read(0, 0).unwrap().len(), 16);
    }

    #[test]
    fn garbage_fails_everywhere() {
        assert!(load_image_bytes(vec![0u8; 100]).is_none());
    }

    fn load_image_bytes_with_ext(data: Vec<u8>, ext: &str) -> Option<Box<dyn ImageProvider>> {
        load_image(Box::new(MemoryStream::new(data)), ext)
    }
}
