//! EXR codec adapter.
//!
//! EXR stores channels as parallel planes with free-form names; this
//! adapter groups them into layers by name prefix ("diffuse.R" belongs to
//! layer "diffuse", channel R), requires a single sample type across the
//! file and interlaces everything into one tight linear rgba blob. Deep and
//! multi-part images are rejected, ripmap levels are reduced to their
//! square diagonal.

use std::io::Cursor;
use std::path::Path;

use exr::prelude::*;
use std::result::Result;
use half::f16;
use smallvec::SmallVec;

use crate::error::{ReadError, WriteError};
use crate::format::{mip_size, num_mip_levels, tight_texel_count, tight_texel_number, Extent3};
use crate::format::Format as TexFormat;
use crate::image::{wrap_tight, ImageProvider};
use crate::stream::{ReadStream, StreamMap};

const NO_CHANNEL: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleType {
    F16,
    F32,
    U32,
}

fn sample_type_of(samples: &FlatSamples) -> SampleType {
    match samples {
        FlatSamples::F16(_) => SampleType::F16,
        FlatSamples::F32(_) => SampleType::F32,
        FlatSamples::U32(_) => SampleType::U32,
    }
}

fn map_exr_error(err: exr::error::Error) -> ReadError {
    match err {
        // deep data and exotic features land here
        exr::error::Error::NotSupported(_) => ReadError::CantRepresent,
        exr::error::Error::Invalid(_) => ReadError::InvalidType,
        exr::error::Error::Io(err) => err.into(),
        exr::error::Error::Aborted => ReadError::Internal,
    }
}

/// One rgba channel-index mapping per named layer.
struct ChannelLayer {
    name: String,
    mapping: [usize; 4],
}

fn parse_format(mapping: &[usize; 4], ty: SampleType, force_rgba: bool) -> TexFormat {
    let max_chan = if force_rgba {
        3
    } else if mapping[3] != NO_CHANNEL {
        3
    } else if mapping[2] != NO_CHANNEL {
        2
    } else if mapping[1] != NO_CHANNEL {
        1
    } else {
        0
    };

    match (max_chan, ty) {
        (0, SampleType::U32) => TexFormat::R32Uint,
        (0, SampleType::F16) => TexFormat::R16Sfloat,
        (0, SampleType::F32) => TexFormat::R32Sfloat,
        (1, SampleType::U32) => TexFormat::R32G32Uint,
        (1, SampleType::F16) => TexFormat::R16G16Sfloat,
        (1, SampleType::F32) => TexFormat::R32G32Sfloat,
        (2, SampleType::U32) => TexFormat::R32G32B32Uint,
        (2, SampleType::F16) => TexFormat::R16G16B16Sfloat,
        (2, SampleType::F32) => TexFormat::R32G32B32Sfloat,
        (3, SampleType::U32) => TexFormat::R32G32B32A32Uint,
        (3, SampleType::F16) => TexFormat::R16G16B16A16Sfloat,
        (3, SampleType::F32) => TexFormat::R32G32B32A32Sfloat,
        _ => TexFormat::Undefined,
    }
}

// Collects the usable mip chain of one channel, largest level first.
// Non-square ripmap entries are discarded.
fn channel_levels(levels: &Levels<FlatSamples>) -> Result<Vec<&FlatSamples>, ReadError> {
    match levels {
        Levels::Singular(samples) => Ok(vec![samples]),
        Levels::Mip {
            rounding_mode,
            level_data,
        } => {
            if *rounding_mode != exr::math::RoundingMode::Down {
                log::warn!("exr: unsupported mip rounding mode {rounding_mode:?}");
                return Err(ReadError::CantRepresent);
            }
            Ok(level_data.iter().collect())
        }
        Levels::Rip {
            rounding_mode,
            level_data,
        } => {
            if *rounding_mode != exr::math::RoundingMode::Down {
                log::warn!("exr: unsupported rip rounding mode {rounding_mode:?}");
                return Err(ReadError::CantRepresent);
            }
            log::warn!("exr: discarding non-square ripmap levels");
            let count = level_data.level_count.0.min(level_data.level_count.1);
            Ok((0..count)
                .map(|i| &level_data.map_data[i * level_data.level_count.0 + i])
                .collect())
        }
    }
}

fn sample_bytes(samples: &FlatSamples, index: usize, out: &mut [u8]) {
    match samples {
        FlatSamples::F16(values) => out.copy_from_slice(&values[index].to_le_bytes()),
        FlatSamples::F32(values) => out.copy_from_slice(&values[index].to_le_bytes()),
        FlatSamples::U32(values) => out.copy_from_slice(&values[index].to_le_bytes()),
    }
}

fn decode_exr(data: &[u8], force_rgba: bool) -> Result<Box<dyn ImageProvider>, ReadError> {
    let image = read()
        .no_deep_data()
        .all_resolution_levels()
        .all_channels()
        .all_layers()
        .all_attributes()
        .from_buffered(Cursor::new(data))
        .map_err(map_exr_error)?;

    if image.layer_data.len() != 1 {
        log::warn!("exr: multi-part images not supported");
        return Err(ReadError::CantRepresent);
    }
    let part = &image.layer_data[0];
    let size = Extent3::new(part.size.0 as u32, part.size.1 as u32, 1);
    if size.x == 0 || size.y == 0 {
        return Err(ReadError::Empty);
    }

    // group channels into named layers
    let mut layers: Vec<ChannelLayer> = Vec::new();
    let mut sample_type = None;
    for (index, channel) in part.channel_data.list.iter().enumerate() {
        let full = channel.name.to_string();
        let (layer_name, channel_name) = match full.rsplit_once('.') {
            Some((prefix, suffix)) => (prefix, suffix),
            // no separator means the default layer, so ".R" and "R" collide
            None => ("", full.as_str()),
        };

        let id = match channel_name {
            "R" => 0usize,
            "G" => 1,
            "B" => 2,
            "A" => 3,
            _ => {
                log::debug!("exr: ignoring unknown channel {full}");
                continue;
            }
        };

        let layer = match layers.iter_mut().find(|layer| layer.name == layer_name) {
            Some(layer) => layer,
            None => {
                layers.push(ChannelLayer {
                    name: layer_name.to_string(),
                    mapping: [NO_CHANNEL; 4],
                });
                layers.last_mut().unwrap()
            }
        };

        if layer.mapping[id] != NO_CHANNEL {
            log::warn!("exr: layer has multiple {full} channels");
            return Err(ReadError::UnsupportedFormat);
        }
        layer.mapping[id] = index;

        // rgba channels of all layers must share one sample type
        let chain = channel_levels(&channel.sample_data)?;
        let Some(first) = chain.first() else {
            return Err(ReadError::Empty);
        };
        let ty = sample_type_of(first);
        match sample_type {
            None => sample_type = Some(ty),
            Some(existing) if existing != ty => {
                log::warn!("exr: channels have different sample types");
                return Err(ReadError::UnsupportedFormat);
            }
            Some(_) => {}
        }
    }

    let Some(ty) = sample_type else {
        log::warn!("exr: image has no usable channels");
        return Err(ReadError::Empty);
    };

    // drop layers whose channel set doesn't map to a single common format
    let mut format = None;
    layers.retain(|layer| {
        let layer_format = parse_format(&layer.mapping, ty, force_rgba);
        if layer_format == TexFormat::Undefined {
            log::warn!("exr: layer '{}' has an invalid format, ignoring it", layer.name);
            return false;
        }
        match format {
            None => {
                format = Some(layer_format);
                true
            }
            Some(common) if common == layer_format => true,
            Some(_) => {
                log::warn!("exr: layer '{}' has a different format, ignoring it", layer.name);
                false
            }
        }
    });
    let Some(format) = format else {
        log::warn!("exr: no layer with a parsable format");
        return Err(ReadError::Empty);
    };

    // resolve the mip chain of every referenced channel
    let mut chains: Vec<Option<Vec<&FlatSamples>>> = vec![None; part.channel_data.list.len()];
    let mut num_mips = None;
    for layer in &layers {
        for &index in &layer.mapping {
            if index == NO_CHANNEL {
                continue;
            }
            let chain = channel_levels(&part.channel_data.list[index].sample_data)?;
            match num_mips {
                None => num_mips = Some(chain.len()),
                Some(count) if count != chain.len() => {
                    log::warn!("exr: channels disagree on the number of levels");
                    return Err(ReadError::CantRepresent);
                }
                Some(_) => {}
            }
            chains[index] = Some(chain);
        }
    }
    let num_mips = num_mips.unwrap_or(1) as u32;

    // mip-mapped inputs must come with the full chain
    if num_mips > 1 && num_mips != num_mip_levels(size) {
        log::warn!("exr: image has an invalid number of levels");
        return Err(ReadError::CantRepresent);
    }
    for (index, chain) in chains.iter().enumerate() {
        let Some(chain) = chain else { continue };
        for (level, samples) in chain.iter().enumerate() {
            let m = mip_size(size, level as u32);
            if samples.len() as u64 != m.x as u64 * m.y as u64 {
                log::warn!(
                    "exr: channel {index} level {level} holds {} samples, expected {}",
                    samples.len(),
                    m.x as u64 * m.y as u64
                );
                return Err(ReadError::CantRepresent);
            }
        }
    }

    // interlace the channel planes into one tight linear blob
    let elem = format.element_size() as usize;
    let chan_size = match ty {
        SampleType::F16 => 2usize,
        _ => 4,
    };
    let comps = elem / chan_size;
    let num_layers = layers.len() as u32;

    let mut neutral = [0u8; 4];
    match ty {
        SampleType::F16 => neutral[..2].copy_from_slice(&f16::ONE.to_le_bytes()),
        SampleType::F32 => neutral.copy_from_slice(&1.0f32.to_le_bytes()),
        SampleType::U32 => neutral.copy_from_slice(&1u32.to_le_bytes()),
    }

    let total = tight_texel_count(size, num_layers, num_mips, 0);
    let mut blob = vec![0u8; total as usize * elem];

    for mip in 0..num_mips {
        let m = mip_size(size, mip);
        for (l, layer) in layers.iter().enumerate() {
            let base =
                elem as u64 * tight_texel_number(size, num_layers, mip, l as u32, 0, 0, 0, 0);
            for address in 0..(m.x as usize * m.y as usize) {
                let texel = base as usize + address * elem;
                for c in 0..comps {
                    let dst = &mut blob[texel + c * chan_size..texel + (c + 1) * chan_size];
                    let index = layer.mapping[c];
                    if index == NO_CHANNEL {
                        dst.copy_from_slice(&neutral[..chan_size]);
                    } else {
                        let chain = chains[index].as_ref().unwrap();
                        sample_bytes(chain[mip as usize], address, dst);
                    }
                }
            }
        }
    }

    Ok(wrap_tight(size, format, num_mips, num_layers, blob, false))
}

/// Decodes an EXR stream into an in-memory provider. When `force_rgba` is
/// set, every layer is padded to four channels with neutral values. The
/// stream is handed back on failure.
pub fn load_exr(
    stream: Box<dyn ReadStream>,
    force_rgba: bool,
) -> Result<Box<dyn ImageProvider>, (ReadError, Box<dyn ReadStream>)> {
    let map = match StreamMap::new(stream, false) {
        Ok(map) => map,
        Err((stream, err)) => return Err((err.into(), stream)),
    };

    match decode_exr(map.data(), force_rgba) {
        Ok(provider) => Ok(provider),
        Err(err) => Err((err, map.release())),
    }
}

fn map_exr_write_error(err: exr::error::Error) -> WriteError {
    match err {
        exr::error::Error::NotSupported(_) => WriteError::UnsupportedFormat,
        exr::error::Error::Io(err) => match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                WriteError::CantOpen
            }
            _ => WriteError::CantWrite,
        },
        _ => WriteError::Internal,
    }
}

/// Writes the first mip of the first layer as a zip-compressed EXR.
/// Supports the 16/32-bit float and 32-bit uint rgba format family.
pub fn write_exr_path(
    path: impl AsRef<Path>,
    image: &mut dyn ImageProvider,
) -> Result<(), WriteError> {
    let size = image.size();
    if size.z > 1 {
        log::warn!("write_exr: discarding {} slices", size.z - 1);
    }
    if image.mip_levels() > 1 {
        log::warn!("write_exr: discarding {} mips", image.mip_levels() - 1);
    }
    if image.layers() > 1 {
        log::warn!("write_exr: discarding {} layers", image.layers() - 1);
    }

    let format = image.format();
    let (comps, ty) = match format {
        TexFormat::R16Sfloat => (1usize, SampleType::F16),
        TexFormat::R16G16Sfloat => (2, SampleType::F16),
        TexFormat::R16G16B16Sfloat => (3, SampleType::F16),
        TexFormat::R16G16B16A16Sfloat => (4, SampleType::F16),
        TexFormat::R32Sfloat => (1, SampleType::F32),
        TexFormat::R32G32Sfloat => (2, SampleType::F32),
        TexFormat::R32G32B32Sfloat => (3, SampleType::F32),
        TexFormat::R32G32B32A32Sfloat => (4, SampleType::F32),
        TexFormat::R32Uint => (1, SampleType::U32),
        TexFormat::R32G32Uint => (2, SampleType::U32),
        TexFormat::R32G32B32Uint => (3, SampleType::U32),
        TexFormat::R32G32B32A32Uint => (4, SampleType::U32),
        _ => {
            log::error!("write_exr: can't represent format {format:?}");
            return Err(WriteError::UnsupportedFormat);
        }
    };

    let elem = format.element_size() as usize;
    let pixels = size.x as usize * size.y as usize;

    let data = image.read(0, 0)?;
    if data.len() != pixels * elem {
        log::warn!(
            "write_exr: expected {} bytes from the provider, got {}",
            pixels * elem,
            data.len()
        );
        return Err(WriteError::ReadError);
    }

    // de-interlace into per-channel planes; the crate sorts them into the
    // on-disk name order
    let names = ["R", "G", "B", "A"];
    let mut list = SmallVec::<[AnyChannel<FlatSamples>; 4]>::new();
    for c in 0..comps {
        let plane = match ty {
            SampleType::F16 => {
                let mut values = Vec::with_capacity(pixels);
                for texel in data.chunks_exact(elem) {
                    let bytes = [texel[c * 2], texel[c * 2 + 1]];
                    values.push(f16::from_le_bytes(bytes));
                }
                FlatSamples::F16(values)
            }
            SampleType::F32 => {
                let mut values = Vec::with_capacity(pixels);
                for texel in data.chunks_exact(elem) {
                    let bytes: [u8; 4] = texel[c * 4..c * 4 + 4].try_into().unwrap();
                    values.push(f32::from_le_bytes(bytes));
                }
                FlatSamples::F32(values)
            }
            SampleType::U32 => {
                let mut values = Vec::with_capacity(pixels);
                for texel in data.chunks_exact(elem) {
                    let bytes: [u8; 4] = texel[c * 4..c * 4 + 4].try_into().unwrap();
                    values.push(u32::from_le_bytes(bytes));
                }
                FlatSamples::U32(values)
            }
        };

        list.push(AnyChannel {
            name: Text::new_or_none(names[c]).expect("static channel names are valid"),
            sample_data: plane,
            quantize_linearly: c == 3,
            sampling: Vec2(1, 1),
        });
    }

    let layer = Layer::new(
        (size.x as usize, size.y as usize),
        LayerAttributes::default(),
        Encoding {
            compression: Compression::ZIP16,
            blocks: Blocks::ScanLines,
            line_order: LineOrder::Increasing,
        },
        AnyChannels::sort(list),
    );

    Image::from_layer(layer)
        .write()
        .to_file(path)
        .map_err(map_exr_write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{wrap, ImageData};
    use crate::stream::FileStream;

    fn write_sample(path: &Path, channels: Vec<(&str, Vec<f32>)>, width: usize, height: usize) {
        let mut list = SmallVec::<[AnyChannel<FlatSamples>; 4]>::new();
        for (name, values) in channels {
            assert_eq!(values.len(), width * height);
            list.push(AnyChannel {
                name: Text::new_or_none(name).unwrap(),
                sample_data: FlatSamples::F32(values),
                quantize_linearly: false,
                sampling: Vec2(1, 1),
            });
        }
        let layer = Layer::new(
            (width, height),
            LayerAttributes::default(),
            Encoding::FAST_LOSSLESS,
            AnyChannels::sort(list),
        );
        Image::from_layer(layer).write().to_file(path).unwrap();
    }

    fn load_path(path: &Path) -> Result<Box<dyn ImageProvider>, ReadError> {
        let stream = Box::new(FileStream::open(path).unwrap());
        load_exr(stream, true).map_err(|(err, _)| err)
    }

    fn f32_at(data: &[u8], texel: usize, channel: usize) -> f32 {
        let off = texel * 16 + channel * 4;
        f32::from_le_bytes(data[off..off + 4].try_into().unwrap())
    }

    #[test]
    fn default_layer_with_missing_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.exr");
        write_sample(
            &path,
            vec![
                ("R", vec![0.25, 0.5]),
                ("G", vec![0.75, 1.0]),
                ("B", vec![0.0, 2.0]),
            ],
            2,
            1,
        );

        let mut provider = load_path(&path).unwrap();
        assert_eq!(provider.format(), TexFormat::R32G32B32A32Sfloat);
        assert_eq!(provider.size(), Extent3::new(2, 1, 1));
        assert_eq!(provider.layers(), 1);

        let data = provider.read(0, 0).unwrap().to_vec();
        assert_eq!(f32_at(&data, 0, 0), 0.25);
        assert_eq!(f32_at(&data, 1, 1), 1.0);
        assert_eq!(f32_at(&data, 1, 2), 2.0);
        // absent alpha fills with the neutral constant
        assert_eq!(f32_at(&data, 0, 3), 1.0);
        assert_eq!(f32_at(&data, 1, 3), 1.0);
    }

    #[test]
    fn named_layers_become_array_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layered.exr");
        write_sample(
            &path,
            vec![
                ("R", vec![0.1]),
                ("G", vec![0.2]),
                ("B", vec![0.3]),
                ("diffuse.R", vec![0.4]),
                ("diffuse.G", vec![0.5]),
                ("diffuse.B", vec![0.6]),
                // unknown channel code, the whole layer is dropped
                ("broken.Z", vec![9.0]),
            ],
            1,
            1,
        );

        let mut provider = load_path(&path).unwrap();
        assert_eq!(provider.layers(), 2);
        assert_eq!(provider.format(), TexFormat::R32G32B32A32Sfloat);

        let first = provider.read(0, 0).unwrap().to_vec();
        let second = provider.read(0, 1).unwrap().to_vec();
        let reds: Vec<f32> = [&first, &second].iter().map(|d| f32_at(d, 0, 0)).collect();
        assert!(reds.contains(&0.1));
        assert!(reds.contains(&0.4));
    }

    #[test]
    fn roundtrip_via_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.exr");

        let mut texels = Vec::new();
        for i in 0..4 {
            texels.extend_from_slice(&(i as f32 * 0.25).to_le_bytes());
            texels.extend_from_slice(&(i as f32 * 0.5).to_le_bytes());
            texels.extend_from_slice(&(i as f32).to_le_bytes());
            texels.extend_from_slice(&1.0f32.to_le_bytes());
        }
        let mut provider = wrap(ImageData {
            size: Extent3::new(2, 2, 1),
            format: TexFormat::R32G32B32A32Sfloat,
            data: texels.clone().into_boxed_slice(),
        });

        write_exr_path(&path, provider.as_mut()).unwrap();

        let mut reloaded = load_path(&path).unwrap();
        assert_eq!(reloaded.format(), TexFormat::R32G32B32A32Sfloat);
        assert_eq!(reloaded.size(), Extent3::new(2, 2, 1));
        assert_eq!(reloaded.read(0, 0).unwrap(), &texels[..]);
    }

    #[test]
    fn mixed_sample_types_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.exr");

        let mut list = SmallVec::<[AnyChannel<FlatSamples>; 4]>::new();
        list.push(AnyChannel {
            name: Text::new_or_none("R").unwrap(),
            sample_data: FlatSamples::F32(vec![1.0]),
            quantize_linearly: false,
            sampling: Vec2(1, 1),
        });
        list.push(AnyChannel {
            name: Text::new_or_none("G").unwrap(),
            sample_data: FlatSamples::F16(vec![f16::ONE]),
            quantize_linearly: false,
            sampling: Vec2(1, 1),
        });
        let layer = Layer::new(
            (1usize, 1usize),
            LayerAttributes::default(),
            Encoding::FAST_LOSSLESS,
            AnyChannels::sort(list),
        );
        Image::from_layer(layer).write().to_file(&path).unwrap();

        let err = load_path(&path).unwrap_err();
        assert_eq!(err, ReadError::UnsupportedFormat);
    }
}
