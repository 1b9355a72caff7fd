//! Container round-trips through the public api.

use std::io::Cursor;

use teximg::{
    load_image_bytes, load_image_layers, load_image_path, wrap_faces, write_ktx, write_ktx2,
    write_ktx_path, write_png, Extent3, Format, ImageProvider,
};

fn gradient_faces(size: Extent3, format: Format, mips: u32, layers: u32) -> Vec<Box<[u8]>> {
    let mut faces = Vec::new();
    for mip in 0..mips {
        let len = teximg::size_bytes(size, mip, format) as usize;
        for layer in 0..layers {
            let seed = (mip * layers + layer) as u8;
            faces.push(
                (0..len)
                    .map(|i| seed.wrapping_mul(31).wrapping_add(i as u8))
                    .collect(),
            );
        }
    }
    faces
}

fn assert_equal_providers(a: &mut dyn ImageProvider, b: &mut dyn ImageProvider) {
    assert_eq!(a.size(), b.size());
    assert_eq!(a.format(), b.format());
    assert_eq!(a.layers(), b.layers());
    assert_eq!(a.mip_levels(), b.mip_levels());
    assert_eq!(a.cubemap(), b.cubemap());

    for mip in 0..a.mip_levels() {
        for layer in 0..a.layers() {
            let expected = a.read(mip, layer).unwrap().to_vec();
            let actual = b.read(mip, layer).unwrap();
            assert_eq!(expected, actual, "mip {mip} layer {layer}");
        }
    }
}

#[test]
fn ktx_single_texel_is_72_bytes() {
    let mut provider = wrap_faces(
        Extent3::new(1, 1, 1),
        Format::R8G8B8A8Unorm,
        1,
        1,
        vec![vec![0x11, 0x22, 0x33, 0x44].into_boxed_slice()],
        false,
    );

    let mut bytes = Cursor::new(Vec::new());
    write_ktx(&mut bytes, provider.as_mut()).unwrap();
    let bytes = bytes.into_inner();
    assert_eq!(bytes.len(), 72);

    let mut reloaded = load_image_bytes(bytes).unwrap();
    assert_equal_providers(provider.as_mut(), reloaded.as_mut());
}

#[test]
fn ktx_array_roundtrip() {
    let size = Extent3::new(8, 4, 1);
    let format = Format::R8G8Unorm;
    let faces = gradient_faces(size, format, 4, 3);
    let mut provider = wrap_faces(size, format, 4, 3, faces, false);

    let mut bytes = Cursor::new(Vec::new());
    write_ktx(&mut bytes, provider.as_mut()).unwrap();

    let mut reloaded = load_image_bytes(bytes.into_inner()).unwrap();
    assert_equal_providers(provider.as_mut(), reloaded.as_mut());
}

#[test]
fn ktx2_roundtrip_plain_and_zlib() {
    let size = Extent3::new(4, 4, 1);
    let format = Format::R8G8B8A8Srgb;
    let faces = gradient_faces(size, format, 3, 6);
    let mut provider = wrap_faces(size, format, 3, 6, faces, true);

    for zlib in [false, true] {
        let mut bytes = Cursor::new(Vec::new());
        write_ktx2(&mut bytes, provider.as_mut(), zlib).unwrap();

        let mut reloaded = load_image_bytes(bytes.into_inner()).unwrap();
        assert!(reloaded.cubemap());
        assert_equal_providers(provider.as_mut(), reloaded.as_mut());
    }
}

#[test]
fn ktx2_16bit_roundtrip() {
    let size = Extent3::new(5, 3, 1);
    let format = Format::R16G16B16A16Sfloat;
    let faces = gradient_faces(size, format, 1, 2);
    let mut provider = wrap_faces(size, format, 1, 2, faces, false);

    let mut bytes = Cursor::new(Vec::new());
    write_ktx2(&mut bytes, provider.as_mut(), true).unwrap();

    let mut reloaded = load_image_bytes(bytes.into_inner()).unwrap();
    assert_equal_providers(provider.as_mut(), reloaded.as_mut());
}

#[test]
fn png_through_the_dispatcher() {
    let size = Extent3::new(3, 2, 1);
    let format = Format::R8G8B8A8Srgb;
    let faces = gradient_faces(size, format, 1, 1);
    let mut provider = wrap_faces(size, format, 1, 1, faces, false);

    let mut bytes = Vec::new();
    write_png(&mut bytes, provider.as_mut()).unwrap();

    let mut reloaded = load_image_bytes(bytes).unwrap();
    assert_equal_providers(provider.as_mut(), reloaded.as_mut());
}

#[test]
fn layered_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let size = Extent3::new(2, 2, 1);
    let format = Format::R8G8B8A8Unorm;

    let mut paths = Vec::new();
    for i in 0..2u8 {
        let faces = vec![vec![i * 10; 16].into_boxed_slice()];
        let mut provider = wrap_faces(size, format, 1, 1, faces, false);
        let path = dir.path().join(format!("layer{i}.ktx"));
        write_ktx_path(&path, provider.as_mut()).unwrap();
        paths.push(path);
    }

    // stacked as array layers
    let mut layered = load_image_layers(&paths, false, false).unwrap();
    assert_eq!(layered.layers(), 2);
    assert_eq!(layered.read(0, 1).unwrap(), &[10u8; 16][..]);

    // stacked as depth slices
    let mut sliced = load_image_layers(&paths, false, true).unwrap();
    assert_eq!(sliced.size(), Extent3::new(2, 2, 2));
    assert_eq!(sliced.layers(), 1);
    let volume = sliced.read(0, 0).unwrap();
    assert_eq!(&volume[..16], &[0u8; 16]);
    assert_eq!(&volume[16..], &[10u8; 16]);

    // single image loads by path with extension hint
    let mut single = load_image_path(&paths[1]).unwrap();
    assert_eq!(single.read(0, 0).unwrap(), &[10u8; 16][..]);
}
