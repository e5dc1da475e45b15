//! Integration tests for vertical profile files and raw HDF5 access.

mod common;

use std::io::Write;

use odim::prelude::*;
use odim::h5::SIGNATURE;
use odim::util::Value;
use tempfile::NamedTempFile;
use time::macros::datetime;

fn geometry() -> ProfileGeometry {
    ProfileGeometry {
        latitude: -27.72,
        longitude: 153.24,
        height: 174.0,
        levels: 8,
        interval: 250.0,
        min_height: 0.0,
        max_height: 2000.0,
    }
}

#[test]
fn test_profile_file_round_trip() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let t0 = datetime!(2014-03-10 06:00:00 UTC);
    let t1 = datetime!(2014-03-10 06:10:00 UTC);
    let speeds: Vec<f32> = (0..8).map(|i| i as f32 * 2.5).collect();

    {
        let mut vp = VerticalProfile::create_file(temp.path(), t0, &geometry())?;
        vp.set_source("WMO:94580,NOD:aubri")?;
        let mut profile = vp.add_profile(t0, t1)?;
        profile.add_layer(Quantity::Uwnd, false, &speeds, -9999.0, -9999.0)?;
        profile.add_layer(Quantity::Other("DD".to_string()), false, &[90.0f32; 8], -9999.0, -9999.0)?;
        vp.add_profile(t1, t1)?;
        vp.flush()?;
    }

    let vp = VerticalProfile::open_file(temp.path(), true)?;
    assert_eq!(vp.geometry()?, geometry());
    assert_eq!(vp.source()?, "WMO:94580,NOD:aubri");
    assert_eq!(vp.valid_time()?, t0);
    assert_eq!(vp.profile_count(), 2);

    let profile = vp.profile(0)?;
    assert_eq!(profile.start_time()?, t0);
    assert_eq!(profile.end_time()?, t1);
    assert_eq!(profile.layer_count(), 2);
    assert_eq!(profile.layer_quantity(1)?, &Quantity::Other("DD".to_string()));
    let ff = profile.find_layer("UWND")?.expect("UWND layer");
    assert_eq!(ff.dims(), &Dimensions::d1(8));
    assert_eq!(ff.read_vec::<f32>()?.0, speeds);
    assert_eq!(vp.profile(1)?.layer_count(), 0);
    Ok(())
}

#[test]
fn test_profile_buffer_length_checked() -> Result<()> {
    common::init_tracing();
    let file = File::in_memory();
    let t = datetime!(2014-03-10 06:00:00 UTC);
    let mut vp = VerticalProfile::create(file.root(), t, &geometry())?;
    let mut profile = vp.add_profile(t, t)?;
    let mut layer = profile.add_layer(Quantity::Hght, false, &[0.0f64; 8], -1.0, -1.0)?;

    let mut short = [0.0f64; 4];
    assert!(matches!(layer.read(&mut short), Err(Error::SizeMismatch { .. })));
    assert!(matches!(layer.write(&short, -1.0, -1.0), Err(Error::SizeMismatch { .. })));
    Ok(())
}

#[test]
fn test_volume_opened_as_profile() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        Volume::create_file(temp.path(), datetime!(2014-03-10 06:00:00 UTC), 0.0, 0.0, 0.0)?;
    }
    match VerticalProfile::open_file(temp.path(), true) {
        Err(Error::ProductMismatch { expected, actual, .. }) => {
            assert_eq!(expected, "VP");
            assert_eq!(actual, "PVOL");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_open_rejects_foreign_files() {
    common::init_tracing();
    let mut png = NamedTempFile::new().expect("Failed to create temp file");
    png.write_all(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").expect("write");
    png.flush().expect("flush");
    assert!(matches!(File::open(png.path(), true), Err(Error::InvalidMagic)));

    // signature followed by a cut-off superblock
    let mut truncated = NamedTempFile::new().expect("Failed to create temp file");
    truncated.write_all(b"\x89HDF\r\n\x1a\n\0\0\0\0\0\0\0\0").expect("write");
    truncated.flush().expect("flush");
    assert!(matches!(File::open(truncated.path(), true), Err(Error::InvalidStructure(_))));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.h5");
    assert!(matches!(Volume::open_file(&missing, true), Err(Error::FileNotFound(_))));
}

#[test]
fn test_store_without_mmap() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    {
        let file = File::create(temp.path())?;
        let root = file.root();
        root.create_attr("Conventions", "ODIM_H5/V2_0".into())?;
        let child = root.create_group("what")?;
        child.create_attr("nodes", 3i64.into())?;
        file.flush()?;
    }

    let bytes = std::fs::read(temp.path()).expect("read back");
    assert_eq!(&bytes[..8], SIGNATURE);
    // version 0 superblock, end of file address matches the file length
    assert_eq!(bytes[8], 0);
    assert_eq!(u64::from_le_bytes(bytes[40..48].try_into().expect("eof field")), bytes.len() as u64);

    let file = OpenOptions::new().read_only(true).use_mmap(false).open(temp.path())?;
    let root = file.root();
    assert!(file.is_read_only());
    assert_eq!(root.child_count()?, 1);
    assert_eq!(root.open_group("what")?.read_attr("nodes")?, Value::Int(3));
    assert!(matches!(root.create_group("where"), Err(Error::ReadOnly)));
    Ok(())
}
