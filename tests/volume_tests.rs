//! Integration tests for polar volume files written to disk and read back.

mod common;

use odim::core::DatasetLayout;
use odim::odim::new_att;
use odim::prelude::*;
use odim::util::Value;
use tempfile::NamedTempFile;
use time::macros::datetime;
use time::OffsetDateTime;

fn scan_params(azimuth_count: usize, range_bin_count: usize) -> ScanParams {
    ScanParams {
        elevation: 0.5,
        azimuth_count,
        range_bin_count,
        first_azimuth: 0,
        range_start: 0.0,
        range_scale: 250.0,
        start_time: datetime!(2011-06-24 04:00:00 UTC),
        end_time: datetime!(2011-06-24 04:00:30 UTC),
    }
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32 * 0.25 - 10.0).collect()
}

#[test]
fn test_identity_round_trip() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let values = ramp(360 * 10);

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, -34.01, 151.23, 112.0)?;
        let mut scan = volume.add_scan(&scan_params(360, 10))?;
        scan.add_layer(Quantity::Dbzh, false, &values, -9999.0, -32.0)?;
    }

    let volume = Volume::open_file(temp.path(), true)?;
    assert_eq!(volume.scan_count(), 1);
    let scan = volume.scan(0)?;
    let layer = scan.layer(0)?;
    assert!(layer.floating_point());

    let mut out = vec![0.0f32; 3600];
    let sentinels = layer.read(&mut out)?;
    assert_eq!(out, values);
    assert_eq!(sentinels, Sentinels { no_data: -9999.0, undetect: -32.0 });
    Ok(())
}

#[test]
fn test_calibrated_round_trip() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let physical: Vec<f32> = (0..40).map(|i| i as f32 * 1.7 - 20.0).collect();
    let counts: Vec<u16> = (0..40).map(|i| i * 3 + 10).collect();

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        let mut scan = volume.add_scan(&scan_params(4, 10))?;

        let mut dbzh = scan.add_layer(Quantity::Dbzh, false, &vec![0.0f32; 40], 0.0, 0.0)?;
        dbzh.set_calibration(0.5, -32.0)?;
        dbzh.write(&physical, -9999.0, -32.0)?;

        let mut vrad = scan.add_layer(Quantity::Vrad, false, &vec![0u16; 40], 0, 0)?;
        vrad.set_calibration(0.3, 5.0)?;
        vrad.write(&counts, 0, 5)?;
        volume.flush()?;
    }

    let volume = Volume::open_file(temp.path(), true)?;
    let scan = volume.scan(0)?;

    let dbzh = scan.find_layer("DBZH")?.expect("DBZH layer");
    assert_eq!(dbzh.gain(), 0.5);
    assert_eq!(dbzh.offset(), -32.0);
    let (values, sentinels) = dbzh.read_vec::<f32>()?;
    for (a, b) in values.iter().zip(&physical) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
    assert!((sentinels.no_data + 9999.0).abs() < 1e-3);
    assert!((sentinels.undetect + 32.0).abs() < 1e-4);

    let vrad = scan.find_layer("VRAD")?.expect("VRAD layer");
    let (values, _) = vrad.read_vec::<u16>()?;
    for (a, b) in values.iter().zip(&counts) {
        assert!((*a as i32 - *b as i32).abs() <= 1, "{a} vs {b}");
    }
    Ok(())
}

#[test]
fn test_layer_enumeration_order() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let raw = ramp(6);

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        let mut scan = volume.add_scan(&scan_params(2, 3))?;
        for q in [Quantity::Dbzh, Quantity::Vrad, Quantity::Wrad] {
            scan.add_layer(q, false, &raw, -1.0, -2.0)?;
        }
        let qind = scan.add_layer(Quantity::Qind, true, &raw, -1.0, -2.0)?;
        assert_eq!(qind.index(), 1);
        scan.add_layer(Quantity::Class, true, &raw, -1.0, -2.0)?;
        assert_eq!(scan.layer_count(), 5);
    }

    let volume = Volume::open_file(temp.path(), true)?;
    let scan = volume.scan(0)?;
    assert_eq!(scan.layer_count(), 5);
    assert_eq!(scan.layer_quantity(0)?, &Quantity::Dbzh);
    assert_eq!(scan.layer_quantity(4)?, &Quantity::Class);
    assert!(scan.layer(3)?.is_quality());
    assert!(!scan.layer(2)?.is_quality());
    assert!(scan.find_layer("NONEXISTENT")?.is_none());
    assert!(matches!(scan.layer(5), Err(Error::LayerOutOfBounds { index: 5, count: 5 })));
    Ok(())
}

#[test]
fn test_timestamp_round_trip() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let t = OffsetDateTime::from_unix_timestamp(1_308_888_309).expect("valid timestamp");

    {
        Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
    }

    let volume = Volume::open_file(temp.path(), true)?;
    assert_eq!(volume.valid_time()?.unix_timestamp(), 1_308_888_309);
    Ok(())
}

#[test]
fn test_declared_size_mismatch() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        let scan = volume.add_scan(&scan_params(360, 500))?;

        // a layer whose array does not match the scan geometry
        let layer = scan.node().group().create_group("data1")?;
        let what = layer.create_group("what")?;
        new_att(&what, "quantity", &Quantity::Dbzh)?;
        new_att(&what, "gain", &1.0f64)?;
        new_att(&what, "offset", &0.0f64)?;
        new_att(&what, "nodata", &-9999.0f64)?;
        new_att(&what, "undetect", &-32.0f64)?;
        let layout = DatasetLayout::new(ElementType::Float32, Dimensions::d2(10, 10));
        layer.create_dataset("data", &layout)?;
    }

    let volume = Volume::open_file(temp.path(), true)?;
    let scan = volume.scan(0)?;
    assert_eq!(scan.layer_count(), 1);
    let layer = scan.layer(0)?;
    let mut out = vec![0.0f32; 360 * 500];
    match layer.read(&mut out) {
        Err(Error::DimensionMismatch { declared, stored, .. }) => {
            assert_eq!(declared, 180_000);
            assert_eq!(stored, 100);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_scan_opened_as_profile() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        volume.add_scan(&scan_params(2, 2))?;
    }

    let volume = Volume::open_file(temp.path(), true)?;
    let result = Profile::open(volume.node().group(), 1, 10);
    assert!(matches!(result, Err(Error::ProductMismatch { .. })));
    assert!(matches!(
        VerticalProfile::open_file(temp.path(), true),
        Err(Error::ProductMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_read_only_rejects_changes() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        volume.add_scan(&scan_params(1, 2))?;
    }

    let mut volume = Volume::open_file(temp.path(), true)?;
    assert!(matches!(volume.set_source("WMO:00000"), Err(Error::ReadOnly)));
    assert!(matches!(volume.add_scan(&scan_params(1, 2)), Err(Error::ReadOnly)));
    assert_eq!(volume.scan_count(), 1);

    let mut scan = volume.scan(0)?;
    assert!(matches!(
        scan.add_layer(Quantity::Dbzh, false, &[0.0f32; 2], 0.0, 0.0),
        Err(Error::ReadOnly)
    ));
    assert_eq!(scan.layer_count(), 0);
    Ok(())
}

#[test]
fn test_reopen_and_append() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        let mut scan = volume.add_scan(&scan_params(1, 2))?;
        scan.add_layer(Quantity::Dbzh, false, &[1.0f32, 2.0], 0.0, 0.0)?;
    }

    {
        let mut volume = Volume::open_file(temp.path(), false)?;
        volume.set_source("WMO:94910")?;
        volume.node_mut().set_how_attr("software", &"RAINFIELDS".to_string())?;
        let mut scan = volume.scan(0)?;
        scan.add_layer(Quantity::Th, false, &[3.0f32, 4.0], 0.0, 0.0)?;
        volume.add_scan(&scan_params(1, 2))?;
    }

    let file = OpenOptions::new().read_only(true).use_mmap(false).open(temp.path())?;
    let volume = Volume::open(file.root())?;
    assert_eq!(volume.scan_count(), 2);
    assert_eq!(volume.source()?, "WMO:94910");
    assert_eq!(volume.node().how_attr_count(), 1);
    assert_eq!(volume.node().how_attr::<String>("software")?.as_deref(), Some("RAINFIELDS"));

    let scan: Scan<Group> = volume.scan(0)?;
    assert_eq!(scan.layer_count(), 2);
    let th = scan.find_layer("TH")?.expect("TH layer");
    assert_eq!(th.index(), 2);
    assert_eq!(th.read_vec::<f32>()?.0, vec![3.0, 4.0]);
    Ok(())
}

#[test]
fn test_layer_array_attributes() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");

    {
        let t = datetime!(2011-06-24 04:00:00 UTC);
        let mut volume = Volume::create_file(temp.path(), t, 0.0, 0.0, 0.0)?;
        let mut scan = volume.add_scan(&scan_params(2, 2))?;
        scan.add_layer(Quantity::Dbzh, false, &[1i32, 2, 3, 4], 0, 0)?;
    }

    let file = File::open(temp.path(), true)?;
    let array = file.root().open_group("dataset1")?.open_group("data1")?.open_dataset("data")?;
    assert_eq!(array.element_type()?, ElementType::Int32);
    assert_eq!(array.read_attr("CLASS")?, Value::from("IMAGE"));
    assert_eq!(array.read_attr("IMAGE_VERSION")?, Value::from("1.2"));
    Ok(())
}

#[test]
fn test_close_persists_volume() -> Result<()> {
    common::init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let t = datetime!(2011-06-24 04:00:00 UTC);

    let mut volume = Volume::create_file(temp.path(), t, -34.01, 151.23, 112.0)?;
    let mut scan = volume.add_scan(&scan_params(2, 2))?;
    scan.add_layer(Quantity::Dbzh, false, &[1.0f32, 2.0, 3.0, 4.0], -9999.0, -32.0)?;
    volume.close()?;

    let volume = Volume::open_file(temp.path(), true)?;
    assert_eq!(volume.scan_count(), 1);
    assert_eq!(volume.scan(0)?.layer(0)?.read_vec::<f32>()?.0, vec![1.0, 2.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn test_close_reports_write_failure() -> Result<()> {
    common::init_tracing();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("pvol.h5");
    let t = datetime!(2011-06-24 04:00:00 UTC);

    let mut volume = Volume::create_file(&path, t, 0.0, 0.0, 0.0)?;
    volume.add_scan(&scan_params(1, 2))?;
    // the directory holding the file disappears before the changes are written
    std::fs::remove_dir_all(dir.path()).expect("Failed to remove temp dir");

    assert!(matches!(volume.flush(), Err(Error::Io(_))));
    assert!(matches!(volume.close(), Err(Error::Io(_))));
    Ok(())
}
