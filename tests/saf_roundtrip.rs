//! Container round-trip tests: write a SAF file, read it back, verify
//! structure, attributes, layout and data; exercise the failure paths.

use simarch::core::{attrs, ArchiveSink, ArchiveSource, Compression, DatasetInfo, RowBlock};
use simarch::saf::{Reader, Writer};
use simarch::{Dtype, Error};

use tempfile::TempDir;

fn flat(values: impl Iterator<Item = f64>) -> Vec<f64> {
    values.collect()
}

#[test]
fn test_roundtrip_groups_and_attributes() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");

    {
        let mut w = Writer::create(&path).expect("create archive");
        w.write_attributes("", &attrs([("producer", "simarch")])).unwrap();
        w.create_group("data/input/ball").unwrap();
        w.write_attributes(
            "data/input/ball",
            &attrs([
                ("id", simarch::core::AttrValue::Int(1)),
                ("mass", simarch::core::AttrValue::Float(2.5)),
            ]),
        )
        .unwrap();
        w.finish().expect("finalize");
    }

    let r = Reader::open(&path).expect("open archive");
    assert_eq!(r.attributes("").unwrap()["producer"].as_text(), Some("simarch"));
    assert!(r.contains("data/input"));
    let ball = r.attributes("data/input/ball").unwrap();
    assert_eq!(ball["id"].as_int(), Some(1));
    assert_eq!(ball["mass"], simarch::core::AttrValue::Float(2.5));
    let kids = r.children("data").unwrap();
    assert_eq!(kids.len(), 1);
    assert_eq!(kids[0].0, "input");
}

#[test]
fn test_roundtrip_contiguous_dataset() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");

    let info = DatasetInfo::new(Dtype::Float64, vec![6, 2]);
    let values = flat((0..12).map(|i| i as f64));
    {
        let mut w = Writer::create(&path).unwrap();
        w.create_dataset("data/dynamic", &info).unwrap();
        w.write_rows("data/dynamic", 0, &RowBlock::from_f64(2, &values)).unwrap();
        w.finish().unwrap();
    }

    let r = Reader::open(&path).unwrap();
    assert_eq!(r.dataset_info("data/dynamic").unwrap(), info);
    let rows = r.read_rows("data/dynamic", &[0, 1, 2, 3, 4, 5]).unwrap();
    assert_eq!(rows.as_bytes(), RowBlock::from_f64(2, &values).as_bytes());
    // arbitrary positional access
    let picked = r.read_rows("data/dynamic", &[5, 0, 3]).unwrap();
    assert_eq!(picked.get(0, 1), 11.0);
    assert_eq!(picked.get(1, 0), 0.0);
    assert_eq!(picked.get(2, 0), 6.0);
}

#[test]
fn test_roundtrip_compressed_shuffled_checksummed() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");

    let info = DatasetInfo::new(Dtype::Float64, vec![100, 3])
        .with_chunk(vec![16, 3])
        .with_compression(Compression::deflate(9, true))
        .with_checksum(true);
    let values = flat((0..300).map(|i| (i / 3) as f64));
    {
        let mut w = Writer::create(&path).unwrap();
        w.create_dataset("data/velocities", &info).unwrap();
        // write in two uneven batches to cross block boundaries
        let block = RowBlock::from_f64(3, &values);
        w.write_rows("data/velocities", 0, &block.gather(&(0..37).collect::<Vec<_>>()))
            .unwrap();
        w.write_rows("data/velocities", 37, &block.gather(&(37..100).collect::<Vec<_>>()))
            .unwrap();
        w.finish().unwrap();
    }

    let r = Reader::open(&path).unwrap();
    let idx: Vec<u64> = (0..100).collect();
    let rows = r.read_rows("data/velocities", &idx).unwrap();
    for i in 0..100 {
        assert_eq!(rows.get(i, 0), i as f64, "row {i}");
    }
    // compressed storage should beat 2400 raw bytes by a wide margin
    let raw_len = 100 * 3 * 8;
    let file_len = std::fs::metadata(&path).unwrap().len() as usize;
    assert!(file_len < raw_len, "compression had no effect ({file_len} bytes)");
}

#[test]
fn test_create_refuses_existing_target() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");
    std::fs::write(&path, b"already here").unwrap();

    match Writer::create(&path) {
        Err(Error::TargetExists(p)) => assert_eq!(p, path),
        other => panic!("expected TargetExists, got {other:?}"),
    }
    // the pre-existing file is untouched
    assert_eq!(std::fs::read(&path).unwrap(), b"already here");
}

#[test]
fn test_rows_must_append_in_order() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");

    let mut w = Writer::create(&path).unwrap();
    let info = DatasetInfo::new(Dtype::Float64, vec![4, 1]);
    w.create_dataset("d", &info).unwrap();
    let block = RowBlock::from_f64(1, &[1.0]);
    w.write_rows("d", 0, &block).unwrap();
    assert!(matches!(
        w.write_rows("d", 2, &block),
        Err(Error::InvalidStructure(_))
    ));
}

#[test]
fn test_unfinished_file_does_not_open() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");
    {
        let mut w = Writer::create(&path).unwrap();
        w.create_group("data").unwrap();
        // dropped without finish: no index, no footer
    }
    assert!(Reader::open(&path).is_err());
}

#[test]
fn test_checksum_mismatch_detected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");

    let info = DatasetInfo::new(Dtype::Float64, vec![4, 1]).with_checksum(true);
    {
        let mut w = Writer::create(&path).unwrap();
        w.create_dataset("d", &info).unwrap();
        w.write_rows("d", 0, &RowBlock::from_f64(1, &[1.0, 2.0, 3.0, 4.0])).unwrap();
        w.finish().unwrap();
    }

    // flip one byte inside the first (and only) data block, which starts
    // right after the 12-byte header
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[14] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    let r = Reader::open(&path).unwrap();
    assert!(matches!(
        r.read_rows("d", &[0]),
        Err(Error::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_truncated_file_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");
    std::fs::write(&path, b"SIMARCH\0tiny").unwrap();
    assert!(matches!(Reader::open(&path), Err(Error::UnexpectedEof(_))));
}

#[test]
fn test_wrong_magic_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("run.sim");
    std::fs::write(&path, vec![0u8; 64]).unwrap();
    assert!(matches!(Reader::open(&path), Err(Error::InvalidMagic)));
}
