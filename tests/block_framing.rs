//! # Block Framing Integration Tests
//!
//! End-to-end coverage of the encrypted block pipeline: rows in, blocks
//! out, rows back, with lineage recorded and tampering rejected.
//!
//! ## Test Strategy
//!
//! 1. Round-trip single rows and multi-block streams through the bulk
//!    and streaming writers
//! 2. Verify padded-size accounting against the framing headers
//! 3. Corrupt authenticated header fields and expect cipher failures
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test block_framing
//! ```

use sealdb::config::{BLOCK_HEADER_SIZE, MAX_BLOCK_SIZE};
use sealdb::{
    crypto, AttrType, EngineError, OpCode, Record, RowReader, RowWriter, StreamRowReader,
    StreamRowWriter, VerifySet,
};

fn make_row(id: u32, name: &str, score: f32) -> Record {
    let mut rec = Record::new();
    rec.add_attr(AttrType::Int, &id.to_le_bytes()).unwrap();
    rec.add_attr(AttrType::Str, name.as_bytes()).unwrap();
    rec.add_attr(AttrType::Float, &score.to_le_bytes()).unwrap();
    rec
}

fn read_id(rec: &Record) -> u32 {
    let v = rec.get_attr_value(1).unwrap();
    u32::from_le_bytes([v[0], v[1], v[2], v[3]])
}

#[test]
fn single_record_roundtrips_byte_for_byte() {
    let rec = make_row(42, "ab", 1.5);
    assert_eq!(rec.len(), 29);

    let mut buf = vec![0u8; 4096];
    let written = rec.write(&mut buf).unwrap();
    let mut back = Record::new();
    let read = back.read(&buf).unwrap();

    assert_eq!(written, read);
    assert_eq!(back.num_cols(), 3);
    assert_eq!(back.bytes(), rec.bytes());
}

#[test]
fn bulk_pipeline_preserves_rows_and_lineage() {
    let rows: Vec<Record> = (0..300)
        .map(|i| make_row(i, &format!("row-{i}"), i as f32 * 0.5))
        .collect();

    let mut out = vec![0u8; MAX_BLOCK_SIZE * 4];
    let mut writer = RowWriter::new(&mut out);
    writer.set_self_task_id(OpCode::SortCol1.task_id(0));
    for row in &rows {
        writer.write(row).unwrap();
    }
    writer.close().unwrap();
    let written = writer.bytes_written();

    let mut verify = VerifySet::new();
    let mut reader = RowReader::with_verify(&out[..written], &mut verify).unwrap();
    let mut row = Record::new();
    let mut count = 0u32;
    while reader.has_next() {
        reader.read(&mut row).unwrap();
        assert_eq!(read_id(&row), count);
        count += 1;
    }
    drop(reader);

    assert_eq!(count, 300);
    assert!(verify.contains(OpCode::SortCol1.task_id(0)));
}

#[test]
fn padded_accounting_matches_the_header() {
    let mut out = vec![0u8; 16 * 1024];
    let mut writer = RowWriter::with_row_upper_bound(&mut out, 100);
    writer.write(&make_row(1, "first", 0.0)).unwrap();
    writer.write(&make_row(2, "the-second-row", 0.0)).unwrap();
    writer.close().unwrap();
    let written = writer.bytes_written();

    let header = sealdb::BlockHeader::parse(&out[..written]).unwrap();
    assert_eq!(header.num_rows(), 2);
    assert_eq!(header.enc_size() as usize, crypto::ciphertext_len(200));
    assert_eq!(written, BLOCK_HEADER_SIZE + crypto::ciphertext_len(200));
}

#[test]
fn every_header_byte_is_authenticated() {
    let mut out = vec![0u8; 16 * 1024];
    let mut writer = RowWriter::new(&mut out);
    writer.set_self_task_id(99);
    writer.write(&make_row(1, "a", 0.0)).unwrap();
    writer.write(&make_row(2, "b", 0.0)).unwrap();
    writer.close().unwrap();
    let written = writer.bytes_written();

    for byte in 0..BLOCK_HEADER_SIZE {
        let mut tampered = out[..written].to_vec();
        tampered[byte] ^= 0x40;
        let result = RowReader::new(&tampered);
        assert!(
            matches!(result.unwrap_err(), EngineError::Cipher | EngineError::Format(_)),
            "header byte {byte} accepted after tampering"
        );
    }
}

#[test]
fn stream_pipeline_matches_bulk_semantics() -> eyre::Result<()> {
    let rows: Vec<Record> = (0..50).map(|i| make_row(i, "payload", 2.25)).collect();

    let mut out = vec![0u8; MAX_BLOCK_SIZE * 2];
    let mut writer = StreamRowWriter::new(&mut out, OpCode::SortCol2);
    writer.set_part_index(4);
    for row in &rows {
        writer.write(row)?;
    }
    writer.close()?;
    let written = writer.bytes_written();

    let mut verify = VerifySet::new();
    let mut reader = StreamRowReader::with_verify(&out[..written], &mut verify)?;
    let mut row = Record::new();
    let mut count = 0u32;
    while reader.has_next() {
        reader.read(&mut row)?;
        assert_eq!(read_id(&row), count);
        count += 1;
    }
    drop(reader);

    assert_eq!(count, 50);
    assert!(verify.contains(OpCode::SortCol2.task_id(4)));
    Ok(())
}

#[test]
fn dummy_rows_travel_like_live_rows() {
    let mut padding = make_row(7, "pad", 0.0);
    padding.mark_dummy();

    let mut out = vec![0u8; 16 * 1024];
    let mut writer = RowWriter::new(&mut out);
    writer.write(&make_row(1, "live", 1.0)).unwrap();
    writer.write(&padding).unwrap();
    writer.close().unwrap();
    let written = writer.bytes_written();

    let mut reader = RowReader::new(&out[..written]).unwrap();
    let mut row = Record::new();
    reader.read(&mut row).unwrap();
    assert!(!row.is_dummy());
    reader.read(&mut row).unwrap();
    assert!(row.is_dummy());
    assert_eq!(read_id(&row), 7);
}

#[test]
fn empty_stream_emits_a_skippable_block() {
    let mut out = vec![0u8; 4096];
    let mut writer = RowWriter::with_row_upper_bound(&mut out, 64);
    writer.close().unwrap();
    let written = writer.bytes_written();
    assert_eq!(written, BLOCK_HEADER_SIZE + crypto::ciphertext_len(0));

    let reader = RowReader::new(&out[..written]).unwrap();
    assert!(!reader.has_next());
}
