//! Record and block benchmarks for sealdb
//!
//! These benchmarks measure the row codec, comparison primitives, and
//! block framing throughput that dominate operator execution time.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sealdb::{crypto, AttrType, OpCode, Record, RowReader, RowWriter, SortKey};

fn sample_record() -> Record {
    let mut rec = Record::new();
    rec.add_attr(AttrType::Int, &42u32.to_le_bytes()).unwrap();
    rec.add_attr(AttrType::Str, b"benchmark-payload").unwrap();
    rec.add_attr(AttrType::Float, &1.5f32.to_le_bytes()).unwrap();
    rec
}

fn bench_row_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_codec");
    let rec = sample_record();
    let mut buf = vec![0u8; 4096];
    let written = rec.write(&mut buf).unwrap();

    group.bench_function("write", |b| {
        b.iter(|| black_box(rec.write(black_box(&mut buf)).unwrap()));
    });

    group.bench_function("read", |b| {
        let mut target = Record::new();
        b.iter(|| black_box(target.read(black_box(&buf[..written])).unwrap()));
    });

    group.bench_function("write_encrypted", |b| {
        let mut enc = vec![0u8; 4 + crypto::ciphertext_len(4096)];
        b.iter(|| black_box(rec.write_encrypted(black_box(&mut enc)).unwrap()));
    });

    group.finish();
}

fn bench_comparisons(c: &mut Criterion) {
    let mut group = c.benchmark_group("comparisons");
    let (a, b_rec) = (sample_record(), sample_record());

    group.bench_function("less_than", |b| {
        b.iter(|| black_box(a.less_than(black_box(&b_rec), OpCode::SortCol1)));
    });

    group.bench_function("key_prefix", |b| {
        b.iter(|| black_box(a.key_prefix(OpCode::SortCol1)));
    });

    group.bench_function("sort_key_tie", |b| {
        let ka = SortKey::bind(&a, OpCode::SortCol1);
        let kb = SortKey::bind(&b_rec, OpCode::SortCol1);
        b.iter(|| black_box(ka.less_than(black_box(&kb), OpCode::SortCol1, None)));
    });

    group.finish();
}

fn bench_block_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_framing");
    group.sample_size(20);
    let rec = sample_record();

    group.bench_function("write_1k_rows", |b| {
        let mut out = vec![0u8; 2 * 1024 * 1024];
        b.iter(|| {
            let mut writer = RowWriter::new(&mut out);
            for _ in 0..1000 {
                writer.write(&rec).unwrap();
            }
            writer.close().unwrap();
            black_box(writer.bytes_written())
        });
    });

    group.bench_function("roundtrip_1k_rows", |b| {
        let mut out = vec![0u8; 2 * 1024 * 1024];
        let mut writer = RowWriter::new(&mut out);
        for _ in 0..1000 {
            writer.write(&rec).unwrap();
        }
        writer.close().unwrap();
        let written = writer.bytes_written();

        b.iter(|| {
            let mut reader = RowReader::new(black_box(&out[..written])).unwrap();
            let mut row = Record::new();
            let mut count = 0u32;
            while reader.has_next() {
                reader.read(&mut row).unwrap();
                count += 1;
            }
            black_box(count)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_row_codec,
    bench_comparisons,
    bench_block_framing
);
criterion_main!(benches);
