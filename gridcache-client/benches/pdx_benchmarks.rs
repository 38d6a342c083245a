//! PDX write/read throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gridcache_client::core::serialization::pdx::{PdxReader, PdxSerializer, PdxWriter};
use gridcache_derive::PdxSerializable;

#[derive(Debug, Clone, PdxSerializable)]
#[pdx(type_name = "bench.Trade")]
struct Trade {
    #[pdx(identity)]
    id: i64,
    symbol: String,
    quantity: i32,
    price: f64,
    tags: Vec<String>,
}

fn sample_trade() -> Trade {
    Trade {
        id: 42,
        symbol: "GRID".to_string(),
        quantity: 500,
        price: 101.25,
        tags: vec!["equity".to_string(), "block".to_string()],
    }
}

fn bench_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdx_writer");

    group.bench_function("typed_fields", |b| {
        b.iter(|| {
            let mut writer = PdxWriter::new("bench.Flat");
            writer
                .write_int("a", black_box(42))
                .unwrap()
                .write_string("b", Some(black_box("hi")))
                .unwrap()
                .write_boolean_array("c", Some(&[true, false, true]))
                .unwrap();
            black_box(writer.to_bytes().unwrap())
        })
    });

    for size in [16usize, 256, 4096] {
        let values: Vec<i64> = (0..size as i64).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("long_array", size), &values, |b, values| {
            b.iter(|| {
                let mut writer = PdxWriter::new("bench.Array");
                writer.write_long_array("values", Some(values.as_slice())).unwrap();
                black_box(writer.to_bytes().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_serializer(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdx_serializer");
    let serializer = PdxSerializer::new();
    let trade = sample_trade();
    let bytes = serializer.serialize(&trade).unwrap();

    group.bench_function("serialize_derived", |b| {
        b.iter(|| black_box(serializer.serialize(black_box(&trade)).unwrap()))
    });

    group.bench_function("deserialize_derived", |b| {
        b.iter(|| black_box(serializer.deserialize::<Trade>(black_box(&bytes)).unwrap()))
    });

    group.bench_function("read_single_field", |b| {
        let record = serializer.deserialize_record(&bytes).unwrap();
        b.iter(|| {
            let mut reader = PdxReader::new(record.clone());
            black_box(reader.read_long("id").unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_writer, bench_serializer);
criterion_main!(benches);
