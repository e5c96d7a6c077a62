use criterion::{Criterion, criterion_group, criterion_main};
use oasis_hid_common::{ReportBuilder, ReportParser};

fn benchmark_report_parser(c: &mut Criterion) {
    let data = vec![0x32u8, 0x0E, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x90];

    c.bench_function("ReportParser read_u8", |b| {
        let mut parser = ReportParser::new(data.clone());
        b.iter(|| {
            parser.reset();
            for _ in 0..10 {
                std::hint::black_box(parser.read_u8().ok());
            }
        });
    });

    c.bench_function("ReportParser read_u32_be", |b| {
        let mut parser = ReportParser::new(data.clone());
        b.iter(|| {
            parser.reset();
            for _ in 0..2 {
                std::hint::black_box(parser.read_u32_be().ok());
            }
        });
    });
}

fn benchmark_report_builder(c: &mut Criterion) {
    c.bench_function("ReportBuilder u32_be", |b| {
        b.iter(|| {
            let mut builder = ReportBuilder::default();
            for i in 0..16u32 {
                builder.write_u32_be(std::hint::black_box(i));
            }
            std::hint::black_box(builder.into_inner());
        });
    });

    c.bench_function("ReportBuilder padded name", |b| {
        b.iter(|| {
            let mut builder = ReportBuilder::default();
            builder
                .write_padded(std::hint::black_box(b"Oasis Focuser"), 32)
                .pad_to(65);
            std::hint::black_box(builder.into_inner());
        });
    });
}

criterion_group!(benches, benchmark_report_parser, benchmark_report_builder);
criterion_main!(benches);
