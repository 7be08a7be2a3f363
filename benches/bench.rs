//! Criterion benchmarks for the vietcat categorizer.
//!
//! Covers the inference path end to end:
//! - Vietnamese normalization
//! - TF-IDF transformation
//! - Full categorization with calibration

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use vietcat::analysis::VietnameseAnalyzer;
use vietcat::ml::categorizer::{
    CalibrationConfig, ModelTrainer, SvmCategorizer, SvmParams, TrainingConfig,
    TransactionClassifier, TransactionSample,
};

const CATEGORIES: &[(i64, &str, &[&str])] = &[
    (1, "Ăn uống", &["phở", "bún", "cơm", "trà sữa", "bánh mì", "cà phê", "lẩu"]),
    (2, "Di chuyển", &["grab", "xe buýt", "xăng", "taxi", "gửi xe", "vé tàu"]),
    (3, "Hóa đơn", &["tiền điện", "tiền nước", "internet", "điện thoại", "chung cư"]),
    (4, "Mua sắm", &["quần áo", "giày", "siêu thị", "shopee", "tiki"]),
];

const QUALIFIERS: &[&str] = &[
    "sáng", "trưa", "tối", "tháng 6", "cuối tuần", "Hà Nội", "Sài Gòn", "với bạn",
];

/// Generate a labelled corpus for benchmarking.
fn generate_corpus(per_category: usize) -> Vec<TransactionSample> {
    let mut samples = Vec::with_capacity(per_category * CATEGORIES.len());
    for &(id, name, words) in CATEGORIES {
        for i in 0..per_category {
            let description = format!(
                "{} {} {}",
                words[i % words.len()],
                QUALIFIERS[i % QUALIFIERS.len()],
                QUALIFIERS[(i / QUALIFIERS.len()) % QUALIFIERS.len()]
            );
            samples.push(TransactionSample::new(description, name, id));
        }
    }
    samples
}

fn trained_categorizer() -> SvmCategorizer {
    let config = TrainingConfig {
        svm: SvmParams {
            max_iterations: 50,
            ..Default::default()
        },
        ..TrainingConfig::default()
    };
    ModelTrainer::new(config)
        .and_then(|trainer| trainer.train(&generate_corpus(40)))
        .map(|model| model.into_categorizer(CalibrationConfig::default()))
        .expect("benchmark corpus trains")
}

const INPUTS: &[&str] = &[
    "Đi ăn phở bò với đồng nghiệp",
    "Thanh toán tiền điện tháng 6 qua ví MoMo",
    "Grab bike từ nhà đến công ty",
    "Mua quần áo trên Shopee giảm 50%!!!",
];

fn bench_normalize(c: &mut Criterion) {
    let analyzer = VietnameseAnalyzer::new().expect("analyzer builds");
    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(INPUTS.len() as u64));
    group.bench_function("vietnamese", |b| {
        b.iter(|| {
            for input in INPUTS {
                black_box(analyzer.normalize(black_box(input)));
            }
        })
    });
    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let categorizer = trained_categorizer();
    let mut group = c.benchmark_group("tfidf");
    group.throughput(Throughput::Elements(INPUTS.len() as u64));
    group.bench_function("transform", |b| {
        b.iter(|| {
            for input in INPUTS {
                black_box(categorizer.vectorizer().transform(black_box(input)).ok());
            }
        })
    });
    group.finish();
}

fn bench_categorize(c: &mut Criterion) {
    let categorizer = trained_categorizer();
    let mut group = c.benchmark_group("categorize");
    group.throughput(Throughput::Elements(INPUTS.len() as u64));
    group.bench_function("svm_calibrated", |b| {
        b.iter(|| {
            for input in INPUTS {
                black_box(categorizer.categorize(black_box(input), Some(45000.0)).ok());
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_transform, bench_categorize);
criterion_main!(benches);
