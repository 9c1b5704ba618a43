use simcore::kernel::event::EventQueue;
use simcore::random::stream::Exponential;
use simcore::random::stream::Variate;
use simcore::random::WichmannHill;
use simcore::stats::PrecisionHistogram;
use simcore::stats::Variance;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        drawing_uniform_variates,
        drawing_exponential_variates,
        churning_the_event_queue,
        accumulating_welford_moments,
        growing_a_precision_histogram,
}

fn drawing_uniform_variates(c: &mut criterion::Criterion) {
    let mut rng = WichmannHill::default();
    c.bench_function("draw 1k uniform variates", |b| {
        b.iter(|| (0..1_000).map(|_| rng.uniform()).sum::<f64>())
    });
}

fn drawing_exponential_variates(c: &mut criterion::Criterion) {
    let mut stream = Exponential::new(5.0).expect("positive mean");
    c.bench_function("draw 1k exponential variates", |b| {
        b.iter(|| (0..1_000).map(|_| stream.sample()).sum::<f64>())
    });
}

fn churning_the_event_queue(c: &mut criterion::Criterion) {
    c.bench_function("insert and pop 1k activation records", |b| {
        b.iter(|| {
            let mut queue = EventQueue::new();
            for i in 0..1_000u64 {
                queue.insert(i, (i % 7) as f64, i);
            }
            std::iter::from_fn(|| queue.pop_first()).count()
        })
    });
}

fn accumulating_welford_moments(c: &mut criterion::Criterion) {
    let mut rng = WichmannHill::default();
    let samples = (0..10_000).map(|_| rng.uniform()).collect::<Vec<_>>();
    c.bench_function("accumulate 10k samples of variance", |b| {
        b.iter(|| {
            let mut v = Variance::new();
            for &x in &samples {
                v += x;
            }
            v.mean()
        })
    });
}

fn growing_a_precision_histogram(c: &mut criterion::Criterion) {
    let mut rng = WichmannHill::default();
    let samples = (0..2_000).map(|_| (rng.uniform() * 100.0).round()).collect::<Vec<_>>();
    c.bench_function("ingest 2k samples of exact-value buckets", |b| {
        b.iter(|| {
            let mut h = PrecisionHistogram::new();
            for &x in &samples {
                h += x;
            }
            h.total()
        })
    });
}
