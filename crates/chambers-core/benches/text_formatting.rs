use chambers_core::text;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn article_body() -> String {
    let paragraph = "<p>Our litigation team represented the claimant before the Court of Appeal \
in a dispute concerning the interpretation of a long-term supply agreement &amp; its \
termination clauses.</p>";
    paragraph.repeat(40)
}

fn bench_slugify(c: &mut Criterion) {
    let title = "Cour d'appel : victoire décisive pour nos clients dans l'affaire Müller & Associés";
    c.bench_function("slugify", |b| b.iter(|| text::slugify(black_box(title))));
}

fn bench_excerpt(c: &mut Criterion) {
    let body = article_body();
    c.bench_function("excerpt_200", |b| b.iter(|| text::excerpt(black_box(&body), 200)));
}

criterion_group!(benches, bench_slugify, bench_excerpt);
criterion_main!(benches);
