use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dslint::analyzer::Analyzer;
use dslint::config::Config;
use std::path::Path;

fn synthetic_source(classes: usize) -> String {
    let mut source = String::new();
    for i in 0..classes {
        source.push_str(&format!(
            "public class Service{i}\n{{\n    private readonly ILogger _logger;\n    private readonly IStore _store;\n\n    public Service{i}(ILogger logger, IStore store, string connectionStringForTheDatabaseServer, int retries)\n    {{\n        _logger = logger;\n        _store = store;\n    }}\n\n    public IStore Store => _store;\n}}\n\n"
        ));
    }
    source
}

fn bench_analyze(c: &mut Criterion) {
    let analyzer = Analyzer::new(Config::default());
    let source = synthetic_source(200);

    c.bench_function("analyze_source", |b| {
        b.iter(|| {
            analyzer
                .analyze_source(Path::new("Bench.cs"), black_box(&source))
                .map(|issues| issues.len())
        })
    });

    c.bench_function("fix_source", |b| {
        b.iter(|| {
            analyzer
                .fix_source(Path::new("Bench.cs"), black_box(&source))
                .map(|(fixed, applied)| (fixed.len(), applied))
        })
    });
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
