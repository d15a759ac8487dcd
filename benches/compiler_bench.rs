use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use acc2omp::*;

// Translation latency scenarios. Every scenario is free of errors so that
// lowering runs.

const GANG_LOOP: &str = r#"
void f() {
  int a[64];
  #pragma acc parallel num_gangs(4)
  {
    #pragma acc loop gang
    for (int i = 0; i < 64; ++i)
      a[i] = i;
  }
}
"#;

const DATA_REGION: &str = r#"
void saxpy(int n, float x, float *y, float *z) {
  #pragma acc data copyin(y[0:n]) copy(z[0:n])
  {
    #pragma acc parallel loop gang vector vector_length(128)
    for (int i = 0; i < n; ++i)
      z[i] = x * y[i] + z[i];
  }
}
"#;

const REDUCTIONS: &str = r#"
double dot(int n, double *a, double *b) {
  double s = 0;
  int i, j;
  #pragma acc parallel copyin(a[0:n], b[0:n]) copy(s)
  #pragma acc loop gang worker reduction(+:s) collapse(2)
  for (i = 0; i < n; ++i)
    for (j = 0; j < 4; ++j)
      s += a[i] * b[i];
  return s;
}
"#;

const PRIVATES: &str = r#"
void f(int n) {
  int a[16], t, k;
  #pragma acc parallel loop num_gangs(2) seq private(t)
  for (k = 0; k < 16; ++k) {
    t = k * 2;
    a[k] = t;
  }
}
"#;

fn scenarios() -> [(&'static str, &'static str); 4] {
    [
        ("gang_loop", GANG_LOOP),
        ("data_region", DATA_REGION),
        ("reductions", REDUCTIONS),
        ("privates", PRIVATES),
    ]
}

/// `n_funcs` functions, each with a compute construct holding a
/// gang/worker/vector loop nest.
fn generate_scaling_unit(n_funcs: usize) -> String {
    let mut src = String::new();
    for f in 0..n_funcs {
        src.push_str(&format!(
            "void f{f}(int n, double *x) {{\n  double s = 0;\n  \
             #pragma acc parallel copy(x[0:n]) copy(s)\n  \
             #pragma acc loop gang reduction(+:s)\n  \
             for (int i = 0; i < n; ++i) {{\n    \
             #pragma acc loop worker\n    \
             for (int j = 0; j < 8; ++j) {{\n      \
             #pragma acc loop vector\n      \
             for (int k = 0; k < 8; ++k)\n        \
             x[i] += j * k;\n    }}\n    s += x[i];\n  }}\n}}\n"
        ));
    }
    src
}

fn translate(source: &str) -> String {
    let unit = pipeline::parse_source(source).expect("benchmark scenario must parse");
    let mut state = pipeline::CompilationState::new(unit, config::LowerOptions::default());
    pipeline::run_pipeline(&mut state, true, |_, _| {}).expect("pipeline");
    assert!(!state.has_error, "{:?}", state.diagnostics);
    let resolved = state.resolved.as_ref().expect("resolved");
    pprint::print_unit(
        &state.unit,
        resolved,
        state.lowered.as_ref(),
        pprint::PrintMode::Omp,
    )
}

// ── Benchmarks ──────────────────────────────────────────────────────────────

fn bench_parse_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_latency");
    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let result = parser::parse(black_box(source));
                black_box(result);
            });
        });
    }
    group.finish();
}

fn bench_full_translation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_translation_latency");
    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| black_box(translate(black_box(source))));
        });
    }
    group.finish();
}

fn bench_phase_latency(c: &mut Criterion) {
    let unit = pipeline::parse_source(REDUCTIONS).expect("benchmark scenario must parse");
    let opts = config::LowerOptions::default();
    let resolved = resolve::resolve(&unit).resolved;
    let partition = partition::partition(&unit, &resolved, &opts).info;
    let data = data_attr::data_attrs(&resolved, &partition);

    let mut group = c.benchmark_group("phase_latency");
    group.bench_function("resolve", |b| {
        b.iter(|| black_box(resolve::resolve(black_box(&unit))));
    });
    group.bench_function("check", |b| {
        b.iter(|| black_box(check::check(&unit, &resolved)));
    });
    group.bench_function("partition", |b| {
        b.iter(|| black_box(partition::partition(&unit, &resolved, &opts)));
    });
    group.bench_function("data_attr", |b| {
        b.iter(|| black_box(data_attr::data_attrs(&resolved, &partition)));
    });
    group.bench_function("reduction", |b| {
        b.iter(|| black_box(reduction::check_reductions(&resolved, &partition, &data, &opts)));
    });
    group.bench_function("lower", |b| {
        b.iter(|| black_box(lower::lower(&resolved, &partition, &data, &opts)));
    });
    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("translation_scaling");
    for n in [1usize, 10, 50, 100] {
        let source = generate_scaling_unit(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &source, |b, source| {
            b.iter(|| black_box(translate(black_box(source))));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_latency,
    bench_full_translation_latency,
    bench_phase_latency,
    bench_scaling
);
criterion_main!(benches);
