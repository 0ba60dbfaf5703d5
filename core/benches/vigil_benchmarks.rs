use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion
use vigil::{
  ActivateElement, ConditionEvaluator, ConditionalCatchPoint, Engine, EngineConfig, ExporterDirector,
  ExpressionEvaluator, RecordingExporter, ScopeKey, ScopeKind, Variables,
};

// --- Helper: an instance with `children` multi-instance children, each
// owning a non-interrupting boundary condition ---
fn engine_with_children(children: usize) -> (Engine, ScopeKey) {
  let config = EngineConfig::default().with_evaluate_on_subscribe(false);
  let mut engine = Engine::new(config).unwrap();
  let root = engine.activate_element(ActivateElement::root("bench")).unwrap();
  let body = engine
    .activate_element(ActivateElement::new(root, "body", ScopeKind::MultiInstanceBody))
    .unwrap();
  for _ in 0..children {
    engine
      .activate_element(
        ActivateElement::new(body, "child", ScopeKind::MultiInstanceChild)
          .catch_point(ConditionalCatchPoint::boundary("reminder", "x > 10 and y < 5").non_interrupting()),
      )
      .unwrap();
  }
  (engine, root)
}

// --- Benchmark Functions ---

fn bench_expression_evaluation(c: &mut Criterion) {
  let mut group = c.benchmark_group("ExpressionEvaluation");
  let mut variables = Variables::new();
  variables.insert("order".into(), serde_json::json!({"total": 120.5, "status": "open"}));
  variables.insert("limit".into(), serde_json::json!(100));

  let expression = "order.total > limit and order.status != \"done\"";
  let cached = ExpressionEvaluator::new();
  let uncached = ExpressionEvaluator::with_capacity(0);

  group.bench_function("cached", |b| {
    b.iter(|| criterion::black_box(cached.evaluate(expression, &variables).unwrap()))
  });
  group.bench_function("parse_every_time", |b| {
    b.iter(|| criterion::black_box(uncached.evaluate(expression, &variables).unwrap()))
  });
  group.finish();
}

fn bench_dispatch_fan_out(c: &mut Criterion) {
  let mut group = c.benchmark_group("DispatchFanOut");

  for children in [1usize, 10, 100].iter() {
    group.throughput(Throughput::Elements(*children as u64));
    group.bench_with_input(BenchmarkId::from_parameter(children), children, |b, &children| {
      b.iter_batched(
        || engine_with_children(children),
        |(mut engine, root)| {
          engine.set_variable(root, "y", 1).unwrap();
          criterion::black_box(engine.set_variable(root, "x", 11).unwrap())
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_export(c: &mut Criterion) {
  let mut group = c.benchmark_group("Export");
  let rt = Runtime::new().unwrap();

  group.bench_function("recording_exporter_100_children", |b| {
    b.to_async(&rt).iter_batched(
      || {
        let (mut engine, root) = engine_with_children(100);
        engine.set_variable(root, "x", 11).unwrap();
        ExporterDirector::new(engine.log()).with_exporter(Arc::new(RecordingExporter::new("bench")))
      },
      |mut director| async move { director.export_pending().await.unwrap() },
      criterion::BatchSize::SmallInput,
    );
  });
  group.finish();
}

criterion_group!(benches, bench_expression_evaluation, bench_dispatch_fan_out, bench_export);
criterion_main!(benches);
