use std::hint::black_box;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use futures::stream::FuturesUnordered;
use futures::stream::StreamExt;
use http::Request;
use http::Response;
use http::Uri;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::service_fn;
use tower::util::BoxCloneService;
use tower_permit::AdmissionGate;
use tower_permit::AdmissionLayer;
use tower_permit::GatedClient;
use tower_permit::OutboundRequest;
use tower_permit::RateWindow;

// --- HELPERS & TYPES ---

type BenchService = BoxCloneService<Request<Bytes>, Response<Bytes>, BoxError>;

async fn noop_handler(_req: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
    Ok(Response::new(Bytes::from_static(b"ok")))
}

fn request() -> Request<Bytes> {
    Request::post("http://documents.test/create")
        .body(Bytes::from_static(br#"{"docId":1}"#))
        .unwrap()
}

/// Single-call overhead of a service stack
fn bench_overhead(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let mut s = svc.clone();
            async move {
                let res = s.ready().await.unwrap().call(request()).await;
                black_box(res)
            }
        });
    });
}

/// Many callers hitting the same stack at once
fn bench_burst(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
    burst_size: usize,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let s = svc.clone();
            async move {
                let mut futures = FuturesUnordered::new();
                for _ in 0..burst_size {
                    let local_svc = s.clone();
                    futures.push(local_svc.oneshot(request()));
                }
                while let Some(res) = futures.next().await {
                    let _ = black_box(res);
                }
            }
        });
    });
}

// --- MAIN BENCHMARK ---

fn bench_all_scenarios(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap();
    // The gates spawn their reset tickers onto this runtime
    let _guard = rt.enter();

    // A limit far above what a burst can use, so we measure bookkeeping
    // rather than time spent parked.
    let window = RateWindow::new(
        NonZeroUsize::new(100_000_000).unwrap(),
        Duration::from_millis(1),
    )
    .unwrap();
    let burst_size = 1000;

    let scenarios: Vec<(&str, BenchService)> = vec![
        ("raw", BoxCloneService::new(service_fn(noop_handler))),
        (
            "admission_layer",
            BoxCloneService::new(
                ServiceBuilder::new()
                    .layer(AdmissionLayer::new(Arc::new(AdmissionGate::new(window))))
                    .service(service_fn(noop_handler)),
            ),
        ),
    ];

    let mut overhead_group = c.benchmark_group("Middleware Overhead");
    for (id, svc) in &scenarios {
        bench_overhead(&mut overhead_group, &rt, id, svc.clone());
    }
    overhead_group.finish();

    let mut contention_group = c.benchmark_group("High Contention (1000 Tasks)");
    for (id, svc) in &scenarios {
        bench_burst(&mut contention_group, &rt, id, svc.clone(), burst_size);
    }
    contention_group.finish();

    // Validation, admission and dispatch together
    let client = GatedClient::with_transport(
        window,
        Uri::from_static("http://documents.test/create"),
        service_fn(noop_handler),
    );
    c.bench_function("gated_client_submit", |b| {
        b.to_async(&rt).iter(|| {
            let client = client.clone();
            async move {
                let res = client
                    .submit(OutboundRequest::new(r#"{"docId":1}"#, "token"))
                    .await;
                black_box(res)
            }
        });
    });
}

criterion_group!(benches, bench_all_scenarios);
criterion_main!(benches);
