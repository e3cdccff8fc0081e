use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use hdrhistogram::Histogram;
use http::Request;
use http::Response;
use http::Uri;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio::time::sleep;
use tower::BoxError;
use tower::service_fn;
use tower_permit::DispatchError;
use tower_permit::GatedClient;
use tower_permit::OutboundRequest;
use tower_permit::RateWindow;

async fn mock_endpoint(
    admissions: Arc<Mutex<Vec<Instant>>>,
    _req: Request<Bytes>,
) -> Result<Response<Bytes>, BoxError> {
    if let Ok(mut log) = admissions.lock() {
        log.push(Instant::now());
    }
    // Simulate the remote side taking a moment to accept the document
    sleep(Duration::from_millis(5)).await;
    Ok(Response::new(Bytes::from_static(b"{\"status\":\"accepted\"}")))
}

#[derive(Default)]
struct FailureCounter {
    serialization: usize,
    transport: usize,
    shutdown: usize,
    cancelled: usize,
}

/// Largest number of admissions that fall inside any single period.
fn busiest_window(mut admissions: Vec<Instant>, period: Duration) -> usize {
    admissions.sort();
    let mut busiest = 0;
    let mut start = 0;
    for end in 0..admissions.len() {
        while admissions[end] - admissions[start] >= period {
            start += 1;
        }
        busiest = busiest.max(end - start + 1);
    }
    busiest
}

async fn run_burst(limit: usize, period: Duration, total_reqs: usize) -> Result<(), BoxError> {
    let limit = NonZeroUsize::new(limit).ok_or("limit must be greater than zero")?;
    let window = RateWindow::new(limit, period)?;

    let admissions = Arc::new(Mutex::new(Vec::with_capacity(total_reqs)));
    let log = Arc::clone(&admissions);
    let transport = service_fn(move |req| mock_endpoint(Arc::clone(&log), req));
    let client = GatedClient::with_transport(
        window,
        Uri::from_static("http://documents.test/api/v3/lk/documents/create"),
        transport,
    );

    let mut hist_wait = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?;
    let mut failures = FailureCounter::default();
    let mut tasks = JoinSet::new();
    let barrier = Arc::new(Barrier::new(total_reqs));

    let start = Instant::now();
    for doc_id in 0..total_reqs {
        let client = client.clone();
        let bar = Arc::clone(&barrier);
        tasks.spawn(async move {
            bar.wait().await;
            let req_start = Instant::now();
            let payload = format!("{{\"docId\":{doc_id}}}");
            let res = client
                .submit(OutboundRequest::new(payload, "burst-signature"))
                .await;
            (res, req_start.elapsed())
        });
    }

    let mut success_count = 0;
    while let Some(task) = tasks.join_next().await {
        let (res, elapsed) = task?;
        match res {
            Ok(_) => {
                success_count += 1;
                hist_wait.record(elapsed.as_micros() as u64)?;
            }
            Err(DispatchError::Serialization(_)) => failures.serialization += 1,
            Err(DispatchError::Transport(_)) => failures.transport += 1,
            Err(DispatchError::Shutdown) => failures.shutdown += 1,
            Err(DispatchError::Cancelled) => failures.cancelled += 1,
        }
    }
    let total_duration = start.elapsed();
    client.shutdown();

    let admitted = admissions
        .lock()
        .map(|log| log.clone())
        .map_err(|_| "admission log poisoned")?;

    println!("--- {limit} per {period:?}, {total_reqs} documents ---");
    println!("Total Duration:  {:.2?}", total_duration);
    println!("Success/Total:   {}/{}", success_count, total_reqs);
    println!(
        "Success Rate:    {:.2} req/sec",
        success_count as f64 / total_duration.as_secs_f64()
    );
    println!(
        "Busiest Window:  {} (limit {})",
        busiest_window(admitted, period),
        limit
    );

    if success_count > 0 {
        println!("P50 (Elapsed):   {}µs", hist_wait.value_at_quantile(0.5));
        println!("P99 (Elapsed):   {}µs", hist_wait.value_at_quantile(0.99));
        println!("Max (Elapsed):   {}µs", hist_wait.max());
    }

    let total_errors =
        failures.serialization + failures.transport + failures.shutdown + failures.cancelled;
    println!("Errors:          {}", total_errors);
    if total_errors > 0 {
        println!("  └─ Serialization: {}", failures.serialization);
        println!("  └─ Transport:     {}", failures.transport);
        println!("  └─ Shutdown:      {}", failures.shutdown);
        println!("  └─ Cancelled:     {}", failures.cancelled);
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    run_burst(10, Duration::from_millis(100), 100).await?;
    run_burst(100, Duration::from_millis(250), 1_000).await?;
    run_burst(1_000, Duration::from_secs(1), 5_000).await?;
    Ok(())
}
