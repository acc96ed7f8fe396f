use super::*;
use std::time::Duration;

use shared::protocol::PageResponse;
use tokio::sync::Mutex;

use crate::{
    fetcher::{fetcher_fn, PageFetcher},
    state::{FilterMap, ListInit, PageRequest},
};

fn recording_debouncer(delay: Duration) -> (Debouncer<String>, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let debouncer = Debouncer::new(delay, move |query: String| {
        let sink = Arc::clone(&sink);
        Box::pin(async move { sink.lock().await.push(query) }) as BoxFuture<'static, ()>
    });
    (debouncer, calls)
}

#[tokio::test(start_paused = true)]
async fn rapid_updates_collapse_into_one_trailing_call() {
    let (mut debouncer, calls) = recording_debouncer(DEFAULT_DEBOUNCE);

    debouncer.update("a".to_string());
    tokio::time::sleep(Duration::from_millis(100)).await;
    debouncer.update("ab".to_string());
    tokio::time::sleep(Duration::from_millis(100)).await;
    debouncer.update("abc".to_string());

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(calls.lock().await.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*calls.lock().await, vec!["abc".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn default_delay_is_half_a_second() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let mut debouncer = Debouncer::with_default_delay(move |query: String| {
        let sink = Arc::clone(&sink);
        Box::pin(async move { sink.lock().await.push(query) }) as BoxFuture<'static, ()>
    });
    assert_eq!(debouncer.delay(), Duration::from_millis(500));

    debouncer.update("hostel".to_string());
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(calls.lock().await.is_empty());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*calls.lock().await, vec!["hostel".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn nothing_fires_on_the_leading_edge() {
    let (mut debouncer, calls) = recording_debouncer(Duration::from_millis(200));
    debouncer.update("x".to_string());
    tokio::task::yield_now().await;
    assert!(calls.lock().await.is_empty());
    assert!(debouncer.is_pending());
}

#[tokio::test(start_paused = true)]
async fn cancel_suppresses_until_next_update() {
    let (mut debouncer, calls) = recording_debouncer(Duration::from_millis(200));

    debouncer.update("draft".to_string());
    debouncer.cancel();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(calls.lock().await.is_empty());
    assert!(!debouncer.is_pending());

    debouncer.update("final".to_string());
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(*calls.lock().await, vec!["final".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn search_merges_query_into_filters_after_quiet_period() {
    let seen = Arc::new(Mutex::new(Vec::<PageRequest>::new()));
    let recorder = Arc::clone(&seen);
    let fetcher: Arc<dyn PageFetcher<u32>> = fetcher_fn(move |request: PageRequest| {
        let recorder = Arc::clone(&recorder);
        async move {
            recorder.lock().await.push(request);
            Ok::<_, anyhow::Error>(PageResponse {
                items: vec![1],
                total: 1,
            })
        }
    });
    let controller = Arc::new(
        ListStateController::new(fetcher, ListInit::new(FilterMap::new())).expect("controller"),
    );
    let mut search = DebouncedSearch::new(&controller, DEFAULT_DEBOUNCE, |query| {
        FilterMap::from([("search".to_string(), query)])
    });

    search.update("ra");
    search.update("rav");
    search.update("ravi");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let requests = seen.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].filters,
        vec![("search".to_string(), "ravi".to_string())]
    );
    assert_eq!(
        controller.snapshot().filters().get("search").map(String::as_str),
        Some("ravi")
    );
}

#[tokio::test(start_paused = true)]
async fn search_after_view_is_dropped_does_nothing() {
    let fetcher: Arc<dyn PageFetcher<u32>> = fetcher_fn(|_request: PageRequest| async move {
        Ok::<_, anyhow::Error>(PageResponse {
            items: Vec::new(),
            total: 0,
        })
    });
    let controller = Arc::new(
        ListStateController::new(fetcher, ListInit::new(FilterMap::new())).expect("controller"),
    );
    let mut search = DebouncedSearch::new(&controller, DEFAULT_DEBOUNCE, |query| {
        FilterMap::from([("search".to_string(), query)])
    });

    search.update("gone");
    drop(controller);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!search.is_pending());
}
