/// Concurrent access integration tests
///
/// These tests verify that ferrous-depends behaves correctly under concurrent
/// access: request isolation, shared signature caching, and cleanup running
/// once per request no matter how many requests are in flight.

use ferrous_depends::{
    async_trait, Arguments, BoxError, Callable, CallableRef, Dependency, Depends, Exit, Field, GeneratorDependency,
    RequestData, Resolver, SignatureBuilder, SignatureCache,
};
use serde_json::json;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

// ===== Test Services =====

static OPENED: AtomicUsize = AtomicUsize::new(0);
static CLOSED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
pub struct RequestState {
    request_id: u64,
}

struct PerRequest;

impl Callable for PerRequest {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("x_request_id", Field::header());
    }
}

#[async_trait]
impl GeneratorDependency for PerRequest {
    type Output = RequestState;

    async fn start(args: Arguments) -> Result<(Self, RequestState), BoxError> {
        OPENED.fetch_add(1, Ordering::SeqCst);
        // Let other requests interleave with this one.
        tokio::task::yield_now().await;
        Ok((
            PerRequest,
            RequestState {
                request_id: args.deserialize("x_request_id")?,
            },
        ))
    }

    async fn finish(self, _exit: Exit) -> Result<(), BoxError> {
        CLOSED.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Echo;

impl Callable for Echo {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("state", Depends::generator::<PerRequest>());
    }
}

#[async_trait]
impl Dependency for Echo {
    type Output = u64;
    async fn call(args: Arguments) -> Result<u64, BoxError> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(args.get::<RequestState>("state")?.request_id)
    }
}

struct Handler;

impl Callable for Handler {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("state", Depends::generator::<PerRequest>())
            .param("echo", Depends::on::<Echo>());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_requests_are_isolated() {
    let resolver = Resolver::new();
    let requests = 64u64;
    let opened_before = OPENED.load(Ordering::SeqCst);
    let closed_before = CLOSED.load(Ordering::SeqCst);

    let tasks: Vec<_> = (0..requests)
        .map(|id| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let request = RequestData::new().with_header("x-request-id", json!(id));
                resolver
                    .run::<Handler, _, _, _>(&request, |args| async move {
                        let state = args.get::<RequestState>("state")?;
                        let echo = args.get::<u64>("echo")?;
                        Ok::<_, BoxError>((state.request_id, *echo))
                    })
                    .await
            })
        })
        .collect();

    for (id, task) in tasks.into_iter().enumerate() {
        let (state_id, echoed) = task.await.unwrap().unwrap();
        assert_eq!(state_id, id as u64);
        assert_eq!(echoed, id as u64); // Echo saw this request's generator value
    }

    // One generator per request, each released exactly once.
    assert_eq!(OPENED.load(Ordering::SeqCst) - opened_before, requests as usize);
    assert_eq!(CLOSED.load(Ordering::SeqCst) - closed_before, requests as usize);
}

// ===== Signature cache under race =====

static DECLARES: AtomicUsize = AtomicUsize::new(0);

struct Contended;

impl Callable for Contended {
    fn declare(sig: &mut SignatureBuilder) {
        DECLARES.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        sig.param("q", Field::query().optional());
    }
}

#[test]
fn test_introspection_runs_once_under_race() {
    let cache = Arc::new(SignatureCache::new());
    let threads = 16;
    let barrier = Barrier::new(threads);

    let descriptors: Vec<_> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|_| {
                    barrier.wait();
                    cache.describe(&CallableRef::endpoint::<Contended>()).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(DECLARES.load(Ordering::SeqCst), 1);
    assert_eq!(cache.introspections(), 1);
    for descriptor in &descriptors[1..] {
        assert!(Arc::ptr_eq(&descriptors[0], descriptor));
    }
}

#[test]
#[serial]
fn test_resolvers_on_many_threads_share_signatures() {
    let cache = Arc::new(SignatureCache::new());
    let resolver = Resolver::builder().signature_cache(cache.clone()).build();

    crossbeam_utils::thread::scope(|s| {
        for id in 0..8u64 {
            let resolver = resolver.clone();
            s.spawn(move |_| {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let request = RequestData::new().with_header("x-request-id", json!(id));
                let resolved = runtime.block_on(resolver.resolve::<Handler>(&request)).unwrap();
                assert_eq!(*resolved.get::<u64>("echo").unwrap(), id);
                runtime.block_on(resolved.close(Exit::Success)).unwrap();
            });
        }
    })
    .unwrap();

    // Handler, PerRequest and Echo.
    assert_eq!(cache.introspections(), 3);
    assert_eq!(cache.len(), 3);
}
