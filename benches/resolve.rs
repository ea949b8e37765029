use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_depends::*;
use serde_json::json;

// ===== Graph fixtures =====

struct Leaf;

impl Callable for Leaf {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("limit", Field::query().default(json!(100)));
    }
}

#[async_trait]
impl Dependency for Leaf {
    type Output = i64;
    async fn call(args: Arguments) -> Result<i64, BoxError> {
        Ok(args.get::<serde_json::Value>("limit")?.as_i64().unwrap_or(0))
    }
}

/// Each level depends on the one below; `Chain<0>` depends on `Leaf`.
struct Chain<const N: usize>;

macro_rules! chain_level {
    ($level:literal, $below:ty) => {
        impl Callable for Chain<$level> {
            fn declare(sig: &mut SignatureBuilder) {
                sig.param("below", Depends::on::<$below>());
            }
        }

        #[async_trait]
        impl Dependency for Chain<$level> {
            type Output = i64;
            async fn call(args: Arguments) -> Result<i64, BoxError> {
                Ok(*args.get::<i64>("below")? + 1)
            }
        }
    };
}

chain_level!(0, Leaf);
chain_level!(1, Chain<0>);
chain_level!(2, Chain<1>);
chain_level!(3, Chain<2>);
chain_level!(4, Chain<3>);
chain_level!(5, Chain<4>);
chain_level!(6, Chain<5>);
chain_level!(7, Chain<6>);

struct ChainEndpoint<const N: usize>;

impl Callable for ChainEndpoint<1> {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("top", Depends::on::<Chain<0>>());
    }
}

impl Callable for ChainEndpoint<4> {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("top", Depends::on::<Chain<3>>());
    }
}

impl Callable for ChainEndpoint<8> {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("top", Depends::on::<Chain<7>>());
    }
}

/// Eight branches sharing one leaf.
struct Diamond;

impl Callable for Diamond {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("a", Depends::on::<Chain<0>>())
            .param("b", Depends::on::<Chain<0>>())
            .param("c", Depends::on::<Chain<0>>())
            .param("d", Depends::on::<Chain<0>>())
            .param("e", Depends::on::<Leaf>())
            .param("f", Depends::on::<Leaf>())
            .param("g", Depends::on::<Leaf>())
            .param("h", Depends::on::<Leaf>());
    }
}

struct Session;

impl Callable for Session {
    fn declare(_sig: &mut SignatureBuilder) {}
}

#[async_trait]
impl GeneratorDependency for Session {
    type Output = u64;

    async fn start(_args: Arguments) -> Result<(Self, u64), BoxError> {
        Ok((Session, 1))
    }

    async fn finish(self, _exit: Exit) -> Result<(), BoxError> {
        Ok(())
    }
}

struct WithSession;

impl Callable for WithSession {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("session", Depends::generator::<Session>())
            .param("leaf", Depends::on::<Leaf>());
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

// ===== Micro Benchmarks =====

fn bench_signature_cache_hit(c: &mut Criterion) {
    let cache = SignatureCache::new();
    let callable = CallableRef::endpoint::<Diamond>();
    let _ = cache.describe(&callable).unwrap();

    c.bench_function("signature_cache_hit", |b| {
        b.iter(|| {
            let descriptor = cache.describe(&callable).unwrap();
            black_box(descriptor);
        })
    });
}

fn bench_chain_depth(c: &mut Criterion) {
    let rt = runtime();
    let resolver = Resolver::new();
    let request = RequestData::new();
    let mut group = c.benchmark_group("chain_depth");

    group.bench_with_input(BenchmarkId::from_parameter(1), &1, |b, _| {
        b.to_async(&rt).iter(|| async {
            let resolved = resolver.resolve::<ChainEndpoint<1>>(&request).await.unwrap();
            black_box(resolved.get::<i64>("top").unwrap());
        })
    });
    group.bench_with_input(BenchmarkId::from_parameter(4), &4, |b, _| {
        b.to_async(&rt).iter(|| async {
            let resolved = resolver.resolve::<ChainEndpoint<4>>(&request).await.unwrap();
            black_box(resolved.get::<i64>("top").unwrap());
        })
    });
    group.bench_with_input(BenchmarkId::from_parameter(8), &8, |b, _| {
        b.to_async(&rt).iter(|| async {
            let resolved = resolver.resolve::<ChainEndpoint<8>>(&request).await.unwrap();
            black_box(resolved.get::<i64>("top").unwrap());
        })
    });

    group.finish();
}

fn bench_shared_dependencies(c: &mut Criterion) {
    let rt = runtime();
    let resolver = Resolver::new();
    let request = RequestData::new().with_query("limit", json!(10));

    c.bench_function("diamond_request_cache", |b| {
        b.to_async(&rt).iter(|| async {
            let resolved = resolver.resolve::<Diamond>(&request).await.unwrap();
            black_box(resolved.pending_teardowns());
        })
    });
}

// ===== Macro Benchmarks =====

fn bench_run_with_teardown(c: &mut Criterion) {
    let rt = runtime();
    let resolver = Resolver::new();
    let request = RequestData::new();

    c.bench_function("run_with_generator", |b| {
        b.to_async(&rt).iter(|| async {
            let total = resolver
                .run::<WithSession, _, _, _>(&request, |args| async move {
                    Ok::<_, BoxError>(*args.get::<u64>("session")? + *args.get::<i64>("leaf")? as u64)
                })
                .await
                .unwrap();
            black_box(total);
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let resolver = Resolver::new();

    c.bench_function("validate_diamond", |b| {
        b.iter(|| {
            let count = resolver.validate::<Diamond>().unwrap();
            black_box(count);
        })
    });
}

criterion_group!(
    micro_benches,
    bench_signature_cache_hit,
    bench_chain_depth,
    bench_shared_dependencies
);

criterion_group!(macro_benches, bench_run_with_teardown, bench_validate);

criterion_main!(micro_benches, macro_benches);
