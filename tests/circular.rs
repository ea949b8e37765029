use ferrous_depends::{
    async_trait, Arguments, BoxError, Callable, DependError, Dependency, Depends, RequestData, Resolver,
    ResolverConfig, SignatureBuilder, SignatureCache,
};
use std::sync::Arc;

fn assert_circular(err: &DependError, expected: &[&str]) {
    match err {
        DependError::Circular(path) => {
            assert_eq!(path.len(), expected.len(), "wrong circular path: {:?}", path);
            for (actual, expected) in path.iter().zip(expected) {
                assert!(actual.ends_with(expected), "wrong circular path: {:?}", path);
            }
        }
        other => panic!("Expected Circular error, got {:?}", other),
    }
}

// ===== Self-reference =====

struct SelfReferencing;

impl Callable for SelfReferencing {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("me", Depends::on::<SelfReferencing>());
    }
}

#[async_trait]
impl Dependency for SelfReferencing {
    type Output = ();
    async fn call(_args: Arguments) -> Result<(), BoxError> {
        panic!("a cyclic dependency must never run");
    }
}

struct UsesSelf;

impl Callable for UsesSelf {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("value", Depends::on::<SelfReferencing>());
    }
}

#[tokio::test]
async fn test_self_circular_dependency() {
    let resolver = Resolver::new();
    let err = resolver.resolve::<UsesSelf>(&RequestData::new()).await.unwrap_err();
    assert_circular(err.error(), &["SelfReferencing", "SelfReferencing"]);
    assert!(err.error().is_configuration());
}

// ===== Two-level: A -> B -> A =====

struct CycleA;

impl Callable for CycleA {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("b", Depends::on::<CycleB>());
    }
}

#[async_trait]
impl Dependency for CycleA {
    type Output = ();
    async fn call(_args: Arguments) -> Result<(), BoxError> {
        Ok(())
    }
}

struct CycleB;

impl Callable for CycleB {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("a", Depends::on::<CycleA>());
    }
}

#[async_trait]
impl Dependency for CycleB {
    type Output = ();
    async fn call(_args: Arguments) -> Result<(), BoxError> {
        Ok(())
    }
}

struct CycleEndpoint;

impl Callable for CycleEndpoint {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("a", Depends::on::<CycleA>());
    }
}

#[tokio::test]
async fn test_two_level_circular() {
    let resolver = Resolver::new();
    let err = resolver.resolve::<CycleEndpoint>(&RequestData::new()).await.unwrap_err();
    assert_circular(err.error(), &["CycleA", "CycleB", "CycleA"]);
    assert_eq!(
        err.to_string(),
        format!(
            "circular dependency: {} -> {} -> {}",
            std::any::type_name::<CycleA>(),
            std::any::type_name::<CycleB>(),
            std::any::type_name::<CycleA>()
        )
    );
}

#[test]
fn test_validate_reports_static_cycle() {
    let resolver = Resolver::builder()
        .signature_cache(Arc::new(SignatureCache::new()))
        .build();

    let err = resolver.validate::<CycleEndpoint>().unwrap_err();
    assert_circular(&err, &["CycleA", "CycleB", "CycleA"]);
}

#[tokio::test]
async fn test_cycle_is_reported_on_every_request() {
    let resolver = Resolver::new();
    for _ in 0..3 {
        let err = resolver.resolve::<CycleEndpoint>(&RequestData::new()).await.unwrap_err();
        assert!(matches!(err.error(), DependError::Circular(_)));
    }
}

// ===== Opting out of the cache does not hide a cycle =====

struct Uncached;

impl Callable for Uncached {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("again", Depends::on::<Uncached>().no_cache());
    }
}

#[async_trait]
impl Dependency for Uncached {
    type Output = ();
    async fn call(_args: Arguments) -> Result<(), BoxError> {
        Ok(())
    }
}

struct UsesUncached;

impl Callable for UsesUncached {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("value", Depends::on::<Uncached>().no_cache());
    }
}

#[tokio::test]
async fn test_no_cache_self_reference_is_still_a_cycle() {
    let resolver = Resolver::new();
    let err = resolver.resolve::<UsesUncached>(&RequestData::new()).await.unwrap_err();
    assert_circular(err.error(), &["Uncached", "Uncached"]);
}

// ===== Depth bound =====

struct Level<const N: usize>;

impl<const N: usize> Callable for Level<N> {
    fn declare(sig: &mut SignatureBuilder) {
        match N {
            0 => {}
            1 => {
                sig.param("next", Depends::on::<Level<0>>());
            }
            2 => {
                sig.param("next", Depends::on::<Level<1>>());
            }
            3 => {
                sig.param("next", Depends::on::<Level<2>>());
            }
            _ => {
                sig.param("next", Depends::on::<Level<3>>());
            }
        }
    }
}

#[async_trait]
impl<const N: usize> Dependency for Level<N> {
    type Output = usize;
    async fn call(_args: Arguments) -> Result<usize, BoxError> {
        Ok(N)
    }
}

struct Deep;

impl Callable for Deep {
    fn declare(sig: &mut SignatureBuilder) {
        sig.param("top", Depends::on::<Level<4>>());
    }
}

#[tokio::test]
async fn test_depth_bound_fails_instead_of_overflowing() {
    let shallow = Resolver::builder()
        .config(ResolverConfig::default().with_max_depth(3))
        .build();
    let err = shallow.resolve::<Deep>(&RequestData::new()).await.unwrap_err();
    assert!(matches!(err.error(), DependError::DepthExceeded(3)));
    assert!(matches!(shallow.validate::<Deep>(), Err(DependError::DepthExceeded(3))));

    let roomy = Resolver::builder()
        .config(ResolverConfig::default().with_max_depth(5))
        .build();
    let resolved = roomy.resolve::<Deep>(&RequestData::new()).await.unwrap();
    assert_eq!(*resolved.get::<usize>("top").unwrap(), 4);
}
