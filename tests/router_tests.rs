use http::Method;
use treeroute::dispatcher::{stage, Stage};
use treeroute::router::{CompileError, Router, StageKind};
use treeroute::spec::RouteSpec;

fn pass() -> Stage {
    stage(|_ctx, advance| advance.descend())
}

/// The README tree: a root wildcard, `/foo` bound both with and without a
/// trailing slash, a POST-only binding, and a nested wildcard.
fn readme_spec() -> RouteSpec {
    RouteSpec::new()
        .route("*", pass())
        .route("foo.", pass())
        .route(
            "foo",
            RouteSpec::new()
                .route("*", pass())
                .route("/", pass())
                .route("bar._POST", pass())
                .route("bar", pass()),
        )
}

#[test]
fn test_readme_tree_determinate_chains() {
    let router = Router::compile(&readme_spec()).unwrap();

    let res = router.resolve(&Method::GET, "/foo").unwrap();
    assert!(res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo"]);

    let res = router.resolve(&Method::GET, "/foo/").unwrap();
    assert!(res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/", "/foo/"]);
    let kinds: Vec<StageKind> = res.chain.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![StageKind::Wildcard, StageKind::Wildcard, StageKind::Leaf]
    );

    let res = router.resolve(&Method::GET, "/foo/bar").unwrap();
    assert!(res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/", "/foo/bar"]);
}

#[test]
fn test_readme_tree_method_bindings() {
    let router = Router::compile(&readme_spec()).unwrap();

    let res = router.resolve(&Method::POST, "/foo/bar").unwrap();
    assert!(res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/", "/foo/bar._POST"]);

    // A method without its own binding never falls back to the GET entry.
    let res = router.resolve(&Method::DELETE, "/foo/bar").unwrap();
    assert!(!res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/"]);

    // HEAD folds into GET.
    let res = router.resolve(&Method::HEAD, "/foo/bar").unwrap();
    assert!(res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/", "/foo/bar"]);
}

#[test]
fn test_readme_tree_wildcard_fallback() {
    let router = Router::compile(&readme_spec()).unwrap();

    let res = router.resolve(&Method::GET, "/foo/baz").unwrap();
    assert!(!res.determinate);
    assert_eq!(res.stage_paths(), vec!["/", "/foo/"]);

    let res = router.resolve(&Method::GET, "/elsewhere").unwrap();
    assert!(!res.determinate);
    assert_eq!(res.stage_paths(), vec!["/"]);
}

#[test]
fn test_miss_without_any_wildcard() {
    let spec = RouteSpec::new().route("foo", pass());
    let router = Router::compile(&spec).unwrap();
    assert!(router.resolve(&Method::GET, "/bar").is_none());
    assert!(router.resolve(&Method::GET, "/foo").is_some());
}

#[test]
fn test_wildcard_specificity_ordering() {
    let spec = RouteSpec::new()
        .route("*", pass())
        .route(
            "a",
            RouteSpec::new()
                .route("*", pass())
                .route("b", RouteSpec::new().route("*", pass())),
        )
        .route("ab", RouteSpec::new().route("*", pass()))
        .route("aa", RouteSpec::new().route("*", pass()));
    let router = Router::compile(&spec).unwrap();
    // Length descending, then lexicographic ascending for equal lengths.
    assert_eq!(
        router.wildcard_prefixes(),
        vec!["/a/b/", "/aa/", "/ab/", "/a/", "/"]
    );
}

#[test]
fn test_chain_inheritance_skips_missing_depths() {
    let spec = RouteSpec::new().route("*", pass()).route(
        "a",
        RouteSpec::new().route("b", RouteSpec::new().route("*", pass())),
    );
    let router = Router::compile(&spec).unwrap();
    let res = router.resolve(&Method::GET, "/a/b/c").unwrap();
    assert!(!res.determinate);
    // No wildcard exists at /a/, so the chain is root then /a/b/.
    assert_eq!(res.stage_paths(), vec!["/", "/a/b/"]);
}

#[test]
fn test_leading_slash_in_key_is_stripped() {
    let spec = RouteSpec::new().route("/baz", pass());
    let router = Router::compile(&spec).unwrap();
    assert!(router.resolve(&Method::GET, "/baz").is_some());
}

#[test]
fn test_index_key_inside_group() {
    let spec = RouteSpec::new().route("pets", RouteSpec::new().route("/", pass()));
    let router = Router::compile(&spec).unwrap();
    assert!(router.resolve(&Method::GET, "/pets/").unwrap().determinate);
    assert!(router.resolve(&Method::GET, "/pets").is_none());
}

#[test]
fn test_duplicate_qualified_key_rejected() {
    // "foo." and "/foo" both qualify to the determinate path /foo.
    let spec = RouteSpec::new().route("foo.", pass()).route("/foo", pass());
    let err = Router::compile(&spec).unwrap_err();
    assert!(matches!(err, CompileError::InvalidSpec { .. }));
}

#[test]
fn test_wildcard_group_rejected() {
    let spec = RouteSpec::new().route("*", RouteSpec::new().route("a", pass()));
    let err = Router::compile(&spec).unwrap_err();
    match err {
        CompileError::InvalidSpec { at, .. } => assert_eq!(at, "/*"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_embedded_star_in_key_rejected() {
    let spec = RouteSpec::new().route("a*b", pass());
    assert!(matches!(
        Router::compile(&spec),
        Err(CompileError::InvalidSpec { .. })
    ));
}

#[test]
fn test_parenthesized_prefix_rejected() {
    let spec = RouteSpec::new().route("a(b)", RouteSpec::new().route("*", pass()));
    let err = Router::compile(&spec).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedPrefixSyntax { .. }));
}

#[test]
fn test_recompilation_is_deterministic() {
    let spec = readme_spec();
    let a = Router::compile(&spec).unwrap();
    let b = Router::compile(&spec).unwrap();
    assert_eq!(a.determinate_routes(), b.determinate_routes());
    assert_eq!(a.wildcard_prefixes(), b.wildcard_prefixes());
    for path in ["/foo", "/foo/", "/foo/bar", "/foo/baz"] {
        let ra = a.resolve(&Method::GET, path).unwrap();
        let rb = b.resolve(&Method::GET, path).unwrap();
        assert_eq!(ra.stage_paths(), rb.stage_paths());
        assert_eq!(ra.determinate, rb.determinate);
    }
}

#[test]
fn test_determinate_routes_listing() {
    let router = Router::compile(&readme_spec()).unwrap();
    let routes = router.determinate_routes();
    assert!(routes.contains(&(Method::GET, "/foo".to_string())));
    assert!(routes.contains(&(Method::GET, "/foo/".to_string())));
    assert!(routes.contains(&(Method::POST, "/foo/bar".to_string())));
    assert!(!routes.contains(&(Method::POST, "/foo".to_string())));
}

#[test]
fn test_independent_routers_do_not_interfere() {
    let a = Router::compile(&RouteSpec::new().route("alpha", pass())).unwrap();
    let b = Router::compile(&RouteSpec::new().route("beta", pass())).unwrap();
    assert!(a.resolve(&Method::GET, "/alpha").is_some());
    assert!(a.resolve(&Method::GET, "/beta").is_none());
    assert!(b.resolve(&Method::GET, "/beta").is_some());
    assert!(b.resolve(&Method::GET, "/alpha").is_none());
}

#[test]
fn test_regex_metacharacters_in_segment_names() {
    let spec = RouteSpec::new().route(
        "v1.0",
        RouteSpec::new().route("*", pass()).route("x", pass()),
    );
    let router = Router::compile(&spec).unwrap();
    assert!(router.resolve(&Method::GET, "/v1.0/x").unwrap().determinate);
    assert!(router.resolve(&Method::GET, "/v1x0/x").is_none());
}
