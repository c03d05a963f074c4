// Unit tests for reachable-URL resolution

use crate::config::{EnvironmentConfig, EnvironmentMode};
use crate::error::server::ServerError;
use crate::resolver::{LocalResolver, ProxyResolver, UrlResolver, for_environment};

/// **VALUE**: Verifies the local URL and the frame URL built from it.
#[test]
fn given_local_resolver_when_resolve_then_returns_localhost_url() {
    let resolver = LocalResolver;

    assert_eq!(resolver.resolve(18000).expect("resolve"), "http://localhost:18000");
    assert_eq!(
        resolver.frame_url(18000, "/").expect("frame url"),
        "http://localhost:18000/"
    );
}

/// **VALUE**: Verifies proxy templates get the port substituted and trailing
/// slashes stripped before the served path is appended.
///
/// **BUG THIS CATCHES**: Would catch a double slash (`.../proxy/18000//`) that
/// some proxies answer with a redirect or 404.
#[test]
fn given_proxy_template_with_trailing_slash_when_frame_url_then_single_slash() {
    // GIVEN: A hosted proxy template
    let resolver =
        ProxyResolver::new("https://hub.example.com/user/me/proxy/{port}/").expect("valid template");

    // WHEN: Resolving
    let base = resolver.resolve(18001).expect("resolve");
    let frame = resolver.frame_url(18001, "/").expect("frame url");

    // THEN: Port substituted, no trailing slash on the base
    assert_eq!(base, "https://hub.example.com/user/me/proxy/18001");
    assert_eq!(frame, "https://hub.example.com/user/me/proxy/18001/");
}

/// **VALUE**: Verifies malformed templates are rejected at construction.
#[test]
fn given_bad_templates_when_proxy_resolver_new_then_returns_invalid_options() {
    for template in ["https://hub.example.com/proxy/", "ftp://host/{port}", "not a url {port}"] {
        assert!(
            matches!(ProxyResolver::new(template), Err(ServerError::InvalidOptions { .. })),
            "Expected InvalidOptions for {template}"
        );
    }
}

/// **VALUE**: Verifies resolver selection follows the environment mode.
#[test]
fn given_environment_config_when_for_environment_then_picks_resolver() {
    // GIVEN: Local and hosted configs
    let local = EnvironmentConfig::default();
    let hosted = EnvironmentConfig {
        mode: EnvironmentMode::Hosted,
        proxy_url_template: Some("http://proxy.local/{port}".into()),
    };
    let hosted_missing = EnvironmentConfig {
        mode: EnvironmentMode::Hosted,
        proxy_url_template: None,
    };

    // WHEN / THEN: Each mode resolves the way it should
    let local = for_environment(&local).expect("local resolver");
    assert_eq!(local.resolve(1).expect("resolve"), "http://localhost:1");

    let hosted = for_environment(&hosted).expect("hosted resolver");
    assert_eq!(hosted.resolve(2).expect("resolve"), "http://proxy.local/2");

    assert!(for_environment(&hosted_missing).is_err());
}
