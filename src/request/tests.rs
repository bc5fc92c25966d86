//! Unit tests for request construction and lazily parsed fields.

use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::{request::form::UrlEncodedFormParser, scope::ScopeHeaders};

fn build(scope: &ConnectionScope) -> Request { build_with(scope, Bytes::new()) }

fn build_with(scope: &ConnectionScope, body: impl Into<Bytes>) -> Request {
    Request::build(scope, body.into()).expect("request builds")
}

#[rstest]
#[case("", "/users/7", "", "/users/7", "/users/7")]
#[case("/app", "/app/users/7", "/app", "/users/7", "/app/users/7")]
#[case("/app/", "/app/users/7", "/app/", "users/7", "/app/users/7")]
#[case("/app", "/other/7", "/app", "/other/7", "/app/other/7")]
#[case("/app", "/app", "/app", "", "/app/")]
fn paths_are_split_on_the_root_path(
    #[case] root: &str,
    #[case] path: &str,
    #[case] script_name: &str,
    #[case] path_info: &str,
    #[case] joined: &str,
) {
    let request = build(&ConnectionScope::http("GET", path).root_path(root));
    assert_eq!(request.script_name(), script_name);
    assert_eq!(request.path_info(), path_info);
    assert_eq!(request.path(), joined);
    assert_eq!(request.script_prefix(), script_name);
}

#[test]
fn path_info_only_strips_a_leading_prefix() {
    let request = build(&ConnectionScope::http("GET", "/x/app/y").root_path("/app"));
    assert_eq!(request.path_info(), "/x/app/y");
}

proptest! {
    #[test]
    fn prefix_is_stripped_exactly_once(
        root in "/[a-z]{1,6}",
        rest in "/[a-z/]{0,12}",
    ) {
        let path = format!("{root}{rest}");
        let (script_name, path_info, _) = split_path(&root, &path);
        prop_assert_eq!(script_name, root.clone());
        prop_assert_eq!(path_info, rest);
    }

    #[test]
    fn non_prefix_paths_are_unchanged(path in "/[a-z/]{0,12}") {
        let (_, path_info, _) = split_path("/ROOT", &path);
        prop_assert_eq!(path_info, path);
    }

    #[test]
    fn repeated_headers_join_in_arrival_order(
        values in proptest::collection::vec("[a-z0-9]{1,5}", 1..5),
    ) {
        let scope = values.iter().fold(ConnectionScope::http("GET", "/"), |scope, value| {
            scope.header("x-tag", value.clone())
        });
        let request = build(&scope);
        let expected = values.join(",");
        prop_assert_eq!(request.header("X-Tag"), Some(expected.as_str()));
    }
}

#[test]
fn method_is_upper_cased() {
    assert_eq!(build(&ConnectionScope::http("patch", "/")).method(), "PATCH");
}

#[test]
fn missing_endpoints_fall_back_to_unknown() {
    let request = build(&ConnectionScope::http("GET", "/"));
    let meta = request.meta();
    assert_eq!(meta["REMOTE_ADDR"], "unknown");
    assert_eq!(meta["REMOTE_HOST"], "unknown");
    assert_eq!(meta["REMOTE_PORT"], "0");
    assert_eq!(meta["SERVER_NAME"], "unknown");
    assert_eq!(meta["SERVER_PORT"], "0");
}

#[test]
fn endpoints_populate_metadata() {
    let request = build(
        &ConnectionScope::http("GET", "/")
            .client("10.0.0.2", 51_000)
            .server("example.test", 8443),
    );
    assert_eq!(request.meta()["REMOTE_ADDR"], "10.0.0.2");
    assert_eq!(request.meta()["REMOTE_PORT"], "51000");
    assert_eq!(request.host(), "example.test:8443");
}

#[rstest]
#[case(None, "http", 80, "example.test")]
#[case(Some("https"), "https", 443, "example.test")]
#[case(Some("https"), "https", 80, "example.test:80")]
fn host_omits_default_ports(
    #[case] scheme: Option<&str>,
    #[case] expected_scheme: &str,
    #[case] port: u16,
    #[case] host: &str,
) {
    let mut scope = ConnectionScope::http("GET", "/").server("example.test", port);
    if let Some(scheme) = scheme {
        scope = scope.scheme(scheme);
    }
    let request = build(&scope);
    assert_eq!(request.scheme(), expected_scheme);
    assert_eq!(request.is_secure(), expected_scheme == "https");
    assert_eq!(request.host(), host);
}

#[test]
fn host_header_wins() {
    let request = build(
        &ConnectionScope::http("GET", "/")
            .server("internal", 8000)
            .header("host", "public.test"),
    );
    assert_eq!(request.host(), "public.test");
}

#[test]
fn legacy_header_maps_are_accepted() {
    let mut scope = ConnectionScope::http("GET", "/");
    scope.headers = ScopeHeaders::Legacy(
        [("accept".to_owned(), Bytes::from_static(b"text/html"))]
            .into_iter()
            .collect(),
    );
    let request = build(&scope);
    assert_eq!(request.header("Accept"), Some("text/html"));
    assert!(request.headers().contains("accept"));
}

#[test]
fn header_values_decode_as_latin1() {
    let request = build(&ConnectionScope::http("GET", "/").header("x-name", &b"caf\xe9"[..]));
    assert_eq!(request.header("x-name"), Some("caf\u{e9}"));
}

#[rstest]
#[case(&["12"], 12)]
#[case(&["abc"], 0)]
#[case(&["5", "5"], 0)]
#[case(&[], 0)]
fn content_length_is_zero_unless_valid(#[case] values: &[&str], #[case] expected: usize) {
    let scope = values.iter().fold(ConnectionScope::http("POST", "/"), |scope, value| {
        scope.header("content-length", value.to_string())
    });
    assert_eq!(build(&scope).content_length(), expected);
}

#[test]
fn content_type_and_params_are_parsed() {
    let request = build(
        &ConnectionScope::http("POST", "/")
            .header("content-type", "text/plain; Charset=\"latin1\"; format=flowed"),
    );
    assert_eq!(request.content_type(), "text/plain");
    assert_eq!(request.content_params()["charset"], "latin1");
    assert_eq!(request.content_params()["format"], "flowed");
    assert_eq!(request.encoding(), encoding_rs::WINDOWS_1252);
}

#[test]
fn supported_charset_decodes_the_body() {
    let scope =
        ConnectionScope::http("POST", "/").header("content-type", "text/plain; charset=utf-16");
    let request = build_with(&scope, &b"h\0i\0"[..]);
    assert_eq!(request.encoding(), encoding_rs::UTF_16LE);
    assert_eq!(request.text(), "hi");
}

#[test]
fn declared_charset_wins_over_a_byte_order_mark() {
    let scope =
        ConnectionScope::http("POST", "/").header("content-type", "text/plain; charset=latin1");
    let request = build_with(&scope, &b"\xEF\xBB\xBFcaf\xE9"[..]);
    assert_eq!(request.text(), "\u{ef}\u{bb}\u{bf}caf\u{e9}");
}

#[test]
fn unknown_charset_is_ignored() {
    let scope = ConnectionScope::http("POST", "/")
        .header("content-type", "text/plain; charset=klingon");
    let request = build_with(&scope, "caf\u{e9}");
    assert_eq!(request.encoding(), encoding_rs::UTF_8);
    assert_eq!(request.text(), "caf\u{e9}");
}

#[test]
fn invalid_byte_query_string_fails_to_build() {
    let scope = ConnectionScope::http("GET", "/").raw_query_string(&b"q=\xff\xfe"[..]);
    let err = Request::build(&scope, Bytes::new()).expect_err("invalid utf-8");
    assert!(matches!(err, RequestError::Decode { field: "query_string", .. }));
}

#[test]
fn query_params_are_decoded_and_memoized() {
    let request = build(&ConnectionScope::http("GET", "/").query_string("a=1&a=2&b=x+y%21&c"));
    let first: *const QueryDict = request.query_params();
    assert_eq!(request.query_params().get_all("a"), ["1", "2"]);
    assert_eq!(request.query_params().get("b"), Some("x y!"));
    assert_eq!(request.query_params().get("c"), Some(""));
    assert_eq!(request.query_string(), "a=1&a=2&b=x+y%21&c");
    assert!(std::ptr::eq(first, request.query_params()));
}

fn form_scope() -> ConnectionScope {
    ConnectionScope::http("POST", "/form")
        .header("content-type", "application/x-www-form-urlencoded")
}

#[test]
fn urlencoded_bodies_populate_post() {
    let request = build_with(&form_scope(), "name=Ada&tags=a&tags=b");
    let post = request.post().expect("form parses");
    assert_eq!(post.get("name"), Some("Ada"));
    assert_eq!(post.get_all("tags"), ["a", "b"]);
    assert!(request.files().expect("no files").is_empty());
}

#[test]
fn form_errors_surface_only_on_access() {
    let request = build_with(&form_scope(), "a=1&b=2&c=3")
        .with_form_parser(Arc::new(UrlEncodedFormParser::with_max_fields(2)));
    assert_eq!(request.query_params().len(), 0);
    let err = request.post().expect_err("too many fields");
    assert_eq!(err, FormError::TooManyFields { count: 3, limit: 2 });
    assert_eq!(request.post().expect_err("memoized"), err);
}

#[test]
fn set_post_overrides_parsed_fields() {
    let mut request = build_with(&form_scope(), "a=1");
    request.set_post([("replaced", "yes")].into_iter().collect());
    let post = request.post().expect("override");
    assert_eq!(post.get("replaced"), Some("yes"));
    assert!(!post.contains_key("a"));
}

#[test]
fn set_encoding_reparses_cached_fields() {
    let mut request = build(&ConnectionScope::http("GET", "/").query_string("q=%E9"));
    assert_eq!(request.query_params().get("q"), Some("\u{fffd}"));
    assert!(request.set_encoding("latin1"));
    assert_eq!(request.query_params().get("q"), Some("\u{e9}"));
    assert!(!request.set_encoding("no-such-charset"));
    assert_eq!(request.encoding(), encoding_rs::WINDOWS_1252);
}

#[test]
fn cookies_are_parsed_once() {
    let request = build(
        &ConnectionScope::http("GET", "/").header("cookie", "session=abc; theme=\"dark\""),
    );
    assert_eq!(request.cookies()["session"], "abc");
    assert_eq!(request.cookies()["theme"], "dark");
    assert!(std::ptr::eq(request.cookies(), request.cookies()));
}

#[test]
fn body_reader_is_seekable() {
    let request = build_with(&ConnectionScope::http("POST", "/"), "hello world");
    let mut reader = request.body_reader();
    reader.seek(SeekFrom::Start(6)).expect("seek");
    let mut tail = String::new();
    reader.read_to_string(&mut tail).expect("read");
    assert_eq!(tail, "world");
    assert_eq!(request.body().as_ref(), b"hello world");
}

#[test]
fn header_iteration_uses_title_case() {
    let request = build(
        &ConnectionScope::http("GET", "/")
            .header("x-request-id", "42")
            .header("content-type", "text/plain"),
    );
    let headers: Vec<(String, &str)> = request.headers().iter().collect();
    assert!(headers.contains(&("X-Request-Id".to_owned(), "42")));
    assert!(headers.contains(&("Content-Type".to_owned(), "text/plain")));
}
