//! Dispatch outcomes and error precedence.
//!
//! - successful replies are normalized (text, JSON, full responses)
//! - an `Exception` carries its own response
//! - opaque errors and panics become the generic 500
//! - a custom error hook overrides both

mod common;

use std::sync::Arc;

use common::{content_length, send, test_tracing};
use headway::dispatcher::Dispatcher;
use headway::router::RouteTableBuilder;
use headway::{
    translate, App, AppConfig, ErrorCondition, Exception, HandlerError, HandlerRequest,
    HandlerResponse, Reply,
};
use http::Method;
use serde_json::json;

fn failing_app(config: AppConfig) -> App {
    App::builder(config)
        .get("/exception", |_req: HandlerRequest| async {
            Err::<String, HandlerError>(Exception::new(ErrorCondition::AccessDenied).into())
        })
        .get("/custom-exception", |_req: HandlerRequest| async {
            let response = HandlerResponse::text(418, "teapot").header("x-kind", "custom");
            Err::<String, HandlerError>(Exception::with_response(response).into())
        })
        .get("/opaque", |_req: HandlerRequest| async {
            let err: Result<u32, _> = "nope".parse::<u32>();
            let n = err?;
            Ok::<_, HandlerError>(n.to_string())
        })
        .get("/panic", |_req: HandlerRequest| async {
            if true {
                panic!("handler exploded");
            }
            Ok::<_, HandlerError>("unreachable")
        })
        .build()
        .expect("valid routes")
}

#[tokio::test]
async fn test_reply_normalization() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new())
        .get("/text", |_req: HandlerRequest| async { Ok::<_, HandlerError>("hello") })
        .get("/json", |_req: HandlerRequest| async {
            Ok::<_, HandlerError>(json!({"a": [1, 2]}))
        })
        .get("/full", |_req: HandlerRequest| async {
            Ok::<_, HandlerError>(HandlerResponse::new(
                201,
                Default::default(),
                Some(b"raw".to_vec()),
            ))
        })
        .build()
        .expect("valid routes");

    let text = send(&app, "GET", "/text").await;
    assert_eq!(text.status, 200);
    assert_eq!(text.get_header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(content_length(&text), Some(5));

    let data = send(&app, "GET", "/json").await;
    assert_eq!(data.get_header("content-type"), Some("application/json; charset=utf-8"));
    assert_eq!(data.body_text().as_deref(), Some(r#"{"a":[1,2]}"#));

    // Full responses pass through untouched, even without a content-length.
    let full = send(&app, "GET", "/full").await;
    assert_eq!(full.status, 201);
    assert!(full.headers.is_empty());
    assert_eq!(full.body.as_deref(), Some(&b"raw"[..]));
}

#[tokio::test]
async fn test_exception_carries_response() {
    let _tracing = test_tracing();
    let app = failing_app(AppConfig::new());

    let res = send(&app, "GET", "/exception").await;
    assert_eq!(res, translate(ErrorCondition::AccessDenied).to_response());
    assert_eq!(res.status, 403);
    assert_eq!(
        res.body_text().as_deref(),
        Some(r#"{"message":"Access Denied","code":403}"#)
    );

    let res = send(&app, "GET", "/custom-exception").await;
    assert_eq!(res.status, 418);
    assert_eq!(res.get_header("x-kind"), Some("custom"));
}

#[tokio::test]
async fn test_opaque_error_is_500() {
    let _tracing = test_tracing();
    let app = failing_app(AppConfig::new());

    let res = send(&app, "GET", "/opaque").await;
    assert_eq!(res.status, 500);
    assert_eq!(
        res.body_text().as_deref(),
        Some(r#"{"message":"Something Went Wrong","code":500}"#)
    );
    assert_eq!(content_length(&res), Some(45));
}

#[tokio::test]
async fn test_panic_is_500() {
    let _tracing = test_tracing();
    let app = failing_app(AppConfig::new());

    let res = send(&app, "GET", "/panic").await;
    assert_eq!(res.status, 500);
    assert_eq!(content_length(&res), Some(45));

    // The app keeps serving after a panic.
    let res = send(&app, "GET", "/exception").await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_error_hook_takes_precedence() {
    let _tracing = test_tracing();
    let config = AppConfig::new().error(|err: &HandlerError| {
        let kind = if err.is_exception() { "exception" } else { "opaque" };
        HandlerResponse::text(503, kind).header("x-hook", "1")
    });
    let app = failing_app(config);

    for (path, kind) in [
        ("/exception", "exception"),
        ("/custom-exception", "exception"),
        ("/opaque", "opaque"),
        ("/panic", "opaque"),
    ] {
        let res = send(&app, "GET", path).await;
        assert_eq!(res.status, 503, "{path}");
        assert_eq!(res.get_header("x-hook"), Some("1"), "{path}");
        assert_eq!(res.body_text().as_deref(), Some(kind), "{path}");
    }
}

#[tokio::test]
async fn test_error_hook_text_reply_gets_500() {
    let _tracing = test_tracing();
    let app = failing_app(AppConfig::new().error(|_err: &HandlerError| "oops"));

    let res = send(&app, "GET", "/opaque").await;
    assert_eq!(res.status, 500);
    assert_eq!(res.body_text().as_deref(), Some("oops"));
    assert_eq!(content_length(&res), Some(4));
}

#[tokio::test]
async fn test_not_found_override_failure_uses_error_path() {
    let _tracing = test_tracing();
    let config = AppConfig::new().not_found(|_req: HandlerRequest| async {
        Err::<String, HandlerError>(HandlerError::opaque(anyhow::anyhow!("missing")))
    });
    let app = App::builder(config).build().expect("no routes");

    let res = send(&app, "GET", "/anything").await;
    assert_eq!(res.status, 500);
    assert_eq!(content_length(&res), Some(45));
}

#[tokio::test]
async fn test_path_params_and_query() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new())
        .get("/users/{id}/posts/:post", |req: HandlerRequest| async move {
            Ok::<_, HandlerError>(json!({
                "id": req.get_path_param("id"),
                "post": req.get_path_param("post"),
                "sort": req.get_query_param("sort"),
            }))
        })
        .build()
        .expect("valid routes");

    let res = send(&app, "GET", "/users/a%20b/posts/9?sort=desc").await;
    assert_eq!(res.status, 200);
    let body: serde_json::Value =
        serde_json::from_slice(res.body.as_deref().unwrap_or_default()).expect("json body");
    assert_eq!(body, json!({"id": "a b", "post": "9", "sort": "desc"}));

    // The query string never takes part in matching.
    let res = send(&app, "GET", "/users/1/posts?sort=desc").await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new())
        .get("/files/:name", |_req: HandlerRequest| async {
            Ok::<_, HandlerError>("param")
        })
        .get("/files/readme", |_req: HandlerRequest| async {
            Ok::<_, HandlerError>("static")
        })
        .build()
        .expect("distinct patterns");

    let res = send(&app, "GET", "/files/readme").await;
    assert_eq!(res.body_text().as_deref(), Some("param"));
}

#[tokio::test]
async fn test_method_is_case_insensitive() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new())
        .route("patch", "/x", |_req: HandlerRequest| async { Ok::<_, HandlerError>("ok") })
        .build()
        .expect("valid routes");

    assert_eq!(send(&app, "PATCH", "/x").await.status, 200);
    assert_eq!(send(&app, "Patch", "/x").await.status, 200);
    assert_eq!(send(&app, "GET", "/x").await.status, 404);
    assert_eq!(send(&app, "PATCH", "/X").await.status, 404);
}

#[tokio::test]
async fn test_duplicate_route_fails_build() {
    let err = App::builder(AppConfig::new())
        .get("/a", |_req: HandlerRequest| async { Ok::<_, HandlerError>("1") })
        .get("/a", |_req: HandlerRequest| async { Ok::<_, HandlerError>("2") })
        .build()
        .unwrap_err();
    assert!(matches!(err, headway::ConfigError::DuplicateRoute { .. }));

    let err = App::builder(AppConfig::new())
        .get("no-slash", |_req: HandlerRequest| async { Ok::<_, HandlerError>("1") })
        .build()
        .unwrap_err();
    assert!(matches!(err, headway::ConfigError::InvalidPattern { .. }));
}

#[tokio::test]
async fn test_dispatcher_directly() {
    let _tracing = test_tracing();
    let mut builder = RouteTableBuilder::new();
    builder
        .register(Method::DELETE, "/items/:id", |req: HandlerRequest| async move {
            Ok::<_, HandlerError>(Reply::Text(format!(
                "deleted {}",
                req.get_path_param("id").unwrap_or_default()
            )))
        })
        .expect("valid route");
    let dispatcher = Dispatcher::new(builder.build(), AppConfig::new());

    let res = dispatcher
        .dispatch(HandlerRequest::new("DELETE", "/items/3"))
        .await;
    assert_eq!(res.body_text().as_deref(), Some("deleted 3"));

    let res = dispatcher.dispatch(HandlerRequest::get("/items/3")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_concurrent_requests_share_app() {
    let _tracing = test_tracing();
    let app = Arc::new(
        App::builder(AppConfig::new())
            .get("/echo/:n", |req: HandlerRequest| async move {
                tokio::task::yield_now().await;
                Ok::<_, HandlerError>(req.get_path_param("n").unwrap_or_default().to_string())
            })
            .build()
            .expect("valid routes"),
    );

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move { (i, send(&app, "GET", &format!("/echo/{i}")).await) })
        })
        .collect();

    for task in tasks {
        let (i, res) = task.await.expect("task");
        assert_eq!(res.body_text(), Some(i.to_string()));
    }
}

#[tokio::test]
async fn test_fetch_http() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new().preflight(true))
        .post("/echo", |req: HandlerRequest| async move {
            let value: serde_json::Value = req.json()?;
            Ok::<_, HandlerError>(value)
        })
        .build()
        .expect("valid routes");

    let req = http::Request::builder()
        .method("POST")
        .uri("http://localhost/echo")
        .header("content-type", "application/json")
        .body(br#"{"x":1}"#.to_vec())
        .expect("request");
    let res = app.fetch_http(req).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body().as_slice(), br#"{"x":1}"#);

    let bad = http::Request::builder()
        .method("POST")
        .uri("/echo")
        .body(b"{".to_vec())
        .expect("request");
    let res = app.fetch_http(bad).await;
    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["content-length"], "36");
}

#[tokio::test]
async fn test_invalid_method_is_not_found() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new().preflight(true))
        .get("/foo", |_req: HandlerRequest| async { Ok::<_, HandlerError>("bar") })
        .build()
        .expect("valid routes");

    for token in ["BAD METHOD", "", "G{E}T"] {
        let res = send(&app, token, "/foo").await;
        assert_eq!(res.status, 404, "{token:?}");
        assert_eq!(
            res.body_text().as_deref(),
            Some(r#"{"message":"Not Found","code":404}"#)
        );
    }
}

#[tokio::test]
async fn test_route_with_invalid_method_fails_build() {
    let err = App::builder(AppConfig::new())
        .route("not a method", "/x", |_req: HandlerRequest| async {
            Ok::<_, HandlerError>("x")
        })
        .get("/x", |_req: HandlerRequest| async { Ok::<_, HandlerError>("get") })
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        headway::ConfigError::InvalidMethod {
            method: "not a method".to_string()
        }
    );
}

#[tokio::test]
async fn test_fetch_http_lowercase_method() {
    let _tracing = test_tracing();
    let app = App::builder(AppConfig::new().preflight(true))
        .get("/foo", |_req: HandlerRequest| async { Ok::<_, HandlerError>("bar") })
        .build()
        .expect("valid routes");

    let get = http::Request::builder()
        .method("get")
        .uri("/foo")
        .body(Vec::new())
        .expect("request");
    let res = app.fetch_http(get).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.body().as_slice(), b"bar");

    let head = http::Request::builder()
        .method("head")
        .uri("/foo")
        .body(Vec::new())
        .expect("request");
    let res = app.fetch_http(head).await;
    assert_eq!(res.status(), 200);
    assert!(res.body().is_empty());
    assert_eq!(res.headers()["content-length"], "3");
}
