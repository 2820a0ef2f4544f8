#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::body::{self, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mmcall_server::router::build_router;
use mmcall_server::services::math;

use common::{state, CONFIG};

fn app() -> Router {
    build_router(state(CONFIG, vec![math::resource()]))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let ct = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, ct, value)
}

#[tokio::test]
async fn post_with_call_header() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .header("x-mmid", "7")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("[2,3]"))
        .unwrap();

    let (status, ct, frame) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct.as_deref(), Some("application/json"));
    assert_eq!(frame, json!(["", 5, "", 7]));
}

#[tokio::test]
async fn textual_ids_keep_their_form() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .header("x-mmid", "007")
        .body(Body::from("[1,2]"))
        .unwrap();

    let (_, _, frame) = send(app(), req).await;
    assert_eq!(frame, json!(["", 3, "", "007"]));
}

#[tokio::test]
async fn get_takes_payload_from_query() {
    let req = Request::builder()
        .uri("/api/v1?d=%5B4%2C5%5D")
        .header("x-mmcall", "math.add")
        .body(Body::empty())
        .unwrap();

    let (status, _, frame) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame, json!(["", 9]));
}

#[tokio::test]
async fn full_frame_in_body_without_headers() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .body(Body::from(r#"["math.add",[1,1],"","abc"]"#))
        .unwrap();

    let (_, _, frame) = send(app(), req).await;
    assert_eq!(frame, json!(["", 2, "", "abc"]));
}

#[tokio::test]
async fn unsupported_media_is_reported() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("2 + 3"))
        .unwrap();

    let (status, _, frame) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame[0]["code"], json!(4250));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let yaml = "version: 1\ncodec:\n  limit_bytes: 8\n";
    let app = build_router(state(yaml, vec![math::resource()]));
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .header("x-mmid", "1")
        .body(Body::from("[1, 2, 3, 4, 5, 6]"))
        .unwrap();

    let (_, _, frame) = send(app, req).await;
    assert_eq!(frame[0]["code"], json!(4220));
    assert_eq!(frame[3], json!(1));
}

#[tokio::test]
async fn aborted_body_is_a_decode_error() {
    let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok("[1,"),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
    ];
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .header("x-mmid", "4")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap();

    let (_, _, frame) = send(app(), req).await;
    assert_eq!(frame[0]["code"], json!(4230));
    assert_eq!(frame[3], json!(4));
}

#[tokio::test]
async fn raw_endpoint_reads_the_body_itself() {
    let req = Request::builder()
        .method(Method::PUT)
        .uri("/api/v1")
        .header("x-mmcall", "math.echo")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from("not json at all"))
        .unwrap();

    let (_, _, frame) = send(app(), req).await;
    assert_eq!(frame, json!(["", "not json at all"]));
}

#[tokio::test]
async fn meta_header_carries_credentials() {
    let st = state(CONFIG, vec![mmcall_server::services::session::resource("user", Default::default())]);
    let tok = common::token(&st);
    let app = build_router(st);

    let req = Request::builder()
        .uri("/api/v1")
        .header("x-mmcall", "session.whoami")
        .header("x-mmhead", json!({ "token": tok }).to_string())
        .body(Body::empty())
        .unwrap();
    let (_, _, frame) = send(app.clone(), req).await;
    assert_eq!(frame[1]["name"], json!("ada"));

    let req = Request::builder()
        .uri("/api/v1")
        .header("x-mmcall", "session.whoami")
        .header("x-mmhead", tok)
        .body(Body::empty())
        .unwrap();
    let (_, _, frame) = send(app, req).await;
    assert_eq!(frame[1]["sub"], json!("user"));
}

#[tokio::test]
async fn options_short_circuits() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1")
        .header("x-mmcall", "math.add")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_version_is_ignored() {
    for uri in ["/api/v9", "/elsewhere/v1"] {
        let req = Request::builder()
            .uri(uri)
            .header("x-mmcall", "math.add")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn posted_error_frame_gets_no_reply() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .body(Body::from(r#"[{"code":4000,"message":"Error"},null,"",3]"#))
        .unwrap();
    let (status, _, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
