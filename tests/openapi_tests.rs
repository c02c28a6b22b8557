//! OpenAPI binding: path translation, registry resolution, validation
//! middleware, and server-based mounting.

mod common;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    Json,
};
use common::{body_json, body_text};
use febby::openapi::bind;
use febby::{handler_fn, middleware_fn, ConfigError, Handler, Middleware, OpenApiOptions};
use serde_json::json;
use tower::ServiceExt;

fn echo_handler() -> Handler {
    handler_fn(|_req| async { Json(json!({"ok": true})) })
}

fn tagging_middleware(tag: &'static str) -> Middleware {
    middleware_fn(move |req: Request, next: Next| async move {
        let mut res = next.run(req).await;
        let headers = res.headers_mut();
        let value = match headers.get("x-order") {
            Some(prev) => format!("{},{}", prev.to_str().unwrap_or(""), tag),
            None => tag.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert("x-order", value);
        }
        res
    })
}

const PETSTORE_YAML: &str = r#"
openapi: 3.0.0
info:
  title: pets
  version: "1.0"
servers:
  - url: http://localhost:3000/api/v1
paths:
  /pets/{petId}:
    get:
      operationId: getPet
      x-controller: getPet
      responses:
        "200":
          description: ok
"#;

#[tokio::test]
async fn template_parameters_become_router_captures() {
    let options = OpenApiOptions::new().controller(
        "getPet",
        handler_fn(|req: Request| async move {
            use axum::RequestExt;
            let mut req = req;
            let axum::extract::Path(id) = req
                .extract_parts::<axum::extract::Path<String>>()
                .await
                .unwrap();
            Json(json!({"petId": id}))
        }),
    );
    let app = bind(PETSTORE_YAML, &options).unwrap();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/pets/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"petId": "42"}));
}

#[tokio::test]
async fn routes_mount_under_server_path_only() {
    let options = OpenApiOptions::new().controller("getPet", echo_handler());
    let app = bind(PETSTORE_YAML, &options).unwrap();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/pets/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
fn missing_x_controller_is_rejected_with_location() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      responses: {"200": {description: ok}}
"#;
    let err = bind(doc, &OpenApiOptions::new()).unwrap_err();
    match err {
        ConfigError::OpenApi(msg) => {
            assert!(msg.contains("x-controller"), "{}", msg);
            assert!(msg.contains("get /a"), "{}", msg);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unknown_controller_name_is_rejected() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      x-controller: nope
      responses: {"200": {description: ok}}
"#;
    let err = bind(doc, &OpenApiOptions::new()).unwrap_err();
    match err {
        ConfigError::OpenApi(msg) => assert!(msg.contains("'nope'"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unknown_middleware_name_is_rejected() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      x-controller: a
      x-middlewares: [audit]
      responses: {"200": {description: ok}}
"#;
    let options = OpenApiOptions::new().controller("a", echo_handler());
    let err = bind(doc, &options).unwrap_err();
    match err {
        ConfigError::OpenApi(msg) => assert!(msg.contains("'audit'"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn empty_paths_is_rejected() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths: {}
"#;
    let err = bind(doc, &OpenApiOptions::new()).unwrap_err();
    match err {
        ConfigError::OpenApi(msg) => assert!(msg.contains("no paths"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unresolved_ref_fails_spec_check() {
    let doc = r##"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    post:
      x-controller: a
      requestBody:
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Missing"
      responses: {"200": {description: ok}}
"##;
    let options = OpenApiOptions::new().controller("a", echo_handler());
    let err = bind(doc, &options).unwrap_err();
    match err {
        ConfigError::OpenApi(msg) => assert!(msg.contains("Missing"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn middlewares_run_in_listed_order() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      x-controller: a
      x-middlewares: [first, second]
      responses: {"200": {description: ok}}
"#;
    let options = OpenApiOptions::new()
        .controller("a", echo_handler())
        .middleware("first", tagging_middleware("a"))
        .middleware("second", tagging_middleware("b"));
    let app = bind(doc, &options).unwrap();
    let res = app
        .oneshot(Request::builder().uri("/a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    // Tags append on the way out, so the outermost (first-listed) wins last.
    assert_eq!(res.headers()["x-order"], "b,a");
}

#[tokio::test]
async fn invalid_request_body_is_rejected_with_400() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pets:
    post:
      x-controller: create
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: {type: string}
      responses: {"201": {description: created}}
"#;
    let options = OpenApiOptions::new().controller("create", echo_handler());
    let app = bind(doc, &options).unwrap();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pets")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name": 7}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["code"], json!(400));

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pets")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name": "ok"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_required_body_is_rejected_with_400() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /pets:
    post:
      x-controller: create
      requestBody:
        required: true
        content:
          application/json:
            schema: {type: object}
      responses: {"201": {description: created}}
"#;
    let options = OpenApiOptions::new().controller("create", echo_handler());
    let app = bind(doc, &options).unwrap();
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn response_validation_turns_mismatch_into_500() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      x-controller: a
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: object
                required: [name]
                properties:
                  name: {type: string}
"#;
    let mut options = OpenApiOptions::new().controller("a", echo_handler());
    options.validate_responses = true;
    let app = bind(doc, &options).unwrap();
    let res = app
        .oneshot(Request::builder().uri("/a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["code"], json!(500));
}

#[tokio::test]
async fn non_json_errors_are_translated_to_envelope() {
    let doc = r#"
openapi: 3.0.0
info: {title: t, version: "1"}
paths:
  /a:
    get:
      x-controller: a
      responses: {"200": {description: ok}}
"#;
    let options = OpenApiOptions::new().controller("a", echo_handler());
    let app = bind(doc, &options).unwrap();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["code"], json!(404));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn json_document_is_accepted() {
    let doc = r#"{
  "openapi": "3.0.0",
  "info": {"title": "t", "version": "1"},
  "paths": {
    "/a": {"get": {"x-controller": "a", "responses": {"200": {"description": "ok"}}}}
  }
}"#;
    let options = OpenApiOptions::new().controller("a", echo_handler());
    let app = bind(doc, &options).unwrap();
    let res = app
        .oneshot(Request::builder().uri("/a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, r#"{"ok":true}"#);
}
