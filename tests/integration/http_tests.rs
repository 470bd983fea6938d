use hyper::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Method, Request, StatusCode};
use signlink::pdf::page_count;
use signlink::EngineConfig;

use super::fixtures::{signature_png, three_page_pdf, ADMIN_ID};
use super::helpers::{create_payload, request, sign_payload, TestServer};

async fn create(server: &TestServer, page_number: u32) -> String {
    let (status, body) = server
        .send(request(
            Method::POST,
            "/api/admin/documents",
            Some(ADMIN_ID),
            Some(create_payload(&three_page_pdf(), page_number)),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_view_sign_flow() {
    let server = TestServer::new();
    let (status, created) = server
        .send(request(
            Method::POST,
            "/api/admin/documents",
            Some(ADMIN_ID),
            Some(create_payload(&three_page_pdf(), 2)),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = created["token"].as_str().unwrap().to_string();
    assert_eq!(
        created["signingLink"].as_str().unwrap(),
        format!("https://sign.example.com/sign/{token}")
    );

    let (status, view) = server
        .send(request(Method::GET, &format!("/api/documents/{token}"), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "PENDING");
    assert_eq!(view["pageNumber"], 2);
    assert_eq!(view["fileName"], "agreement.pdf");

    let mut sign = request(
        Method::POST,
        &format!("/api/documents/{token}/sign"),
        None,
        Some(sign_payload(&signature_png())),
    );
    sign.headers_mut()
        .insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
    let (status, signed) = server.send(sign).await;
    assert_eq!(status, StatusCode::OK, "{signed}");
    assert_eq!(signed["status"], "SIGNED");
    assert!(signed["signedAt"].is_string());

    let (status, listed) = server
        .send(request(Method::GET, "/api/admin/documents", Some(ADMIN_ID), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "SIGNED");
    assert_eq!(listed[0]["signerIp"], "203.0.113.7");

    let (status, _) = server
        .send(request(Method::GET, &format!("/api/documents/{token}"), None, None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_second_signature_conflicts() {
    let server = TestServer::new();
    let token = create(&server, 1).await;
    let path = format!("/api/documents/{token}/sign");

    let (status, _) = server
        .send(request(Method::POST, &path, None, Some(sign_payload(&signature_png()))))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(request(Method::POST, &path, None, Some(sign_payload(&signature_png()))))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_signed");
}

#[tokio::test]
async fn test_cancelled_link_is_gone() {
    let server = TestServer::new();
    let token = create(&server, 1).await;

    let (status, _) = server
        .send(request(
            Method::POST,
            &format!("/api/admin/documents/{token}/cancel"),
            Some("admin-other"),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cancelled) = server
        .send(request(
            Method::POST,
            &format!("/api/admin/documents/{token}/cancel"),
            Some(ADMIN_ID),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (status, body) = server
        .send(request(Method::GET, &format!("/api/documents/{token}"), None, None))
        .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "cancelled");
}

#[tokio::test]
async fn test_admin_routes_require_identity() {
    let server = TestServer::new();
    let (status, body) = server
        .send(request(
            Method::POST,
            "/api/admin/documents",
            None,
            Some(create_payload(&three_page_pdf(), 1)),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = server
        .send(request(Method::GET, "/api/admin/documents", None, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let server = TestServer::new();
    let (status, body) = server
        .send(request(
            Method::POST,
            "/api/admin/documents",
            Some(ADMIN_ID),
            Some(create_payload(&three_page_pdf(), 9)),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "page_out_of_range");

    let (status, body) = server
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/admin/documents")
                .header("x-admin-id", ADMIN_ID)
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_unsupported_signature_image() {
    let server = TestServer::new();
    let token = create(&server, 1).await;

    let (status, body) = server
        .send(request(
            Method::POST,
            &format!("/api/documents/{token}/sign"),
            None,
            Some(json::object! { "signature" => "data:image/jpeg;base64,/9j/4AAQ" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unsupported_image_format");

    let (status, view) = server
        .send(request(Method::GET, &format!("/api/documents/{token}"), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "PENDING");
}

#[tokio::test]
async fn test_unknown_routes_and_methods() {
    let server = TestServer::new();

    let (status, body) = server
        .send(request(Method::GET, "/api/unknown", None, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "route_not_found");

    let (status, _) = server
        .send(request(Method::DELETE, "/api/documents/abc", None, None))
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, body) = server
        .send(request(Method::GET, "/api/documents/no-such-token", None, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_oversized_body_rejected_before_reading() {
    let server = TestServer::with_config(EngineConfig {
        max_signature_bytes: 1024,
        ..EngineConfig::default()
    });
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/documents/anything/sign")
        .header(CONTENT_LENGTH, 10 * 1024 * 1024)
        .body(Body::empty())
        .unwrap();

    let (status, body) = server.send(req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");
}

#[tokio::test]
async fn test_signer_fetches_original_pdf() {
    let server = TestServer::new();
    let token = create(&server, 1).await;

    let (status, headers, bytes) = server
        .send_raw(request(Method::GET, &format!("/api/documents/{token}/pdf"), None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/pdf");
    assert_eq!(
        headers.get(CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"agreement.pdf\""
    );
    assert_eq!(bytes, three_page_pdf());

    let (status, _) = server
        .send(request(
            Method::POST,
            &format!("/api/admin/documents/{token}/cancel"),
            Some(ADMIN_ID),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(request(Method::GET, &format!("/api/documents/{token}/pdf"), None, None))
        .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "cancelled");
}

#[tokio::test]
async fn test_admin_downloads_signed_output() {
    let server = TestServer::new();
    let (status, created) = server
        .send(request(
            Method::POST,
            "/api/admin/documents",
            Some(ADMIN_ID),
            Some(create_payload(&three_page_pdf(), 1)),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    let token = created["token"].as_str().unwrap().to_string();
    let download = format!("/api/admin/documents/{id}/download");

    let (status, body) = server
        .send(request(Method::GET, &download, Some(ADMIN_ID), None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "not_signed");

    let (status, _) = server
        .send(request(
            Method::POST,
            &format!("/api/documents/{token}/sign"),
            None,
            Some(sign_payload(&signature_png())),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .send(request(Method::GET, &download, Some("admin-other"), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send(request(Method::GET, &download, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, headers, bytes) = server
        .send_raw(request(Method::GET, &download, Some(ADMIN_ID), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/pdf");
    assert_eq!(
        headers.get(CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"signed-agreement.pdf\""
    );
    assert_ne!(bytes, three_page_pdf());
    assert_eq!(page_count(&bytes).unwrap(), 3);
}
