// HTTP transport over the signing engine. The routes are thin: decode the
// request, hand it to a use case on the blocking pool, encode the outcome.

use crate::application::{
    decode_base64, decode_signature_payload, CreateDocumentRequest, CreateDocumentUseCase,
    DocumentContentUseCase, DocumentView, LifecycleService, NewDocument, SignDocumentUseCase, SignRequest,
    SignedDocumentView,
};
use crate::config::EngineConfig;
use crate::domain::DocumentDraft;
use crate::error::{Result, SigningError};
use crate::infrastructure::{ContentStore, DocumentRepository};
use chrono::Utc;
use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error};

pub const ADMIN_ID_HEADER: &str = "x-admin-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
// Room for JSON framing around the base64 payload
const ENVELOPE_SLACK: usize = 64 * 1024;

/// Shared per-process state handed to every request.
pub struct AppState {
    pub lifecycle: LifecycleService,
    pub create: CreateDocumentUseCase,
    pub sign: SignDocumentUseCase,
    pub content: DocumentContentUseCase,
    pub config: EngineConfig,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        store: Arc<dyn ContentStore>,
        config: EngineConfig,
    ) -> Self {
        let lifecycle = LifecycleService::new(repository.clone());
        Self {
            create: CreateDocumentUseCase::new(repository.clone(), store.clone(), config.clone()),
            sign: SignDocumentUseCase::new(lifecycle.clone(), store.clone(), config.clone()),
            content: DocumentContentUseCase::new(lifecycle.clone(), repository, store),
            lifecycle,
            config,
        }
    }
}

pub async fn handle_request(
    state: Arc<AppState>,
    remote_addr: Option<SocketAddr>,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, %path, "request received");

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let result = match (method.clone(), segments.as_slice()) {
        (Method::POST, ["api", "admin", "documents"]) => create_document(state, req).await,
        (Method::GET, ["api", "admin", "documents"]) => list_documents(state, req).await,
        (Method::POST, ["api", "admin", "documents", token, "cancel"]) => {
            cancel_document(state, req, token).await
        }
        (Method::GET, ["api", "admin", "documents", id, "download"]) => {
            download_signed(state, req, id).await
        }
        (Method::GET, ["api", "documents", token]) => view_document(state, token).await,
        (Method::GET, ["api", "documents", token, "pdf"]) => original_pdf(state, token).await,
        (Method::POST, ["api", "documents", token, "sign"]) => {
            sign_document(state, remote_addr, req, token).await
        }
        (_, ["api", "admin", "documents"])
        | (_, ["api", "admin", "documents", _, "cancel"])
        | (_, ["api", "admin", "documents", _, "download"])
        | (_, ["api", "documents", _])
        | (_, ["api", "documents", _, "pdf"])
        | (_, ["api", "documents", _, "sign"]) => {
            return Ok(error_body(
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "Method not allowed",
            ));
        }
        _ => {
            return Ok(error_body(
                StatusCode::NOT_FOUND,
                "route_not_found",
                "Route not found",
            ))
        }
    };

    Ok(match result {
        Ok(response) => response,
        Err(e) => {
            if e.http_status() >= 500 {
                error!(%method, %path, error = %e, "request failed");
            } else {
                debug!(%method, %path, code = e.code(), "request rejected");
            }
            error_response(&e)
        }
    })
}

async fn create_document(state: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>> {
    let admin_id = admin_id(&req)?;
    let limit = state.config.max_pdf_bytes / 3 * 4 + ENVELOPE_SLACK;
    let request: CreateDocumentRequest = read_json(req, limit).await?;

    let new = NewDocument {
        pdf: decode_base64("content", &request.content)?,
        draft: DocumentDraft {
            title: request.title,
            file_name: request.file_name.unwrap_or_default(),
            placement: request.placement,
            recipient_name: request.recipient_name,
            recipient_email: request.recipient_email,
            admin_id,
        },
        ttl_days: request.ttl_days,
    };

    let created = run_blocking(move || state.create.execute(new, Utc::now())).await?;
    json_response(StatusCode::CREATED, &created)
}

async fn list_documents(state: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>> {
    let admin_id = admin_id(&req)?;
    let documents =
        run_blocking(move || state.lifecycle.list_for_admin(&admin_id, Utc::now())).await?;
    json_response(StatusCode::OK, &documents)
}

async fn cancel_document(
    state: Arc<AppState>,
    req: Request<Body>,
    token: &str,
) -> Result<Response<Body>> {
    let admin_id = admin_id(&req)?;
    let token = token.to_string();
    let document =
        run_blocking(move || state.lifecycle.cancel(&token, &admin_id, Utc::now())).await?;
    json_response(StatusCode::OK, &DocumentView::from(&document))
}

async fn view_document(state: Arc<AppState>, token: &str) -> Result<Response<Body>> {
    let token = token.to_string();
    let document =
        run_blocking(move || state.lifecycle.resolve_for_viewing(&token, Utc::now())).await?;
    json_response(StatusCode::OK, &DocumentView::from(&document))
}

async fn original_pdf(state: Arc<AppState>, token: &str) -> Result<Response<Body>> {
    let token = token.to_string();
    let (document, bytes) =
        run_blocking(move || state.content.original_for_signer(&token, Utc::now())).await?;
    pdf_response(bytes, &format!("inline; filename=\"{}\"", document.file_name))
}

async fn download_signed(
    state: Arc<AppState>,
    req: Request<Body>,
    id: &str,
) -> Result<Response<Body>> {
    let admin_id = admin_id(&req)?;
    let id = id.to_string();
    let (document, bytes) =
        run_blocking(move || state.content.signed_for_admin(&id, &admin_id)).await?;
    pdf_response(
        bytes,
        &format!("attachment; filename=\"signed-{}\"", document.file_name),
    )
}

async fn sign_document(
    state: Arc<AppState>,
    remote_addr: Option<SocketAddr>,
    req: Request<Body>,
    token: &str,
) -> Result<Response<Body>> {
    let signer_ip = client_ip(&req, remote_addr);
    let limit = state.config.max_signature_bytes / 3 * 4 + ENVELOPE_SLACK;
    let request: SignRequest = read_json(req, limit).await?;
    let signature = decode_signature_payload(&request.signature)?;

    let token = token.to_string();
    let document = run_blocking(move || {
        state
            .sign
            .execute(&token, &signature, &signer_ip, Utc::now())
    })
    .await?;
    json_response(StatusCode::OK, &SignedDocumentView::from(&document))
}

fn admin_id(req: &Request<Body>) -> Result<String> {
    req.headers()
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(SigningError::Unauthorized)
}

/// First `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(req: &Request<Body>, remote_addr: Option<SocketAddr>) -> String {
    req.headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Buffers at most `limit` bytes of the body before giving up.
async fn read_json<T: DeserializeOwned>(req: Request<Body>, limit: usize) -> Result<T> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(size) = declared {
        if size > limit {
            return Err(SigningError::PayloadTooLarge { size, limit });
        }
    }

    let mut body = req.into_body();
    let mut buf = Vec::with_capacity(declared.unwrap_or(0));
    while let Some(chunk) = body.data().await {
        let chunk = chunk
            .map_err(|e| SigningError::InvalidRequest(format!("failed to read body: {e}")))?;
        if buf.len() + chunk.len() > limit {
            return Err(SigningError::PayloadTooLarge {
                size: buf.len() + chunk.len(),
                limit,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&buf)
        .map_err(|e| SigningError::InvalidRequest(format!("invalid JSON body: {e}")))
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SigningError::Internal(format!("worker task failed: {e}")))?
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_vec(value)
        .map_err(|e| SigningError::Internal(format!("failed to encode response: {e}")))?;
    Ok(with_json(status, Body::from(body)))
}

fn pdf_response(bytes: Vec<u8>, disposition: &str) -> Result<Response<Body>> {
    let disposition = HeaderValue::from_str(disposition)
        .map_err(|e| SigningError::Internal(format!("invalid content disposition: {e}")))?;
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

fn error_response(err: &SigningError) -> Response<Body> {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_body(status, err.code(), &err.to_string())
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Response<Body> {
    let body = json::object! {
        "error" => message,
        "code" => code
    };
    with_json(status, Body::from(body.dump()))
}

fn with_json(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
