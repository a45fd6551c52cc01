use axum::{
    Json,
    extract::{
        Path, Query, RawQuery, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{Instrument, debug, info_span, warn};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    extractor::ExtractError,
    gateway::{
        ApiDoc,
        dtos::{ErrorResponse, PageQuery, ScrapeRequest, ScrapeResponse},
    },
};

pub const X_SIZE_RAW: HeaderName = HeaderName::from_static("x-size-raw");
pub const X_SIZE_SANITIZED: HeaderName = HeaderName::from_static("x-size-sanitized");
pub const X_SIZE_MINIFIED: HeaderName = HeaderName::from_static("x-size-minified");

fn error_response(err: &ExtractError) -> Response {
    (
        err.status_code(),
        Json(ErrorResponse::new(err.public_message())),
    )
        .into_response()
}

/// Serve the cleaned page itself.
#[utoipa::path(
    get,
    path = "/",
    tag = "gateway",
    params(PageQuery),
    responses(
        (status = 200, description = "Sanitized, minified page", content_type = "text/html"),
        (status = 400, description = "Missing or invalid URL", body = ErrorResponse),
        (status = 502, description = "Page could not be loaded", body = ErrorResponse),
        (status = 504, description = "Navigation timed out", body = ErrorResponse)
    )
)]
pub async fn page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let url = match query.validate() {
        Ok(url) => url,
        Err(error) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response();
        }
    };

    match state.extract(url).await {
        Ok(extracted) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                (header::CACHE_CONTROL, "no-cache".to_string()),
                (X_SIZE_RAW, extracted.size.raw_bytes.to_string()),
                (X_SIZE_SANITIZED, extracted.size.sanitized_bytes.to_string()),
                (X_SIZE_MINIFIED, extracted.size.minified_bytes.to_string()),
            ],
            extracted.html,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// JSON envelope around the cleaned page. Only explicit http(s) URLs are
/// accepted here.
#[utoipa::path(
    get,
    path = "/scrape/{url}",
    tag = "gateway",
    params(("url" = String, Path, description = "Absolute http(s) URL, query string included")),
    responses(
        (status = 200, description = "Page extracted", body = ScrapeResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 502, description = "Page could not be loaded", body = ErrorResponse),
        (status = 504, description = "Navigation timed out", body = ErrorResponse)
    )
)]
pub async fn scrape(
    State(state): State<AppState>,
    Path(url): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let url = match query {
        Some(query) => format!("{}?{}", url, query),
        None => url,
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        return error_response(&ExtractError::UnsupportedScheme(scheme.to_string()));
    }

    match state.extract(&url).await {
        Ok(extracted) => Json(ScrapeResponse::success(extracted.html)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state).instrument(info_span!("ws", %connection_id))
    })
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("websocket connected");
    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "websocket receive failed");
                break;
            }
        };

        let reply = match ScrapeRequest::parse(text.as_str()) {
            Ok(request) => match state.extract(&request.url).await {
                Ok(extracted) => serde_json::to_string(&ScrapeResponse::success(extracted.html)),
                Err(e) => serde_json::to_string(&ErrorResponse::new(e.public_message())),
            },
            Err(error) => serde_json::to_string(&ErrorResponse::new(error)),
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "failed to encode websocket reply");
                continue;
            }
        };

        if socket.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
    }
    debug!("websocket disconnected");
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
