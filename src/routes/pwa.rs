use crate::guards::AssetRequestParts;
use crate::offline::{
    AssetRequest, AssetResponse, CacheOutcome, ResponseSource, StaticAssetCache, WorkerMessage,
    WorkerReply,
};
use crate::routes::ApiError;
use rocket::http::{ContentType, Header, Status};
use rocket::response::content::RawHtml;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, Response, State};
use std::io::Cursor;
use std::path::PathBuf;
use uuid::Uuid;

const WORKER_SCRIPT: &str = include_str!("../../assets/sw.js");
const OFFLINE_PAGE: &str = include_str!("../../assets/offline.html");
const WEB_MANIFEST: &str = include_str!("../../assets/manifest.webmanifest");

#[derive(Responder)]
#[response(content_type = "application/javascript")]
pub struct ServiceWorkerScript {
    inner: String,
    scope: Header<'static>,
    cache_control: Header<'static>,
}

/// The browser worker, prefixed with the policy it must enforce.
#[get("/sw.js")]
pub async fn service_worker(cache: &State<StaticAssetCache>) -> ServiceWorkerScript {
    let config = cache.policy().worker_config(cache.version());
    ServiceWorkerScript {
        inner: format!("self.__OFFLINE_POLICY__ = {};\n{}", config, WORKER_SCRIPT),
        scope: Header::new("Service-Worker-Allowed", "/"),
        cache_control: Header::new("Cache-Control", "no-cache"),
    }
}

#[get("/offline.html")]
pub async fn offline_page() -> RawHtml<&'static str> {
    RawHtml(OFFLINE_PAGE)
}

#[get("/manifest.webmanifest")]
pub async fn web_manifest() -> (ContentType, &'static str) {
    (ContentType::new("application", "manifest+json"), WEB_MANIFEST)
}

/// A response produced by the offline cache, tagged with where it came from.
pub struct CachedAsset {
    response: AssetResponse,
    source: ResponseSource,
}

impl<'r> Responder<'r, 'static> for CachedAsset {
    fn respond_to(self, _request: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::from_code(self.response.status).unwrap_or(Status::InternalServerError);
        let source = match self.source {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline",
        };
        let mut builder = Response::build();
        builder
            .status(status)
            .raw_header("X-Cache-Source", source)
            .sized_body(self.response.body.len(), Cursor::new(self.response.body));
        if let Some(content_type) = self
            .response
            .content_type
            .as_deref()
            .and_then(ContentType::parse_flexible)
        {
            builder.header(content_type);
        }
        builder.ok()
    }
}

#[tracing::instrument(
    name = "Serve static asset",
    skip(parts, cache),
    fields(request_id = %Uuid::new_v4(), path = %path.display())
)]
#[get("/static/<path..>")]
pub async fn static_asset(
    path: PathBuf,
    parts: AssetRequestParts,
    cache: &State<StaticAssetCache>,
) -> Result<CachedAsset, ApiError> {
    let request = AssetRequest {
        method: parts.method,
        url: format!("{}{}", cache.policy().app_origin(), parts.path_and_query),
        origin: parts.origin,
        accepts_html: parts.accepts_html,
    };
    match cache.handle(&request).await {
        CacheOutcome::Served { response, source } => Ok(CachedAsset { response, source }),
        CacheOutcome::Blocked => Err(ApiError::Forbidden("The request was blocked.".into())),
    }
}

/// The worker's control channel, for clients that talk to the server-side cache.
#[tracing::instrument(name = "PWA message", skip(cache), fields(request_id = %Uuid::new_v4()))]
#[post("/pwa/message", data = "<message>")]
pub async fn pwa_message(
    message: Json<WorkerMessage>,
    cache: &State<StaticAssetCache>,
) -> Json<WorkerReply> {
    Json(cache.respond(message.into_inner()).await)
}
