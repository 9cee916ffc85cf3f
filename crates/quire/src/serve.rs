use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use std::{io, thread};

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc::unbounded_channel;
use ws::{Message, Sender, WebSocket};

use crate::base_path::BasePath;
use crate::config::ConfigOverrides;
use crate::layout::LIVE_RELOAD_SCRIPT_PATH;
use crate::storage::{InMemoryStorage, SiteFiles, Store};
use crate::{BuildError, RenderError, Site};

/// Port of the live reload WebSocket server.
pub const LIVE_RELOAD_PORT: u16 = 35729;

const LIVE_RELOAD_JS: &str = include_str!("../assets/live-reload.js");

/// How long to wait for more file changes before rebuilding.
const DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("bundle '{}' does not exist; build the site first", .0.display())]
    MissingBundle(PathBuf),

    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("async IO error: {0}")]
    AsyncIo(#[from] tokio::io::Error),

    #[error("live reload server error: {0}")]
    LiveReload(#[from] ws::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("rebuild task failed: {0}")]
    Rebuild(#[from] tokio::task::JoinError),
}

/// Where a request is answered from.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Redirect to the given location.
    Redirect(String),
    /// Serve the first of these bundle paths that exists.
    Files(Vec<String>),
    NotFound,
}

/// Maps a request path onto the files of a bundle served under `base`.
pub fn route(base: &BasePath, request_path: &str) -> Route {
    let base = base.as_str();

    let Some(path) = request_path.strip_prefix(base) else {
        if request_path == "/" || format!("{request_path}/") == base {
            return Route::Redirect(base.to_string());
        }

        return Route::NotFound;
    };

    // An empty segment would let `Path::join` restart from the filesystem root.
    let escapes_bundle = path.starts_with('/')
        || path.contains("//")
        || path
            .split('/')
            .any(|segment| segment == "." || segment == ".." || segment.contains('\\'));
    if escapes_bundle {
        return Route::NotFound;
    }

    if path.is_empty() || path.ends_with('/') {
        return Route::Files(vec![format!("{path}index.html")]);
    }

    let file_name = path.rsplit('/').next().unwrap_or_default();
    if file_name.contains('.') {
        Route::Files(vec![path.to_string()])
    } else {
        Route::Files(vec![format!("{path}.html"), format!("{path}/index.html")])
    }
}

/// The files a server answers requests from.
enum Bundle {
    /// A site rendered into memory by the dev server.
    InMemory(Arc<RwLock<DevSite>>),
    /// A site built to disk.
    Disk { base: BasePath, output_path: PathBuf },
}

struct DevSite {
    base: BasePath,
    files: SiteFiles,
}

impl Bundle {
    fn base(&self) -> Option<BasePath> {
        match self {
            Self::InMemory(site) => site.read().ok().map(|site| site.base.clone()),
            Self::Disk { base, .. } => Some(base.clone()),
        }
    }

    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self {
            Self::InMemory(site) => {
                let site = site.read().ok()?;
                let files = site.files.read().ok()?;
                files.get(path).cloned()
            }
            Self::Disk { output_path, .. } => {
                let is_relative = Path::new(path)
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)));
                if !is_relative {
                    return None;
                }

                let file_path = output_path.join(path);
                if !tokio::fs::metadata(&file_path).await.ok()?.is_file() {
                    return None;
                }

                tokio::fs::read(file_path).await.ok()
            }
        }
    }
}

fn empty() -> BoxBody<Bytes, hyper::Error> {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn with_status(status: StatusCode) -> Response<BoxBody<Bytes, hyper::Error>> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

fn file_response(
    status: StatusCode,
    path: &str,
    contents: Vec<u8>,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    let mut response = Response::new(full(contents));
    *response.status_mut() = status;
    if let Ok(content_type) = HeaderValue::from_str(content_type.essence_str()) {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    bundle: Arc<Bundle>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return Ok(with_status(StatusCode::METHOD_NOT_ALLOWED));
    }

    let Some(base) = bundle.base() else {
        return Ok(with_status(StatusCode::INTERNAL_SERVER_ERROR));
    };

    let path = req.uri().path();
    tracing::debug!("{} {path}", req.method());

    match route(&base, path) {
        Route::Redirect(location) => {
            let mut response = with_status(StatusCode::FOUND);
            if let Ok(location) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(header::LOCATION, location);
            }
            Ok(response)
        }
        Route::Files(candidates) => {
            for candidate in candidates {
                if let Some(contents) = bundle.read(&candidate).await {
                    return Ok(file_response(StatusCode::OK, &candidate, contents));
                }
            }

            Ok(not_found(&bundle).await)
        }
        Route::NotFound => Ok(not_found(&bundle).await),
    }
}

async fn not_found(bundle: &Bundle) -> Response<BoxBody<Bytes, hyper::Error>> {
    match bundle.read("404.html").await {
        Some(contents) => file_response(StatusCode::NOT_FOUND, "404.html", contents),
        None => with_status(StatusCode::NOT_FOUND),
    }
}

async fn listen(host: &str, port: u16, bundle: Arc<Bundle>) -> Result<(), ServeError> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|source| ServeError::Bind {
            address: format!("{host}:{port}"),
            source,
        })?;

    if let Some(base) = bundle.base() {
        tracing::info!("serving at http://{}{base}", listener.local_addr()?);
    }

    loop {
        let (stream, _) = listener.accept().await?;

        let io = TokioIo::new(stream);
        let bundle = bundle.clone();

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |req| handle_request(req, bundle.clone())),
                )
                .await
            {
                tracing::warn!("error serving connection: {err:?}");
            }
        });
    }
}

/// Serves the built bundle of `site` from disk.
pub async fn serve_preview(site: &Site) -> Result<(), ServeError> {
    let output_path = site.output_path();
    if !output_path.is_dir() {
        return Err(ServeError::MissingBundle(output_path));
    }

    let bundle = Arc::new(Bundle::Disk {
        base: site.navigation().base.clone(),
        output_path,
    });

    let server = &site.config().server;
    listen(&server.host, server.port, bundle).await
}

fn render_dev_site(site: &Site) -> Result<DevSite, RenderError> {
    let files = SiteFiles::default();
    let storage = InMemoryStorage::new(files.clone());

    site.render_to(&storage, Some(LIVE_RELOAD_PORT))?;
    storage
        .store_file(LIVE_RELOAD_SCRIPT_PATH, LIVE_RELOAD_JS.as_bytes().to_vec())
        .map_err(|err| RenderError::Storage(err.to_string()))?;

    Ok(DevSite {
        base: site.navigation().base.clone(),
        files,
    })
}

/// Loads and renders the site again on the blocking thread pool, keeping
/// file walking and Sass compilation off the async workers.
async fn rebuild(
    root_path: PathBuf,
    config_path: PathBuf,
    overrides: ConfigOverrides,
) -> Result<DevSite, ServeError> {
    let dev_site = tokio::task::spawn_blocking(move || -> Result<DevSite, BuildError> {
        let site = Site::load(&root_path, &config_path, overrides)?;
        Ok(render_dev_site(&site)?)
    })
    .await??;

    Ok(dev_site)
}

/// Serves the site from memory, rebuilding it and reloading connected
/// browsers whenever its sources change.
///
/// A rebuild that fails is logged and the previous build keeps being served.
pub async fn serve_dev(
    root_path: PathBuf,
    config_path: PathBuf,
    overrides: ConfigOverrides,
) -> Result<(), ServeError> {
    let site = Site::load(&root_path, &config_path, overrides.clone())?;
    let dev_site = Arc::new(RwLock::new(render_dev_site(&site).map_err(BuildError::from)?));

    let live_reload_server = WebSocket::new(|output: Sender| {
        move |message: Message| {
            let is_hello = message
                .into_text()
                .map(|text| text.contains("\"hello\""))
                .unwrap_or(false);

            if is_hello {
                let handshake_response = json!({
                    "command": "hello",
                    "serverName": "quire"
                });

                return output.send(Message::text(handshake_response.to_string()));
            }

            Ok(())
        }
    })?;

    let live_reload_broadcaster = live_reload_server.broadcaster();
    let live_reload_address = SocketAddr::from(([127, 0, 0, 1], LIVE_RELOAD_PORT));
    let live_reload_server = live_reload_server.bind(live_reload_address)?;

    thread::spawn(move || {
        if let Err(err) = live_reload_server.run() {
            tracing::error!("live reload server stopped: {err}");
        }
    });

    let (watcher_tx, mut watcher_rx) = unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                let _ = watcher_tx.send(event);
            }
            Err(err) => tracing::warn!("watch error: {err}"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(&site.content_path(), RecursiveMode::Recursive)?;
    watcher.watch(&root_path.join(&config_path), RecursiveMode::NonRecursive)?;
    if let Some(theme_path) = site.theme_path().filter(|theme_path| theme_path.is_dir()) {
        watcher.watch(&theme_path, RecursiveMode::Recursive)?;
    }

    let bundle = Arc::new(Bundle::InMemory(dev_site.clone()));

    tokio::task::spawn(async move {
        // Keeps the watcher alive for as long as changes are processed.
        let _watcher = watcher;

        while let Some(event) = watcher_rx.recv().await {
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                continue;
            }

            tokio::time::sleep(DEBOUNCE).await;
            while watcher_rx.try_recv().is_ok() {}

            tracing::info!("change detected in {:?}, rebuilding", event.paths);

            match rebuild(root_path.clone(), config_path.clone(), overrides.clone()).await {
                Ok(rebuilt) => {
                    match dev_site.write() {
                        Ok(mut dev_site) => *dev_site = rebuilt,
                        Err(_) => {
                            tracing::error!("site lock poisoned; stopping rebuilds");
                            break;
                        }
                    }

                    let reload_message = json!({
                        "command": "reload",
                        "path": "/",
                    });

                    if let Err(err) = live_reload_broadcaster.send(reload_message.to_string()) {
                        tracing::warn!("failed to notify browsers: {err}");
                    }
                }
                Err(err) => tracing::error!("rebuild failed, serving the previous build: {err}"),
            }
        }
    });

    let server = &site.config().server;
    listen(&server.host, server.port, bundle).await
}
