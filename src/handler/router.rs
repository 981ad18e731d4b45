//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, dispatch to
//! the static file responder, and CORS decoration of every outgoing response.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, cors};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating what the file responder needs
pub struct RequestContext<'a> {
    /// Request path, still percent-encoded
    pub path: &'a str,
    pub is_head: bool,
    pub range_header: Option<String>,
    pub access_log: bool,
}

/// Main entry point for HTTP request handling
///
/// Every response, whatever its status, passes through the CORS injector
/// before it is returned to hyper. Generic over the request body: GET, HEAD,
/// and OPTIONS never read one.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method();
    let uri = req.uri();
    let path = uri.path();
    let is_head = *method == Method::HEAD;

    let access_log = state.config.logging.access_log;
    if access_log {
        logger::log_request(method, uri, req.version());
    }
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let mut response = match *method {
        Method::GET | Method::HEAD => {
            let ctx = RequestContext {
                path,
                is_head,
                range_header: req
                    .headers()
                    .get("range")
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string),
                access_log,
            };
            static_files::serve(&ctx, &state).await
        }
        Method::OPTIONS => http::build_options_response(),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    };

    cors::apply(response.headers_mut());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use std::path::{Path, PathBuf};

    fn temp_root(tag: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("mediaserve-router-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn test_state(root: &Path) -> Arc<AppState> {
        let mut cfg = Config::load().expect("default config");
        cfg.files.root = root.to_string_lossy().into_owned();
        cfg.logging.access_log = false;
        Arc::new(AppState::new(cfg).expect("state"))
    }

    fn request(method: Method, uri: &str, range: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(range) = range {
            builder = builder.header("Range", range);
        }
        builder.body(()).expect("request")
    }

    fn assert_cors_headers(resp: &Response<Full<Bytes>>) {
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            resp.headers()["Access-Control-Allow-Methods"],
            "GET, POST, OPTIONS, HEAD"
        );
        assert_eq!(
            resp.headers()["Access-Control-Allow-Headers"],
            "X-Requested-With, Content-Type, Range"
        );
        assert_eq!(
            resp.headers()["Access-Control-Expose-Headers"],
            "Accept-Ranges, Content-Range, Content-Length, Content-Type"
        );
    }

    async fn body_bytes(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.expect("body").to_bytes()
    }

    #[tokio::test]
    async fn test_options_preflight_is_200_empty_with_cors() {
        let root = temp_root("options");
        let state = test_state(&root);

        let resp = handle_request(request(Method::OPTIONS, "/anything", None), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_cors_headers(&resp);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_200_carries_cors() {
        let root = temp_root("ok");
        std::fs::write(root.join("a.lrc"), b"[00:01.00]hello").unwrap();
        let state = test_state(&root);

        let resp = handle_request(request(Method::GET, "/a.lrc", None), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_cors_headers(&resp);
    }

    #[tokio::test]
    async fn test_206_carries_cors() {
        let root = temp_root("partial");
        std::fs::write(root.join("a.mp3"), b"0123456789").unwrap();
        let state = test_state(&root);

        let resp = handle_request(request(Method::GET, "/a.mp3", Some("bytes=2-5")), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 206);
        assert_cors_headers(&resp);
        assert_eq!(body_bytes(resp).await.as_ref(), b"2345");
    }

    #[tokio::test]
    async fn test_404_carries_cors() {
        let root = temp_root("missing");
        let state = test_state(&root);

        let resp = handle_request(request(Method::GET, "/nope.mp3", None), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert_cors_headers(&resp);
    }

    #[tokio::test]
    async fn test_416_carries_cors() {
        let root = temp_root("unsat");
        std::fs::write(root.join("a.mp3"), b"0123456789").unwrap();
        let state = test_state(&root);

        let resp = handle_request(request(Method::GET, "/a.mp3", Some("bytes=99-")), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 416);
        assert_cors_headers(&resp);
    }

    #[tokio::test]
    async fn test_other_methods_rejected_with_cors() {
        let root = temp_root("method");
        let state = test_state(&root);

        let resp = handle_request(request(Method::POST, "/a.mp3", None), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), 405);
        assert_cors_headers(&resp);
    }
}
