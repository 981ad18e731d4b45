//! Static file serving module
//!
//! Resolves request paths under the document root, consults the range
//! parser, and builds the 200/206/404/416/500 responses. Path resolution is
//! an explicit, audited step: every request path is URL-decoded, checked for
//! traversal segments, canonicalized, and verified to still live inside the
//! canonical document root.

use crate::config::AppState;
use crate::http::{self, mime, range::RangeParseResult, response};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use super::router::RequestContext;

/// Serve a GET/HEAD request from the document root
pub async fn serve(ctx: &RequestContext<'_>, state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let Some(path) = resolve_path(&state.document_root, ctx.path) else {
        return http::build_404_response();
    };

    let response = if path.is_dir() {
        serve_directory(ctx, state, &path).await
    } else {
        serve_file(ctx, &path).await
    };

    if ctx.access_log {
        let size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        logger::log_response(response.status().as_u16(), size);
    }
    response
}

/// Resolve a raw request path to a filesystem path inside the document root
///
/// Returns None when the path decodes badly, contains traversal segments,
/// does not exist, or canonicalizes to somewhere outside the root. All of
/// those cases surface to the client as 404.
pub fn resolve_path(root: &Path, raw_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw_path).ok()?;
    let relative = decoded.trim_start_matches('/');

    // Reject traversal before touching the filesystem
    let candidate = Path::new(relative);
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }

    // Canonicalize to collapse symlinks, then re-check containment
    let canonical = root.join(candidate).canonicalize().ok()?;
    if canonical.starts_with(root) {
        Some(canonical)
    } else {
        logger::log_warning(&format!(
            "Path escapes document root, rejected: {} -> {}",
            raw_path,
            canonical.display()
        ));
        None
    }
}

/// Serve a directory: probe index files, else render a minimal listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &Arc<AppState>,
    dir: &Path,
) -> Response<Full<Bytes>> {
    for index in &state.config.files.index_files {
        let candidate = dir.join(index);
        if candidate.is_file() {
            return serve_file(ctx, &candidate).await;
        }
    }

    match render_listing(dir, ctx.path).await {
        Ok(html) => response::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to list directory: {e}"));
            http::build_500_response("directory listing failed")
        }
    }
}

/// Serve a single file, honoring any Range header in the context
async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> Response<Full<Bytes>> {
    // Open failure is the 404 path; anything that fails afterwards is a 500
    let file = match fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return http::build_404_response(),
    };

    match read_file_response(ctx, path, file).await {
        Ok(resp) => resp,
        Err(e) => {
            logger::log_error(&format!("I/O error serving {}: {}", path.display(), e));
            http::build_500_response(&e.to_string())
        }
    }
}

/// Status/header/body computation shared by GET and HEAD
///
/// HEAD goes through the identical decision tree but never reads file bytes.
async fn read_file_response(
    ctx: &RequestContext<'_>,
    path: &Path,
    mut file: fs::File,
) -> std::io::Result<Response<Full<Bytes>>> {
    let metadata = file.metadata().await?;
    let file_size = metadata.len();
    let last_modified = response::http_date(metadata.modified()?);
    let content_type = mime::get_content_type(path.extension().and_then(|e| e.to_str()));

    match http::parse_range_header(ctx.range_header.as_deref(), file_size) {
        RangeParseResult::NotSatisfiable => Ok(http::build_416_response(file_size)),
        RangeParseResult::Valid(range) => {
            let start = range.start;
            let end = range.end_position(file_size);
            let span_len = range.content_length(file_size);

            let body = if ctx.is_head {
                Bytes::new()
            } else {
                file.seek(SeekFrom::Start(start)).await?;
                let mut buf = Vec::with_capacity(usize::try_from(span_len).unwrap_or(0));
                file.take(span_len).read_to_end(&mut buf).await?;
                Bytes::from(buf)
            };

            Ok(response::build_partial_response(
                body,
                content_type,
                start,
                end,
                file_size,
                &last_modified,
                ctx.is_head,
            ))
        }
        RangeParseResult::None => {
            let body = if ctx.is_head {
                Bytes::new()
            } else {
                let mut buf = Vec::with_capacity(usize::try_from(file_size).unwrap_or(0));
                file.read_to_end(&mut buf).await?;
                Bytes::from(buf)
            };

            Ok(response::build_full_response(
                body,
                content_type,
                file_size,
                &last_modified,
                ctx.is_head,
            ))
        }
    }
}

/// Render a minimal directory listing page
async fn render_listing(dir: &Path, request_path: &str) -> std::io::Result<String> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let mut html = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>Directory listing for {request_path}</title></head>\
         <body><h1>Directory listing for {request_path}</h1><hr><ul>"
    );
    for name in &names {
        let (stem, slash) = name
            .strip_suffix('/')
            .map_or((name.as_str(), ""), |s| (s, "/"));
        html.push_str(&format!(
            "<li><a href=\"{}{}\">{}</a></li>",
            urlencoding::encode(stem),
            slash,
            name
        ));
    }
    html.push_str("</ul><hr></body></html>");
    Ok(html)
}
