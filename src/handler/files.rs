use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use bytes::BufMut;
use tracing::{debug, warn};

use crate::handler::range::{self, Span};
use crate::handler::{Context, Handler};
use crate::http::mime;
use crate::http::response::StatusCode;

pub const INDEX_FILE: &str = "index.html";

/// Serves files below `root` for targets under `prefix`.
///
/// `prefix/dir/page.html` maps to `root/dir/page.html`; a target ending in
/// `/` maps to the directory's `index.html`. Single byte ranges are honoured.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
    prefix: String,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// The file a request path refers to, or `None` if the path tries to
    /// climb out of `root`.
    pub fn resolve_path(&self, path: &str) -> Option<PathBuf> {
        let relative = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);

        let mut resolved = self.root.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            match Path::new(segment).components().next() {
                Some(Component::Normal(_)) if !segment.contains('\\') => resolved.push(segment),
                Some(Component::CurDir) => {}
                _ => return None,
            }
        }

        if relative.is_empty() || relative.ends_with('/') {
            resolved.push(INDEX_FILE);
        }
        Some(resolved)
    }
}

impl Handler for FileServer {
    fn serve(&self, ctx: &mut Context) {
        match self.resolve_path(ctx.request.path()) {
            Some(path) => serve_file(ctx, &path),
            None => {
                warn!(target = %ctx.request.target, "refusing path outside the file root");
                ctx.response_text(StatusCode::Forbidden, "Forbidden");
            }
        }
    }
}

/// Writes the file at `path` (or the requested range of it) into the
/// response.
pub fn serve_file(ctx: &mut Context, path: &Path) {
    let opened = File::open(path).and_then(|file| {
        let meta = file.metadata()?;
        Ok((file, meta))
    });

    let (mut file, size) = match opened {
        Ok((_, meta)) if meta.is_dir() => {
            ctx.response_text(StatusCode::Forbidden, "not a file");
            return;
        }
        Ok((file, meta)) => (file, meta.len()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot open file");
            let (status, text) = match e.kind() {
                io::ErrorKind::NotFound => (StatusCode::NotFound, "Not Found"),
                io::ErrorKind::PermissionDenied => (StatusCode::Forbidden, "Forbidden"),
                _ => (StatusCode::InternalServerError, "Internal Server Error"),
            };
            ctx.response_text(status, text);
            return;
        }
    };

    let range_header = ctx.request.header("Range").map(str::to_string);
    if range_header.is_some() {
        ctx.response.set_header("Accept-Ranges", "bytes");
    }

    let span = match range::resolve(range_header.as_deref(), size) {
        Ok(span) => span,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "rejecting range");
            let status = e.status();
            if status == StatusCode::RangeNotSatisfiable {
                ctx.response.set_header("Content-Range", format!("bytes */{size}"));
                ctx.response_text(status, "range not satisfiable");
            } else {
                ctx.response_text(status, "bad request");
            }
            return;
        }
    };

    let version = ctx.request.version.clone();
    let content_type = mime::from_path(path);

    if span.is_empty() {
        ctx.response.set_status_line(&version, StatusCode::Ok);
        ctx.response.set_header("Content-Type", content_type);
        return;
    }

    if let Err(e) = copy_span(&mut file, span, ctx) {
        warn!(path = %path.display(), error = %e, "failed reading file");
        ctx.response.body.clear();
        ctx.response_text(StatusCode::InternalServerError, "Internal Server Error");
        return;
    }

    if range_header.is_some() {
        ctx.response.set_status_line(&version, StatusCode::PartialContent);
        ctx.response.set_header("Content-Range", span.content_range(size));
    } else {
        ctx.response.set_status_line(&version, StatusCode::Ok);
    }
    ctx.response.set_header("Content-Type", content_type);
}

fn copy_span(file: &mut File, span: Span, ctx: &mut Context) -> io::Result<()> {
    file.seek(SeekFrom::Start(span.start))?;

    let mut reader = file.take(span.len());
    let mut writer = (&mut ctx.response.body).writer();
    let copied = io::copy(&mut reader, &mut writer)?;

    if copied != span.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file shrank: copied {copied} of {} bytes", span.len()),
        ));
    }
    Ok(())
}
