//! Static-file fallback for the dispatcher.
//!
//! When resolution yields no chain at all, the dispatcher can try the
//! request path against a directory on disk. Paths are confined to the base
//! directory (no parent traversal), content types come from the extension,
//! and `.html` files are rendered as minijinja templates when a render
//! context is supplied.

use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A file resolved by the fallback, ready to be written to the client.
#[derive(Debug)]
pub struct StaticResponse {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    /// Map a URL path onto the base directory, rejecting any component that
    /// would escape it.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Read the file for `url_path`. HTML files are rendered with `ctx` as
    /// the template context when one is given; everything else is returned
    /// byte-for-byte.
    pub fn serve(&self, url_path: &str, ctx: Option<&JsonValue>) -> io::Result<StaticResponse> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let content_type = Self::content_type(&path);
        if path.extension().and_then(|s| s.to_str()) == Some("html") {
            if let Some(ctx_val) = ctx {
                let source = fs::read_to_string(&path)?;
                let mut env = Environment::new();
                env.add_template("tpl", &source)
                    .map_err(io::Error::other)?;
                let tmpl = env.get_template("tpl").map_err(io::Error::other)?;
                let rendered = tmpl.render(ctx_val).map_err(io::Error::other)?;
                return Ok(StaticResponse {
                    bytes: rendered.into_bytes(),
                    content_type,
                });
            }
        }
        let bytes = fs::read(&path)?;
        Ok(StaticResponse {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_path_prevents_traversal() {
        let sf = StaticFiles::new("tests/staticdata");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("../../Cargo.toml").is_none());
    }

    #[test]
    fn test_serve_plain_file() {
        let sf = StaticFiles::new("tests/staticdata");
        let res = sf.serve("hello.txt", None).unwrap();
        assert_eq!(res.content_type, "text/plain");
        assert_eq!(String::from_utf8(res.bytes).unwrap(), "Hello\n");
    }

    #[test]
    fn test_render_html_with_context() {
        let sf = StaticFiles::new("tests/staticdata");
        let ctx = json!({ "name": "World" });
        let res = sf.serve("hello.html", Some(&ctx)).unwrap();
        assert_eq!(res.content_type, "text/html");
        assert_eq!(String::from_utf8(res.bytes).unwrap(), "<h1>Hello World!</h1>");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let sf = StaticFiles::new("tests/staticdata");
        let err = sf.serve("nope.txt", None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
