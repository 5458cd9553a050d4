use std::path::{Path, PathBuf};

use headers::{HeaderMapExt, HeaderValue};
use reqwest::Request;
use url::Url;
use uuid::Uuid;

/// Artifact name for a URL: its last path segment, as-is.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    match segment {
        "" | "." | ".." => None,
        segment => Some(segment.to_string()),
    }
}

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME_LEN: usize = 255;

/// Sibling of `destination` the body is streamed into before the final rename.
/// The name part is cut so the partial name never outgrows `MAX_FILE_NAME_LEN`.
pub fn partial_path(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = Uuid::new_v4().simple().to_string();
    let id = &id[..8];

    // "." + name + "." + id + ".part"
    let budget = MAX_FILE_NAME_LEN - (1 + 1 + id.len() + ".part".len());
    let mut end = file_name.len().min(budget);
    while !file_name.is_char_boundary(end) {
        end -= 1;
    }

    destination.with_file_name(format!(".{}.{}.part", &file_name[..end], id))
}

pub fn is_partial_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "part")
}

pub fn create_http_request(url: Url, user_agent: &str) -> Request {
    let mut request = Request::new(reqwest::Method::GET, url);
    let header_map = request.headers_mut();

    if let Ok(agent) = HeaderValue::from_str(user_agent) {
        header_map.insert(reqwest::header::USER_AGENT, agent);
    }
    header_map.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
    header_map.typed_insert(headers::Connection::keep_alive());

    request
}
