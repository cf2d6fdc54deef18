use common::Status;
use reqwest::Url;

const MAX_URL_LENGTH: usize = 1024;

/// Parse a pic source URL: http(s) only, no credentials, fragment dropped.
pub fn validate_url(raw: &str) -> Result<Url, Status> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(Status::invalid_argument("Can't use long URL"));
    }
    let mut url = Url::parse(raw)
        .map_err(|e| Status::invalid_argument(format!("Can't parse {raw}")).with_cause(e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Status::invalid_argument("Can't use non HTTP"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(Status::invalid_argument("Can't provide userinfo"));
    }
    url.set_fragment(None);
    Ok(url)
}

/// Last path segment, used as the file name of a downloaded pic.
pub fn file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
