//! Spreadsheet download
//!
//! Rewrites sharing links of known spreadsheet hosts into their CSV export
//! form, downloads the payload and rejects pages that are clearly HTML.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::SourceError;
use crate::http::{HttpRequest, Transport, TransportError, UreqTransport};
use crate::zoho::AUTH_SCHEME;

/// Upper bound for one spreadsheet download
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-like user agent; some hosts refuse exports to unknown clients
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Downloads spreadsheet exports as CSV text
pub struct SheetFetcher {
    transport: Arc<dyn Transport>,
    bearer: Option<String>,
}

impl Default for SheetFetcher {
    fn default() -> Self {
        Self::new(Arc::new(UreqTransport::new(Some(FETCH_TIMEOUT))))
    }
}

impl SheetFetcher {
    /// Create a fetcher on top of `transport`; the timeout is the transport's
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            bearer: None,
        }
    }

    /// Send this CRM token along, for sheets that are shared privately
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.filter(|t| !t.is_empty()).map(str::to_string);
        self
    }

    /// Download `url` and return the CSV text without a byte-order mark
    pub fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let export_url = normalize_sheet_url(url)?;
        info!("Fetching spreadsheet from {}", export_url.host_str().unwrap_or_default());
        debug!("Export URL: {}", export_url);

        let mut request = HttpRequest::get(export_url.as_str()).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.bearer {
            request = request.header("Authorization", format!("{} {}", AUTH_SCHEME, token));
        }

        let response = self.transport.send(&request).map_err(|e| match e {
            TransportError::Timeout(msg) => SourceError::Timeout(msg),
            TransportError::Network(msg) => SourceError::Fetch(msg),
        })?;

        if !response.is_success() {
            return Err(SourceError::Fetch(format!(
                "spreadsheet host answered HTTP {}",
                response.status
            )));
        }

        let body = response
            .body
            .strip_prefix('\u{feff}')
            .unwrap_or(&response.body);

        if looks_like_markup(response.content_type.as_deref(), body) {
            return Err(SourceError::Format(
                "received HTML instead of CSV; make sure the sheet is published or shared as CSV"
                    .to_string(),
            ));
        }

        info!("Fetched {} bytes of CSV", body.len());
        Ok(body.to_string())
    }
}

/// Rewrite a sharing link into a direct CSV export link
///
/// - Google Sheets `/edit` links become `/export?format=csv` (keeping `gid`)
/// - Zoho Sheet links get `output=csv` unless a CSV format is already set
/// - Anything else is returned unchanged
pub fn normalize_sheet_url(raw: &str) -> Result<Url, SourceError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| SourceError::Fetch(format!("invalid spreadsheet URL: {}", e)))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if host == "docs.google.com" && url.path().starts_with("/spreadsheets/") {
        if url.path().contains("/edit") {
            let sheet_id = url
                .path_segments()
                .and_then(|mut segments| {
                    segments.by_ref().find(|s| *s == "d")?;
                    segments.next()
                })
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SourceError::Fetch("Google Sheets link has no sheet id".into()))?;
            let gid = google_gid(&url);

            let mut export = Url::parse(&format!(
                "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
                sheet_id
            ))
            .map_err(|e| SourceError::Fetch(e.to_string()))?;
            if let Some(gid) = gid {
                export.query_pairs_mut().append_pair("gid", &gid);
            }
            return Ok(export);
        }
        return Ok(url);
    }

    if host.contains("zoho") {
        let already_csv = url
            .query_pairs()
            .any(|(k, v)| (k == "output" || k == "format") && v == "csv");
        if !already_csv {
            url.query_pairs_mut().append_pair("output", "csv");
        }
    }

    Ok(url)
}

/// Sheet tab id from the query (`?gid=`) or fragment (`#gid=`)
fn google_gid(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "gid")
        .map(|(_, v)| v.into_owned())
        .or_else(|| {
            url.fragment()
                .and_then(|f| f.split('&').find_map(|p| p.strip_prefix("gid=")))
                .map(str::to_string)
        })
        .filter(|gid| !gid.is_empty())
}

/// Whether a payload is an HTML page rather than CSV
pub fn looks_like_markup(content_type: Option<&str>, body: &str) -> bool {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("text/csv") {
        return false;
    }
    content_type.contains("html") || body.trim_start().starts_with('<')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, ScriptedTransport};

    #[test]
    fn test_google_edit_link_becomes_export() {
        let base = "https://docs.google.com/spreadsheets/d/abc123";

        let url = normalize_sheet_url(&format!("{}/edit#gid=0", base)).unwrap();
        assert_eq!(url.as_str(), format!("{}/export?format=csv&gid=0", base));

        let url = normalize_sheet_url(&format!("{}/edit?usp=sharing", base)).unwrap();
        assert_eq!(url.as_str(), format!("{}/export?format=csv", base));
    }

    #[test]
    fn test_google_export_link_is_unchanged() {
        let raw = "https://docs.google.com/spreadsheets/d/abc123/export?format=csv";
        assert_eq!(normalize_sheet_url(raw).unwrap().as_str(), raw);
    }

    #[test]
    fn test_zoho_link_gets_output_param() {
        let url = normalize_sheet_url("https://sheet.zoho.com/sheet/published/xyz").unwrap();
        assert_eq!(url.as_str(), "https://sheet.zoho.com/sheet/published/xyz?output=csv");

        let url = normalize_sheet_url("https://sheet.zoho.com/sheet/published/xyz?a=1").unwrap();
        assert_eq!(url.as_str(), "https://sheet.zoho.com/sheet/published/xyz?a=1&output=csv");

        let raw = "https://sheet.zoho.com/sheet/published/xyz?output=csv";
        assert_eq!(normalize_sheet_url(raw).unwrap().as_str(), raw);
    }

    #[test]
    fn test_other_hosts_are_unchanged() {
        let raw = "https://example.com/vendors.csv";
        assert_eq!(normalize_sheet_url(raw).unwrap().as_str(), raw);
        assert!(matches!(normalize_sheet_url("not a url"), Err(SourceError::Fetch(_))));
    }

    #[test]
    fn test_markup_detection() {
        assert!(looks_like_markup(Some("text/html; charset=utf-8"), "a,b"));
        assert!(looks_like_markup(None, "  <!DOCTYPE html><html>"));
        assert!(!looks_like_markup(Some("text/csv"), "<weird>,header"));
        assert!(!looks_like_markup(Some("text/plain"), "Contact email,Name"));
    }

    #[test]
    fn test_fetch_strips_bom_and_sends_headers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(HttpResponse::new(
            200,
            Some("text/csv"),
            "\u{feff}Contact email,Name\na@b.com,Ada\n",
        ));

        let fetcher = SheetFetcher::new(transport.clone()).with_bearer(Some("tok"));
        let body = fetcher.fetch("https://example.com/vendors.csv").unwrap();
        assert_eq!(body, "Contact email,Name\na@b.com,Ada\n");

        let request = &transport.requests()[0];
        assert_eq!(request.header_value("user-agent"), Some(USER_AGENT));
        assert_eq!(request.header_value("authorization"), Some("Zoho-oauthtoken tok"));
    }

    #[test]
    fn test_fetch_without_token_sends_no_authorization() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(HttpResponse::new(200, Some("text/csv"), "Contact email,Name\n"));

        SheetFetcher::new(transport.clone())
            .with_bearer(None)
            .fetch("https://example.com/vendors.csv")
            .unwrap();
        assert!(transport.requests()[0].header_value("authorization").is_none());
    }

    #[test]
    fn test_fetch_errors() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_error(TransportError::Timeout("global".into()));
        transport.push_error(TransportError::Network("dns".into()));
        transport.push_response(HttpResponse::text(404, "missing"));
        transport.push_response(HttpResponse::new(200, Some("text/html"), "<html></html>"));

        let fetcher = SheetFetcher::new(transport);
        let url = "https://example.com/vendors.csv";
        assert!(matches!(fetcher.fetch(url), Err(SourceError::Timeout(_))));
        assert!(matches!(fetcher.fetch(url), Err(SourceError::Fetch(_))));
        assert!(matches!(fetcher.fetch(url), Err(SourceError::Fetch(_))));
        assert!(matches!(fetcher.fetch(url), Err(SourceError::Format(_))));
    }
}
