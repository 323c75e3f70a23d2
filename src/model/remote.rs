use std::{io::Read, time::Duration};

use log::{debug, info};

use crate::config::ModelConfig;
use crate::error::{DigitError, Result};

/// Upper bound on an artifact download.
const MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

/// Somewhere a model artifact can be fetched from by a stable identifier.
pub trait RemoteStore: Send + Sync {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Reduces a share link (`.../file/d/<id>/view`, `...?id=<id>`) to the bare
/// identifier. Anything else is taken to already be an identifier.
pub fn resolve_file_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(rest) = input.split("/d/").nth(1) {
        let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
        return (!id.is_empty()).then(|| id.to_string());
    }

    if input.contains("://") {
        return query_value(input, "id");
    }

    Some(input.to_string())
}

/// The "file too large to scan, download anyway?" page the store answers with
/// instead of the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmForm {
    pub token: String,
    pub uuid: Option<String>,
}

impl ConfirmForm {
    pub fn parse(html: &str) -> Option<Self> {
        let token = hidden_input(html, "confirm").or_else(|| query_value(html, "confirm"))?;
        let uuid = hidden_input(html, "uuid").or_else(|| query_value(html, "uuid"));
        Some(Self { token, uuid })
    }
}

/// Value of `<input ... name="{name}" ... value="...">`, within the same tag.
fn hidden_input(html: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"");
    let start = html.find(&marker)?;
    let tag_start = html[..start].rfind('<').unwrap_or(0);
    let tag_end = start + html[start..].find('>')?;
    let tag = &html[tag_start..tag_end];

    let value_start = tag.find("value=\"")? + "value=\"".len();
    let value_len = tag[value_start..].find('"')?;
    let value = &tag[value_start..value_start + value_len];
    (!value.is_empty()).then(|| value.to_string())
}

/// First `key=value` query parameter in `text`, which may be a URL or HTML
/// with `&amp;` escaped links.
fn query_value(text: &str, key: &str) -> Option<String> {
    let text = text.replace("&amp;", "&");
    for sep in ['?', '&'] {
        let marker = format!("{sep}{key}=");
        if let Some(pos) = text.find(&marker) {
            let rest = &text[pos + marker.len()..];
            let end = rest
                .find(|c: char| matches!(c, '&' | '"' | '\'' | '#' | ' ' | '>'))
                .unwrap_or(rest.len());
            let value = &rest[..end];
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

enum Fetched {
    Payload(Vec<u8>),
    Interstitial(String),
}

/// Google-Drive style object store over blocking HTTPS.
pub struct DriveStore {
    agent: ureq::Agent,
    download_url: String,
    confirm_url: String,
    max_bytes: u64,
}

impl DriveStore {
    pub fn new(config: &ModelConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .redirects(8)
            .build();

        Self {
            agent,
            download_url: config.download_url.clone(),
            confirm_url: config.confirm_url.clone(),
            max_bytes: MAX_ARTIFACT_BYTES,
        }
    }

    /// Caps how large an artifact may be; larger bodies are rejected whole.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Fetched> {
        let mut request = self.agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = request
            .call()
            .map_err(|e| DigitError::Download(format!("GET {url}: {e}")))?;

        if response.content_type().starts_with("text/html") {
            let html = response
                .into_string()
                .map_err(|e| DigitError::Download(format!("reading {url}: {e}")))?;
            return Ok(Fetched::Interstitial(html));
        }

        // One byte past the cap tells a full body from a cut-off one.
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| DigitError::Download(format!("reading {url}: {e}")))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(DigitError::Download(format!(
                "artifact exceeds {} bytes",
                self.max_bytes
            )));
        }
        Ok(Fetched::Payload(bytes))
    }
}

impl RemoteStore for DriveStore {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let id = resolve_file_id(file_id)
            .ok_or_else(|| DigitError::Download(format!("'{file_id}' is not a file id")))?;

        info!("Fetching model artifact {id}");
        let html = match self.get(&self.download_url, &[("export", "download"), ("id", &id)])? {
            Fetched::Payload(bytes) => return Ok(bytes),
            Fetched::Interstitial(html) => html,
        };

        let form = ConfirmForm::parse(&html).ok_or_else(|| {
            DigitError::Download(format!(
                "store returned a page without a download token for {id}"
            ))
        })?;
        debug!("Store asked for confirmation, retrying with token");

        let mut query = vec![
            ("id", id.as_str()),
            ("export", "download"),
            ("confirm", form.token.as_str()),
        ];
        if let Some(uuid) = form.uuid.as_deref() {
            query.push(("uuid", uuid));
        }

        match self.get(&self.confirm_url, &query)? {
            Fetched::Payload(bytes) => Ok(bytes),
            Fetched::Interstitial(_) => Err(DigitError::Download(format!(
                "store kept asking for confirmation for {id}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    #[test]
    fn resolves_share_links() {
        assert_eq!(
            resolve_file_id("https://drive.google.com/file/d/17l9Lq/view?usp=sharing").as_deref(),
            Some("17l9Lq")
        );
        assert_eq!(
            resolve_file_id("https://drive.google.com/open?id=abc_123&foo=bar").as_deref(),
            Some("abc_123")
        );
        assert_eq!(resolve_file_id("  abc_123 ").as_deref(), Some("abc_123"));
        assert_eq!(resolve_file_id(""), None);
    }

    #[test]
    fn parses_form_style_confirmation() {
        let html = r#"<form id="download-form" action="/download" method="get">
            <input type="submit" id="uc-download-link" value="Download anyway"/>
            <input type="hidden" name="id" value="abc">
            <input type="hidden" name="export" value="download">
            <input type="hidden" name="confirm" value="t">
            <input type="hidden" name="uuid" value="0f3c-77">
        </form>"#;
        let form = ConfirmForm::parse(html).unwrap();
        assert_eq!(form.token, "t");
        assert_eq!(form.uuid.as_deref(), Some("0f3c-77"));
    }

    #[test]
    fn parses_link_style_confirmation() {
        let html = concat!(
            r#"<a id="uc-download-link" "#,
            r#"href="/uc?export=download&amp;confirm=Xy9Z&amp;id=abc">Download anyway</a>"#,
        );
        let form = ConfirmForm::parse(html).unwrap();
        assert_eq!(form.token, "Xy9Z");
        assert_eq!(form.uuid, None);
    }

    #[test]
    fn page_without_token_is_not_a_form() {
        assert_eq!(ConfirmForm::parse("<html><body>Quota exceeded</body></html>"), None);
    }

    const CONFIRM_PAGE: &str = r#"<form id="download-form" action="/download" method="get">
        <input type="hidden" name="confirm" value="t">
        <input type="hidden" name="uuid" value="u1">
    </form>"#;

    /// Answers one connection per scripted response, in order, and hands back
    /// the request targets it saw.
    fn serve(responses: Vec<(&'static str, Vec<u8>)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut targets = Vec::new();
            for (content_type, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                targets.push(
                    request_line
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_string(),
                );
                let mut header = String::new();
                while reader.read_line(&mut header).unwrap() > 2 {
                    header.clear();
                }

                let mut stream = stream;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
            targets
        });

        (base, handle)
    }

    fn store_at(base: &str) -> DriveStore {
        DriveStore::new(&ModelConfig {
            download_url: format!("{base}/uc"),
            confirm_url: format!("{base}/download"),
            ..ModelConfig::default()
        })
    }

    #[test]
    fn direct_payload_needs_one_request() {
        let (base, server) = serve(vec![("application/json", b"PAYLOAD".to_vec())]);

        let bytes = store_at(&base).fetch("abc").unwrap();
        assert_eq!(bytes, b"PAYLOAD");
        assert_eq!(server.join().unwrap(), vec!["/uc?export=download&id=abc"]);
    }

    #[test]
    fn confirmation_page_is_followed_once() {
        let (base, server) = serve(vec![
            ("text/html; charset=utf-8", CONFIRM_PAGE.as_bytes().to_vec()),
            ("application/octet-stream", b"PAYLOAD".to_vec()),
        ]);

        let bytes = store_at(&base).fetch("abc").unwrap();
        assert_eq!(bytes, b"PAYLOAD");
        assert_eq!(
            server.join().unwrap(),
            vec![
                "/uc?export=download&id=abc",
                "/download?id=abc&export=download&confirm=t&uuid=u1",
            ]
        );
    }

    #[test]
    fn second_confirmation_page_is_an_error() {
        let (base, server) = serve(vec![
            ("text/html", CONFIRM_PAGE.as_bytes().to_vec()),
            ("text/html", CONFIRM_PAGE.as_bytes().to_vec()),
        ]);

        let err = store_at(&base).fetch("abc").unwrap_err();
        assert!(matches!(err, DigitError::Download(_)));
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn page_without_token_stops_after_one_request() {
        let (base, server) = serve(vec![("text/html", b"<p>Quota exceeded</p>".to_vec())]);

        let err = store_at(&base).fetch("abc").unwrap_err();
        assert!(matches!(err, DigitError::Download(_)));
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn oversized_body_is_rejected_not_truncated() {
        let (base, server) = serve(vec![("application/octet-stream", vec![b'x'; 11])]);

        let err = store_at(&base).with_max_bytes(10).fetch("abc").unwrap_err();
        assert!(err.to_string().contains("exceeds 10 bytes"));
        server.join().unwrap();

        let (base, server) = serve(vec![("application/octet-stream", vec![b'x'; 10])]);
        let bytes = store_at(&base).with_max_bytes(10).fetch("abc").unwrap();
        assert_eq!(bytes.len(), 10);
        server.join().unwrap();
    }
}
