use std::{net::IpAddr, sync::OnceLock, time::Instant};

use dom_smoothie::{Readability, TextMode};
use regex::Regex;
use tracing::{info, warn};

use common::{error::AppError, utils::text_cleanup::collapse_whitespace};

/// Text pulled from a web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

/// Downloads `url` and returns its readable text.
pub async fn fetch_url_text(client: &reqwest::Client, url: &str) -> Result<FetchedPage, AppError> {
    let parsed_url =
        url::Url::parse(url.trim()).map_err(|_| AppError::Validation("Invalid URL".to_string()))?;
    ensure_url_allowed(&parsed_url)?;

    info!("Fetching URL: {}", parsed_url);
    let now = Instant::now();

    let response = client
        .get(parsed_url.clone())
        .header(reqwest::header::ACCEPT, "text/html,text/plain;q=0.9,*/*;q=0.5")
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("Page not found: {parsed_url}")));
    }
    if !status.is_success() {
        return Err(AppError::Upstream(format!(
            "Fetching {parsed_url} returned {status}"
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_ascii_lowercase();
    let body = response.text().await?;

    let (title, text) = if content_type.starts_with("text/plain") {
        (None, collapse_whitespace(&body))
    } else if content_type.contains("html") {
        html_to_text(&body)?
    } else {
        return Err(AppError::Validation(format!(
            "Unsupported content type at URL: {content_type}"
        )));
    };

    if text.is_empty() {
        return Err(AppError::Validation(
            "No readable text found at URL".to_string(),
        ));
    }

    info!(
        url = %parsed_url,
        elapsed = ?now.elapsed(),
        chars = text.len(),
        "URL text retrieved"
    );

    Ok(FetchedPage {
        url: parsed_url.to_string(),
        title,
        text,
    })
}

/// Readable text of an HTML document. Falls back to tag stripping when the page
/// does not look like an article.
pub fn html_to_text(html: &str) -> Result<(Option<String>, String), AppError> {
    let config = dom_smoothie::Config {
        text_mode: TextMode::Markdown,
        ..Default::default()
    };

    let article = Readability::new(html.to_string(), None, Some(config))
        .and_then(|mut readability| readability.parse());

    match article {
        Ok(article) => {
            let text = collapse_whitespace(&article.text_content.to_string());
            let title = Some(article.title.to_string()).filter(|t| !t.trim().is_empty());
            if text.is_empty() {
                Ok((title, strip_tags(html)))
            } else {
                Ok((title, text))
            }
        }
        Err(err) => {
            warn!(error = %err, "Readability failed, falling back to tag stripping");
            Ok((None, strip_tags(html)))
        }
    }
}

fn strip_tags(html: &str) -> String {
    static SCRIPT_STYLE: OnceLock<Regex> = OnceLock::new();
    static BLOCK_END: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();

    #[allow(clippy::expect_used)]
    let script_style = SCRIPT_STYLE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript|head)\b[^>]*>.*?</(script|style|noscript|head)>")
            .expect("static regex pattern")
    });
    #[allow(clippy::expect_used)]
    let block_end = BLOCK_END.get_or_init(|| {
        Regex::new(r"(?i)<\s*(br\s*/?|/p|/div|/li|/h[1-6]|/tr)\s*>").expect("static regex pattern")
    });
    #[allow(clippy::expect_used)]
    let tag = TAG.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("static regex pattern"));

    let text = script_style.replace_all(html, " ");
    let text = block_end.replace_all(&text, "\n");
    let text = tag.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    collapse_whitespace(&text)
}

fn ensure_url_allowed(url: &url::Url) -> Result<(), AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            warn!(%url, %scheme, "Rejected URL due to unsupported scheme");
            return Err(AppError::Validation(
                "Unsupported URL scheme".to_string(),
            ));
        }
    }

    let Some(host) = url.host_str() else {
        warn!(%url, "Rejected URL missing host");
        return Err(AppError::Validation(
            "URL is missing a host component".to_string(),
        ));
    };

    if host.eq_ignore_ascii_case("localhost") {
        warn!(%url, host, "Rejected URL to localhost");
        return Err(AppError::Validation("URL host is not allowed".to_string()));
    }

    let bare_host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare_host.parse::<IpAddr>() {
        let is_disallowed = match ip {
            IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_unique_local() || v6.is_unicast_link_local(),
        };

        if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || is_disallowed {
            warn!(%url, host, %ip, "Rejected URL pointing to restricted network range");
            return Err(AppError::Validation("URL host is not allowed".to_string()));
        }
    }

    Ok(())
}
