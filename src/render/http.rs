//! Plain-HTTP renderer implementation
//!
//! This is the bundled `Renderer`: a reqwest client with a structured
//! user-agent string, compression, and per-call timeouts. Error
//! classification maps HTTP and transport failures onto the renderer
//! error taxonomy.

use crate::config::UserAgentConfig;
use crate::render::{RenderError, Renderer};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Example
///
/// ```no_run
/// use skillsift::config::UserAgentConfig;
/// use skillsift::render::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Skillsift".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer that fetches pages over plain HTTP
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Creates a renderer from user-agent configuration
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Creates a renderer around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, RenderError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return Err(RenderError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(RenderError::Network {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, &e))
    }
}

/// Maps a reqwest transport failure onto the renderer taxonomy
fn classify_transport_error(url: &str, error: &reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        RenderError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        RenderError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestSift".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_render_classifies_blocked_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(&create_test_config()).unwrap();
        let result = renderer
            .render(&format!("{}/limited", server.uri()), Duration::from_secs(5))
            .await;

        match result {
            Err(RenderError::Blocked { status, .. }) => assert_eq!(status, 429),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_returns_body_on_success() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(&create_test_config()).unwrap();
        let body = renderer
            .render(&format!("{}/page", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(body, "<html>ok</html>");
    }
}
