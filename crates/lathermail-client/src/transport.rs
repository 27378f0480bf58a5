//! HTTP transport seam
//!
//! The client builds an [`HttpRequest`] and hands it to a [`Transport`].
//! [`ReqwestTransport`] is the real implementation; tests plug in their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::auth::AuthHeaders;
use crate::error::LathermailResult;
use crate::filter::WireParams;

/// A fully resolved request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub query: WireParams,
    pub headers: AuthHeaders,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// URL including the encoded query string
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }
}

/// Raw response as received from the server
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL of the request, query string included
    pub url: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one request and returns the response, whatever its status
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> LathermailResult<HttpResponse>;
}

/// [`Transport`] over a reusable `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> LathermailResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> LathermailResult<HttpResponse> {
        debug!("lathermail: {} {}", request.method, request.url);

        let mut builder = self.client.request(request.method, request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in request.headers.to_pairs() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::filter::{normalize, MessageFilter};
    use chrono::Utc;

    #[test]
    fn test_full_url_encodes_query() {
        let filter = MessageFilter {
            recipients_address: Some("tst@tst.tt".into()),
            ..Default::default()
        };
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("http://localhost:5000/api/0/messages/").unwrap(),
            query: normalize(filter.to_filter_map(), &Utc).unwrap(),
            headers: Credentials::new("u1", "p1").default_headers(),
            body: None,
        };
        assert_eq!(
            request.full_url().as_str(),
            "http://localhost:5000/api/0/messages/?recipients.address=tst%40tst.tt"
        );
    }

    #[test]
    fn test_full_url_without_query() {
        let request = HttpRequest {
            method: Method::DELETE,
            url: Url::parse("http://localhost:5000/api/0/messages/abc").unwrap(),
            query: WireParams::default(),
            headers: Credentials::new("u1", "p1").default_headers(),
            body: None,
        };
        assert_eq!(request.full_url().as_str(), "http://localhost:5000/api/0/messages/abc");
    }
}
