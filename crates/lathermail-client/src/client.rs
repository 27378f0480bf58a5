use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthHeaders, Credentials};
use crate::error::{LathermailError, LathermailResult};
use crate::filter::{normalize, FilterMap, MessageFilter, WireParams};
use crate::timezone::{TimezoneResolver, Zone};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::*;

/// Server URL used when none is configured
pub const DEFAULT_URL: &str = "http://localhost:5000/";

/// API version used when none is configured
pub const DEFAULT_API_VERSION: u32 = 0;

/// Longest rendering of a response body that goes into debug logs
const LOG_BODY_LIMIT: usize = 500;

/// Per-call knobs for [`LathermailClient::request_api`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Query parameters
    pub params: WireParams,
    /// Raw request body
    pub body: Option<Vec<u8>>,
    /// Replaces the client's auth headers for this call only
    pub headers: Option<AuthHeaders>,
    /// Parse the body as JSON; when false the raw bytes are returned
    pub parse_json: bool,
    /// Fail with [`LathermailError::InvalidStatus`] on status >= 400
    pub raise_error: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: WireParams::default(),
            body: None,
            headers: None,
            parse_json: true,
            raise_error: true,
        }
    }
}

/// Builder for [`LathermailClient`]
pub struct ClientBuilder {
    credentials: Credentials,
    url: String,
    api_version: u32,
    timezone: Arc<dyn TimezoneResolver>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Server base URL, e.g. `http://localhost:5000/`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Zone used for naive `created_at` bounds (system local by default)
    pub fn timezone(mut self, timezone: impl TimezoneResolver + 'static) -> Self {
        let timezone: Arc<dyn TimezoneResolver> = Arc::new(timezone);
        self.timezone = timezone;
        self
    }

    /// Replace the default reqwest transport
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> LathermailResult<LathermailClient> {
        let url = Url::parse(&self.url)?;
        let api_url = api_root(&url, self.api_version)?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()),
        };

        info!(
            "lathermail: client for inbox '{}' at {}",
            self.credentials.user(),
            api_url
        );

        Ok(LathermailClient {
            url,
            api_url,
            credentials: self.credentials,
            timezone: self.timezone,
            transport,
        })
    }
}

/// Client for the lathermail HTTP API
///
/// Every request is scoped to the inbox given at construction, except
/// [`get_inboxes`](Self::get_inboxes) which lists all inboxes sharing a
/// password.
pub struct LathermailClient {
    url: Url,
    api_url: Url,
    credentials: Credentials,
    timezone: Arc<dyn TimezoneResolver>,
    transport: Arc<dyn Transport>,
}

impl LathermailClient {
    /// Client for the default local server
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> LathermailResult<Self> {
        Self::builder(user, password).build()
    }

    pub fn builder(user: impl Into<String>, password: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            credentials: Credentials::new(user, password),
            url: DEFAULT_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            timezone: Arc::new(Zone::Local),
            transport: None,
        }
    }

    /// Server base URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `{url}/api/{version}/`
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Names of all inboxes using `password` (or the stored password)
    pub async fn get_inboxes(&self, password: Option<&str>) -> LathermailResult<Vec<String>> {
        let options = RequestOptions {
            headers: Some(self.credentials.headers(None, password)),
            ..Default::default()
        };
        let response: InboxListResponse = self.fetch(Method::GET, "inboxes", options).await?;
        Ok(response.inbox_list)
    }

    pub async fn get_single_message(&self, message_id: &str) -> LathermailResult<Message> {
        let resource = format!("messages/{}", message_id);
        let response: MessageInfoResponse = self
            .fetch(Method::GET, &resource, RequestOptions::default())
            .await?;
        Ok(response.message_info)
    }

    /// Messages in the inbox matching `filter`
    pub async fn get_messages(&self, filter: &MessageFilter) -> LathermailResult<Vec<Message>> {
        let params = normalize(filter.to_filter_map(), self.timezone.as_ref())?;
        let filter_count = params.len();
        let options = RequestOptions {
            params: params.clone(),
            ..Default::default()
        };

        let response: MessageListResponse = self.fetch(Method::GET, "messages/", options).await?;
        let messages = response.message_list;
        debug!(
            "Searching emails: {:?} ({} filters), found {} messages",
            params,
            filter_count,
            messages.len()
        );
        Ok(messages)
    }

    /// Raw content of the attachment at `index` of a message
    pub async fn get_attachment(&self, message_id: &str, index: usize) -> LathermailResult<Vec<u8>> {
        let resource = format!("messages/{}/attachments/{}", message_id, index);
        let options = RequestOptions {
            parse_json: false,
            ..Default::default()
        };
        let response = self.request_api(Method::GET, &resource, options).await?;
        Ok(response.into_bytes().unwrap_or_default())
    }

    pub async fn delete_single_message(&self, message_id: &str) -> LathermailResult<()> {
        let resource = format!("messages/{}", message_id);
        self.request_api(Method::DELETE, &resource, RequestOptions::default())
            .await?;
        Ok(())
    }

    /// Delete every message in the inbox matching `filter`
    ///
    /// An empty filter deletes the whole inbox.
    pub async fn delete_messages(&self, filter: &MessageFilter) -> LathermailResult<()> {
        self.delete_messages_matching(filter.to_filter_map()).await
    }

    /// Like [`delete_messages`](Self::delete_messages) with a loosely typed filter
    pub async fn delete_messages_matching(&self, filters: FilterMap) -> LathermailResult<()> {
        let params = normalize(filters, self.timezone.as_ref())?;
        debug!("Deleting emails: {:?}", params);
        let options = RequestOptions {
            params,
            ..Default::default()
        };
        self.request_api(Method::DELETE, "messages/", options).await?;
        Ok(())
    }

    /// Dispatch a request and interpret the response
    ///
    /// `resource` is relative to the API root unless it is an absolute
    /// `http(s)` URL.
    pub async fn request_api(
        &self,
        method: Method,
        resource: &str,
        options: RequestOptions,
    ) -> LathermailResult<ApiResponse> {
        let parse_json = options.parse_json;
        let response = self.send(method, resource, options).await?;
        interpret(response, parse_json)
    }

    /// Dispatch a JSON request and deserialize the body into `T`
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        resource: &str,
        options: RequestOptions,
    ) -> LathermailResult<T> {
        let response = self.send(method, resource, options).await?;
        let url = response.url.clone();
        let status = response.status;

        let value = interpret(response, true)?.into_json().unwrap_or(Value::Null);
        T::deserialize(&value).map_err(|e| {
            warn!("lathermail: unexpected response from {}: {}", url, e);
            LathermailError::InvalidResponse {
                url,
                status,
                body: value.to_string(),
            }
        })
    }

    async fn send(
        &self,
        method: Method,
        resource: &str,
        options: RequestOptions,
    ) -> LathermailResult<HttpResponse> {
        let request = HttpRequest {
            method,
            url: self.resolve(resource)?,
            query: options.params,
            headers: options
                .headers
                .unwrap_or_else(|| self.credentials.default_headers()),
            body: options.body,
        };

        let response = self.transport.send(request).await?;
        if options.raise_error && response.status >= 400 {
            return Err(LathermailError::InvalidStatus {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    fn resolve(&self, resource: &str) -> LathermailResult<Url> {
        if resource.starts_with("http") {
            Ok(Url::parse(resource)?)
        } else {
            Ok(self.api_url.join(resource)?)
        }
    }
}

/// `{base}/api/{version}/`, keeping any path prefix of `base`
fn api_root(base: &Url, version: u32) -> LathermailResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("api/{}/", version))?)
}

fn interpret(response: HttpResponse, parse_json: bool) -> LathermailResult<ApiResponse> {
    if !parse_json {
        return Ok(ApiResponse::Raw(response.body));
    }
    if response.status == 204 {
        return Ok(ApiResponse::NoContent);
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(data) => {
            let rendered: String = data.to_string().chars().take(LOG_BODY_LIMIT).collect();
            debug!(
                "lathermail: url: {}, status: {}, response: {}",
                response.url, response.status, rendered
            );
            Ok(ApiResponse::Json(data))
        }
        Err(_) => {
            let err = LathermailError::InvalidResponse {
                body: response.text(),
                url: response.url,
                status: response.status,
            };
            warn!("{}", err);
            Err(err)
        }
    }
}
