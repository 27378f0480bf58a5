//! API client for the lathermail SMTP test server
//!
//! Lists inboxes, searches, fetches and deletes captured messages, and
//! downloads attachments over lathermail's HTTP API.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod timezone;
pub mod transport;
pub mod types;

pub use auth::{AuthHeaders, Credentials, INBOX_HEADER, PASSWORD_HEADER};
pub use client::{ClientBuilder, LathermailClient, RequestOptions, DEFAULT_API_VERSION, DEFAULT_URL};
pub use config::ClientConfig;
pub use error::{LathermailError, LathermailResult};
pub use filter::{normalize, wire_name, FilterMap, FilterTime, FilterValue, MessageFilter, WireParams};
pub use reqwest::Method;
pub use timezone::{TimezoneResolver, Zone};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::*;
