//! HTTP(S) client transport for ESP32.
//!
//! Opens a fresh `EspHttpConnection` per request, matching the
//! `Connection: close` requests the sinks send. TLS uses the ESP-IDF
//! certificate bundle.
//!
//! # Example
//!
//! ```ignore
//! use ecoscale::hal::esp32::Esp32Http;
//! use ecoscale::sinks::FormPostSink;
//!
//! let sink = FormPostSink::new(Esp32Http::new(config.http.timeout_ms), &config.http);
//! ```

use std::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::{Method, Status};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use log::debug;

use crate::traits::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Response bodies are truncated past this size.
const MAX_BODY: usize = 2048;

/// Error type for ESP32 HTTP operations.
#[derive(Debug)]
pub struct Esp32HttpError(pub String);

impl core::fmt::Display for Esp32HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HTTP error: {}", self.0)
    }
}

fn err<E: core::fmt::Debug>(e: E) -> Esp32HttpError {
    Esp32HttpError(format!("{:?}", e))
}

/// Blocking HTTP client bounded by a per-request timeout.
pub struct Esp32Http {
    timeout: Duration,
}

impl Esp32Http {
    /// Creates a transport whose requests give up after `timeout_ms`.
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout: Duration::from_millis(u64::from(timeout_ms)),
        }
    }
}

impl HttpTransport for Esp32Http {
    type Error = Esp32HttpError;

    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, Self::Error> {
        let conf = HttpConfiguration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut client = HttpClient::wrap(EspHttpConnection::new(&conf).map_err(err)?);

        let content_length = request.body.len().to_string();
        let mut headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        headers.push(("Content-Length", content_length.as_str()));

        let method = match request.method {
            HttpMethod::Get => Method::Get,
            HttpMethod::Post => Method::Post,
        };
        let mut req = client
            .request(method, &request.url, &headers)
            .map_err(err)?;
        req.write_all(&request.body).map_err(err)?;
        req.flush().map_err(err)?;

        let mut resp = req.submit().map_err(err)?;
        let status = resp.status();

        let mut body = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = resp.read(&mut chunk).map_err(err)?;
            if n == 0 || body.len() >= MAX_BODY {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(MAX_BODY);
        debug!("http: {} {} -> {}", method_name(request.method), request.url, status);

        Ok(HttpResponse::new(status, body))
    }
}

fn method_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    }
}
