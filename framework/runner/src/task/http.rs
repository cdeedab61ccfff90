use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use runmeter_core::prelude::RunResult;
use url::Url;

use super::curl_script::parse_curl;
use super::{PrepareError, Task};

/// Sends the request described by a curl script. Success means a 2xx status.
///
/// All invocations share one client so connections are reused between runs.
#[derive(Debug, Clone)]
pub struct HttpTask {
    script: String,
    client: Client,
}

#[derive(Debug, Clone)]
pub struct HttpRequestArgs {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpTask {
    pub fn new(script: impl Into<String>) -> Result<Self, PrepareError> {
        Ok(Self {
            script: script.into(),
            client: Client::builder().build()?,
        })
    }
}

/// curl assumes `http://` when the URL has no scheme.
fn parse_url(raw: &str) -> Result<Url, PrepareError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    Url::parse(&with_scheme).map_err(|source| PrepareError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

impl Task for HttpTask {
    type Args = HttpRequestArgs;

    fn prepare(&self) -> Result<Self::Args, PrepareError> {
        let request = parse_curl(&self.script)?;

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| PrepareError::InvalidMethod(request.method.clone()))?;
        let url = parse_url(&request.url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| PrepareError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| PrepareError::InvalidHeader(format!("{name}: {value}")))?;
            headers.append(header_name, header_value);
        }

        Ok(HttpRequestArgs {
            method,
            url,
            headers,
            body: request.body,
        })
    }

    async fn run(&self, args: Self::Args) -> RunResult {
        let mut request = self
            .client
            .request(args.method, args.url)
            .headers(args.headers);
        if let Some(body) = args.body {
            request = request.body(body);
        }

        let start = Instant::now();
        match request.send().await {
            Ok(response) => {
                let elapsed = start.elapsed();
                let successful = response.status().is_success();
                // Read the body to the end so the connection goes back to the pool.
                if let Err(e) = response.bytes().await {
                    log::debug!("Failed to read HTTP response body: {e}");
                }
                RunResult::new(successful, elapsed)
            }
            Err(e) => {
                log::debug!("HTTP request failed: {e}");
                RunResult::failure(start.elapsed())
            }
        }
    }
}
