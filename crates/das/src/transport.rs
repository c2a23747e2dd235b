// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP delivery of serialized batches.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Outcome of a single POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub success: bool,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` to `url`. Never fails: transport errors come back as
    /// `success: false` with the error text as the body.
    async fn post(&self, url: &str, body: Vec<u8>) -> PostResponse;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> PostResponse {
        let time = Instant::now();
        let resp = self.client.post(url).body(body).send().await;
        let elapsed = time.elapsed();

        match resp {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                if status.is_success() {
                    debug!("Upload accepted with {status} after {} ms", elapsed.as_millis());
                } else {
                    error!("{status}: Failed to upload batch: {body:?}");
                }
                PostResponse {
                    success: status.is_success(),
                    body,
                }
            }
            Err(e) => {
                error!(
                    "Failed to upload batch after {} ms: {e:?}",
                    elapsed.as_millis()
                );
                PostResponse {
                    success: false,
                    body: e.to_string(),
                }
            }
        }
    }
}
