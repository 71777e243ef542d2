use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::client::HttpClient;

/// Plain client for the bulk CSV downloads. The exports run to hundreds of
/// megabytes, so the total timeout is generous; the connect timeout is not.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
