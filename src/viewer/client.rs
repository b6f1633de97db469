use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, Response, redirect};
use url::Url;

use super::error::ViewerError;
use super::types::ServiceResponse;

/// The two calls the import loop makes against the viewer.
///
/// Implementations must not follow redirects: a `303` is itself an answer.
pub trait WorkflowService: Send + Sync + 'static {
    /// `POST` a form-encoded import request to `endpoint`.
    fn submit(
        &self,
        endpoint: &Url,
        form: &[(&'static str, &str)],
    ) -> impl Future<Output = Result<ServiceResponse, ViewerError>> + Send;

    /// `GET` the queue entry at `location`.
    fn poll(&self, location: &Url)
    -> impl Future<Output = Result<ServiceResponse, ViewerError>> + Send;
}

pub struct ViewerClient {
    client: Client,
}

impl ViewerClient {
    pub fn new(
        user_agent: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ViewerError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn read(response: Response) -> Result<ServiceResponse, ViewerError> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(ServiceResponse {
            status,
            location,
            body,
        })
    }
}

impl WorkflowService for ViewerClient {
    async fn submit(
        &self,
        endpoint: &Url,
        form: &[(&'static str, &str)],
    ) -> Result<ServiceResponse, ViewerError> {
        let response = self
            .client
            .post(endpoint.clone())
            .form(form)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn poll(&self, location: &Url) -> Result<ServiceResponse, ViewerError> {
        let response = self.client.get(location.clone()).send().await?;
        Self::read(response).await
    }
}
