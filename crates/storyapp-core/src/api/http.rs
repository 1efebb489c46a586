//! HTTP implementation of the story service binding

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, ApiResult, StoryApi};
use crate::config::Config;
use crate::models::{
    LoginResponse, MessageResponse, StoryDetailResponse, StoryListResponse, UploadRequest,
};
use crate::storage::SessionStore;

const USER_AGENT: &str = concat!("storyapp/", env!("CARGO_PKG_VERSION"));

/// Story service client over reqwest
///
/// The bearer token is read from the session store on every request, so a
/// login or logout takes effect without rebuilding the client.
pub struct HttpStoryApi {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl HttpStoryApi {
    pub fn new(config: &Config, session: Arc<SessionStore>) -> ApiResult<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, config, session))
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: Client, config: &Config, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: config.api_base().to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn url_with_segments(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApiError::Unavailable(format!("Invalid API URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Unavailable(format!("Invalid API URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body
    ///
    /// Non-2xx responses keep their raw body so the caller can look for an
    /// error message in it.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!("Story API responded {} ({} bytes)", status, body.len());

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl StoryApi for HttpStoryApi {
    async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<MessageResponse> {
        let request = self
            .client
            .post(self.url("register"))
            .form(&[("name", name), ("email", email), ("password", password)]);
        self.send(request).await
    }

    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = self
            .client
            .post(self.url("login"))
            .form(&[("email", email), ("password", password)]);
        self.send(request).await
    }

    async fn get_stories(
        &self,
        page: u32,
        size: u32,
        with_location: bool,
    ) -> ApiResult<StoryListResponse> {
        let location = u32::from(with_location);
        let request = self
            .client
            .get(self.url("stories"))
            .query(&[("page", page), ("size", size), ("location", location)]);
        self.send(self.authorized(request)).await
    }

    async fn get_stories_with_location(&self) -> ApiResult<StoryListResponse> {
        let request = self
            .client
            .get(self.url("stories"))
            .query(&[("location", 1)]);
        self.send(self.authorized(request)).await
    }

    async fn get_detail_story(&self, id: &str) -> ApiResult<StoryDetailResponse> {
        let request = self.client.get(self.url_with_segments(&["stories", id])?);
        self.send(self.authorized(request)).await
    }

    async fn upload_story(&self, request: UploadRequest) -> ApiResult<MessageResponse> {
        let photo = Part::bytes(request.image)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)?;

        let mut form = Form::new()
            .part("photo", photo)
            .text("description", request.description);
        if let Some(lat) = request.lat {
            form = form.text("lat", lat);
        }
        if let Some(lon) = request.lon {
            form = form.text("lon", lon);
        }

        let builder = self.client.post(self.url("stories")).multipart(form);
        self.send(self.authorized(builder)).await
    }
}
