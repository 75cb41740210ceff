use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION},
    multipart::{Form, Part},
    Client,
};

#[derive(Debug, Clone)]
pub struct MultipartImage {
    pub file: Bytes,
    pub file_name: String,
    pub content_type: String,
    /// Serialized profile JSON, sent as the `profile` text field.
    pub profile: String,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartImage),
}

/// One POST against the remote service. Cheap to clone so every retry can
/// rebuild the wire body from the same bytes.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: &'static str,
    pub body: RequestBody,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything able to deliver an [`ApiRequest`]. An `Err` means the request
/// never produced an HTTP status (connect, TLS, reset...).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: ApiRequest) -> anyhow::Result<ApiResponse>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mealmind-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: ApiRequest) -> anyhow::Result<ApiResponse> {
        let url = self.url(request.path);
        let mut builder = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json");
        if let Some(auth) = &request.authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }

        builder = match request.body {
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(img) => {
                let part = Part::bytes(img.file.to_vec())
                    .file_name(img.file_name)
                    .mime_str(&img.content_type)
                    .context("multipart content type")?;
                let form = Form::new().part("file", part).text("profile", img.profile);
                builder.multipart(form)
            }
        };

        let res = builder
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let status = res.status().as_u16();
        let body = res
            .bytes()
            .await
            .with_context(|| format!("read body of POST {}", url))?;
        Ok(ApiResponse { status, body })
    }
}
