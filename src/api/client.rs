use parking_lot::RwLock;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::types::{Credentials, JobDescription, NewJobDescription, Question, ResponseRecord, Token};
use crate::session::{AudioArtifact, MEGABYTE};

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / MEGABYTE as f64
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error(
        "Audio file is too large ({:.1}MB). Maximum size is {:.0}MB.",
        megabytes(.size_bytes),
        megabytes(.max_size_bytes)
    )]
    ArtifactTooLarge { size_bytes: u64, max_size_bytes: u64 },

    #[error("Invalid job description: {0}")]
    InvalidJobDescription(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Client for the practice backend (auth, job descriptions, questions,
/// response scoring)
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    max_upload_bytes: u64,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, max_upload_bytes: u64) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Practice backend at {}", base_url);

        Self {
            http: reqwest::Client::new(),
            base_url,
            token: RwLock::new(None),
            max_upload_bytes,
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /api/auth/register
    pub async fn register(&self, email: &str, password: &str) -> Result<Token, ApiError> {
        self.authenticate("/api/auth/register", email, password).await
    }

    /// POST /api/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Result<Token, ApiError> {
        self.authenticate("/api/auth/login", email, password).await
    }

    async fn authenticate(&self, path: &str, email: &str, password: &str) -> Result<Token, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .json(&Credentials { email, password })
            .send()
            .await?;

        let token: Token = parse(response).await?;
        self.set_token(token.access_token.clone());
        info!("Authenticated as {}", email);

        Ok(token)
    }

    /// POST /api/job-descriptions
    pub async fn create_job_description(&self, job: &NewJobDescription) -> Result<JobDescription, ApiError> {
        job.validate().map_err(ApiError::InvalidJobDescription)?;

        let response = self
            .authorized(self.http.post(self.url("/api/job-descriptions")))
            .json(job)
            .send()
            .await?;

        parse(response).await
    }

    /// GET /api/job-descriptions
    pub async fn list_job_descriptions(&self) -> Result<Vec<JobDescription>, ApiError> {
        let response = self
            .authorized(self.http.get(self.url("/api/job-descriptions")))
            .send()
            .await?;

        parse(response).await
    }

    /// GET /api/job-descriptions/{id}/questions
    pub async fn get_questions(&self, job_description_id: &str) -> Result<Vec<Question>, ApiError> {
        let path = format!("/api/job-descriptions/{}/questions", job_description_id);
        let response = self.authorized(self.http.get(self.url(&path))).send().await?;

        parse(response).await
    }

    /// POST /api/questions/{id}/responses
    ///
    /// Uploads the recording for transcription and scoring.
    pub async fn submit_response(
        &self,
        question_id: &str,
        artifact: &AudioArtifact,
    ) -> Result<ResponseRecord, ApiError> {
        if artifact.size_bytes() > self.max_upload_bytes {
            return Err(ApiError::ArtifactTooLarge {
                size_bytes: artifact.size_bytes(),
                max_size_bytes: self.max_upload_bytes,
            });
        }

        info!(
            "Submitting {} byte answer for question {}",
            artifact.size_bytes(),
            question_id
        );

        let part = Part::bytes(artifact.blob().to_vec())
            .file_name(artifact.file_name())
            .mime_str(artifact.mime_type())?;
        let form = Form::new().part("audio_file", part);

        let path = format!("/api/questions/{}/responses", question_id);
        let response = self
            .authorized(self.http.post(self.url(&path)))
            .multipart(form)
            .send()
            .await?;

        parse(response).await
    }

    /// GET /api/questions/{id}/responses, newest first
    pub async fn list_responses(&self, question_id: &str) -> Result<Vec<ResponseRecord>, ApiError> {
        let path = format!("/api/questions/{}/responses", question_id);
        let response = self.authorized(self.http.get(self.url(&path))).send().await?;

        let mut records: Vec<ResponseRecord> = parse(response).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(records)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { detail: serde_json::Value::String(s) }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body,
    };

    warn!("Backend error {}: {}", status, detail);

    Err(ApiError::Status {
        status: status.as_u16(),
        detail,
    })
}
