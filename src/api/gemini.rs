use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{ClientResult, JobHandle, JobStatus, RemoteGenerationClient};
use crate::chat::ChatMessage;
use crate::error::ClientError;
use crate::scene::ImageSize;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

const IMAGE_STYLE_SUFFIX: &str =
    "Cinematic, hyper-realistic, high resolution, professional lighting, 9:16 vertical aspect ratio.";
const ASPECT_RATIO: &str = "9:16";

const CHAT_INSTRUCTION: &str = "You are the TubeMagic AI assistant. Help the user refine their YouTube automation project. Provide expert advice on content strategy, SEO, and visual storytelling.";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub video_model: String,
    pub chat_model: String,
    pub timeout: Duration,
}

/// Gemini / Veo REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    fn into_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
    }
}

impl Operation {
    fn into_status(self) -> JobStatus {
        if !self.done {
            return JobStatus::running();
        }
        if let Some(error) = self.error {
            return JobStatus::failed(error.message);
        }
        let uri = self
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);
        JobStatus::finished(uri)
    }
}

impl GeminiClient {
    /// A blank key is accepted here; every request then fails with
    /// [`ClientError::MissingApiKey`] until one is configured.
    pub fn new(config: GeminiConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }

    fn api_key(&self) -> ClientResult<&str> {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            return Err(ClientError::MissingApiKey);
        }
        Ok(key)
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> ClientResult<Response> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .json(body)
            .send()
            .await?;

        check_status(response).await
    }

    async fn generate_content(&self, model: &str, body: &Value) -> ClientResult<Vec<ResponsePart>> {
        let url = self.model_url(model, "generateContent");
        let response = self.post_json(&url, body).await?;
        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.into_parts())
    }
}

#[async_trait]
impl RemoteGenerationClient for GeminiClient {
    async fn generate_structured_content(
        &self,
        system_instruction: &str,
        prompt: &str,
        schema: &Value,
    ) -> ClientResult<Value> {
        info!("Generating automation package with {}", self.config.text_model);

        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let parts = self.generate_content(&self.config.text_model, &body).await?;
        let text = collect_text(&parts);
        if text.trim().is_empty() {
            return Err(ClientError::InvalidResponse("empty structured response".into()));
        }
        debug!("Structured response: {} chars", text.len());

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ClientError::InvalidResponse(format!("response is not JSON: {}", e)))
    }

    async fn generate_image(&self, prompt: &str, size: ImageSize) -> ClientResult<String> {
        info!("Generating {} image for prompt: {}", size, prompt);

        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{}. {}", prompt, IMAGE_STYLE_SUFFIX) }]
            }],
            "generationConfig": {
                "imageConfig": {
                    "aspectRatio": ASPECT_RATIO,
                    "imageSize": size.as_str()
                }
            }
        });

        let parts = self.generate_content(&self.config.image_model, &body).await?;
        parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .map(|data| {
                format!(
                    "data:{};base64,{}",
                    data.mime_type.as_deref().unwrap_or("image/png"),
                    data.data
                )
            })
            .ok_or_else(|| ClientError::InvalidResponse("No image data found in response".into()))
    }

    async fn generate_video(&self, prompt: &str) -> ClientResult<JobHandle> {
        info!("Submitting video job for prompt: {}", prompt);

        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": ASPECT_RATIO }
        });

        let url = self.model_url(&self.config.video_model, "predictLongRunning");
        let operation: Operation = self.post_json(&url, &body).await?.json().await?;
        let name = operation
            .name
            .ok_or_else(|| ClientError::InvalidResponse("operation name missing".into()))?;

        info!("Video job submitted: {}", name);
        Ok(JobHandle(name))
    }

    async fn poll_job(&self, job: &JobHandle) -> ClientResult<JobStatus> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            job.as_str().trim_start_matches('/')
        );
        debug!("Querying job status: {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;
        let operation: Operation = check_status(response).await?.json().await?;

        Ok(operation.into_status())
    }

    async fn fetch_media(&self, uri: &str) -> ClientResult<Vec<u8>> {
        info!("Downloading media from: {}", uri);

        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;

        Ok(bytes.to_vec())
    }

    async fn chat(&self, message: &str, history: &[ChatMessage]) -> ClientResult<String> {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "parts": [{ "text": m.text }] }))
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));

        let body = json!({
            "systemInstruction": { "parts": [{ "text": CHAT_INSTRUCTION }] },
            "contents": contents
        });

        let parts = self.generate_content(&self.config.chat_model, &body).await?;
        Ok(collect_text(&parts))
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    if error_text.contains(ENTITY_NOT_FOUND) {
        return Err(ClientError::EntityNotFound(error_text));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        message: error_text,
    })
}

fn collect_text(parts: &[ResponsePart]) -> String {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

/// Drop a surrounding Markdown code fence, if the model added one.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
