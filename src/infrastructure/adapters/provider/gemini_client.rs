//! Gemini Client - 调用 Gemini generateContent REST API
//!
//! 实现 GenerativeProviderPort
//!
//! POST {base_url}/v1beta/models/{model}:generateContent
//! 凭证放在 `x-goog-api-key` 请求头里，不进 URL
//! - 语音合成: responseModalities=["AUDIO"]，音频在
//!   candidates[0].content.parts[0].inlineData
//! - 注释 / 评分: responseMimeType=application/json + responseSchema，
//!   结果是第一个候选的文本部分

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::application::ports::{
    Annotation, AnnotationRequest, Credentials, GenerativeProviderPort, PronunciationRequest,
    PronunciationScore, ProviderError, SpeechPayload, SpeechRequest,
};

/// API key 请求头
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// API 基础 URL
    pub base_url: String,
    /// 注释 / 评分使用的文本模型
    pub text_model: String,
    /// 请求超时（秒），None 表示不设置客户端超时
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            timeout_secs: None,
        }
    }
}

impl GeminiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// 第一个候选中所有文本部分的拼接
    fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Gemini 客户端
pub struct GeminiClient {
    client: Client,
    config: GeminiClientConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        tracing::info!(
            base_url = %config.base_url,
            text_model = %config.text_model,
            timeout_secs = ?config.timeout_secs,
            "GeminiClient initialized"
        );

        Ok(Self { client, config })
    }

    pub fn with_default_config() -> Result<Self, ProviderError> {
        Self::new(GeminiClientConfig::default())
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &Value,
        credentials: &Credentials,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let url = self.generate_url(model);
        tracing::debug!(url = %url, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credentials.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    ProviderError::Timeout
                } else if e.is_connect() {
                    ProviderError::NetworkError(format!("Cannot connect to provider: {}", e))
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.without_url().to_string()))
    }

    async fn generate_json<T: DeserializeOwned>(
        &self,
        body: &Value,
        credentials: &Credentials,
    ) -> Result<T, ProviderError> {
        let response = self
            .generate_content(&self.config.text_model, body, credentials)
            .await?;
        parse_json_answer(&response)
    }
}

fn speech_body(request: &SpeechRequest) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": request.text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": request.voice_name }
                }
            }
        }
    })
}

fn annotation_body(request: &AnnotationRequest) -> Value {
    let prompt = format!(
        "Analyze the English word \"{}\".\nContext: \"{}\".\n\nProvide:\n\
         1. The IPA phonetic transcription (British or American general).\n\
         2. A concise {} definition (max 10 chars) suitable for this context.\n\n\
         Return as JSON.",
        request.word, request.context_sentence, request.target_language
    );

    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "ipa": { "type": "STRING", "description": "IPA phonetic transcription, e.g., /həˈləʊ/" },
                    "definition": { "type": "STRING", "description": format!("Concise {} definition", request.target_language) }
                },
                "required": ["ipa", "definition"]
            }
        }
    })
}

fn pronunciation_body(request: &PronunciationRequest) -> Value {
    let prompt = format!(
        "You are an English pronunciation coach. Listen to this audio recording where a student \
         reads the following text:\n\n\"{}\"\n\n\
         Analyze the pronunciation and provide feedback in JSON format with:\n\
         1. score: A number from 0-100 rating the overall pronunciation quality\n\
         2. feedback: A brief overall comment in {} (1-2 sentences)\n\
         3. errors: An array of words that had pronunciation issues, each with:\n   \
         - word: the mispronounced word (must match exactly a word in the original text)\n   \
         - issue: a brief description of the issue in {}\n\n\
         Be encouraging but honest. If the pronunciation is good, return an empty errors array.\n\
         Focus on significant errors that affect comprehension.",
        request.reference_text, request.target_language, request.target_language
    );

    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "inlineData": { "mimeType": request.mime_type, "data": BASE64.encode(&request.audio) } },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "score": { "type": "NUMBER", "description": "Pronunciation score 0-100" },
                    "feedback": { "type": "STRING", "description": "Overall feedback" },
                    "errors": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "word": { "type": "STRING", "description": "The mispronounced word" },
                                "issue": { "type": "STRING", "description": "Description of the issue" }
                            },
                            "required": ["word", "issue"]
                        }
                    }
                },
                "required": ["score", "feedback", "errors"]
            }
        }
    })
}

/// 提取语音负载：只看第一个候选的第一个部分
fn parse_speech_payload(response: &GenerateContentResponse) -> Result<SpeechPayload, ProviderError> {
    let inline = response
        .first_parts()
        .first()
        .and_then(|p| p.inline_data.as_ref());

    match inline {
        Some(InlineData {
            mime_type: Some(mime_type),
            data: Some(data),
        }) if !data.is_empty() && !mime_type.is_empty() => {
            let data = BASE64
                .decode(data.as_bytes())
                .map_err(|e| ProviderError::InvalidResponse(format!("Invalid base64 audio: {}", e)))?;
            Ok(SpeechPayload::InlineAudio {
                data,
                mime_type: mime_type.clone(),
            })
        }
        _ => Ok(SpeechPayload::Absent),
    }
}

fn parse_json_answer<T: DeserializeOwned>(response: &GenerateContentResponse) -> Result<T, ProviderError> {
    let text = response
        .text()
        .ok_or_else(|| ProviderError::InvalidResponse("No response from AI".to_string()))?;
    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl GenerativeProviderPort for GeminiClient {
    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
        credentials: &Credentials,
    ) -> Result<SpeechPayload, ProviderError> {
        tracing::info!(
            model = %request.model,
            voice = %request.voice_name,
            text_len = request.text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .generate_content(&request.model, &speech_body(&request), credentials)
            .await?;
        let payload = parse_speech_payload(&response)?;

        if let SpeechPayload::InlineAudio { data, mime_type } = &payload {
            tracing::info!(mime_type = %mime_type, size_bytes = data.len(), "Speech synthesized");
        }

        Ok(payload)
    }

    async fn annotate_word(
        &self,
        request: AnnotationRequest,
        credentials: &Credentials,
    ) -> Result<Annotation, ProviderError> {
        tracing::info!(word = %request.word, "Requesting word annotation");
        self.generate_json(&annotation_body(&request), credentials).await
    }

    async fn score_pronunciation(
        &self,
        request: PronunciationRequest,
        credentials: &Credentials,
    ) -> Result<PronunciationScore, ProviderError> {
        tracing::info!(
            mime_type = %request.mime_type,
            audio_size = request.audio.len(),
            "Requesting pronunciation scoring"
        );
        self.generate_json(&pronunciation_body(&request), credentials)
            .await
    }
}
