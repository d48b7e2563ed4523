//! Feedback Command Handlers - 单词注释与发音评分

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::credentials::resolve_credentials;
use crate::application::commands::feedback_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    Annotation, AnnotationRequest, Credentials, GenerativeProviderPort, PronunciationRequest,
};

pub const DEFAULT_TARGET_LANGUAGE: &str = "Chinese";

fn pick_language(requested: Option<String>, fallback: &str) -> String {
    requested
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// AnnotateWord Handler
pub struct AnnotateWordHandler {
    provider: Arc<dyn GenerativeProviderPort>,
    default_credentials: Option<Credentials>,
    target_language: String,
}

impl AnnotateWordHandler {
    pub fn new(
        provider: Arc<dyn GenerativeProviderPort>,
        default_credentials: Option<Credentials>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            default_credentials,
            target_language: target_language.into(),
        }
    }

    pub async fn handle(&self, cmd: AnnotateWordCommand) -> Result<Annotation, ApplicationError> {
        let credentials =
            resolve_credentials(cmd.credentials, self.default_credentials.as_ref())?;

        let word = cmd.word.trim();
        if word.is_empty() {
            return Err(ApplicationError::validation("Word must not be empty"));
        }

        let request = AnnotationRequest {
            word: word.to_string(),
            context_sentence: cmd.context.trim().to_string(),
            target_language: pick_language(cmd.target_language, &self.target_language),
        };

        let annotation = self.provider.annotate_word(request, &credentials).await?;
        tracing::debug!(word = %word, ipa = %annotation.ipa, "Word annotated");
        Ok(annotation)
    }
}

/// ScorePronunciation Handler
pub struct ScorePronunciationHandler {
    provider: Arc<dyn GenerativeProviderPort>,
    default_credentials: Option<Credentials>,
    target_language: String,
}

impl ScorePronunciationHandler {
    pub fn new(
        provider: Arc<dyn GenerativeProviderPort>,
        default_credentials: Option<Credentials>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            default_credentials,
            target_language: target_language.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: ScorePronunciationCommand,
    ) -> Result<PronunciationResult, ApplicationError> {
        let credentials =
            resolve_credentials(cmd.credentials, self.default_credentials.as_ref())?;

        if cmd.text.trim().is_empty() {
            return Err(ApplicationError::validation("Reference text must not be empty"));
        }
        if cmd.audio.is_empty() {
            return Err(ApplicationError::validation("Audio must not be empty"));
        }

        let size_bytes = cmd.audio.len();
        let sentence = cmd.text.trim().to_string();
        let request = PronunciationRequest {
            audio: cmd.audio,
            mime_type: cmd.mime_type,
            reference_text: sentence.clone(),
            target_language: pick_language(cmd.target_language, &self.target_language),
        };

        let mut score = self.provider.score_pronunciation(request, &credentials).await?;
        score.score = score.score.clamp(0.0, 100.0);

        tracing::info!(size_bytes = size_bytes, score = score.score, "Pronunciation scored");
        Ok(PronunciationResult {
            id: Uuid::new_v4(),
            sentence,
            timestamp: Utc::now().timestamp_millis(),
            score,
        })
    }
}
