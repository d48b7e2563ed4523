//! Feedback Commands - 单词注释与发音评分

use serde::Serialize;
use uuid::Uuid;

use crate::application::ports::{Credentials, PronunciationScore};

/// 单词注释命令
#[derive(Debug, Clone)]
pub struct AnnotateWordCommand {
    pub word: String,
    /// 单词所在的句子
    pub context: String,
    /// 释义语言，缺省使用配置值
    pub target_language: Option<String>,
    pub credentials: Option<Credentials>,
}

/// 发音评分命令
#[derive(Debug, Clone)]
pub struct ScorePronunciationCommand {
    /// 朗读的原文
    pub text: String,
    pub audio: Vec<u8>,
    pub mime_type: String,
    pub target_language: Option<String>,
    pub credentials: Option<Credentials>,
}

/// 发音评分结果，附带朗读原文与评分时间
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PronunciationResult {
    pub id: Uuid,
    pub sentence: String,
    /// Unix 毫秒
    pub timestamp: i64,
    #[serde(flatten)]
    pub score: PronunciationScore,
}
