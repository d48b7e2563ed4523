//! TTS Cache - 缓存 key 派生
//!
//! key = 前缀 + base36(|rolling_hash(normalized_text)|)
//!
//! 非加密哈希，仅用于压缩 key 长度；不同文本可能得到相同 key，
//! 因此 key 只作为存储槽位，文本身份由索引和存储条目中的原文校验。

use std::fmt;

/// 持久化存储中 TTS 条目的 key 前缀
pub const CACHE_KEY_PREFIX: &str = "vocabflow_tts_";

/// 持久化索引的 key
pub const CACHE_INDEX_KEY: &str = "vocabflow_tts_index";

/// 规范化文本（去除首尾空白）
pub fn normalize_text(text: &str) -> &str {
    text.trim()
}

/// 缓存 key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// 从原始文本派生 key（内部先做规范化）
    pub fn derive(text: &str) -> Self {
        let hash = rolling_hash(normalize_text(text));
        let magnitude = i64::from(hash).unsigned_abs();
        Self(format!("{}{}", CACHE_KEY_PREFIX, to_base36(magnitude)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// 按 UTF-16 码元滚动累加: h = (h << 5) - h + c，32 位有符号环绕
fn rolling_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
