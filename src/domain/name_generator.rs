//! 候选域名生成
//!
//! 由名字语料随机拼接出人类可读的候选名称。随机源由调用方注入，便于测试复现；
//! 不要求密码学安全。

use std::fmt;

use rand::{seq::SliceRandom, Rng};

use crate::domain::name_corpus::{FIRST_NAMES, LAST_NAMES};

/// 单次生成的最大尝试次数
pub const MAX_GENERATION_ATTEMPTS: usize = 1000;
/// 候选名称最小长度（不含），即长度必须大于该值
pub const MIN_NAME_LEN: usize = 6;
/// 保留分隔符，不能出现在首尾
pub const RESERVED_SEPARATOR: char = '_';

/// 通过格式校验的候选名称
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameCandidate(String);

impl NameCandidate {
    /// 校验规则：非空、长度 > 6、首尾不是 `_`
    pub fn parse(raw: &str) -> Option<Self> {
        let acceptable = raw.chars().count() > MIN_NAME_LEN
            && !raw.starts_with(RESERVED_SEPARATOR)
            && !raw.ends_with(RESERVED_SEPARATOR);
        acceptable.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedName {
    Accepted(NameCandidate),
    /// 尝试次数耗尽，携带最后一次（未通过校验的）产物
    BoundExceeded(String),
}

/// 候选名称生成器
#[derive(Debug, Clone)]
pub struct NameGenerator {
    first_names: Vec<String>,
    last_names: Vec<String>,
    max_attempts: usize,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::with_corpus(FIRST_NAMES, LAST_NAMES)
    }
}

impl NameGenerator {
    pub fn with_corpus(first_names: &[&str], last_names: &[&str]) -> Self {
        Self {
            first_names: first_names.iter().map(|s| s.to_lowercase()).collect(),
            last_names: last_names.iter().map(|s| s.to_lowercase()).collect(),
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedName {
        let mut login = String::new();

        for _ in 0..self.max_attempts {
            let (Some(first), Some(last)) = (
                self.first_names.choose(rng),
                self.last_names.choose(rng),
            ) else {
                break;
            };

            let first = maybe_truncate(first, rng);
            let last = maybe_truncate(last, rng);
            let digits = maybe_digits(rng);

            login = if rng.gen_bool(0.5) {
                format!("{first}{last}{digits}")
            } else {
                format!("{last}{first}{digits}")
            };

            if let Some(candidate) = NameCandidate::parse(&login) {
                return GeneratedName::Accepted(candidate);
            }
        }

        GeneratedName::BoundExceeded(login)
    }
}

/// 抛硬币决定是否截成随机前缀，长度取 [0, len]
fn maybe_truncate<R: Rng + ?Sized>(token: &str, rng: &mut R) -> String {
    if rng.gen_bool(0.5) {
        let len = token.chars().count();
        let keep = rng.gen_range(0..=len);
        token.chars().take(keep).collect()
    } else {
        token.to_string()
    }
}

/// 抛硬币决定是否追加数字后缀：年份 / 3 位补零 / 4 位补零
fn maybe_digits<R: Rng + ?Sized>(rng: &mut R) -> String {
    if !rng.gen_bool(0.5) {
        return String::new();
    }
    match rng.gen_range(0..3) {
        0 => rng.gen_range(1980..=2006).to_string(),
        1 => format!("{:03}", rng.gen_range(5..=999)),
        _ => format!("{:04}", rng.gen_range(5..=9999)),
    }
}
