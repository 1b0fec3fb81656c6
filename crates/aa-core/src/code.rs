//! Activation code entry gate.
//!
//! The gate only looks at length. The account service is the authority on
//! whether the code content is correct.

/// Returns `true` iff `raw` holds exactly `required_length` characters.
///
/// 仅按长度判断验证码是否可提交。
pub fn is_complete(raw: &str, required_length: usize) -> bool {
    raw.chars().count() == required_length
}

/// Code typed by the user so far, paired with the configured length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    raw: String,
    required_length: usize,
}

impl CodeEntry {
    pub fn new(required_length: usize) -> Self {
        Self {
            raw: String::new(),
            required_length,
        }
    }

    /// Replaces the entry content and returns whether submit should be enabled.
    pub fn update(&mut self, raw: impl Into<String>) -> bool {
        self.raw = raw.into();
        self.is_complete()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn required_length(&self) -> usize {
        self.required_length
    }

    pub fn is_complete(&self) -> bool {
        is_complete(&self.raw, self.required_length)
    }
}
