use serde::{Deserialize, Serialize};

/// Controls how documents are written.
///
/// # Examples
///
/// ```
/// use vc_json::EncodeOptions;
///
/// assert!(EncodeOptions::default().delta);
/// assert!(!EncodeOptions::FULL.delta);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Omit fields equal to the type defaults.
    pub delta: bool,
}

impl EncodeOptions {
    /// Only fields that differ from the defaults are written.
    pub const DELTA: Self = Self { delta: true };
    /// Every field is written.
    pub const FULL: Self = Self { delta: false };
}

impl Default for EncodeOptions {
    #[inline]
    fn default() -> Self {
        Self::DELTA
    }
}

/// Controls how field anomalies are handled while reading documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Escalate field errors to document failures and reject fixed arrays
    /// of the wrong length.
    pub strict: bool,
    /// Fail when a field of the type is missing from the document.
    pub require_all_fields: bool,
}

impl DecodeOptions {
    pub const LENIENT: Self = Self {
        strict: false,
        require_all_fields: false,
    };

    pub const STRICT: Self = Self {
        strict: true,
        require_all_fields: false,
    };

    #[inline]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[inline]
    pub const fn with_required_fields(mut self, required: bool) -> Self {
        self.require_all_fields = required;
        self
    }
}
