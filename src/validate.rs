//! Request validation
//!
//! Every operation checks its input in the same phase order and stops at the
//! first failure: presence, then shape, then range, then allow-list. Nothing
//! reaches a provider until all phases pass.

use crate::providers::char_count;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

const MIB: usize = 1024 * 1024;

/// Which validation phase rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Shape,
    Range,
    AllowList,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Wire name of the offending field
    pub field: String,
    pub constraint: Constraint,
    /// Client-facing message
    pub message: String,
    pub details: Option<String>,
}

impl ValidationError {
    fn new(field: &str, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            constraint,
            message: message.into(),
            details: None,
        }
    }

    pub fn required(field: &str, label: &str) -> Self {
        Self::new(field, Constraint::Required, format!("{label} is required"))
    }

    pub fn shape(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, Constraint::Shape, message)
    }

    pub fn range(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, Constraint::Range, message)
    }

    pub fn allow_list(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, Constraint::AllowList, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// `10000` -> `"10,000"`
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Reject text longer than `max` characters
pub fn max_chars(field: &str, label: &str, text: &str, max: usize) -> Result<(), ValidationError> {
    if char_count(text) > max as u64 {
        return Err(ValidationError::range(
            field,
            format!("{label} must not exceed {} characters", thousands(max)),
        ));
    }
    Ok(())
}

pub fn max_value(field: &str, label: &str, value: Option<u32>, max: u32) -> Result<(), ValidationError> {
    match value {
        Some(v) if v > max => Err(ValidationError::range(field, format!("{label} must be at most {max}"))),
        _ => Ok(()),
    }
}

/// Reject a value outside a fixed set
pub fn one_of(field: &str, label: &str, value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::shape(field, format!("Invalid {}", label.to_lowercase()))
            .with_details(format!("{label} must be one of: {}", allowed.join(", "))))
    }
}

/// A JSON request body as a field map
#[derive(Debug, Clone, Default)]
pub struct JsonBody(Map<String, Value>);

impl JsonBody {
    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::shape("body", "Request body must be a JSON object")),
        }
    }

    /// Null, missing and empty-string fields all count as absent
    fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some(value),
        }
    }

    /// Presence phase: every `(field, label)` pair must be present
    pub fn require(&self, fields: &[(&str, &str)]) -> Result<(), ValidationError> {
        match fields.iter().find(|(key, _)| self.get(key).is_none()) {
            Some((key, label)) => Err(ValidationError::required(key, label)),
            None => Ok(()),
        }
    }

    /// Shape phase for a field already checked by `require`
    pub fn string(&self, key: &str, label: &str) -> Result<String, ValidationError> {
        self.optional_string(key, label)?
            .ok_or_else(|| ValidationError::required(key, label))
    }

    pub fn optional_string(&self, key: &str, label: &str) -> Result<Option<String>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::shape(key, format!("{label} must be a string"))),
        }
    }

    pub fn optional_positive_int(&self, key: &str, label: &str) -> Result<Option<u32>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| ValidationError::shape(key, format!("{label} must be a positive integer"))),
        }
    }

    pub fn optional_bool(&self, key: &str, label: &str) -> Result<Option<bool>, ValidationError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ValidationError::shape(key, format!("{label} must be a boolean"))),
        }
    }

    /// Optional string restricted to `allowed`
    pub fn optional_choice(
        &self,
        key: &str,
        label: &str,
        allowed: &[&str],
    ) -> Result<Option<String>, ValidationError> {
        let value = self.optional_string(key, label)?;
        if let Some(v) = &value {
            one_of(key, label, v, allowed)?;
        }
        Ok(value)
    }

    pub fn optional_string_list(&self, key: &str, label: &str) -> Result<Option<Vec<String>>, ValidationError> {
        let invalid = || ValidationError::shape(key, format!("{label} must be an array of strings"));
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(invalid()),
        }
    }
}

/// One uploaded file. Owned by the request that received it.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A parsed multipart form: text fields and files by field name
#[derive(Debug, Default)]
pub struct FormData {
    pub texts: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl FormData {
    /// Text field value; empty values count as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    pub fn optional_positive_int(&self, name: &str, label: &str) -> Result<Option<u32>, ValidationError> {
        self.text(name)
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ValidationError::shape(name, format!("{label} must be a positive integer")))
            })
            .transpose()
    }
}

/// Size and type limits for one kind of upload
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub field: &'static str,
    pub label: &'static str,
    pub max_bytes: usize,
    pub content_types: &'static [&'static str],
    /// File-name suffixes accepted when the declared content type is not
    /// in `content_types`. Empty means the content type alone decides.
    pub extensions: &'static [&'static str],
    pub size_message: &'static str,
    pub supported: &'static str,
}

impl UploadPolicy {
    pub const IMAGE: Self = Self {
        field: "image",
        label: "Image file",
        max_bytes: 10 * MIB,
        content_types: &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"],
        extensions: &[],
        size_message: "Maximum file size is 10MB",
        supported: "Supported types: image/jpeg, image/jpg, image/png, image/gif, image/webp",
    };

    pub const AUDIO: Self = Self {
        field: "audio",
        label: "Audio file",
        max_bytes: 25 * MIB,
        content_types: &[
            "audio/mpeg",
            "audio/mp3",
            "audio/mp4",
            "audio/m4a",
            "audio/wav",
            "audio/webm",
            "video/mp4",
            "video/mpeg",
        ],
        extensions: &["mp3", "mp4", "mpeg", "mpga", "m4a", "wav", "webm"],
        size_message: "Maximum size is 25MB",
        supported: "Supported formats: mp3, mp4, mpeg, mpga, m4a, wav, webm",
    };

    pub const PDF: Self = Self {
        field: "pdf",
        label: "PDF file",
        max_bytes: 20 * MIB,
        content_types: &["application/pdf", "application/x-pdf"],
        extensions: &["pdf"],
        size_message: "Maximum file size is 20MB",
        supported: "File must be a PDF",
    };

    /// Presence phase for the upload itself
    pub fn require(&self, upload: Option<Upload>) -> Result<Upload, ValidationError> {
        match upload {
            Some(upload) if !upload.bytes.is_empty() => Ok(upload),
            _ => Err(ValidationError::required(self.field, self.label)),
        }
    }

    /// Range phase
    pub fn check_size(&self, len: usize) -> Result<(), ValidationError> {
        if len > self.max_bytes {
            return Err(ValidationError::range(self.field, "File too large").with_details(self.size_message));
        }
        Ok(())
    }

    /// Allow-list phase: declared content type, or file-name suffix where allowed
    pub fn check_type(&self, content_type: Option<&str>, file_name: Option<&str>) -> Result<(), ValidationError> {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        let type_ok = essence
            .as_deref()
            .is_some_and(|ct| self.content_types.contains(&ct));
        let extension_ok = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()));

        if type_ok || extension_ok {
            Ok(())
        } else {
            Err(ValidationError::allow_list(self.field, "Unsupported file type").with_details(self.supported))
        }
    }

    /// Range then allow-list for an uploaded file
    pub fn check(&self, upload: &Upload) -> Result<(), ValidationError> {
        self.check_size(upload.bytes.len())?;
        self.check_type(upload.content_type.as_deref(), upload.file_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> JsonBody {
        JsonBody::parse(value).unwrap()
    }

    #[test]
    fn test_require_treats_empty_and_null_as_missing() {
        for value in [json!({}), json!({"text": null}), json!({"text": ""})] {
            let err = body(value).require(&[("text", "Text")]).unwrap_err();
            assert_eq!(err.constraint, Constraint::Required);
            assert_eq!(err.message, "Text is required");
            assert_eq!(err.field, "text");
        }
    }

    #[test]
    fn test_require_reports_first_missing_field() {
        let err = body(json!({"text": "hi"}))
            .require(&[("text", "Text"), ("targetLanguage", "Target language")])
            .unwrap_err();
        assert_eq!(err.field, "targetLanguage");
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert_eq!(JsonBody::parse(json!([1, 2])).unwrap_err().constraint, Constraint::Shape);
    }

    #[test]
    fn test_shape_checks() {
        let b = body(json!({
            "text": 5,
            "maxLength": -3,
            "ratio": 1.5,
            "flag": "yes",
            "tags": ["a", 1]
        }));
        assert_eq!(b.string("text", "Text").unwrap_err().constraint, Constraint::Shape);
        assert!(b.optional_positive_int("maxLength", "Max length").is_err());
        assert!(b.optional_positive_int("ratio", "Ratio").is_err());
        assert!(b.optional_bool("flag", "Flag").is_err());
        assert!(b.optional_string_list("tags", "Tags").is_err());
        assert_eq!(b.optional_positive_int("missing", "Missing").unwrap(), None);
    }

    #[test]
    fn test_optional_choice() {
        let b = body(json!({"style": "creative", "service": "azure"}));
        assert_eq!(
            b.optional_choice("style", "Style", &["concise", "creative"]).unwrap(),
            Some("creative".to_string())
        );
        let err = b.optional_choice("service", "Service", &["openai", "ollama"]).unwrap_err();
        assert_eq!(err.constraint, Constraint::Shape);
        assert_eq!(err.details.as_deref(), Some("Service must be one of: openai, ollama"));
    }

    #[test]
    fn test_max_chars_boundary() {
        let ok = "a".repeat(32_768);
        let too_long = "a".repeat(32_769);
        assert!(max_chars("text", "Text", &ok, 32_768).is_ok());
        let err = max_chars("text", "Text", &too_long, 32_768).unwrap_err();
        assert_eq!(err.constraint, Constraint::Range);
        assert_eq!(err.message, "Text must not exceed 32,768 characters");
    }

    #[test]
    fn test_max_chars_counts_characters() {
        let text = "é".repeat(10);
        assert!(max_chars("text", "Text", &text, 10).is_ok());
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(500), "500");
        assert_eq!(thousands(10_000), "10,000");
        assert_eq!(thousands(1_048_576), "1,048,576");
    }

    #[test]
    fn test_image_policy_content_type_only() {
        let policy = UploadPolicy::IMAGE;
        assert!(policy.check_type(Some("image/png"), Some("a.png")).is_ok());
        assert!(policy.check_type(Some("IMAGE/JPEG"), None).is_ok());
        let err = policy.check_type(Some("image/bmp"), Some("a.png")).unwrap_err();
        assert_eq!(err.message, "Unsupported file type");
        assert_eq!(err.constraint, Constraint::AllowList);
    }

    #[test]
    fn test_audio_policy_accepts_extension_for_generic_type() {
        let policy = UploadPolicy::AUDIO;
        assert!(policy
            .check_type(Some("application/octet-stream"), Some("talk.M4A"))
            .is_ok());
        assert!(policy.check_type(Some("audio/mpeg"), Some("blob")).is_ok());
        assert!(policy.check_type(Some("text/plain"), Some("notes.txt")).is_err());
        assert!(policy.check_type(None, None).is_err());
    }

    #[test]
    fn test_size_checked_before_type() {
        let upload = Upload {
            file_name: Some("huge.bmp".to_string()),
            content_type: Some("image/bmp".to_string()),
            bytes: vec![0; 10 * MIB + 1],
        };
        let err = UploadPolicy::IMAGE.check(&upload).unwrap_err();
        assert_eq!(err.constraint, Constraint::Range);
    }

    #[test]
    fn test_empty_upload_is_missing() {
        let err = UploadPolicy::PDF.require(Some(Upload::default())).unwrap_err();
        assert_eq!(err.constraint, Constraint::Required);
        assert_eq!(err.message, "PDF file is required");
    }

    #[test]
    fn test_form_positive_int() {
        let mut form = FormData::default();
        form.texts.insert("maxLength".to_string(), "200".to_string());
        form.texts.insert("bad".to_string(), "abc".to_string());
        assert_eq!(form.optional_positive_int("maxLength", "Max length").unwrap(), Some(200));
        assert!(form.optional_positive_int("bad", "Bad").is_err());
        assert_eq!(form.optional_positive_int("absent", "Absent").unwrap(), None);
    }
}
