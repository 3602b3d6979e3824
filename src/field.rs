//! Field-path scoped validation errors.
//!
//! Validators collect every problem they find as a [`FieldError`] and the
//! caller folds the list into one [`ValidationErrors`] at the end of a pass.

use std::fmt;

/// Dotted path to a config field, e.g. `platform.ovirt.affinityGroups[1].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        FieldPath(root.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            FieldPath(name.to_string())
        } else {
            FieldPath(format!("{}.{}", self.0, name))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        FieldPath(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is wrong with a field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Required value")]
    Required,
    #[error("Invalid value: {value:?}")]
    Invalid { value: String },
    #[error("Unsupported value: {value:?}: supported values: {}", quote_all(.supported))]
    NotSupported { value: String, supported: Vec<String> },
    #[error("Not found: {value:?}")]
    NotFound { value: String },
    #[error("Forbidden")]
    Forbidden,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {kind}{}", detail_suffix(.detail))]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: ErrorKind,
    pub detail: String,
}

fn quote_all(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
    quoted.join(", ")
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

impl FieldError {
    pub fn required(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::Required,
            detail: detail.into(),
        }
    }

    pub fn invalid(path: &FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::Invalid {
                value: value.to_string(),
            },
            detail: detail.into(),
        }
    }

    pub fn not_supported(path: &FieldPath, value: impl fmt::Display, supported: &[&str]) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::NotSupported {
                value: value.to_string(),
                supported: supported.iter().map(|s| s.to_string()).collect(),
            },
            detail: String::new(),
        }
    }

    pub fn not_found(path: &FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::NotFound {
                value: value.to_string(),
            },
            detail: detail.into(),
        }
    }

    pub fn forbidden(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind: ErrorKind::Forbidden,
            detail: detail.into(),
        }
    }
}

/// All field errors of one validation pass.
///
/// A single error renders as itself, several as `[a, b]`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_list(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn render_list(errors: &[FieldError]) -> String {
    match errors {
        [single] => single.to_string(),
        errors => {
            let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            format!("[{}]", joined.join(", "))
        }
    }
}

impl ValidationErrors {
    /// `Ok` when the pass found nothing.
    pub fn check(errors: Vec<FieldError>) -> Result<(), ValidationErrors> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}
