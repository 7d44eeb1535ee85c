use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path the site posts contact submissions to.
pub const CONTACT_ENDPOINT: &str = "/api/contact";

const MIN_NAME_CHARS: usize = 2;
const MIN_MESSAGE_CHARS: usize = 10;
const MIN_PHONE_DIGITS: usize = 7;

/// Contact form payload, also the JSON body of the API request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("contact form has {} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),
    #[error("unable to encode contact request")]
    Encode(#[from] serde_json::Error),
}

impl ContactError {
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ContactError::Invalid(fields) => fields,
            ContactError::Encode(_) => &[],
        }
    }
}

impl ContactSubmission {
    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), ContactError> {
        let mut errors = Vec::new();
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            errors.push(FieldError {
                field: "name",
                message: "must be at least 2 characters",
            });
        }
        if !is_valid_email(self.email.trim()) {
            errors.push(FieldError {
                field: "email",
                message: "must be a valid email address",
            });
        }
        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if !is_valid_phone(phone) {
                errors.push(FieldError {
                    field: "phone",
                    message: "may only contain digits, spaces and +-() with at least 7 digits",
                });
            }
        }
        if self.message.trim().chars().count() < MIN_MESSAGE_CHARS {
            errors.push(FieldError {
                field: "message",
                message: "must be at least 10 characters",
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ContactError::Invalid(errors))
        }
    }

    /// JSON body for `POST /api/contact`.
    pub fn to_request_json(&self) -> Result<String, ContactError> {
        Ok(serde_json::to_string(self)?)
    }

    fn mail_body(&self) -> String {
        let mut lines = vec![
            format!("Name: {}", self.name.trim()),
            format!("Email: {}", self.email.trim()),
        ];
        let optional = [
            ("Phone", &self.phone),
            ("Company", &self.company),
            ("Service", &self.service),
        ];
        for (label, value) in optional {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                lines.push(format!("{label}: {value}"));
            }
        }
        lines.push(String::new());
        lines.push(self.message.trim().to_string());
        lines.join("\n")
    }
}

/// Builds the `mailto:` fallback link for a submission.
pub fn mailto_link(recipient: &str, submission: &ContactSubmission) -> String {
    let subject = format!("Project inquiry from {}", submission.name.trim());
    format!(
        "mailto:{}?subject={}&body={}",
        recipient,
        urlencoding::encode(&subject),
        urlencoding::encode(&submission.mail_body())
    )
}

/// Reply of the contact endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactResponse {
    Ok { ok: bool },
    Error { error: String },
}

impl ContactResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ContactResponse::Ok { ok: true })
    }
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    allowed && phone.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}
