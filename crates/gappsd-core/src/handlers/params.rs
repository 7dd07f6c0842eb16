//! Parameter extraction and per-field regexp validation shared by every
//! directory handler (§6, "Job parameter schema").

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::JobError;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-z0-9._-]+").unwrap());
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[\w /.'-]{1,40}$").unwrap());
static PASSWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-f0-9]{40}$").unwrap());
static SUSPENDED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(true|false)$").unwrap());

/// A decoded, validated view over a job's `j_parameters` document. Built
/// once at handler construction time; every accessor below is infallible
/// after that point.
pub struct Params<'a> {
    value: &'a Value,
}

impl<'a> Params<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn str_field(&self, field: &str) -> Option<&'a str> {
        self.value.get(field).and_then(Value::as_str)
    }

    pub fn require_str(&self, field: &str) -> Result<&'a str, JobError> {
        self.str_field(field)
            .ok_or_else(|| JobError::Content(format!("Field '{field}' missing.")))
    }

    fn check(&self, field: &str, re: &Regex) -> Result<(), JobError> {
        if let Some(v) = self.str_field(field) {
            if !re.is_match(v) {
                return Err(JobError::Content(format!(
                    "Field '{field}' did not match regexp '{}'.",
                    re.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn check_username(&self) -> Result<(), JobError> {
        self.check("username", &USERNAME_RE)
    }

    pub fn check_name_fields(&self) -> Result<(), JobError> {
        self.check("first_name", &NAME_RE)?;
        self.check("last_name", &NAME_RE)?;
        Ok(())
    }

    pub fn check_password(&self) -> Result<(), JobError> {
        self.check("password", &PASSWORD_RE)
    }

    pub fn check_suspended(&self) -> Result<(), JobError> {
        self.check("suspended", &SUSPENDED_RE)
    }

    pub fn check_nickname(&self) -> Result<(), JobError> {
        self.check("nickname", &USERNAME_RE)
    }

    /// Full `UserJob._FIELDS_REGEXP` validation pass (username, first/last
    /// name, password, suspended), each only if present.
    pub fn check_user_fields(&self) -> Result<(), JobError> {
        self.check_username()?;
        self.check_name_fields()?;
        self.check_password()?;
        self.check_suspended()?;
        Ok(())
    }

    pub fn suspended_bool(&self) -> Option<bool> {
        self.str_field("suspended").map(|s| s.eq_ignore_ascii_case("true"))
    }
}

pub fn require_username(params: &Value) -> Result<String, JobError> {
    Params::new(params).require_str("username").map(str::to_string)
}
