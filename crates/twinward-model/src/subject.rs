use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// An `issuer:subject` principal identifier. Equality is case-sensitive
/// string equality on both parts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId {
    issuer: String,
    subject: String,
}

impl SubjectId {
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl FromStr for SubjectId {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (issuer, subject) = input
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedSubjectId(input.to_string()))?;
        if issuer.is_empty() || subject.is_empty() {
            return Err(ParseError::MalformedSubjectId(input.to_string()));
        }
        Ok(Self::new(issuer, subject))
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ParseError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        input.parse()
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.issuer, self.subject)
    }
}

/// A policy subject: a principal plus an optional expiry instant. A subject
/// without expiry is permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "subjectId")]
    pub id: SubjectId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn permanent(id: SubjectId) -> Self {
        Self {
            id,
            kind: None,
            expiry: None,
        }
    }

    pub fn expiring(id: SubjectId, expiry: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: None,
            expiry: Some(expiry),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.expiry.is_none()
    }

    /// An expiry at or before `at` has lapsed.
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= at)
    }
}
