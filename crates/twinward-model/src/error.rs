#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("subject id must have the form 'issuer:subject': {0}")]
    MalformedSubjectId(String),

    #[error("resource key must have the form '<type>:<path>': {0}")]
    MalformedResourceKey(String),

    #[error("resource type must not be empty")]
    EmptyResourceType,

    #[error("resource path must start with '/': {0}")]
    MalformedResourcePath(String),

    #[error("empty segment in resource path: {0}")]
    EmptyPathSegment(String),

    #[error("permission must not be empty")]
    EmptyPermission,
}
