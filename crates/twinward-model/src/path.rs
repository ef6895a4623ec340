use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Where a path sits relative to a reference path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerLocation {
    /// The paths diverge at some common depth.
    Different,
    /// The other path is a strict ancestor of the reference path.
    Above,
    /// The paths are equal.
    Same,
    /// The other path is a strict descendant of the reference path.
    Below,
}

/// The root of one resource tree (`thing`, `policy`, `message`, ...).
/// Opaque; two paths under different resource types never relate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hierarchical, JSON-pointer-like address into a resource. The root path
/// `/` has zero segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path one segment below this one.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Classifies `other` relative to `self`: equal-length shared prefix is
    /// `Same`, a shorter prefix is `Above`, a longer extension is `Below`,
    /// and any segment mismatch at a common depth is `Different`.
    pub fn locate(&self, other: &ResourcePath) -> PointerLocation {
        let shared = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(ours, theirs)| ours == theirs)
            .count();
        if shared < self.segments.len().min(other.segments.len()) {
            return PointerLocation::Different;
        }
        match other.segments.len().cmp(&self.segments.len()) {
            Ordering::Equal => PointerLocation::Same,
            Ordering::Less => PointerLocation::Above,
            Ordering::Greater => PointerLocation::Below,
        }
    }
}

impl FromStr for ResourcePath {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let Some(rest) = input.strip_prefix('/') else {
            return Err(ParseError::MalformedResourcePath(input.to_string()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(ParseError::EmptyPathSegment(input.to_string()));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// A resource address: a path scoped by the resource type that roots it.
/// Wire form is `<type>:<path>`, e.g. `thing:/features/temperature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    resource_type: ResourceType,
    path: ResourcePath,
}

impl ResourceKey {
    pub fn new(resource_type: ResourceType, path: ResourcePath) -> Self {
        Self {
            resource_type,
            path,
        }
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// `Different` whenever the resource types differ, otherwise the path
    /// relation.
    pub fn locate(&self, other: &ResourceKey) -> PointerLocation {
        if self.resource_type != other.resource_type {
            return PointerLocation::Different;
        }
        self.path.locate(&other.path)
    }
}

impl FromStr for ResourceKey {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (resource_type, path) = input
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedResourceKey(input.to_string()))?;
        if resource_type.is_empty() {
            return Err(ParseError::EmptyResourceType);
        }
        Ok(Self {
            resource_type: ResourceType::new(resource_type),
            path: path.parse()?,
        })
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = ParseError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        input.parse()
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(input: &str) -> ResourcePath {
        input.parse().unwrap()
    }

    // --- ResourcePath parsing ---

    #[test]
    fn root_path_has_no_segments() {
        let root = path("/");

        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn nested_path_splits_into_segments() {
        let nested = path("/features/temperature/properties");

        let segments: Vec<&str> = nested.segments().collect();
        assert_eq!(segments, vec!["features", "temperature", "properties"]);
        assert_eq!(nested.to_string(), "/features/temperature/properties");
    }

    #[test]
    fn path_must_start_with_slash() {
        let err = "features".parse::<ResourcePath>().unwrap_err();

        assert_eq!(
            err,
            ParseError::MalformedResourcePath("features".to_string())
        );
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!("/features//temp".parse::<ResourcePath>().is_err());
        assert!("/features/".parse::<ResourcePath>().is_err());
    }

    #[test]
    fn child_appends_one_segment() {
        let child = path("/features").child("temperature");

        assert_eq!(child, path("/features/temperature"));
    }

    // --- locate ---

    #[test]
    fn locate_equal_paths_is_same() {
        assert_eq!(
            path("/features/temp").locate(&path("/features/temp")),
            PointerLocation::Same
        );
        assert_eq!(path("/").locate(&path("/")), PointerLocation::Same);
    }

    #[test]
    fn locate_ancestor_is_above() {
        assert_eq!(
            path("/features/temp").locate(&path("/features")),
            PointerLocation::Above
        );
        assert_eq!(
            path("/features/temp").locate(&path("/")),
            PointerLocation::Above
        );
    }

    #[test]
    fn locate_descendant_is_below() {
        assert_eq!(
            path("/features").locate(&path("/features/temp")),
            PointerLocation::Below
        );
        assert_eq!(path("/").locate(&path("/attributes")), PointerLocation::Below);
    }

    #[test]
    fn locate_diverging_paths_is_different() {
        assert_eq!(
            path("/features/temp").locate(&path("/attributes")),
            PointerLocation::Different
        );
    }

    #[test]
    fn locate_mismatch_beats_length() {
        // Diverges at depth 1 even though the other path is longer overall.
        assert_eq!(
            path("/features").locate(&path("/attributes/location/latitude")),
            PointerLocation::Different
        );
    }

    // --- ResourceKey ---

    #[test]
    fn resource_key_parses_type_and_path() {
        let key: ResourceKey = "thing:/features/temp".parse().unwrap();

        assert_eq!(key.resource_type().as_str(), "thing");
        assert_eq!(key.path(), &path("/features/temp"));
        assert_eq!(key.to_string(), "thing:/features/temp");
    }

    #[test]
    fn resource_key_parses_root_path() {
        let key: ResourceKey = "policy:/".parse().unwrap();

        assert!(key.path().is_root());
        assert_eq!(key.to_string(), "policy:/");
    }

    #[test]
    fn resource_key_rejects_missing_separator() {
        assert!("thing".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn resource_key_rejects_empty_type() {
        assert_eq!(
            ":/features".parse::<ResourceKey>().unwrap_err(),
            ParseError::EmptyResourceType
        );
    }

    #[test]
    fn resource_key_rejects_malformed_path() {
        assert!("thing:features".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn keys_of_different_types_are_always_different() {
        let thing: ResourceKey = "thing:/features".parse().unwrap();
        let message: ResourceKey = "message:/features".parse().unwrap();

        assert_eq!(thing.locate(&message), PointerLocation::Different);
    }

    #[test]
    fn keys_of_same_type_relate_by_path() {
        let reference: ResourceKey = "thing:/features/temp".parse().unwrap();
        let ancestor: ResourceKey = "thing:/features".parse().unwrap();

        assert_eq!(reference.locate(&ancestor), PointerLocation::Above);
    }

    #[test]
    fn resource_key_serde_uses_wire_string() {
        let key: ResourceKey = "thing:/features".parse().unwrap();

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"thing:/features\"");

        let back: ResourceKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
