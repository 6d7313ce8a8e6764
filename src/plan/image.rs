//! Base image references

use crate::error::{StagecraftError, StagecraftResult};
use serde::Serialize;
use std::fmt;

/// A parsed `[registry/]repository[:tag][@digest]` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    pub fn parse(reference: &str) -> StagecraftResult<Self> {
        let invalid = |reason: &str| StagecraftError::ImageRefInvalid {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty reference"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }

        let (name, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                if !digest.contains(':') {
                    return Err(invalid("digest must look like algorithm:hex"));
                }
                (name, Some(digest.to_string()))
            }
            None => (trimmed, None),
        };

        // A tag colon only counts after the last path separator, so
        // `localhost:5000/app` keeps its port.
        let last_slash = name.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (path, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &name[split + 1..];
                if tag.is_empty() {
                    return Err(invalid("empty tag"));
                }
                (&name[..split], Some(tag.to_string()))
            }
            None => (name, None),
        };

        let (registry, repository) = match path.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (Some(first.to_string()), rest.to_string())
            }
            _ => (None, path.to_string()),
        };

        if repository.is_empty() {
            return Err(invalid("empty repository"));
        }
        if repository.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("repository must be lowercase"));
        }

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Leading `major.minor` of the tag, e.g. `3.11` for `python:3.11-slim`.
    ///
    /// Informational only; a mismatch between stages never rejects a plan.
    pub fn runtime_version(&self) -> Option<String> {
        let tag = self.tag.as_deref()?;
        let mut parts = tag
            .split(|c: char| !c.is_ascii_digit() && c != '.')
            .next()?
            .split('.')
            .filter(|p| !p.is_empty());
        let major = parts.next()?;
        match parts.next() {
            Some(minor) => Some(format!("{}.{}", major, minor)),
            None => Some(major.to_string()),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_official_image() {
        let image = ImageRef::parse("python:3.11-slim").unwrap();
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "python");
        assert_eq!(image.tag.as_deref(), Some("3.11-slim"));
        assert_eq!(image.to_string(), "python:3.11-slim");
    }

    #[test]
    fn parse_registry_with_port() {
        let image = ImageRef::parse("localhost:5000/team/python").unwrap();
        assert_eq!(image.registry.as_deref(), Some("localhost:5000"));
        assert_eq!(image.repository, "team/python");
        assert_eq!(image.tag, None);
    }

    #[test]
    fn parse_digest() {
        let image = ImageRef::parse("ghcr.io/acme/py:3.12@sha256:abcd").unwrap();
        assert_eq!(image.registry.as_deref(), Some("ghcr.io"));
        assert_eq!(image.tag.as_deref(), Some("3.12"));
        assert_eq!(image.digest.as_deref(), Some("sha256:abcd"));
        assert_eq!(image.to_string(), "ghcr.io/acme/py:3.12@sha256:abcd");
    }

    #[test]
    fn reject_malformed() {
        assert!(ImageRef::parse("").is_err());
        assert!(ImageRef::parse("python: 3.11").is_err());
        assert!(ImageRef::parse("python:").is_err());
        assert!(ImageRef::parse("Python:3.11").is_err());
        assert!(ImageRef::parse("python@nodigest").is_err());
    }

    #[test]
    fn runtime_version_from_tag() {
        let version = |r: &str| ImageRef::parse(r).unwrap().runtime_version();
        assert_eq!(version("python:3.11-slim").as_deref(), Some("3.11"));
        assert_eq!(version("python:3.12.4-bookworm").as_deref(), Some("3.12"));
        assert_eq!(version("python:3").as_deref(), Some("3"));
        assert_eq!(version("python:slim"), None);
        assert_eq!(version("python"), None);
    }
}
