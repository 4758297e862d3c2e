//! Image references: `registry/repository[:tag][@digest]`

use std::fmt;
use std::str::FromStr;

use crate::error::CollectorError;

/// Registry assumed when the reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when the reference carries neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

const MAX_TAG_LEN: usize = 128;

/// A parsed, fully-qualified image reference
///
/// Parsing fills in the default registry and tag, so `Display` always prints
/// the normalized form and re-parsing it yields an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    registry: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parses `input`.
    pub fn parse(input: &str) -> Result<Self, CollectorError> {
        let invalid = |reason: &str| CollectorError::InvalidReference {
            reference: input.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("reference is empty"));
        }

        let (name_part, digest) = match trimmed.rsplit_once('@') {
            Some((name, digest)) => {
                validate_digest(digest).map_err(|r| invalid(&r))?;
                (name, Some(digest.to_owned()))
            }
            None => (trimmed, None),
        };

        // a ':' after the last '/' starts the tag; earlier ones are registry ports
        let last_slash = name_part.rfind('/');
        let (name, tag) = match name_part.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                let tag = &name_part[colon + 1..];
                validate_tag(tag).map_err(|r| invalid(&r))?;
                (&name_part[..colon], Some(tag.to_owned()))
            }
            _ => (name_part, None),
        };

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if looks_like_registry(first) => {
                (first.to_owned(), rest.to_owned())
            }
            _ => (DEFAULT_REGISTRY.to_owned(), name.to_owned()),
        };

        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("library/{repository}")
        } else {
            repository
        };
        validate_repository(&repository).map_err(|r| invalid(&r))?;

        let tag = match (&tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_owned()),
            _ => tag,
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Registry host (with optional port).
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Repository path within the registry.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Digest (`algorithm:hex`), if any.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// `registry/repository` without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Same repository, addressed by `digest` only.
    pub fn with_digest(&self, digest: impl Into<String>) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest.into()),
        }
    }

    /// Same repository, addressed by `tag` only.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: Some(tag.into()),
            digest: None,
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_repository(repository: &str) -> Result<(), String> {
    if repository.is_empty() {
        return Err("repository is empty".to_owned());
    }
    for component in repository.split('/') {
        if component.is_empty() {
            return Err("repository has an empty path component".to_owned());
        }
        let valid = component.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
        });
        if !valid {
            return Err(format!(
                "repository component '{component}' must be lowercase alphanumerics and separators"
            ));
        }
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), String> {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN {
        return Err(format!("tag must be 1-{MAX_TAG_LEN} characters"));
    }
    let valid = tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid || tag.starts_with(['.', '-']) {
        return Err(format!("invalid tag '{tag}'"));
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), String> {
    let Some((algorithm, hex)) = digest.split_once(':') else {
        return Err(format!("digest '{digest}' must be algorithm:hex"));
    };
    if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("invalid digest algorithm '{algorithm}'"));
    }
    if hex.len() < 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid digest hex '{hex}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str =
        "sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn short_name_gets_defaults() {
        let r = ImageReference::parse("alpine").unwrap();
        assert_eq!(r.registry(), "docker.io");
        assert_eq!(r.repository(), "library/alpine");
        assert_eq!(r.tag(), Some("latest"));
        assert_eq!(r.digest(), None);
        assert_eq!(r.to_string(), "docker.io/library/alpine:latest");
    }

    #[test]
    fn registry_with_port_is_not_a_tag() {
        let r = ImageReference::parse("localhost:5000/team/app").unwrap();
        assert_eq!(r.registry(), "localhost:5000");
        assert_eq!(r.repository(), "team/app");
        assert_eq!(r.tag(), Some("latest"));
    }

    #[test]
    fn tag_and_digest_are_kept() {
        let input = format!("ghcr.io/acme/app:1.2.3@{DIGEST}");
        let r = ImageReference::parse(&input).unwrap();
        assert_eq!(r.registry(), "ghcr.io");
        assert_eq!(r.tag(), Some("1.2.3"));
        assert_eq!(r.digest(), Some(DIGEST));
        assert_eq!(r.to_string(), input);
    }

    #[test]
    fn digest_only_has_no_default_tag() {
        let r = ImageReference::parse(&format!("ghcr.io/acme/app@{DIGEST}")).unwrap();
        assert_eq!(r.tag(), None);
    }

    #[test]
    fn display_round_trips() {
        for input in [
            "nginx:1.25",
            "quay.io/org/tool",
            "registry.local:8443/a/b/c:v1",
        ] {
            let parsed = ImageReference::parse(input).unwrap();
            let reparsed = ImageReference::parse(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "round trip of {input}");
        }
    }

    #[test]
    fn with_digest_and_with_tag_swap_addressing() {
        let r = ImageReference::parse("ghcr.io/acme/app:1.0").unwrap();
        let by_digest = r.with_digest(DIGEST);
        assert_eq!(by_digest.tag(), None);
        assert_eq!(by_digest.to_string(), format!("ghcr.io/acme/app@{DIGEST}"));

        let by_tag = by_digest.with_tag("sha256-abc.att");
        assert_eq!(by_tag.digest(), None);
        assert_eq!(by_tag.to_string(), "ghcr.io/acme/app:sha256-abc.att");
    }

    #[test]
    fn rejects_malformed_references() {
        for input in [
            "",
            "Upper/Case",
            "ghcr.io//app",
            "app:",
            "app:-bad",
            "app@sha256",
            "app@sha256:xyz",
        ] {
            let err = ImageReference::parse(input).unwrap_err();
            assert!(
                matches!(err, CollectorError::InvalidReference { .. }),
                "{input} should be rejected"
            );
        }
    }
}
