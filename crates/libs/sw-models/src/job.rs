//! Launch requests and their validated form.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Scan depth understood by the external scanner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Passive recon only.
    Fast,
    /// The scanner's default pipeline.
    #[default]
    Standard,
    /// Everything, including slow active checks.
    Deep,
}

impl ScanMode {
    /// Value passed to the scanner's `-m` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Fast => "fast",
            ScanMode::Standard => "standard",
            ScanMode::Deep => "deep",
        }
    }
}

impl FromStr for ScanMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(ScanMode::Fast),
            "standard" => Ok(ScanMode::Standard),
            "deep" => Ok(ScanMode::Deep),
            _ => Err(Error::UnknownMode(value.to_string())),
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch request as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    /// Target domain.
    #[serde(default)]
    pub domain: String,
    /// Requested mode, defaults to [`ScanMode::Standard`].
    #[serde(default)]
    pub mode: Option<String>,
}

/// A launch request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    /// Target domain, trimmed.
    pub domain: String,
    /// Scan mode.
    pub mode: ScanMode,
}

impl JobRequest {
    pub fn new(domain: impl Into<String>, mode: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            mode,
        }
    }

    /// Validate the request shape.
    ///
    /// The domain is handed to the scanner as a single argument, so anything
    /// that could be mistaken for a flag or a path is refused.
    pub fn validate(self) -> Result<ScanTarget> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(Error::EmptyDomain);
        }
        let valid = !domain.starts_with('-')
            && !domain.contains("..")
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '*'));
        if !valid {
            return Err(Error::InvalidDomain(domain.to_string()));
        }

        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("") => ScanMode::default(),
            Some(mode) => mode.parse()?,
        };

        Ok(ScanTarget {
            domain: domain.to_string(),
            mode,
        })
    }
}

/// Synchronous acknowledgment of an accepted launch.
///
/// The job identifier is not known yet at this point, so it is never part of
/// the acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchAck {
    /// Always `"started"`.
    pub status: String,
    pub domain: String,
    pub mode: ScanMode,
}

impl From<&ScanTarget> for LaunchAck {
    fn from(target: &ScanTarget) -> Self {
        Self {
            status: String::from("started"),
            domain: target.domain.clone(),
            mode: target.mode,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.domain, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_standard() {
        let target = JobRequest::new("example.com", None).validate().unwrap();
        assert_eq!(target.mode, ScanMode::Standard);

        let target = JobRequest::new("example.com", Some(String::from("  ")))
            .validate()
            .unwrap();
        assert_eq!(target.mode, ScanMode::Standard);
    }

    #[test]
    fn empty_domain_is_rejected() {
        assert_eq!(
            JobRequest::new("   ", None).validate(),
            Err(Error::EmptyDomain)
        );
    }

    #[test]
    fn suspicious_domains_are_rejected() {
        for domain in ["-rf", "../etc", "a b.com", "x.com/evil"] {
            assert!(matches!(
                JobRequest::new(domain, None).validate(),
                Err(Error::InvalidDomain(_))
            ));
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_eq!(
            JobRequest::new("example.com", Some(String::from("turbo"))).validate(),
            Err(Error::UnknownMode(String::from("turbo")))
        );
    }

    #[test]
    fn mode_parsing_ignores_case() {
        let target = JobRequest::new(" acme.com ", Some(String::from("DEEP")))
            .validate()
            .unwrap();
        assert_eq!(target.domain, "acme.com");
        assert_eq!(target.mode, ScanMode::Deep);
    }
}
