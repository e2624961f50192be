//! Browser family and version detection from an identity string

use crate::error::{AppError, Result};
use crate::types::sentinel;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Detected family and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserIdentity {
    pub name: String,
    pub version: String,
}

impl BrowserIdentity {
    pub fn unknown() -> Self {
        Self {
            name: sentinel::UNKNOWN.to_string(),
            version: sentinel::UNKNOWN.to_string(),
        }
    }
}

struct Family {
    name: &'static str,
    marker: Regex,
    version: Regex,
}

/// Family name, marker pattern, version pattern; first marker match wins.
/// Edge and Opera embed the Chromium and Safari markers, so they are checked first.
const FAMILIES: [(&str, &str, &str); 5] = [
    ("Edge", r"(?i)\bedg(?:e|a|ios)?/", r"(?i)\bedg(?:e|a|ios)?/([0-9.]+)"),
    ("Opera", r"(?i)opr/", r"(?i)opr/([0-9.]+)"),
    ("Chrome", r"(?i)chrome|chromium|crios", r"(?i)(?:chrome|chromium|crios)/([0-9.]+)"),
    ("Firefox", r"(?i)firefox|fxios", r"(?i)(?:firefox|fxios)/([0-9.]+)"),
    ("Safari", r"(?i)safari", r"(?i)version/([0-9.]+)"),
];

/// Ordered, case-insensitive identity matcher
pub struct IdentityParser {
    families: Vec<Family>,
}

impl IdentityParser {
    pub fn new() -> Result<Self> {
        let families = FAMILIES
            .iter()
            .map(|&(name, marker, version)| {
                Ok(Family {
                    name,
                    marker: Regex::new(marker)
                        .map_err(|e| AppError::internal(format!("Invalid {} marker pattern: {}", name, e)))?,
                    version: Regex::new(version)
                        .map_err(|e| AppError::internal(format!("Invalid {} version pattern: {}", name, e)))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { families })
    }

    /// Classify an identity string; the version comes from the matched family's pattern only
    pub fn parse(&self, user_agent: &str) -> BrowserIdentity {
        let Some(family) = self.families.iter().find(|family| family.marker.is_match(user_agent)) else {
            return BrowserIdentity::unknown();
        };

        let version = family
            .version
            .captures(user_agent)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| sentinel::UNKNOWN.to_string());

        BrowserIdentity {
            name: family.name.to_string(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(user_agent: &str) -> BrowserIdentity {
        IdentityParser::new().unwrap().parse(user_agent)
    }

    fn identity(name: &str, version: &str) -> BrowserIdentity {
        BrowserIdentity {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_edge_marker() {
        assert_eq!(parse("Edg/100.0"), identity("Edge", "100.0"));
        assert_eq!(
            parse("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.75 Safari/537.36 Edg/100.0.1185.36"),
            identity("Edge", "100.0.1185.36")
        );
        assert_eq!(
            parse("Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.102 Safari/537.36 Edge/18.17763"),
            identity("Edge", "18.17763")
        );
        assert_eq!(parse("Mozilla/5.0 (Linux; Android 10) Chrome/100.0 Mobile Safari/537.36 EdgA/100.0.1185.50"), identity("Edge", "100.0.1185.50"));
        assert_eq!(parse("Mozilla/5.0 (iPhone) Version/15.0 EdgiOS/100.0.1185.50 Mobile/15E148 Safari/605.1.15"), identity("Edge", "100.0.1185.50"));
    }

    #[test]
    fn test_words_containing_edg_are_not_edge() {
        assert_eq!(parse("Hedgehog/2.0"), BrowserIdentity::unknown());
        assert_eq!(parse("KnowledgeBot/1.0 Firefox/88.0"), identity("Firefox", "88.0"));
        assert_eq!(parse("edging"), BrowserIdentity::unknown());
    }

    #[test]
    fn test_firefox_marker() {
        assert_eq!(parse("Firefox/88.0"), identity("Firefox", "88.0"));
        assert_eq!(
            parse("Mozilla/5.0 (X11; Linux x86_64; rv:88.0) Gecko/20100101 Firefox/88.0"),
            identity("Firefox", "88.0")
        );
        assert_eq!(parse("Mozilla/5.0 (iPhone) FxiOS/33.0 Mobile/15E148 Safari/605.1.15"), identity("Firefox", "33.0"));
    }

    #[test]
    fn test_chrome_and_safari() {
        assert_eq!(
            parse("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
            identity("Chrome", "120.0.0.0")
        );
        assert_eq!(
            parse("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1 Safari/605.1.15"),
            identity("Safari", "14.1")
        );
    }

    #[test]
    fn test_opera_before_chrome() {
        assert_eq!(
            parse("Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0 Safari/537.36 OPR/85.0.4341.18"),
            identity("Opera", "85.0.4341.18")
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(parse("FIREFOX/1.5"), identity("Firefox", "1.5"));
    }

    #[test]
    fn test_family_without_version() {
        assert_eq!(parse("Safari"), identity("Safari", "Unknown"));
    }

    #[test]
    fn test_unmatched() {
        assert_eq!(parse("curl/8.4.0"), BrowserIdentity::unknown());
        assert_eq!(parse(""), BrowserIdentity::unknown());
        assert_eq!(parse("device-inspector/0.1.0"), BrowserIdentity::unknown());
    }
}
