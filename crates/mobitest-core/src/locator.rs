//! Platform-keyed locator catalogs.
//!
//! Every page object owns a YAML catalog mapping symbolic element names to a
//! per-platform `{type, value}` pair:
//!
//! ```yaml
//! elements:
//!   loginButton:
//!     android:
//!       type: id
//!       value: btn_login
//!     ios:
//!       type: accessibilityId
//!       value: Log In
//!   stockRow:
//!     android:
//!       type: xpath
//!       value: "//*[contains(@content-desc,'{0}')]"
//! ```
//!
//! [`LocatorCatalog`] validates the whole document when it is loaded (an
//! unrecognized locator kind is rejected up front) and resolves a name plus a
//! [`Platform`] into a [`Locator`] the driver can search with.
//!
//! # Example
//!
//! ```
//! use mobitest_core::locator::{LocatorCatalog, LocatorKind, Platform};
//!
//! let yaml = "elements:\n  loginButton:\n    android:\n      type: id\n      value: btn_login\n";
//! let catalog = LocatorCatalog::from_yaml_str("LoginPage", yaml, Platform::Android).unwrap();
//!
//! let locator = catalog.resolve_default("loginButton").unwrap();
//! assert_eq!(locator.kind, LocatorKind::Id);
//! assert_eq!(locator.selector, "btn_login");
//! assert!(catalog.resolve("loginButton", Platform::Ios).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Settings;

/// Errors raised while loading or resolving locators.
#[derive(Error, Debug)]
pub enum LocatorError {
    /// The symbolic name is not in the page's catalog.
    #[error("{name} locator missing in page {page}")]
    NotFound { page: String, name: String },

    /// The name exists but has no mapping for the requested platform.
    #[error("{name} locator missing {platform} platform in page {page}")]
    PlatformMissing {
        page: String,
        name: String,
        platform: Platform,
    },

    /// The catalog (or an ad-hoc locator string) is malformed.
    #[error("Locator configuration error: {0}")]
    Configuration(String),

    /// The catalog file could not be read.
    #[error("Failed to read locator catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid YAML for the expected shape.
    #[error("Failed to parse locator catalog {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Target mobile platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(LocatorError::Configuration(format!(
                "unknown platform '{}' (expected android or ios)",
                other
            ))),
        }
    }
}

/// The fixed locator-kind vocabulary.
///
/// Serialized as the W3C/Appium `using` strategy string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorKind {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "link text")]
    LinkText,
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "css selector")]
    CssSelector,
    #[serde(rename = "class name")]
    ClassName,
    #[serde(rename = "accessibility id")]
    AccessibilityId,
}

impl LocatorKind {
    /// Maps a catalog `type` token to a kind.
    pub fn from_token(token: &str) -> Option<Self> {
        let kind = match token.trim() {
            "id" => LocatorKind::Id,
            "name" => LocatorKind::Name,
            "link" | "linkText" | "link-text" => LocatorKind::LinkText,
            "xpath" => LocatorKind::XPath,
            "css" | "cssSelector" | "css-selector" => LocatorKind::CssSelector,
            "classname" | "className" | "class-name" => LocatorKind::ClassName,
            "accessibilityId" | "accessibility-id" => LocatorKind::AccessibilityId,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical catalog token, used when printing a locator as `kind=selector`.
    pub fn token(&self) -> &'static str {
        match self {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::LinkText => "link",
            LocatorKind::XPath => "xpath",
            LocatorKind::CssSelector => "css",
            LocatorKind::ClassName => "classname",
            LocatorKind::AccessibilityId => "accessibilityId",
        }
    }

    /// W3C/Appium `using` strategy.
    pub fn strategy(&self) -> &'static str {
        match self {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::LinkText => "link text",
            LocatorKind::XPath => "xpath",
            LocatorKind::CssSelector => "css selector",
            LocatorKind::ClassName => "class name",
            LocatorKind::AccessibilityId => "accessibility id",
        }
    }
}

/// A resolved locator: kind plus fully substituted selector.
///
/// Serializes to the body of a W3C find-element request
/// (`{"using": ..., "value": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "using")]
    pub kind: LocatorKind,
    #[serde(rename = "value")]
    pub selector: String,
}

fn looks_like_xpath(s: &str) -> bool {
    s.starts_with('/') || s.starts_with("./")
}

/// Quotes `text` as an XPath string literal.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

impl Locator {
    pub fn new(kind: LocatorKind, selector: impl Into<String>) -> Self {
        Self {
            kind,
            selector: selector.into(),
        }
    }

    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(LocatorKind::Id, selector)
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(LocatorKind::XPath, selector)
    }

    pub fn accessibility_id(selector: impl Into<String>) -> Self {
        Self::new(LocatorKind::AccessibilityId, selector)
    }

    pub fn class_name(selector: impl Into<String>) -> Self {
        Self::new(LocatorKind::ClassName, selector)
    }

    /// Parses a `"<kind>=<selector>"` string.
    ///
    /// The kind is everything before the first `=`. An unrecognized kind is
    /// accepted only when the string (or the part after `=`) is a bare XPath
    /// starting with `/` or `./`.
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LocatorError::Configuration(
                "locator cannot be empty".to_string(),
            ));
        }
        match raw.split_once('=') {
            Some((kind, selector)) => Self::from_parts(kind, selector).or_else(|err| {
                if looks_like_xpath(raw) {
                    Ok(Self::xpath(raw))
                } else {
                    Err(err)
                }
            }),
            None if looks_like_xpath(raw) => Ok(Self::xpath(raw)),
            None => Err(LocatorError::Configuration(format!(
                "locator '{}' has no kind (expected <kind>=<selector>)",
                raw
            ))),
        }
    }

    /// Builds a locator from a catalog `type` token and `value`.
    pub fn from_parts(kind: &str, selector: &str) -> Result<Self, LocatorError> {
        match LocatorKind::from_token(kind) {
            Some(kind) => Ok(Self::new(kind, selector)),
            None if looks_like_xpath(selector) => Ok(Self::xpath(selector)),
            None => Err(LocatorError::Configuration(format!(
                "unrecognized locator kind '{}' for selector '{}'",
                kind, selector
            ))),
        }
    }

    /// Any element whose `content-desc` contains `text`.
    pub fn content_desc_contains(text: &str) -> Self {
        Self::xpath(format!(
            "//*[contains(@content-desc,{})]",
            xpath_literal(text)
        ))
    }

    /// Any element whose `content-desc` contains every term.
    pub fn content_desc_contains_all(terms: &[&str]) -> Self {
        let predicate = terms
            .iter()
            .map(|t| format!("contains(@content-desc,{})", xpath_literal(t)))
            .collect::<Vec<_>>()
            .join(" and ");
        Self::xpath(format!("//*[{}]", predicate))
    }

    /// Any element whose `text` attribute contains `text`.
    pub fn text_contains(text: &str) -> Self {
        Self::xpath(format!("//*[contains(@text,{})]", xpath_literal(text)))
    }

    /// The `n`-th following sibling (1-based) of an XPath locator's match.
    pub fn following_sibling(&self, n: usize) -> Option<Self> {
        self.relative(&format!("following-sibling::*[{}]", n))
    }

    /// The `n`-th preceding sibling (1-based) of an XPath locator's match.
    pub fn preceding_sibling(&self, n: usize) -> Option<Self> {
        self.relative(&format!("preceding-sibling::*[{}]", n))
    }

    /// The first child of an XPath locator's match.
    pub fn first_child(&self) -> Option<Self> {
        self.relative("*[1]")
    }

    fn relative(&self, step: &str) -> Option<Self> {
        match self.kind {
            LocatorKind::XPath => Some(Self::xpath(format!("{}/{}", self.selector, step))),
            _ => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.token(), self.selector)
    }
}

/// Replaces `{n}` placeholders with `args[n]`.
///
/// Braces that do not enclose a plain decimal index are copied through.
/// Returns the offending index when `args` is too short.
pub fn format_positional<S: AsRef<str>>(template: &str, args: &[S]) -> Result<String, usize> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if close > 0 && after[..close].bytes().all(|b| b.is_ascii_digit()) => {
                let index: usize = after[..close].parse().map_err(|_| usize::MAX)?;
                let arg = args.get(index).ok_or(index)?;
                out.push_str(arg.as_ref());
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// One platform's raw `{type, value}` pair as written in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLocator {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// A symbolic name with its per-platform mappings.
#[derive(Debug, Clone)]
pub struct LocatorEntry {
    pub name: String,
    pub platforms: BTreeMap<Platform, RawLocator>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    elements: BTreeMap<String, BTreeMap<String, RawLocator>>,
}

/// A page's loaded and validated locator catalog.
#[derive(Debug, Clone)]
pub struct LocatorCatalog {
    page: String,
    default_platform: Platform,
    entries: BTreeMap<String, LocatorEntry>,
}

impl LocatorCatalog {
    /// Parses and validates a catalog document.
    ///
    /// Fails with [`LocatorError::Configuration`] if any entry has no platform
    /// mapping, names an unknown platform, or uses an unrecognized kind.
    pub fn from_yaml_str(
        page: impl Into<String>,
        yaml: &str,
        default_platform: Platform,
    ) -> Result<Self, LocatorError> {
        let page = page.into();
        let document: CatalogDocument = serde_yaml::from_str(yaml).map_err(|source| {
            LocatorError::Yaml {
                path: PathBuf::from(&page),
                source,
            }
        })?;
        Self::from_document(page, document, default_platform)
    }

    fn from_document(
        page: String,
        document: CatalogDocument,
        default_platform: Platform,
    ) -> Result<Self, LocatorError> {
        let mut entries = BTreeMap::new();
        for (name, mappings) in document.elements {
            if mappings.is_empty() {
                let message = format!("{} locator in page {} has no platform mapping", name, page);
                error!("{}", message);
                return Err(LocatorError::Configuration(message));
            }
            let mut platforms = BTreeMap::new();
            for (platform, raw) in mappings {
                let platform: Platform = platform.parse().map_err(|e| {
                    LocatorError::Configuration(format!("{} locator in page {}: {}", name, page, e))
                })?;
                Locator::from_parts(&raw.kind, &raw.value).map_err(|e| {
                    let message =
                        format!("{} locator ({}) in page {}: {}", name, platform, page, e);
                    error!("{}", message);
                    LocatorError::Configuration(message)
                })?;
                platforms.insert(platform, raw);
            }
            entries.insert(name.clone(), LocatorEntry { name, platforms });
        }
        debug!(page = %page, count = entries.len(), "locator catalog loaded");
        Ok(Self {
            page,
            default_platform,
            entries,
        })
    }

    /// Loads a catalog from a YAML file. The page name is the file stem.
    pub fn load(path: impl AsRef<Path>, default_platform: Platform) -> Result<Self, LocatorError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| LocatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: CatalogDocument =
            serde_yaml::from_str(&yaml).map_err(|source| LocatorError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        let page = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_document(page, document, default_platform)
    }

    /// Loads `<locatorDirectory>/<page>.yaml` using the configured platform
    /// as the default.
    pub fn for_page(settings: &Settings, page: &str) -> Result<Self, LocatorError> {
        Self::load(settings.locator_path(page), settings.platform)
    }

    /// Name of the page this catalog belongs to.
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Platform used by [`resolve_default`](Self::resolve_default).
    pub fn default_platform(&self) -> Platform {
        self.default_platform
    }

    /// Symbolic names in the catalog, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&LocatorEntry> {
        self.entries.get(name)
    }

    fn raw(&self, name: &str, platform: Platform) -> Result<&RawLocator, LocatorError> {
        let entry = self.entries.get(name).ok_or_else(|| {
            let err = LocatorError::NotFound {
                page: self.page.clone(),
                name: name.to_string(),
            };
            error!("{}", err);
            err
        })?;
        entry.platforms.get(&platform).ok_or_else(|| {
            let err = LocatorError::PlatformMissing {
                page: self.page.clone(),
                name: name.to_string(),
                platform,
            };
            error!("{}", err);
            err
        })
    }

    /// Resolves `name` for `platform`.
    pub fn resolve(&self, name: &str, platform: Platform) -> Result<Locator, LocatorError> {
        self.resolve_with::<&str>(name, platform, &[])
    }

    /// Resolves `name` for `platform`, filling `{n}` placeholders from
    /// `substitutions` before the kind is parsed.
    pub fn resolve_with<S: AsRef<str>>(
        &self,
        name: &str,
        platform: Platform,
        substitutions: &[S],
    ) -> Result<Locator, LocatorError> {
        let raw = self.raw(name, platform)?;
        let composed = format!("{}={}", raw.kind, raw.value);
        let formatted = format_positional(&composed, substitutions).map_err(|index| {
            LocatorError::Configuration(format!(
                "{} locator ({}) in page {} needs placeholder {{{}}} but only {} substitution(s) given",
                name,
                platform,
                self.page,
                index,
                substitutions.len()
            ))
        })?;
        let locator = Locator::parse(&formatted)?;
        debug!(page = %self.page, name, %platform, locator = %locator, "resolved locator");
        Ok(locator)
    }

    /// Resolves `name` for the catalog's default platform.
    pub fn resolve_default(&self, name: &str) -> Result<Locator, LocatorError> {
        self.resolve(name, self.default_platform)
    }

    /// Like [`resolve_with`](Self::resolve_with) for the default platform.
    pub fn resolve_default_with<S: AsRef<str>>(
        &self,
        name: &str,
        substitutions: &[S],
    ) -> Result<Locator, LocatorError> {
        self.resolve_with(name, self.default_platform, substitutions)
    }
}
