//! Error types for the page-node layer.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pagewright::{Result, PageElement};
//!
//! async fn example(element: &PageElement) -> Result<()> {
//!     element.wait().is_visible(&Default::default()).await?;
//!     element.click(Default::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Location | [`Error::NotLocated`] |
//! | Waiting | [`Error::WaitTimeout`] |
//! | Interaction | [`Error::NotClickable`] |
//! | Bulk operations | [`Error::UnmatchedKey`], [`Error::Unsupported`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Driver`], [`Error::Json`] |
//!
//! The location/waiting split is deliberate: "the selector matched nothing"
//! is a different failure class than "the element was found but the condition
//! never held". [`Error::NotLocated`] propagates even through `eventually`,
//! which otherwise downgrades timeouts to `false`.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Diff
// ============================================================================

/// The last observed expected/actual pair for a waited condition.
///
/// Recorded on every condition evaluation so a timeout error can report what
/// the node last saw, not just that time ran out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// The value the condition was waiting for, if any.
    pub expected: Option<String>,

    /// The value actually observed on the last evaluation.
    pub actual: Option<String>,
}

impl Diff {
    /// Renders the diff as an error-message suffix, empty when nothing
    /// was recorded.
    #[must_use]
    pub fn render(&self) -> String {
        match (&self.expected, &self.actual) {
            (Some(e), Some(a)) => format!(" (expected: {e:?}, actual: {a:?})"),
            (Some(e), None) => format!(" (expected: {e:?})"),
            (None, Some(a)) => format!(" (actual: {a:?})"),
            (None, None) => String::new(),
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging: every raised error
/// message contains the selector involved, and wait failures additionally
/// carry the timeout actually used.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Location Errors
    // ========================================================================
    /// Selector resolved to nothing.
    ///
    /// Always fatal: propagates even through `eventually`, because a missing
    /// element is not a slow-to-satisfy condition.
    #[error("Element could not be located: selector={selector}, node={node}")]
    NotLocated {
        /// Selector that matched nothing.
        selector: String,
        /// Node kind name (e.g. `PageElement`).
        node: String,
    },

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// A waited condition never became true within the timeout budget.
    ///
    /// Fatal for `wait`; downgraded to `false` by `eventually`.
    #[error("Condition '{condition}' not met within {timeout_ms}ms: selector={selector}{diff}")]
    WaitTimeout {
        /// Selector of the node that was waited on.
        selector: String,
        /// Name of the condition (e.g. `hasText`, `not.isVisible`).
        condition: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Rendered expected/actual suffix, possibly empty.
        diff: String,
    },

    // ========================================================================
    // Interaction Errors
    // ========================================================================
    /// Driver reported the element obscured or otherwise not clickable.
    ///
    /// Retried by [`PageElement::click`](crate::PageElement::click) inside
    /// its timeout budget; re-raised when the budget is spent.
    #[error("Element not clickable: {message}")]
    NotClickable {
        /// Driver-supplied description.
        message: String,
    },

    // ========================================================================
    // Bulk Operation Errors
    // ========================================================================
    /// A bulk operation's expected-value map referenced a child key that
    /// does not exist in the collection.
    ///
    /// Fatal unless suppressed via
    /// [`WalkOptions`](crate::WalkOptions) `throw_unmatched_key`.
    #[error("Unmatched key '{key}' in {collection}")]
    UnmatchedKey {
        /// The key that had no matching child.
        key: String,
        /// Collection identity (group id, list or map selector).
        collection: String,
    },

    /// A bulk operation targeted a child without the required capability
    /// (e.g. `getValue` on a plain text element).
    ///
    /// Normally suppressed: the child is silently excluded from results.
    #[error("Operation '{operation}' not supported by {node}")]
    Unsupported {
        /// The unsupported operation name.
        operation: String,
        /// Node kind and selector.
        node: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Programming or configuration error, raised immediately rather than
    /// deferred into a timeout.
    ///
    /// Example: list bulk-by-key before an identifier has been configured.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Uncategorized driver failure, passed through unchanged.
    #[error("Driver error: {message}")]
    Driver {
        /// Driver-supplied description.
        message: String,
    },

    /// Value (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a not-located error.
    #[inline]
    pub fn not_located(selector: impl Into<String>, node: impl Into<String>) -> Self {
        Self::NotLocated {
            selector: selector.into(),
            node: node.into(),
        }
    }

    /// Creates a wait-timeout error.
    #[inline]
    pub fn wait_timeout(
        selector: impl Into<String>,
        condition: impl Into<String>,
        timeout_ms: u64,
        diff: Option<Diff>,
    ) -> Self {
        Self::WaitTimeout {
            selector: selector.into(),
            condition: condition.into(),
            timeout_ms,
            diff: diff.map(|d| d.render()).unwrap_or_default(),
        }
    }

    /// Creates a not-clickable error.
    #[inline]
    pub fn not_clickable(message: impl Into<String>) -> Self {
        Self::NotClickable {
            message: message.into(),
        }
    }

    /// Creates an unmatched-key error.
    #[inline]
    pub fn unmatched_key(key: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::UnmatchedKey {
            key: key.into(),
            collection: collection.into(),
        }
    }

    /// Creates an unsupported-operation error.
    #[inline]
    pub fn unsupported(operation: impl Into<String>, node: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            node: node.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a driver error.
    #[inline]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a wait-timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }

    /// Returns `true` if this is a not-located error.
    #[inline]
    #[must_use]
    pub fn is_not_located(&self) -> bool {
        matches!(self, Self::NotLocated { .. })
    }

    /// Returns `true` if this is a not-clickable error.
    #[inline]
    #[must_use]
    pub fn is_not_clickable(&self) -> bool {
        matches!(self, Self::NotClickable { .. })
    }

    /// Returns `true` if this is an unsupported-operation error.
    #[inline]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

// ============================================================================
// Error Classification
// ============================================================================

/// Marker patterns for driver errors that mean "the selector matched
/// nothing". Drivers word this differently; all of them collapse into
/// [`Error::NotLocated`].
fn not_located_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("(?i)could not be located|no such element|unable to locate|stale element")
            .expect("static pattern compiles")
    })
}

/// Marker patterns for driver errors that mean "the element is obscured".
fn not_clickable_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("(?i)not clickable at point|is obscured|other element would receive the click")
            .expect("static pattern compiles")
    })
}

impl Error {
    /// Re-classifies a low-level driver error against a node's identity.
    ///
    /// Driver errors whose message carries a "could not be located" marker
    /// are rewritten into [`Error::NotLocated`] with the node's selector and
    /// kind injected, so failure messages stay diagnosable without a
    /// debugger. Obscured-element markers become [`Error::NotClickable`].
    /// All other errors pass through unchanged.
    #[must_use]
    pub fn classify(self, selector: &str, node: &str) -> Self {
        match self {
            Self::Driver { message } if not_located_marker().is_match(&message) => {
                Self::not_located(selector, node)
            }
            Self::Driver { message } if not_clickable_marker().is_match(&message) => {
                Self::not_clickable(message)
            }
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_contains_selector() {
        let err = Error::not_located("//div[@id='x']", "PageElement");
        assert!(err.to_string().contains("//div[@id='x']"));
        assert!(err.to_string().contains("PageElement"));
    }

    #[test]
    fn test_wait_timeout_display_contains_timeout_and_diff() {
        let diff = Diff {
            expected: Some("open".into()),
            actual: Some("closed".into()),
        };
        let err = Error::wait_timeout("//button", "hasText", 3000, Some(diff));
        let msg = err.to_string();
        assert!(msg.contains("3000ms"));
        assert!(msg.contains("//button"));
        assert!(msg.contains("\"open\""));
        assert!(msg.contains("\"closed\""));
    }

    #[test]
    fn test_wait_timeout_without_diff() {
        let err = Error::wait_timeout("//button", "exists", 500, None);
        assert!(!err.to_string().contains("expected"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::wait_timeout("//a", "isVisible", 1000, None);
        let other_err = Error::config("bad options");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_classify_not_located_marker() {
        let err = Error::driver("An element could not be located on the page");
        let classified = err.classify("//div", "PageElement");
        assert!(classified.is_not_located());
        assert!(classified.to_string().contains("//div"));
    }

    #[test]
    fn test_classify_not_clickable_marker() {
        let err = Error::driver("element is not clickable at point (10, 20)");
        let classified = err.classify("//div", "PageElement");
        assert!(classified.is_not_clickable());
    }

    #[test]
    fn test_classify_passes_other_errors_through() {
        let err = Error::driver("connection reset");
        let classified = err.classify("//div", "PageElement");
        assert!(matches!(classified, Error::Driver { .. }));
    }

    #[test]
    fn test_unmatched_key_display() {
        let err = Error::unmatched_key("z", "group 'header'");
        assert!(err.to_string().contains('z'));
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
