//! Abstract browser-driver capability set.
//!
//! The page-node layer never talks to a concrete browser-automation stack.
//! It consumes the narrow capability set defined by [`Driver`]; adapters for
//! real drivers (WebDriver, CDP clients) implement this trait, and
//! [`mock::MockDriver`] implements it in memory for tests.
//!
//! Every capability is a single point-in-time round trip keyed by a
//! structural selector string. All waiting and retrying lives above this
//! trait, in the node layer.

// ============================================================================
// Modules
// ============================================================================

/// In-memory driver for unit-testing page objects.
pub mod mock;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

// ============================================================================
// Geometry
// ============================================================================

/// A point in page coordinates, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset from the page origin.
    pub x: f64,
    /// Vertical offset from the page origin.
    pub y: f64,
}

/// An element's rendered size, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

// ============================================================================
// Driver Trait
// ============================================================================

/// The capability set the page-node layer requires from a browser driver.
///
/// Implementations must report a selector that matches nothing through an
/// error whose message carries a "could not be located" marker (or return
/// [`Error::NotLocated`](crate::Error::NotLocated) directly), and must
/// surface obscured-element click failures distinguishably from other
/// failures (a "not clickable at point" marker or
/// [`Error::NotClickable`](crate::Error::NotClickable)). The node layer
/// classifies both; see [`Error::classify`](crate::Error::classify).
///
/// The trait deliberately has no wait primitives. Protocols that offer
/// native waits (WebDriver's implicit waits, CDP's polling commands) should
/// not wire them up here: every capability is an immediate round trip, and
/// all polling happens in the node layer at the node's configured interval,
/// so timeout and diff reporting stay uniform across adapters.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns whether any node matches `selector`.
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Returns the number of nodes matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Returns whether the first match is visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Returns whether the first match is enabled.
    async fn is_enabled(&self, selector: &str) -> Result<bool>;

    /// Returns whether the first match is selected/checked.
    async fn is_selected(&self, selector: &str) -> Result<bool>;

    /// Returns the first match's aggregated text content.
    async fn get_text(&self, selector: &str) -> Result<String>;

    /// Returns the first match's inner HTML.
    async fn get_html(&self, selector: &str) -> Result<String>;

    /// Returns the first match's widget value, as the driver's string form.
    async fn get_value(&self, selector: &str) -> Result<String>;

    /// Returns an attribute of the first match, `None` when absent.
    async fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Sets the first match's widget value.
    async fn set_value(&self, selector: &str, value: &str) -> Result<()>;

    /// Clicks the first match.
    ///
    /// Must distinguish "obscured/not clickable" failures from other errors.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Returns the first match's page location.
    async fn get_location(&self, selector: &str) -> Result<Point>;

    /// Returns the first match's rendered size.
    async fn get_size(&self, selector: &str) -> Result<Size>;

    /// Executes a script against the live DOM and returns its result.
    ///
    /// Used by scroll computation; the script receives `args` positionally.
    async fn execute(&self, script: &str, args: Vec<JsonValue>) -> Result<JsonValue>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serde_round_trip() {
        let point = Point { x: 10.5, y: -3.0 };
        let json = serde_json::to_value(point).unwrap();
        let back: Point = serde_json::from_value(json).unwrap();
        assert_eq!(back, point);

        let size = Size {
            width: 800.0,
            height: 600.0,
        };
        let json = serde_json::to_value(size).unwrap();
        let back: Size = serde_json::from_value(json).unwrap();
        assert_eq!(back, size);
    }

    #[test]
    fn test_driver_is_object_safe() {
        fn assert_object_safe(_: Option<&dyn Driver>) {}
        assert_object_safe(None);
    }
}
