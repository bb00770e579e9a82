//! Page node model: typed nodes and the three-mode interaction protocol.
//!
//! Every node is addressed by a structural selector and exposes its state
//! predicates in three parallel forms:
//!
//! - `currently` — one driver round trip, no polling.
//! - `wait` — poll until true or raise
//!   [`WaitTimeout`](crate::Error::WaitTimeout); returns the node for
//!   chaining.
//! - `eventually` — identical polling, timeout becomes `false`; a
//!   not-located element still raises.
//!
//! | Module | Node |
//! |--------|------|
//! | [`element`] | [`PageElement`] — a single located element |
//! | [`value`] | [`ValuePageElement`] — element with a settable widget value |
//! | [`list`] | [`PageElementList`](list::PageElementList) — ordered, driver-materialized members |
//! | [`map`] | [`PageElementMap`](map::PageElementMap) — fixed named keys to elements |
//! | [`group`] | [`PageElementGroup`](group::PageElementGroup) — named heterogeneous sub-nodes |
//! | [`walker`] | recursive bulk-operation solver for groups |

// ============================================================================
// Modules
// ============================================================================

pub mod element;
pub mod group;
pub mod list;
pub mod map;
pub mod value;
pub mod walker;

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use element::PageElement;
pub use value::ValuePageElement;

// ============================================================================
// Defaults
// ============================================================================

/// Default wait timeout when no store configuration applies (5 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval when no store configuration applies.
pub const DEFAULT_INTERVAL_MS: u64 = 500;

// ============================================================================
// WaitType
// ============================================================================

/// The implicit condition awaited before a node's first interaction or read.
///
/// Applied by `initial_wait` so ordinary calls like `get_text` never race
/// the page's asynchronous rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitType {
    /// Wait for the element to exist.
    #[default]
    Exist,
    /// Wait for the element to be visible.
    Visible,
    /// Wait for any non-empty text.
    Text,
    /// Wait for any non-empty value (value elements only).
    Value,
}

// ============================================================================
// ScrollParams
// ============================================================================

/// Parameters for scrolling an element into position.
///
/// The target element's bounding box is aligned with the top-left of the
/// scroll container plus the pixel offsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollParams {
    /// Explicit container selector; when `None` the nearest scrollable
    /// ancestor is used.
    pub container: Option<String>,

    /// Horizontal offset added to the aligned position, in pixels.
    pub offset_x: i64,

    /// Vertical offset added to the aligned position, in pixels.
    pub offset_y: i64,

    /// Whether ancestors with hidden overflow count as scrollable.
    pub include_hidden: bool,
}

// ============================================================================
// NodeOpts
// ============================================================================

/// Per-node configuration, threaded down from the store at construction.
///
/// Defaults are resolved once in
/// [`StoreConfig`](crate::store::StoreConfig) and passed in explicitly; leaf
/// constructors never read ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOpts {
    /// Maximum total wait in milliseconds.
    pub timeout_ms: u64,

    /// Polling cadence in milliseconds.
    pub interval_ms: u64,

    /// Implicit condition applied before interactions and reads.
    pub wait_type: WaitType,

    /// Scroll performed before every click, when configured.
    pub custom_scroll: Option<ScrollParams>,
}

impl Default for NodeOpts {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            wait_type: WaitType::default(),
            custom_scroll: None,
        }
    }
}

impl NodeOpts {
    /// Creates options with the given timing and default wait type.
    #[must_use]
    pub fn new(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            interval_ms,
            ..Default::default()
        }
    }

    /// Sets the wait type.
    #[inline]
    #[must_use]
    pub fn with_wait_type(mut self, wait_type: WaitType) -> Self {
        self.wait_type = wait_type;
        self
    }

    /// Sets a scroll to perform before every click.
    #[inline]
    #[must_use]
    pub fn with_custom_scroll(mut self, scroll: ScrollParams) -> Self {
        self.custom_scroll = Some(scroll);
        self
    }
}

// ============================================================================
// PageNode
// ============================================================================

/// Identity shared by every node kind.
pub trait PageNode {
    /// The structural selector addressing this node's target(s).
    fn selector(&self) -> &str;

    /// The node kind name used in error messages.
    fn node_kind(&self) -> &'static str;

    /// Configured wait timeout in milliseconds.
    fn timeout_ms(&self) -> u64;

    /// Configured polling interval in milliseconds.
    fn interval_ms(&self) -> u64;
}

// ============================================================================
// Leaf
// ============================================================================

/// An element-shaped node: the member type of lists and maps, and what the
/// walker hands to its per-node solve step.
///
/// The two variants form a closed set; value operations on a plain element
/// report [`Unsupported`](crate::Error::Unsupported) instead of probing for
/// method presence.
#[derive(Debug, Clone)]
pub enum Leaf {
    /// A plain element without a widget value.
    Element(PageElement),
    /// An element whose widget carries a value.
    Value(ValuePageElement),
}

impl Leaf {
    /// Returns the underlying plain element view.
    #[must_use]
    pub fn element(&self) -> &PageElement {
        match self {
            Self::Element(e) => e,
            Self::Value(v) => v.element(),
        }
    }

    /// Returns the value view, if this leaf carries one.
    #[must_use]
    pub fn value(&self) -> Option<&ValuePageElement> {
        match self {
            Self::Element(_) => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Returns this leaf's selector.
    #[must_use]
    pub fn selector(&self) -> &str {
        self.element().selector()
    }

    /// Reads the leaf's text after its own initial wait.
    pub async fn get_text(&self) -> Result<String> {
        match self {
            Self::Element(e) => e.get_text().await,
            Self::Value(v) => v.get_text().await,
        }
    }

    /// Performs the leaf's implicit wait.
    pub async fn initial_wait(&self) -> Result<()> {
        match self {
            Self::Element(e) => e.initial_wait().await,
            Self::Value(v) => v.initial_wait().await,
        }
    }
}

impl PageNode for Leaf {
    fn selector(&self) -> &str {
        self.element().selector()
    }

    fn node_kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "PageElement",
            Self::Value(_) => "ValuePageElement",
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.element().timeout_ms()
    }

    fn interval_ms(&self) -> u64 {
        self.element().interval_ms()
    }
}

/// Which leaf kind a list or map materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafKind {
    /// Plain elements.
    Element,
    /// Value elements.
    Value,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_opts_defaults() {
        let opts = NodeOpts::default();
        assert_eq!(opts.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(opts.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(opts.wait_type, WaitType::Exist);
        assert!(opts.custom_scroll.is_none());
    }

    #[test]
    fn test_node_opts_serialize_stable() {
        // Options participate in store cache keys, so serialization must be
        // deterministic for equal values.
        let a = serde_json::to_string(&NodeOpts::default()).unwrap();
        let b = serde_json::to_string(&NodeOpts::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wait_type_serde_names() {
        assert_eq!(
            serde_json::to_value(WaitType::Exist).unwrap(),
            serde_json::json!("exist")
        );
        assert_eq!(
            serde_json::to_value(WaitType::Value).unwrap(),
            serde_json::json!("value")
        );
    }
}
