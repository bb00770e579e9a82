//! Pagewright - Page-object abstraction layer for UI test automation.
//!
//! This library provides a typed page-node model on top of an abstract
//! browser driver: test code declares page structure once and interacts
//! with it through a uniform, wait-aware API.
//!
//! # Architecture
//!
//! Nodes are addressed by structural selectors and created through a
//! caching store:
//!
//! - Every state predicate comes in three modes: `currently` (one driver
//!   round trip), `wait` (poll until true or raise) and `eventually` (poll
//!   until true, timeout becomes `false`)
//! - Interactions perform an implicit wait first, so reads never race the
//!   page's asynchronous rendering
//! - Collections (lists, maps, groups) re-expose the same verbs in bulk,
//!   routed through one recursive tree solver
//! - The driver is a narrow async capability trait; an in-memory mock ships
//!   for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pagewright::mock::{MockDriver, MockElement};
//! use pagewright::{PageNodeStore, Result, StoreConfig, WaitOpts};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let driver = MockDriver::new();
//!     driver.insert("//button[@id='save']", MockElement::new().with_text("Save"));
//!
//!     let store = PageNodeStore::new(Arc::new(driver), StoreConfig::default());
//!     let save = store.element("//button[@id='save']");
//!
//!     save.wait().has_text("Save", &WaitOpts::new()).await?;
//!     save.click(Default::default()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`driver`] | Abstract driver capability trait and the in-memory mock |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`node`] | Page nodes: elements, values, lists, maps, groups, walker |
//! | [`page`] | Top-level page containers with open/closed waits |
//! | [`selector`] | Structural selector composition |
//! | [`store`] | Node factory and cache |
//! | [`wait`] | Polling primitives and per-call wait options |

// ============================================================================
// Modules
// ============================================================================

/// Abstract browser-driver capability set.
///
/// The node layer consumes [`Driver`]; [`mock::MockDriver`] implements it
/// in memory for tests.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Page nodes and the three-mode interaction protocol.
pub mod node;

/// Top-level page containers.
pub mod page;

/// Structural selector composition.
///
/// [`XPathBuilder`] accumulates bracketed predicate clauses onto a base
/// selector.
pub mod selector;

/// Node factory and cache.
pub mod store;

/// Polling primitives shared by every wait-aware operation.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

// Driver types
pub use driver::{Driver, Point, Size, mock};

// Error types
pub use error::{Diff, Error, Result};

// Node types
pub use node::element::{ClickOpts, PageElement, ScrollOffsets, ScrollReport};
pub use node::group::{GroupNode, PageElementGroup};
pub use node::list::{Comparator, Identifier, ListValues, PageElementList};
pub use node::map::{PageElementMap, SelectorTemplate};
pub use node::value::ValuePageElement;
pub use node::walker::{ResultTree, ValueTree, Verb, WalkOptions};
pub use node::{Leaf, LeafKind, NodeOpts, PageNode, ScrollParams, WaitType};

// Page types
pub use page::Page;

// Selector types
pub use selector::XPathBuilder;

// Store types
pub use store::{PageNodeStore, StoreConfig};

// Wait types
pub use wait::WaitOpts;
