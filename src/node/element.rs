//! Single located elements and the three-mode interaction protocol.
//!
//! # Example
//!
//! ```ignore
//! use pagewright::{WaitOpts, PageNodeStore};
//!
//! let button = store.element("//button[@id='save']");
//!
//! // Immediate, single round trip.
//! if button.currently().is_visible().await? { /* ... */ }
//!
//! // Poll until true or raise WaitTimeout.
//! button.wait().has_text("Save", &WaitOpts::new()).await?;
//!
//! // Poll until true, timeout becomes `false`.
//! if button.eventually().not().is_enabled(&WaitOpts::new()).await? { /* ... */ }
//!
//! // Interactions perform the node's implicit wait first.
//! button.click(Default::default()).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Diff, Error, Result};
use crate::wait::{self, WaitOpts};

use super::{NodeOpts, PageNode, ScrollParams, WaitType};

// ============================================================================
// Constants
// ============================================================================

/// Fixed cadence for click retries when the element is obscured (250 ms).
const CLICK_RETRY_INTERVAL_MS: u64 = 250;

/// Tags treated as content-less when scanning HTML fragments.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Page-context script used by [`PageElement::scroll_to`].
///
/// Resolves the target and its scroll container (an explicit selector or the
/// nearest scrollable ancestor, optionally counting hidden overflow), aligns
/// the target's box with the container's top-left plus the given offsets,
/// and reports the container's offsets before and after.
const SCROLL_SCRIPT: &str = r"
(function (selector, params) {
  function resolve(xpath) {
    return document.evaluate(
      xpath, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null
    ).singleNodeValue;
  }
  function scrollable(node, includeHidden) {
    var overflow = includeHidden ? /(auto|scroll|hidden)/ : /(auto|scroll)/;
    while (node && node !== document.documentElement) {
      var style = getComputedStyle(node);
      if (overflow.test(style.overflow + style.overflowY + style.overflowX)) {
        return node;
      }
      node = node.parentElement;
    }
    return document.documentElement;
  }
  var target = resolve(selector);
  if (!target) { return { notFound: 'element' }; }
  var container = params.container
    ? resolve(params.container)
    : scrollable(target.parentElement, params.include_hidden);
  if (!container) { return { notFound: 'container' }; }
  var before = { left: container.scrollLeft, top: container.scrollTop };
  var targetRect = target.getBoundingClientRect();
  var containerRect = container.getBoundingClientRect();
  container.scrollLeft += targetRect.left - containerRect.left + params.offset_x;
  container.scrollTop += targetRect.top - containerRect.top + params.offset_y;
  return {
    before: before,
    after: { left: container.scrollLeft, top: container.scrollTop }
  };
})(arguments[0], arguments[1]);
";

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for an element node.
pub(crate) struct ElementInner {
    /// Structural selector addressing this element.
    pub(crate) selector: String,

    /// Driver collaborator.
    pub(crate) driver: Arc<dyn Driver>,

    /// Node configuration from the store.
    pub(crate) opts: NodeOpts,

    /// Last observed expected/actual pair, for timeout messages.
    pub(crate) last_diff: Mutex<Option<Diff>>,
}

/// Options for [`PageElement::click`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickOpts {
    /// Overall timeout override in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Retry cadence override in milliseconds (default 250).
    pub retry_interval_ms: Option<u64>,

    /// Scroll into position before clicking; overrides the node's
    /// configured custom scroll.
    pub scroll: Option<ScrollParams>,
}

/// Container scroll offsets, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffsets {
    /// Horizontal scroll offset.
    pub left: f64,
    /// Vertical scroll offset.
    pub top: f64,
}

/// Before/after geometry reported by [`PageElement::scroll_to`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollReport {
    /// Offsets before the adjustment.
    pub before: ScrollOffsets,
    /// Offsets after the adjustment.
    pub after: ScrollOffsets,
}

// ============================================================================
// Condition
// ============================================================================

/// A state predicate evaluated against the driver in one round trip.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    Exists,
    IsVisible,
    IsEnabled,
    IsSelected,
    HasText(String),
    HasAnyText,
    ContainsText(String),
    HasClass(String),
    ContainsClass(String),
}

impl Condition {
    /// Condition name used in timeout messages.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::IsVisible => "isVisible",
            Self::IsEnabled => "isEnabled",
            Self::IsSelected => "isSelected",
            Self::HasText(_) => "hasText",
            Self::HasAnyText => "hasAnyText",
            Self::ContainsText(_) => "containsText",
            Self::HasClass(_) => "hasClass",
            Self::ContainsClass(_) => "containsClass",
        }
    }

    /// Expected value for the diff, when the condition carries one.
    fn expected(&self) -> Option<String> {
        match self {
            Self::HasText(t) | Self::ContainsText(t) => Some(t.clone()),
            Self::HasClass(c) | Self::ContainsClass(c) => Some(c.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// PageElement
// ============================================================================

/// A single located element.
///
/// Identity is the selector plus the node kind; instances are created and
/// cached by a [`PageNodeStore`](crate::PageNodeStore) and are cheap to
/// clone (shared inner state).
#[derive(Clone)]
pub struct PageElement {
    pub(crate) inner: Arc<ElementInner>,
}

impl fmt::Debug for PageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageElement")
            .field("selector", &self.inner.selector)
            .field("wait_type", &self.inner.opts.wait_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PageElement - Constructor
// ============================================================================

impl PageElement {
    /// Creates a new element node.
    #[must_use]
    pub fn new(selector: impl Into<String>, driver: Arc<dyn Driver>, opts: NodeOpts) -> Self {
        Self {
            inner: Arc::new(ElementInner {
                selector: selector.into(),
                driver,
                opts,
                last_diff: Mutex::new(None),
            }),
        }
    }
}

impl PageNode for PageElement {
    fn selector(&self) -> &str {
        &self.inner.selector
    }

    fn node_kind(&self) -> &'static str {
        "PageElement"
    }

    fn timeout_ms(&self) -> u64 {
        self.inner.opts.timeout_ms
    }

    fn interval_ms(&self) -> u64 {
        self.inner.opts.interval_ms
    }
}

// ============================================================================
// PageElement - Accessors
// ============================================================================

impl PageElement {
    /// Returns this element's selector.
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.inner.selector
    }

    /// Returns this element's configuration.
    #[inline]
    #[must_use]
    pub fn opts(&self) -> &NodeOpts {
        &self.inner.opts
    }

    /// Returns the driver collaborator.
    #[inline]
    #[must_use]
    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        &self.inner.driver
    }

    /// Returns `true` when both nodes share the same cached instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// PageElement - Diff Tracking
// ============================================================================

impl PageElement {
    pub(crate) fn record_diff(&self, expected: Option<String>, actual: Option<String>) {
        *self.inner.last_diff.lock() = Some(Diff { expected, actual });
    }

    pub(crate) fn take_diff(&self) -> Option<Diff> {
        self.inner.last_diff.lock().take()
    }
}

// ============================================================================
// PageElement - Condition Evaluation
// ============================================================================

impl PageElement {
    fn classify_err(&self, err: Error) -> Error {
        err.classify(self.selector(), PageNode::node_kind(self))
    }

    /// Evaluates a condition in one driver round trip, recording the diff.
    pub(crate) async fn check(&self, cond: &Condition) -> Result<bool> {
        let sel = self.selector();
        let d = &self.inner.driver;

        let held = match cond {
            Condition::Exists => d.exists(sel).await.map_err(|e| self.classify_err(e))?,
            Condition::IsVisible => d.is_visible(sel).await.map_err(|e| self.classify_err(e))?,
            Condition::IsEnabled => d.is_enabled(sel).await.map_err(|e| self.classify_err(e))?,
            Condition::IsSelected => d.is_selected(sel).await.map_err(|e| self.classify_err(e))?,
            Condition::HasText(t) => {
                let actual = d.get_text(sel).await.map_err(|e| self.classify_err(e))?;
                let held = actual == *t;
                self.record_diff(cond.expected(), Some(actual));
                return Ok(held);
            }
            Condition::HasAnyText => {
                let actual = d.get_text(sel).await.map_err(|e| self.classify_err(e))?;
                let held = !actual.is_empty();
                self.record_diff(Some("any text".into()), Some(actual));
                return Ok(held);
            }
            Condition::ContainsText(t) => {
                let actual = d.get_text(sel).await.map_err(|e| self.classify_err(e))?;
                let held = actual.contains(t.as_str());
                self.record_diff(cond.expected(), Some(actual));
                return Ok(held);
            }
            Condition::HasClass(c) => {
                let actual = self.read_class().await?.unwrap_or_default();
                let held = actual == *c;
                self.record_diff(cond.expected(), Some(actual));
                return Ok(held);
            }
            Condition::ContainsClass(c) => {
                let actual = self.read_class().await?.unwrap_or_default();
                let held = actual.split_whitespace().any(|token| token == c);
                self.record_diff(cond.expected(), Some(actual));
                return Ok(held);
            }
        };

        self.record_diff(None, Some(held.to_string()));
        Ok(held)
    }

    async fn read_class(&self) -> Result<Option<String>> {
        self.inner
            .driver
            .get_attribute(self.selector(), "class")
            .await
            .map_err(|e| self.classify_err(e))
    }

    /// Polls a condition until it holds (or its negation, with `negate`).
    pub(crate) async fn wait_for(
        &self,
        cond: Condition,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<()> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let node = self;
        let c = &cond;
        let held = wait::poll(timeout, interval, move || async move {
            Ok(node.check(c).await? != negate)
        })
        .await?;

        if held {
            Ok(())
        } else {
            let label = if negate {
                format!("not.{}", cond.name())
            } else {
                cond.name().to_string()
            };
            Err(Error::wait_timeout(
                self.selector(),
                label,
                timeout.as_millis() as u64,
                self.take_diff(),
            ))
        }
    }

    /// Polls a condition, converting timeout into `false`.
    pub(crate) async fn eventually_for(
        &self,
        cond: Condition,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let node = self;
        let c = &cond;
        wait::poll(timeout, interval, move || async move {
            Ok(node.check(c).await? != negate)
        })
        .await
    }
}

// ============================================================================
// PageElement - Modes
// ============================================================================

impl PageElement {
    /// Immediate evaluation: one driver round trip, no polling.
    #[inline]
    #[must_use]
    pub fn currently(&self) -> Currently<'_> {
        Currently { node: self }
    }

    /// Blocking evaluation: poll until true or raise
    /// [`WaitTimeout`](crate::Error::WaitTimeout).
    #[inline]
    #[must_use]
    pub fn wait(&self) -> Wait<'_> {
        Wait {
            node: self,
            negate: false,
        }
    }

    /// Blocking evaluation: poll until true, timeout becomes `false`.
    #[inline]
    #[must_use]
    pub fn eventually(&self) -> Eventually<'_> {
        Eventually {
            node: self,
            negate: false,
        }
    }
}

// ============================================================================
// PageElement - Initial Wait
// ============================================================================

impl PageElement {
    /// Performs the implicit wait implied by the node's
    /// [`WaitType`](super::WaitType).
    ///
    /// Invoked before any interaction or value retrieval so ordinary reads
    /// never race the page's asynchronous rendering.
    pub async fn initial_wait(&self) -> Result<()> {
        let opts = WaitOpts::new();
        match self.inner.opts.wait_type {
            WaitType::Exist => self.wait_for(Condition::Exists, &opts, false).await,
            WaitType::Visible => self.wait_for(Condition::IsVisible, &opts, false).await,
            WaitType::Text => self.wait_for(Condition::HasAnyText, &opts, false).await,
            WaitType::Value => Err(Error::config(format!(
                "wait type 'value' requires a value element: {}",
                self.selector()
            ))),
        }
    }
}

// ============================================================================
// PageElement - Reads
// ============================================================================

impl PageElement {
    /// Returns the element's text after the implicit wait.
    pub async fn get_text(&self) -> Result<String> {
        self.initial_wait().await?;
        self.currently().get_text().await
    }

    /// Returns only first-level text node content after the implicit wait.
    ///
    /// The driver's native text read aggregates all descendant text, which
    /// is wrong when an element contains icons or nested labels.
    pub async fn get_direct_text(&self) -> Result<String> {
        self.initial_wait().await?;
        self.currently().get_direct_text().await
    }

    /// Returns an attribute after the implicit wait.
    pub async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.initial_wait().await?;
        self.currently().get_attribute(name).await
    }

    /// Returns the class attribute after the implicit wait.
    pub async fn get_class(&self) -> Result<Option<String>> {
        self.get_attribute("class").await
    }
}

// ============================================================================
// PageElement - Interactions
// ============================================================================

impl PageElement {
    /// Clicks the element.
    ///
    /// Performs the implicit wait, scrolls into position when configured,
    /// then retries the driver click at a fixed 250 ms cadence while the
    /// driver reports the element obscured; when the timeout budget is
    /// spent, the last such error is re-raised.
    pub async fn click(&self, opts: ClickOpts) -> Result<()> {
        debug!(selector = %self.selector(), "Clicking element");
        self.initial_wait().await?;
        self.click_no_wait(&opts).await
    }

    /// Clicks, then keeps re-clicking until `post` holds or time runs out.
    ///
    /// Re-clicks only while the element is visible and enabled; a
    /// postcondition that never holds fails with
    /// [`WaitTimeout`](crate::Error::WaitTimeout).
    pub async fn click_until<F, Fut>(&self, opts: ClickOpts, mut post: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.click(opts.clone()).await?;

        let timeout_ms = opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms);
        let interval = Duration::from_millis(
            opts.retry_interval_ms
                .unwrap_or(self.inner.opts.interval_ms),
        );
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if post().await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::wait_timeout(
                    self.selector(),
                    "clickPostCondition",
                    timeout_ms,
                    None,
                ));
            }
            if self.check(&Condition::IsVisible).await? && self.check(&Condition::IsEnabled).await?
            {
                match self
                    .inner
                    .driver
                    .click(self.selector())
                    .await
                    .map_err(|e| self.classify_err(e))
                {
                    Ok(()) | Err(Error::NotClickable { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            sleep(interval).await;
        }
    }

    /// The click retry loop without the implicit wait.
    ///
    /// Value elements perform their own initial wait and then delegate here.
    pub(crate) async fn click_no_wait(&self, opts: &ClickOpts) -> Result<()> {
        let scroll = opts
            .scroll
            .as_ref()
            .or(self.inner.opts.custom_scroll.as_ref());
        if let Some(params) = scroll {
            self.scroll_to(params).await?;
        }

        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval = Duration::from_millis(
            opts.retry_interval_ms.unwrap_or(CLICK_RETRY_INTERVAL_MS),
        );
        let deadline = Instant::now() + timeout;

        loop {
            match self
                .inner
                .driver
                .click(self.selector())
                .await
                .map_err(|e| self.classify_err(e))
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_not_clickable() => {
                    if Instant::now() >= deadline {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
            sleep(interval).await;
        }
    }

    /// Scrolls the element into position inside its scroll container.
    ///
    /// Runs in the page context: resolves the container (explicit selector
    /// or nearest scrollable ancestor, honoring the hidden-overflow flag),
    /// aligns the element's box with the container's top-left plus the
    /// given offsets, and reports before/after offsets. Fails when the
    /// element or container cannot be resolved.
    pub async fn scroll_to(&self, params: &ScrollParams) -> Result<ScrollReport> {
        debug!(selector = %self.selector(), "Scrolling element into position");

        let args = vec![json!(self.selector()), serde_json::to_value(params)?];
        let result = self
            .inner
            .driver
            .execute(SCROLL_SCRIPT, args)
            .await
            .map_err(|e| self.classify_err(e))?;

        if let Some(missing) = result.get("notFound").and_then(|v| v.as_str()) {
            return Err(if missing == "container" {
                Error::config(format!(
                    "scroll container could not be resolved for {}",
                    self.selector()
                ))
            } else {
                Error::not_located(self.selector(), PageNode::node_kind(self))
            });
        }

        Ok(serde_json::from_value(result)?)
    }
}

// ============================================================================
// Currently
// ============================================================================

/// Immediate evaluation: every method is a single driver round trip.
#[derive(Clone, Copy)]
pub struct Currently<'a> {
    node: &'a PageElement,
}

impl<'a> Currently<'a> {
    pub async fn exists(self) -> Result<bool> {
        self.node.check(&Condition::Exists).await
    }

    pub async fn is_visible(self) -> Result<bool> {
        self.node.check(&Condition::IsVisible).await
    }

    pub async fn is_enabled(self) -> Result<bool> {
        self.node.check(&Condition::IsEnabled).await
    }

    pub async fn is_selected(self) -> Result<bool> {
        self.node.check(&Condition::IsSelected).await
    }

    pub async fn has_text(self, text: &str) -> Result<bool> {
        self.node.check(&Condition::HasText(text.into())).await
    }

    pub async fn has_any_text(self) -> Result<bool> {
        self.node.check(&Condition::HasAnyText).await
    }

    pub async fn contains_text(self, text: &str) -> Result<bool> {
        self.node.check(&Condition::ContainsText(text.into())).await
    }

    pub async fn has_class(self, class: &str) -> Result<bool> {
        self.node.check(&Condition::HasClass(class.into())).await
    }

    pub async fn contains_class(self, class: &str) -> Result<bool> {
        self.node
            .check(&Condition::ContainsClass(class.into()))
            .await
    }

    /// Reads the element's aggregated text without waiting.
    pub async fn get_text(self) -> Result<String> {
        self.node
            .inner
            .driver
            .get_text(self.node.selector())
            .await
            .map_err(|e| self.node.classify_err(e))
    }

    /// Reads first-level text node content without waiting.
    pub async fn get_direct_text(self) -> Result<String> {
        let html = self
            .node
            .inner
            .driver
            .get_html(self.node.selector())
            .await
            .map_err(|e| self.node.classify_err(e))?;
        Ok(first_level_text(&html))
    }

    /// Reads an attribute without waiting.
    pub async fn get_attribute(self, name: &str) -> Result<Option<String>> {
        self.node
            .inner
            .driver
            .get_attribute(self.node.selector(), name)
            .await
            .map_err(|e| self.node.classify_err(e))
    }

    /// Reads the class attribute without waiting.
    pub async fn get_class(self) -> Result<Option<String>> {
        self.get_attribute("class").await
    }
}

// ============================================================================
// Wait
// ============================================================================

/// Blocking evaluation: poll until the condition holds, then return the
/// node for chaining; raise [`WaitTimeout`](crate::Error::WaitTimeout)
/// otherwise.
#[derive(Clone, Copy)]
pub struct Wait<'a> {
    node: &'a PageElement,
    negate: bool,
}

impl<'a> Wait<'a> {
    /// The same predicates, negated: wait until the condition becomes false.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(self, cond: Condition, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.node.wait_for(cond, opts, self.negate).await?;
        Ok(self.node)
    }

    pub async fn exists(self, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::Exists, opts).await
    }

    pub async fn is_visible(self, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::IsVisible, opts).await
    }

    pub async fn is_enabled(self, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::IsEnabled, opts).await
    }

    pub async fn is_selected(self, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::IsSelected, opts).await
    }

    pub async fn has_text(self, text: &str, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::HasText(text.into()), opts).await
    }

    pub async fn has_any_text(self, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::HasAnyText, opts).await
    }

    pub async fn contains_text(self, text: &str, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::ContainsText(text.into()), opts).await
    }

    pub async fn has_class(self, class: &str, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::HasClass(class.into()), opts).await
    }

    pub async fn contains_class(self, class: &str, opts: &WaitOpts) -> Result<&'a PageElement> {
        self.run(Condition::ContainsClass(class.into()), opts).await
    }
}

// ============================================================================
// Eventually
// ============================================================================

/// Blocking evaluation: poll until the condition holds; a timeout is the
/// answer `false` rather than an error. A not-located element still raises.
#[derive(Clone, Copy)]
pub struct Eventually<'a> {
    node: &'a PageElement,
    negate: bool,
}

impl Eventually<'_> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(self, cond: Condition, opts: &WaitOpts) -> Result<bool> {
        self.node.eventually_for(cond, opts, self.negate).await
    }

    pub async fn exists(self, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::Exists, opts).await
    }

    pub async fn is_visible(self, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::IsVisible, opts).await
    }

    pub async fn is_enabled(self, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::IsEnabled, opts).await
    }

    pub async fn is_selected(self, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::IsSelected, opts).await
    }

    pub async fn has_text(self, text: &str, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::HasText(text.into()), opts).await
    }

    pub async fn has_any_text(self, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::HasAnyText, opts).await
    }

    pub async fn contains_text(self, text: &str, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::ContainsText(text.into()), opts).await
    }

    pub async fn has_class(self, class: &str, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::HasClass(class.into()), opts).await
    }

    pub async fn contains_class(self, class: &str, opts: &WaitOpts) -> Result<bool> {
        self.run(Condition::ContainsClass(class.into()), opts).await
    }
}

// ============================================================================
// Fragment Scanning
// ============================================================================

/// Extracts first-level text node content from an HTML fragment.
///
/// Tracks element depth through the fragment and keeps only text at depth
/// zero, so descendant elements' text is excluded. Comments, void tags and
/// self-closing tags do not change depth.
#[must_use]
pub fn first_level_text(html: &str) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(lt) = rest.find('<') {
            if depth == 0 {
                out.push_str(&rest[..lt]);
            }
            rest = &rest[lt..];

            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => rest = &rest[end + 3..],
                    None => break,
                }
                continue;
            }

            let Some(gt) = rest.find('>') else { break };
            let tag = &rest[1..gt];
            rest = &rest[gt + 1..];

            if tag.starts_with('/') {
                depth = depth.saturating_sub(1);
            } else {
                let name: String = tag
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                let self_closing = tag.ends_with('/');
                if !self_closing && !VOID_TAGS.contains(&name.as_str()) {
                    depth += 1;
                }
            }
        } else {
            if depth == 0 {
                out.push_str(rest);
            }
            break;
        }
    }

    decode_entities(&out)
}

/// Decodes the handful of entities that matter for text comparison.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::mock::{MockDriver, MockElement};

    fn element(driver: &MockDriver, selector: &str) -> PageElement {
        let opts = NodeOpts::new(100, 10);
        PageElement::new(selector, Arc::new(driver.clone()), opts)
    }

    // ------------------------------------------------------------------
    // currently
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_currently_predicates() {
        let driver = MockDriver::new();
        driver.insert(
            "//div",
            MockElement::new()
                .with_text("Hello World")
                .with_attribute("class", "panel active"),
        );

        let el = element(&driver, "//div");
        assert!(el.currently().exists().await.unwrap());
        assert!(el.currently().is_visible().await.unwrap());
        assert!(el.currently().has_text("Hello World").await.unwrap());
        assert!(!el.currently().has_text("Hello").await.unwrap());
        assert!(el.currently().contains_text("World").await.unwrap());
        assert!(el.currently().has_any_text().await.unwrap());
        assert!(el.currently().has_class("panel active").await.unwrap());
        assert!(!el.currently().has_class("panel").await.unwrap());
        assert!(el.currently().contains_class("active").await.unwrap());
        assert!(!el.currently().contains_class("act").await.unwrap());
    }

    #[tokio::test]
    async fn test_currently_get_text_idempotent() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().with_text("stable"));

        let el = element(&driver, "//div");
        assert_eq!(el.currently().get_text().await.unwrap(), "stable");
        assert_eq!(el.currently().get_text().await.unwrap(), "stable");
    }

    #[tokio::test]
    async fn test_currently_missing_element_is_not_located() {
        let driver = MockDriver::new();
        let el = element(&driver, "//missing");

        let err = el.currently().get_text().await.unwrap_err();
        assert!(err.is_not_located());
        assert!(err.to_string().contains("//missing"));
    }

    // ------------------------------------------------------------------
    // wait
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_wait_succeeds_immediately_for_true_state() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().with_text("x"));

        let el = element(&driver, "//div");
        // T = 0 must still succeed for an already-true condition.
        el.wait()
            .exists(&WaitOpts::new().with_timeout_ms(0))
            .await
            .unwrap();
        el.wait().has_text("x", &WaitOpts::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_succeeds_after_delay() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().with_text(""));
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//div").unwrap().text = "loaded".into();
        });

        let el = element(&driver, "//div");
        el.wait()
            .has_text("loaded", &WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_timeout_carries_selector_and_diff() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().with_text("actual text"));

        let el = element(&driver, "//div");
        let err = el
            .wait()
            .has_text("wanted text", &WaitOpts::new().with_timeout_ms(30))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("//div"));
        assert!(msg.contains("30ms"));
        assert!(msg.contains("wanted text"));
        assert!(msg.contains("actual text"));
    }

    #[tokio::test]
    async fn test_wait_not_inverts_condition() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//div").unwrap().visible = false;
        });

        let el = element(&driver, "//div");
        el.wait()
            .not()
            .is_visible(&WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
    }

    // ------------------------------------------------------------------
    // eventually
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_eventually_true_within_budget() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().hidden());
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//div").unwrap().visible = true;
        });

        let el = element(&driver, "//div");
        let visible = el
            .eventually()
            .is_visible(&WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
        assert!(visible);
    }

    #[tokio::test]
    async fn test_eventually_false_on_timeout() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new().hidden());

        let el = element(&driver, "//div");
        let visible = el
            .eventually()
            .is_visible(&WaitOpts::new().with_timeout_ms(30))
            .await
            .unwrap();
        assert!(!visible);
    }

    #[tokio::test]
    async fn test_eventually_not_located_still_raises() {
        let driver = MockDriver::new();
        let el = element(&driver, "//missing");

        let err = el
            .eventually()
            .is_visible(&WaitOpts::new().with_timeout_ms(30))
            .await
            .unwrap_err();
        assert!(err.is_not_located());
    }

    // ------------------------------------------------------------------
    // click
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_click_performs_initial_wait() {
        let driver = MockDriver::new();
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.insert("//btn".into(), MockElement::new());
        });

        let el = element(&driver, "//btn");
        el.click(ClickOpts::default()).await.unwrap();
        assert_eq!(driver.clicks("//btn"), 1);
    }

    #[tokio::test]
    async fn test_click_retries_while_obscured() {
        let driver = MockDriver::new();
        driver.insert("//btn", MockElement::new().obscured());
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//btn").unwrap().clickable = true;
        });

        let el = element(&driver, "//btn");
        el.click(ClickOpts {
            timeout_ms: Some(500),
            retry_interval_ms: Some(10),
            scroll: None,
        })
        .await
        .unwrap();
        assert_eq!(driver.clicks("//btn"), 1);
    }

    #[tokio::test]
    async fn test_click_reraises_last_obscured_error_on_timeout() {
        let driver = MockDriver::new();
        driver.insert("//btn", MockElement::new().obscured());

        let el = element(&driver, "//btn");
        let err = el
            .click(ClickOpts {
                timeout_ms: Some(30),
                retry_interval_ms: Some(10),
                scroll: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_clickable());
        assert_eq!(driver.clicks("//btn"), 0);
    }

    #[tokio::test]
    async fn test_click_until_reclicks_until_postcondition() {
        let driver = MockDriver::new();
        driver.insert("//btn", MockElement::new());

        let el = element(&driver, "//btn");
        let d = driver.clone();
        el.click_until(
            ClickOpts {
                timeout_ms: Some(500),
                retry_interval_ms: Some(10),
                scroll: None,
            },
            move || {
                let d = d.clone();
                async move { Ok(d.clicks("//btn") >= 3) }
            },
        )
        .await
        .unwrap();
        assert!(driver.clicks("//btn") >= 3);
    }

    // ------------------------------------------------------------------
    // scroll
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_scroll_to_reports_geometry() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());
        driver.set_script_result(serde_json::json!({
            "before": {"left": 0.0, "top": 0.0},
            "after": {"left": 0.0, "top": 120.0},
        }));

        let el = element(&driver, "//div");
        let report = el.scroll_to(&ScrollParams::default()).await.unwrap();
        assert_eq!(report.after.top, 120.0);
        assert_eq!(driver.executed_scripts().len(), 1);
    }

    #[tokio::test]
    async fn test_scroll_to_unresolved_element() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());
        driver.set_script_result(serde_json::json!({"notFound": "element"}));

        let el = element(&driver, "//div");
        let err = el.scroll_to(&ScrollParams::default()).await.unwrap_err();
        assert!(err.is_not_located());
    }

    #[tokio::test]
    async fn test_scroll_to_unresolved_container() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());
        driver.set_script_result(serde_json::json!({"notFound": "container"}));

        let el = element(&driver, "//div");
        let err = el.scroll_to(&ScrollParams::default()).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    // ------------------------------------------------------------------
    // direct text
    // ------------------------------------------------------------------

    #[test]
    fn test_first_level_text_excludes_descendants() {
        assert_eq!(first_level_text("Hello<span>World</span>"), "Hello");
    }

    #[test]
    fn test_first_level_text_around_children() {
        assert_eq!(
            first_level_text("Start <b>bold</b> middle <i>italic</i> end"),
            "Start  middle  end"
        );
    }

    #[test]
    fn test_first_level_text_nested_and_void() {
        assert_eq!(first_level_text("a<div>x<span>y</span>z</div>b"), "ab");
        assert_eq!(first_level_text("a<br>b<img src='x'>c"), "abc");
        assert_eq!(first_level_text("a<br/>b"), "ab");
    }

    #[test]
    fn test_first_level_text_comments_and_entities() {
        assert_eq!(first_level_text("a<!-- <span>hidden</span> -->b"), "ab");
        assert_eq!(first_level_text("Tom &amp; Jerry&#39;s"), "Tom & Jerry's");
    }

    #[tokio::test]
    async fn test_get_direct_text() {
        let driver = MockDriver::new();
        driver.insert(
            "//div",
            MockElement::new().with_html("Hello<span>World</span>"),
        );

        let el = element(&driver, "//div");
        assert_eq!(el.get_direct_text().await.unwrap(), "Hello");
    }

    // ------------------------------------------------------------------
    // initial wait
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_initial_wait_text_blocks_until_text() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//div").unwrap().text = "ready".into();
        });

        let opts = NodeOpts::new(500, 10).with_wait_type(WaitType::Text);
        let el = PageElement::new("//div", Arc::new(driver.clone()), opts);
        assert_eq!(el.get_text().await.unwrap(), "ready");
    }

    #[tokio::test]
    async fn test_initial_wait_value_on_plain_element_is_config_error() {
        let driver = MockDriver::new();
        driver.insert("//div", MockElement::new());

        let opts = NodeOpts::new(100, 10).with_wait_type(WaitType::Value);
        let el = PageElement::new("//div", Arc::new(driver.clone()), opts);
        let err = el.get_text().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
