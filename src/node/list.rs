//! Ordered element collections materialized from the driver at query time.
//!
//! A [`PageElementList`] owns a base selector matching any number of
//! elements. Membership is never persisted: every query re-counts the
//! matches and addresses member `i` through the one-based positional
//! selector `({base})[i + 1]`, so the list always reflects the live page.
//! `get_at` stays zero-based like any other collection index; only the
//! selector grammar is one-based.
//!
//! Lists can additionally be given an [`Identifier`], which assigns stable
//! logical keys to members by matching each key's mapping entry against the
//! live members. Key-based access and group traversal into lists require
//! identification to have been configured.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Diff, Error, Result};
use crate::wait::{self, WaitOpts};

use super::element::PageElement;
use super::value::{ValuePageElement, json_contains, values_equal};
use super::{Leaf, LeafKind, NodeOpts, PageNode};

// ============================================================================
// Comparator
// ============================================================================

/// Length comparison for list-level predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Comparator {
    /// Length equals the expectation.
    #[default]
    EqualTo,
    /// Length differs from the expectation.
    NotEqualTo,
    /// Length is strictly less.
    LessThan,
    /// Length is strictly greater.
    GreaterThan,
    /// Length is less than or equal.
    AtMost,
    /// Length is greater than or equal.
    AtLeast,
}

impl Comparator {
    fn holds(self, actual: usize, expected: usize) -> bool {
        match self {
            Self::EqualTo => actual == expected,
            Self::NotEqualTo => actual != expected,
            Self::LessThan => actual < expected,
            Self::GreaterThan => actual > expected,
            Self::AtMost => actual <= expected,
            Self::AtLeast => actual >= expected,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::EqualTo => "==",
            Self::NotEqualTo => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::AtMost => "<=",
            Self::AtLeast => ">=",
        }
    }
}

// ============================================================================
// ListValues
// ============================================================================

/// Values for a list-wide bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ListValues {
    /// One value applied to (or expected of) every member.
    Single(JsonValue),
    /// One value per member, in list order; the length must equal the
    /// list's current size.
    Each(Vec<JsonValue>),
}

impl ListValues {
    /// Resolves the value for member `index` out of `len` members.
    fn get(&self, index: usize) -> &JsonValue {
        match self {
            Self::Single(v) => v,
            Self::Each(vs) => &vs[index],
        }
    }

    /// Validates this value set against the list's current size.
    fn check_len(&self, len: usize, selector: &str) -> Result<()> {
        match self {
            Self::Single(_) => Ok(()),
            Self::Each(vs) if vs.len() == len => Ok(()),
            Self::Each(vs) => Err(Error::config(format!(
                "value count {} does not match list length {} for {selector}",
                vs.len(),
                len
            ))),
        }
    }
}

// ============================================================================
// Identifier
// ============================================================================

/// Matches one live list member against one key-mapping entry.
pub type MatcherFn =
    dyn for<'a> Fn(&'a Leaf, &'a JsonValue) -> BoxFuture<'a, Result<bool>> + Send + Sync;

/// Assigns stable logical keys to list members.
///
/// The mapping pairs each logical key with an opaque matching value; during
/// [`PageElementList::identify`] every key claims the first unclaimed member
/// the matcher accepts.
#[derive(Clone)]
pub struct Identifier {
    mapping: Vec<(String, JsonValue)>,
    matcher: Arc<MatcherFn>,
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identifier")
            .field("keys", &self.mapping.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Identifier {
    /// Creates an identifier with a custom matcher.
    #[must_use]
    pub fn new(mapping: Vec<(String, JsonValue)>, matcher: Arc<MatcherFn>) -> Self {
        Self { mapping, matcher }
    }

    /// Creates an identifier that matches members by exact text.
    #[must_use]
    pub fn by_text(mapping: Vec<(String, JsonValue)>) -> Self {
        Self::new(
            mapping,
            Arc::new(|leaf: &Leaf, value: &JsonValue| {
                async move {
                    let text = leaf.element().currently().get_text().await?;
                    Ok(match value {
                        JsonValue::String(s) => text == *s,
                        other => text == other.to_string(),
                    })
                }
                .boxed()
            }),
        )
    }

    /// Logical keys in declaration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.mapping.iter().map(|(k, _)| k.clone()).collect()
    }
}

// ============================================================================
// PageElementList
// ============================================================================

struct ListInner {
    selector: String,
    driver: Arc<dyn Driver>,
    opts: NodeOpts,
    kind: LeafKind,
    identifier: Mutex<Option<Identifier>>,
    identified: Mutex<Option<FxHashMap<String, usize>>>,
}

/// An ordered sequence of element-shaped members sharing one base selector.
///
/// Cheap to clone; clones share identification state.
#[derive(Clone)]
pub struct PageElementList {
    inner: Arc<ListInner>,
}

impl fmt::Debug for PageElementList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageElementList")
            .field("selector", &self.inner.selector)
            .field("kind", &self.inner.kind)
            .field("identified", &self.inner.identified.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl PageNode for PageElementList {
    fn selector(&self) -> &str {
        &self.inner.selector
    }

    fn node_kind(&self) -> &'static str {
        "PageElementList"
    }

    fn timeout_ms(&self) -> u64 {
        self.inner.opts.timeout_ms
    }

    fn interval_ms(&self) -> u64 {
        self.inner.opts.interval_ms
    }
}

// ============================================================================
// PageElementList - Construction and Membership
// ============================================================================

impl PageElementList {
    /// Creates a list over `selector`, materializing members of `kind`.
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        driver: Arc<dyn Driver>,
        opts: NodeOpts,
        kind: LeafKind,
    ) -> Self {
        Self {
            inner: Arc::new(ListInner {
                selector: selector.into(),
                driver,
                opts,
                kind,
                identifier: Mutex::new(None),
                identified: Mutex::new(None),
            }),
        }
    }

    /// Returns this list's base selector.
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.inner.selector
    }

    /// Returns `true` when both nodes share the same cached instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Positional selector for member `index` (zero-based); the selector
    /// grammar itself counts from one.
    #[must_use]
    pub fn member_selector(&self, index: usize) -> String {
        format!("({})[{}]", self.inner.selector, index + 1)
    }

    /// Returns the member at `index` (zero-based) without touching the
    /// driver; resolution happens on first use.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Leaf {
        let selector = self.member_selector(index);
        match self.inner.kind {
            LeafKind::Element => Leaf::Element(PageElement::new(
                selector,
                Arc::clone(&self.inner.driver),
                self.inner.opts.clone(),
            )),
            LeafKind::Value => Leaf::Value(ValuePageElement::new(
                selector,
                Arc::clone(&self.inner.driver),
                self.inner.opts.clone(),
            )),
        }
    }

    /// Returns the first member.
    #[must_use]
    pub fn first(&self) -> Leaf {
        self.get_at(0)
    }

    /// Returns the current number of matches.
    pub async fn len(&self) -> Result<usize> {
        self.inner
            .driver
            .count(&self.inner.selector)
            .await
            .map_err(|e| e.classify(self.selector(), PageNode::node_kind(self)))
    }

    /// Returns whether the list currently matches nothing.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Materializes every current member, in driver-return order.
    pub async fn all(&self) -> Result<Vec<Leaf>> {
        let len = self.len().await?;
        Ok((0..len).map(|i| self.get_at(i)).collect())
    }
}

// ============================================================================
// PageElementList - Identification
// ============================================================================

impl PageElementList {
    /// Configures the identifier and discards any previous identification.
    pub fn set_identifier(&self, identifier: Identifier) {
        *self.inner.identifier.lock() = Some(identifier);
        *self.inner.identified.lock() = None;
    }

    /// Returns the configured identifier, if any.
    #[must_use]
    pub fn identifier(&self) -> Option<Identifier> {
        self.inner.identifier.lock().clone()
    }

    /// Maps logical keys to member indices using the configured identifier.
    ///
    /// Each key claims the first unclaimed member its mapping entry matches;
    /// unmatched keys are simply absent from the result. The result is
    /// cached until `reset` is passed or the identifier changes. Fails fast
    /// with [`Config`](crate::Error::Config) when no identifier is set.
    pub async fn identify(&self, reset: bool) -> Result<FxHashMap<String, usize>> {
        let identifier = self.identifier().ok_or_else(|| {
            Error::config(format!(
                "list identification requires an identifier: {}",
                self.selector()
            ))
        })?;

        if !reset {
            if let Some(cached) = self.inner.identified.lock().clone() {
                return Ok(cached);
            }
        }

        debug!(selector = %self.selector(), "Identifying list members");

        let members = self.all().await?;
        let mut claimed = vec![false; members.len()];
        let mut resolved = FxHashMap::default();

        for (key, value) in &identifier.mapping {
            for (index, member) in members.iter().enumerate() {
                if claimed[index] {
                    continue;
                }
                if (identifier.matcher)(member, value).await? {
                    claimed[index] = true;
                    resolved.insert(key.clone(), index);
                    break;
                }
            }
        }

        *self.inner.identified.lock() = Some(resolved.clone());
        Ok(resolved)
    }

    /// Returns the member identified by `key`.
    ///
    /// Uses the cached identification when present; a key no identification
    /// round has matched fails with
    /// [`UnmatchedKey`](crate::Error::UnmatchedKey).
    pub async fn by_key(&self, key: &str) -> Result<Leaf> {
        let resolved = self.identify(false).await?;
        resolved
            .get(key)
            .map(|&index| self.get_at(index))
            .ok_or_else(|| Error::unmatched_key(key, format!("list '{}'", self.selector())))
    }
}

// ============================================================================
// PageElementList - Bulk Reads
// ============================================================================

impl PageElementList {
    /// Members selected by an optional positional mask.
    ///
    /// A `false` or missing mask entry excludes the member from the result
    /// entirely, preserving relative order of the rest.
    async fn masked(&self, filter: Option<&[bool]>) -> Result<Vec<Leaf>> {
        let members = self.all().await?;
        Ok(members
            .into_iter()
            .enumerate()
            .filter(|(i, _)| filter.is_none_or(|mask| mask.get(*i).copied().unwrap_or(false)))
            .map(|(_, leaf)| leaf)
            .collect())
    }

    /// Reads every selected member's text, in DOM-retrieval order, after
    /// each member's own implicit wait.
    pub async fn get_text_all(&self, filter: Option<&[bool]>) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for leaf in self.masked(filter).await? {
            out.push(leaf.get_text().await?);
        }
        Ok(out)
    }

    /// Reads every selected member's value, in DOM-retrieval order.
    ///
    /// Requires a value-member list.
    pub async fn get_value_all(&self, filter: Option<&[bool]>) -> Result<Vec<JsonValue>> {
        let mut out = Vec::new();
        for leaf in self.masked(filter).await? {
            out.push(self.require_value(&leaf)?.get_value().await?);
        }
        Ok(out)
    }

    fn require_value<'a>(&self, leaf: &'a Leaf) -> Result<&'a ValuePageElement> {
        leaf.value().ok_or_else(|| {
            Error::unsupported(
                "getValue",
                format!("PageElementList '{}'", self.selector()),
            )
        })
    }
}

// ============================================================================
// PageElementList - Bulk Writes and Expectations
// ============================================================================

impl PageElementList {
    /// Sets every member's value.
    ///
    /// [`ListValues::Each`] must carry exactly one value per current member;
    /// a length mismatch fails before any member is touched.
    pub async fn set_value_all(&self, values: &ListValues) -> Result<()> {
        let members = self.all().await?;
        values.check_len(members.len(), self.selector())?;

        for (index, leaf) in members.iter().enumerate() {
            self.require_value(leaf)?
                .set_value(values.get(index))
                .await?;
        }
        Ok(())
    }

    /// Whether every member's text equals its expected value.
    pub async fn has_text_all(&self, expected: &ListValues) -> Result<bool> {
        let members = self.all().await?;
        expected.check_len(members.len(), self.selector())?;

        for (index, leaf) in members.iter().enumerate() {
            let text = leaf.element().currently().get_text().await?;
            let want = expected.get(index);
            let matches = match want {
                JsonValue::String(s) => text == *s,
                other => text == other.to_string(),
            };
            if !matches {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every member has non-empty text.
    pub async fn has_any_text_all(&self) -> Result<bool> {
        for leaf in self.all().await? {
            if leaf.element().currently().get_text().await?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every member's value equals its expected value, optionally
    /// within a numeric tolerance.
    pub async fn has_value_all(
        &self,
        expected: &ListValues,
        tolerance: Option<f64>,
    ) -> Result<bool> {
        let members = self.all().await?;
        expected.check_len(members.len(), self.selector())?;

        for (index, leaf) in members.iter().enumerate() {
            let actual = self.require_value(leaf)?.currently().get_value().await?;
            if !values_equal(&actual, expected.get(index), tolerance) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every member's value structurally contains its expectation.
    pub async fn contains_value_all(&self, expected: &ListValues) -> Result<bool> {
        let members = self.all().await?;
        expected.check_len(members.len(), self.selector())?;

        for (index, leaf) in members.iter().enumerate() {
            let actual = self.require_value(leaf)?.currently().get_value().await?;
            if !json_contains(&actual, expected.get(index)) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ============================================================================
// PageElementList - Modes
// ============================================================================

/// A list-level aggregated condition over member texts or values.
#[derive(Clone, Copy)]
enum ListCondition<'v> {
    HasText(&'v ListValues),
    HasAnyText,
    HasValue(&'v ListValues, Option<f64>),
    ContainsValue(&'v ListValues),
}

impl ListCondition<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::HasText(_) => "hasText",
            Self::HasAnyText => "hasAnyText",
            Self::HasValue(..) => "hasValue",
            Self::ContainsValue(_) => "containsValue",
        }
    }

    fn expected(&self) -> Option<String> {
        let values = match self {
            Self::HasText(v) | Self::HasValue(v, _) | Self::ContainsValue(v) => v,
            Self::HasAnyText => return None,
        };
        Some(match values {
            ListValues::Single(v) => v.to_string(),
            ListValues::Each(vs) => JsonValue::Array(vs.clone()).to_string(),
        })
    }

    fn reads_text(&self) -> bool {
        matches!(self, Self::HasText(_) | Self::HasAnyText)
    }
}

impl PageElementList {
    /// Immediate evaluation of list-level predicates.
    #[inline]
    #[must_use]
    pub fn currently(&self) -> ListCurrently<'_> {
        ListCurrently { list: self }
    }

    /// Blocking evaluation; timeout raises.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> ListWait<'_> {
        ListWait {
            list: self,
            negate: false,
        }
    }

    /// Blocking evaluation; timeout is `false`.
    #[inline]
    #[must_use]
    pub fn eventually(&self) -> ListEventually<'_> {
        ListEventually {
            list: self,
            negate: false,
        }
    }

    async fn poll_length(
        &self,
        expected: usize,
        comparator: Comparator,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let list = self;
        wait::poll(timeout, interval, move || async move {
            Ok(comparator.holds(list.len().await?, expected) != negate)
        })
        .await
    }

    async fn length_timeout(
        &self,
        expected: usize,
        comparator: Comparator,
        opts: &WaitOpts,
        negate: bool,
    ) -> Error {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms);
        let actual = match self.len().await {
            Ok(n) => Some(n.to_string()),
            Err(_) => None,
        };
        let label = if negate { "not.hasLength" } else { "hasLength" };
        Error::wait_timeout(
            self.selector(),
            label,
            timeout_ms,
            Some(Diff {
                expected: Some(format!("{} {expected}", comparator.symbol())),
                actual,
            }),
        )
    }

    async fn check_aggregated(&self, cond: &ListCondition<'_>) -> Result<bool> {
        match cond {
            ListCondition::HasText(expected) => self.has_text_all(expected).await,
            ListCondition::HasAnyText => self.has_any_text_all().await,
            ListCondition::HasValue(expected, tolerance) => {
                self.has_value_all(expected, *tolerance).await
            }
            ListCondition::ContainsValue(expected) => self.contains_value_all(expected).await,
        }
    }

    async fn poll_aggregated(
        &self,
        cond: &ListCondition<'_>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let list = self;
        wait::poll(timeout, interval, move || async move {
            Ok(list.check_aggregated(cond).await? != negate)
        })
        .await
    }

    async fn aggregated_timeout(
        &self,
        cond: &ListCondition<'_>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Error {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms);
        let actual = if cond.reads_text() {
            self.get_text_all(None)
                .await
                .ok()
                .map(|texts| format!("{texts:?}"))
        } else {
            self.get_value_all(None)
                .await
                .ok()
                .map(|values| JsonValue::Array(values).to_string())
        };
        let label = if negate {
            format!("not.{}", cond.name())
        } else {
            cond.name().to_string()
        };
        Error::wait_timeout(
            self.selector(),
            label,
            timeout_ms,
            Some(Diff {
                expected: cond.expected(),
                actual,
            }),
        )
    }
}

/// Immediate list-level predicates.
#[derive(Clone, Copy)]
pub struct ListCurrently<'a> {
    list: &'a PageElementList,
}

impl ListCurrently<'_> {
    pub async fn has_length(self, expected: usize, comparator: Comparator) -> Result<bool> {
        Ok(comparator.holds(self.list.len().await?, expected))
    }

    pub async fn is_empty(self) -> Result<bool> {
        self.list.is_empty().await
    }
}

/// Blocking list-level predicates; timeout raises.
#[derive(Clone, Copy)]
pub struct ListWait<'a> {
    list: &'a PageElementList,
    negate: bool,
}

impl<'a> ListWait<'a> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    pub async fn has_length(
        self,
        expected: usize,
        comparator: Comparator,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementList> {
        if self
            .list
            .poll_length(expected, comparator, opts, self.negate)
            .await?
        {
            Ok(self.list)
        } else {
            Err(self
                .list
                .length_timeout(expected, comparator, opts, self.negate)
                .await)
        }
    }

    pub async fn is_empty(self, opts: &WaitOpts) -> Result<&'a PageElementList> {
        self.has_length(0, Comparator::EqualTo, opts).await
    }

    async fn run(
        self,
        cond: ListCondition<'_>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementList> {
        if self.list.poll_aggregated(&cond, opts, self.negate).await? {
            Ok(self.list)
        } else {
            Err(self
                .list
                .aggregated_timeout(&cond, opts, self.negate)
                .await)
        }
    }

    pub async fn has_text(
        self,
        expected: &ListValues,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementList> {
        self.run(ListCondition::HasText(expected), opts).await
    }

    pub async fn has_any_text(self, opts: &WaitOpts) -> Result<&'a PageElementList> {
        self.run(ListCondition::HasAnyText, opts).await
    }

    pub async fn has_value(
        self,
        expected: &ListValues,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementList> {
        self.run(ListCondition::HasValue(expected, tolerance), opts)
            .await
    }

    pub async fn contains_value(
        self,
        expected: &ListValues,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementList> {
        self.run(ListCondition::ContainsValue(expected), opts).await
    }
}

/// Blocking list-level predicates; timeout is `false`.
#[derive(Clone, Copy)]
pub struct ListEventually<'a> {
    list: &'a PageElementList,
    negate: bool,
}

impl ListEventually<'_> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    pub async fn has_length(
        self,
        expected: usize,
        comparator: Comparator,
        opts: &WaitOpts,
    ) -> Result<bool> {
        self.list
            .poll_length(expected, comparator, opts, self.negate)
            .await
    }

    pub async fn is_empty(self, opts: &WaitOpts) -> Result<bool> {
        self.has_length(0, Comparator::EqualTo, opts).await
    }

    pub async fn has_text(self, expected: &ListValues, opts: &WaitOpts) -> Result<bool> {
        self.list
            .poll_aggregated(&ListCondition::HasText(expected), opts, self.negate)
            .await
    }

    pub async fn has_any_text(self, opts: &WaitOpts) -> Result<bool> {
        self.list
            .poll_aggregated(&ListCondition::HasAnyText, opts, self.negate)
            .await
    }

    pub async fn has_value(
        self,
        expected: &ListValues,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<bool> {
        self.list
            .poll_aggregated(
                &ListCondition::HasValue(expected, tolerance),
                opts,
                self.negate,
            )
            .await
    }

    pub async fn contains_value(self, expected: &ListValues, opts: &WaitOpts) -> Result<bool> {
        self.list
            .poll_aggregated(&ListCondition::ContainsValue(expected), opts, self.negate)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::driver::mock::{MockDriver, MockElement};

    /// Seeds a base selector with `texts.len()` members carrying the given
    /// text and value pairs.
    fn seed_list(driver: &MockDriver, base: &str, entries: &[(&str, &str)]) {
        driver.insert(base, MockElement::new().with_count(entries.len()));
        for (i, (text, value)) in entries.iter().enumerate() {
            driver.insert(
                format!("({base})[{}]", i + 1),
                MockElement::new().with_text(*text).with_value(*value),
            );
        }
    }

    fn list(driver: &MockDriver, base: &str, kind: LeafKind) -> PageElementList {
        PageElementList::new(base, Arc::new(driver.clone()), NodeOpts::new(100, 10), kind)
    }

    // ------------------------------------------------------------------
    // membership
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_member_selectors_are_one_based() {
        let driver = MockDriver::new();
        let l = list(&driver, "//li", LeafKind::Element);

        assert_eq!(l.member_selector(0), "(//li)[1]");
        assert_eq!(l.member_selector(2), "(//li)[3]");
        // get_at itself stays zero-based.
        assert_eq!(l.get_at(0).selector(), "(//li)[1]");
    }

    #[tokio::test]
    async fn test_len_tracks_live_count() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", ""), ("b", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        assert_eq!(l.len().await.unwrap(), 2);
        assert!(!l.is_empty().await.unwrap());

        driver.update("//li", |e| e.count = 0);
        assert_eq!(l.len().await.unwrap(), 0);
        assert!(l.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_text_all_in_order() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("one", ""), ("two", ""), ("three", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        assert_eq!(
            l.get_text_all(None).await.unwrap(),
            vec!["one", "two", "three"]
        );
    }

    #[tokio::test]
    async fn test_filter_mask_excludes_members() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("one", ""), ("two", ""), ("three", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        // Missing trailing mask entries exclude, same as false.
        assert_eq!(
            l.get_text_all(Some(&[true, false])).await.unwrap(),
            vec!["one"]
        );
    }

    // ------------------------------------------------------------------
    // values
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_set_value_single_applies_to_all() {
        let driver = MockDriver::new();
        seed_list(&driver, "//input", &[("", "a"), ("", "b")]);

        let l = list(&driver, "//input", LeafKind::Value);
        l.set_value_all(&ListValues::Single(json!("x"))).await.unwrap();
        assert_eq!(
            l.get_value_all(None).await.unwrap(),
            vec![json!("x"), json!("x")]
        );
    }

    #[tokio::test]
    async fn test_set_value_each_length_mismatch_is_hard_error() {
        let driver = MockDriver::new();
        seed_list(&driver, "//input", &[("", "a"), ("", "b"), ("", "c")]);

        let l = list(&driver, "//input", LeafKind::Value);
        let err = l
            .set_value_all(&ListValues::Each(vec![json!("x"), json!("y")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        // Nothing was partially applied.
        assert_eq!(
            l.get_value_all(None).await.unwrap(),
            vec![json!("a"), json!("b"), json!("c")]
        );
    }

    #[tokio::test]
    async fn test_value_ops_on_plain_list_are_unsupported() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("x", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        let err = l.get_value_all(None).await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_has_value_all_with_tolerance() {
        let driver = MockDriver::new();
        seed_list(&driver, "//input", &[("", "10"), ("", "20")]);

        let l = list(&driver, "//input", LeafKind::Value);
        let expected = ListValues::Each(vec![json!(11), json!(19)]);
        assert!(!l.has_value_all(&expected, None).await.unwrap());
        assert!(l.has_value_all(&expected, Some(1.0)).await.unwrap());
    }

    // ------------------------------------------------------------------
    // identification
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_identify_requires_identifier() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        let err = l.by_key("a").await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_identify_by_text_and_by_key() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("Apples", ""), ("Pears", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        l.set_identifier(Identifier::by_text(vec![
            ("pears".into(), json!("Pears")),
            ("apples".into(), json!("Apples")),
        ]));

        let resolved = l.identify(false).await.unwrap();
        assert_eq!(resolved["apples"], 0);
        assert_eq!(resolved["pears"], 1);

        assert_eq!(l.by_key("pears").await.unwrap().selector(), "(//li)[2]");
    }

    #[tokio::test]
    async fn test_by_key_unmatched_key() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("Apples", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        l.set_identifier(Identifier::by_text(vec![("apples".into(), json!("Apples"))]));

        let err = l.by_key("mangoes").await.unwrap_err();
        assert!(matches!(err, Error::UnmatchedKey { .. }));
        assert!(err.to_string().contains("mangoes"));
    }

    #[tokio::test]
    async fn test_identify_caches_until_reset() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("A", ""), ("B", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        l.set_identifier(Identifier::by_text(vec![
            ("a".into(), json!("A")),
            ("b".into(), json!("B")),
        ]));

        assert_eq!(l.identify(false).await.unwrap()["a"], 0);

        // Members swap places; the cached identification still answers.
        driver.update("(//li)[1]", |e| e.text = "B".into());
        driver.update("(//li)[2]", |e| e.text = "A".into());
        assert_eq!(l.identify(false).await.unwrap()["a"], 0);

        // A reset re-reads the page.
        assert_eq!(l.identify(true).await.unwrap()["a"], 1);
    }

    // ------------------------------------------------------------------
    // length predicates
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_currently_has_length_comparators() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", ""), ("b", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        let c = l.currently();
        assert!(c.has_length(2, Comparator::EqualTo).await.unwrap());
        assert!(c.has_length(3, Comparator::LessThan).await.unwrap());
        assert!(c.has_length(1, Comparator::GreaterThan).await.unwrap());
        assert!(c.has_length(2, Comparator::AtLeast).await.unwrap());
        assert!(!c.has_length(2, Comparator::NotEqualTo).await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_has_length_after_growth() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", "")]);
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//li").unwrap().count = 3;
        });

        let l = list(&driver, "//li", LeafKind::Element);
        l.wait()
            .has_length(
                3,
                Comparator::EqualTo,
                &WaitOpts::new().with_timeout_ms(500),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_has_length_timeout_reports_counts() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", "")]);

        let l = list(&driver, "//li", LeafKind::Element);
        let err = l
            .wait()
            .has_length(
                5,
                Comparator::EqualTo,
                &WaitOpts::new().with_timeout_ms(30),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("== 5"));
        assert!(msg.contains('1'));
    }

    #[tokio::test]
    async fn test_eventually_is_empty() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("a", "")]);
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//li").unwrap().count = 0;
        });

        let l = list(&driver, "//li", LeafKind::Element);
        assert!(
            l.eventually()
                .is_empty(&WaitOpts::new().with_timeout_ms(500))
                .await
                .unwrap()
        );
    }

    // ------------------------------------------------------------------
    // aggregated modes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_wait_has_text_succeeds_after_delay() {
        let driver = MockDriver::new();
        seed_list(&driver, "//li", &[("loading", ""), ("loading", "")]);
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("(//li)[1]").unwrap().text = "one".into();
            elements.get_mut("(//li)[2]").unwrap().text = "two".into();
        });

        let l = list(&driver, "//li", LeafKind::Element);
        let expected = ListValues::Each(vec![json!("one"), json!("two")]);
        l.wait()
            .has_text(&expected, &WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_has_value_timeout_reports_members() {
        let driver = MockDriver::new();
        seed_list(&driver, "//input", &[("", "1"), ("", "2")]);

        let l = list(&driver, "//input", LeafKind::Value);
        let err = l
            .wait()
            .has_value(
                &ListValues::Single(json!(7)),
                None,
                &WaitOpts::new().with_timeout_ms(30),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("//input"));
        assert!(msg.contains("hasValue"));
        assert!(msg.contains('7'));
        assert!(msg.contains("[1,2]"));
    }

    #[tokio::test]
    async fn test_eventually_bulk_predicates() {
        let driver = MockDriver::new();
        seed_list(&driver, "//input", &[("a", "10"), ("b", "20")]);

        let l = list(&driver, "//input", LeafKind::Value);
        let opts = WaitOpts::new().with_timeout_ms(30);
        assert!(l.eventually().has_any_text(&opts).await.unwrap());
        assert!(
            !l.eventually()
                .has_value(&ListValues::Single(json!(99)), None, &opts)
                .await
                .unwrap()
        );
        assert!(
            l.eventually()
                .not()
                .has_value(&ListValues::Single(json!(99)), None, &opts)
                .await
                .unwrap()
        );
    }
}
