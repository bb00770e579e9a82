//! Elements whose widget carries a retrievable and settable value.
//!
//! A [`ValuePageElement`] wraps a plain [`PageElement`] and adds the value
//! protocol: `get_value`, `set_value` and the value-state predicates in all
//! three modes. Values cross the driver boundary as strings and are held
//! here as JSON, so heterogeneous collections can carry text inputs,
//! checkboxes and multi-selects side by side; typed access is a
//! deserialization at the edge.
//!
//! # Example
//!
//! ```ignore
//! let qty = store.value_element("//input[@name='qty']");
//!
//! qty.set_value(&serde_json::json!(3)).await?;
//! qty.wait().has_value(&serde_json::json!(3), &WaitOpts::new()).await?;
//! let n: i64 = qty.get_value_as().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::wait::WaitOpts;

use super::element::{ClickOpts, PageElement};
use super::{NodeOpts, PageNode, WaitType};

// ============================================================================
// Value Semantics
// ============================================================================

/// Parses a driver value string into JSON, falling back to a plain string.
///
/// Drivers report every widget value as a string; `"3"` becomes a number,
/// `"true"` a boolean, `"[1,2]"` an array, and anything unparseable stays a
/// string.
#[must_use]
pub fn parse_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

/// Renders a JSON value in the string form drivers accept.
///
/// Strings are passed through unquoted; everything else uses its JSON text.
#[must_use]
pub fn value_to_driver_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric tolerance check with the lower bound clamped at zero.
///
/// `expected` matches when its zero-clamped form falls inside
/// `[max(actual - tolerance, 0), max(actual + tolerance, 0)]`.
#[must_use]
pub fn within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    let lo = (actual - tolerance).max(0.0);
    let hi = (actual + tolerance).max(0.0);
    let e = expected.max(0.0);
    e >= lo && e <= hi
}

/// Structural containment between JSON values.
///
/// Strings use substring containment, arrays require every expected item to
/// be contained in some actual item, objects require every expected entry to
/// be contained under the same key, and scalars compare for equality.
#[must_use]
pub fn json_contains(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::String(a), JsonValue::String(e)) => a.contains(e.as_str()),
        (JsonValue::Array(a), JsonValue::Array(e)) => e
            .iter()
            .all(|item| a.iter().any(|candidate| json_contains(candidate, item))),
        (JsonValue::Array(a), e) => a.iter().any(|candidate| json_contains(candidate, e)),
        (JsonValue::Object(a), JsonValue::Object(e)) => e
            .iter()
            .all(|(k, v)| a.get(k).is_some_and(|candidate| json_contains(candidate, v))),
        (a, e) => a == e,
    }
}

/// Whether a JSON value counts as "some value present".
#[must_use]
pub fn json_non_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => true,
    }
}

/// Equality with an optional numeric tolerance.
#[must_use]
pub fn values_equal(actual: &JsonValue, expected: &JsonValue, tolerance: Option<f64>) -> bool {
    if let (Some(tol), Some(a), Some(e)) = (tolerance, actual.as_f64(), expected.as_f64()) {
        within_tolerance(a, e, tol)
    } else {
        actual == expected
    }
}

// ============================================================================
// ValueCondition
// ============================================================================

/// A value-state predicate evaluated in one driver round trip.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValueCondition {
    HasValue {
        expected: JsonValue,
        tolerance: Option<f64>,
    },
    ContainsValue(JsonValue),
    HasAnyValue,
}

impl ValueCondition {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::HasValue { .. } => "hasValue",
            Self::ContainsValue(_) => "containsValue",
            Self::HasAnyValue => "hasAnyValue",
        }
    }

    fn expected(&self) -> Option<String> {
        match self {
            Self::HasValue { expected, .. } | Self::ContainsValue(expected) => {
                Some(expected.to_string())
            }
            Self::HasAnyValue => Some("any value".into()),
        }
    }
}

// ============================================================================
// ValuePageElement
// ============================================================================

/// An element whose widget carries a value.
///
/// Wraps a [`PageElement`] and shares its state-predicate protocol; the
/// value protocol is layered on top. Cheap to clone.
#[derive(Clone)]
pub struct ValuePageElement {
    base: PageElement,
}

impl fmt::Debug for ValuePageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuePageElement")
            .field("selector", &self.base.selector())
            .field("wait_type", &self.base.opts().wait_type)
            .finish_non_exhaustive()
    }
}

impl PageNode for ValuePageElement {
    fn selector(&self) -> &str {
        self.base.selector()
    }

    fn node_kind(&self) -> &'static str {
        "ValuePageElement"
    }

    fn timeout_ms(&self) -> u64 {
        self.base.opts().timeout_ms
    }

    fn interval_ms(&self) -> u64 {
        self.base.opts().interval_ms
    }
}

// ============================================================================
// ValuePageElement - Constructor and Accessors
// ============================================================================

impl ValuePageElement {
    /// Creates a new value element node.
    #[must_use]
    pub fn new(selector: impl Into<String>, driver: Arc<dyn Driver>, opts: NodeOpts) -> Self {
        Self {
            base: PageElement::new(selector, driver, opts),
        }
    }

    /// Returns the underlying plain element view.
    ///
    /// All non-value state predicates and interactions live there.
    #[inline]
    #[must_use]
    pub fn element(&self) -> &PageElement {
        &self.base
    }

    /// Returns this element's selector.
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &str {
        self.base.selector()
    }

    /// Returns `true` when both nodes share the same cached instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        self.base.same_instance(&other.base)
    }
}

// ============================================================================
// ValuePageElement - Condition Evaluation
// ============================================================================

impl ValuePageElement {
    fn classify_err(&self, err: Error) -> Error {
        err.classify(self.selector(), PageNode::node_kind(self))
    }

    async fn read_value(&self) -> Result<JsonValue> {
        let raw = self
            .base
            .driver()
            .get_value(self.selector())
            .await
            .map_err(|e| self.classify_err(e))?;
        Ok(parse_value(&raw))
    }

    /// Evaluates a value condition in one round trip, recording the diff.
    pub(crate) async fn check_value(&self, cond: &ValueCondition) -> Result<bool> {
        let actual = self.read_value().await?;
        let held = match cond {
            ValueCondition::HasValue {
                expected,
                tolerance,
            } => values_equal(&actual, expected, *tolerance),
            ValueCondition::ContainsValue(expected) => json_contains(&actual, expected),
            ValueCondition::HasAnyValue => json_non_empty(&actual),
        };
        self.base
            .record_diff(cond.expected(), Some(actual.to_string()));
        Ok(held)
    }

    pub(crate) async fn wait_value_for(
        &self,
        cond: ValueCondition,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<()> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.base.opts().timeout_ms);
        let interval_ms = opts.interval_ms.unwrap_or(self.base.opts().interval_ms);

        let node = self;
        let c = &cond;
        let held = crate::wait::poll(
            std::time::Duration::from_millis(timeout_ms),
            std::time::Duration::from_millis(interval_ms),
            move || async move { Ok(node.check_value(c).await? != negate) },
        )
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
                timeout_ms,
                self.base.take_diff(),
            ))
        }
    }

    pub(crate) async fn eventually_value_for(
        &self,
        cond: ValueCondition,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.base.opts().timeout_ms);
        let interval_ms = opts.interval_ms.unwrap_or(self.base.opts().interval_ms);

        let node = self;
        let c = &cond;
        crate::wait::poll(
            std::time::Duration::from_millis(timeout_ms),
            std::time::Duration::from_millis(interval_ms),
            move || async move { Ok(node.check_value(c).await? != negate) },
        )
        .await
    }
}

// ============================================================================
// ValuePageElement - Modes
// ============================================================================

impl ValuePageElement {
    /// Immediate evaluation: one driver round trip, no polling.
    #[inline]
    #[must_use]
    pub fn currently(&self) -> ValueCurrently<'_> {
        ValueCurrently { node: self }
    }

    /// Blocking evaluation: poll until true or raise
    /// [`WaitTimeout`](crate::Error::WaitTimeout).
    #[inline]
    #[must_use]
    pub fn wait(&self) -> ValueWait<'_> {
        ValueWait {
            node: self,
            negate: false,
        }
    }

    /// Blocking evaluation: poll until true, timeout becomes `false`.
    #[inline]
    #[must_use]
    pub fn eventually(&self) -> ValueEventually<'_> {
        ValueEventually {
            node: self,
            negate: false,
        }
    }
}

// ============================================================================
// ValuePageElement - Initial Wait
// ============================================================================

impl ValuePageElement {
    /// Performs the implicit wait implied by the node's
    /// [`WaitType`](super::WaitType).
    ///
    /// Value elements additionally support [`WaitType::Value`]: wait for any
    /// non-empty widget value.
    pub async fn initial_wait(&self) -> Result<()> {
        match self.base.opts().wait_type {
            WaitType::Value => {
                self.wait_value_for(ValueCondition::HasAnyValue, &WaitOpts::new(), false)
                    .await
            }
            _ => self.base.initial_wait().await,
        }
    }
}

// ============================================================================
// ValuePageElement - Value Protocol
// ============================================================================

impl ValuePageElement {
    /// Returns the widget value after the implicit wait.
    pub async fn get_value(&self) -> Result<JsonValue> {
        self.initial_wait().await?;
        self.read_value().await
    }

    /// Returns the widget value deserialized into `T`.
    pub async fn get_value_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.get_value().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sets the widget value after the implicit wait.
    pub async fn set_value(&self, value: &JsonValue) -> Result<()> {
        debug!(selector = %self.selector(), value = %value, "Setting element value");
        self.initial_wait().await?;
        self.base
            .driver()
            .set_value(self.selector(), &value_to_driver_string(value))
            .await
            .map_err(|e| self.classify_err(e))
    }

    /// Sets the widget value from any serializable type.
    pub async fn set_value_typed<T: Serialize>(&self, value: &T) -> Result<()> {
        self.set_value(&serde_json::to_value(value)?).await
    }
}

// ============================================================================
// ValuePageElement - Delegated Reads and Interactions
// ============================================================================

impl ValuePageElement {
    /// Returns the element's text after the implicit wait.
    pub async fn get_text(&self) -> Result<String> {
        self.initial_wait().await?;
        self.base.currently().get_text().await
    }

    /// Clicks the element.
    ///
    /// Same retry behavior as [`PageElement::click`], but the implicit wait
    /// honors [`WaitType::Value`].
    pub async fn click(&self, opts: ClickOpts) -> Result<()> {
        debug!(selector = %self.selector(), "Clicking value element");
        self.initial_wait().await?;
        self.base.click_no_wait(&opts).await
    }
}

// ============================================================================
// ValueCurrently
// ============================================================================

/// Immediate evaluation of value-state predicates.
///
/// Non-value predicates are reached through [`base`](ValueCurrently::base).
#[derive(Clone, Copy)]
pub struct ValueCurrently<'a> {
    node: &'a ValuePageElement,
}

impl<'a> ValueCurrently<'a> {
    /// The underlying element's immediate mode.
    #[inline]
    #[must_use]
    pub fn base(self) -> super::element::Currently<'a> {
        self.node.base.currently()
    }

    /// Reads the widget value without waiting.
    pub async fn get_value(self) -> Result<JsonValue> {
        self.node.read_value().await
    }

    pub async fn has_value(self, expected: &JsonValue) -> Result<bool> {
        self.node
            .check_value(&ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: None,
            })
            .await
    }

    pub async fn has_value_within(self, expected: &JsonValue, tolerance: f64) -> Result<bool> {
        self.node
            .check_value(&ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: Some(tolerance),
            })
            .await
    }

    pub async fn contains_value(self, expected: &JsonValue) -> Result<bool> {
        self.node
            .check_value(&ValueCondition::ContainsValue(expected.clone()))
            .await
    }

    pub async fn has_any_value(self) -> Result<bool> {
        self.node.check_value(&ValueCondition::HasAnyValue).await
    }
}

// ============================================================================
// ValueWait
// ============================================================================

/// Blocking evaluation of value-state predicates; timeout raises.
#[derive(Clone, Copy)]
pub struct ValueWait<'a> {
    node: &'a ValuePageElement,
    negate: bool,
}

impl<'a> ValueWait<'a> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    /// The underlying element's wait mode.
    ///
    /// Negation does not carry across; call `not()` on the base mode.
    #[inline]
    #[must_use]
    pub fn base(self) -> super::element::Wait<'a> {
        self.node.base.wait()
    }

    async fn run(self, cond: ValueCondition, opts: &WaitOpts) -> Result<&'a ValuePageElement> {
        self.node.wait_value_for(cond, opts, self.negate).await?;
        Ok(self.node)
    }

    pub async fn has_value(
        self,
        expected: &JsonValue,
        opts: &WaitOpts,
    ) -> Result<&'a ValuePageElement> {
        self.run(
            ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: None,
            },
            opts,
        )
        .await
    }

    pub async fn has_value_within(
        self,
        expected: &JsonValue,
        tolerance: f64,
        opts: &WaitOpts,
    ) -> Result<&'a ValuePageElement> {
        self.run(
            ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: Some(tolerance),
            },
            opts,
        )
        .await
    }

    pub async fn contains_value(
        self,
        expected: &JsonValue,
        opts: &WaitOpts,
    ) -> Result<&'a ValuePageElement> {
        self.run(ValueCondition::ContainsValue(expected.clone()), opts)
            .await
    }

    pub async fn has_any_value(self, opts: &WaitOpts) -> Result<&'a ValuePageElement> {
        self.run(ValueCondition::HasAnyValue, opts).await
    }
}

// ============================================================================
// ValueEventually
// ============================================================================

/// Blocking evaluation of value-state predicates; timeout is `false`.
#[derive(Clone, Copy)]
pub struct ValueEventually<'a> {
    node: &'a ValuePageElement,
    negate: bool,
}

impl<'a> ValueEventually<'a> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    /// The underlying element's eventually mode.
    #[inline]
    #[must_use]
    pub fn base(self) -> super::element::Eventually<'a> {
        self.node.base.eventually()
    }

    async fn run(self, cond: ValueCondition, opts: &WaitOpts) -> Result<bool> {
        self.node.eventually_value_for(cond, opts, self.negate).await
    }

    pub async fn has_value(self, expected: &JsonValue, opts: &WaitOpts) -> Result<bool> {
        self.run(
            ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: None,
            },
            opts,
        )
        .await
    }

    pub async fn has_value_within(
        self,
        expected: &JsonValue,
        tolerance: f64,
        opts: &WaitOpts,
    ) -> Result<bool> {
        self.run(
            ValueCondition::HasValue {
                expected: expected.clone(),
                tolerance: Some(tolerance),
            },
            opts,
        )
        .await
    }

    pub async fn contains_value(self, expected: &JsonValue, opts: &WaitOpts) -> Result<bool> {
        self.run(ValueCondition::ContainsValue(expected.clone()), opts)
            .await
    }

    pub async fn has_any_value(self, opts: &WaitOpts) -> Result<bool> {
        self.run(ValueCondition::HasAnyValue, opts).await
    }
}

// ============================================================================
// Tests
// ============================================================================
