//! In-memory [`Driver`] implementation for unit-testing page objects.
//!
//! The mock holds a selector-keyed fixture of element states. Tests describe
//! the page up front, then exercise nodes against it:
//!
//! ```ignore
//! use pagewright::mock::{MockDriver, MockElement};
//!
//! let driver = MockDriver::new();
//! driver.insert("//button[@id='save']", MockElement::new().with_text("Save"));
//!
//! // Model asynchronous rendering: the dialog appears 50ms from now.
//! driver.after(Duration::from_millis(50), |elements| {
//!     elements.insert("//div[@id='dialog']".into(), MockElement::new());
//! });
//! ```
//!
//! Scheduled mutations are applied lazily: each driver call first applies
//! every mutation whose deadline has passed, so no background task is needed
//! and tests stay deterministic.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

use super::{Driver, Point, Size};

// ============================================================================
// Types
// ============================================================================

/// A scheduled fixture mutation.
type Mutation = Box<dyn FnOnce(&mut FxHashMap<String, MockElement>) + Send>;

/// The state of one mocked element.
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Whether the element is rendered visibly.
    pub visible: bool,
    /// Whether the element is enabled.
    pub enabled: bool,
    /// Whether the element is selected/checked.
    pub selected: bool,
    /// Whether a click currently succeeds.
    pub clickable: bool,
    /// Aggregated text content.
    pub text: String,
    /// Inner HTML.
    pub html: String,
    /// Widget value, in driver string form.
    pub value: String,
    /// Attribute map.
    pub attributes: FxHashMap<String, String>,
    /// Page location.
    pub location: Point,
    /// Rendered size.
    pub size: Size,
    /// How many selector matches this entry represents (lists).
    pub count: usize,
    /// Number of successful clicks received.
    pub clicks: u32,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            visible: true,
            enabled: true,
            selected: false,
            clickable: true,
            text: String::new(),
            html: String::new(),
            value: String::new(),
            attributes: FxHashMap::default(),
            location: Point::default(),
            size: Size::default(),
            count: 1,
            clicks: 0,
        }
    }
}

// ============================================================================
// MockElement - Builder Methods
// ============================================================================

impl MockElement {
    /// Creates a visible, enabled, clickable element with no content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the inner HTML.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Sets the widget value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the match count (for list base selectors).
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the location and size.
    #[must_use]
    pub fn with_geometry(mut self, location: Point, size: Size) -> Self {
        self.location = location;
        self.size = size;
        self
    }

    /// Marks the element hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Marks the element disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Marks the element selected/checked.
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Marks the element obscured: clicks fail with a not-clickable error.
    #[must_use]
    pub fn obscured(mut self) -> Self {
        self.clickable = false;
        self
    }
}

// ============================================================================
// MockDriver
// ============================================================================

/// Internal shared state for the mock.
struct MockState {
    elements: FxHashMap<String, MockElement>,
    scheduled: Vec<(Instant, Mutation)>,
    script_result: JsonValue,
    scripts: Vec<String>,
}

/// In-memory [`Driver`] backed by a selector-keyed fixture.
///
/// Cheap to clone; clones share the same fixture.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockDriver")
            .field("elements", &state.elements.len())
            .field("scheduled", &state.scheduled.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MockDriver - Fixture API
// ============================================================================

impl MockDriver {
    /// Creates an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                elements: FxHashMap::default(),
                scheduled: Vec::new(),
                script_result: JsonValue::Null,
                scripts: Vec::new(),
            })),
        }
    }

    /// Inserts or replaces an element under `selector`.
    pub fn insert(&self, selector: impl Into<String>, element: MockElement) {
        self.state.lock().elements.insert(selector.into(), element);
    }

    /// Removes the element under `selector`.
    pub fn remove(&self, selector: &str) {
        self.state.lock().elements.remove(selector);
    }

    /// Mutates an existing element in place.
    ///
    /// # Panics
    ///
    /// Panics when `selector` is not in the fixture; a test referencing a
    /// missing element is a test bug.
    pub fn update(&self, selector: &str, f: impl FnOnce(&mut MockElement)) {
        let mut state = self.state.lock();
        let element = state
            .elements
            .get_mut(selector)
            .unwrap_or_else(|| panic!("no mock element under {selector}"));
        f(element);
    }

    /// Schedules a fixture mutation to apply once `delay` has passed.
    ///
    /// Applied lazily by the next driver call at or after the deadline.
    pub fn after(
        &self,
        delay: Duration,
        f: impl FnOnce(&mut FxHashMap<String, MockElement>) + Send + 'static,
    ) {
        self.state
            .lock()
            .scheduled
            .push((Instant::now() + delay, Box::new(f)));
    }

    /// Sets the value returned by [`Driver::execute`].
    pub fn set_script_result(&self, result: JsonValue) {
        self.state.lock().script_result = result;
    }

    /// Returns the scripts executed so far, in order.
    #[must_use]
    pub fn executed_scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    /// Returns the number of successful clicks an element has received.
    #[must_use]
    pub fn clicks(&self, selector: &str) -> u32 {
        self.with_element(selector, |e| e.clicks).unwrap_or(0)
    }

    /// Returns a snapshot of the element under `selector`, if present.
    #[must_use]
    pub fn snapshot(&self, selector: &str) -> Option<MockElement> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        state.elements.get(selector).cloned()
    }
}

// ============================================================================
// MockDriver - Internal
// ============================================================================

impl MockDriver {
    /// Applies every scheduled mutation whose deadline has passed.
    fn apply_due(state: &mut MockState) {
        let now = Instant::now();
        let mut due = Vec::new();
        let mut i = 0;
        while i < state.scheduled.len() {
            if state.scheduled[i].0 <= now {
                due.push(state.scheduled.swap_remove(i).1);
            } else {
                i += 1;
            }
        }
        for mutation in due {
            mutation(&mut state.elements);
        }
    }

    /// Looks up an element, applying due mutations first.
    fn with_element<T>(&self, selector: &str, f: impl FnOnce(&MockElement) -> T) -> Result<T> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        state
            .elements
            .get(selector)
            .filter(|e| e.count > 0)
            .map(f)
            .ok_or_else(|| Error::driver(format!("element could not be located: {selector}")))
    }

    fn with_element_mut<T>(
        &self,
        selector: &str,
        f: impl FnOnce(&mut MockElement) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        state
            .elements
            .get_mut(selector)
            .filter(|e| e.count > 0)
            .map(f)
            .ok_or_else(|| Error::driver(format!("element could not be located: {selector}")))?
    }
}

// ============================================================================
// MockDriver - Driver Implementation
// ============================================================================

#[async_trait]
impl Driver for MockDriver {
    async fn exists(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        Ok(state
            .elements
            .get(selector)
            .is_some_and(|e| e.count > 0))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        Ok(state.elements.get(selector).map_or(0, |e| e.count))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.with_element(selector, |e| e.visible)
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        self.with_element(selector, |e| e.enabled)
    }

    async fn is_selected(&self, selector: &str) -> Result<bool> {
        self.with_element(selector, |e| e.selected)
    }

    async fn get_text(&self, selector: &str) -> Result<String> {
        self.with_element(selector, |e| e.text.clone())
    }

    async fn get_html(&self, selector: &str) -> Result<String> {
        self.with_element(selector, |e| e.html.clone())
    }

    async fn get_value(&self, selector: &str) -> Result<String> {
        self.with_element(selector, |e| e.value.clone())
    }

    async fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.with_element(selector, |e| e.attributes.get(name).cloned())
    }

    async fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        self.with_element_mut(selector, |e| {
            e.value = value.to_string();
            Ok(())
        })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.with_element_mut(selector, |e| {
            if !e.clickable {
                return Err(Error::not_clickable(format!(
                    "element {selector} is not clickable at point"
                )));
            }
            e.clicks += 1;
            Ok(())
        })
    }

    async fn get_location(&self, selector: &str) -> Result<Point> {
        self.with_element(selector, |e| e.location)
    }

    async fn get_size(&self, selector: &str) -> Result<Size> {
        self.with_element(selector, |e| e.size)
    }

    async fn execute(&self, script: &str, _args: Vec<JsonValue>) -> Result<JsonValue> {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        state.scripts.push(script.to_string());
        Ok(state.script_result.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_element_reports_not_located_marker() {
        let driver = MockDriver::new();
        let err = driver.get_text("//nowhere").await.unwrap_err();
        let classified = err.classify("//nowhere", "PageElement");
        assert!(classified.is_not_located());
    }

    #[tokio::test]
    async fn test_exists_and_count() {
        let driver = MockDriver::new();
        driver.insert("//li", MockElement::new().with_count(3));

        assert!(driver.exists("//li").await.unwrap());
        assert_eq!(driver.count("//li").await.unwrap(), 3);
        assert_eq!(driver.count("//missing").await.unwrap(), 0);
        assert!(!driver.exists("//missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_click_counts_and_obscured() {
        let driver = MockDriver::new();
        driver.insert("//btn", MockElement::new());
        driver.insert("//hidden-btn", MockElement::new().obscured());

        driver.click("//btn").await.unwrap();
        driver.click("//btn").await.unwrap();
        assert_eq!(driver.clicks("//btn"), 2);

        let err = driver.click("//hidden-btn").await.unwrap_err();
        assert!(err.is_not_clickable());
    }

    #[tokio::test]
    async fn test_scheduled_mutation_applies_after_deadline() {
        let driver = MockDriver::new();
        driver.after(Duration::from_millis(20), |elements| {
            elements.insert("//late".into(), MockElement::new().with_text("done"));
        });

        assert!(!driver.exists("//late").await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(driver.exists("//late").await.unwrap());
        assert_eq!(driver.get_text("//late").await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_set_value_round_trip() {
        let driver = MockDriver::new();
        driver.insert("//input", MockElement::new());

        driver.set_value("//input", "hello").await.unwrap();
        assert_eq!(driver.get_value("//input").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_execute_records_script_and_returns_canned_result() {
        let driver = MockDriver::new();
        driver.set_script_result(serde_json::json!({"ok": true}));

        let result = driver.execute("return 1", vec![]).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(driver.executed_scripts(), vec!["return 1".to_string()]);
    }
}
