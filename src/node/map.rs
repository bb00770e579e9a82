//! Fixed named mappings from logical keys to elements.
//!
//! A [`PageElementMap`] is built once from an explicit key set: each key
//! pairs with an opaque mapping value, and a selector-template function
//! turns the map's base selector plus that value into the member's
//! selector. Keys never change after construction; only the mapping values
//! may be swapped (for localization) via
//! [`change_mapping`](PageElementMap::change_mapping).
//!
//! Unlike lists, maps never consult the driver to enumerate members: the
//! key set is the membership, and bulk operations visit it in declaration
//! order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::driver::Driver;
use crate::error::{Diff, Error, Result};
use crate::wait::{self, WaitOpts};

use super::element::PageElement;
use super::value::{ValuePageElement, json_contains, values_equal};
use super::{Leaf, LeafKind, NodeOpts, PageNode};

// ============================================================================
// Types
// ============================================================================

/// Builds a member selector from the map's base selector and one mapping
/// value.
pub type SelectorTemplate = fn(&str, &JsonValue) -> String;

/// A per-key boolean mask for map bulk operations.
///
/// Keys present with `false` are skipped; keys absent from the mask are
/// skipped as well (mask presence is opt-in). A mask key that does not
/// exist in the map is an [`UnmatchedKey`](crate::Error::UnmatchedKey)
/// error.
pub type KeyMask<'a> = &'a [(&'a str, bool)];

/// Per-key values for map bulk writes and expectations.
pub type KeyValues<'a> = &'a [(&'a str, JsonValue)];

// ============================================================================
// PageElementMap
// ============================================================================

struct MapInner {
    selector: String,
    driver: Arc<dyn Driver>,
    opts: NodeOpts,
    kind: LeafKind,
    template: SelectorTemplate,
    mapping: Mutex<Vec<(String, JsonValue)>>,
}

/// A fixed mapping from logical keys to element-shaped members.
///
/// Cheap to clone; clones share the mapping.
#[derive(Clone)]
pub struct PageElementMap {
    inner: Arc<MapInner>,
}

impl fmt::Debug for PageElementMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageElementMap")
            .field("selector", &self.inner.selector)
            .field("kind", &self.inner.kind)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl PageNode for PageElementMap {
    fn selector(&self) -> &str {
        &self.inner.selector
    }

    fn node_kind(&self) -> &'static str {
        "PageElementMap"
    }

    fn timeout_ms(&self) -> u64 {
        self.inner.opts.timeout_ms
    }

    fn interval_ms(&self) -> u64 {
        self.inner.opts.interval_ms
    }
}

// ============================================================================
// PageElementMap - Construction and Membership
// ============================================================================

impl PageElementMap {
    /// Creates a map over `selector` with a fixed key set.
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        driver: Arc<dyn Driver>,
        opts: NodeOpts,
        kind: LeafKind,
        mapping: Vec<(String, JsonValue)>,
        template: SelectorTemplate,
    ) -> Self {
        Self {
            inner: Arc::new(MapInner {
                selector: selector.into(),
                driver,
                opts,
                kind,
                template,
                mapping: Mutex::new(mapping),
            }),
        }
    }

    /// Returns this map's base selector.
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

    /// Logical keys, in declaration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .mapping
            .lock()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn leaf_for(&self, value: &JsonValue) -> Leaf {
        let selector = (self.inner.template)(&self.inner.selector, value);
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

    /// Returns the member under `key`.
    pub fn get(&self, key: &str) -> Result<Leaf> {
        let mapping = self.inner.mapping.lock();
        mapping
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| self.leaf_for(value))
            .ok_or_else(|| Error::unmatched_key(key, format!("map '{}'", self.selector())))
    }

    /// Returns every member paired with its key, in declaration order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Leaf)> {
        let mapping = self.inner.mapping.lock().clone();
        mapping
            .into_iter()
            .map(|(key, value)| {
                let leaf = self.leaf_for(&value);
                (key, leaf)
            })
            .collect()
    }

    /// Swaps the mapping values, keeping the key set fixed.
    ///
    /// The new mapping must carry exactly the existing keys in the existing
    /// order; anything else is a configuration error.
    pub fn change_mapping(&self, mapping: Vec<(String, JsonValue)>) -> Result<()> {
        let mut current = self.inner.mapping.lock();
        let same_keys = current.len() == mapping.len()
            && current
                .iter()
                .zip(mapping.iter())
                .all(|((a, _), (b, _))| a == b);
        if !same_keys {
            return Err(Error::config(format!(
                "mapping keys are fixed at construction for map '{}'",
                self.selector()
            )));
        }
        *current = mapping;
        Ok(())
    }
}

// ============================================================================
// PageElementMap - Bulk Operations
// ============================================================================

impl PageElementMap {
    /// Members selected by an optional per-key mask, in declaration order.
    fn masked(&self, mask: Option<KeyMask<'_>>) -> Result<Vec<(String, Leaf)>> {
        let entries = self.entries();

        if let Some(mask) = mask {
            for (key, _) in mask {
                if !entries.iter().any(|(k, _)| k == key) {
                    return Err(Error::unmatched_key(
                        *key,
                        format!("map '{}'", self.selector()),
                    ));
                }
            }
        }

        Ok(entries
            .into_iter()
            .filter(|(key, _)| match mask {
                None => true,
                Some(mask) => mask
                    .iter()
                    .any(|(k, include)| k == key && *include),
            })
            .collect())
    }

    fn lookup<'v>(values: KeyValues<'v>, key: &str) -> Option<&'v JsonValue> {
        values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Validates that every provided key exists in the map.
    fn check_keys(&self, values: KeyValues<'_>) -> Result<()> {
        let keys = self.keys();
        for (key, _) in values {
            if !keys.iter().any(|k| k == key) {
                return Err(Error::unmatched_key(
                    *key,
                    format!("map '{}'", self.selector()),
                ));
            }
        }
        Ok(())
    }

    fn require_value<'a>(&self, key: &str, leaf: &'a Leaf) -> Result<&'a ValuePageElement> {
        leaf.value().ok_or_else(|| {
            Error::unsupported(
                "getValue",
                format!("map '{}' key '{key}'", self.selector()),
            )
        })
    }

    /// Reads each selected member's text, keyed, in declaration order.
    pub async fn get_text_map(&self, mask: Option<KeyMask<'_>>) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for (key, leaf) in self.masked(mask)? {
            let text = leaf.get_text().await?;
            out.push((key, text));
        }
        Ok(out)
    }

    /// Reads each selected member's value, keyed, in declaration order.
    pub async fn get_value_map(
        &self,
        mask: Option<KeyMask<'_>>,
    ) -> Result<Vec<(String, JsonValue)>> {
        let mut out = Vec::new();
        for (key, leaf) in self.masked(mask)? {
            let value = self.require_value(&key, &leaf)?.get_value().await?;
            out.push((key, value));
        }
        Ok(out)
    }

    /// Sets the named members' values.
    ///
    /// Keys absent from the map fail with
    /// [`UnmatchedKey`](crate::Error::UnmatchedKey) before any member is
    /// touched; keys absent from `values` are left alone.
    pub async fn set_value_map(&self, values: KeyValues<'_>) -> Result<()> {
        self.check_keys(values)?;
        for (key, leaf) in self.entries() {
            if let Some(value) = Self::lookup(values, &key) {
                self.require_value(&key, &leaf)?.set_value(value).await?;
            }
        }
        Ok(())
    }

    /// Whether every named member's text equals its expectation.
    pub async fn has_text_map(&self, expected: KeyValues<'_>) -> Result<bool> {
        self.check_keys(expected)?;
        for (key, leaf) in self.entries() {
            let Some(want) = Self::lookup(expected, &key) else {
                continue;
            };
            let text = leaf.element().currently().get_text().await?;
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

    /// Whether every selected member has non-empty text.
    pub async fn has_any_text_map(&self, mask: Option<KeyMask<'_>>) -> Result<bool> {
        for (_, leaf) in self.masked(mask)? {
            if leaf.element().currently().get_text().await?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every named member's value equals its expectation,
    /// optionally within a numeric tolerance.
    pub async fn has_value_map(
        &self,
        expected: KeyValues<'_>,
        tolerance: Option<f64>,
    ) -> Result<bool> {
        self.check_keys(expected)?;
        for (key, leaf) in self.entries() {
            let Some(want) = Self::lookup(expected, &key) else {
                continue;
            };
            let actual = self
                .require_value(&key, &leaf)?
                .currently()
                .get_value()
                .await?;
            if !values_equal(&actual, want, tolerance) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether every named member's value structurally contains its
    /// expectation.
    pub async fn contains_value_map(&self, expected: KeyValues<'_>) -> Result<bool> {
        self.check_keys(expected)?;
        for (key, leaf) in self.entries() {
            let Some(want) = Self::lookup(expected, &key) else {
                continue;
            };
            let actual = self
                .require_value(&key, &leaf)?
                .currently()
                .get_value()
                .await?;
            if !json_contains(&actual, want) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ============================================================================
// PageElementMap - Modes
// ============================================================================

/// A map-level aggregated condition over member texts or values.
#[derive(Clone, Copy)]
enum MapCondition<'v> {
    HasText(KeyValues<'v>),
    HasAnyText(Option<KeyMask<'v>>),
    HasValue(KeyValues<'v>, Option<f64>),
    ContainsValue(KeyValues<'v>),
}

impl MapCondition<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::HasText(_) => "hasText",
            Self::HasAnyText(_) => "hasAnyText",
            Self::HasValue(..) => "hasValue",
            Self::ContainsValue(_) => "containsValue",
        }
    }

    fn expected(&self) -> Option<String> {
        match self {
            Self::HasText(values) | Self::ContainsValue(values) | Self::HasValue(values, _) => {
                Some(render_keyed(
                    values.iter().map(|(k, v)| (*k, v.to_string())),
                ))
            }
            Self::HasAnyText(_) => None,
        }
    }

    fn reads_text(&self) -> bool {
        matches!(self, Self::HasText(_) | Self::HasAnyText(_))
    }
}

fn render_keyed<K: fmt::Display>(entries: impl Iterator<Item = (K, String)>) -> String {
    entries
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl PageElementMap {
    /// Blocking aggregated predicates: poll until every named member holds,
    /// then return the map for chaining; raise
    /// [`WaitTimeout`](crate::Error::WaitTimeout) otherwise.
    ///
    /// The inherent bulk predicates above are the immediate form.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> MapWait<'_> {
        MapWait {
            map: self,
            negate: false,
        }
    }

    /// Blocking aggregated predicates: identical polling, timeout becomes
    /// `false`.
    #[inline]
    #[must_use]
    pub fn eventually(&self) -> MapEventually<'_> {
        MapEventually {
            map: self,
            negate: false,
        }
    }

    async fn check_aggregated(&self, cond: &MapCondition<'_>) -> Result<bool> {
        match cond {
            MapCondition::HasText(expected) => self.has_text_map(expected).await,
            MapCondition::HasAnyText(mask) => self.has_any_text_map(*mask).await,
            MapCondition::HasValue(expected, tolerance) => {
                self.has_value_map(expected, *tolerance).await
            }
            MapCondition::ContainsValue(expected) => self.contains_value_map(expected).await,
        }
    }

    async fn poll_aggregated(
        &self,
        cond: &MapCondition<'_>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let map = self;
        wait::poll(timeout, interval, move || async move {
            Ok(map.check_aggregated(cond).await? != negate)
        })
        .await
    }

    async fn aggregated_timeout(
        &self,
        cond: &MapCondition<'_>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Error {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms);
        let actual = if cond.reads_text() {
            self.get_text_map(None)
                .await
                .ok()
                .map(|texts| render_keyed(texts.into_iter()))
        } else {
            self.get_value_map(None).await.ok().map(|values| {
                render_keyed(values.into_iter().map(|(k, v)| (k, v.to_string())))
            })
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

/// Blocking aggregated predicates; timeout raises.
#[derive(Clone, Copy)]
pub struct MapWait<'a> {
    map: &'a PageElementMap,
    negate: bool,
}

impl<'a> MapWait<'a> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(self, cond: MapCondition<'_>, opts: &WaitOpts) -> Result<&'a PageElementMap> {
        if self.map.poll_aggregated(&cond, opts, self.negate).await? {
            Ok(self.map)
        } else {
            Err(self.map.aggregated_timeout(&cond, opts, self.negate).await)
        }
    }

    pub async fn has_text(
        self,
        expected: KeyValues<'_>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementMap> {
        self.run(MapCondition::HasText(expected), opts).await
    }

    pub async fn has_any_text(
        self,
        mask: Option<KeyMask<'_>>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementMap> {
        self.run(MapCondition::HasAnyText(mask), opts).await
    }

    pub async fn has_value(
        self,
        expected: KeyValues<'_>,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementMap> {
        self.run(MapCondition::HasValue(expected, tolerance), opts)
            .await
    }

    pub async fn contains_value(
        self,
        expected: KeyValues<'_>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementMap> {
        self.run(MapCondition::ContainsValue(expected), opts).await
    }
}

/// Blocking aggregated predicates; timeout is `false`.
#[derive(Clone, Copy)]
pub struct MapEventually<'a> {
    map: &'a PageElementMap,
    negate: bool,
}

impl MapEventually<'_> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(self, cond: MapCondition<'_>, opts: &WaitOpts) -> Result<bool> {
        self.map.poll_aggregated(&cond, opts, self.negate).await
    }

    pub async fn has_text(self, expected: KeyValues<'_>, opts: &WaitOpts) -> Result<bool> {
        self.run(MapCondition::HasText(expected), opts).await
    }

    pub async fn has_any_text(self, mask: Option<KeyMask<'_>>, opts: &WaitOpts) -> Result<bool> {
        self.run(MapCondition::HasAnyText(mask), opts).await
    }

    pub async fn has_value(
        self,
        expected: KeyValues<'_>,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<bool> {
        self.run(MapCondition::HasValue(expected, tolerance), opts)
            .await
    }

    pub async fn contains_value(self, expected: KeyValues<'_>, opts: &WaitOpts) -> Result<bool> {
        self.run(MapCondition::ContainsValue(expected), opts).await
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

    fn by_data_key(base: &str, value: &JsonValue) -> String {
        format!("{base}//*[@data-key='{}']", value.as_str().unwrap_or_default())
    }

    fn fruit_map(driver: &MockDriver, kind: LeafKind) -> PageElementMap {
        PageElementMap::new(
            "//ul",
            Arc::new(driver.clone()),
            NodeOpts::new(100, 10),
            kind,
            vec![
                ("apple".into(), json!("apple")),
                ("pear".into(), json!("pear")),
            ],
            by_data_key,
        )
    }

    fn seed_fruit(driver: &MockDriver) {
        driver.insert(
            "//ul//*[@data-key='apple']",
            MockElement::new().with_text("Apple").with_value("1"),
        );
        driver.insert(
            "//ul//*[@data-key='pear']",
            MockElement::new().with_text("Pear").with_value("2"),
        );
    }

    // ------------------------------------------------------------------
    // membership
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_keys_and_member_selectors() {
        let driver = MockDriver::new();
        let map = fruit_map(&driver, LeafKind::Element);

        assert_eq!(map.keys(), vec!["apple", "pear"]);
        assert_eq!(
            map.get("apple").unwrap().selector(),
            "//ul//*[@data-key='apple']"
        );
        let err = map.get("mango").unwrap_err();
        assert!(matches!(err, Error::UnmatchedKey { .. }));
    }

    #[tokio::test]
    async fn test_change_mapping_swaps_values_keeps_keys() {
        let driver = MockDriver::new();
        let map = fruit_map(&driver, LeafKind::Element);

        // Localization: same keys, different mapping values.
        map.change_mapping(vec![
            ("apple".into(), json!("apfel")),
            ("pear".into(), json!("birne")),
        ])
        .unwrap();
        assert_eq!(
            map.get("apple").unwrap().selector(),
            "//ul//*[@data-key='apfel']"
        );

        let err = map
            .change_mapping(vec![("apple".into(), json!("a"))])
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    // ------------------------------------------------------------------
    // bulk reads
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_text_map_declaration_order() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Element);
        assert_eq!(
            map.get_text_map(None).await.unwrap(),
            vec![
                ("apple".to_string(), "Apple".to_string()),
                ("pear".to_string(), "Pear".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mask_selects_subset_and_checks_keys() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Element);
        let texts = map
            .get_text_map(Some(&[("pear", true), ("apple", false)]))
            .await
            .unwrap();
        assert_eq!(texts, vec![("pear".to_string(), "Pear".to_string())]);

        let err = map
            .get_text_map(Some(&[("mango", true)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnmatchedKey { .. }));
    }

    // ------------------------------------------------------------------
    // values
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_value_round_trip_by_key() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Value);
        map.set_value_map(&[("apple", json!(10))]).await.unwrap();

        let values = map.get_value_map(None).await.unwrap();
        assert_eq!(
            values,
            vec![
                ("apple".to_string(), json!(10)),
                ("pear".to_string(), json!(2)),
            ]
        );
        assert!(map.has_value_map(&[("apple", json!(10))], None).await.unwrap());
        assert!(
            map.has_value_map(&[("apple", json!(11))], Some(1.0))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_set_value_unknown_key_fails_before_touching() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Value);
        let err = map
            .set_value_map(&[("apple", json!(9)), ("mango", json!(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnmatchedKey { .. }));

        // Nothing was applied.
        assert_eq!(
            map.get_value_map(None).await.unwrap()[0],
            ("apple".to_string(), json!(1))
        );
    }

    #[tokio::test]
    async fn test_value_ops_on_plain_map_are_unsupported() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Element);
        let err = map.get_value_map(None).await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_has_text_map_and_contains_value() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Value);
        assert!(map.has_text_map(&[("apple", json!("Apple"))]).await.unwrap());
        assert!(!map.has_text_map(&[("apple", json!("Pear"))]).await.unwrap());
        assert!(map.has_any_text_map(None).await.unwrap());
    }

    // ------------------------------------------------------------------
    // aggregated modes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_wait_has_text_succeeds_after_delay() {
        let driver = MockDriver::new();
        seed_fruit(&driver);
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements
                .get_mut("//ul//*[@data-key='apple']")
                .unwrap()
                .text = "Golden".into();
        });

        let map = fruit_map(&driver, LeafKind::Element);
        let chained = map
            .wait()
            .has_text(
                &[("apple", json!("Golden"))],
                &WaitOpts::new().with_timeout_ms(500),
            )
            .await
            .unwrap();
        assert!(chained.same_instance(&map));
    }

    #[tokio::test]
    async fn test_wait_timeout_carries_selector_and_diff() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Value);
        let err = map
            .wait()
            .has_value(
                &[("pear", json!(9))],
                None,
                &WaitOpts::new().with_timeout_ms(30),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("//ul"));
        assert!(msg.contains("hasValue"));
        assert!(msg.contains("pear: 9"));
        assert!(msg.contains("pear: 2"));
    }

    #[tokio::test]
    async fn test_eventually_bulk_predicates() {
        let driver = MockDriver::new();
        seed_fruit(&driver);

        let map = fruit_map(&driver, LeafKind::Value);
        let opts = WaitOpts::new().with_timeout_ms(30);
        assert!(
            !map.eventually()
                .has_text(&[("apple", json!("Mango"))], &opts)
                .await
                .unwrap()
        );
        assert!(
            map.eventually()
                .not()
                .has_text(&[("apple", json!("Mango"))], &opts)
                .await
                .unwrap()
        );
        assert!(map.eventually().has_any_text(None, &opts).await.unwrap());
    }
}
