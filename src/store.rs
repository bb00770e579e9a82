//! Node factory and cache: the entry point for declaring page structure.
//!
//! A [`PageNodeStore`] owns the driver handle and the resolved timing
//! defaults, and hands out nodes through factory methods. Nodes are cached
//! by selector, node kind and options: two retrievals with the same three
//! return the same instance, so identification state and recorded diffs are
//! shared wherever a node is reached from.
//!
//! Defaults are resolved once in [`StoreConfig`] and threaded into every
//! node at construction; nothing reads ambient configuration later.
//!
//! # Example
//!
//! ```ignore
//! use pagewright::{PageNodeStore, StoreConfig};
//!
//! let store = PageNodeStore::new(driver, StoreConfig::default());
//! let save = store.element("//button[@id='save']");
//! assert!(save.same_instance(&store.element("//button[@id='save']")));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::Driver;
use crate::node::element::PageElement;
use crate::node::group::{GroupNode, PageElementGroup};
use crate::node::list::PageElementList;
use crate::node::map::{PageElementMap, SelectorTemplate};
use crate::node::value::ValuePageElement;
use crate::node::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS, LeafKind, NodeOpts};

// ============================================================================
// StoreConfig
// ============================================================================

/// Timing defaults applied to every node the store creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Default wait timeout in milliseconds.
    pub default_timeout_ms: u64,

    /// Default polling interval in milliseconds.
    pub default_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl StoreConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default timeout.
    #[inline]
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Sets the default polling interval.
    #[inline]
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.default_interval_ms = interval_ms;
        self
    }
}

// ============================================================================
// PageNodeStore
// ============================================================================

struct StoreInner {
    driver: Arc<dyn Driver>,
    config: StoreConfig,
    cache: Mutex<FxHashMap<String, GroupNode>>,
}

/// Factory and cache for page nodes.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct PageNodeStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for PageNodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageNodeStore")
            .field("config", &self.inner.config)
            .field("cached", &self.inner.cache.lock().len())
            .finish_non_exhaustive()
    }
}

impl PageNodeStore {
    /// Creates a store over a driver with the given defaults.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                driver,
                config,
                cache: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// Returns the store's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }

    /// Node options carrying the store's defaults.
    #[must_use]
    pub fn default_opts(&self) -> NodeOpts {
        NodeOpts::new(
            self.inner.config.default_timeout_ms,
            self.inner.config.default_interval_ms,
        )
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.inner.cache.lock().len()
    }

    fn cache_key(kind: &str, selector: &str, opts: &NodeOpts) -> String {
        // NodeOpts serialization is deterministic for equal values.
        let opts_json = serde_json::to_string(opts).unwrap_or_default();
        format!("{kind}|{selector}|{opts_json}")
    }
}

// ============================================================================
// PageNodeStore - Element Factories
// ============================================================================

impl PageNodeStore {
    /// Retrieves a [`PageElement`] with the store's defaults.
    #[must_use]
    pub fn element(&self, selector: &str) -> PageElement {
        self.element_with(selector, self.default_opts())
    }

    /// Retrieves a [`PageElement`] with explicit options.
    #[must_use]
    pub fn element_with(&self, selector: &str, opts: NodeOpts) -> PageElement {
        let key = Self::cache_key("PageElement", selector, &opts);
        let mut cache = self.inner.cache.lock();
        if let Some(GroupNode::Element(el)) = cache.get(&key) {
            return el.clone();
        }
        debug!(selector, "Creating PageElement");
        let el = PageElement::new(selector, Arc::clone(&self.inner.driver), opts);
        cache.insert(key, GroupNode::Element(el.clone()));
        el
    }

    /// Retrieves a [`ValuePageElement`] with the store's defaults.
    #[must_use]
    pub fn value_element(&self, selector: &str) -> ValuePageElement {
        self.value_element_with(selector, self.default_opts())
    }

    /// Retrieves a [`ValuePageElement`] with explicit options.
    #[must_use]
    pub fn value_element_with(&self, selector: &str, opts: NodeOpts) -> ValuePageElement {
        let key = Self::cache_key("ValuePageElement", selector, &opts);
        let mut cache = self.inner.cache.lock();
        if let Some(GroupNode::Value(el)) = cache.get(&key) {
            return el.clone();
        }
        debug!(selector, "Creating ValuePageElement");
        let el = ValuePageElement::new(selector, Arc::clone(&self.inner.driver), opts);
        cache.insert(key, GroupNode::Value(el.clone()));
        el
    }
}

// ============================================================================
// PageNodeStore - Collection Factories
// ============================================================================

impl PageNodeStore {
    /// Retrieves a list of plain elements.
    #[must_use]
    pub fn list(&self, selector: &str) -> PageElementList {
        self.list_with(selector, self.default_opts(), LeafKind::Element)
    }

    /// Retrieves a list of value elements.
    #[must_use]
    pub fn value_list(&self, selector: &str) -> PageElementList {
        self.list_with(selector, self.default_opts(), LeafKind::Value)
    }

    /// Retrieves a list with explicit options and member kind.
    #[must_use]
    pub fn list_with(&self, selector: &str, opts: NodeOpts, kind: LeafKind) -> PageElementList {
        let key = Self::cache_key(
            match kind {
                LeafKind::Element => "PageElementList",
                LeafKind::Value => "ValuePageElementList",
            },
            selector,
            &opts,
        );
        let mut cache = self.inner.cache.lock();
        if let Some(GroupNode::List(list)) = cache.get(&key) {
            return list.clone();
        }
        debug!(selector, "Creating PageElementList");
        let list = PageElementList::new(selector, Arc::clone(&self.inner.driver), opts, kind);
        cache.insert(key, GroupNode::List(list.clone()));
        list
    }

    /// Retrieves a map of plain elements.
    #[must_use]
    pub fn map(
        &self,
        selector: &str,
        mapping: Vec<(String, JsonValue)>,
        template: SelectorTemplate,
    ) -> PageElementMap {
        self.map_with(
            selector,
            self.default_opts(),
            LeafKind::Element,
            mapping,
            template,
        )
    }

    /// Retrieves a map of value elements.
    #[must_use]
    pub fn value_map(
        &self,
        selector: &str,
        mapping: Vec<(String, JsonValue)>,
        template: SelectorTemplate,
    ) -> PageElementMap {
        self.map_with(
            selector,
            self.default_opts(),
            LeafKind::Value,
            mapping,
            template,
        )
    }

    /// Retrieves a map with explicit options and member kind.
    #[must_use]
    pub fn map_with(
        &self,
        selector: &str,
        opts: NodeOpts,
        kind: LeafKind,
        mapping: Vec<(String, JsonValue)>,
        template: SelectorTemplate,
    ) -> PageElementMap {
        let key = Self::cache_key(
            match kind {
                LeafKind::Element => "PageElementMap",
                LeafKind::Value => "ValuePageElementMap",
            },
            selector,
            &opts,
        );
        let mut cache = self.inner.cache.lock();
        if let Some(GroupNode::Map(map)) = cache.get(&key) {
            return map.clone();
        }
        debug!(selector, "Creating PageElementMap");
        let map = PageElementMap::new(
            selector,
            Arc::clone(&self.inner.driver),
            opts,
            kind,
            mapping,
            template,
        );
        cache.insert(key, GroupNode::Map(map.clone()));
        map
    }

    /// Retrieves a group with the store's defaults.
    ///
    /// Groups are cached by `id` and options; repeated retrieval with the
    /// same identity returns the first construction's content.
    #[must_use]
    pub fn group(&self, id: &str, content: Vec<(String, GroupNode)>) -> PageElementGroup {
        self.group_with(id, content, self.default_opts())
    }

    /// Retrieves a group with explicit options.
    #[must_use]
    pub fn group_with(
        &self,
        id: &str,
        content: Vec<(String, GroupNode)>,
        opts: NodeOpts,
    ) -> PageElementGroup {
        let key = Self::cache_key("PageElementGroup", id, &opts);
        let mut cache = self.inner.cache.lock();
        if let Some(GroupNode::Group(group)) = cache.get(&key) {
            return group.clone();
        }
        debug!(id, "Creating PageElementGroup");
        let group = PageElementGroup::new(id, content, opts);
        cache.insert(key, GroupNode::Group(group.clone()));
        group
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::driver::mock::MockDriver;
    use crate::node::WaitType;

    fn store() -> PageNodeStore {
        PageNodeStore::new(Arc::new(MockDriver::new()), StoreConfig::default())
    }

    #[test]
    fn test_same_identity_returns_cached_instance() {
        let store = store();

        let a = store.element("//div");
        let b = store.element("//div");
        assert!(a.same_instance(&b));
        assert_eq!(store.cached_len(), 1);
    }

    #[test]
    fn test_different_options_are_different_instances() {
        let store = store();

        let a = store.element("//div");
        let b = store.element_with(
            "//div",
            store.default_opts().with_wait_type(WaitType::Visible),
        );
        assert!(!a.same_instance(&b));
        assert_eq!(store.cached_len(), 2);
    }

    #[test]
    fn test_kinds_do_not_collide_on_selector() {
        let store = store();

        let _el = store.element("//input");
        let _val = store.value_element("//input");
        let _list = store.list("//input");
        assert_eq!(store.cached_len(), 3);

        // Same selector and kind still unifies.
        assert!(store.value_element("//input").same_instance(&store.value_element("//input")));
    }

    #[test]
    fn test_list_kinds_cached_separately() {
        let store = store();

        let plain = store.list("//li");
        let valued = store.value_list("//li");
        assert!(!plain.same_instance(&valued));
        assert!(plain.same_instance(&store.list("//li")));
    }

    #[test]
    fn test_store_config_threads_defaults_into_nodes() {
        let driver = Arc::new(MockDriver::new());
        let store = PageNodeStore::new(
            driver,
            StoreConfig::new().with_timeout_ms(1234).with_interval_ms(56),
        );

        let el = store.element("//div");
        assert_eq!(el.opts().timeout_ms, 1234);
        assert_eq!(el.opts().interval_ms, 56);
    }

    #[test]
    fn test_map_and_group_retrieval() {
        let store = store();

        fn template(base: &str, value: &JsonValue) -> String {
            format!("{base}[@data-k='{}']", value.as_str().unwrap_or_default())
        }

        let m1 = store.map("//ul", vec![("a".into(), json!("a"))], template);
        let m2 = store.map("//ul", vec![("a".into(), json!("a"))], template);
        assert!(m1.same_instance(&m2));

        let g1 = store.group(
            "header",
            vec![("logo".into(), GroupNode::Element(store.element("//img")))],
        );
        let g2 = store.group("header", vec![]);
        // Cached by identity: the second retrieval keeps the first content.
        assert!(g1.same_instance(&g2));
        assert_eq!(g2.keys(), vec!["logo"]);
    }

    #[test]
    fn test_shared_instance_shares_identification_state() {
        let store = store();

        let a = store.list("//li");
        a.set_identifier(crate::node::list::Identifier::by_text(vec![(
            "x".into(),
            json!("X"),
        )]));

        let b = store.list("//li");
        assert!(b.identifier().is_some());
    }
}
