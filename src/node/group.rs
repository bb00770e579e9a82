//! Named heterogeneous collections of page nodes.
//!
//! A [`PageElementGroup`] maps fixed logical keys to any node kind:
//! elements, value elements, lists, maps or nested groups. The key set is
//! fixed at construction and shared by every bulk result shape. All bulk
//! verbs delegate to the [`walker`](super::walker); the group itself adds
//! no traversal logic.
//!
//! # Example
//!
//! ```ignore
//! let login = store.group("login", vec![
//!     ("user".into(), GroupNode::Value(store.value_element("//input[@name='user']"))),
//!     ("submit".into(), GroupNode::Element(store.element("//button"))),
//! ]);
//!
//! login.set_value(&ValueTree::from_pairs(vec![
//!     ("user".into(), serde_json::json!("alice")),
//! ])).await?;
//! let texts = login.get_text(None).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Diff, Error, Result};
use crate::wait::{self, WaitOpts};

use super::element::PageElement;
use super::list::PageElementList;
use super::map::PageElementMap;
use super::value::ValuePageElement;
use super::walker::{self, ResultTree, ValueTree, Verb, WalkOptions};
use super::{NodeOpts, PageNode};

// ============================================================================
// GroupNode
// ============================================================================

/// Any node kind a group can hold.
///
/// A closed set with a discriminant tag: the walker dispatches by matching
/// on the variant and fails loudly on a missing case instead of probing
/// children for method presence.
#[derive(Debug, Clone)]
pub enum GroupNode {
    /// A plain element.
    Element(PageElement),
    /// An element with a widget value.
    Value(ValuePageElement),
    /// An ordered list.
    List(PageElementList),
    /// A fixed named map.
    Map(PageElementMap),
    /// A nested group.
    Group(PageElementGroup),
}

impl GroupNode {
    /// The node kind name used in error messages.
    #[must_use]
    pub fn node_kind(&self) -> &'static str {
        match self {
            Self::Element(n) => PageNode::node_kind(n),
            Self::Value(n) => PageNode::node_kind(n),
            Self::List(n) => PageNode::node_kind(n),
            Self::Map(n) => PageNode::node_kind(n),
            Self::Group(n) => PageNode::node_kind(n),
        }
    }

    /// Returns `true` when both nodes are the same cached instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => a.same_instance(b),
            (Self::Value(a), Self::Value(b)) => a.same_instance(b),
            (Self::List(a), Self::List(b)) => a.same_instance(b),
            (Self::Map(a), Self::Map(b)) => a.same_instance(b),
            (Self::Group(a), Self::Group(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

// ============================================================================
// PageElementGroup
// ============================================================================

struct GroupInner {
    id: String,
    content: Vec<(String, GroupNode)>,
    opts: NodeOpts,
}

/// A named, fixed mapping from logical keys to nodes of any kind.
///
/// Cheap to clone; clones share the content.
#[derive(Clone)]
pub struct PageElementGroup {
    inner: Arc<GroupInner>,
}

impl fmt::Debug for PageElementGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageElementGroup")
            .field("id", &self.inner.id)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl PageNode for PageElementGroup {
    fn selector(&self) -> &str {
        &self.inner.id
    }

    fn node_kind(&self) -> &'static str {
        "PageElementGroup"
    }

    fn timeout_ms(&self) -> u64 {
        self.inner.opts.timeout_ms
    }

    fn interval_ms(&self) -> u64 {
        self.inner.opts.interval_ms
    }
}

impl PageElementGroup {
    /// Creates a group with a fixed key set.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        content: Vec<(String, GroupNode)>,
        opts: NodeOpts,
    ) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                id: id.into(),
                content,
                opts,
            }),
        }
    }

    /// Returns this group's identity, used in error messages.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Logical keys, in declaration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .content
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// The group's named children, in declaration order.
    #[must_use]
    pub fn content(&self) -> &[(String, GroupNode)] {
        &self.inner.content
    }

    /// Returns the child under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GroupNode> {
        self.inner
            .content
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    /// Returns `true` when both nodes share the same cached instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn collection(&self) -> String {
        format!("group '{}'", self.inner.id)
    }
}

// ============================================================================
// PageElementGroup - Bulk Verbs
// ============================================================================

impl PageElementGroup {
    /// Applies any verb with explicit walk options.
    ///
    /// The convenience verbs below all route through here with defaults.
    pub async fn solve(
        &self,
        verb: &Verb,
        values: Option<&ValueTree>,
        options: &WalkOptions,
    ) -> Result<ResultTree> {
        walker::walk(verb, self.content(), values, options, &self.collection()).await
    }

    /// Reads each selected child's text.
    pub async fn get_text(&self, mask: Option<&ValueTree>) -> Result<ResultTree> {
        self.solve(&Verb::GetText, mask, &WalkOptions::default())
            .await
    }

    /// Reads each selected value-capable child's value; children without
    /// values are omitted.
    pub async fn get_value(&self, mask: Option<&ValueTree>) -> Result<ResultTree> {
        self.solve(&Verb::GetValue, mask, &WalkOptions::default())
            .await
    }

    /// Assigns values from a same-shaped tree; children without values are
    /// skipped.
    pub async fn set_value(&self, values: &ValueTree) -> Result<()> {
        self.solve(&Verb::SetValue, Some(values), &WalkOptions::default())
            .await?;
        Ok(())
    }

    /// Whether every named child's text equals its expectation.
    pub async fn has_text(&self, expected: &ValueTree) -> Result<bool> {
        Ok(self
            .solve(&Verb::HasText, Some(expected), &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every named child's text contains its expectation.
    pub async fn contains_text(&self, expected: &ValueTree) -> Result<bool> {
        Ok(self
            .solve(&Verb::ContainsText, Some(expected), &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every selected child has non-empty text.
    pub async fn has_any_text(&self, mask: Option<&ValueTree>) -> Result<bool> {
        Ok(self
            .solve(&Verb::HasAnyText, mask, &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every named value child's value equals its expectation.
    pub async fn has_value(&self, expected: &ValueTree, tolerance: Option<f64>) -> Result<bool> {
        Ok(self
            .solve(
                &Verb::HasValue { tolerance },
                Some(expected),
                &WalkOptions::default(),
            )
            .await?
            .all_hold())
    }

    /// Whether every named value child's value structurally contains its
    /// expectation.
    pub async fn contains_value(&self, expected: &ValueTree) -> Result<bool> {
        Ok(self
            .solve(&Verb::ContainsValue, Some(expected), &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every selected value child has a non-empty value.
    pub async fn has_any_value(&self, mask: Option<&ValueTree>) -> Result<bool> {
        Ok(self
            .solve(&Verb::HasAnyValue, mask, &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every selected child exists.
    pub async fn exists(&self, mask: Option<&ValueTree>) -> Result<bool> {
        Ok(self
            .solve(&Verb::Exists, mask, &WalkOptions::default())
            .await?
            .all_hold())
    }

    /// Whether every selected child is visible.
    pub async fn is_visible(&self, mask: Option<&ValueTree>) -> Result<bool> {
        Ok(self
            .solve(&Verb::IsVisible, mask, &WalkOptions::default())
            .await?
            .all_hold())
    }
}

// ============================================================================
// PageElementGroup - Modes
// ============================================================================

impl PageElementGroup {
    /// Blocking aggregated predicates: poll until every participating child
    /// holds, then return the group for chaining; raise
    /// [`WaitTimeout`](crate::Error::WaitTimeout) otherwise.
    ///
    /// The inherent bulk predicates above are the immediate form.
    #[inline]
    #[must_use]
    pub fn wait(&self) -> GroupWait<'_> {
        GroupWait {
            group: self,
            negate: false,
        }
    }

    /// Blocking aggregated predicates: identical polling, timeout becomes
    /// `false`.
    #[inline]
    #[must_use]
    pub fn eventually(&self) -> GroupEventually<'_> {
        GroupEventually {
            group: self,
            negate: false,
        }
    }

    async fn poll_verb(
        &self,
        verb: &Verb,
        values: Option<&ValueTree>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Result<bool> {
        let timeout = Duration::from_millis(opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms));
        let interval =
            Duration::from_millis(opts.interval_ms.unwrap_or(self.inner.opts.interval_ms));

        let group = self;
        wait::poll(timeout, interval, move || async move {
            Ok(group
                .solve(verb, values, &WalkOptions::default())
                .await?
                .all_hold()
                != negate)
        })
        .await
    }

    async fn verb_timeout(
        &self,
        verb: &Verb,
        values: Option<&ValueTree>,
        opts: &WaitOpts,
        negate: bool,
    ) -> Error {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.inner.opts.timeout_ms);
        // Report the read-back state, not the boolean verdicts: an
        // expectation tree passed to a read verb scopes the same keys.
        let read_verb = match verb {
            Verb::HasText | Verb::ContainsText | Verb::HasAnyText => Verb::GetText,
            Verb::HasValue { .. } | Verb::ContainsValue | Verb::HasAnyValue => Verb::GetValue,
            other => other.clone(),
        };
        let actual = match self.solve(&read_verb, values, &WalkOptions::default()).await {
            Ok(tree) => Some(tree.to_json().to_string()),
            Err(_) => None,
        };
        let label = if negate {
            format!("not.{}", verb.name())
        } else {
            verb.name().to_string()
        };
        Error::wait_timeout(
            self.id(),
            label,
            timeout_ms,
            Some(Diff {
                expected: values.map(|v| v.to_json().to_string()),
                actual,
            }),
        )
    }
}

/// Blocking aggregated predicates; timeout raises.
#[derive(Clone, Copy)]
pub struct GroupWait<'a> {
    group: &'a PageElementGroup,
    negate: bool,
}

impl<'a> GroupWait<'a> {
    /// The same predicates, negated: wait until the aggregate stops holding.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(
        self,
        verb: Verb,
        values: Option<&ValueTree>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        if self.group.poll_verb(&verb, values, opts, self.negate).await? {
            Ok(self.group)
        } else {
            Err(self
                .group
                .verb_timeout(&verb, values, opts, self.negate)
                .await)
        }
    }

    pub async fn has_text(
        self,
        expected: &ValueTree,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::HasText, Some(expected), opts).await
    }

    pub async fn contains_text(
        self,
        expected: &ValueTree,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::ContainsText, Some(expected), opts).await
    }

    pub async fn has_any_text(
        self,
        mask: Option<&ValueTree>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::HasAnyText, mask, opts).await
    }

    pub async fn has_value(
        self,
        expected: &ValueTree,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::HasValue { tolerance }, Some(expected), opts)
            .await
    }

    pub async fn contains_value(
        self,
        expected: &ValueTree,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::ContainsValue, Some(expected), opts).await
    }

    pub async fn has_any_value(
        self,
        mask: Option<&ValueTree>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::HasAnyValue, mask, opts).await
    }

    pub async fn exists(
        self,
        mask: Option<&ValueTree>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::Exists, mask, opts).await
    }

    pub async fn is_visible(
        self,
        mask: Option<&ValueTree>,
        opts: &WaitOpts,
    ) -> Result<&'a PageElementGroup> {
        self.run(Verb::IsVisible, mask, opts).await
    }
}

/// Blocking aggregated predicates; timeout is `false`.
#[derive(Clone, Copy)]
pub struct GroupEventually<'a> {
    group: &'a PageElementGroup,
    negate: bool,
}

impl GroupEventually<'_> {
    /// The same predicates, negated.
    #[inline]
    #[must_use]
    pub fn not(self) -> Self {
        Self {
            negate: true,
            ..self
        }
    }

    async fn run(self, verb: Verb, values: Option<&ValueTree>, opts: &WaitOpts) -> Result<bool> {
        self.group.poll_verb(&verb, values, opts, self.negate).await
    }

    pub async fn has_text(self, expected: &ValueTree, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::HasText, Some(expected), opts).await
    }

    pub async fn contains_text(self, expected: &ValueTree, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::ContainsText, Some(expected), opts).await
    }

    pub async fn has_any_text(self, mask: Option<&ValueTree>, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::HasAnyText, mask, opts).await
    }

    pub async fn has_value(
        self,
        expected: &ValueTree,
        tolerance: Option<f64>,
        opts: &WaitOpts,
    ) -> Result<bool> {
        self.run(Verb::HasValue { tolerance }, Some(expected), opts)
            .await
    }

    pub async fn contains_value(self, expected: &ValueTree, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::ContainsValue, Some(expected), opts).await
    }

    pub async fn has_any_value(self, mask: Option<&ValueTree>, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::HasAnyValue, mask, opts).await
    }

    pub async fn exists(self, mask: Option<&ValueTree>, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::Exists, mask, opts).await
    }

    pub async fn is_visible(self, mask: Option<&ValueTree>, opts: &WaitOpts) -> Result<bool> {
        self.run(Verb::IsVisible, mask, opts).await
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
    use crate::node::LeafKind;

    fn opts() -> NodeOpts {
        NodeOpts::new(100, 10)
    }

    fn login_group(driver: &MockDriver) -> PageElementGroup {
        driver.insert(
            "//input[@name='user']",
            MockElement::new().with_value("alice"),
        );
        driver.insert("//button", MockElement::new().with_text("Sign in"));

        PageElementGroup::new(
            "login",
            vec![
                (
                    "user".to_string(),
                    GroupNode::Value(ValuePageElement::new(
                        "//input[@name='user']",
                        Arc::new(driver.clone()),
                        opts(),
                    )),
                ),
                (
                    "submit".to_string(),
                    GroupNode::Element(PageElement::new(
                        "//button",
                        Arc::new(driver.clone()),
                        opts(),
                    )),
                ),
            ],
            opts(),
        )
    }

    #[test]
    fn test_fixed_keys_and_lookup() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        assert_eq!(group.keys(), vec!["user", "submit"]);
        assert!(matches!(group.get("user"), Some(GroupNode::Value(_))));
        assert!(group.get("password").is_none());
    }

    #[tokio::test]
    async fn test_get_text_covers_all_children() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        let result = group.get_text(None).await.unwrap();
        assert_eq!(
            result.to_json(),
            json!({"user": "", "submit": "Sign in"})
        );
    }

    #[tokio::test]
    async fn test_get_value_omits_plain_children() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        let result = group.get_value(None).await.unwrap();
        assert_eq!(result.to_json(), json!({"user": "alice"}));
    }

    #[tokio::test]
    async fn test_set_value_then_has_value() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        group
            .set_value(&ValueTree::from_pairs(vec![("user".into(), json!("bob"))]))
            .await
            .unwrap();

        assert!(
            group
                .has_value(
                    &ValueTree::from_pairs(vec![("user".into(), json!("bob"))]),
                    None,
                )
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_exists_with_mask() {
        let driver = MockDriver::new();
        let group = login_group(&driver);
        driver.remove("//button");

        assert!(!group.exists(None).await.unwrap());
        let mask = ValueTree::from_pairs(vec![
            ("user".into(), json!(true)),
            ("submit".into(), json!(false)),
        ]);
        assert!(group.exists(Some(&mask)).await.unwrap());
    }

    #[tokio::test]
    async fn test_nested_group_with_list() {
        let driver = MockDriver::new();
        driver.insert("//li", MockElement::new().with_count(2));
        driver.insert("(//li)[1]", MockElement::new().with_text("one"));
        driver.insert("(//li)[2]", MockElement::new().with_text("two"));

        let group = PageElementGroup::new(
            "menu",
            vec![(
                "items".to_string(),
                GroupNode::List(PageElementList::new(
                    "//li",
                    Arc::new(driver.clone()),
                    opts(),
                    LeafKind::Element,
                )),
            )],
            opts(),
        );

        let result = group.get_text(None).await.unwrap();
        assert_eq!(result.to_json(), json!({"items": ["one", "two"]}));
        assert!(group.has_any_text(None).await.unwrap());
    }

    // ------------------------------------------------------------------
    // aggregated modes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_wait_has_text_succeeds_after_delay() {
        let driver = MockDriver::new();
        let group = login_group(&driver);
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//button").unwrap().text = "Ready".into();
        });

        let expected = ValueTree::from_pairs(vec![("submit".into(), json!("Ready"))]);
        let chained = group
            .wait()
            .has_text(&expected, &WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
        assert!(chained.same_instance(&group));
    }

    #[tokio::test]
    async fn test_wait_timeout_carries_group_id_and_diff() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        let expected = ValueTree::from_pairs(vec![("user".into(), json!("carol"))]);
        let err = group
            .wait()
            .has_value(&expected, None, &WaitOpts::new().with_timeout_ms(30))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("login"));
        assert!(msg.contains("hasValue"));
        assert!(msg.contains("carol"));
        assert!(msg.contains("alice"));
    }

    #[tokio::test]
    async fn test_eventually_bulk_predicates() {
        let driver = MockDriver::new();
        let group = login_group(&driver);

        let opts = WaitOpts::new().with_timeout_ms(30);
        let wrong = ValueTree::from_pairs(vec![("user".into(), json!("nobody"))]);
        assert!(!group.eventually().has_value(&wrong, None, &opts).await.unwrap());
        assert!(group.eventually().not().has_value(&wrong, None, &opts).await.unwrap());
        assert!(group.eventually().exists(None, &opts).await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_exists_after_child_appears() {
        let driver = MockDriver::new();
        let group = login_group(&driver);
        driver.remove("//button");
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.insert("//button".into(), MockElement::new());
        });

        group
            .wait()
            .exists(None, &WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
    }
}
