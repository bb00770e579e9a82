//! Recursive bulk-operation solver for group trees.
//!
//! Every group-level bulk verb routes through one traversal: [`walk`] takes
//! a [`Verb`], the group's named content, an optional value tree scoping
//! which keys to visit (and what to expect of or assign to each), and
//! assembles a [`ResultTree`] mirroring the visited key structure.
//!
//! Dispatch is by node kind over the closed [`GroupNode`] set. A child that
//! does not support the verb (for example `getValue` on a plain text
//! element) is silently omitted from the result; an expectation key with no
//! matching child is an error by default. Keys whose children produced no
//! usable result are omitted entirely, so callers can distinguish "no
//! opinion" from `false` or empty.

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{Error, Result};

use super::Leaf;
use super::group::GroupNode;
use super::list::{ListValues, PageElementList};
use super::map::PageElementMap;
use super::value::values_equal;

// ============================================================================
// Verb
// ============================================================================

/// The per-node operation a walk applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Verb {
    /// Read each node's text.
    GetText,
    /// Read each value node's value.
    GetValue,
    /// Assign each value node its value from the value tree.
    SetValue,
    /// Whether each node's text equals its expectation.
    HasText,
    /// Whether each node's text contains its expectation.
    ContainsText,
    /// Whether each node has non-empty text.
    HasAnyText,
    /// Whether each value node's value equals its expectation.
    HasValue {
        /// Numeric tolerance for the comparison.
        tolerance: Option<f64>,
    },
    /// Whether each value node's value structurally contains its
    /// expectation.
    ContainsValue,
    /// Whether each value node has a non-empty value.
    HasAnyValue,
    /// Whether each node exists.
    Exists,
    /// Whether each node is visible.
    IsVisible,
}

impl Verb {
    /// Verb name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetText => "getText",
            Self::GetValue => "getValue",
            Self::SetValue => "setValue",
            Self::HasText => "hasText",
            Self::ContainsText => "containsText",
            Self::HasAnyText => "hasAnyText",
            Self::HasValue { .. } => "hasValue",
            Self::ContainsValue => "containsValue",
            Self::HasAnyValue => "hasAnyValue",
            Self::Exists => "exists",
            Self::IsVisible => "isVisible",
        }
    }

    /// Whether the value tree acts as a participation mask rather than a
    /// per-key expectation.
    #[must_use]
    pub fn is_filtering(&self) -> bool {
        matches!(
            self,
            Self::GetText
                | Self::GetValue
                | Self::HasAnyText
                | Self::HasAnyValue
                | Self::Exists
                | Self::IsVisible
        )
    }

    /// Whether the verb needs an expectation value per visited node.
    fn needs_value(&self) -> bool {
        matches!(
            self,
            Self::SetValue | Self::HasText | Self::ContainsText | Self::HasValue { .. }
                | Self::ContainsValue
        )
    }
}

// ============================================================================
// Trees
// ============================================================================

/// A value-shaped tree scoping a walk.
///
/// Branch entries are in declaration order; for filtering verbs leaves act
/// as boolean masks (`false` skips the key), for expectation verbs they are
/// the expected or assigned values.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTree {
    /// A per-node mask or expectation value.
    Leaf(JsonValue),
    /// Nested per-key sub-trees.
    Branch(Vec<(String, ValueTree)>),
}

impl ValueTree {
    /// Builds a branch from key/value leaves.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, JsonValue)>) -> Self {
        Self::Branch(pairs.into_iter().map(|(k, v)| (k, Self::Leaf(v))).collect())
    }

    /// Flattens the tree into plain JSON, used in timeout diffs.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Leaf(v) => v.clone(),
            Self::Branch(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// The assembled result of a walk, mirroring the visited key structure.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultTree {
    /// A single node's result.
    Value(JsonValue),
    /// Per-key sub-results, in visit order.
    Nested(Vec<(String, ResultTree)>),
    /// A captured per-node failure (only with `throw_solve_error` off).
    Failure(String),
}

impl ResultTree {
    /// Looks up a direct sub-result by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResultTree> {
        match self {
            Self::Nested(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether every boolean leaf in the tree is `true`.
    ///
    /// This is how predicate verbs aggregate: a group `hasText` holds when
    /// every participating child reported `true`. Failures count as not
    /// holding; an empty tree holds vacuously.
    #[must_use]
    pub fn all_hold(&self) -> bool {
        match self {
            Self::Value(JsonValue::Bool(b)) => *b,
            Self::Value(JsonValue::Array(items)) => {
                items.iter().all(|v| v.as_bool().unwrap_or(false))
            }
            Self::Value(_) => false,
            Self::Nested(entries) => entries.iter().all(|(_, sub)| sub.all_hold()),
            Self::Failure(_) => false,
        }
    }

    /// Flattens the tree into plain JSON (failures become strings).
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Value(v) => v.clone(),
            Self::Nested(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Failure(message) => JsonValue::String(format!("error: {message}")),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Nested(entries) => entries.is_empty(),
            Self::Value(JsonValue::Array(items)) => items.is_empty(),
            _ => false,
        }
    }
}

// ============================================================================
// WalkOptions
// ============================================================================

/// Error policy for a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Raise when a value-tree key has no matching child (default `true`);
    /// otherwise skip the key silently.
    pub throw_unmatched_key: bool,

    /// Re-raise per-node solve errors (default `true`), aborting the
    /// remaining traversal at that level; otherwise capture each error as a
    /// [`ResultTree::Failure`] and continue.
    pub throw_solve_error: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            throw_unmatched_key: true,
            throw_solve_error: true,
        }
    }
}

// ============================================================================
// Walk
// ============================================================================

/// Applies `verb` across `content`, scoped by an optional value tree.
///
/// Visits the value tree's keys when present, else all of `content`, in
/// declaration order. See the module docs for omission semantics.
pub async fn walk(
    verb: &Verb,
    content: &[(String, GroupNode)],
    values: Option<&ValueTree>,
    options: &WalkOptions,
    collection: &str,
) -> Result<ResultTree> {
    debug!(verb = verb.name(), collection, "Walking group content");
    walk_inner(verb, content, values, options, collection).await
}

fn walk_inner<'a>(
    verb: &'a Verb,
    content: &'a [(String, GroupNode)],
    values: Option<&'a ValueTree>,
    options: &'a WalkOptions,
    collection: &'a str,
) -> BoxFuture<'a, Result<ResultTree>> {
    Box::pin(async move {
        // Keys to visit: the value tree's keys when given, else everything.
        let visits: Vec<(&str, Option<&ValueTree>)> = match values {
            Some(ValueTree::Branch(entries)) => entries
                .iter()
                .map(|(k, v)| (k.as_str(), Some(v)))
                .collect(),
            Some(leaf @ ValueTree::Leaf(_)) => content
                .iter()
                .map(|(k, _)| (k.as_str(), Some(leaf)))
                .collect(),
            None => content.iter().map(|(k, _)| (k.as_str(), None)).collect(),
        };

        let mut results = Vec::new();

        for (key, value) in visits {
            let Some((_, node)) = content.iter().find(|(k, _)| k == key) else {
                if options.throw_unmatched_key {
                    return Err(Error::unmatched_key(key, collection.to_string()));
                }
                continue;
            };

            let sub = match node {
                GroupNode::Element(el) => {
                    solve_policy(
                        verb,
                        &Leaf::Element(el.clone()),
                        leaf_value(verb, value, key, collection)?,
                        options,
                    )
                    .await?
                }
                GroupNode::Value(el) => {
                    solve_policy(
                        verb,
                        &Leaf::Value(el.clone()),
                        leaf_value(verb, value, key, collection)?,
                        options,
                    )
                    .await?
                }
                GroupNode::List(list) => walk_list(verb, list, value, options).await?,
                GroupNode::Map(map) => walk_map(verb, map, value, options).await?,
                GroupNode::Group(group) => {
                    let nested =
                        walk_inner(verb, group.content(), value, options, group.id()).await?;
                    // A group key appears only when at least one descendant
                    // produced output.
                    if nested.is_empty() { None } else { Some(nested) }
                }
            };

            if let Some(sub) = sub {
                results.push((key.to_string(), sub));
            }
        }

        Ok(ResultTree::Nested(results))
    })
}

// ============================================================================
// Per-Kind Dispatch
// ============================================================================

/// Extracts a leaf-shaped value for an element child.
///
/// A nested branch under an element key is a programming error.
fn leaf_value<'v>(
    verb: &Verb,
    value: Option<&'v ValueTree>,
    key: &str,
    collection: &str,
) -> Result<Option<&'v JsonValue>> {
    match value {
        None => Ok(None),
        Some(ValueTree::Leaf(v)) => Ok(Some(v)),
        Some(ValueTree::Branch(_)) => Err(Error::config(format!(
            "nested values under element key '{key}' in {collection} for {}",
            verb.name()
        ))),
    }
}

/// Whether a filtering verb's mask excludes this node.
fn mask_excludes(verb: &Verb, value: Option<&JsonValue>) -> bool {
    verb.is_filtering() && matches!(value, Some(JsonValue::Bool(false)))
}

/// Solves one leaf under the walk's error policy.
async fn solve_policy(
    verb: &Verb,
    leaf: &Leaf,
    value: Option<&JsonValue>,
    options: &WalkOptions,
) -> Result<Option<ResultTree>> {
    if mask_excludes(verb, value) {
        return Ok(None);
    }
    let expected = if verb.is_filtering() { None } else { value };

    match solve_leaf(verb, leaf, expected).await {
        Ok(None) => Ok(None),
        Ok(Some(result)) => Ok(Some(ResultTree::Value(result))),
        Err(e) if options.throw_solve_error => Err(e),
        Err(e) => Ok(Some(ResultTree::Failure(e.to_string()))),
    }
}

async fn walk_list(
    verb: &Verb,
    list: &PageElementList,
    values: Option<&ValueTree>,
    options: &WalkOptions,
) -> Result<Option<ResultTree>> {
    match values {
        // Key-scoped access requires prior identification.
        Some(ValueTree::Branch(entries)) => {
            let mut results = Vec::new();
            for (key, sub) in entries {
                let ValueTree::Leaf(value) = sub else {
                    return Err(Error::config(format!(
                        "nested values under list key '{key}' in '{}'",
                        list.selector()
                    )));
                };
                let leaf = match list.by_key(key).await {
                    Ok(leaf) => leaf,
                    Err(e) if matches!(e, Error::UnmatchedKey { .. })
                        && !options.throw_unmatched_key =>
                    {
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if let Some(result) = solve_policy(verb, &leaf, Some(value), options).await? {
                    results.push((key.clone(), result));
                }
            }
            Ok((!results.is_empty()).then_some(ResultTree::Nested(results)))
        }

        // Positional: one value per member, or one value for all, or none.
        other => {
            let members = list.all().await?;
            let per_member: Vec<Option<&JsonValue>> = match other {
                Some(ValueTree::Leaf(JsonValue::Array(vs))) if verb.needs_value() => {
                    ListValues::Each(vs.clone()).into_checked(members.len(), list.selector())?;
                    vs.iter().map(Some).collect()
                }
                Some(ValueTree::Leaf(v)) => vec![Some(v); members.len()],
                _ => vec![None; members.len()],
            };

            let mut results = Vec::new();
            for (leaf, value) in members.iter().zip(per_member) {
                if mask_excludes(verb, value) {
                    continue;
                }
                let expected = if verb.is_filtering() { None } else { value };
                match solve_leaf(verb, leaf, expected).await {
                    Ok(None) => {}
                    Ok(Some(result)) => results.push(result),
                    Err(e) if options.throw_solve_error => return Err(e),
                    Err(e) => results.push(JsonValue::String(format!("error: {e}"))),
                }
            }
            Ok((!results.is_empty()).then_some(ResultTree::Value(JsonValue::Array(results))))
        }
    }
}

async fn walk_map(
    verb: &Verb,
    map: &PageElementMap,
    values: Option<&ValueTree>,
    options: &WalkOptions,
) -> Result<Option<ResultTree>> {
    let entries = map.entries();

    let visits: Vec<(String, Option<&ValueTree>)> = match values {
        Some(ValueTree::Branch(sub)) => {
            let mut visits = Vec::new();
            for (key, value) in sub {
                if entries.iter().any(|(k, _)| k == key) {
                    visits.push((key.clone(), Some(value)));
                } else if options.throw_unmatched_key {
                    return Err(Error::unmatched_key(
                        key,
                        format!("map '{}'", map.selector()),
                    ));
                }
            }
            visits
        }
        Some(leaf @ ValueTree::Leaf(_)) => entries
            .iter()
            .map(|(k, _)| (k.clone(), Some(leaf)))
            .collect(),
        None => entries.iter().map(|(k, _)| (k.clone(), None)).collect(),
    };

    let mut results = Vec::new();
    for (key, value) in visits {
        // Map members are always leaves.
        let leaf = map.get(&key)?;
        let value = leaf_value(verb, value, &key, &format!("map '{}'", map.selector()))?;
        if let Some(result) = solve_policy(verb, &leaf, value, options).await? {
            results.push((key, result));
        }
    }
    Ok((!results.is_empty()).then_some(ResultTree::Nested(results)))
}

// ============================================================================
// Leaf Solving
// ============================================================================

/// Applies one verb to one leaf.
///
/// Returns `Ok(None)` when the leaf does not support the verb; value verbs
/// on a plain element are the canonical case.
async fn solve_leaf(
    verb: &Verb,
    leaf: &Leaf,
    expected: Option<&JsonValue>,
) -> Result<Option<JsonValue>> {
    let require = |name: &str| -> Result<&JsonValue> {
        expected.ok_or_else(|| {
            Error::config(format!(
                "verb '{name}' requires a value for {}",
                leaf.selector()
            ))
        })
    };

    match verb {
        Verb::GetText => Ok(Some(JsonValue::String(leaf.get_text().await?))),

        Verb::GetValue => match leaf.value() {
            Some(v) => Ok(Some(v.get_value().await?)),
            None => Ok(None),
        },

        Verb::SetValue => {
            let value = require("setValue")?;
            match leaf.value() {
                Some(v) => {
                    v.set_value(value).await?;
                    Ok(Some(JsonValue::Bool(true)))
                }
                None => Ok(None),
            }
        }

        Verb::HasText => {
            let want = require("hasText")?;
            let text = leaf.element().currently().get_text().await?;
            let held = match want {
                JsonValue::String(s) => text == *s,
                other => text == other.to_string(),
            };
            Ok(Some(JsonValue::Bool(held)))
        }

        Verb::ContainsText => {
            let want = require("containsText")?;
            let text = leaf.element().currently().get_text().await?;
            let needle = match want {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(Some(JsonValue::Bool(text.contains(&needle))))
        }

        Verb::HasAnyText => {
            let text = leaf.element().currently().get_text().await?;
            Ok(Some(JsonValue::Bool(!text.is_empty())))
        }

        Verb::HasValue { tolerance } => {
            let want = require("hasValue")?;
            match leaf.value() {
                Some(v) => {
                    let actual = v.currently().get_value().await?;
                    Ok(Some(JsonValue::Bool(values_equal(
                        &actual, want, *tolerance,
                    ))))
                }
                None => Ok(None),
            }
        }

        Verb::ContainsValue => {
            let want = require("containsValue")?;
            match leaf.value() {
                Some(v) => Ok(Some(JsonValue::Bool(
                    v.currently().contains_value(want).await?,
                ))),
                None => Ok(None),
            }
        }

        Verb::HasAnyValue => match leaf.value() {
            Some(v) => Ok(Some(JsonValue::Bool(v.currently().has_any_value().await?))),
            None => Ok(None),
        },

        Verb::Exists => Ok(Some(JsonValue::Bool(
            leaf.element().currently().exists().await?,
        ))),

        Verb::IsVisible => Ok(Some(JsonValue::Bool(
            leaf.element().currently().is_visible().await?,
        ))),
    }
}

// ============================================================================
// ListValues bridge
// ============================================================================

impl ListValues {
    /// Length validation reused by the walker's positional list case.
    fn into_checked(self, len: usize, selector: &str) -> Result<()> {
        match &self {
            Self::Each(vs) if vs.len() != len => Err(Error::config(format!(
                "value count {} does not match list length {len} for {selector}",
                vs.len()
            ))),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
