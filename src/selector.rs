//! XPath selector composition.
//!
//! Provides a chainable builder for structural path-query selectors.
//!
//! # Example
//!
//! ```ignore
//! use pagewright::XPathBuilder;
//!
//! let selector = XPathBuilder::new("//div")
//!     .attr("id", "login")
//!     .contained_class("visible")
//!     .build();
//! // "//div[@id='login'][contains(@class,'visible')]"
//! ```
//!
//! The builder is a plain value type: construct one per composition and
//! discard it. `build` does not mutate or reset, so further refinements on
//! the same builder keep compounding bracket clauses onto the same string.
//! Text and attribute-equality refinements are therefore single-use per
//! logical element: applying `text` twice produces a selector that requires
//! both clauses at once, which is very likely unintended. Use
//! [`constraint`](XPathBuilder::constraint) for deliberate multi-clause
//! predicates.
//!
//! No method validates selector syntax; a malformed selector surfaces only
//! when the driver attempts to resolve it.

// ============================================================================
// XPathBuilder
// ============================================================================

/// Chainable builder for XPath-style structural selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XPathBuilder {
    selector: String,
}

// ============================================================================
// Constructors
// ============================================================================

impl XPathBuilder {
    /// Creates a builder starting from the given selector.
    #[inline]
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            selector: start.into(),
        }
    }

    /// Discards the accumulated state and starts over from `selector`.
    #[inline]
    #[must_use]
    pub fn reset(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

// ============================================================================
// Refinements
// ============================================================================

impl XPathBuilder {
    /// Appends raw text to the current selector.
    #[must_use]
    pub fn append(mut self, fragment: &str) -> Self {
        self.selector.push_str(fragment);
        self
    }

    /// Wraps the current selector in a bracketed predicate `[expr]`.
    #[must_use]
    pub fn constraint(mut self, expr: &str) -> Self {
        self.selector.push('[');
        self.selector.push_str(expr);
        self.selector.push(']');
        self
    }

    /// Adds an exact text-content clause `[. = 'value']`.
    ///
    /// Single-use per logical element; see the module docs.
    #[must_use]
    pub fn text(self, value: &str) -> Self {
        let lit = escape(value);
        self.constraint(&format!(". = {lit}"))
    }

    /// Adds a substring text-content clause `[contains(.,'value')]`.
    ///
    /// Single-use per logical element; see the module docs.
    #[must_use]
    pub fn contained_text(self, value: &str) -> Self {
        let lit = escape(value);
        self.constraint(&format!("contains(.,{lit})"))
    }

    /// Adds an exact attribute-equality clause `[@key='value']`.
    #[must_use]
    pub fn attr(self, key: &str, value: &str) -> Self {
        let lit = escape(value);
        self.constraint(&format!("@{key}={lit}"))
    }

    /// Adds a substring attribute clause `[contains(@key,'value')]`.
    #[must_use]
    pub fn contained_attr(self, key: &str, value: &str) -> Self {
        let lit = escape(value);
        self.constraint(&format!("contains(@{key},{lit})"))
    }

    /// Shorthand for `attr("id", value)`.
    #[must_use]
    pub fn id(self, value: &str) -> Self {
        self.attr("id", value)
    }

    /// Shorthand for `attr("class", value)`.
    #[must_use]
    pub fn class(self, value: &str) -> Self {
        self.attr("class", value)
    }

    /// Shorthand for `contained_attr("class", value)`.
    #[must_use]
    pub fn contained_class(self, value: &str) -> Self {
        self.contained_attr("class", value)
    }

    /// Adds a positional-depth clause `[position() = n]`.
    ///
    /// `n` is one-based, matching XPath positional semantics.
    #[must_use]
    pub fn level(self, n: usize) -> Self {
        self.constraint(&format!("position() = {n}"))
    }

    /// Adds a bare index clause `[n]`.
    ///
    /// `n` is one-based: `index(1)` addresses the first match.
    #[must_use]
    pub fn index(self, n: usize) -> Self {
        self.constraint(&n.to_string())
    }

    /// Concatenates a child selector onto this one (parent-then-child).
    ///
    /// The combined string is not independently validated.
    #[must_use]
    pub fn child(self, other: &str) -> Self {
        self.append(other)
    }
}

// ============================================================================
// Build
// ============================================================================

impl XPathBuilder {
    /// Returns the accumulated selector string without mutating state.
    #[inline]
    #[must_use]
    pub fn build(&self) -> String {
        self.selector.clone()
    }
}

impl From<&str> for XPathBuilder {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for XPathBuilder {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// Escaping
// ============================================================================

/// Quotes a value as an XPath string literal.
///
/// XPath 1.0 has no escape sequences inside string literals, so values
/// containing an apostrophe are emitted via `concat('..', "'", '..')`.
#[must_use]
pub fn escape(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }

    let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_composition() {
        let selector = XPathBuilder::new("//div").attr("id", "x").build();
        assert_eq!(selector, "//div[@id='x']");
    }

    #[test]
    fn test_no_auto_reset_on_build() {
        let builder = XPathBuilder::new("//span").reset("//div").attr("id", "x");
        assert_eq!(builder.build(), "//div[@id='x']");

        // Further refinement keeps compounding onto the same string.
        let builder = builder.contained_class("btn");
        assert_eq!(builder.build(), "//div[@id='x'][contains(@class,'btn')]");
    }

    #[test]
    fn test_text_clauses() {
        assert_eq!(
            XPathBuilder::new("//p").text("Hello").build(),
            "//p[. = 'Hello']"
        );
        assert_eq!(
            XPathBuilder::new("//p").contained_text("ell").build(),
            "//p[contains(.,'ell')]"
        );
    }

    #[test]
    fn test_shorthands() {
        assert_eq!(XPathBuilder::new("//a").id("nav").build(), "//a[@id='nav']");
        assert_eq!(
            XPathBuilder::new("//a").class("btn").build(),
            "//a[@class='btn']"
        );
        assert_eq!(
            XPathBuilder::new("//a").contained_class("btn").build(),
            "//a[contains(@class,'btn')]"
        );
    }

    #[test]
    fn test_level_and_index_are_one_based() {
        assert_eq!(
            XPathBuilder::new("//li").level(3).build(),
            "//li[position() = 3]"
        );
        assert_eq!(XPathBuilder::new("//li").index(1).build(), "//li[1]");
    }

    #[test]
    fn test_child_concatenation() {
        let selector = XPathBuilder::new("//form")
            .id("login")
            .child("//input")
            .attr("name", "email")
            .build();
        assert_eq!(selector, "//form[@id='login']//input[@name='email']");
    }

    #[test]
    fn test_constraint_free_form() {
        let selector = XPathBuilder::new("//tr")
            .constraint("count(td) > 2")
            .build();
        assert_eq!(selector, "//tr[count(td) > 2]");
    }

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape("hello"), "'hello'");
    }

    #[test]
    fn test_escape_apostrophe() {
        assert_eq!(escape("it's"), "concat('it', \"'\", 's')");
    }

    #[test]
    fn test_escape_in_text_clause() {
        let selector = XPathBuilder::new("//p").text("it's").build();
        assert_eq!(selector, "//p[. = concat('it', \"'\", 's')]");
    }

    #[test]
    fn test_reset_discards_prior_state() {
        let selector = XPathBuilder::new("//div")
            .attr("id", "x")
            .reset("//span")
            .build();
        assert_eq!(selector, "//span");
    }
}
