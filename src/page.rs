//! Top-level page containers.
//!
//! A page composes a store and its nodes and answers two abstract
//! questions: is it open, is it closed. The trait supplies the `wait` and
//! `eventually` forms on top of those answers using the same polling
//! primitives as every node, so a concrete page only implements the
//! immediate predicates.
//!
//! # Example
//!
//! ```ignore
//! struct LoginPage {
//!     store: PageNodeStore,
//! }
//!
//! #[async_trait]
//! impl Page for LoginPage {
//!     fn name(&self) -> &str {
//!         "LoginPage"
//!     }
//!
//!     async fn is_open(&self) -> Result<bool> {
//!         self.store.element("//form[@id='login']").currently().is_visible().await
//!     }
//! }
//!
//! page.wait_is_open(&WaitOpts::new()).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::node::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::wait::{self, WaitOpts};

// ============================================================================
// Page
// ============================================================================

/// A top-level page with open/closed state in the three-mode convention.
///
/// `is_open` is the only required predicate; `is_closed` defaults to its
/// negation, which suits pages whose "closed" is simply "not open".
#[async_trait]
pub trait Page: Send + Sync {
    /// The page's name, used in timeout messages.
    fn name(&self) -> &str;

    /// Default wait timeout for this page's own waits.
    fn timeout_ms(&self) -> u64 {
        DEFAULT_TIMEOUT_MS
    }

    /// Default polling interval for this page's own waits.
    fn interval_ms(&self) -> u64 {
        DEFAULT_INTERVAL_MS
    }

    /// Whether the page is currently open. One evaluation, no polling.
    async fn is_open(&self) -> Result<bool>;

    /// Whether the page is currently closed. One evaluation, no polling.
    async fn is_closed(&self) -> Result<bool> {
        Ok(!self.is_open().await?)
    }

    /// Polls until the page is open or the timeout elapses, then raises.
    async fn wait_is_open(&self, opts: &WaitOpts) -> Result<()> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.timeout_ms());
        let interval_ms = opts.interval_ms.unwrap_or(self.interval_ms());

        let held = wait::poll(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            move || async move { self.is_open().await },
        )
        .await?;

        if held {
            Ok(())
        } else {
            Err(Error::wait_timeout(self.name(), "isOpen", timeout_ms, None))
        }
    }

    /// Polls until the page is closed or the timeout elapses, then raises.
    async fn wait_is_closed(&self, opts: &WaitOpts) -> Result<()> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.timeout_ms());
        let interval_ms = opts.interval_ms.unwrap_or(self.interval_ms());

        let held = wait::poll(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            move || async move { self.is_closed().await },
        )
        .await?;

        if held {
            Ok(())
        } else {
            Err(Error::wait_timeout(
                self.name(),
                "isClosed",
                timeout_ms,
                None,
            ))
        }
    }

    /// Polls until the page is open; timeout is the answer `false`.
    async fn eventually_is_open(&self, opts: &WaitOpts) -> Result<bool> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.timeout_ms());
        let interval_ms = opts.interval_ms.unwrap_or(self.interval_ms());

        wait::poll(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            move || async move { self.is_open().await },
        )
        .await
    }

    /// Polls until the page is closed; timeout is the answer `false`.
    async fn eventually_is_closed(&self, opts: &WaitOpts) -> Result<bool> {
        let timeout_ms = opts.timeout_ms.unwrap_or(self.timeout_ms());
        let interval_ms = opts.interval_ms.unwrap_or(self.interval_ms());

        wait::poll(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            move || async move { self.is_closed().await },
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::driver::mock::{MockDriver, MockElement};
    use crate::store::{PageNodeStore, StoreConfig};

    struct DialogPage {
        store: PageNodeStore,
    }

    #[async_trait]
    impl Page for DialogPage {
        fn name(&self) -> &str {
            "DialogPage"
        }

        fn timeout_ms(&self) -> u64 {
            100
        }

        fn interval_ms(&self) -> u64 {
            10
        }

        async fn is_open(&self) -> Result<bool> {
            let dialog = self.store.element("//div[@id='dialog']");
            if !dialog.currently().exists().await? {
                return Ok(false);
            }
            dialog.currently().is_visible().await
        }
    }

    fn page(driver: &MockDriver) -> DialogPage {
        DialogPage {
            store: PageNodeStore::new(Arc::new(driver.clone()), StoreConfig::default()),
        }
    }

    #[tokio::test]
    async fn test_open_page_immediately() {
        let driver = MockDriver::new();
        driver.insert("//div[@id='dialog']", MockElement::new());

        let p = page(&driver);
        assert!(p.is_open().await.unwrap());
        assert!(!p.is_closed().await.unwrap());
        p.wait_is_open(&WaitOpts::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_is_open_after_delay() {
        let driver = MockDriver::new();
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.insert("//div[@id='dialog']".into(), MockElement::new());
        });

        let p = page(&driver);
        p.wait_is_open(&WaitOpts::new().with_timeout_ms(500))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_is_open_timeout_names_page() {
        let driver = MockDriver::new();

        let p = page(&driver);
        let err = p.wait_is_open(&WaitOpts::new()).await.unwrap_err();
        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("DialogPage"));
        assert!(msg.contains("isOpen"));
        assert!(msg.contains("100ms"));
    }

    #[tokio::test]
    async fn test_eventually_is_closed() {
        let driver = MockDriver::new();
        driver.insert("//div[@id='dialog']", MockElement::new());
        driver.after(std::time::Duration::from_millis(30), |elements| {
            elements.get_mut("//div[@id='dialog']").unwrap().visible = false;
        });

        let p = page(&driver);
        assert!(
            p.eventually_is_closed(&WaitOpts::new().with_timeout_ms(500))
                .await
                .unwrap()
        );
        assert!(!p.eventually_is_open(&WaitOpts::new()).await.unwrap());
    }
}
