//! Per-thread diagnostic context.
//!
//! While a configuration is being read and resolved, each phase records what
//! it is doing (the resource, the activity, the object involved). When a
//! failure is wrapped into a [`BuildError`](crate::BuildError) the current
//! context is snapshotted into the error, so the message explains *where*
//! things went wrong and not only *what* went wrong.
//!
//! The context lives in thread-local storage. Concurrent builds on different
//! threads each see their own context, and resetting one never clears another.
//!
//! # Example
//!
//! ```
//! use sqlsession_core::ErrorContext;
//!
//! ErrorContext::current(|ctx| {
//!     ctx.set_resource("config/app.json");
//!     ctx.set_activity("resolving settings");
//! });
//! assert_eq!(ErrorContext::snapshot().activity(), Some("resolving settings"));
//!
//! ErrorContext::reset();
//! assert!(ErrorContext::snapshot().is_empty());
//! ```

use std::cell::RefCell;
use std::fmt;

/// Diagnostic breadcrumbs for the work in progress on one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    resource: Option<String>,
    activity: Option<String>,
    object: Option<String>,
    message: Option<String>,
    sql: Option<String>,
    cause: Option<String>,
}

#[derive(Debug, Default)]
struct LocalState {
    current: ErrorContext,
    stored: Vec<ErrorContext>,
    /// Bumped by every reset; edits started before a reset are discarded.
    resets: u64,
}

thread_local! {
    static LOCAL: RefCell<LocalState> = RefCell::new(LocalState::default());
}

/// Borrow the thread state for the duration of `g` only.
///
/// The borrow is never held across caller code, so it cannot collide; the only
/// failure is thread-local teardown.
fn with_state<R>(g: impl FnOnce(&mut LocalState) -> R) -> Option<R> {
    LOCAL
        .try_with(|cell| cell.try_borrow_mut().ok().map(|mut state| g(&mut state)))
        .ok()
        .flatten()
}

impl ErrorContext {
    /// Run `f` against the calling thread's context.
    ///
    /// `f` works on a copy; the fields it changes are written back when it
    /// returns. Nested calls and resets inside `f` are allowed: a reset made
    /// while `f` runs wins over the edits of `f`. Returns `None` only during
    /// thread teardown.
    pub fn current<R>(f: impl FnOnce(&mut ErrorContext) -> R) -> Option<R> {
        let (before, epoch) = with_state(|state| (state.current.clone(), state.resets))?;
        let mut working = before.clone();
        let result = f(&mut working);
        with_state(|state| {
            if state.resets == epoch {
                state.current.apply_changes(&before, &working);
            }
        });
        Some(result)
    }

    /// Clone of the calling thread's context.
    pub fn snapshot() -> ErrorContext {
        with_state(|state| state.current.clone()).unwrap_or_default()
    }

    /// Restore the calling thread to an empty context, dropping stored parents too.
    ///
    /// Never fails and never panics, including when called from inside
    /// [`ErrorContext::current`].
    pub fn reset() {
        with_state(|state| {
            state.current = ErrorContext::default();
            state.stored.clear();
            state.resets = state.resets.wrapping_add(1);
        });
    }

    /// Park the current context and start a fresh one.
    pub fn store() {
        with_state(|state| {
            let parked = std::mem::take(&mut state.current);
            state.stored.push(parked);
        });
    }

    /// Return to the most recently stored context, discarding the current one.
    ///
    /// Without a stored context the current one is simply cleared.
    pub fn recall() {
        with_state(|state| {
            state.current = state.stored.pop().unwrap_or_default();
        });
    }

    /// Number of contexts parked with [`ErrorContext::store`] on this thread.
    pub fn stored_depth() -> usize {
        with_state(|state| state.stored.len()).unwrap_or(0)
    }

    /// Copy every field that differs between `before` and `after` into `self`.
    fn apply_changes(&mut self, before: &ErrorContext, after: &ErrorContext) {
        fn merge(target: &mut Option<String>, before: &Option<String>, after: &Option<String>) {
            if before != after {
                target.clone_from(after);
            }
        }
        merge(&mut self.resource, &before.resource, &after.resource);
        merge(&mut self.activity, &before.activity, &after.activity);
        merge(&mut self.object, &before.object, &after.object);
        merge(&mut self.message, &before.message, &after.message);
        merge(&mut self.sql, &before.sql, &after.sql);
        merge(&mut self.cause, &before.cause, &after.cause);
    }

    pub fn set_resource(&mut self, resource: impl Into<String>) -> &mut Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn set_activity(&mut self, activity: impl Into<String>) -> &mut Self {
        self.activity = Some(activity.into());
        self
    }

    pub fn set_object(&mut self, object: impl Into<String>) -> &mut Self {
        self.object = Some(object.into());
        self
    }

    /// Forget the object of a finished phase.
    pub fn clear_object(&mut self) -> &mut Self {
        self.object = None;
        self
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn set_cause(&mut self, cause: impl Into<String>) -> &mut Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn activity(&self) -> Option<&str> {
        self.activity.as_deref()
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// True when no field has been recorded.
    pub fn is_empty(&self) -> bool {
        *self == ErrorContext::default()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            write!(f, "\n### {}", message)?;
        }
        if let Some(resource) = &self.resource {
            write!(f, "\n### The error may exist in {}", resource)?;
        }
        if let Some(object) = &self.object {
            write!(f, "\n### The error may involve {}", object)?;
        }
        if let Some(activity) = &self.activity {
            write!(f, "\n### The error occurred while {}", activity)?;
        }
        if let Some(sql) = &self.sql {
            // Collapse whitespace so multi-line statements stay on one line.
            let flat: Vec<&str> = sql.split_whitespace().collect();
            write!(f, "\n### SQL: {}", flat.join(" "))?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\n### Cause: {}", cause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_current() {
        ErrorContext::current(|ctx| {
            ctx.set_resource("app.json").set_object("environment dev");
        });
        assert_eq!(ErrorContext::snapshot().resource(), Some("app.json"));

        ErrorContext::reset();
        assert!(ErrorContext::snapshot().is_empty());
    }

    #[test]
    fn test_store_and_recall() {
        ErrorContext::reset();
        ErrorContext::current(|ctx| {
            ctx.set_activity("outer");
        });

        ErrorContext::store();
        assert_eq!(ErrorContext::stored_depth(), 1);
        assert!(ErrorContext::snapshot().is_empty());

        ErrorContext::current(|ctx| {
            ctx.set_activity("inner");
        });
        assert_eq!(ErrorContext::snapshot().activity(), Some("inner"));

        ErrorContext::recall();
        assert_eq!(ErrorContext::stored_depth(), 0);
        assert_eq!(ErrorContext::snapshot().activity(), Some("outer"));
        ErrorContext::reset();
    }

    #[test]
    fn test_recall_without_store_resets() {
        ErrorContext::current(|ctx| {
            ctx.set_activity("lonely");
        });
        ErrorContext::recall();
        assert!(ErrorContext::snapshot().is_empty());
    }

    #[test]
    fn test_reset_drops_stored_contexts() {
        ErrorContext::reset();
        ErrorContext::store();
        ErrorContext::store();
        assert_eq!(ErrorContext::stored_depth(), 2);

        ErrorContext::reset();
        assert_eq!(ErrorContext::stored_depth(), 0);
        ErrorContext::recall();
        assert!(ErrorContext::snapshot().is_empty());
    }

    #[test]
    fn test_reset_inside_current_wins() {
        ErrorContext::reset();
        let outcome = ErrorContext::current(|ctx| {
            ctx.set_activity("held");
            ErrorContext::reset();
            "done"
        });
        assert_eq!(outcome, Some("done"));
        assert!(ErrorContext::snapshot().is_empty());
    }

    #[test]
    fn test_nested_current_keeps_both_edits() {
        ErrorContext::reset();
        ErrorContext::current(|outer| {
            outer.set_resource("outer.json");
            ErrorContext::current(|inner| {
                inner.set_activity("inner work");
            });
            assert_eq!(ErrorContext::snapshot().activity(), Some("inner work"));
        });

        let ctx = ErrorContext::snapshot();
        assert_eq!(ctx.resource(), Some("outer.json"));
        assert_eq!(ctx.activity(), Some("inner work"));
        ErrorContext::reset();
    }

    #[test]
    fn test_clear_object_is_written_back() {
        ErrorContext::reset();
        ErrorContext::current(|ctx| {
            ctx.set_object("setting cacheEnabled");
        });
        ErrorContext::current(|ctx| {
            ctx.clear_object();
        });
        assert_eq!(ErrorContext::snapshot().object(), None);
    }

    #[test]
    fn test_contexts_are_per_thread() {
        ErrorContext::reset();
        ErrorContext::current(|ctx| {
            ctx.set_activity("main thread work");
        });

        std::thread::spawn(|| {
            assert!(ErrorContext::snapshot().is_empty());
            ErrorContext::current(|ctx| {
                ctx.set_activity("worker");
            });
            ErrorContext::reset();
        })
        .join()
        .unwrap();

        assert_eq!(ErrorContext::snapshot().activity(), Some("main thread work"));
        ErrorContext::reset();
    }

    #[test]
    fn test_display_format() {
        let mut ctx = ErrorContext::default();
        ctx.set_resource("app.json")
            .set_activity("selecting environment")
            .set_sql("SELECT *\n  FROM users")
            .set_cause("boom");

        assert_eq!(
            ctx.to_string(),
            "\n### The error may exist in app.json\
             \n### The error occurred while selecting environment\
             \n### SQL: SELECT * FROM users\
             \n### Cause: boom"
        );
        assert_eq!(ErrorContext::default().to_string(), "");
    }
}
