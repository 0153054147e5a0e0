use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Access to the page's query string.
///
/// Writes replace the current history entry rather than pushing a new one.
pub trait QueryParams {
    fn set_query_param(&self, key: &str, value: &str);
    fn query_param(&self, key: &str) -> Option<String>;
}

/// In-memory query string for native hosts and tests.
///
/// Clones share state, so a host can keep a handle after giving one to the
/// viewer.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryParams {
    inner: Rc<RefCell<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
}

impl MemoryQueryParams {
    pub fn with(key: &str, value: &str) -> Self {
        let params = Self::default();
        params
            .inner
            .borrow_mut()
            .values
            .insert(key.to_string(), value.to_string());
        params
    }

    /// Every `set_query_param` call so far, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.inner.borrow().writes.clone()
    }
}

impl QueryParams for MemoryQueryParams {
    fn set_query_param(&self, key: &str, value: &str) {
        let mut state = self.inner.borrow_mut();
        state.values.insert(key.to_string(), value.to_string());
        state.writes.push((key.to_string(), value.to_string()));
    }

    fn query_param(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_values_and_history() {
        let params = MemoryQueryParams::with("timingFilter", "abc");
        let handle = params.clone();
        assert_eq!(handle.query_param("timingFilter").as_deref(), Some("abc"));

        params.set_query_param("timingFilter", "xyz");
        assert_eq!(handle.query_param("timingFilter").as_deref(), Some("xyz"));
        assert_eq!(
            handle.writes(),
            vec![("timingFilter".to_string(), "xyz".to_string())]
        );
        assert_eq!(handle.query_param("other"), None);
    }
}
