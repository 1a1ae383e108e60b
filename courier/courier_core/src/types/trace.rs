//! Trace propagation handed to workers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// W3C trace context captured when an invocation is dispatched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// `traceparent` header value
    pub trace_parent: String,

    /// `tracestate` header value
    #[serde(default)]
    pub trace_state: String,

    /// Additional attributes forwarded to the worker
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl TraceContext {
    /// Start a new trace with a sampled root span.
    pub fn new_root() -> Self {
        Self {
            trace_parent: format!("00-{}-{}-01", trace_id(), span_id()),
            trace_state: String::new(),
            attributes: HashMap::new(),
        }
    }

    /// Same trace, new span. Falls back to a new root if the parent is malformed.
    pub fn child(&self) -> Self {
        match self.parts() {
            Some((trace, _, flags)) => Self {
                trace_parent: format!("00-{}-{}-{}", trace, span_id(), flags),
                trace_state: self.trace_state.clone(),
                attributes: self.attributes.clone(),
            },
            None => Self::new_root(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The trace id portion of `traceparent`.
    pub fn trace_id(&self) -> Option<&str> {
        self.parts().map(|(trace, _, _)| trace)
    }

    fn parts(&self) -> Option<(&str, &str, &str)> {
        let parts: Vec<&str> = self.trace_parent.split('-').collect();
        if parts.len() != 4 || parts[0] != "00" || parts[1].len() != 32 || parts[2].len() != 16 {
            return None;
        }
        Some((parts[1], parts[2], parts[3]))
    }
}

fn trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn span_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_format() {
        let ctx = TraceContext::new_root();
        let parts: Vec<&str> = ctx.trace_parent.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3], "01");
    }

    #[test]
    fn test_child_keeps_trace() {
        let root = TraceContext::new_root().with_attribute("tenant", "a");
        let child = root.child();
        assert_eq!(root.trace_id(), child.trace_id());
        assert_ne!(root.trace_parent, child.trace_parent);
        assert_eq!(child.attributes.get("tenant").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_malformed_parent() {
        let bad = TraceContext {
            trace_parent: "garbage".to_string(),
            ..Default::default()
        };
        assert!(bad.trace_id().is_none());
        assert!(bad.child().trace_id().is_some());
    }
}
