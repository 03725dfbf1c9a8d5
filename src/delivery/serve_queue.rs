//! Declarative serving requests for slots that need no bypass.
//!
//! The caller pushes `{"serve":{"zoneid":...}}` onto a queue drained by the
//! ad network's own script, which lives outside this crate.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::ZoneId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeTarget {
    pub zoneid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeRequest {
    pub serve: ServeTarget,
}

impl ServeRequest {
    pub fn for_zone(zone: &ZoneId) -> Self {
        Self {
            serve: ServeTarget {
                zoneid: zone.as_str().to_string(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub trait ServeQueue: Send + Sync {
    fn push(&self, request: ServeRequest);
}

/// FIFO queue kept in memory until a consumer drains it.
#[derive(Debug, Default)]
pub struct InMemoryServeQueue {
    pending: Mutex<VecDeque<ServeRequest>>,
}

impl InMemoryServeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&self) -> Vec<ServeRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl ServeQueue for InMemoryServeQueue {
    fn push(&self, request: ServeRequest) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_declarative_shape() {
        let request = ServeRequest::for_zone(&ZoneId::from("1234"));
        assert_eq!(request.to_json().unwrap(), r#"{"serve":{"zoneid":"1234"}}"#);
    }

    #[test]
    fn drains_in_push_order() {
        let queue = InMemoryServeQueue::new();
        queue.push(ServeRequest::for_zone(&ZoneId::from("a")));
        queue.push(ServeRequest::for_zone(&ZoneId::from("b")));
        assert_eq!(queue.len(), 2);

        let drained: Vec<_> = queue.drain().into_iter().map(|r| r.serve.zoneid).collect();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(queue.is_empty());
    }
}
