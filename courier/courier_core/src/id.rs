//! Strongly-typed identifiers for Courier.
//!
//! Each identifier type is a thin wrapper around a UUID with a phantom type
//! parameter, so an invocation id can never be passed where a worker id is
//! expected.
//!
//! # Examples
//!
//! ```
//! use courier_core::id::{InvocationId, WorkerId};
//! use std::str::FromStr;
//!
//! let invocation_id = InvocationId::new();
//! let worker_id = WorkerId::new();
//! assert_ne!(invocation_id.to_string(), worker_id.to_string());
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let invocation_id = InvocationId::from_str(id_str).unwrap();
//! assert_eq!(invocation_id.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Create an identifier from a specific UUID.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier_core::id::InvocationId;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::new_v4();
    /// let id = InvocationId::from_uuid(uuid);
    /// assert_eq!(id.uuid(), uuid);
    /// ```
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            uuid: Uuid::parse_str(s)?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Marker type for invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationMarker;
/// Correlation identifier for a single dispatched invocation.
pub type InvocationId = Id<InvocationMarker>;

/// Marker type for functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionMarker;
/// Identifier for a function.
pub type FunctionId = Id<FunctionMarker>;

/// Marker type for workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerMarker;
/// Identifier for a language worker.
pub type WorkerId = Id<WorkerMarker>;
