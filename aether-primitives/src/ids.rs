//! Task identifier types.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier correlating a submitted task with its outcome.
///
/// Identifiers are assigned by the submitter; the kernel does not check them
/// for uniqueness.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a caller-supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random identifier of the form `task_<uuid>`.
    #[must_use]
    pub fn random() -> Self {
        Self(format!("task_{}", Uuid::new_v4().simple()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_differ() {
        let a = TaskId::random();
        let b = TaskId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("task_"));
    }

    #[test]
    fn displays_inner_value() {
        let id = TaskId::from("task_1");
        assert_eq!(id.to_string(), "task_1");
        assert_eq!(String::from(id), "task_1");
    }
}
