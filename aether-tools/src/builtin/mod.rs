//! Native tools shipped with the kernel.

mod sys_info;

use std::sync::Arc;

pub use sys_info::{SYS_INFO, SysInfo, SysInfoTool};

use crate::registry::Tool;

/// Every built-in tool, freshly constructed.
#[must_use]
pub fn catalog() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(SysInfoTool)]
}

/// Looks up a built-in tool by manifest name.
#[must_use]
pub fn lookup(name: &str) -> Option<Arc<dyn Tool>> {
    catalog()
        .into_iter()
        .find(|tool| tool.manifest().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_sys_info() {
        assert!(lookup(SYS_INFO).is_some());
        assert!(lookup("missing").is_none());
    }
}
