//! Host introspection tool.

use std::num::NonZeroUsize;
use std::thread;

use aether_primitives::{Capability, ToolManifest};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::ToolContext;
use crate::registry::{Tool, ToolError, ToolResult};

/// Manifest name of [`SysInfoTool`].
pub const SYS_INFO: &str = "sys_info";

/// Snapshot returned by [`SysInfoTool`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysInfo {
    /// Operating system name, e.g. `linux`.
    pub os: String,
    /// CPU architecture, e.g. `x86_64`.
    pub architecture: String,
    /// Logical cores available to the process.
    pub logical_cores: usize,
    /// Worker loops running in the calling engine.
    pub active_workers: usize,
    /// Current time, RFC 3339 in UTC.
    pub system_time_utc: String,
}

impl SysInfo {
    fn collect(ctx: &ToolContext) -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            architecture: std::env::consts::ARCH.to_owned(),
            logical_cores: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            active_workers: ctx.active_workers(),
            system_time_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Reports operating system and runtime details. Ignores its arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysInfoTool;

#[async_trait]
impl Tool for SysInfoTool {
    fn manifest(&self) -> ToolManifest {
        ToolManifest::new(
            SYS_INFO,
            "Retrieves operating system and hardware runtime telemetry",
        )
        .expect("static sys_info manifest is valid")
        .with_parameters(json!({ "type": "object", "properties": {} }))
        .with_capabilities([Capability::State])
        .with_max_runtime_ms(100)
        .with_memory_limit_mb(2)
    }

    async fn execute(&self, ctx: &ToolContext, _args: Value) -> ToolResult<Value> {
        serde_json::to_value(SysInfo::collect(ctx))
            .map_err(|err| ToolError::execution(format!("failed to encode sys_info: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkerGauge;

    #[test]
    fn manifest_declares_only_state() {
        let manifest = SysInfoTool.manifest();
        assert_eq!(manifest.name(), SYS_INFO);
        assert_eq!(
            manifest.capabilities().iter().copied().collect::<Vec<_>>(),
            [Capability::State]
        );
        assert_eq!(manifest.max_runtime_ms(), 100);
        assert_eq!(manifest.memory_limit_mb(), 2);
    }

    #[tokio::test]
    async fn reports_host_details() {
        let gauge = WorkerGauge::new();
        let _worker = gauge.enter();
        let ctx = ToolContext::new().with_workers(gauge);

        let output = SysInfoTool.execute(&ctx, json!({})).await.unwrap();
        let info: SysInfo = serde_json::from_value(output).unwrap();

        assert_eq!(info.os, std::env::consts::OS);
        assert_eq!(info.architecture, std::env::consts::ARCH);
        assert!(info.logical_cores >= 1);
        assert_eq!(info.active_workers, 1);
        assert!(info.system_time_utc.ends_with('Z'));
    }
}
