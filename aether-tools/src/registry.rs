//! Runtime registry for tool manifests and execution.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use aether_primitives::ToolManifest;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::ToolContext;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the declarative description of this tool.
    fn manifest(&self) -> ToolManifest;

    /// Executes the tool with the argument payload chosen by the backend.
    async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult<Value>;
}

/// Adapter turning an async closure into a [`Tool`].
pub struct FnTool<F> {
    manifest: ToolManifest,
    func: F,
}

impl<F> FnTool<F> {
    /// Binds a manifest to an executor closure.
    #[must_use]
    pub fn new(manifest: ToolManifest, func: F) -> Self {
        Self { manifest, func }
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    fn manifest(&self) -> ToolManifest {
        self.manifest.clone()
    }

    async fn execute(&self, _ctx: &ToolContext, args: Value) -> ToolResult<Value> {
        (self.func)(args).await
    }
}

/// Handle returned by the registry for direct invocation.
#[derive(Clone)]
pub struct ToolHandle {
    manifest: ToolManifest,
    executor: Arc<dyn Tool>,
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.manifest.name())
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Returns the manifest captured at registration time.
    #[must_use]
    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    /// Executes the underlying tool implementation.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the tool.
    pub async fn execute(&self, ctx: &ToolContext, args: Value) -> ToolResult<Value> {
        self.executor.execute(ctx, args).await
    }
}

/// Registry that stores tool implementations keyed by manifest name.
///
/// Build it once, then [`seal`](Self::seal) it before concurrent use. Reads
/// take a shared lock, so a reader never observes a half-inserted tool.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<HashMap<String, ToolHandle>>,
    sealed: AtomicBool,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("registered", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owned tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolAlreadyRegistered`] if the name is taken,
    /// [`ToolError::InvalidManifest`] if the manifest fails validation, or
    /// [`ToolError::RegistrySealed`] once the registry is sealed. The registry
    /// is unchanged on error.
    pub fn register<T>(&self, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        self.insert(Arc::new(tool))
    }

    /// Registers a shared tool reference that may be absent, e.g. the result of
    /// a lookup by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NilTool`] for `None`, otherwise the same errors as
    /// [`register`](Self::register).
    pub fn register_shared(&self, tool: Option<Arc<dyn Tool>>) -> ToolResult<()> {
        let tool = tool.ok_or(ToolError::NilTool)?;
        self.insert(tool)
    }

    fn insert(&self, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let manifest = tool.manifest();
        manifest.validate()?;

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let name = manifest.name().to_owned();
        if self.is_sealed() {
            return Err(ToolError::RegistrySealed { name });
        }
        if inner.contains_key(&name) {
            return Err(ToolError::ToolAlreadyRegistered { name });
        }

        debug!(tool_name = %name, "tool registered");
        inner.insert(
            name,
            ToolHandle {
                manifest,
                executor: tool,
            },
        );
        Ok(())
    }

    /// Rejects all further registrations.
    pub fn seal(&self) {
        let _guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        self.sealed.store(true, Ordering::Release);
    }

    /// Returns `true` once [`seal`](Self::seal) was called.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Returns a handle to the tool with exactly this name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] when no such tool is registered.
    pub fn get(&self, name: &str) -> ToolResult<ToolHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::ToolNotFound {
                name: name.to_owned(),
            })
    }

    /// Looks up and executes a tool in one step.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ToolNotFound`] or whatever the tool returns.
    pub async fn invoke(&self, name: &str, ctx: &ToolContext, args: Value) -> ToolResult<Value> {
        let handle = self.get(name)?;
        handle.execute(ctx, args).await
    }

    /// Snapshot of every registered manifest, in no particular order.
    #[must_use]
    pub fn manifests(&self) -> Vec<ToolManifest> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .values()
            .map(|handle| handle.manifest.clone())
            .collect()
    }

    /// Sorted list of registered names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = inner.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors produced by tool registration and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// An absent tool reference was offered for registration.
    #[error("cannot register nil tool")]
    NilTool,

    /// Tool name collided with an existing registration.
    #[error("tool already registered: {name}")]
    ToolAlreadyRegistered {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool not found: {name}")]
    ToolNotFound {
        /// Name of the missing tool.
        name: String,
    },

    /// Registration attempted after the registry was sealed.
    #[error("tool registry is sealed; cannot register `{name}`")]
    RegistrySealed {
        /// Name of the rejected tool.
        name: String,
    },

    /// Manifest failed validation.
    #[error(transparent)]
    InvalidManifest(#[from] aether_primitives::Error),

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}
