// ABOUTME: Hook registry and dispatcher for phase and step lifecycle events.
// ABOUTME: Runs the hooks for an event, then the stage-scoped hooks, failing fast.

mod builtin;
mod context;

pub use builtin::{CommandHook, ScriptHook};
pub use context::HookContext;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, HookAction, StageConfig};
use crate::deploy::{Phase, Step};
use crate::exec::{ExecError, RemoteExecutor};
use crate::output::Output;
use crate::types::StageName;

/// A hook failed. Fatal for the run, like any failed command.
#[derive(Debug, Error)]
#[error("hook {event} failed: {source}")]
pub struct HookError {
    pub event: String,
    #[source]
    pub source: ExecError,
}

/// What a hook gets to work with when it is invoked.
pub struct HookCx<'a> {
    /// Registered name that matched, e.g. `before:push_code:production`.
    pub event: &'a str,
    pub executor: &'a RemoteExecutor,
    /// `HOIST_*` variables describing the run.
    pub env: Vec<(String, String)>,
}

/// A callable attached to a lifecycle event.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Short human-readable description for progress output.
    fn describe(&self) -> String;

    async fn call(&self, cx: &HookCx<'_>) -> Result<(), ExecError>;
}

/// Whether `event` names a hook point: `before:` or `after:` followed by a
/// phase or step name, optionally suffixed with `:<stage>`.
pub fn is_known_event(event: &str) -> bool {
    let mut parts = event.splitn(3, ':');
    let when = parts.next();
    let name = parts.next();
    let stage = parts.next();

    matches!(when, Some("before" | "after"))
        && name.is_some_and(|n| Phase::from_name(n).is_some() || Step::from_name(n).is_some())
        && stage.is_none_or(|s| StageName::new(s).is_ok())
}

/// Ordered hooks per event name, populated before the run starts.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Vec<Arc<dyn Hook>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let described = self.hooks.iter().map(|(event, hooks)| {
            let names: Vec<String> = hooks.iter().map(|h| h.describe()).collect();
            (event, names)
        });
        f.debug_map().entries(described).finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for a stage: configured entries first, then any
    /// executable found at `.hoist/hooks/<event>`.
    pub fn from_config(config: &StageConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        for (event, entries) in &config.hooks {
            for entry in entries {
                let tunnel = entry.tunnel.clone();
                match entry.action(event)? {
                    HookAction::Local(command) => {
                        registry.register(event, CommandHook::local(command, tunnel))?
                    }
                    HookAction::Remote(command) => {
                        registry.register(event, CommandHook::remote(command))?
                    }
                    HookAction::Script(path) => registry.register(
                        event,
                        ScriptHook::new(config.project_dir.join(path), tunnel),
                    )?,
                }
            }
        }

        registry.discover_scripts(&config.hooks_dir())?;
        Ok(registry)
    }

    /// Append `hook` to the list for `event`.
    pub fn register(
        &mut self,
        event: &str,
        hook: impl Hook + 'static,
    ) -> Result<(), ConfigError> {
        if !is_known_event(event) {
            return Err(ConfigError::UnknownHookEvent(event.to_string()));
        }
        self.hooks
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(hook));
        Ok(())
    }

    pub fn get(&self, event: &str) -> &[Arc<dyn Hook>] {
        self.hooks.get(event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn discover_scripts(&mut self, dir: &Path) -> Result<(), ConfigError> {
        if !dir.is_dir() {
            return Ok(());
        }

        let read = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut scripts = Vec::new();
        for entry in read {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            scripts.push((name, path));
        }
        scripts.sort();

        for (event, path) in scripts {
            tracing::debug!(%event, path = %path.display(), "discovered hook script");
            self.register(&event, ScriptHook::new(path, None))?;
        }
        Ok(())
    }
}

/// Fires registered hooks at phase and step boundaries.
pub struct HookDispatcher {
    registry: HookRegistry,
    stage: StageName,
    context: HookContext,
    executor: RemoteExecutor,
    output: Output,
}

impl HookDispatcher {
    pub fn new(
        registry: HookRegistry,
        stage: StageName,
        context: HookContext,
        executor: RemoteExecutor,
        output: Output,
    ) -> Self {
        Self {
            registry,
            stage,
            context,
            executor,
            output,
        }
    }

    /// Run the hooks registered for `event`, then those for
    /// `event:<stage>`. Absent hooks are not an error.
    pub async fn trigger(&self, event: &str) -> Result<(), HookError> {
        self.run_registered(event).await?;
        self.run_registered(&format!("{event}:{}", self.stage))
            .await
    }

    async fn run_registered(&self, event: &str) -> Result<(), HookError> {
        for hook in self.registry.get(event) {
            let description = hook.describe();
            self.output.hook(event, &description);
            tracing::info!(%event, hook = %description, "running hook");

            let cx = HookCx {
                event,
                executor: &self.executor,
                env: self.context.to_env(event),
            };
            hook.call(&cx).await.map_err(|source| HookError {
                event: event.to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_events() {
        assert!(is_known_event("before:deploy"));
        assert!(is_known_event("after:push_code"));
        assert!(is_known_event("before:push_code:production"));
    }

    #[test]
    fn unknown_events() {
        assert!(!is_known_event("deploy"));
        assert!(!is_known_event("during:deploy"));
        assert!(!is_known_event("before:rollback"));
        assert!(!is_known_event("after:only_deliver"));
        assert!(!is_known_event("before:deploy:"));
        assert!(!is_known_event("before:deploy:bad stage"));
    }

    #[test]
    fn register_rejects_unknown_event() {
        let mut registry = HookRegistry::new();
        let err = registry
            .register("before:migrate", CommandHook::local("true".into(), None))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHookEvent(e) if e == "before:migrate"));
        assert!(registry.is_empty());
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut registry = HookRegistry::new();
        registry
            .register("after:deploy", CommandHook::local("echo one".into(), None))
            .unwrap();
        registry
            .register("after:deploy", CommandHook::remote("echo two".into()))
            .unwrap();

        let described: Vec<_> = registry
            .get("after:deploy")
            .iter()
            .map(|h| h.describe())
            .collect();
        assert_eq!(described, ["echo one", "[remote] echo two"]);
        assert!(registry.get("before:deploy").is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn discovers_scripts_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("before:deploy"), "#!/bin/sh\n").unwrap();
        std::fs::write(dir.path().join("after:deploy:staging"), "#!/bin/sh\n").unwrap();
        std::fs::write(dir.path().join(".keep"), "").unwrap();

        let mut registry = HookRegistry::new();
        registry.discover_scripts(dir.path()).unwrap();

        assert_eq!(registry.get("before:deploy").len(), 1);
        assert_eq!(registry.get("after:deploy:staging").len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_script_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pre-deploy"), "#!/bin/sh\n").unwrap();

        let mut registry = HookRegistry::new();
        assert!(matches!(
            registry.discover_scripts(dir.path()),
            Err(ConfigError::UnknownHookEvent(_))
        ));
    }
}
