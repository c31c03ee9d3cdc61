// ABOUTME: Run details exported to hooks as HOIST_* environment variables.
// ABOUTME: Built once per run from the stage config and release context.

/// Values a hook can read from its environment.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub application: String,
    pub stage: String,
    pub version: String,
    pub release_id: String,
    pub release_path: String,
    pub current_path: String,
    pub deploy_to: String,
}

impl HookContext {
    /// Environment for a hook fired for `event`.
    pub fn to_env(&self, event: &str) -> Vec<(String, String)> {
        [
            ("HOIST_APPLICATION", self.application.as_str()),
            ("HOIST_STAGE", self.stage.as_str()),
            ("HOIST_VERSION", self.version.as_str()),
            ("HOIST_RELEASE_ID", self.release_id.as_str()),
            ("HOIST_RELEASE_PATH", self.release_path.as_str()),
            ("HOIST_CURRENT_PATH", self.current_path.as_str()),
            ("HOIST_DEPLOY_TO", self.deploy_to.as_str()),
            ("HOIST_EVENT", event),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}
