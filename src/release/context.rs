// ABOUTME: Per-run values derived once from the stage config and version.
// ABOUTME: Release id, remote paths, local staging path and the deploying actor.

use std::path::PathBuf;

use crate::config::{LOCAL_TMP_DIR, StageConfig};
use crate::hooks::HookContext;
use crate::types::{ReleaseId, Version};

/// Everything about this invocation that is computed up front and never
/// recomputed mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub version: Version,
    pub release_id: ReleaseId,
    pub actor: String,
    pub deploy_to: String,
    /// `<deploy_to>/current`
    pub current_path: String,
    /// `<deploy_to>/releases`
    pub releases_path: String,
    /// `<deploy_to>/releases/<release_id>`
    pub release_path: String,
    /// `<deploy_to>/tmp`
    pub tmp_path: String,
    /// `<deploy_to>/revisions.log`
    pub revisions_log: String,
    /// `<project>/.hoist/tmp/<stage>/<version>`
    pub local_tmp_path: PathBuf,
}

impl RunContext {
    /// Derive the context for a run starting now.
    pub fn establish(config: &StageConfig, version: Version) -> Self {
        Self::with_release_id(config, version, ReleaseId::now(), actor())
    }

    pub fn with_release_id(
        config: &StageConfig,
        version: Version,
        release_id: ReleaseId,
        actor: String,
    ) -> Self {
        let deploy_to = config.deploy_to.clone();
        let releases_path = format!("{deploy_to}/releases");
        let local_tmp_path = config
            .project_dir
            .join(LOCAL_TMP_DIR)
            .join(config.stage.as_str())
            .join(version.as_str());

        Self {
            release_path: format!("{releases_path}/{release_id}"),
            current_path: format!("{deploy_to}/current"),
            tmp_path: format!("{deploy_to}/tmp"),
            revisions_log: format!("{deploy_to}/revisions.log"),
            releases_path,
            local_tmp_path,
            deploy_to,
            version,
            release_id,
            actor,
        }
    }

    /// Remote directory the code tree is uploaded to before install.
    pub fn remote_code_path(&self) -> String {
        format!("{}/code", self.tmp_path)
    }

    /// Remote directory image archives are uploaded to.
    pub fn remote_images_path(&self) -> String {
        format!("{}/images", self.tmp_path)
    }

    /// Local directory image archives are written to.
    pub fn local_images_path(&self) -> PathBuf {
        self.local_tmp_path.join("images")
    }

    pub fn hook_context(&self, config: &StageConfig) -> HookContext {
        HookContext {
            application: config.application.clone(),
            stage: config.stage.to_string(),
            version: self.version.to_string(),
            release_id: self.release_id.to_string(),
            release_path: self.release_path.clone(),
            current_path: self.current_path.clone(),
            deploy_to: self.deploy_to.clone(),
        }
    }
}

/// `<user>@<hostname>` of the machine driving the deployment.
pub fn actor() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{user}@{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::types::StageName;

    fn config(project: &std::path::Path) -> StageConfig {
        std::fs::create_dir_all(project.join("code")).unwrap();
        let settings = Settings::from_yaml(
            "application: shop\ndeploy_to: /srv/shop/\nservers: [h1]\n",
        )
        .unwrap();
        StageConfig::resolve(project, StageName::new("staging").unwrap(), settings).unwrap()
    }

    #[test]
    fn paths_follow_remote_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let run = RunContext::with_release_id(
            &config,
            Version::new("1.0.0").unwrap(),
            ReleaseId::parse("20240103-000000").unwrap(),
            "ci@builder".into(),
        );

        assert_eq!(run.current_path, "/srv/shop/current");
        assert_eq!(run.release_path, "/srv/shop/releases/20240103-000000");
        assert_eq!(run.tmp_path, "/srv/shop/tmp");
        assert_eq!(run.revisions_log, "/srv/shop/revisions.log");
        assert_eq!(run.remote_code_path(), "/srv/shop/tmp/code");
        assert_eq!(
            run.local_tmp_path,
            dir.path().join(".hoist/tmp/staging/1.0.0")
        );
    }

    #[test]
    fn actor_uses_user_and_host() {
        temp_env::with_var("USER", Some("deployer"), || {
            let actor = actor();
            assert!(actor.starts_with("deployer@"));
            assert!(actor.len() > "deployer@".len());
        });
    }
}
