//! Wiring from `config.yaml` and the environment to the orchestrator

use aplctl_cloud::{CleanupSettings, RetryConfig};
use aplctl_cloud_linode::{LinodeClient, LinodeConfig};
use aplctl_config::{CleanupTuning, Config};
use aplctl_core::{HookRegistry, HookServices, Orchestrator, PlatformContext, PulumiCli, PulumiCloudLookup};
use aplctl_esc::{EnvironmentManager, EscClient, EscConfig};
use aplctl_objstore::RcloneLauncher;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A platform selected by `--name`
pub struct LoadedPlatform {
    pub context: PlatformContext,
    /// Directory holding one project per stack
    pub cmd_dir: PathBuf,
    pub cleanup: CleanupTuning,
}

impl LoadedPlatform {
    pub fn load(config: Option<&Path>, name: &str) -> anyhow::Result<Self> {
        let config = Config::discover(config)?;
        let org = config.org()?.to_string();
        let platform = config.platform(name)?;
        let platforms_dir = aplctl_config::get_platforms_dir()?;

        let loaded = Self {
            context: PlatformContext {
                org,
                name: platform.name.clone(),
                region: platform.region.clone(),
                stage: platform.stage().to_string(),
            },
            cmd_dir: platform.cmd_dir(&platforms_dir),
            cleanup: config.cleanup.clone(),
        };

        println!(
            "Platform: {} ({}/{}, {})",
            loaded.context.name.cyan(),
            loaded.context.org,
            loaded.context.stage,
            loaded.context.region
        );
        tracing::debug!("stack projects in {}", loaded.cmd_dir.display());
        Ok(loaded)
    }

    pub fn environment(&self) -> anyhow::Result<EnvironmentManager> {
        let client = EscClient::new(EscConfig::from_env()?);
        Ok(EnvironmentManager::new(
            Arc::new(client),
            self.context.environment_id(),
        ))
    }

    pub fn cleanup_settings(&self) -> CleanupSettings {
        CleanupSettings {
            settle_delay: self.cleanup.settle_delay(),
            detach_delay: self.cleanup.detach_delay(),
            retry: RetryConfig::bounded(self.cleanup.retry_count(), self.cleanup.retry_max_wait()),
        }
    }

    /// Orchestrator over the pulumi CLI, with the standard hooks talking
    /// to Linode, ESC and rclone.
    pub fn orchestrator(&self, environment: EnvironmentManager) -> anyhow::Result<Orchestrator> {
        let cleanup = self.cleanup_settings();
        let linode = LinodeClient::new(LinodeConfig::from_env()?.with_retry(cleanup.retry.clone()));

        let services = HookServices {
            resources: Arc::new(linode),
            environment,
            object_store: Arc::new(RcloneLauncher::from_env()),
            platform: self.context.clone(),
            cleanup,
        };

        Ok(Orchestrator::new(
            Arc::new(PulumiCli::new()),
            Arc::new(PulumiCloudLookup::from_env()?),
            HookRegistry::standard(),
            services,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loaded(cleanup: CleanupTuning) -> LoadedPlatform {
        LoadedPlatform {
            context: PlatformContext {
                org: "acme".into(),
                name: "demo".into(),
                region: "nl-ams".into(),
                stage: "dev".into(),
            },
            cmd_dir: PathBuf::from("/tmp/demo/cmd"),
            cleanup,
        }
    }

    #[test]
    fn test_cleanup_settings_defaults() {
        let settings = loaded(CleanupTuning::default()).cleanup_settings();
        assert_eq!(settings.settle_delay, Duration::from_secs(10));
        assert_eq!(settings.detach_delay, Duration::from_secs(5));
        assert_eq!(settings.retry.max_attempts, 5);
    }

    #[test]
    fn test_cleanup_settings_tuned() {
        let settings = loaded(CleanupTuning {
            settle_delay_secs: Some(0),
            detach_delay_secs: Some(1),
            retry_count: Some(2),
            retry_max_wait_secs: Some(3),
        })
        .cleanup_settings();
        assert_eq!(settings.settle_delay, Duration::ZERO);
        assert_eq!(settings.detach_delay, Duration::from_secs(1));
        assert_eq!(settings.retry.max_attempts, 2);
    }

    #[test]
    fn test_load_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "pulumiOrg: acme\nplatform:\n  - name: demo\n    region: us-east\n    stack: prod\n",
        )
        .unwrap();

        let home = tempfile::tempdir().unwrap();
        temp_env::with_var("HOME", Some(home.path()), || {
            let loaded = LoadedPlatform::load(Some(&path), "demo").unwrap();
            assert_eq!(loaded.context.org, "acme");
            assert_eq!(loaded.context.stage, "prod");
            assert_eq!(loaded.context.region, "us-east");
            assert!(loaded.cmd_dir.ends_with("platforms/demo/cmd"));

            assert!(LoadedPlatform::load(Some(&path), "other").is_err());
        });
    }
}
