pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".aplcli";
const CONFIG_FILE: &str = "config.yaml";

/// `~/.aplcli`
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(CONFIG_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// `~/.aplcli/platforms`, root of the generated stack projects
pub fn get_platforms_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("platforms"))
}

/// Find the config file
///
/// Search order:
/// 1. `explicit` (the `--config` flag)
/// 2. `APLCTL_CONFIG` env var
/// 3. current directory: `config.yaml`, `config/config.yaml`
/// 4. `~/.aplcli/config.yaml`
pub fn find_config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::ExplicitPathNotFound(path.to_path_buf()));
    }

    if let Ok(config_path) = std::env::var("APLCTL_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::ExplicitPathNotFound(path));
    }

    let current_dir = std::env::current_dir()?;
    for candidate in [
        current_dir.join(CONFIG_FILE),
        current_dir.join("config").join(CONFIG_FILE),
    ] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let global = home.join(CONFIG_DIR).join(CONFIG_FILE);
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Contents of `config.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub pulumi_org: String,

    #[serde(default)]
    pub platform: Vec<Platform>,

    #[serde(default)]
    pub cleanup: CleanupTuning,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and load the config file
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let path = find_config_file(explicit)?;
        Self::load(&path)
    }

    /// Look up a platform definition by name
    pub fn platform(&self, name: &str) -> Result<&Platform> {
        self.platform
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::PlatformNotFound(name.to_string()))
    }

    pub fn org(&self) -> Result<&str> {
        if self.pulumi_org.is_empty() {
            return Err(ConfigError::MissingPulumiOrg);
        }
        Ok(&self.pulumi_org)
    }
}

/// One platform definition (`platform:` list entry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub name: String,
    pub region: String,
    /// Stack (stage) name; also the environment name
    pub stack: String,
    pub domain: String,
    pub email: String,
    pub aplversion: String,
    pub kubeversion: String,
    pub nbtag: String,
    pub nodecount: u32,
    pub nodemax: u32,
    pub nodetype: String,
    pub objprefix: String,
    pub repo: String,
    pub tags: Vec<String>,
    pub values: String,
}

impl Platform {
    /// Stage name, `dev` when unset
    pub fn stage(&self) -> &str {
        if self.stack.is_empty() {
            "dev"
        } else {
            &self.stack
        }
    }

    /// `<platforms_dir>/<name>/cmd`, holding one directory per stack
    pub fn cmd_dir(&self, platforms_dir: &Path) -> PathBuf {
        platforms_dir.join(&self.name).join("cmd")
    }
}

/// Cleanup timing overrides (`cleanup:` block)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupTuning {
    pub settle_delay_secs: Option<u64>,
    pub detach_delay_secs: Option<u64>,
    pub retry_count: Option<u32>,
    pub retry_max_wait_secs: Option<u64>,
}

impl CleanupTuning {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs.unwrap_or(10))
    }

    pub fn detach_delay(&self) -> Duration {
        Duration::from_secs(self.detach_delay_secs.unwrap_or(5))
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.unwrap_or(5)
    }

    pub fn retry_max_wait(&self) -> Duration {
        Duration::from_secs(self.retry_max_wait_secs.unwrap_or(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const SAMPLE: &str = r#"
pulumiOrg: acme
platform:
  - name: demo
    region: nl-ams
    stack: dev
    domain: demo.example.com
    email: ops@example.com
    nodecount: 3
    tags: [apl, dev]
  - name: other
    region: us-ord
cleanup:
  settleDelaySecs: 0
  retryCount: 2
"#;

    #[test]
    fn test_parse_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.org().unwrap(), "acme");

        let demo = config.platform("demo").unwrap();
        assert_eq!(demo.region, "nl-ams");
        assert_eq!(demo.nodecount, 3);
        assert_eq!(demo.tags, vec!["apl", "dev"]);

        let other = config.platform("other").unwrap();
        assert_eq!(other.stage(), "dev");

        assert!(matches!(
            config.platform("missing"),
            Err(ConfigError::PlatformNotFound(_))
        ));
    }

    #[test]
    fn test_cleanup_tuning_defaults() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.cleanup.settle_delay(), Duration::ZERO);
        assert_eq!(config.cleanup.detach_delay(), Duration::from_secs(5));
        assert_eq!(config.cleanup.retry_count(), 2);
        assert_eq!(config.cleanup.retry_max_wait(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_org() {
        let config: Config = serde_yaml::from_str("platform: []").unwrap();
        assert!(matches!(config.org(), Err(ConfigError::MissingPulumiOrg)));
    }

    #[test]
    fn test_cmd_dir() {
        let platform = Platform {
            name: "demo".into(),
            ..Default::default()
        };
        assert_eq!(
            platform.cmd_dir(Path::new("/home/u/.aplcli/platforms")),
            PathBuf::from("/home/u/.aplcli/platforms/demo/cmd")
        );
    }

    #[test]
    fn test_load_reports_path_on_bad_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "platform: [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_explicit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        fs::write(&path, SAMPLE).unwrap();

        assert_eq!(find_config_file(Some(&path)).unwrap(), path);

        let missing = temp_dir.path().join("nope.yaml");
        assert!(matches!(
            find_config_file(Some(&missing)),
            Err(ConfigError::ExplicitPathNotFound(_))
        ));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("env.yaml");
        fs::write(&path, SAMPLE).unwrap();

        unsafe {
            std::env::set_var("APLCTL_CONFIG", path.to_str().unwrap());
        }

        let config = Config::discover(None).unwrap();
        assert_eq!(config.pulumi_org, "acme");

        unsafe {
            std::env::remove_var("APLCTL_CONFIG");
        }
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::create_dir(temp_dir.path().join("config")).unwrap();
        fs::write(temp_dir.path().join("config").join("config.yaml"), SAMPLE).unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file(None).unwrap();
        assert!(result.ends_with("config/config.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }
}
