//! Identity of the platform being orchestrated

use aplctl_esc::EnvironmentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    /// Organization owning stacks and environments
    pub org: String,
    /// Platform name; also the environment project
    pub name: String,
    pub region: String,
    /// Stack/stage name, e.g. `dev`
    pub stage: String,
}

impl PlatformContext {
    pub fn environment_id(&self) -> EnvironmentId {
        EnvironmentId::new(&self.org, &self.name, &self.stage)
    }

    pub fn volume_tag(&self) -> String {
        format!("{}-volume", self.name)
    }

    pub fn object_endpoint(&self) -> String {
        format!("{}-1.linodeobjects.com", self.region)
    }
}
