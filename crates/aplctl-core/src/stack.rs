//! Stacks and stack collections

use crate::error::{OrchestratorError, StackError};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const INFRA: &str = "infra";
pub const APL: &str = "apl";

/// Name of the project metadata file in a stack directory
pub const PROJECT_FILE: &str = "Pulumi.yaml";

/// A deployable unit with its own remote state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: String,
    /// `org/project/stage`, set by [`Stack::resolve_full_name`]
    pub full_name: Option<String>,
    pub path: PathBuf,
    pub pre_run: Vec<String>,
    pub post_run: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    name: Option<String>,
}

impl Stack {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            path: path.into(),
            pre_run: Vec::new(),
            post_run: Vec::new(),
        }
    }

    pub fn with_pre_run(mut self, hook: impl Into<String>) -> Self {
        self.pre_run.push(hook.into());
        self
    }

    pub fn with_post_run(mut self, hook: impl Into<String>) -> Self {
        self.post_run.push(hook.into());
        self
    }

    /// Read the project name from `Pulumi.yaml` and build `org/project/stage`
    pub fn resolve_full_name(&mut self, org: &str, stage: &str) -> Result<&str, StackError> {
        let file = self.path.join(PROJECT_FILE);
        let content = std::fs::read_to_string(&file).map_err(|source| StackError::MetadataRead {
            path: file.clone(),
            source,
        })?;
        let project: ProjectFile =
            serde_yaml::from_str(&content).map_err(|source| StackError::MetadataParse {
                path: file.clone(),
                source,
            })?;

        let name = project
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(StackError::EmptyProjectName(file))?;

        self.full_name = Some(format!("{}/{}/{}", org, name.trim(), stage));
        Ok(self.full_name.as_deref().unwrap_or_default())
    }
}

/// Visiting order over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Stacks keyed by priority, with an optional single-stack target
#[derive(Debug, Clone, Default)]
pub struct StackCollection {
    stacks: BTreeMap<u32, Stack>,
    target: Option<String>,
}

impl StackCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, priority: u32, stack: Stack) -> Self {
        self.stacks.insert(priority, stack);
        self
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target.filter(|t| !t.is_empty());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Stack> {
        self.stacks.values().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.values_mut().find(|s| s.name == name)
    }

    /// Resolve every stack's full name, returning the failures by stack name
    pub fn resolve_names(&mut self, org: &str, stage: &str) -> HashMap<String, StackError> {
        let mut failures = HashMap::new();
        for stack in self.stacks.values_mut() {
            if let Err(e) = stack.resolve_full_name(org, stage) {
                failures.insert(stack.name.clone(), e);
            }
        }
        failures
    }

    /// All stacks in the given order
    pub fn ordered(&self, order: Order) -> Vec<(u32, &Stack)> {
        let iter = self.stacks.iter().map(|(p, s)| (*p, s));
        match order {
            Order::Ascending => iter.collect(),
            Order::Descending => iter.rev().collect(),
        }
    }

    /// Stacks to run: the target alone, or everything in the given order
    pub fn selected(&self, order: Order) -> Result<Vec<(u32, &Stack)>, OrchestratorError> {
        match &self.target {
            Some(target) => self
                .stacks
                .iter()
                .find(|(_, s)| &s.name == target)
                .map(|(p, s)| vec![(*p, s)])
                .ok_or_else(|| OrchestratorError::UnknownTarget(target.clone())),
            None => Ok(self.ordered(order)),
        }
    }

    /// The stack with the next higher priority
    pub fn next_after(&self, priority: u32) -> Option<&Stack> {
        self.stacks
            .range(priority.saturating_add(1)..)
            .next()
            .map(|(_, s)| s)
            .filter(|_| priority < u32::MAX)
    }

    /// Deploy order: `infra` (publishes the load balancer id), then `apl`
    pub fn for_deploy(cmd_dir: &Path, target: Option<String>) -> Self {
        Self::new()
            .with(
                1,
                Stack::new(INFRA, cmd_dir.join(INFRA))
                    .with_post_run(crate::hooks::ADD_NODE_BALANCER_ID),
            )
            .with(2, Stack::new(APL, cmd_dir.join(APL)))
            .with_target(target)
    }

    /// Teardown collection, visited [`Order::Descending`] so `apl` goes first.
    ///
    /// `deleteObj` runs before `infra` is destroyed when `purge_objects` is
    /// set and the run is not limited to `apl`.
    pub fn for_destroy(cmd_dir: &Path, target: Option<String>, purge_objects: bool) -> Self {
        let mut infra = Stack::new(INFRA, cmd_dir.join(INFRA))
            .with_post_run(crate::hooks::RM_NODE_BALANCER_ID);
        if purge_objects && target.as_deref() != Some(APL) {
            infra = infra.with_pre_run(crate::hooks::DELETE_OBJ);
        }

        Self::new()
            .with(1, infra)
            .with(
                2,
                Stack::new(APL, cmd_dir.join(APL)).with_post_run(crate::hooks::CLEANUP_LKE),
            )
            .with_target(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn stack_dir(root: &Path, name: &str, project: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(PROJECT_FILE), project).unwrap();
        dir
    }

    #[test]
    fn test_resolve_full_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = stack_dir(
            temp_dir.path(),
            "infra",
            "name: demo-infra\nruntime: go\ndescription: infra\n",
        );

        let mut stack = Stack::new("infra", dir);
        assert_eq!(
            stack.resolve_full_name("acme", "dev").unwrap(),
            "acme/demo-infra/dev"
        );
        assert_eq!(stack.full_name.as_deref(), Some("acme/demo-infra/dev"));
    }

    #[test]
    fn test_resolve_full_name_failures() {
        let temp_dir = tempfile::tempdir().unwrap();

        let mut missing = Stack::new("infra", temp_dir.path().join("nope"));
        assert!(matches!(
            missing.resolve_full_name("acme", "dev"),
            Err(StackError::MetadataRead { .. })
        ));

        let empty = stack_dir(temp_dir.path(), "empty", "name: \"\"\nruntime: go\n");
        let mut stack = Stack::new("empty", empty);
        assert!(matches!(
            stack.resolve_full_name("acme", "dev"),
            Err(StackError::EmptyProjectName(_))
        ));
        assert!(stack.full_name.is_none());

        let broken = stack_dir(temp_dir.path(), "broken", "name: [unclosed\n");
        let mut stack = Stack::new("broken", broken);
        assert!(matches!(
            stack.resolve_full_name("acme", "dev"),
            Err(StackError::MetadataParse { .. })
        ));
    }

    #[test]
    fn test_ordering_and_selection() {
        let collection = StackCollection::new()
            .with(2, Stack::new("b", "/b"))
            .with(1, Stack::new("a", "/a"))
            .with(3, Stack::new("c", "/c"));

        let names = |v: Vec<(u32, &Stack)>| v.into_iter().map(|(_, s)| s.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(collection.ordered(Order::Ascending)), ["a", "b", "c"]);
        assert_eq!(names(collection.ordered(Order::Descending)), ["c", "b", "a"]);

        let targeted = collection.clone().with_target(Some("b".into()));
        assert_eq!(names(targeted.selected(Order::Descending).unwrap()), ["b"]);

        let unknown = collection.clone().with_target(Some("zzz".into()));
        assert!(matches!(
            unknown.selected(Order::Ascending),
            Err(OrchestratorError::UnknownTarget(t)) if t == "zzz"
        ));

        let empty_target = collection.clone().with_target(Some(String::new()));
        assert_eq!(empty_target.selected(Order::Ascending).unwrap().len(), 3);
    }

    #[test]
    fn test_next_after() {
        let collection = StackCollection::new()
            .with(1, Stack::new("a", "/a"))
            .with(5, Stack::new("b", "/b"));
        assert_eq!(collection.next_after(1).map(|s| s.name.as_str()), Some("b"));
        assert!(collection.next_after(5).is_none());
        assert!(collection.next_after(u32::MAX).is_none());
    }

    #[test]
    fn test_standard_collections() {
        let cmd = Path::new("/home/u/.aplcli/platforms/demo/cmd");

        let deploy = StackCollection::for_deploy(cmd, None);
        let infra = deploy.get(INFRA).unwrap();
        assert_eq!(infra.post_run, vec![crate::hooks::ADD_NODE_BALANCER_ID]);
        assert_eq!(infra.path, cmd.join("infra"));
        assert!(deploy.get(APL).unwrap().post_run.is_empty());

        let destroy = StackCollection::for_destroy(cmd, None, true);
        assert_eq!(
            destroy.get(INFRA).unwrap().pre_run,
            vec![crate::hooks::DELETE_OBJ]
        );
        assert_eq!(
            destroy.get(APL).unwrap().post_run,
            vec![crate::hooks::CLEANUP_LKE]
        );
        let visit: Vec<_> = destroy
            .ordered(Order::Descending)
            .into_iter()
            .map(|(_, s)| s.name.clone())
            .collect();
        assert_eq!(visit, ["apl", "infra"]);

        let apl_only = StackCollection::for_destroy(cmd, Some(APL.into()), true);
        assert!(apl_only.get(INFRA).unwrap().pre_run.is_empty());

        let no_purge = StackCollection::for_destroy(cmd, None, false);
        assert!(no_purge.get(INFRA).unwrap().pre_run.is_empty());
    }
}
