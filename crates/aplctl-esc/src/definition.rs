//! Environment definition model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Marker key the remote store recognizes as "encrypt this value"
pub const SECRET_MARKER: &str = "fn::secret";

/// Identifies an environment: `<org>/<project>/<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentId {
    pub org: String,
    pub project: String,
    pub name: String,
}

impl EnvironmentId {
    pub fn new(
        org: impl Into<String>,
        project: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.name)
    }
}

/// The YAML document stored for an environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    #[serde(default)]
    pub values: DefinitionValues,
}

/// `values:` block: provider config plus free-form items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionValues {
    /// Exposed to stacks as provider config; values may interpolate (`${...}`)
    #[serde(
        rename = "pulumiConfig",
        default,
        skip_serializing_if = "Map::is_empty"
    )]
    pub pulumi_config: Map<String, Value>,

    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl EnvironmentDefinition {
    pub fn new(pulumi_config: Map<String, Value>, additional: Map<String, Value>) -> Self {
        Self {
            imports: Vec::new(),
            values: DefinitionValues {
                pulumi_config,
                additional,
            },
        }
    }

    pub fn from_yaml(body: &str) -> crate::Result<Self> {
        // A freshly created environment has an empty document.
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(body)?)
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Merge `config` and `values` over this definition; new keys win.
    pub fn merge(&mut self, config: Map<String, Value>, values: Map<String, Value>) {
        self.values.pulumi_config.extend(config);
        self.values.additional.extend(values);
    }
}

/// Wrap a value so the remote store encrypts it at rest
pub fn secret(value: impl Into<Value>) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(SECRET_MARKER.to_string(), value.into());
    Value::Object(wrapper)
}

/// Whether a definition value is a secret marker
pub fn is_secret(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.len() == 1 && o.contains_key(SECRET_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_definition() {
        let yaml = r#"
values:
  pulumiConfig:
    linode:token: ${linode.token}
  linode:
    token:
      fn::secret:
        ciphertext: ZXNjeAAAAAEAAAEA
  lkeId: 123
"#;
        let def = EnvironmentDefinition::from_yaml(yaml).unwrap();
        assert_eq!(
            def.values.pulumi_config["linode:token"],
            json!("${linode.token}")
        );
        assert_eq!(def.values.additional["lkeId"], json!(123));
        assert!(is_secret(&def.values.additional["linode"]["token"]));
        assert!(!def.values.additional.contains_key("pulumiConfig"));
    }

    #[test]
    fn test_empty_document() {
        let def = EnvironmentDefinition::from_yaml("  \n").unwrap();
        assert_eq!(def, EnvironmentDefinition::default());
    }

    #[test]
    fn test_merge_new_wins() {
        let mut def = EnvironmentDefinition::from_yaml(
            "values:\n  pulumiConfig:\n    a: old\n    b: keep\n  x: 1\n",
        )
        .unwrap();

        let mut config = Map::new();
        config.insert("a".into(), json!("new"));
        let mut values = Map::new();
        values.insert("y".into(), json!(2));
        def.merge(config, values);

        assert_eq!(def.values.pulumi_config["a"], json!("new"));
        assert_eq!(def.values.pulumi_config["b"], json!("keep"));
        assert_eq!(def.values.additional["x"], json!(1));
        assert_eq!(def.values.additional["y"], json!(2));
    }

    #[test]
    fn test_secret_serializes_as_marker() {
        let mut values = Map::new();
        values.insert("pass".into(), secret("hunter2"));
        let yaml = EnvironmentDefinition::new(Map::new(), values)
            .to_yaml()
            .unwrap();
        assert!(yaml.contains("fn::secret: hunter2"));
        assert!(!yaml.contains("pulumiConfig"));
    }
}
