//! Update request wire schema and completeness rules.
//!
//! A request arrives as the JSON body of a queue message. Decoding is lenient
//! about fields (unknown keys are ignored, missing or `null` keys become empty
//! strings) but strict about shape: the body must be a JSON object.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::workload::StrategyKind;

/// A rollout request: deploy `repo:tag` to a named workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRequest {
    /// Image repository (e.g., "registry/app")
    #[serde(deserialize_with = "nullable")]
    pub repo: String,

    #[serde(deserialize_with = "nullable")]
    pub image_tag: String,

    /// Alternate spelling of the tag used by CI pipelines
    #[serde(deserialize_with = "nullable")]
    pub commit_sha: String,

    #[serde(deserialize_with = "nullable")]
    pub namespace: String,

    #[serde(deserialize_with = "nullable")]
    pub deployment_name: String,

    /// Alternate name of the target when it is a Helm release
    #[serde(deserialize_with = "nullable")]
    pub helm_chart_name: String,

    #[serde(deserialize_with = "nullable")]
    pub container_name: String,
}

/// Result of checking a request against a strategy's required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Complete,
    /// Names of the missing fields, in schema order
    Incomplete(Vec<&'static str>),
}

impl Validation {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn first_present<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if blank(primary) {
        fallback.trim()
    } else {
        primary.trim()
    }
}

impl UpdateRequest {
    /// Decode a raw message body.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the body is not JSON, is not an object, or
    /// carries a non-string value for a known field.
    pub fn parse(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body)?;
        let found = match &value {
            Value::Object(_) => return Ok(serde_json::from_value(value)?),
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
        };
        Err(DecodeError::NotAnObject { found })
    }

    /// The tag to deploy; `image_tag` wins over `commit_sha`.
    #[must_use]
    pub fn tag(&self) -> &str {
        first_present(&self.image_tag, &self.commit_sha)
    }

    /// The target workload; `deployment_name` wins over `helm_chart_name`.
    #[must_use]
    pub fn workload_name(&self) -> &str {
        first_present(&self.deployment_name, &self.helm_chart_name)
    }

    /// Check that every field `strategy` needs is present and non-blank.
    #[must_use]
    pub fn validate(&self, strategy: StrategyKind) -> Validation {
        let mut missing = Vec::new();

        if blank(&self.repo) {
            missing.push("repo");
        }
        if blank(self.tag()) {
            missing.push("image_tag");
        }

        match strategy {
            StrategyKind::Spec | StrategyKind::Patch => {
                if blank(&self.namespace) {
                    missing.push("namespace");
                }
                if blank(self.workload_name()) {
                    missing.push("deployment_name");
                }
                if blank(&self.container_name) {
                    missing.push("container_name");
                }
            }
            // Namespace falls back to the configured release namespace
            StrategyKind::Release => {
                if blank(self.workload_name()) {
                    missing.push("helm_chart_name");
                }
            }
        }

        if missing.is_empty() {
            Validation::Complete
        } else {
            Validation::Incomplete(missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{"repo":"registry/app","image_tag":"abc123","namespace":"default","deployment_name":"app-deploy","container_name":"app"}"#;

    #[test]
    fn test_parse_full_request() {
        let req = UpdateRequest::parse(FULL.as_bytes()).unwrap();
        assert_eq!(req.repo, "registry/app");
        assert_eq!(req.tag(), "abc123");
        assert_eq!(req.namespace, "default");
        assert_eq!(req.workload_name(), "app-deploy");
        assert_eq!(req.container_name, "app");
        assert!(req.validate(StrategyKind::Spec).is_complete());
        assert!(req.validate(StrategyKind::Patch).is_complete());
        assert!(req.validate(StrategyKind::Release).is_complete());
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let req =
            UpdateRequest::parse(br#"{"repo":"registry/app","image_tag":"abc123","extra":[1,2]}"#)
                .unwrap();
        assert!(req.namespace.is_empty());
        assert_eq!(
            req.validate(StrategyKind::Spec),
            Validation::Incomplete(vec!["namespace", "deployment_name", "container_name"])
        );
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let req = UpdateRequest::parse(br#"{"repo":null,"image_tag":"v1"}"#).unwrap();
        assert_eq!(req.repo, "");
        assert_eq!(
            req.validate(StrategyKind::Release),
            Validation::Incomplete(vec!["repo", "helm_chart_name"])
        );
    }

    #[test]
    fn test_rejects_non_object_bodies() {
        assert!(matches!(
            UpdateRequest::parse(br#"["registry/app","abc123"]"#),
            Err(DecodeError::NotAnObject { found: "an array" })
        ));
        assert!(matches!(
            UpdateRequest::parse(b"not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            UpdateRequest::parse(br#"{"repo":42}"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_alias_fields() {
        let req = UpdateRequest::parse(
            br#"{"repo":"r","commit_sha":"deadbeef","helm_chart_name":"web"}"#,
        )
        .unwrap();
        assert_eq!(req.tag(), "deadbeef");
        assert_eq!(req.workload_name(), "web");
        assert!(req.validate(StrategyKind::Release).is_complete());

        let req = UpdateRequest::parse(
            br#"{"repo":"r","image_tag":"v2","commit_sha":"deadbeef","deployment_name":"api","helm_chart_name":"web"}"#,
        )
        .unwrap();
        assert_eq!(req.tag(), "v2");
        assert_eq!(req.workload_name(), "api");
    }

    #[test]
    fn test_whitespace_counts_as_missing() {
        let req = UpdateRequest {
            repo: "registry/app".to_string(),
            image_tag: "   ".to_string(),
            namespace: "default".to_string(),
            deployment_name: "app".to_string(),
            container_name: "app".to_string(),
            ..Default::default()
        };
        assert_eq!(
            req.validate(StrategyKind::Spec),
            Validation::Incomplete(vec!["image_tag"])
        );
    }

    #[test]
    fn test_release_ignores_container_and_namespace() {
        let req = UpdateRequest {
            repo: "registry/app".to_string(),
            image_tag: "v1".to_string(),
            helm_chart_name: "web".to_string(),
            ..Default::default()
        };
        assert!(req.validate(StrategyKind::Release).is_complete());
        assert!(!req.validate(StrategyKind::Patch).is_complete());
    }
}
