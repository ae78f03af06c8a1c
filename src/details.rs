//! Detail sections of a catalog entry that exist in two layouts: older entries
//! keep flat arrays, newer ones group items by tab (`required`/`additional`,
//! `admin`/`lateral`, one list per tool). Each section is resolved into one
//! variant when the catalog loads.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn items<T>(value: Option<&Value>, item: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(&item).collect())
        .unwrap_or_default()
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

macro_rules! deserialize_via_value {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = Value::deserialize(deserializer)?;
                Ok(Self::from_value(&value))
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub permission: String,
    pub resource_constraints: Option<String>,
}

impl Permission {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(permission) => Some(Self {
                permission: permission.clone(),
                resource_constraints: None,
            }),
            Value::Object(map) => Some(Self {
                permission: map.get("permission")?.as_str()?.to_string(),
                resource_constraints: map
                    .get("resourceConstraints")
                    .and_then(Value::as_str)
                    .filter(|constraints| !constraints.is_empty())
                    .map(str::to_string),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// Flat list; every entry is required.
    Legacy(Vec<Permission>),
    Split {
        required: Vec<Permission>,
        additional: Vec<Permission>,
    },
}

impl Permissions {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::Legacy(items(Some(value), Permission::from_value)),
            Value::Object(map) => Self::Split {
                required: items(map.get("required"), Permission::from_value),
                additional: items(map.get("additional"), Permission::from_value),
            },
            other => {
                tracing::warn!(kind = kind_of(other), "ignoring permissions of unexpected shape");
                Self::Legacy(Vec::new())
            }
        }
    }

    pub fn required(&self) -> &[Permission] {
        match self {
            Self::Legacy(required) | Self::Split { required, .. } => required,
        }
    }

    pub fn additional(&self) -> &[Permission] {
        match self {
            Self::Legacy(_) => &[],
            Self::Split { additional, .. } => additional,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required().is_empty() && self.additional().is_empty()
    }
}

deserialize_via_value!(Permissions);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisites {
    List(Vec<String>),
    /// Keyed by scenario (`admin`, `lateral`), in key order.
    Tabs(BTreeMap<String, Vec<String>>),
}

impl Prerequisites {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::List(items(Some(value), |item| match item {
                Value::String(condition) => Some(condition.clone()),
                Value::Object(map) => map.get("condition")?.as_str().map(str::to_string),
                _ => None,
            })),
            Value::Object(map) => Self::Tabs(
                map.iter()
                    .map(|(tab, list)| {
                        let list = items(Some(list), |item| item.as_str().map(str::to_string));
                        (tab.clone(), list)
                    })
                    .collect(),
            ),
            other => {
                tracing::warn!(kind = kind_of(other), "ignoring prerequisites of unexpected shape");
                Self::List(Vec::new())
            }
        }
    }

    pub fn tab_title(tab: &str) -> &str {
        match tab {
            "admin" => "Admin Access",
            "lateral" => "Lateral Movement",
            other => other,
        }
    }

    /// True when `item` under `tab` is absent from the other of the
    /// admin/lateral pair. Always false for flat lists and other tabs.
    pub fn is_unique(&self, tab: &str, item: &str) -> bool {
        let Self::Tabs(tabs) = self else {
            return false;
        };
        let other = match tab {
            "admin" => "lateral",
            "lateral" => "admin",
            _ => return false,
        };
        tabs.get(other)
            .is_none_or(|list| !list.iter().any(|entry| entry == item))
    }
}

deserialize_via_value!(Prerequisites);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// As written in the catalog; usually a number.
    pub step: String,
    pub command: String,
    pub description: String,
}

impl Step {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            step: text(map.get("step")),
            command: text(map.get("command")),
            description: text(map.get("description")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploitationSteps {
    List(Vec<Step>),
    ByTool(BTreeMap<String, Vec<Step>>),
}

impl ExploitationSteps {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::List(items(Some(value), Step::from_value)),
            Value::Object(map) => Self::ByTool(
                map.iter()
                    .map(|(tool, steps)| (tool.clone(), items(Some(steps), Step::from_value)))
                    .collect(),
            ),
            other => {
                tracing::warn!(kind = kind_of(other), "ignoring exploitation steps of unexpected shape");
                Self::List(Vec::new())
            }
        }
    }

    pub fn tool_title(tool: &str) -> &str {
        match tool {
            "awscli" => "AWS CLI",
            "pacu" => "Pacu",
            "pmapper" => "PMapper",
            "stratus" => "Stratus",
            "leonidas" => "Leonidas",
            "nebula" => "Nebula",
            "pathfinder" => "Pathfinder",
            other => other,
        }
    }

    pub fn step_count(&self) -> usize {
        match self {
            Self::List(steps) => steps.len(),
            Self::ByTool(tools) => tools.values().map(Vec::len).sum(),
        }
    }
}

deserialize_via_value!(ExploitationSteps);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn permissions_accept_both_layouts() {
        let legacy = Permissions::from_value(&json!([
            {"permission": "iam:CreatePolicyVersion", "resourceConstraints": ""},
            "iam:SetDefaultPolicyVersion"
        ]));
        assert_eq!(legacy.required().len(), 2);
        assert_eq!(legacy.required()[0].resource_constraints, None);
        assert!(legacy.additional().is_empty());

        let split = Permissions::from_value(&json!({
            "required": [{"permission": "iam:PassRole", "resourceConstraints": "role ARN"}],
            "additional": [{"permission": "lambda:ListFunctions"}]
        }));
        assert_eq!(split.required()[0].permission, "iam:PassRole");
        assert_eq!(split.required()[0].resource_constraints.as_deref(), Some("role ARN"));
        assert_eq!(split.additional()[0].permission, "lambda:ListFunctions");

        assert!(Permissions::from_value(&json!({"required": "iam:*"})).is_empty());
        assert!(Permissions::from_value(&json!(7)).is_empty());
    }

    #[test]
    fn prerequisites_accept_both_layouts() {
        let list = Prerequisites::from_value(&json!([
            "Policy attached to the principal",
            {"condition": "Fewer than five versions"},
            {"other": 1}
        ]));
        assert_eq!(
            list,
            Prerequisites::List(vec![
                "Policy attached to the principal".to_string(),
                "Fewer than five versions".to_string()
            ])
        );
        assert!(!list.is_unique("admin", "Policy attached to the principal"));

        let tabs = Prerequisites::from_value(&json!({
            "lateral": ["Role trusts the service", "Role has privileges"],
            "admin": ["Role trusts the service", "Role has admin"]
        }));
        let Prerequisites::Tabs(map) = &tabs else {
            panic!("expected tabs");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["admin", "lateral"]);
        assert!(tabs.is_unique("admin", "Role has admin"));
        assert!(!tabs.is_unique("admin", "Role trusts the service"));
        assert!(tabs.is_unique("lateral", "Role has privileges"));
        assert_eq!(Prerequisites::tab_title("admin"), "Admin Access");
        assert_eq!(Prerequisites::tab_title("cross-account"), "cross-account");
    }

    #[test]
    fn exploitation_steps_accept_both_layouts() {
        let list = ExploitationSteps::from_value(&json!([
            {"step": 1, "command": "aws iam create-policy-version", "description": "Create"},
            {"step": "2", "command": "aws iam list-policies"}
        ]));
        let ExploitationSteps::List(steps) = &list else {
            panic!("expected list");
        };
        assert_eq!(steps[0].step, "1");
        assert_eq!(steps[1].step, "2");
        assert_eq!(steps[1].description, "");

        let by_tool = ExploitationSteps::from_value(&json!({
            "awscli": [{"step": 1, "command": "aws lambda create-function", "description": "Create"}],
            "pacu": [{"step": 1, "command": "run iam__privesc_scan", "description": "Scan"}]
        }));
        assert_eq!(by_tool.step_count(), 2);
        assert_eq!(ExploitationSteps::tool_title("awscli"), "AWS CLI");
        assert_eq!(ExploitationSteps::tool_title("custom"), "custom");
    }

    #[test]
    fn sections_deserialize_inside_entries() {
        #[derive(Deserialize)]
        struct Holder {
            permissions: Permissions,
            prerequisites: Prerequisites,
        }
        let holder: Holder = serde_json::from_value(json!({
            "permissions": {"required": ["iam:PassRole"]},
            "prerequisites": ["Role exists"]
        }))
        .unwrap();
        assert_eq!(holder.permissions.required()[0].permission, "iam:PassRole");
        assert_eq!(holder.prerequisites, Prerequisites::List(vec!["Role exists".to_string()]));
    }
}
