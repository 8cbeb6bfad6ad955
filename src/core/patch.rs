//! Partial context updates.
//!
//! Actions never mutate the context themselves. They return a `Patch` keyed
//! by top-level context field and the interpreter merges it. The same merge
//! rules drive durable snapshots, so a partial patch cannot clobber sibling
//! fields it did not name.

use super::model::Model;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while applying a patch to a typed context.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Context could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Context must encode to a JSON object")]
    NotAnObject,

    #[error("Patch for keys [{keys}] does not fit the context: {source}")]
    Rejected {
        keys: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How a patch is combined with the value it lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Named top-level keys are replaced wholesale.
    Replace,
    /// Object-valued keys are shallow-merged onto the existing object;
    /// everything else is replaced.
    Shallow,
}

/// A partial context: a JSON object keyed by top-level context field.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Patch;
///
/// let patch = Patch::new()
///     .set("currentStep", "how-many")
///     .set("step", 3);
///
/// assert_eq!(patch.len(), 2);
/// assert_eq!(patch.get("step"), Some(&serde_json::json!(3)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a key to any serializable value, returning the patch.
    ///
    /// Values that fail to serialize are dropped with a warning.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.0.insert(key.to_string(), value);
            }
            Err(error) => {
                tracing::warn!(key, %error, "dropping unserializable patch value");
            }
        }
        self
    }

    /// Insert a raw JSON value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Build a patch from a JSON value. Non-objects yield an empty patch.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy of this patch without the given keys.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Combine two patches; keys in `other` win.
    pub fn extend(mut self, other: Patch) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Merge `patch` into `base` in place.
///
/// With [`MergeMode::Shallow`], a key whose existing and incoming values are
/// both objects keeps the existing fields the patch does not name.
///
/// ```rust
/// use waypoint::core::{merge_into, MergeMode};
/// use serde_json::json;
///
/// let mut stored = json!({ "household": { "numMembers": 1, "members": ["a"] }, "step": 3 });
/// let patch = json!({ "household": { "numMembers": 2 }, "step": 4 });
///
/// merge_into(
///     stored.as_object_mut().unwrap(),
///     patch.as_object().unwrap(),
///     MergeMode::Shallow,
/// );
///
/// assert_eq!(stored, json!({ "household": { "numMembers": 2, "members": ["a"] }, "step": 4 }));
/// ```
pub fn merge_into(base: &mut Map<String, Value>, patch: &Map<String, Value>, mode: MergeMode) {
    for (key, incoming) in patch {
        match (mode, base.get_mut(key), incoming) {
            (MergeMode::Shallow, Some(Value::Object(existing)), Value::Object(fields)) => {
                for (field, value) in fields {
                    existing.insert(field.clone(), value.clone());
                }
            }
            _ => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Apply a patch to a typed context, producing the next context.
///
/// The context is encoded to JSON, merged, and decoded again so the typed
/// invariants of `C` are re-checked. The input is never modified.
pub fn apply<C: Model>(context: &C, patch: &Patch, mode: MergeMode) -> Result<C, PatchError> {
    if patch.is_empty() {
        return Ok(context.clone());
    }

    let mut value = serde_json::to_value(context).map_err(PatchError::Encode)?;
    let Value::Object(map) = &mut value else {
        return Err(PatchError::NotAnObject);
    };

    merge_into(map, patch.as_map(), mode);

    serde_json::from_value(value).map_err(|source| PatchError::Rejected {
        keys: patch.keys().collect::<Vec<_>>().join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct TestContext {
        current_step: String,
        step: u32,
        household: TestHousehold,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct TestHousehold {
        num_members: u32,
        members: Vec<String>,
    }

    impl Model for TestContext {}

    fn seeded() -> TestContext {
        TestContext {
            current_step: "how-many".to_string(),
            step: 3,
            household: TestHousehold {
                num_members: 1,
                members: vec!["Adam".to_string()],
            },
        }
    }

    #[test]
    fn replace_swaps_whole_keys() {
        let patch = Patch::new().set("household", json!({ "numMembers": 2 }));
        let next = apply(&seeded(), &patch, MergeMode::Replace).unwrap();

        assert_eq!(next.household.num_members, 2);
        assert!(next.household.members.is_empty());
        assert_eq!(next.current_step, "how-many");
    }

    #[test]
    fn shallow_keeps_unnamed_fields() {
        let patch = Patch::new().set("household", json!({ "numMembers": 2 }));
        let next = apply(&seeded(), &patch, MergeMode::Shallow).unwrap();

        assert_eq!(next.household.num_members, 2);
        assert_eq!(next.household.members, vec!["Adam".to_string()]);
    }

    #[test]
    fn primitives_are_replaced() {
        let patch = Patch::new().set("currentStep", "member-names").set("step", 4);
        let next = apply(&seeded(), &patch, MergeMode::Shallow).unwrap();

        assert_eq!(next.current_step, "member-names");
        assert_eq!(next.step, 4);
    }

    #[test]
    fn apply_does_not_touch_input() {
        let context = seeded();
        let patch = Patch::new().set("step", 9);
        let _ = apply(&context, &patch, MergeMode::Replace).unwrap();

        assert_eq!(context, seeded());
    }

    #[test]
    fn ill_typed_patch_is_rejected() {
        let patch = Patch::new().set("step", "not a number");
        let result = apply(&seeded(), &patch, MergeMode::Replace);

        assert!(matches!(result, Err(PatchError::Rejected { .. })));
    }

    #[test]
    fn from_value_ignores_non_objects() {
        assert!(Patch::from_value(json!(null)).is_empty());
        assert!(Patch::from_value(json!([1, 2])).is_empty());
        assert_eq!(Patch::from_value(json!({ "a": 1 })).len(), 1);
    }

    #[test]
    fn without_strips_keys() {
        let patch = Patch::new().set("meta", 1).set("step", 2).set("errors", 3);
        let stripped = patch.without(&["meta", "errors"]);

        assert_eq!(stripped.keys().collect::<Vec<_>>(), vec!["step"]);
    }

    #[test]
    fn extend_prefers_later_values() {
        let patch = Patch::new()
            .set("step", 1)
            .extend(Patch::new().set("step", 2));

        assert_eq!(patch.get("step"), Some(&json!(2)));
    }
}
