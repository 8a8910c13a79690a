use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plain nested-mapping form of a [CategoryTree](super::CategoryTree). Leaves are stored as
/// `null`, so the JSON form looks like `{"Books": {"Fiction": null}, "Exercise": null}`.
///
/// Keys are always kept sorted, which makes the exported form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Option<Snapshot>>);

impl Snapshot {
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Option<Snapshot>)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get(&self, key: &str) -> Option<&Option<Snapshot>> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Option<Snapshot>)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, Option<Snapshot>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::Snapshot;

    #[test]
    fn test_serializes_with_sorted_keys() -> Result<()> {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"Exercise": null, "Books": {"Reading": null, "Fiction": null}}"#,
        )?;
        assert_eq!(
            serde_json::to_string(&snapshot)?,
            r#"{"Books":{"Fiction":null,"Reading":null},"Exercise":null}"#
        );
        Ok(())
    }

    #[test]
    fn test_rejects_scalar_values() {
        let result = serde_json::from_str::<Snapshot>(
            r#"{"SomeoneElse": null, "RyanAndViolet": {"SimonAndTanya": 5}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_order_of_input_is_irrelevant() -> Result<()> {
        let first: Snapshot = serde_json::from_str(r#"{"a": null, "b": {"c": null, "d": null}}"#)?;
        let second: Snapshot = serde_json::from_str(r#"{"b": {"d": null, "c": null}, "a": null}"#)?;
        assert_eq!(first, second);
        Ok(())
    }
}
