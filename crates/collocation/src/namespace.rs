//! Output column naming per product.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One remapping of a product's raw variable name to an output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRule {
    pub product: String,
    pub variable: String,
    pub column: String,
}

/// Maps `(product, variable)` to a collision-free output column name.
///
/// Variables without a rule keep their raw name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NamespaceRule>", into = "Vec<NamespaceRule>")]
pub struct VariableNamespace {
    rules: BTreeMap<(String, String), String>,
}

impl VariableNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing any existing rule for the same pair.
    pub fn with_rule(
        mut self,
        product: impl Into<String>,
        variable: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.insert(product, variable, column);
        self
    }

    pub fn insert(
        &mut self,
        product: impl Into<String>,
        variable: impl Into<String>,
        column: impl Into<String>,
    ) {
        self.rules
            .insert((product.into(), variable.into()), column.into());
    }

    /// Output column for `variable` of `product`.
    pub fn column<'a>(&'a self, product: &str, variable: &'a str) -> &'a str {
        self.rules
            .get(&(product.to_string(), variable.to_string()))
            .map(String::as_str)
            .unwrap_or(variable)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl From<Vec<NamespaceRule>> for VariableNamespace {
    fn from(rules: Vec<NamespaceRule>) -> Self {
        let mut ns = Self::new();
        for rule in rules {
            ns.insert(rule.product, rule.variable, rule.column);
        }
        ns
    }
}

impl From<VariableNamespace> for Vec<NamespaceRule> {
    fn from(ns: VariableNamespace) -> Self {
        ns.rules
            .into_iter()
            .map(|((product, variable), column)| NamespaceRule {
                product,
                variable,
                column,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_keeps_raw_name() {
        let ns = VariableNamespace::new();
        assert_eq!(ns.column("plankton", "CHL"), "CHL");
    }

    #[test]
    fn test_same_raw_name_split_by_product() {
        let ns = VariableNamespace::new().with_rule("optics", "flags", "flags_optics");
        assert_eq!(ns.column("plankton", "flags"), "flags");
        assert_eq!(ns.column("optics", "flags"), "flags_optics");
        assert_eq!(ns.column("optics", "BBP"), "BBP");
    }

    #[test]
    fn test_yaml_list_form() {
        let yaml = "- product: optics\n  variable: flags\n  column: flags_optics\n";
        let ns: VariableNamespace = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.column("optics", "flags"), "flags_optics");
    }
}
