use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::table::{Table, Value};

pub const DEFAULT_CATEGORY: &str = "Other";
pub const BASE_LABEL: &str = "Base";
pub const BUILD_LABEL: &str = "Build";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keyword: String,
    pub label: String,
}

impl CategoryRule {
    pub fn new(keyword: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            label: label.into(),
        }
    }
}

/// Ordered keyword → label rules. First rule whose keyword occurs in the
/// description (case-insensitive substring) wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRules {
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
    #[serde(default = "default_category")]
    pub default: String,
    /// Categories rolled up as "Base"; every other category is "Build".
    #[serde(default)]
    pub base: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.into()
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default: default_category(),
            base: Vec::new(),
        }
    }
}

impl CategoryRules {
    pub fn new(rules: Vec<CategoryRule>, default: impl Into<String>) -> Self {
        Self {
            rules,
            default: default.into(),
            base: Vec::new(),
        }
    }

    pub fn with_base<S: Into<String>>(mut self, base: impl IntoIterator<Item = S>) -> Self {
        self.base = base.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.default.trim().is_empty() {
            return Err(LedgerError::ConfigValidation(
                "category default label must not be empty".into(),
            ));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.keyword.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "category rule #{}: keyword must not be empty",
                    i + 1
                )));
            }
            if rule.label.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "category rule '{}': label must not be empty",
                    rule.keyword
                )));
            }
        }
        Ok(())
    }

    /// Label for a description. Absent or blank descriptions get the default.
    pub fn classify(&self, description: Option<&str>) -> &str {
        let Some(desc) = description.map(str::trim).filter(|d| !d.is_empty()) else {
            return &self.default;
        };
        let haystack = desc.to_lowercase();
        self.rules
            .iter()
            .find(|r| haystack.contains(&r.keyword.to_lowercase()))
            .map(|r| r.label.as_str())
            .unwrap_or(&self.default)
    }

    /// Label a cell's content; numbers are matched on their display text.
    pub fn classify_value(&self, value: &Value) -> &str {
        match value {
            Value::Empty => self.classify(None),
            Value::Text(s) => self.classify(Some(s)),
            Value::Number(_) => self.classify(Some(&value.raw_display())),
        }
    }

    /// Append (or overwrite) `category_column` with each row's label.
    pub fn categorize_table(
        &self,
        mut table: Table,
        description_column: &str,
        category_column: &str,
    ) -> Result<Table, LedgerError> {
        let labels: Vec<Value> = table
            .column_values(description_column)?
            .map(|v| Value::text(self.classify_value(v)))
            .collect();

        if table.has_column(category_column) {
            log::debug!(
                "table '{}': replacing existing '{category_column}' column",
                table.name
            );
        }
        table.set_column(category_column, labels)?;
        Ok(table)
    }

    /// Two-way rollup label for a category.
    pub fn base_build(&self, category: &str) -> &'static str {
        if self.base.iter().any(|b| b == category) {
            BASE_LABEL
        } else {
            BUILD_LABEL
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CategoryRules {
        CategoryRules::new(
            vec![
                CategoryRule::new("mechanical", "Mechanical"),
                CategoryRule::new("electrical", "Electrical"),
                CategoryRule::new("plumbing", "Plumbing"),
            ],
            "Other",
        )
    }

    #[test]
    fn first_rule_wins() {
        let r = rules();
        assert_eq!(r.classify(Some("Mechanical/Electrical upgrade")), "Mechanical");
        assert_eq!(r.classify(Some("Electrical and mechanical")), "Mechanical");
    }

    #[test]
    fn case_insensitive_substring() {
        let r = rules();
        assert_eq!(r.classify(Some("Fab 3 ELECTRICAL rough-in")), "Electrical");
        assert_eq!(r.classify(Some("replumbing")), "Plumbing");
    }

    #[test]
    fn blank_or_absent_gets_default() {
        let r = rules();
        assert_eq!(r.classify(None), "Other");
        assert_eq!(r.classify(Some("   ")), "Other");
        assert_eq!(r.classify(Some("Concrete pour")), "Other");
        assert_eq!(r.classify_value(&Value::Empty), "Other");
    }

    #[test]
    fn uppercase_keyword_still_matches() {
        let r = CategoryRules::new(vec![CategoryRule::new("UPW", "UPW")], "Other");
        assert_eq!(r.classify(Some("upw skid tie-in")), "UPW");
    }

    #[test]
    fn categorize_appends_column() {
        let table = Table::from_rows(
            "ap",
            ["PO #", "PO Description"],
            vec![
                vec!["1".into(), "Electrical panel".into()],
                vec!["2".into(), Value::Empty],
            ],
        )
        .unwrap();
        let out = rules().categorize_table(table, "PO Description", "PM Type").unwrap();
        assert_eq!(out.columns(), &["PO #", "PO Description", "PM Type"]);
        assert_eq!(out.cell(0, 2), &Value::text("Electrical"));
        assert_eq!(out.cell(1, 2), &Value::text("Other"));
    }

    #[test]
    fn categorize_missing_description_column() {
        let table = Table::new("ap", ["PO #"]);
        let err = rules().categorize_table(table, "PO Description", "PM Type").unwrap_err();
        assert_eq!(err, LedgerError::missing_column("ap", "PO Description"));
    }

    #[test]
    fn base_build_split() {
        let r = rules().with_base(["Mechanical", "Electrical"]);
        assert_eq!(r.base_build("Mechanical"), "Base");
        assert_eq!(r.base_build("Other"), "Build");
    }

    #[test]
    fn validate_rejects_empty_keyword() {
        let r = CategoryRules::new(vec![CategoryRule::new(" ", "X")], "Other");
        assert!(r.validate().is_err());
        assert!(rules().validate().is_ok());
    }
}
