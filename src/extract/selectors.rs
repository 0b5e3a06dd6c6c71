//! Declarative description of where fields live in the CRM's DOM.
//!
//! A [`SelectorTable`] is plain data: it can be loaded from JSON, swapped for a
//! newer CRM layout, and handed to the extractor without touching pipeline code.

use crate::{error::{Result, ScrapeError}, record::View};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Versioned set of extraction rules, one entry per view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorTable {
    /// Layout this table targets (e.g. "activecampaign")
    pub name: String,

    /// Bumped whenever the target layout changes
    pub version: u32,

    pub contacts: ViewRules,
    pub deals: ViewRules,
    pub tasks: ViewRules,
}

/// Rules for one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRules {
    /// URL substrings that identify this view
    pub url_patterns: Vec<String>,

    /// Optional grouping container (e.g. a board column); rows are searched inside it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRule>,

    /// Selector of one row or card
    pub row: String,

    /// Field that must be non-empty for a row to count as a record
    pub label: String,

    #[serde(default)]
    pub id: IdRule,

    /// Fields read inside each row, in output order
    pub fields: Vec<FieldRule>,

    /// Fields read once from the whole page and copied onto every record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_fields: Vec<FieldRule>,

    /// Fields computed from already-read fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedField>,
}

/// Container whose own fields are shared by the rows inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRule {
    pub selector: String,

    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// Where a row's natural id comes from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdRule {
    /// Link inside the row whose href carries a numeric id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Attribute of the row element used when no link id is found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// One field read through a sub-selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub selector: String,

    #[serde(default)]
    pub source: Source,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub collapse_whitespace: bool,
}

/// What part of the matched element is read
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum Source {
    #[default]
    Text,
    /// First non-empty attribute, optionally falling back to the text
    Attribute {
        names: Vec<String>,
        #[serde(default)]
        text_fallback: bool,
    },
}

/// How the read value becomes a field value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Trimmed text, empty string when missing
    #[default]
    Text,
    /// Trimmed text, null when missing or empty
    Optional,
    /// Comma separated set
    List,
    /// First keyword contained in the value, null when none matches
    Keyword { matches: Vec<KeywordMatch> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub contains: String,
    pub value: String,
}

/// Field computed from another field of the same record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DerivedField {
    /// Text before the first `separator`; null when the separator is absent
    BeforeSeparator {
        name: String,
        from: String,
        separator: char,
    },
    /// Copy of `from` when it is non-empty, otherwise null
    NonEmpty { name: String, from: String },
}

impl DerivedField {
    pub fn name(&self) -> &str {
        match self {
            DerivedField::BeforeSeparator { name, .. } | DerivedField::NonEmpty { name, .. } => name,
        }
    }

    /// Field the value is computed from; the derived field is placed right after it
    pub fn source(&self) -> &str {
        match self {
            DerivedField::BeforeSeparator { from, .. } | DerivedField::NonEmpty { from, .. } => from,
        }
    }
}

impl FieldRule {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: Source::Text,
            kind: FieldKind::Text,
            collapse_whitespace: false,
        }
    }

    /// Builder method: set the field kind
    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder method: read attributes instead of text
    pub fn attributes(mut self, names: &[&str], text_fallback: bool) -> Self {
        self.source = Source::Attribute {
            names: names.iter().map(|n| n.to_string()).collect(),
            text_fallback,
        };
        self
    }

    /// Builder method: collapse inner whitespace
    pub fn collapsed(mut self) -> Self {
        self.collapse_whitespace = true;
        self
    }
}

impl SelectorTable {
    /// Rules for a view
    pub fn view(&self, view: View) -> &ViewRules {
        match view {
            View::Contacts => &self.contacts,
            View::Deals => &self.deals,
            View::Tasks => &self.tasks,
        }
    }

    /// Load a table from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScrapeError::Config(format!("Invalid selector table: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ScrapeError::Config(format!("Failed to serialize selector table: {}", e)))
    }

    /// Layout of the ActiveCampaign web app
    pub fn activecampaign() -> Self {
        let cell = |testid: &str, suffix: &str| format!("td[data-testid=\"c-table__cell--{}\"]{}", testid, suffix);

        let contacts = ViewRules {
            url_patterns: vec!["/app/contacts".to_string()],
            group: None,
            row: "tr[data-testid=\"c-table__row\"]".to_string(),
            label: "name".to_string(),
            id: IdRule {
                link: Some(cell("full-name", " a")),
                attribute: None,
            },
            fields: vec![
                FieldRule::new("name", cell("full-name", " a")),
                FieldRule::new("email", cell("email", " a")),
                FieldRule::new("phone", cell("phone", " a")),
                FieldRule::new("account", cell("account", " a")),
                FieldRule::new("tags", cell("tags", "")).kind(FieldKind::List),
                FieldRule::new("dateCreated", cell("date", "")),
            ],
            page_fields: Vec::new(),
            derived: vec![DerivedField::NonEmpty {
                name: "owner".to_string(),
                from: "account".to_string(),
            }],
        };

        let deals = ViewRules {
            url_patterns: vec!["/app/deals".to_string(), "?pipeline=".to_string()],
            group: Some(GroupRule {
                selector: ".deals_index_deal-board_column".to_string(),
                fields: vec![FieldRule::new("stage", ".deals_index_deal-board_column__title")],
            }),
            row: ".deals_index_deal-card".to_string(),
            label: "title".to_string(),
            id: IdRule {
                link: Some("a".to_string()),
                attribute: None,
            },
            fields: vec![
                FieldRule::new("title", ".card-region1"),
                FieldRule::new("value", ".card-region5"),
                FieldRule::new("contact", ".card-region4").collapsed(),
            ],
            page_fields: vec![FieldRule::new("pipeline", ".pipelines-dropdown .ac_popover-label")],
            derived: vec![DerivedField::BeforeSeparator {
                name: "owner".to_string(),
                from: "contact".to_string(),
                separator: '/',
            }],
        };

        let tasks = ViewRules {
            url_patterns: vec!["/app/tasks".to_string()],
            group: None,
            row: "tr.tasks_task-row".to_string(),
            label: "title".to_string(),
            id: IdRule {
                link: None,
                attribute: Some("id".to_string()),
            },
            fields: vec![
                FieldRule::new("title", ".task-title"),
                FieldRule::new("type", ".deal-task-type"),
                FieldRule::new("status", ".status-text"),
                FieldRule::new("due", ".date span[rel=\"tip\"]"),
                FieldRule::new("relatedTo", ".owner-type span"),
                FieldRule::new("relatedType", "use")
                    .attributes(&["xlink:href", "href"], false)
                    .kind(FieldKind::Keyword {
                        matches: vec![
                            KeywordMatch {
                                contains: "contacts".to_string(),
                                value: "contact".to_string(),
                            },
                            KeywordMatch {
                                contains: "deals".to_string(),
                                value: "deal".to_string(),
                            },
                        ],
                    }),
                FieldRule::new("assignee", ".ac-avatar, .components_ac-avatar, [class*=\"avatar\"]")
                    .attributes(&["title", "alt"], true)
                    .kind(FieldKind::Optional),
            ],
            page_fields: Vec::new(),
            derived: Vec::new(),
        };

        Self {
            name: "activecampaign".to_string(),
            version: 1,
            contacts,
            deals,
            tasks,
        }
    }
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self::activecampaign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_views() {
        let table = SelectorTable::default();
        assert_eq!(table.name, "activecampaign");
        assert_eq!(table.view(View::Contacts).label, "name");
        assert_eq!(table.view(View::Deals).label, "title");
        assert_eq!(table.view(View::Tasks).id.attribute.as_deref(), Some("id"));
    }

    #[test]
    fn test_json_round_trip_keeps_rules() {
        let table = SelectorTable::default();
        let json = table.to_json().unwrap();
        assert!(json.contains("\"rule\": \"before_separator\""));
        assert!(json.contains("\"from\": \"attribute\""));

        let back = SelectorTable::from_json(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "name": "custom",
            "version": 2,
            "contacts": {"url_patterns": ["/people"], "row": "li.person", "label": "name",
                         "fields": [{"name": "name", "selector": ".n"}]},
            "deals": {"url_patterns": ["/deals"], "row": "li.deal", "label": "title",
                      "fields": [{"name": "title", "selector": ".t"}]},
            "tasks": {"url_patterns": ["/todo"], "row": "li.task", "label": "title",
                      "fields": [{"name": "title", "selector": ".t"},
                                 {"name": "tags", "selector": ".g", "kind": {"type": "list"}}]}
        }"#;

        let table = SelectorTable::from_json(json).unwrap();
        assert_eq!(table.version, 2);
        assert_eq!(table.contacts.id, IdRule::default());
        assert_eq!(table.contacts.fields[0].source, Source::Text);
        assert_eq!(table.contacts.fields[0].kind, FieldKind::Text);
        assert_eq!(table.tasks.fields[1].kind, FieldKind::List);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = SelectorTable::from_json("{}").unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
