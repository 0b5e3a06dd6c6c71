use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One of the supported CRM entity categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Contacts,
    Deals,
    Tasks,
}

impl View {
    /// All views, in detection priority order
    pub const ALL: [View; 3] = [View::Contacts, View::Deals, View::Tasks];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Contacts => "contacts",
            View::Deals => "deals",
            View::Tasks => "tasks",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contacts" => Ok(View::Contacts),
            "deals" => Ok(View::Deals),
            "tasks" => Ok(View::Tasks),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

/// Value of a single extracted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Null,
}

impl FieldValue {
    /// Text content, if this is a non-empty text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A scraped row or card.
///
/// `id` is the natural identity when the page exposes one. The remaining
/// fields depend on the view and keep the order in which they were read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: Option<String>) -> Self {
        Self {
            id,
            fields: IndexMap::new(),
        }
    }

    /// Builder method: set a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Set a field, placing a new one right after `after` (or last when `after` is absent)
    pub fn set_after(&mut self, after: &str, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        match (self.fields.get_index_of(&name), self.fields.get_index_of(after)) {
            (None, Some(index)) => {
                self.fields.shift_insert(index + 1, name, value.into());
            }
            _ => self.set(name, value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Non-empty text of a field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// The natural id, ignoring blanks
    pub fn natural_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}
