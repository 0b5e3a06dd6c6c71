//! Field extraction module
//!
//! Turns a page snapshot into raw records using a [`SelectorTable`]:
//! - detect: classify the page URL into a view
//! - selectors: the declarative table of where each field lives
//! - Extractor: compiled selectors plus the per-row reading rules

pub mod detect;
pub mod selectors;

pub use detect::detect_view;
pub use selectors::{
    DerivedField, FieldKind, FieldRule, GroupRule, IdRule, KeywordMatch, SelectorTable, Source, ViewRules,
};

use crate::{
    coordinator::messages::PageReport,
    dom::{
        PageSnapshot, compile_selector,
        element::{attribute, element_text, split_list},
    },
    error::Result,
    record::{FieldValue, Record, View},
};
use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// `/<segment>/<digits>` inside a link; the digits are the entity id
static LINK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\w+)/(\d+)").expect("link id pattern is valid"));

/// Pull the numeric id out of an entity link such as `/app/contacts/123`
pub fn id_from_href(href: &str) -> Option<String> {
    LINK_ID.captures(href).map(|caps| caps[2].to_string())
}

struct CompiledField {
    rule: FieldRule,
    selector: Selector,
}

impl CompiledField {
    fn compile(rule: &FieldRule) -> Result<Self> {
        Ok(Self {
            selector: compile_selector(&rule.selector)?,
            rule: rule.clone(),
        })
    }

    fn compile_all(rules: &[FieldRule]) -> Result<Vec<Self>> {
        rules.iter().map(Self::compile).collect()
    }

    /// Read this field from the first matching element under `scope`
    fn read(&self, scope: ElementRef<'_>) -> (String, FieldValue) {
        let raw = scope
            .select(&self.selector)
            .next()
            .and_then(|element| self.read_source(element));

        let value = match &self.rule.kind {
            FieldKind::Text => FieldValue::Text(raw.unwrap_or_default()),
            FieldKind::Optional => raw.filter(|s| !s.is_empty()).into(),
            FieldKind::List => FieldValue::List(raw.as_deref().map(split_list).unwrap_or_default()),
            FieldKind::Keyword { matches } => raw
                .and_then(|value| {
                    matches
                        .iter()
                        .find(|m| value.contains(m.contains.as_str()))
                        .map(|m| m.value.clone())
                })
                .into(),
        };

        (self.rule.name.clone(), value)
    }

    fn read_source(&self, element: ElementRef<'_>) -> Option<String> {
        let collapse = self.rule.collapse_whitespace;
        match &self.rule.source {
            Source::Text => Some(element_text(element, collapse)),
            Source::Attribute { names, text_fallback } => attribute(element, names).or_else(|| {
                text_fallback
                    .then(|| element_text(element, collapse))
                    .filter(|text| !text.is_empty())
            }),
        }
    }
}

struct CompiledView {
    rules: ViewRules,
    row: Selector,
    group: Option<(Selector, Vec<CompiledField>)>,
    fields: Vec<CompiledField>,
    page_fields: Vec<CompiledField>,
    id_link: Option<Selector>,
}

impl CompiledView {
    fn compile(rules: &ViewRules) -> Result<Self> {
        let group = match &rules.group {
            Some(group) => Some((
                compile_selector(&group.selector)?,
                CompiledField::compile_all(&group.fields)?,
            )),
            None => None,
        };

        Ok(Self {
            row: compile_selector(&rules.row)?,
            group,
            fields: CompiledField::compile_all(&rules.fields)?,
            page_fields: CompiledField::compile_all(&rules.page_fields)?,
            id_link: rules.id.link.as_deref().map(compile_selector).transpose()?,
            rules: rules.clone(),
        })
    }

    fn extract(&self, document: &Html) -> Vec<Record> {
        let page_values: Vec<_> = self
            .page_fields
            .iter()
            .map(|field| field.read(document.root_element()))
            .collect();

        let mut records = Vec::new();
        match &self.group {
            Some((group_selector, group_fields)) => {
                for group in document.select(group_selector) {
                    let mut shared: Vec<_> = group_fields.iter().map(|field| field.read(group)).collect();
                    shared.extend(page_values.iter().cloned());

                    records.extend(group.select(&self.row).filter_map(|row| self.read_row(row, &shared)));
                }
            }
            None => {
                records.extend(
                    document
                        .select(&self.row)
                        .filter_map(|row| self.read_row(row, &page_values)),
                );
            }
        }
        records
    }

    /// Build one record, or `None` when the row has no label (header rows, placeholders)
    fn read_row(&self, row: ElementRef<'_>, shared: &[(String, FieldValue)]) -> Option<Record> {
        let mut record = Record::new(self.read_id(row));

        for field in &self.fields {
            let (name, value) = field.read(row);
            record.set(name, value);
        }

        record.text(&self.rules.label)?;

        for derived in &self.rules.derived {
            let value = derive(derived, &record);
            record.set_after(derived.source(), derived.name(), value);
        }

        for (name, value) in shared {
            record.set(name.clone(), value.clone());
        }

        Some(record)
    }

    fn read_id(&self, row: ElementRef<'_>) -> Option<String> {
        let from_link = self.id_link.as_ref().and_then(|link| {
            row.select(link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(id_from_href)
        });

        from_link.or_else(|| {
            self.rules
                .id
                .attribute
                .as_deref()
                .and_then(|name| row.value().attr(name))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    }
}

fn derive(rule: &DerivedField, record: &Record) -> FieldValue {
    match rule {
        DerivedField::BeforeSeparator { from, separator, .. } => record
            .text(from)
            .filter(|text| text.contains(*separator))
            .and_then(|text| text.split(*separator).next())
            .map(str::trim)
            .filter(|head| !head.is_empty())
            .map(str::to_string)
            .into(),
        DerivedField::NonEmpty { from, .. } => record.text(from).map(str::to_string).into(),
    }
}

/// Reads records out of rendered pages according to a selector table.
///
/// Selectors are compiled once in [`Extractor::new`]; extraction itself never
/// fails. Unsupported pages and label-less rows just produce nothing.
pub struct Extractor {
    table: SelectorTable,
    views: IndexMap<View, CompiledView>,
}

impl Extractor {
    /// Compile every selector of `table`
    pub fn new(table: SelectorTable) -> Result<Self> {
        let views = View::ALL
            .into_iter()
            .map(|view| -> Result<(View, CompiledView)> { Ok((view, CompiledView::compile(table.view(view))?)) })
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(Self { table, views })
    }

    pub fn table(&self) -> &SelectorTable {
        &self.table
    }

    /// Classify a page URL
    pub fn detect(&self, url: &str) -> Option<View> {
        detect_view(url, &self.table)
    }

    /// Raw records of `view` present in `document`; empty for an unsupported view
    pub fn extract(&self, view: Option<View>, document: &Html) -> Vec<Record> {
        let Some(compiled) = view.and_then(|v| self.views.get(&v)) else {
            return Vec::new();
        };

        let records = compiled.extract(document);
        log::debug!(
            "Extracted {} {} record(s)",
            records.len(),
            view.map(|v| v.as_str()).unwrap_or("unknown")
        );
        records
    }

    /// Detect the view of a snapshot and extract its records
    pub fn scan(&self, snapshot: &PageSnapshot) -> PageReport {
        let view = self.detect(&snapshot.url);
        let data = match view {
            Some(_) => self.extract(view, &snapshot.parse()),
            None => {
                log::debug!("No supported view for {}", snapshot.url);
                Vec::new()
            }
        };

        PageReport { view, data }
    }
}
