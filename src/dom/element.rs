use scraper::ElementRef;

/// Text content of an element, trimmed.
///
/// With `collapse_whitespace` every run of whitespace inside the text becomes
/// a single space, which undoes the line breaks CRM cards put between spans.
pub fn element_text(element: ElementRef<'_>, collapse_whitespace: bool) -> String {
    let raw: String = element.text().collect();
    if collapse_whitespace {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        raw.trim().to_string()
    }
}

/// Value of the first attribute in `names` that is present and non-empty.
///
/// Namespaced names such as `xlink:href` also match the bare local name,
/// since the HTML parser stores SVG attributes under their namespace.
pub fn attribute(element: ElementRef<'_>, names: &[String]) -> Option<String> {
    names.iter().find_map(|name| {
        let local = name.rsplit(':').next().unwrap_or(name);
        element
            .value()
            .attrs()
            .find(|(key, _)| *key == name.as_str() || *key == local)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Split comma separated text into trimmed, non-empty items
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
