//! Placemark description table extraction
//!
//! The geoportal embeds an HTML table in every placemark `<description>`:
//! two-cell rows of German label and value, plus a link to the region's
//! meta4 manifest.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use scraper::{ElementRef, Html, Selector};

use crate::constants::description as labels;
use crate::errors::{KmlError, KmlResult};

/// Insertion-ordered key/value pairs read from a description table
///
/// Inserting an existing key replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionDescription {
    entries: Vec<(String, String)>,
}

impl RegionDescription {
    /// Create an empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a required value
    ///
    /// # Errors
    ///
    /// Returns `KmlError::MissingField` when the key is absent
    pub fn require(&self, key: &str) -> KmlResult<&str> {
        self.get(key).ok_or_else(|| KmlError::MissingField {
            field: key.to_string(),
        })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Extract the label/value table and manifest link from a description
///
/// Only rows with exactly two cells are read. Labels lose a trailing colon and
/// are translated to canonical keys; unknown labels are kept verbatim. The
/// first anchor with an `href` anywhere in the fragment is stored under
/// `metalink`.
///
/// # Errors
///
/// Returns `KmlError::InvalidSelector` if a built-in selector fails to compile
pub fn parse_description(description: &str) -> KmlResult<RegionDescription> {
    let markup = unescape_markup(description);
    let fragment = Html::parse_fragment(&wrap_loose_rows(&markup));

    let row_selector = selector(labels::ROW_SELECTOR)?;
    let cell_selector = selector(labels::CELL_SELECTOR)?;
    let link_selector = selector(labels::LINK_SELECTOR)?;

    let mut data = RegionDescription::new();

    for row in fragment.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() != 2 {
            continue;
        }
        let label = cell_text(cells[0]);
        let key = labels::translate(label.trim_end_matches(':'));
        data.insert(key, cell_text(cells[1]));
    }

    if let Some(href) = fragment
        .select(&link_selector)
        .next()
        .and_then(|link| link.value().attr("href"))
    {
        data.insert(labels::METALINK, href);
    }

    tracing::trace!("Parsed description with {} entries", data.len());
    Ok(data)
}

/// Text of an element with every text node trimmed, joined without separator
fn cell_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Decode one level of HTML entities, named or numeric
///
/// Text with a stray `&` that is not an entity is decoded leniently through
/// the HTML parser when it carries no markup, and kept as is otherwise.
fn unescape_markup(description: &str) -> Cow<'_, str> {
    match unescape_with(description, resolve_html5_entity) {
        Ok(decoded) => decoded,
        Err(e) if !description.contains('<') => {
            tracing::trace!("Lenient entity decoding after {}", e);
            let text: String = Html::parse_fragment(description)
                .root_element()
                .text()
                .collect();
            Cow::Owned(text)
        }
        Err(_) => Cow::Borrowed(description),
    }
}

/// Rows outside a table are dropped by the HTML parser, so give them one
fn wrap_loose_rows(markup: &str) -> Cow<'_, str> {
    let lower = markup.to_ascii_lowercase();
    if lower.contains("<tr") && !lower.contains("<table") {
        Cow::Owned(format!("<table>{markup}</table>"))
    } else {
        Cow::Borrowed(markup)
    }
}

fn selector(css: &str) -> KmlResult<Selector> {
    Selector::parse(css).map_err(|_| KmlError::InvalidSelector {
        selector: css.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        <table>
            <tr><td>Gebiet:</td><td> Region A </td></tr>
            <tr><td>Fläche:</td><td>33,5 km²</td></tr>
            <tr><td>Anzahl Dateien:</td><td>12</td></tr>
            <tr><td>Größe Download:</td><td>1,5 GB</td></tr>
            <tr><td colspan="2"><a href="https://geodaten.bayern.de/a.meta4">Download</a></td></tr>
        </table>
    "#;

    #[test]
    fn test_translates_labels() {
        let data = parse_description(TABLE).unwrap();
        assert_eq!(data.get("name"), Some("Region A"));
        assert_eq!(data.get("area_km2"), Some("33,5 km²"));
        assert_eq!(data.get("file_count"), Some("12"));
        assert_eq!(data.get("download_size"), Some("1,5 GB"));
        assert_eq!(
            data.get("metalink"),
            Some("https://geodaten.bayern.de/a.meta4")
        );
    }

    #[test]
    fn test_keeps_insertion_order() {
        let data = parse_description(TABLE).unwrap();
        let keys: Vec<&str> = data.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["name", "area_km2", "file_count", "download_size", "metalink"]
        );
    }

    #[test]
    fn test_ignores_rows_with_other_cell_counts() {
        let html = r#"<table>
            <tr><td>Nur eine Zelle</td></tr>
            <tr><td>a</td><td>b</td><td>c</td></tr>
            <tr><td>Landkreis</td><td>Passau</td></tr>
        </table>"#;
        let data = parse_description(html).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("Landkreis"), Some("Passau"));
    }

    #[test]
    fn test_first_link_wins_and_overwrites_table_value() {
        let html = r#"<table>
            <tr><td>metalink</td><td>from-table</td></tr>
            <tr><td>x</td><td><a href="https://first">1</a><a href="https://second">2</a></td></tr>
        </table>"#;
        let data = parse_description(html).unwrap();
        assert_eq!(data.get("metalink"), Some("https://first"));
        assert_eq!(data.iter().next(), Some(("metalink", "https://first")));
    }

    #[test]
    fn test_no_table_gives_empty_mapping() {
        let data = parse_description("Keine Daten vorhanden").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_escaped_markup_is_unescaped() {
        let escaped = "&lt;table&gt;&lt;tr&gt;&lt;td&gt;Gebiet&lt;/td&gt;&lt;td&gt;München&lt;/td&gt;&lt;/tr&gt;&lt;/table&gt;";
        let data = parse_description(escaped).unwrap();
        assert_eq!(data.get("name"), Some("München"));
    }

    #[test]
    fn test_numeric_and_mixed_entities_are_unescaped() {
        let decimal = "&#60;table&#62;&#60;tr&#62;&#60;td&#62;Gebiet&#60;/td&#62;&#60;td&#62;A&#60;/td&#62;&#60;/tr&#62;&#60;/table&#62;";
        assert_eq!(parse_description(decimal).unwrap().get("name"), Some("A"));

        let hex = "&#x3C;table&#x3E;&#x3C;tr&#x3E;&#x3C;td&#x3E;Gebiet&#x3C;/td&#x3E;&#x3C;td&#x3E;B&#x3C;/td&#x3E;&#x3C;/tr&#x3E;&#x3C;/table&#x3E;";
        assert_eq!(parse_description(hex).unwrap().get("name"), Some("B"));

        let mixed = "<table>&lt;tr&gt;<td>Gebiet</td><td>C&nbsp;Ost</td>&#60;/tr&#62;</table>";
        assert_eq!(
            parse_description(mixed).unwrap().get("name"),
            Some("C\u{a0}Ost")
        );
    }

    #[test]
    fn test_stray_ampersand_does_not_break_extraction() {
        let html = "<table><tr><td>Gebiet</td><td>Berg & Tal</td></tr></table>";
        assert_eq!(
            parse_description(html).unwrap().get("name"),
            Some("Berg & Tal")
        );
    }

    #[test]
    fn test_rows_without_table_are_read() {
        let data = parse_description("<tr><td>Gebiet:</td><td>X</td></tr>").unwrap();
        assert_eq!(data.get("name"), Some("X"));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let data = parse_description(TABLE).unwrap();
        assert!(data.require("file_count").is_ok());
        assert!(matches!(
            data.require("Landkreis"),
            Err(KmlError::MissingField { ref field }) if field == "Landkreis"
        ));
    }
}
