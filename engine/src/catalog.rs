use crate::error::{RecommenderError, Result};
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

pub type ItemId = usize;

/// A single game as loaded from the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub tags: Vec<String>,
    /// Tags joined by a single space; the text the vector space is fit over.
    pub tags_text: String,
    pub cover_url: String,
    pub rating: Option<f64>,
    pub release_date: String,
}

impl Item {
    pub fn new(name: impl Into<String>, tags: Vec<String>) -> Self {
        let tags_text = tags.join(" ");
        Self { name: name.into(), tags, tags_text, cover_url: String::new(), rating: None, release_date: String::new() }
    }

    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = cover_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Column holding the serialized tag list.
    pub tag_column: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self { tag_column: "genres".to_string() }
    }
}

/// Ordered, immutable set of items. The position of an item is its identity
/// and matches its row in the document-term matrix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Load a CSV catalog with at least a `name` column and the tag column.
    pub fn load<P: AsRef<Path>>(path: P, options: &CatalogOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path).map_err(|e| RecommenderError::data_load(path, e))?;
        let headers = reader.headers().map_err(|e| RecommenderError::data_load(path, e))?.clone();

        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let name_col = column("name").ok_or_else(|| RecommenderError::data_load(path, "missing required column `name`"))?;
        let tag_col = column(&options.tag_column).ok_or_else(|| {
            RecommenderError::data_load(path, format!("missing required column `{}`", options.tag_column))
        })?;
        let cover_col = column("cover_url");
        let rating_col = column("rating");
        let released_col = column("release_date");

        let mut items = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| RecommenderError::data_load(path, e))?;
            let field = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("").to_string();

            let raw_tags = record.get(tag_col).unwrap_or("");
            let tags = parse_tag_list(raw_tags);
            if tags.is_empty() && !raw_tags.trim().is_empty() && raw_tags.trim() != "[]" {
                tracing::debug!(row, raw = raw_tags, "unparseable tag list, using no tags");
            } else if raw_tags.contains("\\N{") {
                tracing::debug!(row, raw = raw_tags, "named unicode escapes kept verbatim");
            }

            let mut item = Item::new(field(Some(name_col)), tags);
            item.cover_url = field(cover_col);
            item.rating = rating_col.and_then(|c| record.get(c)).and_then(|v| v.trim().parse().ok());
            item.release_date = field(released_col);
            items.push(item);
        }

        tracing::info!(path = %path.display(), items = items.len(), "catalog loaded");
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Tag text of every item, in catalog order.
    pub fn corpus(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.tags_text.as_str()).collect()
    }
}

/// Parse a textual list literal such as `['Adventure', "Beat 'em up"]`.
///
/// Anything that is not a flat list of quoted strings yields an empty list.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    parse_list_literal(raw.trim()).unwrap_or_default()
}

fn parse_list_literal(s: &str) -> Option<Vec<String>> {
    let mut chars = s.chars().peekable();
    if chars.next()? != '[' {
        return None;
    }
    let mut out = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.next()? {
            ']' => break,
            quote @ ('\'' | '"') => out.push(parse_quoted(&mut chars, quote)?),
            _ => return None,
        }
        skip_whitespace(&mut chars);
        match chars.next()? {
            ',' => continue,
            ']' => break,
            _ => return None,
        }
    }
    skip_whitespace(&mut chars);
    if chars.next().is_some() {
        return None;
    }
    Some(out)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn parse_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            c if c == quote => return Some(value),
            '\\' => match chars.next()? {
                '\n' => {}
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                'a' => value.push('\u{07}'),
                'b' => value.push('\u{08}'),
                'f' => value.push('\u{0C}'),
                'v' => value.push('\u{0B}'),
                'x' => value.push(hex_escape(chars, 2)?),
                'u' => value.push(hex_escape(chars, 4)?),
                'U' => value.push(hex_escape(chars, 8)?),
                first @ '0'..='7' => value.push(octal_escape(chars, first)?),
                c @ ('\\' | '\'' | '"' | '/') => value.push(c),
                // includes \N{...}: names are kept verbatim
                other => {
                    value.push('\\');
                    value.push(other);
                }
            },
            c => value.push(c),
        }
    }
}

fn hex_escape(chars: &mut Peekable<Chars<'_>>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    char::from_u32(u32::from_str_radix(&hex, 16).ok()?)
}

/// One to three octal digits, the first already consumed.
fn octal_escape(chars: &mut Peekable<Chars<'_>>, first: char) -> Option<char> {
    let mut code = first.to_digit(8)?;
    for _ in 0..2 {
        match chars.next_if(|c| c.is_digit(8)) {
            Some(d) => code = code * 8 + d.to_digit(8)?,
            None => break,
        }
    }
    char::from_u32(code)
}
