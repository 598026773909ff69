//! A minimal, order-preserving BibTeX model.
//!
//! Entries keep the exact bytes they were parsed from, so an entry nobody touched is written
//! back verbatim. Fields added after parsing are spliced in after the last original field,
//! in the entry's own layout.

use std::str::FromStr;

mod error;
mod parser;

pub use error::{ParseError, Reason};

/// A parsed bibliography: entries interleaved with whatever text surrounded them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bibliography {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Text outside of entries, including `@comment`, `@preamble` and `@string` blocks.
    Verbatim(String),
    Entry(Entry),
}

impl Bibliography {
    /// Parse BibTeX source. Fails on the first malformed entry.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        parser::parse(src)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Entry(e) => Some(e),
            Block::Verbatim(_) => None,
        })
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Entry(e) => Some(e),
            Block::Verbatim(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_bibtex_string(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Verbatim(text) => out.push_str(text),
                Block::Entry(entry) => out.push_str(&entry.to_bibtex_string()),
            }
        }
        out
    }
}

impl FromStr for Bibliography {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One `name = value` pair. The value is kept raw, delimiters and `#` concatenations included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    value: String,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value exactly as written in the source.
    pub fn raw(&self) -> &str {
        &self.value
    }

    /// The value without its outer `{}` or `""`. Concatenations are returned raw.
    pub fn text(&self) -> &str {
        let v = self.value.as_str();
        match v.as_bytes().first() {
            Some(b'{') if matching_brace(v) == Some(v.len() - 1) => &v[1..v.len() - 1],
            Some(b'"') if v.len() >= 2 && closing_quote(v) == Some(v.len() - 1) => {
                &v[1..v.len() - 1]
            }
            _ => v,
        }
    }
}

/// Byte offset of the brace closing the one at index 0.
fn matching_brace(v: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in v.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset of the quote closing the one at index 0, ignoring quotes inside braces.
fn closing_quote(v: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in v.bytes().enumerate().skip(1) {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'"' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Where and how new fields get spliced into an entry's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    /// Byte offset into `raw` just past the last field value (or the key, if there are no fields).
    insert_at: usize,
    /// Whitespace between the comma and a field name, e.g. `"\n  "`.
    lead: String,
    /// Text between a field name and its value, e.g. `" = "`.
    separator: String,
    quoted: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            insert_at: 0,
            lead: "\n  ".to_string(),
            separator: " = ".to_string(),
            quoted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    entry_type: String,
    key: String,
    fields: Vec<Field>,
    appended: Vec<Field>,
    raw: String,
    layout: Layout,
}

impl Entry {
    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// All fields in output order: parsed ones first, then any added since.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().chain(self.appended.iter())
    }

    /// Look a field up by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add a field after the existing ones, delimited the way the entry's last field is.
    ///
    /// Returns `false` and leaves the entry alone if a field of that name already exists, or
    /// if `text` has braces that do not nest and so cannot be delimited.
    pub fn push_field(&mut self, name: &str, text: &str) -> bool {
        if self.contains(name) || !braces_balanced(text) {
            return false;
        }
        let value = if self.layout.quoted && !text.contains('"') {
            format!("\"{text}\"")
        } else {
            format!("{{{text}}}")
        };
        self.appended.push(Field {
            name: name.to_string(),
            value,
        });
        true
    }

    /// Whether fields were added since parsing.
    pub fn is_modified(&self) -> bool {
        !self.appended.is_empty()
    }

    /// A human-readable title, with braces stripped and whitespace collapsed.
    pub fn title(&self) -> Option<String> {
        let title = self.get("title")?.text().replace(['{', '}'], "");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        (!title.is_empty()).then_some(title)
    }

    pub fn to_bibtex_string(&self) -> String {
        if self.appended.is_empty() {
            return self.raw.clone();
        }
        let (head, tail) = self.raw.split_at(self.layout.insert_at);
        let mut out = String::with_capacity(self.raw.len() + 64);
        out.push_str(head);
        for field in &self.appended {
            out.push(',');
            out.push_str(&self.layout.lead);
            out.push_str(&field.name);
            out.push_str(&self.layout.separator);
            out.push_str(&field.value);
        }
        out.push_str(tail);
        out
    }
}

/// Whether every `}` in `text` closes an earlier `{` and none is left open.
pub fn braces_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
