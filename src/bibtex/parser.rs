use super::{Bibliography, Block, Entry, Field, Layout, ParseError, Reason};

/// Block types whose bodies are carried through untouched.
const VERBATIM_TYPES: [&str; 3] = ["comment", "preamble", "string"];

pub(super) fn parse(src: &str) -> Result<Bibliography, ParseError> {
    let mut cur = Cursor {
        src,
        pos: 0,
        entry: 0,
    };
    let mut blocks = Vec::new();
    let mut verbatim_start = 0;

    while let Some(offset) = src[cur.pos..].find('@') {
        let at = cur.pos + offset;
        cur.pos = at + 1;
        cur.skip_ws();
        let ty = cur.take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        cur.skip_ws();
        let close = match cur.peek() {
            Some(b'{') => b'}',
            Some(b'(') => b')',
            // A stray `@` (an e-mail address in a comment, say) is plain text.
            _ => {
                cur.pos = at + 1;
                continue;
            }
        };
        if ty.is_empty() {
            cur.pos = at + 1;
            continue;
        }

        if VERBATIM_TYPES.iter().any(|v| ty.eq_ignore_ascii_case(v)) {
            cur.skip_group(close)?;
            continue;
        }

        cur.entry += 1;
        cur.pos += 1;
        let mut entry = cur.entry_body(ty, close)?;
        entry.raw = src[at..cur.pos].to_string();
        entry.layout.insert_at -= at;

        if verbatim_start < at {
            blocks.push(Block::Verbatim(src[verbatim_start..at].to_string()));
        }
        blocks.push(Block::Entry(entry));
        verbatim_start = cur.pos;
    }

    if verbatim_start < src.len() {
        blocks.push(Block::Verbatim(src[verbatim_start..].to_string()));
    }
    tracing::debug!(entries = cur.entry, blocks = blocks.len(), "parsed bibliography");
    Ok(Bibliography { blocks })
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    /// 1-based index of the entry being parsed, for error reporting.
    entry: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn error(&self, reason: Reason) -> ParseError {
        let before = &self.src[..self.pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit_once('\n')
            .map_or(before, |(_, tail)| tail)
            .chars()
            .count()
            + 1;
        ParseError::Malformed {
            entry: self.entry.max(1),
            line,
            column,
            reason,
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let found = match self.src[self.pos..].chars().next() {
            Some(c) => format!("{c:?}"),
            None => "end of input".to_string(),
        };
        self.error(Reason::Unexpected { expected, found })
    }

    /// Skip a balanced group starting at the opening delimiter under the cursor.
    fn skip_group(&mut self, close: u8) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                _ if b == close && depth == 0 => return Ok(()),
                _ => {}
            }
        }
        self.pos = start;
        Err(self.error(Reason::Unterminated("block")))
    }

    /// Parse everything after the opening delimiter of an entry, up to and including the
    /// closing one.
    fn entry_body(&mut self, ty: &str, close: u8) -> Result<Entry, ParseError> {
        self.skip_ws();
        let key = self.take_while(|b| {
            !b.is_ascii_whitespace() && !matches!(b, b',' | b'{' | b'}' | b'(' | b')' | b'=' | b'"')
        });
        if key.is_empty() {
            return Err(self.error(Reason::MissingKey));
        }
        let key_end = self.pos;
        self.skip_ws();
        if self.peek() == Some(b'=') {
            return Err(self.error(Reason::MissingKey));
        }

        let mut fields = Vec::new();
        let mut layout = Layout {
            insert_at: key_end,
            ..Layout::default()
        };

        loop {
            match self.peek() {
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                None => return Err(self.error(Reason::Unterminated("entry"))),
                Some(_) => return Err(self.unexpected("',' or end of entry")),
            }

            let lead_start = self.pos;
            self.skip_ws();
            if self.peek() == Some(close) {
                continue;
            }
            let lead_end = self.pos;
            let name = self.take_while(|b| {
                !b.is_ascii_whitespace()
                    && !matches!(b, b'=' | b',' | b'{' | b'}' | b'(' | b')' | b'"' | b'#')
            });
            if name.is_empty() {
                return Err(self.unexpected("field name"));
            }
            let name_end = self.pos;
            self.skip_ws();
            if self.peek() != Some(b'=') {
                return Err(self.unexpected("'='"));
            }
            self.pos += 1;
            self.skip_ws();
            let value_start = self.pos;
            self.value()?;
            let value = &self.src[value_start..self.pos];

            layout.insert_at = self.pos;
            layout.lead = self.src[lead_start..lead_end].to_string();
            layout.separator = self.src[name_end..value_start].to_string();
            // The last delimited value decides how added fields are delimited.
            match value.as_bytes().first() {
                Some(b'"') => layout.quoted = true,
                Some(b'{') => layout.quoted = false,
                _ => {}
            }

            fields.push(Field {
                name: name.to_string(),
                value: value.to_string(),
            });
            self.skip_ws();
        }

        Ok(Entry {
            entry_type: ty.to_string(),
            key: key.to_string(),
            fields,
            appended: Vec::new(),
            raw: String::new(),
            layout,
        })
    }

    /// Consume a field value: one or more pieces joined by `#`. Leaves the cursor just past
    /// the last piece.
    fn value(&mut self) -> Result<(), ParseError> {
        loop {
            self.piece()?;
            let end = self.pos;
            self.skip_ws();
            if self.peek() == Some(b'#') {
                self.pos += 1;
                self.skip_ws();
            } else {
                self.pos = end;
                return Ok(());
            }
        }
    }

    fn piece(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(b'{') => {
                let mut depth = 0usize;
                while let Some(b) = self.peek() {
                    self.pos += 1;
                    match b {
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(());
                            }
                        }
                        _ => {}
                    }
                }
                self.pos = start;
                Err(self.error(Reason::Unterminated("braced value")))
            }
            Some(b'"') => {
                self.pos += 1;
                let mut depth = 0usize;
                while let Some(b) = self.peek() {
                    self.pos += 1;
                    match b {
                        b'{' => depth += 1,
                        b'}' => depth = depth.saturating_sub(1),
                        b'"' if depth == 0 => return Ok(()),
                        _ => {}
                    }
                }
                self.pos = start;
                Err(self.error(Reason::Unterminated("quoted value")))
            }
            _ => {
                let word = self.take_while(|b| {
                    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':' | b'+' | b'/')
                });
                if word.is_empty() {
                    Err(self.unexpected("field value"))
                } else {
                    Ok(())
                }
            }
        }
    }
}
