//! JSON pointer to source line resolution
//!
//! Findings point into the parsed document; SARIF wants a line in the original file.
//! Resolution is best effort: anything the scanners cannot follow yields `None` and the
//! caller falls back to a file-level location.

use crate::domain::ContractFormat;

/// 1-based line of the node addressed by `pointer`, if it can be found
pub fn resolve_pointer_line(content: &str, format: ContractFormat, pointer: &str) -> Option<usize> {
    let tokens = parse_pointer(pointer)?;
    if tokens.is_empty() {
        return None;
    }
    match format {
        ContractFormat::Json => JsonScanner::new(content).resolve(&tokens),
        ContractFormat::Yaml => resolve_yaml(content, &tokens),
    }
}

fn parse_pointer(pointer: &str) -> Option<Vec<String>> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    Some(
        rest.split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .collect(),
    )
}

// ── JSON ────────────────────────────────────────────────────────────────────

struct JsonScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> JsonScanner<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            bytes: content.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn resolve(mut self, tokens: &[String]) -> Option<usize> {
        let mut found = None;
        for token in tokens {
            self.skip_ws();
            match self.peek()? {
                b'{' => {
                    self.bump();
                    found = Some(self.find_member(token)?);
                }
                b'[' => {
                    self.bump();
                    let index: usize = token.parse().ok()?;
                    found = Some(self.find_item(index)?);
                }
                _ => return None,
            }
        }
        found
    }

    /// Leaves the cursor on the member's value; returns the key's line
    fn find_member(&mut self, wanted: &str) -> Option<usize> {
        loop {
            self.skip_ws();
            match self.peek()? {
                b'}' => return None,
                b',' => {
                    self.bump();
                    continue;
                }
                b'"' => {}
                _ => return None,
            }
            let key_line = self.line;
            let key = self.read_string()?;
            self.skip_ws();
            if self.peek()? != b':' {
                return None;
            }
            self.bump();
            if key == wanted {
                return Some(key_line);
            }
            self.skip_value()?;
        }
    }

    /// Leaves the cursor on the item; returns its line
    fn find_item(&mut self, wanted: usize) -> Option<usize> {
        let mut index = 0;
        loop {
            self.skip_ws();
            match self.peek()? {
                b']' => return None,
                b',' => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            if index == wanted {
                return Some(self.line);
            }
            self.skip_value()?;
            index += 1;
        }
    }

    fn skip_value(&mut self) -> Option<()> {
        self.skip_ws();
        match self.peek()? {
            b'"' => self.read_string().map(|_| ()),
            open @ (b'{' | b'[') => {
                let close = if open == b'{' { b'}' } else { b']' };
                self.bump();
                loop {
                    self.skip_ws();
                    match self.peek()? {
                        c if c == close => {
                            self.bump();
                            return Some(());
                        }
                        b',' | b':' => self.bump(),
                        _ => self.skip_value()?,
                    }
                }
            }
            _ => {
                while let Some(c) = self.peek() {
                    if matches!(c, b',' | b'}' | b']') || c.is_ascii_whitespace() {
                        break;
                    }
                    self.bump();
                }
                Some(())
            }
        }
    }

    fn read_string(&mut self) -> Option<String> {
        self.bump();
        let start = self.pos;
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.bump();
            match c {
                b'\\' if !escaped => escaped = true,
                b'"' if !escaped => {
                    let raw = &self.bytes[start..self.pos - 1];
                    let quoted = [&b"\""[..], raw, &b"\""[..]].concat();
                    return serde_json::from_slice(&quoted).ok();
                }
                _ => escaped = false,
            }
        }
        None
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        if self.bytes.get(self.pos) == Some(&b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }
}

// ── YAML ────────────────────────────────────────────────────────────────────

/// A significant line with sequence dashes peeled off
struct YamlLine<'a> {
    number: usize,
    indent: usize,
    /// Indent of the content after any leading `- `
    content_indent: usize,
    content: &'a str,
    is_item: bool,
}

fn yaml_lines(content: &str) -> Vec<YamlLine<'_>> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let trimmed = raw.trim_start();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("---")
                || trimmed.starts_with("...")
                || trimmed.starts_with('%')
            {
                return None;
            }
            let indent = raw.len() - trimmed.len();
            let mut content_indent = indent;
            let mut content = trimmed;
            let is_item = content == "-" || content.starts_with("- ");
            while content == "-" || content.starts_with("- ") {
                let rest = content[1..].trim_start();
                content_indent += content.len() - rest.len();
                content = rest;
            }
            Some(YamlLine {
                number: i + 1,
                indent,
                content_indent,
                content,
                is_item,
            })
        })
        .collect()
}

fn yaml_key_matches(content: &str, key: &str) -> bool {
    for candidate in [
        key.to_string(),
        format!("\"{}\"", key),
        format!("'{}'", key),
    ] {
        if let Some(rest) = content.strip_prefix(candidate.as_str())
            && let Some(after) = rest.strip_prefix(':')
            && (after.is_empty() || after.starts_with(' '))
        {
            return true;
        }
    }
    false
}

fn resolve_yaml(content: &str, tokens: &[String]) -> Option<usize> {
    let lines = yaml_lines(content);
    // index into `lines` where the current node's children start
    let mut start = 0usize;
    // indent of the current node; children sit deeper
    let mut parent: Option<usize> = None;
    // the current node is a sequence item whose first member shares its line
    let mut inline_first = false;
    let mut found = None;

    for token in tokens {
        if let Ok(index) = token.parse::<usize>()
            && let Some(hit) = find_item(&lines, start, parent, index)
        {
            found = Some(lines[hit].number);
            parent = Some(lines[hit].indent);
            start = hit;
            inline_first = true;
            continue;
        }

        let mut child_indent = None;
        let mut hit = None;
        for (offset, line) in lines.iter().enumerate().skip(start) {
            let in_block = match parent {
                None => true,
                Some(p) => (offset == start && inline_first) || line.indent > p,
            };
            if !in_block {
                break;
            }
            let level = *child_indent.get_or_insert(line.content_indent);
            if line.content_indent == level && yaml_key_matches(line.content, token) {
                hit = Some(offset);
                break;
            }
        }

        let hit = hit?;
        found = Some(lines[hit].number);
        parent = Some(lines[hit].content_indent);
        start = hit + 1;
        inline_first = false;
    }

    found
}

/// Position of the `index`-th item of the sequence starting at `start`
fn find_item(
    lines: &[YamlLine<'_>],
    start: usize,
    parent: Option<usize>,
    index: usize,
) -> Option<usize> {
    let first = lines.get(start)?;
    if !first.is_item {
        return None;
    }
    let level = first.indent;
    let mut seen = 0usize;
    for (offset, line) in lines.iter().enumerate().skip(start) {
        if line.indent < level {
            break;
        }
        if let Some(p) = parent
            && line.indent <= p
            && !line.is_item
        {
            break;
        }
        if line.is_item && line.indent == level {
            if seen == index {
                return Some(offset);
            }
            seen += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_DOC: &str = r#"{
  "openapi": "3.0.2",
  "info": {"title": "Pets", "version": "1"},
  "paths": {
    "/pets/{id}": {
      "get": {
        "parameters": [
          {"name": "id", "in": "path"},
          {
            "name": "verbose",
            "in": "query"
          }
        ]
      }
    }
  }
}"#;

    const YAML_DOC: &str = "openapi: 3.0.2
info:
  title: Pets
  version: '1'
paths:
  /pets/{id}:
    get:
      parameters:
        - name: id
          in: path
        - name: verbose
          in: query
      responses:
        '200':
          description: ok
";

    #[test]
    fn json_member_lines() {
        assert_eq!(
            resolve_pointer_line(JSON_DOC, ContractFormat::Json, "/info/title"),
            Some(3)
        );
        assert_eq!(
            resolve_pointer_line(JSON_DOC, ContractFormat::Json, "/paths/~1pets~1{id}/get"),
            Some(6)
        );
    }

    #[test]
    fn json_array_items() {
        assert_eq!(
            resolve_pointer_line(
                JSON_DOC,
                ContractFormat::Json,
                "/paths/~1pets~1{id}/get/parameters/1/in"
            ),
            Some(11)
        );
        assert_eq!(
            resolve_pointer_line(
                JSON_DOC,
                ContractFormat::Json,
                "/paths/~1pets~1{id}/get/parameters/5"
            ),
            None
        );
    }

    #[test]
    fn yaml_member_lines() {
        assert_eq!(
            resolve_pointer_line(YAML_DOC, ContractFormat::Yaml, "/info/version"),
            Some(4)
        );
        assert_eq!(
            resolve_pointer_line(
                YAML_DOC,
                ContractFormat::Yaml,
                "/paths/~1pets~1{id}/get/responses/200/description"
            ),
            Some(15)
        );
    }

    #[test]
    fn yaml_sequence_items() {
        assert_eq!(
            resolve_pointer_line(
                YAML_DOC,
                ContractFormat::Yaml,
                "/paths/~1pets~1{id}/get/parameters/1"
            ),
            Some(11)
        );
        assert_eq!(
            resolve_pointer_line(
                YAML_DOC,
                ContractFormat::Yaml,
                "/paths/~1pets~1{id}/get/parameters/1/in"
            ),
            Some(12)
        );
        assert_eq!(
            resolve_pointer_line(
                YAML_DOC,
                ContractFormat::Yaml,
                "/paths/~1pets~1{id}/get/parameters/0/name"
            ),
            Some(9)
        );
    }

    #[test]
    fn unresolvable_pointers() {
        assert_eq!(resolve_pointer_line(YAML_DOC, ContractFormat::Yaml, ""), None);
        assert_eq!(resolve_pointer_line(YAML_DOC, ContractFormat::Yaml, "info"), None);
        assert_eq!(
            resolve_pointer_line(YAML_DOC, ContractFormat::Yaml, "/components/schemas"),
            None
        );
        assert_eq!(
            resolve_pointer_line(JSON_DOC, ContractFormat::Json, "/info/contact"),
            None
        );
    }
}
