use serde_json::{json, Value};

/// Rich-text editor document: a ProseMirror-style JSON tree
/// (`{"type": "doc", "content": [...]}`) kept opaque except for text nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        Self {
            root: json!({"type": "doc", "content": []}),
        }
    }

    /// Wrap a server value; `null` (never saved) becomes an empty document.
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            Self::empty()
        } else {
            Self { root: value }
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Append `text` as paragraphs, one per non-blank line.
    pub fn append_paragraphs(&mut self, text: &str) {
        self.normalize_root();
        let Some(blocks) = self.root.get_mut("content").and_then(Value::as_array_mut) else {
            return;
        };
        for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            blocks.push(paragraph(line));
        }
    }

    /// Replace the first occurrence of `needle` inside a single text node.
    ///
    /// Returns `false` when no text node contains `needle`; the document is
    /// left untouched in that case.
    pub fn replace_text(&mut self, needle: &str, replacement: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        replace_in(&mut self.root, needle, replacement)
    }

    /// Text content with one line per block node.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        collect_blocks(&self.root, &mut lines);
        lines.join("\n")
    }

    fn normalize_root(&mut self) {
        if !self.root.is_object() {
            // A scalar root cannot hold blocks; keep its text as the first paragraph.
            let blocks: Vec<Value> = crate::model::value_text(&self.root)
                .map(|text| paragraph(&text))
                .into_iter()
                .collect();
            self.root = json!({"type": "doc", "content": blocks});
        }
        if !self.root["content"].is_array() {
            self.root["content"] = Value::Array(Vec::new());
        }
    }
}

fn paragraph(text: &str) -> Value {
    json!({
        "type": "paragraph",
        "content": [{"type": "text", "text": text}],
    })
}

fn replace_in(node: &mut Value, needle: &str, replacement: &str) -> bool {
    match node {
        Value::Object(object) => {
            let is_text = object.get("type").and_then(Value::as_str) == Some("text");
            if is_text {
                if let Some(Value::String(text)) = object.get_mut("text") {
                    if text.contains(needle) {
                        *text = text.replacen(needle, replacement, 1);
                        return true;
                    }
                }
                return false;
            }
            match object.get_mut("content") {
                Some(child) => replace_in(child, needle, replacement),
                None => false,
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .any(|item| replace_in(item, needle, replacement)),
        _ => false,
    }
}

fn collect_blocks(node: &Value, lines: &mut Vec<String>) {
    match node {
        Value::Object(object) => {
            let children = object.get("content").and_then(Value::as_array);
            let has_block_children = children
                .map(|items| items.iter().any(is_block))
                .unwrap_or(false);
            if object.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = object.get("text").and_then(Value::as_str) {
                    lines.push(text.to_string());
                }
            } else if has_block_children {
                for child in children.into_iter().flatten() {
                    collect_blocks(child, lines);
                }
            } else if let Some(items) = children {
                let mut line = String::new();
                for item in items {
                    inline_text(item, &mut line);
                }
                lines.push(line);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_blocks(item, lines);
            }
        }
        Value::String(text) => lines.push(text.clone()),
        _ => {}
    }
}

fn inline_text(node: &Value, out: &mut String) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("hardBreak") => out.push('\n'),
        _ => {
            if let Some(items) = node.get("content").and_then(Value::as_array) {
                for item in items {
                    inline_text(item, out);
                }
            }
        }
    }
}

fn is_block(node: &Value) -> bool {
    !matches!(
        node.get("type").and_then(Value::as_str),
        Some("text") | Some("hardBreak")
    )
}

#[cfg(test)]
mod tests {
    use super::Document;
    use serde_json::{json, Value};

    #[test]
    fn null_content_becomes_empty_doc() {
        let doc = Document::from_value(Value::Null);
        assert_eq!(doc.as_value(), &json!({"type": "doc", "content": []}));
        assert!(doc.is_empty());
    }

    #[test]
    fn append_adds_one_paragraph_per_line() {
        let mut doc = Document::empty();
        doc.append_paragraphs("first\n\n  \nsecond");
        assert_eq!(doc.plain_text(), "first\nsecond");
        assert_eq!(doc.as_value()["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn replace_touches_only_first_match() {
        let mut doc = Document::from_value(json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "the cat sat"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "the cat ran"}]}
            ]
        }));
        assert!(doc.replace_text("cat", "dog"));
        assert_eq!(doc.plain_text(), "the dog sat\nthe cat ran");
    }

    #[test]
    fn replace_missing_text_is_noop() {
        let mut doc = Document::empty();
        doc.append_paragraphs("hello");
        let before = doc.clone();
        assert!(!doc.replace_text("absent", "x"));
        assert!(!doc.replace_text("", "x"));
        assert_eq!(doc, before);
    }

    #[test]
    fn nested_blocks_flatten_to_lines() {
        let doc = Document::from_value(json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 1}, "content": [{"type": "text", "text": "Title"}]},
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [
                            {"type": "text", "text": "a "},
                            {"type": "text", "marks": [{"type": "bold"}], "text": "b"}
                        ]}
                    ]}
                ]}
            ]
        }));
        assert_eq!(doc.plain_text(), "Title\na b");
    }

    #[test]
    fn scalar_root_is_promoted_before_append() {
        let mut doc = Document::from_value(json!("legacy text"));
        doc.append_paragraphs("more");
        assert_eq!(doc.plain_text(), "legacy text\nmore");
    }
}
