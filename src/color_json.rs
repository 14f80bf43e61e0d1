//! Purpose: Render pretty JSON with optional ANSI colorization for CLI output.
//! Exports: colorize_json.
//! Role: Small, pure formatter used by CLI emission paths.
//! Invariants: When color is disabled, output equals serde_json::to_string_pretty.
//! Invariants: ANSI escapes appear only when explicitly enabled.
//! Invariants: Reserved `pb/` keys and the string values they carry share the tag color.
use picklebox::api::format::is_reserved_key;
use serde_json::{Map, Value};

const INDENT: &str = "  ";

// 8/16-color palette; bright variants lose contrast on some themes.
const COLOR_KEY: &str = "36";
const COLOR_TAG: &str = "34";
const COLOR_STRING: &str = "32";
const COLOR_NUMBER: &str = "33";
const COLOR_BOOL: &str = "35";
const COLOR_NULL: &str = "39";
const COLOR_PUNCT: &str = "39";

struct Painter {
    use_color: bool,
    out: String,
}

pub fn colorize_json(value: &Value, use_color: bool) -> String {
    let mut painter = Painter {
        use_color,
        out: String::new(),
    };
    painter.value(value, 0, false);
    painter.out
}

impl Painter {
    fn value(&mut self, value: &Value, indent: usize, tagged: bool) {
        match value {
            Value::Null => self.paint("null", COLOR_NULL),
            Value::Bool(flag) => self.paint(if *flag { "true" } else { "false" }, COLOR_BOOL),
            Value::Number(num) => self.paint(&num.to_string(), COLOR_NUMBER),
            Value::String(text) => {
                let color = if tagged { COLOR_TAG } else { COLOR_STRING };
                self.paint(&quoted(text), color);
            }
            Value::Array(items) => self.array(items, indent),
            Value::Object(map) => self.object(map, indent),
        }
    }

    fn array(&mut self, items: &[Value], indent: usize) {
        if items.is_empty() {
            self.paint("[]", COLOR_PUNCT);
            return;
        }
        self.paint("[", COLOR_PUNCT);
        self.out.push('\n');
        for (idx, item) in items.iter().enumerate() {
            self.indent(indent + 1);
            self.value(item, indent + 1, false);
            if idx + 1 < items.len() {
                self.paint(",", COLOR_PUNCT);
            }
            self.out.push('\n');
        }
        self.indent(indent);
        self.paint("]", COLOR_PUNCT);
    }

    fn object(&mut self, map: &Map<String, Value>, indent: usize) {
        if map.is_empty() {
            self.paint("{}", COLOR_PUNCT);
            return;
        }
        self.paint("{", COLOR_PUNCT);
        self.out.push('\n');
        for (idx, (key, value)) in map.iter().enumerate() {
            let reserved = is_reserved_key(key);
            self.indent(indent + 1);
            self.paint(&quoted(key), if reserved { COLOR_TAG } else { COLOR_KEY });
            self.paint(":", COLOR_PUNCT);
            self.out.push(' ');
            self.value(value, indent + 1, reserved);
            if idx + 1 < map.len() {
                self.paint(",", COLOR_PUNCT);
            }
            self.out.push('\n');
        }
        self.indent(indent);
        self.paint("}", COLOR_PUNCT);
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(INDENT);
        }
    }

    fn paint(&mut self, text: &str, color: &str) {
        if self.use_color {
            self.out.push_str("\u{1b}[");
            self.out.push_str(color);
            self.out.push('m');
            self.out.push_str(text);
            self.out.push_str("\u{1b}[0m");
        } else {
            self.out.push_str(text);
        }
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
