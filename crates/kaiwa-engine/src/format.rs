//! The value formatter ("pretty printer").
//!
//! Renders a runtime value into a deterministic textual form. Total and
//! side-effect-free. A depth counter tracks aggregate nesting so type
//! descriptors expand to their full description only at the top level;
//! every depth increment has a matching decrement.

use kaiwa_types::Value;

/// Collections with more elements than this switch from a single-line
/// layout to one item per line.
const INLINE_LIMIT: usize = 8;

/// Format a value for display.
pub fn format_value(value: &Value) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    write_value(&mut out, value, &mut depth);
    debug_assert_eq!(depth, 0);
    out
}

fn write_value(out: &mut String, value: &Value, depth: &mut usize) {
    match value {
        Value::Null => out.push_str("null"),
        // Raw report text: no escaping, no quoting.
        Value::Raw(msg) => out.push_str(msg),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Str(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\\\""));
            out.push('"');
        }
        Value::Char(c) => write_char(out, *c),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&f.to_string()),
        Value::List(items) => write_list(out, items, depth),
        Value::Map(entries) => {
            *depth += 1;
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, depth);
                out.push_str(": ");
                write_value(out, v, depth);
            }
            out.push('}');
            *depth -= 1;
        }
        Value::Type(desc) => {
            if *depth > 0 {
                out.push_str(&desc.name);
            } else {
                out.push_str(&desc.describe);
            }
        }
        Value::Opaque(text) => out.push_str(text),
    }
}

fn write_list(out: &mut String, items: &[Value], depth: &mut usize) {
    *depth += 1;
    if items.len() > INLINE_LIMIT {
        // Large dumps stay scannable: one item per line.
        out.push_str("{\n");
        for (i, item) in items.iter().enumerate() {
            out.push_str("  ");
            write_value(out, item, depth);
            if i + 1 != items.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push('}');
    } else {
        out.push_str("{ ");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_value(out, item, depth);
        }
        out.push_str(" }");
    }
    *depth -= 1;
}

fn write_char(out: &mut String, c: char) {
    match c {
        '\'' => out.push_str("'\\''"),
        '\u{07}' => out.push_str("'\\a'"),
        '\u{08}' => out.push_str("'\\b'"),
        '\n' => out.push_str("'\\n'"),
        '\u{0b}' => out.push_str("'\\v'"),
        '\r' => out.push_str("'\\r'"),
        '\u{0c}' => out.push_str("'\\f'"),
        '\t' => out.push_str("'\\t'"),
        c if (c as u32) <= 32 => {
            out.push_str(&format!("'\\x{:x}'", c as u32));
        }
        c => {
            out.push('\'');
            out.push(c);
            out.push('\'');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaiwa_types::TypeDesc;
    use rstest::rstest;

    #[test]
    fn null_and_bools() {
        assert_eq!(format_value(&Value::Null), "null");
        assert_eq!(format_value(&Value::Bool(true)), "true");
        assert_eq!(format_value(&Value::Bool(false)), "false");
    }

    #[test]
    fn strings_are_quoted_with_escaped_quotes() {
        let v = Value::Str(r#"say "hi""#.into());
        assert_eq!(format_value(&v), r#""say \"hi\"""#);
    }

    #[test]
    fn raw_messages_bypass_quoting() {
        let v = Value::Raw(r#"say "hi""#.into());
        assert_eq!(format_value(&v), r#"say "hi""#);
    }

    #[rstest]
    #[case('a', "'a'")]
    #[case('\'', r"'\''")]
    #[case('\n', r"'\n'")]
    #[case('\t', r"'\t'")]
    #[case('\r', r"'\r'")]
    #[case('\u{07}', r"'\a'")]
    #[case('\u{01}', r"'\x1'")]
    fn chars_use_named_or_hex_escapes(#[case] c: char, #[case] expected: &str) {
        assert_eq!(format_value(&Value::Char(c)), expected);
    }

    #[test]
    fn small_lists_are_inline() {
        let v = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(format_value(&v), "{ 1, 2, 3 }");
    }

    #[test]
    fn empty_list() {
        assert_eq!(format_value(&Value::List(vec![])), "{  }");
    }

    #[test]
    fn large_lists_go_one_item_per_line() {
        let v = Value::List((0..10).map(Value::Int).collect());
        let text = format_value(&v);
        assert!(text.starts_with("{\n"));
        assert!(text.ends_with('}'));
        assert_eq!(text.lines().count(), 12); // open + 10 items + close
        assert!(text.contains("  4,\n"));
        // No trailing comma on the last item.
        assert!(text.contains("  9\n}"));
    }

    #[test]
    fn maps_have_balanced_brackets_and_n_minus_one_separators() {
        let v = Value::Map(vec![
            (Value::Str("a".into()), Value::Int(1)),
            (Value::Str("b".into()), Value::Int(2)),
            (Value::Str("c".into()), Value::Int(3)),
        ]);
        let text = format_value(&v);
        assert_eq!(text, r#"{"a": 1, "b": 2, "c": 3}"#);
        assert_eq!(text.matches(", ").count(), 2);
        assert_eq!(text.matches('{').count(), text.matches('}').count());
    }

    #[test]
    fn nested_values_format_recursively() {
        let v = Value::List(vec![
            Value::Map(vec![(Value::Str("k".into()), Value::Null)]),
            Value::Bool(false),
        ]);
        assert_eq!(format_value(&v), r#"{ {"k": null}, false }"#);
    }

    #[test]
    fn type_descriptor_expands_only_at_top_level() {
        let desc = TypeDesc::new("Widget", "interface Widget { fn draw(); fn resize(w, h); }");
        assert_eq!(
            format_value(&Value::Type(desc.clone())),
            "interface Widget { fn draw(); fn resize(w, h); }"
        );
        // Nested inside an aggregate: short name only.
        let nested = Value::List(vec![Value::Type(desc)]);
        assert_eq!(format_value(&nested), "{ Widget }");
    }

    #[test]
    fn opaque_uses_default_conversion() {
        let v = Value::Opaque("Widget#42".into());
        assert_eq!(format_value(&v), "Widget#42");
    }
}
