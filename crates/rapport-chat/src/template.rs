//! Response template rendering.
//!
//! Templates use brace placeholders: `{name}` looks up a context value,
//! `{0}`, `{1}`, ... take positional capture groups, and `{{` / `}}` are
//! literal braces. Rendering never fails outward: a template that cannot be
//! fully resolved is returned unchanged by [`render`].

use std::collections::HashMap;

use tracing::debug;

/// Named values available to a template.
pub type TemplateContext = HashMap<String, String>;

/// Render `template`, or `None` if a placeholder is unresolved or a brace
/// is unbalanced.
pub fn try_render(template: &str, context: &TemplateContext, positional: &[String]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }
                if !closed {
                    return None;
                }
                out.push_str(resolve(&key, context, positional)?);
            }
            '}' => return None,
            other => out.push(other),
        }
    }

    Some(out)
}

/// Render `template`, falling back to the raw template text.
pub fn render(template: &str, context: &TemplateContext, positional: &[String]) -> String {
    match try_render(template, context, positional) {
        Some(rendered) => rendered,
        None => {
            debug!(template, "Template placeholder unresolved, using raw text");
            template.to_string()
        }
    }
}

fn resolve<'a>(key: &str, context: &'a TemplateContext, positional: &'a [String]) -> Option<&'a str> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    if key.bytes().all(|b| b.is_ascii_digit()) {
        let idx: usize = key.parse().ok()?;
        return positional.get(idx).map(String::as_str);
    }
    context.get(key).map(String::as_str)
}
