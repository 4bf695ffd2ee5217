//! Legend templating
//!
//! A legend template names a series from its tags: `cpu {{node}}` on
//! `{node: "a"}` renders as `cpu a`. Unknown tags render as empty text.

use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Expand `{{tag}}` placeholders in `template` against `tags`.
///
/// A template without both markers is returned trimmed and otherwise unchanged.
pub fn render_legend(template: &str, tags: &BTreeMap<String, String>) -> String {
    let template = template.trim();
    if !(template.contains(OPEN) && template.contains(CLOSE)) {
        return template.to_string();
    }

    let fragments: Vec<&str> = template.split(OPEN).collect();
    let mut rendered = String::with_capacity(template.len());

    // fragments[0] precedes the first opening marker and is never a placeholder
    for pair in fragments.windows(2) {
        let (previous, fragment) = (pair[0], pair[1]);
        if !fragment.contains(CLOSE) {
            continue;
        }
        rendered.push_str(after_last_close(previous));

        let key = fragment.split(CLOSE).next().unwrap_or_default();
        if let Some(value) = tags.get(key) {
            rendered.push_str(value);
        }
    }

    if !template.ends_with(CLOSE) {
        rendered.push_str(after_last_close(template));
    }

    rendered
}

/// Display name for a series: the rendered template, or `fallback` when no
/// template was supplied.
pub fn display_name(template: &str, tags: &BTreeMap<String, String>, fallback: &str) -> String {
    if template.trim().is_empty() {
        fallback.to_string()
    } else {
        render_legend(template, tags)
    }
}

fn after_last_close(text: &str) -> &str {
    text.rsplit(CLOSE).next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_template_unchanged() {
        let t = tags(&[("node", "a")]);
        assert_eq!(render_legend("  node  ", &t), "node");
        assert_eq!(render_legend("{{node", &t), "{{node");
    }

    #[test]
    fn test_single_placeholder() {
        let t = tags(&[("node", "a")]);
        assert_eq!(render_legend("lv{{node}}", &t), "lva");
        assert_eq!(render_legend("{{node}}", &t), "a");
    }

    #[test]
    fn test_multiple_placeholders_with_trailing_text() {
        let t = tags(&[("node", "a"), ("cpu", "3")]);
        assert_eq!(render_legend("{{node}}-{{cpu}} busy", &t), "a-3 busy");
        assert_eq!(render_legend("host {{node}} / cpu {{cpu}}", &t), "host a / cpu 3");
    }

    #[test]
    fn test_missing_tag_renders_empty() {
        let t = tags(&[("node", "a")]);
        assert_eq!(render_legend("x{{missing}}y", &t), "xy");
    }

    #[test]
    fn test_stray_close_before_first_open() {
        let t = tags(&[("node", "a")]);
        assert_eq!(render_legend("a}}b{{node}}", &t), "ba");
    }

    #[test]
    fn test_display_name_fallback() {
        let t = tags(&[("node", "a")]);
        assert_eq!(display_name("", &t, "cpu_usage"), "cpu_usage");
        assert_eq!(display_name("lv{{node}}", &t, "cpu_usage"), "lva");
    }
}
