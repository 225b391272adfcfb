//! Template variable substitution for `create_note(..., use_template=true)`.

use chrono::Utc;

/// Replace the fixed set of template placeholders with their values.
///
/// Plain string replacement, no regex, no recursive expansion: an unknown
/// placeholder is left untouched so a template referencing a future
/// variable degrades gracefully instead of corrupting on round-trip.
pub fn render(template: &str, title: &str, note_type: &str, content: &str) -> String {
    let now = Utc::now();
    template
        .replace("{{title}}", title)
        .replace("{{type}}", note_type)
        .replace("{{date}}", &now.format("%Y-%m-%d").to_string())
        .replace("{{time}}", &now.format("%H:%M:%S").to_string())
        .replace("{{content}}", content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let rendered = render("# {{title}}\ntype: {{type}}\n\n{{content}}", "Hi", "general", "body");
        assert_eq!(rendered, "# Hi\ntype: general\n\nbody");
    }

    #[test]
    fn leaves_unknown_placeholders_untouched() {
        let rendered = render("{{unknown}} {{title}}", "Hi", "general", "");
        assert_eq!(rendered, "{{unknown}} Hi");
    }
}
