//! Note identifier helpers: slugification and `type/filename` id parsing.

/// Turn a note title into a filesystem-safe slug.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// `-`, trims leading/trailing `-`, and falls back to `untitled` for an
/// empty result. Truncated to 200 characters to keep filenames portable.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = false;
    for ch in title.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.len() > 200 {
        slug.truncate(200);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Canonical note id: `"<type>/<slug>.md"`.
pub fn note_id(note_type: &str, slug: &str) -> String {
    format!("{note_type}/{slug}.md")
}

/// Strip a trailing `.md` suffix for display or comparison purposes.
pub fn strip_md_suffix(id: &str) -> &str {
    id.strip_suffix(".md").unwrap_or(id)
}

/// Ensure an identifier carries the canonical `.md` suffix.
pub fn with_md_suffix(id: &str) -> String {
    if id.ends_with(".md") {
        id.to_string()
    } else {
        format!("{id}.md")
    }
}

/// Split a canonical id into its `(type, filename)` parts.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Weird!!  Spacing_Here  "), "weird-spacing-here");
    }

    #[test]
    fn slugify_empty_falls_back() {
        assert_eq!(slugify("!!!"), "untitled");
        assert_eq!(slugify(""), "untitled");
    }

    #[test]
    fn slugify_truncates_long_titles() {
        let title = "a".repeat(500);
        assert!(slugify(&title).len() <= 200);
    }

    #[test]
    fn note_id_and_split_round_trip() {
        let id = note_id("general", "hello-world");
        assert_eq!(id, "general/hello-world.md");
        assert_eq!(split_id(&id), Some(("general", "hello-world.md")));
    }

    #[test]
    fn md_suffix_helpers() {
        assert_eq!(with_md_suffix("general/x"), "general/x.md");
        assert_eq!(with_md_suffix("general/x.md"), "general/x.md");
        assert_eq!(strip_md_suffix("general/x.md"), "general/x");
    }
}
