//! Wikilink and external-link extraction from a note body (component E).

use flint_note_core::models::ExternalLinkKind;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedWikiLink {
    pub target: String,
    pub text: Option<String>,
    pub line_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedExternalLink {
    pub url: String,
    pub title: Option<String>,
    pub line_number: u32,
    pub kind: ExternalLinkKind,
}

static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());

static EMBED_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[\[([^\]]+)\]\]").unwrap());

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!)?\[([^\]]*)\]\((https?://[^\s)]+)\)").unwrap());

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(])(https?://[^\s)]+)").unwrap());

/// Extract every wikilink (`[[target|text]]`) in a body, one entry per
/// occurrence (duplicates on different lines are both kept).
pub fn extract_wiki_links(body: &str) -> Vec<ExtractedWikiLink> {
    let mut links = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let line_number = idx as u32 + 1;
        // Embeds are handled separately as external/image-like links; skip
        // their inner `[[...]]` so they are not double-counted as wikilinks.
        let embed_spans: Vec<(usize, usize)> = EMBED_LINK
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
            .collect();
        for cap in WIKI_LINK.captures_iter(line) {
            let whole = cap.get(0).unwrap();
            if embed_spans
                .iter()
                .any(|(s, e)| whole.start() >= *s && whole.end() <= *e)
            {
                continue;
            }
            let target = cap.get(1).unwrap().as_str().trim().to_string();
            if target.is_empty() {
                continue;
            }
            let text = cap.get(2).map(|m| m.as_str().trim().to_string());
            links.push(ExtractedWikiLink {
                target,
                text,
                line_number,
            });
        }
    }
    links
}

/// Extract markdown links/images, obsidian-style embeds, and bare URLs.
pub fn extract_external_links(body: &str) -> Vec<ExtractedExternalLink> {
    let mut links = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let line_number = idx as u32 + 1;

        for cap in EMBED_LINK.captures_iter(line) {
            let target = cap.get(1).unwrap().as_str().trim();
            if target.starts_with("http://") || target.starts_with("https://") {
                links.push(ExtractedExternalLink {
                    url: target.to_string(),
                    title: None,
                    line_number,
                    kind: ExternalLinkKind::Embed,
                });
            }
        }

        for cap in MARKDOWN_LINK.captures_iter(line) {
            let is_image = cap.get(1).is_some();
            let title = cap.get(2).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty());
            let url = cap.get(3).unwrap().as_str().to_string();
            links.push(ExtractedExternalLink {
                url,
                title,
                line_number,
                kind: if is_image {
                    ExternalLinkKind::Image
                } else {
                    ExternalLinkKind::Url
                },
            });
        }

        let markdown_urls: Vec<&str> = MARKDOWN_LINK
            .captures_iter(line)
            .map(|c| c.get(3).unwrap().as_str())
            .collect();
        for cap in BARE_URL.captures_iter(line) {
            let url = cap.get(1).unwrap().as_str();
            let url = url.trim_end_matches(|c: char| ".,;:!?".contains(c));
            if markdown_urls.contains(&url) {
                continue;
            }
            links.push(ExtractedExternalLink {
                url: url.to_string(),
                title: None,
                line_number,
                kind: ExternalLinkKind::Url,
            });
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_wikilinks_with_alias() {
        let body = "see [[projects/my-project|the project]] for details";
        let links = extract_wiki_links(body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "projects/my-project");
        assert_eq!(links[0].text.as_deref(), Some("the project"));
        assert_eq!(links[0].line_number, 1);
    }

    #[test]
    fn extracts_plain_wikilink() {
        let links = extract_wiki_links("[[does-not-exist]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "does-not-exist");
        assert_eq!(links[0].text, None);
    }

    #[test]
    fn extracts_markdown_link_and_image() {
        let body = "a [site](https://example.com) and ![alt](https://example.com/img.png)";
        let links = extract_external_links(body);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].kind, ExternalLinkKind::Url);
        assert_eq!(links[1].kind, ExternalLinkKind::Image);
    }

    #[test]
    fn extracts_bare_url() {
        let links = extract_external_links("see https://example.com/page for more.");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/page");
    }

    #[test]
    fn embed_link_is_not_double_counted_as_wikilink() {
        let links = extract_wiki_links("![[https://example.com/img.png]]");
        assert!(links.is_empty());
    }
}
