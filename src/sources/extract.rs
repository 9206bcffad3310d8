// src/sources/extract.rs
// Extraction pass over rendered search-result HTML. The scraped platforms use
// dynamic markup, so every field is read through an ordered list of candidate
// selectors: first non-empty hit wins, missing fields degrade to defaults
// instead of failing the item.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use crate::post::{Platform, Post};
use crate::sources::{matches_any_keyword, normalize_text};

/// Body text shorter than this is noise (reaction counts, timestamps).
const MIN_BODY_CHARS: usize = 20;
/// Containers examined per page.
const MAX_ITEMS: usize = 5;

/// Selector lists for one platform, in priority order.
pub struct ExtractionRules {
    pub platform: Platform,
    /// Origin prefixed to relative permalinks, e.g. "https://www.facebook.com".
    pub origin: &'static str,
    pub containers: &'static [&'static str],
    pub author: &'static [&'static str],
    pub body: &'static [&'static str],
    pub link: &'static [&'static str],
}

/// First selector list entry that yields a non-empty text, as a pure function
/// of the container.
fn first_text(container: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        if let Some(el) = container.select(&sel).next() {
            let text = normalize_text(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First selector list entry that yields an href.
fn first_href(container: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        if let Some(href) = container
            .select(&sel)
            .find_map(|el| el.value().attr("href"))
        {
            if !href.is_empty() {
                return Some(href.to_string());
            }
        }
    }
    None
}

/// Strip the query string; prefix relative paths with the platform origin.
pub fn normalize_permalink(href: &str, origin: &str) -> String {
    let clean = href.split('?').next().unwrap_or(href);
    if clean.starts_with("http") {
        clean.to_string()
    } else {
        format!("{origin}{clean}")
    }
}

fn fallback_id(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Run the extraction pass: try container selectors in priority order, take
/// the first five matches, extract fields leniently, keep only containers with
/// meaningful keyword-matching text. Never fails on a single bad container.
pub fn extract_posts(html: &str, rules: &ExtractionRules, keywords: &[String]) -> Vec<Post> {
    let document = Html::parse_document(html);

    let mut containers = Vec::new();
    for raw in rules.containers {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let found: Vec<ElementRef<'_>> = document.select(&sel).collect();
        if !found.is_empty() {
            tracing::debug!(selector = raw, count = found.len(), "post containers found");
            containers = found;
            break;
        }
    }
    if containers.is_empty() {
        tracing::debug!(platform = %rules.platform, "no post containers matched any selector");
        return Vec::new();
    }

    let observed_at = Utc::now();
    let mut posts = Vec::new();
    for container in containers.into_iter().take(MAX_ITEMS) {
        let author = first_text(container, rules.author)
            .map(|a| a.trim_start_matches('@').to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let Some(body) = first_text(container, rules.body) else {
            continue;
        };
        if body.chars().count() < MIN_BODY_CHARS {
            continue;
        }
        if !matches_any_keyword(&body, keywords) {
            continue;
        }

        let url = first_href(container, rules.link)
            .map(|h| normalize_permalink(&h, rules.origin))
            .unwrap_or_else(|| rules.origin.to_string());
        let id = if url == rules.origin {
            fallback_id(&body)
        } else {
            url.clone()
        };

        posts.push(Post {
            id,
            author,
            text: body,
            url,
            platform: rules.platform,
            observed_at,
        });
    }

    tracing::debug!(platform = %rules.platform, count = posts.len(), "extraction pass done");
    posts
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: ExtractionRules = ExtractionRules {
        platform: Platform::Facebook,
        origin: "https://www.facebook.com",
        containers: &["[role=\"article\"]", "div.fallback-post"],
        author: &["a.profile strong", "h4 a"],
        body: &["div.message", "div[dir=\"auto\"]"],
        link: &["a[href*=\"/posts/\"]"],
    };

    fn kws() -> Vec<String> {
        vec!["need a website".to_string()]
    }

    #[test]
    fn extracts_fields_with_priority_order() {
        let html = r#"
            <div role="article">
              <a class="profile"><strong>Jo Baker</strong></a>
              <div class="message">I really need a website for my new bakery, any tips?</div>
              <a href="/groups/1/posts/42?ref=feed">link</a>
            </div>"#;
        let posts = extract_posts(html, &RULES, &kws());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "Jo Baker");
        assert_eq!(posts[0].url, "https://www.facebook.com/groups/1/posts/42");
        assert!(posts[0].text.contains("need a website"));
    }

    #[test]
    fn falls_back_to_secondary_selectors() {
        let html = r#"
            <div class="fallback-post">
              <h4><a>Sam</a></h4>
              <div dir="auto">Looking around because I need a website built next month.</div>
            </div>"#;
        let posts = extract_posts(html, &RULES, &kws());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "Sam");
        // No permalink: origin URL and a hashed id.
        assert_eq!(posts[0].url, "https://www.facebook.com");
        assert_eq!(posts[0].id.len(), 16);
    }

    #[test]
    fn missing_author_defaults_to_unknown() {
        let html = r#"
            <div role="article">
              <div class="message">We need a website for the community garden project soon.</div>
            </div>"#;
        let posts = extract_posts(html, &RULES, &kws());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "Unknown");
    }

    #[test]
    fn short_or_offtopic_bodies_are_discarded() {
        let html = r#"
            <div role="article"><div class="message">need a website</div></div>
            <div role="article"><div class="message">Selling fresh vegetables at the market every Saturday morning.</div></div>"#;
        let posts = extract_posts(html, &RULES, &kws());
        assert!(posts.is_empty());
    }

    #[test]
    fn caps_at_five_containers() {
        let item = r#"<div role="article">
            <div class="message">Help, I need a website for my small consulting business.</div>
            <a href="/posts/ID">x</a></div>"#;
        let html: String = (0..8)
            .map(|i| item.replace("ID", &i.to_string()))
            .collect();
        let posts = extract_posts(&html, &RULES, &kws());
        assert_eq!(posts.len(), 5);
    }

    #[test]
    fn permalink_normalization() {
        assert_eq!(
            normalize_permalink("/posts/9?q=1", "https://www.facebook.com"),
            "https://www.facebook.com/posts/9"
        );
        assert_eq!(
            normalize_permalink("https://x.test/p/1?utm=a", "https://ignored"),
            "https://x.test/p/1"
        );
    }
}
