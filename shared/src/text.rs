use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PainPoint;

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Replaces `{key}` placeholders with the provided values.
/// Placeholders without a value are kept as is.
pub fn personalize(template: &str, values: &HashMap<&str, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder(&after[..end]) => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push('{');
                        result.push_str(key);
                        result.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTemplate {
    pub title: String,
    pub body: String,
}

impl Default for IssueTemplate {
    fn default() -> Self {
        Self {
            title: "{title}".to_string(),
            body: "{body}\n\n---\n_Created from pain point #{id} (`{slug}`)._".to_string(),
        }
    }
}

impl IssueTemplate {
    pub fn render(&self, pain_point: &PainPoint) -> (String, String) {
        let values = HashMap::from([
            ("id", pain_point.id.to_string()),
            ("title", pain_point.title.clone()),
            ("body", pain_point.body.clone()),
            ("slug", pain_point.slug.clone()),
        ]);
        (
            personalize(&self.title, &values),
            personalize(&self.body, &values),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slugify("Checkout is  SLOW!!"), "checkout-is-slow");
        assert_eq!(slugify("  --Export to CSV-- "), "export-to-csv");
        assert_eq!(slugify("v2.0 release"), "v2-0-release");
    }

    #[test]
    fn slug_of_nothing_useful_is_untitled() {
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("!!! ???"), "untitled");
        assert_eq!(slugify("Ünïcödé"), "n-c-d");
    }

    #[test]
    fn personalize_replaces_known_keys() {
        let values = HashMap::from([("name", "Ada".to_string()), ("count", "3".to_string())]);
        assert_eq!(
            personalize("Hi {name}, you have {count} new {items}", &values),
            "Hi Ada, you have 3 new {items}"
        );
    }

    #[test]
    fn personalize_keeps_non_placeholder_braces() {
        let values = HashMap::from([("name", "Ada".to_string())]);
        assert_eq!(
            personalize("fn main() { {name} } {", &values),
            "fn main() { Ada } {"
        );
    }

    #[test]
    fn default_template_mentions_pain_point() {
        let pain_point = PainPoint {
            id: 42,
            title: "Export is broken".to_string(),
            body: "CSV export times out".to_string(),
            slug: "export-is-broken".to_string(),
            created_at: chrono::Utc::now(),
        };
        let (title, body) = IssueTemplate::default().render(&pain_point);
        assert_eq!(title, "Export is broken");
        assert!(body.starts_with("CSV export times out"));
        assert!(body.contains("pain point #42 (`export-is-broken`)"));
    }
}
