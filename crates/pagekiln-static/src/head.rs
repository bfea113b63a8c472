//! Head tag serialization.

use pagekiln_engine::HeadTag;

/// A head tag that cannot be serialized safely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeadTagError {
    #[error("invalid head element name '{0}'")]
    ElementName(String),

    #[error("invalid attribute name '{attribute}' on <{element}>")]
    AttributeName { element: String, attribute: String },
}

/// Check element and attribute names before they are written unescaped.
pub fn validate_tags(tags: &[HeadTag]) -> Result<(), HeadTagError> {
    for tag in tags {
        let HeadTag::Meta { name, attributes } = tag else {
            continue;
        };
        if !is_element_name(name) {
            return Err(HeadTagError::ElementName(name.clone()));
        }
        if let Some((key, _)) = attributes.iter().find(|(key, _)| !is_attribute_name(key)) {
            return Err(HeadTagError::AttributeName {
                element: name.clone(),
                attribute: key.clone(),
            });
        }
    }
    Ok(())
}

fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

/// Render head tags in order, one per line.
///
/// Names are not escaped; run [`validate_tags`] first.
pub fn render_tags(tags: &[HeadTag]) -> String {
    tags.iter()
        .map(render_tag)
        .collect::<Vec<_>>()
        .join("\n    ")
}

fn render_tag(tag: &HeadTag) -> String {
    match tag {
        HeadTag::Meta { name, attributes } => {
            let attrs: String = attributes
                .iter()
                .map(|(key, value)| format!(r#" {}="{}""#, key, html_escape(value)))
                .collect();
            format!("<{}{} />", name, attrs)
        }
        HeadTag::JsonLd { contents } => {
            // `</` inside the payload would end the script element early.
            let json = contents.to_string().replace("</", r"<\/");
            format!(r#"<script type="application/ld+json">{}</script>"#, json)
        }
    }
}

/// Escape text for use inside a double-quoted attribute.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn meta(name: &str, attrs: &[(&str, &str)]) -> HeadTag {
        HeadTag::Meta {
            name: name.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn renders_nothing_for_no_tags() {
        assert_eq!(render_tags(&[]), "");
    }

    #[test]
    fn renders_attributes_in_order() {
        let html = render_tags(&[meta(
            "meta",
            &[("property", "og:title"), ("content", "Post 1")],
        )]);
        assert_eq!(html, r#"<meta property="og:title" content="Post 1" />"#);
    }

    #[test]
    fn escapes_attribute_values() {
        let html = render_tags(&[meta("meta", &[("content", r#"Tom & "Jerry""#)])]);
        assert_eq!(html, r#"<meta content="Tom &amp; &quot;Jerry&quot;" />"#);
    }

    #[test]
    fn renders_json_ld() {
        let html = render_tags(&[HeadTag::JsonLd {
            contents: json!({"@type": "Article", "headline": "</script>"}),
        }]);
        assert_eq!(
            html,
            r#"<script type="application/ld+json">{"@type":"Article","headline":"<\/script>"}</script>"#
        );
    }

    #[test]
    fn accepts_common_names() {
        let tags = [
            meta("meta", &[("property", "og:title"), ("data-x", "1")]),
            meta("link", &[("rel", "alternate"), ("hreflang", "en")]),
            HeadTag::JsonLd {
                contents: json!({}),
            },
        ];
        assert_eq!(validate_tags(&tags), Ok(()));
    }

    #[test]
    fn rejects_unsafe_names() {
        assert_eq!(
            validate_tags(&[meta("meta onload", &[])]),
            Err(HeadTagError::ElementName("meta onload".to_string()))
        );
        assert_eq!(
            validate_tags(&[meta("meta", &[(r#"content" onload="x"#, "y")])]),
            Err(HeadTagError::AttributeName {
                element: "meta".to_string(),
                attribute: r#"content" onload="x"#.to_string(),
            })
        );
        assert!(validate_tags(&[meta("meta", &[("", "y")])]).is_err());
        assert!(validate_tags(&[meta("", &[])]).is_err());
    }

    #[test]
    fn keeps_emission_order() {
        let html = render_tags(&[
            meta("link", &[("rel", "canonical"), ("href", "https://example.com")]),
            meta("meta", &[("name", "description"), ("content", "x")]),
        ]);
        assert_eq!(
            html,
            "<link rel=\"canonical\" href=\"https://example.com\" />\n    <meta name=\"description\" content=\"x\" />"
        );
    }
}
