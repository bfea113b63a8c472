//! HTML document wrapping for pre-rendered pages.

use minijinja::{context, AutoEscape, Environment};
use serde::{Deserialize, Serialize};

use pagekiln_engine::PageDescriptor;

use crate::head::{html_escape, render_tags, validate_tags, HeadTagError};
use crate::route::{base_route, output_route};

/// An icon `<link>` in the document head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconLink {
    /// Link relation, e.g. `icon` or `shortcut icon`
    pub rel: String,
    /// Icon URL
    pub href: String,
    /// Optional `sizes` attribute, e.g. `32x32`
    #[serde(default)]
    pub sizes: Option<String>,
    /// Optional MIME type
    #[serde(default, rename = "type")]
    pub mime: Option<String>,
}

/// Site-wide values baked into every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// `<html lang>`
    pub lang: String,

    /// `application-name` meta tag
    pub app_name: String,

    /// `apple-mobile-web-app-title` meta tag
    pub app_title: String,

    /// `theme-color` meta tag
    pub theme_color: String,

    /// Service worker script registered on load
    pub service_worker: String,

    /// Favicon links
    pub icons: Vec<IconLink>,

    /// Square sizes of `assets/apple-touch-icon-NxN.png`
    pub apple_touch_icon_sizes: Vec<u32>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            app_name: "pagekiln site".to_string(),
            app_title: "pagekiln".to_string(),
            theme_color: "#ffffff".to_string(),
            service_worker: "service-worker.js".to_string(),
            icons: vec![IconLink {
                rel: "shortcut icon".to_string(),
                href: "favicon.ico".to_string(),
                sizes: None,
                mime: None,
            }],
            apple_touch_icon_sizes: vec![57, 60, 72, 76, 114, 120, 144, 152, 167, 180, 1024],
        }
    }
}

/// Errors from rendering a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to render document for /{route}: {message}")]
    Render { route: String, message: String },

    #[error("Invalid head tag for /{route}: {source}")]
    HeadTag { route: String, source: HeadTagError },
}

/// Wraps page fragments into complete HTML documents.
///
/// Output depends only on the page and the [`DocumentConfig`], so equal
/// input always yields byte-identical documents.
pub struct DocumentRenderer {
    env: Environment<'static>,
    config: DocumentConfig,
}

impl DocumentRenderer {
    /// Create a renderer for the given site configuration.
    pub fn new(config: DocumentConfig) -> Self {
        let mut env = Environment::new();

        // Values are escaped explicitly; base href and fragments are raw.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.add_filter("attr", attr_filter);
        env.add_filter("js_string", js_string_filter);

        env.add_template_owned("document.html".to_string(), DOCUMENT_TEMPLATE.to_string())
            .expect("Failed to add document template");

        Self { env, config }
    }

    /// Render the full document for a page.
    pub fn wrap_html(&self, page: &PageDescriptor) -> Result<String, DocumentError> {
        let render_error = |e: minijinja::Error| DocumentError::Render {
            route: page.route.clone(),
            message: e.to_string(),
        };

        validate_tags(&page.head_tags).map_err(|source| DocumentError::HeadTag {
            route: page.route.clone(),
            source,
        })?;

        let tmpl = self.env.get_template("document.html").map_err(render_error)?;

        tmpl.render(context! {
            base => base_route(output_route(&page.route)),
            lang => &self.config.lang,
            app_name => &self.config.app_name,
            app_title => &self.config.app_title,
            theme_color => &self.config.theme_color,
            service_worker => &self.config.service_worker,
            icons => &self.config.icons,
            apple_touch_icon_sizes => &self.config.apple_touch_icon_sizes,
            head_tags => render_tags(&page.head_tags),
            body => &page.html,
        })
        .map_err(render_error)
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}

fn attr_filter(value: String) -> String {
    html_escape(&value)
}

fn js_string_filter(value: String) -> String {
    serde_json::Value::String(value)
        .to_string()
        .replace("</", r"<\/")
}

const DOCUMENT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ lang|attr }}">
<head>
  <link rel="preload" href="content.json" as="fetch" crossorigin="">
  <base href="{{ base }}">
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <script>if ("serviceWorker" in navigator) {
    window.addEventListener("load", () => {
      navigator.serviceWorker.register({{ service_worker|js_string }});
    });
  } else {
    console.log("No service worker registered.");
  }</script>
{%- for icon in icons %}
  <link rel="{{ icon.rel|attr }}"{% if icon.type %} type="{{ icon.type|attr }}"{% endif %}{% if icon.sizes %} sizes="{{ icon.sizes|attr }}"{% endif %} href="{{ icon.href|attr }}">
{%- endfor %}
  <link rel="manifest" href="manifest.json">
  <meta name="mobile-web-app-capable" content="yes">
  <meta name="theme-color" content="{{ theme_color|attr }}">
  <meta name="application-name" content="{{ app_name|attr }}">
{%- for size in apple_touch_icon_sizes %}
  <link rel="apple-touch-icon" sizes="{{ size }}x{{ size }}" href="assets/apple-touch-icon-{{ size }}x{{ size }}.png">
{%- endfor %}
  <meta name="apple-mobile-web-app-capable" content="yes">
  <meta name="apple-mobile-web-app-status-bar-style" content="black-translucent">
  <meta name="apple-mobile-web-app-title" content="{{ app_title|attr }}">
  <script defer="defer" src="main.js" type="module"></script>
  <script defer="defer" src="index.js" type="module"></script>
  <link rel="stylesheet" href="style.css">
  <link rel="preload" href="main.js" as="script">
{%- if head_tags %}
    {{ head_tags }}
{%- endif %}
</head>
<body>
  <div data-url="" display="none"></div>
  {{ body }}
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use pagekiln_engine::HeadTag;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn page(route: &str, html: &str) -> PageDescriptor {
        PageDescriptor {
            route: route.to_string(),
            rendered_body: html.to_string(),
            head_tags: vec![],
            html: html.to_string(),
            static_data: json!({}),
        }
    }

    #[test]
    fn sets_base_href_from_route_depth() {
        let renderer = DocumentRenderer::default();

        let nested = renderer.wrap_html(&page("blog/post-1", "<p>hi</p>")).unwrap();
        assert!(nested.contains(r#"<base href="../../">"#));

        let root = renderer.wrap_html(&page("", "<p>home</p>")).unwrap();
        assert!(root.contains(r#"<base href="./">"#));
    }

    #[test]
    fn index_route_uses_parent_depth() {
        let renderer = DocumentRenderer::default();
        let html = renderer.wrap_html(&page("about/index", "")).unwrap();
        assert!(html.contains(r#"<base href="../">"#));
    }

    #[test]
    fn embeds_fragment_after_mount_marker() {
        let renderer = DocumentRenderer::default();
        let html = renderer
            .wrap_html(&page("a", "<main><h1>Hello</h1></main>"))
            .unwrap();

        let marker = html.find(r#"<div data-url="" display="none"></div>"#).unwrap();
        let fragment = html.find("<main><h1>Hello</h1></main>").unwrap();
        assert!(marker < fragment);
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn includes_static_head_metadata() {
        let renderer = DocumentRenderer::default();
        let html = renderer.wrap_html(&page("a", "")).unwrap();

        assert!(html.contains(r#"<link rel="preload" href="content.json" as="fetch" crossorigin="">"#));
        assert!(html.contains(r#"<link rel="manifest" href="manifest.json">"#));
        assert!(html.contains(r#"<meta name="application-name" content="pagekiln site">"#));
        assert!(html.contains(r#"<link rel="shortcut icon" href="favicon.ico">"#));
        assert!(html.contains(
            r#"<link rel="apple-touch-icon" sizes="1024x1024" href="assets/apple-touch-icon-1024x1024.png">"#
        ));
        assert!(html.contains(r#"navigator.serviceWorker.register("service-worker.js");"#));
        assert!(html.contains(r#"console.log("No service worker registered.");"#));
        assert!(html.contains(r#"<script defer="defer" src="main.js" type="module"></script>"#));
    }

    #[test]
    fn renders_head_tags_in_order() {
        let renderer = DocumentRenderer::default();
        let mut descriptor = page("a", "");
        descriptor.head_tags = vec![
            HeadTag::Meta {
                name: "meta".to_string(),
                attributes: vec![("name".to_string(), "first".to_string())],
            },
            HeadTag::Meta {
                name: "meta".to_string(),
                attributes: vec![("name".to_string(), "second".to_string())],
            },
        ];

        let html = renderer.wrap_html(&descriptor).unwrap();
        let first = html.find(r#"<meta name="first" />"#).unwrap();
        let second = html.find(r#"<meta name="second" />"#).unwrap();
        assert!(first < second);
        assert!(second < html.find("</head>").unwrap());
    }

    #[test]
    fn rejects_unsafe_head_tag_names() {
        let renderer = DocumentRenderer::default();
        let mut descriptor = page("a", "");
        descriptor.head_tags = vec![HeadTag::Meta {
            name: "meta".to_string(),
            attributes: vec![(r#"x"><script>"#.to_string(), "1".to_string())],
        }];

        assert!(matches!(
            renderer.wrap_html(&descriptor),
            Err(DocumentError::HeadTag { .. })
        ));
    }

    #[test]
    fn escapes_configured_values() {
        let renderer = DocumentRenderer::new(DocumentConfig {
            app_name: r#"Tom & "Jerry""#.to_string(),
            icons: vec![IconLink {
                rel: "icon".to_string(),
                href: "icon-32.png".to_string(),
                sizes: Some("32x32".to_string()),
                mime: Some("image/png".to_string()),
            }],
            apple_touch_icon_sizes: vec![],
            ..Default::default()
        });

        let html = renderer.wrap_html(&page("a", "")).unwrap();
        assert!(html.contains(r#"content="Tom &amp; &quot;Jerry&quot;""#));
        assert!(html.contains(
            r#"<link rel="icon" type="image/png" sizes="32x32" href="icon-32.png">"#
        ));
        assert!(!html.contains("apple-touch-icon-"));
    }

    #[test]
    fn output_is_deterministic() {
        let renderer = DocumentRenderer::default();
        let mut descriptor = page("docs/guide", "<p>x</p>");
        descriptor.head_tags = vec![HeadTag::JsonLd {
            contents: json!({"b": 1, "a": [1, 2]}),
        }];

        let first = renderer.wrap_html(&descriptor).unwrap();
        let second = renderer.wrap_html(&descriptor).unwrap();
        let third = DocumentRenderer::default().wrap_html(&descriptor).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }
}
