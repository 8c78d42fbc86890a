//! Inline style handling shared by the attribute extensions.
//!
//! Every custom attribute lives in the document as a plain JSON value keyed by
//! a snake_case name. On the way in it is read from one DOM element's
//! attributes or inline `style`; on the way out it is written back the same
//! way. Unset attributes never produce output, not even an empty `style=""`.

use serde_json::Value;

use crate::plugin::AttributeSpec;

/// Read-only view of one DOM element during parsing.
#[derive(Debug, Clone, Default)]
pub struct ElementView {
    tag: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
}

impl ElementView {
    pub fn new(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        let style = attrs
            .iter()
            .find(|(name, _)| name == "style")
            .map(|(_, value)| parse_style(value))
            .unwrap_or_default();
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
            style,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a style property. The last declaration wins, as in CSS.
    pub fn style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .rev()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }
}

/// Attributes and style declarations produced while rendering one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedAttrs {
    pub attrs: Vec<(String, String)>,
    pub style: Vec<(String, String)>,
}

impl RenderedAttrs {
    pub fn attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.push((name.to_string(), value.into()));
    }

    pub fn style(&mut self, property: &str, value: impl Into<String>) {
        self.style.push((property.to_string(), value.into()));
    }

    pub fn has_style_prefix(&self, prefix: &str) -> bool {
        self.style.iter().any(|(p, _)| p.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.style.is_empty()
    }
}

pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            (!property.is_empty() && !value.is_empty()).then(|| (property, value.to_string()))
        })
        .collect()
}

pub fn render_style(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(p, v)| format!("{p}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Largest pixel size read from markup.
pub const MAX_PX: u64 = 4096;

/// Pixel size from `"18px"`, `"18"` or `"18.5px"`, at most [`MAX_PX`].
/// Anything else is `None`.
pub fn parse_px(value: &str) -> Option<u64> {
    let value = value.trim();
    let number = value
        .strip_suffix("px")
        .or_else(|| value.strip_suffix("PX"))
        .unwrap_or(value)
        .trim();
    let parsed: f64 = number.parse().ok()?;
    if !parsed.is_finite() || !(1.0..=MAX_PX as f64).contains(&parsed) {
        return None;
    }
    Some(parsed.trunc() as u64)
}

/// Style values must not be able to break out of their declaration.
pub fn is_safe_style_value(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains([';', '"', '<', '>', '{', '}'])
}

/// `href` and `src` values. Script schemes are refused even when hidden
/// behind case changes, whitespace or control characters.
pub fn is_safe_url(url: &str) -> bool {
    if url.contains(['"', '<', '>']) {
        return false;
    }
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .take_while(|c| *c != ':')
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    let has_scheme = url.contains(':');
    !(has_scheme && UNSAFE_SCHEMES.contains(&scheme.as_str()))
}

const UNSAFE_SCHEMES: [&str; 2] = ["javascript", "vbscript"];

pub(crate) fn non_empty(value: &str) -> Option<Value> {
    let value = value.trim();
    (!value.is_empty()).then(|| Value::String(value.to_string()))
}

/// An attribute stored as a string and carried by one inline style property.
pub fn style_attribute(types: &[&str], key: &str, property: &'static str) -> AttributeSpec {
    AttributeSpec::new(
        types,
        key,
        move |el| {
            el.style(property)
                .filter(|v| is_safe_style_value(v))
                .and_then(non_empty)
        },
        move |value, out| {
            if let Some(v) = value.as_str().filter(|v| is_safe_style_value(v)) {
                out.style(property, v);
            }
        },
    )
}

/// An attribute stored as a string and carried by one HTML attribute.
pub fn html_attribute(types: &[&str], key: &str, name: &'static str) -> AttributeSpec {
    AttributeSpec::new(
        types,
        key,
        move |el| el.attr(name).and_then(non_empty),
        move |value, out| match value {
            Value::String(s) if !s.is_empty() => out.attr(name, s.as_str()),
            Value::Number(n) => out.attr(name, n.to_string()),
            _ => {}
        },
    )
}

/// Like [`html_attribute`], for URLs. Unsafe values are dropped on the way in
/// and never written out.
pub fn url_attribute(types: &[&str], key: &str, name: &'static str) -> AttributeSpec {
    AttributeSpec::new(
        types,
        key,
        move |el| {
            let url = el.attr(name)?.trim();
            if !is_safe_url(url) {
                tracing::warn!(attribute = name, url, "dropping unsafe URL");
                return None;
            }
            non_empty(url)
        },
        move |value, out| {
            if let Some(url) = value.as_str().filter(|u| !u.is_empty() && is_safe_url(u)) {
                out.attr(name, url);
            }
        },
    )
}
