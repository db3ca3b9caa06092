//! Tag tables for the built-in element vocabulary.

/// Attribute the server sets on the root of pre-rendered markup.
pub const SSR_ATTR: &str = "data-server-rendered";

/// Prefix of the tag given to component placeholder nodes.
pub const COMPONENT_TAG_PREFIX: &str = "trellis-component-";

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const MATH_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

const HTML_TAGS: &[&str] = &[
    "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
    "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "nav", "section",
    "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol",
    "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em",
    "i", "kbd", "mark", "q", "rp", "rt", "rtc", "ruby", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr", "area", "audio", "map", "track", "video", "embed",
    "object", "param", "source", "canvas", "script", "noscript", "del", "ins", "caption", "col",
    "colgroup", "table", "thead", "tbody", "td", "th", "tr", "button", "datalist", "fieldset",
    "form", "input", "label", "legend", "meter", "optgroup", "option", "output", "progress",
    "select", "textarea", "details", "dialog", "menu", "menuitem", "summary", "content",
    "element", "shadow", "template", "blockquote", "iframe", "tfoot",
];

const SVG_TAGS: &[&str] = &[
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc", "ellipse", "filter",
    "font-face", "foreignObject", "g", "glyph", "image", "line", "marker", "mask",
    "missing-glyph", "path", "pattern", "polygon", "polyline", "rect", "switch", "symbol",
    "text", "textpath", "tspan", "use", "view",
];

const TEXT_INPUT_TYPES: &[&str] = &["text", "number", "password", "search", "email", "tel", "url"];

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(&tag)
}

pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(&tag)
}

/// Tags the platform knows natively. These are never resolved as
/// components.
pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg_tag(tag)
}

/// Namespace implied by a tag on its own.
pub fn get_tag_namespace(tag: &str) -> Option<&'static str> {
    if is_svg_tag(tag) {
        Some(SVG_NAMESPACE)
    } else if tag == "math" {
        Some(MATH_NAMESPACE)
    } else {
        None
    }
}

/// Input types that behave as free-form text and are interchangeable when
/// patching.
pub fn is_text_input_type(input_type: &str) -> bool {
    TEXT_INPUT_TYPES.contains(&input_type)
}

/// Whether creating `tag` as a plain element would produce an unknown
/// element.
pub fn is_unknown_element(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    !is_reserved_tag(tag) && !is_reserved_tag(&lower) && lower != "math"
}

/// Attributes whose presence alone means "true".
pub fn is_boolean_attr(name: &str) -> bool {
    matches!(
        name,
        "allowfullscreen" | "async" | "autofocus" | "autoplay" | "checked" | "compact"
            | "controls" | "declare" | "default" | "defaultchecked" | "defaultmuted"
            | "defaultselected" | "defer" | "disabled" | "enabled" | "formnovalidate"
            | "hidden" | "indeterminate" | "inert" | "ismap" | "itemscope" | "loop"
            | "multiple" | "muted" | "nohref" | "noresize" | "noshade" | "novalidate"
            | "nowrap" | "open" | "pauseonexit" | "readonly" | "required" | "reversed"
            | "scoped" | "seamless" | "selected" | "sortable" | "translate" | "truespeed"
            | "typemustmatch" | "visible"
    )
}

/// Attributes that take the literal strings "true" and "false".
pub fn is_enumerated_attr(name: &str) -> bool {
    matches!(name, "contenteditable" | "draggable" | "spellcheck")
}

/// `fooBar` to `foo-bar`.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `foo-bar` to `fooBar`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `fooBar` to `FooBar`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tags() {
        assert!(is_reserved_tag("div"));
        assert!(is_reserved_tag("svg"));
        assert!(!is_reserved_tag("my-widget"));
        assert!(is_unknown_element("my-widget"));
        assert!(!is_unknown_element("DIV"));
    }

    #[test]
    fn namespaces() {
        assert_eq!(get_tag_namespace("svg"), Some(SVG_NAMESPACE));
        assert_eq!(get_tag_namespace("math"), Some(MATH_NAMESPACE));
        assert_eq!(get_tag_namespace("div"), None);
    }

    #[test]
    fn case_conversions() {
        assert_eq!(hyphenate("fooBarBaz"), "foo-bar-baz");
        assert_eq!(camelize("foo-bar-baz"), "fooBarBaz");
        assert_eq!(capitalize("fooBar"), "FooBar");
    }

    #[test]
    fn text_like_inputs() {
        assert!(is_text_input_type("email"));
        assert!(!is_text_input_type("checkbox"));
    }
}
