use std::fmt::Write;

use indexmap::IndexMap;

/// A node in an HTML tree.
#[derive(Debug, Clone)]
pub enum Element {
    Html(HtmlElement),
    /// Text that is escaped when rendered.
    Text(String),
    /// Markup that is written as-is.
    Raw(String),
}

impl From<HtmlElement> for Element {
    fn from(value: HtmlElement) -> Self {
        Self::Html(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone)]
pub struct HtmlElement {
    pub tag_name: String,
    pub children: Vec<Element>,
    pub attrs: IndexMap<String, String>,
}

impl HtmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag_name: tag.into(),
            children: Vec::new(),
            attrs: IndexMap::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        *self.attrs.entry(name.into()).or_default() = value.into();
        self
    }

    /// Sets the attribute when `value` is `Some`, and removes it otherwise.
    ///
    /// An empty value is rendered as a bare attribute, e.g. `<details open>`.
    pub fn attr_opt(mut self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        let name = name.into();
        match value {
            Some(value) => {
                *self.attrs.entry(name).or_default() = value.into();
            }
            None => {
                self.attrs.shift_remove(&name);
            }
        }

        self
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<E>(mut self, children: impl IntoIterator<Item = E>) -> Self
    where
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Appends markup that is rendered without escaping.
    pub fn raw(mut self, markup: impl Into<String>) -> Self {
        self.children.push(Element::Raw(markup.into()));
        self
    }

    pub fn render_to_string(&self) -> Result<String, std::fmt::Error> {
        let mut html = String::new();

        if self.tag_name == "html" {
            write!(&mut html, "<!DOCTYPE html>")?;
        }

        self.write_to(&mut html)?;

        Ok(html)
    }

    fn write_to(&self, html: &mut String) -> std::fmt::Result {
        write!(html, "<{}", self.tag_name)?;

        for (name, value) in &self.attrs {
            if value.is_empty() {
                write!(html, " {name}")?;
            } else {
                write!(html, r#" {name}="{}""#, escape(value))?;
            }
        }

        write!(html, ">")?;

        if is_void(&self.tag_name) {
            return Ok(());
        }

        for child in &self.children {
            match child {
                Element::Html(element) => element.write_to(html)?,
                Element::Text(text) => write!(html, "{}", escape(text))?,
                Element::Raw(markup) => write!(html, "{markup}")?,
            }
        }

        write!(html, "</{}>", self.tag_name)
    }
}

impl HtmlElement {
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn class_opt(self, class: Option<impl Into<String>>) -> Self {
        self.attr_opt("class", class)
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.attr("title", title)
    }

    pub fn href(self, href: impl Into<String>) -> Self {
        self.attr("href", href)
    }
}

fn is_void(tag_name: &str) -> bool {
    matches!(
        tag_name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for char in text.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            char => escaped.push(char),
        }
    }
    escaped
}

macro_rules! elements {
    ($($name:ident),*) => {
        $(
            pub fn $name() -> HtmlElement {
                HtmlElement::new(stringify!($name))
            }
        )*
    }
}

elements! {
    a, article, aside, body, details, div, footer, h1, head, header, html, li, link, main,
    meta, nav, p, script, span, summary, title, ul
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render() {
        let element = div()
            .class("outer")
            .child(div().class("inner").child(h1().class("heading").child("Hi")));

        insta::assert_snapshot!(
            element.render_to_string().unwrap(),
            @r###"<div class="outer"><div class="inner"><h1 class="heading">Hi</h1></div></div>"###
        );
    }

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let element = a().href("/search?q=a&b").child("<Listings & Reviews>");

        assert_eq!(
            element.render_to_string().unwrap(),
            r#"<a href="/search?q=a&amp;b">&lt;Listings &amp; Reviews&gt;</a>"#
        );
    }

    #[test]
    fn test_raw_markup_is_not_escaped() {
        let element = div().raw("<p>Hello</p>");

        assert_eq!(element.render_to_string().unwrap(), "<div><p>Hello</p></div>");
    }

    #[test]
    fn test_void_elements_and_doctype() {
        let element = html().child(head().child(meta().attr("charset", "utf-8")));

        assert_eq!(
            element.render_to_string().unwrap(),
            r#"<!DOCTYPE html><html><head><meta charset="utf-8"></head></html>"#
        );
    }

    #[test]
    fn test_unsetting_an_attribute() {
        let element = div().class("a").class_opt(None::<&str>);

        assert_eq!(element.render_to_string().unwrap(), "<div></div>");
    }

    #[test]
    fn test_optional_attributes() {
        let open = true;
        let active: Option<&str> = None;
        let element = details()
            .attr_opt("open", open.then_some(""))
            .child(a().class_opt(active).href(String::from("/guide/")))
            .child(a().class_opt(Some(String::from("active"))));

        assert_eq!(
            element.render_to_string().unwrap(),
            r#"<details open><a href="/guide/"></a><a class="active"></a></details>"#
        );
    }
}
