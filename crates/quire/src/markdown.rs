use std::collections::HashMap;

use pulldown_cmark::{self as md, CowStr, Event, HeadingLevel, LinkType, Tag};

use crate::html::escape;

fn options() -> md::Options {
    let mut options = md::Options::empty();
    options.insert(md::Options::ENABLE_TABLES);
    options.insert(md::Options::ENABLE_FOOTNOTES);
    options.insert(md::Options::ENABLE_STRIKETHROUGH);
    options.insert(md::Options::ENABLE_TASKLISTS);
    options.insert(md::Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// A heading of a rendered document.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Heading {
    pub level: usize,
    pub id: String,
    pub title: String,
}

/// The headings of a document, in document order.
pub type TableOfContents = Vec<Heading>;

#[derive(Debug)]
pub struct RenderedMarkdown {
    pub html: String,
    pub table_of_contents: TableOfContents,
}

/// A link found in a document.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MarkdownLink {
    pub destination: String,
    /// Byte offset of the link in the document.
    pub offset: usize,
}

/// Returns the text of the first level-1 heading in `text`.
pub fn first_heading(text: &str) -> Option<String> {
    let mut parser = md::Parser::new_ext(text, options());

    while let Some(event) = parser.next() {
        if let Event::Start(Tag::Heading(HeadingLevel::H1, _, _)) = event {
            let mut title = String::new();
            for event in parser.by_ref() {
                match event {
                    Event::End(Tag::Heading(_, _, _)) => break,
                    Event::Text(text) | Event::Code(text) => title.push_str(&text),
                    _ => {}
                }
            }

            return Some(title.trim().to_string());
        }
    }

    None
}

/// Returns every link in `text`, skipping email autolinks.
pub fn links(text: &str) -> Vec<MarkdownLink> {
    md::Parser::new_ext(text, options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Link(LinkType::Email, _, _)) => None,
            Event::Start(Tag::Link(_, destination, _)) => Some(MarkdownLink {
                destination: destination.to_string(),
                offset: range.start,
            }),
            _ => None,
        })
        .collect()
}

/// Renders Markdown to HTML.
///
/// Headings get unique ids derived from their text unless one is given with
/// `{ #id }`. `rewrite_link` may replace the destination of any link.
pub fn render_markdown(text: &str, rewrite_link: &dyn Fn(&str) -> Option<String>) -> RenderedMarkdown {
    let mut parser = md::Parser::new_ext(text, options());

    let mut events = Vec::new();
    let mut table_of_contents = Vec::new();
    let mut used_ids = HashMap::new();

    while let Some(event) = parser.next() {
        match event {
            Event::Start(Tag::Heading(level, id, classes)) => {
                let mut inner = Vec::new();
                let mut title = String::new();

                for event in parser.by_ref() {
                    match &event {
                        Event::End(Tag::Heading(_, _, _)) => break,
                        Event::Text(text) | Event::Code(text) => title.push_str(text),
                        _ => {}
                    }

                    inner.push(rewrite_event(event, rewrite_link));
                }

                let title = title.trim().to_string();
                let id = match id {
                    Some(id) => id.to_string(),
                    None => unique_id(&title, &mut used_ids),
                };
                let level = level as usize;

                let class = if classes.is_empty() {
                    String::new()
                } else {
                    format!(r#" class="{}""#, escape(&classes.join(" ")))
                };

                events.push(Event::Html(CowStr::from(format!(
                    r#"<h{level} id="{}"{class}>"#,
                    escape(&id)
                ))));
                events.extend(inner);
                events.push(Event::Html(CowStr::from(format!("</h{level}>\n"))));

                table_of_contents.push(Heading { level, id, title });
            }
            event => events.push(rewrite_event(event, rewrite_link)),
        }
    }

    let mut html = String::with_capacity(text.len() * 3 / 2);
    md::html::push_html(&mut html, events.into_iter());

    RenderedMarkdown {
        html,
        table_of_contents,
    }
}

fn rewrite_event<'a>(event: Event<'a>, rewrite_link: &dyn Fn(&str) -> Option<String>) -> Event<'a> {
    match event {
        Event::Start(Tag::Link(link_type, destination, title)) if link_type != LinkType::Email => {
            let destination = match rewrite_link(&destination) {
                Some(rewritten) => CowStr::from(rewritten),
                None => destination,
            };

            Event::Start(Tag::Link(link_type, destination, title))
        }
        Event::Start(Tag::Image(link_type, destination, title)) => {
            let destination = match rewrite_link(&destination) {
                Some(rewritten) => CowStr::from(rewritten),
                None => destination,
            };

            Event::Start(Tag::Image(link_type, destination, title))
        }
        event => event,
    }
}

fn unique_id(title: &str, used_ids: &mut HashMap<String, usize>) -> String {
    let mut id = slug::slugify(title);
    if id.is_empty() {
        id = "section".to_string();
    }

    let count = used_ids.entry(id.clone()).or_insert(0);
    let unique = if *count == 0 {
        id
    } else {
        format!("{id}-{count}")
    };
    *count += 1;

    unique
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn no_rewrite(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_first_heading() {
        assert_eq!(
            first_heading("Intro\n\n## Not this\n\n# Fetching `listings`\n"),
            Some("Fetching listings".to_string())
        );
        assert_eq!(first_heading("## Only h2\n"), None);
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let text = indoc! {"
            # Build the Listing Card

            ## Props

            ## Props

            ## Custom { #my-id }
        "};

        let rendered = render_markdown(text, &no_rewrite);

        assert_eq!(
            rendered
                .table_of_contents
                .iter()
                .map(|heading| (heading.level, heading.id.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (1, "build-the-listing-card"),
                (2, "props"),
                (2, "props-1"),
                (2, "my-id"),
            ]
        );
        assert!(rendered
            .html
            .contains(r#"<h1 id="build-the-listing-card">Build the Listing Card</h1>"#));
    }

    #[test]
    fn test_code_blocks_are_escaped() {
        let text = indoc! {"
            ```jsx
            const App = () => <ListingCard title=\"Loft\" />;
            ```
        "};

        let rendered = render_markdown(text, &no_rewrite);

        insta::assert_snapshot!(rendered.html, @r###"
        <pre><code class="language-jsx">const App = () =&gt; &lt;ListingCard title=&quot;Loft&quot; /&gt;;
        </code></pre>
        "###);
    }

    #[test]
    fn test_links_are_rewritten() {
        let rewrite = |destination: &str| {
            destination
                .strip_suffix(".md")
                .map(|stem| format!("{stem}.html"))
        };

        let rendered = render_markdown(
            "See [setup](./02-setup.md) and [React](https://react.dev).\n",
            &rewrite,
        );

        assert_eq!(
            rendered.html,
            "<p>See <a href=\"./02-setup.html\">setup</a> and <a href=\"https://react.dev\">React</a>.</p>\n"
        );
    }

    #[test]
    fn test_links_report_offsets() {
        let text = "Intro\n\nGo to [next](./03.md).\n";

        assert_eq!(
            links(text),
            vec![MarkdownLink {
                destination: "./03.md".to_string(),
                offset: 13,
            }]
        );
    }
}
