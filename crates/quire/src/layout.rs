use crate::config::{SiteConfig, SocialLink};
use crate::content::PagePath;
use crate::html::*;
use crate::markdown::TableOfContents;
use crate::validate::{Navigation, ResolvedNavEntry, ResolvedSidebarGroup};

/// Path of the live reload client script in the dev server's bundle.
pub const LIVE_RELOAD_SCRIPT_PATH: &str = "__quire/live-reload.js";

/// Everything shared by the pages of one build.
pub struct RenderContext<'a> {
    pub config: &'a SiteConfig,
    pub navigation: &'a Navigation,
    /// URLs of the stylesheets to link, in order.
    pub stylesheets: &'a [String],
    /// The WebSocket port of the live reload server, when serving.
    pub live_reload_port: Option<u16>,
}

pub struct PageToRender<'a> {
    /// `None` for pages that are not part of the content, like the 404 page.
    pub path: Option<&'a PagePath>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub content: &'a str,
    pub table_of_contents: &'a TableOfContents,
    pub last_updated: Option<String>,
}

pub fn render_page(ctx: &RenderContext, page: &PageToRender) -> Result<String, std::fmt::Error> {
    html()
        .attr("lang", ctx.config.lang.as_str())
        .child(render_head(ctx, page))
        .child(
            body()
                .child(render_header(ctx, page))
                .child(
                    div()
                        .class("layout")
                        .child(render_sidebar(ctx, page))
                        .child(
                            main()
                                .class("content")
                                .child(article().raw(page.content))
                                .children(page.last_updated.as_ref().map(|last_updated| {
                                    footer()
                                        .class("page-footer")
                                        .child(format!("Last updated: {last_updated}"))
                                })),
                        )
                        .children(render_outline(page.table_of_contents)),
                ),
        )
        .render_to_string()
}

fn render_head(ctx: &RenderContext, page: &PageToRender) -> HtmlElement {
    let site_title = ctx.config.title.as_str();
    let document_title = if page.title.is_empty() || page.title == site_title {
        site_title.to_string()
    } else {
        format!("{} | {site_title}", page.title)
    };
    let description = page.description.or(ctx.config.description.as_deref());

    head()
        .child(meta().attr("charset", "utf-8"))
        .child(
            meta()
                .attr("name", "viewport")
                .attr("content", "width=device-width, initial-scale=1"),
        )
        .child(title().child(document_title))
        .children(description.map(|description| {
            meta()
                .attr("name", "description")
                .attr("content", description)
        }))
        .children(
            ctx.stylesheets
                .iter()
                .map(|href| link().attr("rel", "stylesheet").href(href.as_str())),
        )
        .children(ctx.live_reload_port.map(|port| {
            script()
                .attr("src", ctx.navigation.base.join(LIVE_RELOAD_SCRIPT_PATH))
                .attr("data-port", port.to_string())
        }))
}

fn render_header(ctx: &RenderContext, page: &PageToRender) -> HtmlElement {
    header()
        .class("site-header")
        .child(
            a().class("site-title")
                .href(ctx.navigation.base.as_str())
                .child(ctx.config.title.as_str()),
        )
        .child(
            nav().class("site-nav").children(
                ctx.navigation
                    .nav
                    .iter()
                    .map(|entry| render_nav_link(entry, page.path)),
            ),
        )
        .children(
            (!ctx.navigation.social_links.is_empty()).then(|| {
                div()
                    .class("social-links")
                    .children(ctx.navigation.social_links.iter().map(render_social_link))
            }),
        )
}

fn render_nav_link(entry: &ResolvedNavEntry, current: Option<&PagePath>) -> HtmlElement {
    let is_active = entry.page.is_some() && entry.page.as_ref() == current;

    a().class_opt(is_active.then_some("active"))
        .href(entry.url.as_str())
        .child(entry.label.as_str())
}

fn render_social_link(social_link: &SocialLink) -> HtmlElement {
    a().class(format!("social-link social-link-{}", social_link.icon))
        .href(social_link.link.as_str())
        .attr("aria-label", social_link.icon.as_str())
        .attr("rel", "noopener")
        .child(social_link.icon.as_str())
}

fn render_sidebar(ctx: &RenderContext, page: &PageToRender) -> HtmlElement {
    aside().class("sidebar").children(
        ctx.navigation
            .sidebar
            .iter()
            .map(|group| render_sidebar_group(group, page.path)),
    )
}

fn render_sidebar_group(group: &ResolvedSidebarGroup, current: Option<&PagePath>) -> HtmlElement {
    let contains_current = group
        .items
        .iter()
        .any(|item| item.page.is_some() && item.page.as_ref() == current);
    let open = !group.collapsed || contains_current;

    details()
        .class("sidebar-group")
        .attr_opt("open", open.then_some(""))
        .child(summary().child(group.label.as_str()))
        .child(ul().children(
            group
                .items
                .iter()
                .map(|item| li().child(render_nav_link(item, current))),
        ))
}

fn render_outline(table_of_contents: &TableOfContents) -> Option<HtmlElement> {
    let headings = table_of_contents
        .iter()
        .filter(|heading| heading.level == 2 || heading.level == 3)
        .collect::<Vec<_>>();

    if headings.is_empty() {
        return None;
    }

    Some(
        aside()
            .class("outline")
            .child(p().class("outline-title").child("On this page"))
            .child(ul().children(headings.into_iter().map(|heading| {
                li().class(format!("outline-level-{}", heading.level)).child(
                    a().href(format!("#{}", heading.id))
                        .child(heading.title.as_str()),
                )
            }))),
    )
}

/// The body of the page served for unknown paths.
pub fn not_found_content(base: &str) -> String {
    format!(
        "<h1 id=\"page-not-found\">Page not found</h1>\n<p>The page you are looking for does not exist. <a href=\"{}\">Take me home</a>.</p>\n",
        escape(base)
    )
}
