//! Markdown to HTML for reply display.

use pulldown_cmark::{Event, Options, Parser, html};

/// Render reply text (CommonMark with tables and strikethrough) as HTML.
///
/// Raw HTML in the input is emitted as escaped text, so a reply can never
/// inject markup of its own.
pub fn to_markup(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut rendered = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut rendered, events);
    rendered
}
