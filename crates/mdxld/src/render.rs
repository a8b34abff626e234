//! HTML rendering of document bodies.

use pulldown_cmark::{html, Event, Parser, Tag, TagEnd};

use crate::tree::{is_esm, markdown_options};

/// Render an MDX body to HTML.
///
/// Top-level `import`/`export` blocks are module code rather than content and
/// are left out. Component tags pass through as raw HTML.
pub fn render_html(body: &str) -> String {
    let mut events = Vec::new();
    let mut depth = 0usize;
    let mut skipping = false;

    for (event, range) in Parser::new_ext(body, markdown_options()).into_offset_iter() {
        if skipping {
            if matches!(event, Event::End(TagEnd::Paragraph)) && depth == 1 {
                skipping = false;
                depth = 0;
            } else {
                track_depth(&event, &mut depth);
            }
            continue;
        }

        if depth == 0 && matches!(event, Event::Start(Tag::Paragraph)) && is_esm(&body[range]) {
            skipping = true;
            depth = 1;
            continue;
        }

        track_depth(&event, &mut depth);
        events.push(event);
    }

    let mut output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

fn track_depth(event: &Event<'_>, depth: &mut usize) {
    match event {
        Event::Start(_) => *depth += 1,
        Event::End(_) => *depth = depth.saturating_sub(1),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_markdown() {
        let html = render_html("# Title\n\nSome *emphasis* and a [link](./a.md).\n");

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<a href=\"./a.md\">link</a>"));
    }

    #[test]
    fn drops_top_level_esm() {
        let html = render_html("import Foo from './foo.mdx'\nexport const x = 1\n\n# After\n");

        assert!(!html.contains("import"));
        assert!(!html.contains("export"));
        assert!(html.contains("<h1>After</h1>"));
    }

    #[test]
    fn keeps_nested_import_text() {
        let html = render_html("> import this advice\n");

        assert!(html.contains("<blockquote>"));
        assert!(html.contains("import this advice"));
    }

    #[test]
    fn passes_components_through() {
        let html = render_html("<Callout>\n\nWatch out\n\n</Callout>\n");

        assert!(html.contains("<Callout>"));
        assert!(html.contains("<p>Watch out</p>"));
        assert!(html.contains("</Callout>"));
    }

    #[test]
    fn renders_tables_and_task_lists() {
        let html = render_html("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n");

        assert!(html.contains("<table>"));
        assert!(html.contains("checkbox"));
    }
}
