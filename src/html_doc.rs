//! Self-contained HTML packaging for extracted PDF text.
//!
//! The output embeds its stylesheet and carries no external references, so
//! the file stands alone as a download.

use crate::layout::{Block, PageLayout};

const STYLE: &str = "\
:root{ color-scheme: light dark; }
html,body{ margin:0; padding:0; }
body{ font-family: system-ui, sans-serif; line-height:1.5; }
.header{ position:sticky; top:0; padding:12px; background:#fff; border-bottom:1px solid #ccc; }
.header h1{ margin:0; }
.header h1 small{ font-size:0.8em; color:#666; }
.doc{ width: min(100%,800px); margin:16px auto; padding:16px; }
.page{ margin-bottom:32px; }
.page h1{ font-size:1.5em; margin:0 0 0.5em; }
.page h2{ font-size:1.2em; margin:1em 0 0.5em; }
.page p{ margin:0 0 1em; }
footer{ text-align:center; font-size:12px; color:#666; margin:32px 0; }
@media print{ .header, footer{ display:none } .doc{ margin:0; padding:0 } .page{ page-break-after:always } }";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            // Unicode line/paragraph separators break inline scripts and
            // confuse some viewers; render them as plain spaces.
            '\u{2028}' | '\u{2029}' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

pub fn build_standalone_html(title: &str, pages: &[PageLayout]) -> String {
    let mut sections = String::new();
    for page in pages {
        let mut blocks = String::new();
        for block in &page.blocks {
            let rendered = match block {
                Block::Heading1(text) => format!("      <h1>{}</h1>\n", escape(text)),
                Block::Heading2(text) => format!("      <h2>{}</h2>\n", escape(text)),
                Block::Paragraph(text) => format!("      <p>{}</p>\n", escape(text)),
            };
            blocks.push_str(&rendered);
        }
        sections.push_str(&format!(
            "    <section class=\"page\" data-index=\"{}\">\n{}    </section>\n",
            page.number, blocks
        ));
    }

    format!(
        "<!doctype html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\"/>\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\n\
         <title>{title} \u{2014} Text PDF</title>\n\
         <style>{style}</style>\n\
         </head>\n\
         <body>\n\
         <div class=\"header\"><h1>{title} <small>(PDF \u{2192} HTML)</small></h1></div>\n\
         <main class=\"doc\">\n{sections}  </main>\n\
         <footer>Generated locally</footer>\n\
         </body>\n\
         </html>\n",
        title = escape(title),
        style = STYLE,
        sections = sections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_covers_markup_and_separators() {
        assert_eq!(escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape("x\u{2028}y"), "x y");
    }

    #[test]
    fn document_embeds_pages_and_blocks() {
        let pages = vec![PageLayout {
            number: 1,
            blocks: vec![
                Block::Heading1("Title & Co".into()),
                Block::Paragraph("Body <text>".into()),
            ],
        }];
        let html = build_standalone_html("report", &pages);
        assert!(html.contains("<title>report \u{2014} Text PDF</title>"));
        assert!(html.contains("<section class=\"page\" data-index=\"1\">"));
        assert!(html.contains("<h1>Title &amp; Co</h1>"));
        assert!(html.contains("<p>Body &lt;text&gt;</p>"));
        // Self-contained: stylesheet inline, no external references.
        assert!(html.contains("<style>"));
        assert!(!html.contains("href="));
    }

    #[test]
    fn empty_document_is_still_valid_shell() {
        let html = build_standalone_html("empty", &[]);
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("<main class=\"doc\">"));
    }
}
