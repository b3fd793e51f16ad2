//! Markdown to Slack mrkdwn transpiler.
//!
//! Model output is CommonMark-flavoured Markdown; Slack renders its own
//! `mrkdwn` dialect. [`to_mrkdwn`] rewrites one into the other:
//!
//! | Markdown              | mrkdwn           |
//! |-----------------------|------------------|
//! | `**bold**`, `__bold__`| `*bold*`         |
//! | `*em*`, `_em_`        | `_em_`           |
//! | `~~gone~~`            | `~gone~`         |
//! | `[label](url)`        | `<url\|label>`   |
//! | `# Title`             | `*Title*`        |
//! | `- item`              | `• item`         |
//! | `1. item`             | `item`           |
//! | `> quote`             | `>>>` + `quote`  |
//! | ```` ```lang ````     | ```` ``` ````    |
//!
//! Code (fenced and inline), Slack mentions and URLs (link targets and bare
//! `http(s)://` URLs) are protected before any rewrite runs and come back
//! byte-for-byte. `&`, `<` and `>` are not entity-escaped. CRLF line endings
//! are read as LF. The function is total: any input produces
//! output, and text with no Markdown constructs passes through unchanged.

mod rules;
mod stash;

use coderelay_core::message::TranspiledText;

use stash::Stash;

/// Convert Markdown to Slack mrkdwn.
pub fn to_mrkdwn(markdown: &str) -> TranspiledText {
    let mut stash = Stash::new();
    let markdown = markdown.replace("\r\n", "\n");

    let text = rules::reserved_chars(&markdown, &mut stash);
    let text = rules::code_fences(&text, &mut stash);
    let text = rules::inline_code(&text, &mut stash);
    let text = rules::slack_tokens(&text, &mut stash);
    let text = rules::link_targets(&text, &mut stash);
    let text = rules::bare_urls(&text, &mut stash);

    let text = rules::bold(&text);
    let text = rules::italic(&text);
    let text = rules::strikethrough(&text);
    let text = rules::blockquotes(&text);
    let text = rules::headers(&text);
    let text = rules::unordered_lists(&text);
    let text = rules::ordered_lists(&text);
    let text = rules::links(&text);

    let text = rules::render_markers(&text);
    TranspiledText::new(stash.restore(&text))
}
