//! Rewrite stages, in pipeline order.
//!
//! Protection stages move spans into the [`Stash`]. Emphasis stages emit
//! private marker characters instead of Slack delimiters, so a later stage
//! can never mistake an earlier stage's output for fresh Markdown; markers
//! become `*`, `_` and `~` only in [`render_markers`].

use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

use super::stash::{CLOSE, OPEN, Stash};

/// Bold delimiter in the working text.
const BOLD: char = '\u{E002}';
/// Italic delimiter in the working text.
const ITALIC: char = '\u{E003}';
/// Strikethrough delimiter in the working text.
const STRIKE: char = '\u{E004}';

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("mrkdwn rule pattern is valid")
}

static RESERVED: LazyLock<Regex> = LazyLock::new(|| compile(&format!("[{OPEN}-{STRIKE}]")));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`[^`\n]+`"));
static SLACK_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"<(?:[@#!]|https?://|mailto:)[^<>\n]*>"));
static LINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(!?\[[^\[\]\n]+\])\(([^()\s]+)\)"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\*\*([^*\s](?:[^\n]*?[^*\s])?)\*\*"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(^|[^A-Za-z0-9_])__([^_\s](?:[^\n]*?[^_\s])?)__"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(^|[^A-Za-z0-9_*])\*([^*\s](?:[^*\n]*?[^*\s])?)\*"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(^|[^A-Za-z0-9_])_([^_\s](?:[^_\n]*?[^_\s])?)_"));
static STRIKETHROUGH: LazyLock<Regex> = LazyLock::new(|| compile(r"~~([^~\n]+?)~~"));
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^> (.*)$"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^ {0,3}#{1,6}[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$"));
static UNORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^([ \t]*)[*+-][ \t]+"));
static ORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^([ \t]*)[0-9]+\.[ \t]+"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"https?://[^\s<>`\[\]{OPEN}-{STRIKE}]+")));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"!?\[([^\[\]\n]+)\]\(({OPEN}[0-9]+{CLOSE})\)"))
});

/// Protect characters this pipeline uses internally, so input that happens
/// to contain them passes through untouched.
pub(super) fn reserved_chars(text: &str, stash: &mut Stash) -> String {
    RESERVED
        .replace_all(text, |caps: &Captures<'_>| stash.put(&caps[0]))
        .into_owned()
}

/// Code fences become bare ```` ``` ```` blocks with a blank line before and
/// one newline after; the block is then opaque.
///
/// A fence opens with a run of three or more backticks at the start of a line
/// (up to three spaces of indent) and closes at the next run at least as long
/// that starts or ends a line. An opened fence with no closer runs to the end
/// of the text. Backtick runs in the middle of a line never open a fence.
pub(super) fn code_fences(text: &str, stash: &mut Stash) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied = 0;
    let mut from = 0;

    while let Some((open, ticks)) = opening_fence(text, from) {
        let line_start = text[..open].rfind('\n').map_or(0, |i| i + 1);
        out.push_str(&text[copied..line_start.max(copied)]);

        let after_open = open + ticks;
        let body_start = after_open + language_tag_len(&text[after_open..]);
        let (body, resume) = match closing_fence(text, body_start, ticks) {
            Some((close, len)) => (&text[body_start..close], close + len),
            None => (&text[body_start..], text.len()),
        };

        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&stash.put(&format!("```\n{}\n```", body.trim())));
        out.push('\n');

        copied = if text[resume..].starts_with('\n') {
            resume + 1
        } else {
            resume
        };
        from = resume;
    }

    out.push_str(&text[copied..]);
    out
}

/// First run of 3+ backticks at or after `from` that starts its line.
fn opening_fence(text: &str, from: usize) -> Option<(usize, usize)> {
    backtick_runs(text, from).find(|&(at, len)| len >= 3 && starts_line(text, at))
}

/// First run of at least `ticks` backticks at or after `from` that starts or ends its line.
fn closing_fence(text: &str, from: usize, ticks: usize) -> Option<(usize, usize)> {
    backtick_runs(text, from)
        .find(|&(at, len)| len >= ticks && (starts_line(text, at) || ends_line(text, at + len)))
}

/// Maximal runs of backticks as `(offset, length)`.
fn backtick_runs(text: &str, from: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let bytes = text.as_bytes();
    let mut i = from;
    std::iter::from_fn(move || {
        while i < bytes.len() && bytes[i] != b'`' {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        Some((start, i - start))
    })
}

fn starts_line(text: &str, at: usize) -> bool {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let indent = &text[line_start..at];
    indent.len() <= 3 && indent.bytes().all(|b| b == b' ')
}

fn ends_line(text: &str, at: usize) -> bool {
    let rest = text[at..].trim_start_matches([' ', '\t']);
    rest.is_empty() || rest.starts_with('\n')
}

/// Length of an info string (plus its newline) right after an opening fence.
fn language_tag_len(after_open: &str) -> usize {
    let Some(newline) = after_open.find('\n') else {
        return 0;
    };
    let tag = after_open[..newline].trim();
    let looks_like_tag = tag.len() <= 32
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.'));
    if looks_like_tag { newline + 1 } else { 0 }
}

/// Inline code is identical in both syntaxes; protect it as-is.
pub(super) fn inline_code(text: &str, stash: &mut Stash) -> String {
    INLINE_CODE
        .replace_all(text, |caps: &Captures<'_>| stash.put(&caps[0]))
        .into_owned()
}

/// Slack's own angle-bracket tokens: `<@U1>`, `<#C1|name>`, `<!here>`, `<https://x|y>`.
pub(super) fn slack_tokens(text: &str, stash: &mut Stash) -> String {
    SLACK_TOKEN
        .replace_all(text, |caps: &Captures<'_>| stash.put(&caps[0]))
        .into_owned()
}

/// Protect link URLs so emphasis stages never rewrite `_` or `*` inside them.
pub(super) fn link_targets(text: &str, stash: &mut Stash) -> String {
    LINK_TARGET
        .replace_all(text, |caps: &Captures<'_>| {
            format!("{}({})", &caps[1], stash.put(&caps[2]))
        })
        .into_owned()
}

/// Protect bare URLs; `__init__.py` or `/*a*` in a path is not emphasis.
///
/// Trailing sentence punctuation and emphasis delimiters stay outside the
/// protected span, as does a closing `)` with no matching `(` in the URL.
pub(super) fn bare_urls(text: &str, stash: &mut Stash) -> String {
    BARE_URL
        .replace_all(text, |caps: &Captures<'_>| {
            let candidate = &caps[0];
            let url = trim_url(candidate);
            format!("{}{}", stash.put(url), &candidate[url.len()..])
        })
        .into_owned()
}

fn trim_url(candidate: &str) -> &str {
    let mut url = candidate;
    loop {
        let mut trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"', '*', '_', '~']);
        if trimmed.ends_with(')') && trimmed.matches(')').count() > trimmed.matches('(').count() {
            trimmed = &trimmed[..trimmed.len() - 1];
        }
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

pub(super) fn bold(text: &str) -> String {
    let text = BOLD_STARS.replace_all(text, format!("{BOLD}${{1}}{BOLD}").as_str());
    BOLD_UNDERSCORES
        .replace_all(&text, format!("${{1}}{BOLD}${{2}}{BOLD}").as_str())
        .into_owned()
}

pub(super) fn italic(text: &str) -> String {
    let text = ITALIC_STAR.replace_all(text, format!("${{1}}{ITALIC}${{2}}{ITALIC}").as_str());
    ITALIC_UNDERSCORE
        .replace_all(&text, format!("${{1}}{ITALIC}${{2}}{ITALIC}").as_str())
        .into_owned()
}

pub(super) fn strikethrough(text: &str) -> String {
    STRIKETHROUGH
        .replace_all(text, format!("{STRIKE}${{1}}{STRIKE}").as_str())
        .into_owned()
}

/// `> q` becomes a `>>>` line followed by `q`.
pub(super) fn blockquotes(text: &str) -> String {
    BLOCKQUOTE.replace_all(text, ">>>\n${1}").into_owned()
}

/// Slack has no headers; they degrade to a bold line.
pub(super) fn headers(text: &str) -> String {
    HEADER
        .replace_all(text, |caps: &Captures<'_>| {
            let title = caps[1].replace(BOLD, "");
            format!("{BOLD}{title}{BOLD}")
        })
        .into_owned()
}

pub(super) fn unordered_lists(text: &str) -> String {
    UNORDERED_ITEM.replace_all(text, "${1}• ").into_owned()
}

/// Slack has no ordered lists; the number marker is dropped.
pub(super) fn ordered_lists(text: &str) -> String {
    ORDERED_ITEM.replace_all(text, "${1}").into_owned()
}

/// `[label](url)` becomes `<url|label>`. The URL is still a placeholder here.
pub(super) fn links(text: &str) -> String {
    LINK.replace_all(text, "<${2}|${1}>").into_owned()
}

/// Turn the private emphasis markers into Slack delimiters.
pub(super) fn render_markers(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            BOLD => '*',
            ITALIC => '_',
            STRIKE => '~',
            other => other,
        })
        .collect()
}
