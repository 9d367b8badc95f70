use std::sync::LazyLock;

use regex::Regex;

/// A display segment of a model response. The renderer is a pure function of
/// the input text; presentation styling happens in the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Bold(String),
    InlineCode(String),
    CodeBlock { text: String, lang: Option<String> },
}

// Fenced blocks keep both delimiters attached so an unterminated ``` never
// matches and falls through as plain text.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("fence pattern"));

// Inline markers stop at newlines, so a dangling ` or ** only affects one
// line. Inline code requires non-empty content: adjacent backticks are fence
// leftovers, not empty code spans.
static INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`|\*\*[^\n]*?\*\*").expect("inline pattern"));

pub fn parse_message(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for m in FENCE.find_iter(text) {
        if m.start() > last {
            parse_inline(&text[last..m.start()], &mut segments);
        }
        segments.push(parse_fence(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        parse_inline(&text[last..], &mut segments);
    }

    segments
}

/// Strip the delimiters from a matched fence, plus the optional language tag
/// on the opening line.
fn parse_fence(raw: &str) -> Segment {
    let inner = &raw[3..raw.len() - 3];

    let (lang, body) = match inner.find('\n') {
        Some(idx) if is_lang_tag(&inner[..idx]) => {
            let tag = &inner[..idx];
            let lang = if tag.is_empty() { None } else { Some(tag.to_string()) };
            (lang, &inner[idx + 1..])
        }
        _ => (None, inner),
    };

    let body = body.strip_suffix('\n').unwrap_or(body);
    Segment::CodeBlock {
        text: body.to_string(),
        lang,
    }
}

fn is_lang_tag(s: &str) -> bool {
    s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_inline(text: &str, out: &mut Vec<Segment>) {
    let mut last = 0;

    for m in INLINE.find_iter(text) {
        if m.start() > last {
            out.push(Segment::Plain(text[last..m.start()].to_string()));
        }
        let matched = m.as_str();
        if let Some(code) = matched
            .strip_prefix('`')
            .and_then(|s| s.strip_suffix('`'))
        {
            out.push(Segment::InlineCode(code.to_string()));
        } else {
            out.push(Segment::Bold(matched[2..matched.len() - 2].to_string()));
        }
        last = m.end();
    }
    if last < text.len() {
        out.push(Segment::Plain(text[last..].to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_split() {
        let segments = parse_message("before ```code line``` after");
        assert_eq!(
            segments,
            vec![
                Segment::Plain("before ".to_string()),
                Segment::CodeBlock {
                    text: "code line".to_string(),
                    lang: None,
                },
                Segment::Plain(" after".to_string()),
            ]
        );
    }

    #[test]
    fn test_inline_markers() {
        let segments = parse_message("plain **bold** `inline` text");
        assert_eq!(
            segments,
            vec![
                Segment::Plain("plain ".to_string()),
                Segment::Bold("bold".to_string()),
                Segment::Plain(" ".to_string()),
                Segment::InlineCode("inline".to_string()),
                Segment::Plain(" text".to_string()),
            ]
        );
    }

    #[test]
    fn test_language_tag_is_stripped() {
        let segments = parse_message("```bash\ncurl http://10.0.0.1/\n```");
        assert_eq!(
            segments,
            vec![Segment::CodeBlock {
                text: "curl http://10.0.0.1/".to_string(),
                lang: Some("bash".to_string()),
            }]
        );
    }

    #[test]
    fn test_fence_without_language_keeps_first_line() {
        let segments = parse_message("```GET /admin HTTP/1.1\nHost: internal\n```");
        assert_eq!(
            segments,
            vec![Segment::CodeBlock {
                text: "GET /admin HTTP/1.1\nHost: internal".to_string(),
                lang: None,
            }]
        );
    }

    #[test]
    fn test_unterminated_fence_is_plain() {
        let segments = parse_message("start ```curl -v");
        assert_eq!(
            segments,
            vec![Segment::Plain("start ```curl -v".to_string())]
        );
    }

    #[test]
    fn test_backtick_runs_are_not_empty_code_spans() {
        let segments = parse_message("a `` b");
        assert_eq!(segments, vec![Segment::Plain("a `` b".to_string())]);
    }

    #[test]
    fn test_unterminated_inline_markers_are_plain() {
        let segments = parse_message("a `dangling tick\nand **dangling bold");
        assert_eq!(
            segments,
            vec![Segment::Plain(
                "a `dangling tick\nand **dangling bold".to_string()
            )]
        );
    }

    #[test]
    fn test_bold_does_not_span_lines() {
        let segments = parse_message("**open\nclose**");
        assert_eq!(
            segments,
            vec![Segment::Plain("**open\nclose**".to_string())]
        );
    }

    #[test]
    fn test_mixed_fences_and_inline() {
        let segments = parse_message("Use `curl`:\n```sh\ncurl -s 0.0.0.0\n```\n**Done**");
        assert_eq!(
            segments,
            vec![
                Segment::Plain("Use ".to_string()),
                Segment::InlineCode("curl".to_string()),
                Segment::Plain(":\n".to_string()),
                Segment::CodeBlock {
                    text: "curl -s 0.0.0.0".to_string(),
                    lang: Some("sh".to_string()),
                },
                Segment::Plain("\n".to_string()),
                Segment::Bold("Done".to_string()),
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let input = "x **y** `z` ```a``` b";
        assert_eq!(parse_message(input), parse_message(input));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_message("").is_empty());
    }
}
