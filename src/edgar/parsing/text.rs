use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("cleaning pattern")
}

// Blocks whose content is never readable text.
static HIDDEN_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<ix:header\b.*?</ix:header\s*>|<!--.*?-->")
});
static CELL_END_RE: Lazy<Regex> = Lazy::new(|| regex(r"(?i)</t[dh]\s*>"));
static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)<br\s*/?>|</(?:p|div|tr|li|h[1-6]|table|ul|ol|center)\s*>")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| regex(r"(?s)<[^>]+>"));
static HORIZONTAL_SPACE_RE: Lazy<Regex> = Lazy::new(|| regex(r"[^\S\n]+"));
static CELL_RUN_RE: Lazy<Regex> = Lazy::new(|| regex(r"(?: ?\|)+ ?"));

/// Reduces a filing's HTML to plain text: one line per paragraph, div or
/// table row, table cells separated by ` | `.
pub fn clean_filing_html(html: &str) -> String {
    let text = HIDDEN_BLOCK_RE.replace_all(html, "");
    let text = CELL_END_RE.replace_all(&text, " | ");
    let text = BLOCK_END_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");

    // Entities are decoded after tag stripping so escaped markup stays text.
    let text = decode_html_entities(&text);
    let text: String = text.nfkc().collect();
    let text = HORIZONTAL_SPACE_RE.replace_all(&text, " ");

    text.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn clean_line(line: &str) -> String {
    CELL_RUN_RE
        .replace_all(line, " | ")
        .trim()
        .trim_matches('|')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_decodes_entities() {
        let html = r#"<html><head><title>aapl-20230930</title><style>p { margin: 0 }</style></head>
<body><p>Item&nbsp;1.&#160;&#160;Business</p><script>var x = "<p>hidden</p>";</script>
<div>Apple&nbsp;&amp; Co. &lt;b&gt;not a tag&lt;/b&gt;</div><!-- generated --></body></html>"#;

        assert_eq!(
            clean_filing_html(html),
            "Item 1. Business\nApple & Co. <b>not a tag</b>"
        );
    }

    #[test]
    fn test_tables_become_pipe_rows() {
        let html = "<table><tr><td>Revenue</td><td></td><td>$</td><td>1,000</td></tr>\
                    <tr><td>&nbsp;</td><td></td></tr>\
                    <tr><th>Net income</th><td>250</td></tr></table>";

        assert_eq!(
            clean_filing_html(html),
            "Revenue | $ | 1,000\nNet income | 250"
        );
    }

    #[test]
    fn test_inline_xbrl_header_is_dropped() {
        let html = r#"<body><div style="display:none"><ix:header><ix:hidden>dei:AmendmentFlag false</ix:hidden></ix:header></div>
<span>UNITED STATES</span><br/><span>SECURITIES AND EXCHANGE COMMISSION</span></body>"#;

        assert_eq!(
            clean_filing_html(html),
            "UNITED STATES\nSECURITIES AND EXCHANGE COMMISSION"
        );
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(clean_filing_html(""), "");
        assert_eq!(clean_filing_html("<html><body> \n\t </body></html>"), "");
    }
}
