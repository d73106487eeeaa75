//! Corpus cleaner: normalizes raw post text into a flat stream of
//! whitespace-delimited word tokens for the transition store.

use std::sync::LazyLock;

use regex::Regex;

static RETWEETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(RT) .+").expect("valid regex"));
static TAGGED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S*(@|#|(http)|(www\.))\S+").expect("valid regex"));
static JUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\(\)|""#).expect("valid regex"));
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +").expect("valid regex"));
static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));
static STRAY_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\f]+").expect("valid regex"));
static LEADING_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ +").expect("valid regex"));

/// Cleans raw post data into single-spaced clauses with no stray markup.
///
/// Strips, in order: repost lines, tokens carrying mentions / hashtags /
/// URLs / emails, `()` pairs and double quotes; decodes the HTML entities
/// posts arrive with; collapses whitespace runs and leading spaces.
pub fn clean(raw: &str) -> String {
    let text = RETWEETS.replace_all(raw, "");
    let text = TAGGED.replace_all(&text, "");
    let text = JUNK.replace_all(&text, "");
    let text = text.replace("&gt;", ">").replace("&lt;", "<").replace("&amp;", "&");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = NEWLINE_RUNS.replace_all(&text, "\n");
    let text = STRAY_WHITESPACE.replace_all(&text, "");
    let text = LEADING_SPACES.replace_all(&text, "");
    text.into_owned()
}

/// Forward-only stream of word tokens over cleaned text.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_repost_lines() {
        let cleaned = clean("RT @someone: not my words\nmy own post\n");
        assert!(!cleaned.contains("RT"));
        assert_eq!(cleaned.trim(), "my own post");
    }

    #[test]
    fn strips_mentions_links_and_hashtags() {
        let cleaned = clean("go to http://example.com now @bob #tag www.site.com mail@host.io");
        assert_eq!(cleaned.trim(), "go to now");
    }

    #[test]
    fn decodes_html_entities() {
        assert_eq!(clean("a &gt; b &amp; c &lt; d"), "a > b & c < d");
    }

    #[test]
    fn strips_quotes_and_empty_parens() {
        assert_eq!(clean(r#"say "hi" () twice"#).trim(), "say hi twice");
    }

    #[test]
    fn collapses_whitespace() {
        let cleaned = clean("one  two\t three\n\n\nfour\r");
        assert_eq!(cleaned, "one two three\nfour");
    }

    #[test]
    fn tokens_are_whitespace_delimited() {
        let cleaned = clean("one  two\nthree");
        let words: Vec<String> = tokens(&cleaned).collect();
        assert_eq!(words, ["one", "two", "three"]);
    }
}
