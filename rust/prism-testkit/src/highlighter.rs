use ahash::AHashSet;
use prism_common::Result;
use prism_index_core::{Highlighter, HighlighterType};

/// Highlights whole-word, case-insensitive matches of a fixed set of terms.
///
/// Each sentence containing at least one match becomes a fragment, with matched
/// words wrapped in `<em>` tags.
#[derive(Debug, Clone)]
pub struct TermHighlighter {
    highlighter_type: HighlighterType,
    max_fragments: Option<usize>,
    terms: AHashSet<String>,
}

impl TermHighlighter {
    pub fn new<S: AsRef<str>>(terms: impl IntoIterator<Item = S>) -> TermHighlighter {
        TermHighlighter {
            highlighter_type: HighlighterType::Unified,
            max_fragments: None,
            terms: terms
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn with_type(mut self, highlighter_type: HighlighterType) -> TermHighlighter {
        self.highlighter_type = highlighter_type;
        self
    }

    pub fn with_max_fragments(mut self, max_fragments: usize) -> TermHighlighter {
        self.max_fragments = Some(max_fragments);
        self
    }

    fn highlight_sentence(&self, sentence: &str) -> Option<String> {
        let mut matched = false;
        let words = sentence
            .split(' ')
            .map(|word| {
                let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
                if !bare.is_empty() && self.terms.contains(&bare.to_lowercase()) {
                    matched = true;
                    word.replacen(bare, &format!("<em>{bare}</em>"), 1)
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>();
        matched.then(|| words.join(" "))
    }
}

impl Highlighter for TermHighlighter {
    fn highlighter_type(&self) -> HighlighterType {
        self.highlighter_type
    }

    fn max_fragments(&self) -> Option<usize> {
        self.max_fragments
    }

    fn fragments(&self, _path: &str, text: &str) -> Result<Vec<String>> {
        let fragments = text
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .filter_map(|sentence| self.highlight_sentence(sentence))
            .take(self.max_fragments.unwrap_or(usize::MAX))
            .collect();
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_per_sentence() {
        let highlighter = TermHighlighter::new(["spice"]);
        let fragments = highlighter
            .fragments(
                "summary",
                "The spice must flow. Nobody knows why. Spice, again!",
            )
            .unwrap();
        assert_eq!(
            fragments,
            vec![
                "The <em>spice</em> must flow.".to_string(),
                "<em>Spice</em>, again!".to_string()
            ]
        );
    }

    #[test]
    fn test_max_fragments() {
        let highlighter = TermHighlighter::new(["a"]).with_max_fragments(1);
        let fragments = highlighter.fragments("f", "a b. a c.").unwrap();
        assert_eq!(fragments, vec!["<em>a</em> b.".to_string()]);
        assert!(highlighter.fragments("f", "nothing here").unwrap().is_empty());
    }
}
