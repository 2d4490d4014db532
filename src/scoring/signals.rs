//! Keyword signal counting.

/// Number of `keywords` that occur in `text`, case-insensitively.
///
/// Plain substring containment on lower-cased strings: "arrest" also matches
/// "arresting", and each keyword counts at most once however often it appears.
pub fn count<S: AsRef<str>>(text: &str, keywords: &[S]) -> usize {
    let haystack = text.to_lowercase();
    count_lowered(&haystack, keywords)
}

/// Same as [`count`] for text that is already lower-cased.
pub(crate) fn count_lowered<S: AsRef<str>>(lowered: &str, keywords: &[S]) -> usize {
    keywords
        .iter()
        .filter(|kw| contains_lowered(lowered, kw.as_ref()))
        .count()
}

/// True if `keyword` (any case) occurs in the already lower-cased text.
pub(crate) fn contains_lowered(lowered: &str, keyword: &str) -> bool {
    lowered.contains(keyword.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_substring() {
        let kws = ["Arrested", "open source"];
        assert_eq!(count("Gang ARRESTED after Open Source tip", &kws), 2);
        assert_eq!(count("nothing here", &kws), 0);
    }

    #[test]
    fn matches_inside_words() {
        // known over-match: "arrest" inside "arresting"
        assert_eq!(count("arresting development", &["arrest"]), 1);
    }

    #[test]
    fn each_keyword_counts_once() {
        assert_eq!(count("seized, seized and seized", &["seized"]), 1);
        let empty: [&str; 0] = [];
        assert_eq!(count("seized", &empty), 0);
    }
}
