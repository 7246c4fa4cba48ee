use regex::Regex;

use super::target::Target;

/// Lower-case a name and drop spaces and hyphens, so `"HD 209458-b"` and
/// `"hd209458b"` compare equal.
pub fn compact_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

enum Matcher {
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    /// The compacted query is used as a regular expression; if it is not a
    /// valid one it is matched as plain text.
    fn new(query: &str) -> Self {
        let compact = compact_name(query);
        match Regex::new(&compact) {
            Ok(re) => Matcher::Pattern(re),
            Err(_) => Matcher::Literal(compact),
        }
    }

    fn is_match(&self, name: &str) -> bool {
        let name = compact_name(name);
        match self {
            Matcher::Pattern(re) => re.is_match(&name),
            Matcher::Literal(text) => name.contains(text.as_str()),
        }
    }
}

/// Every target whose star or planet name contains the query.
pub fn search_targets<'a>(targets: &'a [Target], query: &str) -> Vec<&'a Target> {
    let matcher = Matcher::new(query);
    targets
        .iter()
        .filter(|t| {
            matcher.is_match(&t.star.name())
                || t.planet.as_ref().is_some_and(|p| matcher.is_match(&p.name()))
        })
        .collect()
}
