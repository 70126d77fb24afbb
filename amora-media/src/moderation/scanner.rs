use regex::Regex;

/// Violation categories recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ContactInfo,
    HateSpeech,
    Explicit,
}

impl Category {
    fn as_str(self) -> &'static str {
        match self {
            Category::ContactInfo => "contact_info",
            Category::HateSpeech => "hate_speech",
            Category::Explicit => "explicit",
        }
    }
}

/// One scanning rule: a category, a term label for the emitted tag,
/// and a compiled matcher.
struct Rule {
    category: Category,
    term: &'static str,
    matcher: Regex,
}

/// Ordered list of scanning rules. The rule data lives in the tables
/// below rather than in control flow, so growing the blocklists never
/// touches `scan`.
pub struct RuleSet {
    rules: Vec<Rule>,
}

// Contact-information leakage patterns. Phone runs require at least
// seven digits so short numbers in ordinary speech don't trip it.
const PHONE_PATTERN: &str = r"(?i)\+?\d(?:[ \-.()]?\d){6,}";
const EMAIL_PATTERN: &str = r"(?i)\b[a-z0-9][a-z0-9._%+-]*@[a-z0-9.-]+\.[a-z]{2,}\b";
const HANDLE_PATTERN: &str = r"(?i)(?:^|\s)@[a-z0-9_.]{3,}\b";

const SOCIAL_PLATFORMS: &[&str] = &[
    "instagram", "insta", "whatsapp", "snapchat", "snap", "telegram",
    "facebook", "tiktok", "onlyfans", "kik", "discord",
];

const HATE_VIOLENCE_TERMS: &[&str] = &[
    "kill", "murder", "bomb", "shoot", "stab", "terrorist", "nazi",
    "lynch", "gas them", "exterminate",
];

const EXPLICIT_TERMS: &[&str] = &[
    "nude", "nudes", "porn", "blowjob", "handjob", "cumshot",
    "fuck me", "dick pic", "escort",
];

impl Default for RuleSet {
    fn default() -> Self {
        let mut rules = Vec::new();

        rules.push(Rule {
            category: Category::ContactInfo,
            term: "phone",
            matcher: Regex::new(PHONE_PATTERN).expect("phone pattern"),
        });
        rules.push(Rule {
            category: Category::ContactInfo,
            term: "email",
            matcher: Regex::new(EMAIL_PATTERN).expect("email pattern"),
        });
        rules.push(Rule {
            category: Category::ContactInfo,
            term: "social_media",
            matcher: Regex::new(HANDLE_PATTERN).expect("handle pattern"),
        });
        for platform in SOCIAL_PLATFORMS {
            rules.push(Rule {
                category: Category::ContactInfo,
                term: "social_media",
                matcher: word_bounded(platform),
            });
        }
        for term in HATE_VIOLENCE_TERMS {
            rules.push(Rule {
                category: Category::HateSpeech,
                term,
                matcher: word_bounded(term),
            });
        }
        for term in EXPLICIT_TERMS {
            rules.push(Rule {
                category: Category::Explicit,
                term,
                matcher: word_bounded(term),
            });
        }

        Self { rules }
    }
}

/// Compile a case-insensitive, word-boundary-anchored matcher for a
/// literal term. "bombastic" must not match the term "bomb".
fn word_bounded(term: &str) -> Regex {
    let escaped = regex::escape(term);
    Regex::new(&format!(r"(?i)\b{escaped}\b")).expect("blocklist term pattern")
}

impl RuleSet {
    /// Scan text against every rule, accumulating the union of
    /// `category:term` tags. Empty input yields an empty list.
    pub fn scan(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut tags: Vec<String> = Vec::new();
        for rule in &self.rules {
            if rule.matcher.is_match(text) {
                let tag = format!("{}:{}", rule.category.as_str(), rule.term);
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<String> {
        RuleSet::default().scan(text)
    }

    #[test]
    fn email_is_flagged() {
        let tags = scan("Email me at john@gmail.com");
        assert!(tags.contains(&"contact_info:email".to_string()), "{tags:?}");
    }

    #[test]
    fn handle_and_platform_are_flagged() {
        let tags = scan("follow @johndoe on Instagram");
        assert!(tags.contains(&"contact_info:social_media".to_string()), "{tags:?}");
    }

    #[test]
    fn phone_number_is_flagged() {
        let tags = scan("call me on 079-1234-5678 tonight");
        assert!(tags.contains(&"contact_info:phone".to_string()), "{tags:?}");
    }

    #[test]
    fn short_digit_runs_are_not_phone_numbers() {
        assert!(scan("I am 25 and live at number 42").is_empty());
    }

    #[test]
    fn word_boundary_respected() {
        // "bombastic" must not trigger the "bomb" blocklist entry
        let tags = scan("I like bombastic music");
        assert!(
            !tags.iter().any(|t| t.starts_with("hate_speech:")),
            "{tags:?}"
        );
    }

    #[test]
    fn blocklist_term_is_flagged() {
        let tags = scan("I will bomb the place");
        assert!(tags.contains(&"hate_speech:bomb".to_string()), "{tags:?}");
    }

    #[test]
    fn explicit_term_is_flagged() {
        let tags = scan("send nudes");
        assert!(tags.contains(&"explicit:nudes".to_string()), "{tags:?}");
    }

    #[test]
    fn empty_and_whitespace_are_clean() {
        assert!(scan("").is_empty());
        assert!(scan("   \n\t ").is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tags = scan("Find me on WHATSAPP");
        assert!(tags.contains(&"contact_info:social_media".to_string()), "{tags:?}");
    }

    #[test]
    fn tags_accumulate_across_categories() {
        let tags = scan("send nudes to john@gmail.com or I will bomb you");
        assert!(tags.contains(&"explicit:nudes".to_string()));
        assert!(tags.contains(&"contact_info:email".to_string()));
        assert!(tags.contains(&"hate_speech:bomb".to_string()));
    }

    #[test]
    fn duplicate_matches_emit_one_tag() {
        let tags = scan("bomb bomb bomb");
        assert_eq!(
            tags.iter().filter(|t| *t == "hate_speech:bomb").count(),
            1
        );
    }

    #[test]
    fn clean_text_yields_no_tags() {
        assert!(scan("I enjoy hiking and cooking pasta on weekends").is_empty());
    }
}
