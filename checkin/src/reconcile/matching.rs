use crate::SelectOption;

/// Length of the normalized prefix compared by the last matching rule.
pub const PREFIX_LEN: usize = 10;

/// Which rule resolved an input to an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRule {
    ExactValue,
    NormalizedValue,
    Label,
    NormalizedLabel,
    Containment,
    Prefix,
}

/// Case-fold, drop punctuation and join words with underscores.
///
/// `"Yes, completely safe!"` becomes `"yes_completely_safe"`.
pub fn normalize(input: &str) -> String {
    input
        .split(|c: char| c.is_whitespace() || c == '_')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Resolve free-form `input` to one of `options`.
///
/// Rules are tried in priority order and the first option matching the
/// first applicable rule wins:
/// exact value, normalized value, case-insensitive label, normalized label,
/// containment either way between normalized label and input, and finally
/// equal normalized prefixes of [`PREFIX_LEN`] characters.
pub fn match_option<'a>(input: &str, options: &'a [SelectOption]) -> Option<&'a SelectOption> {
    resolve(input, options).map(|(option, _)| option)
}

/// Like [`match_option`], also reporting the rule that matched.
pub fn resolve<'a>(
    input: &str,
    options: &'a [SelectOption],
) -> Option<(&'a SelectOption, MatchRule)> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let probe = Probe {
        raw: input,
        lowered: input.to_lowercase(),
        normalized: normalize(input),
    };

    MatchRule::ALL.into_iter().find_map(|rule| {
        options
            .iter()
            .find(|&option| rule.matches(option, &probe))
            .map(|option| (option, rule))
    })
}

struct Probe<'a> {
    raw: &'a str,
    lowered: String,
    normalized: String,
}

impl MatchRule {
    /// All rules, highest priority first.
    pub const ALL: [MatchRule; 6] = [
        MatchRule::ExactValue,
        MatchRule::NormalizedValue,
        MatchRule::Label,
        MatchRule::NormalizedLabel,
        MatchRule::Containment,
        MatchRule::Prefix,
    ];

    fn matches(self, option: &SelectOption, probe: &Probe<'_>) -> bool {
        let needle = probe.normalized.as_str();
        match self {
            Self::ExactValue => option.value == probe.raw,
            Self::NormalizedValue => !needle.is_empty() && normalize(&option.value) == needle,
            Self::Label => option.label.trim().to_lowercase() == probe.lowered,
            Self::NormalizedLabel => !needle.is_empty() && normalize(&option.label) == needle,
            Self::Containment => {
                let label = normalize(&option.label);
                !needle.is_empty()
                    && !label.is_empty()
                    && (label.contains(needle) || needle.contains(label.as_str()))
            }
            Self::Prefix => {
                let label = normalize(&option.label);
                match (prefix(&label), prefix(needle)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
        }
    }
}

fn prefix(s: &str) -> Option<&str> {
    match s.char_indices().nth(PREFIX_LEN) {
        Some((end, _)) => Some(&s[..end]),
        None if s.chars().count() == PREFIX_LEN => Some(s),
        None => None,
    }
}
