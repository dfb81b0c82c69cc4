//! Filename tag parsing
//!
//! Tags are the comma-separated tokens inside `(...)` or `[...]` groups of a
//! ROM filename, as used by the common dump naming conventions:
//!
//! ```text
//! Legend of Zelda, The (USA, Europe) (Rev 1) [!].sfc
//! Pokemon Ruby [reg-US] (En,Fr).gba
//! ```
//!
//! Parsing never fails. A token is classified, in order, as:
//! 1. region, when it has a `reg-`/`reg ` prefix (the rest is mapped through
//!    the short-code table or kept verbatim)
//! 2. language, when it has a `lang-`/`lang ` prefix
//! 3. region short code, then region name
//! 4. language short code, then language name
//! 5. revision, when it starts with `rev ` or `rev-` (last one wins)
//! 6. anything else is kept in `other`, in order, duplicates included

use once_cell::sync::Lazy;
use regex::Regex;
use romvault_common::models::RomTags;

static TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]*)\)|\[([^\]]*)\]").expect("valid tag regex"));

static PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(reg|lang|rev)[ \-](.*)$").expect("valid prefix regex")
});

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Region short code → canonical region name
const REGIONS_BY_SHORTCODE: &[(&str, &str)] = &[
    ("a", "Australia"),
    ("as", "Asia"),
    ("b", "Brazil"),
    ("c", "Canada"),
    ("ch", "China"),
    ("e", "Europe"),
    ("eu", "Europe"),
    ("f", "France"),
    ("fn", "Finland"),
    ("g", "Germany"),
    ("gr", "Greece"),
    ("h", "Holland"),
    ("hk", "Hong Kong"),
    ("i", "Italy"),
    ("j", "Japan"),
    ("jp", "Japan"),
    ("k", "Korea"),
    ("nl", "Netherlands"),
    ("no", "Norway"),
    ("pd", "Public Domain"),
    ("r", "Russia"),
    ("s", "Spain"),
    ("sw", "Sweden"),
    ("t", "Taiwan"),
    ("u", "USA"),
    ("us", "USA"),
    ("uk", "England"),
    ("unk", "Unknown"),
    ("unl", "Unlicensed"),
    ("w", "World"),
];

/// Region names recognized without a short code (besides the table values)
const EXTRA_REGION_NAMES: &[&str] = &["United Kingdom", "Scandinavia", "Spain", "Korea"];

/// Language short code → canonical language name
const LANGUAGES_BY_SHORTCODE: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("zh", "Chinese"),
    ("nolang", "No Language"),
];

fn region_by_code(code: &str) -> Option<&'static str> {
    let code = code.to_lowercase();
    REGIONS_BY_SHORTCODE
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, name)| *name)
}

fn region_by_name(name: &str) -> Option<&'static str> {
    REGIONS_BY_SHORTCODE
        .iter()
        .map(|(_, region)| *region)
        .chain(EXTRA_REGION_NAMES.iter().copied())
        .find(|region| region.eq_ignore_ascii_case(name))
}

fn language_by_code(code: &str) -> Option<&'static str> {
    let code = code.to_lowercase();
    LANGUAGES_BY_SHORTCODE
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, name)| *name)
}

fn language_by_name(name: &str) -> Option<&'static str> {
    LANGUAGES_BY_SHORTCODE
        .iter()
        .map(|(_, language)| *language)
        .find(|language| language.eq_ignore_ascii_case(name))
}

/// Split a filename into its trimmed tag tokens, in order of appearance
fn tag_tokens(fs_name: &str) -> Vec<String> {
    TAG_REGEX
        .captures_iter(fs_name)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .flat_map(|body| body.as_str().split(','))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parse the tags of a filename
///
/// # Examples
///
/// ```
/// use romvault_scan::tags::parse_tags;
///
/// let tags = parse_tags("Game (USA) (Rev 1) (HACK).gba");
/// assert_eq!(tags.regions, vec!["USA"]);
/// assert_eq!(tags.revision.as_deref(), Some("1"));
/// assert_eq!(tags.other, vec!["HACK"]);
/// ```
pub fn parse_tags(fs_name: &str) -> RomTags {
    let mut tags = RomTags::default();

    for token in tag_tokens(fs_name) {
        if let Some(caps) = PREFIX_REGEX.captures(&token) {
            let prefix = caps[1].to_lowercase();
            let value = caps[2].trim().to_string();
            match prefix.as_str() {
                "reg" if !value.is_empty() => {
                    let region = region_by_code(&value)
                        .or_else(|| region_by_name(&value))
                        .map(str::to_string)
                        .unwrap_or(value);
                    tags.regions.push(region);
                    continue;
                }
                "lang" if !value.is_empty() => {
                    let language = language_by_code(&value)
                        .or_else(|| language_by_name(&value))
                        .map(str::to_string)
                        .unwrap_or(value);
                    tags.languages.push(language);
                    continue;
                }
                // Revision is only taken once region/language lookups failed
                _ => {}
            }
        }

        if let Some(region) = region_by_code(&token).or_else(|| region_by_name(&token)) {
            tags.regions.push(region.to_string());
            continue;
        }

        if let Some(language) = language_by_code(&token).or_else(|| language_by_name(&token)) {
            tags.languages.push(language.to_string());
            continue;
        }

        if let Some(caps) = PREFIX_REGEX.captures(&token) {
            if caps[1].eq_ignore_ascii_case("rev") {
                tags.revision = Some(caps[2].trim().to_string());
                continue;
            }
        }

        tags.other.push(token);
    }

    tags
}

/// Extension of a filename, lowercase, without the dot (empty if none)
pub fn file_extension(fs_name: &str) -> String {
    match fs_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 10
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_lowercase()
        }
        _ => String::new(),
    }
}

/// Filename without its extension
pub fn file_stem(fs_name: &str) -> &str {
    let ext = file_extension(fs_name);
    if ext.is_empty() {
        fs_name
    } else {
        &fs_name[..fs_name.len() - ext.len() - 1]
    }
}

/// Name with tag groups removed and whitespace collapsed
pub fn strip_tags(name: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(name, " ");
    WHITESPACE_REGEX
        .replace_all(without_tags.trim(), " ")
        .to_string()
}

/// Normalize a title for provider queries and comparisons.
///
/// Lowercases, maps `&` to `and`, replaces punctuation with spaces, moves a
/// trailing ", the" away and drops a leading article.
pub fn normalize_search_term(title: &str) -> String {
    let lowered = title.to_lowercase().replace('&', " and ");
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.len() > 1 && words.last() == Some(&"the") && lowered.contains(", the") {
        words.pop();
    }
    if words.len() > 1 && matches!(words.first(), Some(&"the") | Some(&"a") | Some(&"an")) {
        words.remove(0);
    }
    words.join(" ")
}
