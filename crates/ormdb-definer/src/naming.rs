//! Naming conventions shared by the definition passes.
//!
//! Entity names are upper camel case by convention (`User`, `TaskUser`).
//! Only the last word of a compound name is inflected, so `DoBefores`
//! singularizes to `DoBefore` with its casing intact.

use heck::{ToLowerCamelCase, ToTitleCase};

/// Uppercase the first character.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plural form of a (possibly compound) name.
pub fn pluralize(name: &str) -> String {
    inflect_last_word(name, 2)
}

/// Singular form of a (possibly compound) name.
pub fn singularize(name: &str) -> String {
    inflect_last_word(name, 1)
}

/// Human readable words for a camel case or underscored name.
///
/// `numberOfUnits` becomes `Number Of Units`, `foo_bar` becomes `Foo Bar`.
pub fn humanize(name: &str) -> String {
    name.to_title_case()
}

/// Join two names into one lower camel case identifier (`task` + `User` ->
/// `taskUser`).
pub fn camelize(first: &str, second: &str) -> String {
    format!("{} {}", first, second).to_lower_camel_case()
}

fn inflect_last_word(name: &str, count: isize) -> String {
    let (head, last) = split_last_word(name);
    if last.is_empty() {
        return name.to_string();
    }
    format!("{}{}", head, pluralizer::pluralize(last, count, false))
}

/// Split before the last uppercase character that starts a word.
fn split_last_word(name: &str) -> (&str, &str) {
    let boundary = name
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    name.split_at(boundary)
}
