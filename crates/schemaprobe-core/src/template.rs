//! `${NAME}` placeholder substitution

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Replace every `${NAME}` in `input` with `lookup(NAME)`
///
/// Placeholders the lookup cannot resolve are left untouched, so a later
/// pass (or the user reading an error) still sees the original text.
pub fn substitute<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    placeholder()
        .replace_all(input, |caps: &Captures<'_>| {
            let key = caps[1].trim();
            lookup(key).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn replaces_known_placeholders() {
        let vars: HashMap<&str, &str> = [("ROOT", "/srv/lake"), ("BUCKET", "sales")].into();
        let out = substitute("${ROOT}/data and s3://${ BUCKET }/", |k| {
            vars.get(k).map(|v| v.to_string())
        });
        assert_eq!(out, "/srv/lake/data and s3://sales/");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        let out = substitute("${MISSING}/x", |_| None);
        assert_eq!(out, "${MISSING}/x");
    }

    #[test]
    fn no_placeholders_is_identity() {
        assert_eq!(substitute("plain text", |_| Some("x".into())), "plain text");
    }
}
