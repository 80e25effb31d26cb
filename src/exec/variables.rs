// src/exec/variables.rs

//! Placeholder substitution for command strings.
//!
//! `$NAME` and `${NAME}` are replaced with the mapped value. Names that are
//! not in the map are left untouched so the shell can still expand them from
//! the environment.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::Variables;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("placeholder pattern is valid")
});

/// Replace every defined placeholder in `command`.
///
/// Values are inserted as-is; no shell quoting is applied.
pub fn substitute<'a>(command: &'a str, variables: &Variables) -> Cow<'a, str> {
    if variables.is_empty() {
        return Cow::Borrowed(command);
    }

    PLACEHOLDER.replace_all(command, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        match variables.get(name) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_both_placeholder_forms() {
        let v = vars(&[("NAME", "world"), ("DIR", "/tmp")]);
        assert_eq!(substitute("echo $NAME", &v), "echo world");
        assert_eq!(substitute("ls ${DIR}/x", &v), "ls /tmp/x");
    }

    #[test]
    fn undefined_placeholders_stay_verbatim() {
        let v = vars(&[("NAME", "world")]);
        assert_eq!(substitute("echo $HOME ${USER}", &v), "echo $HOME ${USER}");
    }

    #[test]
    fn longest_name_wins() {
        let v = vars(&[("NAME", "world")]);
        assert_eq!(substitute("echo $NAMES", &v), "echo $NAMES");
        assert_eq!(substitute("echo ${NAME}S", &v), "echo worldS");
    }

    #[test]
    fn empty_map_borrows_input() {
        let out = substitute("echo $NAME", &Variables::new());
        assert!(matches!(out, Cow::Borrowed(_)));
    }
}
