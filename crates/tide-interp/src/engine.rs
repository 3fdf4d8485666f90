//! Interpolation loop and reference resolution.

use std::collections::{BTreeMap, HashMap};

use tide_core::VariableEnvironment;
use tracing::trace;

use crate::error::{InterpolationError, InterpolationResult};
use crate::token::{Operator, Reference, Token, Tokenizer};

/// Upper bound on substitutions per call. Only values that reference
/// themselves (directly or through a cycle) can reach it.
pub const MAX_SUBSTITUTIONS: usize = 10_000;

/// Stands in for an escaped `$$` while references are being resolved.
/// U+FDD0 is a noncharacter; text or values carrying it are rejected.
const ESCAPED_DOLLAR: char = '\u{FDD0}';

/// Anything variables can be looked up in.
pub trait Lookup {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl Lookup for VariableEnvironment {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl Lookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Lookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Resolve every variable reference in `text`.
///
/// In strict mode a reference that resolves to nothing is an error
/// instead of an empty string.
pub fn interpolate<L>(text: &str, env: &L, strict: bool) -> InterpolationResult<String>
where
    L: Lookup + ?Sized,
{
    if text.contains(ESCAPED_DOLLAR) {
        return Err(InterpolationError::ReservedCharacter);
    }
    let mut buffer = text.replace("$$", &ESCAPED_DOLLAR.to_string());
    let mut substitutions = 0;

    while let Some(reference) = first_reference(&buffer) {
        substitutions += 1;
        if substitutions > MAX_SUBSTITUTIONS {
            return Err(InterpolationError::RecursionLimit {
                limit: MAX_SUBSTITUTIONS,
            });
        }
        let value = resolve(&reference, env, strict)?;
        if value.contains(ESCAPED_DOLLAR) {
            return Err(InterpolationError::ReservedCharacter);
        }
        trace!(name = reference.name, "substituted reference");
        let span = reference.span.clone();
        buffer.replace_range(span, &value);
    }

    Ok(buffer.replace(ESCAPED_DOLLAR, "$"))
}

fn first_reference(text: &str) -> Option<Reference<'_>> {
    Tokenizer::new(text).find_map(|token| match token {
        Token::Reference(r) => Some(r),
        Token::Literal(_) => None,
    })
}

/// Resolve a single reference against the environment.
pub fn resolve<L>(reference: &Reference<'_>, env: &L, strict: bool) -> InterpolationResult<String>
where
    L: Lookup + ?Sized,
{
    let value = env.lookup(reference.name);
    let argument = reference.argument;
    let is_set_for = |op: Operator| match value {
        Some(v) => !(op.treats_empty_as_unset() && v.is_empty()),
        None => false,
    };

    let resolved: Option<&str> = match reference.operator {
        None => value,
        Some(op @ (Operator::Default | Operator::DefaultIfEmpty)) => {
            if is_set_for(op) {
                value
            } else {
                Some(argument)
            }
        }
        Some(op @ (Operator::Alternative | Operator::AlternativeIfNonEmpty)) => {
            if is_set_for(op) {
                Some(argument)
            } else {
                // The empty alternative is itself a defined value.
                Some("")
            }
        }
        Some(op @ (Operator::Required | Operator::RequiredNonEmpty)) => {
            if !is_set_for(op) {
                let message = if !argument.is_empty() {
                    argument.to_string()
                } else if value.is_some() {
                    "value is empty".to_string()
                } else {
                    "value is not set".to_string()
                };
                return Err(InterpolationError::Required {
                    name: reference.name.to_string(),
                    message,
                });
            }
            value
        }
    };

    match resolved {
        Some(v) => Ok(v.to_string()),
        None if strict => Err(InterpolationError::Undefined {
            name: reference.name.to_string(),
        }),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> VariableEnvironment {
        VariableEnvironment::from_pairs(pairs.iter().copied())
    }

    fn run(text: &str, pairs: &[(&str, &str)]) -> String {
        interpolate(text, &env(pairs), false).unwrap()
    }

    #[test]
    fn default_when_unset() {
        assert_eq!(run("nginx:${TAG:-latest}", &[]), "nginx:latest");
        assert_eq!(run("nginx:${TAG:-latest}", &[("TAG", "1.25")]), "nginx:1.25");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        assert_eq!(run("$$LITERAL", &[("LITERAL", "x")]), "$LITERAL");
        assert_eq!(run("price: $$5 and $${A}", &[("A", "x")]), "price: $5 and ${A}");
    }

    #[test]
    fn required_error_names_variable_and_message() {
        let err = interpolate("${NAME:?missing}", &env(&[]), false).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("NAME"), "{text}");
        assert!(text.contains("missing"), "{text}");

        let err = interpolate("${NAME?}", &env(&[]), false).unwrap_err();
        assert!(err.to_string().contains("not set"));
        let err = interpolate("${NAME:?}", &env(&[("NAME", "")]), false).unwrap_err();
        assert!(err.to_string().contains("empty"));
        // `?` only checks definedness.
        assert_eq!(run("[${NAME?oops}]", &[("NAME", "")]), "[]");
    }

    #[test]
    fn operator_table() {
        let set = [("V", "val")];
        let empty = [("V", "")];
        let cases: &[(&str, &[(&str, &str)], &str)] = &[
            ("${V}", &set, "val"),
            ("${V}", &empty, ""),
            ("${V}", &[], ""),
            ("${V-d}", &set, "val"),
            ("${V-d}", &empty, ""),
            ("${V-d}", &[], "d"),
            ("${V:-d}", &set, "val"),
            ("${V:-d}", &empty, "d"),
            ("${V:-d}", &[], "d"),
            ("${V+a}", &set, "a"),
            ("${V+a}", &empty, "a"),
            ("${V+a}", &[], ""),
            ("${V:+a}", &set, "a"),
            ("${V:+a}", &empty, ""),
            ("${V:+a}", &[], ""),
            ("${V?m}", &set, "val"),
            ("${V:?m}", &set, "val"),
        ];
        for (text, pairs, expected) in cases {
            assert_eq!(run(text, pairs), *expected, "{text} with {pairs:?}");
        }
    }

    #[test]
    fn nested_defaults_resolve_inside_out() {
        let text = "${FOO:-${BAR:-${BAZ}}}";
        assert_eq!(run(text, &[("BAZ", "z")]), "z");
        assert_eq!(run(text, &[("BAR", "b"), ("BAZ", "z")]), "b");
        assert_eq!(run(text, &[("FOO", "f"), ("BAR", "b")]), "f");
    }

    #[test]
    fn default_text_is_interpolated() {
        assert_eq!(run("${A:-$B-suffix}", &[("B", "bee")]), "bee-suffix");
    }

    #[test]
    fn strict_mode_rejects_undefined() {
        let e = env(&[("SET", "")]);
        assert!(matches!(
            interpolate("$MISSING", &e, true),
            Err(InterpolationError::Undefined { .. })
        ));
        // Defaults and alternatives make the value defined.
        assert_eq!(
            interpolate("[${MISSING+x}][${MISSING:+x}]", &e, true).unwrap(),
            "[][]"
        );
        assert_eq!(interpolate("${MISSING:-d}", &e, true).unwrap(), "d");
        assert_eq!(interpolate("$SET", &e, true).unwrap(), "");
        assert_eq!(interpolate("${SET:+x}", &e, true).unwrap(), "");
    }

    #[test]
    fn placeholder_character_is_rejected() {
        let reserved = "a\u{FDD0}b $$HOME";
        assert_eq!(
            interpolate(reserved, &env(&[]), false),
            Err(InterpolationError::ReservedCharacter)
        );
        assert_eq!(
            interpolate("${V}", &env(&[("V", "\u{FDD0}")]), false),
            Err(InterpolationError::ReservedCharacter)
        );
    }

    #[test]
    fn malformed_references_are_left_verbatim() {
        assert_eq!(run("${ unterminated $", &[]), "${ unterminated $");
        assert_eq!(run("${A:-x", &[("A", "a")]), "${A:-x");
        assert_eq!(run("50$ off", &[]), "50$ off");
    }

    #[test]
    fn idempotent_once_resolved() {
        let e = env(&[("HOST", "db"), ("PORT", "5432")]);
        let once = interpolate("postgres://${HOST}:${PORT:-5432}/app", &e, false).unwrap();
        let twice = interpolate(&once, &e, false).unwrap();
        assert_eq!(once, "postgres://db:5432/app");
        assert_eq!(once, twice);
    }

    #[test]
    fn self_reference_hits_limit() {
        let err = interpolate("$LOOP", &env(&[("LOOP", "$LOOP")]), false).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::RecursionLimit {
                limit: MAX_SUBSTITUTIONS
            }
        );
    }

    #[test]
    fn plain_maps_work_as_lookup() {
        let mut map = HashMap::new();
        map.insert("A".to_string(), "1".to_string());
        assert_eq!(interpolate("$A", &map, true).unwrap(), "1");
    }
}
