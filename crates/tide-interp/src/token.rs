//! Tokenizer for variable references.

use std::ops::Range;

/// Operator of a braced reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `-`: default if unset.
    Default,
    /// `:-`: default if unset or empty.
    DefaultIfEmpty,
    /// `+`: alternative if set.
    Alternative,
    /// `:+`: alternative if set and non-empty.
    AlternativeIfNonEmpty,
    /// `?`: error if unset.
    Required,
    /// `:?`: error if unset or empty.
    RequiredNonEmpty,
}

impl Operator {
    /// Parse an operator at the start of `s`, returning it and its length.
    fn parse(s: &str) -> Option<(Self, usize)> {
        let op = match s.as_bytes() {
            [b':', b'-', ..] => Self::DefaultIfEmpty,
            [b':', b'+', ..] => Self::AlternativeIfNonEmpty,
            [b':', b'?', ..] => Self::RequiredNonEmpty,
            [b'-', ..] => Self::Default,
            [b'+', ..] => Self::Alternative,
            [b'?', ..] => Self::Required,
            _ => return None,
        };
        Some((op, op.symbol().len()))
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Default => "-",
            Self::DefaultIfEmpty => ":-",
            Self::Alternative => "+",
            Self::AlternativeIfNonEmpty => ":+",
            Self::Required => "?",
            Self::RequiredNonEmpty => ":?",
        }
    }

    /// Whether an empty value counts as unset.
    pub fn treats_empty_as_unset(&self) -> bool {
        matches!(
            self,
            Self::DefaultIfEmpty | Self::AlternativeIfNonEmpty | Self::RequiredNonEmpty
        )
    }
}

/// A variable reference found in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    pub operator: Option<Operator>,
    /// Default, alternative or error message; empty without an operator.
    pub argument: &'a str,
    /// Byte range of the whole reference, `$` included.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    Reference(Reference<'a>),
}

/// Splits text into literals and references, left to right.
///
/// A `$` that does not start a well-formed reference (no name, unknown
/// operator, unterminated `${`, or a `{` inside the argument) is literal.
pub struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let mut search = start;
        while let Some(offset) = self.text[search..].find('$') {
            let at = search + offset;
            if let Some(reference) = parse_reference(self.text, at) {
                if at > start {
                    self.pos = at;
                    return Some(Token::Literal(&self.text[start..at]));
                }
                self.pos = reference.span.end;
                return Some(Token::Reference(reference));
            }
            search = at + 1;
        }
        self.pos = self.text.len();
        Some(Token::Literal(&self.text[start..]))
    }
}

/// Tokenize the whole text.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    Tokenizer::new(text).collect()
}

fn parse_reference(text: &str, start: usize) -> Option<Reference<'_>> {
    let bytes = text.as_bytes();
    let after = start + 1;

    if bytes.get(after) != Some(&b'{') {
        let end = scan_name(bytes, after)?;
        return Some(Reference {
            name: &text[after..end],
            operator: None,
            argument: "",
            span: start..end,
        });
    }

    let name_start = after + 1;
    let name_end = scan_name(bytes, name_start)?;
    let name = &text[name_start..name_end];

    if bytes.get(name_end) == Some(&b'}') {
        return Some(Reference {
            name,
            operator: None,
            argument: "",
            span: start..name_end + 1,
        });
    }

    let (operator, len) = Operator::parse(&text[name_end..])?;
    let arg_start = name_end + len;
    let mut end = arg_start;
    loop {
        match bytes.get(end)? {
            b'}' => break,
            b'{' => return None,
            _ => end += 1,
        }
    }

    Some(Reference {
        name,
        operator: Some(operator),
        argument: &text[arg_start..end],
        span: start..end + 1,
    })
}

/// End of a `[A-Za-z_][A-Za-z0-9_]*` name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    Some(start + len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference<'a>(token: &Token<'a>) -> Reference<'a> {
        match token {
            Token::Reference(r) => r.clone(),
            Token::Literal(l) => panic!("expected reference, got literal {l:?}"),
        }
    }

    #[test]
    fn bare_and_braced() {
        let tokens = tokenize("image: $REPO/app:${TAG}!");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::Literal("image: "));
        assert_eq!(reference(&tokens[1]).name, "REPO");
        assert_eq!(tokens[2], Token::Literal("/app:"));
        let tag = reference(&tokens[3]);
        assert_eq!(tag.name, "TAG");
        assert_eq!(tag.span, 17..23);
        assert_eq!(tokens[4], Token::Literal("!"));
    }

    #[test]
    fn operators() {
        let cases = [
            ("${A-x}", Operator::Default),
            ("${A:-x}", Operator::DefaultIfEmpty),
            ("${A+x}", Operator::Alternative),
            ("${A:+x}", Operator::AlternativeIfNonEmpty),
            ("${A?x}", Operator::Required),
            ("${A:?x}", Operator::RequiredNonEmpty),
        ];
        for (text, expected) in cases {
            let tokens = tokenize(text);
            let r = reference(&tokens[0]);
            assert_eq!(r.operator, Some(expected), "{text}");
            assert_eq!(r.argument, "x");
            assert_eq!(r.span, 0..text.len());
        }
    }

    #[test]
    fn nested_reference_yields_innermost_first() {
        let tokens = tokenize("${FOO:-${BAR}}");
        let first_ref = tokens
            .iter()
            .find_map(|t| match t {
                Token::Reference(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_ref.name, "BAR");
        assert_eq!(first_ref.span, 7..13);
    }

    #[test]
    fn malformed_is_literal() {
        for text in ["${", "${NAME", "${1A}", "$", "cost: $5", "${A:x}", "${A:-unterminated"] {
            let tokens = tokenize(text);
            assert!(
                tokens.iter().all(|t| matches!(t, Token::Literal(_))),
                "{text}: {tokens:?}"
            );
        }
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let tokens = tokenize("héllo ${NAME:-wörld} ✓");
        assert_eq!(tokens[0], Token::Literal("héllo "));
        assert_eq!(reference(&tokens[1]).argument, "wörld");
        assert_eq!(tokens[2], Token::Literal(" ✓"));
    }
}
