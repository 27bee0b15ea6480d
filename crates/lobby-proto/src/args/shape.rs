//! Argument shapes and the binding algorithm.

use super::field::{Field, Value};
use super::ParsedArguments;
use crate::error::{ProtocolError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Positional words followed by tab-separated sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordShape {
    pub words: Vec<Field>,
    /// Field applied to every word beyond `words` (unbounded word list).
    pub variadic: Option<Field>,
    pub sentences: Vec<Field>,
}

/// Tab-separated `key=value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedShape {
    pub fields: Vec<Field>,
    /// Accept and keep arbitrary extra keys (script tags and the like).
    pub open: bool,
}

/// The one argument shape a command declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentShape {
    Words(WordShape),
    Named(NamedShape),
}

impl Default for ArgumentShape {
    fn default() -> Self {
        Self::Words(WordShape::default())
    }
}

impl ArgumentShape {
    /// A command taking no arguments.
    pub fn none() -> Self {
        Self::default()
    }

    /// Positional words.
    pub fn words<I: IntoIterator<Item = Field>>(words: I) -> Self {
        Self::Words(WordShape {
            words: words.into_iter().collect(),
            ..WordShape::default()
        })
    }

    /// Sentences only.
    pub fn sentences<I: IntoIterator<Item = Field>>(sentences: I) -> Self {
        Self::Words(WordShape {
            sentences: sentences.into_iter().collect(),
            ..WordShape::default()
        })
    }

    /// Named pairs with the given declared fields.
    pub fn named<I: IntoIterator<Item = Field>>(fields: I) -> Self {
        Self::Named(NamedShape {
            fields: fields.into_iter().collect(),
            open: false,
        })
    }

    /// Named pairs accepting any key.
    pub fn open_named() -> Self {
        Self::Named(NamedShape {
            fields: Vec::new(),
            open: true,
        })
    }

    /// Add trailing sentences to a word shape.
    pub fn then_sentences<I: IntoIterator<Item = Field>>(mut self, sentences: I) -> Self {
        if let Self::Words(shape) = &mut self {
            shape.sentences.extend(sentences);
        }
        self
    }

    /// Add an unbounded word list to a word shape.
    pub fn then_variadic(mut self, field: Field) -> Self {
        if let Self::Words(shape) = &mut self {
            shape.variadic = Some(field);
        }
        self
    }

    /// Check the declaration for ambiguity.
    ///
    /// An unbounded word list makes the boundary between the last word and
    /// the first sentence undecidable, and a required field after an optional
    /// one could never be reached.
    pub fn validate(&self) -> Result<()> {
        let ordered = |fields: &[Field]| {
            fields
                .windows(2)
                .all(|pair| pair[0].required || !pair[1].required)
        };
        match self {
            Self::Words(shape) => {
                if shape.variadic.is_some() && !shape.sentences.is_empty() {
                    return Err(ProtocolError::AmbiguousShape(
                        "variable word list combined with sentences",
                    ));
                }
                if !ordered(&shape.words) || !ordered(&shape.sentences) {
                    return Err(ProtocolError::AmbiguousShape(
                        "required field declared after an optional one",
                    ));
                }
                let words_optional = shape.words.iter().any(|f| !f.required);
                let sentences_required = shape.sentences.iter().any(|f| f.required);
                if words_optional && sentences_required {
                    return Err(ProtocolError::AmbiguousShape(
                        "required sentence after an optional word",
                    ));
                }
                Ok(())
            }
            Self::Named(_) => Ok(()),
        }
    }

    /// Fewest space-separated tokens a valid argument tail can have.
    pub fn min_tokens(&self) -> usize {
        match self {
            Self::Words(shape) => {
                let words = shape.words.iter().filter(|f| f.required).count();
                let variadic = shape.variadic.map_or(0, |f| usize::from(f.required));
                let sentence = usize::from(shape.sentences.iter().any(|f| f.required));
                words + variadic + sentence
            }
            Self::Named(shape) => usize::from(shape.fields.iter().any(|f| f.required)),
        }
    }

    /// Most space-separated tokens a valid argument tail can have, if bounded.
    pub fn max_tokens(&self) -> Option<usize> {
        match self {
            Self::Words(shape) if shape.variadic.is_none() && shape.sentences.is_empty() => {
                Some(shape.words.len())
            }
            _ => None,
        }
    }

    /// Bind a raw argument tail.
    ///
    /// With `strict`, unknown keys in a closed named shape are an error
    /// instead of being logged and ignored.
    pub fn bind(&self, args: &str, strict: bool) -> Result<ParsedArguments> {
        match self {
            Self::Words(shape) => bind_words(shape, args),
            Self::Named(shape) => bind_named(shape, args, strict),
        }
    }
}

/// Take the next word: it ends at a space, or at a tab that opens the
/// sentence tail.
fn next_word(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim_start_matches(' ');
    if rest.is_empty() || rest.starts_with('\t') {
        return None;
    }
    match rest.find([' ', '\t']) {
        Some(pos) if rest.as_bytes()[pos] == b'\t' => Some((&rest[..pos], &rest[pos..])),
        Some(pos) => Some((&rest[..pos], &rest[pos + 1..])),
        None => Some((rest, "")),
    }
}

fn bind_words(shape: &WordShape, args: &str) -> Result<ParsedArguments> {
    let mut parsed = ParsedArguments::default();
    let mut rest = args;

    for field in &shape.words {
        match next_word(rest) {
            Some((word, tail)) => {
                parsed.words.push((field.name, field.bind(word)?));
                rest = tail;
            }
            None if field.required => {
                return Err(ProtocolError::ArgumentCount { field: field.name });
            }
            None => break,
        }
    }

    if let Some(field) = shape.variadic {
        while let Some((word, tail)) = next_word(rest) {
            parsed.variadic.push(field.bind(word)?);
            rest = tail;
        }
        if field.required && parsed.variadic.is_empty() {
            return Err(ProtocolError::ArgumentCount { field: field.name });
        }
        return Ok(parsed);
    }

    let tail = rest.strip_prefix('\t').unwrap_or(rest);
    let tail = tail.trim_start_matches(' ');
    let mut sentences = if tail.is_empty() || shape.sentences.is_empty() {
        None
    } else {
        Some(tail.splitn(shape.sentences.len(), '\t'))
    };

    for field in &shape.sentences {
        match sentences.as_mut().and_then(Iterator::next) {
            Some(text) => parsed.sentences.push((field.name, field.bind(text)?)),
            None if field.required => {
                return Err(ProtocolError::ArgumentCount { field: field.name });
            }
            None => break,
        }
    }

    Ok(parsed)
}

fn bind_named(shape: &NamedShape, args: &str, strict: bool) -> Result<ParsedArguments> {
    let mut raw: BTreeMap<String, String> = BTreeMap::new();
    for token in args.split('\t').filter(|t| !t.trim().is_empty()) {
        let mut parts = token.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ProtocolError::MalformedPair {
                token: token.to_string(),
            });
        };
        raw.insert(key.trim().to_string(), value.to_string());
    }

    let mut parsed = ParsedArguments::default();
    for field in &shape.fields {
        match raw.remove(field.name) {
            Some(value) => {
                parsed.named.insert(field.name.to_string(), field.bind(&value)?);
            }
            None if field.required => {
                return Err(ProtocolError::ArgumentCount { field: field.name });
            }
            None => {}
        }
    }

    for (key, value) in raw {
        if shape.open {
            parsed.named.insert(key, Value::Text(value));
        } else if strict {
            return Err(ProtocolError::UnknownKey { key });
        } else {
            debug!(key = %key, "ignoring unknown argument key");
        }
    }

    Ok(parsed)
}
