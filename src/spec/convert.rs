use thiserror::Error;

use super::{Matchers, SpecElem, SpecGrammar};
use crate::grammar::{BuildError, Elem, Grammar};

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Convert a [`SpecGrammar`] (likely parsed from a grammar file) into a full [`Grammar`], or fail
/// with a [`ConvertError`].  This is a largely straightforward process, since the 'shapes' of
/// [`SpecGrammar`] and [`Grammar`] are (intentionally) similar; the only non-trivial work is
/// resolving `special` references against the caller's [`Matchers`] and running the grammar's own
/// validation.
pub(crate) fn convert<A>(spec: SpecGrammar, matchers: &Matchers) -> Result<Grammar<A>> {
    let (root, rules) = spec.into_parts();
    if !rules.contains_key(&root) {
        return Err(ConvertError::UnknownRoot(root));
    }

    let mut builder = Grammar::builder();
    for (name, body) in rules {
        let elems = body
            .into_iter()
            .map(|e| convert_elem(e, &name, matchers))
            .collect::<Result<Vec<_>>>()?;
        builder = builder.rule(name, elems);
    }
    Ok(builder.build()?)
}

fn convert_elem(elem: SpecElem, rule_name: &str, matchers: &Matchers) -> Result<Elem> {
    Ok(match elem {
        SpecElem::Loose(m) => Elem::loose(m),
        SpecElem::Literal(text) => Elem::lit(text),
        SpecElem::Choice(alternatives) => Elem::one_of(
            alternatives
                .into_iter()
                .map(|e| convert_elem(e, rule_name, matchers))
                .collect::<Result<Vec<_>>>()?,
        ),
        SpecElem::Rule { rule } => Elem::rule(rule),
        SpecElem::Plus { plus } => Elem::plus(plus),
        SpecElem::Special { special } => match matchers.get(&special) {
            Some(matcher) => Elem::special(matcher.clone()),
            None => {
                return Err(ConvertError::UnknownMatcher {
                    name: special,
                    rule: rule_name.to_owned(),
                })
            }
        },
    })
}

/// The ways that conversion from [`SpecGrammar`] to [`Grammar`] can fail.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("root rule `{0}` is not defined")]
    UnknownRoot(String),
    #[error("rule `{rule}` uses special matcher `{name}`, which was not supplied")]
    UnknownMatcher { name: String, rule: String },
    #[error(transparent)]
    Build(#[from] BuildError),
}
