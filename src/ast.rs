//! The seam between the engine and the trees it builds.
//!
//! The engine doesn't dictate an AST shape.  Instead it drives an implementation of [`Ast`]:
//! matched tokens become leaves, completed rules become rows of their children's values, and
//! user-supplied reducers (see [`GrammarBuilder::rule_with`](crate::GrammarBuilder::rule_with))
//! can collapse those rows into whatever the caller actually wants.
//!
//! [`TokenTree`] is the identity implementation - it records exactly what the engine did and is
//! what the tests (and most quick experiments) use.

use crate::lexer::Token;

/// A tree type the engine can build during a parse.
pub trait Ast: Clone {
    /// The value of a matched terminal
    fn leaf(token: &Token) -> Self;

    /// The default reduction of a completed rule: the row of its children's values, in order
    fn row(children: Vec<Self>) -> Self;

    /// The value of a slot that no token filled (a `loose` sentinel match)
    fn hole() -> Self;
}

/// The identity [`Ast`]: a faithful record of the derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTree {
    /// A matched token
    Leaf(Token),
    /// A completed rule: one value per child, in grammar order
    Row(Vec<TokenTree>),
    /// A slot filled by a `loose` sentinel rather than a token
    Hole,
}

impl Ast for TokenTree {
    fn leaf(token: &Token) -> Self {
        TokenTree::Leaf(token.clone())
    }

    fn row(children: Vec<Self>) -> Self {
        TokenTree::Row(children)
    }

    fn hole() -> Self {
        TokenTree::Hole
    }
}

impl TokenTree {
    /// The texts of the leaves of this tree, left to right.  Handy for tests which only care
    /// which tokens were consumed, not how they were nested.
    pub fn leaf_texts(&self) -> Vec<&str> {
        let mut texts = Vec::new();
        self.collect_leaf_texts(&mut texts);
        texts
    }

    fn collect_leaf_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TokenTree::Leaf(token) => out.push(&token.text),
            TokenTree::Row(children) => {
                for child in children {
                    child.collect_leaf_texts(out);
                }
            }
            TokenTree::Hole => {}
        }
    }
}
