//! Character-level Newick parser producing arena [`Tree`]s.
//!
//! Grammar handled, one character at a time:
//! - `(` opens a child and descends into it
//! - `,` closes the pending node and opens a sibling
//! - `)` closes the pending node and ascends to the parent
//! - `:` starts a branch length, read up to the next `,`, `)` or `;`
//! - `[...]` is a comment and skipped verbatim, also inside a branch length
//! - `;` terminates the tree
//! - anything else accumulates into the pending node name
//!
//! Missing lengths fall back to [`ParseOptions::default_branch_length`];
//! present ones are multiplied by [`ParseOptions::length_scale`]. Negative
//! lengths are made positive with a warning.

use crate::config::ParseOptions;
use crate::errors::ParseError;
use crate::tree::{NodeId, Tree};
use log::warn;

/// Replaces characters reserved for internal bookkeeping.
pub fn sanitize_name(name: &str) -> String {
    name.replace(['?', '&'], "_")
}

/// Parses a single newick string terminated by `;`.
///
/// Characters after the terminating `;` are ignored, line breaks are dropped.
pub fn parse_newick(input: &str, options: &ParseOptions) -> Result<Tree, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut tree = Tree::with_root(options.default_branch_length);
    let mut current = tree.root();
    let mut pending = Pending::default();
    let mut chars = input.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '(' => {
                current = tree.add_child(current, options.default_branch_length);
            }
            ',' => {
                pending.flush(&mut tree, current, options)?;
                let parent = tree
                    .get(current)
                    .parent
                    .ok_or(ParseError::UnbalancedParentheses { position })?;
                current = tree.add_child(parent, options.default_branch_length);
            }
            ')' => {
                pending.flush(&mut tree, current, options)?;
                current = tree
                    .get(current)
                    .parent
                    .ok_or(ParseError::UnbalancedParentheses { position })?;
            }
            ':' => loop {
                match chars.peek() {
                    Some(&(_, ',' | ')' | ';')) => break,
                    Some(&(start, '[')) => {
                        chars.next();
                        if !chars.by_ref().any(|(_, c)| c == ']') {
                            return Err(ParseError::UnclosedComment { position: start });
                        }
                    }
                    Some(&(_, c)) => {
                        pending.length.push(c);
                        chars.next();
                    }
                    None => return Err(ParseError::MissingSemicolon),
                }
            },
            '[' => {
                if !chars.by_ref().any(|(_, c)| c == ']') {
                    return Err(ParseError::UnclosedComment { position });
                }
            }
            ';' => {
                if current != tree.root() {
                    return Err(ParseError::UnbalancedParentheses { position });
                }
                pending.flush(&mut tree, current, options)?;
                return Ok(tree);
            }
            '\n' | '\r' => {}
            other => pending.name.push(other),
        }
    }

    Err(ParseError::MissingSemicolon)
}

/// Parses one tree per line, keeping the input order.
///
/// A failing line does not affect the others; callers decide whether a
/// single error invalidates the whole batch.
pub fn parse_all<I, S>(lines: I, options: &ParseOptions) -> Vec<Result<Tree, ParseError>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| parse_newick(line.as_ref(), options))
        .collect()
}

/// Name and length tokens not yet attached to a node.
#[derive(Default)]
struct Pending {
    name: String,
    length: String,
}

impl Pending {
    fn flush(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        options: &ParseOptions,
    ) -> Result<(), ParseError> {
        if !self.name.is_empty() {
            tree.get_mut(node).name = Some(sanitize_name(&self.name));
            self.name.clear();
        }
        if !self.length.is_empty() {
            let token = self.length.trim();
            let raw: f64 = token.parse().map_err(|_| ParseError::InvalidBranchLength {
                token: token.to_string(),
            })?;
            let mut length = raw * options.length_scale;
            if length < 0.0 {
                warn!("Negative branch length in the input tree: {token} ; converting it to positive.");
                length = length.abs();
            }
            tree.get_mut(node).length = length;
            self.length.clear();
        }
        Ok(())
    }
}
