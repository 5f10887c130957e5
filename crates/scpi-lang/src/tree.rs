//! Abbreviation-aware command tree.
//!
//! Canonical commands such as `SYSTem:ERRor:COUNt?` are decomposed into their
//! required stems (`SYST`, `ERR`, `COUN?`) and inserted level by level. A
//! request header matches a node when, ignoring ASCII case, the node's stem is
//! a prefix of the header and both agree on query polarity. The first match
//! at each level wins, so dictionaries list longer shared prefixes first.

use thiserror::Error;

use crate::preparse::{SubCommand, canonical_words};

/// Errors detected while building a tree from a dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeBuildError {
    /// The canonical command decomposed to nothing usable.
    #[error("command '{command}' has no required stem")]
    EmptyCommand {
        /// Offending canonical command.
        command: String,
    },
    /// Two dictionary entries terminate at the same path.
    #[error("command '{command}' is already bound to a handler")]
    DuplicateCommand {
        /// Canonical command that was inserted twice.
        command: String,
    },
}

#[derive(Debug, Clone)]
struct CommandNode<H> {
    sub_command: Vec<u8>,
    branch: Vec<CommandNode<H>>,
    handler: Option<H>,
}

impl<H> CommandNode<H> {
    fn new(sub_command: Vec<u8>) -> Self {
        Self {
            sub_command,
            branch: Vec::new(),
            handler: None,
        }
    }

    fn matches(&self, head: &[u8]) -> bool {
        let (stem, is_query) = split_query(&self.sub_command);
        let (head_stem, head_is_query) = split_query(head);
        is_query == head_is_query
            && head_stem
                .get(..stem.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(stem))
    }
}

fn split_query(word: &[u8]) -> (&[u8], bool) {
    match word.strip_suffix(b"?") {
        Some(stem) => (stem, true),
        None => (word, false),
    }
}

/// Result of a successful tree search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMatch<'a, H> {
    /// Handler bound to the matched command.
    pub handler: H,
    /// Raw parameter string following the matched header.
    pub parameters: &'a [u8],
}

/// Immutable-after-build search tree keyed on required command stems.
#[derive(Debug, Clone)]
pub struct CommandTree<H> {
    root: Vec<CommandNode<H>>,
}

impl<H> Default for CommandTree<H> {
    fn default() -> Self {
        Self { root: Vec::new() }
    }
}

impl<H: Copy> CommandTree<H> {
    /// Builds a tree from `(canonical command, handler)` entries.
    ///
    /// # Errors
    ///
    /// Returns [`TreeBuildError::DuplicateCommand`] when two entries terminate
    /// at the same path and [`TreeBuildError::EmptyCommand`] when an entry has
    /// no required stem.
    pub fn build<'d, I>(dictionary: I) -> Result<Self, TreeBuildError>
    where
        I: IntoIterator<Item = &'d (&'static str, H)>,
        H: 'd,
    {
        let mut tree = Self::default();
        for (command, handler) in dictionary {
            tree.insert(command, *handler)?;
        }
        Ok(tree)
    }

    /// Inserts a single canonical command.
    ///
    /// # Errors
    ///
    /// See [`CommandTree::build`].
    pub fn insert(&mut self, command: &str, handler: H) -> Result<(), TreeBuildError> {
        let words = canonical_words(command);
        let Some((last, path)) = words.split_last() else {
            return Err(TreeBuildError::EmptyCommand {
                command: command.to_owned(),
            });
        };
        if words.iter().any(Vec::is_empty) {
            return Err(TreeBuildError::EmptyCommand {
                command: command.to_owned(),
            });
        }

        let mut level = &mut self.root;
        for word in path {
            level = &mut child_for(level, word).branch;
        }
        let terminal = child_for(level, last);
        if terminal.handler.is_some() {
            return Err(TreeBuildError::DuplicateCommand {
                command: command.to_owned(),
            });
        }
        terminal.handler = Some(handler);
        Ok(())
    }

    /// Walks the tree in lockstep with the pre-parsed request.
    ///
    /// Returns `None` when a level has no matching child or when the tokens
    /// run out before a handler is reached.
    #[must_use]
    pub fn search<'a>(&self, tokens: &[SubCommand<'a>]) -> Option<CommandMatch<'a, H>> {
        let mut level = &self.root;
        for token in tokens {
            let node = level.iter().find(|node| node.matches(token.head()))?;
            if let Some(handler) = node.handler {
                return Some(CommandMatch {
                    handler,
                    parameters: token.tail(),
                });
            }
            level = &node.branch;
        }
        None
    }

    /// Returns true when the tree has no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

#[expect(
    clippy::indexing_slicing,
    reason = "index comes from position() or from the node just pushed"
)]
fn child_for<'t, H>(level: &'t mut Vec<CommandNode<H>>, word: &[u8]) -> &'t mut CommandNode<H> {
    let index = match level.iter().position(|node| node.sub_command == word) {
        Some(index) => index,
        None => {
            level.push(CommandNode::new(word.to_vec()));
            level.len() - 1
        }
    };
    &mut level[index]
}
