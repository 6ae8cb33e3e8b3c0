// src/lexer/regex.rs

use super::{
    char_range::CharRange,
    fsa::{FiniteStateAutomaton, StateIndex},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

/// Regex AST over bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexNode {
    Sequence(Vec<RegexNode>),
    Alternation(Vec<RegexNode>),
    Repeat {
        kind: RepeatKind,
        child: Box<RegexNode>,
    },
    CharSet {
        ranges: Vec<CharRange>,
        inverted: bool,
    },
    Char(u8),
    Empty,
}

impl RegexNode {
    /// Whether the node can match the empty string.
    pub fn matches_empty(&self) -> bool {
        match self {
            RegexNode::Sequence(children) => children.iter().all(RegexNode::matches_empty),
            RegexNode::Alternation(children) => {
                children.is_empty() || children.iter().any(RegexNode::matches_empty)
            }
            RegexNode::Repeat { kind, child } => match kind {
                RepeatKind::ZeroOrOne | RepeatKind::ZeroOrMore => true,
                RepeatKind::OneOrMore => child.matches_empty(),
            },
            RegexNode::CharSet { .. } | RegexNode::Char(_) => false,
            RegexNode::Empty => true,
        }
    }

    /// Adds states and edges for this node starting at `start` and returns
    /// the state reached after a match.
    pub fn compile(&self, fsa: &mut FiniteStateAutomaton, start: StateIndex) -> StateIndex {
        match self {
            RegexNode::Sequence(children) => children
                .iter()
                .fold(start, |state, child| child.compile(fsa, state)),
            RegexNode::Alternation(children) => {
                let end = fsa.add_state();
                if children.is_empty() {
                    fsa.add_epsilon_transition(start, end);
                }
                for child in children {
                    let branch = fsa.add_state();
                    fsa.add_epsilon_transition(start, branch);
                    let branch_end = child.compile(fsa, branch);
                    fsa.add_epsilon_transition(branch_end, end);
                }
                end
            }
            RegexNode::Repeat { kind, child } => {
                let body = fsa.add_state();
                fsa.add_epsilon_transition(start, body);
                let body_end = child.compile(fsa, body);
                let end = fsa.add_state();
                match kind {
                    RepeatKind::ZeroOrOne => {
                        fsa.add_epsilon_transition(body_end, end);
                        fsa.add_epsilon_transition(start, end);
                    }
                    RepeatKind::ZeroOrMore => {
                        fsa.add_epsilon_transition(body_end, body);
                        fsa.add_epsilon_transition(body, end);
                    }
                    RepeatKind::OneOrMore => {
                        fsa.add_epsilon_transition(body_end, body);
                        fsa.add_epsilon_transition(body_end, end);
                    }
                }
                end
            }
            RegexNode::CharSet { ranges, inverted } => {
                let end = fsa.add_state();
                for b in 0u8..=255 {
                    if ranges.iter().any(|r| r.contains(b)) != *inverted {
                        fsa.add_transition(start, Some(b), end);
                    }
                }
                end
            }
            RegexNode::Char(c) => {
                let end = fsa.add_state();
                fsa.add_transition(start, Some(*c), end);
                end
            }
            RegexNode::Empty => start,
        }
    }
}
