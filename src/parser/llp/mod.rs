// src/parser/llp/mod.rs
//! LLP(1,1) item sets, built backwards (predecessor + closure) from the
//! end of the start rule.

pub mod generator;
pub mod item;

pub use generator::LlpGenerator;
pub use item::{Item, ItemSet};

use crate::{
    diagnostics::SourceLocation,
    parser::{
        grammar::{ProductionId, Terminal},
        ll::LlError,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlpError {
    #[error(
        "grammar is not LLP(1,1): pair ({x}, {y}) is claimed by '{first_rule}' and '{second_rule}'"
    )]
    PslsConflict {
        x: Terminal,
        y: Terminal,
        first: ProductionId,
        second: ProductionId,
        first_rule: String,
        second_rule: String,
        first_loc: SourceLocation,
        second_loc: SourceLocation,
    },
    #[error("more than {limit} LLP item sets; raise LLPGEN_MAX_ITEM_SETS")]
    TooManyItemSets { limit: usize },
    #[error("partial parse for pair ({x}, {y}) failed: {source}")]
    PartialParse {
        x: Terminal,
        y: Terminal,
        #[source]
        source: LlError,
    },
    #[error(transparent)]
    Ll(#[from] LlError),
}
