// src/parser/mod.rs
pub mod grammar;
pub mod grammar_parser;
pub mod ll;
pub mod llp;
pub mod tables;
pub mod terminal_sets;
pub mod test_parser;

use grammar::Grammar;
use ll::LlTable;
use llp::{ItemSet, LlpError, LlpGenerator};
use tables::{LlpTable, PslsTable};
use terminal_sets::TerminalSetFunctions;

/// Everything derived from one grammar, in construction order.
#[derive(Debug, Clone)]
pub struct ParseTables {
    pub sets: TerminalSetFunctions,
    pub ll: LlTable,
    pub item_sets: Vec<ItemSet>,
    pub psls: PslsTable,
    pub llp: LlpTable,
}

/// Terminal sets, LL(1) table, item sets, PSLS, then the LLP table. The
/// LL(1) table comes first so grammars it rejects (left recursion among
/// them) never reach the item-set construction.
pub fn build_parse_tables(grammar: &Grammar, max_item_sets: usize) -> Result<ParseTables, LlpError> {
    let sets = TerminalSetFunctions::new(grammar);
    let ll = LlTable::build(grammar, &sets)?;
    let generator = LlpGenerator::new(grammar, &sets);
    let item_sets = generator.build_automaton(max_item_sets)?;
    let psls = generator.extract_psls(&item_sets)?;
    let llp = LlpTable::build(grammar, &ll, &psls)?;
    Ok(ParseTables {
        sets,
        ll,
        item_sets,
        psls,
        llp,
    })
}
