pub mod char_range;
pub mod cpu;
pub mod fsa;
pub mod grammar;
pub mod regex;
pub mod regex_parser;
pub mod tables;
