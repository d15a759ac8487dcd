// acc2omp: OpenACC to OpenMP lowering engine
//
// Library root. Front end (lexer, parser), analyses (resolve through
// reduction), OpenMP synthesis (omp, lower) and output (pprint, dump).

pub mod ast;
pub mod check;
pub mod clause;
pub mod config;
pub mod data_attr;
pub mod diag;
pub mod dump;
pub mod id;
pub mod lexer;
pub mod loop_count;
pub mod lower;
pub mod omp;
pub mod parser;
pub mod partition;
pub mod pass;
pub mod pipeline;
pub mod pprint;
pub mod reduction;
pub mod resolve;
pub mod visit;
