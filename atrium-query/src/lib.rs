//! Atrium Query - Filter, Search, and Pagination Engine
//!
//! Three ways to narrow a listing, all composing into one predicate tree:
//!
//! - **filter**: typed filter structs bind declared specs to values
//!   ([`filter::apply_filters`])
//! - **search**: a runtime mini-language of `field,op,value` clauses
//!   chained with `|` and `&` ([`search::apply_search`])
//! - **find**: one value broadcast across every filtered field of the
//!   entity ([`find::apply_find`])
//!
//! [`pagination::Paginator`] drives all three from a [`pagination::PageRequest`]
//! and wraps the result in a counted page.

pub mod filter;
pub mod find;
pub mod pagination;
pub mod search;

pub use filter::{apply_filters, FilterBinding, Filterable};
pub use find::{apply_find, FindOperator};
pub use pagination::{Page, PageRequest, Paginator};
pub use search::apply_search;
