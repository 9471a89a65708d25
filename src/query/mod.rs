//! Statement building for scans, searches and ad hoc queries

pub mod builder;
pub mod filter;
pub mod guard;
pub mod literal;
pub mod pagination;

pub use builder::{CompiledFilters, QueryBuilder, ScanPlan, SearchPlan, Statement, TextBinding};
pub use filter::{FieldKind, FilterSet, SearchField, SearchFields};
pub use guard::ensure_select;
pub use literal::encode_hex_literal;
pub use pagination::{PageRequest, Pagination};
