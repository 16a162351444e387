mod matrix;
mod resolver;

pub use matrix::{aggregate_rows, ModuleGrant, PermissionMatrix, PermissionRow, RubricGrant};
pub use resolver::PermissionResolver;
