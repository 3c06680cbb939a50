pub mod ops_check;
pub mod ops_reconcile;
pub mod ops_setup;
pub mod ops_tree;
pub mod report;
