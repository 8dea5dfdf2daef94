//! Ordered lookup structures shared by every store index

pub mod avl;
pub mod bucket;

pub use avl::OrderedIndex;
pub use bucket::Bucket;
