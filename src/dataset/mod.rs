pub mod annotation_csv;
pub mod tree_dataset;
