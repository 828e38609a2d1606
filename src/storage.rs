pub mod catalog;
pub use catalog::{Catalog, Dataset, LoadError, SaveError};
