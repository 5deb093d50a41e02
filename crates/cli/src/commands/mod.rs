pub mod audit;
pub mod ls;
pub mod photos;
pub mod records;
