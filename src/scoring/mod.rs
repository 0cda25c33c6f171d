pub mod address;
pub mod deriver;
pub mod tier;
