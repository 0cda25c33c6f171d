pub mod db;
pub mod records;
pub mod scoring;
pub mod settings;
