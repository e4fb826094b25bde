pub mod capabilities;
pub mod models;
pub mod settings;
