pub mod readings;
pub mod status;
