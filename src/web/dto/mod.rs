pub mod account;
pub mod lessons;
pub mod parents;
