pub mod club;
pub mod market;
pub mod portfolio;
pub mod trading;
