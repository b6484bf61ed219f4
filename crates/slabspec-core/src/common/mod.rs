pub mod constants;
pub mod molecules;
