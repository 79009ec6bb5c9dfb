pub mod demographics;
pub mod immigration;
pub mod tables;

pub use demographics::*;
pub use immigration::*;
pub use tables::*;
