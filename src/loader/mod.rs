pub mod demographics;
pub mod immigration;

pub use demographics::*;
pub use immigration::*;
