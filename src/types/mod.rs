pub mod commitment;
pub mod error;
pub mod fri;
pub mod poly;

pub use commitment::*;
pub use error::*;
pub use fri::*;
pub use poly::LinePoly;
