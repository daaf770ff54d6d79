pub mod assumptions;
pub mod break_even;
pub mod model;
pub mod occupancy;
pub mod payback;
pub mod projection;
pub mod returns;
