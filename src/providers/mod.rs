pub mod cbr;
pub mod nbu;
pub mod util;

pub use cbr::CbrProvider;
pub use nbu::NbuProvider;
