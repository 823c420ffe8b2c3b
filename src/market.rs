pub mod generator;
pub mod history;

pub use generator::PriceGenerator;
pub use history::CandleHistory;
