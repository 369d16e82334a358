pub mod football_data;
pub mod models;
pub mod provider;
pub mod simulator;

pub use football_data::FootballDataProvider;
pub use models::{Importance, Match, MatchStats, OddsQuote, Outcome};
pub use provider::{MatchAnalyst, MatchProvider};
pub use simulator::FormTableAnalyst;
