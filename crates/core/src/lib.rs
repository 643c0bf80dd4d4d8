pub mod config;
pub mod error;
pub mod incentives;
pub mod money;
pub mod snapshot;

pub use config::AppConfig;
pub use error::{IncentivesError, IncentivesResult};
pub use incentives::IncentivesSnapshot;
pub use money::{MinorUnits, MoneyAmount};
