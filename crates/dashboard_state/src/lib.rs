//! Dashboard state and the coordinators that keep it in sync with the
//! price, weather, news and alert feeds.

pub mod alerts;
pub mod crypto;
pub mod dashboard;
pub mod gate;
pub mod generation;
pub mod news;
pub mod preferences;
pub mod store;
pub mod watchlist;
pub mod weather;

#[cfg(test)]
mod testing;

pub use alerts::{AlertManager, AlertSettings};
pub use crypto::{CryptoCoordinator, PollGuard};
pub use dashboard::Dashboard;
pub use gate::SourceGate;
pub use generation::Outcome;
pub use news::NewsCoordinator;
pub use preferences::FavoriteSet;
pub use store::{DashboardState, StateHandle};
pub use watchlist::{Watchlist, WatchlistCoordinator};
pub use weather::WeatherCoordinator;
