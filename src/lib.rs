pub mod app;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod inventory;
pub mod models;
pub mod nav;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod view;

pub use app::router;
pub use config::Config;
pub use session::Session;
pub use state::AppState;
pub use storage::Store;
