pub mod config;
pub mod daemon;
pub mod events;
pub mod plugin;

pub use config::Config;
pub use events::Event;
pub use plugin::Plugin;
