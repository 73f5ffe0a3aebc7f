mod loader;
mod types;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader};
