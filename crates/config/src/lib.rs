// Configuration loading

pub mod settings;
pub mod view_store;

pub use settings::Settings;
pub use view_store::JsonFileStore;
