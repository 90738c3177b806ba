pub mod toml_loader;

pub use toml_loader::{load_catalog_file, load_catalog_folder, load_persona_file, parse_catalog};
