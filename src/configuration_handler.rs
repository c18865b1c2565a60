use crate::configuration::Configuration;
use std::path::PathBuf;

/// Configuration backed by environment variables (loaded from `.env` in
/// main before this is read).
#[derive(Clone)]
pub struct EnvConfiguration;

impl Configuration for EnvConfiguration {
    fn port(&self) -> String {
        std::env::var("PORT").unwrap_or_else(|_| "8000".into())
    }

    fn database_path(&self) -> Option<PathBuf> {
        std::env::var("DATABASE_PATH").ok().map(PathBuf::from)
    }
}
