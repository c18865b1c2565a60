use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    /// `None` means an in-memory ledger (useful for local development).
    fn database_path(&self) -> Option<PathBuf>;
}
