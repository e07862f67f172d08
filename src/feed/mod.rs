mod fetcher;
pub mod updater;

pub use fetcher::Api;
pub use updater::refresh;
