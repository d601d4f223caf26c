mod tracker;
mod versioned;

pub use tracker::BatchTracker;
pub use versioned::Versioned;
