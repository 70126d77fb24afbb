pub mod face;
pub mod relationship;
pub mod speech;
pub mod transcode;
