pub mod feed_client;
pub mod match_state_store;
pub mod metadata_lookup;
pub mod push_service;
pub mod subscriber_directory;
