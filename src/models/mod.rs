pub mod event;
pub mod match_state;
pub mod metadata;
pub mod notification;
pub mod observation;
pub mod status;
pub mod subscriber;
