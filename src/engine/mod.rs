pub mod detector;
pub mod dispatcher;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod fakes;
