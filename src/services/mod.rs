pub mod connection;
pub mod dispatch;
pub mod keep_alive;
pub mod retry;
pub mod transport;
pub mod view;
