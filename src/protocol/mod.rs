pub mod codec;
pub mod types;

pub use codec::{decode, encode_request};
pub use types::{ClientRequest, Message};
