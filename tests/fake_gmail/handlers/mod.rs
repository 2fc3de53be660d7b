//! Endpoint handlers for the fake Gmail server.
//!
//! Each handler lives in its own module, takes the parsed request and
//! a mailbox snapshot, and returns the JSON response.

mod attachment;
mod list;
mod message;
mod token;

pub use attachment::handle_attachment;
pub use list::handle_list;
pub use message::handle_message;
pub use token::handle_token;

use base64::prelude::*;

/// Gmail encodes bodies as unpadded base64url.
fn encode(data: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}
