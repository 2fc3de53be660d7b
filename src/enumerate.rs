//! Message id enumeration across pages

use crate::error::{Error, Result};
use crate::mailbox::MailboxClient;
use crate::message::MessageRef;
use tracing::{debug, info, warn};

/// Result of walking the message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub ids: Vec<MessageRef>,
    /// Set when a page request failed and the list stopped early.
    pub incomplete: bool,
}

/// Collect message ids page by page.
///
/// Stops once `max_messages` ids are collected (when set and non-zero)
/// and truncates to exactly that many. A failed page request ends the
/// walk; whatever was collected before it is returned with
/// `incomplete` set.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the mailbox rejects the credentials.
pub async fn list_message_ids<M: MailboxClient>(
    client: &M,
    max_messages: Option<u32>,
) -> Result<Enumeration> {
    let cap = max_messages
        .filter(|&n| n > 0)
        .and_then(|n| usize::try_from(n).ok());

    let mut ids = Vec::new();
    let mut page_token: Option<String> = None;
    let mut incomplete = false;

    loop {
        let page = match client.list_messages(page_token.as_deref()).await {
            Ok(page) => page,
            Err(e @ Error::Auth(_)) => return Err(e),
            Err(e) => {
                warn!(
                    "Listing messages failed after {} ids, continuing with a partial list: {}",
                    ids.len(),
                    e
                );
                incomplete = true;
                break;
            }
        };

        debug!("Listed page with {} ids", page.ids.len());
        ids.extend(page.ids);

        if cap.is_some_and(|cap| ids.len() >= cap) {
            break;
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    if let Some(cap) = cap {
        ids.truncate(cap);
    }

    info!("Found {} messages", ids.len());
    Ok(Enumeration { ids, incomplete })
}
