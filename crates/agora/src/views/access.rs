//! Authorization checks for what the views offer.
//!
//! These only decide what is shown; the server decides what is allowed.

use crate::api::UserId;
use crate::session::Session;

/// Whether the create-post and create-comment forms are offered.
pub fn can_create(session: &Session) -> bool {
    session.is_logged_in()
}

/// Whether edit/delete is offered on a resource owned by `owner`.
///
/// Resources without a known owner are never modifiable.
pub fn can_modify(session: &Session, owner: Option<UserId>) -> bool {
    match (session.user_id(), owner) {
        (Some(user_id), Some(owner)) => user_id == owner,
        _ => false,
    }
}
