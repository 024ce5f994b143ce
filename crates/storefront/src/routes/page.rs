//! Data every full page needs for the shared layout.

use tower_sessions::Session;

use crate::flash::{self, FlashMessage};
use crate::middleware::auth::current_user;
use crate::models::CurrentUser;
use crate::services::Cart;

/// Navigation and flash data rendered by `base.html`.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// The logged-in user, if any.
    pub user: Option<CurrentUser>,
    /// Units in the buyer's cart (zero for everyone else).
    pub cart_count: u32,
    /// Flash messages, drained from the session.
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    /// Load the layout data and consume pending flash messages.
    pub async fn load(session: &Session) -> Self {
        let user = current_user(session).await;
        let cart_count = match &user {
            Some(user) if user.role.is_buyer() => Cart::load(session).await.count(),
            _ => 0,
        };

        Self {
            user,
            cart_count,
            messages: flash::take(session).await,
        }
    }

    #[must_use]
    pub fn is_vendor(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_vendor())
    }

    #[must_use]
    pub fn is_buyer(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_buyer())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::{Email, Role, UserId};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::session_keys;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(4),
            username: "sam".to_owned(),
            email: Email::parse("sam@example.com").expect("valid email"),
            role,
        }
    }

    #[tokio::test]
    async fn test_anonymous_page_has_no_cart() {
        let session = session();
        let page = PageContext::load(&session).await;
        assert!(page.user.is_none());
        assert_eq!(page.cart_count, 0);
        assert!(!page.is_buyer());
    }

    #[tokio::test]
    async fn test_messages_are_drained_once() {
        let session = session();
        flash::push(&session, FlashMessage::success("Cart updated.")).await;

        let first = PageContext::load(&session).await;
        assert_eq!(first.messages.len(), 1);
        let second = PageContext::load(&session).await;
        assert!(second.messages.is_empty());
    }

    #[tokio::test]
    async fn test_vendor_flags() {
        let session = session();
        session
            .insert(session_keys::CURRENT_USER, user(Role::Vendor))
            .await
            .expect("insert");
        let page = PageContext::load(&session).await;
        assert!(page.is_vendor());
        assert!(!page.is_buyer());
        assert_eq!(page.cart_count, 0);
    }
}
