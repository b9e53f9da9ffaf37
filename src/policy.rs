//! Who may do what. Pure decision logic; callers look the resource up first
//! (so a missing resource is a 404 before it is ever a 403) and mutate only
//! after `authorize` returns `Ok`.

use crate::db::models::Role;
use crate::error::AppError;

/// The authenticated caller as far as the policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal<'a> {
    pub id: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Listing published posts, reading a post or its comments.
    Read,
    /// Bumping a post's view counter.
    RecordView,
    /// Commenting, liking, bookmarking, editing one's own profile, uploading.
    Engage,
    /// Creating a post.
    Author,
    /// Updating, deleting, hiding or unhiding a resource owned by `owner_id`.
    Manage { owner_id: &'a str },
    /// Admin-only surfaces: account management, moderation queues, analytics.
    Administer,
}

impl Action<'_> {
    fn is_anonymous(&self) -> bool {
        matches!(self, Action::Read | Action::RecordView)
    }
}

pub fn authorize(principal: Option<Principal<'_>>, action: Action<'_>) -> Result<(), AppError> {
    if action.is_anonymous() {
        return Ok(());
    }

    let principal = principal.ok_or(AppError::Unauthenticated)?;

    if principal.role == Role::Admin {
        return Ok(());
    }

    match action {
        Action::Read | Action::RecordView | Action::Engage => Ok(()),
        Action::Manage { owner_id } if owner_id == principal.id => Ok(()),
        Action::Manage { .. } => Err(AppError::forbidden(
            "Not authorized to modify this resource",
        )),
        Action::Author if principal.role == Role::Writer => Ok(()),
        Action::Author => Err(AppError::forbidden(
            "Access denied. Writer or admin role required.",
        )),
        Action::Administer => Err(AppError::forbidden(
            "Access denied. Admin role required.",
        )),
    }
}

/// Drafts and hidden posts are visible only to their owner and admins.
pub fn can_see(principal: Option<Principal<'_>>, owner_id: &str, public: bool) -> bool {
    public || principal.is_some_and(|p| p.role == Role::Admin || p.id == owner_id)
}
