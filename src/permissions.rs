//! Role checks applied by handlers after authentication.
//!
//! | policy | reads | writes |
//! |---|---|---|
//! | admin-or-read-only (catalog, titles) | anyone | admin |
//! | admin-only (user management) | admin | admin |
//! | author-or-staff (reviews, comments) | anyone | create: any user; edit/delete: author, moderator, admin |
//!
//! Reads need no check at all; "anyone" routes simply don't extract a
//! [`CurrentUser`].

use crate::{error::AppError, middleware::auth::CurrentUser};

pub fn require_admin(user: &CurrentUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Editing or deleting a review or comment.
pub fn require_author_or_staff(user: &CurrentUser, author_id: i64) -> Result<(), AppError> {
    if user.id == author_id || user.is_moderator() || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}
