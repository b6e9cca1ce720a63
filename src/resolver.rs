//! Redirect resolution: QR id to destination
//!
//! Resolution is read-only and never fails loudly. Unknown ids, empty or
//! archived destinations and storage errors all come back as
//! [`Resolution::NotFound`], so callers cannot tell them apart.

use crate::model::QrCode;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Send the visitor to this URL, unchanged
    Redirect(String),
    NotFound,
}

pub async fn resolve(store: &Store, id: &str) -> Resolution {
    if id.is_empty() {
        return Resolution::NotFound;
    }

    match store.get::<QrCode>(id).await {
        Ok(Some(qr)) => match qr.redirect_target() {
            Some(url) => Resolution::Redirect(url.to_string()),
            None => Resolution::NotFound,
        },
        Ok(None) => Resolution::NotFound,
        Err(err) => {
            tracing::warn!(qr_id = %id, error = %err, "lookup failed, answering not found");
            Resolution::NotFound
        }
    }
}
