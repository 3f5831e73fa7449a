use crate::types::{PushAction, PushItem};

/// Map a push body to a host action.
///
/// Matching is a case-insensitive prefix test; `unlock` wins over `ignore`.
pub fn classify(item: &PushItem) -> Option<PushAction> {
    let body = item.body.as_deref()?.to_lowercase();
    if body.starts_with("unlock") {
        Some(PushAction::Unlock)
    } else if body.starts_with("ignore") {
        Some(PushAction::Ignore)
    } else {
        None
    }
}
