//! Avatar URLs derived from a hash of the user id. Only constructs strings;
//! nothing here performs a fetch.

pub const AVATAR_BASE: &str = "http://gravatar.com/avatar";

/// Identicon URL for a user id, keyed by the MD5 hex digest of the id.
pub fn identicon_url(uid: &str) -> String {
    format!("{}/{:x}?d=identicon", AVATAR_BASE, md5::compute(uid))
}

/// Terminal stand-in for the avatar image: a short label plus a color slot
/// picked from the same digest, so a given id always renders the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarTag {
    pub label: String,
    pub color_slot: usize,
}

pub const COLOR_SLOTS: usize = 6;

pub fn terminal_tag(uid: &str) -> AvatarTag {
    let digest = md5::compute(uid);
    let label: String = uid.chars().take(2).collect::<String>().to_uppercase();
    let label = if label.is_empty() { "??".to_string() } else { label };
    AvatarTag {
        label,
        color_slot: digest.0[0] as usize % COLOR_SLOTS,
    }
}
