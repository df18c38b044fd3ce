use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A single microblog post as observed through fetch responses. Immutable
/// once received; the server owns its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub msg: String,
    pub uid: String,
    pub txtime: f64,
    pub rxtime: f64,
    pub postid: i64,
    pub perms: i64,
    pub hashid: Option<String>,
}

impl Post {
    /// Key used to suppress re-rendering. Identity, not content: the same
    /// text posted twice by different ids still renders twice.
    pub fn dedup_key(&self) -> String {
        match &self.hashid {
            Some(hashid) => hashid.clone(),
            None => self.content_hash(),
        }
    }

    /// SHA-1 hex over uid + msg + txtime + postid, the hash id scheme the
    /// service uses. Also the fallback key for server variants that omit
    /// hashid.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.uid.as_bytes());
        hasher.update(self.msg.as_bytes());
        hasher.update(canonical_time(self.txtime).as_bytes());
        hasher.update(format!("{}", self.postid).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the hash id reported by the server matches the content it
    /// accompanies. Always true for posts without a hash id.
    pub fn hashid_matches(&self) -> bool {
        match &self.hashid {
            Some(hashid) => *hashid == self.content_hash(),
            None => true,
        }
    }

    /// Send time. Wire times are epoch seconds.
    pub fn sent_at(&self) -> DateTime<Utc> {
        let secs = self.txtime.trunc() as i64;
        let nanos = (self.txtime.fract() * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or_default()
    }
}

/// Times stringify the way the service renders them: integral floats keep
/// a trailing `.0`.
fn canonical_time(time: f64) -> String {
    if time.fract() == 0.0 {
        format!("{:.1}", time)
    } else {
        format!("{}", time)
    }
}

/// Who may see a post, chosen at submission time. Opaque to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Everyone,
    FriendsTwoHop,
    FriendsOneHop,
}

impl Visibility {
    /// Permission code sent to the server. Both friend scopes share code 1;
    /// the hop distance is resolved server-side.
    pub fn wire_code(&self) -> i64 {
        match self {
            Visibility::Everyone => 2,
            Visibility::FriendsTwoHop | Visibility::FriendsOneHop => 1,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Visibility::Everyone => "Everyone",
            Visibility::FriendsTwoHop => "2-hop Friends",
            Visibility::FriendsOneHop => "1-hop Friends",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Visibility::Everyone => Visibility::FriendsTwoHop,
            Visibility::FriendsTwoHop => Visibility::FriendsOneHop,
            Visibility::FriendsOneHop => Visibility::Everyone,
        }
    }
}

/// Post as serialized by the full server: a 7-tuple of
/// (msg, uid, txtime, rxtime, postid, perms, hashid).
#[derive(Debug, Clone, Deserialize)]
pub struct PostTuple(
    pub String,
    pub String,
    pub f64,
    pub f64,
    pub i64,
    pub i64,
    pub String,
);

impl From<PostTuple> for Post {
    fn from(tuple: PostTuple) -> Self {
        let PostTuple(msg, uid, txtime, rxtime, postid, perms, hashid) = tuple;
        Post {
            msg,
            uid,
            txtime,
            rxtime,
            postid,
            perms,
            hashid: Some(hashid),
        }
    }
}

/// Post as serialized by the reduced server: uid and message only.
#[derive(Debug, Clone, Deserialize)]
pub struct BarePost {
    pub uid: String,
    pub msg: String,
}

impl From<BarePost> for Post {
    fn from(bare: BarePost) -> Self {
        Post {
            msg: bare.msg,
            uid: bare.uid,
            txtime: 0.0,
            rxtime: 0.0,
            postid: 0,
            perms: 0,
            hashid: None,
        }
    }
}

/// The two response shapes observed across server versions, one explicit
/// schema per version rather than duck-typing at the access site.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StateResponse {
    Full { posts: Vec<PostTuple> },
    Bare(Vec<BarePost>),
}

impl StateResponse {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            StateResponse::Full { posts } => posts.into_iter().map(Post::from).collect(),
            StateResponse::Bare(posts) => posts.into_iter().map(Post::from).collect(),
        }
    }
}
