/// Turns bare URLs, www-style hosts, TLD-suffixed domains, and @-containing
/// tokens in a message into link segments. Pure transform; no network I/O.
///
/// Tokens are split on whitespace and rejoined with single spaces, so the
/// original inter-token whitespace is not preserved. Rules are applied per
/// token, first match wins. Note that @-containing tokens get an `http://`
/// href rather than `mailto:`, matching the deployed web client.

const TLD_MARKERS: [&str; 5] = [".com", ".net", ".edu", ".org", ".gov"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Link { href: String, text: String },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(text) => text,
            Segment::Link { text, .. } => text,
        }
    }
}

pub fn linkify(msg: &str) -> Vec<Segment> {
    msg.split_whitespace().map(classify_token).collect()
}

/// The message with matched tokens replaced by anchor markup opening in a
/// new browsing context.
pub fn linkify_html(msg: &str) -> String {
    let rendered: Vec<String> = linkify(msg)
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => text,
            Segment::Link { href, text } => {
                format!("<a target=\"_blank\" href=\"{}\">{}</a>", href, text)
            }
        })
        .collect();
    rendered.join(" ")
}

fn classify_token(token: &str) -> Segment {
    if token.starts_with("http://") {
        link(token.to_string(), token)
    } else if token.starts_with("www.") {
        link(format!("http://{}", token), token)
    } else if TLD_MARKERS.iter().any(|marker| token.contains(marker)) {
        link(format!("http://{}", token), token)
    } else if token.contains('@') {
        // kept as http://, not mailto:, for parity with the web client
        link(format!("http://{}", token), token)
    } else {
        Segment::Plain(token.to_string())
    }
}

fn link(href: String, text: &str) -> Segment {
    Segment::Link {
        href,
        text: text.to_string(),
    }
}
