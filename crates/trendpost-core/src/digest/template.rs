use std::fmt::Write;

use htmlescape::encode_minimal;

use crate::subscriber::{Subscriber, SubscriberEmail};
use crate::trending::{FeedKind, TrendingFeed};

/// Shared digest HTML, composed once per tick.
///
/// The fragment is stored split around the unsubscribe token slot, so rendering for a
/// subscriber inserts exactly one token and item text can never open a second slot.
#[derive(Debug, Clone)]
pub struct DigestTemplate {
    head: String,
    tail: String,
}

/// One personalised digest, ready for delivery
#[derive(Debug, Clone)]
pub struct DigestMessage {
    pub email: SubscriberEmail,
    pub subject: String,
    pub content: String,
}

fn write_section(html: &mut String, feed: &TrendingFeed) {
    let _ = write!(html, "\n      <h2>{}</h2>\n      <ul>\n", feed.kind.heading());

    for item in &feed.items {
        let _ = write!(
            html,
            "        <li><a href=\"{}\">{}</a>",
            encode_minimal(&item.url),
            encode_minimal(&item.name)
        );
        if feed.kind == FeedKind::Repositories {
            if let Some(ref stars) = item.metric {
                let _ = write!(html, " ⭐ {}", encode_minimal(stars));
            }
        }
        html.push_str("</li>\n");
    }

    html.push_str("      </ul>\n");
}

impl DigestTemplate {
    /// Build the shared fragment from both feeds
    pub fn compose(papers: &TrendingFeed, repos: &TrendingFeed, unsubscribe_base_url: &str) -> Self {
        let mut head = String::new();
        write_section(&mut head, papers);
        write_section(&mut head, repos);

        let base = unsubscribe_base_url.trim_end_matches('/');
        let _ = write!(
            head,
            "\n      <p style=\"color:gray;\">\n        \
             You are receiving this email because you subscribed to Daily AI Updates.<br/>\n        \
             <a href=\"{}/",
            encode_minimal(base)
        );

        let tail = "\">Unsubscribe</a>\n      </p>\n".to_string();

        Self { head, tail }
    }

    /// Render the fragment with `token` in the unsubscribe link
    pub fn render(&self, token: &str) -> String {
        let token = urlencoding::encode(token);
        let mut html = String::with_capacity(self.head.len() + token.len() + self.tail.len());
        html.push_str(&self.head);
        html.push_str(&token);
        html.push_str(&self.tail);
        html
    }

    /// Personalise the digest for one subscriber
    pub fn message_for(&self, subscriber: &Subscriber, subject: &str) -> DigestMessage {
        DigestMessage {
            email: subscriber.email.clone(),
            subject: subject.to_string(),
            content: self.render(&subscriber.unsubscribe_token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trending::TrendingItem;

    fn item(name: &str, url: &str, metric: Option<&str>) -> TrendingItem {
        TrendingItem {
            identifier: None,
            name: name.to_string(),
            url: url.to_string(),
            author: None,
            description: None,
            metric: metric.map(str::to_string),
        }
    }

    fn feeds() -> (TrendingFeed, TrendingFeed) {
        (
            TrendingFeed::new(
                FeedKind::Papers,
                vec![item("llama-3", "https://huggingface.co/meta/llama-3", Some("900"))],
                5,
            ),
            TrendingFeed::new(
                FeedKind::Repositories,
                vec![item("openai/whisper", "https://github.com/openai/whisper", Some("37000"))],
                5,
            ),
        )
    }

    #[test]
    fn test_render_lists_items_and_single_unsubscribe_link() {
        let (papers, repos) = feeds();
        let template = DigestTemplate::compose(&papers, &repos, "http://localhost:4000/unsubscribe/");

        let html = template.render("A1");

        assert!(html.contains(r#"<a href="https://huggingface.co/meta/llama-3">llama-3</a>"#));
        assert!(html.contains(r#"<a href="https://github.com/openai/whisper">openai/whisper</a> ⭐ 37000"#));
        assert_eq!(html.matches("/unsubscribe/").count(), 1);
        assert!(html.contains(r#"href="http://localhost:4000/unsubscribe/A1">Unsubscribe</a>"#));
        // Paper metrics are not shown
        assert!(!html.contains("900"));
    }

    #[test]
    fn test_item_text_is_escaped_and_cannot_add_token_slots() {
        let papers = TrendingFeed::new(
            FeedKind::Papers,
            vec![item("<script>{{TOKEN}}</script>", "https://x.test/?a=1&b=\"2\"", None)],
            5,
        );
        let repos = TrendingFeed::new(FeedKind::Repositories, vec![], 5);
        let template = DigestTemplate::compose(&papers, &repos, "https://news.test/unsubscribe");

        let html = template.render("B2");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;{{TOKEN}}&lt;/script&gt;"));
        assert_eq!(html.matches("B2").count(), 1);
    }

    #[test]
    fn test_tokens_do_not_leak_between_renders() {
        let (papers, repos) = feeds();
        let template = DigestTemplate::compose(&papers, &repos, "https://news.test/unsubscribe");

        let a = template.render("A1");
        let b = template.render("B2");

        assert!(a.contains("/unsubscribe/A1\"") && !a.contains("B2"));
        assert!(b.contains("/unsubscribe/B2\"") && !b.contains("A1"));
    }

    #[test]
    fn test_token_is_url_encoded() {
        let (papers, repos) = feeds();
        let template = DigestTemplate::compose(&papers, &repos, "https://news.test/unsubscribe");

        let html = template.render("a/b c");
        assert!(html.contains("/unsubscribe/a%2Fb%20c\""));
    }
}
