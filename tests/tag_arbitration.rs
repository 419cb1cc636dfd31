//! Incoming tag arbitration and outgoing tag visibility.

mod common;

use common::TestServer;
use slircd_switchboard::bootstrap::CORE_MESSAGE_TAGS;
use slircd_switchboard::event::Recipient;
use slircd_switchboard::message::{Message, TagData, TagMap};
use slircd_switchboard::registry::{Component, Decision};
use slircd_switchboard::serialize::ParseOutput;
use slircd_switchboard::state::Connection;
use slircd_switchboard::tags::{TAG_PROVIDER_EVENT, TagProvider, TagProviderRef};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers a fixed decision for one tag name and counts how often it was
/// asked.
struct Voter {
    tag: &'static str,
    answer: Decision,
    asked: AtomicUsize,
}

impl Voter {
    fn new(tag: &'static str, answer: Decision) -> Arc<Self> {
        Arc::new(Self {
            tag,
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl TagProvider for Voter {
    fn on_process_tag(&self, _sender: &Connection, name: &str, _value: &mut String) -> Decision {
        if name != self.tag {
            return Decision::Passthru;
        }
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }

    fn should_send_tag(&self, _recipient: &Recipient<'_>, _tag: &TagData) -> bool {
        true
    }
}

fn subscribe(server: &TestServer, owner: &Arc<Component>, identity: &str, priority: i32, provider: Arc<dyn TagProvider>) {
    server
        .hub()
        .subscribe::<dyn TagProvider>(TAG_PROVIDER_EVENT, owner, identity, priority, provider)
        .unwrap();
}

fn parse(conn: &Connection, line: &str) -> ParseOutput {
    conn.serializer().unwrap().parse(conn, line).unwrap()
}

#[test]
fn test_first_non_passthru_answer_wins() {
    let server = TestServer::new();
    let owner = server.component("m_vendor");
    let silent = Voter::new("example.com/x", Decision::Passthru);
    let deny = Voter::new("example.com/x", Decision::Deny);
    let allow = Voter::new("example.com/x", Decision::Allow);
    subscribe(&server, &owner, "y", 10, silent.clone());
    subscribe(&server, &owner, "x", 20, deny.clone());
    subscribe(&server, &owner, "z", 30, allow.clone());

    let alice = server.client("alice");
    let out = parse(&alice, "@example.com/x=1 PRIVMSG #c :hi");
    assert!(!out.tags.contains("example.com/x"));
    assert_eq!((silent.asked(), deny.asked(), allow.asked()), (1, 1, 0));
}

#[test]
fn test_accepted_tag_is_bound_to_its_acceptor() {
    let server = TestServer::new();
    let owner = server.component("m_vendor");
    let allow = Voter::new("example.com/x", Decision::Allow);
    subscribe(&server, &owner, "x", 10, allow);

    let alice = server.client("alice");
    let out = parse(&alice, "@example.com/x=1 PRIVMSG #c :hi");
    let data = out.tags.get("example.com/x").unwrap();
    assert_eq!(data.value, "1");
    assert_eq!(data.provider.identity(), "x");
    assert_eq!(data.provider.owner().name(), "m_vendor");
}

#[test]
fn test_unclaimed_tags_are_dropped() {
    let server = TestServer::new();
    let alice = server.client("alice");
    let out = parse(&alice, "@example.org/unknown=1;time=2000-01-01T00:00:00.000Z PRIVMSG #c :hi");
    assert!(out.tags.is_empty());
    assert_eq!(out.params, vec!["#c", "hi"]);
}

#[test]
fn test_empty_tag_name_is_rejected() {
    let server = TestServer::new();
    let owner = server.component("m_greedy");
    let allow_all = Voter::new("", Decision::Allow);
    subscribe(&server, &owner, "greedy", 10, allow_all.clone());

    let alice = server.client("alice");
    let mut tags = TagMap::new();
    assert!(!server.arbiter().process_incoming(&alice, "", "1".to_string(), &mut tags));
    assert!(tags.is_empty());
    assert_eq!(allow_all.asked(), 0);
}

#[test]
fn test_duplicate_incoming_tag_keeps_the_first() {
    let server = TestServer::new();
    let owner = server.component("m_vendor");
    subscribe(&server, &owner, "x", 10, Voter::new("example.com/x", Decision::Allow));

    let alice = server.client("alice");
    let out = parse(&alice, "@example.com/x=first;example.com/x=second PING x");
    assert_eq!(out.tags.len(), 1);
    assert_eq!(out.tags.get("example.com/x").unwrap().value, "first");
}

#[test]
fn test_provider_may_rewrite_the_value() {
    struct Shout;

    impl TagProvider for Shout {
        fn on_process_tag(&self, _sender: &Connection, name: &str, value: &mut String) -> Decision {
            if name != "+example/shout" {
                return Decision::Passthru;
            }
            *value = value.to_uppercase();
            Decision::Allow
        }

        fn should_send_tag(&self, _recipient: &Recipient<'_>, _tag: &TagData) -> bool {
            true
        }
    }

    let server = TestServer::new();
    let owner = server.component("m_shout");
    subscribe(&server, &owner, "shout", 10, Arc::new(Shout));

    let alice = server.client("alice");
    let out = parse(&alice, "@+example/shout=quiet\\splease TAGMSG #c");
    assert_eq!(out.tags.get("+example/shout").unwrap().value, "QUIET PLEASE");
}

#[test]
fn test_client_only_tags_follow_message_tags() {
    let server = TestServer::new();
    let plain = server.client("plain");
    let tagged = server.client_with("tagged", "message-tags");

    assert!(parse(&plain, "@+draft/react=x TAGMSG #c").tags.is_empty());

    let out = parse(&tagged, "@+draft/react=x;+draft/reply=42 TAGMSG #c");
    assert_eq!(out.tags.len(), 2);
    let keys: Vec<&str> = out.tags.iter().map(|e| e.name()).collect();
    assert_eq!(keys, vec!["+draft/react", "+draft/reply"]);
}

#[test]
fn test_client_only_tags_shown_to_message_tags_recipients() {
    let server = TestServer::new();
    let sender = server.client_with("sender", "message-tags");
    let mut with_cap = server.client_with("with", "message-tags");
    let mut without = server.client("without");

    let mut message = parse(&sender, "@+draft/react=lol TAGMSG #c").into_message();
    message.set_source(slircd_switchboard::message::MessageSource::user(&sender));
    let mut event = server.make_event("event/TAGMSG", message);
    let recipients = vec![Arc::clone(&with_cap.conn), Arc::clone(&without.conn)];
    server.broadcast(&recipients, &mut event);

    assert_eq!(
        with_cap.drain(),
        vec!["@+draft/react=lol :sender!sender@test.host TAGMSG #c"]
    );
    assert_eq!(without.drain(), vec![":sender!sender@test.host TAGMSG #c"]);
}

#[test]
fn test_server_time_only_for_capable_recipients() {
    let server = TestServer::new();
    let mut timed = server.client_with("timed", "server-time");
    let mut plain = server.client("plain");

    let mut event = server.make_event("event/PING", Message::new("PING").param("x"));
    let recipients = vec![Arc::clone(&timed.conn), Arc::clone(&plain.conn)];
    server.broadcast(&recipients, &mut event);

    let line = timed.drain().remove(0);
    let (tags, rest) = line.split_once(' ').unwrap();
    let value = tags.strip_prefix("@time=").unwrap();
    assert_eq!(rest, "PING x");
    // 2024-01-02T03:04:05.678Z
    assert_eq!(value.len(), 24);
    assert!(value.ends_with('Z'));
    assert_eq!(&value[4..5], "-");
    assert_eq!(&value[10..11], "T");
    assert_eq!(&value[19..20], ".");
    assert_eq!(plain.drain(), vec!["PING x"]);
}

#[test]
fn test_populate_runs_once_per_message() {
    struct Stamp(AtomicUsize);

    impl TagProvider for Stamp {
        fn on_populate_tags(&self, this: &TagProviderRef, message: &mut Message) {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            message.add_tag("example/seq", this, n.to_string(), None);
        }

        fn should_send_tag(&self, _recipient: &Recipient<'_>, _tag: &TagData) -> bool {
            true
        }
    }

    let server = TestServer::new();
    let owner = server.component("m_stamp");
    let stamp = Arc::new(Stamp(AtomicUsize::new(0)));
    subscribe(&server, &owner, "stamp", 50, stamp.clone());

    let mut clients: Vec<_> = ["a", "b", "c"].iter().map(|n| server.client(n)).collect();
    let recipients: Vec<_> = clients.iter().map(|c| Arc::clone(&c.conn)).collect();
    let mut event = server.make_event("event/PING", Message::new("PING").param("x"));
    server.broadcast(&recipients, &mut event);

    assert_eq!(stamp.0.load(Ordering::SeqCst), 1);
    for client in &mut clients {
        assert_eq!(client.drain(), vec!["@example/seq=0 PING x"]);
    }
}

#[test]
fn test_tags_of_an_unloaded_provider_are_hidden() {
    struct Always;

    impl TagProvider for Always {
        fn on_populate_tags(&self, this: &TagProviderRef, message: &mut Message) {
            message.add_tag("example/always", this, "1", None);
        }

        fn should_send_tag(&self, _recipient: &Recipient<'_>, _tag: &TagData) -> bool {
            true
        }
    }

    let server = TestServer::new();
    let owner = server.component("m_always");
    subscribe(&server, &owner, "always", 50, Arc::new(Always));

    let mut first = server.client("first");
    let mut second = server.client("second");
    let mut event = server.make_event("event/PING", Message::new("PING").param("x"));

    server.send(&first, &mut event).unwrap();
    assert_eq!(first.drain(), vec!["@example/always=1 PING x"]);

    server.unload_component("m_always").unwrap();
    server.send(&second, &mut event).unwrap();
    assert_eq!(second.drain(), vec!["PING x"]);
}

#[test]
fn test_unloading_message_tags_stops_accepting_client_tags() {
    let server = TestServer::new();
    let alice = server.client_with("alice", "message-tags");
    assert_eq!(parse(&alice, "@+a=1 TAGMSG #c").tags.len(), 1);

    server.unload_component(CORE_MESSAGE_TAGS).unwrap();
    assert!(parse(&alice, "@+a=1 TAGMSG #c").tags.is_empty());
    assert!(server.caps().find("message-tags").is_none());
}
