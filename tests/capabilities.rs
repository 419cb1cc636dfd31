//! Capability bit allocation, negotiation and lifecycle.

mod common;

use common::TestServer;
use parking_lot::Mutex;
use slircd_switchboard::bootstrap::{CORE_CAP, CORE_SERVER_TIME};
use slircd_switchboard::caps::{CAP_EVENT, CapListener, CapManager, CapReply, Capability, MAX_CAPS, Protocol};
use std::sync::Arc;

#[derive(Default)]
struct ChangeLog(Mutex<Vec<(String, bool)>>);

impl CapListener for ChangeLog {
    fn on_cap_change(&self, cap: &Capability, added: bool) {
        self.0.lock().push((cap.name().to_string(), added));
    }
}

#[test]
fn test_core_capabilities_are_registered() {
    let server = TestServer::new();
    let caps = server.caps();
    assert_eq!(caps.bits_in_use(), 3);
    let names: Vec<String> = caps.capabilities().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(names, vec!["batch", "message-tags", "server-time"]);
}

#[test]
fn test_bits_run_out_at_sixty_three() {
    let server = TestServer::new();
    let owner = server.component("m_many");
    let caps = server.caps();
    let free = usize::from(MAX_CAPS) - caps.bits_in_use() as usize;

    let filler: Vec<Capability> = (0..free)
        .map(|i| Capability::new(&server, &owner, &format!("example/cap{i}")))
        .collect();
    assert!(filler.iter().all(Capability::is_registered));
    assert_eq!(caps.bits_in_use(), u32::from(MAX_CAPS));

    let extra = Capability::new(&server, &owner, "example/extra");
    assert!(!extra.is_registered());
    assert_eq!(extra.bit(), None);
    assert_eq!(caps.starved_count(), 1);
    assert!(caps.find("example/extra").is_none());

    let freed = filler[7].bit();
    filler[7].set_active(false);
    assert!(!filler[7].is_registered());
    assert!(extra.is_registered());
    assert_eq!(extra.bit(), freed);
    assert_eq!(caps.starved_count(), 0);
    assert_eq!(caps.bits_in_use(), u32::from(MAX_CAPS));
}

#[test]
fn test_duplicate_names_do_not_register() {
    let server = TestServer::new();
    let owner = server.component("m_dupe");
    let twin = Capability::new(&server, &owner, "server-time");
    assert!(!twin.is_registered());
    assert_eq!(server.caps().bits_in_use(), 3);
}

#[test]
fn test_ls_reports_values_only_to_302_clients() {
    let server = TestServer::new();
    let owner = server.component("m_meta");
    let meta = Capability::new(&server, &owner, "example/meta");
    meta.set_value(Some("a,b"));
    let caps = server.caps();

    let legacy = server.client("legacy");
    assert_eq!(caps.protocol(&legacy), Protocol::Unnegotiated);
    assert_eq!(
        caps.ls(&legacy, None),
        vec!["batch", "example/meta", "message-tags", "server-time"]
    );
    assert_eq!(caps.protocol(&legacy), Protocol::Legacy);

    let modern = server.client("modern");
    assert_eq!(
        caps.ls(&modern, Some(302)),
        vec!["batch", "example/meta=a,b", "message-tags", "server-time"]
    );
    assert_eq!(caps.protocol(&modern), Protocol::V302);

    caps.ls(&modern, None);
    assert_eq!(caps.protocol(&modern), Protocol::V302);
}

#[test]
fn test_request_is_all_or_nothing() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client("alice");

    assert_eq!(
        caps.request(&alice, "batch server-time=ignored"),
        CapReply::Ack("batch server-time".to_string())
    );
    assert_eq!(caps.enabled(&alice), vec!["batch", "server-time"]);

    assert_eq!(
        caps.request(&alice, "message-tags example/nope "),
        CapReply::Nak("message-tags example/nope".to_string())
    );
    assert_eq!(caps.enabled(&alice), vec!["batch", "server-time"]);

    assert_eq!(
        caps.request(&alice, "-batch message-tags"),
        CapReply::Ack("-batch message-tags".to_string())
    );
    assert_eq!(caps.enabled(&alice), vec!["message-tags", "server-time"]);
}

#[test]
fn test_empty_request_is_refused() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client("alice");
    assert_eq!(caps.request(&alice, "  "), CapReply::Nak(String::new()));
    assert_eq!(caps.protocol(&alice), Protocol::Unnegotiated);
}

#[test]
fn test_request_without_ls_counts_as_negotiation() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client("alice");
    caps.request(&alice, "-batch");
    assert_eq!(caps.protocol(&alice), Protocol::Legacy);
    assert!(caps.enabled(&alice).is_empty());
}

#[test]
fn test_deactivated_capability_is_withdrawn_everywhere() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client_with("alice", "server-time batch");
    let bob = server.client_with("bob", "server-time");

    let server_time = caps.find("server-time").unwrap();
    server_time.set_active(false);
    assert!(!server_time.get(&alice));
    assert!(!server_time.get(&bob));
    assert_eq!(caps.enabled(&alice), vec!["batch"]);
    assert!(!caps.ls(&alice, None).contains(&"server-time".to_string()));

    server_time.set_active(true);
    assert!(server_time.is_registered());
    assert!(!server_time.get(&alice));
    assert_eq!(
        caps.request(&bob, "server-time"),
        CapReply::Ack("server-time".to_string())
    );
    assert!(server_time.get(&bob));
}

#[test]
fn test_unregistered_capability_ignores_set() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client("alice");
    let batch = caps.find("batch").unwrap();
    batch.set_active(false);
    batch.set(&alice, true);
    assert!(!batch.get(&alice));
    assert_eq!(alice.ext_get(caps.ext_key()), None);
}

#[test]
fn test_owner_unload_removes_its_capabilities() {
    let server = TestServer::new();
    let caps = server.caps();
    let alice = server.client_with("alice", "server-time batch");
    let server_time = caps.find("server-time").unwrap();

    server.unload_component(CORE_SERVER_TIME).unwrap();
    assert!(caps.find("server-time").is_none());
    assert!(!server_time.is_registered());
    assert_eq!(caps.bits_in_use(), 2);
    assert_eq!(caps.enabled(&alice), vec!["batch"]);
}

#[test]
fn test_listeners_hear_additions_and_removals() {
    let server = TestServer::new();
    let watcher = server.component("m_capnotify");
    let log = Arc::new(ChangeLog::default());
    server
        .hub()
        .subscribe::<dyn CapListener>(
            CAP_EVENT,
            &watcher,
            "cap-notify",
            50,
            Arc::clone(&log) as Arc<dyn CapListener>,
        )
        .unwrap();

    let owner = server.component("m_feature");
    let feature = Capability::new(&server, &owner, "example/feature");
    feature.set_active(false);
    feature.set_active(true);
    server.unload_component("m_feature").unwrap();

    assert_eq!(
        *log.0.lock(),
        vec![
            ("example/feature".to_string(), true),
            ("example/feature".to_string(), false),
            ("example/feature".to_string(), true),
            ("example/feature".to_string(), false),
        ]
    );
}

#[test]
fn test_capabilities_wait_for_a_manager() {
    let server = TestServer::bare();
    let owner = server.component("m_early");
    let early = Capability::new(&server, &owner, "example/early");
    assert!(!early.is_registered());

    let core = server.component(CORE_CAP);
    let manager = CapManager::install(&server, &core).unwrap();
    assert!(early.is_registered());
    assert_eq!(manager.find("example/early").map(|c| c.name().to_string()), Some("example/early".to_string()));
}

#[test]
fn test_manager_unload_and_reload_rebinds_capabilities() {
    let server = TestServer::new();
    let alice = server.client_with("alice", "batch");
    let batch = server.batches().capability().clone();
    assert!(batch.get(&alice));

    server.unload_component(CORE_CAP).unwrap();
    assert!(!batch.is_registered());
    assert!(!batch.get(&alice));

    let core = server.component(CORE_CAP);
    let manager = CapManager::install(&server, &core).unwrap();
    assert!(batch.is_registered());
    assert_eq!(manager.bits_in_use(), 3);
    assert!(!batch.get(&alice));
    assert_eq!(manager.protocol(&alice), Protocol::Unnegotiated);

    assert_eq!(manager.request(&alice, "batch"), CapReply::Ack("batch".to_string()));
    assert!(batch.get(&alice));
}

#[test]
fn test_inactive_capability_registers_once_a_late_manager_is_up() {
    let server = TestServer::bare();
    let owner = server.component("m_early");
    let early = Capability::new(&server, &owner, "example/early");
    early.set_active(false);

    let core = server.component(CORE_CAP);
    let manager = CapManager::install(&server, &core).unwrap();
    assert!(!early.is_registered());
    assert!(manager.find("example/early").is_none());

    early.set_active(true);
    assert!(early.is_registered());
    assert!(manager.find("example/early").is_some());
}

#[test]
fn test_capability_inactive_across_manager_reload_registers_on_activation() {
    let server = TestServer::new();
    let owner = server.component("m_feature");
    let feature = Capability::new(&server, &owner, "example/feature");
    assert!(feature.is_registered());
    feature.set_active(false);

    server.unload_component(CORE_CAP).unwrap();
    let core = server.component(CORE_CAP);
    let manager = CapManager::install(&server, &core).unwrap();
    assert!(!feature.is_registered());

    feature.set_active(true);
    assert!(feature.is_registered());
    assert!(manager.find("example/feature").is_some());
}

#[test]
fn test_parked_capability_waits_while_its_name_is_taken() {
    let server = TestServer::new();
    let owner = server.component("m_many");
    let caps = server.caps();
    let free = usize::from(MAX_CAPS) - caps.bits_in_use() as usize;
    let filler: Vec<Capability> = (0..free)
        .map(|i| Capability::new(&server, &owner, &format!("example/cap{i}")))
        .collect();

    let first = Capability::new(&server, &owner, "example/late");
    let second = Capability::new(&server, &owner, "example/late");
    let other = Capability::new(&server, &owner, "example/other");
    assert_eq!(caps.starved_count(), 3);

    filler[0].set_active(false);
    assert!(first.is_registered());
    assert_eq!(caps.starved_count(), 2);

    filler[1].set_active(false);
    assert!(!second.is_registered());
    assert!(other.is_registered());
    assert_eq!(caps.starved_count(), 1);

    first.set_active(false);
    assert!(second.is_registered());
    assert_eq!(caps.starved_count(), 0);
    assert!(caps.find("example/late").is_some_and(|c| c.bit() == second.bit()));
}
