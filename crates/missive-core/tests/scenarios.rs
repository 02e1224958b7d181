mod common;

use common::{DOMAIN, NAMESPACE, User, messenger};
use missive_core::conversation::{Transition, conversation_id, replay};
use missive_core::{Caller, Error, Messenger, authorization_message};
use missive_crypto::keys::{generate_secret, public_key_hex};
use missive_crypto::reader::MessageReader;
use missive_crypto::signature::{DEV_BYPASS_PREFIX, SignaturePolicy, sign_personal, sign_request};
use missive_db::Database;
use missive_types::api::{GetDomainUserRequest, GetMessagesRequest, RegisterRequest, SendMessageRequest};
use missive_types::models::{ConversationState, MessageType};
use proptest::prelude::*;

fn messages_req(conversation_id: &str) -> GetMessagesRequest {
    GetMessagesRequest {
        domain: DOMAIN.into(),
        namespace: NAMESPACE.into(),
        conversation_id: conversation_id.into(),
        limit: 50,
        before: None,
        before_id: None,
    }
}

#[test]
fn accept_then_exchange_on_custom_thread() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");

    b.send(&m, &a, MessageType::Clear, "hello", Some("1")).unwrap();

    let req = a.conversations_req();
    let unaccepted = m.get_unaccepted_conversations(&a.caller(&m, &req), &req).unwrap();
    assert_eq!(unaccepted.len(), 1);
    assert_eq!(unaccepted[0].conversation_id, "1");
    assert_eq!(unaccepted[0].second, b.address);

    let thread = a.thread_req("1");
    assert!(m.accept_conversation(&a.caller(&m, &thread), &thread).unwrap());

    let accepted = m.get_accepted_conversations(&a.caller(&m, &req), &req).unwrap();
    assert_eq!(accepted.len(), 1);
    assert!(m.get_unaccepted_conversations(&a.caller(&m, &req), &req).unwrap().is_empty());

    b.send(&m, &a, MessageType::Clear, "again", Some("1")).unwrap();

    let page = messages_req("1");
    let for_a = m.get_messages(&a.caller(&m, &page), &page).unwrap();
    let for_b = m.get_messages(&b.caller(&m, &page), &page).unwrap();
    assert_eq!(for_a.len(), 2);
    let bodies = |list: &[missive_types::models::Message]| list.iter().map(|m| m.message.clone()).collect::<Vec<_>>();
    assert_eq!(bodies(&for_a[..]), bodies(&for_b[..]));
}

#[test]
fn encrypted_reply_flags_and_decryption() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");
    let thread_id = conversation_id(&a.address, &b.address);

    b.send(&m, &a, MessageType::Clear, "hi", None).unwrap();
    let thread = a.thread_req(&thread_id);
    m.accept_conversation(&a.caller(&m, &thread), &thread).unwrap();
    b.send(&m, &a, MessageType::Clear, "you there?", None).unwrap();

    let reader_a = MessageReader::new(a.secret.clone());
    let sealed = reader_a.seal_for(&b.public_key, "yes").unwrap();
    let sent = a.send(&m, &b, MessageType::Encrypted, &sealed, None).unwrap();
    assert_eq!(sent.conversation_id, thread_id);

    let req = a.conversations_req();
    let mine = m.get_conversations(&a.caller(&m, &req), &req).unwrap();
    assert_eq!(mine.len(), 1);
    assert!(mine[0].accepted && mine[0].read);
    assert_eq!(mine[0].state, ConversationState::Read);

    let theirs = m.get_conversations(&b.caller(&m, &req), &req).unwrap();
    assert!(theirs[0].accepted && !theirs[0].read);
    assert_eq!(theirs[0].state, ConversationState::Unread);

    let page = messages_req(&thread_id);
    let listing = m.get_messages(&b.caller(&m, &page), &page).unwrap();
    let reader_b = MessageReader::new(b.secret.clone());
    let opened: Vec<String> = reader_b
        .read_all(listing)
        .into_iter()
        .map(|o| o.content.unwrap())
        .collect();
    assert!(opened.contains(&"yes".to_string()));
    assert!(opened.contains(&"hi".to_string()));

    // the sender can read its own envelope too
    let listing = m.get_messages(&a.caller(&m, &page), &page).unwrap();
    let own = listing.iter().find(|msg| msg.kind == MessageType::Encrypted).unwrap();
    assert_eq!(reader_a.read(own).unwrap(), "yes");
}

#[test]
fn registration_must_be_signed_by_the_address() {
    let m = messenger();
    let a = User::new();
    let other = User::new();

    let mut req = a.registration(Some("alice"));
    req.address = other.address.clone();
    let caller = a.caller(&m, &req);
    assert!(matches!(m.register(&caller, &req), Err(Error::AddressMismatch)));
    assert!(m.get_user(&other.address).unwrap().is_none());
}

#[test]
fn reregistration_updates_username_and_keeps_key() {
    let m = messenger();
    let a = User::new();
    a.register(&m, "alice");
    a.register(&m, "alice2");

    let lookup = GetDomainUserRequest {
        domain: DOMAIN.into(),
        address: Some(a.address.clone()),
        username: None,
    };
    let stored = m.get_domain_user(&lookup).unwrap().unwrap();
    assert_eq!(stored.username.as_deref(), Some("alice2"));
    assert_eq!(stored.public_key, a.public_key);

    let by_name = GetDomainUserRequest {
        domain: DOMAIN.into(),
        address: None,
        username: Some("alice2".into()),
    };
    assert_eq!(m.get_domain_user(&by_name).unwrap().unwrap().address, a.address);

    let complete = m.get_complete_user(&a.address).unwrap().unwrap();
    assert_eq!(complete.domains.len(), 1);
}

#[test]
fn key_bound_to_another_account_is_refused() {
    let m = messenger();
    let a = User::new();
    a.register(&m, "alice");

    // a second account signs an authorization for a's key
    let b = User::new();
    let mut req = b.registration(Some("bob"));
    req.signature = sign_personal(
        &b.secret,
        &authorization_message(&b.address, &a.public_key),
    )
    .unwrap();
    let caller = a.caller(&m, &req);
    assert!(matches!(m.register(&caller, &req), Err(Error::PublicKeyInUse)));
    assert!(m.get_user(&b.address).unwrap().is_none());
}

#[test]
fn dev_bypass_follows_policy() {
    let a = User::new();
    let header = format!("{}{}", DEV_BYPASS_PREFIX, a.public_key);

    let strict = messenger();
    assert!(matches!(
        strict.authenticate(b"{}", Some(&header)),
        Err(Error::InvalidSignature)
    ));

    let dev = Messenger::new(Database::open_in_memory().unwrap(), SignaturePolicy::AllowDevBypass);
    let caller = dev.authenticate(b"{}", Some(&header)).unwrap();
    assert_eq!(caller.public_key.as_deref(), Some(a.public_key.as_str()));
    assert!(caller.registration.is_none());
}

#[test]
fn tampered_body_does_not_authenticate_as_signer() {
    let m = messenger();
    let a = User::new();
    a.register(&m, "alice");

    let raw = br#"{"domain":"test.com","namespace":"dm"}"#;
    let header = sign_request(&a.secret, raw).unwrap();
    let caller = m.authenticate(br#"{"domain":"test.com","namespace":"xx"}"#, Some(&header));
    match caller {
        Err(Error::InvalidSignature) => {}
        Ok(c) => assert_ne!(c.public_key.as_deref(), Some(a.public_key.as_str())),
        Err(e) => panic!("unexpected error {e:?}"),
    }
}

#[test]
fn unauthenticated_and_foreign_domain_write_nothing() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");

    let req = SendMessageRequest {
        domain: DOMAIN.into(),
        namespace: NAMESPACE.into(),
        recipient: a.address.clone(),
        recipient_public_key: None,
        message: "hi".into(),
        kind: MessageType::Clear,
        conversation_id: None,
        timestamp: None,
    };
    assert!(matches!(
        m.send_message(&Caller::anonymous(), &req),
        Err(Error::Unauthenticated)
    ));

    let foreign = SendMessageRequest { domain: "other.com".into(), ..req };
    let caller = b.caller(&m, &foreign);
    assert!(matches!(
        m.send_message(&caller, &foreign),
        Err(Error::DomainMismatch { .. })
    ));

    let list = a.conversations_req();
    assert!(m.get_conversations(&a.caller(&m, &list), &list).unwrap().is_empty());
}

#[test]
fn encrypted_send_needs_the_registered_key() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    let stranger = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");

    let mut req = SendMessageRequest {
        domain: DOMAIN.into(),
        namespace: NAMESPACE.into(),
        recipient: a.address.clone(),
        recipient_public_key: Some(stranger.public_key.clone()),
        message: "AAAA:BBBB".into(),
        kind: MessageType::Encrypted,
        conversation_id: None,
        timestamp: None,
    };
    let caller = b.caller(&m, &req);
    assert!(matches!(m.send_message(&caller, &req), Err(Error::Invalid(_))));

    req.recipient_public_key = None;
    let caller = b.caller(&m, &req);
    assert!(matches!(m.send_message(&caller, &req), Err(Error::Invalid(_))));
}

#[test]
fn outsiders_cannot_read_a_thread() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    let c = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");
    c.register(&m, "carol");

    b.send(&m, &a, MessageType::Clear, "private", None).unwrap();
    let page = messages_req(&conversation_id(&a.address, &b.address));
    assert!(matches!(
        m.get_messages(&c.caller(&m, &page), &page),
        Err(Error::NotParticipant)
    ));
}

#[test]
fn reused_thread_id_is_refused_for_another_pair() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    let c = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");
    c.register(&m, "carol");

    b.send(&m, &a, MessageType::Clear, "one", Some("shared")).unwrap();
    assert!(matches!(
        c.send(&m, &a, MessageType::Clear, "two", Some("shared")),
        Err(Error::InvalidConversation)
    ));
}

#[test]
fn another_pairs_canonical_id_is_refused() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    let c = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");
    c.register(&m, "carol");

    let theirs = conversation_id(&a.address, &b.address);
    assert!(matches!(
        c.send(&m, &a, MessageType::Clear, "squat", Some(&theirs)),
        Err(Error::InvalidConversation)
    ));

    let sent = b.send(&m, &a, MessageType::Clear, "hi", None).unwrap();
    assert_eq!(sent.conversation_id, theirs);

    // naming your own pair explicitly, in any case, lands in the same thread
    let shouted = theirs.to_ascii_uppercase().replacen("0X", "0x", 2);
    let again = a.send(&m, &b, MessageType::Clear, "hey", Some(&shouted)).unwrap();
    assert_eq!(again.conversation_id, theirs);
}

#[test]
fn same_millisecond_messages_survive_paging() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");

    for body in ["one", "two", "three"] {
        let req = SendMessageRequest {
            domain: DOMAIN.into(),
            namespace: NAMESPACE.into(),
            recipient: a.address.clone(),
            recipient_public_key: None,
            message: body.into(),
            kind: MessageType::Clear,
            conversation_id: None,
            timestamp: Some(100),
        };
        m.send_message(&b.caller(&m, &req), &req).unwrap();
    }

    let mut page = messages_req(&conversation_id(&a.address, &b.address));
    page.limit = 2;
    let mut seen = Vec::new();
    loop {
        let batch = m.get_messages(&a.caller(&m, &page), &page).unwrap();
        let Some(last) = batch.last() else { break };
        page.before = Some(last.timestamp);
        page.before_id = Some(last.id.clone());
        seen.extend(batch.into_iter().map(|msg| msg.message));
    }
    seen.sort();
    assert_eq!(seen, vec!["one", "three", "two"]);
}

#[test]
fn cursor_id_needs_a_timestamp() {
    let m = messenger();
    let a = User::new();
    let b = User::new();
    a.register(&m, "alice");
    b.register(&m, "bob");
    b.send(&m, &a, MessageType::Clear, "hi", None).unwrap();

    let mut page = messages_req(&conversation_id(&a.address, &b.address));
    page.before_id = Some("x".into());
    assert!(matches!(
        m.get_messages(&a.caller(&m, &page), &page),
        Err(Error::Invalid(_))
    ));
}

#[test]
fn new_key_on_reregistration_is_reported_unbound() {
    let m = messenger();
    let a = User::new();
    a.register(&m, "alice");

    let rotated = generate_secret();
    let rotated_pk = public_key_hex(&rotated.public_key());
    let req = RegisterRequest {
        address: a.address.clone(),
        signature: sign_personal(&a.secret, &authorization_message(&a.address, &rotated_pk)).unwrap(),
        domain: DOMAIN.into(),
        username: None,
        name: None,
    };
    let raw = serde_json::to_vec(&req).unwrap();
    let header = sign_request(&rotated, &raw).unwrap();
    let caller = m.authenticate(&raw, Some(&header)).unwrap();

    let response = m.register(&caller, &req).unwrap();
    assert!(!response.key_bound);
    assert_eq!(response.public_key, a.public_key);

    let again = a.registration(Some("alice"));
    let response = m.register(&a.caller(&m, &again), &again).unwrap();
    assert!(response.key_bound);
    assert_eq!(response.public_key, a.public_key);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    ASends,
    BSends,
    AAccepts,
    BAccepts,
    AReads,
    BReads,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::ASends),
        Just(Op::BSends),
        Just(Op::AAccepts),
        Just(Op::BAccepts),
        Just(Op::AReads),
        Just(Op::BReads),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn stored_flags_follow_the_state_machine(ops in prop::collection::vec(op(), 1..12)) {
        let m = messenger();
        let a = User::new();
        let b = User::new();
        a.register(&m, "alice");
        b.register(&m, "bob");
        let id = conversation_id(&a.address, &b.address);

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for op in ops {
            match op {
                Op::ASends => {
                    a.send(&m, &b, MessageType::Clear, "x", None).unwrap();
                    seen_a.push(Transition::Send);
                    seen_b.push(Transition::Receive);
                }
                Op::BSends => {
                    b.send(&m, &a, MessageType::Clear, "y", None).unwrap();
                    seen_b.push(Transition::Send);
                    seen_a.push(Transition::Receive);
                }
                Op::AAccepts | Op::AReads => {
                    let req = a.thread_req(&id);
                    let caller = a.caller(&m, &req);
                    let changed = match op {
                        Op::AAccepts => m.accept_conversation(&caller, &req).unwrap(),
                        _ => m.mark_as_read(&caller, &req).unwrap(),
                    };
                    prop_assert_eq!(changed, !seen_a.is_empty());
                    if changed {
                        seen_a.push(if matches!(op, Op::AAccepts) { Transition::Accept } else { Transition::MarkRead });
                    }
                }
                Op::BAccepts | Op::BReads => {
                    let req = b.thread_req(&id);
                    let caller = b.caller(&m, &req);
                    let changed = match op {
                        Op::BAccepts => m.accept_conversation(&caller, &req).unwrap(),
                        _ => m.mark_as_read(&caller, &req).unwrap(),
                    };
                    prop_assert_eq!(changed, !seen_b.is_empty());
                    if changed {
                        seen_b.push(if matches!(op, Op::BAccepts) { Transition::Accept } else { Transition::MarkRead });
                    }
                }
            }
        }

        for (user, seen) in [(&a, &seen_a), (&b, &seen_b)] {
            let req = user.conversations_req();
            let rows = m.get_conversations(&user.caller(&m, &req), &req).unwrap();
            match replay(seen) {
                None => prop_assert!(rows.is_empty()),
                Some(flags) => {
                    prop_assert_eq!(rows.len(), 1);
                    prop_assert_eq!(rows[0].accepted, flags.accepted);
                    prop_assert_eq!(rows[0].read, flags.read);
                }
            }
        }
    }
}
