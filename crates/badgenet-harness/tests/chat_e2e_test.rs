//! Chat and config-override flows over a live two-node mesh.

use std::{sync::Arc, time::Duration};

use badgenet_app::{
    App, AppContext, AppFlags,
    apps::{ChatApp, ConfigManager},
};
use badgenet_core::{ConfigStore, Signer, config::keys, crypto::SIGNATURE_LEN};
use badgenet_harness::{Ether, SimEnv, SimNode, StubSigner, StubVerifier};
use badgenet_proto::{
    BROADCAST_ADDRESS, Payload, Protocol, crc16,
    payloads::{ConfigOverride, SignedTextChat},
};

const ADDR_A: u32 = 0xAAAA_AAAA;
const ADDR_B: u32 = 0xBBBB_BBBB;

fn ctx_for(node: &SimNode, signer: bool) -> AppContext {
    AppContext {
        net: node.net.clone(),
        config: Arc::clone(&node.config) as _,
        display: Arc::clone(&node.display) as _,
        keyboard: Arc::clone(&node.keyboard) as _,
        verifier: Arc::new(StubVerifier),
        signer: signer.then(|| Arc::new(StubSigner) as _),
        flags: AppFlags::new_background(),
    }
}

async fn settle(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn chat_message_arrives_with_exact_wire_image() {
    let env = SimEnv::with_seed(30);
    let ether = Ether::new();
    let a = SimNode::join(&ether, ADDR_A, &env);
    let b = SimNode::join(&ether, ADDR_B, &env);

    a.config.set(keys::ALIAS, b"alice").expect("set alias");
    a.config.set(keys::CHAT_TTL, b"3").expect("set ttl");

    let ctx_a = ctx_for(&a, false);
    let ctx_b = ctx_for(&b, false);
    let mut chat_a = ChatApp::new();
    let mut chat_b = ChatApp::new();
    chat_a.start(&ctx_a).expect("start a");
    chat_b.start(&ctx_b).expect("start b");

    // The default channel is 901 (frequency slot 9, topic 1).
    assert_eq!(chat_a.active_channel(), 901);
    chat_a.send_message(&ctx_a, "hi").expect("send");
    settle(5).await;
    chat_b.run_background(&ctx_b);

    // Delivery into B's channel history.
    let history = chat_b.channel_history(901);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].alias, "alice");
    assert_eq!(history[0].text, "hi");
    assert_eq!(history[0].source, ADDR_A);
    assert!(!history[0].signed);

    // Bit-exact on-air image of A's origination (B may have relayed it
    // again after this; the first transmission is A's).
    let transmissions = ether.transmissions();
    assert_eq!(transmissions[0].radio, a.radio.id());
    let wire = &transmissions[0].bytes;
    assert_eq!(wire.len(), 128, "16 header + 2 channel + 10 alias + 100 text");
    assert_eq!(&wire[0..2], &[0x07, 0xE9]);
    assert_eq!(wire[4], 0x03, "TTL from chat_ttl config");
    assert_eq!(wire[5], 128);
    assert_eq!(&wire[6..10], &[0xFF; 4]);
    assert_eq!(&wire[10..14], &[0xAA; 4]);
    assert_eq!(wire[14], 6);
    assert_eq!(&wire[16..18], &[0x03, 0x85]);
    assert_eq!(&wire[18..23], b"alice");
    assert_eq!(&wire[23..28], &[0u8; 5]);
    assert_eq!(&wire[28..30], b"hi");
    assert!(wire[30..].iter().all(|&b| b == 0));
    assert_eq!(u16::from_be_bytes([wire[2], wire[3]]), crc16(&wire[5..]));
}

#[tokio::test(start_paused = true)]
async fn signed_chat_verifies_and_forgeries_drop() {
    let env = SimEnv::with_seed(31);
    let ether = Ether::new();
    let organizer = SimNode::join_signer(&ether, ADDR_A, &env);
    let attendee = SimNode::join(&ether, ADDR_B, &env);

    organizer.config.set(keys::ALIAS, b"hq").expect("set alias");

    let ctx_org = ctx_for(&organizer, true);
    let ctx_att = ctx_for(&attendee, false);
    let mut chat_org = ChatApp::new();
    let mut chat_att = ChatApp::new();
    chat_org.start(&ctx_org).expect("start organizer");
    chat_att.start(&ctx_att).expect("start attendee");

    chat_org.send_signed_message(&ctx_org, "doors open at 9").expect("send signed");
    settle(5).await;
    chat_att.run_background(&ctx_att);

    let history = chat_att.channel_history(901);
    assert_eq!(history.len(), 1);
    assert!(history[0].signed);
    assert_eq!(history[0].text, "doors open at 9");

    // A forged signed message from the attendee's address is dropped.
    let forged = SignedTextChat {
        channel: 901,
        alias: "hq".into(),
        signature: [0x00; SIGNATURE_LEN],
        text: "doors are closed".into(),
    };
    attendee
        .net
        .originate(
            &Protocol::SIGNED_TEXT_CHAT,
            BROADCAST_ADDRESS,
            3,
            Payload::SignedTextChat(forged),
        )
        .expect("originate forgery");
    settle(5).await;
    chat_org.run_background(&ctx_org);

    assert!(
        chat_org.channel_history(901).iter().all(|m| m.text != "doors are closed"),
        "forgery must not enter the history"
    );
}

#[tokio::test(start_paused = true)]
async fn signed_config_override_applies_remotely() {
    let env = SimEnv::with_seed(32);
    let ether = Ether::new();
    let organizer = SimNode::join_signer(&ether, ADDR_A, &env);
    let attendee = SimNode::join(&ether, ADDR_B, &env);

    let ctx_att = ctx_for(&attendee, false);
    let mut manager = ConfigManager::new();
    manager.start(&ctx_att).expect("start manager");

    // Organizer pushes a signed chat_ttl override to the whole mesh.
    let signed_bytes = ConfigOverride::signed_bytes("chat_ttl", b"5").expect("fits");
    let signature = StubSigner.sign(&signed_bytes).expect("stub signs");
    organizer
        .net
        .originate(
            &Protocol::CONFIG_OVERRIDE,
            BROADCAST_ADDRESS,
            3,
            Payload::ConfigOverride(ConfigOverride {
                signature,
                key: "chat_ttl".into(),
                value: b"5".to_vec(),
            }),
        )
        .expect("originate override");
    settle(5).await;
    manager.run_background(&ctx_att);

    assert_eq!(attendee.config.get("chat_ttl"), Some(b"5".to_vec()));

    // An unsigned override changes nothing.
    organizer
        .net
        .originate(
            &Protocol::CONFIG_OVERRIDE,
            BROADCAST_ADDRESS,
            3,
            Payload::ConfigOverride(ConfigOverride {
                signature: [0u8; SIGNATURE_LEN],
                key: "chat_ttl".into(),
                value: b"15".to_vec(),
            }),
        )
        .expect("originate unsigned");
    settle(5).await;
    manager.run_background(&ctx_att);

    assert_eq!(attendee.config.get("chat_ttl"), Some(b"5".to_vec()), "unsigned ignored");
}
