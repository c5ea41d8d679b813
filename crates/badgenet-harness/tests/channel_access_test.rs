//! Carrier sensing, cooldowns, send faults, and queue backpressure.

use std::{sync::Arc, time::Duration};

use badgenet_core::{ChannelStatus, NetConfig, NetStack, Radio};
use badgenet_harness::{Ether, SimEnv, SimNode};
use badgenet_proto::{BROADCAST_ADDRESS, Frame, Payload, Protocol, payloads::Ping};

const ADDR_A: u32 = 0xAAAA_AAAA;
const ADDR_B: u32 = 0xBBBB_BBBB;

fn ping(seq: u8) -> Payload {
    Payload::Ping(Ping { target: BROADCAST_ADDRESS, seq })
}

#[tokio::test(start_paused = true)]
async fn busy_channel_defers_until_free() {
    let env = SimEnv::with_seed(10);
    let ether = Ether::new();
    let node = SimNode::join(&ether, ADDR_A, &env);

    node.radio.script_scans(&[ChannelStatus::Busy, ChannelStatus::Busy, ChannelStatus::Busy]);
    node.net.originate(&Protocol::PING, BROADCAST_ADDRESS, 1, ping(0)).expect("originate");
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Three busy probes, each followed by a 0-10 ms backoff, then the
    // probe that found the channel free released exactly one send.
    assert_eq!(node.radio.scan_count(), 4);
    assert_eq!(ether.transmission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_failure_drops_frame_without_retry() {
    let env = SimEnv::with_seed(11);
    let ether = Ether::new();
    let node = SimNode::join(&ether, ADDR_A, &env);

    node.radio.fail_next_sends(1);
    node.net.originate(&Protocol::PING, BROADCAST_ADDRESS, 1, ping(0)).expect("originate");
    node.net.originate(&Protocol::PING, BROADCAST_ADDRESS, 1, ping(1)).expect("originate");
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The first frame was lost, the pump moved on to the second.
    let transmissions = ether.transmissions();
    assert_eq!(transmissions.len(), 1);
    let frame = Frame::decode(&transmissions[0].bytes).expect("valid frame");
    assert_eq!(frame.header.sequence(), 1, "second frame made it out");
    assert_eq!(node.net.pending_transmissions(), 0);
}

#[tokio::test(start_paused = true)]
async fn relays_shed_before_local_traffic() {
    let env = SimEnv::with_seed(12);
    let ether = Ether::new();

    // Receiver under test: receive pump only, so the queue fills without
    // draining.
    let stack = NetStack::new(ADDR_A, NetConfig::default(), env.clone());
    let handle = stack.handle();
    let radio = Arc::new(ether.radio());
    tokio::spawn(stack.clone().receive_pump(Arc::clone(&radio) as Arc<dyn Radio>));

    // A neighbor floods distinct frames eligible for forwarding.
    let feeder = SimNode::join(&ether, ADDR_B, &env);
    for seq in 0..12u8 {
        feeder
            .net
            .originate(&Protocol::PING, BROADCAST_ADDRESS, 3, ping(seq))
            .expect("originate");
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Forwards are accepted only below half the bound (10 of 20).
    assert_eq!(handle.pending_transmissions(), 10, "eleventh forward refused");

    // Local traffic is accepted regardless of the forward backlog.
    handle.originate(&Protocol::PING, BROADCAST_ADDRESS, 1, ping(200)).expect("local send");
    assert_eq!(handle.pending_transmissions(), 11);

    // Another inbound forward still bounces.
    feeder
        .net
        .originate(&Protocol::PING, BROADCAST_ADDRESS, 3, ping(99))
        .expect("originate");
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.pending_transmissions(), 11, "forward dropped at half bound");

    // Fill the rest with local frames: the queue caps at its bound by
    // evicting the oldest relayed frame, never a local one.
    for seq in 201..=215u8 {
        handle.originate(&Protocol::PING, BROADCAST_ADDRESS, 1, ping(seq)).expect("local send");
    }
    assert_eq!(handle.pending_transmissions(), 20);
}
