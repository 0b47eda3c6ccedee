//! Viewer and sender sessions talking over the loopback network

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use aether_core::{CaptureError, ErrorKind, FrameTime};
use aether_test::{
    FakeCamera, LoopbackConfig, LoopbackNetwork, LoopbackTransport, RecordingPreview, SenderPeer,
    TEST_ORIGIN,
};
use aether_transport::{
    BridgeStatus, IceConfig, LivePolicy, SenderFault, SenderState, ViewerBridge, ViewerState,
};

fn viewer(network: &LoopbackNetwork, seed: u64) -> ViewerBridge<LoopbackTransport> {
    ViewerBridge::with_rng(
        network.transport(),
        IceConfig::default(),
        StdRng::seed_from_u64(seed),
    )
}

fn waiting_viewer(network: &LoopbackNetwork) -> (ViewerBridge<LoopbackTransport>, String) {
    let mut bridge = viewer(network, 11);
    bridge.start().unwrap();
    bridge.poll();
    assert_eq!(bridge.status(), BridgeStatus::Waiting);
    let link = bridge.join_link(TEST_ORIGIN).expect("link while waiting");
    (bridge, link.to_string())
}

#[tokio::test]
async fn test_optimistic_sender_goes_live_after_grace() {
    let network = LoopbackNetwork::new();
    let (mut bridge, link) = waiting_viewer(&network);
    let mut sender = SenderPeer::new(&network, LivePolicy::default(), 22);

    let t0 = FrameTime::from_millis(100);
    sender.initialize(t0).await.unwrap();
    assert!(matches!(sender.state(), SenderState::Ready(_)));
    let call = sender.join(&link, t0).unwrap();

    // Answer, then the remote stream
    bridge.poll();
    bridge.poll();
    assert!(bridge.is_connected());
    assert!(bridge.remote_stream().is_some_and(|s| s.has_video()));
    assert!(network.is_answered(call));

    // The viewer answers without media, so only the grace period promotes
    sender.poll(t0 + Duration::from_millis(499));
    assert_eq!(sender.state().display(), "CONNECTING...");
    sender.poll(t0 + Duration::from_millis(500));
    assert!(sender.session().is_live());
    assert!(sender.session().log().contains("Signal Live"));
}

#[tokio::test]
async fn test_acknowledged_sender_waits_for_answer() {
    let network = LoopbackNetwork::with_config(LoopbackConfig {
        acknowledge_calls: true,
        ..LoopbackConfig::default()
    });
    let (mut bridge, link) = waiting_viewer(&network);
    let mut sender = SenderPeer::new(&network, LivePolicy::Acknowledged, 23);

    let t0 = FrameTime::ZERO;
    sender.initialize(t0).await.unwrap();
    sender.join(&link, t0).unwrap();

    sender.poll(t0 + Duration::from_secs(30));
    assert_eq!(sender.state().display(), "CONNECTING...");

    bridge.poll();
    sender.poll(t0 + Duration::from_secs(31));
    assert!(sender.session().is_live());
}

#[tokio::test]
async fn test_failed_call_under_acknowledged_policy_is_network_error() {
    let network = LoopbackNetwork::new();
    let (_bridge, link) = waiting_viewer(&network);
    let mut sender = SenderPeer::new(&network, LivePolicy::Acknowledged, 24);

    sender.initialize(FrameTime::ZERO).await.unwrap();
    network.configure(|c| c.fail_calls = Some("ICE failed".into()));
    sender.join(&link, FrameTime::ZERO).unwrap();
    sender.poll(FrameTime::ZERO);

    assert_eq!(
        sender.state(),
        &SenderState::Error {
            fault: SenderFault::Network,
            reason: "ICE failed".into(),
        }
    );
}

#[tokio::test]
async fn test_debug_frames_reach_viewer_preview() {
    let network = LoopbackNetwork::new();
    let (mut bridge, link) = waiting_viewer(&network);
    let preview = RecordingPreview::new();
    bridge.set_preview_sink(Box::new(preview.clone()));

    let mut sender = SenderPeer::new(&network, LivePolicy::default(), 25);
    let t0 = FrameTime::ZERO;
    sender.initialize(t0).await.unwrap();
    sender.join(&link, t0).unwrap();
    bridge.poll();
    bridge.poll();
    sender.poll(t0 + Duration::from_secs(1));
    assert!(sender.session().is_live());

    sender
        .session_mut()
        .send_debug_frame("data:image/jpeg;base64,AAAA")
        .unwrap();
    sender
        .session_mut()
        .send_debug_frame("not a data uri")
        .unwrap();
    bridge.poll();

    assert_eq!(preview.images(), vec!["data:image/jpeg;base64,AAAA".to_string()]);
    assert_eq!(network.data_messages(), 2);
    assert!(bridge.is_connected());
}

#[tokio::test]
async fn test_remote_hang_up_restarts_viewer_under_new_id() {
    let network = LoopbackNetwork::new();
    let (mut bridge, link) = waiting_viewer(&network);
    let first_id = bridge.local_id().cloned().unwrap();

    let mut sender = SenderPeer::new(&network, LivePolicy::default(), 26);
    sender.initialize(FrameTime::ZERO).await.unwrap();
    sender.join(&link, FrameTime::ZERO).unwrap();
    bridge.poll();
    bridge.poll();
    let remote = bridge.remote_stream().unwrap();

    assert!(sender.session_mut().hang_up());
    assert!(matches!(sender.state(), SenderState::Ready(_)));

    // CallClosed tears down and re-registers; Open lands on the next poll
    bridge.poll();
    assert!(!remote.is_active());
    bridge.poll();
    assert_eq!(bridge.status(), BridgeStatus::Waiting);
    let second_id = bridge.local_id().cloned().unwrap();
    assert_ne!(first_id, second_id);
    assert!(!network.is_registered(&first_id));
    assert!(network.is_registered(&second_id));
}

#[tokio::test]
async fn test_rendezvous_loss_keeps_connected_media() {
    let network = LoopbackNetwork::new();
    let (mut bridge, link) = waiting_viewer(&network);
    let mut sender = SenderPeer::new(&network, LivePolicy::default(), 27);
    sender.initialize(FrameTime::ZERO).await.unwrap();
    sender.join(&link, FrameTime::ZERO).unwrap();
    bridge.poll();
    bridge.poll();

    let id = bridge.local_id().cloned().unwrap();
    assert!(network.disconnect(&id));
    bridge.poll();
    assert!(bridge.is_connected());
    assert!(bridge.remote_stream().is_some_and(|s| s.is_active()));
}

#[test]
fn test_disconnect_while_waiting_is_transport_error() {
    let network = LoopbackNetwork::new();
    let (mut bridge, _link) = waiting_viewer(&network);
    let id = bridge.local_id().cloned().unwrap();

    network.disconnect(&id);
    bridge.poll();
    assert!(matches!(
        bridge.state(),
        ViewerState::Error {
            kind: ErrorKind::Transport,
            ..
        }
    ));

    // Only a manual reinitialize leaves the error
    bridge.close(true).unwrap();
    assert_eq!(bridge.status(), BridgeStatus::Error);
    bridge.reinitialize().unwrap();
    bridge.poll();
    assert_eq!(bridge.status(), BridgeStatus::Waiting);
}

#[test]
fn test_refused_registration_is_registration_error() {
    let network = LoopbackNetwork::with_config(LoopbackConfig {
        refuse_registration: Some("server full".into()),
        ..LoopbackConfig::default()
    });
    let mut bridge = viewer(&network, 12);
    bridge.start().unwrap();
    bridge.poll();

    assert_eq!(
        bridge.state(),
        &ViewerState::Error {
            kind: ErrorKind::Registration,
            reason: "server full".into(),
        }
    );
    assert!(bridge.join_link(TEST_ORIGIN).is_none());
}

#[tokio::test]
async fn test_sender_camera_failure_is_terminal() {
    let network = LoopbackNetwork::new();
    let camera = FakeCamera::failing(CaptureError::PermissionDenied);
    let mut sender = SenderPeer::with_camera(&network, LivePolicy::default(), 28, camera);

    assert!(sender.initialize(FrameTime::ZERO).await.is_err());
    assert_eq!(sender.state().display(), "CAM ERROR");
    assert_eq!(network.peer_count(), 0);
    assert!(sender.session().log().contains("Cam FAIL"));
}

#[tokio::test]
async fn test_calling_unknown_viewer_fails_the_sender() {
    let network = LoopbackNetwork::new();
    let mut sender = SenderPeer::new(&network, LivePolicy::default(), 29);
    sender.initialize(FrameTime::ZERO).await.unwrap();

    sender
        .join("https://hud.test/mobile?id=nobodyhome", FrameTime::ZERO)
        .unwrap();
    sender.poll(FrameTime::ZERO);

    assert_eq!(sender.state().display(), "NET ERROR");
    assert_eq!(network.peer_count(), 0);
}
