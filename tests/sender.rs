use sr_arq::{
    checksum::compute_checksum, Action, Config, EndpointId, Endpoint, Message, Packet, Recorder,
    SendStatus, Sender,
};
use std::time::Duration;

const TIMEOUT: Duration = Config::DEFAULT_TIMEOUT;

fn message(i: u8) -> Message {
    Message::filled(b'a' + i)
}

/// A sender with packets `0..count` in flight, and a clean recorder.
fn sender_with(count: u8) -> (Sender, Recorder) {
    let mut env = Recorder::new();
    let mut sender = Sender::new(&Config::default());
    for i in 0..count {
        assert_eq!(
            sender.on_send_request(&mut env, message(i)),
            Ok(SendStatus::Accepted(i as u32))
        );
    }
    env.take();
    (sender, env)
}

fn corrupted_ack(acknum: u32) -> Packet {
    let mut ack = Packet::ack(acknum);
    ack.payload[3] = b'Z';
    ack
}

#[test]
fn window_bound() {
    let mut env = Recorder::new();
    let mut sender = Sender::new(&Config::default());
    for i in 0..20 {
        let status = sender.on_send_request(&mut env, message(i)).unwrap();
        assert!(sender.outstanding() <= Config::DEFAULT_WINDOW_SIZE as usize);
        assert_eq!(status.is_accepted(), i < 6);
    }
    assert_eq!(sender.stats().window_full, 14);
    assert_eq!(sender.stats().packets_sent, 6);
}

#[test]
fn full_window_rejects_without_side_effects() {
    let (mut sender, mut env) = sender_with(6);
    let before = format!("{sender:?}");
    let next = sender.next_seqnum();

    assert_eq!(
        sender.on_send_request(&mut env, message(6)),
        Ok(SendStatus::WindowFull)
    );
    assert!(env.actions().is_empty());
    assert_eq!(sender.next_seqnum(), next);
    assert_eq!(sender.outstanding(), 6);
    assert_eq!(sender.stats().window_full, 1);
    // Apart from the counter nothing moved
    assert_eq!(
        before.replace("window_full: 0", "window_full: 1"),
        format!("{sender:?}")
    );
}

#[test]
fn data_packets_carry_a_valid_checksum() {
    let mut env = Recorder::new();
    let mut sender = Sender::new(&Config::default());
    sender.on_send_request(&mut env, message(0)).unwrap();
    let packet = env.take_sent().remove(0);
    assert_eq!(packet.seqnum(), Some(0));
    assert_eq!(packet.acknum(), None);
    assert_eq!(packet.payload, *message(0).data());
    assert_eq!(packet.checksum, compute_checksum(&packet));
}

/// Replays the timer calls in `env` against `running`.
fn track_timer(env: &mut Recorder, running: &mut bool) {
    for action in env.take() {
        match action {
            Action::StartTimer(EndpointId::A, _) => {
                assert!(!*running, "a second timer was started");
                *running = true;
            }
            Action::StopTimer(EndpointId::A) => {
                assert!(*running, "a stopped timer was stopped");
                *running = false;
            }
            _ => {}
        }
    }
}

#[test]
fn at_most_one_timer() {
    let mut env = Recorder::new();
    let mut sender = Sender::new(&Config::default());
    let mut running = false;

    for i in 0..4 {
        sender.on_send_request(&mut env, message(i)).unwrap();
        track_timer(&mut env, &mut running);
    }
    for acknum in [2, 0, 1] {
        sender
            .on_packet_arrival(&mut env, Packet::ack(acknum))
            .unwrap();
        track_timer(&mut env, &mut running);
    }
    // The environment's timer fires on its own
    running = false;
    sender.on_timer_expiry(&mut env).unwrap();
    track_timer(&mut env, &mut running);
    sender.on_packet_arrival(&mut env, Packet::ack(3)).unwrap();
    track_timer(&mut env, &mut running);
    assert!(!running);
    assert!(!sender.is_timer_running());
}

#[test]
fn selective_retransmission() {
    let (mut sender, mut env) = sender_with(3);
    sender.on_packet_arrival(&mut env, Packet::ack(2)).unwrap();
    assert!(env.actions().is_empty());
    assert!(sender.is_acked(2));

    sender.on_timer_expiry(&mut env).unwrap();
    assert_eq!(
        env.take(),
        vec![
            Action::Send(EndpointId::A, Packet::data(0, *message(0).data())),
            Action::Send(EndpointId::A, Packet::data(1, *message(1).data())),
            Action::StartTimer(EndpointId::A, TIMEOUT),
        ]
    );
    assert_eq!(sender.stats().packets_resent, 2);
}

#[test]
fn slide_past_acknowledged_run() {
    let (mut sender, mut env) = sender_with(3);
    for acknum in [1, 2] {
        sender
            .on_packet_arrival(&mut env, Packet::ack(acknum))
            .unwrap();
    }
    assert_eq!(sender.outstanding(), 3);
    assert!(env.actions().is_empty());

    sender.on_packet_arrival(&mut env, Packet::ack(0)).unwrap();
    assert_eq!(sender.outstanding(), 0);
    assert_eq!(env.take(), vec![Action::StopTimer(EndpointId::A)]);
    assert!(!sender.is_timer_running());
    assert_eq!(sender.stats().new_acks, 3);
}

#[test]
fn slide_restarts_timer_when_packets_remain() {
    let (mut sender, mut env) = sender_with(5);
    for acknum in [1, 2, 4] {
        sender
            .on_packet_arrival(&mut env, Packet::ack(acknum))
            .unwrap();
    }
    sender.on_packet_arrival(&mut env, Packet::ack(0)).unwrap();
    assert_eq!(sender.in_flight().collect::<Vec<_>>(), vec![3, 4]);
    assert_eq!(
        env.take(),
        vec![
            Action::StopTimer(EndpointId::A),
            Action::StartTimer(EndpointId::A, TIMEOUT),
        ]
    );

    // Room for four more now
    for i in 5..9 {
        assert!(sender
            .on_send_request(&mut env, message(i))
            .unwrap()
            .is_accepted());
    }
    assert_eq!(
        sender.on_send_request(&mut env, message(9)),
        Ok(SendStatus::WindowFull)
    );
}

#[test]
fn corrupted_acks_are_ignored() {
    let (mut sender, mut env) = sender_with(2);
    sender.on_packet_arrival(&mut env, corrupted_ack(0)).unwrap();
    assert!(env.actions().is_empty());
    assert_eq!(sender.outstanding(), 2);
    assert!(!sender.is_acked(0));
    assert_eq!(sender.stats().corrupted, 1);
}

#[test]
fn data_packets_are_ignored() {
    let (mut sender, mut env) = sender_with(2);
    sender
        .on_packet_arrival(&mut env, Packet::data(0, [0; 20]))
        .unwrap();
    assert!(env.actions().is_empty());
    assert_eq!(sender.outstanding(), 2);
}

#[test]
fn duplicate_and_stale_acks() {
    let (mut sender, mut env) = sender_with(3);
    sender.on_packet_arrival(&mut env, Packet::ack(1)).unwrap();
    sender.on_packet_arrival(&mut env, Packet::ack(1)).unwrap();
    // Never sent
    sender.on_packet_arrival(&mut env, Packet::ack(7)).unwrap();
    assert!(env.actions().is_empty());
    assert_eq!(sender.stats().new_acks, 1);
    assert_eq!(sender.stats().duplicate_acks, 2);

    sender.on_packet_arrival(&mut env, Packet::ack(0)).unwrap();
    assert_eq!(sender.in_flight().collect::<Vec<_>>(), vec![2]);
    // Already slid out of the window
    sender.on_packet_arrival(&mut env, Packet::ack(0)).unwrap();
    assert_eq!(sender.stats().duplicate_acks, 3);
    assert_eq!(sender.outstanding(), 1);
}

#[test]
fn timeout_resends_everything_unacknowledged() {
    let (mut sender, mut env) = sender_with(4);
    sender.on_timer_expiry(&mut env).unwrap();
    let resent: Vec<_> = env.take_sent().iter().filter_map(Packet::seqnum).collect();
    assert_eq!(resent, vec![0, 1, 2, 3]);
    assert!(sender.is_timer_running());

    // And again, the timer keeps going while packets are outstanding
    sender.on_timer_expiry(&mut env).unwrap();
    assert_eq!(env.take_sent().len(), 4);
    assert_eq!(sender.stats().packets_resent, 8);
}

#[test]
fn sequence_numbers_wrap() {
    let mut env = Recorder::new();
    let mut sender = Sender::new(&Config::default());
    let mut seqnums = Vec::new();
    for i in 0..30u32 {
        let SendStatus::Accepted(seqnum) = sender
            .on_send_request(&mut env, message((i % 26) as u8))
            .unwrap()
        else {
            panic!("the window should never fill up");
        };
        seqnums.push(seqnum);
        sender
            .on_packet_arrival(&mut env, Packet::ack(seqnum))
            .unwrap();
        assert_eq!(sender.outstanding(), 0);
    }
    assert_eq!(seqnums, (0..30).map(|i| i % 12).collect::<Vec<_>>());
    assert_eq!(sender.stats().new_acks, 30);
}

#[test]
fn reused_sequence_number_starts_unacknowledged() {
    // Acknowledge the first window backwards so every flag is set before it
    // slides, then come around to 0 again.
    let config = Config::default();
    let mut env = Recorder::new();
    let mut sender = Sender::new(&config);
    for i in 0..6 {
        sender.on_send_request(&mut env, message(i)).unwrap();
    }
    for acknum in [5, 4, 3, 2, 1, 0] {
        sender
            .on_packet_arrival(&mut env, Packet::ack(acknum))
            .unwrap();
    }
    for i in 6..12 {
        sender.on_send_request(&mut env, message(i)).unwrap();
    }
    for acknum in 6..12 {
        sender
            .on_packet_arrival(&mut env, Packet::ack(acknum))
            .unwrap();
    }
    assert_eq!(sender.outstanding(), 0);
    assert_eq!(
        sender.on_send_request(&mut env, message(12)),
        Ok(SendStatus::Accepted(0))
    );
    assert!(!sender.is_acked(0));
    sender.on_send_request(&mut env, message(13)).unwrap();
    env.take();

    // Only the unacknowledged reuse goes out again
    sender.on_timer_expiry(&mut env).unwrap();
    let resent: Vec<_> = env.take_sent().iter().filter_map(Packet::seqnum).collect();
    assert_eq!(resent, vec![0, 1]);
}
