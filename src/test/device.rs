use crate::net::{Packet, PointToPointDevice};
use crate::queue::QueueSize;
use crate::sim::SimTime;

fn device(queue: QueueSize) -> PointToPointDevice {
    PointToPointDevice::new(10_000_000, SimTime::from_millis(2), queue)
}

#[test]
fn tx_time_rounds_up_to_the_next_nanosecond() {
    let d = device(QueueSize::packets(1));
    // 1448 B at 10 Mbps = 1.1584 ms
    assert_eq!(d.tx_time(1448), SimTime(1_158_400));
    assert_eq!(
        PointToPointDevice::new(3, SimTime::ZERO, QueueSize::packets(1)).tx_time(1),
        SimTime(2_666_666_667)
    );
}

#[test]
fn device_serializes_one_packet_at_a_time() {
    let mut d = device(QueueSize::packets(1));
    assert!(!d.is_stopped());
    d.send(Packet::new(1, 0, 1448)).expect("room");
    assert!(d.is_stopped());

    let tx = d.try_start_tx(SimTime::ZERO).expect("idle device starts");
    assert_eq!(tx.pkt.id, 1);
    assert_eq!(tx.depart, SimTime(1_158_400));
    assert_eq!(tx.arrive, SimTime(1_158_400 + 2_000_000));
    assert!(d.is_busy());
    assert!(!d.is_stopped());

    d.send(Packet::new(2, 0, 1448)).expect("room");
    assert!(d.try_start_tx(SimTime(10)).is_none());
    let rejected = d.send(Packet::new(3, 0, 1448)).expect_err("queue full");
    assert_eq!(rejected.id, 3);
    assert_eq!(d.dropped_pkts(), 1);

    d.complete_tx();
    let tx = d.try_start_tx(tx.depart).expect("next packet");
    assert_eq!(tx.pkt.id, 2);
    assert_eq!(d.tx_pkts(), 2);
    assert_eq!(d.tx_bytes(), 2 * 1448);
    assert_eq!(d.queue_len(), 0);
}

#[test]
fn byte_mode_queue_stops_for_packets_that_do_not_fit() {
    let mut d = device(QueueSize::bytes(3_000));
    assert!(!d.is_stopped_for(1448));
    d.send(Packet::new(1, 0, 1448)).expect("room");
    assert!(!d.is_stopped_for(1448));
    d.send(Packet::new(2, 0, 1448)).expect("room");
    assert!(d.is_stopped_for(1448));
    assert!(!d.is_stopped_for(100));

    // 空队列不会挡住超大的包，交给 send 去丢
    let mut small = device(QueueSize::bytes(1_000));
    assert!(!small.is_stopped_for(1448));
    small.send(Packet::new(3, 0, 1448)).expect_err("larger than the queue");
    assert_eq!(small.dropped_pkts(), 1);
}
