use crate::net::Packet;
use crate::queue::{DropTailQueue, PacketQueue, QueueSize, QueueSizeUnit};

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet::new(id, 0, size_bytes)
}

#[test]
fn queue_size_parses_packets_and_bytes() {
    assert_eq!("1000p".parse::<QueueSize>(), Ok(QueueSize::packets(1000)));
    assert_eq!(" 65535B ".parse::<QueueSize>(), Ok(QueueSize::bytes(65_535)));
    assert!("1000".parse::<QueueSize>().is_err());
    assert!("p".parse::<QueueSize>().is_err());
    assert!("10kB".parse::<QueueSize>().is_err());
    assert_eq!(QueueSize::packets(3).to_string(), "3p");
    assert_eq!(QueueSize::bytes(1500).to_string(), "1500B");
}

#[test]
fn queue_size_serializes_as_text() {
    let json = serde_json::to_string(&QueueSize::bytes(3000)).expect("serialize");
    assert_eq!(json, "\"3000B\"");
    let size: QueueSize = serde_json::from_str("\"25p\"").expect("deserialize");
    assert_eq!(size.unit, QueueSizeUnit::Packets);
    assert_eq!(size.value, 25);
    assert!(serde_json::from_str::<QueueSize>("\"25x\"").is_err());
}

#[test]
fn would_exceed_counts_packets_or_bytes() {
    let p = QueueSize::packets(2);
    assert!(!p.would_exceed(1, 10_000, 10_000));
    assert!(p.would_exceed(2, 0, 0));

    let b = QueueSize::bytes(1000);
    assert!(!b.would_exceed(100, 400, 600));
    assert!(b.would_exceed(0, 401, 600));
}

#[test]
fn droptail_packet_mode_rejects_when_full_and_preserves_order() {
    let mut q = DropTailQueue::new(QueueSize::packets(2));
    assert!(q.is_empty());
    assert!(q.enqueue(pkt(1, 100)).is_ok());
    assert!(q.enqueue(pkt(2, 200)).is_ok());
    assert_eq!(q.len(), 2);
    assert_eq!(q.bytes(), 300);

    let dropped = q.enqueue(pkt(3, 50)).expect_err("should drop");
    assert_eq!(dropped.id, 3);
    assert_eq!(q.dropped_pkts(), 1);
    assert_eq!(q.dropped_bytes(), 50);
    assert_eq!(q.len(), 2);

    assert_eq!(q.peek().expect("pkt").id, 1);
    assert_eq!(q.dequeue().expect("pkt").id, 1);
    assert_eq!(q.dequeue().expect("pkt").id, 2);
    assert!(q.dequeue().is_none());
    assert_eq!(q.bytes(), 0);
}

#[test]
fn droptail_byte_mode_admits_by_size() {
    let mut q = DropTailQueue::new(QueueSize::bytes(1000));
    assert!(q.enqueue(pkt(1, 600)).is_ok());
    assert!(q.enqueue(pkt(2, 500)).is_err());
    assert!(q.enqueue(pkt(3, 400)).is_ok());
    assert_eq!(q.bytes(), 1000);
    assert_eq!(q.max_size(), QueueSize::bytes(1000));
}
