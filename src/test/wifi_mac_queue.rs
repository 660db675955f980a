use crate::net::Packet;
use crate::queue::{PacketQueue, QueueSize};
use crate::sim::SimTime;
use crate::wifi::{
    AddressType, DropPolicy, Mac48Address, MacDropReason, QosBlockedDestinations, WifiMacHeader,
    WifiMacQueue, WifiMacQueueItem,
};

fn sta(n: u64) -> Mac48Address {
    Mac48Address::from_index(n)
}

fn ap() -> Mac48Address {
    Mac48Address::from_index(0xaa)
}

fn qos(id: u64, to: u64, tid: u8) -> WifiMacQueueItem {
    WifiMacQueueItem::new(
        Packet::new(id, 0, 1000),
        WifiMacHeader::qos_data(sta(to), ap(), ap(), tid),
    )
}

fn mgmt(id: u64, to: u64) -> WifiMacQueueItem {
    WifiMacQueueItem::new(
        Packet::new(id, 0, 100),
        WifiMacHeader::non_qos(sta(to), ap(), ap()),
    )
}

fn ms(v: u64) -> SimTime {
    SimTime::from_millis(v)
}

#[test]
fn defaults_match_a_500_frame_500ms_queue() {
    let q = WifiMacQueue::new();
    assert_eq!(q.max_size(), QueueSize::packets(500));
    assert_eq!(q.max_delay(), ms(500));
    assert_eq!(q.drop_policy(), DropPolicy::DropNewest);
    assert!(q.is_empty());
}

#[test]
fn push_stamps_items_and_pop_preserves_order() {
    let mut q = WifiMacQueue::new();
    q.push_back(qos(1, 1, 0), ms(1)).expect("room");
    q.push_back(qos(2, 1, 0), ms(2)).expect("room");
    q.push_front(qos(3, 1, 0), ms(3)).expect("room");

    let head = q.peek_front(ms(3)).expect("head");
    assert_eq!(head.packet().id, 3);
    assert_eq!(head.timestamp(), ms(3));
    assert_eq!(q.len(), 3);
    assert_eq!(q.n_bytes(), 3000);

    let ids: Vec<u64> = std::iter::from_fn(|| q.pop_front(ms(4)))
        .map(|it| it.packet().id)
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert_eq!(q.n_bytes(), 0);
    assert_eq!(q.stats().n_total_dequeued_packets, 3);
}

#[test]
fn item_expires_exactly_at_lifetime() {
    let mut q = WifiMacQueue::new().with_max_delay(ms(10));
    q.push_back(qos(1, 1, 0), ms(100)).expect("room");

    assert!(q.peek_front(SimTime(ms(110).0 - 1)).is_some());
    assert!(q.peek_front(ms(110)).is_none());
    assert!(q.is_empty());
    assert_eq!(q.stats().dropped_packets(MacDropReason::Expired), 1);
}

#[test]
fn queue_with_500ms_lifetime_is_empty_when_queried_at_600ms() {
    let mut q = WifiMacQueue::new().with_max_delay(ms(500));
    for id in 0..3 {
        q.push_back(qos(id, 1, 0), SimTime::ZERO).expect("room");
    }
    assert_eq!(q.len(), 3);

    assert!(q.pop_front(ms(600)).is_none());
    assert!(q.is_empty());
    assert_eq!(q.stats().dropped_packets(MacDropReason::Expired), 3);
    assert_eq!(q.stats().n_total_dequeued_packets, 0);
}

#[test]
fn cleanup_stops_at_the_first_live_item() {
    let mut q = WifiMacQueue::new().with_max_delay(ms(100));
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(50)).expect("room");
    q.push_back(qos(3, 1, 0), ms(60)).expect("room");

    assert_eq!(q.peek_front(ms(120)).expect("live").packet().id, 2);
    assert_eq!(q.len(), 2);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Expired), 1);
}

#[test]
fn drop_newest_rejects_the_arriving_item() {
    let mut q = WifiMacQueue::new().with_max_size(QueueSize::packets(2));
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("room");
    let rejected = q.push_back(qos(3, 1, 0), ms(0)).expect_err("full");
    assert_eq!(rejected.packet().id, 3);

    assert_eq!(q.len(), 2);
    assert_eq!(q.peek_front(ms(0)).expect("head").packet().id, 1);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Overflow), 1);
}

#[test]
fn drop_oldest_evicts_the_front_item() {
    let mut q = WifiMacQueue::new()
        .with_max_size(QueueSize::packets(2))
        .with_drop_policy(DropPolicy::DropOldest);
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("room");
    q.push_back(qos(3, 1, 0), ms(0)).expect("oldest is evicted");

    let ids: Vec<u64> = std::iter::from_fn(|| q.pop_front(ms(1)))
        .map(|it| it.packet().id)
        .collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Overflow), 1);
}

#[test]
fn drop_oldest_push_front_replaces_the_old_front() {
    let mut q = WifiMacQueue::new()
        .with_max_size(QueueSize::packets(2))
        .with_drop_policy(DropPolicy::DropOldest);
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("room");
    q.push_front(qos(3, 1, 0), ms(0)).expect("oldest is evicted");

    assert_eq!(q.len(), 2);
    assert_eq!(q.peek_front(ms(1)).map(|it| it.packet().id), Some(3));
    assert_eq!(q.stats().dropped_packets(MacDropReason::Overflow), 1);

    let ids: Vec<u64> = std::iter::from_fn(|| q.pop_front(ms(1)))
        .map(|it| it.packet().id)
        .collect();
    assert_eq!(ids, vec![3, 2]);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Overflow), 1);
}

#[test]
fn expired_items_free_room_before_the_drop_policy_applies() {
    let mut q = WifiMacQueue::new()
        .with_max_size(QueueSize::packets(1))
        .with_max_delay(ms(10));
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(10)).expect("old item expired");
    assert_eq!(q.stats().dropped_packets(MacDropReason::Expired), 1);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Overflow), 0);
}

#[test]
fn selective_dequeue_by_tid_and_address() {
    let mut q = WifiMacQueue::new();
    q.push_back(mgmt(1, 2), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("room");
    q.push_back(qos(3, 2, 5), ms(0)).expect("room");
    q.push_back(qos(4, 2, 0), ms(0)).expect("room");

    let peeked = q
        .peek_by_tid_and_address(0, AddressType::Addr1, sta(2), ms(1))
        .expect("match")
        .packet()
        .id;
    assert_eq!(peeked, 4);
    assert_eq!(q.len(), 4);

    assert_eq!(
        q.count_by_tid_and_address(0, AddressType::Addr1, sta(2), ms(1)),
        1
    );
    assert_eq!(
        q.count_by_tid_and_address(0, AddressType::Addr2, ap(), ms(1)),
        2
    );

    let got = q
        .dequeue_by_tid_and_address(0, AddressType::Addr1, sta(2), ms(1))
        .expect("match");
    assert_eq!(got.packet().id, 4);
    assert_eq!(got.address(AddressType::Addr1), sta(2));
    assert!(q
        .dequeue_by_tid_and_address(0, AddressType::Addr1, sta(2), ms(1))
        .is_none());
    // non-QoS frames never match a TID query
    assert!(q
        .dequeue_by_tid_and_address(0, AddressType::Addr1, sta(9), ms(1))
        .is_none());
    assert_eq!(q.len(), 3);
}

#[test]
fn selective_scan_drops_expired_items_it_passes() {
    let mut q = WifiMacQueue::new().with_max_delay(ms(100));
    q.push_back(qos(1, 1, 0), ms(50)).expect("room");
    q.push_back(qos(2, 2, 0), ms(0)).expect("room");
    q.push_back(qos(3, 3, 0), ms(60)).expect("room");

    // item 2 is expired but sits behind a live head
    let got = q.dequeue_by_tid_and_address(0, AddressType::Addr1, sta(3), ms(120));
    assert_eq!(got.expect("match").packet().id, 3);
    assert_eq!(q.len(), 1);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Expired), 1);
}

#[test]
fn first_available_skips_blocked_destinations() {
    let mut q = WifiMacQueue::new();
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 3), ms(0)).expect("room");
    q.push_back(mgmt(3, 1), ms(0)).expect("room");

    let mut blocked = QosBlockedDestinations::new();
    blocked.block(sta(1), 0);
    blocked.block(sta(1), 3);

    assert_eq!(
        q.peek_first_available(&blocked, ms(1))
            .expect("non-QoS frame is never blocked")
            .packet()
            .id,
        3
    );
    assert_eq!(
        q.dequeue_first_available(&blocked, ms(1))
            .expect("mgmt")
            .packet()
            .id,
        3
    );
    assert!(q.dequeue_first_available(&blocked, ms(1)).is_none());

    blocked.unblock(sta(1), 3);
    assert_eq!(
        q.dequeue_first_available(&blocked, ms(1))
            .expect("tid 3 unblocked")
            .packet()
            .id,
        2
    );
    assert_eq!(q.len(), 1);
}

#[test]
fn peeks_are_idempotent() {
    let mut q = WifiMacQueue::new();
    q.push_back(qos(1, 1, 2), ms(0)).expect("room");
    let blocked = QosBlockedDestinations::new();
    for _ in 0..3 {
        assert_eq!(q.peek_front(ms(1)).expect("head").packet().id, 1);
        assert_eq!(
            q.peek_first_available(&blocked, ms(1))
                .expect("head")
                .packet()
                .id,
            1
        );
    }
    assert_eq!(q.len(), 1);
    assert_eq!(q.stats().n_total_dequeued_packets, 0);
}

#[test]
fn remove_and_remove_packet() {
    let mut q = WifiMacQueue::new();
    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("room");
    q.push_back(qos(3, 1, 0), ms(0)).expect("room");

    let head = q
        .peek_by_tid_and_address(0, AddressType::Addr1, sta(1), ms(0))
        .cloned()
        .expect("head");
    assert!(q.remove(&head));
    assert!(!q.remove(&head));
    assert!(q.remove_packet(&Packet::new(3, 0, 1000)));
    assert!(!q.remove_packet(&Packet::new(42, 0, 1000)));

    assert_eq!(q.len(), 1);
    assert_eq!(q.pop_front(ms(0)).expect("left").packet().id, 2);
    assert_eq!(q.stats().n_total_removed_packets, 2);
}

#[test]
fn flush_drops_everything() {
    let mut q = WifiMacQueue::new();
    for id in 0..4 {
        q.push_back(qos(id, 1, 0), ms(0)).expect("room");
    }
    assert_eq!(q.flush(), 4);
    assert!(q.is_empty());
    assert_eq!(q.n_bytes(), 0);
    assert_eq!(q.stats().dropped_packets(MacDropReason::Flushed), 4);
}

#[test]
fn setters_change_limits() {
    let mut q = WifiMacQueue::new();
    q.set_max_size(QueueSize::bytes(1500));
    q.set_max_delay(ms(20));
    q.set_drop_policy(DropPolicy::DropOldest);
    assert_eq!(q.max_size(), QueueSize::bytes(1500));
    assert_eq!(q.max_delay(), ms(20));

    q.push_back(qos(1, 1, 0), ms(0)).expect("room");
    q.push_back(qos(2, 1, 0), ms(0)).expect("evicts 1");
    assert_eq!(q.len(), 1);
    assert_eq!(q.n_bytes(), 1000);
}

#[test]
#[should_panic(expected = "forbids the use of enqueue()")]
fn generic_enqueue_is_forbidden() {
    let mut q = WifiMacQueue::new();
    let _ = <WifiMacQueue as PacketQueue<WifiMacQueueItem>>::enqueue(&mut q, qos(1, 1, 0));
}

#[test]
#[should_panic(expected = "forbids the use of dequeue()")]
fn generic_dequeue_is_forbidden() {
    let mut q = WifiMacQueue::new();
    let _ = <WifiMacQueue as PacketQueue<WifiMacQueueItem>>::dequeue(&mut q);
}

#[test]
#[should_panic(expected = "forbids the use of peek()")]
fn generic_peek_is_forbidden() {
    let q = WifiMacQueue::new();
    let _ = <WifiMacQueue as PacketQueue<WifiMacQueueItem>>::peek(&q);
}

#[test]
fn mac_address_display_and_header_roles() {
    assert_eq!(sta(0x0102).to_string(), "00:00:00:00:01:02");
    assert_eq!(Mac48Address::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");

    let h = WifiMacHeader::qos_data(sta(1), sta(2), sta(3), 0x1f);
    assert_eq!(h.qos_tid, Some(0x0f));
    assert!(h.is_qos_data());
    assert_eq!(h.address(AddressType::Addr2), sta(2));
    assert!(!WifiMacHeader::non_qos(sta(1), sta(2), sta(3)).is_qos_data());
}
