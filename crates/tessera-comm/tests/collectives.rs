//! Integration tests for process groups over the thread-per-rank transport.

use tessera_comm::{CommError, LocalCluster, PhaseTag, ProcessGroup};
use tessera_matrix::{DenseBlock, SparseMatrix};

fn run<T: Send>(size: usize, f: impl Fn(ProcessGroup) -> T + Sync) -> Vec<T> {
    LocalCluster::new(size).unwrap().run(f).unwrap()
}

#[test]
fn test_send_receive_pair() {
    let received = run(2, |group| {
        if group.rank() == 0 {
            group.send(SparseMatrix::identity(3), 1, PhaseTag::Scatter).unwrap();
            None
        } else {
            Some(group.receive::<SparseMatrix>(0, PhaseTag::Scatter).unwrap())
        }
    });
    assert_eq!(received[1], Some(SparseMatrix::identity(3)));
}

#[test]
fn test_messages_arrive_in_send_order() {
    let received = run(2, |group| {
        if group.rank() == 0 {
            for i in 0..10usize {
                group.send(i, 1, PhaseTag::Setup).unwrap();
            }
            Vec::new()
        } else {
            (0..10)
                .map(|_| group.receive::<usize>(0, PhaseTag::Setup).unwrap())
                .collect()
        }
    });
    assert_eq!(received[1], (0..10).collect::<Vec<_>>());
}

#[test]
fn test_broadcast_reaches_every_rank() {
    let values = run(5, |group| {
        let value = group.is_root().then_some(42usize);
        group.broadcast(value, 0, PhaseTag::Setup).unwrap()
    });
    assert_eq!(values, vec![42; 5]);
}

#[test]
fn test_broadcast_from_non_root() {
    let values = run(4, |group| {
        let value = (group.rank() == 2).then(|| DenseBlock::zeros(4, 3, 1, 2));
        group
            .broadcast_framed(value, 2, PhaseTag::ReplicateB)
            .unwrap()
            .column_base()
    });
    assert_eq!(values, vec![1; 4]);
}

#[test]
fn test_gather_in_rank_order() {
    let gathered = run(4, |group| {
        group
            .gather(group.rank() as u64 * 3, 1, PhaseTag::CountGe)
            .unwrap()
    });
    assert_eq!(gathered[1], Some(vec![0, 3, 6, 9]));
    assert!(gathered[0].is_none());
    assert!(gathered[3].is_none());
}

#[test]
fn test_split_preserves_parent_order() {
    let groups = run(6, |world| {
        let group = world.split(world.rank() % 2).unwrap();
        (group.rank(), group.members().to_vec())
    });
    assert_eq!(groups[0], (0, vec![0, 2, 4]));
    assert_eq!(groups[3], (1, vec![1, 3, 5]));
    assert_eq!(groups[4], (2, vec![0, 2, 4]));
}

#[test]
fn test_nested_split() {
    let groups = run(8, |world| {
        let half = world.split(world.rank() / 4).unwrap();
        let quarter = half.split(half.rank() / 2).unwrap();
        quarter.members().to_vec()
    });
    assert_eq!(groups[0], vec![0, 1]);
    assert_eq!(groups[5], vec![4, 5]);
    assert_eq!(groups[7], vec![6, 7]);
}

#[test]
fn test_subgroup_broadcast_is_isolated() {
    let values = run(6, |world| {
        let group = world.split(world.rank() / 3).unwrap();
        let value = group.is_root().then(|| world.rank());
        group.broadcast(value, 0, PhaseTag::Setup).unwrap()
    });
    assert_eq!(values, vec![0, 0, 0, 3, 3, 3]);
}

#[test]
fn test_ring_shift_with_odd_size() {
    let received = run(5, |group| {
        let size = group.size();
        let next = (group.rank() + 1) % size;
        let prev = (group.rank() + size - 1) % size;
        if group.rank() % 2 == 0 {
            group.send(group.rank(), next, PhaseTag::Rotate).unwrap();
            group.receive::<usize>(prev, PhaseTag::Rotate).unwrap()
        } else {
            let value = group.receive::<usize>(prev, PhaseTag::Rotate).unwrap();
            group.send(group.rank(), next, PhaseTag::Rotate).unwrap();
            value
        }
    });
    assert_eq!(received, vec![4, 0, 1, 2, 3]);
}

#[test]
fn test_phase_mismatch_detected() {
    let results = run(2, |group| {
        if group.rank() == 0 {
            group.send(1usize, 1, PhaseTag::Setup).map(|_| 0)
        } else {
            group.receive::<usize>(0, PhaseTag::Scatter)
        }
    });
    assert!(matches!(
        results[1],
        Err(CommError::PhaseMismatch {
            peer: 0,
            expected: PhaseTag::Scatter,
            found: PhaseTag::Setup
        })
    ));
}

#[test]
fn test_payload_type_mismatch_detected() {
    let results = run(2, |group| {
        if group.rank() == 0 {
            group.send(1usize, 1, PhaseTag::CountGe).map(|_| 0)
        } else {
            group.receive::<u64>(0, PhaseTag::CountGe)
        }
    });
    assert!(matches!(
        results[1],
        Err(CommError::UnexpectedPayload { .. })
    ));
}

#[test]
fn test_self_message_rejected() {
    let results = run(2, |group| group.send(1usize, group.rank(), PhaseTag::Setup));
    assert!(matches!(results[0], Err(CommError::SelfMessage(0))));
    assert!(matches!(results[1], Err(CommError::SelfMessage(1))));
}

#[test]
fn test_invalid_rank_rejected() {
    let results = run(1, |group| group.receive::<usize>(3, PhaseTag::Setup));
    assert!(matches!(
        results[0],
        Err(CommError::InvalidRank { rank: 3, size: 1 })
    ));
}

#[test]
fn test_abort_releases_waiting_ranks() {
    let results = run(3, |group| {
        if group.is_root() {
            group.abort("input unreadable", PhaseTag::Setup).map(|_| 0)
        } else {
            group.broadcast::<usize>(None, 0, PhaseTag::Setup)
        }
    });
    assert!(results[0].is_ok());
    for result in &results[1..] {
        match result {
            Err(CommError::Aborted { peer: 0, reason }) => assert_eq!(reason, "input unreadable"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

#[test]
fn test_exited_peer_reports_disconnect() {
    let results = run(2, |group| {
        if group.rank() == 0 {
            Ok(0)
        } else {
            group.receive::<usize>(0, PhaseTag::GatherRoot)
        }
    });
    assert!(matches!(
        results[1],
        Err(CommError::Disconnected {
            peer: 0,
            tag: PhaseTag::GatherRoot
        })
    ));
}

#[test]
fn test_panicking_rank_is_reported() {
    let cluster = LocalCluster::new(3).unwrap();
    let result = cluster.run(|group| {
        if group.rank() == 1 {
            panic!("rank failure");
        }
        group.receive::<usize>(1, PhaseTag::Rotate).is_err()
    });
    assert!(matches!(result, Err(CommError::RankPanicked(1))));
}
