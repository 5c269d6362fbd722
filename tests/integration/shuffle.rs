//! End-to-end shuffle-sort runs on loopback.

use zerocopy::AsBytes;

use netsort_core::record::{KEY_SIZE, VALUE_SIZE};
use netsort_core::Record;

use crate::*;

fn multiset(records: impl IntoIterator<Item = Record>) -> Vec<Vec<u8>> {
    let mut all: Vec<Vec<u8>> = records.into_iter().map(|r| r.as_bytes().to_vec()).collect();
    all.sort();
    all
}

fn assert_sorted_and_owned(cluster: &Cluster) {
    let partitioner = cluster.topology.partitioner();
    for (node, path) in cluster.outputs.iter().enumerate() {
        let records = read_records(path);
        assert!(
            records.windows(2).all(|w| w[0].key <= w[1].key),
            "node {node} output not sorted"
        );
        for r in &records {
            assert_eq!(partitioner.owner(&r.key), node, "foreign key in node {node} output");
        }
    }
}

/// Four nodes, 100 records each: the concatenated outputs equal a local
/// sort of the concatenated inputs, byte for byte.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_four_nodes_match_local_sort() {
    let shards: Vec<Vec<Record>> = (0..4).map(|i| random_records(100, 40 + i)).collect();
    let cluster = Cluster::new("four", &shards).unwrap();

    let results = within(cluster.run()).await;
    for (node, result) in results.iter().enumerate() {
        let report = result.as_ref().unwrap_or_else(|e| panic!("node {node}: {e}"));
        assert_eq!(report.records_read, 100);
        assert_eq!(report.received_per_stream.len(), 3);
    }

    assert_eq!(cluster.output_bytes(), cluster.expected_bytes());
    assert_sorted_and_owned(&cluster);

    let written: u64 = results.iter().map(|r| r.as_ref().unwrap().records_written).sum();
    assert_eq!(written, 400);
}

/// A node with nothing to send still ends every outbound stream, and a
/// node with an empty shard still completes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_local_and_empty_shards_complete() {
    // Node 0 of 4 owns first bytes 0x00..=0x3f.
    let local_only: Vec<Record> = (0..50u8)
        .map(|i| {
            let mut key = [i; KEY_SIZE];
            key[0] = i % 0x40;
            Record::new(key, [i; VALUE_SIZE])
        })
        .collect();
    let shards = vec![local_only, Vec::new(), random_records(80, 2), random_records(80, 3)];
    let cluster = Cluster::new("degenerate", &shards).unwrap();

    let results = within(cluster.run()).await;
    let reports: Vec<_> = results
        .into_iter()
        .enumerate()
        .map(|(node, r)| r.unwrap_or_else(|e| panic!("node {node}: {e}")))
        .collect();

    assert_eq!(reports[0].records_local, 50);
    assert!(reports[0].sent_per_peer.iter().all(|&n| n == 0));
    assert_eq!(reports[1].records_read, 0);
    assert!(reports[1].sent_per_peer.iter().all(|&n| n == 0));
    for report in &reports {
        assert_eq!(report.received_per_stream.len(), 3);
    }

    assert_eq!(cluster.output_bytes(), cluster.expected_bytes());
}

/// Eight nodes with uneven shard sizes and duplicated records: nothing is
/// lost, created, or duplicated.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_eight_nodes_preserve_every_record() {
    let mut shards: Vec<Vec<Record>> = (0..8u64)
        .map(|i| random_records((i as usize) * 37, 800 + i))
        .collect();
    // The same record on two different nodes must arrive twice.
    let dup = shards[7][0];
    shards[3].push(dup);
    shards[5].push(dup);
    let cluster = Cluster::new("eight", &shards).unwrap();

    let results = within(cluster.run()).await;
    for (node, result) in results.iter().enumerate() {
        assert!(result.is_ok(), "node {node}: {:?}", result.as_ref().err());
    }

    let inputs = multiset(cluster.inputs.iter().flat_map(|p| read_records(p)));
    let outputs = multiset(cluster.outputs.iter().flat_map(|p| read_records(p)));
    assert_eq!(inputs, outputs);
    assert_sorted_and_owned(&cluster);
}

/// A one-node cluster never touches the network beyond its own listener.
#[tokio::test]
async fn test_single_node_sorts_locally() {
    let cluster = Cluster::new("single", &[random_records(250, 1)]).unwrap();

    let mut results = within(cluster.run()).await;
    let report = results.remove(0).unwrap();
    assert_eq!(report.records_local, 250);
    assert!(report.received_per_stream.is_empty());
    assert_eq!(report.sent_per_peer, vec![0]);

    assert_eq!(cluster.output_bytes(), cluster.expected_bytes());
}
