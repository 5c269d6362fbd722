//! Fatal paths: every one must fail with the right phase and leave no
//! output behind.

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use zerocopy::AsBytes;

use netsort_core::wire::{encode, Control};

use crate::*;

fn assert_no_output(path: &Path) {
    assert!(!path.exists(), "{} left behind", path.display());
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    assert!(!Path::new(&partial).exists(), "partial output left behind");
}

/// Stand in for node 1 of a two-node cluster: swallow node 0's stream and
/// send it `payload` instead of a well-formed one.
async fn fake_peer(cluster: &Cluster, payload: Vec<u8>) {
    let own = cluster.topology.peer(1).unwrap().addr();
    let target = cluster.topology.peer(0).unwrap().addr();
    let listener = TcpListener::bind(&own).await.unwrap();

    tokio::spawn(async move {
        if let Ok((mut inbound, _)) = listener.accept().await {
            let _ = tokio::io::copy(&mut inbound, &mut tokio::io::sink()).await;
        }
    });

    tokio::spawn(async move {
        let mut stream = loop {
            match TcpStream::connect(&target).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        let _ = stream.write_all(&payload).await;
        let _ = stream.shutdown().await;
    });
}

#[tokio::test]
async fn test_malformed_input_fails_before_dialing() {
    let cluster = Cluster::new("malformed", &[Vec::new(), Vec::new()]).unwrap();
    std::fs::write(&cluster.inputs[0], vec![0u8; 250]).unwrap();

    // Node 1 never runs; a node that got past input validation would sit
    // in the dial loop instead of failing straight away.
    let mut results = within(cluster.run_nodes([0])).await;
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, ShuffleError::MalformedInput { len: 250, .. }), "{err}");
    assert_eq!(err.phase(), "input");
    assert_no_output(&cluster.outputs[0]);
}

#[tokio::test]
async fn test_unreachable_peer_exhausts_dial_attempts() {
    let cluster = Cluster::new("unreachable", &[random_records(10, 5), Vec::new()]).unwrap();

    let mut config = test_config();
    config.network.max_dial_attempts = 3;
    let session = NodeSession::new(0, cluster.topology.clone(), config).unwrap();

    let err = within(session.run(&cluster.inputs[0], &cluster.outputs[0]))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ShuffleError::Dial { node: 1, attempts: 3, .. }),
        "{err}"
    );
    assert_eq!(err.phase(), "dial");
    assert_no_output(&cluster.outputs[0]);
}

#[tokio::test]
async fn test_peer_closing_mid_frame_is_fatal() {
    let cluster = Cluster::new("truncated", &[random_records(20, 6), Vec::new()]).unwrap();

    let record = random_records(1, 9)[0];
    let mut payload = encode(Control::Data, &record).as_bytes().to_vec();
    payload.extend_from_slice(&[0u8; 40]);
    fake_peer(&cluster, payload).await;

    let mut results = within(cluster.run_nodes([0])).await;
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, ShuffleError::Truncated { .. }), "{err}");
    assert_eq!(err.phase(), "read");
    assert_no_output(&cluster.outputs[0]);
}

#[tokio::test]
async fn test_unknown_control_byte_is_fatal() {
    let cluster = Cluster::new("bad-control", &[random_records(20, 7), Vec::new()]).unwrap();
    fake_peer(&cluster, vec![7u8; 101]).await;

    let mut results = within(cluster.run_nodes([0])).await;
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, ShuffleError::Decode { .. }), "{err}");
    assert_eq!(err.phase(), "decode");
    assert_no_output(&cluster.outputs[0]);
}

#[tokio::test]
async fn test_peer_closing_without_end_of_stream_is_fatal() {
    let cluster = Cluster::new("no-eos", &[Vec::new(), Vec::new()]).unwrap();

    let record = random_records(1, 10)[0];
    fake_peer(&cluster, encode(Control::Data, &record).as_bytes().to_vec()).await;

    let mut results = within(cluster.run_nodes([0])).await;
    let err = results.remove(0).unwrap_err();
    assert!(matches!(err, ShuffleError::Truncated { .. }), "{err}");
    assert_no_output(&cluster.outputs[0]);
}
