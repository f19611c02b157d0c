use std::io::Write;

use tests_integration::tool::{BuildpacketTool, PacketRequest};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon about";
const ICA_ADDRESS: &str = "lumera1qqqsyqcyq5rqwzqfpg9scrgwpugpzysnzs23v9ccrydpk8qarc0saetzqx";

fn payload() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
    file.write_all(&data).unwrap();
    file
}

#[test_log::test]
fn missing_file_flag_is_reported_without_output() {
    let tool = BuildpacketTool::compiled().unwrap();
    let output = tool
        .run(&[
            "--mnemonic",
            MNEMONIC,
            "--ica-address",
            ICA_ADDRESS,
            "--grpc-addr",
            "localhost:9090",
            "--chain-id",
            "lumera-testnet-2",
        ])
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("--file"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test_log::test]
fn blank_flag_counts_as_missing() {
    let tool = BuildpacketTool::compiled().unwrap();
    let output = tool.run(&["--mnemonic", "   "]).unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("buildpacket: --mnemonic is required"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test_log::test]
fn unreachable_grpc_endpoint_is_a_connectivity_failure() {
    let tool = BuildpacketTool::compiled().unwrap();
    let file = payload();
    let request = PacketRequest {
        mnemonic: MNEMONIC,
        ica_address: ICA_ADDRESS,
        grpc_addr: "127.0.0.1:1",
        chain_id: "lumera-testnet-2",
        file: file.path(),
        owner_hrp: "osmo",
    };

    let output = tool.run(&request.args()).unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr.contains("buildpacket: failed to connect to gRPC endpoint `http://127.0.0.1:1`"),
        "stderr: {stderr}"
    );
    assert!(output.stdout.is_empty());
}

#[test_log::test]
fn malformed_mnemonic_is_rejected_before_connecting() {
    let tool = BuildpacketTool::compiled().unwrap();
    let file = payload();
    let request = PacketRequest {
        mnemonic: "abandon abandon",
        ica_address: ICA_ADDRESS,
        grpc_addr: "127.0.0.1:1",
        chain_id: "lumera-testnet-2",
        file: file.path(),
        owner_hrp: "osmo",
    };

    let output = tool.run(&request.args()).unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("import key from mnemonic"), "stderr: {stderr}");
    assert!(!stderr.contains("failed to connect"));
}

#[test]
fn help_exits_successfully() {
    let tool = BuildpacketTool::compiled().unwrap();
    let output = tool.run(&["--help"]).unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--ica-address"));
}

#[test]
fn binary_is_compiled_once_across_threads() {
    let handles: Vec<_> = (0..2)
        .map(|_| std::thread::spawn(|| BuildpacketTool::compiled().unwrap()))
        .collect();
    let tools: Vec<&'static BuildpacketTool> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(std::ptr::eq(tools[0], tools[1]));
    assert!(std::ptr::eq(tools[0], BuildpacketTool::compiled().unwrap()));
    assert!(tools[0].path().is_file());
}

#[test]
fn unknown_flag_is_reported_like_any_failure() {
    let tool = BuildpacketTool::compiled().unwrap();
    let output = tool.run(&["--no-such-flag"]).unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.starts_with("buildpacket: "), "stderr: {stderr}");
    assert!(stderr.contains("--no-such-flag"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}
