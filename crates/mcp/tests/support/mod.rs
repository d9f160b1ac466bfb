#![forbid(unsafe_code)]
#![allow(dead_code)]

use serde_json::Value;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub(crate) struct Server {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    storage_dir: PathBuf,
    next_id: i64,
}

impl Server {
    pub(crate) fn start(test_name: &str) -> Self {
        Self::start_with_args(test_name, &[])
    }

    pub(crate) fn start_with_args(test_name: &str, extra_args: &[&str]) -> Self {
        let storage_dir = temp_dir(test_name);
        let mut child = Command::new(env!("CARGO_BIN_EXE_rl_mcp"))
            .arg("--storage-dir")
            .arg(&storage_dir)
            .args(extra_args)
            .env_remove("RL_CONFIG")
            .env_remove("RL_STORAGE_DIR")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn rl_mcp");

        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));

        Self {
            child,
            stdin,
            stdout,
            storage_dir,
            next_id: 100,
        }
    }

    pub(crate) fn start_initialized(test_name: &str) -> Self {
        let mut server = Self::start(test_name);
        server.initialize_default();
        server
    }

    pub(crate) fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    pub(crate) fn send(&mut self, req: Value) {
        writeln!(self.stdin, "{req}").expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub(crate) fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{line}").expect("write raw line");
        self.stdin.flush().expect("flush raw line");
    }

    pub(crate) fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response");
        assert!(!line.trim().is_empty(), "empty response line");
        serde_json::from_str(&line).expect("parse response json")
    }

    pub(crate) fn request(&mut self, req: Value) -> Value {
        self.send(req);
        self.recv()
    }

    pub(crate) fn initialize_default(&mut self) {
        let _ = self.request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "0" } }
        }));
        self.send(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {}
        }));
    }

    /// Calls a tool and returns the decoded envelope.
    pub(crate) fn call(&mut self, name: &str, arguments: Value) -> Value {
        self.next_id += 1;
        let resp = self.request(json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }));
        extract_tool_text(&resp)
    }

    pub(crate) fn call_ok(&mut self, name: &str, arguments: Value) -> Value {
        let payload = self.call(name, arguments);
        assert_eq!(
            payload.get("success").and_then(|v| v.as_bool()),
            Some(true),
            "expected success, got {payload}"
        );
        payload.get("result").cloned().unwrap_or(Value::Null)
    }

    pub(crate) fn inventory(&mut self, user_id: i64, op: &str, args: Value) -> Value {
        self.call(
            "inventory",
            json!({ "user_id": user_id, "op": op, "args": args }),
        )
    }

    pub(crate) fn inventory_ok(&mut self, user_id: i64, op: &str, args: Value) -> Value {
        self.call_ok(
            "inventory",
            json!({ "user_id": user_id, "op": op, "args": args }),
        )
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.storage_dir);
    }
}

pub(crate) fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("rl_mcp_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub(crate) fn extract_tool_text(resp: &Value) -> Value {
    let text = resp
        .get("result")
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .expect("result.content[0].text");
    serde_json::from_str(text).expect("tool text is a json envelope")
}

pub(crate) fn error_code(payload: &Value) -> Option<&str> {
    payload
        .get("error")
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_str())
}

pub(crate) fn assert_json_rpc_error(resp: &Value, expected_code: i64) {
    let code = resp
        .get("error")
        .and_then(|v| v.get("code"))
        .and_then(|v| v.as_i64())
        .expect("error.code");
    assert_eq!(code, expected_code);
}

/// Ids created by [`seed_ledger`].
pub(crate) struct Ledger {
    pub(crate) admin: i64,
    pub(crate) lab_manager: i64,
    pub(crate) project_manager: i64,
    pub(crate) alice: i64,
    pub(crate) bob: i64,
    pub(crate) lab: i64,
    pub(crate) project: i64,
    pub(crate) acetone: i64,
    pub(crate) ethanol: i64,
}

fn id_of(result: &Value, object: &str) -> i64 {
    result
        .get(object)
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_i64())
        .unwrap_or_else(|| panic!("{object}.id missing in {result}"))
}

/// Bootstraps an admin and a small catalog: one laboratory, one managed project and
/// two reagents, with users for every role.
pub(crate) fn seed_ledger(server: &mut Server) -> Ledger {
    let admin = id_of(
        &server.call_ok("bootstrap", json!({ "username": "root" })),
        "user",
    );
    let add_user = |server: &mut Server, name: &str, role: &str| {
        id_of(
            &server.inventory_ok(admin, "user.add", json!({ "username": name, "role": role })),
            "user",
        )
    };
    let lab_manager = add_user(server, "lena", "lab_manager");
    let project_manager = add_user(server, "pat", "project_manager");
    let alice = add_user(server, "alice", "lab_worker");
    let bob = add_user(server, "bob", "lab_worker");

    let lab = id_of(
        &server.inventory_ok(lab_manager, "laboratory.add", json!({ "name": "Lab A" })),
        "laboratory",
    );
    let project = id_of(
        &server.inventory_ok(
            admin,
            "project.add",
            json!({ "name": "Synthesis", "manager_id": project_manager }),
        ),
        "project",
    );
    let acetone = id_of(
        &server.inventory_ok(
            lab_manager,
            "reagent.add",
            json!({ "name": "Acetone", "catalog_no": "A-100", "producer": "Sigma" }),
        ),
        "reagent",
    );
    let ethanol = id_of(
        &server.inventory_ok(
            lab_manager,
            "reagent.add",
            json!({ "name": "Ethanol", "catalog_no": "E-200" }),
        ),
        "reagent",
    );

    Ledger {
        admin,
        lab_manager,
        project_manager,
        alice,
        bob,
        lab,
        project,
        acetone,
        ethanol,
    }
}
