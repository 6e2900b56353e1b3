//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cycore::{
    ContainerEngine, CycoreError, CycoreOptions, CycoreResult, ExportSink, ImageRef,
    KeyValueStore, SandboxPolicy, StaticStore, StdioMode,
};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

pub const INSTANCE: &str = "vm42";

/// The four launch keys for `INSTANCE`.
pub fn vm42_store() -> Arc<StaticStore> {
    Arc::new(StaticStore::from_iter([
        ("/kvm/vm42/ram", "4096"),
        ("/kvm/vm42/mac", "52:54:00:12:34:56"),
        ("/kvm/vm42/rbd", "pool/vm42"),
        ("/kvm/vm42/spice_port", "5901"),
    ]))
}

/// Store that answers every lookup after `delay`.
pub struct DelayedStore {
    pub inner: StaticStore,
    pub delay: Duration,
}

#[async_trait]
impl KeyValueStore for DelayedStore {
    async fn get(&self, key: &str) -> CycoreResult<Option<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }
}

/// Minimal image filesystem with the QEMU entrypoint.
pub fn qemu_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut dir = tar::Header::new_gnu();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_size(0);
    dir.set_mode(0o755);
    dir.set_cksum();
    builder.append_data(&mut dir, "usr/local/bin/", &[][..]).unwrap();

    let script = b"#!/bin/bash\nbrctl show \"$BRIDGE_IF\"\nexec /usr/bin/qemu-system-x86_64 -enable-kvm \"$@\"\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, "usr/local/bin/entrypoint.sh", &script[..])
        .unwrap();

    builder.into_inner().unwrap()
}

/// Engine that serves `qemu_archive()` and records every call.
#[derive(Default)]
pub struct FakeEngine {
    pub fail_pull: bool,
    pub fail_remove: bool,
    /// Sleep before streaming the archive.
    pub export_delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Wait up to two seconds for `call` to be recorded.
    pub async fn wait_for_call(&self, call: &str) -> bool {
        for _ in 0..100 {
            if self.calls.lock().iter().any(|c| c == call) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn pull(&self, image: &ImageRef) -> CycoreResult<()> {
        self.calls.lock().push(format!("pull {}", image));
        if self.fail_pull {
            return Err(CycoreError::Engine("manifest unknown".into()));
        }
        Ok(())
    }

    async fn create(&self, name: &str, _image: &ImageRef, _entrypoint: &str) -> CycoreResult<String> {
        self.calls.lock().push(format!("create {}", name));
        Ok("3f2a9c".into())
    }

    async fn export(&self, id: &str, mut sink: ExportSink) -> CycoreResult<()> {
        self.calls.lock().push(format!("export {}", id));
        if let Some(delay) = self.export_delay {
            tokio::time::sleep(delay).await;
        }
        sink.write_all(&qemu_archive()).await?;
        sink.shutdown().await?;
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> CycoreResult<()> {
        self.calls.lock().push(format!("remove {} {}", id, force));
        if self.fail_remove {
            return Err(CycoreError::Engine("removal already in progress".into()));
        }
        Ok(())
    }
}

/// Options for `INSTANCE` extracting into `target`, with `program` standing
/// in for systemd-nspawn.
pub fn options(target: &Path, program: &str) -> CycoreOptions {
    let mut opts = CycoreOptions::new(INSTANCE);
    opts.target_path = target.to_path_buf();
    opts.stdio = StdioMode::Log;
    opts.policy = SandboxPolicy {
        program: program.into(),
        ..SandboxPolicy::default()
    };
    opts
}
