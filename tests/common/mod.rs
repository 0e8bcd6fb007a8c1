#![allow(dead_code)]

use async_trait::async_trait;
use sign_flow::infrastructure::{LocalFileStore, MemoryStore, MergeEngine, SidecarMergeEngine};
use sign_flow::{App, Config, Document, SignError, SignPlacement, SignResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// 可以切换成失败的合并引擎
pub struct FlakyMerge {
    inner: SidecarMergeEngine,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyMerge {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MergeEngine for FlakyMerge {
    async fn merge(
        &self,
        doc_id: &str,
        base_path: &str,
        sign_area: &[SignPlacement],
    ) -> SignResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SignError::merge_failed(doc_id, "模拟合并失败"));
        }
        self.inner.merge(doc_id, base_path, sign_area).await
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub app: App,
    pub merge: Arc<FlakyMerge>,
}

pub fn harness(enforce_signer_completion: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        upload_dir: dir.path().join("docs"),
        state_file: None,
        enforce_signer_completion,
        ..Default::default()
    };

    let merge = Arc::new(FlakyMerge {
        inner: SidecarMergeEngine::new(config.signed_dir()),
        fail: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let files = Arc::new(LocalFileStore::new(&config.upload_dir));
    let app = App::assemble(config, Arc::new(MemoryStore::new()), files, merge.clone());

    Harness { dir, app, merge }
}

pub fn placement(page: u32, signer: &str) -> SignPlacement {
    SignPlacement {
        page,
        x: 10.0,
        y: 10.0,
        signer: signer.to_string(),
    }
}

pub async fn upload(h: &Harness) -> Document {
    h.app
        .upload()
        .upload("合同.pdf", b"%PDF-1.4 test document", "C1")
        .await
        .unwrap()
}
