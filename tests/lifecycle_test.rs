mod common;

use chrono::{TimeZone, Utc};
use common::{harness, placement, upload};
use sign_flow::models::{DocumentFilter, ReleaseBasic, ReleaseOptions};
use sign_flow::{CompleteOutcome, DocStatus, ErrorKind, SignError, SignStatus};

fn basic(signers: &[&str]) -> ReleaseBasic {
    ReleaseBasic {
        title: Some("采购合同".to_string()),
        description: Some("请于本周内签署".to_string()),
        signers: Some(signers.iter().map(|s| s.to_string()).collect()),
    }
}

#[tokio::test]
async fn test_full_signing_scenario() {
    let h = harness(true);
    let d1 = upload(&h).await;
    assert_eq!(d1.status, DocStatus::Unpublished);
    assert_eq!(d1.name, "合同.pdf");

    let release = h.app.release();
    let doc = release.basic(&d1.id, basic(&["U1"])).await.unwrap();
    assert_eq!(doc.title.as_deref(), Some("采购合同"));
    assert_eq!(doc.status, DocStatus::Unpublished);

    let doc = release
        .sign_area(&d1.id, vec![placement(1, "U1")])
        .await
        .unwrap();
    assert_eq!(doc.sign_area, vec![placement(1, "U1")]);

    let doc = release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();
    assert_eq!(doc.status, DocStatus::Published);

    let signing = h.app.signing();
    let record = signing.begin(&d1.id, "U1").await.unwrap();
    assert_eq!(record.status, SignStatus::Pending);
    assert!(record.sign_time.is_none());

    match signing.complete(&d1.id, "U1").await.unwrap() {
        CompleteOutcome::Signed(record) => {
            assert_eq!(record.status, SignStatus::Signed);
            assert!(record.sign_time.is_some());
        }
        other => panic!("应该完成签署: {:?}", other),
    }

    let end_time = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    let doc = release.sign_end(&d1.id, end_time).await.unwrap();
    assert_eq!(doc.status, DocStatus::Ended);
    assert_eq!(doc.end_time, Some(end_time));

    let artifact = h.app.upload().signed_artifact(&d1.id).await.unwrap();
    assert!(artifact.exists());
}

#[tokio::test]
async fn test_complete_twice_is_noop() {
    let h = harness(true);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    let signing = h.app.signing();
    signing.begin(&d1.id, "U1").await.unwrap();

    let first = signing.complete(&d1.id, "U1").await.unwrap();
    let first_time = match first {
        CompleteOutcome::Signed(record) => record.sign_time.unwrap(),
        other => panic!("第一次应该签署成功: {:?}", other),
    };

    let second = signing.complete(&d1.id, "U1").await.unwrap();
    assert_eq!(second, CompleteOutcome::AlreadySigned);

    let record = signing.find_existing(&d1.id, "U1").await.unwrap().unwrap();
    assert_eq!(record.sign_time, Some(first_time));
    assert!(signing.is_signed(&d1.id, "U1").await.unwrap());
}

#[tokio::test]
async fn test_complete_without_begin_is_noop() {
    let h = harness(true);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    let outcome = h.app.signing().complete(&d1.id, "U9").await.unwrap();
    assert_eq!(outcome, CompleteOutcome::AlreadySigned);
    assert!(h
        .app
        .signing()
        .find_existing(&d1.id, "U9")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_confirm_rejected_after_publish_and_end() {
    let h = harness(false);
    let d1 = upload(&h).await;
    let release = h.app.release();

    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();
    let err = release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // 直接调用生命周期服务同样被拒绝
    let err = h
        .app
        .documents()
        .confirm_release(&d1.id, ReleaseOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    release.sign_end(&d1.id, Utc::now()).await.unwrap();
    let err = release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_status_never_moves_backward() {
    let h = harness(false);
    let d1 = upload(&h).await;
    let release = h.app.release();
    let documents = h.app.documents();

    // 未发布时不能直接结束
    let err = documents.finalize(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(
        documents.find_one(&d1.id).await.unwrap().status,
        DocStatus::Unpublished
    );

    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    // 发布后不能再修改设置
    let err = release.basic(&d1.id, basic(&["U2"])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = documents
        .set_sign_area(&d1.id, vec![placement(2, "U2")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let end_time = Utc::now();
    documents.finalize(&d1.id, end_time).await.unwrap();

    // 结束时间只设置一次
    let err = documents.finalize(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let doc = documents.find_one(&d1.id).await.unwrap();
    assert_eq!(doc.status, DocStatus::Ended);
    assert_eq!(doc.end_time, Some(end_time));
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let h = harness(true);
    let release = h.app.release();

    let err = release.basic("missing.pdf", basic(&[])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = release.sign_end("missing.pdf", Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h.app.documents().find_one("missing.pdf").await.unwrap_err();
    assert!(matches!(err, SignError::NotFound { .. }));

    let err = h.app.signing().begin("missing.pdf", "U1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(h.merge.calls(), 0);
}

#[tokio::test]
async fn test_begin_requires_published() {
    let h = harness(true);
    let d1 = upload(&h).await;

    let err = h.app.signing().begin(&d1.id, "U1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_begin_twice_is_duplicate_session() {
    let h = harness(true);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    h.app.signing().begin(&d1.id, "U1").await.unwrap();
    let err = h.app.signing().begin(&d1.id, "U1").await.unwrap_err();
    assert!(matches!(err, SignError::DuplicateSession { .. }));
}

#[tokio::test]
async fn test_repeat_sign_quota() {
    let h = harness(true);
    let d1 = upload(&h).await;
    let documents = h.app.documents();

    // 未发布的文档不允许补签
    let err = documents.repeat_sign(&d1.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);

    h.app
        .release()
        .confirm(
            &d1.id,
            ReleaseOptions {
                deadline: None,
                repeat_sign_limit: Some(1),
            },
        )
        .await
        .unwrap();

    let doc = documents.repeat_sign(&d1.id).await.unwrap();
    assert_eq!(doc.repeat_sign_remaining, 0);
    assert_eq!(doc.status, DocStatus::Published);
    assert_eq!(doc.sign_window, 1);

    let err = documents.repeat_sign(&d1.id).await.unwrap_err();
    assert!(matches!(err, SignError::QuotaExceeded { .. }));

    let doc = documents.find_one(&d1.id).await.unwrap();
    assert_eq!(doc.repeat_sign_remaining, 0);
    assert_eq!(doc.sign_window, 1);

    let err = documents.repeat_sign("missing.pdf").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_repeat_sign_opens_new_window_for_same_signer() {
    let h = harness(true);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(
            &d1.id,
            ReleaseOptions {
                deadline: None,
                repeat_sign_limit: Some(2),
            },
        )
        .await
        .unwrap();

    let signing = h.app.signing();
    signing.begin(&d1.id, "U1").await.unwrap();
    signing.complete(&d1.id, "U1").await.unwrap();
    assert!(signing.is_signed(&d1.id, "U1").await.unwrap());

    h.app.documents().repeat_sign(&d1.id).await.unwrap();

    assert!(!signing.is_signed(&d1.id, "U1").await.unwrap());
    let record = signing.begin(&d1.id, "U1").await.unwrap();
    assert_eq!(record.window, 1);
    assert!(matches!(
        signing.complete(&d1.id, "U1").await.unwrap(),
        CompleteOutcome::Signed(_)
    ));
}

#[tokio::test]
async fn test_merge_failure_is_retryable() {
    let h = harness(true);
    let d1 = upload(&h).await;
    let release = h.app.release();
    release.basic(&d1.id, basic(&["U1"])).await.unwrap();
    release
        .sign_area(&d1.id, vec![placement(1, "U1")])
        .await
        .unwrap();
    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();
    h.app.signing().begin(&d1.id, "U1").await.unwrap();
    h.app.signing().complete(&d1.id, "U1").await.unwrap();

    h.merge.set_failing(true);
    let err = release.sign_end(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Merge);
    assert!(err.is_retryable());

    let doc = h.app.documents().find_one(&d1.id).await.unwrap();
    assert_eq!(doc.status, DocStatus::Published);
    assert!(doc.end_time.is_none());

    h.merge.set_failing(false);
    let end_time = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
    let doc = release.sign_end(&d1.id, end_time).await.unwrap();
    assert_eq!(doc.status, DocStatus::Ended);
    assert_eq!(doc.end_time, Some(end_time));
    assert_eq!(h.merge.calls(), 2);
}

#[tokio::test]
async fn test_strict_sign_end_waits_for_all_signers() {
    let h = harness(true);
    let d1 = upload(&h).await;
    let release = h.app.release();
    release.basic(&d1.id, basic(&["U1"])).await.unwrap();
    release
        .sign_area(&d1.id, vec![placement(1, "U1"), placement(2, "U2")])
        .await
        .unwrap();
    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    let signing = h.app.signing();
    signing.begin(&d1.id, "U1").await.unwrap();
    signing.complete(&d1.id, "U1").await.unwrap();
    signing.begin(&d1.id, "U2").await.unwrap();

    let err = release.sign_end(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(err.to_string().contains("U2"));
    assert_eq!(h.merge.calls(), 0);

    let progress = signing.signing_progress(&d1.id).await.unwrap();
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].status, Some(SignStatus::Signed));
    assert_eq!(progress[1].status, Some(SignStatus::Pending));

    signing.complete(&d1.id, "U2").await.unwrap();
    let doc = release.sign_end(&d1.id, Utc::now()).await.unwrap();
    assert_eq!(doc.status, DocStatus::Ended);
}

#[tokio::test]
async fn test_lenient_sign_end_trusts_caller() {
    let h = harness(false);
    let d1 = upload(&h).await;
    let release = h.app.release();
    release.basic(&d1.id, basic(&["U1"])).await.unwrap();
    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    let doc = release.sign_end(&d1.id, Utc::now()).await.unwrap();
    assert_eq!(doc.status, DocStatus::Ended);
}

#[tokio::test]
async fn test_find_by_status_and_creator() {
    let h = harness(true);
    let d1 = upload(&h).await;
    let d2 = upload(&h).await;
    h.app
        .release()
        .confirm(&d2.id, ReleaseOptions::default())
        .await
        .unwrap();

    let documents = h.app.documents();
    let all = documents.find(&DocumentFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let unpublished = documents
        .find(&DocumentFilter {
            status: Some(DocStatus::Unpublished),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(unpublished.len(), 1);
    assert_eq!(unpublished[0].id, d1.id);

    let other = documents
        .find(&DocumentFilter {
            creator_id: Some("C2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_sign_end_requires_published_before_merge() {
    let h = harness(false);
    let d1 = upload(&h).await;
    let release = h.app.release();
    release
        .sign_area(&d1.id, vec![placement(1, "U1")])
        .await
        .unwrap();

    let err = release.sign_end(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(h.merge.calls(), 0);
    assert_eq!(
        h.app.documents().find_one(&d1.id).await.unwrap().status,
        DocStatus::Unpublished
    );

    // 没有留下合成文件
    let signed_dir = h.app.config().signed_dir();
    assert!(!signed_dir.join(&d1.id).exists());
    let err = h.app.upload().signed_artifact(&d1.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    release
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();
    let end_time = Utc.with_ymd_and_hms(2026, 10, 20, 8, 0, 0).unwrap();
    release.sign_end(&d1.id, end_time).await.unwrap();
    assert_eq!(h.merge.calls(), 1);

    // 已结束的文档不会再次合成
    let err = release.sign_end(&d1.id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(h.merge.calls(), 1);
    let doc = h.app.documents().find_one(&d1.id).await.unwrap();
    assert_eq!(doc.end_time, Some(end_time));
}

#[tokio::test]
async fn test_signed_artifact_waits_for_ended() {
    let h = harness(false);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    // 合成成功但结束失败时留下的文件不对外提供
    let signed_dir = h.app.config().signed_dir();
    std::fs::create_dir_all(&signed_dir).unwrap();
    std::fs::write(signed_dir.join(&d1.id), b"%PDF").unwrap();

    let err = h.app.upload().signed_artifact(&d1.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    h.app.release().sign_end(&d1.id, Utc::now()).await.unwrap();
    assert!(h.app.upload().signed_artifact(&d1.id).await.is_ok());
}

#[tokio::test]
async fn test_complete_after_end_is_rejected() {
    let h = harness(false);
    let d1 = upload(&h).await;
    h.app
        .release()
        .confirm(&d1.id, ReleaseOptions::default())
        .await
        .unwrap();

    let signing = h.app.signing();
    signing.begin(&d1.id, "U1").await.unwrap();
    h.app.release().sign_end(&d1.id, Utc::now()).await.unwrap();

    let err = signing.complete(&d1.id, "U1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let record = signing.find_existing(&d1.id, "U1").await.unwrap().unwrap();
    assert_eq!(record.status, SignStatus::Pending);
    assert!(record.sign_time.is_none());
}
