mod common;

use chrono::NaiveDate;
use common::{calls, oracle, silent_oracle, table, write, Called, CONTENT_LOSS, DIFFERENT, PASSED};
use docsync_core::cache::{ClassificationCache, ClassificationVerdict};
use docsync_core::contract::{MockRepoHost, RemoteFile};
use docsync_core::report::{Bucket, FileOutcome};
use docsync_core::stages::Stages;
use docsync_core::synchronise::BackwardSync;
use tempfile::tempdir;

const DOCS_PATH: &str = "sdk-docs/android/messages.md";
const PRIVATE_PATH: &str = "docs/messages.md";
const BRANCH: &str = "sync-back/20260115/messages";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn remote(content: &str, sha: &str) -> RemoteFile {
    RemoteFile {
        content: content.into(),
        sha: sha.into(),
    }
}

#[tokio::test]
async fn test_identical_content_makes_no_mutations() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        DOCS_PATH,
        "# Messages\n\n{% hint style=\"info\" %}\nCall `connect()` first.\n{% endhint %}\n",
    );

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .withf(|loc| loc.owner == "acme" && loc.repo == "sdk-android" && loc.path == PRIVATE_PATH && loc.reference == "develop")
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n\n> **Note:** Call `connect()` first.\n", "base-sha"))));
    host.expect_create_branch().never();
    host.expect_put_file().never();
    host.expect_open_pull_request().never();

    let table = table();
    let stages = Stages::default();
    let generator = silent_oracle();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert_eq!(report.count(Bucket::Skipped), 1);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_comparator_identical_verdict_makes_no_mutations() {
    let dir = tempdir().unwrap();
    write(dir.path(), DOCS_PATH, "# Messages\n\nYou must call `connect()` before sending.\n");

    let (generator, log) = oracle(|stage, _| {
        Ok(match stage {
            Called::Comparator => r#"{"identical": true, "reason": "same instruction, reworded"}"#.into(),
            other => panic!("{other:?} must not run once the comparator reports identical"),
        })
    });

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .withf(|loc| loc.path == PRIVATE_PATH && loc.reference == "develop")
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n\nCall `connect()` before you send.\n", "base-sha"))));
    host.expect_create_branch().never();
    host.expect_put_file().never();
    host.expect_delete_file().never();
    host.expect_open_pull_request().never();

    let table = table();
    let stages = Stages::default();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert_eq!(
        report.outcomes,
        vec![FileOutcome::skipped(
            DOCS_PATH,
            Some(PRIVATE_PATH.to_string()),
            "identical content (same instruction, reworded)"
        )]
    );
    assert_eq!(calls(&log), vec![Called::Comparator]);
}

#[tokio::test]
async fn test_changed_file_is_committed_on_branch_and_proposed() {
    let dir = tempdir().unwrap();
    write(dir.path(), DOCS_PATH, "# Messages\n\nNew {% hint style=\"info\" %}tip{% endhint %}\n");

    let (generator, log) = oracle(|stage, _| {
        Ok(match stage {
            Called::Comparator => DIFFERENT.into(),
            Called::Converter => "# Messages\n\nNew\n\n> **Note:** tip\n".into(),
            Called::Validator => PASSED.into(),
            Called::Classifier => panic!("backward sync never classifies"),
        })
    });

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .withf(|loc| loc.reference == "develop")
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n\nOld\n", "base-sha"))));
    host.expect_create_branch()
        .withf(|req| req.branch == BRANCH && req.base == "develop" && req.repo == "sdk-android")
        .times(1)
        .returning(|_| Ok(()));
    host.expect_get_file()
        .withf(|loc| loc.reference == BRANCH)
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n\nOld\n", "branch-sha"))));
    host.expect_put_file()
        .withf(|commit| {
            commit.path == PRIVATE_PATH
                && commit.branch == BRANCH
                && commit.sha.as_deref() == Some("branch-sha")
                && commit.message == format!("docs: sync from docs repo ({DOCS_PATH})")
                && commit.content.contains("> **Note:** tip")
        })
        .times(1)
        .returning(|_| Ok(()));
    host.expect_open_pull_request()
        .withf(|pr| {
            pr.title == "[Sync Back] Update messages.md from docs repo"
                && pr.head == BRANCH
                && pr.base == "develop"
                && pr.body.contains(DOCS_PATH)
                && pr.body.contains(PRIVATE_PATH)
        })
        .times(1)
        .returning(|_| Ok(Some("https://github.com/acme/sdk-android/pull/7".into())));

    let table = table();
    let stages = Stages::default();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert_eq!(
        report.outcomes,
        vec![FileOutcome::Synced {
            path: DOCS_PATH.into(),
            target: PRIVATE_PATH.into(),
            dry_run: false,
            pull_request: Some("https://github.com/acme/sdk-android/pull/7".into()),
            note: None,
        }]
    );
    assert_eq!(calls(&log), vec![Called::Comparator, Called::Converter, Called::Validator]);
}

#[tokio::test]
async fn test_existing_pull_request_is_noted() {
    let dir = tempdir().unwrap();
    write(dir.path(), DOCS_PATH, "# Messages\n\nBrand new page.\n");

    let (generator, _log) = oracle(|stage, _| match stage {
        Called::Converter => Ok("# Messages\n\nBrand new page.\n".into()),
        Called::Validator => Ok(PASSED.into()),
        other => panic!("{other:?} must not run"),
    });

    let mut host = MockRepoHost::new();
    host.expect_get_file().returning(|_| Ok(None));
    host.expect_create_branch().times(1).returning(|_| Ok(()));
    host.expect_put_file()
        .withf(|commit| commit.sha.is_none())
        .times(1)
        .returning(|_| Ok(()));
    host.expect_open_pull_request().times(1).returning(|_| Ok(None));

    let table = table();
    let stages = Stages::default();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    match &report.outcomes[0] {
        FileOutcome::Synced { pull_request, note, .. } => {
            assert!(pull_request.is_none());
            assert_eq!(note.as_deref(), Some("PR may already exist"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_validation_never_touches_remote() {
    let dir = tempdir().unwrap();
    write(dir.path(), DOCS_PATH, "# Messages\n\n## Setup\n\nInstall.\n");

    let (generator, log) = oracle(|stage, _| {
        Ok(match stage {
            Called::Comparator => DIFFERENT.into(),
            Called::Converter => "# Messages\n".into(),
            Called::Validator => CONTENT_LOSS.into(),
            Called::Classifier => panic!("backward sync never classifies"),
        })
    });

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n", "base-sha"))));
    host.expect_create_branch().never();
    host.expect_put_file().never();
    host.expect_delete_file().never();
    host.expect_open_pull_request().never();

    let table = table();
    let stages = Stages::default();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert_eq!(
        report.outcomes,
        vec![FileOutcome::ValidationFailed {
            path: DOCS_PATH.into(),
            target: PRIVATE_PATH.into(),
            issues: vec!["CONTENT_LOSS: the Setup section is missing".into()],
            fallback_written: false,
        }]
    );
    assert_eq!(calls(&log).len(), 5);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_deleted_docs_file_proposes_removal() {
    let dir = tempdir().unwrap();

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .withf(|loc| loc.reference == "develop")
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n", "base-sha"))));
    host.expect_create_branch()
        .withf(|req| req.branch == BRANCH)
        .times(1)
        .returning(|_| Ok(()));
    host.expect_get_file()
        .withf(|loc| loc.reference == BRANCH)
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n", "branch-sha"))));
    host.expect_delete_file()
        .withf(|del| del.path == PRIVATE_PATH && del.sha == "branch-sha" && del.branch == BRANCH)
        .times(1)
        .returning(|_| Ok(()));
    host.expect_open_pull_request()
        .withf(|pr| pr.title == "[Sync Back] Remove messages.md (deleted in docs repo)")
        .times(1)
        .returning(|_| Ok(Some("https://github.com/acme/sdk-android/pull/8".into())));

    let table = table();
    let stages = Stages::default();
    let generator = silent_oracle();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert_eq!(
        report.outcomes,
        vec![FileOutcome::Skipped {
            path: DOCS_PATH.into(),
            target: Some(PRIVATE_PATH.into()),
            reason: "deleted upstream".into(),
            deleted: true,
        }]
    );
}

#[tokio::test]
async fn test_dry_run_reads_but_never_writes() {
    let dir = tempdir().unwrap();
    write(dir.path(), DOCS_PATH, "# Messages\n\nChanged.\n");

    let (generator, _log) = oracle(|stage, _| match stage {
        Called::Comparator => Ok(DIFFERENT.into()),
        other => panic!("{other:?} must not run in dry-run"),
    });

    let mut host = MockRepoHost::new();
    host.expect_get_file()
        .times(1)
        .returning(|_| Ok(Some(remote("# Messages\n", "base-sha"))));
    host.expect_create_branch().never();
    host.expect_put_file().never();
    host.expect_open_pull_request().never();

    let table = table();
    let stages = Stages::default();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: true,
        date: date(),
    };
    let report = sync.run(&[DOCS_PATH.to_string()], &ClassificationCache::default()).await;

    assert!(matches!(report.outcomes[0], FileOutcome::Synced { dry_run: true, .. }));
}

#[tokio::test]
async fn test_cached_verdict_blocks_sync_back() {
    let dir = tempdir().unwrap();
    write(dir.path(), "sdk-docs/android/CHANGELOG.md", "## 1.2.0\n");

    let mut cache = ClassificationCache::default();
    cache.record(
        "android/docs/CHANGELOG.md",
        ClassificationVerdict::new(true, false, "generated from release notes"),
    );

    let mut host = MockRepoHost::new();
    host.expect_get_file().never();

    let table = table();
    let stages = Stages::default();
    let generator = silent_oracle();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: dir.path().to_path_buf(),
        dry_run: false,
        date: date(),
    };
    let report = sync
        .run(
            &["sdk-docs/android/CHANGELOG.md".to_string(), "sdk-docs/ios/intro.md".to_string()],
            &cache,
        )
        .await;

    assert_eq!(
        report.outcomes,
        vec![
            FileOutcome::ClassifiedOut {
                path: "sdk-docs/android/CHANGELOG.md".into(),
                reason: "generated from release notes".into(),
            },
            FileOutcome::NotMapped {
                path: "sdk-docs/ios/intro.md".into(),
            },
        ]
    );
}

#[test]
fn test_branch_name_uses_date_and_file_stem() {
    let table = table();
    let stages = Stages::default();
    let generator = silent_oracle();
    let host = MockRepoHost::new();
    let sync = BackwardSync {
        table: &table,
        stages: &stages,
        generator: &generator,
        host: &host,
        docs_repo: ".".into(),
        dry_run: true,
        date: date(),
    };
    assert_eq!(sync.branch_name("sdk-docs/android/guides/push-setup.md"), "sync-back/20260115/push-setup");
}
