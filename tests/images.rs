// ABOUTME: Integration tests for image pull/store and per-host digest sync.
// ABOUTME: Hosts whose image digest already matches get no transfer and no load.

mod support;

use hoist::deploy::{Phase, PhaseExecutor, Step};
use hoist::exec::HostIteration;
use hoist::hooks::HookRegistry;
use hoist::images::{
    ImagePairing, ImageSyncEngine, RuntimeType, SyncOutcome, archive_name,
};
use hoist::release::RunContext;
use hoist::types::{ImageTag, ReleaseId, Version};
use parking_lot::Mutex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use support::{Call, FakeTransport, RecordingHook, executor, executor_for, quiet, stage_config};

fn pairing(source: &str, target: &str) -> ImagePairing {
    ImagePairing::new(
        ImageTag::parse(source).unwrap(),
        ImageTag::parse(target).unwrap(),
    )
}

/// Minimal `docker save` archive whose config blob is `sha256:<hex>`.
fn write_archive(dir: &Path, index: usize, hex: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(archive_name(index));
    let manifest = format!(r#"[{{"Config":"{hex}.json","RepoTags":["app:prod"],"Layers":[]}}]"#);
    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    let mut header = tar::Header::new_gnu();
    header.set_size(manifest.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "manifest.json", manifest.as_bytes())
        .unwrap();
    builder.finish().unwrap();
    path
}

#[tokio::test]
async fn pull_and_store_processes_pairings_in_order() {
    let transport = FakeTransport::new();
    let executor = executor_for(transport.clone(), &["h1"], HostIteration::Sequential);
    let staging = tempfile::tempdir().unwrap();
    let pairings = [
        pairing("registry.example.com/shop:1.0.0", "shop:prod"),
        pairing("redis:7", "shop-redis:prod"),
    ];

    ImageSyncEngine::new(&executor, RuntimeType::Docker)
        .pull_and_store(&pairings, staging.path())
        .await
        .unwrap();

    let verbs: Vec<String> = transport
        .commands()
        .iter()
        .filter_map(|c| c.strip_prefix("docker "))
        .map(|c| c.split_whitespace().next().unwrap().to_string())
        .collect();
    assert_eq!(
        verbs,
        ["pull", "tag", "save", "rmi", "pull", "tag", "save", "rmi"]
    );

    let saves = transport.commands_containing("docker save");
    assert!(saves[0].command().unwrap().contains("image-0.tar"));
    assert!(saves[1].command().unwrap().contains("image-1.tar"));
    assert!(transport.calls().iter().all(|c| c.host().is_none()));
}

#[tokio::test]
async fn only_hosts_with_a_different_digest_receive_the_image() {
    let transport = FakeTransport::new();
    transport.respond(Some("h1"), "image inspect", "sha256:0123abcd\n");
    transport.respond(Some("h2"), "image inspect", "sha256:ffff0000\n");
    // h3 has no copy at all: inspect prints nothing.

    let executor = executor_for(transport.clone(), &["h1", "h2", "h3"], HostIteration::Sequential);
    let staging = tempfile::tempdir().unwrap();
    write_archive(staging.path(), 0, "0123abcd");

    let report = ImageSyncEngine::new(&executor, RuntimeType::Podman)
        .sync_to_hosts(&[pairing("shop:1.0.0", "shop:prod")], staging.path(), "/srv/shop/tmp/images")
        .await
        .unwrap();

    let outcomes: Vec<_> = report
        .iter()
        .map(|r| (r.host.to_string(), r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        [
            ("h1".to_string(), SyncOutcome::UpToDate),
            ("h2".to_string(), SyncOutcome::Transferred),
            ("h3".to_string(), SyncOutcome::Transferred),
        ]
    );

    let upload_hosts: Vec<_> = transport
        .uploads()
        .iter()
        .filter_map(|c| c.host().map(str::to_string))
        .collect();
    assert_eq!(upload_hosts, ["h2", "h3"]);

    let loads: Vec<_> = transport
        .commands_containing("podman load")
        .iter()
        .filter_map(|c| c.host().map(str::to_string))
        .collect();
    assert_eq!(loads, ["h2", "h3"]);

    let Call::Upload { remote, .. } = &transport.uploads()[0] else {
        unreachable!()
    };
    assert_eq!(remote, "/srv/shop/tmp/images/image-0.tar");
}

#[tokio::test]
async fn digest_is_compared_with_or_without_prefix() {
    let transport = FakeTransport::new();
    transport.respond(None, "image inspect", "0123abcd\n");

    let executor = executor_for(transport.clone(), &["h1"], HostIteration::Sequential);
    let staging = tempfile::tempdir().unwrap();
    write_archive(staging.path(), 0, "0123abcd");

    let report = ImageSyncEngine::new(&executor, RuntimeType::Docker)
        .sync_to_hosts(&[pairing("shop:1.0.0", "shop:prod")], staging.path(), "/tmp/images")
        .await
        .unwrap();

    assert_eq!(report[0].outcome, SyncOutcome::UpToDate);
    assert!(transport.uploads().is_empty());
}

#[tokio::test]
async fn containerd_store_index_digest_counts_as_up_to_date() {
    let transport = FakeTransport::new();
    transport.respond(Some("h1"), "image inspect", "sha256:beef01\n");
    transport.respond(Some("h2"), "image inspect", "sha256:cafe02\n");

    let executor = executor_for(transport.clone(), &["h1", "h2"], HostIteration::Sequential);
    let staging = tempfile::tempdir().unwrap();
    let path = staging.path().join(archive_name(0));
    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    for (name, body) in [
        ("index.json", r#"{"schemaVersion":2,"manifests":[{"digest":"sha256:beef01"}]}"#),
        ("manifest.json", r#"[{"Config":"blobs/sha256/0123abcd","Layers":[]}]"#),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, body.as_bytes()).unwrap();
    }
    builder.finish().unwrap();

    let report = ImageSyncEngine::new(&executor, RuntimeType::Docker)
        .sync_to_hosts(&[pairing("shop:1.0.0", "shop:prod")], staging.path(), "/tmp/images")
        .await
        .unwrap();

    assert_eq!(report[0].outcome, SyncOutcome::UpToDate);
    assert_eq!(report[1].outcome, SyncOutcome::Transferred);
    assert_eq!(transport.uploads().len(), 1);
}

#[tokio::test]
async fn image_steps_run_with_hooks_when_pairings_exist() {
    let project = tempfile::tempdir().unwrap();
    let config = stage_config(
        project.path(),
        "staging",
        "application: shop\ndeploy_to: /srv/shop\nservers: [h1]\nimages: [\"shop:1.0.0\", \"shop:prod\"]\n",
    );
    let run = RunContext::with_release_id(
        &config,
        Version::new("1.0.0").unwrap(),
        ReleaseId::parse("20240105-120000").unwrap(),
        "ci@builder".into(),
    );
    write_archive(&run.local_images_path(), 0, "0123abcd");

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HookRegistry::new();
    for event in ["before:pull_images", "after:push_images"] {
        registry
            .register(event, RecordingHook { log: events.clone() })
            .unwrap();
    }

    let transport = FakeTransport::new();
    let executor = executor(transport.clone(), &config);
    let mut phases = PhaseExecutor::new(config, run, executor, registry, quiet());

    phases.step(Step::PullImages).await.unwrap();
    phases.step(Step::PushImages).await.unwrap();

    assert_eq!(*events.lock(), ["before:pull_images", "after:push_images"]);
    assert_eq!(transport.commands_containing("docker pull").len(), 1);
    assert_eq!(transport.commands_containing("docker load").len(), 1);
}

#[tokio::test]
async fn image_steps_are_skipped_without_pairings() {
    let project = tempfile::tempdir().unwrap();
    let config = stage_config(
        project.path(),
        "staging",
        "application: shop\ndeploy_to: /srv/shop\nservers: [h1]\n",
    );
    let run = RunContext::with_release_id(
        &config,
        Version::new("1.0.0").unwrap(),
        ReleaseId::parse("20240105-120000").unwrap(),
        "ci@builder".into(),
    );

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HookRegistry::new();
    for event in [
        "before:pull_images",
        "after:pull_images",
        "before:push_images",
        "after:push_images",
    ] {
        registry
            .register(event, RecordingHook { log: events.clone() })
            .unwrap();
    }

    let transport = FakeTransport::new();
    let executor = executor(transport.clone(), &config);
    let mut phases = PhaseExecutor::new(config, run, executor, registry, quiet());
    phases.run(Phase::Prepare).await.unwrap();
    phases.step(Step::PushImages).await.unwrap();

    assert!(events.lock().is_empty());
    assert!(transport.commands_containing("docker").is_empty());
}
