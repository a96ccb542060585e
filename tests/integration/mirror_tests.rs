use site_mirror::archive::ZipArchiver;
use site_mirror::config::Config;
use site_mirror::renderer::HttpRenderer;
use site_mirror::{
    AuthDescriptor, CrawlRequest, JobRunner, JobSnapshot, JobStatus, JobStore, MemoryJobStore,
};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

/// Builds a runner writing under `root` with production components
fn create_runner(root: &Path) -> (JobRunner, Arc<dyn JobStore>) {
    let mut config = Config::default();
    config.output.root = root.to_path_buf();
    config.auth.fallback_delay_ms = 10;

    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new(root));
    let runner = JobRunner::new(
        Arc::new(config.clone()),
        Arc::clone(&store),
        Arc::new(HttpRenderer::new(&config.browser)),
        Arc::new(ZipArchiver::new(root)),
    );
    (runner, store)
}

async fn run_to_end(runner: &JobRunner, request: CrawlRequest) -> JobSnapshot {
    let (id, handle) = runner.submit(request);
    let status = handle.await.expect("task panicked").expect("job vanished");
    let job = runner.store().get(id).unwrap();
    assert_eq!(job.status, status);
    job
}

fn archive_entries(path: &Path) -> BTreeSet<String> {
    let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Asserts every archive entry holds the same bytes as its source file
fn assert_archive_matches(archive_path: &Path, source: &Path) {
    let mut archive = zip::ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut packed = Vec::new();
        entry.read_to_end(&mut packed).unwrap();
        let on_disk = std::fs::read(source.join(entry.name())).unwrap();
        assert_eq!(packed, on_disk, "content differs for {}", entry.name());
    }
}

fn logged(job: &JobSnapshot, needle: &str) -> bool {
    job.logs.iter().any(|entry| entry.message.contains(needle))
}

#[tokio::test]
async fn test_mirror_small_site() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><link rel="stylesheet" href="/css/site.css"></head><body>
                <a href="/about">About</a>
                <a href="/docs/">Docs</a>
                <a href="/broken">Broken</a>
                <a href="http://localhost:1/elsewhere">External</a>
                <a href="mailto:team@example.com">Mail</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(
            r#"<html><body><img src="/img/logo.png"><a href="/">Home</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html(r#"<a href="guide#install">Guide</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/guide"))
        .respond_with(html("<h1>Guide</h1>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("body{}", "text/css"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let (runner, _store) = create_runner(root.path());
    let request = CrawlRequest::new(&format!("{}/", server.uri())).unwrap();
    let job = run_to_end(&runner, request).await;

    assert_eq!(job.status, JobStatus::Completed, "logs: {:?}", job.logs);
    assert_eq!(job.progress, 100);
    assert!(job.archive_available);
    assert!(logged(&job, "Error crawling"));

    let archive_path = job.archive_path.clone().unwrap();
    assert_eq!(archive_path, root.path().join(format!("{}.zip", job.id)));

    let entries = archive_entries(&archive_path);
    let expected: BTreeSet<String> = [
        "index.html",
        "about.html",
        "docs/index.html",
        "docs/guide.html",
        "css/site.css",
        "img/logo.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(entries, expected);
    assert_archive_matches(&archive_path, &job.output_dir);
}

#[tokio::test]
async fn test_login_session_carries_into_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <form action="/session" method="post">
                    <input type="hidden" name="token" value="t0k">
                    <input id="user" name="user">
                    <input id="pass" name="pass" type="password">
                    <button id="login" type="submit">Log in</button>
                </form>
                <a href="/private">Private</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_string_contains("user=alice"))
        .and(body_string_contains("pass=wonderland"))
        .and(body_string_contains("token=t0k"))
        .respond_with(
            html(r#"<div class="welcome">Hello alice</div>"#)
                .insert_header("set-cookie", "session=abc123; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("cookie", "session=abc123"))
        .respond_with(html("<p>members only</p>"))
        .mount(&server)
        .await;

    let auth = AuthDescriptor::new("alice", "wonderland")
        .unwrap()
        .with_username_selector("#user")
        .with_password_selector("#pass")
        .with_submit_selector("#login")
        .with_success_selector(".welcome");

    let root = tempfile::tempdir().unwrap();
    let (runner, _store) = create_runner(root.path());
    let request = CrawlRequest::new(&server.uri()).unwrap().with_auth(auth);
    let job = run_to_end(&runner, request).await;

    assert_eq!(job.status, JobStatus::Completed, "logs: {:?}", job.logs);
    assert!(logged(&job, "Login successful"));
    assert!(!logged(&job, "Authentication warning"));

    let private = job.output_dir.join("private.html");
    assert_eq!(
        std::fs::read_to_string(private).unwrap(),
        "<p>members only</p>"
    );
}

#[tokio::test]
async fn test_wrong_login_selectors_still_mirror() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>public</p>"))
        .mount(&server)
        .await;

    let auth = AuthDescriptor::new("alice", "wonderland")
        .unwrap()
        .with_username_selector("#no-such-field")
        .with_submit_selector("#no-such-button");

    let root = tempfile::tempdir().unwrap();
    let (runner, _store) = create_runner(root.path());
    let request = CrawlRequest::new(&server.uri()).unwrap().with_auth(auth);
    let job = run_to_end(&runner, request).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(logged(&job, "Authentication warning: username field"));
    assert!(logged(&job, "Authentication warning: submit control"));
    assert!(job.output_dir.join("index.html").is_file());
}

#[tokio::test]
async fn test_unreachable_seed_fails_without_archive() {
    let root = tempfile::tempdir().unwrap();
    let (runner, _store) = create_runner(root.path());
    let request = CrawlRequest::new("http://127.0.0.1:1/").unwrap();
    let job = run_to_end(&runner, request).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.is_some());
    assert!(!job.archive_available);
    assert!(!root.path().join(format!("{}.zip", job.id)).exists());
}

#[tokio::test]
async fn test_delete_removes_archive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>only page</p>"))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let (runner, store) = create_runner(root.path());
    let job = run_to_end(&runner, CrawlRequest::new(&server.uri()).unwrap()).await;
    let archive = job.archive_path.clone().unwrap();
    assert!(archive.is_file());

    store.delete(job.id).unwrap();
    assert!(!archive.exists());
    assert!(store.get(job.id).is_err());
    assert!(store.list().is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_are_isolated() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for (server, label) in [(&first, "first"), (&second, "second")] {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(format!(r#"<p>{}</p><a href="/next">next</a>"#, label)))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/next"))
            .respond_with(html(format!("<p>{} next</p>", label)))
            .mount(server)
            .await;
    }

    let root = tempfile::tempdir().unwrap();
    let (runner, store) = create_runner(root.path());
    let (id_a, handle_a) = runner.submit(CrawlRequest::new(&first.uri()).unwrap());
    let (id_b, handle_b) = runner.submit(CrawlRequest::new(&second.uri()).unwrap());
    let (a, b) = tokio::join!(handle_a, handle_b);
    assert_eq!(a.unwrap().unwrap(), JobStatus::Completed);
    assert_eq!(b.unwrap().unwrap(), JobStatus::Completed);

    let listed: Vec<_> = store.list().iter().map(|job| job.id).collect();
    assert_eq!(listed, vec![id_a, id_b]);

    for (id, label, server) in [(id_a, "first", &first), (id_b, "second", &second)] {
        let job = store.get(id).unwrap();
        assert_eq!(
            std::fs::read_to_string(job.output_dir.join("next.html")).unwrap(),
            format!("<p>{} next</p>", label)
        );
        assert!(job
            .logs
            .iter()
            .filter(|entry| entry.message.starts_with("Crawling page"))
            .all(|entry| entry.message.contains(&server.uri())));
    }
}
