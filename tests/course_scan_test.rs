// tests/course_scan_test.rs

use course_dl::{
    client::{PageFetcher, RobustClient},
    config::AppConfig,
    downloader::{DownloadManager, RetrievalPlanner, TransferContext, execute_tasks},
    extractor::CourseScanner,
    models::EntryKind,
};
use mockito::{Matcher, Server, ServerGuard};
use std::{
    fs,
    sync::{Arc, atomic::AtomicBool},
};

async fn page_mock(server: &mut ServerGuard, path: &str, id: &str, body: String) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::UrlEncoded("id".into(), id.into()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(body)
        .create_async()
        .await
}

fn course_page(base: &str) -> String {
    format!(
        r#"<html><body>
        <div class="page-header-headings"><h1>Algoritmi i strukture</h1></div>
        <ul class="topics">
          <li id="section-0"><h3 class="sectionname">Opšte</h3><ul></ul></li>
          <li id="section-1"><h3 class="sectionname">Nedelja 1</h3><ul>
            <li class="activity modtype_label"><div class="activity-altcontent"><strong>Predavanja</strong></div></li>
            <li class="activity modtype_resource"><a href="{base}/pluginfile.php/1/mod_resource/content/1/uvod.pdf">Uvod Datoteka</a></li>
            <li class="activity modtype_url"><a href="{base}/mod/url/view.php?id=8">Skripta URL</a></li>
            <li class="activity modtype_url"><a href="{base}/mod/url/view.php?id=9">Snimak predavanja</a></li>
            <li class="activity modtype_folder"><a href="{base}/mod/folder/view.php?id=7">Zadaci Folder</a></li>
          </ul></li>
          <li id="section-2"><h3 class="sectionname">Nedelja 2</h3><ul>
            <li class="activity modtype_forum"><a href="{base}/mod/forum/view.php?id=3">Forum</a></li>
          </ul></li>
        </ul></body></html>"#
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_plan_and_download_course() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let _folder = page_mock(
        &mut server,
        "/mod/folder/view.php",
        "7",
        r#"<div class="foldertree"><a href="/pluginfile.php/7/mod_folder/content/0/z1.pdf">z1.pdf</a></div>"#.to_string(),
    )
    .await;
    let _redirect = page_mock(
        &mut server,
        "/mod/url/view.php",
        "8",
        format!(r#"<div class="urlworkaround"><a href="{}/files/skripta.pdf">ovde</a></div>"#, base),
    )
    .await;
    let _video = page_mock(
        &mut server,
        "/mod/url/view.php",
        "9",
        r#"<iframe src="https://www.youtube.com/embed/abc123"></iframe>"#.to_string(),
    )
    .await;
    let _uvod = server
        .mock("GET", "/pluginfile.php/1/mod_resource/content/1/uvod.pdf")
        .with_body("uvod")
        .create_async()
        .await;
    let _skripta = server
        .mock("GET", "/files/skripta.pdf")
        .with_body("skripta")
        .create_async()
        .await;
    let _z1 = server
        .mock("GET", "/pluginfile.php/7/mod_folder/content/0/z1.pdf")
        .with_body("z1")
        .create_async()
        .await;

    let config = Arc::new(AppConfig::default());
    let client = Arc::new(RobustClient::new(config.clone(), None).unwrap());
    let page_url = format!("{}/course/view.php?id=42", base);

    // --- 扫描 ---
    let fetcher: Arc<dyn PageFetcher> = client.clone();
    let manifest = CourseScanner::new(fetcher, config.clone())
        .scan(&page_url, &course_page(&base))
        .await
        .unwrap();

    assert_eq!(manifest.course_title.as_deref(), Some("Algoritmi i strukture"));
    let ids: Vec<&str> = manifest.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["section-0", "section-1"]);

    let files = &manifest.sections[1].files;
    let summary: Vec<(&str, EntryKind, Option<&str>)> = files
        .iter()
        .map(|f| (f.display_name.as_str(), f.kind, f.subsection.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Uvod", EntryKind::Direct, Some("Predavanja")),
            ("Skripta", EntryKind::UrlIndirect, Some("Predavanja")),
            ("z1.pdf", EntryKind::FolderExpanded, Some("Predavanja")),
        ]
    );
    assert_eq!(files[1].source_url, format!("{}/files/skripta.pdf", base));
    assert_eq!(files[2].folder_name.as_deref(), Some("Zadaci"));

    // --- 生成下载任务并下载 ---
    let flat = manifest.flat_entries();
    let planned = RetrievalPlanner::new(client.as_ref(), &config)
        .plan("Algoritmi", &flat)
        .await;
    assert!(planned.unresolved.is_empty());
    assert_eq!(planned.tasks.len(), 3);

    let output = tempfile::tempdir().unwrap();
    let manager = DownloadManager::new();
    manager.start_batch(planned.tasks.len());
    let transfer = TransferContext {
        client: client.as_ref(),
        manager: &manager,
        output_dir: output.path(),
        max_workers: 2,
        force_redownload: false,
        cancellation_token: Arc::new(AtomicBool::new(false)),
    };
    execute_tasks(&transfer, &planned.tasks).await.unwrap();

    let root = output.path().join("Algoritmi").join("Nedelja 1");
    assert_eq!(fs::read_to_string(root.join("Predavanja").join("Uvod.pdf")).unwrap(), "uvod");
    assert_eq!(
        fs::read_to_string(root.join("Predavanja").join("Skripta.pdf")).unwrap(),
        "skripta"
    );
    assert_eq!(fs::read_to_string(root.join("Zadaci").join("z1.pdf")).unwrap(), "z1");
    assert_eq!(manager.get_stats().success, 3);

    // 再次运行时已存在的文件被跳过
    manager.start_batch(planned.tasks.len());
    execute_tasks(&transfer, &planned.tasks).await.unwrap();
    let stats = manager.get_stats();
    assert_eq!(stats.skipped, 3);
    assert_eq!(stats.success, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deferred_folder_is_expanded_at_retrieval() {
    let mut server = Server::new_async().await;
    let base = server.url();

    let config = Arc::new(AppConfig {
        expand_folders: false,
        ..AppConfig::default()
    });
    let client = Arc::new(RobustClient::new(config.clone(), None).unwrap());
    let page_url = format!("{}/course/view.php?id=42", base);
    let html = format!(
        r#"<ul><li id="section-1"><h3 class="sectionname">Ispit</h3><ul>
            <li class="activity modtype_folder"><a href="{base}/mod/folder/view.php?id=5">Rokovi</a></li>
        </ul></li></ul>"#
    );

    let fetcher: Arc<dyn PageFetcher> = client.clone();
    let manifest = CourseScanner::new(fetcher, config.clone())
        .scan(&page_url, &html)
        .await
        .unwrap();
    let entry = &manifest.sections[0].files[0];
    assert_eq!(entry.kind, EntryKind::FolderLink);
    assert_eq!(entry.source_url, format!("{}/mod/folder/view.php?id=5", base));

    // 扫描时没有访问文件夹页面；下载前才展开
    let folder = page_mock(
        &mut server,
        "/mod/folder/view.php",
        "5",
        r#"<a href="/pluginfile.php/5/mod_folder/content/0/jun.pdf">jun.pdf</a>
           <a href="/pluginfile.php/5/mod_folder/content/0/jul.pdf">jul.pdf</a>"#
            .to_string(),
    )
    .await;

    let flat = manifest.flat_entries();
    let planned = RetrievalPlanner::new(client.as_ref(), &config)
        .plan("Kurs", &flat)
        .await;
    let names: Vec<String> = planned
        .tasks
        .iter()
        .map(|t| t.filename.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["Kurs/Ispit/Rokovi/jun.pdf", "Kurs/Ispit/Rokovi/jul.pdf"]);
    folder.assert_async().await;
}
