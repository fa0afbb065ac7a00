// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

const BASE_URL: &str = "https://lms.example.com/course/view.php?id=42";

const COURSE_PAGE: &str = r#"<html><body>
<div class="page-header-headings"><h1>Algoritmi</h1></div>
<ul class="topics">
  <li id="section-0"><h3 class="sectionname">Opšte</h3><ul></ul></li>
  <li id="section-1"><h3 class="sectionname">Nedelja 1</h3><ul>
    <li class="activity modtype_label"><div class="activity-altcontent"><strong>Predavanja</strong></div></li>
    <li class="activity modtype_resource"><a href="/pluginfile.php/3/mod_resource/content/1/skripta.pdf">Skripta Datoteka</a></li>
  </ul></li>
</ul></body></html>"#;

// 辅助函数，避免重复。HOME 指向临时目录，配置和清单都写在那里
fn main_command(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("HOME", home).env_remove("COURSE_DL_COOKIE");
    cmd
}

fn write_course_page(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("course.html");
    fs::write(&path, COURSE_PAGE).unwrap();
    path
}

// --- 测试基本 CLI 行为 ---

#[test]
fn test_help_flag() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("显示此帮助信息并退出"));
}

#[test]
fn test_missing_mode_shows_help() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: course-dl <MODE> [OPTIONS]"));
}

#[test]
fn test_html_file_requires_base_url() {
    let home = tempdir().unwrap();
    let page = write_course_page(home.path());
    main_command(home.path())
        .arg("--html-file")
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base-url <URL>"));
}

// --- 测试核心分发逻辑 ---

#[test]
fn test_list_local_page_and_reuse_manifest() {
    let home = tempdir().unwrap();
    let page = write_course_page(home.path());

    main_command(home.path())
        .arg("--html-file")
        .arg(&page)
        .arg("--base-url")
        .arg(BASE_URL)
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skripta"))
        .stdout(predicate::str::contains("Predavanja"));

    let manifests = home.path().join(".course-dl").join("manifests");
    assert_eq!(fs::read_dir(&manifests).unwrap().count(), 1);

    // 第二次运行直接读取保存的清单
    main_command(home.path())
        .arg("--url")
        .arg(BASE_URL)
        .arg("--from-manifest")
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skripta"));
}

#[test]
fn test_dry_run_prints_download_tasks() {
    let home = tempdir().unwrap();
    let page = write_course_page(home.path());

    main_command(home.path())
        .arg("--html-file")
        .arg(&page)
        .arg("--base-url")
        .arg(BASE_URL)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Algoritmi/Nedelja 1/Predavanja/Skripta.pdf"))
        .stdout(predicate::str::contains(
            "https://lms.example.com/pluginfile.php/3/mod_resource/content/1/skripta.pdf",
        ));
}

#[test]
fn test_from_manifest_without_scan_fails() {
    let home = tempdir().unwrap();
    main_command(home.path())
        .arg("--url")
        .arg(BASE_URL)
        .arg("--from-manifest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("请先扫描一次"));
}

#[test]
fn test_batch_mode_dispatch() {
    let home = tempdir().unwrap();
    let file_path = home.path().join("links.txt");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "# 课程列表").unwrap();
    writeln!(file, "not a url").unwrap();
    writeln!(file, "http://127.0.0.1:9/course/view.php?id=1").unwrap();

    main_command(home.path())
        .arg("-b")
        .arg(&file_path)
        .arg("--timeout")
        .arg("2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 个批量任务执行失败"));
}

#[test]
fn test_list_marks_unexpanded_folder() {
    let home = tempdir().unwrap();
    let page = home.path().join("folder.html");
    fs::write(
        &page,
        r#"<ul><li id="section-1"><h3 class="sectionname">Ispit</h3><ul>
            <li class="activity modtype_folder"><a href="/mod/folder/view.php?id=5">Rokovi Folder</a></li>
        </ul></li></ul>"#,
    )
    .unwrap();

    // 不展开文件夹时不需要联网
    main_command(home.path())
        .arg("--html-file")
        .arg(&page)
        .arg("--base-url")
        .arg(BASE_URL)
        .arg("--no-expand-folders")
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rokovi"))
        .stdout(predicate::str::contains("(文件夹，未展开)"));
}
