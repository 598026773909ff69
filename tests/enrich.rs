use std::{fs, net::TcpListener, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;

const INPUT: &str = "@article{vaswani2017,
 author = {Ashish Vaswani},
 title = {Attention is All you Need},
 url = {https://api.semanticscholar.org/CorpusID:12345678},
 year = {2017}
}

@article{nodoi2020,
 title = {A Paper Without a DOI},
 url = {https://api.semanticscholar.org/CorpusID:99999999},
 year = {2020}
}

@misc{handwritten,
 title = {Notes},
 year = {2021}
}
";

fn bibdoi(base_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("bibdoi").expect("binary builds");
    cmd.env("NO_COLOR", "1")
        .env("BIBDOI_BASE_URL", base_url)
        .env_remove("SEMANTIC_SCHOLAR_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8(strip_ansi_escapes::strip(&output.stderr)).expect("utf-8 stderr")
}

fn write_input(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("refs.bib");
    fs::write(&path, contents).expect("write input");
    path
}

/// A server that accepts connections and never answers.
fn black_hole() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://{addr}")
}

#[test]
fn adds_doi_and_leaves_the_rest_alone() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let found = server
        .mock("GET", "/paper/CorpusId:12345678")
        .match_query(mockito::Matcher::UrlEncoded(
            "fields".into(),
            "externalIds".into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(r#"{"paperId":"204e3073","externalIds":{"DOI":"10.1000/xyz","CorpusId":12345678}}"#)
        .expect(2)
        .create();
    let no_doi = server
        .mock("GET", "/paper/CorpusId:99999999")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"paperId":"ffff","externalIds":{"CorpusId":99999999}}"#)
        .expect(2)
        .create();

    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), INPUT);
    let out = dir.path().join("refs_modified.bib");

    let output = bibdoi(&server.url()).arg(&input).output()?;
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("✓ 1")
            && stderr.contains("✗ 0")
            && stderr.contains("– 1")
            && stderr.contains("· 1"),
        "stderr summary mismatch. stderr=\n{stderr}"
    );
    assert!(stderr.contains("vaswani2017: added doi 10.1000/xyz"), "stderr=\n{stderr}");
    assert!(stderr.contains("A Paper Without a DOI"), "stderr=\n{stderr}");

    let expected = INPUT.replace(
        " year = {2017}\n}",
        " year = {2017},\n doi = {10.1000/xyz}\n}",
    );
    let first = fs::read_to_string(&out)?;
    assert_eq!(first, expected);
    assert_eq!(fs::read_to_string(&input)?, INPUT);

    // Running again on the original input gives the same file.
    let output = bibdoi(&server.url()).arg(&input).output()?;
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&out)?, first);

    found.assert();
    no_doi.assert();
    Ok(())
}

#[test]
fn timed_out_lookup_does_not_stop_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let input_text = "@article{slow,
  title = {Slow Paper},
  url = {https://api.semanticscholar.org/CorpusID:11112222}
}
@article{known,
  doi = {10.5555/known},
  url = {https://api.semanticscholar.org/CorpusID:1}
}
@misc{nokey,
  title = {No Identifier}
}
";
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), input_text);
    let out = dir.path().join("refs_modified.bib");

    let output = bibdoi(&black_hole())
        .arg(&input)
        .args(["--timeout", "1"])
        .output()?;
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("slow: lookup of CorpusId:11112222 failed: request timed out"),
        "stderr=\n{stderr}"
    );
    assert!(
        stderr.contains("✗ 1") && stderr.contains("– 1") && stderr.contains("= 1"),
        "stderr summary mismatch. stderr=\n{stderr}"
    );
    assert_eq!(fs::read_to_string(&out)?, input_text);
    Ok(())
}

#[test]
fn quota_failure_suggests_an_api_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/paper/CorpusId:12345678")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .create();
    let _n = server
        .mock("GET", "/paper/CorpusId:99999999")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .create();

    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), INPUT);

    let output = bibdoi(&server.url()).arg(&input).output()?;
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("quota exceeded (HTTP 429)"), "stderr=\n{stderr}");
    assert!(stderr.contains("--api-key"), "stderr=\n{stderr}");
    assert!(stderr.contains("✗ 2"), "stderr=\n{stderr}");
    assert_eq!(fs::read_to_string(dir.path().join("refs_modified.bib"))?, INPUT);
    Ok(())
}

#[test]
fn api_key_is_forwarded() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let keyed = server
        .mock("GET", "/paper/CorpusId:1")
        .match_query(mockito::Matcher::Any)
        .match_header("x-api-key", "s3cret")
        .with_body(r#"{"externalIds":{"DOI":"10.1234/keyed"}}"#)
        .create();

    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), "@misc{k, url = {CorpusID:1}}\n");
    let out = dir.path().join("custom.bib");

    bibdoi(&server.url())
        .env("SEMANTIC_SCHOLAR_API_KEY", "s3cret")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&out)?,
        "@misc{k, url = {CorpusID:1}, doi = {10.1234/keyed}}\n"
    );
    keyed.assert();
    Ok(())
}

#[test]
fn invalid_bibtex_aborts_without_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = write_input(dir.path(), "@article{broken,\n  title = {never closed\n");

    bibdoi(&black_hole())
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid BibTeX file"))
        .stderr(predicate::str::contains("entry #1 (line 2, column 11)"));
    assert!(!dir.path().join("refs_modified.bib").exists());
    Ok(())
}

#[test]
fn missing_input_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    bibdoi(&black_hole())
        .arg(dir.path().join("absent.bib"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
    Ok(())
}

#[test]
fn bibliography_without_entries_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let contents = "@comment{jabref-meta: databaseType:bibtex;}\n";
    let input = write_input(dir.path(), contents);

    let output = bibdoi(&black_hole()).arg(&input).output()?;
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("✓ 0") && stderr.contains("✗ 0"), "stderr=\n{stderr}");
    assert_eq!(fs::read_to_string(dir.path().join("refs_modified.bib"))?, contents);
    Ok(())
}
