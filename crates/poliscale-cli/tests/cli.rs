use assert_cmd::Command;
use predicates::prelude::*;

fn write_fixtures(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let corpus = dir.path().join("corpus.csv");
    std::fs::write(
        &corpus,
        "id,text\n\
         A,good good great\n\
         B,bad terrible\n",
    )
    .unwrap();
    let lexicon = dir.path().join("lexicon.csv");
    std::fs::write(&lexicon, "good,1\ngreat,1\nbad,-1\nterrible,-1\n").unwrap();
    (corpus, lexicon)
}

#[test]
fn help_lists_the_strategies() {
    Command::cargo_bin("poliscale")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("wordscores"))
        .stdout(predicate::str::contains("wordfish"))
        .stdout(predicate::str::contains("lexicon"));
}

#[test]
fn lexicon_run_writes_the_scored_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let (corpus, lexicon) = write_fixtures(&dir);
    let output = dir.path().join("scored.csv");

    Command::cargo_bin("poliscale")
        .unwrap()
        .args(["lexicon", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(&output)
        .arg("--lexicon")
        .arg(&lexicon)
        .assert()
        .success()
        .stdout(predicate::str::contains("scored 2/2 documents"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("id,text,sentiment"));
    assert!(written.contains("A,good good great,2"));
    assert!(written.contains("B,bad terrible,-2"));
}

#[test]
fn wordscores_reads_references_from_a_column() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.csv");
    std::fs::write(
        &corpus,
        "id,text,position\n\
         L,left left wing,-1\n\
         R,right right wing,1\n\
         M,left right,\n",
    )
    .unwrap();
    let output = dir.path().join("scored.csv");

    Command::cargo_bin("poliscale")
        .unwrap()
        .args(["wordscores", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(&output)
        .args(["--reference-column", "position", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scored 3/3 documents"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("id,text,position,wordscores"));
}

#[test]
fn json_format_emits_the_run_report() {
    let dir = tempfile::tempdir().unwrap();
    let (corpus, lexicon) = write_fixtures(&dir);

    Command::cargo_bin("poliscale")
        .unwrap()
        .args(["lexicon", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(dir.path().join("scored.csv"))
        .arg("--lexicon")
        .arg(&lexicon)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"score_column\": \"sentiment\""))
        .stdout(predicate::str::contains("\"scored\": 2"));
}

#[test]
fn wordscores_without_references_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (corpus, _) = write_fixtures(&dir);

    Command::cargo_bin("poliscale")
        .unwrap()
        .args(["wordscores", "--input"])
        .arg(&corpus)
        .arg("--output")
        .arg(dir.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reference"));
}
