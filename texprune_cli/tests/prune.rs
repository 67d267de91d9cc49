mod common;

use predicates::prelude::PredicateBooleanExt;
use rstest::rstest;
use serde_json::Value;
use texprune_core::AnyEmptyResult;

const MAIN: &str = "\\documentclass{article}
\\begin{document}
% draft note
\\input{sections/intro}
\\todo{fix this}
\\includegraphics[width=\\linewidth]{figures/plot}
\\end{document}
";

fn sample_project(root: &std::path::Path) -> std::io::Result<()> {
	common::write(root, "src/main.tex", MAIN)?;
	common::write(root, "src/main.bbl", "\\begin{thebibliography}{1}\\end{thebibliography}\n")?;
	common::write(root, "src/main.log", "log")?;
	common::write(root, "src/sections/intro.tex", "Intro. \\hl{Important} text.\n")?;
	common::write(root, "src/figures/plot.pdf", "%PDF-1.5")?;
	common::write(root, "src/figures/old.png", "png")?;
	common::write(root, "src/notes.txt", "notes")
}

#[test]
fn prune_writes_cleaned_project() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote"));

	let root = std::fs::read_to_string(out.join("ms.tex"))?;
	assert!(root.contains("%\n\\input{sections/intro}"));
	assert!(!root.contains("draft note"));
	assert!(!out.join("main.tex").exists());
	assert!(out.join("ms.bbl").is_file());
	assert!(out.join("sections/intro.tex").is_file());
	assert!(out.join("figures/plot.pdf").is_file());
	assert!(!out.join("figures/old.png").exists());
	assert!(!out.join("main.log").exists());

	Ok(())
}

#[test]
fn prune_lists_unused_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.assert()
		.success()
		.stdout(predicates::str::contains("Unused files"))
		.stdout(predicates::str::contains("notes.txt"))
		.stdout(predicates::str::contains("old.png"))
		.stdout(predicates::str::contains("main.log").not())
		.stdout(predicates::str::contains("plot.pdf").not());

	Ok(())
}

#[test]
fn prune_removes_and_short_circuits_commands() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--remove-cmd")
		.arg("todo")
		.arg("--short-circuit-cmd=hl")
		.assert()
		.success()
		.stdout(predicates::str::contains("cmds_removed_todo"))
		.stdout(predicates::str::contains("cmds_shortcircuited_hl"));

	let root = std::fs::read_to_string(out.join("ms.tex"))?;
	assert!(!root.contains("\\todo"));
	assert!(!root.contains("fix this"));

	let intro = std::fs::read_to_string(out.join("sections/intro.tex"))?;
	assert_eq!(intro, "Intro. Important text.\n");

	Ok(())
}

#[test]
fn prune_accepts_comma_separated_commands() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/main.tex", "\\a{1}\\b{2}\\c{3}\n")?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--remove-cmd")
		.arg("a,\\b")
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(out.join("ms.tex"))?, "\\c{3}\n");

	Ok(())
}

#[rstest]
#[case::keep_marker(&[], "a %\nb\n")]
#[case::remove_completely(&["--remove-comments-completely"], "a \nb\n")]
fn prune_comment_modes(#[case] flags: &[&str], #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/main.tex", "a % one\nb\n")?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.args(flags)
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(out.join("ms.tex"))?, expected);

	Ok(())
}

#[test]
fn prune_uses_custom_root_doc_name() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--out-root-doc-name")
		.arg("paper.tex")
		.assert()
		.success();

	assert!(out.join("paper.tex").is_file());
	assert!(out.join("paper.bbl").is_file());
	assert!(!out.join("ms.tex").exists());

	Ok(())
}

#[test]
fn prune_copies_keep_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;
	common::write(tmp.path(), "src/data/table.csv", "a,b\n")?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--keep-file")
		.arg("data/table.csv")
		.assert()
		.success()
		.stdout(predicates::str::contains("table.csv").not());

	assert_eq!(std::fs::read_to_string(out.join("data/table.csv"))?, "a,b\n");

	Ok(())
}

#[test]
fn prune_clears_out_dir_when_asked() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;
	let out = tmp.path().join("out");
	common::write(&out, "stale.txt", "old")?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--clear-out-dir")
		.assert()
		.success();

	assert!(!out.join("stale.txt").exists());
	assert!(out.join("ms.tex").is_file());

	Ok(())
}

#[test]
fn prune_json_output_is_valid() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;

	let mut cmd = common::texprune_cmd();
	let output = cmd
		.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.arg("--format")
		.arg("json")
		.output()?;

	assert!(output.status.success());
	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["stats"]["inline_comments"], 1);

	let unused: Vec<&str> = json["unused_files"]
		.as_array()
		.map(|files| files.iter().filter_map(Value::as_str).collect())
		.unwrap_or_default();
	assert_eq!(unused, vec!["figures/old.png", "notes.txt"]);

	let files = json["files"].as_array().map(Vec::len).unwrap_or_default();
	assert!(files >= 4);
	assert_eq!(json["files"][0]["file_type"], "document");

	Ok(())
}

#[test]
fn prune_reports_missing_include_as_warning() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/main.tex", "\\input{missing}\n")?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.assert()
		.success()
		.stderr(predicates::str::contains("missing"))
		.stderr(predicates::str::contains("texprune::missing_include"));

	Ok(())
}

#[test]
fn prune_fails_when_out_dir_is_source_root() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("src"))
		.assert()
		.code(2)
		.stderr(predicates::str::contains("same as the source root"));

	Ok(())
}

#[test]
fn prune_fails_when_out_dir_contains_source_root() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("contains the source root"));

	Ok(())
}

#[test]
fn prune_fails_for_missing_keep_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_project(tmp.path())?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.arg("--keep-file")
		.arg("nope.txt")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("nope.txt"));

	assert!(!tmp.path().join("out").exists());

	Ok(())
}

#[test]
fn prune_fails_for_missing_root_document() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("main.tex"))
		.arg(tmp.path().join("out"))
		.assert()
		.code(2)
		.stderr(predicates::str::contains("root document not found"));

	Ok(())
}

#[test]
fn prune_fails_when_short_circuit_is_ambiguous() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/main.tex", "\\pair{a}{b}\n")?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.arg("--short-circuit-cmd")
		.arg("pair")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("cannot short-circuit"));

	Ok(())
}
